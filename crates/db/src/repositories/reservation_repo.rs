//! Repository for the `reservations` table.
//!
//! Status transitions go through [`ReservationStatus`]; the methods that
//! change capacity-relevant state take an open transaction so the caller can
//! pair them with the matching ledger update.

use boxoffice_core::paging::{clamp_limit, clamp_offset, DEFAULT_LIMIT, MAX_LIMIT};
use boxoffice_core::status::{ReservationStatus, StatusId};
use boxoffice_core::types::DbId;
use sqlx::PgPool;

use super::PgTx;
use crate::models::reservation::{Reservation, ReservationDetail, ReservationListQuery};

/// Column list for `reservations` queries.
const COLUMNS: &str = "id, user_id, event_id, ticket_count, status_id, ticket_code, \
                        cancelled_at, created_at, updated_at";

/// Joined projection for listings. Expects `r`, `e`, `u` and `s` aliases.
const DETAIL_COLUMNS: &str = "r.id, r.user_id, r.event_id, r.ticket_count, s.name AS status, \
     r.ticket_code, r.cancelled_at, r.created_at, \
     e.name AS event_name, e.starts_at AS event_starts_at, e.location AS event_location, \
     e.price_cents, e.price_cents * r.ticket_count AS total_cents, \
     u.name AS user_name, u.email AS user_email";

const DETAIL_FROM: &str = "FROM reservations r \
     JOIN events e ON e.id = r.event_id \
     JOIN users u ON u.id = r.user_id \
     JOIN reservation_statuses s ON s.id = r.status_id";

pub struct ReservationRepo;

impl ReservationRepo {
    /// Insert a confirmed reservation inside the caller's transaction.
    pub async fn insert_confirmed(
        tx: &mut PgTx<'_>,
        user_id: DbId,
        event_id: DbId,
        ticket_count: i32,
    ) -> Result<Reservation, sqlx::Error> {
        let query = format!(
            "INSERT INTO reservations (user_id, event_id, ticket_count, status_id)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Reservation>(&query)
            .bind(user_id)
            .bind(event_id)
            .bind(ticket_count)
            .bind(ReservationStatus::Confirmed.id())
            .fetch_one(&mut **tx)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Reservation>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM reservations WHERE id = $1");
        sqlx::query_as::<_, Reservation>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_detail(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<ReservationDetail>, sqlx::Error> {
        let query = format!("SELECT {DETAIL_COLUMNS} {DETAIL_FROM} WHERE r.id = $1");
        sqlx::query_as::<_, ReservationDetail>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Bind a ticket code to a reservation. `uq_reservations_ticket_code`
    /// rejects duplicates.
    pub async fn set_ticket_code(
        pool: &PgPool,
        id: DbId,
        ticket_code: &str,
    ) -> Result<Option<Reservation>, sqlx::Error> {
        let query = format!(
            "UPDATE reservations SET ticket_code = $2
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Reservation>(&query)
            .bind(id)
            .bind(ticket_code)
            .fetch_optional(pool)
            .await
    }

    /// Flip a confirmed reservation to cancelled.
    ///
    /// Returns `None` when the row is missing or no longer confirmed, so two
    /// concurrent cancels can never both succeed.
    pub async fn cancel_if_confirmed(
        tx: &mut PgTx<'_>,
        id: DbId,
    ) -> Result<Option<Reservation>, sqlx::Error> {
        let query = format!(
            "UPDATE reservations SET status_id = $2, cancelled_at = NOW()
             WHERE id = $1 AND status_id = $3
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Reservation>(&query)
            .bind(id)
            .bind(ReservationStatus::Cancelled.id())
            .bind(ReservationStatus::Confirmed.id())
            .fetch_optional(&mut **tx)
            .await
    }

    /// Remove a reservation, returning the deleted row.
    pub async fn delete(tx: &mut PgTx<'_>, id: DbId) -> Result<Option<Reservation>, sqlx::Error> {
        let query = format!("DELETE FROM reservations WHERE id = $1 RETURNING {COLUMNS}");
        sqlx::query_as::<_, Reservation>(&query)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
    }

    /// Number of reservations (any status) referencing an event.
    pub async fn count_for_event(pool: &PgPool, event_id: DbId) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM reservations WHERE event_id = $1")
                .bind(event_id)
                .fetch_one(pool)
                .await?;
        Ok(count)
    }

    /// Sum of `ticket_count` over confirmed reservations for an event.
    pub async fn confirmed_tickets(pool: &PgPool, event_id: DbId) -> Result<i64, sqlx::Error> {
        let (sum,): (i64,) = sqlx::query_as(
            "SELECT COALESCE(SUM(ticket_count), 0)::BIGINT FROM reservations
             WHERE event_id = $1 AND status_id = $2",
        )
        .bind(event_id)
        .bind(ReservationStatus::Confirmed.id())
        .fetch_one(pool)
        .await?;
        Ok(sum)
    }

    /// List reservations newest first. When `user_id` is `Some`, only that
    /// user's reservations are returned; `None` is the admin view.
    pub async fn list(
        pool: &PgPool,
        user_id: Option<DbId>,
        status: Option<ReservationStatus>,
        params: &ReservationListQuery,
    ) -> Result<Vec<ReservationDetail>, sqlx::Error> {
        let limit = clamp_limit(params.limit, DEFAULT_LIMIT, MAX_LIMIT);
        let offset = clamp_offset(params.offset);

        let mut conditions: Vec<String> = Vec::new();
        let mut bind_idx: u32 = 1;

        if user_id.is_some() {
            conditions.push(format!("r.user_id = ${bind_idx}"));
            bind_idx += 1;
        }
        if status.is_some() {
            conditions.push(format!("r.status_id = ${bind_idx}"));
            bind_idx += 1;
        }
        if params.event_id.is_some() {
            conditions.push(format!("r.event_id = ${bind_idx}"));
            bind_idx += 1;
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let query = format!(
            "SELECT {DETAIL_COLUMNS} {DETAIL_FROM} \
             {where_clause} \
             ORDER BY r.created_at DESC, r.id DESC \
             LIMIT ${bind_idx} OFFSET ${}",
            bind_idx + 1,
        );

        let mut q = sqlx::query_as::<_, ReservationDetail>(&query);
        if let Some(uid) = user_id {
            q = q.bind(uid);
        }
        if let Some(s) = status {
            q = q.bind(StatusId::from(s));
        }
        if let Some(eid) = params.event_id {
            q = q.bind(eid);
        }
        q.bind(limit).bind(offset).fetch_all(pool).await
    }
}
