//! Repository for the `events` table.
//!
//! Besides CRUD, this is where the capacity ledger touches the database:
//! [`EventRepo::reserve_capacity`] and [`EventRepo::release_capacity`] are the
//! only statements that write `capacity_used`.

use boxoffice_core::paging::{clamp_limit, clamp_offset, DEFAULT_LIMIT, MAX_LIMIT};
use boxoffice_core::types::DbId;
use sqlx::PgPool;

use super::PgTx;
use crate::models::event::{CreateEvent, Event, EventListQuery, UpdateEvent};

/// Column list for `events` queries.
const COLUMNS: &str = "id, name, description, starts_at, capacity_max, capacity_used, \
                        price_cents, category, location, image_url, created_at, updated_at";

const DEFAULT_CATEGORY: &str = "other";

/// Provides CRUD and capacity operations for events.
pub struct EventRepo;

impl EventRepo {
    /// Insert a new event with `capacity_used = 0`.
    pub async fn create(pool: &PgPool, input: &CreateEvent) -> Result<Event, sqlx::Error> {
        let query = format!(
            "INSERT INTO events
                (name, description, starts_at, capacity_max, price_cents, category, location, image_url)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Event>(&query)
            .bind(input.name.trim())
            .bind(&input.description)
            .bind(input.starts_at)
            .bind(input.capacity_max)
            .bind(input.price_cents)
            .bind(input.category.as_deref().unwrap_or(DEFAULT_CATEGORY))
            .bind(&input.location)
            .bind(&input.image_url)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Event>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM events WHERE id = $1");
        sqlx::query_as::<_, Event>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List events ordered by start time, with optional search and category filters.
    pub async fn list(pool: &PgPool, params: &EventListQuery) -> Result<Vec<Event>, sqlx::Error> {
        let limit = clamp_limit(params.limit, DEFAULT_LIMIT, MAX_LIMIT);
        let offset = clamp_offset(params.offset);

        let search = params
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", escape_like(s)));

        let mut conditions: Vec<String> = Vec::new();
        let mut bind_idx: u32 = 1;

        if search.is_some() {
            conditions.push(format!(
                "(name ILIKE ${bind_idx} OR description ILIKE ${bind_idx})"
            ));
            bind_idx += 1;
        }
        if params.category.is_some() {
            conditions.push(format!("category = ${bind_idx}"));
            bind_idx += 1;
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let query = format!(
            "SELECT {COLUMNS} FROM events \
             {where_clause} \
             ORDER BY starts_at ASC, id ASC \
             LIMIT ${bind_idx} OFFSET ${}",
            bind_idx + 1,
        );

        let mut q = sqlx::query_as::<_, Event>(&query);
        if let Some(ref s) = search {
            q = q.bind(s);
        }
        if let Some(ref c) = params.category {
            q = q.bind(c);
        }
        q.bind(limit).bind(offset).fetch_all(pool).await
    }

    /// Update an event. Only non-`None` fields in `input` are applied.
    ///
    /// The row is only touched if the resulting `capacity_max` still covers
    /// `capacity_used`. Returns `None` if no row matched either condition.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateEvent,
    ) -> Result<Option<Event>, sqlx::Error> {
        let query = format!(
            "UPDATE events SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                starts_at = COALESCE($4, starts_at),
                capacity_max = COALESCE($5, capacity_max),
                price_cents = COALESCE($6, price_cents),
                category = COALESCE($7, category),
                location = COALESCE($8, location),
                image_url = COALESCE($9, image_url)
             WHERE id = $1 AND COALESCE($5, capacity_max) >= capacity_used
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Event>(&query)
            .bind(id)
            .bind(input.name.as_deref().map(str::trim))
            .bind(&input.description)
            .bind(input.starts_at)
            .bind(input.capacity_max)
            .bind(input.price_cents)
            .bind(&input.category)
            .bind(&input.location)
            .bind(&input.image_url)
            .fetch_optional(pool)
            .await
    }

    /// Delete an event. Returns `true` if a row was removed.
    ///
    /// Fails with a foreign-key violation while reservations reference it.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // -----------------------------------------------------------------------
    // Capacity ledger
    // -----------------------------------------------------------------------

    /// Take `count` tickets from the event in one conditional statement.
    ///
    /// Returns the new `capacity_used`, or `None` when the event is missing
    /// or the tickets do not fit. Concurrent callers serialize on the row lock.
    /// The predicate compares against the remaining capacity so that no
    /// `count` can overflow `INTEGER`.
    pub async fn reserve_capacity(
        tx: &mut PgTx<'_>,
        event_id: DbId,
        count: i32,
    ) -> Result<Option<i32>, sqlx::Error> {
        let row: Option<(i32,)> = sqlx::query_as(
            "UPDATE events SET capacity_used = capacity_used + $2
             WHERE id = $1 AND $2 <= capacity_max - capacity_used
             RETURNING capacity_used",
        )
        .bind(event_id)
        .bind(count)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(row.map(|(used,)| used))
    }

    /// Give `count` tickets back, clamping at zero. Returns the new `capacity_used`.
    pub async fn release_capacity(
        tx: &mut PgTx<'_>,
        event_id: DbId,
        count: i32,
    ) -> Result<Option<i32>, sqlx::Error> {
        let row: Option<(i32,)> = sqlx::query_as(
            "UPDATE events SET capacity_used = GREATEST(0, capacity_used - $2)
             WHERE id = $1
             RETURNING capacity_used",
        )
        .bind(event_id)
        .bind(count)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(row.map(|(used,)| used))
    }

    /// Current `(capacity_max, capacity_used)` for an event.
    pub async fn capacity(pool: &PgPool, event_id: DbId) -> Result<Option<(i32, i32)>, sqlx::Error> {
        sqlx::query_as("SELECT capacity_max, capacity_used FROM events WHERE id = $1")
            .bind(event_id)
            .fetch_optional(pool)
            .await
    }

    /// `(capacity_max, capacity_used)` with the row locked until `tx` ends.
    pub async fn lock_capacity(
        tx: &mut PgTx<'_>,
        event_id: DbId,
    ) -> Result<Option<(i32, i32)>, sqlx::Error> {
        sqlx::query_as("SELECT capacity_max, capacity_used FROM events WHERE id = $1 FOR UPDATE")
            .bind(event_id)
            .fetch_optional(&mut **tx)
            .await
    }
}

/// Escape `%`, `_` and `\` so user input matches literally inside ILIKE.
fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
