//! Postgres implementation of the booking port.
//!
//! Every method that touches capacity runs the ledger statement and the
//! reservation write in one transaction, so `capacity_used` always equals
//! the tickets held by confirmed reservations.

use async_trait::async_trait;
use boxoffice_core::booking::{
    BookingStore, CustomerRecord, EventRecord, NewReservation, ReservationRecord,
};
use boxoffice_core::capacity;
use boxoffice_core::error::CoreError;
use boxoffice_core::status::ReservationStatus;
use boxoffice_core::types::DbId;
use sqlx::PgPool;

use crate::models::reservation::Reservation;
use crate::repositories::{EventRepo, ReservationRepo, UserRepo};

#[derive(Clone)]
pub struct PgBookingStore {
    pool: PgPool,
}

impl PgBookingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Map a database failure into the domain taxonomy.
///
/// Unique violations become `Conflict`; everything else is `Internal`.
fn db_err(err: sqlx::Error) -> CoreError {
    if let sqlx::Error::Database(ref db) = err {
        if db.code().as_deref() == Some("23505") {
            let constraint = db.constraint().unwrap_or("unknown").to_string();
            return CoreError::Conflict(format!(
                "Duplicate value violates unique constraint: {constraint}"
            ));
        }
    }
    CoreError::Internal(err.to_string())
}

fn to_record(row: Reservation) -> Result<ReservationRecord, CoreError> {
    row.into_record().map_err(CoreError::Internal)
}

#[async_trait]
impl BookingStore for PgBookingStore {
    async fn find_event(&self, event_id: DbId) -> Result<Option<EventRecord>, CoreError> {
        let event = EventRepo::find_by_id(&self.pool, event_id)
            .await
            .map_err(db_err)?;
        Ok(event.map(EventRecord::from))
    }

    async fn find_customer(&self, user_id: DbId) -> Result<Option<CustomerRecord>, CoreError> {
        let user = UserRepo::find_by_id(&self.pool, user_id)
            .await
            .map_err(db_err)?;
        Ok(user.filter(|u| u.is_active).map(|u| CustomerRecord {
            id: u.id,
            name: u.name,
            email: u.email,
        }))
    }

    async fn find_reservation(
        &self,
        reservation_id: DbId,
    ) -> Result<Option<ReservationRecord>, CoreError> {
        ReservationRepo::find_by_id(&self.pool, reservation_id)
            .await
            .map_err(db_err)?
            .map(to_record)
            .transpose()
    }

    async fn reserve_confirmed(
        &self,
        input: &NewReservation,
    ) -> Result<ReservationRecord, CoreError> {
        capacity::validate_ticket_count(input.ticket_count)?;

        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let reserved = EventRepo::reserve_capacity(&mut tx, input.event_id, input.ticket_count)
            .await
            .map_err(db_err)?;

        if reserved.is_none() {
            // Work out why the conditional update matched nothing. The row
            // stays locked, so the reported figure holds until rollback and a
            // concurrent release that made room can still be taken.
            let Some((max, used)) = EventRepo::lock_capacity(&mut tx, input.event_id)
                .await
                .map_err(db_err)?
            else {
                tx.rollback().await.map_err(db_err)?;
                return Err(CoreError::NotFound {
                    entity: "Event",
                    id: input.event_id,
                });
            };

            if let Err(e) = capacity::check_reserve(input.event_id, max, used, input.ticket_count) {
                tx.rollback().await.map_err(db_err)?;
                return Err(e);
            }

            EventRepo::reserve_capacity(&mut tx, input.event_id, input.ticket_count)
                .await
                .map_err(db_err)?
                .ok_or_else(|| {
                    CoreError::Internal("Locked capacity check disagreed with ledger".into())
                })?;
        }

        let row = ReservationRepo::insert_confirmed(
            &mut tx,
            input.user_id,
            input.event_id,
            input.ticket_count,
        )
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        to_record(row)
    }

    async fn assign_ticket_code(
        &self,
        reservation_id: DbId,
        ticket_code: &str,
    ) -> Result<ReservationRecord, CoreError> {
        let row = ReservationRepo::set_ticket_code(&self.pool, reservation_id, ticket_code)
            .await
            .map_err(db_err)?
            .ok_or(CoreError::NotFound {
                entity: "Reservation",
                id: reservation_id,
            })?;
        to_record(row)
    }

    async fn void_reservation(&self, reservation_id: DbId) -> Result<(), CoreError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        if let Some(row) = ReservationRepo::delete(&mut tx, reservation_id)
            .await
            .map_err(db_err)?
        {
            if row.status_id == ReservationStatus::Confirmed.id() {
                EventRepo::release_capacity(&mut tx, row.event_id, row.ticket_count)
                    .await
                    .map_err(db_err)?;
            }
        }

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn cancel_confirmed(
        &self,
        reservation_id: DbId,
    ) -> Result<Option<ReservationRecord>, CoreError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let Some(row) = ReservationRepo::cancel_if_confirmed(&mut tx, reservation_id)
            .await
            .map_err(db_err)?
        else {
            tx.rollback().await.map_err(db_err)?;
            return Ok(None);
        };

        EventRepo::release_capacity(&mut tx, row.event_id, row.ticket_count)
            .await
            .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        to_record(row).map(Some)
    }
}
