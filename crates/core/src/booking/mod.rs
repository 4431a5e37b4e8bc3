//! The capacity-constrained reservation workflow.
//!
//! [`ReservationWorkflow`] owns the ordering of a booking: validate, reserve
//! capacity together with the reservation row, bind a ticket code, then fan
//! out the ticket jobs. Persistence and job transport are injected through
//! the [`BookingStore`] and [`JobDispatch`] ports.

pub mod memory;

use async_trait::async_trait;
use serde::Serialize;

use crate::capacity::{self, Availability};
use crate::error::CoreError;
use crate::queue::{CustomerContact, EventSummary, TicketJob, TicketSnapshot};
use crate::reservation::{ensure_cancellable, issue_ticket_code, total_cents};
use crate::roles::ROLE_ADMIN;
use crate::status::ReservationStatus;
use crate::types::{Cents, DbId, Timestamp};

// ---------------------------------------------------------------------------
// Records exchanged with the store
// ---------------------------------------------------------------------------

/// Event fields the workflow reads.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRecord {
    pub id: DbId,
    pub name: String,
    pub starts_at: Timestamp,
    pub location: Option<String>,
    pub price_cents: Cents,
    pub capacity_max: i32,
    pub capacity_used: i32,
}

impl EventRecord {
    pub fn summary(&self) -> EventSummary {
        EventSummary {
            id: self.id,
            name: self.name.clone(),
            starts_at: self.starts_at,
            location: self.location.clone(),
            price_cents: self.price_cents,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerRecord {
    pub id: DbId,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReservationRecord {
    pub id: DbId,
    pub user_id: DbId,
    pub event_id: DbId,
    pub ticket_count: i32,
    pub status: ReservationStatus,
    pub ticket_code: Option<String>,
    pub cancelled_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewReservation {
    pub user_id: DbId,
    pub event_id: DbId,
    pub ticket_count: i32,
}

/// The caller of a protected operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: DbId,
    pub role: String,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }

    /// Owners and admins may act on a reservation.
    pub fn may_act_on(&self, reservation: &ReservationRecord) -> bool {
        self.is_admin() || reservation.user_id == self.user_id
    }
}

// ---------------------------------------------------------------------------
// Ports
// ---------------------------------------------------------------------------

/// Persistence port for the workflow.
///
/// Implementations must make `reserve_confirmed`, `void_reservation` and
/// `cancel_confirmed` atomic: capacity and reservation rows change together
/// or not at all.
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn find_event(&self, event_id: DbId) -> Result<Option<EventRecord>, CoreError>;

    async fn find_customer(&self, user_id: DbId) -> Result<Option<CustomerRecord>, CoreError>;

    async fn find_reservation(
        &self,
        reservation_id: DbId,
    ) -> Result<Option<ReservationRecord>, CoreError>;

    /// Take `ticket_count` from the event's capacity and insert a confirmed
    /// reservation. Fails with `CapacityExceeded` (no side effects) when the
    /// tickets do not fit.
    async fn reserve_confirmed(
        &self,
        input: &NewReservation,
    ) -> Result<ReservationRecord, CoreError>;

    async fn assign_ticket_code(
        &self,
        reservation_id: DbId,
        ticket_code: &str,
    ) -> Result<ReservationRecord, CoreError>;

    /// Delete a just-created reservation and give its tickets back.
    async fn void_reservation(&self, reservation_id: DbId) -> Result<(), CoreError>;

    /// Flip a confirmed reservation to cancelled and release its tickets.
    ///
    /// Returns `None` when the reservation was no longer confirmed, in which
    /// case nothing is released.
    async fn cancel_confirmed(
        &self,
        reservation_id: DbId,
    ) -> Result<Option<ReservationRecord>, CoreError>;
}

/// Outbound port for ticket jobs.
#[async_trait]
pub trait JobDispatch: Send + Sync {
    async fn dispatch(&self, job: TicketJob) -> Result<(), CoreError>;
}

// ---------------------------------------------------------------------------
// Workflow
// ---------------------------------------------------------------------------

/// Result of a successful booking.
#[derive(Debug, Clone, Serialize)]
pub struct BookingReceipt {
    pub reservation: ReservationRecord,
    pub event: EventSummary,
    pub total_cents: Cents,
    /// `false` when at least one ticket job could not be enqueued.
    pub notifications_queued: bool,
}

pub struct ReservationWorkflow<S, D> {
    store: S,
    dispatch: D,
}

impl<S, D> ReservationWorkflow<S, D>
where
    S: BookingStore,
    D: JobDispatch,
{
    pub fn new(store: S, dispatch: D) -> Self {
        Self { store, dispatch }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn dispatch(&self) -> &D {
        &self.dispatch
    }

    /// Book `ticket_count` tickets for `user_id` on `event_id`.
    pub async fn create_reservation(
        &self,
        user_id: DbId,
        event_id: DbId,
        ticket_count: i32,
    ) -> Result<BookingReceipt, CoreError> {
        capacity::validate_ticket_count(ticket_count)?;

        let event = self
            .store
            .find_event(event_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Event",
                id: event_id,
            })?;
        let customer = self
            .store
            .find_customer(user_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "User",
                id: user_id,
            })?;

        let pending = self
            .store
            .reserve_confirmed(&NewReservation {
                user_id,
                event_id,
                ticket_count,
            })
            .await?;

        let code = issue_ticket_code(pending.id);
        let reservation = match self.store.assign_ticket_code(pending.id, &code).await {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(
                    reservation_id = pending.id,
                    error = %e,
                    "Ticket code assignment failed, voiding reservation",
                );
                if let Err(void_err) = self.store.void_reservation(pending.id).await {
                    tracing::error!(
                        reservation_id = pending.id,
                        error = %void_err,
                        "Failed to void reservation",
                    );
                }
                return Err(e);
            }
        };

        let total = total_cents(event.price_cents, ticket_count);
        let snapshot = TicketSnapshot {
            reservation_id: reservation.id,
            ticket_code: code,
            ticket_count,
            total_cents: total,
            event: event.summary(),
            customer: CustomerContact {
                id: customer.id,
                name: customer.name,
                email: customer.email,
            },
        };

        let mut notifications_queued = true;
        for job in TicketJob::fan_out(snapshot) {
            let kind = job.kind;
            if let Err(e) = self.dispatch.dispatch(job).await {
                notifications_queued = false;
                tracing::warn!(
                    reservation_id = reservation.id,
                    job = kind.job_name(),
                    error = %e,
                    "Failed to enqueue ticket job",
                );
            }
        }

        tracing::info!(
            reservation_id = reservation.id,
            event_id,
            user_id,
            ticket_count,
            "Reservation confirmed",
        );

        Ok(BookingReceipt {
            reservation,
            event: event.summary(),
            total_cents: total,
            notifications_queued,
        })
    }

    /// Cancel a confirmed reservation on behalf of `actor`.
    pub async fn cancel_reservation(
        &self,
        actor: &Actor,
        reservation_id: DbId,
    ) -> Result<ReservationRecord, CoreError> {
        let reservation = self
            .store
            .find_reservation(reservation_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Reservation",
                id: reservation_id,
            })?;

        if !actor.may_act_on(&reservation) {
            return Err(CoreError::Forbidden(
                "You do not have permission to cancel this reservation".to_string(),
            ));
        }

        let event = self
            .store
            .find_event(reservation.event_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Event",
                id: reservation.event_id,
            })?;

        ensure_cancellable(reservation.status, event.starts_at, chrono::Utc::now())?;

        let cancelled = self
            .store
            .cancel_confirmed(reservation_id)
            .await?
            .ok_or_else(|| {
                CoreError::InvalidState("Reservation is already cancelled".to_string())
            })?;

        tracing::info!(
            reservation_id,
            event_id = cancelled.event_id,
            released = cancelled.ticket_count,
            actor_id = actor.user_id,
            "Reservation cancelled",
        );

        Ok(cancelled)
    }

    /// Current capacity figures for an event.
    pub async fn available_capacity(&self, event_id: DbId) -> Result<Availability, CoreError> {
        let event = self
            .store
            .find_event(event_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Event",
                id: event_id,
            })?;
        Ok(Availability::new(
            event.id,
            event.capacity_max,
            event.capacity_used,
        ))
    }
}
