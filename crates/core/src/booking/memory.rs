//! In-process implementations of the booking ports.
//!
//! Used by workflow tests and local tooling. Every operation runs under one
//! mutex, which gives the same atomicity the Postgres store gets from
//! transactions.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use super::{
    BookingStore, CustomerRecord, EventRecord, JobDispatch, NewReservation, ReservationRecord,
};
use crate::capacity;
use crate::error::CoreError;
use crate::queue::TicketJob;
use crate::status::ReservationStatus;
use crate::types::DbId;

#[derive(Default)]
struct State {
    events: HashMap<DbId, EventRecord>,
    customers: HashMap<DbId, CustomerRecord>,
    reservations: HashMap<DbId, ReservationRecord>,
    next_reservation_id: DbId,
}

#[derive(Default)]
pub struct InMemoryBookingStore {
    state: Mutex<State>,
    fail_ticket_codes: AtomicBool,
}

impl InMemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_event(&self, event: EventRecord) {
        self.lock().events.insert(event.id, event);
    }

    pub fn insert_customer(&self, customer: CustomerRecord) {
        self.lock().customers.insert(customer.id, customer);
    }

    /// Make every following `assign_ticket_code` call fail.
    pub fn fail_ticket_codes(&self, fail: bool) {
        self.fail_ticket_codes.store(fail, Ordering::SeqCst);
    }

    pub fn event(&self, event_id: DbId) -> Option<EventRecord> {
        self.lock().events.get(&event_id).cloned()
    }

    pub fn reservations(&self) -> Vec<ReservationRecord> {
        let mut all: Vec<_> = self.lock().reservations.values().cloned().collect();
        all.sort_by_key(|r| r.id);
        all
    }

    /// Sum of `ticket_count` over confirmed reservations for an event.
    pub fn confirmed_tickets(&self, event_id: DbId) -> i32 {
        self.lock()
            .reservations
            .values()
            .filter(|r| r.event_id == event_id && r.status == ReservationStatus::Confirmed)
            .map(|r| r.ticket_count)
            .sum()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // A poisoned lock only means a test panicked mid-operation.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl BookingStore for InMemoryBookingStore {
    async fn find_event(&self, event_id: DbId) -> Result<Option<EventRecord>, CoreError> {
        Ok(self.event(event_id))
    }

    async fn find_customer(&self, user_id: DbId) -> Result<Option<CustomerRecord>, CoreError> {
        Ok(self.lock().customers.get(&user_id).cloned())
    }

    async fn find_reservation(
        &self,
        reservation_id: DbId,
    ) -> Result<Option<ReservationRecord>, CoreError> {
        Ok(self.lock().reservations.get(&reservation_id).cloned())
    }

    async fn reserve_confirmed(
        &self,
        input: &NewReservation,
    ) -> Result<ReservationRecord, CoreError> {
        let mut state = self.lock();
        let event = state
            .events
            .get_mut(&input.event_id)
            .ok_or(CoreError::NotFound {
                entity: "Event",
                id: input.event_id,
            })?;
        event.capacity_used = capacity::check_reserve(
            event.id,
            event.capacity_max,
            event.capacity_used,
            input.ticket_count,
        )?;

        state.next_reservation_id += 1;
        let record = ReservationRecord {
            id: state.next_reservation_id,
            user_id: input.user_id,
            event_id: input.event_id,
            ticket_count: input.ticket_count,
            status: ReservationStatus::Confirmed,
            ticket_code: None,
            cancelled_at: None,
            created_at: Utc::now(),
        };
        state.reservations.insert(record.id, record.clone());
        Ok(record)
    }

    async fn assign_ticket_code(
        &self,
        reservation_id: DbId,
        ticket_code: &str,
    ) -> Result<ReservationRecord, CoreError> {
        if self.fail_ticket_codes.load(Ordering::SeqCst) {
            return Err(CoreError::Internal(
                "ticket code storage unavailable".to_string(),
            ));
        }
        let mut state = self.lock();
        if state
            .reservations
            .values()
            .any(|r| r.ticket_code.as_deref() == Some(ticket_code))
        {
            return Err(CoreError::Conflict(format!(
                "Ticket code '{ticket_code}' already exists"
            )));
        }
        let record = state
            .reservations
            .get_mut(&reservation_id)
            .ok_or(CoreError::NotFound {
                entity: "Reservation",
                id: reservation_id,
            })?;
        record.ticket_code = Some(ticket_code.to_string());
        Ok(record.clone())
    }

    async fn void_reservation(&self, reservation_id: DbId) -> Result<(), CoreError> {
        let mut state = self.lock();
        let Some(record) = state.reservations.remove(&reservation_id) else {
            return Ok(());
        };
        if record.status == ReservationStatus::Confirmed {
            if let Some(event) = state.events.get_mut(&record.event_id) {
                event.capacity_used = capacity::apply_release(event.capacity_used, record.ticket_count);
            }
        }
        Ok(())
    }

    async fn cancel_confirmed(
        &self,
        reservation_id: DbId,
    ) -> Result<Option<ReservationRecord>, CoreError> {
        let mut state = self.lock();
        let Some(record) = state.reservations.get_mut(&reservation_id) else {
            return Ok(None);
        };
        if record.status != ReservationStatus::Confirmed {
            return Ok(None);
        }
        record.status = ReservationStatus::Cancelled;
        record.cancelled_at = Some(Utc::now());
        let cancelled = record.clone();

        if let Some(event) = state.events.get_mut(&cancelled.event_id) {
            event.capacity_used =
                capacity::apply_release(event.capacity_used, cancelled.ticket_count);
        }
        Ok(Some(cancelled))
    }
}

/// Dispatch port that records jobs instead of sending them.
#[derive(Default)]
pub struct RecordingDispatch {
    jobs: Mutex<Vec<TicketJob>>,
    fail: AtomicBool,
}

impl RecordingDispatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// A dispatcher whose every call fails.
    pub fn failing() -> Self {
        let d = Self::default();
        d.fail.store(true, Ordering::SeqCst);
        d
    }

    pub fn jobs(&self) -> Vec<TicketJob> {
        self.jobs.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl JobDispatch for RecordingDispatch {
    async fn dispatch(&self, job: TicketJob) -> Result<(), CoreError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(CoreError::Internal("job queue unavailable".to_string()));
        }
        self.jobs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(job);
        Ok(())
    }
}
