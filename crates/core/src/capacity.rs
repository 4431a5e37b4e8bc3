//! Capacity ledger rules.
//!
//! Pure functions over an event's `capacity_max` / `capacity_used` pair.
//! The Postgres store expresses the same rules as a single conditional
//! `UPDATE`; the in-memory store calls these directly under a lock.

use serde::Serialize;

use crate::error::CoreError;
use crate::types::DbId;

/// Minimum number of tickets in a single reservation.
pub const MIN_TICKET_COUNT: i32 = 1;

/// Capacity figures for one event, as reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Availability {
    pub event_id: DbId,
    pub capacity_max: i32,
    pub capacity_used: i32,
    pub available: i32,
}

impl Availability {
    pub fn new(event_id: DbId, capacity_max: i32, capacity_used: i32) -> Self {
        Self {
            event_id,
            capacity_max,
            capacity_used,
            available: available(capacity_max, capacity_used),
        }
    }
}

/// Remaining tickets for an event. Never negative.
pub fn available(capacity_max: i32, capacity_used: i32) -> i32 {
    (capacity_max - capacity_used).max(0)
}

/// Reject non-positive ticket counts.
pub fn validate_ticket_count(count: i32) -> Result<(), CoreError> {
    if count < MIN_TICKET_COUNT {
        return Err(CoreError::Validation(format!(
            "ticket_count must be at least {MIN_TICKET_COUNT}, got {count}"
        )));
    }
    Ok(())
}

/// Check a reservation of `count` tickets and return the new `capacity_used`.
///
/// Fails with [`CoreError::CapacityExceeded`] carrying the number of tickets
/// actually left when `count` does not fit.
pub fn check_reserve(
    event_id: DbId,
    capacity_max: i32,
    capacity_used: i32,
    count: i32,
) -> Result<i32, CoreError> {
    validate_ticket_count(count)?;
    let left = available(capacity_max, capacity_used);
    if count > left {
        return Err(CoreError::CapacityExceeded {
            event_id,
            requested: count,
            available: left,
        });
    }
    Ok(capacity_used + count)
}

/// Return `count` tickets to the pool, clamping at zero.
pub fn apply_release(capacity_used: i32, count: i32) -> i32 {
    (capacity_used - count).max(0)
}

/// Validate a new `capacity_max` against the tickets already handed out.
pub fn validate_capacity_max(capacity_max: i32, capacity_used: i32) -> Result<(), CoreError> {
    if capacity_max < 1 {
        return Err(CoreError::Validation(
            "capacity_max must be at least 1".to_string(),
        ));
    }
    if capacity_max < capacity_used {
        return Err(CoreError::Validation(format!(
            "capacity_max cannot be lowered below the {capacity_used} tickets already reserved"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn available_is_difference() {
        assert_eq!(available(50, 48), 2);
        assert_eq!(available(10, 0), 10);
        assert_eq!(available(10, 10), 0);
    }

    #[test]
    fn available_never_negative() {
        assert_eq!(available(5, 9), 0);
    }

    #[test]
    fn reserve_within_capacity() {
        assert_eq!(check_reserve(1, 50, 48, 2).unwrap(), 50);
    }

    #[test]
    fn reserve_over_capacity_reports_remaining() {
        let err = check_reserve(1, 50, 48, 3).unwrap_err();
        assert_matches!(
            err,
            CoreError::CapacityExceeded {
                event_id: 1,
                requested: 3,
                available: 2
            }
        );
    }

    #[test]
    fn reserve_rejects_zero_and_negative() {
        assert_matches!(check_reserve(1, 10, 0, 0), Err(CoreError::Validation(_)));
        assert_matches!(check_reserve(1, 10, 0, -4), Err(CoreError::Validation(_)));
    }

    #[test]
    fn release_clamps_at_zero() {
        assert_eq!(apply_release(5, 2), 3);
        assert_eq!(apply_release(1, 4), 0);
    }

    #[test]
    fn capacity_max_cannot_drop_below_used() {
        assert!(validate_capacity_max(10, 10).is_ok());
        assert_matches!(validate_capacity_max(9, 10), Err(CoreError::Validation(_)));
        assert_matches!(validate_capacity_max(0, 0), Err(CoreError::Validation(_)));
    }

    #[test]
    fn availability_snapshot() {
        let a = Availability::new(3, 100, 40);
        assert_eq!(a.available, 60);
        assert_eq!(a.event_id, 3);
    }
}
