//! Event field rules shared by the create and update paths.

use crate::error::CoreError;
use crate::types::{Cents, Timestamp};

/// Allowed values for `events.category`.
///
/// Must match the CHECK constraint in `20260301000003_create_events_table.sql`.
pub const CATEGORIES: [&str; 6] = ["concert", "theatre", "cinema", "sport", "comedy", "other"];

const MIN_NAME_LEN: usize = 2;
const MAX_NAME_LEN: usize = 255;

pub fn validate_category(category: &str) -> Result<(), CoreError> {
    if CATEGORIES.contains(&category) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Unknown category '{category}'. Expected one of: {}",
            CATEGORIES.join(", ")
        )))
    }
}

pub fn validate_name(name: &str) -> Result<(), CoreError> {
    let len = name.trim().chars().count();
    if !(MIN_NAME_LEN..=MAX_NAME_LEN).contains(&len) {
        return Err(CoreError::Validation(format!(
            "Event name must be between {MIN_NAME_LEN} and {MAX_NAME_LEN} characters"
        )));
    }
    Ok(())
}

pub fn validate_price(price_cents: Cents) -> Result<(), CoreError> {
    if price_cents < 0 {
        return Err(CoreError::Validation(
            "price_cents cannot be negative".to_string(),
        ));
    }
    Ok(())
}

/// New or rescheduled events must start in the future.
pub fn validate_starts_at(starts_at: Timestamp, now: Timestamp) -> Result<(), CoreError> {
    if starts_at <= now {
        return Err(CoreError::Validation(
            "starts_at must be in the future".to_string(),
        ));
    }
    Ok(())
}

/// Whether an event has already begun at `now`.
pub fn has_started(starts_at: Timestamp, now: Timestamp) -> bool {
    starts_at < now
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;

    #[test]
    fn categories_accept_known_values() {
        for c in CATEGORIES {
            assert!(validate_category(c).is_ok());
        }
        assert!(validate_category("opera").is_err());
    }

    #[test]
    fn name_length_bounds() {
        assert!(validate_name("A").is_err());
        assert!(validate_name("  A  ").is_err());
        assert!(validate_name("Jazz Night").is_ok());
        assert!(validate_name(&"x".repeat(256)).is_err());
    }

    #[test]
    fn price_must_be_non_negative() {
        assert!(validate_price(0).is_ok());
        assert!(validate_price(-1).is_err());
    }

    #[test]
    fn start_time_rules() {
        let now = Utc::now();
        assert!(validate_starts_at(now + Duration::hours(1), now).is_ok());
        assert!(validate_starts_at(now - Duration::hours(1), now).is_err());
        assert!(has_started(now - Duration::seconds(1), now));
        assert!(!has_started(now + Duration::seconds(1), now));
    }
}
