//! Status enums mapping to SMALLINT lookup tables.
//!
//! Each variant's discriminant matches the seed data in the corresponding
//! lookup table (`reservation_statuses`, `job_states`).

/// Status ID type matching SMALLINT in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:expr => $label:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Every variant, in seed order.
            pub const ALL: &'static [$name] = &[$( $name::$variant ),+];

            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }

            /// Lookup-table name of this status.
            pub fn as_str(self) -> &'static str {
                match self {
                    $( $name::$variant => $label ),+
                }
            }

            /// Map a database status ID back to the enum.
            pub fn from_id(id: StatusId) -> Option<Self> {
                match id {
                    $( v if v == $val => Some($name::$variant), )+
                    _ => None,
                }
            }

            /// Parse a lookup-table name.
            pub fn parse(name: &str) -> Option<Self> {
                match name {
                    $( $label => Some($name::$variant), )+
                    _ => None,
                }
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

define_status_enum! {
    /// Reservation lifecycle status.
    ///
    /// `Pending` is seeded but no code path produces it.
    ReservationStatus {
        Pending = 1 => "pending",
        Confirmed = 2 => "confirmed",
        Cancelled = 3 => "cancelled",
    }
}

define_status_enum! {
    /// Queue job state.
    JobState {
        Waiting = 1 => "waiting",
        Active = 2 => "active",
        Completed = 3 => "completed",
        Failed = 4 => "failed",
        Delayed = 5 => "delayed",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reservation_status_ids_match_seed_data() {
        assert_eq!(ReservationStatus::Pending.id(), 1);
        assert_eq!(ReservationStatus::Confirmed.id(), 2);
        assert_eq!(ReservationStatus::Cancelled.id(), 3);
    }

    #[test]
    fn job_state_ids_match_seed_data() {
        assert_eq!(JobState::Waiting.id(), 1);
        assert_eq!(JobState::Active.id(), 2);
        assert_eq!(JobState::Completed.id(), 3);
        assert_eq!(JobState::Failed.id(), 4);
        assert_eq!(JobState::Delayed.id(), 5);
    }

    #[test]
    fn ids_and_names_round_trip() {
        for s in JobState::ALL {
            assert_eq!(JobState::from_id(s.id()), Some(*s));
            assert_eq!(JobState::parse(s.as_str()), Some(*s));
        }
        assert_eq!(ReservationStatus::from_id(9), None);
        assert_eq!(JobState::parse("stalled"), None);
    }
}
