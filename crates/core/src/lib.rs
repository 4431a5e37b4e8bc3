//! Box office domain core.
//!
//! Pure domain rules and the reservation workflow. This crate has no
//! database or HTTP dependency; persistence and job dispatch reach it
//! through the ports in [`booking`].

pub mod booking;
pub mod capacity;
pub mod error;
pub mod event;
pub mod paging;
pub mod queue;
pub mod reservation;
pub mod roles;
pub mod status;
pub mod types;
