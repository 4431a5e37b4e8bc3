pub mod auth;
pub mod events;
pub mod queues;
pub mod reservations;
