//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` (or an open transaction) as the first argument.

pub mod event_repo;
pub mod queue_job_repo;
pub mod reservation_repo;
pub mod session_repo;
pub mod user_repo;

pub use event_repo::EventRepo;
pub use queue_job_repo::QueueJobRepo;
pub use reservation_repo::ReservationRepo;
pub use session_repo::SessionRepo;
pub use user_repo::UserRepo;

/// Transaction handle passed to repository methods that must run atomically
/// with other writes.
pub type PgTx<'a> = sqlx::Transaction<'a, sqlx::Postgres>;
