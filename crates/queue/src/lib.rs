//! Durable job queue on the `queue_jobs` table.
//!
//! - [`client::JobQueue`]: producer and admin handle for one named queue.
//! - [`dispatch::PgJobDispatch`]: the reservation workflow's outbound port.
//! - [`worker::Worker`]: bounded-concurrency consumer with retry and backoff.
//!
//! Delivery is at-least-once: a job whose worker dies mid-run is put back
//! once it is considered stalled.

pub mod client;
pub mod dispatch;
pub mod error;
pub mod worker;

pub use client::JobQueue;
pub use dispatch::PgJobDispatch;
pub use error::QueueError;
pub use worker::{JobFailure, JobHandler, JobOutcome, Worker, WorkerOptions};
