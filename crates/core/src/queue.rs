//! Contracts between the reservation workflow and the background queues.
//!
//! Producers and consumers share these names and payload shapes; the
//! transport lives in `boxoffice-queue`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::{Cents, DbId, Timestamp};

/// Queue for PDF + QR ticket artifacts.
pub const TICKET_ARTIFACT_QUEUE: &str = "ticket_artifacts";

/// Queue for confirmation emails.
pub const CONFIRMATION_QUEUE: &str = "confirmations";

/// Job name on [`TICKET_ARTIFACT_QUEUE`].
pub const RENDER_ARTIFACT_JOB: &str = "render-ticket-artifact";

/// Job name on [`CONFIRMATION_QUEUE`].
pub const SEND_CONFIRMATION_JOB: &str = "send-confirmation";

/// All queues known to the platform.
pub const KNOWN_QUEUES: [&str; 2] = [TICKET_ARTIFACT_QUEUE, CONFIRMATION_QUEUE];

pub fn is_known_queue(name: &str) -> bool {
    KNOWN_QUEUES.contains(&name)
}

/// Default number of attempts per job (first run included).
pub const DEFAULT_MAX_ATTEMPTS: i32 = 3;

/// Default base delay for exponential backoff.
pub const DEFAULT_BACKOFF_BASE_MS: i64 = 1_000;

/// Upper bound on a single backoff delay.
const MAX_BACKOFF_MS: i64 = 60 * 60 * 1_000;

/// Retry policy attached to a job when it is enqueued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobOptions {
    pub max_attempts: i32,
    pub backoff_ms: i64,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_ms: DEFAULT_BACKOFF_BASE_MS,
        }
    }
}

impl JobOptions {
    /// Delay before the retry that follows failed attempt number `attempt`
    /// (1-based): `backoff_ms * 2^(attempt - 1)`.
    pub fn delay_for(&self, attempt: i32) -> Duration {
        let exp = attempt.saturating_sub(1).clamp(0, 20) as u32;
        let ms = self
            .backoff_ms
            .max(0)
            .saturating_mul(1_i64 << exp)
            .min(MAX_BACKOFF_MS);
        Duration::from_millis(ms as u64)
    }

    /// Whether another attempt is allowed after `attempts_made` runs.
    pub fn can_retry(&self, attempts_made: i32) -> bool {
        attempts_made < self.max_attempts
    }
}

/// Event fields a ticket needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSummary {
    pub id: DbId,
    pub name: String,
    pub starts_at: Timestamp,
    pub location: Option<String>,
    pub price_cents: Cents,
}

/// Who the ticket is for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerContact {
    pub id: DbId,
    pub name: String,
    pub email: String,
}

/// Everything needed to render and deliver a ticket without another query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketSnapshot {
    pub reservation_id: DbId,
    pub ticket_code: String,
    pub ticket_count: i32,
    pub total_cents: Cents,
    pub event: EventSummary,
    pub customer: CustomerContact,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketJobKind {
    RenderArtifact,
    SendConfirmation,
}

impl TicketJobKind {
    pub fn queue(self) -> &'static str {
        match self {
            TicketJobKind::RenderArtifact => TICKET_ARTIFACT_QUEUE,
            TicketJobKind::SendConfirmation => CONFIRMATION_QUEUE,
        }
    }

    pub fn job_name(self) -> &'static str {
        match self {
            TicketJobKind::RenderArtifact => RENDER_ARTIFACT_JOB,
            TicketJobKind::SendConfirmation => SEND_CONFIRMATION_JOB,
        }
    }
}

/// A unit of outbound work produced by a confirmed reservation.
#[derive(Debug, Clone, PartialEq)]
pub struct TicketJob {
    pub kind: TicketJobKind,
    pub snapshot: TicketSnapshot,
}

impl TicketJob {
    /// The two jobs every confirmed reservation fans out to.
    pub fn fan_out(snapshot: TicketSnapshot) -> [TicketJob; 2] {
        [
            TicketJob {
                kind: TicketJobKind::RenderArtifact,
                snapshot: snapshot.clone(),
            },
            TicketJob {
                kind: TicketJobKind::SendConfirmation,
                snapshot,
            },
        ]
    }
}

/// File name of the PDF artifact for a reservation.
pub fn artifact_file_name(reservation_id: DbId) -> String {
    format!("ticket-{reservation_id}.pdf")
}
