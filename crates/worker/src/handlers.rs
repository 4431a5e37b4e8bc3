//! Queue handlers for the two ticket queues.
//!
//! Both decode a [`TicketSnapshot`] from the job payload. A payload that does
//! not decode fails permanently; retrying would not change it.

use std::path::PathBuf;

use async_trait::async_trait;
use boxoffice_core::queue::TicketSnapshot;
use boxoffice_db::models::queue_job::QueueJob;
use boxoffice_queue::{JobFailure, JobHandler};
use serde_json::json;

use crate::artifact::{ArtifactError, TicketRenderer};
use crate::mailer::{Mailer, TicketAttachment};

fn decode_snapshot(job: &QueueJob) -> Result<TicketSnapshot, JobFailure> {
    serde_json::from_value(job.payload.clone())
        .map_err(|e| JobFailure::permanent(format!("Invalid ticket payload: {e}")))
}

// ---------------------------------------------------------------------------
// Artifacts
// ---------------------------------------------------------------------------

/// Renders the ticket PDF for a confirmed reservation.
pub struct ArtifactHandler {
    renderer: TicketRenderer,
}

impl ArtifactHandler {
    pub fn new(renderer: TicketRenderer) -> Self {
        Self { renderer }
    }
}

#[async_trait]
impl JobHandler for ArtifactHandler {
    async fn handle(&self, job: &QueueJob) -> Result<serde_json::Value, JobFailure> {
        let snapshot = decode_snapshot(job)?;

        let stored = self.renderer.write(&snapshot).await.map_err(|e| match e {
            // The payload text itself cannot be encoded.
            ArtifactError::Qr(_) => JobFailure::permanent(e.to_string()),
            _ => JobFailure::retryable(e.to_string()),
        })?;

        tracing::info!(
            job_id = job.id,
            reservation_id = snapshot.reservation_id,
            path = %stored.path.display(),
            "Ticket artifact written",
        );

        Ok(json!({
            "filename": stored.filename,
            "path": stored.path.to_string_lossy(),
            "reservation_id": snapshot.reservation_id,
        }))
    }
}

// ---------------------------------------------------------------------------
// Confirmations
// ---------------------------------------------------------------------------

/// Emails the reservation confirmation, attaching the ticket when it exists.
pub struct ConfirmationHandler {
    mailer: Option<Mailer>,
    tickets: TicketRenderer,
}

impl ConfirmationHandler {
    /// `mailer` is `None` when SMTP is not configured.
    pub fn new(mailer: Option<Mailer>, tickets: TicketRenderer) -> Self {
        Self { mailer, tickets }
    }

    async fn load_attachment(&self, reservation_id: i64) -> Option<TicketAttachment> {
        let path: PathBuf = self.tickets.path_for(reservation_id);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Some(TicketAttachment {
                filename: path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                bytes,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Could not read ticket artifact");
                None
            }
        }
    }
}

#[async_trait]
impl JobHandler for ConfirmationHandler {
    async fn handle(&self, job: &QueueJob) -> Result<serde_json::Value, JobFailure> {
        let snapshot = decode_snapshot(job)?;

        let Some(mailer) = &self.mailer else {
            tracing::info!(
                job_id = job.id,
                reservation_id = snapshot.reservation_id,
                to = %snapshot.customer.email,
                "SMTP not configured, skipping confirmation email",
            );
            return Ok(json!({
                "delivered": false,
                "reservation_id": snapshot.reservation_id,
            }));
        };

        let attachment = self.load_attachment(snapshot.reservation_id).await;
        let attached = attachment.is_some();

        mailer
            .send_confirmation(&snapshot, attachment)
            .await
            .map_err(|e| {
                if e.is_permanent() {
                    JobFailure::permanent(e.to_string())
                } else {
                    JobFailure::retryable(e.to_string())
                }
            })?;

        Ok(json!({
            "delivered": true,
            "reservation_id": snapshot.reservation_id,
            "to": snapshot.customer.email,
            "attached": attached,
        }))
    }
}
