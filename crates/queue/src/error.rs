use boxoffice_core::types::DbId;

/// Errors raised by queue producers and admin operations.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Unknown queue '{0}'")]
    UnknownQueue(String),

    #[error("Job {id} not found in queue '{queue}'")]
    JobNotFound { queue: String, id: DbId },

    #[error("Job {id} cannot be {action} in its current state")]
    InvalidJobState { id: DbId, action: &'static str },

    #[error("Payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}
