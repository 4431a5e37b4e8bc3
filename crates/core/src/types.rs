/// Primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// Timestamps are stored and compared in UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Money is kept as integer cents; there is no currency conversion.
pub type Cents = i64;
