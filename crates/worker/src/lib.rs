//! Background consumers for the ticket queues.
//!
//! - [`artifact`]: PDF tickets with a QR code.
//! - [`mailer`]: SMTP confirmation emails.
//! - [`handlers`]: the [`boxoffice_queue::JobHandler`]s wiring both to their queues.

pub mod artifact;
pub mod config;
pub mod handlers;
pub mod mailer;

/// Render integer cents as `12.50`.
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}
