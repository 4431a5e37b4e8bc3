//! Confirmation email delivery via SMTP.
//!
//! Configuration comes from the environment; without `SMTP_HOST`,
//! [`EmailConfig::from_env`] returns `None` and confirmations are skipped.

use boxoffice_core::queue::TicketSnapshot;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::format_cents;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),
}

impl EmailError {
    /// Retrying cannot fix a bad address or a malformed message.
    pub fn is_permanent(&self) -> bool {
        !matches!(self, EmailError::Transport(_))
    }
}

// ---------------------------------------------------------------------------
// EmailConfig
// ---------------------------------------------------------------------------

const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_FROM_ADDRESS: &str = "Box Office <tickets@boxoffice.local>";

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub from_address: String,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
}

impl EmailConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable        | Required | Default                                |
    /// |-----------------|----------|----------------------------------------|
    /// | `SMTP_HOST`     | yes      |                                        |
    /// | `SMTP_PORT`     | no       | `587`                                  |
    /// | `SMTP_FROM`     | no       | `Box Office <tickets@boxoffice.local>` |
    /// | `SMTP_USER`     | no       |                                        |
    /// | `SMTP_PASSWORD` | no       |                                        |
    pub fn from_env() -> Option<Self> {
        let smtp_host = std::env::var("SMTP_HOST").ok()?;
        Some(Self {
            smtp_host,
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            from_address: std::env::var("SMTP_FROM")
                .unwrap_or_else(|_| DEFAULT_FROM_ADDRESS.to_string()),
            smtp_user: std::env::var("SMTP_USER").ok(),
            smtp_password: std::env::var("SMTP_PASSWORD").ok(),
        })
    }
}

// ---------------------------------------------------------------------------
// Message content
// ---------------------------------------------------------------------------

/// A file attached to the confirmation.
#[derive(Debug, Clone)]
pub struct TicketAttachment {
    pub filename: String,
    pub bytes: Vec<u8>,
}

pub fn confirmation_subject(snapshot: &TicketSnapshot) -> String {
    format!("Reservation confirmed: {}", snapshot.event.name)
}

/// HTML body of the confirmation email.
pub fn render_confirmation_html(snapshot: &TicketSnapshot, has_attachment: bool) -> String {
    let event = &snapshot.event;
    let location = event.location.as_deref().unwrap_or("To be announced");
    let ticket_note = if has_attachment {
        "Your ticket is attached as a PDF. Present its QR code at the entrance."
    } else {
        "Your ticket PDF is still being prepared. Quote your ticket code at the entrance."
    };

    format!(
        "<html><body>\
         <h1>Your reservation is confirmed</h1>\
         <p>Hello {customer},</p>\
         <p>Thank you for booking with us. Here are your details:</p>\
         <h2>{event_name}</h2>\
         <ul>\
         <li>Date: {date}</li>\
         <li>Location: {location}</li>\
         <li>Price per ticket: {price}</li>\
         </ul>\
         <h2>Reservation #{reservation_id}</h2>\
         <ul>\
         <li>Tickets: {count}</li>\
         <li>Total: {total}</li>\
         <li>Ticket code: <code>{code}</code></li>\
         </ul>\
         <p>{ticket_note}</p>\
         </body></html>",
        customer = escape_html(&snapshot.customer.name),
        event_name = escape_html(&event.name),
        date = event.starts_at.format("%A %d %B %Y, %H:%M UTC"),
        location = escape_html(location),
        price = format_cents(event.price_cents),
        reservation_id = snapshot.reservation_id,
        count = snapshot.ticket_count,
        total = format_cents(snapshot.total_cents),
        code = escape_html(&snapshot.ticket_code),
    )
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Mailer
// ---------------------------------------------------------------------------

/// Sends confirmation emails over one pooled SMTP transport.
pub struct Mailer {
    from_address: String,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl Mailer {
    pub fn new(config: &EmailConfig) -> Result<Self, EmailError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port);

        if let (Some(user), Some(pass)) = (&config.smtp_user, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            from_address: config.from_address.clone(),
            transport: builder.build(),
        })
    }

    /// Assemble the confirmation message without sending it.
    pub fn build_confirmation(
        &self,
        snapshot: &TicketSnapshot,
        attachment: Option<TicketAttachment>,
    ) -> Result<Message, EmailError> {
        let html = render_confirmation_html(snapshot, attachment.is_some());
        let builder = Message::builder()
            .from(self.from_address.parse()?)
            .to(snapshot.customer.email.parse()?)
            .subject(confirmation_subject(snapshot));

        let message = match attachment {
            Some(file) => {
                let pdf = ContentType::parse("application/pdf")
                    .map_err(|e| EmailError::Build(e.to_string()))?;
                builder.multipart(
                    MultiPart::mixed()
                        .singlepart(SinglePart::html(html))
                        .singlepart(Attachment::new(file.filename).body(file.bytes, pdf)),
                )
            }
            None => builder.header(ContentType::TEXT_HTML).body(html),
        };
        message.map_err(|e| EmailError::Build(e.to_string()))
    }

    pub async fn send_confirmation(
        &self,
        snapshot: &TicketSnapshot,
        attachment: Option<TicketAttachment>,
    ) -> Result<(), EmailError> {
        let attached = attachment.is_some();
        let message = self.build_confirmation(snapshot, attachment)?;
        self.transport.send(message).await?;

        tracing::info!(
            reservation_id = snapshot.reservation_id,
            to = %snapshot.customer.email,
            attached,
            "Confirmation email sent",
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use boxoffice_core::queue::{CustomerContact, EventSummary};
    use chrono::{TimeZone, Utc};

    use super::*;

    fn snapshot(email: &str) -> TicketSnapshot {
        TicketSnapshot {
            reservation_id: 12,
            ticket_code: "TKT-12-abc".to_string(),
            ticket_count: 3,
            total_cents: 7_500,
            event: EventSummary {
                id: 2,
                name: "Rock & Roll <Live>".to_string(),
                starts_at: Utc.with_ymd_and_hms(2031, 1, 10, 19, 30, 0).unwrap(),
                location: Some("Main Hall".to_string()),
                price_cents: 2_500,
            },
            customer: CustomerContact {
                id: 5,
                name: "Ada".to_string(),
                email: email.to_string(),
            },
        }
    }

    fn config() -> EmailConfig {
        EmailConfig {
            smtp_host: "localhost".to_string(),
            smtp_port: 2525,
            from_address: DEFAULT_FROM_ADDRESS.to_string(),
            smtp_user: None,
            smtp_password: None,
        }
    }

    #[test]
    fn from_env_returns_none_without_smtp_host() {
        std::env::remove_var("SMTP_HOST");
        assert!(EmailConfig::from_env().is_none());
    }

    #[test]
    fn subject_names_the_event() {
        assert_eq!(
            confirmation_subject(&snapshot("ada@example.com")),
            "Reservation confirmed: Rock & Roll <Live>"
        );
    }

    #[test]
    fn html_escapes_user_content() {
        let html = render_confirmation_html(&snapshot("ada@example.com"), true);
        assert!(html.contains("Rock &amp; Roll &lt;Live&gt;"));
        assert!(html.contains("Reservation #12"));
        assert!(html.contains("Total: 75.00"));
        assert!(html.contains("Main Hall"));
        assert!(html.contains("attached as a PDF"));
    }

    #[test]
    fn html_without_attachment_mentions_ticket_code() {
        let html = render_confirmation_html(&snapshot("ada@example.com"), false);
        assert!(html.contains("still being prepared"));
        assert!(html.contains("TKT-12-abc"));
    }

    #[tokio::test]
    async fn builds_message_with_pdf_attachment() {
        let mailer = Mailer::new(&config()).unwrap();
        let message = mailer
            .build_confirmation(
                &snapshot("ada@example.com"),
                Some(TicketAttachment {
                    filename: "ticket-12.pdf".to_string(),
                    bytes: b"%PDF-1.3".to_vec(),
                }),
            )
            .unwrap();

        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("multipart/mixed"));
        assert!(raw.contains("ticket-12.pdf"));
    }

    #[tokio::test]
    async fn bad_recipient_is_permanent() {
        let mailer = Mailer::new(&config()).unwrap();
        let err = mailer
            .build_confirmation(&snapshot("not-an-email"), None)
            .unwrap_err();
        assert!(matches!(err, EmailError::Address(_)));
        assert!(err.is_permanent());
    }

    #[test]
    fn email_error_display_build() {
        let err = EmailError::Build("missing body".to_string());
        assert_eq!(err.to_string(), "Email build error: missing body");
    }
}
