//! Printable ticket artifacts.
//!
//! A ticket is a single A4 page with the event and reservation details and a
//! QR code drawn as filled squares, so no image codec is needed.

use std::path::{Path, PathBuf};

use boxoffice_core::queue::{artifact_file_name, TicketSnapshot};
use printpdf::{BuiltinFont, Color, Greyscale, IndirectFontRef, Mm, PdfDocument, PdfLayerReference, Rect};
use qrcode::QrCode;

const PAGE_WIDTH: Mm = Mm(210.0);
const PAGE_HEIGHT: Mm = Mm(297.0);
const MARGIN_X: f32 = 20.0;
const LINE_HEIGHT: f32 = 8.0;

/// Side of the QR code including its quiet zone, in millimetres.
const QR_SIZE: f32 = 60.0;
/// Quiet zone around the QR code, in modules.
const QR_QUIET_ZONE: usize = 4;

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("QR encoding failed: {0}")]
    Qr(#[from] qrcode::types::QrError),

    #[error("PDF rendering failed: {0}")]
    Pdf(String),

    #[error("Writing ticket file failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Render task failed: {0}")]
    Task(String),
}

/// A ticket written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArtifact {
    pub filename: String,
    pub path: PathBuf,
}

/// Text encoded in a ticket's QR code.
pub fn qr_payload(snapshot: &TicketSnapshot) -> String {
    format!(
        "Reservation: {}\nEvent: {}\nCustomer: {}\nTickets: {}",
        snapshot.reservation_id, snapshot.event.name, snapshot.customer.name, snapshot.ticket_count
    )
}

/// Render the ticket PDF for `snapshot`.
pub fn render_ticket(snapshot: &TicketSnapshot) -> Result<Vec<u8>, ArtifactError> {
    let qr = QrCode::new(qr_payload(snapshot).as_bytes())?;

    let (doc, page, layer) = PdfDocument::new(
        format!("Ticket {}", snapshot.ticket_code),
        PAGE_WIDTH,
        PAGE_HEIGHT,
        "Ticket",
    );
    let layer = doc.get_page(page).get_layer(layer);
    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| ArtifactError::Pdf(e.to_string()))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| ArtifactError::Pdf(e.to_string()))?;

    layer.set_fill_color(Color::Greyscale(Greyscale::new(0.0, None)));
    layer.use_text("Box Office", 22.0, Mm(MARGIN_X), Mm(270.0), &bold);
    layer.use_text("Admission ticket", 14.0, Mm(MARGIN_X), Mm(260.0), &regular);

    let event = &snapshot.event;
    let mut y = 240.0;
    for line in [
        format!("Event: {}", event.name),
        format!("Date: {}", event.starts_at.format("%Y-%m-%d %H:%M UTC")),
        format!(
            "Location: {}",
            event.location.as_deref().unwrap_or("To be announced")
        ),
        format!("Price per ticket: {}", crate::format_cents(event.price_cents)),
    ] {
        write_line(&layer, &regular, &line, y);
        y -= LINE_HEIGHT;
    }

    y -= LINE_HEIGHT;
    for line in [
        format!("Reservation number: {}", snapshot.reservation_id),
        format!("Tickets: {}", snapshot.ticket_count),
        format!("Total: {}", crate::format_cents(snapshot.total_cents)),
        format!("Ticket code: {}", snapshot.ticket_code),
    ] {
        write_line(&layer, &regular, &line, y);
        y -= LINE_HEIGHT;
    }

    let qr_bottom = y - LINE_HEIGHT - QR_SIZE;
    draw_qr(&layer, &qr, MARGIN_X, qr_bottom);

    layer.use_text(
        "Present this code at the entrance.",
        10.0,
        Mm(MARGIN_X),
        Mm(qr_bottom - LINE_HEIGHT),
        &regular,
    );

    doc.save_to_bytes()
        .map_err(|e| ArtifactError::Pdf(e.to_string()))
}

fn write_line(layer: &PdfLayerReference, font: &IndirectFontRef, text: &str, y: f32) {
    layer.use_text(text, 12.0, Mm(MARGIN_X), Mm(y), font);
}

/// Fill one rectangle per horizontal run of dark modules.
fn draw_qr(layer: &PdfLayerReference, qr: &QrCode, left: f32, bottom: f32) {
    let width = qr.width();
    let module = QR_SIZE / (width + 2 * QR_QUIET_ZONE) as f32;
    let colors = qr.to_colors();
    let origin_x = left + QR_QUIET_ZONE as f32 * module;
    let top = bottom + QR_SIZE - QR_QUIET_ZONE as f32 * module;

    for (row, cells) in colors.chunks(width).enumerate() {
        let y_top = top - row as f32 * module;
        let mut col = 0;
        while col < width {
            if cells[col] != qrcode::Color::Dark {
                col += 1;
                continue;
            }
            let start = col;
            while col < width && cells[col] == qrcode::Color::Dark {
                col += 1;
            }
            layer.add_rect(Rect::new(
                Mm(origin_x + start as f32 * module),
                Mm(y_top - module),
                Mm(origin_x + col as f32 * module),
                Mm(y_top),
            ));
        }
    }
}

/// Writes rendered tickets to a directory.
#[derive(Debug, Clone)]
pub struct TicketRenderer {
    dir: PathBuf,
}

impl TicketRenderer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where the ticket for `reservation_id` lives once rendered.
    pub fn path_for(&self, reservation_id: i64) -> PathBuf {
        self.dir.join(artifact_file_name(reservation_id))
    }

    /// Render off the async runtime and write the file, replacing any
    /// earlier copy.
    pub async fn write(&self, snapshot: &TicketSnapshot) -> Result<StoredArtifact, ArtifactError> {
        let owned = snapshot.clone();
        let bytes = tokio::task::spawn_blocking(move || render_ticket(&owned))
            .await
            .map_err(|e| ArtifactError::Task(e.to_string()))??;

        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(snapshot.reservation_id);
        tokio::fs::write(&path, &bytes).await?;

        Ok(StoredArtifact {
            filename: artifact_file_name(snapshot.reservation_id),
            path,
        })
    }
}

#[cfg(test)]
mod tests {
    use boxoffice_core::queue::{CustomerContact, EventSummary};
    use chrono::{TimeZone, Utc};

    use super::*;

    fn snapshot() -> TicketSnapshot {
        TicketSnapshot {
            reservation_id: 31,
            ticket_code: "TKT-31-0123456789abcdef0123456789abcdef".to_string(),
            ticket_count: 2,
            total_cents: 5_000,
            event: EventSummary {
                id: 4,
                name: "Jazz Night".to_string(),
                starts_at: Utc.with_ymd_and_hms(2030, 5, 17, 20, 0, 0).unwrap(),
                location: None,
                price_cents: 2_500,
            },
            customer: CustomerContact {
                id: 8,
                name: "Grace Hopper".to_string(),
                email: "grace@example.com".to_string(),
            },
        }
    }

    #[test]
    fn qr_payload_identifies_booking() {
        assert_eq!(
            qr_payload(&snapshot()),
            "Reservation: 31\nEvent: Jazz Night\nCustomer: Grace Hopper\nTickets: 2"
        );
    }

    #[test]
    fn renders_a_pdf_document() {
        let bytes = render_ticket(&snapshot()).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn writes_ticket_named_after_reservation() {
        let dir = std::env::temp_dir().join(format!("boxoffice-tickets-{}", std::process::id()));
        let renderer = TicketRenderer::new(&dir);

        let stored = renderer.write(&snapshot()).await.unwrap();

        assert_eq!(stored.filename, "ticket-31.pdf");
        assert_eq!(stored.path, dir.join("ticket-31.pdf"));
        assert!(tokio::fs::metadata(&stored.path).await.unwrap().len() > 0);
        let _ = tokio::fs::remove_dir_all(&dir).await;
    }
}
