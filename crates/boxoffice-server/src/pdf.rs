//! A small PDF writer for admission tickets.
//!
//! Emits PDF 1.4 with one A6 page per ticket, text only, in the built-in
//! Helvetica font. Each page carries the validation URL that door staff
//! scan or open.

use std::fmt::Write as _;

use boxoffice_core::{
  Error, Result,
  booking::{Booking, Ticket},
  catalog::Session,
  fulfilment::TicketRenderer,
};
use uuid::Uuid;

/// A6 portrait, in points.
const PAGE_WIDTH: u32 = 298;
const PAGE_HEIGHT: u32 = 420;

/// Fixed objects: catalog, page tree, font.
const CATALOG: usize = 1;
const PAGES: usize = 2;
const FONT: usize = 3;

#[derive(Debug, Clone)]
pub struct PdfTicketRenderer {
  base_url: String,
}

impl PdfTicketRenderer {
  pub fn new(base_url: impl Into<String>) -> Self {
    Self { base_url: base_url.into() }
  }

  /// `<base_url>/api/tickets/validate/<ticket_id>`
  pub fn validation_url(&self, ticket_id: Uuid) -> String {
    format!(
      "{}/api/tickets/validate/{ticket_id}",
      self.base_url.trim_end_matches('/')
    )
  }

  fn page_lines(
    &self,
    booking: &Booking,
    session: &Session,
    ticket: &Ticket,
  ) -> Vec<(u32, String)> {
    vec![
      (18, "ADMIT ONE".to_owned()),
      (14, session.movie_title.clone()),
      (11, format!("Hall: {}", session.hall_name)),
      (11, format!("Starts: {}", session.starts_at.format("%Y-%m-%d %H:%M UTC"))),
      (11, format!("Row {}, Seat {}", ticket.row, ticket.number)),
      (11, format!("Price: {}", session.price)),
      (11, format!("Holder: {}", booking.contact.name)),
      (8, format!("Ticket {}", ticket.ticket_id)),
      (8, format!("Booking {}", booking.booking_id)),
      (7, self.validation_url(ticket.ticket_id)),
    ]
  }
}

/// Escape a string for a PDF literal; non-ASCII becomes `?`.
fn escape(text: &str) -> String {
  let mut out = String::with_capacity(text.len());
  for c in text.chars() {
    match c {
      '(' | ')' | '\\' => {
        out.push('\\');
        out.push(c);
      }
      c if c.is_ascii() && !c.is_ascii_control() => out.push(c),
      _ => out.push('?'),
    }
  }
  out
}

fn content_stream(lines: &[(u32, String)]) -> String {
  let mut out = String::from("BT\n");
  let mut y = PAGE_HEIGHT - 48;
  for (size, text) in lines {
    // Infallible: writing into a String.
    let _ = writeln!(out, "/F1 {size} Tf 1 0 0 1 24 {y} Tm ({}) Tj", escape(text));
    y = y.saturating_sub(size + 12);
  }
  out.push_str("ET");
  out
}

struct PdfWriter {
  buf:     Vec<u8>,
  offsets: Vec<usize>,
}

impl PdfWriter {
  fn new() -> Self {
    let mut buf = Vec::new();
    buf.extend_from_slice(b"%PDF-1.4\n");
    Self { buf, offsets: Vec::new() }
  }

  fn object(&mut self, id: usize, body: &str) {
    debug_assert_eq!(id, self.offsets.len() + 1);
    self.offsets.push(self.buf.len());
    self.buf.extend_from_slice(format!("{id} 0 obj\n{body}\nendobj\n").as_bytes());
  }

  fn finish(mut self) -> Vec<u8> {
    let xref = self.buf.len();
    let mut tail = format!("xref\n0 {}\n0000000000 65535 f \n", self.offsets.len() + 1);
    for offset in &self.offsets {
      let _ = write!(tail, "{offset:010} 00000 n \n");
    }
    let _ = write!(
      tail,
      "trailer\n<< /Size {} /Root {CATALOG} 0 R >>\nstartxref\n{xref}\n%%EOF\n",
      self.offsets.len() + 1
    );
    self.buf.extend_from_slice(tail.as_bytes());
    self.buf
  }
}

impl TicketRenderer for PdfTicketRenderer {
  fn render(&self, booking: &Booking, session: &Session) -> Result<Vec<u8>> {
    if booking.tickets.is_empty() {
      return Err(Error::Collaborator(format!(
        "booking {} has no tickets to render",
        booking.booking_id
      )));
    }

    // Page i uses objects 4 + 2i (page) and 5 + 2i (content).
    let page_id = |i: usize| FONT + 1 + 2 * i;
    let kids = (0..booking.tickets.len())
      .map(|i| format!("{} 0 R", page_id(i)))
      .collect::<Vec<_>>()
      .join(" ");

    let mut pdf = PdfWriter::new();
    pdf.object(CATALOG, &format!("<< /Type /Catalog /Pages {PAGES} 0 R >>"));
    pdf.object(
      PAGES,
      &format!(
        "<< /Type /Pages /Kids [{kids}] /Count {} >>",
        booking.tickets.len()
      ),
    );
    pdf.object(
      FONT,
      "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>",
    );

    for (i, ticket) in booking.tickets.iter().enumerate() {
      let content = content_stream(&self.page_lines(booking, session, ticket));
      pdf.object(
        page_id(i),
        &format!(
          "<< /Type /Page /Parent {PAGES} 0 R /MediaBox [0 0 {PAGE_WIDTH} {PAGE_HEIGHT}] \
           /Resources << /Font << /F1 {FONT} 0 R >> >> /Contents {} 0 R >>",
          page_id(i) + 1
        ),
      );
      pdf.object(
        page_id(i) + 1,
        &format!(
          "<< /Length {} >>\nstream\n{content}\nendstream",
          content.len()
        ),
      );
    }

    Ok(pdf.finish())
  }
}
