//! Contact export formats.
//!
//! Each format is an [`ExportFormatHandler`] registered once into an
//! [`ExportRegistry`]; adding a format does not touch the orchestrator.

mod csv;
mod pdf;
mod spreadsheet;

pub use self::csv::CsvExporter;
pub use self::pdf::PdfExporter;
pub use self::spreadsheet::SpreadsheetExporter;

use crate::errors::{ContactError, ContactResult};
use crate::models::{Contact, ExportedFile};
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;

/// Column titles shared by the tabular formats.
pub const COLUMN_HEADERS: [&str; 9] = [
    "ID",
    "Name",
    "Phone",
    "Postal Code",
    "Street",
    "Number",
    "Neighborhood",
    "City",
    "State",
];

/// One rendering strategy.
pub trait ExportFormatHandler: Send + Sync {
    /// Canonical token, lower-case (e.g. `xlsx`).
    fn format(&self) -> &'static str;

    /// Extra tokens accepted for this format.
    fn aliases(&self) -> &'static [&'static str] {
        &[]
    }

    fn mime_type(&self) -> &'static str;

    fn filename(&self) -> String {
        format!("contacts.{}", self.format())
    }

    /// Renders the contacts in the given order.
    fn render(&self, contacts: &[Contact]) -> ContactResult<Vec<u8>>;
}

/// Case-insensitive lookup table of export handlers.
#[derive(Clone, Default)]
pub struct ExportRegistry {
    handlers: HashMap<String, Arc<dyn ExportFormatHandler>>,
}

impl ExportRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the spreadsheet, PDF and CSV handlers.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(SpreadsheetExporter);
        registry.register(PdfExporter);
        registry.register(CsvExporter);
        registry
    }

    /// Registers a handler under its token and aliases, replacing any previous owner.
    pub fn register<H>(&mut self, handler: H)
    where
        H: ExportFormatHandler + 'static,
    {
        let handler: Arc<dyn ExportFormatHandler> = Arc::new(handler);
        let tokens = std::iter::once(handler.format()).chain(handler.aliases().iter().copied());
        for token in tokens {
            self.handlers
                .insert(token.to_ascii_lowercase(), Arc::clone(&handler));
        }
    }

    pub fn select(&self, token: &str) -> ContactResult<Arc<dyn ExportFormatHandler>> {
        self.handlers
            .get(&token.trim().to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| ContactError::UnsupportedExportFormat(token.to_string()))
    }

    pub fn export(&self, token: &str, contacts: &[Contact]) -> ContactResult<ExportedFile> {
        let handler = self.select(token)?;
        render_with(handler.as_ref(), contacts)
    }

    /// Canonical tokens, sorted.
    pub fn formats(&self) -> Vec<&'static str> {
        let mut formats: Vec<_> = self.handlers.values().map(|h| h.format()).collect();
        formats.sort_unstable();
        formats.dedup();
        formats
    }
}

/// Renders through an already selected handler.
pub fn render_with(
    handler: &dyn ExportFormatHandler,
    contacts: &[Contact],
) -> ContactResult<ExportedFile> {
    let data = handler.render(contacts)?;
    tracing::info!(
        "Exported {} contacts as {} ({} bytes)",
        contacts.len(),
        handler.format(),
        data.len()
    );
    Ok(ExportedFile {
        data,
        filename: handler.filename(),
        content_type: handler.mime_type().to_string(),
    })
}

/// Cell values of one contact, in [`COLUMN_HEADERS`] order. Missing values are empty.
pub(crate) fn row_cells(contact: &Contact) -> [String; 9] {
    [
        contact.id.map(|id| id.to_string()).unwrap_or_default(),
        contact.name.clone(),
        contact.phone.clone(),
        contact.postal_code.clone().unwrap_or_default(),
        contact.street().unwrap_or_default().to_string(),
        contact.street_number.to_string(),
        contact.neighborhood().unwrap_or_default().to_string(),
        contact.city().unwrap_or_default().to_string(),
        contact.state().unwrap_or_default().to_string(),
    ]
}

pub(crate) fn render_error(format: &str, err: impl Display) -> ContactError {
    tracing::error!("Error generating {} export: {}", format, err);
    ContactError::Render {
        format: format.to_string(),
        message: err.to_string(),
    }
}
