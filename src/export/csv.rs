use super::{render_error, row_cells, ExportFormatHandler, COLUMN_HEADERS};
use crate::errors::ContactResult;
use crate::models::Contact;

/// Comma-delimited table with the same columns as the spreadsheet.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvExporter;

impl ExportFormatHandler for CsvExporter {
    fn format(&self) -> &'static str {
        "csv"
    }

    fn mime_type(&self) -> &'static str {
        "text/csv"
    }

    fn render(&self, contacts: &[Contact]) -> ContactResult<Vec<u8>> {
        let mut writer = ::csv::Writer::from_writer(Vec::new());

        writer
            .write_record(COLUMN_HEADERS)
            .map_err(|e| render_error(self.format(), e))?;

        for contact in contacts {
            writer
                .write_record(row_cells(contact))
                .map_err(|e| render_error(self.format(), e))?;
        }

        writer
            .into_inner()
            .map_err(|e| render_error(self.format(), e))
    }
}
