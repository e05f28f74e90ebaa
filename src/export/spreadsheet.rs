use super::{render_error, ExportFormatHandler, COLUMN_HEADERS};
use crate::errors::ContactResult;
use crate::models::Contact;
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};

const SHEET_NAME: &str = "Contacts";

/// Office Open XML workbook with a single "Contacts" sheet.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpreadsheetExporter;

impl ExportFormatHandler for SpreadsheetExporter {
    fn format(&self) -> &'static str {
        "xlsx"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["excel"]
    }

    fn mime_type(&self) -> &'static str {
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    }

    fn render(&self, contacts: &[Contact]) -> ContactResult<Vec<u8>> {
        let mut workbook = Workbook::new();
        fill_sheet(workbook.add_worksheet(), contacts)
            .map_err(|e| render_error(self.format(), e))?;

        workbook
            .save_to_buffer()
            .map_err(|e| render_error(self.format(), e))
    }
}

fn fill_sheet(sheet: &mut Worksheet, contacts: &[Contact]) -> Result<(), XlsxError> {
    sheet.set_name(SHEET_NAME)?;

    let header = Format::new().set_bold();
    for (col, title) in COLUMN_HEADERS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *title, &header)?;
    }

    for (index, contact) in contacts.iter().enumerate() {
        let row = index as u32 + 1;

        if let Some(id) = contact.id {
            sheet.write_number(row, 0, id as f64)?;
        }
        sheet.write_string(row, 1, contact.name.as_str())?;
        sheet.write_string(row, 2, contact.phone.as_str())?;
        sheet.write_string(row, 3, contact.postal_code.as_deref().unwrap_or_default())?;
        sheet.write_string(row, 4, contact.street().unwrap_or_default())?;
        sheet.write_number(row, 5, f64::from(contact.street_number))?;
        sheet.write_string(row, 6, contact.neighborhood().unwrap_or_default())?;
        sheet.write_string(row, 7, contact.city().unwrap_or_default())?;
        sheet.write_string(row, 8, contact.state().unwrap_or_default())?;
    }

    sheet.autofit();
    Ok(())
}
