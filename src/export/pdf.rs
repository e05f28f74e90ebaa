use super::{render_error, row_cells, ExportFormatHandler};
use crate::errors::ContactResult;
use crate::models::Contact;
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference};

const TITLE: &str = "Contact List";
const HEADERS: [&str; 9] = ["ID", "Name", "Phone", "CEP", "Street", "No.", "Neighb.", "City", "UF"];

// A4 landscape, in millimetres.
const PAGE_WIDTH: f32 = 297.0;
const PAGE_HEIGHT: f32 = 210.0;
const MARGIN: f32 = 12.0;
const ROW_HEIGHT: f32 = 7.0;
const COLUMN_WIDTHS: [f32; 9] = [12.0, 48.0, 28.0, 20.0, 56.0, 14.0, 38.0, 40.0, 12.0];

const TITLE_SIZE: f32 = 16.0;
const HEADER_SIZE: f32 = 9.0;
const CELL_SIZE: f32 = 8.0;
/// Average Helvetica glyph width at 8pt.
const CHAR_WIDTH_MM: f32 = 1.6;

/// Printable A4 landscape table.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfExporter;

impl ExportFormatHandler for PdfExporter {
    fn format(&self) -> &'static str {
        "pdf"
    }

    fn mime_type(&self) -> &'static str {
        "application/pdf"
    }

    fn render(&self, contacts: &[Contact]) -> ContactResult<Vec<u8>> {
        let (doc, page, layer) =
            PdfDocument::new(TITLE, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");

        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| render_error(self.format(), e))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| render_error(self.format(), e))?;

        let mut layer = doc.get_page(page).get_layer(layer);
        layer.use_text(TITLE, TITLE_SIZE, Mm(MARGIN), Mm(PAGE_HEIGHT - MARGIN - 4.0), &bold);
        let mut y = PAGE_HEIGHT - MARGIN - 16.0;
        draw_row(&layer, &HEADERS.map(String::from), y, HEADER_SIZE, &bold);

        for contact in contacts {
            y -= ROW_HEIGHT;
            if y < MARGIN {
                layer = new_page(&doc);
                y = PAGE_HEIGHT - MARGIN - 4.0;
                draw_row(&layer, &HEADERS.map(String::from), y, HEADER_SIZE, &bold);
                y -= ROW_HEIGHT;
            }
            draw_row(&layer, &row_cells(contact), y, CELL_SIZE, &regular);
        }

        doc.save_to_bytes()
            .map_err(|e| render_error(self.format(), e))
    }
}

fn new_page(doc: &PdfDocumentReference) -> PdfLayerReference {
    let (page, layer) = doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
    doc.get_page(page).get_layer(layer)
}

fn draw_row(
    layer: &PdfLayerReference,
    cells: &[String; 9],
    y: f32,
    size: f32,
    font: &IndirectFontRef,
) {
    let mut x = MARGIN;
    for (cell, width) in cells.iter().zip(COLUMN_WIDTHS) {
        layer.use_text(fit_to_width(cell, width), size, Mm(x), Mm(y), font);
        x += width;
    }
}

/// Truncates `text` so it fits a column of `width` millimetres.
fn fit_to_width(text: &str, width: f32) -> String {
    let max_chars = ((width - 1.0) / CHAR_WIDTH_MM).floor().max(1.0) as usize;
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept)
}
