//! Nutrition-plan export: plain text laid out on A4 pages in Helvetica.

use printpdf::{BuiltinFont, Mm, PdfDocument};
use thiserror::Error;

pub const PLAN_FILENAME: &str = "nutrition_plan.pdf";

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 10.0;
const LINE_HEIGHT_MM: f32 = 10.0;
const FONT_SIZE_PT: f32 = 12.0;
// Helvetica at 12pt averages roughly 2.1 mm per glyph across 190 mm of text width.
const WRAP_COLUMNS: usize = 90;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("could not render PDF: {0}")]
    Render(String),
}

pub fn render_plan_pdf(text: &str) -> Result<Vec<u8>, PdfError> {
    let (doc, first_page, first_layer) = PdfDocument::new(
        "Nutrition Plan",
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        "Layer 1",
    );
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|err| PdfError::Render(format!("{err:?}")))?;

    let lines = wrap_lines(&to_printable(text), WRAP_COLUMNS);
    let per_page = lines_per_page();
    let mut layer = doc.get_page(first_page).get_layer(first_layer);
    for (idx, line) in lines.iter().enumerate() {
        let slot = idx % per_page;
        if idx > 0 && slot == 0 {
            let (page, page_layer) =
                doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
            layer = doc.get_page(page).get_layer(page_layer);
        }
        if line.is_empty() {
            continue;
        }
        let y = PAGE_HEIGHT_MM - MARGIN_MM - LINE_HEIGHT_MM * (slot as f32 + 1.0);
        layer.use_text(line.as_str(), FONT_SIZE_PT, Mm(MARGIN_MM), Mm(y), &font);
    }

    doc.save_to_bytes()
        .map_err(|err| PdfError::Render(format!("{err:?}")))
}

fn lines_per_page() -> usize {
    ((PAGE_HEIGHT_MM - 2.0 * MARGIN_MM) / LINE_HEIGHT_MM).floor() as usize
}

/// The built-in fonts only cover ASCII reliably.
fn to_printable(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\n' | ' '..='~' => out.push(ch),
            '\t' => out.push_str("    "),
            '\r' => {}
            '\u{2018}' | '\u{2019}' => out.push('\''),
            '\u{201C}' | '\u{201D}' => out.push('"'),
            '\u{2013}' | '\u{2014}' => out.push('-'),
            '\u{2022}' => out.push('*'),
            '\u{2026}' => out.push_str("..."),
            '\u{00A0}' => out.push(' '),
            _ => out.push('?'),
        }
    }
    out
}

fn wrap_lines(text: &str, columns: usize) -> Vec<String> {
    let columns = columns.max(1);
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let mut word = word;
            while word.chars().count() > columns {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                let split = word
                    .char_indices()
                    .nth(columns)
                    .map(|(idx, _)| idx)
                    .unwrap_or(word.len());
                lines.push(word[..split].to_string());
                word = &word[split..];
            }
            if word.is_empty() {
                continue;
            }
            let needed = if current.is_empty() {
                word.chars().count()
            } else {
                current.chars().count() + 1 + word.chars().count()
            };
            if needed > columns && !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
        lines.push(current);
    }
    lines
}
