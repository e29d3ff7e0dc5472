//! Cursor-driven page layout on top of printpdf
//!
//! Content is drawn top to bottom. Every drawing call reserves the height it
//! needs first and starts a new page when the current one is full, so the
//! generators never deal with coordinates or page breaks themselves.

use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference, Point, Rgb,
};

use super::PdfError;

pub const PAGE_WIDTH: f32 = 210.0;
pub const PAGE_HEIGHT: f32 = 297.0;
pub const MARGIN: f32 = 18.0;
pub const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;

const TOP: f32 = PAGE_HEIGHT - 20.0;
const BOTTOM: f32 = 22.0;
const FOOTER_Y: f32 = 10.0;
const LAYER_NAME: &str = "Content";

const PT_TO_MM: f32 = 0.352_778;
const LINE_SPACING: f32 = 1.45;

pub const TITLE_SIZE: f32 = 22.0;
pub const HEADING_SIZE: f32 = 13.0;
pub const BODY_SIZE: f32 = 10.0;
pub const SMALL_SIZE: f32 = 8.0;

fn ink() -> Color {
    Color::Rgb(Rgb::new(0.10, 0.12, 0.16, None))
}

fn muted() -> Color {
    Color::Rgb(Rgb::new(0.42, 0.45, 0.50, None))
}

fn accent() -> Color {
    Color::Rgb(Rgb::new(0.91, 0.42, 0.09, None))
}

fn rule_grey() -> Color {
    Color::Rgb(Rgb::new(0.80, 0.82, 0.85, None))
}

/// Reduce text to what the built-in Helvetica encoding can show
pub fn printable(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            ' '..='~' => out.push(c),
            '\u{2013}' | '\u{2014}' | '\u{2212}' => out.push('-'),
            '\u{2018}' | '\u{2019}' => out.push('\''),
            '\u{201C}' | '\u{201D}' => out.push('"'),
            '\u{2026}' => out.push_str("..."),
            '\u{2022}' => out.push('*'),
            '\t' | '\n' | '\r' => out.push(' '),
            _ => out.push('?'),
        }
    }
    out
}

/// Estimated advance of one character, in ems
fn char_em(c: char) -> f32 {
    match c {
        'i' | 'j' | 'l' | '.' | ',' | '\'' | '!' | '|' | ':' | ';' => 0.28,
        'f' | 't' | 'r' | ' ' | '(' | ')' | '-' | '/' => 0.33,
        'm' | 'w' | 'M' | 'W' => 0.83,
        'A'..='Z' => 0.67,
        '0'..='9' => 0.556,
        _ => 0.5,
    }
}

/// Estimated rendered width of `text` in millimetres
pub fn text_width(text: &str, size: f32, bold: bool) -> f32 {
    let ems: f32 = text.chars().map(char_em).sum();
    let factor = if bold { 1.06 } else { 1.0 };
    ems * size * PT_TO_MM * factor
}

pub fn line_height(size: f32) -> f32 {
    size * PT_TO_MM * LINE_SPACING
}

/// Cut `text` so it fits `width`, marking the cut with `...`
pub fn fit(text: &str, width: f32, size: f32, bold: bool) -> String {
    let text = printable(text);
    if text_width(&text, size, bold) <= width {
        return text;
    }
    let budget = width - text_width("...", size, bold);
    let mut out = String::new();
    let mut used = 0.0;
    for c in text.chars() {
        let w = char_em(c) * size * PT_TO_MM * if bold { 1.06 } else { 1.0 };
        if used + w > budget {
            break;
        }
        used += w;
        out.push(c);
    }
    out.push_str("...");
    out
}

/// Greedy word wrap; words wider than a line are split
pub fn wrap(text: &str, width: f32, size: f32) -> Vec<String> {
    let text = printable(text);
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if text_width(&candidate, size, false) <= width {
            current = candidate;
            continue;
        }
        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if text_width(word, size, false) <= width {
            current = word.to_string();
        } else {
            let mut chunk = String::new();
            for c in word.chars() {
                chunk.push(c);
                if text_width(&chunk, size, false) > width {
                    chunk.pop();
                    lines.push(std::mem::take(&mut chunk));
                    chunk.push(c);
                }
            }
            current = chunk;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Table column: header text and width in millimetres
#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub header: &'static str,
    pub width: f32,
}

impl Column {
    pub const fn new(header: &'static str, width: f32) -> Self {
        Self { header, width }
    }
}

/// One signature on a sign-off block
#[derive(Debug, Clone)]
pub struct SignatureLine<'a> {
    pub name: &'a str,
    pub title: &'a str,
    pub signed_at: &'a str,
    pub fingerprint: &'a str,
}

pub struct PdfCanvas {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    y: f32,
    page: usize,
    footer: String,
}

impl PdfCanvas {
    /// Start an A4 document; `footer` is printed on every page
    pub fn new(title: &str, footer: &str) -> Result<Self, PdfError> {
        let (doc, page, layer) = PdfDocument::new(
            printable(title),
            Mm(PAGE_WIDTH),
            Mm(PAGE_HEIGHT),
            LAYER_NAME.to_string(),
        );
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| PdfError::Font(format!("{e:?}")))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| PdfError::Font(format!("{e:?}")))?;
        let layer = doc.get_page(page).get_layer(layer);

        let mut canvas = Self {
            doc,
            layer,
            regular,
            bold,
            y: TOP,
            page: 1,
            footer: printable(footer),
        };
        canvas.draw_footer();
        Ok(canvas)
    }

    pub fn page_count(&self) -> usize {
        self.page
    }

    pub fn new_page(&mut self) {
        let (page, layer) = self
            .doc
            .add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), LAYER_NAME.to_string());
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.page += 1;
        self.y = TOP;
        self.draw_footer();
    }

    /// Break the page unless `height` millimetres still fit
    pub fn ensure_space(&mut self, height: f32) {
        if self.y - height < BOTTOM {
            self.new_page();
        }
    }

    fn text_at(&self, text: &str, size: f32, x: f32, y: f32, bold: bool, color: Color) {
        let font = if bold { &self.bold } else { &self.regular };
        self.layer.set_fill_color(color);
        self.layer.use_text(printable(text), size, Mm(x), Mm(y), font);
    }

    fn hline(&self, x1: f32, x2: f32, y: f32, thickness: f32, color: Color) {
        self.layer.set_outline_color(color);
        self.layer.set_outline_thickness(thickness);
        self.layer.add_line(Line {
            points: vec![
                (Point::new(Mm(x1), Mm(y)), false),
                (Point::new(Mm(x2), Mm(y)), false),
            ],
            is_closed: false,
        });
    }

    fn draw_footer(&self) {
        self.hline(MARGIN, PAGE_WIDTH - MARGIN, FOOTER_Y + 4.0, 0.5, rule_grey());
        self.text_at(&self.footer, SMALL_SIZE, MARGIN, FOOTER_Y, false, muted());
        let label = format!("Page {}", self.page);
        let x = PAGE_WIDTH - MARGIN - text_width(&label, SMALL_SIZE, false);
        self.text_at(&label, SMALL_SIZE, x, FOOTER_Y, false, muted());
    }

    /// Accent band with a large title and a muted subtitle
    pub fn header_band(&mut self, title: &str, subtitle: &str) {
        self.ensure_space(30.0);
        self.hline(MARGIN, PAGE_WIDTH - MARGIN, self.y, 6.0, accent());
        self.y -= 12.0;
        for line in wrap(title, CONTENT_WIDTH, TITLE_SIZE) {
            self.text_at(&line, TITLE_SIZE, MARGIN, self.y, true, ink());
            self.y -= line_height(TITLE_SIZE);
        }
        if !subtitle.is_empty() {
            self.text_at(subtitle, BODY_SIZE + 1.0, MARGIN, self.y, false, muted());
            self.y -= line_height(BODY_SIZE + 1.0);
        }
        self.y -= 4.0;
    }

    pub fn heading(&mut self, text: &str) {
        self.ensure_space(line_height(HEADING_SIZE) + 12.0);
        self.y -= 4.0;
        self.text_at(text, HEADING_SIZE, MARGIN, self.y, true, ink());
        self.y -= 2.5;
        self.hline(MARGIN, PAGE_WIDTH - MARGIN, self.y, 0.75, accent());
        self.y -= line_height(BODY_SIZE);
    }

    pub fn paragraph(&mut self, text: &str) {
        self.paragraph_sized(text, BODY_SIZE, false);
    }

    pub fn note(&mut self, text: &str) {
        self.paragraph_sized(text, SMALL_SIZE, true);
    }

    fn paragraph_sized(&mut self, text: &str, size: f32, is_muted: bool) {
        let color = if is_muted { muted() } else { ink() };
        for line in wrap(text, CONTENT_WIDTH, size) {
            self.ensure_space(line_height(size));
            self.text_at(&line, size, MARGIN, self.y, false, color.clone());
            self.y -= line_height(size);
        }
        self.y -= 1.5;
    }

    /// Label/value pairs in two columns; long values wrap
    pub fn key_values(&mut self, pairs: &[(&str, String)]) {
        let label_width = 45.0;
        let value_width = CONTENT_WIDTH - label_width;
        for (label, value) in pairs {
            let lines = wrap(value, value_width, BODY_SIZE);
            let lines = if lines.is_empty() { vec!["-".to_string()] } else { lines };
            self.ensure_space(line_height(BODY_SIZE) * lines.len() as f32);
            self.text_at(label, BODY_SIZE, MARGIN, self.y, true, muted());
            for line in lines {
                self.text_at(&line, BODY_SIZE, MARGIN + label_width, self.y, false, ink());
                self.y -= line_height(BODY_SIZE);
            }
        }
        self.y -= 2.0;
    }

    fn table_header(&mut self, columns: &[Column]) {
        let mut x = MARGIN;
        for column in columns {
            let label = fit(column.header, column.width - 1.5, SMALL_SIZE, true);
            self.text_at(&label, SMALL_SIZE, x, self.y, true, muted());
            x += column.width;
        }
        self.y -= 2.0;
        self.hline(MARGIN, PAGE_WIDTH - MARGIN, self.y, 0.75, ink());
        self.y -= line_height(SMALL_SIZE);
    }

    /// Table with a header row repeated after every page break
    ///
    /// Cells are cut to their column width.
    pub fn table(&mut self, columns: &[Column], rows: &[Vec<String>]) {
        let row_height = line_height(SMALL_SIZE) + 1.2;
        self.ensure_space(row_height * 3.0);
        self.table_header(columns);

        if rows.is_empty() {
            self.text_at("No records.", SMALL_SIZE, MARGIN, self.y, false, muted());
            self.y -= row_height;
            return;
        }

        for row in rows {
            if self.y - row_height < BOTTOM {
                self.new_page();
                self.table_header(columns);
            }
            let mut x = MARGIN;
            for (column, cell) in columns.iter().zip(row) {
                let text = fit(cell, column.width - 1.5, SMALL_SIZE, false);
                self.text_at(&text, SMALL_SIZE, x, self.y, false, ink());
                x += column.width;
            }
            self.hline(MARGIN, PAGE_WIDTH - MARGIN, self.y - 1.6, 0.25, rule_grey());
            self.y -= row_height;
        }
        self.y -= 3.0;
    }

    /// Chronological entries: a bold timestamp with the entry text beside it
    pub fn timeline(&mut self, entries: &[(String, String)]) {
        let time_width = 38.0;
        if entries.is_empty() {
            self.note("No activity recorded.");
            return;
        }
        for (when, what) in entries {
            let lines = wrap(what, CONTENT_WIDTH - time_width - 4.0, SMALL_SIZE);
            self.ensure_space(line_height(SMALL_SIZE) * lines.len().max(1) as f32 + 1.0);
            self.hline(MARGIN, MARGIN + 1.5, self.y + 1.0, 1.5, accent());
            self.text_at(when, SMALL_SIZE, MARGIN + 3.0, self.y, true, ink());
            for line in lines {
                self.text_at(&line, SMALL_SIZE, MARGIN + time_width, self.y, false, ink());
                self.y -= line_height(SMALL_SIZE);
            }
            self.y -= 1.0;
        }
        self.y -= 2.0;
    }

    /// Signature rule with the signer's name, title, time and fingerprint
    pub fn signature_block(&mut self, signature: &SignatureLine<'_>) {
        let height = 10.0 + 3.0 * line_height(SMALL_SIZE) + 4.0;
        self.ensure_space(height);
        self.y -= 10.0;
        self.hline(MARGIN, MARGIN + 80.0, self.y, 0.6, ink());
        self.y -= line_height(SMALL_SIZE);
        self.text_at(signature.name, BODY_SIZE, MARGIN, self.y, true, ink());
        self.text_at(signature.signed_at, SMALL_SIZE, MARGIN + 90.0, self.y, false, muted());
        self.y -= line_height(SMALL_SIZE);
        self.text_at(signature.title, SMALL_SIZE, MARGIN, self.y, false, ink());
        self.y -= line_height(SMALL_SIZE);
        let fingerprint = format!("Signature hash {}", signature.fingerprint);
        self.text_at(
            &fit(&fingerprint, CONTENT_WIDTH, SMALL_SIZE - 1.0, false),
            SMALL_SIZE - 1.0,
            MARGIN,
            self.y,
            false,
            muted(),
        );
        self.y -= 4.0;
    }

    pub fn finish(self) -> Result<Vec<u8>, PdfError> {
        self.doc
            .save_to_bytes()
            .map_err(|e| PdfError::Save(format!("{e:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_printable_replaces_typography() {
        assert_eq!(printable("Crane \u{2014} \u{201C}north\u{201D}"), "Crane - \"north\"");
        assert_eq!(printable("caf\u{e9}"), "caf?");
    }

    #[test]
    fn test_wrap_respects_width() {
        let text = "Scaffold inspection completed before shift start with all tags current";
        let lines = wrap(text, 40.0, BODY_SIZE);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(text_width(line, BODY_SIZE, false) <= 40.0, "{line}");
        }
        assert_eq!(lines.join(" "), text);
    }

    #[test]
    fn test_wrap_splits_long_words() {
        let hash = "a".repeat(200);
        let lines = wrap(&hash, 30.0, SMALL_SIZE);
        assert!(lines.len() > 1);
        assert_eq!(lines.concat(), hash);
    }

    #[test]
    fn test_fit_truncates_with_ellipsis() {
        assert_eq!(fit("short", 50.0, BODY_SIZE, false), "short");
        let cut = fit(&"W".repeat(100), 20.0, BODY_SIZE, false);
        assert!(cut.ends_with("..."));
        assert!(text_width(&cut, BODY_SIZE, false) <= 20.0);
    }

    #[test]
    fn test_canvas_breaks_pages() {
        let mut canvas = PdfCanvas::new("Layout", "Riskmate").unwrap();
        let rows: Vec<Vec<String>> = (0..200).map(|i| vec![i.to_string(), "row".to_string()]).collect();
        canvas.table(&[Column::new("#", 20.0), Column::new("Value", 100.0)], &rows);
        assert!(canvas.page_count() > 1);
        let bytes = canvas.finish().unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
