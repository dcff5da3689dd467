//! Page-by-page PDF assembly on top of `lopdf`.
//!
//! Used by the portable renderer backend and the data-only fallback. Layout
//! is simple top-down text flow with automatic page breaks. Text is written
//! in WinAnsi encoding against the base-14 fonts: Latin-1 text (accented
//! names included) and common typographic punctuation come through intact,
//! the checkbox/radio codepoints are mapped to ASCII forms, and anything
//! outside the encoding degrades to `?`.

use formflow_utils::{FormFlowError, FormFlowResult};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream, StringFormat};

const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN: f32 = 56.0;
const VALUE_COLUMN_X: f32 = 240.0;
const WRAP_CHARS: usize = 88;

const FONT_NORMAL: &str = "F1";
const FONT_BOLD: &str = "F2";

pub struct PdfBuilder {
    doc: Document,
    pages_id: (u32, u16),
    kids: Vec<Object>,
    ops: Vec<Operation>,
    cursor_y: f32,
}

impl PdfBuilder {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            kids: Vec::new(),
            ops: Vec::new(),
            cursor_y: PAGE_HEIGHT - MARGIN,
        }
    }

    pub fn heading(&mut self, text: &str) {
        self.write_line(text, 16.0, true, 0.0);
        self.cursor_y -= 10.0;
    }

    pub fn line(&mut self, text: &str) {
        for part in wrap(text, WRAP_CHARS) {
            self.write_line(&part, 11.0, false, 0.0);
        }
    }

    pub fn meta_line(&mut self, text: &str) {
        self.write_line(text, 9.0, false, 0.0);
    }

    pub fn blank_line(&mut self) {
        self.cursor_y -= 12.0;
    }

    /// One name/value row of the two-column data table.
    pub fn table_row(&mut self, name: &str, value: &str) {
        let size = 11.0;
        self.break_page_if_needed(size);
        self.text_at(name, size, true, MARGIN);
        self.text_at(value, size, false, VALUE_COLUMN_X);
        self.cursor_y -= size + 5.0;
    }

    pub fn table_header(&mut self) {
        let size = 11.0;
        self.break_page_if_needed(size);
        self.text_at("Field", size, true, MARGIN);
        self.text_at("Value", size, true, VALUE_COLUMN_X);
        self.cursor_y -= size + 8.0;
    }

    fn write_line(&mut self, text: &str, size: f32, bold: bool, indent: f32) {
        self.break_page_if_needed(size);
        self.text_at(text, size, bold, MARGIN + indent);
        self.cursor_y -= size + 4.0;
    }

    fn text_at(&mut self, text: &str, size: f32, bold: bool, x: f32) {
        let font = if bold { FONT_BOLD } else { FONT_NORMAL };
        self.ops.push(Operation::new("BT", vec![]));
        self.ops
            .push(Operation::new("Tf", vec![font.into(), size.into()]));
        self.ops
            .push(Operation::new("Td", vec![x.into(), self.cursor_y.into()]));
        self.ops.push(Operation::new(
            "Tj",
            vec![Object::String(
                encode_win_ansi(text),
                StringFormat::Literal,
            )],
        ));
        self.ops.push(Operation::new("ET", vec![]));
    }

    fn break_page_if_needed(&mut self, size: f32) {
        if self.cursor_y - size < MARGIN {
            self.flush_page();
        }
    }

    fn flush_page(&mut self) {
        if self.ops.is_empty() {
            self.cursor_y = PAGE_HEIGHT - MARGIN;
            return;
        }
        let content = Content {
            operations: std::mem::take(&mut self.ops),
        };
        // encode() over text operations cannot fail; an empty stream is the
        // worst case.
        let encoded = content.encode().unwrap_or_default();
        let content_id = self
            .doc
            .add_object(Stream::new(dictionary! {}, encoded));

        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "Resources" => dictionary! {
                "Font" => dictionary! {
                    FONT_NORMAL => dictionary! {
                        "Type" => "Font",
                        "Subtype" => "Type1",
                        "BaseFont" => "Helvetica",
                        "Encoding" => "WinAnsiEncoding",
                    },
                    FONT_BOLD => dictionary! {
                        "Type" => "Font",
                        "Subtype" => "Type1",
                        "BaseFont" => "Helvetica-Bold",
                        "Encoding" => "WinAnsiEncoding",
                    },
                },
            },
            "MediaBox" => vec![0f32.into(), 0f32.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
            "Contents" => content_id,
        });

        self.kids.push(Object::Reference(page_id));
        self.cursor_y = PAGE_HEIGHT - MARGIN;
    }

    pub fn finish(mut self) -> FormFlowResult<Vec<u8>> {
        self.flush_page();
        if self.kids.is_empty() {
            // A document is never empty; emit one blank page.
            self.ops.push(Operation::new("BT", vec![]));
            self.ops.push(Operation::new("ET", vec![]));
            self.flush_page();
        }

        let count = self.kids.len() as i64;
        let pages_dict = dictionary! {
            "Type" => "Pages",
            "Kids" => self.kids.clone(),
            "Count" => count,
        };
        self.doc
            .objects
            .insert(self.pages_id, Object::Dictionary(pages_dict));

        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);
        self.doc.compress();

        let mut bytes = Vec::new();
        self.doc
            .save_to(&mut bytes)
            .map_err(|e| FormFlowError::document_processing(format!("pdf save failed: {e}")))?;
        Ok(bytes)
    }
}

impl Default for PdfBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Encode for a WinAnsi-declared base-14 font. The substitution glyphs have
/// no WinAnsi slot and would render as missing boxes, so they map to
/// readable ASCII forms; codepoints outside the encoding become `?`.
fn encode_win_ansi(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\u{2611}' => out.extend_from_slice(b"[x]"),
            '\u{2610}' => out.extend_from_slice(b"[ ]"),
            '\u{25CF}' => out.extend_from_slice(b"(x)"),
            '\u{25CB}' => out.extend_from_slice(b"( )"),
            // Typographic punctuation sits in the 0x80-0x9F window.
            '\u{20AC}' => out.push(0x80),
            '\u{2026}' => out.push(0x85),
            '\u{2018}' => out.push(0x91),
            '\u{2019}' => out.push(0x92),
            '\u{201C}' => out.push(0x93),
            '\u{201D}' => out.push(0x94),
            '\u{2013}' => out.push(0x96),
            '\u{2014}' => out.push(0x97),
            c if (c as u32) < 0x80 || (0xA0..0x100).contains(&(c as u32)) => {
                out.push(c as u32 as u8)
            }
            _ => out.push(b'?'),
        }
    }
    out
}

fn wrap(text: &str, max_chars: usize) -> Vec<String> {
    if text.chars().count() <= max_chars {
        return vec![text.to_string()];
    }
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.chars().count() + word.chars().count() + 1 > max_chars {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
