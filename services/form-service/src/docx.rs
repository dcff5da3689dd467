//! WordprocessingML template access.
//!
//! A `.docx` file is a ZIP container; the body lives in `word/document.xml`.
//! The template is held as the original parts plus a mutable copy of the
//! body XML, so replacements can be applied and the package written back
//! with everything else untouched.

use formflow_utils::{FormFlowError, FormFlowResult};
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use std::io::{Cursor, Read, Write};
use std::path::Path;
use zip::write::FileOptions;
use zip::{ZipArchive, ZipWriter};

const DOCUMENT_PART: &str = "word/document.xml";

pub struct DocxTemplate {
    parts: Vec<(String, Vec<u8>)>,
    document_xml: String,
}

impl DocxTemplate {
    pub fn from_bytes(bytes: &[u8]) -> FormFlowResult<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut parts = Vec::with_capacity(archive.len());
        let mut document_xml = None;

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            let name = entry.name().to_string();
            let mut buf = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut buf)?;

            if name == DOCUMENT_PART {
                let xml = String::from_utf8(buf.clone()).map_err(|e| {
                    FormFlowError::document_processing(format!("document.xml is not UTF-8: {e}"))
                })?;
                document_xml = Some(xml);
            }
            parts.push((name, buf));
        }

        let document_xml = document_xml.ok_or_else(|| {
            FormFlowError::document_processing("package has no word/document.xml part")
        })?;

        Ok(Self {
            parts,
            document_xml,
        })
    }

    pub async fn open(path: impl AsRef<Path>) -> FormFlowResult<Self> {
        let bytes = tokio::fs::read(path.as_ref()).await?;
        Self::from_bytes(&bytes)
    }

    /// Plain text of the body: `w:t` runs concatenated, one line per
    /// paragraph, table cells in document order.
    pub fn text(&self) -> FormFlowResult<String> {
        extract_text(&self.document_xml)
    }

    /// Repack the container with the (possibly modified) body part.
    pub fn to_bytes(&self) -> FormFlowResult<Vec<u8>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in &self.parts {
            writer.start_file(name, FileOptions::default())?;
            if name == DOCUMENT_PART {
                writer.write_all(self.document_xml.as_bytes())?;
            } else {
                writer.write_all(data)?;
            }
        }
        let cursor = writer
            .finish()
            .map_err(FormFlowError::from)?;
        Ok(cursor.into_inner())
    }

    /// Exact replace-all over the body XML. Succeeds only when the
    /// placeholder survived intact inside a single text run.
    pub fn replace_exact(&mut self, placeholder: &str, value: &str) -> bool {
        let needle = escape_xml(placeholder);
        if !self.document_xml.contains(&needle) {
            return false;
        }
        self.document_xml = self.document_xml.replace(&needle, &escape_xml(value));
        true
    }

    /// Case-insensitive variant of [`replace_exact`](Self::replace_exact).
    pub fn replace_case_insensitive(&mut self, placeholder: &str, value: &str) -> bool {
        let needle = escape_xml(placeholder);
        let pattern = match Regex::new(&format!("(?i){}", regex::escape(&needle))) {
            Ok(p) => p,
            Err(_) => return false,
        };
        if !pattern.is_match(&self.document_xml) {
            return false;
        }
        let replacement = escape_xml(value);
        self.document_xml = pattern
            .replace_all(&self.document_xml, regex::NoExpand(&replacement))
            .into_owned();
        true
    }

    /// Manual fallback for placeholders split across runs.
    ///
    /// Walks every paragraph (body and table cells), and where the
    /// paragraph's concatenated run text contains the placeholder, collapses
    /// the runs into a single rewritten run carrying the given font.
    pub fn rewrite_paragraphs(&mut self, placeholder: &str, value: &str, font: &str) -> bool {
        let mut changed = false;
        let mut rebuilt = String::with_capacity(self.document_xml.len());
        let mut cursor = 0;

        for (start, end) in paragraph_ranges(&self.document_xml) {
            let paragraph = &self.document_xml[start..end];
            if let Some(replacement) = rewrite_paragraph(paragraph, placeholder, value, font) {
                rebuilt.push_str(&self.document_xml[cursor..start]);
                rebuilt.push_str(&replacement);
                cursor = end;
                changed = true;
            }
        }

        if changed {
            rebuilt.push_str(&self.document_xml[cursor..]);
            self.document_xml = rebuilt;
        }
        changed
    }

    /// Force every run to the given font family so glyph characters survive
    /// conversion instead of rendering as missing-glyph boxes.
    ///
    /// Covers all three shapes a run can take: an existing `rFonts`
    /// declaration is rewritten, a property block without one gets the
    /// declaration prepended, and a bare run gets a whole new property
    /// block. Runs with no declaration would otherwise keep the document
    /// default font.
    pub fn apply_font(&mut self, font: &str) {
        let declaration = format!(
            r#"<w:rFonts w:ascii="{font}" w:hAnsi="{font}" w:cs="{font}"/>"#,
            font = escape_xml(font)
        );

        let pattern = Regex::new(r"<w:rFonts\b[^>]*/>").unwrap();
        let xml = pattern
            .replace_all(&self.document_xml, regex::NoExpand(&declaration))
            .into_owned();

        let mut rebuilt = String::with_capacity(xml.len() + declaration.len());
        let mut pos = 0;
        while let Some(found) = xml[pos..].find("<w:r") {
            let tag_start = pos + found;
            let after = &xml[tag_start + "<w:r".len()..];
            // `<w:rPr`, `<w:rFonts` and friends share the prefix; a real run
            // tag continues with a space or `>`. `<w:r/>` holds no text.
            if !matches!(after.as_bytes().first(), Some(b' ') | Some(b'>')) {
                rebuilt.push_str(&xml[pos..tag_start + "<w:r".len()]);
                pos = tag_start + "<w:r".len();
                continue;
            }
            let Some(open_rel) = xml[tag_start..].find('>') else {
                break;
            };
            let open_end = tag_start + open_rel + 1;
            rebuilt.push_str(&xml[pos..open_end]);
            pos = open_end;

            if xml[open_end..].starts_with("<w:rPr>") {
                let props_start = open_end + "<w:rPr>".len();
                rebuilt.push_str("<w:rPr>");
                pos = props_start;
                // rFonts must lead the property block.
                if let Some(close_rel) = xml[props_start..].find("</w:rPr>") {
                    if !xml[props_start..props_start + close_rel].contains("<w:rFonts") {
                        rebuilt.push_str(&declaration);
                    }
                }
            } else {
                rebuilt.push_str("<w:rPr>");
                rebuilt.push_str(&declaration);
                rebuilt.push_str("</w:rPr>");
            }
        }
        rebuilt.push_str(&xml[pos..]);
        self.document_xml = rebuilt;
    }

    #[cfg(test)]
    pub fn document_xml(&self) -> &str {
        &self.document_xml
    }
}

fn extract_text(xml: &str) -> FormFlowResult<String> {
    let mut reader = Reader::from_str(xml);
    let mut out = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.local_name().as_ref() == b"t" => in_text = true,
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => out.push('\n'),
                _ => {}
            },
            Event::Text(t) if in_text => out.push_str(&t.unescape()?),
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(out)
}

/// Byte ranges of every `<w:p>...</w:p>` element. Paragraphs never nest, so
/// the next closing tag always matches.
fn paragraph_ranges(xml: &str) -> Vec<(usize, usize)> {
    const OPEN: &str = "<w:p";
    const CLOSE: &str = "</w:p>";

    let mut ranges = Vec::new();
    let mut pos = 0;

    while let Some(found) = xml[pos..].find(OPEN) {
        let start = pos + found;
        let rest = &xml[start + OPEN.len()..];
        match rest.as_bytes().first() {
            // `<w:pPr`, `<w:pgSz` and friends share the prefix; a real
            // paragraph tag continues with a space or `>`.
            Some(b' ') | Some(b'>') => match xml[start..].find(CLOSE) {
                Some(rel) => {
                    let end = start + rel + CLOSE.len();
                    ranges.push((start, end));
                    pos = end;
                }
                None => break,
            },
            _ => pos = start + OPEN.len(),
        }
    }
    ranges
}

/// Rebuild one paragraph with its runs collapsed into a single substituted
/// run. Returns `None` when the paragraph text does not contain the
/// placeholder.
fn rewrite_paragraph(
    paragraph: &str,
    placeholder: &str,
    value: &str,
    font: &str,
) -> Option<String> {
    let text = extract_text(paragraph).ok()?;
    let text = text.trim_end_matches('\n');
    if !text.contains(placeholder) {
        return None;
    }
    let new_text = text.replace(placeholder, value);

    let open_end = paragraph.find('>')? + 1;
    let opening = &paragraph[..open_end];

    // Paragraph properties survive; runs are replaced wholesale.
    let properties = paragraph.find("<w:pPr").and_then(|p_start| {
        if let Some(rel) = paragraph[p_start..].find("</w:pPr>") {
            Some(&paragraph[p_start..p_start + rel + "</w:pPr>".len()])
        } else if let Some(rel) = paragraph[p_start..].find("/>") {
            Some(&paragraph[p_start..p_start + rel + 2])
        } else {
            None
        }
    });

    let mut rebuilt = String::with_capacity(paragraph.len());
    rebuilt.push_str(opening);
    if let Some(props) = properties {
        rebuilt.push_str(props);
    }
    rebuilt.push_str(&format!(
        r#"<w:r><w:rPr><w:rFonts w:ascii="{font}" w:hAnsi="{font}" w:cs="{font}"/><w:sz w:val="24"/><w:szCs w:val="24"/></w:rPr><w:t xml:space="preserve">{text}</w:t></w:r>"#,
        font = escape_xml(font),
        text = escape_xml(&new_text)
    ));
    rebuilt.push_str("</w:p>");
    Some(rebuilt)
}

fn escape_xml(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Minimal single-part docx package around the given body paragraphs.
    pub fn docx_from_paragraphs(paragraphs: &[&str]) -> Vec<u8> {
        let body: String = paragraphs
            .iter()
            .map(|p| format!("<w:p><w:r><w:t xml:space=\"preserve\">{}</w:t></w:r></w:p>", p))
            .collect();
        docx_from_body_xml(&body)
    }

    pub fn docx_from_body_xml(body: &str) -> Vec<u8> {
        let xml = format!(
            concat!(
                "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>",
                "<w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">",
                "<w:body>{}</w:body></w:document>"
            ),
            body
        );

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file(
                "[Content_Types].xml",
                FileOptions::default(),
            )
            .unwrap();
        writer
            .write_all(
                br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"/>"#,
            )
            .unwrap();
        writer
            .start_file(DOCUMENT_PART, FileOptions::default())
            .unwrap();
        writer.write_all(xml.as_bytes()).unwrap();
        writer.finish().unwrap().into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_round_trip_preserves_parts() {
        let bytes = docx_from_paragraphs(&["Hello {t_Name}"]);
        let doc = DocxTemplate::from_bytes(&bytes).unwrap();
        let repacked = doc.to_bytes().unwrap();

        let reopened = DocxTemplate::from_bytes(&repacked).unwrap();
        assert_eq!(reopened.text().unwrap().trim(), "Hello {t_Name}");
    }

    #[test]
    fn test_text_joins_paragraphs_with_newlines() {
        let bytes = docx_from_paragraphs(&["first", "second"]);
        let doc = DocxTemplate::from_bytes(&bytes).unwrap();
        assert_eq!(doc.text().unwrap(), "first\nsecond\n");
    }

    #[test]
    fn test_table_cell_text_is_included() {
        let body = concat!(
            "<w:p><w:r><w:t>lead</w:t></w:r></w:p>",
            "<w:tbl><w:tr><w:tc>",
            "<w:p><w:r><w:t>{c_Agree}</w:t></w:r></w:p>",
            "</w:tc></w:tr></w:tbl>"
        );
        let doc = DocxTemplate::from_bytes(&docx_from_body_xml(body)).unwrap();
        let text = doc.text().unwrap();
        assert!(text.contains("lead"));
        assert!(text.contains("{c_Agree}"));
    }

    #[test]
    fn test_exact_replace() {
        let bytes = docx_from_paragraphs(&["Name: {t_Name}"]);
        let mut doc = DocxTemplate::from_bytes(&bytes).unwrap();

        assert!(doc.replace_exact("{t_Name}", "An"));
        assert_eq!(doc.text().unwrap().trim(), "Name: An");
        assert!(!doc.replace_exact("{t_Name}", "An"));
    }

    #[test]
    fn test_case_insensitive_replace() {
        let bytes = docx_from_paragraphs(&["Name: {T_NAME}"]);
        let mut doc = DocxTemplate::from_bytes(&bytes).unwrap();

        assert!(!doc.replace_exact("{t_Name}", "An"));
        assert!(doc.replace_case_insensitive("{t_Name}", "An"));
        assert_eq!(doc.text().unwrap().trim(), "Name: An");
    }

    #[test]
    fn test_paragraph_surgery_handles_split_runs() {
        // The placeholder is split across three runs, so whole-string
        // replacement over the XML cannot see it.
        let body = concat!(
            "<w:p><w:pPr><w:jc w:val=\"center\"/></w:pPr>",
            "<w:r><w:t>Name: {t_</w:t></w:r>",
            "<w:r><w:t>Na</w:t></w:r>",
            "<w:r><w:t>me}</w:t></w:r></w:p>"
        );
        let mut doc = DocxTemplate::from_bytes(&docx_from_body_xml(body)).unwrap();

        assert!(!doc.replace_exact("{t_Name}", "An"));
        assert!(doc.rewrite_paragraphs("{t_Name}", "An", "DejaVu Sans"));
        assert_eq!(doc.text().unwrap().trim(), "Name: An");
        // Paragraph properties survive the rewrite.
        assert!(doc.document_xml().contains("w:jc"));
        assert!(doc.document_xml().contains("DejaVu Sans"));
    }

    #[test]
    fn test_surgery_reaches_table_cells() {
        let body = concat!(
            "<w:tbl><w:tr><w:tc>",
            "<w:p><w:r><w:t>{c_</w:t></w:r><w:r><w:t>Agree}</w:t></w:r></w:p>",
            "</w:tc></w:tr></w:tbl>"
        );
        let mut doc = DocxTemplate::from_bytes(&docx_from_body_xml(body)).unwrap();

        assert!(doc.rewrite_paragraphs("{c_Agree}", "\u{2611}", "DejaVu Sans"));
        assert!(doc.text().unwrap().contains('\u{2611}'));
    }

    #[test]
    fn test_apply_font_covers_every_run_shape() {
        let body = concat!(
            // Existing declaration is rewritten.
            "<w:p><w:r><w:rPr><w:rFonts w:ascii=\"Calibri\" w:hAnsi=\"Calibri\"/></w:rPr>",
            "<w:t>a</w:t></w:r>",
            // Property block without a declaration gets one prepended.
            "<w:r><w:rPr><w:b/></w:rPr><w:t>b</w:t></w:r>",
            // Bare run gets a whole new property block.
            "<w:r><w:t>c</w:t></w:r></w:p>"
        );
        let mut doc = DocxTemplate::from_bytes(&docx_from_body_xml(body)).unwrap();

        doc.apply_font("DejaVu Sans");
        let xml = doc.document_xml();
        assert!(!xml.contains("Calibri"));
        assert_eq!(xml.matches("DejaVu Sans").count(), 9, "three runs, three attributes each");
        assert!(xml.contains("<w:rPr><w:rFonts w:ascii=\"DejaVu Sans\""));
        assert!(xml.contains("<w:b/>"));
        assert_eq!(doc.text().unwrap().trim(), "abc");
    }

    #[test]
    fn test_apply_font_skips_self_closing_runs() {
        let body = "<w:p><w:r/><w:r><w:t>x</w:t></w:r></w:p>";
        let mut doc = DocxTemplate::from_bytes(&docx_from_body_xml(body)).unwrap();

        doc.apply_font("DejaVu Sans");
        assert!(doc.document_xml().contains("<w:r/>"));
        assert_eq!(doc.text().unwrap().trim(), "x");
    }

    #[test]
    fn test_missing_document_part_is_an_error() {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("word/other.xml", FileOptions::default())
            .unwrap();
        writer.write_all(b"<x/>").unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        assert!(DocxTemplate::from_bytes(&bytes).is_err());
    }

    #[test]
    fn test_value_is_xml_escaped() {
        let bytes = docx_from_paragraphs(&["V: {t_V}"]);
        let mut doc = DocxTemplate::from_bytes(&bytes).unwrap();
        assert!(doc.replace_exact("{t_V}", "a < b & c"));
        assert_eq!(doc.text().unwrap().trim(), "V: a < b & c");
    }
}
