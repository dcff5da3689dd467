//! Template Fill Engine
//!
//! Walks every distinct placeholder in a loaded template and substitutes the
//! resolved value through a cascade of replace strategies. Rich-text bodies
//! split visible strings across internal runs, so a naive text replace can
//! silently miss; each strategy is more invasive than the last.

use crate::docx::DocxTemplate;
use crate::resolver;
use crate::scanner::PlaceholderScanner;
use formflow_utils::FormFlowResult;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

pub struct TemplateFillEngine {
    scanner: PlaceholderScanner,
    /// Unicode-capable family applied when a paragraph has to be rewritten.
    font: String,
}

impl TemplateFillEngine {
    pub fn new(font: impl Into<String>) -> Self {
        Self {
            scanner: PlaceholderScanner::new(),
            font: font.into(),
        }
    }

    /// Substitute every distinct placeholder in the document, including with
    /// the empty string when no value exists; unanswered fields are blanked
    /// out rather than left as literal placeholder text.
    ///
    /// Returns the number of placeholders substituted.
    pub fn fill(
        &self,
        doc: &mut DocxTemplate,
        values: &HashMap<String, String>,
    ) -> FormFlowResult<usize> {
        let text = doc.text()?;
        let mut seen = HashSet::new();
        let mut substituted = 0;
        let mut glyphs_written = false;

        for m in self.scanner.matches(&text) {
            if !seen.insert(m.formula.clone()) {
                continue;
            }

            let replacement = resolver::resolve(&m.name, values);
            glyphs_written |= replacement.chars().any(|c| !c.is_ascii());

            if doc.replace_exact(&m.formula, &replacement) {
                substituted += 1;
                continue;
            }
            if doc.replace_case_insensitive(&m.formula, &replacement) {
                substituted += 1;
                continue;
            }
            if doc.rewrite_paragraphs(&m.formula, &replacement, &self.font) {
                debug!(placeholder = %m.formula, "placeholder replaced via paragraph rewrite");
                substituted += 1;
                continue;
            }

            // Visible in extracted text but unreachable by any strategy.
            warn!(placeholder = %m.formula, "placeholder could not be replaced");
        }

        // Glyph characters only survive conversion under a font that covers
        // them, so force the family on every explicit run font.
        if glyphs_written {
            doc.apply_font(&self.font);
        }

        Ok(substituted)
    }
}
