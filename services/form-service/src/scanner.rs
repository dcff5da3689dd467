//! Placeholder Scanner
//!
//! Finds `{name}`, `[name]` and `{{name}}` placeholders in document text and
//! classifies each into a field type by naming heuristics.

use formflow_models::{FieldType, PlaceholderDescriptor};
use regex::Regex;
use std::collections::HashSet;

/// Raw placeholder occurrence in document text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderMatch {
    /// Placeholder literal as written, e.g. `{c_Purser}`.
    pub formula: String,
    /// Trimmed inner name, e.g. `c_Purser`.
    pub name: String,
}

pub struct PlaceholderScanner {
    pattern: Regex,
}

impl PlaceholderScanner {
    pub fn new() -> Self {
        // Double braces must be tried before single braces; the first
        // non-empty capture group wins.
        let pattern = Regex::new(r"\{\{([^{}]+)\}\}|\{([^{}]+)\}|\[([^\[\]]+)\]").unwrap();
        Self { pattern }
    }

    /// Every placeholder occurrence in order, duplicates included.
    pub fn matches(&self, text: &str) -> Vec<PlaceholderMatch> {
        self.pattern
            .captures_iter(text)
            .filter_map(|cap| {
                let inner = cap.get(1).or_else(|| cap.get(2)).or_else(|| cap.get(3))?;
                let name = inner.as_str().trim();
                if name.is_empty() {
                    return None;
                }
                Some(PlaceholderMatch {
                    formula: cap.get(0).map(|m| m.as_str().to_string())?,
                    name: name.to_string(),
                })
            })
            .collect()
    }

    /// Deduplicated ordered descriptors for the catalog. Dedup key is the
    /// trimmed name as extracted, case-sensitive, first occurrence wins.
    pub fn scan(&self, text: &str) -> Vec<PlaceholderDescriptor> {
        let mut seen = HashSet::new();
        self.matches(text)
            .into_iter()
            .filter(|m| seen.insert(m.name.clone()))
            .map(|m| {
                let lower = m.name.to_lowercase();
                PlaceholderDescriptor {
                    field_type: classify(&lower),
                    description: m.name.replace('_', " ").trim().to_string(),
                    is_required: m.name.contains('*') || lower.contains("required"),
                    is_upper_case: lower.contains("upper"),
                    name: m.name,
                    formula: m.formula,
                }
            })
            .collect()
    }
}

impl Default for PlaceholderScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Ordered substring classification over the lowercased name. The first
/// matching rule wins, so a name containing both "date" and "note" is a Date.
fn classify(lower: &str) -> FieldType {
    const RULES: &[(&[&str], FieldType)] = &[
        (&["date", "ngay"], FieldType::Date),
        (&["email"], FieldType::Email),
        (&["phone", "sdt"], FieldType::Phone),
        (&["number", "so"], FieldType::Number),
        (&["checkbox", "check"], FieldType::Checkbox),
        (&["select", "dropdown"], FieldType::Select),
        (&["textarea", "note"], FieldType::Textarea),
    ];

    for (needles, ty) in RULES {
        if needles.iter().any(|n| lower.contains(n)) {
            return *ty;
        }
    }
    FieldType::Text
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_extracts_all_three_bracket_styles() {
        let scanner = PlaceholderScanner::new();
        let text = "Name: {t_Name}, Date: [d_Date], Remark: {{note_Remark}}";
        let found = scanner.scan(text);

        assert_eq!(found.len(), 3);
        assert_eq!(found[0].name, "t_Name");
        assert_eq!(found[0].formula, "{t_Name}");
        assert_eq!(found[1].name, "d_Date");
        assert_eq!(found[1].formula, "[d_Date]");
        assert_eq!(found[2].name, "note_Remark");
        assert_eq!(found[2].formula, "{{note_Remark}}");
    }

    #[test]
    fn test_dedup_keeps_first_occurrence_casing() {
        let scanner = PlaceholderScanner::new();
        let found = scanner.scan("{Purser} then {Purser} and {purser}");

        // Dedup is case-sensitive as extracted.
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].name, "Purser");
        assert_eq!(found[1].name, "purser");
    }

    #[test]
    fn test_inner_whitespace_trimmed() {
        let scanner = PlaceholderScanner::new();
        let found = scanner.scan("{ t_Name } and {   }");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "t_Name");
    }

    #[test]
    fn test_classification_order_is_significant() {
        // date-rule precedes note-rule
        assert_eq!(classify("date_note"), FieldType::Date);
        // phone-rule precedes number-rule
        assert_eq!(classify("phone_number"), FieldType::Phone);
        assert_eq!(classify("ngay_sinh"), FieldType::Date);
        assert_eq!(classify("sdt_lien_he"), FieldType::Phone);
        assert_eq!(classify("check_agree"), FieldType::Checkbox);
        assert_eq!(classify("dropdown_country"), FieldType::Select);
        assert_eq!(classify("anything_else"), FieldType::Text);
    }

    #[test]
    fn test_required_and_uppercase_flags() {
        let scanner = PlaceholderScanner::new();
        let found = scanner.scan("{t_Name*} {UPPER_Title} {Required_Date}");

        assert!(found[0].is_required);
        assert!(!found[0].is_upper_case);
        assert!(found[1].is_upper_case);
        assert!(!found[1].is_required);
        assert!(found[2].is_required);
        assert_eq!(found[2].field_type, FieldType::Date);
    }

    proptest! {
        // Any non-empty bracket-free name is extracted exactly once per
        // distinct trimmed spelling, whatever bracket style carries it.
        #[test]
        fn prop_single_descriptor_per_distinct_name(name in "[A-Za-z][A-Za-z0-9_]{0,20}") {
            let scanner = PlaceholderScanner::new();
            let text = format!("a {{{name}}} b [{name}] c {{{{{name}}}}}", name = name);
            let found = scanner.scan(&text);

            prop_assert_eq!(found.len(), 1);
            prop_assert_eq!(&found[0].name, &name);
        }

        #[test]
        fn prop_formula_contains_name(name in "[A-Za-z][A-Za-z0-9_]{0,20}") {
            let scanner = PlaceholderScanner::new();
            let found = scanner.scan(&format!("[{}]", name));
            prop_assert_eq!(found.len(), 1);
            prop_assert!(found[0].formula.contains(&name));
        }
    }
}
