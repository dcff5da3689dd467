//! Prefix-Keyed Value Resolver
//!
//! Derives the display string for a placeholder key from the submitted
//! values map. Pure; lookup misses and parse failures resolve to defaults,
//! never to an error.

use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashMap;

pub const CHECKBOX_CHECKED: &str = "\u{2611}"; // ☑
pub const CHECKBOX_UNCHECKED: &str = "\u{2610}"; // ☐
pub const RADIO_SELECTED: &str = "\u{25CF}"; // ●
pub const RADIO_UNSELECTED: &str = "\u{25CB}"; // ○

/// Resolve a possibly-prefixed field key against the submitted values.
///
/// Prefixes are checked most-specific first; a key with no recognized prefix
/// is looked up directly. Missing keys resolve to the empty string, or to
/// the unchecked/unselected glyph for boolean prefixes.
pub fn resolve(field_key: &str, values: &HashMap<String, String>) -> String {
    let key = field_key.trim();

    // Alias indirection: the stripped key is looked up raw.
    if let Some(rest) = key.strip_prefix("X_") {
        return lookup(values, rest);
    }

    if let Some(rest) = strip_any(key, &["c_", "b_"]) {
        return checkbox_glyph(parse_boolean_value(&lookup(values, rest)));
    }

    if key.starts_with("rd_") || key.starts_with("r_") {
        let rest = key.split_once('_').map(|(_, r)| r).unwrap_or("");
        return radio_glyph(parse_boolean_value(&lookup(values, rest)));
    }

    if let Some(rest) = key.strip_prefix("t_") {
        return lookup(values, rest);
    }

    if let Some(rest) = strip_any(key, &["n_", "f_"]) {
        // Numbers pass through without reformatting.
        return lookup(values, rest);
    }

    if let Some(rest) = strip_any(key, &["dt_", "d_"]) {
        return format_date(&lookup(values, rest));
    }

    if let Some(rest) = key.strip_prefix("s_") {
        return lookup(values, rest);
    }

    lookup(values, key)
}

/// Shared truthiness parser: case-insensitive membership in
/// {true, 1, yes, selected, checked}. Anything else, including empty, is
/// false.
pub fn parse_boolean_value(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "true" | "1" | "yes" | "selected" | "checked"
    )
}

fn checkbox_glyph(checked: bool) -> String {
    if checked { CHECKBOX_CHECKED } else { CHECKBOX_UNCHECKED }.to_string()
}

fn radio_glyph(selected: bool) -> String {
    if selected { RADIO_SELECTED } else { RADIO_UNSELECTED }.to_string()
}

fn strip_any<'a>(key: &'a str, prefixes: &[&str]) -> Option<&'a str> {
    prefixes.iter().find_map(|p| key.strip_prefix(p))
}

fn lookup(values: &HashMap<String, String>, key: &str) -> String {
    values.get(key).cloned().unwrap_or_default()
}

/// Reformat to `dd/MM/yyyy` when the raw value parses as a date; raw
/// passthrough otherwise.
fn format_date(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d-%m-%Y"];
    const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, fmt) {
            return date.format("%d/%m/%Y").to_string();
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return dt.format("%d/%m/%Y").to_string();
        }
    }

    raw.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_checkbox_round_trip() {
        let map = values(&[("Agree", "true")]);
        assert_eq!(resolve("c_Agree", &map), CHECKBOX_CHECKED);

        let map = values(&[("Agree", "false")]);
        assert_eq!(resolve("c_Agree", &map), CHECKBOX_UNCHECKED);

        // Missing key defaults to unchecked.
        assert_eq!(resolve("c_Agree", &HashMap::new()), CHECKBOX_UNCHECKED);
    }

    #[test]
    fn test_boolean_prefix_aliases() {
        let map = values(&[("Confirm", "yes"), ("Choice", "selected")]);
        assert_eq!(resolve("b_Confirm", &map), CHECKBOX_CHECKED);
        assert_eq!(resolve("rd_Choice", &map), RADIO_SELECTED);
        assert_eq!(resolve("r_Choice", &map), RADIO_SELECTED);
        assert_eq!(resolve("rd_Missing", &map), RADIO_UNSELECTED);
    }

    #[test]
    fn test_truthiness_set() {
        for v in ["true", "TRUE", "1", "yes", "Selected", "checked"] {
            assert!(parse_boolean_value(v), "{v} should be truthy");
        }
        for v in ["false", "0", "no", "", "on", "2"] {
            assert!(!parse_boolean_value(v), "{v} should be falsy");
        }
    }

    #[test]
    fn test_date_reformatted_when_parseable() {
        let map = values(&[("Birthday", "2024-03-05")]);
        assert_eq!(resolve("d_Birthday", &map), "05/03/2024");

        let map = values(&[("Birthday", "not-a-date")]);
        assert_eq!(resolve("d_Birthday", &map), "not-a-date");

        let map = values(&[("Start", "2024-03-05T08:30:00")]);
        assert_eq!(resolve("dt_Start", &map), "05/03/2024");
    }

    #[test]
    fn test_text_number_select_pass_raw() {
        let map = values(&[("Name", "An"), ("Total", "1,250.50"), ("City", "Hue")]);
        assert_eq!(resolve("t_Name", &map), "An");
        assert_eq!(resolve("n_Total", &map), "1,250.50");
        assert_eq!(resolve("f_Total", &map), "1,250.50");
        assert_eq!(resolve("s_City", &map), "Hue");
    }

    #[test]
    fn test_alias_and_direct_lookup() {
        let map = values(&[("Captain", "Nguyen")]);
        assert_eq!(resolve("X_Captain", &map), "Nguyen");
        assert_eq!(resolve("Captain", &map), "Nguyen");
        assert_eq!(resolve("Unknown", &map), "");
    }
}
