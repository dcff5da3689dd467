//! Unicode font discovery.
//!
//! Checkbox and radio glyphs only survive PDF conversion when a font that
//! covers them is applied document-wide. The probe checks a prioritized list
//! of known families against the locally installed font files and falls back
//! to a safe default when none are present.

use std::path::{Path, PathBuf};
use tracing::{debug, info};

const MAX_SCAN_DEPTH: usize = 3;

/// Pick the first candidate family with a matching installed font file.
pub fn probe_unicode_font(candidates: &[String], fallback: &str) -> String {
    let installed = installed_font_stems();

    for candidate in candidates {
        let normalized = normalize(candidate);
        if installed.iter().any(|stem| stem.contains(&normalized)) {
            info!(font = %candidate, "unicode font selected");
            return candidate.clone();
        }
    }

    debug!(fallback = %fallback, "no candidate font installed, using fallback");
    fallback.to_string()
}

fn font_directories() -> Vec<PathBuf> {
    let mut dirs = vec![
        PathBuf::from("/usr/share/fonts"),
        PathBuf::from("/usr/local/share/fonts"),
        PathBuf::from("/Library/Fonts"),
        PathBuf::from("/System/Library/Fonts"),
        PathBuf::from("C:\\Windows\\Fonts"),
    ];
    if let Ok(home) = std::env::var("HOME") {
        dirs.push(Path::new(&home).join(".fonts"));
        dirs.push(Path::new(&home).join(".local/share/fonts"));
    }
    dirs
}

fn installed_font_stems() -> Vec<String> {
    let mut stems = Vec::new();
    for dir in font_directories() {
        collect_stems(&dir, 0, &mut stems);
    }
    stems
}

fn collect_stems(dir: &Path, depth: usize, stems: &mut Vec<String>) {
    if depth > MAX_SCAN_DEPTH {
        return;
    }
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_stems(&path, depth + 1, stems);
        } else if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            stems.push(normalize(stem));
        }
    }
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
        .collect::<String>()
        .to_lowercase()
}
