//! Document-to-PDF rendering.
//!
//! Two interchangeable backends behind one contract: a headless office
//! converter launched per call when the binary is present, and a portable
//! `lopdf` synthesis otherwise. The selection happens once at startup and is
//! held as an immutable value; requests never re-probe.

use crate::docx::DocxTemplate;
use crate::pdf_builder::PdfBuilder;
use formflow_models::{Form, SubmittedValue};
use formflow_utils::{ConverterConfig, FormFlowError, FormFlowResult};
use std::time::Duration;
use tokio::process::Command;
use tracing::{info, warn};

pub enum PdfBackend {
    Converter(ConverterBackend),
    Library(LibraryBackend),
}

impl PdfBackend {
    /// Probe the office converter once; absence is not an error, it just
    /// selects the portable backend for the life of the process.
    pub async fn probe(config: &ConverterConfig) -> Self {
        let available = Command::new(&config.office_binary)
            .arg("--version")
            .output()
            .await
            .map(|out| out.status.success())
            .unwrap_or(false);

        if available {
            info!(binary = %config.office_binary, "office converter backend selected");
            Self::Converter(ConverterBackend {
                binary: config.office_binary.clone(),
                timeout: Duration::from_secs(config.timeout_seconds),
            })
        } else {
            info!("office converter unavailable, portable backend selected");
            Self::Library(LibraryBackend)
        }
    }

    pub async fn render(&self, doc: &DocxTemplate) -> FormFlowResult<Vec<u8>> {
        match self {
            Self::Converter(backend) => backend.render(doc).await,
            Self::Library(backend) => backend.render(doc),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Converter(_) => "converter",
            Self::Library(_) => "library",
        }
    }
}

/// Headless office automation, one external process per conversion.
pub struct ConverterBackend {
    binary: String,
    timeout: Duration,
}

impl ConverterBackend {
    /// The temp dir scopes every artifact and the child process is reaped on
    /// success, failure and timeout alike; nothing leaks across exports.
    pub async fn render(&self, doc: &DocxTemplate) -> FormFlowResult<Vec<u8>> {
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("document.docx");
        tokio::fs::write(&input, doc.to_bytes()?).await?;

        let mut command = Command::new(&self.binary);
        command
            .arg("--headless")
            .arg("--convert-to")
            .arg("pdf")
            .arg("--outdir")
            .arg(dir.path())
            .arg(&input)
            .kill_on_drop(true);

        // Dropping the future on timeout reaps the child via kill_on_drop.
        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(FormFlowError::document_processing(
                    "office conversion timed out",
                ))
            }
        };

        if !output.status.success() {
            return Err(FormFlowError::document_processing(format!(
                "office conversion failed: {}",
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        let pdf_path = dir.path().join("document.pdf");
        let bytes = tokio::fs::read(&pdf_path).await.map_err(|e| {
            FormFlowError::document_processing(format!("converted pdf missing: {e}"))
        })?;
        Ok(bytes)
    }
}

/// Portable pure-Rust conversion from the filled document's extracted text.
pub struct LibraryBackend;

impl LibraryBackend {
    pub fn render(&self, doc: &DocxTemplate) -> FormFlowResult<Vec<u8>> {
        let text = doc.text()?;
        let mut builder = PdfBuilder::new();
        for line in text.lines() {
            if line.trim().is_empty() {
                builder.blank_line();
            } else {
                builder.line(line);
            }
        }
        builder.finish()
    }
}

/// Data-only fallback: a fresh document with form metadata and a two-column
/// table of the submitted values. Used when the form has no template, the
/// template file is gone, or fill/convert failed.
pub fn render_data_only(form: &Form, values: &[SubmittedValue]) -> FormFlowResult<Vec<u8>> {
    warn!(form_id = %form.id, "rendering data-only export");

    let mut builder = PdfBuilder::new();
    builder.heading(&form.name);
    builder.meta_line(&format!("Status: {}", form.status));
    builder.meta_line(&format!(
        "Created: {}",
        form.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    builder.blank_line();

    if values.is_empty() {
        builder.line("No submitted values.");
    } else {
        builder.table_header();
        for value in values {
            let label = if value.label.is_empty() {
                &value.field_key
            } else {
                &value.label
            };
            builder.table_row(label, &value.value);
        }
    }
    builder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::test_support::docx_from_paragraphs;
    use chrono::Utc;
    use formflow_models::FormStatus;
    use uuid::Uuid;

    fn form() -> Form {
        Form {
            id: Uuid::new_v4(),
            name: "Crew Manifest".to_string(),
            category_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            word_file_path: None,
            status: FormStatus::Active,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_library_backend_renders_document_text() {
        let doc =
            DocxTemplate::from_bytes(&docx_from_paragraphs(&["Hello", "World"])).unwrap();
        let bytes = LibraryBackend.render(&doc).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_data_only_renders_value_table() {
        let values = vec![SubmittedValue {
            field_key: "t_Name".to_string(),
            field_type: "text".to_string(),
            label: "Name".to_string(),
            value: "An".to_string(),
        }];
        let bytes = render_data_only(&form(), &values).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_data_only_with_no_values_still_renders() {
        let bytes = render_data_only(&form(), &[]).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn test_probe_selects_library_when_binary_missing() {
        let config = ConverterConfig {
            office_binary: "definitely-not-a-real-binary".to_string(),
            timeout_seconds: 5,
            unicode_fonts: vec![],
            fallback_font: "DejaVu Sans".to_string(),
        };
        let backend = PdfBackend::probe(&config).await;
        assert_eq!(backend.name(), "library");
    }
}
