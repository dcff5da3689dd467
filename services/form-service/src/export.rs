//! Export Orchestrator
//!
//! form → latest submitted values → template fill → PDF, with the data-only
//! fallback whenever the template path is unusable. No partial PDF ever
//! leaves this module; a failure before the final byte stream surfaces as a
//! single error.

use crate::docx::DocxTemplate;
use crate::fill::TemplateFillEngine;
use crate::render::{render_data_only, PdfBackend};
use crate::storage::FileStorage;
use crate::store::Store;
use crate::submission::latest_values;
use chrono::{DateTime, Utc};
use formflow_models::{values_by_name, Form, SubmittedValue};
use formflow_utils::{FormFlowError, FormFlowResult};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug)]
pub struct ExportedPdf {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub field_count: usize,
}

pub struct ExportOrchestrator {
    store: Store,
    storage: Arc<FileStorage>,
    backend: Arc<PdfBackend>,
    fill_engine: TemplateFillEngine,
}

impl ExportOrchestrator {
    pub fn new(
        store: Store,
        storage: Arc<FileStorage>,
        backend: Arc<PdfBackend>,
        font: impl Into<String>,
    ) -> Self {
        Self {
            store,
            storage,
            backend,
            fill_engine: TemplateFillEngine::new(font),
        }
    }

    pub async fn export_form_pdf(&self, form_id: Uuid) -> FormFlowResult<ExportedPdf> {
        let (form, values) = {
            let db = self.store.read().await;
            let form = db
                .forms
                .get(&form_id)
                .cloned()
                .ok_or_else(|| FormFlowError::not_found("Form"))?;
            let values = latest_values(&db, form_id)
                .map(|(_, v)| v)
                .unwrap_or_default();
            (form, values)
        };
        let field_count = values.len();

        let bytes = match self.render_with_template(&form, &values).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => render_data_only(&form, &values)?,
            Err(e) => {
                warn!(form_id = %form.id, error = %e, "template render failed, falling back to data-only");
                render_data_only(&form, &values)?
            }
        };

        let file_name = build_file_name(&form.name, Utc::now());
        info!(form_id = %form.id, file = %file_name, bytes = bytes.len(), "form exported");

        Ok(ExportedPdf {
            bytes,
            file_name,
            field_count,
        })
    }

    /// `Ok(None)` means "no usable template, use the data-only path"; an
    /// error means the template existed but fill or conversion failed.
    async fn render_with_template(
        &self,
        form: &Form,
        values: &[SubmittedValue],
    ) -> FormFlowResult<Option<Vec<u8>>> {
        let Some(relative) = &form.word_file_path else {
            return Ok(None);
        };
        // Only WordprocessingML templates are fillable.
        if !relative.to_lowercase().ends_with(".docx") {
            return Ok(None);
        }
        if !self.storage.exists(relative).await {
            warn!(form_id = %form.id, path = %relative, "template file missing on disk");
            return Ok(None);
        }

        let mut doc = DocxTemplate::open(self.storage.resolve(relative)).await?;
        let map = values_by_name(values);
        self.fill_engine.fill(&mut doc, &map)?;

        let bytes = self.backend.render(&doc).await?;
        Ok(Some(bytes))
    }
}

/// `{sanitized form name}_{yyyyMMdd_HHmmss}.pdf`
fn build_file_name(form_name: &str, now: DateTime<Utc>) -> String {
    let base = sanitize_file_name(form_name);
    format!("{}_{}.pdf", base, now.format("%Y%m%d_%H%M%S"))
}

fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !matches!(c, '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|') && !c.is_control())
        .collect();
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        "form".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::test_support::docx_from_paragraphs;
    use crate::render::LibraryBackend;
    use crate::submission::save_submission;
    use chrono::TimeZone;
    use formflow_models::{FormStatus, SubmissionStatus};

    fn sv(key: &str, value: &str) -> SubmittedValue {
        SubmittedValue {
            field_key: key.to_string(),
            field_type: "text".to_string(),
            label: key.to_string(),
            value: value.to_string(),
        }
    }

    async fn seed_form(store: &Store, word_file_path: Option<String>) -> Uuid {
        let form = Form {
            id: Uuid::new_v4(),
            name: "Crew Manifest".to_string(),
            category_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            word_file_path,
            status: FormStatus::Active,
            created_at: Utc::now(),
        };
        let id = form.id;
        let mut uow = store.begin().await;
        uow.state_mut().forms.insert(id, form);
        uow.commit();
        id
    }

    fn orchestrator(store: Store, storage: Arc<FileStorage>) -> ExportOrchestrator {
        ExportOrchestrator::new(
            store,
            storage,
            Arc::new(PdfBackend::Library(LibraryBackend)),
            "DejaVu Sans",
        )
    }

    #[test]
    fn test_file_name_is_sanitized_and_timestamped() {
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 8, 30, 0).unwrap();
        assert_eq!(
            build_file_name("Crew: Manifest?/2024", at),
            "Crew Manifest2024_20240305_083000.pdf"
        );
        assert_eq!(build_file_name("***", at), "form_20240305_083000.pdf");
    }

    #[tokio::test]
    async fn test_missing_form_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(Store::new(), Arc::new(FileStorage::new(dir.path())));

        let err = orch.export_form_pdf(Uuid::new_v4()).await.unwrap_err();
        assert_eq!(err.http_status_code(), 404);
    }

    #[tokio::test]
    async fn test_form_without_template_uses_data_only_path() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new();
        let form_id = seed_form(&store, None).await;

        let mut uow = store.begin().await;
        save_submission(
            uow.state_mut(),
            form_id,
            Uuid::new_v4(),
            &[sv("Name", "An"), sv("Rank", "Purser")],
            SubmissionStatus::Completed,
        )
        .unwrap();
        uow.commit();

        let orch = orchestrator(store, Arc::new(FileStorage::new(dir.path())));
        let exported = orch.export_form_pdf(form_id).await.unwrap();

        assert!(exported.bytes.starts_with(b"%PDF"));
        assert_eq!(exported.field_count, 2);
        assert!(exported.file_name.starts_with("Crew Manifest_"));
    }

    #[tokio::test]
    async fn test_template_path_missing_on_disk_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new();
        let form_id = seed_form(&store, Some("gone.docx".to_string())).await;

        let orch = orchestrator(store, Arc::new(FileStorage::new(dir.path())));
        let exported = orch.export_form_pdf(form_id).await.unwrap();
        assert!(exported.bytes.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn test_template_fill_path_renders_submitted_values() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(FileStorage::new(dir.path()));
        let bytes = docx_from_paragraphs(&["Name: {t_Name}"]);
        let rel = storage
            .save("manifest.docx", &bytes)
            .await
            .unwrap()
            .unwrap();

        let store = Store::new();
        let form_id = seed_form(&store, Some(rel)).await;
        let mut uow = store.begin().await;
        save_submission(
            uow.state_mut(),
            form_id,
            Uuid::new_v4(),
            &[sv("Name", "An")],
            SubmissionStatus::Submitted,
        )
        .unwrap();
        uow.commit();

        let orch = orchestrator(store, storage);
        let exported = orch.export_form_pdf(form_id).await.unwrap();
        assert!(exported.bytes.starts_with(b"%PDF"));
        assert_eq!(exported.field_count, 1);
    }
}
