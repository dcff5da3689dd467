//! Form Service
//!
//! Business surface behind the HTTP handlers: form creation with placeholder
//! extraction, field listing, submission save/read, and PDF export.

use crate::catalog;
use crate::docx::DocxTemplate;
use crate::export::{ExportOrchestrator, ExportedPdf};
use crate::render::PdfBackend;
use crate::scanner::PlaceholderScanner;
use crate::storage::FileStorage;
use crate::store::Store;
use crate::submission::{self, SubmissionOutcome};
use chrono::{DateTime, Utc};
use formflow_models::{Form, FormStatus, SubmissionStatus, SubmittedValue, User};
use formflow_utils::{FormFlowError, FormFlowResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug)]
pub struct TemplateUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug)]
pub struct CreateFormRequest {
    pub name: String,
    pub category: String,
    pub user_id: Uuid,
    pub template: Option<TemplateUpload>,
}

#[derive(Debug, Serialize)]
pub struct CreatedForm {
    pub form_id: Uuid,
    pub name: String,
    pub status: String,
    pub fields_created: usize,
    pub fields_linked: usize,
}

#[derive(Debug, Serialize)]
pub struct FormFieldView {
    pub form_field_id: Uuid,
    pub field_id: Uuid,
    pub field_name: String,
    pub field_type: String,
    pub description: String,
    pub is_required: bool,
    pub is_upper_case: bool,
    pub formula: String,
}

#[derive(Debug, Deserialize)]
pub struct SaveSubmissionRequest {
    pub user_id: Uuid,
    pub status: String,
    pub field_values: Vec<SubmittedValue>,
}

#[derive(Debug, Serialize)]
pub struct LatestSubmissionView {
    pub submission_id: Uuid,
    pub status: String,
    pub field_values: Vec<SubmittedValue>,
    pub last_updated: DateTime<Utc>,
}

pub struct FormService {
    store: Store,
    storage: Arc<FileStorage>,
    scanner: PlaceholderScanner,
    orchestrator: ExportOrchestrator,
}

impl FormService {
    pub fn new(
        store: Store,
        storage: Arc<FileStorage>,
        backend: Arc<PdfBackend>,
        font: impl Into<String>,
    ) -> Self {
        let font = font.into();
        Self {
            orchestrator: ExportOrchestrator::new(
                store.clone(),
                storage.clone(),
                backend,
                font,
            ),
            store,
            storage,
            scanner: PlaceholderScanner::new(),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub async fn seed_user(&self, username: &str, display_name: &str) -> Uuid {
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            display_name: display_name.to_string(),
        };
        let id = user.id;
        self.store.insert_user(user).await;
        id
    }

    /// Create a form: store the template, scan it for placeholders, then
    /// create the form, any new field definitions and all links in one
    /// transaction.
    pub async fn create_form(&self, request: CreateFormRequest) -> FormFlowResult<CreatedForm> {
        {
            let db = self.store.read().await;
            if !db.users.contains_key(&request.user_id) {
                return Err(FormFlowError::not_found("User"));
            }
        }
        if request.name.trim().is_empty() {
            return Err(FormFlowError::validation("name", "form name is required"));
        }

        let mut word_file_path = None;
        let mut descriptors = Vec::new();

        if let Some(upload) = &request.template {
            let saved = self.storage.save(&upload.file_name, &upload.bytes).await?;
            let Some(relative) = saved else {
                return Err(FormFlowError::validation(
                    "template",
                    "file extension not allowed (expected .doc, .docx or .pdf)",
                ));
            };

            match extract_template_text(&upload.file_name, &upload.bytes) {
                Ok(Some(text)) => descriptors = self.scanner.scan(&text),
                Ok(None) => {
                    warn!(file = %upload.file_name, "template format not scannable, no fields extracted")
                }
                Err(e) => {
                    // Scan failure aborts creation; remove the orphaned file.
                    self.storage.delete(&relative).await;
                    return Err(e);
                }
            }
            word_file_path = Some(relative);
        }

        let mut uow = self.store.begin().await;
        let db = uow.state_mut();
        let category_id = db.ensure_category(&request.category);

        let form = Form {
            id: Uuid::new_v4(),
            name: request.name.clone(),
            category_id,
            user_id: request.user_id,
            word_file_path,
            status: FormStatus::Active,
            created_at: Utc::now(),
        };
        let form_id = form.id;
        let status = form.status.to_string();
        db.forms.insert(form_id, form);

        let fields_created = catalog::reconcile(db, form_id, &descriptors);
        uow.commit();

        info!(form_id = %form_id, fields_created, "form created");
        Ok(CreatedForm {
            form_id,
            name: request.name,
            status,
            fields_created,
            fields_linked: descriptors.len(),
        })
    }

    /// Fields of a form, deduplicated by field id (first link wins) and
    /// sorted by field name.
    pub async fn form_fields(&self, form_id: Uuid) -> FormFlowResult<Vec<FormFieldView>> {
        let db = self.store.read().await;
        let mut seen = HashSet::new();
        let mut rows: Vec<FormFieldView> = db
            .links_for_form(form_id)
            .into_iter()
            .filter_map(|link| {
                let field = db.fields.get(&link.field_id)?;
                if !seen.insert(field.id) {
                    return None;
                }
                Some(FormFieldView {
                    form_field_id: link.id,
                    field_id: field.id,
                    field_name: field.name.clone(),
                    field_type: field.field_type.to_string(),
                    description: field.description.clone(),
                    is_required: field.is_required,
                    is_upper_case: field.is_upper_case,
                    formula: link.formula.clone(),
                })
            })
            .collect();

        if rows.is_empty() {
            return Err(FormFlowError::not_found("Form fields"));
        }
        rows.sort_by(|a, b| a.field_name.cmp(&b.field_name));
        Ok(rows)
    }

    pub async fn save_submission(
        &self,
        form_id: Uuid,
        request: SaveSubmissionRequest,
    ) -> FormFlowResult<SubmissionOutcome> {
        {
            let db = self.store.read().await;
            if !db.forms.contains_key(&form_id) {
                return Err(FormFlowError::not_found("Form"));
            }
        }

        let status = SubmissionStatus::parse(&request.status);
        let mut uow = self.store.begin().await;
        let outcome = submission::save_submission(
            uow.state_mut(),
            form_id,
            request.user_id,
            &request.field_values,
            status,
        )?;
        uow.commit();
        Ok(outcome)
    }

    pub async fn latest_submission(&self, form_id: Uuid) -> FormFlowResult<LatestSubmissionView> {
        let db = self.store.read().await;
        let (record, field_values) = submission::latest_values(&db, form_id)
            .ok_or_else(|| FormFlowError::not_found("Submission"))?;

        Ok(LatestSubmissionView {
            submission_id: record.id,
            status: record.status.to_string(),
            field_values,
            last_updated: record.last_updated,
        })
    }

    pub async fn export_form_pdf(&self, form_id: Uuid) -> FormFlowResult<ExportedPdf> {
        self.orchestrator.export_form_pdf(form_id).await
    }
}

/// Plain text of an uploaded template, by format. `Ok(None)` means the
/// format is stored but not scannable (legacy binary `.doc`).
fn extract_template_text(file_name: &str, bytes: &[u8]) -> FormFlowResult<Option<String>> {
    match FileStorage::extension_of(file_name).as_deref() {
        Some("docx") => Ok(Some(DocxTemplate::from_bytes(bytes)?.text()?)),
        Some("pdf") => {
            let text = pdf_extract::extract_text_from_mem(bytes).map_err(|e| {
                FormFlowError::document_processing(format!("pdf text extraction failed: {e}"))
            })?;
            Ok(Some(text))
        }
        _ => Ok(None),
    }
}
