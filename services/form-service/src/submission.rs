//! Submission store.
//!
//! One live record per (form, user), superseded on every save, plus an
//! append-only history row whose timestamps depend on the saved status.

use crate::store::DbState;
use chrono::Utc;
use formflow_models::{FormSubmission, SubmissionHistory, SubmissionStatus, SubmittedValue};
use formflow_utils::FormFlowResult;
use tracing::warn;
use uuid::Uuid;

#[derive(Debug, Clone, serde::Serialize)]
pub struct SubmissionOutcome {
    pub submission_id: Uuid,
    pub history_id: Uuid,
    pub is_new_record: bool,
}

/// Save a submission: upsert the live record and append a history row.
pub fn save_submission(
    db: &mut DbState,
    form_id: Uuid,
    user_id: Uuid,
    values: &[SubmittedValue],
    status: SubmissionStatus,
) -> FormFlowResult<SubmissionOutcome> {
    let json = serde_json::to_string(values)?;
    let now = Utc::now();

    let existing_id = db.submission_for(form_id, user_id).map(|s| s.id);
    let (submission_id, is_new_record) = match existing_id {
        Some(id) => {
            if let Some(record) = db.submissions.get_mut(&id) {
                record.field_values_json = json;
                record.status = status;
                record.last_updated = now;
            }
            (id, false)
        }
        None => {
            let record = FormSubmission {
                id: Uuid::new_v4(),
                form_id,
                user_id,
                field_values_json: json,
                status,
                last_updated: now,
            };
            let id = record.id;
            db.submissions.insert(id, record);
            (id, true)
        }
    };

    // Drafts record the fill moment only; completed and submitted saves
    // record both; anything else records the finish moment only.
    let (filled_at, finished_at) = match status {
        SubmissionStatus::Draft => (Some(now), None),
        SubmissionStatus::Completed | SubmissionStatus::Submitted => (Some(now), Some(now)),
        SubmissionStatus::Unknown => (None, Some(now)),
    };
    let history = SubmissionHistory {
        id: Uuid::new_v4(),
        submission_id,
        status,
        filled_at,
        finished_at,
    };
    let history_id = history.id;
    db.history.insert(history_id, history);

    Ok(SubmissionOutcome {
        submission_id,
        history_id,
        is_new_record,
    })
}

/// Latest submission for a form with its parsed values. A malformed JSON
/// blob is logged and treated as an empty value list, never as a failure.
pub fn latest_values(db: &DbState, form_id: Uuid) -> Option<(FormSubmission, Vec<SubmittedValue>)> {
    let record = db.latest_submission_for_form(form_id)?.clone();
    let values = parse_values(&record.field_values_json, form_id);
    Some((record, values))
}

pub fn parse_values(json: &str, form_id: Uuid) -> Vec<SubmittedValue> {
    match serde_json::from_str(json) {
        Ok(values) => values,
        Err(e) => {
            warn!(form_id = %form_id, error = %e, "submission JSON unreadable, treating as empty");
            Vec::new()
        }
    }
}
