use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// One submitted field value inside a submission payload.
///
/// Stored in aggregate as a JSON array per (form, user) submission record;
/// never persisted row-by-row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedValue {
    pub field_key: String,
    pub field_type: String,
    pub label: String,
    pub value: String,
}

/// Fold a values list into a name -> value lookup.
///
/// Duplicate field keys collapse to the last value; every read path builds
/// its map this way so the collapse is consistent.
pub fn values_by_name(values: &[SubmittedValue]) -> HashMap<String, String> {
    values
        .iter()
        .map(|v| (v.field_key.clone(), v.value.clone()))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionStatus {
    Draft,
    Completed,
    Submitted,
    Unknown,
}

impl SubmissionStatus {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "draft" => Self::Draft,
            "completed" => Self::Completed,
            "submitted" => Self::Submitted,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Draft => write!(f, "draft"),
            Self::Completed => write!(f, "completed"),
            Self::Submitted => write!(f, "submitted"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Live submission record, one per (form, user). Each save supersedes the
/// previous JSON blob; nothing is merged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormSubmission {
    pub id: Uuid,
    pub form_id: Uuid,
    pub user_id: Uuid,
    pub field_values_json: String,
    pub status: SubmissionStatus,
    pub last_updated: DateTime<Utc>,
}

/// Immutable history row appended on every save.
///
/// Timestamps depend on status: drafts carry `filled_at` only, completed or
/// submitted saves carry both, anything else carries `finished_at` only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionHistory {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub status: SubmissionStatus,
    pub filled_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}
