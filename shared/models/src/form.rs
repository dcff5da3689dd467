use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A digitized form built from an uploaded document template.
///
/// `word_file_path` is the relative storage path of the original template.
/// A form without one is still exportable through the data-only PDF path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Form {
    pub id: Uuid,
    pub name: String,
    pub category_id: Uuid,
    pub user_id: Uuid,
    pub word_file_path: Option<String>,
    pub status: FormStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormStatus {
    Active,
    Archived,
}

impl std::fmt::Display for FormStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Archived => write!(f, "archived"),
        }
    }
}

/// End user allowed to create forms and submit values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub display_name: String,
}

/// Form category, resolved or created by name on form creation.
///
/// The parent/child hierarchy is managed elsewhere; the pipeline only needs
/// the owning category id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub parent_id: Option<Uuid>,
}
