use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Semantic type of a form field, inferred from the placeholder name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    Text,
    Date,
    Email,
    Phone,
    Number,
    Checkbox,
    Select,
    Textarea,
}

impl FieldType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(Self::Text),
            "date" => Some(Self::Date),
            "email" => Some(Self::Email),
            "phone" => Some(Self::Phone),
            "number" => Some(Self::Number),
            "checkbox" => Some(Self::Checkbox),
            "select" => Some(Self::Select),
            "textarea" => Some(Self::Textarea),
            _ => None,
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Date => write!(f, "date"),
            Self::Email => write!(f, "email"),
            Self::Phone => write!(f, "phone"),
            Self::Number => write!(f, "number"),
            Self::Checkbox => write!(f, "checkbox"),
            Self::Select => write!(f, "select"),
            Self::Textarea => write!(f, "textarea"),
        }
    }
}

/// Reusable field definition shared across forms.
///
/// Created the first time a placeholder name is seen; later scans reuse the
/// existing definition unmodified. Name comparison is case-insensitive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub id: Uuid,
    pub name: String,
    pub field_type: FieldType,
    pub description: String,
    pub is_required: bool,
    pub is_upper_case: bool,
    pub created_at: DateTime<Utc>,
}

/// Join of a form to a field definition.
///
/// `formula` is the placeholder literal exactly as it appeared in the source
/// document, e.g. `{c_Purser}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormFieldLink {
    pub id: Uuid,
    pub form_id: Uuid,
    pub field_id: Uuid,
    pub formula: String,
    pub created_at: DateTime<Utc>,
}

/// Placeholder discovered by the scanner, before it is reconciled against
/// the field catalog. Ephemeral, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderDescriptor {
    pub name: String,
    pub field_type: FieldType,
    pub description: String,
    pub is_required: bool,
    pub is_upper_case: bool,
    pub formula: String,
}
