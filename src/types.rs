use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Flat profile record keyed by canonical field keys. Unknown keys are
/// opaque passthrough data: stored and returned, never auto-mapped.
pub type ProfileRecord = HashMap<String, String>;

/// Accepted document kinds for the fill pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Pdf,
    Jpeg,
    Png,
}

/// A file accepted by `stage_file`, ready for submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagedFile {
    pub path: String,
    pub file_name: String,
    pub size: u64,
    pub kind: DocumentKind,
}

/// A field identified in the document, paired with its canonical profile
/// key when one of its spellings is known to the alias table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectedField {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

/// One entry of a filled document: the detected label and either the
/// profile value or a presentation-specific sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilledField {
    pub label: String,
    pub value: String,
}

#[derive(Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A document recorded in local history after successful processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: i64,
    pub filename: String,
    pub processed_at: String,
}
