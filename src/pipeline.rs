use crate::mapping;
use crate::types::{DetectedField, DocumentKind, FilledField, ProfileRecord, StagedFile};
use serde::Serialize;
use std::fs;
use std::io::Read;
use std::path::Path;

/// Sentinel shown in the fill preview for fields the profile cannot supply.
pub const PREVIEW_SENTINEL: &str = "Not in profile";
/// Sentinel embedded in the exported artifact for the same case.
/// Intentionally distinct from the preview sentinel.
pub const EXPORT_SENTINEL: &str = "[Not Available]";

pub const MAX_DOCUMENT_BYTES: u64 = 10 * 1024 * 1024;

/// Labels the detection step reports for a processed template, with the raw
/// form-field spelling each label carries in the document.
const DETECTED_LABELS: &[(&str, &str)] = &[
    ("Full Name", "fullName"),
    ("Email Address", "email"),
    ("Phone Number", "phone"),
    ("Address", "address"),
    ("Date of Birth", "dateOfBirth"),
    ("Position", "position"),
    ("Education", "educationLevel"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    #[default]
    Idle,
    FileStaged,
    Submitted,
    ProcessedSuccess,
    ProcessedFailure,
}

/// Snapshot of the pipeline for the frontend.
#[derive(Serialize)]
pub struct PipelineStatus {
    pub state: PipelineState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staged: Option<StagedFile>,
    pub detected_fields: Vec<DetectedField>,
    pub has_artifact: bool,
    pub errors: Vec<String>,
}

/// Explicit document-fill state machine. One instance lives in the managed
/// app state; there is no ambient "current document" anywhere else.
#[derive(Default)]
pub struct DocumentPipeline {
    state: PipelineState,
    staged: Option<StagedFile>,
    detected: Vec<DetectedField>,
    artifact: Option<Vec<u8>>,
    errors: Vec<String>,
    // Bumped whenever the staged file changes; completions carrying an old
    // value are dropped so stale detected fields never merge into a later upload.
    generation: u64,
}

fn kind_from_extension(path: &Path) -> Option<DocumentKind> {
    match path.extension().and_then(|e| e.to_str())?.to_lowercase().as_str() {
        "pdf" => Some(DocumentKind::Pdf),
        "jpg" | "jpeg" => Some(DocumentKind::Jpeg),
        "png" => Some(DocumentKind::Png),
        _ => None,
    }
}

fn header_matches(kind: DocumentKind, header: &[u8]) -> bool {
    match kind {
        DocumentKind::Pdf => header.len() >= 5 && header.starts_with(b"%PDF-"),
        DocumentKind::Png => {
            header.len() >= 8 && header.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A])
        }
        DocumentKind::Jpeg => header.len() >= 3 && header.starts_with(&[0xFF, 0xD8, 0xFF]),
    }
}

/// Validate a candidate document without touching any pipeline state:
/// accepted type (extension plus magic bytes) and the 10 MiB size cap.
pub fn validate_file(path_str: &str) -> Result<StagedFile, String> {
    let path = Path::new(path_str);
    if !path.exists() {
        return Err("File not found.".to_string());
    }
    let kind = kind_from_extension(path)
        .ok_or_else(|| "Please upload a PDF, JPG, or PNG file".to_string())?;
    let metadata = fs::metadata(path).map_err(|e| e.to_string())?;
    if metadata.len() > MAX_DOCUMENT_BYTES {
        return Err("File size must be less than 10MB".to_string());
    }
    let mut f = fs::File::open(path).map_err(|e| format!("Could not open: {}", e))?;
    let mut header = [0u8; 8];
    let read = f.read(&mut header).unwrap_or(0);
    if !header_matches(kind, &header[..read]) {
        return Err("File content does not match its extension.".to_string());
    }
    let file_name = path
        .file_name()
        .and_then(|o| o.to_str())
        .unwrap_or("")
        .to_string();
    Ok(StagedFile {
        path: path_str.to_string(),
        file_name,
        size: metadata.len(),
        kind,
    })
}

/// The detection set for a processed document, resolved through the alias table.
pub fn default_detected_fields() -> Vec<DetectedField> {
    DETECTED_LABELS
        .iter()
        .map(|&(label, raw)| DetectedField {
            label: label.to_string(),
            key: mapping::resolve(raw).map(String::from),
        })
        .collect()
}

/// Merge rule: exactly one entry per detected field, in order; the profile
/// value when the mapped key has one, otherwise the given sentinel.
pub fn fill_document(
    fields: &[DetectedField],
    profile: &ProfileRecord,
    sentinel: &str,
) -> Vec<FilledField> {
    fields
        .iter()
        .map(|field| {
            let value = field
                .key
                .as_deref()
                .and_then(|key| profile.get(key))
                .filter(|v| !v.is_empty())
                .cloned()
                .unwrap_or_else(|| sentinel.to_string());
            FilledField {
                label: field.label.clone(),
                value,
            }
        })
        .collect()
}

impl DocumentPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and stage a file. Validation failures leave the pipeline,
    /// including any previously staged file, untouched. Success replaces
    /// the staged file, drops stale results and moves to `FileStaged`.
    pub fn stage_file(&mut self, path: &str) -> Result<StagedFile, String> {
        let staged = validate_file(path)?;
        self.staged = Some(staged.clone());
        self.detected.clear();
        self.artifact = None;
        self.errors.clear();
        self.state = PipelineState::FileStaged;
        self.generation += 1;
        Ok(staged)
    }

    /// Check preconditions and move to `Submitted`. Returns the staged file
    /// and a submission token the completion must present. Fails without
    /// any side effect (and before any network call) when a requirement is
    /// missing or a submission is already in flight.
    pub fn begin_submit(&mut self, has_profile: bool) -> Result<(StagedFile, u64), String> {
        if self.state == PipelineState::Submitted {
            return Err(
                "A submission is already in progress. Please wait for it to finish.".to_string(),
            );
        }
        if !has_profile {
            return Err("Please create your profile first".to_string());
        }
        let staged = self
            .staged
            .clone()
            .ok_or_else(|| "Please upload a document first!".to_string())?;
        self.state = PipelineState::Submitted;
        Ok((staged, self.generation))
    }

    /// Record a successful submission. Dropped silently when the token is
    /// stale (the file was removed or replaced while the call was in flight).
    pub fn complete_success(&mut self, token: u64, artifact: Vec<u8>, detected: Vec<DetectedField>) {
        if token != self.generation || self.state != PipelineState::Submitted {
            return;
        }
        self.artifact = Some(artifact);
        self.detected = detected;
        self.errors.clear();
        self.state = PipelineState::ProcessedSuccess;
    }

    /// Record a failed submission, same staleness rule as `complete_success`.
    pub fn complete_failure(&mut self, token: u64, errors: Vec<String>) {
        if token != self.generation || self.state != PipelineState::Submitted {
            return;
        }
        self.artifact = None;
        self.detected.clear();
        self.errors = errors;
        self.state = PipelineState::ProcessedFailure;
    }

    /// Clear the staged file and every derived result; back to `Idle`
    /// regardless of prior state. In-flight submissions become stale.
    pub fn remove_file(&mut self) {
        self.staged = None;
        self.detected.clear();
        self.artifact = None;
        self.errors.clear();
        self.state = PipelineState::Idle;
        self.generation += 1;
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn detected_fields(&self) -> &[DetectedField] {
        &self.detected
    }

    pub fn artifact(&self) -> Option<&[u8]> {
        self.artifact.as_deref()
    }

    pub fn status(&self) -> PipelineStatus {
        PipelineStatus {
            state: self.state,
            staged: self.staged.clone(),
            detected_fields: self.detected.clone(),
            has_artifact: self.artifact.is_some(),
            errors: self.errors.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const PNG_MAGIC: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

    fn write_file(dir: &tempfile::TempDir, name: &str, bytes: &[u8]) -> String {
        let path = dir.path().join(name);
        let mut f = fs::File::create(&path).expect("create");
        f.write_all(bytes).expect("write");
        path.to_str().unwrap().to_string()
    }

    fn small_png(dir: &tempfile::TempDir, name: &str) -> String {
        let mut bytes = PNG_MAGIC.to_vec();
        bytes.extend_from_slice(&[0u8; 16]);
        write_file(dir, name, &bytes)
    }

    fn profile_with(key: &str, value: &str) -> ProfileRecord {
        let mut p = ProfileRecord::new();
        p.insert(key.into(), value.into());
        p
    }

    #[test]
    fn rejects_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "resume.docx", b"PK\x03\x04 something");
        let err = validate_file(&path).unwrap_err();
        assert_eq!(err, "Please upload a PDF, JPG, or PNG file");
    }

    #[test]
    fn rejects_oversized_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut bytes = PNG_MAGIC.to_vec();
        bytes.resize((MAX_DOCUMENT_BYTES + 1) as usize, 0);
        let path = write_file(&dir, "big.png", &bytes);
        let err = validate_file(&path).unwrap_err();
        assert_eq!(err, "File size must be less than 10MB");
    }

    #[test]
    fn rejects_content_not_matching_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "fake.pdf", b"just text, no pdf header");
        assert!(validate_file(&path).is_err());
    }

    #[test]
    fn rejection_leaves_previously_staged_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let good = small_png(&dir, "form.png");
        let bad = write_file(&dir, "notes.docx", b"nope");

        let mut pipeline = DocumentPipeline::new();
        pipeline.stage_file(&good).unwrap();
        assert!(pipeline.stage_file(&bad).is_err());

        let status = pipeline.status();
        assert_eq!(status.state, PipelineState::FileStaged);
        assert_eq!(status.staged.unwrap().file_name, "form.png");
    }

    #[test]
    fn submit_requires_a_profile_before_anything_else() {
        let dir = tempfile::tempdir().unwrap();
        let mut pipeline = DocumentPipeline::new();
        pipeline.stage_file(&small_png(&dir, "form.png")).unwrap();
        let err = pipeline.begin_submit(false).unwrap_err();
        assert!(err.contains("profile"), "{err}");
        assert_eq!(pipeline.state(), PipelineState::FileStaged);
    }

    #[test]
    fn submit_requires_a_staged_file() {
        let mut pipeline = DocumentPipeline::new();
        let err = pipeline.begin_submit(true).unwrap_err();
        assert!(err.contains("upload"), "{err}");
        assert_eq!(pipeline.state(), PipelineState::Idle);
    }

    #[test]
    fn second_submission_in_flight_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut pipeline = DocumentPipeline::new();
        pipeline.stage_file(&small_png(&dir, "form.png")).unwrap();
        pipeline.begin_submit(true).unwrap();
        let err = pipeline.begin_submit(true).unwrap_err();
        assert!(err.contains("already in progress"), "{err}");
    }

    #[test]
    fn stale_completion_is_dropped_after_remove() {
        let dir = tempfile::tempdir().unwrap();
        let mut pipeline = DocumentPipeline::new();
        pipeline.stage_file(&small_png(&dir, "form.png")).unwrap();
        let (_staged, token) = pipeline.begin_submit(true).unwrap();

        pipeline.remove_file();
        pipeline.complete_success(token, vec![1, 2, 3], default_detected_fields());

        assert_eq!(pipeline.state(), PipelineState::Idle);
        assert!(pipeline.detected_fields().is_empty());
        assert!(pipeline.artifact().is_none());
    }

    #[test]
    fn completion_with_current_token_lands() {
        let dir = tempfile::tempdir().unwrap();
        let mut pipeline = DocumentPipeline::new();
        pipeline.stage_file(&small_png(&dir, "form.png")).unwrap();
        let (_staged, token) = pipeline.begin_submit(true).unwrap();
        pipeline.complete_success(token, vec![0xFF], default_detected_fields());
        assert_eq!(pipeline.state(), PipelineState::ProcessedSuccess);
        assert_eq!(pipeline.detected_fields().len(), DETECTED_LABELS.len());
        assert!(pipeline.artifact().is_some());
    }

    #[test]
    fn failure_returns_error_list_and_clears_results() {
        let dir = tempfile::tempdir().unwrap();
        let mut pipeline = DocumentPipeline::new();
        pipeline.stage_file(&small_png(&dir, "form.png")).unwrap();
        let (_staged, token) = pipeline.begin_submit(true).unwrap();
        pipeline.complete_failure(token, vec!["no template".into()]);
        assert_eq!(pipeline.state(), PipelineState::ProcessedFailure);
        assert_eq!(pipeline.status().errors, vec!["no template".to_string()]);
        assert!(pipeline.artifact().is_none());
    }

    #[test]
    fn remove_file_returns_to_idle_from_any_state() {
        let dir = tempfile::tempdir().unwrap();
        let mut pipeline = DocumentPipeline::new();
        pipeline.remove_file();
        assert_eq!(pipeline.state(), PipelineState::Idle);

        pipeline.stage_file(&small_png(&dir, "form.png")).unwrap();
        let (_staged, token) = pipeline.begin_submit(true).unwrap();
        pipeline.complete_success(token, vec![1], default_detected_fields());
        pipeline.remove_file();

        let status = pipeline.status();
        assert_eq!(status.state, PipelineState::Idle);
        assert!(status.staged.is_none());
        assert!(status.detected_fields.is_empty());
        assert!(!status.has_artifact);
    }

    #[test]
    fn merge_uses_the_exact_preview_and_export_sentinels() {
        let fields = vec![DetectedField {
            label: "Full Name".into(),
            key: Some("full_name".into()),
        }];
        let profile = ProfileRecord::new();

        let preview = fill_document(&fields, &profile, PREVIEW_SENTINEL);
        assert_eq!(preview[0].value, "Not in profile");

        let export = fill_document(&fields, &profile, EXPORT_SENTINEL);
        assert_eq!(export[0].value, "[Not Available]");
    }

    #[test]
    fn merge_keeps_order_with_one_entry_per_field() {
        let fields = vec![
            DetectedField { label: "Email Address".into(), key: Some("email".into()) },
            DetectedField { label: "Mystery Field".into(), key: None },
            DetectedField { label: "Phone Number".into(), key: Some("phone".into()) },
        ];
        let profile = profile_with("email", "juan@example.com");

        let filled = fill_document(&fields, &profile, PREVIEW_SENTINEL);
        assert_eq!(filled.len(), 3);
        assert_eq!(filled[0].value, "juan@example.com");
        assert_eq!(filled[1].label, "Mystery Field");
        assert_eq!(filled[1].value, PREVIEW_SENTINEL);
        assert_eq!(filled[2].value, PREVIEW_SENTINEL);
    }

    #[test]
    fn detection_set_resolves_through_the_alias_table() {
        let fields = default_detected_fields();
        assert_eq!(fields.len(), 7);
        assert_eq!(fields[0].key.as_deref(), Some("full_name"));
        assert_eq!(fields[4].key.as_deref(), Some("date_of_birth"));
        assert_eq!(fields[6].key.as_deref(), Some("education"));
        assert!(fields.iter().all(|f| f.key.is_some()));
    }
}
