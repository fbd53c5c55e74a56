use crate::db::Db;
use crate::export;
use crate::pipeline::{self, DocumentPipeline, PipelineState, PipelineStatus};
use crate::session::{self, SessionClient};
use crate::store::ProfileStore;
use crate::types::{DetectedField, DocumentRecord, FilledField, ProfileRecord, StagedFile, ValidationResult};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tauri::{AppHandle, Manager, State};

pub struct AppState {
    pub db: Mutex<Option<Arc<Db>>>,
    pub pipeline: Mutex<DocumentPipeline>,
}

/// Result of a completed submission: the merged fill preview plus the
/// rendered form image for display in the webview.
#[derive(Serialize)]
pub struct ProcessResult {
    pub detected_fields: Vec<DetectedField>,
    pub preview: Vec<FilledField>,
    pub artifact_base64: String,
}

fn db_handle(state: &State<AppState>) -> Result<Arc<Db>, String> {
    let db = state.db.lock().map_err(|e| e.to_string())?;
    db.clone().ok_or_else(|| "Database not initialized".to_string())
}

/// History is best-effort: a failed insert is logged, never surfaced, so a
/// processing run that already succeeded is not reported as an error.
fn record_document_history(db: &Db, filename: &str) {
    if let Err(e) = db.add_document(filename) {
        eprintln!("[commands] history write failed: {}", e);
    }
}

#[tauri::command]
pub fn get_app_data_path(app: AppHandle) -> Result<String, String> {
    let path = app.path().app_data_dir().map_err(|e| e.to_string())?;
    path.to_str()
        .map(String::from)
        .ok_or_else(|| "Invalid path".to_string())
}

#[tauri::command]
pub fn get_app_version(app: AppHandle) -> String {
    app.package_info().version.to_string()
}

#[tauri::command]
pub fn get_server_status() -> String {
    if session::is_configured() {
        "configured".to_string()
    } else {
        "not_configured".to_string()
    }
}

#[tauri::command]
pub fn open_app_data_folder(app: AppHandle) -> Result<(), String> {
    let path = app.path().app_data_dir().map_err(|e| e.to_string())?;
    opener::open(&path).map_err(|e| e.to_string())
}

/// Save, load and clear all reach the form server session, so they run on a
/// blocking task; the webview thread is never parked on the network.
#[tauri::command]
pub async fn save_profile(state: State<'_, AppState>, record: ProfileRecord) -> Result<(), String> {
    let db = db_handle(&state)?;
    tauri::async_runtime::spawn_blocking(move || ProfileStore::new(&db).save(&record))
        .await
        .map_err(|e| e.to_string())?
}

#[tauri::command]
pub async fn load_profile(state: State<'_, AppState>) -> Result<ProfileRecord, String> {
    let db = db_handle(&state)?;
    tauri::async_runtime::spawn_blocking(move || ProfileStore::new(&db).load())
        .await
        .map_err(|e| e.to_string())?
}

#[tauri::command]
pub async fn clear_profile(state: State<'_, AppState>) -> Result<(), String> {
    let db = db_handle(&state)?;
    tauri::async_runtime::spawn_blocking(move || ProfileStore::new(&db).clear())
        .await
        .map_err(|e| e.to_string())?
}

#[tauri::command]
pub fn has_profile(state: State<AppState>) -> Result<bool, String> {
    let db = db_handle(&state)?;
    ProfileStore::new(&db).has_profile()
}

/// Non-fatal validation for the upload UI; does not touch pipeline state.
#[tauri::command]
pub fn validate_document_file(path: String) -> ValidationResult {
    match pipeline::validate_file(&path) {
        Ok(_) => ValidationResult {
            valid: true,
            error: None,
        },
        Err(e) => ValidationResult {
            valid: false,
            error: Some(e),
        },
    }
}

#[tauri::command]
pub fn stage_document(state: State<AppState>, path: String) -> Result<StagedFile, String> {
    let mut pipeline = state.pipeline.lock().map_err(|e| e.to_string())?;
    pipeline.stage_file(&path)
}

#[tauri::command]
pub fn remove_document(state: State<AppState>) -> Result<(), String> {
    let mut pipeline = state.pipeline.lock().map_err(|e| e.to_string())?;
    pipeline.remove_file();
    Ok(())
}

#[tauri::command]
pub fn document_status(state: State<AppState>) -> Result<PipelineStatus, String> {
    let pipeline = state.pipeline.lock().map_err(|e| e.to_string())?;
    Ok(pipeline.status())
}

/// Submit the staged document: upload, process into a rendered image, merge
/// the detection set with the profile. The network part runs on a blocking
/// task; the pipeline is only locked before and after it.
#[tauri::command]
pub async fn process_document(state: State<'_, AppState>) -> Result<ProcessResult, String> {
    let db = db_handle(&state)?;
    let profile = {
        let store = ProfileStore::new(&db);
        if !store.has_profile()? {
            return Err("Please create your profile first".to_string());
        }
        db.load_profile()?
    };

    let (staged, token) = {
        let mut pipeline = state.pipeline.lock().map_err(|e| e.to_string())?;
        pipeline.begin_submit(true)?
    };

    let file_path = staged.path.clone();
    let outcome = match tauri::async_runtime::spawn_blocking(move || -> Result<Vec<u8>, String> {
        let client = SessionClient::new()?;
        client.upload_document(&file_path)?;
        client.process_document()
    })
    .await
    {
        Ok(result) => result,
        Err(e) => Err(format!("Task join error: {}", e)),
    };

    match outcome {
        Ok(artifact) => {
            let detected = pipeline::default_detected_fields();
            let landed = {
                let mut pipeline = state.pipeline.lock().map_err(|e| e.to_string())?;
                pipeline.complete_success(token, artifact.clone(), detected.clone());
                pipeline.state() == PipelineState::ProcessedSuccess
            };
            if !landed {
                return Err("Document was removed during processing.".to_string());
            }
            record_document_history(&db, &staged.file_name);
            let preview = pipeline::fill_document(&detected, &profile, pipeline::PREVIEW_SENTINEL);
            Ok(ProcessResult {
                detected_fields: detected,
                preview,
                artifact_base64: BASE64.encode(&artifact),
            })
        }
        Err(e) => {
            let mut pipeline = state.pipeline.lock().map_err(|err| err.to_string())?;
            pipeline.complete_failure(token, vec![e.clone()]);
            Err(e)
        }
    }
}

/// Merged preview for the auto-fill view; `None` until a document has been
/// processed successfully.
#[tauri::command]
pub fn fill_preview(state: State<AppState>) -> Result<Option<Vec<FilledField>>, String> {
    let detected = {
        let pipeline = state.pipeline.lock().map_err(|e| e.to_string())?;
        if pipeline.state() != PipelineState::ProcessedSuccess {
            return Ok(None);
        }
        pipeline.detected_fields().to_vec()
    };
    let profile = db_handle(&state)?.load_profile()?;
    Ok(Some(pipeline::fill_document(
        &detected,
        &profile,
        pipeline::PREVIEW_SENTINEL,
    )))
}

/// Export the filled document as a standalone artifact. Write happens on a
/// blocking task; returns the written path.
#[tauri::command]
pub async fn export_filled_document(
    state: State<'_, AppState>,
    path: Option<String>,
) -> Result<String, String> {
    let (detected, artifact) = {
        let pipeline = state.pipeline.lock().map_err(|e| e.to_string())?;
        if pipeline.state() != PipelineState::ProcessedSuccess {
            return Err("No processed document to export.".to_string());
        }
        (
            pipeline.detected_fields().to_vec(),
            pipeline.artifact().map(|a| a.to_vec()),
        )
    };
    let profile = db_handle(&state)?.load_profile()?;
    let filled = pipeline::fill_document(&detected, &profile, pipeline::EXPORT_SENTINEL);

    tauri::async_runtime::spawn_blocking(move || {
        export::export_filled_document(&filled, artifact.as_deref(), path.as_deref())
    })
    .await
    .map_err(|e| e.to_string())?
}

#[tauri::command]
pub fn get_recent_documents(state: State<AppState>) -> Result<Vec<DocumentRecord>, String> {
    let db = db_handle(&state)?;
    db.recent_documents(50)
}

#[tauri::command]
pub fn read_file_base64(path: String) -> Result<String, String> {
    let bytes = fs::read(Path::new(&path)).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            "File not found.".to_string()
        } else {
            format!("Could not read file: {}", e)
        }
    })?;
    Ok(BASE64.encode(&bytes))
}
