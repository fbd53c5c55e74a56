mod commands;
mod db;
mod export;
mod mapping;
mod pipeline;
mod session;
mod store;
mod types;

use commands::AppState;
use pipeline::DocumentPipeline;
use std::sync::{Arc, Mutex};
use tauri::Manager;

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    tauri::Builder::default()
        .plugin(tauri_plugin_dialog::init())
        .plugin(tauri_plugin_opener::init())
        .setup(|app| {
            let app_data_dir = app.path().app_data_dir().map_err(|e| e.to_string())?;
            // Load .env from app data dir so users can point the app at their form server (Settings → Open app data folder)
            let env_path = app_data_dir.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
            }
            #[cfg(debug_assertions)]
            for (alias, winner, shadowed) in mapping::alias_conflicts() {
                eprintln!(
                    "[mapping] alias '{}' appears under both '{}' and '{}'; '{}' wins by declaration order",
                    alias, winner, shadowed, winner
                );
            }
            let db_path = app_data_dir.join("form_autofill.db");
            let db = db::Db::new(db_path)?;
            app.manage(AppState {
                db: Mutex::new(Some(Arc::new(db))),
                pipeline: Mutex::new(DocumentPipeline::new()),
            });
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            commands::get_app_data_path,
            commands::open_app_data_folder,
            commands::get_app_version,
            commands::get_server_status,
            commands::save_profile,
            commands::load_profile,
            commands::clear_profile,
            commands::has_profile,
            commands::validate_document_file,
            commands::stage_document,
            commands::remove_document,
            commands::document_status,
            commands::process_document,
            commands::fill_preview,
            commands::export_filled_document,
            commands::get_recent_documents,
            commands::read_file_base64,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
