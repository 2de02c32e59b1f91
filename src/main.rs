#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod commands;
mod db;
mod models;
mod services;
mod utils;

use anyhow::anyhow;
use tauri::Manager;

use crate::services::state::AppState;

fn main() {
    tracing_subscriber::fmt::init();

    tauri::Builder::default()
        .setup(|app| {
            let app_data_dir = app
                .path()
                .app_data_dir()
                .map_err(|e| anyhow!("App data dir: {}", e))?;
            std::fs::create_dir_all(&app_data_dir)?;

            let db_path = app_data_dir.join("provy.sqlite");
            let store = db::SqliteStore::new(db_path)?;
            let state = AppState::new(Box::new(store))?;
            app.manage(state);
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            commands::accounts::get_session,
            commands::accounts::switch_user,
            commands::accounts::update_profile,
            commands::accounts::set_role,
            commands::accounts::assign_team,
            commands::accounts::create_team,
            commands::settings::get_settings,
            commands::settings::save_settings,
            commands::settings::test_openai_key,
            commands::entries::get_entries,
            commands::entries::update_entry_field,
            commands::entries::delete_entry,
            commands::review::pick_invoice_files,
            commands::review::queue_uploads,
            commands::review::get_upload_queue,
            commands::review::retry_upload,
            commands::review::discard_upload,
            commands::review::prepare_review,
            commands::review::save_review_line,
            commands::review::open_invoice_file,
            commands::export::pick_export_folder,
            commands::export::export_entries,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
