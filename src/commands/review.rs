use tauri::{AppHandle, State};

use crate::models::{ReviewDraft, UploadItem};
use crate::services::review::{SaveConfirmations, SaveOutcome};
use crate::services::state::AppState;

#[tauri::command]
pub async fn pick_invoice_files() -> Result<Vec<String>, String> {
    let selection = rfd::FileDialog::new()
        .add_filter("Invoices", &["pdf", "png", "jpg", "jpeg", "webp"])
        .pick_files()
        .unwrap_or_default()
        .into_iter()
        .map(|path| path.to_string_lossy().to_string())
        .collect();
    Ok(selection)
}

/// Queue the picked/dropped files and start one extraction pipeline per
/// file. Progress arrives as `upload-updated` events.
#[tauri::command]
pub async fn queue_uploads(
    paths: Vec<String>,
    state: State<'_, AppState>,
    app: AppHandle,
) -> Result<Vec<UploadItem>, String> {
    state.queue_uploads(paths, &app).map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn get_upload_queue(state: State<'_, AppState>) -> Result<Vec<UploadItem>, String> {
    state.upload_queue().map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn retry_upload(
    upload_id: String,
    state: State<'_, AppState>,
    app: AppHandle,
) -> Result<(), String> {
    state.retry_upload(&upload_id, &app).map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn discard_upload(upload_id: String, state: State<'_, AppState>) -> Result<(), String> {
    state.discard_upload(&upload_id).map_err(|e| e.to_string())
}

/// Draft for the review table: mapped from a ready upload, or blank for
/// manual entry when no upload id is given.
#[tauri::command]
pub async fn prepare_review(
    upload_id: Option<String>,
    state: State<'_, AppState>,
) -> Result<ReviewDraft, String> {
    state
        .prepare_review(upload_id.as_deref())
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn save_review_line(
    draft: ReviewDraft,
    confirm: Option<SaveConfirmations>,
    state: State<'_, AppState>,
) -> Result<SaveOutcome, String> {
    state
        .save_review_line(&draft, &confirm.unwrap_or_default())
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn open_invoice_file(path: String) -> Result<(), String> {
    open::that(path).map_err(|e| e.to_string())?;
    Ok(())
}
