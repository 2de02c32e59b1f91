use std::path::Path;
use tauri::State;

use crate::commands::entries::EntryQuery;
use crate::services::export as export_service;
use crate::services::listing;
use crate::services::state::AppState;

#[tauri::command]
pub async fn pick_export_folder() -> Result<Option<String>, String> {
    let selection = rfd::FileDialog::new()
        .pick_folder()
        .map(|path| path.to_string_lossy().to_string());
    Ok(selection)
}

/// Export the current view to a CSV spreadsheet in `dest_dir`. Returns the
/// written path, or `None` when the view is empty or too large to export.
#[tauri::command]
pub async fn export_entries(
    query: EntryQuery,
    dest_dir: String,
    state: State<'_, AppState>,
) -> Result<Option<String>, String> {
    let visible = state.visible_entries().map_err(|e| e.to_string())?;
    let mut entries = listing::filter_entries(&visible, &query.filter);
    if let Some(sort) = query.sort {
        listing::sort_entries(&mut entries, sort);
    }

    let session = state.session().map_err(|e| e.to_string())?;
    let path = export_service::export_entries(
        &entries,
        &session.profiles,
        Path::new(&dest_dir),
        &query.filter.month,
    )
    .map_err(|e| e.to_string())?;

    Ok(path.map(|path| path.to_string_lossy().to_string()))
}
