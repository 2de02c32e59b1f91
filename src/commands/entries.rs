use serde::Deserialize;
use tauri::State;

use crate::models::CommissionEntry;
use crate::services::ledger::EditOutcome;
use crate::services::listing::{self, EntryFilter, SortState};
use crate::services::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct EntryQuery {
    #[serde(default)]
    pub filter: EntryFilter,
    #[serde(default)]
    pub sort: Option<SortState>,
}

/// The role-visible entries, filtered and sorted for display.
#[tauri::command]
pub async fn get_entries(
    query: EntryQuery,
    state: State<'_, AppState>,
) -> Result<Vec<CommissionEntry>, String> {
    let visible = state.visible_entries().map_err(|e| e.to_string())?;
    let mut entries = listing::filter_entries(&visible, &query.filter);
    if let Some(sort) = query.sort {
        listing::sort_entries(&mut entries, sort);
    }
    Ok(entries)
}

#[derive(Debug, Deserialize)]
pub struct UpdateEntryPayload {
    pub entry_id: String,
    pub field_name: String,
    pub value: String,
    /// Only consulted when the edit sets the status to `paid` on an entry
    /// without a company-paid date.
    pub company_paid_date: Option<String>,
}

#[tauri::command]
pub async fn update_entry_field(
    payload: UpdateEntryPayload,
    state: State<'_, AppState>,
) -> Result<EditOutcome, String> {
    state
        .apply_entry_edit(
            &payload.entry_id,
            &payload.field_name,
            &payload.value,
            payload.company_paid_date.as_deref(),
        )
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn delete_entry(entry_id: String, state: State<'_, AppState>) -> Result<(), String> {
    state.delete_entry(&entry_id).map_err(|e| e.to_string())
}
