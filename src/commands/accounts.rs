use serde::Deserialize;
use tauri::State;

use crate::models::{Profile, Role, Session, Team};
use crate::services::state::AppState;

#[tauri::command]
pub async fn get_session(state: State<'_, AppState>) -> Result<Session, String> {
    state.session().map_err(|e| e.to_string())
}

/// Mock login: account provisioning is out of scope, so signing in is just
/// picking one of the seeded profiles.
#[tauri::command]
pub async fn switch_user(profile_id: String, state: State<'_, AppState>) -> Result<Profile, String> {
    state.switch_user(&profile_id).map_err(|e| e.to_string())
}

#[derive(Debug, Deserialize)]
pub struct ProfileSettingsPayload {
    pub name: Option<String>,
    pub default_commission_rate: Option<f64>,
}

#[tauri::command]
pub async fn update_profile(
    payload: ProfileSettingsPayload,
    state: State<'_, AppState>,
) -> Result<Profile, String> {
    state
        .update_profile(payload.name, payload.default_commission_rate)
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn set_role(
    profile_id: String,
    role: Role,
    state: State<'_, AppState>,
) -> Result<Profile, String> {
    state.set_role(&profile_id, role).map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn assign_team(
    profile_id: String,
    team_id: Option<String>,
    state: State<'_, AppState>,
) -> Result<Profile, String> {
    state
        .assign_team(&profile_id, team_id)
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn create_team(
    name: String,
    manager_id: Option<String>,
    state: State<'_, AppState>,
) -> Result<Team, String> {
    state.create_team(&name, manager_id).map_err(|e| e.to_string())
}
