use serde::Deserialize;
use tauri::State;

use crate::models::Settings;
use crate::services::crypto::CryptoService;
use crate::services::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SettingsPayload {
    pub openai_api_key: Option<String>,
}

#[tauri::command]
pub async fn get_settings(state: State<'_, AppState>) -> Result<Settings, String> {
    let openai_api_key = state.setting("openai_api_key").map_err(|e| e.to_string())?;
    Ok(Settings { openai_api_key })
}

#[tauri::command]
pub async fn save_settings(
    payload: SettingsPayload,
    state: State<'_, AppState>,
) -> Result<(), String> {
    if let Some(api_key) = payload.openai_api_key {
        if !api_key.trim().is_empty() {
            let encrypted = CryptoService::encrypt_api_key(&api_key).map_err(|e| e.to_string())?;
            state
                .set_setting("openai_api_key", &encrypted)
                .map_err(|e| e.to_string())?;
        }
    }
    Ok(())
}

#[tauri::command]
pub async fn test_openai_key(api_key: String) -> Result<bool, String> {
    let client = reqwest::Client::new();
    let response = client
        .get("https://api.openai.com/v1/models")
        .bearer_auth(api_key)
        .send()
        .await
        .map_err(|e| format!("Connection failed: {}", e))?;

    Ok(response.status().is_success())
}
