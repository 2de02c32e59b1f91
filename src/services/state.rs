use anyhow::{anyhow, Result};
use serde::de::DeserializeOwned;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tauri::{AppHandle, Emitter};

use crate::db::{StateStore, StoreKey};
use crate::models::{
    CommissionEntry, CommissionStatus, Profile, ReviewDraft, Role, Session, Team, UploadItem,
};
use crate::services::crypto::CryptoService;
use crate::services::extraction::OpenAiExtractor;
use crate::services::ledger::{self, EditOutcome};
use crate::services::processor::{self, UploadQueue};
use crate::services::review::{self, SaveConfirmations, SaveOutcome};
use crate::utils::now_rfc3339;

/// The four persisted collections, mirrored to the store on every change.
#[derive(Debug, Clone, Default)]
pub struct AppData {
    pub current_user: Option<String>,
    pub profiles: Vec<Profile>,
    pub teams: Vec<Team>,
    pub entries: Vec<CommissionEntry>,
}

pub struct AppState {
    store: Mutex<Box<dyn StateStore>>,
    // Lock order: data before uploads, never the other way around.
    data: Mutex<AppData>,
    pub uploads: UploadQueue,
}

impl AppState {
    pub fn new(store: Box<dyn StateStore>) -> Result<Self> {
        let current_user =
            load_collection::<Option<String>>(store.as_ref(), StoreKey::CurrentUser)?.flatten();
        let profiles: Option<Vec<Profile>> = load_collection(store.as_ref(), StoreKey::Profiles)?;
        let teams: Option<Vec<Team>> = load_collection(store.as_ref(), StoreKey::Teams)?;
        let entries: Option<Vec<CommissionEntry>> =
            load_collection(store.as_ref(), StoreKey::Entries)?;

        let state = AppState {
            store: Mutex::new(store),
            data: Mutex::new(AppData {
                current_user,
                profiles: profiles.unwrap_or_default(),
                teams: teams.unwrap_or_default(),
                entries: entries.unwrap_or_default(),
            }),
            uploads: Arc::new(Mutex::new(HashMap::new())),
        };

        state.seed_if_empty()?;
        Ok(state)
    }

    /// First launch: no stored profiles means nothing has ever been written,
    /// so install the demo dataset.
    fn seed_if_empty(&self) -> Result<()> {
        let needs_seed = {
            let data = self.lock_data()?;
            data.profiles.is_empty()
        };
        if !needs_seed {
            return Ok(());
        }

        tracing::info!("empty store, seeding demo data");
        {
            let mut data = self.lock_data()?;
            data.teams = demo_teams();
            data.profiles = demo_profiles();
            data.entries = demo_entries();
            data.current_user = Some("u-mara".to_string());
        }
        self.persist(StoreKey::Teams)?;
        self.persist(StoreKey::Profiles)?;
        self.persist(StoreKey::Entries)?;
        self.persist(StoreKey::CurrentUser)?;
        Ok(())
    }

    fn lock_data(&self) -> Result<std::sync::MutexGuard<'_, AppData>> {
        self.data.lock().map_err(|_| anyhow!("State lock"))
    }

    fn persist(&self, key: StoreKey) -> Result<()> {
        let json = {
            let data = self.lock_data()?;
            match key {
                StoreKey::CurrentUser => serde_json::to_string(&data.current_user)?,
                StoreKey::Profiles => serde_json::to_string(&data.profiles)?,
                StoreKey::Teams => serde_json::to_string(&data.teams)?,
                StoreKey::Entries => serde_json::to_string(&data.entries)?,
            }
        };
        let store = self.store.lock().map_err(|_| anyhow!("Store lock"))?;
        store.save(key, &json)
    }

    // ---- session & accounts ----

    pub fn session(&self) -> Result<Session> {
        let data = self.lock_data()?;
        let current_user = data
            .current_user
            .as_ref()
            .and_then(|id| data.profiles.iter().find(|profile| &profile.id == id))
            .cloned();
        Ok(Session {
            current_user,
            profiles: data.profiles.clone(),
            teams: data.teams.clone(),
        })
    }

    pub fn current_profile(&self) -> Result<Profile> {
        let data = self.lock_data()?;
        current_profile_inner(&data)
    }

    pub fn switch_user(&self, profile_id: &str) -> Result<Profile> {
        let profile = {
            let mut data = self.lock_data()?;
            let profile = data
                .profiles
                .iter()
                .find(|profile| profile.id == profile_id)
                .cloned()
                .ok_or_else(|| anyhow!("Unknown profile: {}", profile_id))?;
            data.current_user = Some(profile.id.clone());
            profile
        };
        self.persist(StoreKey::CurrentUser)?;
        Ok(profile)
    }

    /// Self-service settings: display name and default commission rate.
    pub fn update_profile(&self, name: Option<String>, default_rate: Option<f64>) -> Result<Profile> {
        let profile = {
            let mut data = self.lock_data()?;
            let current_id = current_profile_inner(&data)?.id;
            let profile = data
                .profiles
                .iter_mut()
                .find(|profile| profile.id == current_id)
                .ok_or_else(|| anyhow!("Profile not found"))?;
            if let Some(name) = name {
                if !name.trim().is_empty() {
                    profile.name = name.trim().to_string();
                }
            }
            if let Some(rate) = default_rate {
                profile.default_commission_rate = rate;
            }
            profile.clone()
        };
        self.persist(StoreKey::Profiles)?;
        Ok(profile)
    }

    pub fn set_role(&self, target_id: &str, role: Role) -> Result<Profile> {
        let profile = {
            let mut data = self.lock_data()?;
            require_admin(&current_profile_inner(&data)?)?;
            let profile = data
                .profiles
                .iter_mut()
                .find(|profile| profile.id == target_id)
                .ok_or_else(|| anyhow!("Unknown profile: {}", target_id))?;
            profile.role = role;
            profile.clone()
        };
        self.persist(StoreKey::Profiles)?;
        Ok(profile)
    }

    pub fn assign_team(&self, target_id: &str, team_id: Option<String>) -> Result<Profile> {
        let profile = {
            let mut data = self.lock_data()?;
            require_admin(&current_profile_inner(&data)?)?;
            if let Some(team_id) = &team_id {
                if !data.teams.iter().any(|team| &team.id == team_id) {
                    return Err(anyhow!("Unknown team: {}", team_id));
                }
            }
            let profile = data
                .profiles
                .iter_mut()
                .find(|profile| profile.id == target_id)
                .ok_or_else(|| anyhow!("Unknown profile: {}", target_id))?;
            profile.team_id = team_id;
            profile.clone()
        };
        self.persist(StoreKey::Profiles)?;
        Ok(profile)
    }

    pub fn create_team(&self, name: &str, manager_id: Option<String>) -> Result<Team> {
        let team = {
            let mut data = self.lock_data()?;
            require_admin(&current_profile_inner(&data)?)?;
            let team = Team {
                id: uuid::Uuid::new_v4().to_string(),
                name: name.trim().to_string(),
                manager_id,
            };
            data.teams.push(team.clone());
            team
        };
        self.persist(StoreKey::Teams)?;
        Ok(team)
    }

    // ---- entries ----

    /// Entries the signed-in user is allowed to see.
    pub fn visible_entries(&self) -> Result<Vec<CommissionEntry>> {
        let data = self.lock_data()?;
        let viewer = current_profile_inner(&data)?;
        Ok(visible_entries_for(&viewer, &data))
    }

    pub fn apply_entry_edit(
        &self,
        entry_id: &str,
        field: &str,
        value: &str,
        company_paid_date: Option<&str>,
    ) -> Result<EditOutcome> {
        let outcome = {
            let mut data = self.lock_data()?;
            let index = data
                .entries
                .iter()
                .position(|entry| entry.id == entry_id)
                .ok_or_else(|| anyhow!("Entry not found"))?;
            let outcome =
                ledger::apply_field_edit(&data.entries[index], field, value, company_paid_date)?;
            if let EditOutcome::Applied { entry, .. } = &outcome {
                data.entries[index] = entry.clone();
            }
            outcome
        };
        if matches!(outcome, EditOutcome::Applied { .. }) {
            self.persist(StoreKey::Entries)?;
        }
        Ok(outcome)
    }

    /// Hard delete. The confirmation dialog lives in the frontend; there is
    /// no recovery path.
    pub fn delete_entry(&self, entry_id: &str) -> Result<()> {
        {
            let mut data = self.lock_data()?;
            let before = data.entries.len();
            data.entries.retain(|entry| entry.id != entry_id);
            if data.entries.len() == before {
                return Err(anyhow!("Entry not found"));
            }
        }
        self.persist(StoreKey::Entries)
    }

    // ---- review & uploads ----

    /// Build the editable draft for one ready upload, or a blank manual
    /// draft, using the acting user's default rate.
    pub fn prepare_review(&self, upload_id: Option<&str>) -> Result<ReviewDraft> {
        let default_rate = self.current_profile()?.default_commission_rate;
        let today = chrono::Local::now().date_naive();

        match upload_id {
            None => Ok(review::blank_draft(default_rate, today)),
            Some(upload_id) => {
                let uploads = self.uploads.lock().map_err(|_| anyhow!("Upload queue lock"))?;
                let item = uploads
                    .get(upload_id)
                    .ok_or_else(|| anyhow!("Unknown upload item: {}", upload_id))?;
                let extracted = item
                    .extracted
                    .as_ref()
                    .ok_or_else(|| anyhow!("Upload not ready yet"))?;
                let mut draft = review::draft_from_extraction(extracted, default_rate, today);
                draft.upload_id = Some(item.id.clone());
                draft.source_file = Some(item.file_name.clone());
                Ok(draft)
            }
        }
    }

    /// Run the save gates for one review line and commit the entry when they
    /// pass. A line whose upload is already saved is locked.
    pub fn save_review_line(
        &self,
        draft: &ReviewDraft,
        confirm: &SaveConfirmations,
    ) -> Result<SaveOutcome> {
        let outcome = {
            let mut data = self.lock_data()?;
            let acting = current_profile_inner(&data)?;

            if let Some(upload_id) = &draft.upload_id {
                let uploads = self.uploads.lock().map_err(|_| anyhow!("Upload queue lock"))?;
                if let Some(item) = uploads.get(upload_id) {
                    if item.saved_entry_id.is_some() {
                        return Err(anyhow!("Line already saved"));
                    }
                }
            }

            let outcome = review::gate_and_build(draft, &data.entries, &acting.id, confirm);
            if let SaveOutcome::Saved { entry } = &outcome {
                data.entries.push(entry.clone());
                if let Some(upload_id) = &draft.upload_id {
                    let mut uploads =
                        self.uploads.lock().map_err(|_| anyhow!("Upload queue lock"))?;
                    if let Some(item) = uploads.get_mut(upload_id) {
                        item.saved_entry_id = Some(entry.id.clone());
                    }
                }
            }
            outcome
        };
        if matches!(outcome, SaveOutcome::Saved { .. }) {
            self.persist(StoreKey::Entries)?;
        }
        Ok(outcome)
    }

    pub fn queue_uploads(&self, paths: Vec<String>, app: &AppHandle) -> Result<Vec<UploadItem>> {
        let mut created = Vec::new();
        for path in paths {
            let item = processor::new_item(Path::new(&path));
            {
                let mut uploads = self.uploads.lock().map_err(|_| anyhow!("Upload queue lock"))?;
                uploads.insert(item.id.clone(), item.clone());
            }
            self.start_pipeline(app, item.id.clone());
            created.push(item);
        }
        Ok(created)
    }

    pub fn retry_upload(&self, upload_id: &str, app: &AppHandle) -> Result<()> {
        {
            let mut uploads = self.uploads.lock().map_err(|_| anyhow!("Upload queue lock"))?;
            let item = uploads
                .get_mut(upload_id)
                .ok_or_else(|| anyhow!("Unknown upload item: {}", upload_id))?;
            processor::reset_for_retry(item);
        }
        self.start_pipeline(app, upload_id.to_string());
        Ok(())
    }

    pub fn discard_upload(&self, upload_id: &str) -> Result<()> {
        let mut uploads = self.uploads.lock().map_err(|_| anyhow!("Upload queue lock"))?;
        uploads
            .remove(upload_id)
            .ok_or_else(|| anyhow!("Unknown upload item: {}", upload_id))?;
        Ok(())
    }

    pub fn upload_queue(&self) -> Result<Vec<UploadItem>> {
        let uploads = self.uploads.lock().map_err(|_| anyhow!("Upload queue lock"))?;
        let mut items: Vec<UploadItem> = uploads.values().cloned().collect();
        items.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        Ok(items)
    }

    fn start_pipeline(&self, app: &AppHandle, item_id: String) {
        let queue = self.uploads.clone();
        let api_key = self.decrypted_api_key();
        let app_handle = app.clone();

        tauri::async_runtime::spawn(async move {
            let notify = move |item: &UploadItem| {
                let _ = app_handle.emit("upload-updated", item.clone());
            };
            match api_key {
                Ok(key) => {
                    let provider = OpenAiExtractor::new(key);
                    if let Err(err) =
                        processor::run_pipeline(&queue, &item_id, &provider, &notify).await
                    {
                        tracing::warn!(%err, "upload pipeline error");
                    }
                }
                Err(err) => {
                    let _ = processor::mark_failed(&queue, &item_id, &notify, &err.to_string());
                }
            }
        });
    }

    // ---- settings ----

    pub fn setting(&self, key: &str) -> Result<Option<String>> {
        let store = self.store.lock().map_err(|_| anyhow!("Store lock"))?;
        store.get_setting(key)
    }

    pub fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let store = self.store.lock().map_err(|_| anyhow!("Store lock"))?;
        store.set_setting(key, value)
    }

    fn decrypted_api_key(&self) -> Result<String> {
        let encrypted = self
            .setting("openai_api_key")?
            .ok_or_else(|| anyhow!("OpenAI API key missing"))?;
        CryptoService::decrypt_api_key(&encrypted)
    }
}

fn current_profile_inner(data: &AppData) -> Result<Profile> {
    let id = data
        .current_user
        .as_ref()
        .ok_or_else(|| anyhow!("No user signed in"))?;
    data.profiles
        .iter()
        .find(|profile| &profile.id == id)
        .cloned()
        .ok_or_else(|| anyhow!("Signed-in profile no longer exists"))
}

fn require_admin(acting: &Profile) -> Result<()> {
    match acting.role {
        Role::Admin => Ok(()),
        Role::Manager | Role::User => Err(anyhow!("Admin role required")),
    }
}

fn visible_entries_for(viewer: &Profile, data: &AppData) -> Vec<CommissionEntry> {
    match viewer.role {
        Role::Admin => data.entries.clone(),
        Role::Manager => {
            let managed: HashSet<&str> = data
                .teams
                .iter()
                .filter(|team| team.manager_id.as_deref() == Some(viewer.id.as_str()))
                .map(|team| team.id.as_str())
                .collect();
            let members: HashSet<&str> = data
                .profiles
                .iter()
                .filter(|profile| {
                    profile
                        .team_id
                        .as_deref()
                        .map(|team_id| managed.contains(team_id))
                        .unwrap_or(false)
                })
                .map(|profile| profile.id.as_str())
                .collect();
            data.entries
                .iter()
                .filter(|entry| {
                    entry.user_id == viewer.id || members.contains(entry.user_id.as_str())
                })
                .cloned()
                .collect()
        }
        Role::User => data
            .entries
            .iter()
            .filter(|entry| entry.user_id == viewer.id)
            .cloned()
            .collect(),
    }
}

fn load_collection<T: DeserializeOwned>(store: &dyn StateStore, key: StoreKey) -> Result<Option<T>> {
    match store.load(key)? {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}

// ---- demo seed data ----

fn demo_teams() -> Vec<Team> {
    vec![Team {
        id: "t-nord".to_string(),
        name: "Studio Nord".to_string(),
        manager_id: Some("u-jonas".to_string()),
    }]
}

fn demo_profiles() -> Vec<Profile> {
    let now = now_rfc3339();
    vec![
        Profile {
            id: "u-nora".to_string(),
            name: "Nora Fuchs".to_string(),
            email: "nora@provy.dev".to_string(),
            role: Role::Admin,
            team_id: None,
            default_commission_rate: 0.0,
            created_at: now.clone(),
        },
        Profile {
            id: "u-jonas".to_string(),
            name: "Jonas Weber".to_string(),
            email: "jonas@provy.dev".to_string(),
            role: Role::Manager,
            team_id: Some("t-nord".to_string()),
            default_commission_rate: 12.0,
            created_at: now.clone(),
        },
        Profile {
            id: "u-mara".to_string(),
            name: "Mara Klein".to_string(),
            email: "mara@provy.dev".to_string(),
            role: Role::User,
            team_id: Some("t-nord".to_string()),
            default_commission_rate: 10.0,
            created_at: now.clone(),
        },
        Profile {
            id: "u-timo".to_string(),
            name: "Timo Brandt".to_string(),
            email: "timo@provy.dev".to_string(),
            role: Role::User,
            team_id: None,
            default_commission_rate: 8.0,
            created_at: now,
        },
    ]
}

fn demo_entries() -> Vec<CommissionEntry> {
    let mut entries = vec![
        demo_entry(
            "e-1001",
            "u-mara",
            "2023-0041",
            "Acme GmbH",
            "Website relaunch",
            4800.0,
            600.0,
            912.0,
            10.0,
            "2023-10-01",
            Some("2023-10-28"),
            Some("2023-11-05"),
        ),
        demo_entry(
            "e-1002",
            "u-mara",
            "2023-0042",
            "Hanse Logistik",
            "Tracking dashboard",
            6200.0,
            0.0,
            1178.0,
            10.0,
            "2023-11-01",
            Some("2023-11-20"),
            None,
        ),
        demo_entry(
            "e-1003",
            "u-mara",
            "2023-0043",
            "Bergmann & Söhne",
            "Shop migration",
            3500.0,
            450.0,
            665.0,
            10.0,
            "2023-11-01",
            None,
            None,
        ),
        demo_entry(
            "e-1004",
            "u-timo",
            "TB-2023-17",
            "Acme GmbH",
            "Brand illustrations",
            1800.0,
            0.0,
            342.0,
            8.0,
            "2023-11-01",
            None,
            None,
        ),
    ];
    for entry in &mut entries {
        ledger::recompute(entry);
    }
    entries
}

#[allow(clippy::too_many_arguments)]
fn demo_entry(
    id: &str,
    user_id: &str,
    invoice_number: &str,
    customer: &str,
    project: &str,
    amount: f64,
    cost: f64,
    tax: f64,
    rate: f64,
    month: &str,
    client_paid: Option<&str>,
    company_paid: Option<&str>,
) -> CommissionEntry {
    let now = now_rfc3339();
    let commission_status = match (client_paid, company_paid) {
        (_, Some(_)) => CommissionStatus::Paid,
        (Some(_), None) => CommissionStatus::Eligible,
        (None, None) => CommissionStatus::Unpaid,
    };
    CommissionEntry {
        id: id.to_string(),
        user_id: user_id.to_string(),
        invoice_number: invoice_number.to_string(),
        receipt_number: None,
        customer: customer.to_string(),
        project: project.to_string(),
        amount_before_vat: amount,
        cost_before_vat: cost,
        tax,
        commission_rate: rate,
        net_total: 0.0,
        net_to_pay: 0.0,
        invoice_month: month.to_string(),
        client_paid_date: client_paid.map(str::to_string),
        company_paid_date: company_paid.map(str::to_string),
        commission_status,
        note: None,
        source_file: None,
        created_at: now.clone(),
        updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;
    use crate::models::UploadStatus;

    fn state() -> (AppState, MemoryStore) {
        let store = MemoryStore::new();
        let state = AppState::new(Box::new(store.clone())).unwrap();
        (state, store)
    }

    #[test]
    fn empty_store_seeds_demo_data_once() {
        let (state, store) = state();
        let session = state.session().unwrap();
        assert_eq!(session.profiles.len(), 4);
        assert_eq!(session.current_user.unwrap().id, "u-mara");

        // A second startup over the same store keeps the data as-is.
        state.switch_user("u-timo").unwrap();
        let reopened = AppState::new(Box::new(store)).unwrap();
        assert_eq!(reopened.session().unwrap().current_user.unwrap().id, "u-timo");
    }

    #[test]
    fn visibility_follows_roles() {
        let (state, _) = state();

        // Mara (user): own entries only.
        let own = state.visible_entries().unwrap();
        assert_eq!(own.len(), 3);
        assert!(own.iter().all(|entry| entry.user_id == "u-mara"));

        // Jonas manages Studio Nord, which Mara is in; Timo has no team.
        state.switch_user("u-jonas").unwrap();
        let team = state.visible_entries().unwrap();
        assert_eq!(team.len(), 3);

        // Nora (admin): everything.
        state.switch_user("u-nora").unwrap();
        assert_eq!(state.visible_entries().unwrap().len(), 4);
    }

    #[test]
    fn entry_edit_is_committed_and_mirrored() {
        let (state, store) = state();
        let outcome = state
            .apply_entry_edit("e-1003", "amount_before_vat", "4000", None)
            .unwrap();
        assert!(matches!(outcome, EditOutcome::Applied { .. }));

        let persisted = store.load(StoreKey::Entries).unwrap().unwrap();
        assert!(persisted.contains("4000"));
    }

    #[test]
    fn abandoned_status_edit_changes_nothing() {
        let (state, _) = state();
        let outcome = state
            .apply_entry_edit("e-1003", "commission_status", "paid", None)
            .unwrap();
        assert!(matches!(outcome, EditOutcome::CompanyPaidDateRequired));

        let entries = state.visible_entries().unwrap();
        let entry = entries.iter().find(|e| e.id == "e-1003").unwrap();
        assert_eq!(entry.commission_status, CommissionStatus::Unpaid);
    }

    #[test]
    fn delete_is_permanent() {
        let (state, store) = state();
        state.delete_entry("e-1002").unwrap();
        assert!(state.delete_entry("e-1002").is_err());

        let persisted = store.load(StoreKey::Entries).unwrap().unwrap();
        assert!(!persisted.contains("e-1002"));
    }

    #[test]
    fn admin_commands_are_gated() {
        let (state, _) = state();
        assert!(state.set_role("u-timo", Role::Manager).is_err());
        assert!(state.create_team("Studio Süd", None).is_err());

        state.switch_user("u-nora").unwrap();
        let updated = state.set_role("u-timo", Role::Manager).unwrap();
        assert_eq!(updated.role, Role::Manager);
        let team = state.create_team("Studio Süd", Some("u-timo".to_string())).unwrap();
        state.assign_team("u-timo", Some(team.id)).unwrap();
    }

    #[test]
    fn duplicate_save_needs_confirmation_then_commits() {
        let (state, _) = state();
        let mut draft = state.prepare_review(None).unwrap();
        draft.invoice_number = "2023-0042".to_string();
        draft.customer = "Hanse Logistik".to_string();
        draft.amount_before_vat = 900.0;
        draft.cost_before_vat = Some(0.0);

        let outcome = state
            .save_review_line(&draft, &SaveConfirmations::default())
            .unwrap();
        assert!(matches!(outcome, SaveOutcome::DuplicateInvoice { .. }));
        assert_eq!(state.visible_entries().unwrap().len(), 3);

        let outcome = state
            .save_review_line(
                &draft,
                &SaveConfirmations {
                    default_cost_to_zero: false,
                    accept_duplicate: true,
                },
            )
            .unwrap();
        assert!(matches!(outcome, SaveOutcome::Saved { .. }));
        assert_eq!(state.visible_entries().unwrap().len(), 4);
    }

    #[test]
    fn saved_review_line_is_locked() {
        let (state, _) = state();

        let item = processor::new_item(Path::new("/tmp/invoice.pdf"));
        let upload_id = item.id.clone();
        {
            let mut uploads = state.uploads.lock().unwrap();
            let mut item = item;
            item.status = UploadStatus::Ready;
            uploads.insert(upload_id.clone(), item);
        }

        let mut draft = state.prepare_review(None).unwrap();
        draft.upload_id = Some(upload_id.clone());
        draft.invoice_number = "NEW-1".to_string();
        draft.cost_before_vat = Some(0.0);

        let outcome = state
            .save_review_line(&draft, &SaveConfirmations::default())
            .unwrap();
        assert!(matches!(outcome, SaveOutcome::Saved { .. }));

        let err = state
            .save_review_line(&draft, &SaveConfirmations::default())
            .unwrap_err();
        assert!(err.to_string().contains("already saved"));
    }

    #[test]
    fn draft_uses_acting_users_default_rate() {
        let (state, _) = state();
        let draft = state.prepare_review(None).unwrap();
        assert_eq!(draft.commission_rate, 10.0);

        state.switch_user("u-timo").unwrap();
        let draft = state.prepare_review(None).unwrap();
        assert_eq!(draft.commission_rate, 8.0);
    }
}
