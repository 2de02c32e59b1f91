use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Manager,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommissionStatus {
    Unpaid,
    Eligible,
    Paid,
}

impl CommissionStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "unpaid" => Some(CommissionStatus::Unpaid),
            "eligible" => Some(CommissionStatus::Eligible),
            "paid" => Some(CommissionStatus::Paid),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub team_id: Option<String>,
    pub default_commission_rate: f64,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    pub name: String,
    pub manager_id: Option<String>,
}

/// One invoice-derived payout record. `net_total` and `net_to_pay` are
/// derived from amount/cost/rate and recomputed on every mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommissionEntry {
    pub id: String,
    pub user_id: String,
    pub invoice_number: String,
    pub receipt_number: Option<String>,
    pub customer: String,
    pub project: String,
    pub amount_before_vat: f64,
    pub cost_before_vat: f64,
    pub tax: f64,
    pub commission_rate: f64,
    pub net_total: f64,
    pub net_to_pay: f64,
    pub invoice_month: String,
    pub client_paid_date: Option<String>,
    pub company_paid_date: Option<String>,
    pub commission_status: CommissionStatus,
    pub note: Option<String>,
    pub source_file: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Uploading,
    Parsing,
    Ready,
    Error,
}

/// Transient queue entry for one uploaded file. Lives only for the session;
/// the original bytes stay at `file_path`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadItem {
    pub id: String,
    pub file_name: String,
    pub file_path: String,
    pub mime_type: String,
    pub file_hash: Option<String>,
    pub status: UploadStatus,
    pub progress: u8,
    pub error: Option<String>,
    pub extracted: Option<ExtractedInvoiceData>,
    pub saved_entry_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedInvoiceData {
    pub invoice_number: Option<String>,
    pub receipt_number: Option<String>,
    pub customer: Option<String>,
    pub amount_before_vat: Option<f64>,
    pub currency_code: Option<String>,
    pub invoice_date: Option<String>,
    pub project_description: Option<String>,
}

/// Conversion metadata kept on a review draft for display. Not persisted to
/// the saved entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrencyConversion {
    pub original_amount: f64,
    pub original_currency: String,
    pub rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewDraft {
    pub upload_id: Option<String>,
    pub invoice_number: String,
    pub receipt_number: Option<String>,
    pub customer: String,
    pub project: String,
    pub amount_before_vat: f64,
    pub cost_before_vat: Option<f64>,
    pub tax: f64,
    pub commission_rate: f64,
    pub invoice_month: String,
    pub client_paid_date: Option<String>,
    pub note: Option<String>,
    pub source_file: Option<String>,
    pub conversion: Option<CurrencyConversion>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub openai_api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub current_user: Option<Profile>,
    pub profiles: Vec<Profile>,
    pub teams: Vec<Team>,
}
