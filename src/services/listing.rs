use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::models::{CommissionEntry, CommissionStatus};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntryFilter {
    /// Free text, matched case-insensitively against customer, invoice
    /// number, receipt number, and project.
    #[serde(default)]
    pub text: String,
    /// `None` means "all statuses".
    #[serde(default)]
    pub status: Option<CommissionStatus>,
    /// Prefix match on `invoice_month`, so `2023` and `2023-11` both work.
    #[serde(default)]
    pub month: String,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    InvoiceNumber,
    ReceiptNumber,
    Customer,
    Project,
    AmountBeforeVat,
    CostBeforeVat,
    Tax,
    CommissionRate,
    NetTotal,
    NetToPay,
    InvoiceMonth,
    ClientPaidDate,
    CompanyPaidDate,
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortState {
    pub key: SortKey,
    pub ascending: bool,
}

impl SortState {
    pub fn new(key: SortKey) -> Self {
        SortState {
            key,
            ascending: true,
        }
    }

    /// Clicking the active column flips direction; a new column starts
    /// ascending again.
    pub fn toggle(self, key: SortKey) -> SortState {
        if key == self.key {
            SortState {
                key,
                ascending: !self.ascending,
            }
        } else {
            SortState::new(key)
        }
    }
}

pub fn filter_entries(entries: &[CommissionEntry], filter: &EntryFilter) -> Vec<CommissionEntry> {
    entries
        .iter()
        .filter(|entry| matches_filter(entry, filter))
        .cloned()
        .collect()
}

fn matches_filter(entry: &CommissionEntry, filter: &EntryFilter) -> bool {
    if let Some(status) = filter.status {
        if entry.commission_status != status {
            return false;
        }
    }
    if !filter.month.is_empty() && !entry.invoice_month.starts_with(&filter.month) {
        return false;
    }
    if let Some(user_id) = &filter.user_id {
        if &entry.user_id != user_id {
            return false;
        }
    }
    matches_text(entry, &filter.text)
}

fn matches_text(entry: &CommissionEntry, text: &str) -> bool {
    let needle = text.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    entry.customer.to_lowercase().contains(&needle)
        || entry.invoice_number.to_lowercase().contains(&needle)
        || entry
            .receipt_number
            .as_deref()
            .map(|receipt| receipt.to_lowercase().contains(&needle))
            .unwrap_or(false)
        || entry.project.to_lowercase().contains(&needle)
}

/// Stable single-column sort. Equal keys keep their original relative order.
/// Missing values sort last regardless of direction; the direction only flips
/// the order of defined values.
pub fn sort_entries(entries: &mut [CommissionEntry], sort: SortState) {
    entries.sort_by(|a, b| compare_entries(a, b, sort));
}

fn compare_entries(a: &CommissionEntry, b: &CommissionEntry, sort: SortState) -> Ordering {
    let ordering = match sort.key {
        SortKey::ReceiptNumber => {
            return optional_cmp(
                a.receipt_number.as_deref(),
                b.receipt_number.as_deref(),
                sort.ascending,
            )
        }
        SortKey::ClientPaidDate => {
            return optional_cmp(
                a.client_paid_date.as_deref(),
                b.client_paid_date.as_deref(),
                sort.ascending,
            )
        }
        SortKey::CompanyPaidDate => {
            return optional_cmp(
                a.company_paid_date.as_deref(),
                b.company_paid_date.as_deref(),
                sort.ascending,
            )
        }
        SortKey::InvoiceNumber => text_cmp(&a.invoice_number, &b.invoice_number),
        SortKey::Customer => text_cmp(&a.customer, &b.customer),
        SortKey::Project => text_cmp(&a.project, &b.project),
        SortKey::InvoiceMonth => a.invoice_month.cmp(&b.invoice_month),
        SortKey::AmountBeforeVat => number_cmp(a.amount_before_vat, b.amount_before_vat),
        SortKey::CostBeforeVat => number_cmp(a.cost_before_vat, b.cost_before_vat),
        SortKey::Tax => number_cmp(a.tax, b.tax),
        SortKey::CommissionRate => number_cmp(a.commission_rate, b.commission_rate),
        SortKey::NetTotal => number_cmp(a.net_total, b.net_total),
        SortKey::NetToPay => number_cmp(a.net_to_pay, b.net_to_pay),
        SortKey::Status => status_rank(a.commission_status).cmp(&status_rank(b.commission_status)),
    };
    if sort.ascending {
        ordering
    } else {
        ordering.reverse()
    }
}

fn optional_cmp(a: Option<&str>, b: Option<&str>, ascending: bool) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        // Undefined always trails, so these two arms skip the direction flip.
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(left), Some(right)) => {
            let ordering = text_cmp(left, right);
            if ascending {
                ordering
            } else {
                ordering.reverse()
            }
        }
    }
}

fn text_cmp(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

fn number_cmp(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

fn status_rank(status: CommissionStatus) -> u8 {
    match status {
        CommissionStatus::Unpaid => 0,
        CommissionStatus::Eligible => 1,
        CommissionStatus::Paid => 2,
    }
}
