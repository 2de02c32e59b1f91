use anyhow::{anyhow, Result};
use serde::Serialize;

use crate::models::{CommissionEntry, CommissionStatus};
use crate::utils::{normalize_date, now_rfc3339, parse_decimal};

/// Recompute the derived money fields. Called after every mutation that can
/// touch amount, cost, or rate; the derived fields are never edited directly.
pub fn recompute(entry: &mut CommissionEntry) {
    entry.net_total = entry.amount_before_vat - entry.cost_before_vat;
    entry.net_to_pay = entry.net_total * entry.commission_rate / 100.0;
}

/// Status for a freshly saved entry: a client-paid date means the client has
/// already paid, so the entry starts out eligible.
pub fn status_for_new_entry(client_paid_date: Option<&str>) -> CommissionStatus {
    match client_paid_date {
        Some(date) if !date.trim().is_empty() => CommissionStatus::Eligible,
        _ => CommissionStatus::Unpaid,
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EditOutcome {
    /// The edit went through. Warnings are advisory; the new value is already
    /// applied.
    Applied {
        entry: CommissionEntry,
        warnings: Vec<String>,
    },
    /// Moving to `paid` needs a company-paid date first. The entry is
    /// unchanged.
    CompanyPaidDateRequired,
}

/// Apply one field-level edit and return the resulting entry.
///
/// The input entry is not modified; the caller commits the returned one.
/// `company_paid_date` is only consulted when the edit sets the status to
/// `paid` on an entry that has no company-paid date yet.
pub fn apply_field_edit(
    entry: &CommissionEntry,
    field: &str,
    value: &str,
    company_paid_date: Option<&str>,
) -> Result<EditOutcome> {
    let mut updated = entry.clone();
    let mut warnings = Vec::new();

    match field {
        "invoice_number" => {
            if value.trim().is_empty() {
                warnings.push("Invoice number is empty".to_string());
            }
            updated.invoice_number = value.trim().to_string();
        }
        "receipt_number" => {
            updated.receipt_number = non_empty(value);
        }
        "customer" => {
            if value.trim().is_empty() {
                warnings.push("Customer is empty".to_string());
            }
            updated.customer = value.trim().to_string();
        }
        "project" => {
            updated.project = value.trim().to_string();
        }
        "note" => {
            updated.note = non_empty(value);
        }
        "amount_before_vat" => {
            let amount = parse_decimal(value)?;
            if amount < 0.0 {
                warnings.push("Amount is negative".to_string());
            }
            updated.amount_before_vat = amount;
        }
        "cost_before_vat" => {
            let cost = parse_decimal(value)?;
            if cost < 0.0 {
                warnings.push("Cost is negative".to_string());
            }
            updated.cost_before_vat = cost;
        }
        "tax" => {
            updated.tax = parse_decimal(value)?;
        }
        "commission_rate" => {
            let rate = parse_decimal(value)?;
            if !(0.0..=100.0).contains(&rate) {
                warnings.push("Commission rate outside 0-100".to_string());
            }
            updated.commission_rate = rate;
        }
        "invoice_month" => {
            updated.invoice_month = normalize_date(non_empty(value)).unwrap_or_default();
        }
        "client_paid_date" => {
            updated.client_paid_date = normalize_date(non_empty(value));
            // Date evidence drives the machine forward; this fires only on a
            // direct edit of this field.
            if updated.client_paid_date.is_some()
                && updated.commission_status == CommissionStatus::Unpaid
            {
                updated.commission_status = CommissionStatus::Eligible;
            }
        }
        "company_paid_date" => {
            updated.company_paid_date = normalize_date(non_empty(value));
        }
        "commission_status" => {
            let status = CommissionStatus::parse(value)
                .ok_or_else(|| anyhow!("Unknown status: {}", value))?;
            if status == CommissionStatus::Paid && updated.company_paid_date.is_none() {
                match company_paid_date {
                    Some(date) if !date.trim().is_empty() => {
                        updated.company_paid_date = normalize_date(Some(date.to_string()));
                    }
                    _ => return Ok(EditOutcome::CompanyPaidDateRequired),
                }
            }
            updated.commission_status = status;
        }
        other => return Err(anyhow!("Unknown field: {}", other)),
    }

    recompute(&mut updated);
    updated.updated_at = now_rfc3339();
    Ok(EditOutcome::Applied {
        entry: updated,
        warnings,
    })
}

/// Case-insensitive duplicate invoice number among one user's entries.
pub fn find_duplicate<'a>(
    entries: &'a [CommissionEntry],
    user_id: &str,
    invoice_number: &str,
) -> Option<&'a CommissionEntry> {
    let needle = invoice_number.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }
    entries
        .iter()
        .find(|entry| entry.user_id == user_id && entry.invoice_number.to_lowercase() == needle)
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
