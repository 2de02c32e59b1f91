use anyhow::Result;
use csv::Writer;
use std::path::{Path, PathBuf};

use crate::models::{CommissionEntry, CommissionStatus, Profile};
use crate::utils::{format_decimal, parse_date};

/// Views larger than this are refused; the caller narrows the filters first.
pub const EXPORT_ROW_LIMIT: usize = 5000;

/// Write the current filtered/sorted view to a CSV spreadsheet: one header
/// row, one row per entry, one totals row. Returns the written path, or
/// `None` when the view is empty or over the row limit.
pub fn export_entries(
    entries: &[CommissionEntry],
    profiles: &[Profile],
    output_dir: &Path,
    month_filter: &str,
) -> Result<Option<PathBuf>> {
    if entries.is_empty() {
        tracing::warn!("export skipped: empty view");
        return Ok(None);
    }
    if entries.len() > EXPORT_ROW_LIMIT {
        tracing::warn!(rows = entries.len(), "export skipped: view too large");
        return Ok(None);
    }

    let path = output_dir.join(export_file_name(month_filter));
    let mut wtr = Writer::from_path(&path)?;

    // The identity column only appears when the view spans multiple users.
    let multi_user = {
        let first = &entries[0].user_id;
        entries.iter().any(|entry| &entry.user_id != first)
    };

    let mut header: Vec<String> = Vec::new();
    if multi_user {
        header.push("User".to_string());
    }
    header.extend(
        [
            "Invoice_Number",
            "Receipt_Number",
            "Customer",
            "Project",
            "Invoice_Month",
            "Amount_Before_VAT",
            "Cost_Before_VAT",
            "Tax",
            "Commission_Rate",
            "Net_Total",
            "Net_To_Pay",
            "Client_Paid",
            "Company_Paid",
            "Status",
            "Note",
        ]
        .map(str::to_string),
    );
    wtr.write_record(&header)?;

    let mut total_amount = 0.0;
    let mut total_cost = 0.0;
    let mut total_tax = 0.0;
    let mut total_net = 0.0;
    let mut total_pay = 0.0;

    for entry in entries {
        total_amount += entry.amount_before_vat;
        total_cost += entry.cost_before_vat;
        total_tax += entry.tax;
        total_net += entry.net_total;
        total_pay += entry.net_to_pay;

        let mut record: Vec<String> = Vec::new();
        if multi_user {
            record.push(user_name(profiles, &entry.user_id));
        }
        record.extend([
            entry.invoice_number.clone(),
            entry.receipt_number.clone().unwrap_or_default(),
            entry.customer.clone(),
            entry.project.clone(),
            format_month(&entry.invoice_month),
            format_decimal(entry.amount_before_vat),
            format_decimal(entry.cost_before_vat),
            format_decimal(entry.tax),
            format!("{:.1}%", entry.commission_rate),
            format_decimal(entry.net_total),
            format_decimal(entry.net_to_pay),
            format_display_date(entry.client_paid_date.as_deref()),
            format_display_date(entry.company_paid_date.as_deref()),
            status_label(entry.commission_status).to_string(),
            entry.note.clone().unwrap_or_default(),
        ]);
        wtr.write_record(&record)?;
    }

    let mut totals: Vec<String> = Vec::new();
    if multi_user {
        totals.push(String::new());
    }
    totals.extend([
        "TOTAL".to_string(),
        String::new(),
        String::new(),
        String::new(),
        String::new(),
        format_decimal(total_amount),
        format_decimal(total_cost),
        format_decimal(total_tax),
        String::new(),
        format_decimal(total_net),
        format_decimal(total_pay),
        String::new(),
        String::new(),
        String::new(),
        String::new(),
    ]);
    wtr.write_record(&totals)?;

    wtr.flush()?;
    tracing::info!(path = %path.display(), rows = entries.len(), "export written");

    Ok(Some(path))
}

fn export_file_name(month_filter: &str) -> String {
    let month = month_filter.trim();
    if month.is_empty() {
        "commissions.csv".to_string()
    } else {
        format!("commissions-{}.csv", month)
    }
}

fn user_name(profiles: &[Profile], user_id: &str) -> String {
    profiles
        .iter()
        .find(|profile| profile.id == user_id)
        .map(|profile| profile.name.clone())
        .unwrap_or_else(|| user_id.to_string())
}

fn format_month(invoice_month: &str) -> String {
    parse_date(invoice_month)
        .map(|date| date.format("%Y-%m").to_string())
        .unwrap_or_else(|| invoice_month.to_string())
}

fn format_display_date(date: Option<&str>) -> String {
    match date {
        Some(raw) => parse_date(raw)
            .map(|date| date.format("%d.%m.%Y").to_string())
            .unwrap_or_else(|| raw.to_string()),
        None => String::new(),
    }
}

fn status_label(status: CommissionStatus) -> &'static str {
    match status {
        CommissionStatus::Unpaid => "unpaid",
        CommissionStatus::Eligible => "eligible",
        CommissionStatus::Paid => "paid",
    }
}
