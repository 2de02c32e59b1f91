use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::models::{CommissionEntry, CurrencyConversion, ExtractedInvoiceData, ReviewDraft};
use crate::services::ledger;
use crate::utils::{month_floor, now_rfc3339, parse_date, round2};

pub const LOCAL_CURRENCY: &str = "EUR";

/// Fixed conversion table into the local currency. Good enough for review
/// prefills; the user can always correct the amount in place.
const EXCHANGE_RATES: &[(&str, f64)] = &[
    ("USD", 0.92),
    ("GBP", 1.17),
    ("CHF", 1.05),
    ("DKK", 0.13),
    ("PLN", 0.23),
];

fn rate_for(code: &str) -> Option<f64> {
    EXCHANGE_RATES
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(code))
        .map(|(_, rate)| *rate)
}

/// Convert an extracted amount into the local currency. Returns the amount to
/// show in the draft plus conversion metadata when a conversion happened.
/// Unrecognized codes leave the amount untouched with no metadata.
pub fn convert_currency(
    amount: f64,
    currency_code: Option<&str>,
) -> (f64, Option<CurrencyConversion>) {
    let code = match currency_code {
        Some(code) if !code.trim().is_empty() => code.trim(),
        _ => return (amount, None),
    };
    if code.eq_ignore_ascii_case(LOCAL_CURRENCY) {
        return (amount, None);
    }
    match rate_for(code) {
        Some(rate) => (
            round2(amount * rate),
            Some(CurrencyConversion {
                original_amount: amount,
                original_currency: code.to_uppercase(),
                rate,
            }),
        ),
        None => (amount, None),
    }
}

/// Resolve the extracted date string: parsed date on success, first day of
/// the current month otherwise.
fn resolve_invoice_date(raw: Option<&str>, today: NaiveDate) -> NaiveDate {
    raw.and_then(parse_date)
        .unwrap_or_else(|| today.with_day(1).unwrap_or(today))
}

/// Map one extracted record into an editable draft. Cost is always left
/// blank, even when the invoice carried one; the user supplies it at save
/// time.
pub fn draft_from_extraction(
    raw: &ExtractedInvoiceData,
    default_rate: f64,
    today: NaiveDate,
) -> ReviewDraft {
    let invoice_date = resolve_invoice_date(raw.invoice_date.as_deref(), today);
    let (amount, conversion) = convert_currency(
        raw.amount_before_vat.unwrap_or(0.0),
        raw.currency_code.as_deref(),
    );

    // A receipt means the client already paid; prefill the paid date so the
    // entry lands as eligible when saved unchanged.
    let client_paid_date = raw
        .receipt_number
        .as_ref()
        .map(|_| invoice_date.format("%Y-%m-%d").to_string());

    ReviewDraft {
        upload_id: None,
        invoice_number: raw.invoice_number.clone().unwrap_or_default(),
        receipt_number: raw.receipt_number.clone(),
        customer: raw.customer.clone().unwrap_or_default(),
        project: raw.project_description.clone().unwrap_or_default(),
        amount_before_vat: amount,
        cost_before_vat: None,
        tax: 0.0,
        commission_rate: default_rate,
        invoice_month: month_floor(invoice_date),
        client_paid_date,
        note: None,
        source_file: None,
        conversion,
    }
}

/// Blank draft for manual entry, defaulted to the current month and the
/// acting user's commission rate.
pub fn blank_draft(default_rate: f64, today: NaiveDate) -> ReviewDraft {
    ReviewDraft {
        upload_id: None,
        invoice_number: String::new(),
        receipt_number: None,
        customer: String::new(),
        project: String::new(),
        amount_before_vat: 0.0,
        cost_before_vat: None,
        tax: 0.0,
        commission_rate: default_rate,
        invoice_month: month_floor(today),
        client_paid_date: None,
        note: None,
        source_file: None,
        conversion: None,
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SaveConfirmations {
    #[serde(default)]
    pub default_cost_to_zero: bool,
    #[serde(default)]
    pub accept_duplicate: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SaveOutcome {
    /// Cost is blank; confirm defaulting it to zero (or cancel the save).
    NeedsCostConfirmation,
    /// Same invoice number already exists for this user; confirm adding
    /// anyway (or cancel the save).
    DuplicateInvoice { existing_entry_id: String },
    Saved { entry: CommissionEntry },
}

/// Run the sequential save gates for one line item and build the entry once
/// both pass. Cancelling is the caller simply not re-invoking with the
/// confirmation set.
pub fn gate_and_build(
    draft: &ReviewDraft,
    existing: &[CommissionEntry],
    user_id: &str,
    confirm: &SaveConfirmations,
) -> SaveOutcome {
    let cost = match draft.cost_before_vat {
        Some(cost) => cost,
        None if confirm.default_cost_to_zero => 0.0,
        None => return SaveOutcome::NeedsCostConfirmation,
    };

    if !confirm.accept_duplicate {
        if let Some(existing_entry) =
            ledger::find_duplicate(existing, user_id, &draft.invoice_number)
        {
            return SaveOutcome::DuplicateInvoice {
                existing_entry_id: existing_entry.id.clone(),
            };
        }
    }

    let now = now_rfc3339();
    let mut entry = CommissionEntry {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        invoice_number: draft.invoice_number.trim().to_string(),
        receipt_number: draft.receipt_number.clone(),
        customer: draft.customer.trim().to_string(),
        project: draft.project.trim().to_string(),
        amount_before_vat: draft.amount_before_vat,
        cost_before_vat: cost,
        tax: draft.tax,
        commission_rate: draft.commission_rate,
        net_total: 0.0,
        net_to_pay: 0.0,
        invoice_month: draft.invoice_month.clone(),
        client_paid_date: draft.client_paid_date.clone(),
        company_paid_date: None,
        commission_status: ledger::status_for_new_entry(draft.client_paid_date.as_deref()),
        note: draft.note.clone(),
        source_file: draft.source_file.clone(),
        created_at: now.clone(),
        updated_at: now,
    };
    ledger::recompute(&mut entry);

    SaveOutcome::Saved { entry }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CommissionStatus;
    use crate::services::ledger::tests::sample_entry;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 11, 20).unwrap()
    }

    fn raw(invoice_date: Option<&str>) -> ExtractedInvoiceData {
        ExtractedInvoiceData {
            invoice_number: Some("INV-42".to_string()),
            receipt_number: None,
            customer: Some("Acme GmbH".to_string()),
            amount_before_vat: Some(1200.0),
            currency_code: None,
            invoice_date: invoice_date.map(str::to_string),
            project_description: Some("Relaunch".to_string()),
        }
    }

    #[test]
    fn invoice_month_floors_to_first_of_month() {
        let draft = draft_from_extraction(&raw(Some("2023-09-17")), 12.5, today());
        assert_eq!(draft.invoice_month, "2023-09-01");
        assert_eq!(draft.commission_rate, 12.5);
    }

    #[test]
    fn unparseable_date_falls_back_to_current_month() {
        let draft = draft_from_extraction(&raw(Some("next tuesday")), 10.0, today());
        assert_eq!(draft.invoice_month, "2023-11-01");

        let draft = draft_from_extraction(&raw(None), 10.0, today());
        assert_eq!(draft.invoice_month, "2023-11-01");
    }

    #[test]
    fn cost_stays_blank_regardless_of_extraction() {
        let draft = draft_from_extraction(&raw(Some("2023-09-17")), 10.0, today());
        assert!(draft.cost_before_vat.is_none());
    }

    #[test]
    fn foreign_currency_converts_with_metadata() {
        let mut data = raw(Some("2023-09-17"));
        data.amount_before_vat = Some(100.0);
        data.currency_code = Some("USD".to_string());

        let draft = draft_from_extraction(&data, 10.0, today());
        assert_eq!(draft.amount_before_vat, 92.0);
        let conversion = draft.conversion.expect("conversion metadata");
        assert_eq!(conversion.original_amount, 100.0);
        assert_eq!(conversion.original_currency, "USD");
        assert_eq!(conversion.rate, 0.92);
    }

    #[test]
    fn local_and_unknown_currencies_stay_unconverted() {
        let (amount, conversion) = convert_currency(100.0, Some("EUR"));
        assert_eq!(amount, 100.0);
        assert!(conversion.is_none());

        let (amount, conversion) = convert_currency(100.0, Some("XXX"));
        assert_eq!(amount, 100.0);
        assert!(conversion.is_none());

        let (amount, conversion) = convert_currency(100.0, None);
        assert_eq!(amount, 100.0);
        assert!(conversion.is_none());
    }

    #[test]
    fn receipt_number_prefills_client_paid_date() {
        let mut data = raw(Some("2023-09-17"));
        data.receipt_number = Some("RC-9".to_string());

        let draft = draft_from_extraction(&data, 10.0, today());
        assert_eq!(draft.client_paid_date.as_deref(), Some("2023-09-17"));
    }

    #[test]
    fn blank_cost_gates_before_duplicate_check() {
        let existing = vec![sample_entry("u1", "INV-42")];
        let mut draft = draft_from_extraction(&raw(None), 10.0, today());
        draft.cost_before_vat = None;

        // First gate: cost confirmation, even though a duplicate exists too.
        let outcome = gate_and_build(&draft, &existing, "u1", &SaveConfirmations::default());
        assert!(matches!(outcome, SaveOutcome::NeedsCostConfirmation));

        // Second gate: duplicate, once the cost is confirmed.
        let outcome = gate_and_build(
            &draft,
            &existing,
            "u1",
            &SaveConfirmations {
                default_cost_to_zero: true,
                accept_duplicate: false,
            },
        );
        assert!(matches!(outcome, SaveOutcome::DuplicateInvoice { .. }));

        // Both confirmed: the entry is created with cost zero.
        let outcome = gate_and_build(
            &draft,
            &existing,
            "u1",
            &SaveConfirmations {
                default_cost_to_zero: true,
                accept_duplicate: true,
            },
        );
        match outcome {
            SaveOutcome::Saved { entry } => {
                assert_eq!(entry.cost_before_vat, 0.0);
                assert_eq!(entry.invoice_number, "INV-42");
            }
            other => panic!("expected saved entry, got {:?}", other),
        }
    }

    #[test]
    fn saved_entry_has_derived_fields_and_status() {
        let mut draft = draft_from_extraction(&raw(Some("2023-09-17")), 10.0, today());
        draft.cost_before_vat = Some(200.0);
        draft.client_paid_date = Some("2023-09-30".to_string());

        let outcome = gate_and_build(&draft, &[], "u1", &SaveConfirmations::default());
        match outcome {
            SaveOutcome::Saved { entry } => {
                assert_eq!(entry.net_total, 1000.0);
                assert_eq!(entry.net_to_pay, 100.0);
                assert_eq!(entry.commission_status, CommissionStatus::Eligible);
            }
            other => panic!("expected saved entry, got {:?}", other),
        }
    }

    #[test]
    fn entry_without_client_paid_date_saves_as_unpaid() {
        let mut draft = draft_from_extraction(&raw(None), 10.0, today());
        draft.cost_before_vat = Some(0.0);

        match gate_and_build(&draft, &[], "u1", &SaveConfirmations::default()) {
            SaveOutcome::Saved { entry } => {
                assert_eq!(entry.commission_status, CommissionStatus::Unpaid)
            }
            other => panic!("expected saved entry, got {:?}", other),
        }
    }
}
