//! Boundary to a secondary extraction service.
//!
//! When deterministic extraction leaves required fields unset, the pipeline
//! may ask a [`FallbackHook`] for a partial record. Fallback values only fill
//! slots that are still unset; extracted values always win.

use async_trait::async_trait;
use chrono::NaiveDate;
use payslip_core::{CandidateRecord, Company, EmployerContribution, LineItem, Period, Totals, Worker};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::reconcile::reconcile;

/// Partial record returned by a fallback service. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackRecord {
    pub company: Company,
    pub worker: Worker,
    pub period: Period,
    pub document_date: Option<NaiveDate>,
    pub earning_items: Vec<LineItem>,
    pub deduction_items: Vec<LineItem>,
    pub employer_contributions: Vec<EmployerContribution>,
    pub totals: Totals,
}

#[derive(Debug, Error)]
pub enum FallbackError {
    #[error("fallback unavailable: {0}")]
    Unavailable(String),

    #[error("fallback timed out")]
    Timeout,

    #[error("invalid fallback response: {0}")]
    InvalidResponse(String),
}

/// Secondary extractor consulted for records with gaps.
#[async_trait]
pub trait FallbackHook: Send + Sync {
    async fn extract_fallback(&self, text: &str) -> Result<Option<FallbackRecord>, FallbackError>;
}

/// True when any required field is unset or either item list is empty.
pub fn needs_fallback(record: &CandidateRecord) -> bool {
    let c = &record.company;
    let w = &record.worker;
    let p = &record.period;
    let t = &record.totals;
    c.legal_name.is_none()
        || c.tax_id.is_none()
        || w.full_name.is_none()
        || w.national_id.is_none()
        || p.start.is_none()
        || p.end.is_none()
        || t.gross.is_none()
        || t.deductions.is_none()
        || t.net.is_none()
        || record.earning_items.is_empty()
        || record.deduction_items.is_empty()
}

/// Fill unset slots of `record` from `fallback`, then re-apply the period
/// and totals invariants. Returns the number of slots filled.
pub fn apply_fallback(record: &mut CandidateRecord, fallback: FallbackRecord, tolerance: Decimal) -> usize {
    let mut filled = 0;

    fill(&mut record.company.legal_name, fallback.company.legal_name, &mut filled);
    fill(&mut record.company.tax_id, fallback.company.tax_id, &mut filled);
    fill(&mut record.worker.full_name, fallback.worker.full_name, &mut filled);
    fill(&mut record.worker.national_id, fallback.worker.national_id, &mut filled);
    fill(&mut record.period.start, fallback.period.start, &mut filled);
    fill(&mut record.period.end, fallback.period.end, &mut filled);
    fill(&mut record.period.days, fallback.period.days, &mut filled);
    fill(&mut record.document_date, fallback.document_date, &mut filled);
    fill(&mut record.totals.gross, fallback.totals.gross, &mut filled);
    fill(&mut record.totals.deductions, fallback.totals.deductions, &mut filled);
    fill(&mut record.totals.net, fallback.totals.net, &mut filled);

    let mut dropped = 0;
    if record.earning_items.is_empty() {
        let items = non_negative(fallback.earning_items, |i| i.amount, &mut dropped);
        filled += usize::from(!items.is_empty());
        record.earning_items = items;
    }
    if record.deduction_items.is_empty() {
        let items = non_negative(fallback.deduction_items, |i| i.amount, &mut dropped);
        filled += usize::from(!items.is_empty());
        record.deduction_items = items;
    }
    if record.employer_contributions.is_empty() {
        let items = non_negative(fallback.employer_contributions, |c| c.amount, &mut dropped);
        filled += usize::from(!items.is_empty());
        record.employer_contributions = items;
    }
    if dropped > 0 {
        record.warn(format!("dropped {dropped} fallback items with negative amounts"));
    }

    if let Some(message) = record.period.enforce_day_count() {
        record.warn(message);
    }
    reconcile(record, tolerance);

    if filled > 0 {
        record.warn(format!("fallback filled {filled} fields"));
    }
    filled
}

fn fill<T>(slot: &mut Option<T>, value: Option<T>, filled: &mut usize) {
    if slot.is_none() && value.is_some() {
        *slot = value;
        *filled += 1;
    }
}

fn non_negative<T>(items: Vec<T>, amount: impl Fn(&T) -> Decimal, dropped: &mut usize) -> Vec<T> {
    let before = items.len();
    let kept: Vec<T> = items
        .into_iter()
        .filter(|i| !amount(i).is_sign_negative())
        .collect();
    *dropped += before - kept.len();
    kept
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn item(concept: &str, amount: &str) -> LineItem {
        LineItem {
            concept: concept.into(),
            raw_concept: concept.into(),
            amount: dec(amount),
        }
    }

    fn complete() -> CandidateRecord {
        let mut r = CandidateRecord::new("a.txt");
        r.company = Company {
            legal_name: Some("ACME SL".into()),
            tax_id: Some("B12345678".into()),
        };
        r.worker = Worker {
            full_name: Some("JUAN PEREZ".into()),
            national_id: Some("12345678Z".into()),
        };
        r.period = Period {
            start: Some(date(2025, 3, 1)),
            end: Some(date(2025, 3, 31)),
            days: Some(31),
        };
        r.earning_items = vec![item("Salario base", "1000.00")];
        r.deduction_items = vec![item("Retención IRPF", "100.00")];
        r.totals = Totals {
            gross: Some(dec("1000.00")),
            deductions: Some(dec("100.00")),
            net: Some(dec("900.00")),
            employer_total: None,
        };
        r
    }

    #[test]
    fn complete_record_needs_no_fallback() {
        assert!(!needs_fallback(&complete()));
    }

    #[test]
    fn any_gap_triggers_fallback() {
        let mut r = complete();
        r.worker.national_id = None;
        assert!(needs_fallback(&r));

        let mut r = complete();
        r.deduction_items.clear();
        assert!(needs_fallback(&r));

        let mut r = complete();
        r.totals.net = None;
        assert!(needs_fallback(&r));
    }

    #[test]
    fn fills_only_unset_slots() {
        let mut r = complete();
        r.worker.national_id = None;
        r.period.end = None;
        r.period.days = None;

        let fb = FallbackRecord {
            worker: Worker {
                full_name: Some("OTHER NAME".into()),
                national_id: Some("87654321X".into()),
            },
            period: Period {
                start: None,
                end: Some(date(2025, 3, 31)),
                days: Some(30),
            },
            earning_items: vec![item("Bonus", "999.00")],
            ..Default::default()
        };

        let filled = apply_fallback(&mut r, fb, dec("0.02"));
        assert_eq!(filled, 3);
        assert_eq!(r.worker.full_name.as_deref(), Some("JUAN PEREZ"));
        assert_eq!(r.worker.national_id.as_deref(), Some("87654321X"));
        assert_eq!(r.earning_items.len(), 1);
        assert_eq!(r.earning_items[0].concept, "Salario base");
        // Day count re-derived from the bounds after filling.
        assert_eq!(r.period.days, Some(31));
        assert!(r.warnings.iter().any(|w| w.contains("computed span 31 days")));
        assert!(r.warnings.iter().any(|w| w == "fallback filled 3 fields"));
    }

    #[test]
    fn negative_amounts_are_dropped() {
        let mut r = complete();
        r.deduction_items.clear();
        r.totals.deductions = None;
        r.totals.net = None;

        let fb = FallbackRecord {
            deduction_items: vec![item("Retención IRPF", "100.00"), item("Broken", "-5.00")],
            ..Default::default()
        };
        apply_fallback(&mut r, fb, dec("0.02"));
        assert_eq!(r.deduction_items.len(), 1);
        assert_eq!(r.totals.deductions, Some(dec("100.00")));
        assert_eq!(r.totals.net, Some(dec("900.00")));
        assert!(r.warnings.iter().any(|w| w.contains("negative amounts")));
    }

    #[test]
    fn partial_json_deserializes() {
        let fb: FallbackRecord = serde_json::from_str(
            r#"{ "worker": { "national_id": "12345678Z" }, "totals": { "gross": "1200.00" } }"#,
        )
        .unwrap();
        assert_eq!(fb.worker.national_id.as_deref(), Some("12345678Z"));
        assert_eq!(fb.worker.full_name, None);
        assert_eq!(fb.totals.gross, Some(dec("1200.00")));
        assert!(fb.earning_items.is_empty());
    }
}
