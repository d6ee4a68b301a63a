//! Stated totals and their reconciliation against extracted items.
//!
//! Stated values are never overwritten. A disagreement beyond the tolerance
//! is recorded as a warning; an absent total is filled from the item sum.
//! Running [`reconcile`] twice leaves the record unchanged.

use once_cell::sync::Lazy;
use payslip_core::{
    CandidateRecord, LineItem, Totals, checked_sum, parse_amount, render_amount, round2, within,
};
use regex::Regex;
use rust_decimal::Decimal;
use tracing::debug;

use crate::text::Lines;

static STATED_GROSS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bT(?:OTAL)?\.?\s*DEVENGADO\s*[:.]?\s*(?P<amount>\d[\d.,]*)").expect("gross")
});
static STATED_DEDUCTIONS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bT(?:OTAL)?\.?\s*A\s+DEDUCIR\s*[:.]?\s*(?P<amount>\d[\d.,]*)").expect("deductions")
});
static STATED_NET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\bLIQUIDO\s+(?:TOTAL\s+)?A\s+PERCIBIR\s*(?:\(\s*A\s*-\s*B\s*\))?\s*[:.]?\s*(?P<amount>\d[\d.,]*)",
    )
    .expect("net")
});

/// Scan the stated gross, deductions and net totals from `text`.
///
/// The first occurrence of each label wins. Malformed amounts are reported
/// and leave the total unset.
pub fn stated_totals(text: &str) -> (Totals, Vec<String>) {
    let lines = Lines::new(text);
    let mut warnings = Vec::new();
    let mut scan = |pattern: &Regex| -> Option<Decimal> {
        let token = lines
            .folded
            .iter()
            .find_map(|line| pattern.captures(line).map(|c| c["amount"].to_string()))?;
        let token = token.trim_end_matches(['.', ',']);
        parse_amount(token)
            .map_err(|err| warnings.push(err.to_string()))
            .ok()
    };

    let totals = Totals {
        gross: scan(&STATED_GROSS),
        deductions: scan(&STATED_DEDUCTIONS),
        net: scan(&STATED_NET),
        employer_total: None,
    };
    (totals, warnings)
}

/// Cross-check stated totals against item sums and fill the gaps.
pub fn reconcile(record: &mut CandidateRecord, tolerance: Decimal) {
    let mut messages = Vec::new();
    let computed_gross = item_sum("earnings", &record.earning_items, &mut messages);
    let computed_deductions = item_sum("deductions", &record.deduction_items, &mut messages);

    messages.extend(settle("gross", &mut record.totals.gross, computed_gross, tolerance));
    messages.extend(settle(
        "deductions",
        &mut record.totals.deductions,
        computed_deductions,
        tolerance,
    ));

    let computed_net = match (record.totals.gross, record.totals.deductions) {
        (Some(gross), Some(deductions)) => Some(round2(gross - deductions)),
        _ => None,
    };
    messages.extend(settle("net", &mut record.totals.net, computed_net, tolerance));

    record.totals.employer_total = if record.employer_contributions.is_empty() {
        None
    } else {
        let total = checked_sum(record.employer_contributions.iter().map(|c| c.amount));
        if total.is_none() {
            messages.push("employer contribution sum is out of range; total left unset".into());
        }
        total.map(round2)
    };

    for message in messages {
        record.warn(message);
    }

    debug!(
        source = %record.source_id,
        gross = ?record.totals.gross,
        deductions = ?record.totals.deductions,
        net = ?record.totals.net,
        employer_total = ?record.totals.employer_total,
        "totals reconciled"
    );
}

fn item_sum(label: &str, items: &[LineItem], messages: &mut Vec<String>) -> Option<Decimal> {
    if items.is_empty() {
        return None;
    }
    let sum = checked_sum(items.iter().map(|i| i.amount));
    if sum.is_none() {
        messages.push(format!("{label} sum is out of range; not cross-checked"));
    }
    sum.map(round2)
}

fn settle(
    label: &str,
    stated: &mut Option<Decimal>,
    computed: Option<Decimal>,
    tolerance: Decimal,
) -> Option<String> {
    match (*stated, computed) {
        (Some(s), Some(c)) if !within(s, c, tolerance) => Some(format!(
            "stated {label} {} differs from computed {}",
            render_amount(s),
            render_amount(c)
        )),
        (None, Some(c)) => {
            *stated = Some(c);
            None
        }
        _ => None,
    }
}
