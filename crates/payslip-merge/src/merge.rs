//! Merge of one group of candidate records into a canonical record.
//!
//! # Totals
//!
//! Parts of one payslip either restate the same totals (repeated pages) or
//! carry complementary partial totals (split payruns). The two cases are
//! told apart numerically: distinct positive values across parts are
//! summed, a single distinct value is taken once. Two genuinely
//! complementary parts with equal totals are therefore indistinguishable
//! from a repetition and are counted once.

use payslip_core::{
    CandidateRecord, CanonicalRecord, Category, Company, MergeError, Worker, checked_sum, round2,
};
use rust_decimal::Decimal;
use tracing::info;

use crate::dedup::{Fingerprint, dedup_by};

/// Merge `parts` into one canonical record.
///
/// A single part is returned unchanged; an empty slice is an error.
pub fn merge_group(parts: &[CandidateRecord]) -> Result<CanonicalRecord, MergeError> {
    let (first, rest) = parts.split_first().ok_or(MergeError::EmptyMergeGroup)?;
    if rest.is_empty() {
        return Ok(CanonicalRecord::standalone(first.clone()));
    }

    let earnings = dedup_by(
        parts.iter().flat_map(|p| p.earning_items.iter().cloned()),
        |i| Fingerprint::of_item(Category::Earning, i),
    );
    let deductions = dedup_by(
        parts.iter().flat_map(|p| p.deduction_items.iter().cloned()),
        |i| Fingerprint::of_item(Category::Deduction, i),
    );
    let contributions = dedup_by(
        parts.iter().flat_map(|p| p.employer_contributions.iter().cloned()),
        Fingerprint::of_contribution,
    );
    let removed = earnings.removed + deductions.removed + contributions.removed;

    let mut merged_from: Vec<String> = Vec::with_capacity(parts.len());
    for part in parts {
        if !merged_from.contains(&part.source_id) {
            merged_from.push(part.source_id.clone());
        }
    }

    let mut record = CandidateRecord::new(merged_from.join("+"));
    record.template_id = first.template_id;
    record.company = Company {
        legal_name: first_set(parts, |p| p.company.legal_name.clone()),
        tax_id: first_set(parts, |p| p.company.tax_id.clone()),
    };
    record.worker = Worker {
        full_name: first_set(parts, |p| p.worker.full_name.clone()),
        national_id: first_set(parts, |p| p.worker.national_id.clone()),
    };
    record.period = parts
        .iter()
        .map(|p| &p.period)
        .find(|p| p.start.is_some() && p.end.is_some())
        .or_else(|| parts.iter().map(|p| &p.period).find(|p| !p.is_empty()))
        .cloned()
        .unwrap_or_default();
    record.document_date = first_set(parts, |p| p.document_date);
    record.contribution_base = first_set(parts, |p| p.contribution_base);

    record.earning_items = earnings.kept;
    record.deduction_items = deductions.kept;
    record.employer_contributions = contributions.kept;

    record.totals.gross = resolve_total(parts.iter().map(|p| p.totals.gross));
    record.totals.deductions = resolve_total(parts.iter().map(|p| p.totals.deductions));
    record.totals.employer_total = resolve_total(parts.iter().map(|p| p.totals.employer_total));
    record.totals.net = match (record.totals.gross, record.totals.deductions) {
        (Some(gross), Some(deductions)) => Some(round2(gross - deductions)),
        _ => None,
    };

    for warning in parts.iter().flat_map(|p| &p.warnings) {
        if !record.warnings.contains(warning) {
            record.warnings.push(warning.clone());
        }
    }
    record.warn(format!(
        "merged {} parts; removed {removed} duplicate line items",
        parts.len()
    ));

    info!(
        source = %record.source_id,
        parts = parts.len(),
        removed,
        items = record.item_count(),
        "merged candidate records"
    );

    Ok(CanonicalRecord {
        record,
        source_count: parts.len(),
        merged_from,
        is_merged: true,
    })
}

fn first_set<T>(parts: &[CandidateRecord], field: impl Fn(&CandidateRecord) -> Option<T>) -> Option<T> {
    parts.iter().find_map(field)
}

/// Sum of the distinct positive values, or the first stated value when no
/// part states a positive one or the sum leaves the decimal range.
fn resolve_total(values: impl Iterator<Item = Option<Decimal>>) -> Option<Decimal> {
    let stated: Vec<Decimal> = values.flatten().map(round2).collect();
    let mut distinct: Vec<Decimal> = Vec::new();
    for &value in stated.iter().filter(|v| v.is_sign_positive() && !v.is_zero()) {
        if !distinct.contains(&value) {
            distinct.push(value);
        }
    }
    match distinct.as_slice() {
        [] => stated.first().copied(),
        [only] => Some(*only),
        many => checked_sum(many.iter().copied()).or_else(|| stated.first().copied()),
    }
}
