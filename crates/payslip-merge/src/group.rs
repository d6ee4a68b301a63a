//! Identity grouping of candidate records.
//!
//! Parts belong together when they share the worker's national id, a
//! reference date (document date, else period start) and the period end.
//! A primary group is then split by declared contribution base, so two
//! payslips for the same worker and month with different bases (ordinary
//! and supplementary runs) stay separate.

use std::collections::HashMap;

use chrono::NaiveDate;
use payslip_core::{CandidateRecord, render_amount, round2};
use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentityKey {
    pub national_id: String,
    pub reference: NaiveDate,
    pub period_end: Option<NaiveDate>,
}

impl IdentityKey {
    /// `None` when the record lacks a national id or a reference date; such
    /// records are never grouped with anything.
    pub fn of(record: &CandidateRecord) -> Option<Self> {
        let national_id: String = record
            .worker
            .national_id
            .as_deref()?
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .map(|c| c.to_ascii_uppercase())
            .collect();
        if national_id.is_empty() {
            return None;
        }
        let reference = record.document_date.or(record.period.start)?;
        Some(Self {
            national_id,
            reference,
            period_end: record.period.end,
        })
    }
}

/// Indices of the records forming one logical payslip, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Group {
    pub members: Vec<usize>,
    /// Diagnostics about how the group was formed.
    pub notes: Vec<String>,
}

/// Partition `records` into merge groups. Groups are returned in order of
/// their first member.
pub fn group_records(records: &[CandidateRecord]) -> Vec<Group> {
    let mut primary: Vec<Vec<usize>> = Vec::new();
    let mut by_key: HashMap<IdentityKey, usize> = HashMap::new();

    for (i, record) in records.iter().enumerate() {
        match IdentityKey::of(record) {
            Some(key) => match by_key.get(&key) {
                Some(&slot) => primary[slot].push(i),
                None => {
                    by_key.insert(key, primary.len());
                    primary.push(vec![i]);
                }
            },
            None => primary.push(vec![i]),
        }
    }

    let mut groups: Vec<Group> = primary
        .into_iter()
        .flat_map(|members| split_by_base(records, members))
        .collect();
    groups.sort_by_key(|g| g.members.first().copied());

    tracing::debug!(records = records.len(), groups = groups.len(), "records grouped");
    groups
}

fn split_by_base(records: &[CandidateRecord], members: Vec<usize>) -> Vec<Group> {
    let mut by_base: Vec<(Decimal, Vec<usize>)> = Vec::new();
    let mut without_base = Vec::new();

    for i in members {
        match records[i].contribution_base.map(round2) {
            Some(base) => match by_base.iter_mut().find(|(b, _)| *b == base) {
                Some((_, group)) => group.push(i),
                None => by_base.push((base, vec![i])),
            },
            None => without_base.push(i),
        }
    }

    let competing = by_base.len();
    let Some((first_base, first)) = by_base.first_mut() else {
        return vec![Group {
            members: without_base,
            notes: Vec::new(),
        }];
    };

    let mut notes = Vec::new();
    if !without_base.is_empty() {
        if competing > 1 {
            notes.push(format!(
                "{} parts without a contribution base joined the group with base {} out of {competing} competing bases",
                without_base.len(),
                render_amount(*first_base),
            ));
        }
        first.extend(without_base);
        first.sort_unstable();
    }

    by_base
        .into_iter()
        .enumerate()
        .map(|(n, (_, members))| Group {
            members,
            notes: if n == 0 { std::mem::take(&mut notes) } else { Vec::new() },
        })
        .collect()
}
