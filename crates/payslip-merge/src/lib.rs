//! Consolidation of candidate records into canonical payslip records.
//!
//! The merge is a batch operation: every candidate must be extracted before
//! grouping, since a part's identity is only comparable once its worker and
//! period fields are known.

pub mod dedup;
pub mod group;
pub mod merge;

use payslip_core::{CandidateRecord, CanonicalRecord, MergeError};

pub use dedup::{Deduped, Fingerprint, dedup_by};
pub use group::{Group, IdentityKey, group_records};
pub use merge::merge_group;

/// Group `records` by identity and merge each group.
pub fn merge_records(records: &[CandidateRecord]) -> Result<Vec<CanonicalRecord>, MergeError> {
    let groups = group_records(records);
    let mut merged = Vec::with_capacity(groups.len());

    for group in groups {
        let parts: Vec<CandidateRecord> = group.members.iter().map(|&i| records[i].clone()).collect();
        let mut canonical = merge_group(&parts)?;
        for note in group.notes {
            canonical.record.warn(note);
        }
        merged.push(canonical);
    }

    tracing::info!(
        candidates = records.len(),
        canonical = merged.len(),
        "merge complete"
    );
    Ok(merged)
}
