//! Shared payslip record types.
//!
//! A [`CandidateRecord`] is produced once per text blob by the extraction
//! pipeline; the merge engine consumes candidates and produces
//! [`CanonicalRecord`]s. Both serialize to plain nested maps (decimals as
//! strings, dates as ISO 8601) for whatever persistence layer sits downstream.

use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Closed set of layout variants the extractor knows how to bound.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateId {
    /// Shared structure; contribution block bounded by the generic anchors only.
    #[default]
    General,
    /// Layouts with a "DETERMINACION DE LAS BASES" section ahead of the contributions.
    BaseDetermination,
    /// Layouts that print the employer cost as a "COSTE EMPRESA" summary.
    CostSummary,
}

impl TemplateId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::BaseDetermination => "base_determination",
            Self::CostSummary => "cost_summary",
        }
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub legal_name: Option<String>,
    pub tax_id: Option<String>,
}

impl Company {
    pub fn is_empty(&self) -> bool {
        self.legal_name.is_none() && self.tax_id.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Worker {
    pub full_name: Option<String>,
    pub national_id: Option<String>,
}

impl Worker {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none() && self.national_id.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub days: Option<u32>,
}

impl Period {
    pub fn is_empty(&self) -> bool {
        self.start.is_none() && self.end.is_none() && self.days.is_none()
    }

    /// Inclusive day count when both bounds are known and ordered.
    pub fn inclusive_days(&self) -> Option<u32> {
        match (self.start, self.end) {
            (Some(start), Some(end)) if start <= end => {
                u32::try_from((end - start).num_days() + 1).ok()
            }
            _ => None,
        }
    }

    /// Enforce `days == inclusive_days()` when both bounds are present.
    ///
    /// Returns the correction message when the stored count was wrong.
    pub fn enforce_day_count(&mut self) -> Option<String> {
        let computed = self.inclusive_days()?;
        match self.days {
            Some(declared) if declared != computed => {
                self.days = Some(computed);
                Some(format!(
                    "declared period length {declared} days disagrees with computed span {computed} days; using {computed}"
                ))
            }
            Some(_) => None,
            None => {
                self.days = Some(computed);
                None
            }
        }
    }
}

/// An earning or deduction row from the body table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Canonical spelling after alias mapping.
    pub concept: String,
    /// Concept text as it appeared in the source.
    pub raw_concept: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployerContribution {
    pub concept: String,
    pub base: Option<Decimal>,
    /// Percentage, e.g. `23.60` for 23,60 %.
    pub rate: Option<Decimal>,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub gross: Option<Decimal>,
    pub deductions: Option<Decimal>,
    pub net: Option<Decimal>,
    pub employer_total: Option<Decimal>,
}

/// Line-item category, in presentation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Earning,
    Deduction,
    EmployerContribution,
}

/// One extraction attempt over one text blob.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub source_id: String,
    pub template_id: TemplateId,
    pub company: Company,
    pub worker: Worker,
    pub period: Period,
    pub document_date: Option<NaiveDate>,
    pub contribution_base: Option<Decimal>,
    pub earning_items: Vec<LineItem>,
    pub deduction_items: Vec<LineItem>,
    pub employer_contributions: Vec<EmployerContribution>,
    pub totals: Totals,
    pub warnings: Vec<String>,
}

impl CandidateRecord {
    pub fn new(source_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            ..Default::default()
        }
    }

    /// Append a diagnostic. Warnings are never removed; an identical message
    /// is recorded once.
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        if !self.warnings.contains(&message) {
            tracing::warn!(source = %self.source_id, "{message}");
            self.warnings.push(message);
        }
    }

    pub fn item_count(&self) -> usize {
        self.earning_items.len() + self.deduction_items.len() + self.employer_contributions.len()
    }
}

/// The merged, deduplicated result for one real-world payslip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    #[serde(flatten)]
    pub record: CandidateRecord,
    pub source_count: usize,
    pub merged_from: Vec<String>,
    pub is_merged: bool,
}

impl CanonicalRecord {
    /// Wrap a lone candidate without altering it.
    pub fn standalone(record: CandidateRecord) -> Self {
        let merged_from = vec![record.source_id.clone()];
        Self {
            record,
            source_count: 1,
            merged_from,
            is_merged: false,
        }
    }
}
