//! Deterministic payslip extraction.
//!
//! [`Extractor::extract`] turns one UTF-8 text blob into a
//! [`CandidateRecord`](payslip_core::CandidateRecord): template
//! classification, header fields, body items, employer contributions, then
//! totals reconciliation. [`Extractor::extract_with_fallback`] additionally
//! consults a [`FallbackHook`] when required fields are still unset.

pub mod contributions;
pub mod fallback;
pub mod fields;
pub mod items;
pub mod pipeline;
pub mod reconcile;
pub mod template;
mod text;

pub use contributions::{ContributionBlock, extract_contributions};
pub use fallback::{FallbackError, FallbackHook, FallbackRecord, apply_fallback, needs_fallback};
pub use fields::{HeaderFields, extract_fields};
pub use items::{BodyItems, extract_items};
pub use pipeline::Extractor;
pub use reconcile::{reconcile, stated_totals};
pub use template::{TemplateProfile, classify, profile};
