pub mod error;
pub mod number;
pub mod record;
pub mod vocabulary;

pub use error::{ConfigError, ExtractError, MergeError};
pub use number::{checked_sum, parse_amount, parse_rate, render_amount, round2, within};
pub use record::{
    CandidateRecord, CanonicalRecord, Category, Company, EmployerContribution, LineItem, Period,
    TemplateId, Totals, Worker,
};
pub use vocabulary::{ConceptAlias, EngineConfig, Tolerances, Vocabulary, concept_key, fold_upper};
