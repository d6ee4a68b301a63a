use payslip_core::{CandidateRecord, EngineConfig, TemplateId, Vocabulary};
use tracing::{debug, info, warn};

use crate::contributions::extract_contributions;
use crate::fallback::{FallbackHook, apply_fallback, needs_fallback};
use crate::fields::extract_fields;
use crate::items::extract_items;
use crate::reconcile::{reconcile, stated_totals};
use crate::template::{classify, profile};

/// Deterministic extraction of one text blob into a [`CandidateRecord`].
///
/// Holds only immutable configuration, so one extractor can be shared
/// across tasks.
#[derive(Debug, Clone, Default)]
pub struct Extractor {
    config: EngineConfig,
}

impl Extractor {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn with_vocabulary(vocabulary: Vocabulary) -> Self {
        Self::new(EngineConfig {
            vocabulary,
            ..Default::default()
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run every extraction stage over `text`. Never fails; every recoverable
    /// condition ends up in `warnings`.
    pub fn extract(&self, source_id: &str, text: &str) -> CandidateRecord {
        let mut record = CandidateRecord::new(source_id);
        let vocabulary = &self.config.vocabulary;
        let tolerances = self.config.tolerances;

        record.template_id = match classify(text) {
            Ok(id) => id,
            Err(err) => {
                record.warn(err.to_string());
                TemplateId::General
            }
        };
        let template = profile(record.template_id);
        debug!(source = source_id, template = %record.template_id, "template selected");

        let fields = extract_fields(text);
        record.company = fields.company;
        record.worker = fields.worker;
        record.period = fields.period;
        record.document_date = fields.document_date;

        let items = extract_items(text, vocabulary, template);
        record.earning_items = items.earnings;
        record.deduction_items = items.deductions;

        let block = extract_contributions(text, vocabulary, template, tolerances.contribution);
        record.employer_contributions = block.contributions;
        record.contribution_base = block.declared_base;

        let (totals, total_warnings) = stated_totals(text);
        record.totals = totals;

        for message in fields
            .warnings
            .into_iter()
            .chain(items.warnings)
            .chain(block.warnings)
            .chain(total_warnings)
        {
            record.warn(message);
        }

        reconcile(&mut record, tolerances.totals);

        info!(
            source = source_id,
            template = %record.template_id,
            items = record.item_count(),
            warnings = record.warnings.len(),
            "extracted candidate record"
        );
        record
    }

    /// [`extract`](Self::extract), then consult `hook` if required fields
    /// are still unset. A failing hook is recorded as a warning.
    pub async fn extract_with_fallback(
        &self,
        source_id: &str,
        text: &str,
        hook: &dyn FallbackHook,
    ) -> CandidateRecord {
        let mut record = self.extract(source_id, text);
        if !needs_fallback(&record) {
            return record;
        }

        match hook.extract_fallback(text).await {
            Ok(Some(fallback)) => {
                let filled = apply_fallback(&mut record, fallback, self.config.tolerances.totals);
                info!(source = source_id, filled, "applied fallback record");
            }
            Ok(None) => debug!(source = source_id, "fallback returned nothing"),
            Err(err) => {
                warn!(source = source_id, error = %err, "fallback failed");
                record.warn(format!("no fallback available: {err}"));
            }
        }
        record
    }
}
