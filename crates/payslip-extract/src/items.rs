//! Earning and deduction rows from the body table.
//!
//! The body span runs from the column-header line to the bases or
//! contribution section. Every row in between that ends with an amount is a
//! candidate item; stated-total rows are skipped so they never double as
//! items.

use once_cell::sync::Lazy;
use payslip_core::{ExtractError, LineItem, Vocabulary, parse_amount};
use regex::Regex;
use tracing::debug;

use crate::template::TemplateProfile;
use crate::text::{Lines, collapse_whitespace};

const HEADER_COLUMNS: &[&str] = &["IMPORTE", "DEVENGOS", "DEDUCCIONES"];
const BODY_END: &[&str] = &["DETERMINACION DE LAS BASES", "BASES DE COTIZACION"];

/// Optional quantity and unit price, optional ordinal, the concept,
/// an optional percentage, then the trailing amount.
static ROW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^\s*(?:\d+(?:,\d+)?\s+(?:\d{1,3}(?:\.\d{3})+|\d+),\d{2,4}\s+)?(?:\*?\d{1,4}\s+)?(?P<concept>[^\d\s].*?)(?:\s+(?P<rate>\d{1,3},\d{1,2})\s*%)?\s+(?P<amount>(?:\d{1,3}(?:\.\d{3})+|\d+),\d{2})(?:\s*(?:€|EUR))?\s*$",
    )
    .expect("row pattern")
});

static TOTAL_ROW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:T\.\s*|TOTAL(?:ES)?\b|LIQUIDO\b|SUMA\b|REMUNERACION\s+TOTAL\b)")
        .expect("total pattern")
});

static TRAILING_NUMERICS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:\s+[\d.,]+\s*%?)+$").expect("trailing numerics"));

#[derive(Debug, Default)]
pub struct BodyItems {
    pub earnings: Vec<LineItem>,
    pub deductions: Vec<LineItem>,
    pub warnings: Vec<String>,
}

/// Extract earning and deduction rows, classified through `vocabulary`.
pub fn extract_items(text: &str, vocabulary: &Vocabulary, profile: &TemplateProfile) -> BodyItems {
    let lines = Lines::new(text);
    let mut out = BodyItems::default();

    let header = (0..lines.len()).find(|&i| {
        let line = &lines.folded[i];
        line.contains("CONCEPTO") && HEADER_COLUMNS.iter().any(|c| line.contains(c))
    });
    let start = match header {
        Some(i) => i + 1,
        None => {
            out.warnings.push(
                ExtractError::MissingAnchor {
                    anchor: "CONCEPTO",
                    fallback: "item rows read from the start of the text",
                }
                .to_string(),
            );
            0
        }
    };

    let end_anchors: Vec<&str> = BODY_END
        .iter()
        .copied()
        .chain(profile.contribution_start())
        .collect();
    let end = lines.find_any(&end_anchors, start).unwrap_or_else(|| {
        out.warnings.push(
            ExtractError::MissingAnchor {
                anchor: "BASES DE COTIZACION",
                fallback: "item rows read to the end of the text",
            }
            .to_string(),
        );
        lines.len()
    });

    for i in start..end {
        if TOTAL_ROW.is_match(&lines.folded[i]) {
            continue;
        }
        let Some(caps) = ROW.captures(lines.raw[i]) else {
            continue;
        };

        let raw_concept = collapse_whitespace(&caps["concept"]);
        let cleaned = clean_concept(&raw_concept);
        if !cleaned.chars().any(char::is_alphabetic) {
            continue;
        }

        let amount = match parse_amount(&caps["amount"]) {
            Ok(amount) => amount,
            Err(err) => {
                out.warnings.push(err.to_string());
                continue;
            }
        };

        let concept = vocabulary
            .canonical_concept(&cleaned)
            .map(str::to_string)
            .unwrap_or_else(|| cleaned.clone());
        let is_deduction = vocabulary.is_deduction(&cleaned) || vocabulary.is_deduction(&concept);

        let item = LineItem {
            concept,
            raw_concept,
            amount,
        };
        if is_deduction {
            out.deductions.push(item);
        } else {
            out.earnings.push(item);
        }
    }

    debug!(
        earnings = out.earnings.len(),
        deductions = out.deductions.len(),
        span_start = start,
        span_end = end,
        "body items extracted"
    );
    out
}

/// Strip stray trailing quantities and separators left on a concept.
fn clean_concept(concept: &str) -> String {
    TRAILING_NUMERICS
        .replace(concept, "")
        .trim_end_matches([':', '-', ' '])
        .to_string()
}
