//! Employer contribution block.
//!
//! Each line carries a concept and up to three trailing numbers. Column
//! layouts differ between templates, so which number is the rate and which
//! the amount is decided arithmetically:
//!
//! - `base rate amount`: try `(x, y)` then `(y, x)` against
//!   `base × rate / 100 ≈ amount`; otherwise the smaller number is the rate.
//!   The base becomes the established base for later lines.
//! - `rate amount`: same test against the established base.
//! - `amount`: rate unset, base taken from the established base.

use once_cell::sync::Lazy;
use payslip_core::{
    EmployerContribution, ExtractError, Vocabulary, fold_upper, parse_rate, round2, within,
};
use regex::Regex;
use rust_decimal::Decimal;
use tracing::debug;

use crate::template::TemplateProfile;
use crate::text::Lines;

/// A number, optionally with an attached percent sign or currency marker.
static NUMERIC_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^€?\d[\d.,]*(?:%|€|EUR)?$").expect("numeric token"));
static ORDINAL_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\*?\d{1,4}$").expect("ordinal"));

#[derive(Debug, Default)]
pub struct ContributionBlock {
    pub contributions: Vec<EmployerContribution>,
    /// First base stated on a three-number line.
    pub declared_base: Option<Decimal>,
    pub warnings: Vec<String>,
}

/// Extract employer contributions between the template's start anchor and
/// the withholding-base anchor.
pub fn extract_contributions(
    text: &str,
    vocabulary: &Vocabulary,
    profile: &TemplateProfile,
    tolerance: Decimal,
) -> ContributionBlock {
    let lines = Lines::new(text);
    let mut out = ContributionBlock::default();

    let Some(start) = lines.find_any(&profile.contribution_start(), 0) else {
        out.warnings.push(
            ExtractError::MissingAnchor {
                anchor: "APORTACION EMPRESA",
                fallback: "no employer contributions extracted",
            }
            .to_string(),
        );
        return out;
    };
    let end = lines
        .find_any(&profile.contribution_end(), start + 1)
        .unwrap_or_else(|| {
            out.warnings.push(
                ExtractError::MissingAnchor {
                    anchor: "BASE SUJETA A RETENCION",
                    fallback: "contribution block read to the end of the text",
                }
                .to_string(),
            );
            lines.len()
        });

    let mut established: Option<Decimal> = None;
    for line in &lines.raw[start + 1..end] {
        let Some((concept, numbers)) = split_line(line, &mut out.warnings) else {
            continue;
        };
        if fold_upper(&concept).starts_with("TOTAL") {
            continue;
        }
        let canonical = vocabulary.contribution_concept(&concept);
        if numbers.is_empty() {
            // Column headings and wrapped text carry no numbers.
            if canonical.is_some() {
                out.warnings
                    .push(format!("contribution line {concept:?} carries no amount; line skipped"));
            }
            continue;
        }
        let Some(canonical) = canonical else {
            out.warnings
                .push(format!("unknown contribution concept {concept:?}; line skipped"));
            continue;
        };

        let numbers = if numbers.len() > 3 {
            out.warnings.push(format!(
                "contribution line {concept:?} has {} numbers; using the last three",
                numbers.len()
            ));
            &numbers[numbers.len() - 3..]
        } else {
            &numbers[..]
        };

        let (base, rate, amount) = match *numbers {
            [base, x, y] => {
                established = Some(base);
                out.declared_base.get_or_insert(base);
                let (rate, amount) = assign(base, x, y, tolerance);
                (Some(base), Some(rate), amount)
            }
            [x, y] => match established {
                Some(base) => {
                    let (rate, amount) = assign(base, x, y, tolerance);
                    (Some(base), Some(rate), amount)
                }
                None => (None, Some(x.min(y)), x.max(y)),
            },
            [amount] => (established, None, amount),
            _ => continue,
        };

        out.contributions.push(EmployerContribution {
            concept: canonical.to_string(),
            base,
            rate,
            amount,
        });
    }

    debug!(
        contributions = out.contributions.len(),
        base = ?out.declared_base,
        "employer contributions extracted"
    );
    out
}

/// Split a line into its concept text and trailing numbers.
///
/// Returns `None` when a number-looking token fails to parse; the failure is
/// recorded and the line is skipped.
fn split_line(line: &str, warnings: &mut Vec<String>) -> Option<(String, Vec<Decimal>)> {
    let mut tokens: Vec<&str> = line.split_whitespace().collect();
    let mut numbers = Vec::new();

    while let Some(&token) = tokens.last() {
        if matches!(token, "%" | "€" | "EUR" | "eur") {
            tokens.pop();
            continue;
        }
        if !NUMERIC_TOKEN.is_match(token) {
            break;
        }
        match parse_rate(token) {
            Ok(value) => numbers.push(value),
            Err(err) => {
                warnings.push(err.to_string());
                return None;
            }
        }
        tokens.pop();
    }
    numbers.reverse();

    let concept_start = tokens
        .iter()
        .position(|t| !ORDINAL_TOKEN.is_match(t))
        .unwrap_or(tokens.len());
    Some((tokens[concept_start..].join(" "), numbers))
}

/// Decide which of `x`, `y` is the rate and which the amount for `base`.
fn assign(base: Decimal, x: Decimal, y: Decimal, tolerance: Decimal) -> (Decimal, Decimal) {
    if consistent(base, x, y, tolerance) {
        (x, y)
    } else if consistent(base, y, x, tolerance) {
        (y, x)
    } else {
        (x.min(y), x.max(y))
    }
}

/// Out-of-range products never count as consistent.
fn consistent(base: Decimal, rate: Decimal, amount: Decimal, tolerance: Decimal) -> bool {
    base.checked_mul(rate)
        .and_then(|p| p.checked_div(Decimal::ONE_HUNDRED))
        .is_some_and(|expected| within(round2(expected), amount, tolerance))
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use payslip_core::TemplateId;

    use super::*;
    use crate::template::profile;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn tol() -> Decimal {
        dec("0.1")
    }

    fn run(text: &str) -> ContributionBlock {
        extract_contributions(text, &Vocabulary::default(), profile(TemplateId::General), tol())
    }

    #[test]
    fn three_numbers_base_rate_amount() {
        let block = run("APORTACION EMPRESA\nCONTINGENCIAS COMUNES 1.000,00 24,27 242,70\nBASE SUJETA A RETENCION 1.000,00\n");
        assert!(block.warnings.is_empty(), "{:?}", block.warnings);
        let c = &block.contributions[0];
        assert_eq!(c.concept, "Contingencias comunes");
        assert_eq!(c.base, Some(dec("1000.00")));
        assert_eq!(c.rate, Some(dec("24.27")));
        assert_eq!(c.amount, dec("242.70"));
        assert_eq!(block.declared_base, Some(dec("1000.00")));
    }

    #[test]
    fn swapped_columns_are_disambiguated() {
        let block = run("APORTACION EMPRESA\nCONTINGENCIAS COMUNES 1.000,00 242,70 24,27\n");
        let c = &block.contributions[0];
        assert_eq!(c.rate, Some(dec("24.27")));
        assert_eq!(c.amount, dec("242.70"));
    }

    #[test]
    fn inconsistent_columns_take_smaller_as_rate() {
        let block = run("APORTACION EMPRESA\nDESEMPLEO 1.000,00 90,00 5,50\nBASE IRPF\n");
        let c = &block.contributions[0];
        assert_eq!(c.rate, Some(dec("5.50")));
        assert_eq!(c.amount, dec("90.00"));
    }

    #[test]
    fn established_base_carries_to_later_lines() {
        let text = "\
Aportación de la empresa
01 CONTINGENCIAS COMUNES    1.450,00   23,60 %   342,20
02 AT Y EP                             1,50 %    21,75
03 DESEMPLEO                           5,50      79,75
04 FOGASA                                         2,90
BASE SUJETA A RETENCIÓN 1.450,00
";
        let block = run(text);
        assert!(block.warnings.is_empty(), "{:?}", block.warnings);
        let got: Vec<_> = block
            .contributions
            .iter()
            .map(|c| (c.concept.as_str(), c.base, c.rate, c.amount))
            .collect();
        let base = Some(dec("1450.00"));
        assert_eq!(
            got,
            vec![
                ("Contingencias comunes", base, Some(dec("23.60")), dec("342.20")),
                ("Accidentes de trabajo y EP", base, Some(dec("1.50")), dec("21.75")),
                ("Desempleo", base, Some(dec("5.50")), dec("79.75")),
                ("FOGASA", base, None, dec("2.90")),
            ]
        );
    }

    #[test]
    fn two_numbers_without_base() {
        let block = run("APORTACION EMPRESA\nFORMACION PROFESIONAL 8,70 0,60\n");
        let c = &block.contributions[0];
        assert_eq!(c.base, None);
        assert_eq!(c.rate, Some(dec("0.60")));
        assert_eq!(c.amount, dec("8.70"));
    }

    #[test]
    fn unknown_totals_and_blank_lines() {
        let text = "\
APORTACION EMPRESA
CONCEPTO BASE TIPO APORTACION
PLUS CONVENIO 1.000,00 10,00 100,00
TOTAL APORTACION 342,20
MEI 1.000,00 0,58 5,80
";
        let block = run(text);
        assert_eq!(block.contributions.len(), 1);
        assert_eq!(block.contributions[0].concept, "MEI");
        assert!(
            block
                .warnings
                .iter()
                .any(|w| w.contains("unknown contribution concept \"PLUS CONVENIO\""))
        );
        assert!(
            block
                .warnings
                .iter()
                .any(|w| w.contains("missing anchor \"BASE SUJETA A RETENCION\""))
        );
    }

    #[test]
    fn malformed_number_skips_line() {
        let block = run("APORTACION EMPRESA\nDESEMPLEO 1.000,00 5,5 55,00\nFOGASA 1.000,00 0,20 2,00\nBASE IRPF\n");
        assert_eq!(block.contributions.len(), 1);
        assert_eq!(block.contributions[0].concept, "FOGASA");
        assert!(block.warnings.iter().any(|w| w.contains("malformed number")));
    }

    #[test]
    fn extra_numbers_use_last_three() {
        let block = run("APORTACION EMPRESA\nDESEMPLEO 30 1.000,00 5,50 55,00\nBASE IRPF\n");
        let c = &block.contributions[0];
        assert_eq!(c.base, Some(dec("1000.00")));
        assert_eq!(c.amount, dec("55.00"));
        assert!(block.warnings.iter().any(|w| w.contains("using the last three")));
    }

    #[test]
    fn attached_currency_markers() {
        let text = "\
APORTACION EMPRESA
CONTINGENCIAS COMUNES 1.000,00 23,60 236,00€
DESEMPLEO 1.000,00 5,50 55,00 €
FOGASA 1.000,00 0,20% 2,00EUR
BASE IRPF
";
        let block = run(text);
        assert!(block.warnings.is_empty(), "{:?}", block.warnings);
        let got: Vec<_> = block
            .contributions
            .iter()
            .map(|c| (c.concept.as_str(), c.rate, c.amount))
            .collect();
        assert_eq!(
            got,
            vec![
                ("Contingencias comunes", Some(dec("23.60")), dec("236.00")),
                ("Desempleo", Some(dec("5.50")), dec("55.00")),
                ("FOGASA", Some(dec("0.20")), dec("2.00")),
            ]
        );
        assert_eq!(block.declared_base, Some(dec("1000.00")));
    }

    #[test]
    fn known_concept_without_numbers_is_reported() {
        let block = run("APORTACION EMPRESA\nCONCEPTO BASE TIPO\nDESEMPLEO n/d\nBASE IRPF\n");
        assert!(block.contributions.is_empty());
        assert_eq!(
            block.warnings,
            vec!["contribution line \"DESEMPLEO n/d\" carries no amount; line skipped"]
        );
    }

    #[test]
    fn overflowing_columns_do_not_panic() {
        let text = "APORTACION DE LA EMPRESA\nCONTINGENCIAS COMUNES 100000000000000000000 100000000000000000000 236,00\nBASE IRPF\n";
        let block = run(text);
        assert_eq!(block.contributions.len(), 1);
        let c = &block.contributions[0];
        assert_eq!(c.rate, Some(dec("236.00")));
        assert_eq!(c.amount, dec("100000000000000000000"));
    }

    #[test]
    fn missing_start_anchor() {
        let block = run("CONTINGENCIAS COMUNES 1.000,00 23,60 236,00\n");
        assert!(block.contributions.is_empty());
        assert_eq!(block.warnings.len(), 1);
    }

    #[test]
    fn template_anchor_opens_block() {
        let text = "COSTE EMPRESA\nCONTINGENCIAS COMUNES 1.000,00 23,60 236,00\nCOSTE TOTAL 1.236,00\n";
        let block = extract_contributions(
            text,
            &Vocabulary::default(),
            profile(TemplateId::CostSummary),
            tol(),
        );
        assert_eq!(block.contributions.len(), 1);
        assert!(block.warnings.is_empty());
    }
}
