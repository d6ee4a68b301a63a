//! Numeric normalisation for payslip amounts.
//!
//! Source documents use a single locale convention: `.` groups thousands
//! and `,` separates exactly two fraction digits. A currency marker may
//! lead or trail the token.
//!
//! # Grammar
//!
//! ```text
//! token   := marker? ws* integer fraction? ws* marker?
//! integer := d{1,3} ("." d{3})+ | d+
//! fraction:= "," d d
//! marker  := "€" | "EUR"
//! ```
//!
//! Parsing never rounds. Rounding to two fraction digits happens only where
//! values are stored or compared, via [`round2`].

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::ExtractError;

const CURRENCY_MARKERS: &[&str] = &["€", "EUR", "eur"];

/// Parse a locale-formatted amount such as `1.234,56 €` into a [`Decimal`].
pub fn parse_amount(token: &str) -> Result<Decimal, ExtractError> {
    let body = strip_currency(token);
    if body.is_empty() {
        return Err(ExtractError::malformed(token));
    }

    let (integer, fraction) = match body.split_once(',') {
        Some((i, f)) => (i, Some(f)),
        None => (body, None),
    };

    if let Some(f) = fraction
        && (f.len() != 2 || !f.bytes().all(|b| b.is_ascii_digit()))
    {
        return Err(ExtractError::malformed(token));
    }

    if !valid_integer(integer) {
        return Err(ExtractError::malformed(token));
    }

    let digits: String = integer.chars().filter(|&c| c != '.').collect();
    let canonical = match fraction {
        Some(f) => format!("{digits}.{f}"),
        None => digits,
    };

    Decimal::from_str(&canonical).map_err(|_| ExtractError::malformed(token))
}

/// Parse a percentage token (`23,60`, `4,70 %`) into its numeric value.
pub fn parse_rate(token: &str) -> Result<Decimal, ExtractError> {
    let trimmed = token.trim();
    let body = trimmed.strip_suffix('%').unwrap_or(trimmed);
    parse_amount(body).map_err(|_| ExtractError::malformed(token))
}

/// Render a value back into the source convention: `1234.5` → `1.234,50`.
pub fn render_amount(value: Decimal) -> String {
    let rounded = round2(value);
    let plain = format!("{:.2}", rounded.abs());
    let (integer, fraction) = plain.split_once('.').unwrap_or((plain.as_str(), "00"));

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (i, ch) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    format!("{sign}{grouped},{fraction}")
}

/// Round half away from zero to two fraction digits.
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Sum of `values`, or `None` when the total leaves the decimal range.
pub fn checked_sum(values: impl IntoIterator<Item = Decimal>) -> Option<Decimal> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(v))
}

/// True when `a` and `b` differ by at most `tolerance`.
pub fn within(a: Decimal, b: Decimal, tolerance: Decimal) -> bool {
    (a - b).abs() <= tolerance
}

fn strip_currency(token: &str) -> &str {
    let mut s = token.trim();
    for marker in CURRENCY_MARKERS {
        if let Some(rest) = s.strip_prefix(marker) {
            s = rest.trim_start();
        }
        if let Some(rest) = s.strip_suffix(marker) {
            s = rest.trim_end();
        }
    }
    s
}

fn valid_integer(integer: &str) -> bool {
    if integer.is_empty() {
        return false;
    }
    if integer.bytes().all(|b| b.is_ascii_digit()) {
        return true;
    }

    // Grouped form: first group 1-3 digits, every later group exactly 3.
    let mut groups = integer.split('.');
    let first_ok = groups
        .next()
        .is_some_and(|g| (1..=3).contains(&g.len()) && g.bytes().all(|b| b.is_ascii_digit()));
    first_ok && groups.all(|g| g.len() == 3 && g.bytes().all(|b| b.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn plain_and_grouped_amounts() {
        assert_eq!(parse_amount("1200,00").unwrap(), dec("1200.00"));
        assert_eq!(parse_amount("1.200,00").unwrap(), dec("1200.00"));
        assert_eq!(parse_amount("1.234.567,89").unwrap(), dec("1234567.89"));
        assert_eq!(parse_amount("0,20").unwrap(), dec("0.20"));
        assert_eq!(parse_amount("1.200").unwrap(), dec("1200"));
        assert_eq!(parse_amount("42").unwrap(), dec("42"));
    }

    #[test]
    fn currency_markers_stripped() {
        assert_eq!(parse_amount("1.200,00 €").unwrap(), dec("1200.00"));
        assert_eq!(parse_amount("€1.200,00").unwrap(), dec("1200.00"));
        assert_eq!(parse_amount("  850,10 EUR ").unwrap(), dec("850.10"));
    }

    #[test]
    fn malformed_tokens_rejected() {
        for token in ["", "€", "1,2", "1,234", "12.34,00", "1.2345,00", "abc", "1.200,0a", "-5,00"] {
            assert!(
                matches!(parse_amount(token), Err(ExtractError::MalformedNumber { .. })),
                "expected {token:?} to be rejected"
            );
        }
    }

    #[test]
    fn no_rounding_on_parse() {
        // Fraction is exactly two digits by grammar; the value keeps its scale.
        let v = parse_amount("10,05").unwrap();
        assert_eq!(v.scale(), 2);
        assert_eq!(v, dec("10.05"));
    }

    #[test]
    fn rates_accept_percent_sign() {
        assert_eq!(parse_rate("23,60").unwrap(), dec("23.60"));
        assert_eq!(parse_rate("4,70 %").unwrap(), dec("4.70"));
        assert_eq!(parse_rate("4,70%").unwrap(), dec("4.70"));
        assert!(parse_rate("4,7%").is_err());
    }

    #[test]
    fn render_uses_source_convention() {
        assert_eq!(render_amount(dec("1234.5")), "1.234,50");
        assert_eq!(render_amount(dec("0.2")), "0,20");
        assert_eq!(render_amount(dec("999")), "999,00");
        assert_eq!(render_amount(dec("1000000")), "1.000.000,00");
    }

    #[test]
    fn render_then_parse_is_stable() {
        for token in ["0,01", "7", "1.200", "1.200,00", "12.345,67", "999.999.999,99", "15,00 €"] {
            let first = parse_amount(token).unwrap();
            let again = parse_amount(&render_amount(first)).unwrap();
            assert_eq!(again, first, "round trip drifted for {token:?}");
        }
    }

    /// Any token the grammar accepts: plain or grouped integer, optional
    /// two-digit fraction, optional currency marker.
    fn valid_token() -> impl Strategy<Value = String> {
        let integer = prop_oneof!["[0-9]{1,15}", "[1-9][0-9]{0,2}(\\.[0-9]{3}){1,4}"];
        let marker = prop_oneof![Just(""), Just("€"), Just(" €"), Just(" EUR"), Just("€ ")];
        (integer, proptest::option::of("[0-9]{2}"), marker).prop_map(|(integer, fraction, marker)| {
            let number = match fraction {
                Some(f) => format!("{integer},{f}"),
                None => integer,
            };
            if marker.ends_with(' ') {
                format!("{marker}{number}")
            } else {
                format!("{number}{marker}")
            }
        })
    }

    proptest! {
        #[test]
        fn valid_tokens_survive_render_then_parse(token in valid_token()) {
            let first = parse_amount(&token).unwrap();
            prop_assert_eq!(parse_amount(&render_amount(first)).unwrap(), first);
        }

        #[test]
        fn valid_tokens_parse_as_rates(token in valid_token()) {
            prop_assert_eq!(parse_rate(&token).unwrap(), parse_amount(&token).unwrap());
        }
    }

    #[test]
    fn round2_is_half_away_from_zero() {
        assert_eq!(round2(dec("2.345")), dec("2.35"));
        assert_eq!(round2(dec("2.355")), dec("2.36"));
        assert_eq!(round2(dec("242.7")), dec("242.70"));
    }

    #[test]
    fn checked_sum_reports_overflow() {
        assert_eq!(checked_sum([dec("1.10"), dec("2.20")]), Some(dec("3.30")));
        assert_eq!(checked_sum(std::iter::empty()), Some(Decimal::ZERO));
        assert_eq!(checked_sum([Decimal::MAX, Decimal::ONE]), None);
    }

    #[test]
    fn within_tolerance() {
        assert!(within(dec("100.00"), dec("100.02"), dec("0.02")));
        assert!(!within(dec("100.00"), dec("100.03"), dec("0.02")));
    }
}
