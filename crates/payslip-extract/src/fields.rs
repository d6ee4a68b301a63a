//! Header field extraction: company, worker, settlement period, document date.
//!
//! Each field is located independently. A field that cannot be located or
//! parsed is left unset with a warning; it never blocks the other fields.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use payslip_core::{Company, ExtractError, Period, Worker};
use regex::{Captures, Regex};
use tracing::debug;

use crate::text::Lines;

// ── Patterns ────────────────────────────────────────────────────────────

/// Header labels open their line; "APORTACION DE LA EMPRESA" and
/// "COSTE EMPRESA" are block titles elsewhere in the document.
static COMPANY_ANCHOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:DATOS\s+DE\s+LA\s+)?EMPRESA\b").expect("company anchor")
});
static WORKER_ANCHOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:DATOS\s+DEL\s+)?(?:TRABAJADOR|EMPLEADO)A?\b").expect("worker anchor")
});

/// Legal name followed by a CIF/NIF label and a company tax id.
static COMPANY_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?P<name>\p{L}[\p{L}.,&'ºª/\s-]*?)\s*[,;]?\s+(?:C\.?I\.?F\.?|N\.?I\.?F\.?)\s*[:.]?\s*(?P<id>[A-HJ-NP-SUVW]-?\d{7}-?[0-9A-J])\b",
    )
    .expect("company pattern")
});

/// Full name followed by a NIF/DNI/NIE label and a personal id.
static WORKER_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?P<name>\p{L}[\p{L}.,'ºª\s-]*?)\s*[,;]?\s+(?:N\.?I\.?[FE]\.?|D\.?N\.?I\.?)\s*[:.]?\s*(?P<id>\d{8}-?[A-Z]|[XYZ]-?\d{7}-?[A-Z])\b",
    )
    .expect("worker pattern")
});

static PERIOD_WORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\bDEL?\s+(?P<d1>\d{1,2})\s+(?:DE\s+)?(?P<m1>\d{1,2}|[A-Z]+)(?:\s+(?:DE\s+)?(?P<y1>\d{4}))?\s+AL?\s+(?P<d2>\d{1,2})\s+(?:DE\s+)?(?P<m2>\d{1,2}|[A-Z]+)\s+(?:DE\s+)?(?P<y2>\d{4})\b",
    )
    .expect("period pattern")
});

static PERIOD_SLASHED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:DEL?\s+)?(?P<d1>\d{1,2})[/-](?P<m1>\d{1,2})[/-](?P<y1>\d{4})\s*(?:AL?|-)\s*(?P<d2>\d{1,2})[/-](?P<m2>\d{1,2})[/-](?P<y2>\d{4})\b",
    )
    .expect("period pattern")
});

static DECLARED_DAYS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:TOTAL\s+)?DIAS\s*[:.]?\s*(?P<a>\d{1,3})\b|\b(?P<b>\d{1,3})\s+DIAS\b")
        .expect("days pattern")
});

static DOCUMENT_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\bFECHA(?:\s+DE\s+(?:EMISION|EXPEDICION|PAGO|ABONO))?\s*[:.]?\s*(?P<d>\d{1,2})[/-](?P<m>\d{1,2})[/-](?P<y>\d{4})\b",
    )
    .expect("date pattern")
});

// ── Output ──────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct HeaderFields {
    pub company: Company,
    pub worker: Worker,
    pub period: Period,
    pub document_date: Option<NaiveDate>,
    pub warnings: Vec<String>,
}

/// Extract every header field from `text`.
pub fn extract_fields(text: &str) -> HeaderFields {
    let lines = Lines::new(text);
    let mut out = HeaderFields::default();

    if let Some((name, id)) = party(&lines, &COMPANY_ANCHOR, &COMPANY_LINE, "EMPRESA", &mut out.warnings) {
        out.company = Company {
            legal_name: Some(name),
            tax_id: Some(id),
        };
    }
    if let Some((name, id)) = party(&lines, &WORKER_ANCHOR, &WORKER_LINE, "TRABAJADOR", &mut out.warnings) {
        out.worker = Worker {
            full_name: Some(name),
            national_id: Some(id),
        };
    }

    out.period = period(&lines, &mut out.warnings);
    out.document_date = document_date(&lines, &mut out.warnings);

    debug!(
        company = ?out.company.tax_id,
        worker = ?out.worker.national_id,
        start = ?out.period.start,
        end = ?out.period.end,
        "header fields extracted"
    );
    out
}

// ── Company / worker ────────────────────────────────────────────────────

fn party(
    lines: &Lines<'_>,
    anchor: &Regex,
    pattern: &Regex,
    anchor_name: &'static str,
    warnings: &mut Vec<String>,
) -> Option<(String, String)> {
    let Some(at) = lines.find_matching(anchor, 0) else {
        warnings.push(
            ExtractError::MissingAnchor {
                anchor: anchor_name,
                fallback: "scanned the whole text",
            }
            .to_string(),
        );
        return lines.raw.iter().find_map(|line| capture_party(pattern, line));
    };

    // Data may share the anchor line ("EMPRESA: ACME SL CIF B12345678").
    let found = capture_party(pattern, lines.raw[at]).or_else(|| {
        lines
            .next_non_blank(at)
            .and_then(|next| capture_party(pattern, lines.raw[next]))
    });
    if found.is_none() {
        warnings.push(format!(
            "{anchor_name} block at line {} does not carry a name and id",
            at + 1
        ));
    }
    found
}

fn capture_party(pattern: &Regex, line: &str) -> Option<(String, String)> {
    let caps = pattern.captures(line)?;
    let name = caps["name"]
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches([',', ';'])
        .to_string();
    let id = caps["id"].replace('-', "").to_uppercase();
    Some((name, id))
}

// ── Period ──────────────────────────────────────────────────────────────

fn period(lines: &Lines<'_>, warnings: &mut Vec<String>) -> Period {
    let found = (0..lines.len()).find_map(|i| {
        let line = &lines.folded[i];
        PERIOD_WORDS
            .captures(line)
            .or_else(|| PERIOD_SLASHED.captures(line))
            .map(|caps| (i, resolve_period(&caps), caps.get(0).map_or(0, |m| m.end())))
    });

    let Some((at, bounds, tail_from)) = found else {
        warnings.push(
            ExtractError::MissingAnchor {
                anchor: "DEL .. AL ..",
                fallback: "period left unset",
            }
            .to_string(),
        );
        return Period::default();
    };

    let declared = declared_days(lines, at, tail_from);
    let mut period = match bounds {
        Ok((start, end)) => Period {
            start: Some(start),
            end: Some(end),
            days: declared,
        },
        Err(message) => {
            warnings.push(message);
            return Period::default();
        }
    };

    if let Some(message) = period.enforce_day_count() {
        warnings.push(message);
    }
    period
}

fn resolve_period(caps: &Captures<'_>) -> Result<(NaiveDate, NaiveDate), String> {
    let number = |key: &str| caps.name(key).and_then(|m| m.as_str().parse::<u32>().ok());
    let month = |key: &str| caps.name(key).and_then(|m| month_number(m.as_str()));

    let (Some(d1), Some(m1), Some(d2), Some(m2)) = (number("d1"), month("m1"), number("d2"), month("m2"))
    else {
        return Err(format!("unrecognised period phrase {:?}", &caps[0]));
    };
    let Some(y2) = caps.name("y2").and_then(|m| m.as_str().parse::<i32>().ok()) else {
        return Err(format!("unrecognised period phrase {:?}", &caps[0]));
    };
    // A start month after the end month means the period spans new year.
    let y1 = match caps.name("y1").and_then(|m| m.as_str().parse::<i32>().ok()) {
        Some(y) => y,
        None if m1 > m2 => y2 - 1,
        None => y2,
    };

    let start = NaiveDate::from_ymd_opt(y1, m1, d1)
        .ok_or_else(|| format!("invalid period start {d1:02}/{m1:02}/{y1}"))?;
    let end = NaiveDate::from_ymd_opt(y2, m2, d2)
        .ok_or_else(|| format!("invalid period end {d2:02}/{m2:02}/{y2}"))?;
    if start > end {
        return Err(format!("period start {start} is after period end {end}"));
    }
    Ok((start, end))
}

fn month_number(token: &str) -> Option<u32> {
    if let Ok(n) = token.parse::<u32>() {
        return Some(n);
    }
    let n = match token {
        "ENERO" => 1,
        "FEBRERO" => 2,
        "MARZO" => 3,
        "ABRIL" => 4,
        "MAYO" => 5,
        "JUNIO" => 6,
        "JULIO" => 7,
        "AGOSTO" => 8,
        "SEPTIEMBRE" | "SETIEMBRE" => 9,
        "OCTUBRE" => 10,
        "NOVIEMBRE" => 11,
        "DICIEMBRE" => 12,
        _ => return None,
    };
    Some(n)
}

/// Day count declared after the period phrase or on the two following lines.
fn declared_days(lines: &Lines<'_>, at: usize, tail_from: usize) -> Option<u32> {
    let tail = lines.folded[at].get(tail_from..).unwrap_or_default();
    std::iter::once(tail)
        .chain(lines.folded.iter().skip(at + 1).take(2).map(String::as_str))
        .find_map(|line| {
            let caps = DECLARED_DAYS.captures(line)?;
            caps.name("a")
                .or_else(|| caps.name("b"))
                .and_then(|m| m.as_str().parse().ok())
        })
}

// ── Document date ───────────────────────────────────────────────────────

fn document_date(lines: &Lines<'_>, warnings: &mut Vec<String>) -> Option<NaiveDate> {
    let caps = lines.folded.iter().find_map(|line| DOCUMENT_DATE.captures(line))?;
    let part = |key: &str| caps[key].parse::<u32>().ok();
    let year = caps["y"].parse::<i32>().ok();

    let date = match (year, part("m"), part("d")) {
        (Some(y), Some(m), Some(d)) => NaiveDate::from_ymd_opt(y, m, d),
        _ => None,
    };
    if date.is_none() {
        warnings.push(format!("invalid document date {:?}", &caps[0]));
    }
    date
}
