//! Vertical card display for canonical payslip records.

use std::fmt::Display;

use payslip_core::{CanonicalRecord, EmployerContribution, LineItem, render_amount};

const MAX_LIST_ITEMS: usize = 20;

// ── Public API ──

/// Print one canonical record as a card grouped by section.
pub fn print_payslip_card(canonical: &CanonicalRecord) {
    let r = &canonical.record;
    let worker = r.worker.full_name.as_deref().unwrap_or("(unknown worker)");

    println!("=== {worker} ===");
    if let (Some(start), Some(end)) = (r.period.start, r.period.end) {
        println!("{start} .. {end}");
    }
    println!();

    print_section(
        "Identity",
        &[
            ("source", Some(r.source_id.clone())),
            ("template", Some(r.template_id.to_string())),
            ("source_count", Some(canonical.source_count.to_string())),
            (
                "merged_from",
                canonical.is_merged.then(|| canonical.merged_from.join(", ")),
            ),
        ],
    );
    print_section(
        "Company",
        &[
            ("legal_name", r.company.legal_name.clone()),
            ("tax_id", r.company.tax_id.clone()),
        ],
    );
    print_section(
        "Worker",
        &[
            ("full_name", r.worker.full_name.clone()),
            ("national_id", r.worker.national_id.clone()),
        ],
    );
    print_section(
        "Period",
        &[
            ("start", text(r.period.start)),
            ("end", text(r.period.end)),
            ("days", text(r.period.days)),
            ("document_date", text(r.document_date)),
            ("contribution_base", r.contribution_base.map(render_amount)),
        ],
    );

    print_items("Earnings", &r.earning_items);
    print_items("Deductions", &r.deduction_items);
    print_contributions(&r.employer_contributions);

    print_section(
        "Totals",
        &[
            ("gross", r.totals.gross.map(render_amount)),
            ("deductions", r.totals.deductions.map(render_amount)),
            ("net", r.totals.net.map(render_amount)),
            ("employer_total", r.totals.employer_total.map(render_amount)),
        ],
    );

    if !r.warnings.is_empty() {
        println!("Warnings");
        for warning in &r.warnings {
            println!("  - {warning}");
        }
        println!();
    }
}

// ── Section rendering ──

fn text<T: Display>(value: Option<T>) -> Option<String> {
    value.map(|v| v.to_string())
}

fn print_section(header: &str, rows: &[(&str, Option<String>)]) {
    if rows.iter().all(|(_, v)| v.is_none()) {
        return;
    }
    println!("{header}");
    for (label, value) in rows {
        if let Some(value) = value {
            println!("  {:<26} {}", label, value);
        }
    }
    println!();
}

fn print_items(header: &str, items: &[LineItem]) {
    if items.is_empty() {
        return;
    }
    println!("{header}");
    for item in items.iter().take(MAX_LIST_ITEMS) {
        println!("  {:<26} {:>12}", item.concept, render_amount(item.amount));
    }
    print_overflow(items.len());
    println!();
}

fn print_contributions(contributions: &[EmployerContribution]) {
    if contributions.is_empty() {
        return;
    }
    println!("Employer Contributions");
    for c in contributions.iter().take(MAX_LIST_ITEMS) {
        let base = c.base.map(render_amount).unwrap_or_default();
        let rate = c
            .rate
            .map(|r| format!("{} %", render_amount(r)))
            .unwrap_or_default();
        println!(
            "  {:<26} {:>12} {:>8} {:>12}",
            c.concept,
            base,
            rate,
            render_amount(c.amount)
        );
    }
    print_overflow(contributions.len());
    println!();
}

fn print_overflow(total: usize) {
    if total > MAX_LIST_ITEMS {
        println!("  ... and {} more", total - MAX_LIST_ITEMS);
    }
}
