//! Line-item fingerprints and first-seen deduplication.

use std::collections::HashSet;
use std::hash::Hash;

use payslip_core::{Category, EmployerContribution, LineItem, concept_key, round2};
use rust_decimal::Decimal;

/// Identity of a line item across parts of the same payslip.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    pub category: Category,
    pub raw_concept: String,
    pub concept: String,
    pub amount: Decimal,
}

impl Fingerprint {
    pub fn new(category: Category, raw_concept: &str, concept: &str, amount: Decimal) -> Self {
        Self {
            category,
            raw_concept: concept_key(raw_concept),
            concept: concept_key(concept),
            amount: round2(amount).normalize(),
        }
    }

    pub fn of_item(category: Category, item: &LineItem) -> Self {
        Self::new(category, &item.raw_concept, &item.concept, item.amount)
    }

    pub fn of_contribution(contribution: &EmployerContribution) -> Self {
        Self::new(
            Category::EmployerContribution,
            &contribution.concept,
            &contribution.concept,
            contribution.amount,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deduped<T> {
    pub kept: Vec<T>,
    pub removed: usize,
}

/// Keep the first item per key, preserving input order.
pub fn dedup_by<T, K, F>(items: impl IntoIterator<Item = T>, key: F) -> Deduped<T>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let (kept, _, removed) = items.into_iter().fold(
        (Vec::new(), HashSet::new(), 0),
        |(mut kept, mut seen, removed), item| {
            if seen.insert(key(&item)) {
                kept.push(item);
                (kept, seen, removed)
            } else {
                (kept, seen, removed + 1)
            }
        },
    );
    Deduped { kept, removed }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn item(raw: &str, concept: &str, amount: &str) -> LineItem {
        LineItem {
            concept: concept.into(),
            raw_concept: raw.into(),
            amount: Decimal::from_str(amount).unwrap(),
        }
    }

    fn earnings(items: Vec<LineItem>) -> Deduped<LineItem> {
        dedup_by(items, |i| Fingerprint::of_item(Category::Earning, i))
    }

    #[test]
    fn formatting_differences_collapse() {
        let out = earnings(vec![
            item("SALARIO BASE", "Salario base", "1200.00"),
            item("Salario  base", "Salario base", "1200"),
            item("SALARIO BASE", "Salario base", "1200.001"),
        ]);
        assert_eq!(out.kept.len(), 1);
        assert_eq!(out.removed, 2);
    }

    #[test]
    fn different_amounts_or_raw_text_are_kept() {
        let out = earnings(vec![
            item("SALARIO BASE", "Salario base", "1200.00"),
            item("SALARIO BASE", "Salario base", "600.00"),
            item("SAL. BASE", "Salario base", "1200.00"),
        ]);
        assert_eq!(out.kept.len(), 3);
        assert_eq!(out.removed, 0);
    }

    #[test]
    fn category_is_part_of_identity() {
        let a = Fingerprint::new(Category::Earning, "X", "X", Decimal::ONE);
        let b = Fingerprint::new(Category::Deduction, "X", "X", Decimal::ONE);
        assert_ne!(a, b);
    }

    #[test]
    fn first_seen_wins_and_order_is_stable() {
        let out = earnings(vec![
            item("B", "B", "2.00"),
            item("A", "A", "1.00"),
            item("b", "B", "2.00"),
            item("C", "C", "3.00"),
        ]);
        let raw: Vec<_> = out.kept.iter().map(|i| i.raw_concept.as_str()).collect();
        assert_eq!(raw, vec!["B", "A", "C"]);
    }

    #[test]
    fn idempotent() {
        let once = earnings(vec![
            item("A", "A", "1.00"),
            item("A", "A", "1.00"),
            item("B", "B", "2.00"),
        ]);
        let twice = earnings(once.kept.clone());
        assert_eq!(twice.kept, once.kept);
        assert_eq!(twice.removed, 0);
    }
}
