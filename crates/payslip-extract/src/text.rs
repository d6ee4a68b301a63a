//! Line-oriented helpers shared by the extractors.

use payslip_core::fold_upper;
use regex::Regex;

/// Source lines paired with their folded form (uppercase, accents folded)
/// so anchor phrases match regardless of case and accents.
pub(crate) struct Lines<'a> {
    pub raw: Vec<&'a str>,
    pub folded: Vec<String>,
}

impl<'a> Lines<'a> {
    pub fn new(text: &'a str) -> Self {
        let raw: Vec<&str> = text.lines().collect();
        let folded = raw.iter().map(|l| fold_upper(l)).collect();
        Self { raw, folded }
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    /// First line at or after `from` whose folded form contains any anchor.
    pub fn find_any(&self, anchors: &[&str], from: usize) -> Option<usize> {
        (from..self.len()).find(|&i| anchors.iter().any(|a| self.folded[i].contains(a)))
    }

    /// First line at or after `from` whose folded form matches `re`.
    pub fn find_matching(&self, re: &Regex, from: usize) -> Option<usize> {
        (from..self.len()).find(|&i| re.is_match(&self.folded[i]))
    }

    pub fn next_non_blank(&self, after: usize) -> Option<usize> {
        (after + 1..self.len()).find(|&i| !self.raw[i].trim().is_empty())
    }
}

/// Collapse runs of whitespace into single spaces and trim.
pub(crate) fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchors_match_folded_lines() {
        let lines = Lines::new("Nómina\nAportación de la empresa\nFin");
        assert_eq!(lines.find_any(&["APORTACION DE LA EMPRESA"], 0), Some(1));
        assert_eq!(lines.find_any(&["APORTACION DE LA EMPRESA"], 2), None);
    }

    #[test]
    fn next_non_blank_skips_empty_lines() {
        let lines = Lines::new("EMPRESA\n\n   \nACME SL\n");
        assert_eq!(lines.next_non_blank(0), Some(3));
        assert_eq!(lines.next_non_blank(3), None);
    }

    #[test]
    fn collapse() {
        assert_eq!(collapse_whitespace("  SALARIO   BASE \t"), "SALARIO BASE");
    }
}
