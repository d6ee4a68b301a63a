//! Extraction run: reads text files, splits them into parts, extracts every
//! part concurrently.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use futures::future::join_all;
use payslip_core::CandidateRecord;
use payslip_extract::Extractor;
use payslip_fallback::FallbackClient;

/// Page separator emitted by common text extractors.
const PART_SEPARATOR: char = '\x0c';

pub struct ExtractStats {
    pub files: usize,
    pub parts: usize,
    pub warnings: usize,
    pub elapsed_secs: f64,
}

impl ExtractStats {
    pub fn report(&self) {
        eprintln!(
            "  Extracted {} parts from {} files in {:.2}s ({} warnings)",
            self.parts, self.files, self.elapsed_secs, self.warnings
        );
    }
}

/// Read every file and extract one candidate record per part.
pub async fn extract_files(
    extractor: &Extractor,
    fallback: Option<&FallbackClient>,
    files: &[PathBuf],
) -> anyhow::Result<(Vec<CandidateRecord>, ExtractStats)> {
    let start = Instant::now();

    let mut parts = Vec::new();
    for path in files {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        parts.extend(split_parts(&source_label(path), &text));
    }
    tracing::info!(files = files.len(), parts = parts.len(), "extracting parts");

    let records: Vec<CandidateRecord> = join_all(parts.iter().map(|(id, text)| async move {
        match fallback {
            Some(hook) => extractor.extract_with_fallback(id, text, hook).await,
            None => extractor.extract(id, text),
        }
    }))
    .await;

    let stats = ExtractStats {
        files: files.len(),
        parts: records.len(),
        warnings: records.iter().map(|r| r.warnings.len()).sum(),
        elapsed_secs: start.elapsed().as_secs_f64(),
    };
    Ok((records, stats))
}

fn source_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Split `text` on form feeds. Blank parts are dropped; a file with several
/// parts labels them `label#1`, `label#2`, ...
fn split_parts(label: &str, text: &str) -> Vec<(String, String)> {
    let pages: Vec<&str> = text
        .split(PART_SEPARATOR)
        .filter(|p| !p.trim().is_empty())
        .collect();
    if pages.len() <= 1 {
        return vec![(label.to_string(), pages.first().copied().unwrap_or(text).to_string())];
    }
    pages
        .into_iter()
        .enumerate()
        .map(|(i, page)| (format!("{label}#{}", i + 1), page.to_string()))
        .collect()
}
