mod display;
mod run;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use payslip_core::EngineConfig;
use payslip_extract::Extractor;
use payslip_fallback::FallbackClient;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "payslip", version, about = "Extract and merge Spanish payslip records from text")]
struct Cli {
    /// Engine configuration (vocabulary, tolerances) as JSON
    #[arg(long, env = "PAYSLIP_CONFIG", value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Base URL of a secondary extraction service, consulted for incomplete records
    #[arg(long, env = "PAYSLIP_FALLBACK_URL", value_name = "URL", global = true)]
    fallback_url: Option<String>,

    /// Per-request timeout for the fallback service
    #[arg(long, default_value_t = 30, global = true)]
    fallback_timeout_secs: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Extract one candidate record per text part, as JSON
    Extract {
        /// UTF-8 text files; form feeds separate parts within a file
        #[arg(required = true, value_name = "FILE")]
        files: Vec<PathBuf>,

        #[arg(long)]
        pretty: bool,
    },
    /// Extract, then group and merge parts into canonical records
    Merge {
        #[arg(required = true, value_name = "FILE")]
        files: Vec<PathBuf>,

        /// Print human-readable cards instead of JSON
        #[arg(long)]
        card: bool,

        #[arg(long, conflicts_with = "card")]
        pretty: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::info!("payslip v{}", env!("CARGO_PKG_VERSION"));

    let config = match &cli.config {
        Some(path) => EngineConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    let extractor = Extractor::new(config);

    let fallback = match &cli.fallback_url {
        Some(url) => Some(
            FallbackClient::new(url, Duration::from_secs(cli.fallback_timeout_secs))
                .context("building fallback client")?,
        ),
        None => None,
    };

    match cli.command {
        Command::Extract { files, pretty } => {
            let (records, stats) = run::extract_files(&extractor, fallback.as_ref(), &files).await?;
            print_json(&records, pretty)?;
            stats.report();
        }
        Command::Merge {
            files,
            card,
            pretty,
        } => {
            let (records, stats) = run::extract_files(&extractor, fallback.as_ref(), &files).await?;
            let merged = payslip_merge::merge_records(&records).context("merging candidate records")?;
            if card {
                for record in &merged {
                    display::print_payslip_card(record);
                }
            } else {
                print_json(&merged, pretty)?;
            }
            stats.report();
            eprintln!(
                "  Merged {} candidates into {} records",
                records.len(),
                merged.len()
            );
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> anyhow::Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .context("serializing records")?;
    println!("{json}");
    Ok(())
}
