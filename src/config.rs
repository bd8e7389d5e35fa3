use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::analysis::AnalysisOptions;
use crate::error::{ArError, Result};
use crate::filter::{AccountFilter, Selection};

/// Exploratory analysis of pending hospital billing accounts
#[derive(Debug, Parser)]
#[command(name = "arlens", version)]
pub struct Cli {
    /// Enable detailed logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load an export, apply filters and print every report
    Analyze(AnalyzeArgs),
    /// Write a synthetic CSV export for trying the tool out
    Generate(GenerateArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Debug, Clone, Args)]
pub struct AnalyzeArgs {
    /// CSV (or JSONL) export of pending accounts
    pub file: PathBuf,

    /// Reference date for aging, YYYY-MM-DD or DD/MM/YYYY (default: today)
    #[arg(long)]
    pub as_of: Option<String>,

    /// First entry date to include
    #[arg(long)]
    pub from: Option<String>,

    /// Last entry date to include
    #[arg(long)]
    pub to: Option<String>,

    /// Keep only these payers (repeatable; default: all)
    #[arg(long = "payer")]
    pub payers: Vec<String>,

    /// Keep only these physicians (repeatable; default: all)
    #[arg(long = "physician")]
    pub physicians: Vec<String>,

    /// Keep only these statuses (repeatable; default: all)
    #[arg(long = "status")]
    pub statuses: Vec<String>,

    /// Keep only these sectors (repeatable; default: all)
    #[arg(long = "sector")]
    pub sectors: Vec<String>,

    /// Days pending after which a sector counts as a bottleneck
    #[arg(long, default_value_t = 90)]
    pub threshold_days: i64,

    /// Rows shown in ranked tables and oldest-account listings
    #[arg(long, default_value_t = 20)]
    pub top: usize,

    /// Histogram bins for the amount distribution
    #[arg(long, default_value_t = 50)]
    pub bins: usize,

    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Args)]
pub struct GenerateArgs {
    /// Destination CSV file
    pub path: PathBuf,

    /// Number of accounts to generate
    #[arg(short = 'n', long, default_value_t = 500)]
    pub count: usize,

    /// Reference date the entry dates are spread back from (default: today)
    #[arg(long)]
    pub as_of: Option<String>,
}

/// Parse a CLI date in ISO or Brazilian day-first form.
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%d/%m/%Y"))
        .map_err(|_| ArError::InvalidDate(raw.to_string()))
}

/// Resolve an optional date argument, falling back to `default`.
pub fn date_or(raw: Option<&str>, default: NaiveDate) -> Result<NaiveDate> {
    raw.map(parse_date).transpose().map(|date| date.unwrap_or(default))
}

impl AnalyzeArgs {
    pub fn account_filter(&self) -> Result<AccountFilter> {
        Ok(AccountFilter {
            entry_from: self.from.as_deref().map(parse_date).transpose()?,
            entry_to: self.to.as_deref().map(parse_date).transpose()?,
            payers: Selection::from_values(self.payers.clone()),
            physicians: Selection::from_values(self.physicians.clone()),
            statuses: Selection::from_values(self.statuses.clone()),
            sectors: Selection::from_values(self.sectors.clone()),
        })
    }

    pub fn analysis_options(&self, as_of: NaiveDate) -> AnalysisOptions {
        AnalysisOptions {
            as_of,
            threshold_days: self.threshold_days,
            oldest_limit: self.top,
            histogram_bins: self.bins,
        }
    }
}
