use std::collections::{HashMap, HashSet};
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::error::{ArError, Result};
use crate::schema::{BillingAccount, columns};

/// Cells that were present but could not be coerced, plus skipped JSONL lines.
///
/// `latin1_fallback` is set when a CSV export was not valid UTF-8 and was
/// decoded as Latin-1 instead.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CoercionReport {
    pub non_numeric_amounts: usize,
    pub unparseable_dates: usize,
    pub skipped_lines: usize,
    pub latin1_fallback: bool,
}

/// Result of loading one spreadsheet export.
///
/// Missing columns are reported, not fatal: every account simply carries
/// `None` for the absent fields.
#[derive(Debug, Clone, Default)]
pub struct LoadedDataset {
    pub accounts: Vec<BillingAccount>,
    pub missing_columns: Vec<String>,
    pub coercion: CoercionReport,
}

const DATETIME_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%d/%m/%Y"];

/// Load a dataset from disk, picking the parser from the file extension.
///
/// `.csv` / `.txt` go through the CSV parser, `.jsonl` / `.ndjson` are read
/// line by line with one JSON object per line.
pub async fn load_dataset(path: &Path) -> Result<LoadedDataset> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();

    let dataset = match extension.as_str() {
        "csv" | "txt" => {
            let bytes = tokio::fs::read(path)
                .await
                .map_err(|source| ArError::FileRead {
                    path: path.to_path_buf(),
                    source,
                })?;
            parse_csv_bytes(&bytes)?
        }
        "jsonl" | "ndjson" => stream_jsonl(path).await?,
        "xlsx" | "xls" => {
            return Err(ArError::UnsupportedFormat(format!(
                "{extension} (export the first sheet as CSV)"
            )));
        }
        other => return Err(ArError::UnsupportedFormat(other.to_string())),
    };

    tracing::info!(
        path = %path.display(),
        rows = dataset.accounts.len(),
        "Loaded dataset"
    );
    if !dataset.missing_columns.is_empty() {
        tracing::warn!(
            missing = ?dataset.missing_columns,
            "Dataset is missing columns; continuing with the available ones"
        );
    }
    if dataset.coercion != CoercionReport::default() {
        tracing::warn!(
            non_numeric_amounts = dataset.coercion.non_numeric_amounts,
            unparseable_dates = dataset.coercion.unparseable_dates,
            skipped_lines = dataset.coercion.skipped_lines,
            latin1_fallback = dataset.coercion.latin1_fallback,
            "Some cells could not be coerced and were treated as empty"
        );
    }

    Ok(dataset)
}

/// Parse a CSV export from raw bytes.
///
/// UTF-8 is tried first. Spreadsheet exports saved as Windows-1252 are not
/// valid UTF-8; those are decoded as Latin-1 so accented labels survive.
pub fn parse_csv_bytes(bytes: &[u8]) -> Result<LoadedDataset> {
    match std::str::from_utf8(bytes) {
        Ok(content) => parse_csv(content),
        Err(err) => {
            tracing::warn!(
                offset = err.valid_up_to(),
                "CSV export is not valid UTF-8; decoding as Latin-1"
            );
            let content: String = bytes.iter().map(|&byte| char::from(byte)).collect();
            let mut dataset = parse_csv(&content)?;
            dataset.coercion.latin1_fallback = true;
            Ok(dataset)
        }
    }
}

/// Parse a CSV export with a header row. The delimiter (`,` or `;`) is
/// detected from the header line.
pub fn parse_csv(content: &str) -> Result<LoadedDataset> {
    let content = content.trim_start_matches('\u{feff}');
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .delimiter(detect_delimiter(content))
        .from_reader(content.as_bytes());

    let headers = reader
        .headers()?
        .iter()
        .map(|name| name.trim().to_string())
        .collect::<Vec<String>>();

    let index_by_name = headers
        .iter()
        .enumerate()
        .map(|(index, name)| (name.as_str(), index))
        .collect::<HashMap<&str, usize>>();

    let mut dataset = LoadedDataset {
        missing_columns: missing_columns(|label| index_by_name.contains_key(label)),
        ..LoadedDataset::default()
    };

    for record in reader.records() {
        let record = record?;
        let account = account_from_fields(
            |label| {
                let index = index_by_name.get(label)?;
                record.get(*index).map(|value| value.to_string())
            },
            &mut dataset.coercion,
        );
        dataset.accounts.push(account);
    }

    Ok(dataset)
}

async fn stream_jsonl(path: &Path) -> Result<LoadedDataset> {
    let file = File::open(path).await.map_err(|source| ArError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let mut segments = BufReader::new(file).split(b'\n');

    let mut dataset = LoadedDataset::default();
    let mut seen_columns: HashSet<String> = HashSet::new();
    let mut line_number = 0;

    while let Some(bytes) = segments.next_segment().await? {
        line_number += 1;
        let line = match String::from_utf8(bytes) {
            Ok(line) => line,
            Err(_) => {
                tracing::warn!(line = line_number, "Account line is not valid UTF-8; skipped");
                dataset.coercion.skipped_lines += 1;
                continue;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match parse_jsonl_line(line.trim_end_matches('\r'), line_number) {
            Ok(object) => {
                seen_columns.extend(object.keys().cloned());
                let account = account_from_fields(
                    |label| object.get(label).and_then(cell_text),
                    &mut dataset.coercion,
                );
                dataset.accounts.push(account);
            }
            Err(err) => {
                tracing::warn!("Invalid account line skipped: {}", err);
                dataset.coercion.skipped_lines += 1;
            }
        }
    }

    dataset.missing_columns = missing_columns(|label| seen_columns.contains(label));
    Ok(dataset)
}

fn parse_jsonl_line(line: &str, line_number: usize) -> Result<Map<String, Value>> {
    let value = serde_json::from_str::<Value>(line).map_err(|source| ArError::JsonLine {
        line: line_number,
        source,
    })?;
    match value {
        Value::Object(object) => Ok(object),
        _ => Err(ArError::JsonLine {
            line: line_number,
            source: serde::de::Error::custom("expected a JSON object"),
        }),
    }
}

fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        other => Some(other.to_string()),
    }
}

fn missing_columns(has_column: impl Fn(&str) -> bool) -> Vec<String> {
    columns::REQUIRED
        .iter()
        .filter(|label| !has_column(label))
        .map(|label| label.to_string())
        .collect()
}

fn detect_delimiter(content: &str) -> u8 {
    let header = content.lines().next().unwrap_or_default();
    if header.matches(';').count() > header.matches(',').count() {
        b';'
    } else {
        b','
    }
}

fn account_from_fields(
    get: impl Fn(&str) -> Option<String>,
    report: &mut CoercionReport,
) -> BillingAccount {
    let text = |label: &str| {
        get(label)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    };

    let account_id = text(columns::ACCOUNT);

    let amount = text(columns::AMOUNT).and_then(|raw| {
        let parsed = parse_amount(&raw);
        if parsed.is_none() {
            report.non_numeric_amounts += 1;
            tracing::debug!(
                account = account_id.as_deref().unwrap_or("-"),
                raw = %raw,
                "Treating non-numeric amount as empty"
            );
        }
        parsed
    });

    let mut date = |label: &str| {
        text(label).and_then(|raw| {
            let parsed = parse_timestamp(&raw);
            if parsed.is_none() {
                report.unparseable_dates += 1;
                tracing::debug!(
                    account = account_id.as_deref().unwrap_or("-"),
                    column = label,
                    raw = %raw,
                    "Treating unparseable date as empty"
                );
            }
            parsed
        })
    };
    let entry_date = date(columns::ENTRY_DATE);
    let discharge_date = date(columns::DISCHARGE_DATE);

    BillingAccount {
        attendance_id: text(columns::ATTENDANCE),
        status: text(columns::STATUS),
        attendance_type: text(columns::ATTENDANCE_TYPE),
        attendance_status: text(columns::ATTENDANCE_STATUS),
        payer: text(columns::PAYER),
        category: text(columns::CATEGORY),
        amount,
        previous_stage: text(columns::PREVIOUS_STAGE),
        sector: text(columns::SECTOR),
        attendance_sector: text(columns::ATTENDANCE_SECTOR),
        establishment: text(columns::ESTABLISHMENT),
        entry_date,
        physician: text(columns::PHYSICIAN),
        discharge_date,
        account_id,
    }
}

/// Coerce a currency cell to a number.
///
/// Accepts an optional `R$` prefix and both `1.234,56` and `1,234.56`
/// grouping; the right-most separator is taken as the decimal point.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .trim_start_matches("R$")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let normalized = match (cleaned.rfind(','), cleaned.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => cleaned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (Some(_), None) if cleaned.matches(',').count() == 1 => cleaned.replace(',', "."),
        (Some(_), None) => cleaned.replace(',', ""),
        (None, Some(_)) if cleaned.matches('.').count() > 1 => cleaned.replace('.', ""),
        _ => cleaned,
    };

    normalized.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Coerce a date cell. Date-only values land at midnight.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    for format in DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(ts);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(day) = NaiveDate::parse_from_str(raw, format) {
            return day.and_hms_opt(0, 0, 0);
        }
    }
    None
}
