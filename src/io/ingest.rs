//! CSV ingest for the cleaned input tables.
//!
//! Every table is a headered CSV. Headers are matched case-insensitively (a UTF-8 BOM on
//! the first header is stripped), required columns are checked before any row is read,
//! and rows are deserialized with serde in file order. Row order matters: it feeds the
//! seeded stages, so the same file always reproduces the same population.
//!
//! - missing file / unreadable row: exit code 2
//! - missing required column: `MissingData` (exit code 3)

use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use csv::StringRecord;
use serde::de::DeserializeOwned;

use crate::domain::{ObservedRevenue, RegionShare, StatRow, TaxpayerTarget};
use crate::error::AppError;
use crate::tax::policy::normalize_region;

pub const STAT_COLUMNS: [&str; 4] = ["category", "element", "statistic", "value"];
pub const SHARE_COLUMNS: [&str; 2] = ["region", "share"];
pub const REVENUE_COLUMNS: [&str; 2] = ["region", "total_revenue"];
pub const TARGET_COLUMNS: [&str; 2] = ["region", "taxpayers"];

fn normalize_header_name(name: &str) -> String {
    name.trim().trim_start_matches('\u{feff}').trim().to_lowercase()
}

/// Read a whole table into `T`, checking `required` columns first.
pub fn read_table<T: DeserializeOwned>(path: &Path, label: &str, required: &[&str]) -> Result<Vec<T>, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open {label} CSV '{}': {e}", path.display())))?;

    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(file);

    let headers: StringRecord = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read {label} CSV headers: {e}")))?
        .iter()
        .map(normalize_header_name)
        .collect();

    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|col| !headers.iter().any(|h| h == *col))
        .collect();
    if !missing.is_empty() {
        return Err(AppError::missing_data(format!(
            "{label} CSV '{}' is missing required column(s): {}",
            path.display(),
            missing.join(", ")
        )));
    }
    reader.set_headers(headers);

    let mut rows = Vec::new();
    for (idx, record) in reader.deserialize::<T>().enumerate() {
        // +2: header line, 1-based lines.
        let line = idx + 2;
        let row = record.map_err(|e| AppError::new(2, format!("{label} CSV line {line}: {e}")))?;
        rows.push(row);
    }
    tracing::debug!(table = label, rows = rows.len(), path = %path.display(), "loaded table");
    Ok(rows)
}

/// Long-format statistics table `{category, element, statistic, value}`.
pub fn read_stat_rows(path: &Path) -> Result<Vec<StatRow>, AppError> {
    let rows: Vec<StatRow> = read_table(path, "statistics", &STAT_COLUMNS)?;
    if rows.is_empty() {
        return Err(AppError::missing_data(format!(
            "Statistics CSV '{}' has no rows.",
            path.display()
        )));
    }
    Ok(rows)
}

/// Region population shares; region codes are normalized.
pub fn read_region_shares(path: &Path) -> Result<Vec<RegionShare>, AppError> {
    let mut rows: Vec<RegionShare> = read_table(path, "region shares", &SHARE_COLUMNS)?;
    if rows.is_empty() {
        return Err(AppError::missing_data(format!(
            "Region shares CSV '{}' has no rows.",
            path.display()
        )));
    }
    for r in &mut rows {
        r.region = normalize_region(&r.region);
    }
    Ok(rows)
}

/// Observed revenue by region; may be empty (every gap is then NA).
pub fn read_observed_revenue(path: &Path) -> Result<Vec<ObservedRevenue>, AppError> {
    let mut rows: Vec<ObservedRevenue> = read_table(path, "observed revenue", &REVENUE_COLUMNS)?;
    for r in &mut rows {
        r.region = normalize_region(&r.region);
    }
    Ok(rows)
}

/// Taxpayer targets keyed by normalized region. Duplicate regions are summed.
pub fn read_taxpayer_targets(path: &Path) -> Result<BTreeMap<String, f64>, AppError> {
    let rows: Vec<TaxpayerTarget> = read_table(path, "taxpayer targets", &TARGET_COLUMNS)?;
    let mut out = BTreeMap::new();
    for r in rows {
        *out.entry(normalize_region(&r.region)).or_insert(0.0) += r.taxpayers;
    }
    Ok(out)
}
