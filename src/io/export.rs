//! Export run outputs to CSV.
//!
//! The exports are meant to be easy to consume in spreadsheets or downstream scripts.
//! Undefined (NA) values are written as empty fields.

use std::fs::File;
use std::path::Path;

use serde::Serialize;

use crate::domain::SimulationResult;
use crate::error::AppError;
use crate::report::{RegionPolicyRow, RevenueRow};

/// Write any serializable row type as a headered CSV.
pub fn write_rows_csv<T: Serialize>(path: &Path, label: &str, rows: &[T]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create {label} CSV '{}': {e}", path.display())))?;
    let mut writer = csv::Writer::from_writer(file);
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| AppError::new(2, format!("Failed to write {label} CSV row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush {label} CSV '{}': {e}", path.display())))?;
    tracing::info!(path = %path.display(), rows = rows.len(), "wrote {label} CSV");
    Ok(())
}

/// One row per tax unit, in unit order.
pub fn write_results_csv(path: &Path, results: &[SimulationResult]) -> Result<(), AppError> {
    write_rows_csv(path, "unit results", results)
}

pub fn write_region_summary_csv(path: &Path, rows: &[RegionPolicyRow]) -> Result<(), AppError> {
    write_rows_csv(path, "region summary", rows)
}

pub fn write_revenue_csv(path: &Path, rows: &[RevenueRow]) -> Result<(), AppError> {
    write_rows_csv(path, "revenue comparison", rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibrate::taxpayers::tests::result;

    #[test]
    fn results_csv_has_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("units.csv");
        let mut r = result("galicia", true, 2.5);
        r.wealth_tax = 1_234.5;
        write_results_csv(&path, &[r, result("madrid", false, 1.0)]).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("unit_id,household_id,unit_index,region"));
        assert!(lines[0].contains("final_weight"));
        assert!(lines[1].contains("galicia"));
        assert!(lines[1].contains("1234.5"));
    }

    #[test]
    fn na_is_an_empty_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("revenue.csv");
        let rows = vec![RevenueRow {
            region: "asturias".to_string(),
            simulated_revenue: 10.0,
            observed_revenue: 0.0,
            gap_pct: None,
        }];
        write_revenue_csv(&path, &rows).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "region,simulated_revenue,observed_revenue,gap_pct\nasturias,10.0,0.0,\n");
    }

    #[test]
    fn unwritable_path_is_exit_code_two() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.csv");
        let err = write_region_summary_csv(&path, &[]).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
