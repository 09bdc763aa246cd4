//! JSON diagnostics summary.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::domain::SimConfig;
use crate::error::AppError;
use crate::report::DiagnosticsSummary;

#[derive(Debug, Serialize)]
struct SummaryFile<'a> {
    generated_at: String,
    tool: &'static str,
    version: &'static str,
    config: &'a SimConfig,
    diagnostics: &'a DiagnosticsSummary,
}

/// Write the diagnostics summary together with the effective configuration.
pub fn write_summary_json(path: &Path, summary: &DiagnosticsSummary, config: &SimConfig) -> Result<(), AppError> {
    let payload = SummaryFile {
        generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        tool: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        config,
        diagnostics: summary,
    };

    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create summary JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(BufWriter::new(file), &payload)
        .map_err(|e| AppError::new(2, format!("Failed to write summary JSON: {e}")))?;
    tracing::info!(path = %path.display(), "wrote diagnostics summary");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_json_has_timestamp_and_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");
        let summary = DiagnosticsSummary {
            master_seed: 7,
            households: 3,
            ..DiagnosticsSummary::default()
        };
        write_summary_json(&path, &summary, &SimConfig::default()).unwrap();

        let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(value["generated_at"].as_str().unwrap().ends_with('Z'));
        assert_eq!(value["diagnostics"]["master_seed"], 7);
        assert_eq!(value["diagnostics"]["households"], 3);
        assert!(value["diagnostics"]["reweight"].is_null());
        assert_eq!(value["config"]["seeds"]["master"], 42);
    }

    #[test]
    fn embedded_config_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");
        let config = SimConfig::default();
        write_summary_json(&path, &DiagnosticsSummary::default(), &config).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains(r#""upper": "inf""#));
        assert!(!text.contains(r#""upper": null"#));

        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        let back: SimConfig = serde_json::from_value(value["config"].clone()).unwrap();
        assert_eq!(back.policy.regions.len(), config.policy.regions.len());
        for (read, written) in back.policy.regions.iter().zip(&config.policy.regions) {
            assert_eq!(read.brackets.len(), written.brackets.len());
            for (a, b) in read.brackets.iter().zip(&written.brackets) {
                assert!((a.rate - b.rate).abs() < 1e-12);
                assert!(a.upper == b.upper || ((a.upper - b.upper) / b.upper).abs() < 1e-12);
            }
        }
        assert_eq!(back.policy.income_schedule.last().map(|b| b.upper), Some(f64::INFINITY));
        back.validate().unwrap();
        crate::tax::policy::TaxPolicy::from_config(&back.policy).unwrap();
    }
}
