//! Diagnostics and formatted terminal output.
//!
//! We keep formatting code in `format` so the pipeline stays free of presentation
//! details and output changes are localized.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::calibrate::{ReweightReport, TailReport, TaxpayerScaling};
use crate::domain::{ObservedRevenue, SimulationResult};
use crate::tax::policy::TaxPolicy;

pub mod diagnostics;
pub mod format;
pub mod inequality;

pub use diagnostics::*;
pub use format::*;
pub use inequality::*;

/// Everything a run reports besides the per-unit table.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiagnosticsSummary {
    pub master_seed: u64,
    pub households: usize,
    pub units: usize,
    /// Regions taxed under the default profile.
    pub fallback_regions: Vec<String>,
    pub reweight: Option<ReweightReport>,
    pub tail: Option<TailReport>,
    pub region_scaling: BTreeMap<String, f64>,
    pub taxpayer_scaling: Vec<TaxpayerScaling>,
    pub tax: TaxDiagnostics,
    pub erosion: ErosionSummary,
    pub inequality: InequalityStats,
    pub revenue: Vec<RevenueRow>,
    pub regions: Vec<RegionPolicyRow>,
}

impl DiagnosticsSummary {
    /// Fill the result-derived sections from final (calibrated) results.
    pub fn with_results(mut self, results: &[SimulationResult], observed: &[ObservedRevenue], policy: &TaxPolicy) -> Self {
        self.units = results.len();
        self.tax = tax_diagnostics(results);
        self.erosion = erosion_summary(results);
        self.inequality = inequality_stats(results);
        self.revenue = compare_revenue(results, observed);
        self.regions = region_policy_summary(results, policy);
        self
    }
}
