//! Revenue, erosion and regional policy diagnostics.

use std::collections::BTreeMap;

use nalgebra::DVector;
use serde::Serialize;

use crate::domain::{ObservedRevenue, SimulationResult};
use crate::math::weighted_top_share;
use crate::tax::policy::{TaxPolicy, normalize_region};

pub const TOTAL_LABEL: &str = "TOTAL";

/// `100 · num / den`, undefined when `den` is not positive.
pub fn percent(num: f64, den: f64) -> Option<f64> {
    (den > 0.0).then(|| 100.0 * num / den)
}

fn ratio(num: f64, den: f64) -> Option<f64> {
    (den > 0.0).then(|| num / den)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevenueRow {
    pub region: String,
    pub simulated_revenue: f64,
    pub observed_revenue: f64,
    pub gap_pct: Option<f64>,
}

/// Simulated (taxpayer-weighted) vs observed revenue per region, outer-joined, plus a
/// `TOTAL` row. The gap is undefined where observed revenue is zero.
pub fn compare_revenue(results: &[SimulationResult], observed: &[ObservedRevenue]) -> Vec<RevenueRow> {
    let mut table: BTreeMap<String, (f64, f64)> = BTreeMap::new();
    for r in results.iter().filter(|r| r.is_taxpayer) {
        table.entry(r.region.clone()).or_default().0 += r.wealth_tax * r.final_weight;
    }
    for o in observed {
        table.entry(normalize_region(&o.region)).or_default().1 += o.total_revenue;
    }

    let mut rows: Vec<RevenueRow> = table
        .into_iter()
        .map(|(region, (sim, obs))| {
            if !(obs > 0.0) {
                tracing::warn!(region = %region, "no observed revenue, gap undefined");
            }
            RevenueRow {
                region,
                simulated_revenue: sim,
                observed_revenue: obs,
                gap_pct: percent(sim - obs, obs),
            }
        })
        .collect();

    let sim: f64 = rows.iter().map(|r| r.simulated_revenue).sum();
    let obs: f64 = rows.iter().map(|r| r.observed_revenue).sum();
    rows.push(RevenueRow {
        region: TOTAL_LABEL.to_string(),
        simulated_revenue: sim,
        observed_revenue: obs,
        gap_pct: percent(sim - obs, obs),
    });
    rows
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaxDiagnostics {
    /// Σ wealth tax · weight over taxpayers.
    pub total_revenue: f64,
    /// Top-1% share of net wealth among taxpayers.
    pub top1_wealth_share: Option<f64>,
    pub declarants: usize,
    pub weighted_declarants: f64,
    pub capped_units: usize,
    pub dropouts: usize,
    pub migrants: usize,
}

pub fn tax_diagnostics(results: &[SimulationResult]) -> TaxDiagnostics {
    let taxpayers: Vec<&SimulationResult> = results.iter().filter(|r| r.is_taxpayer).collect();
    let n = taxpayers.len();
    let values = DVector::from_iterator(n, taxpayers.iter().map(|r| r.net_wealth));
    let weights = DVector::from_iterator(n, taxpayers.iter().map(|r| r.final_weight));

    TaxDiagnostics {
        total_revenue: taxpayers.iter().map(|r| r.wealth_tax * r.final_weight).sum(),
        top1_wealth_share: weighted_top_share(&values, &weights, 0.01),
        declarants: n,
        weighted_declarants: weights.sum(),
        capped_units: results.iter().filter(|r| r.capped).count(),
        dropouts: results.iter().filter(|r| r.dropout).count(),
        migrants: results.iter().filter(|r| r.migrated).count(),
    }
}

/// Revenue lost to erosion: baseline base vs baseline base eroded by the final factor.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ErosionSummary {
    pub baseline_revenue: f64,
    pub eroded_revenue: f64,
    pub revenue_gap: f64,
    pub revenue_gap_pct: Option<f64>,
}

pub fn erosion_summary(results: &[SimulationResult]) -> ErosionSummary {
    let baseline: f64 = results.iter().map(|r| r.wealth_tax_baseline * r.final_weight).sum();
    let eroded: f64 = results.iter().map(|r| r.wealth_tax_baseline_eroded * r.final_weight).sum();
    let gap = baseline - eroded;
    if !(baseline > 0.0) {
        tracing::warn!("baseline revenue is zero, erosion gap undefined");
    }
    ErosionSummary {
        baseline_revenue: baseline,
        eroded_revenue: eroded,
        revenue_gap: gap,
        revenue_gap_pct: percent(gap, baseline),
    }
}

/// Per-region policy comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionPolicyRow {
    pub region: String,
    pub revenue_with_exemptions: f64,
    pub revenue_no_exemptions: f64,
    pub exemption_gap: f64,
    pub exemption_gap_pct: Option<f64>,
    pub reference_rule_revenue: f64,
    pub decentralization_gap: f64,
    pub decentralization_gap_pct: Option<f64>,
    pub taxpayers: usize,
    pub avg_taxpayer_etr: Option<f64>,
    pub avg_top10_etr: Option<f64>,
}

pub fn region_policy_row(region: &str, rows: &[&SimulationResult], policy: &TaxPolicy) -> RegionPolicyRow {
    let mut with_ex = 0.0;
    let mut no_ex = 0.0;
    let mut reference = 0.0;
    let (mut tp_tax, mut tp_wealth, mut taxpayers) = (0.0, 0.0, 0usize);
    let (mut top_tax, mut top_wealth, mut top_units) = (0.0, 0.0, 0usize);

    for r in rows {
        let full_base = r.adj_net_wealth.max(0.0);
        with_ex += r.wealth_tax * r.final_weight;
        no_ex += policy.wealth_tax(full_base, &r.region) * r.final_weight;
        reference += policy.reference_tax(full_base) * r.final_weight;
        if r.is_taxpayer {
            taxpayers += 1;
            tp_tax += r.wealth_tax;
            tp_wealth += r.adj_net_wealth;
        }
        if r.wealth_rank > 0.9 {
            top_units += 1;
            top_tax += r.wealth_tax;
            top_wealth += r.adj_net_wealth;
        }
    }

    let exemption_gap = no_ex - with_ex;
    let decentralization_gap = reference - with_ex;
    RegionPolicyRow {
        region: region.to_string(),
        revenue_with_exemptions: with_ex,
        revenue_no_exemptions: no_ex,
        exemption_gap,
        exemption_gap_pct: percent(exemption_gap, no_ex),
        reference_rule_revenue: reference,
        decentralization_gap,
        decentralization_gap_pct: percent(decentralization_gap, with_ex),
        taxpayers,
        avg_taxpayer_etr: if taxpayers > 0 { ratio(tp_tax, tp_wealth) } else { None },
        avg_top10_etr: if top_units > 0 { ratio(top_tax, top_wealth) } else { None },
    }
}

/// One row per region present in `results`, in region order.
pub fn region_policy_summary(results: &[SimulationResult], policy: &TaxPolicy) -> Vec<RegionPolicyRow> {
    let mut by_region: BTreeMap<&str, Vec<&SimulationResult>> = BTreeMap::new();
    for r in results {
        by_region.entry(r.region.as_str()).or_default().push(r);
    }
    by_region
        .into_iter()
        .map(|(region, rows)| region_policy_row(region, &rows, policy))
        .collect()
}
