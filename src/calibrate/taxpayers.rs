//! Regional taxpayer-count calibration.
//!
//! For every region in the target map, the weights of its taxpayers are scaled so their
//! sum equals the target. Regions with no simulated taxpayer weight are skipped.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::domain::SimulationResult;
use crate::tax::policy::normalize_region;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaxpayerScaling {
    pub region: String,
    pub target: f64,
    pub simulated: f64,
    /// `None` when the region was skipped.
    pub factor: Option<f64>,
}

pub fn calibrate_taxpayer_weights(
    results: &mut [SimulationResult],
    targets: &BTreeMap<String, f64>,
) -> Vec<TaxpayerScaling> {
    let mut out = Vec::with_capacity(targets.len());
    for (raw_region, &target) in targets {
        let region = normalize_region(raw_region);
        let simulated: f64 = results
            .iter()
            .filter(|r| r.is_taxpayer && r.region == region)
            .map(|r| r.final_weight)
            .sum();

        if !(simulated > 0.0) {
            tracing::warn!(region = %region, target, "no simulated taxpayer weight, calibration skipped");
            out.push(TaxpayerScaling {
                region,
                target,
                simulated,
                factor: None,
            });
            continue;
        }

        let factor = target / simulated;
        for r in results.iter_mut().filter(|r| r.is_taxpayer && r.region == region) {
            r.final_weight *= factor;
        }
        tracing::debug!(region = %region, target, simulated, factor, "scaled taxpayer weights");
        out.push(TaxpayerScaling {
            region,
            target,
            simulated,
            factor: Some(factor),
        });
    }
    out
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::WealthBand;

    pub(crate) fn result(region: &str, is_taxpayer: bool, weight: f64) -> SimulationResult {
        SimulationResult {
            unit_id: 0,
            household_id: 0,
            unit_index: 1,
            region: region.to_string(),
            wealth_rank: 0.5,
            band: WealthBand::Between50And75,
            total_assets: 0.0,
            debts: 0.0,
            net_wealth: 0.0,
            income: 0.0,
            adj_real_assets: 0.0,
            adj_financial_assets: 0.0,
            adj_business_assets: 0.0,
            business_reclass: 0.0,
            adj_total_assets: 0.0,
            adj_net_wealth: 0.0,
            personal_exemption: 0.0,
            residence_exemption: 0.0,
            business_exemption: 0.0,
            total_exemption: 0.0,
            gross_base: 0.0,
            baseline_base: 0.0,
            eroded_base: 0.0,
            erosion_factor: 0.0,
            dropout_prob: 0.0,
            dropout: false,
            migration_prob: 0.0,
            migrated: false,
            wealth_tax_baseline: 0.0,
            wealth_tax_baseline_eroded: 0.0,
            wealth_tax_precap: 0.0,
            wealth_tax: 0.0,
            income_tax: 0.0,
            capped: false,
            is_taxpayer,
            final_weight: weight,
        }
    }

    #[test]
    fn scales_only_taxpayers_of_target_region() {
        let mut results = vec![
            result("galicia", true, 2.0),
            result("galicia", true, 3.0),
            result("galicia", false, 4.0),
            result("valencia", true, 1.0),
        ];
        let targets = BTreeMap::from([("Galicia".to_string(), 10.0)]);
        let report = calibrate_taxpayer_weights(&mut results, &targets);

        assert_eq!(report[0].factor, Some(2.0));
        assert_eq!(results[0].final_weight, 4.0);
        assert_eq!(results[1].final_weight, 6.0);
        assert_eq!(results[2].final_weight, 4.0);
        assert_eq!(results[3].final_weight, 1.0);
    }

    #[test]
    fn region_without_taxpayers_is_skipped() {
        let mut results = vec![result("madrid", false, 1.0)];
        let targets = BTreeMap::from([("madrid".to_string(), 500.0)]);
        let report = calibrate_taxpayer_weights(&mut results, &targets);
        assert_eq!(report[0].factor, None);
        assert_eq!(results[0].final_weight, 1.0);
    }
}
