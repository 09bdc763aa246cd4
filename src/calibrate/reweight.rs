//! Percentile-share reweighting.
//!
//! Units are ranked by a value column (stable ascending) and cut into `K` bins of equal
//! count: the unit at position `p` of `n` lands in bin `⌊p·K/n⌋`. Each bin's weights are
//! multiplied by `target_share / actual_share`, which matches every target share in a
//! single pass. Units left with zero weight are removed afterwards.

use nalgebra::DVector;
use serde::Serialize;

use crate::domain::{ReweightConfig, TaxUnit, ValueColumn};
use crate::error::AppError;
use crate::math::{stable_order, weighted_sum};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReweightReport {
    /// Per-bin scale factors (1.0 for bins left unchanged).
    pub scales: Vec<f64>,
    /// Units removed because their weight became zero.
    pub dropped: usize,
    /// True when the whole pass was skipped (no weight or no value).
    pub neutral: bool,
}

pub fn unit_value(unit: &TaxUnit, column: ValueColumn) -> f64 {
    match column {
        ValueColumn::NetWealth => unit.balance.net_wealth,
        ValueColumn::TotalAssets => unit.balance.total_assets,
    }
}

/// Bin index of every unit (in input order).
pub fn assign_bins(values: &[f64], bins: usize) -> Vec<usize> {
    let n = values.len();
    let mut out = vec![0; n];
    for (p, idx) in stable_order(values).into_iter().enumerate() {
        out[idx] = p * bins / n;
    }
    out
}

/// Each bin's share of total weighted value. `None` when the total is not positive.
pub fn bin_shares(values: &[f64], weights: &[f64], bins: usize) -> Option<Vec<f64>> {
    let assignment = assign_bins(values, bins);
    let mut sums = vec![0.0; bins];
    for ((v, w), b) in values.iter().zip(weights).zip(&assignment) {
        sums[*b] += v * w;
    }
    let total: f64 = sums.iter().sum();
    if !(total > 0.0) {
        return None;
    }
    Some(sums.into_iter().map(|s| s / total).collect())
}

/// Reweight `units` in place so each bin's share of weighted value matches its target.
pub fn reweight_to_shares(units: &mut Vec<TaxUnit>, cfg: &ReweightConfig) -> Result<ReweightReport, AppError> {
    let k = cfg.bins;
    if k == 0 || cfg.target_shares.len() != k {
        return Err(AppError::configuration(format!(
            "Reweighting needs {k} target shares, got {}.",
            cfg.target_shares.len()
        )));
    }
    let target_total: f64 = cfg.target_shares.iter().sum();
    if !(target_total > 0.0) {
        return Err(AppError::configuration("Reweighting target shares sum to zero."));
    }
    let targets: Vec<f64> = cfg.target_shares.iter().map(|t| t / target_total).collect();

    let neutral = ReweightReport {
        scales: vec![1.0; k],
        dropped: 0,
        neutral: true,
    };
    if units.is_empty() {
        tracing::warn!("reweighting skipped: no units");
        return Ok(neutral);
    }

    let values = DVector::from_iterator(units.len(), units.iter().map(|u| unit_value(u, cfg.value)));
    let weights = DVector::from_iterator(units.len(), units.iter().map(|u| u.weight));
    if !(weights.sum() > 0.0) {
        tracing::warn!("reweighting skipped: total weight is zero");
        return Ok(neutral);
    }
    let total = weighted_sum(&values, &weights);
    if !(total > 0.0) {
        tracing::warn!(total, "reweighting skipped: total weighted value is not positive");
        return Ok(neutral);
    }

    let assignment = assign_bins(values.as_slice(), k);
    let mut bin_sums = vec![0.0; k];
    for (i, b) in assignment.iter().enumerate() {
        bin_sums[*b] += values[i] * weights[i];
    }

    let scales: Vec<f64> = bin_sums
        .iter()
        .zip(&targets)
        .enumerate()
        .map(|(b, (sum, target))| {
            let actual = sum / total;
            if actual > 0.0 {
                target / actual
            } else {
                tracing::warn!(bin = b, actual, "bin has no positive weighted value, weights unchanged");
                1.0
            }
        })
        .collect();

    for (unit, b) in units.iter_mut().zip(&assignment) {
        unit.weight *= scales[*b];
    }

    let before = units.len();
    units.retain(|u| u.weight > 0.0);
    let dropped = before - units.len();
    if dropped > 0 {
        tracing::info!(dropped, "removed units with zero weight after reweighting");
    }
    tracing::debug!(?scales, "percentile reweighting scales");

    Ok(ReweightReport {
        scales,
        dropped,
        neutral: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AssetRatios, Balance, WealthBand};
    use proptest::prelude::*;

    fn unit(id: usize, net: f64, weight: f64) -> TaxUnit {
        let ratios = AssetRatios {
            real: 1.0,
            financial: 0.0,
            business: 0.0,
            debt: 0.0,
        };
        TaxUnit {
            id,
            household_id: id,
            unit_index: 1,
            split_ratio: 1.0,
            region: "a".to_string(),
            household_size: 1,
            wealth_rank: 0.5,
            band: WealthBand::Between50And75,
            balance: Balance::from_total_assets(net, &ratios, 0.0),
            ratios,
            weight,
        }
    }

    fn config(targets: &[f64]) -> ReweightConfig {
        ReweightConfig {
            bins: targets.len(),
            target_shares: targets.to_vec(),
            ..ReweightConfig::default()
        }
    }

    #[test]
    fn bins_follow_stable_rank() {
        assert_eq!(assign_bins(&[5.0, 1.0, 3.0, 1.0], 2), vec![1, 0, 1, 0]);
        assert_eq!(assign_bins(&[1.0, 2.0, 3.0], 3), vec![0, 1, 2]);
    }

    #[test]
    fn matches_targets_and_drops_zero_bins() {
        let mut units: Vec<TaxUnit> = (0..10).map(|i| unit(i, (i + 1) as f64 * 1_000.0, 1.0)).collect();
        let report = reweight_to_shares(&mut units, &config(&[0.0, 0.3, 0.7])).unwrap();
        assert!(!report.neutral);
        // Bin 0 holds ranks 0..=3.
        assert_eq!(report.dropped, 4);
        assert_eq!(units.len(), 6);

        let values: Vec<f64> = units.iter().map(|u| u.balance.net_wealth).collect();
        let weights: Vec<f64> = units.iter().map(|u| u.weight).collect();
        let mid: f64 = units[..3].iter().map(|u| u.balance.net_wealth * u.weight).sum();
        let total: f64 = values.iter().zip(&weights).map(|(v, w)| v * w).sum();
        assert!((mid / total - 0.3).abs() < 1e-9);
    }

    #[test]
    fn target_length_mismatch_is_configuration_error() {
        let mut units = vec![unit(0, 1.0, 1.0)];
        let cfg = ReweightConfig {
            bins: 3,
            target_shares: vec![0.5, 0.5],
            ..ReweightConfig::default()
        };
        let err = reweight_to_shares(&mut units, &cfg).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Configuration);
    }

    #[test]
    fn zero_total_weight_is_neutral() {
        let mut units = vec![unit(0, 1.0, 0.0), unit(1, 2.0, 0.0)];
        let report = reweight_to_shares(&mut units, &config(&[0.5, 0.5])).unwrap();
        assert!(report.neutral);
        assert_eq!(units.len(), 2);
    }

    proptest! {
        #[test]
        fn bin_shares_match_renormalized_targets(
            values in proptest::collection::vec(1.0f64..1e7, 20..200),
            raw_targets in proptest::collection::vec(0.01f64..1.0, 2..8),
        ) {
            let k = raw_targets.len();
            let mut units: Vec<TaxUnit> = values.iter().enumerate().map(|(i, v)| unit(i, *v, 1.0)).collect();
            reweight_to_shares(&mut units, &config(&raw_targets)).unwrap();

            let vs: Vec<f64> = units.iter().map(|u| u.balance.net_wealth).collect();
            let ws: Vec<f64> = units.iter().map(|u| u.weight).collect();
            let shares = bin_shares(&vs, &ws, k).unwrap();
            let sum: f64 = raw_targets.iter().sum();
            for (s, t) in shares.iter().zip(&raw_targets) {
                prop_assert!((s - t / sum).abs() < 1e-9);
            }
        }
    }
}
