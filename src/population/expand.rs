//! Household -> tax-unit expansion.
//!
//! A household whose net wealth is strictly above the threshold splits into two units
//! with probability `split_prob`; the split is `(0.8, 0.2)` or `(0.9, 0.1)` with equal
//! odds. Monetary fields and the weight scale by each unit's fraction, so a split
//! household's units carry exactly the household's original weight.

use rand::Rng;
use rand::rngs::StdRng;

use crate::domain::{ExpansionConfig, Household, TaxUnit};
use crate::error::AppError;

const SPLITS: [[f64; 2]; 2] = [[0.8, 0.2], [0.9, 0.1]];

/// Whether a household may split at all.
pub fn split_eligible(household: &Household, cfg: &ExpansionConfig) -> bool {
    household.balance.net_wealth > cfg.threshold
}

/// Draw the unit fractions for every household, in household order.
pub fn draw_fractions(households: &[Household], cfg: &ExpansionConfig, rng: &mut StdRng) -> Vec<Vec<f64>> {
    households
        .iter()
        .map(|hh| {
            if split_eligible(hh, cfg) && rng.gen_bool(cfg.split_prob) {
                let pick = if rng.gen_bool(0.5) { 0 } else { 1 };
                SPLITS[pick].to_vec()
            } else {
                vec![1.0]
            }
        })
        .collect()
}

/// Build tax units from households and pre-drawn fractions.
pub fn build_units(households: &[Household], fractions: &[Vec<f64>]) -> Result<Vec<TaxUnit>, AppError> {
    if households.len() != fractions.len() {
        return Err(AppError::shape_mismatch(format!(
            "{} households but {} fraction lists.",
            households.len(),
            fractions.len()
        )));
    }
    let expected: usize = fractions.iter().map(Vec::len).sum();

    let mut units = Vec::with_capacity(expected);
    for (hh, parts) in households.iter().zip(fractions) {
        let total: f64 = parts.iter().sum();
        if (total - 1.0).abs() > 1e-12 {
            return Err(AppError::shape_mismatch(format!(
                "Household {} split fractions sum to {total}.",
                hh.id
            )));
        }
        for (i, &f) in parts.iter().enumerate() {
            units.push(TaxUnit {
                id: units.len(),
                household_id: hh.id,
                unit_index: (i + 1) as u8,
                split_ratio: f,
                region: hh.region.clone(),
                household_size: hh.size,
                wealth_rank: hh.wealth_rank,
                band: hh.band,
                balance: hh.balance.scaled(f),
                ratios: hh.ratios,
                weight: hh.weight * f,
            });
        }
    }

    if units.len() != expected {
        return Err(AppError::shape_mismatch(format!(
            "Expansion produced {} units for {expected} fractions.",
            units.len()
        )));
    }
    Ok(units)
}

pub fn expand_units(households: &[Household], cfg: &ExpansionConfig, rng: &mut StdRng) -> Result<Vec<TaxUnit>, AppError> {
    let fractions = draw_fractions(households, cfg, rng);
    let units = build_units(households, &fractions)?;
    let split = fractions.iter().filter(|f| f.len() > 1).count();
    tracing::info!(households = households.len(), units = units.len(), split, "expanded tax units");
    Ok(units)
}
