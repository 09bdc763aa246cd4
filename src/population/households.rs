//! Household synthesis: regional counts, sizes, and stratified wealth ranks.

use std::collections::BTreeMap;

use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::seq::index;

use crate::domain::{Balance, Household, PopulationConfig, RegionShare, SeedConfig, Stage, WealthBand};
use crate::error::AppError;
use crate::population::stats::GroupStats;
use crate::tax::policy::normalize_region;

const SHARE_TOLERANCE: f64 = 1e-6;
const RANK_START: f64 = 0.0001;

/// Validate region shares and return them keyed by normalized region code.
pub fn validate_shares(shares: &[RegionShare]) -> Result<BTreeMap<String, f64>, AppError> {
    if shares.is_empty() {
        return Err(AppError::configuration("Region shares table is empty."));
    }
    let mut out = BTreeMap::new();
    for s in shares {
        let region = normalize_region(&s.region);
        if region.is_empty() {
            return Err(AppError::configuration("Region share row with empty region."));
        }
        if !(s.share.is_finite() && s.share >= 0.0) {
            return Err(AppError::configuration(format!(
                "Region '{region}' has invalid share {}.",
                s.share
            )));
        }
        if out.insert(region.clone(), s.share).is_some() {
            return Err(AppError::configuration(format!("Region '{region}' appears more than once.")));
        }
    }
    let total: f64 = out.values().sum();
    if (total - 1.0).abs() > SHARE_TOLERANCE {
        return Err(AppError::configuration(format!(
            "Region shares must sum to 1, got {total:.8}."
        )));
    }
    Ok(out)
}

/// Total households for a population: `round(population / avg_household_size)`.
pub fn total_households(pop: &PopulationConfig) -> Result<usize, AppError> {
    let n = (pop.total_population / pop.avg_household_size).round();
    if !(n.is_finite() && n >= 1.0) {
        return Err(AppError::configuration(format!(
            "Population {} with average household size {} yields no households.",
            pop.total_population, pop.avg_household_size
        )));
    }
    Ok(n as usize)
}

/// Households per region, in lexicographic region order.
///
/// Each region gets `round(share * total)`; the rounding residual goes to the region
/// with the most households (first in order on ties), so counts sum to `total` exactly.
pub fn household_counts(shares: &BTreeMap<String, f64>, total: usize) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = shares
        .iter()
        .map(|(region, share)| (region.clone(), (share * total as f64).round() as usize))
        .collect();

    let largest = |counts: &[(String, usize)]| {
        let mut best = 0;
        for (i, (_, c)) in counts.iter().enumerate() {
            if *c > counts[best].1 {
                best = i;
            }
        }
        best
    };

    let assigned: usize = counts.iter().map(|(_, c)| c).sum();
    if assigned < total {
        let i = largest(&counts);
        counts[i].1 += total - assigned;
    } else {
        // The excess can exceed any single count for tiny populations.
        for _ in total..assigned {
            let i = largest(&counts);
            counts[i].1 -= 1;
        }
    }
    if assigned != total {
        tracing::debug!(assigned, total, "assigned rounding residual to largest region");
    }
    counts
}

/// `n` evenly spaced values from `start` to 1.0 inclusive.
fn linspace_to_one(start: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (1.0 - start) / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}

/// Shuffled evenly spaced ranks for one region, with `forced` households moved into
/// the top band.
fn region_ranks(n: usize, pop: &PopulationConfig, rank_rng: &mut StdRng, top_rng: &mut StdRng) -> Vec<f64> {
    let mut ranks = linspace_to_one(RANK_START, n);
    ranks.shuffle(rank_rng);

    let forced = pop.min_top_band_per_region.min(n);
    for i in index::sample(top_rng, n, forced) {
        ranks[i] = top_rng.gen_range(pop.top_band_rank_min..1.0);
    }
    ranks
}

/// Create every household with region, size, rank and band. Balances are zero until
/// `noise::assign_balances` runs.
pub fn synthesize_households(
    shares: &[RegionShare],
    stats: &GroupStats,
    pop: &PopulationConfig,
    seeds: &SeedConfig,
) -> Result<Vec<Household>, AppError> {
    let shares = validate_shares(shares)?;
    let total = total_households(pop)?;
    let counts = household_counts(&shares, total);

    let mut size_rng = seeds.rng(Stage::Households);
    let mut rank_rng = seeds.rng(Stage::Ranks);
    let mut top_rng = seeds.rng(Stage::TopBand);

    let mut households = Vec::with_capacity(total);
    for (region, n) in &counts {
        let ranks = region_ranks(*n, pop, &mut rank_rng, &mut top_rng);
        for rank in ranks {
            let band = WealthBand::from_rank(rank);
            let group = stats.get(&band).ok_or_else(|| {
                AppError::missing_data(format!("No reference statistics for band '{}'.", band.label()))
            })?;
            let size = if size_rng.gen_bool(pop.size_two_prob) { 2 } else { 1 };
            households.push(Household {
                id: households.len(),
                region: region.clone(),
                size,
                wealth_rank: rank,
                band,
                balance: Balance::default(),
                ratios: group.ratios,
                weight: 1.0,
            });
        }
    }

    tracing::info!(households = households.len(), regions = counts.len(), "synthesized households");
    Ok(households)
}
