//! Band statistics + multiplicative noise -> household balances.

use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};

use crate::domain::{AssetRatios, Balance, Household, NoiseConfig, PopulationConfig, SeedConfig, Stage};
use crate::error::AppError;
use crate::population::stats::GroupStats;

fn normal(mean: f64, sd: f64) -> Result<Normal<f64>, AppError> {
    Normal::new(mean, sd).map_err(|e| AppError::configuration(format!("Noise distribution N({mean}, {sd}): {e}")))
}

struct NoiseDraws {
    base: Normal<f64>,
    mid: Normal<f64>,
    bottom: Normal<f64>,
}

impl NoiseDraws {
    fn new(cfg: &NoiseConfig) -> Result<Self, AppError> {
        Ok(Self {
            base: normal(1.0, cfg.base_sd)?,
            mid: normal(1.0, cfg.mid_sd)?,
            bottom: normal(cfg.bottom_mean, cfg.bottom_sd)?,
        })
    }

    /// Combined multiplier for a unit at `rank`. Draws are taken in a fixed order
    /// (base, mid, bottom) and only for the layers that apply.
    fn multiplier(&self, cfg: &NoiseConfig, rank: f64, rng: &mut StdRng) -> f64 {
        let mut m = self.base.sample(rng);
        if rank > cfg.mid_low && rank <= cfg.mid_high {
            m *= self.mid.sample(rng);
        }
        if rank <= cfg.bottom_max {
            m *= self.bottom.sample(rng);
        }
        m.max(0.0)
    }
}

/// Balance for noised total assets: debts follow the ratio, net wealth is floored, and
/// assets are re-derived as `net + debts`.
pub fn floored_balance(noised_assets: f64, ratios: &AssetRatios, floor: f64, income: f64) -> Balance {
    let debts = noised_assets * ratios.debt;
    let net_wealth = (noised_assets - debts).max(floor);
    let total_assets = net_wealth + debts;
    Balance {
        total_assets,
        debts,
        net_wealth,
        real_assets: total_assets * ratios.real,
        financial_assets: total_assets * ratios.financial,
        business_assets: total_assets * ratios.business,
        income,
    }
}

/// Fill in every household's balance from its band's reference statistics.
pub fn assign_balances(
    households: &mut [Household],
    stats: &GroupStats,
    pop: &PopulationConfig,
    seeds: &SeedConfig,
) -> Result<(), AppError> {
    let draws = NoiseDraws::new(&pop.noise)?;
    let mut noise_rng = seeds.rng(Stage::Noise);
    let mut income_rng = seeds.rng(Stage::Income);
    let mut floored = 0usize;

    for hh in households.iter_mut() {
        let group = stats.get(&hh.band).ok_or_else(|| {
            AppError::missing_data(format!("No reference statistics for band '{}'.", hh.band.label()))
        })?;

        let m = draws.multiplier(&pop.noise, hh.wealth_rank, &mut noise_rng);

        let mean_income = group.mean_income.max(1.0);
        let income = normal(mean_income, pop.noise.income_cv * mean_income)?
            .sample(&mut income_rng)
            .max(0.0);

        let noised = group.total_assets * m;
        if noised * (1.0 - hh.ratios.debt) < pop.net_wealth_floor {
            floored += 1;
        }
        hh.balance = floored_balance(noised, &hh.ratios, pop.net_wealth_floor, income);
    }

    tracing::debug!(floored, "households raised to net wealth floor");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::WealthBand;

    fn ratios() -> AssetRatios {
        AssetRatios {
            real: 0.7,
            financial: 0.3,
            business: 0.1,
            debt: 0.2,
        }
    }

    #[test]
    fn floor_preserves_accounting_identity() {
        let b = floored_balance(1_000.0, &ratios(), 7_000.0, 5.0);
        assert_eq!(b.net_wealth, 7_000.0);
        assert!((b.total_assets - (7_000.0 + 200.0)).abs() < 1e-9);
        assert!((b.net_wealth - (b.total_assets - b.debts)).abs() < 1e-9);
    }

    #[test]
    fn unfloored_balance_matches_ratios() {
        let b = floored_balance(1_000_000.0, &ratios(), 7_000.0, 5.0);
        assert!((b.debts - 200_000.0).abs() < 1e-9);
        assert!((b.net_wealth - 800_000.0).abs() < 1e-9);
        assert!((b.real_assets - 700_000.0).abs() < 1e-9);
    }

    #[test]
    fn zero_noise_reproduces_band_means() {
        let cfg = NoiseConfig {
            base_sd: 0.0,
            mid_sd: 0.0,
            bottom_mean: 1.0,
            bottom_sd: 0.0,
            ..NoiseConfig::default()
        };
        let draws = NoiseDraws::new(&cfg).unwrap();
        let mut rng = SeedConfig::new(1).rng(Stage::Noise);
        for rank in [0.1, 0.4, 0.6, 0.95] {
            assert_eq!(draws.multiplier(&cfg, rank, &mut rng), 1.0);
        }
    }

    #[test]
    fn balances_are_reproducible() {
        let elements = crate::domain::ElementMap::default();
        let stats = crate::population::stats::build_group_stats(
            &crate::population::stats::tests::sample_rows(&elements),
            &elements,
        )
        .unwrap();
        let make = || Household {
            id: 0,
            region: "a".to_string(),
            size: 1,
            wealth_rank: 0.6,
            band: WealthBand::Between50And75,
            balance: Balance::default(),
            ratios: stats[&WealthBand::Between50And75].ratios,
            weight: 1.0,
        };
        let pop = PopulationConfig::default();
        let seeds = SeedConfig::new(11);

        let mut a = vec![make(), make()];
        let mut b = vec![make(), make()];
        assign_balances(&mut a, &stats, &pop, &seeds).unwrap();
        assign_balances(&mut b, &stats, &pop, &seeds).unwrap();
        assert_eq!(a, b);
        assert!(a[0].balance.net_wealth >= pop.net_wealth_floor);
        assert_ne!(a[0].balance.total_assets, a[1].balance.total_assets);
    }
}
