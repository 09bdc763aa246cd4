//! Migration (exit) response for the top of the distribution.

use rand::Rng;
use rand::rngs::StdRng;

use crate::behavior::BehaviorState;
use crate::behavior::erosion::tier_rate;
use crate::domain::{MigrationConfig, TaxUnit};
use crate::error::AppError;
use crate::tax::engine::TaxBase;

/// Exit probability: the rank tier's base probability, bumped by the baseline tax burden.
pub fn migration_probability(rank: f64, baseline_tax: f64, adj_net_wealth: f64, cfg: &MigrationConfig) -> f64 {
    if !cfg.enabled {
        return 0.0;
    }
    let base = tier_rate(&cfg.tiers, rank, 0.0);
    if base == 0.0 {
        return 0.0;
    }
    let ratio = baseline_tax / (adj_net_wealth + 1e-6);
    let bump = if ratio.is_finite() { ratio.min(cfg.max_ratio_bump) } else { cfg.max_ratio_bump };
    (base * (1.0 + bump.max(0.0))).min(1.0)
}

/// Draw exits. One uniform draw per unit with positive probability, in unit order.
pub fn apply_migration(
    units: &[TaxUnit],
    bases: &[TaxBase],
    baseline_taxes: &[f64],
    states: &mut [BehaviorState],
    cfg: &MigrationConfig,
    rng: &mut StdRng,
) -> Result<usize, AppError> {
    let n = units.len();
    if bases.len() != n || baseline_taxes.len() != n || states.len() != n {
        return Err(AppError::shape_mismatch(format!(
            "apply_migration: {n} units, {} bases, {} baseline taxes, {} states.",
            bases.len(),
            baseline_taxes.len(),
            states.len()
        )));
    }

    let mut migrants = 0;
    for i in 0..n {
        let p = migration_probability(units[i].wealth_rank, baseline_taxes[i], bases[i].assets.net_wealth, cfg);
        states[i].migration_prob = p;
        if p > 0.0 && rng.r#gen::<f64>() < p {
            states[i].migrated = true;
            migrants += 1;
        }
    }
    tracing::info!(migrants, units = n, "applied migration module");
    Ok(migrants)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SeedConfig;
    use crate::domain::Stage;

    #[test]
    fn probability_tiers_and_bump() {
        let cfg = MigrationConfig::default();
        assert_eq!(migration_probability(0.5, 0.0, 1e6, &cfg), 0.0);
        assert!((migration_probability(0.96, 0.0, 1e6, &cfg) - 0.002).abs() < 1e-12);
        // Burden 1% of wealth -> bump 1%.
        let p = migration_probability(0.995, 10_000.0, 1e6, &cfg);
        assert!((p - 0.007 * 1.01).abs() < 1e-9);
        // Burden above the cap is clipped at max_ratio_bump.
        let p = migration_probability(0.9995, 1e6, 1e6, &cfg);
        assert!((p - 0.015 * 1.015).abs() < 1e-9);
    }

    #[test]
    fn disabled_migration_never_draws() {
        let cfg = MigrationConfig {
            enabled: false,
            ..MigrationConfig::default()
        };
        assert_eq!(migration_probability(0.9999, 1.0, 1.0, &cfg), 0.0);
    }

    #[test]
    fn certain_exit_is_flagged() {
        let cfg = MigrationConfig {
            tiers: vec![crate::domain::RateTier { above: 0.0, rate: 1.0 }],
            ..MigrationConfig::default()
        };
        let mut rng = SeedConfig::new(2).rng(Stage::Migration);
        let ratios = crate::domain::AssetRatios::default();
        let unit = TaxUnit {
            id: 0,
            household_id: 0,
            unit_index: 1,
            split_ratio: 1.0,
            region: "a".to_string(),
            household_size: 1,
            wealth_rank: 0.5,
            band: crate::domain::WealthBand::Between50And75,
            balance: crate::domain::Balance::default(),
            ratios,
            weight: 1.0,
        };
        let policy = crate::tax::policy::TaxPolicy::from_config(&crate::tax::policy::default_policy_config()).unwrap();
        let bases = crate::tax::engine::derive_bases(std::slice::from_ref(&unit), &policy);
        let mut states = vec![BehaviorState::default()];
        let n = apply_migration(&[unit], &bases, &[0.0], &mut states, &cfg, &mut rng).unwrap();
        assert_eq!(n, 1);
        assert!(states[0].migrated);
    }
}
