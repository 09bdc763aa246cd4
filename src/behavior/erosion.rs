//! Avoidance erosion, dropout, and post-erosion bumps.

use rand::Rng;
use rand::rngs::StdRng;

use crate::behavior::BehaviorState;
use crate::domain::{AssetRatios, BumpConfig, DropoutConfig, ErosionConfig, RateTier, TaxUnit};
use crate::error::AppError;
use crate::tax::engine::TaxBase;

const BUSINESS_HEAVY: f64 = 0.2;
const REAL_HEAVY: f64 = 0.4;
const FINANCIAL_HEAVY: f64 = 0.4;
const LOW_INCOME_SHARE: f64 = 0.6;

/// Rate of the first tier whose threshold `rank` exceeds, or `default`.
pub fn tier_rate(tiers: &[RateTier], rank: f64, default: f64) -> f64 {
    tiers.iter().find(|t| rank > t.above).map(|t| t.rate).unwrap_or(default)
}

pub fn erosion_modifier(ratios: &AssetRatios, income: f64, adj_net_wealth: f64, cfg: &ErosionConfig) -> f64 {
    let mut m = 1.0;
    if ratios.business > BUSINESS_HEAVY {
        m += cfg.business_bonus;
    }
    if ratios.real > REAL_HEAVY {
        m += cfg.real_bonus;
    }
    if ratios.financial > FINANCIAL_HEAVY {
        m += cfg.financial_bonus;
    }
    if income < LOW_INCOME_SHARE * adj_net_wealth {
        m += cfg.low_income_bonus;
    }
    m
}

pub fn erosion_factor(rank: f64, ratios: &AssetRatios, income: f64, adj_net_wealth: f64, cfg: &ErosionConfig) -> f64 {
    let base = tier_rate(&cfg.tiers, rank, cfg.base_rate);
    (base * erosion_modifier(ratios, income, adj_net_wealth, cfg)).min(cfg.ceiling)
}

/// Piecewise-linear dropout probability on adjusted net wealth.
///
/// ```text
/// nw < start                 0
/// start <= nw < ramp_end     ramp_prob · (nw − start) / (ramp_end − start)
/// nw >= ramp_end             ramp_prob + min(tail_prob · (nw − ramp_end) / (tail_end − ramp_end), tail_prob)
/// ```
pub fn dropout_probability(adj_net_wealth: f64, cfg: &DropoutConfig) -> f64 {
    if !cfg.enabled || !(adj_net_wealth >= cfg.start) {
        return 0.0;
    }
    if adj_net_wealth < cfg.ramp_end {
        return cfg.ramp_prob * (adj_net_wealth - cfg.start) / (cfg.ramp_end - cfg.start);
    }
    let tail = cfg.tail_prob * (adj_net_wealth - cfg.ramp_end) / (cfg.tail_end - cfg.ramp_end);
    (cfg.ramp_prob + tail.min(cfg.tail_prob)).min(1.0)
}

/// Initial behavioral state per unit: erosion factor plus a dropout draw.
///
/// One Bernoulli draw is taken per unit with positive dropout probability, in unit order.
pub fn assign_erosion(
    units: &[TaxUnit],
    bases: &[TaxBase],
    erosion: &ErosionConfig,
    dropout: &DropoutConfig,
    rng: &mut StdRng,
) -> Result<Vec<BehaviorState>, AppError> {
    if units.len() != bases.len() {
        return Err(AppError::shape_mismatch(format!(
            "assign_erosion: {} units but {} bases.",
            units.len(),
            bases.len()
        )));
    }

    let states: Vec<BehaviorState> = units
        .iter()
        .zip(bases)
        .map(|(u, b)| {
            let adj_net = b.assets.net_wealth;
            let income = u.balance.income;
            let dropout_prob = dropout_probability(adj_net, dropout);
            let dropped = dropout_prob > 0.0 && rng.gen_bool(dropout_prob);
            BehaviorState {
                erosion_factor: erosion_factor(u.wealth_rank, &u.ratios, income, adj_net, erosion),
                dropout_prob,
                dropout: dropped,
                migration_prob: 0.0,
                migrated: false,
                income,
            }
        })
        .collect();

    let dropouts = states.iter().filter(|s| s.dropout).count();
    let mean_erosion = if states.is_empty() {
        0.0
    } else {
        states.iter().map(|s| s.erosion_factor).sum::<f64>() / states.len() as f64
    };
    tracing::info!(dropouts, mean_erosion, "assigned erosion and dropout");
    Ok(states)
}

/// Financial-heavy units lose part of their income; every unit's erosion is bumped
/// (less for business-heavy units) and re-clipped to the post-bump ceiling.
pub fn apply_bumps(units: &[TaxUnit], states: &mut [BehaviorState], cfg: &BumpConfig) {
    for (u, s) in units.iter().zip(states.iter_mut()) {
        if u.ratios.financial > FINANCIAL_HEAVY {
            s.income *= cfg.financial_heavy_income;
        }
        let bump = if u.ratios.business > BUSINESS_HEAVY {
            cfg.business_heavy_erosion
        } else {
            cfg.other_erosion
        };
        s.erosion_factor = (s.erosion_factor * bump).min(cfg.ceiling);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ratios(real: f64, financial: f64, business: f64) -> AssetRatios {
        AssetRatios {
            real,
            financial,
            business,
            debt: 0.0,
        }
    }

    #[test]
    fn tiers_pick_first_match() {
        let cfg = ErosionConfig::default();
        assert_eq!(tier_rate(&cfg.tiers, 0.9995, cfg.base_rate), 0.35);
        assert_eq!(tier_rate(&cfg.tiers, 0.995, cfg.base_rate), 0.25);
        assert_eq!(tier_rate(&cfg.tiers, 0.99, cfg.base_rate), 0.15);
        assert_eq!(tier_rate(&cfg.tiers, 0.80, cfg.base_rate), 0.07);
        assert_eq!(tier_rate(&cfg.tiers, 0.75, cfg.base_rate), 0.02);
    }

    #[test]
    fn modifier_adds_bonuses() {
        let cfg = ErosionConfig::default();
        let m = erosion_modifier(&ratios(0.5, 0.5, 0.3), 10.0, 1_000.0, &cfg);
        assert!((m - 1.25).abs() < 1e-12);
        let plain = erosion_modifier(&ratios(0.3, 0.3, 0.1), 1_000.0, 1_000.0, &cfg);
        assert_eq!(plain, 1.0);
    }

    #[test]
    fn erosion_is_capped() {
        let cfg = ErosionConfig::default();
        let e = erosion_factor(0.9999, &ratios(0.5, 0.5, 0.3), 0.0, 1e9, &cfg);
        assert_eq!(e, 0.40);
    }

    #[test]
    fn dropout_ramps() {
        let cfg = DropoutConfig::default();
        assert_eq!(dropout_probability(1_999_999.0, &cfg), 0.0);
        assert!((dropout_probability(6_000_000.0, &cfg) - 0.05).abs() < 1e-12);
        assert!((dropout_probability(10_000_000.0, &cfg) - 0.10).abs() < 1e-12);
        assert!((dropout_probability(55_000_000.0, &cfg) - 0.20).abs() < 1e-12);
        assert!((dropout_probability(1e10, &cfg) - 0.30).abs() < 1e-12);

        let off = DropoutConfig {
            enabled: false,
            ..cfg
        };
        assert_eq!(dropout_probability(1e10, &off), 0.0);
    }

    #[test]
    fn bumps_adjust_income_and_erosion() {
        use crate::domain::{Balance, WealthBand};
        let make = |r: AssetRatios| TaxUnit {
            id: 0,
            household_id: 0,
            unit_index: 1,
            split_ratio: 1.0,
            region: "a".to_string(),
            household_size: 1,
            wealth_rank: 0.5,
            band: WealthBand::Between50And75,
            balance: Balance::from_total_assets(1.0, &r, 100.0),
            ratios: r,
            weight: 1.0,
        };
        let units = vec![make(ratios(0.2, 0.5, 0.3)), make(ratios(0.8, 0.1, 0.1))];
        let state = |e: f64| BehaviorState {
            erosion_factor: e,
            dropout_prob: 0.0,
            dropout: false,
            migration_prob: 0.0,
            migrated: false,
            income: 100.0,
        };
        let mut states = vec![state(0.10), state(0.29)];
        apply_bumps(&units, &mut states, &BumpConfig::default());

        assert!((states[0].income - 95.0).abs() < 1e-12);
        assert!((states[0].erosion_factor - 0.105).abs() < 1e-12);
        assert_eq!(states[1].income, 100.0);
        assert_eq!(states[1].erosion_factor, 0.30);
    }
}
