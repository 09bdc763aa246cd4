//! Run configuration.
//!
//! Every knob of the pipeline lives here with its default. A run's configuration is:
//!
//! - `SimConfig::default()`, or a TOML file layered over the defaults (`[section]`
//!   tables map 1:1 to the structs below)
//! - then overridden by CLI flags (see `app::sim_config_from_args`)
//! - then validated once, before any stage runs

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::seeds::SeedConfig;
use crate::error::AppError;
use crate::tax::brackets::Bracket;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub seeds: SeedConfig,
    pub population: PopulationConfig,
    pub expansion: ExpansionConfig,
    pub calibration: CalibrationConfig,
    pub policy: PolicyConfig,
    pub behavior: BehaviorConfig,
    pub elements: ElementMap,
    /// Weighted taxpayer count per region (empty disables taxpayer calibration).
    pub taxpayer_targets: BTreeMap<String, f64>,
}

impl SimConfig {
    /// Load a TOML configuration file layered over the defaults.
    pub fn from_toml_file(path: &Path) -> Result<Self, AppError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::configuration(format!("Failed to read config '{}': {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, AppError> {
        toml::from_str(content).map_err(|e| AppError::configuration(format!("Invalid config TOML: {e}")))
    }

    /// Validate everything that is not validated by a dedicated constructor
    /// (`TaxPolicy::from_config`, `SeedConfig::validate`).
    pub fn validate(&self) -> Result<(), AppError> {
        self.seeds.validate()?;

        let pop = &self.population;
        if !(pop.total_population.is_finite() && pop.total_population > 0.0) {
            return Err(AppError::configuration("population.total_population must be > 0."));
        }
        if !(pop.avg_household_size.is_finite() && pop.avg_household_size > 0.0) {
            return Err(AppError::configuration("population.avg_household_size must be > 0."));
        }
        check_probability("population.size_two_prob", pop.size_two_prob)?;
        if !(0.0..1.0).contains(&pop.top_band_rank_min) {
            return Err(AppError::configuration("population.top_band_rank_min must be in [0, 1)."));
        }
        let noise = &pop.noise;
        for (name, sd) in [
            ("noise.base_sd", noise.base_sd),
            ("noise.mid_sd", noise.mid_sd),
            ("noise.bottom_sd", noise.bottom_sd),
            ("noise.income_cv", noise.income_cv),
        ] {
            if !(sd.is_finite() && sd >= 0.0) {
                return Err(AppError::configuration(format!("{name} must be finite and >= 0.")));
            }
        }

        if !(self.expansion.threshold.is_finite()) {
            return Err(AppError::configuration("expansion.threshold must be finite."));
        }
        check_probability("expansion.split_prob", self.expansion.split_prob)?;

        let rw = &self.calibration.reweight;
        if rw.bins == 0 {
            return Err(AppError::configuration("calibration.reweight.bins must be >= 1."));
        }
        if rw.target_shares.len() != rw.bins {
            return Err(AppError::configuration(format!(
                "calibration.reweight.target_shares has {} entries but bins = {}.",
                rw.target_shares.len(),
                rw.bins
            )));
        }
        if rw.target_shares.iter().any(|s| !(s.is_finite() && *s >= 0.0))
            || rw.target_shares.iter().sum::<f64>() <= 0.0
        {
            return Err(AppError::configuration(
                "calibration.reweight.target_shares must be non-negative with a positive sum.",
            ));
        }

        let tail = &self.calibration.tail;
        if !(tail.alpha.is_finite() && tail.alpha > 0.0) {
            return Err(AppError::configuration("calibration.tail.alpha must be > 0."));
        }
        if !(tail.top1_share >= 0.0 && tail.top1_share <= tail.top10_share && tail.top10_share <= 1.0) {
            return Err(AppError::configuration(
                "calibration.tail shares must satisfy 0 <= top1_share <= top10_share <= 1.",
            ));
        }

        let b = &self.behavior;
        check_probability("behavior.erosion.ceiling", b.erosion.ceiling)?;
        check_probability("behavior.bumps.ceiling", b.bumps.ceiling)?;
        check_probability("behavior.dropout.ramp_prob", b.dropout.ramp_prob)?;
        check_probability("behavior.dropout.tail_prob", b.dropout.tail_prob)?;
        if !(b.dropout.start < b.dropout.ramp_end && b.dropout.ramp_end < b.dropout.tail_end) {
            return Err(AppError::configuration(
                "behavior.dropout thresholds must satisfy start < ramp_end < tail_end.",
            ));
        }
        for tier in &b.migration.tiers {
            check_probability("behavior.migration.tiers.prob", tier.rate)?;
        }
        if !(b.migration.max_ratio_bump.is_finite() && b.migration.max_ratio_bump >= 0.0) {
            return Err(AppError::configuration("behavior.migration.max_ratio_bump must be >= 0."));
        }

        for (region, target) in &self.taxpayer_targets {
            if !(target.is_finite() && *target >= 0.0) {
                return Err(AppError::configuration(format!(
                    "Taxpayer target for '{region}' must be finite and >= 0."
                )));
            }
        }

        Ok(())
    }
}

fn check_probability(name: &str, p: f64) -> Result<(), AppError> {
    if (0.0..=1.0).contains(&p) {
        Ok(())
    } else {
        Err(AppError::configuration(format!("{name} must be in [0, 1], got {p}.")))
    }
}

/// Household synthesis and band noise.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationConfig {
    /// Simulated adult population.
    pub total_population: f64,
    pub avg_household_size: f64,
    /// Probability a household has two members (otherwise one).
    pub size_two_prob: f64,
    /// Households per region forced into the top band.
    pub min_top_band_per_region: usize,
    /// Lower bound of the rank drawn for forced top-band households.
    pub top_band_rank_min: f64,
    pub net_wealth_floor: f64,
    pub noise: NoiseConfig,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            total_population: 240_000.0,
            avg_household_size: 1.6,
            size_two_prob: 0.7,
            min_top_band_per_region: 5,
            top_band_rank_min: 0.95,
            net_wealth_floor: 7_000.0,
            noise: NoiseConfig::default(),
        }
    }
}

/// Multiplicative noise applied to band-mean assets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseConfig {
    pub base_sd: f64,
    /// Applied to ranks in `(mid_low, mid_high]`.
    pub mid_sd: f64,
    pub mid_low: f64,
    pub mid_high: f64,
    /// Applied to ranks `<= bottom_max`.
    pub bottom_mean: f64,
    pub bottom_sd: f64,
    pub bottom_max: f64,
    /// Income standard deviation as a fraction of the band mean.
    pub income_cv: f64,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            base_sd: 0.05,
            mid_sd: 0.15,
            mid_low: 0.30,
            mid_high: 0.90,
            bottom_mean: 1.2,
            bottom_sd: 0.25,
            bottom_max: 0.50,
            income_cv: 0.05,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpansionConfig {
    /// Households with net wealth strictly above this may split.
    pub threshold: f64,
    pub split_prob: f64,
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self {
            threshold: 1_000_000.0,
            split_prob: 0.7,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    pub reweight: ReweightConfig,
    pub tail: TailConfig,
    /// Multiply total assets by each region's `asset_scale` before taxation.
    pub region_scaling: bool,
}

/// Which unit value drives percentile reweighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueColumn {
    NetWealth,
    TotalAssets,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReweightConfig {
    pub enabled: bool,
    pub bins: usize,
    pub value: ValueColumn,
    /// Target share of weighted value per bin, lowest bin first (renormalized).
    pub target_shares: Vec<f64>,
}

pub const DEFAULT_TARGET_SHARES: [f64; 10] = [0.00, 0.01, 0.02, 0.04, 0.07, 0.10, 0.13, 0.18, 0.25, 0.20];

impl Default for ReweightConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bins: DEFAULT_TARGET_SHARES.len(),
            value: ValueColumn::NetWealth,
            target_shares: DEFAULT_TARGET_SHARES.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TailConfig {
    pub enabled: bool,
    pub alpha: f64,
    pub top1_share: f64,
    pub top10_share: f64,
}

impl Default for TailConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            alpha: 2.5,
            top1_share: 0.20,
            top10_share: 0.50,
        }
    }
}

/// Raw policy tables; validated into `tax::TaxPolicy`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub regions: Vec<RegionProfileConfig>,
    pub default_region: RegionProfileConfig,
    /// Regions whose wealth tax is forced to zero.
    pub zero_tax_regions: Vec<String>,
    /// Region whose schedule is the "national rule" in the decentralization comparison.
    pub reference_region: String,
    pub income_schedule: Vec<Bracket>,
    pub rules: TaxRules,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        crate::tax::policy::default_policy_config()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionProfileConfig {
    pub code: String,
    pub personal_exemption: f64,
    #[serde(default = "default_asset_scale")]
    pub asset_scale: f64,
    pub brackets: Vec<Bracket>,
}

fn default_asset_scale() -> f64 {
    1.0
}

/// Base-derivation and cap constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaxRules {
    pub real_valuation: f64,
    pub financial_valuation: f64,
    pub business_valuation: f64,
    /// Business ratio above which part of business assets is reclassified.
    pub reclass_ratio: f64,
    pub reclass_share: f64,
    pub residence_cap: f64,
    /// Share of adjusted business assets exempted for eligible units.
    pub business_exemption_share: f64,
    pub business_exemption_min_income: f64,
    pub filing_gross_assets: f64,
    pub cap_income_share: f64,
    pub cap_floor_share: f64,
}

impl Default for TaxRules {
    fn default() -> Self {
        Self {
            real_valuation: 0.75,
            financial_valuation: 1.0,
            business_valuation: 0.70,
            reclass_ratio: 0.2,
            reclass_share: 0.2,
            residence_cap: 300_000.0,
            business_exemption_share: 0.0,
            business_exemption_min_income: 30_000.0,
            filing_gross_assets: 2_000_000.0,
            cap_income_share: 0.60,
            cap_floor_share: 0.20,
        }
    }
}

/// A rate that applies to ranks strictly above `above`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateTier {
    pub above: f64,
    pub rate: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    pub erosion: ErosionConfig,
    pub bumps: BumpConfig,
    pub dropout: DropoutConfig,
    pub migration: MigrationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ErosionConfig {
    /// Checked in order; first match wins.
    pub tiers: Vec<RateTier>,
    pub base_rate: f64,
    pub business_bonus: f64,
    pub real_bonus: f64,
    pub financial_bonus: f64,
    pub low_income_bonus: f64,
    pub ceiling: f64,
}

impl Default for ErosionConfig {
    fn default() -> Self {
        Self {
            tiers: vec![
                RateTier { above: 0.999, rate: 0.35 },
                RateTier { above: 0.99, rate: 0.25 },
                RateTier { above: 0.90, rate: 0.15 },
                RateTier { above: 0.75, rate: 0.07 },
            ],
            base_rate: 0.02,
            business_bonus: 0.10,
            real_bonus: 0.02,
            financial_bonus: 0.08,
            low_income_bonus: 0.05,
            ceiling: 0.40,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BumpConfig {
    pub financial_heavy_income: f64,
    pub business_heavy_erosion: f64,
    pub other_erosion: f64,
    pub ceiling: f64,
}

impl Default for BumpConfig {
    fn default() -> Self {
        Self {
            financial_heavy_income: 0.95,
            business_heavy_erosion: 1.05,
            other_erosion: 1.10,
            ceiling: 0.30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DropoutConfig {
    pub enabled: bool,
    pub start: f64,
    pub ramp_end: f64,
    pub ramp_prob: f64,
    pub tail_end: f64,
    pub tail_prob: f64,
}

impl Default for DropoutConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            start: 2_000_000.0,
            ramp_end: 10_000_000.0,
            ramp_prob: 0.10,
            tail_end: 100_000_000.0,
            tail_prob: 0.20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    pub enabled: bool,
    pub tiers: Vec<RateTier>,
    pub max_ratio_bump: f64,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tiers: vec![
                RateTier { above: 0.999, rate: 0.015 },
                RateTier { above: 0.99, rate: 0.007 },
                RateTier { above: 0.95, rate: 0.002 },
            ],
            max_ratio_bump: 0.015,
        }
    }
}

/// Survey elements that make up each asset class.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementMap {
    pub statistic: String,
    pub real: Vec<String>,
    pub financial: Vec<String>,
    pub debt: Vec<String>,
    pub income: String,
    pub business: String,
}

impl Default for ElementMap {
    fn default() -> Self {
        let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            statistic: "MEAN".to_string(),
            real: owned(&[
                "MAIN RESIDENCE",
                "OTHER REAL ESTATE PROPERTIES",
                "CARS AND OTHER VEHICLES",
                "OTHER DURABLE GOODS",
            ]),
            financial: owned(&[
                "LISTED SHARES",
                "INVESTMENT FUNDS",
                "FIXED-INCOME SECURITIES",
                "PENSION SCHEMES AND UNIT-LINKED OR MIXED LIFE INSURANCE",
                "ACCOUNTS AND DEPOSITS USABLE FOR PAYMENTS",
                "ACCOUNTS NON USABLE FOR PAYMENTS AND HOUSE-PURCHASE SAVING ACCOUNTS",
                "OTHER FINANCIAL ASSETS",
                "UNLISTED SHARES AND OTHER EQUITY",
            ]),
            debt: owned(&["TOTAL DEBT"]),
            income: "TOTAL INCOME".to_string(),
            business: "BUSINESSES RELATED TO SELF-EMPLOYMENT".to_string(),
        }
    }
}
