//! Validated regional tax policy.
//!
//! `PolicyConfig` (serde, user-editable) is turned into a `TaxPolicy` once at startup.
//! After that, region dispatch is a plain map lookup: region code -> `RegionProfile`.
//! Regions without a profile use the default profile; `TaxPolicy::resolve_regions`
//! reports them once so the fallback is never silent.

use std::collections::{BTreeMap, BTreeSet};

use crate::domain::{PolicyConfig, RegionProfileConfig, TaxRules};
use crate::error::AppError;
use crate::tax::brackets::{Bracket, BracketTable};

const INF: f64 = f64::INFINITY;

/// Canonical form of a region code (trimmed, lower-case).
pub fn normalize_region(raw: &str) -> String {
    raw.trim().to_lowercase()
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegionProfile {
    pub code: String,
    pub personal_exemption: f64,
    pub asset_scale: f64,
    pub brackets: BracketTable,
}

impl RegionProfile {
    fn from_config(cfg: &RegionProfileConfig) -> Result<Self, AppError> {
        let code = normalize_region(&cfg.code);
        if code.is_empty() {
            return Err(AppError::configuration("Region profile with empty code."));
        }
        if !(cfg.personal_exemption.is_finite() && cfg.personal_exemption >= 0.0) {
            return Err(AppError::configuration(format!(
                "Region '{code}': personal_exemption must be finite and >= 0."
            )));
        }
        if !(cfg.asset_scale.is_finite() && cfg.asset_scale > 0.0) {
            return Err(AppError::configuration(format!("Region '{code}': asset_scale must be > 0.")));
        }
        let brackets = BracketTable::new(cfg.brackets.clone())
            .map_err(|e| AppError::configuration(format!("Region '{code}': {e}")))?;
        Ok(Self {
            code,
            personal_exemption: cfg.personal_exemption,
            asset_scale: cfg.asset_scale,
            brackets,
        })
    }
}

#[derive(Debug, Clone)]
pub struct TaxPolicy {
    regions: BTreeMap<String, RegionProfile>,
    default: RegionProfile,
    zero_tax: BTreeSet<String>,
    reference: String,
    income: BracketTable,
    pub rules: TaxRules,
}

impl TaxPolicy {
    pub fn from_config(cfg: &PolicyConfig) -> Result<Self, AppError> {
        let mut regions = BTreeMap::new();
        for rc in &cfg.regions {
            let profile = RegionProfile::from_config(rc)?;
            if regions.contains_key(&profile.code) {
                return Err(AppError::configuration(format!(
                    "Region '{}' has more than one profile.",
                    profile.code
                )));
            }
            regions.insert(profile.code.clone(), profile);
        }
        let default = RegionProfile::from_config(&cfg.default_region)?;

        let reference = normalize_region(&cfg.reference_region);
        if reference != default.code && !regions.contains_key(&reference) {
            return Err(AppError::configuration(format!(
                "Reference region '{reference}' has no profile."
            )));
        }

        let income = BracketTable::new(cfg.income_schedule.clone())
            .map_err(|e| AppError::configuration(format!("Income schedule: {e}")))?;

        let r = &cfg.rules;
        for (name, v) in [
            ("real_valuation", r.real_valuation),
            ("financial_valuation", r.financial_valuation),
            ("business_valuation", r.business_valuation),
            ("reclass_share", r.reclass_share),
            ("business_exemption_share", r.business_exemption_share),
            ("cap_floor_share", r.cap_floor_share),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return Err(AppError::configuration(format!("rules.{name} must be in [0, 1].")));
            }
        }
        if !(r.cap_income_share.is_finite() && r.cap_income_share >= 0.0) {
            return Err(AppError::configuration("rules.cap_income_share must be >= 0."));
        }

        Ok(Self {
            regions,
            default,
            zero_tax: cfg.zero_tax_regions.iter().map(|r| normalize_region(r)).collect(),
            reference,
            income,
            rules: cfg.rules.clone(),
        })
    }

    /// Profile for `region`, or the default profile.
    pub fn profile(&self, region: &str) -> &RegionProfile {
        self.regions.get(region).unwrap_or(&self.default)
    }

    pub fn has_profile(&self, region: &str) -> bool {
        self.regions.contains_key(region)
    }

    pub fn region_codes(&self) -> impl Iterator<Item = &str> {
        self.regions.keys().map(String::as_str)
    }

    pub fn default_profile(&self) -> &RegionProfile {
        &self.default
    }

    /// Check the population's regions against the policy and report fallbacks.
    ///
    /// Returns the regions that will be taxed under the default profile.
    pub fn resolve_regions<'a>(&self, regions: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        let unique: BTreeSet<&str> = regions.into_iter().collect();
        let fallbacks: Vec<String> = unique
            .into_iter()
            .filter(|r| !self.has_profile(r))
            .map(str::to_string)
            .collect();
        for region in &fallbacks {
            tracing::warn!(region = %region, "no tax profile for region, using default schedule");
        }
        fallbacks
    }

    pub fn wealth_tax(&self, base: f64, region: &str) -> f64 {
        self.profile(region).brackets.tax(base)
    }

    /// Wealth tax under the national reference schedule.
    pub fn reference_tax(&self, base: f64) -> f64 {
        self.profile(&self.reference).brackets.tax(base)
    }

    pub fn reference_region(&self) -> &str {
        &self.reference
    }

    pub fn income_tax(&self, income: f64) -> f64 {
        self.income.tax(income)
    }

    pub fn income_schedule(&self) -> &BracketTable {
        &self.income
    }

    pub fn is_zero_tax(&self, region: &str) -> bool {
        self.zero_tax.contains(region)
    }
}

const BASE_LIMITS: [f64; 7] = [
    167_129.45,
    334_252.88,
    668_499.75,
    1_336_999.5,
    2_673_999.0,
    5_347_998.03,
    10_695_996.06,
];

fn schedule(limits: &[f64], rates: &[f64]) -> Vec<Bracket> {
    let mut out = Vec::with_capacity(rates.len());
    let mut lower = 0.0;
    for (i, &rate) in rates.iter().enumerate() {
        let upper = limits.get(i).copied().unwrap_or(INF);
        out.push(Bracket::new(lower, upper, rate));
        lower = upper;
    }
    out
}

fn region(code: &str, personal_exemption: f64, asset_scale: f64, brackets: Vec<Bracket>) -> RegionProfileConfig {
    RegionProfileConfig {
        code: code.to_string(),
        personal_exemption,
        asset_scale,
        brackets,
    }
}

/// Built-in policy: six regional regimes plus the default schedule.
pub fn default_policy_config() -> PolicyConfig {
    const STANDARD: [f64; 7] = [0.002, 0.003, 0.005, 0.009, 0.013, 0.017, 0.021];
    let with_top = |top: f64| {
        let mut rates = STANDARD.to_vec();
        rates.push(top);
        schedule(&BASE_LIMITS, &rates)
    };

    let mut catalonia_limits = BASE_LIMITS.to_vec();
    catalonia_limits.push(19_999_999.99);
    let catalonia = schedule(
        &catalonia_limits,
        &[0.0021, 0.00315, 0.00525, 0.00945, 0.01365, 0.01785, 0.02205, 0.02525, 0.0348],
    );
    let valencia = schedule(
        &BASE_LIMITS,
        &[0.0025, 0.0035, 0.0055, 0.0095, 0.0135, 0.0175, 0.0215, 0.035],
    );
    let default_limits = [
        167_129.45,
        334_252.88,
        668_499.75,
        1_336_999.51,
        2_673_999.01,
        5_347_998.03,
        10_695_996.06,
    ];
    let mut default_rates = STANDARD.to_vec();
    default_rates.push(0.025);

    PolicyConfig {
        regions: vec![
            region("catalonia", 500_000.0, 1.7, catalonia),
            region("madrid", 700_000.0, 0.2, with_top(0.025)),
            region("extremadura", 500_000.0, 0.7, with_top(0.0375)),
            region("galicia", 700_000.0, 1.5, with_top(0.035)),
            region("asturias", 700_000.0, 0.7, with_top(0.025)),
            region("valencia", 500_000.0, 0.9, valencia),
        ],
        default_region: region("default", 700_000.0, 1.0, schedule(&default_limits, &default_rates)),
        zero_tax_regions: vec!["madrid".to_string()],
        reference_region: "asturias".to_string(),
        income_schedule: schedule(
            &[12_450.0, 20_200.0, 35_200.0, 60_000.0, 300_000.0],
            &[0.19, 0.24, 0.30, 0.37, 0.45, 0.47],
        ),
        rules: TaxRules::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> TaxPolicy {
        TaxPolicy::from_config(&default_policy_config()).unwrap()
    }

    #[test]
    fn default_policy_validates() {
        let p = policy();
        assert_eq!(p.region_codes().count(), 6);
        assert_eq!(p.profile("catalonia").personal_exemption, 500_000.0);
        assert_eq!(p.profile("galicia").personal_exemption, 700_000.0);
        assert_eq!(p.profile("murcia").code, "default");
        assert!(p.is_zero_tax("madrid"));
        assert!(!p.is_zero_tax("galicia"));
    }

    #[test]
    fn first_bracket_matches_schedule() {
        let p = policy();
        let base = 100_000.0;
        assert!((p.wealth_tax(base, "valencia") - base * 0.0025).abs() < 1e-9);
        assert!((p.wealth_tax(base, "asturias") - base * 0.002).abs() < 1e-9);
        assert!((p.reference_tax(base) - base * 0.002).abs() < 1e-9);
    }

    #[test]
    fn income_tax_schedule() {
        let p = policy();
        assert!((p.income_tax(10_000.0) - 1_900.0).abs() < 1e-9);
        let expected = 12_450.0 * 0.19 + (20_000.0 - 12_450.0) * 0.24;
        assert!((p.income_tax(20_000.0) - expected).abs() < 1e-9);
    }

    #[test]
    fn duplicate_regions_are_rejected() {
        let mut cfg = default_policy_config();
        let mut dup = cfg.regions[0].clone();
        dup.code = " Catalonia ".to_string();
        cfg.regions.push(dup);
        assert!(TaxPolicy::from_config(&cfg).is_err());
    }

    #[test]
    fn unknown_reference_region_is_rejected() {
        let mut cfg = default_policy_config();
        cfg.reference_region = "atlantis".to_string();
        assert!(TaxPolicy::from_config(&cfg).is_err());
    }

    #[test]
    fn resolve_regions_reports_fallbacks() {
        let p = policy();
        let fallbacks = p.resolve_regions(["madrid", "murcia", "murcia", "galicia"]);
        assert_eq!(fallbacks, vec!["murcia".to_string()]);
    }
}
