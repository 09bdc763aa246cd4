//! Per-unit tax computation.
//!
//! Two passes, with the behavioral module in between:
//!
//! 1. `derive_bases`: asset valuation, business reclassification, exemptions, filing test
//! 2. `assess`: erosion discount, bracket wealth tax, exit/override zeroing, income tax,
//!    joint cap
//!
//! Everything here is pure: the same unit and policy always give the same numbers.

use crate::behavior::BehaviorState;
use crate::domain::{AssetRatios, Balance, SimulationResult, TaxRules, TaxUnit};
use crate::error::AppError;
use crate::tax::policy::TaxPolicy;

/// Asset values after statutory valuation and business reclassification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdjustedAssets {
    pub real: f64,
    pub financial: f64,
    pub business: f64,
    pub business_reclass: f64,
    pub total: f64,
    pub net_wealth: f64,
}

/// Output of the exemption step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Exemptions {
    pub personal: f64,
    pub residence: f64,
    pub business: f64,
    pub gross_base: f64,
    pub net_base: f64,
}

impl Exemptions {
    pub fn total(&self) -> f64 {
        self.personal + self.residence + self.business
    }
}

/// Everything the tax engine knows about a unit before behavior is applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaxBase {
    pub assets: AdjustedAssets,
    pub exemptions: Exemptions,
    pub files: bool,
}

/// Value each asset class, then exempt part of business assets for business-heavy units.
pub fn adjust_assets(balance: &Balance, ratios: &AssetRatios, rules: &TaxRules) -> AdjustedAssets {
    let real = balance.real_assets * rules.real_valuation;
    let financial = balance.financial_assets * rules.financial_valuation;
    let mut business = balance.business_assets * rules.business_valuation;

    let business_reclass = if ratios.business > rules.reclass_ratio {
        business * rules.reclass_share
    } else {
        0.0
    };
    business -= business_reclass;

    let total = real + financial + business;
    AdjustedAssets {
        real,
        financial,
        business,
        business_reclass,
        total,
        net_wealth: total - balance.debts,
    }
}

/// Personal, residence and business exemptions and the resulting bases.
pub fn compute_exemptions(
    assets: &AdjustedAssets,
    business_ratio: f64,
    income: f64,
    personal_exemption: f64,
    rules: &TaxRules,
) -> Exemptions {
    let residence = assets.real.clamp(0.0, rules.residence_cap);
    let eligible = business_ratio > rules.reclass_ratio && income > rules.business_exemption_min_income;
    let business = if eligible {
        (assets.business * rules.business_exemption_share).max(0.0)
    } else {
        0.0
    };
    let gross_base = assets.net_wealth - residence - business;
    Exemptions {
        personal: personal_exemption,
        residence,
        business,
        gross_base,
        net_base: (gross_base - personal_exemption).max(0.0),
    }
}

pub fn derive_base(unit: &TaxUnit, policy: &TaxPolicy) -> TaxBase {
    let rules = &policy.rules;
    let assets = adjust_assets(&unit.balance, &unit.ratios, rules);
    let personal = policy.profile(&unit.region).personal_exemption;
    let exemptions = compute_exemptions(&assets, unit.ratios.business, unit.balance.income, personal, rules);
    let files = exemptions.net_base > 0.0 || assets.total > rules.filing_gross_assets;
    TaxBase {
        assets,
        exemptions,
        files,
    }
}

pub fn derive_bases(units: &[TaxUnit], policy: &TaxPolicy) -> Vec<TaxBase> {
    units.iter().map(|u| derive_base(u, policy)).collect()
}

/// Single-shot joint cap. Returns the (possibly reduced) wealth tax and whether the cap bound.
///
/// When `wealth_tax + income_tax` exceeds `cap_income_share * income`, the wealth tax
/// becomes `max(cap_floor_share * wealth_tax, cap - income_tax)`.
pub fn apply_joint_cap(wealth_tax: f64, income_tax: f64, income: f64, rules: &TaxRules) -> (f64, bool) {
    let cap = rules.cap_income_share * income;
    if wealth_tax + income_tax > cap {
        let reduced = (rules.cap_floor_share * wealth_tax).max(cap - income_tax);
        (reduced, true)
    } else {
        (wealth_tax, false)
    }
}

/// Final liabilities for every unit.
pub fn assess(
    units: &[TaxUnit],
    bases: &[TaxBase],
    states: &[BehaviorState],
    policy: &TaxPolicy,
) -> Result<Vec<SimulationResult>, AppError> {
    if units.len() != bases.len() || units.len() != states.len() {
        return Err(AppError::shape_mismatch(format!(
            "assess: {} units, {} bases, {} behavior rows.",
            units.len(),
            bases.len(),
            states.len()
        )));
    }

    let rules = &policy.rules;
    let out = units
        .iter()
        .zip(bases)
        .zip(states)
        .map(|((unit, base), state)| {
            let baseline_base = base.exemptions.net_base;
            let counterfactual_base = baseline_base * (1.0 - state.erosion_factor);
            let eroded_base = if state.migrated { 0.0 } else { counterfactual_base };

            let wealth_tax_baseline = policy.wealth_tax(baseline_base, &unit.region);
            let wealth_tax_baseline_eroded = policy.wealth_tax(counterfactual_base, &unit.region);

            let exited = state.dropout || state.migrated;
            let wealth_tax_precap = if exited || policy.is_zero_tax(&unit.region) {
                0.0
            } else {
                policy.wealth_tax(eroded_base, &unit.region)
            };

            let income_tax = policy.income_tax(state.income);
            let (wealth_tax, capped) = apply_joint_cap(wealth_tax_precap, income_tax, state.income, rules);

            SimulationResult {
                unit_id: unit.id,
                household_id: unit.household_id,
                unit_index: unit.unit_index,
                region: unit.region.clone(),
                wealth_rank: unit.wealth_rank,
                band: unit.band,
                total_assets: unit.balance.total_assets,
                debts: unit.balance.debts,
                net_wealth: unit.balance.net_wealth,
                income: state.income,
                adj_real_assets: base.assets.real,
                adj_financial_assets: base.assets.financial,
                adj_business_assets: base.assets.business,
                business_reclass: base.assets.business_reclass,
                adj_total_assets: base.assets.total,
                adj_net_wealth: base.assets.net_wealth,
                personal_exemption: base.exemptions.personal,
                residence_exemption: base.exemptions.residence,
                business_exemption: base.exemptions.business,
                total_exemption: base.exemptions.total(),
                gross_base: base.exemptions.gross_base,
                baseline_base,
                eroded_base,
                erosion_factor: state.erosion_factor,
                dropout_prob: state.dropout_prob,
                dropout: state.dropout,
                migration_prob: state.migration_prob,
                migrated: state.migrated,
                wealth_tax_baseline,
                wealth_tax_baseline_eroded,
                wealth_tax_precap,
                wealth_tax,
                income_tax,
                capped,
                is_taxpayer: base.files,
                final_weight: unit.weight,
            }
        })
        .collect();
    Ok(out)
}
