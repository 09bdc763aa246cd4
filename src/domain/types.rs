//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory as the population flows through the pipeline
//! - read from the cleaned input tables (CSV)
//! - exported as result rows (CSV/JSON)

use serde::{Deserialize, Serialize};

/// One of the five fixed net-wealth percentile bands.
///
/// Bands are left-closed: `[0,25)`, `[25,50)`, `[50,75)`, `[75,90)`, `[90,100]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WealthBand {
    #[serde(rename = "under 25")]
    Under25,
    #[serde(rename = "between 25 and 50")]
    Between25And50,
    #[serde(rename = "between 50 and 75")]
    Between50And75,
    #[serde(rename = "between 75 and 90")]
    Between75And90,
    #[serde(rename = "between 90 and 100")]
    Between90And100,
}

impl WealthBand {
    pub const ALL: [WealthBand; 5] = [
        WealthBand::Under25,
        WealthBand::Between25And50,
        WealthBand::Between50And75,
        WealthBand::Between75And90,
        WealthBand::Between90And100,
    ];

    /// Category label as it appears in the statistics table.
    pub fn label(self) -> &'static str {
        match self {
            WealthBand::Under25 => "under 25",
            WealthBand::Between25And50 => "between 25 and 50",
            WealthBand::Between50And75 => "between 50 and 75",
            WealthBand::Between75And90 => "between 75 and 90",
            WealthBand::Between90And100 => "between 90 and 100",
        }
    }

    /// Parse a category label (case/whitespace/en-dash tolerant).
    pub fn from_label(raw: &str) -> Option<Self> {
        let norm = raw.trim().replace('\u{2013}', "-").to_lowercase();
        WealthBand::ALL.into_iter().find(|b| b.label() == norm)
    }

    /// Map a wealth rank in `[0, 1]` to its band.
    pub fn from_rank(rank: f64) -> Self {
        if rank < 0.25 {
            WealthBand::Under25
        } else if rank < 0.50 {
            WealthBand::Between25And50
        } else if rank < 0.75 {
            WealthBand::Between50And75
        } else if rank < 0.90 {
            WealthBand::Between75And90
        } else {
            WealthBand::Between90And100
        }
    }
}

/// One cleaned row of the long-format wealth survey table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatRow {
    pub category: String,
    pub element: String,
    pub statistic: String,
    pub value: f64,
}

/// Population share of one region.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionShare {
    pub region: String,
    pub share: f64,
}

/// Observed wealth-tax revenue for one region.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservedRevenue {
    pub region: String,
    pub total_revenue: f64,
}

/// Externally supplied weighted taxpayer count for one region.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxpayerTarget {
    pub region: String,
    pub taxpayers: f64,
}

/// Portfolio composition as fractions of total assets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetRatios {
    pub real: f64,
    pub financial: f64,
    pub business: f64,
    pub debt: f64,
}

/// Reference statistics for one percentile band (read-only after loading).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WealthGroupStats {
    pub band: WealthBand,
    pub total_assets: f64,
    pub debts: f64,
    pub net_wealth: f64,
    pub business_assets: f64,
    pub mean_income: f64,
    pub ratios: AssetRatios,
}

/// Monetary position of a household or tax unit.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Balance {
    pub total_assets: f64,
    pub debts: f64,
    pub net_wealth: f64,
    pub real_assets: f64,
    pub financial_assets: f64,
    pub business_assets: f64,
    pub income: f64,
}

impl Balance {
    /// Derive every asset component from total assets and the portfolio ratios.
    ///
    /// `net_wealth` is always `total_assets - debts`.
    pub fn from_total_assets(total_assets: f64, ratios: &AssetRatios, income: f64) -> Self {
        let debts = total_assets * ratios.debt;
        Self {
            total_assets,
            debts,
            net_wealth: total_assets - debts,
            real_assets: total_assets * ratios.real,
            financial_assets: total_assets * ratios.financial,
            business_assets: total_assets * ratios.business,
            income,
        }
    }

    /// Scale every monetary field by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            total_assets: self.total_assets * factor,
            debts: self.debts * factor,
            net_wealth: self.net_wealth * factor,
            real_assets: self.real_assets * factor,
            financial_assets: self.financial_assets * factor,
            business_assets: self.business_assets * factor,
            income: self.income * factor,
        }
    }
}

/// A synthesized household before unit expansion.
#[derive(Debug, Clone, PartialEq)]
pub struct Household {
    pub id: usize,
    pub region: String,
    pub size: u8,
    pub wealth_rank: f64,
    pub band: WealthBand,
    pub balance: Balance,
    pub ratios: AssetRatios,
    pub weight: f64,
}

/// A tax unit: a whole household or a fraction of a split household.
#[derive(Debug, Clone, PartialEq)]
pub struct TaxUnit {
    pub id: usize,
    pub household_id: usize,
    /// 1-based position of this unit within its household.
    pub unit_index: u8,
    pub split_ratio: f64,
    pub region: String,
    pub household_size: u8,
    pub wealth_rank: f64,
    pub band: WealthBand,
    pub balance: Balance,
    pub ratios: AssetRatios,
    pub weight: f64,
}

impl TaxUnit {
    /// Replace total assets and re-derive debts, net wealth and asset classes.
    ///
    /// Income and ratios are left unchanged.
    pub fn rescale_assets(&mut self, total_assets: f64) {
        self.balance = Balance::from_total_assets(total_assets, &self.ratios, self.balance.income);
    }
}

/// Per-unit output of the tax engine and behavioral module.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationResult {
    pub unit_id: usize,
    pub household_id: usize,
    pub unit_index: u8,
    pub region: String,
    pub wealth_rank: f64,
    pub band: WealthBand,

    pub total_assets: f64,
    pub debts: f64,
    pub net_wealth: f64,
    pub income: f64,

    pub adj_real_assets: f64,
    pub adj_financial_assets: f64,
    pub adj_business_assets: f64,
    pub business_reclass: f64,
    pub adj_total_assets: f64,
    pub adj_net_wealth: f64,

    pub personal_exemption: f64,
    pub residence_exemption: f64,
    pub business_exemption: f64,
    pub total_exemption: f64,
    pub gross_base: f64,
    pub baseline_base: f64,
    pub eroded_base: f64,

    pub erosion_factor: f64,
    pub dropout_prob: f64,
    pub dropout: bool,
    pub migration_prob: f64,
    pub migrated: bool,

    pub wealth_tax_baseline: f64,
    pub wealth_tax_baseline_eroded: f64,
    pub wealth_tax_precap: f64,
    pub wealth_tax: f64,
    pub income_tax: f64,
    pub capped: bool,

    pub is_taxpayer: bool,
    pub final_weight: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_edges_are_left_closed() {
        assert_eq!(WealthBand::from_rank(0.0), WealthBand::Under25);
        assert_eq!(WealthBand::from_rank(0.2499), WealthBand::Under25);
        assert_eq!(WealthBand::from_rank(0.25), WealthBand::Between25And50);
        assert_eq!(WealthBand::from_rank(0.75), WealthBand::Between75And90);
        assert_eq!(WealthBand::from_rank(0.90), WealthBand::Between90And100);
        assert_eq!(WealthBand::from_rank(1.0), WealthBand::Between90And100);
    }

    #[test]
    fn band_labels_parse_loosely() {
        assert_eq!(WealthBand::from_label("  Under 25 "), Some(WealthBand::Under25));
        assert_eq!(
            WealthBand::from_label("BETWEEN 90 AND 100"),
            Some(WealthBand::Between90And100)
        );
        assert_eq!(WealthBand::from_label("90-100"), None);
    }

    #[test]
    fn balance_keeps_accounting_identity() {
        let ratios = AssetRatios {
            real: 0.6,
            financial: 0.3,
            business: 0.1,
            debt: 0.25,
        };
        let b = Balance::from_total_assets(400_000.0, &ratios, 30_000.0);
        assert!((b.net_wealth - (b.total_assets - b.debts)).abs() < 1e-9);
        assert!((b.debts - 100_000.0).abs() < 1e-9);

        let half = b.scaled(0.5);
        assert!((half.net_wealth - 150_000.0).abs() < 1e-9);
        assert!((half.income - 15_000.0).abs() < 1e-9);
    }
}
