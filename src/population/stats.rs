//! Pivot the long statistics table into one `WealthGroupStats` per band.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::domain::{AssetRatios, ElementMap, StatRow, WealthBand, WealthGroupStats};
use crate::error::AppError;

/// Reference statistics keyed by band. Always contains all five bands.
pub type GroupStats = BTreeMap<WealthBand, WealthGroupStats>;

/// Build per-band reference statistics from cleaned `{category, element, statistic, value}` rows.
///
/// - only rows whose statistic matches `elements.statistic` are used
/// - unknown categories are ignored
/// - duplicate `(band, element)` rows are averaged
pub fn build_group_stats(rows: &[StatRow], elements: &ElementMap) -> Result<GroupStats, AppError> {
    // (band, element) -> (sum, count)
    let mut cells: HashMap<(WealthBand, String), (f64, usize)> = HashMap::new();
    let mut seen_elements: HashSet<String> = HashSet::new();
    let mut skipped_categories = 0usize;

    for row in rows {
        if !row.statistic.trim().eq_ignore_ascii_case(&elements.statistic) {
            continue;
        }
        let Some(band) = WealthBand::from_label(&row.category) else {
            skipped_categories += 1;
            continue;
        };
        if !row.value.is_finite() {
            continue;
        }
        let element = row.element.trim().to_uppercase();
        seen_elements.insert(element.clone());
        let cell = cells.entry((band, element)).or_insert((0.0, 0));
        cell.0 += row.value;
        cell.1 += 1;
    }
    if skipped_categories > 0 {
        tracing::debug!(rows = skipped_categories, "ignored rows with unknown category");
    }

    for name in elements.real.iter().chain(&elements.financial).chain(&elements.debt) {
        if !seen_elements.contains(&name.to_uppercase()) {
            return Err(AppError::missing_data(format!(
                "Required element '{name}' is absent from the statistics table."
            )));
        }
    }

    let mut out = GroupStats::new();
    for band in WealthBand::ALL {
        if !cells.keys().any(|(b, _)| *b == band) {
            return Err(AppError::missing_data(format!(
                "No statistics rows for band '{}'.",
                band.label()
            )));
        }

        let get = |name: &str| -> Option<f64> {
            cells
                .get(&(band, name.to_uppercase()))
                .map(|(sum, n)| sum / *n as f64)
        };
        let sum_of = |names: &[String]| -> f64 { names.iter().filter_map(|n| get(n)).sum() };

        let real = sum_of(&elements.real);
        let financial = sum_of(&elements.financial);
        let debts = sum_of(&elements.debt);
        let total_assets = real + financial;

        let mean_income = get(&elements.income).unwrap_or_else(|| {
            tracing::warn!(band = band.label(), element = %elements.income, "income element missing, using 0");
            0.0
        });
        let business_assets = get(&elements.business).unwrap_or_else(|| {
            tracing::warn!(band = band.label(), element = %elements.business, "business element missing, using 0");
            0.0
        });

        let ratios = if total_assets > 0.0 {
            AssetRatios {
                real: real / total_assets,
                financial: financial / total_assets,
                business: business_assets / total_assets,
                debt: debts / total_assets,
            }
        } else {
            tracing::warn!(band = band.label(), "band has zero total assets, ratios set to 0");
            AssetRatios::default()
        };

        out.insert(
            band,
            WealthGroupStats {
                band,
                total_assets,
                debts,
                net_wealth: total_assets - debts,
                business_assets,
                mean_income,
                ratios,
            },
        );
    }

    Ok(out)
}
