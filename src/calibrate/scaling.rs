//! Optional per-region asset scaling.

use std::collections::BTreeMap;

use crate::domain::TaxUnit;
use crate::tax::policy::TaxPolicy;

/// Multiply each unit's total assets by its region's `asset_scale` and re-derive the
/// rest of the balance. Returns the factor used per region.
pub fn apply_region_scaling(units: &mut [TaxUnit], policy: &TaxPolicy) -> BTreeMap<String, f64> {
    let mut applied = BTreeMap::new();
    for unit in units.iter_mut() {
        let factor = policy.profile(&unit.region).asset_scale;
        applied.entry(unit.region.clone()).or_insert(factor);
        unit.rescale_assets(unit.balance.total_assets * factor);
    }
    for (region, factor) in &applied {
        tracing::debug!(region = %region, factor, "scaled regional assets");
    }
    applied
}
