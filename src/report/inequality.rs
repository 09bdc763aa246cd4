//! Pre/post-tax wealth inequality.

use nalgebra::DVector;
use serde::Serialize;

use crate::domain::SimulationResult;
use crate::math::{weighted_gini, weighted_top_share};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InequalityStats {
    pub units: usize,
    pub gini_pre: Option<f64>,
    pub gini_post: Option<f64>,
    pub top1_pre: Option<f64>,
    pub top1_post: Option<f64>,
    pub top10_pre: Option<f64>,
    pub top10_post: Option<f64>,
}

/// Inequality over units with non-negative adjusted net wealth and positive weight.
/// Post-tax wealth is adjusted net wealth minus wealth tax.
pub fn inequality_stats(results: &[SimulationResult]) -> InequalityStats {
    let kept: Vec<&SimulationResult> = results
        .iter()
        .filter(|r| r.adj_net_wealth >= 0.0 && r.final_weight > 0.0)
        .collect();

    let n = kept.len();
    let pre = DVector::from_iterator(n, kept.iter().map(|r| r.adj_net_wealth));
    let post = DVector::from_iterator(n, kept.iter().map(|r| r.adj_net_wealth - r.wealth_tax));
    let weights = DVector::from_iterator(n, kept.iter().map(|r| r.final_weight));

    let stats = InequalityStats {
        units: n,
        gini_pre: weighted_gini(&pre, &weights),
        gini_post: weighted_gini(&post, &weights),
        top1_pre: weighted_top_share(&pre, &weights, 0.01),
        top1_post: weighted_top_share(&post, &weights, 0.01),
        top10_pre: weighted_top_share(&pre, &weights, 0.10),
        top10_post: weighted_top_share(&post, &weights, 0.10),
    };
    if stats.gini_pre.is_none() {
        tracing::warn!(units = n, "inequality statistics undefined (no positive weighted wealth)");
    }
    stats
}
