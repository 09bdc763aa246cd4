//! Weighted column statistics.
//!
//! All functions take a value column and a weight column of equal length, as
//! `nalgebra::DVector`s, and return `None` when the statistic is undefined
//! (empty input, zero total weight, zero total value).

use nalgebra::DVector;

/// `Σ xᵢ·wᵢ`.
pub fn weighted_sum(values: &DVector<f64>, weights: &DVector<f64>) -> f64 {
    values.dot(weights)
}

/// Indices of `values` sorted ascending, ties kept in input order.
pub fn stable_order(values: &[f64]) -> Vec<usize> {
    let mut idx: Vec<usize> = (0..values.len()).collect();
    idx.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
    idx
}

/// Weighted Gini coefficient via the sorted Lorenz formula:
///
/// ```text
/// G = 1 - 2 · Σ wᵢ (Cᵢ - xᵢwᵢ/2) / (W · C)
/// ```
///
/// where values are sorted ascending, `Cᵢ` is the running weighted value sum, `W` the
/// total weight and `C` the total weighted value.
pub fn weighted_gini(values: &DVector<f64>, weights: &DVector<f64>) -> Option<f64> {
    if values.is_empty() || values.len() != weights.len() {
        return None;
    }
    let total_weight = weights.sum();
    let total_value = weighted_sum(values, weights);
    if !(total_weight > 0.0) || !(total_value > 0.0) {
        return None;
    }

    let order = stable_order(values.as_slice());
    let mut cumulative = 0.0;
    let mut area = 0.0;
    for i in order {
        let xw = values[i] * weights[i];
        cumulative += xw;
        area += weights[i] * (cumulative - xw / 2.0);
    }
    Some(1.0 - 2.0 * area / (total_weight * total_value))
}

/// Weighted share of total value held by the top `p` fraction of total weight.
///
/// Only positive values take part. Units are sorted descending and included while
/// their cumulative weight stays within `p · W`.
pub fn weighted_top_share(values: &DVector<f64>, weights: &DVector<f64>, p: f64) -> Option<f64> {
    if values.len() != weights.len() {
        return None;
    }
    let positive: Vec<usize> = (0..values.len()).filter(|&i| values[i] > 0.0).collect();
    let total_weight: f64 = positive.iter().map(|&i| weights[i]).sum();
    let total_value: f64 = positive.iter().map(|&i| values[i] * weights[i]).sum();
    if !(total_weight > 0.0) || !(total_value > 0.0) {
        return None;
    }

    let mut sorted = positive;
    sorted.sort_by(|&a, &b| values[b].total_cmp(&values[a]));

    let cutoff = p * total_weight;
    let mut cum_weight = 0.0;
    let mut top_value = 0.0;
    for i in sorted {
        cum_weight += weights[i];
        if cum_weight > cutoff {
            break;
        }
        top_value += values[i] * weights[i];
    }
    Some(top_value / total_value)
}
