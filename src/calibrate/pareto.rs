//! Pareto tail injection.
//!
//! Units are ranked by total assets (descending). Two windows are redrawn:
//!
//! - top 1% (by count): `⌊0.01·n⌋` units
//! - next 9%: the following `⌊0.10·n⌋ − ⌊0.01·n⌋` units
//!
//! Each window gets fresh Lomax(α) draws (a Pareto(1, α) draw shifted down by one, so
//! the support starts at 0 rather than 1), scaled by one scalar so that the window's
//! weighted net wealth equals its target share of the pre-injection aggregate. Debt ratios
//! are untouched; debts, net wealth and asset classes are re-derived for affected units.

use rand::rngs::StdRng;
use rand_distr::{Distribution, Pareto};
use serde::Serialize;

use crate::domain::{TailConfig, TaxUnit};
use crate::error::AppError;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TailReport {
    pub aggregate_net_wealth: f64,
    pub top_window: usize,
    pub next_window: usize,
    /// `None` when the window was skipped.
    pub top_scalar: Option<f64>,
    pub next_scalar: Option<f64>,
}

/// Unit indices by total assets, largest first (ties in input order).
fn descending_order(units: &[TaxUnit]) -> Vec<usize> {
    let mut idx: Vec<usize> = (0..units.len()).collect();
    idx.sort_by(|&a, &b| units[b].balance.total_assets.total_cmp(&units[a].balance.total_assets));
    idx
}

/// Window sizes `(top, next)` for `n` units.
pub fn window_sizes(n: usize) -> (usize, usize) {
    let top = n / 100;
    let top10 = n / 10;
    (top, top10 - top)
}

/// One Lomax draw: `Pareto(1, α) − 1`, support `[0, ∞)`.
fn lomax(dist: &Pareto<f64>, rng: &mut StdRng) -> f64 {
    dist.sample(rng) - 1.0
}

fn redraw_window(
    units: &mut [TaxUnit],
    window: &[usize],
    target_net: f64,
    dist: &Pareto<f64>,
    rng: &mut StdRng,
    label: &str,
) -> Option<f64> {
    if window.is_empty() {
        tracing::warn!(window = label, "tail window is empty, skipped");
        return None;
    }
    let draws: Vec<f64> = window.iter().map(|_| lomax(dist, rng)).collect();
    let denom: f64 = window
        .iter()
        .zip(&draws)
        .map(|(&i, d)| d * (1.0 - units[i].ratios.debt) * units[i].weight)
        .sum();
    if !(denom > 0.0) || !(target_net > 0.0) {
        tracing::warn!(window = label, denom, target_net, "tail window has no positive mass, skipped");
        return None;
    }

    let scalar = target_net / denom;
    for (&i, d) in window.iter().zip(&draws) {
        units[i].rescale_assets(d * scalar);
    }
    Some(scalar)
}

/// Redraw the top 1% and next 9% windows from a heavy-tailed Lomax law, then rescale
/// each window to its target share of aggregate net wealth.
pub fn inject_pareto_tail(units: &mut [TaxUnit], cfg: &TailConfig, rng: &mut StdRng) -> Result<TailReport, AppError> {
    let dist = Pareto::new(1.0, cfg.alpha)
        .map_err(|e| AppError::configuration(format!("Pareto(1, {}) is invalid: {e}", cfg.alpha)))?;

    let aggregate: f64 = units.iter().map(|u| u.balance.net_wealth * u.weight).sum();
    let (top_n, next_n) = window_sizes(units.len());
    let order = descending_order(units);
    let (top, rest) = order.split_at(top_n);
    let next = &rest[..next_n];

    let top_scalar = redraw_window(units, top, cfg.top1_share * aggregate, &dist, rng, "top1");
    let next_target = (cfg.top10_share - cfg.top1_share) * aggregate;
    let next_scalar = redraw_window(units, next, next_target, &dist, rng, "next9");

    tracing::info!(
        top = top_n,
        next = next_n,
        aggregate,
        "injected Pareto tail (alpha={})",
        cfg.alpha
    );

    Ok(TailReport {
        aggregate_net_wealth: aggregate,
        top_window: top_n,
        next_window: next_n,
        top_scalar,
        next_scalar,
    })
}
