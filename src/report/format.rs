//! Plain-text report formatting.

use crate::report::{DiagnosticsSummary, RegionPolicyRow, RevenueRow};
use crate::tax::brackets::BracketTable;
use crate::tax::policy::TaxPolicy;

fn fmt_opt(v: Option<f64>, suffix: &str, decimals: usize) -> String {
    match v {
        Some(x) => format!("{x:.decimals$}{suffix}"),
        None => "N/A".to_string(),
    }
}

fn fmt_share(v: Option<f64>) -> String {
    fmt_opt(v.map(|x| x * 100.0), "%", 2)
}

/// Integer money with thousands separators.
pub fn fmt_money(v: f64) -> String {
    if !v.is_finite() {
        return v.to_string();
    }
    let rounded = v.round() as i128;
    let digits = rounded.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if rounded < 0 {
        format!("-{out}")
    } else {
        out
    }
}

fn rule(widths: &[usize]) -> String {
    widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join(" ")
}

/// Full run report: population, calibration, tax, erosion, inequality, tables.
pub fn format_run_summary(s: &DiagnosticsSummary) -> String {
    let mut out = String::new();

    out.push_str("=== wtsim - Wealth Tax Microsimulation ===\n");
    out.push_str(&format!(
        "Seed: {} | households={} | units={}\n",
        s.master_seed, s.households, s.units
    ));
    if !s.fallback_regions.is_empty() {
        out.push_str(&format!("Default schedule used for: {}\n", s.fallback_regions.join(", ")));
    }

    out.push_str("\nCalibration:\n");
    match &s.reweight {
        Some(r) if !r.neutral => out.push_str(&format!(
            "- reweight: {} bins, {} units dropped\n",
            r.scales.len(),
            r.dropped
        )),
        Some(_) => out.push_str("- reweight: neutral (no weighted value)\n"),
        None => out.push_str("- reweight: disabled\n"),
    }
    match &s.tail {
        Some(t) => out.push_str(&format!(
            "- pareto tail: top={} next={} | scalars {} / {}\n",
            t.top_window,
            t.next_window,
            fmt_opt(t.top_scalar, "", 4),
            fmt_opt(t.next_scalar, "", 4)
        )),
        None => out.push_str("- pareto tail: disabled\n"),
    }
    if !s.region_scaling.is_empty() {
        let parts: Vec<String> = s.region_scaling.iter().map(|(r, f)| format!("{r}={f}")).collect();
        out.push_str(&format!("- region scaling: {}\n", parts.join(" ")));
    }
    for t in &s.taxpayer_scaling {
        out.push_str(&format!(
            "- taxpayers {}: target={} simulated={:.1} factor={}\n",
            t.region,
            fmt_money(t.target),
            t.simulated,
            fmt_opt(t.factor, "", 4)
        ));
    }

    out.push_str("\nTax diagnostics:\n");
    out.push_str(&format!("- revenue (taxpayers): {}\n", fmt_money(s.tax.total_revenue)));
    out.push_str(&format!(
        "- declarants: {} (weighted {:.1})\n",
        s.tax.declarants, s.tax.weighted_declarants
    ));
    out.push_str(&format!("- top 1% wealth share among taxpayers: {}\n", fmt_share(s.tax.top1_wealth_share)));
    out.push_str(&format!(
        "- capped={} dropouts={} migrants={}\n",
        s.tax.capped_units, s.tax.dropouts, s.tax.migrants
    ));

    out.push_str("\nBehavioral erosion:\n");
    out.push_str(&format!("- baseline revenue: {}\n", fmt_money(s.erosion.baseline_revenue)));
    out.push_str(&format!("- eroded revenue:   {}\n", fmt_money(s.erosion.eroded_revenue)));
    out.push_str(&format!(
        "- gap: {} ({})\n",
        fmt_money(s.erosion.revenue_gap),
        fmt_opt(s.erosion.revenue_gap_pct, "%", 2)
    ));

    let ineq = &s.inequality;
    out.push_str("\nInequality:\n");
    out.push_str(&format!(
        "- Gini pre/post: {} / {}\n",
        fmt_opt(ineq.gini_pre, "", 4),
        fmt_opt(ineq.gini_post, "", 4)
    ));
    out.push_str(&format!(
        "- top 1% pre/post: {} / {}\n",
        fmt_share(ineq.top1_pre),
        fmt_share(ineq.top1_post)
    ));
    out.push_str(&format!(
        "- top 10% pre/post: {} / {}\n",
        fmt_share(ineq.top10_pre),
        fmt_share(ineq.top10_post)
    ));

    out.push_str("\nRevenue vs observed:\n");
    out.push_str(&format_revenue_table(&s.revenue));
    out.push_str("\nRegional policy comparison:\n");
    out.push_str(&format_region_table(&s.regions));

    out
}

pub fn format_revenue_table(rows: &[RevenueRow]) -> String {
    let widths = [14, 16, 16, 10];
    let mut out = format!(
        "{:<14} {:>16} {:>16} {:>10}\n",
        "region", "simulated", "observed", "gap"
    );
    out.push_str(&rule(&widths));
    out.push('\n');
    for r in rows {
        out.push_str(&format!(
            "{:<14} {:>16} {:>16} {:>10}\n",
            r.region,
            fmt_money(r.simulated_revenue),
            fmt_money(r.observed_revenue),
            fmt_opt(r.gap_pct, "%", 2)
        ));
    }
    out
}

pub fn format_region_table(rows: &[RegionPolicyRow]) -> String {
    let widths = [14, 14, 14, 9, 14, 9, 9, 9, 9];
    let mut out = format!(
        "{:<14} {:>14} {:>14} {:>9} {:>14} {:>9} {:>9} {:>9} {:>9}\n",
        "region", "with_ex", "no_ex", "ex_gap", "reference", "dec_gap", "payers", "etr", "top10"
    );
    out.push_str(&rule(&widths));
    out.push('\n');
    for r in rows {
        out.push_str(&format!(
            "{:<14} {:>14} {:>14} {:>9} {:>14} {:>9} {:>9} {:>9} {:>9}\n",
            r.region,
            fmt_money(r.revenue_with_exemptions),
            fmt_money(r.revenue_no_exemptions),
            fmt_opt(r.exemption_gap_pct, "%", 1),
            fmt_money(r.reference_rule_revenue),
            fmt_opt(r.decentralization_gap_pct, "%", 1),
            r.taxpayers,
            fmt_share(r.avg_taxpayer_etr),
            fmt_share(r.avg_top10_etr)
        ));
    }
    out
}

fn format_brackets(table: &BracketTable) -> String {
    let mut out = String::new();
    for b in table.brackets() {
        let upper = if b.upper.is_finite() { fmt_money(b.upper) } else { "inf".to_string() };
        out.push_str(&format!(
            "  {:>14} - {:>14}  {:>7.4}%\n",
            fmt_money(b.lower),
            upper,
            b.rate * 100.0
        ));
    }
    out
}

/// Validated policy tables (`wtsim policy`).
pub fn format_policy(policy: &TaxPolicy) -> String {
    let mut out = String::new();
    let mut profiles: Vec<_> = policy.region_codes().map(|c| policy.profile(c)).collect();
    profiles.push(policy.default_profile());

    for p in profiles {
        let mut flags = Vec::new();
        if policy.is_zero_tax(&p.code) {
            flags.push("zero-tax");
        }
        if p.code == policy.reference_region() {
            flags.push("reference");
        }
        let flags = if flags.is_empty() { String::new() } else { format!(" [{}]", flags.join(", ")) };
        out.push_str(&format!(
            "{}{flags}: exemption={} scale={}\n",
            p.code,
            fmt_money(p.personal_exemption),
            p.asset_scale
        ));
        out.push_str(&format_brackets(&p.brackets));
    }
    out.push_str("income tax:\n");
    out.push_str(&format_brackets(policy.income_schedule()));
    out
}

/// One-line bracket evaluation (`wtsim tax`).
pub fn format_tax_quote(policy: &TaxPolicy, region: &str, base: f64) -> String {
    let profile = policy.profile(region);
    let tax = profile.brackets.tax(base);
    let average = if base > 0.0 { Some(tax / base) } else { None };
    let mut out = format!(
        "region={} (schedule {}) base={} tax={} average={} marginal={:.4}%",
        region,
        profile.code,
        fmt_money(base),
        fmt_money(tax),
        fmt_share(average),
        profile.brackets.marginal_rate(base) * 100.0
    );
    if policy.is_zero_tax(region) {
        out.push_str(" (zero-tax override applies in simulation)");
    }
    out
}
