//! Terminal formatting of pipeline results.
//!
//! All text output lives here so the fitting code stays free of presentation
//! concerns and output changes stay local.

use crate::domain::{ConditionalQuantileEstimate, FitDiagnostic};
use crate::report::{CoefficientTable, PipelineOutput};

const FEATURE_WIDTH: usize = 28;
const VALUE_WIDTH: usize = 12;

/// Header block: target, horizon, sample windows and overall status.
pub fn format_run_summary(output: &PipelineOutput) -> String {
    let mut out = String::new();

    out.push_str("=== gar - Growth-at-Risk quantile fit ===\n");
    out.push_str(&format!(
        "Target: {} | horizon={} | depvar={}\n",
        output.target,
        output.horizon,
        crate::domain::shifted_target_name(&output.target, output.horizon)
    ));
    out.push_str(&format!(
        "Quantiles: {}\n",
        fmt_levels(output.quantiles.levels())
    ));
    out.push_str(&format!("Regressors: {}\n", output.regressors.len()));
    for reg in &output.regressors {
        let option = reg
            .spec
            .option()
            .map(|k| format!("({k})"))
            .unwrap_or_default();
        out.push_str(&format!(
            "  - {:<width$} {}{option} of {}\n",
            truncate(&reg.name, FEATURE_WIDTH),
            reg.spec.kind().display_name(),
            reg.spec.source,
            width = FEATURE_WIDTH,
        ));
    }

    out.push_str("\nEstimation samples:\n");
    for w in &output.windows {
        let span = match (w.start, w.end) {
            (Some(s), Some(e)) => format!("{s} .. {e}"),
            _ => "-".to_string(),
        };
        out.push_str(&format!("  h={:<3} n={:<5} {span}\n", w.horizon, w.n_obs));
    }

    out.push_str(&format!(
        "\nStatus: {} (code {})\n{}\n",
        output.outcome.status.display_name(),
        output.outcome.diagnostic_code,
        output.status_action
    ));

    out
}

/// Feature × quantile coefficient grid. Missing coefficients print as `NA`.
pub fn format_coefficient_table(table: &CoefficientTable) -> String {
    let mut out = String::new();

    let mut header = format!("{:<width$}", "feature", width = FEATURE_WIDTH);
    for q in &table.quantiles {
        header.push_str(&format!(" {:>width$}", format!("q={q:.2}"), width = VALUE_WIDTH));
    }
    out.push_str(header.trim_end());
    out.push('\n');
    out.push_str(&rule(table.quantiles.len()));

    for (feature, row) in table.features.iter().zip(&table.values) {
        let mut line = format!(
            "{:<width$}",
            truncate(feature, FEATURE_WIDTH),
            width = FEATURE_WIDTH
        );
        for v in row {
            line.push_str(&format!(" {:>width$}", fmt_opt(*v), width = VALUE_WIDTH));
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }

    out
}

/// One line per quantile, in configured order (crossings are shown as fitted).
pub fn format_conditional_quantiles(estimate: &ConditionalQuantileEstimate) -> String {
    let mut out = String::new();
    let date = estimate
        .rows
        .first()
        .and_then(|r| r.date)
        .map(|d| d.to_string())
        .unwrap_or_else(|| "-".to_string());
    out.push_str(&format!("Conditional quantiles (as of {date}):\n"));
    for r in &estimate.rows {
        out.push_str(&format!(
            "  q={:.2} h={:<3} {:>width$}\n",
            r.quantile,
            r.horizon,
            fmt_opt(r.value),
            width = VALUE_WIDTH
        ));
    }
    out
}

/// Per-fit diagnostics, failures included.
pub fn format_diagnostics(diagnostics: &[FitDiagnostic]) -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "{:>6} {:>4} {:>6} {:>6} {:>12} {:<20}",
            "q", "h", "n", "iter", "check_loss", "status"
        )
        .trim_end(),
    );
    out.push('\n');
    for d in diagnostics {
        let line = format!(
            "{:>6.2} {:>4} {:>6} {:>6} {:>12} {:<20}",
            d.quantile,
            d.horizon,
            d.n_obs,
            d.iterations.map(|i| i.to_string()).unwrap_or_else(|| "-".to_string()),
            fmt_opt(d.check_loss),
            d.status,
        );
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

fn rule(n_cols: usize) -> String {
    let width = FEATURE_WIDTH + n_cols * (VALUE_WIDTH + 1);
    format!("{}\n", "-".repeat(width))
}

fn fmt_opt(v: Option<f64>) -> String {
    match v {
        Some(x) => format!("{x:.4}"),
        None => "NA".to_string(),
    }
}

fn fmt_levels(v: &[f64]) -> String {
    let parts: Vec<String> = v.iter().map(|x| format!("{x:.2}")).collect();
    format!("[{}]", parts.join(", "))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}
