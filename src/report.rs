//! Human-facing study report formatting.
//!
//! All numbers are rounded to 3 decimal places. The detailed section for
//! the first replication shows raw coefficients, odds ratios
//! (exponentiated coefficients), implied probabilities (inverse logit of
//! the coefficients), and threshold p-values.

use crate::design::Factor;
use crate::fit::{FittedModel, LinkFunction};
use crate::power::StudyReport;
use crate::stats::inv_logit;

const THRESHOLD_LABELS: [&str; 4] = ["1|2", "2|3", "3|4", "4|5"];

pub fn format_report(report: &StudyReport) -> String {
    let mut out = format_link_frequencies(report);
    out.push('\n');
    out.push_str(&format_power_table(report));
    if let Some(model) = &report.first_selected {
        out.push('\n');
        out.push_str(&format!(
            "First replication (seed {}):\n",
            report.config.base_seed
        ));
        out.push_str(&format_selected_model(model));
    }
    out
}

pub fn format_link_frequencies(report: &StudyReport) -> String {
    let mut out = format!(
        "Selected link frequencies ({} replications):\n",
        report.replications.len()
    );
    for link in LinkFunction::ALL {
        out.push_str(&format!(
            "  {:<10} {:>4}\n",
            link.name(),
            report.link_frequency(link)
        ));
    }
    out
}

pub fn format_power_table(report: &StudyReport) -> String {
    let mut out = format!("Estimated power (alpha = {}):\n", report.config.alpha);
    for factor in Factor::ALL {
        out.push_str(&format!(
            "  {:<12} {:>6.3}\n",
            factor.name(),
            report.power(factor)
        ));
    }
    out
}

pub fn format_selected_model(model: &FittedModel) -> String {
    let mut out = format!("Selected link: {} (AIC = {:.3})\n", model.link, model.aic);
    out.push_str(&format!(
        "  {:<12} {:>8} {:>11} {:>8} {:>8}\n",
        "factor", "coef", "odds.ratio", "prob", "p.value"
    ));
    for factor in Factor::ALL {
        let c = model.coefficient(factor);
        out.push_str(&format!(
            "  {:<12} {:>8.3} {:>11.3} {:>8.3} {:>8.3}\n",
            factor.name(),
            c.estimate,
            c.estimate.exp(),
            inv_logit(c.estimate),
            c.p_value
        ));
    }
    out.push_str(&format!(
        "  {:<12} {:>8} {:>8}\n",
        "threshold", "estimate", "p.value"
    ));
    for (label, t) in THRESHOLD_LABELS.iter().zip(model.thresholds.iter()) {
        out.push_str(&format!(
            "  {:<12} {:>8.3} {:>8.3}\n",
            label, t.estimate, t.p_value
        ));
    }
    out
}
