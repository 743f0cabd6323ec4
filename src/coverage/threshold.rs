//! Coverage threshold validation

use colored::Colorize;

use super::{Conclusion, CoverageMetric, CoverageVerdict, Metric};

/// Badge shown when a threshold is disabled
pub const NOT_APPLICABLE_BADGE: &str = "N/A";

/// Shields.io badge for a final conclusion.
///
/// Only `success` gets the passing badge; neutral shares the failing one.
pub fn badge_for(conclusion: Conclusion) -> String {
    let (text, color) = match conclusion {
        Conclusion::Success => ("PASSED", "brightgreen"),
        Conclusion::Neutral | Conclusion::Failure => ("FAILED", "red"),
    };
    format!("![Generic badge](https://img.shields.io/badge/{}-{}.svg)", text, color)
}

/// Classify one metric against its threshold
pub fn classify(
    metric: Metric,
    actual_coverage: u32,
    threshold: u32,
    ignore_failures: bool,
) -> CoverageMetric {
    if threshold == 0 {
        return CoverageMetric {
            metric,
            threshold,
            actual_coverage,
            conclusion: Conclusion::Neutral,
            badge: NOT_APPLICABLE_BADGE.to_string(),
        };
    }

    let conclusion = if actual_coverage >= threshold {
        Conclusion::Success
    } else if ignore_failures {
        Conclusion::Neutral
    } else {
        Conclusion::Failure
    };

    CoverageMetric {
        metric,
        threshold,
        actual_coverage,
        conclusion,
        badge: badge_for(conclusion),
    }
}

impl CoverageMetric {
    /// Signed distance from the threshold, `None` when disabled
    pub fn delta(&self) -> Option<i64> {
        if self.threshold == 0 {
            None
        } else {
            Some(i64::from(self.actual_coverage) - i64::from(self.threshold))
        }
    }
}

impl CoverageVerdict {
    pub fn print_summary(&self) {
        for metric in self.metrics() {
            let status = match metric.conclusion {
                Conclusion::Success => "✓".green(),
                Conclusion::Neutral => "•".yellow(),
                Conclusion::Failure => "✗".red(),
            };

            match metric.delta() {
                Some(delta) => {
                    let delta_str = if delta >= 0 {
                        format!("+{}%", delta).green()
                    } else {
                        format!("{}%", delta).red()
                    };
                    println!(
                        "  {} {} coverage: {}% (threshold: {}%, {})",
                        status,
                        metric.metric.label(),
                        metric.actual_coverage,
                        metric.threshold,
                        delta_str
                    );
                }
                None => {
                    println!(
                        "  {} {} coverage: {}% ({})",
                        status,
                        metric.metric.label(),
                        metric.actual_coverage,
                        "threshold disabled".dimmed()
                    );
                }
            }
        }
    }
}
