//! Summary report marker extraction
//!
//! The summary format contract is exactly two markers:
//! `Line coverage: | <n>%` and `Branch coverage: | <n>%`, each on one line.
//! Anything else in the report is carried through untouched.

use regex::Regex;
use std::sync::OnceLock;

use super::Metric;

fn line_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"Line coverage:[ \t]*\|[ \t]*(\d+(?:\.\d*)?)[ \t]*%")
            .expect("regex for line coverage")
    })
}

fn branch_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"Branch coverage:[ \t]*\|[ \t]*(\d+(?:\.\d*)?)[ \t]*%")
            .expect("regex for branch coverage")
    })
}

/// Extract the whole-percent coverage for a metric.
///
/// Only the first marker counts. Fractions are dropped (`82.7%` is 82).
/// Returns 0 when the marker is absent or the number doesn't fit.
pub fn extract_coverage(report_text: &str, metric: Metric) -> u32 {
    let pattern = match metric {
        Metric::Line => line_pattern(),
        Metric::Branch => branch_pattern(),
    };

    pattern
        .captures(report_text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().split('.').next())
        .and_then(|whole| whole.parse::<u32>().ok())
        .unwrap_or(0)
}
