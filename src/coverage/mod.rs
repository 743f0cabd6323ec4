//! Coverage module
//!
//! Provides:
//! - Extraction of the line/branch percentages from a summary report
//! - Threshold classification per metric
//! - The aggregated verdict used by the check run and the comment

mod summary;
mod threshold;

pub use summary::*;
pub use threshold::*;

use serde::Serialize;
use std::fmt;

/// Coverage types understood by the evaluator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Line,
    Branch,
}

impl Metric {
    /// Label used both in the summary report marker and in the rendered table
    pub fn label(self) -> &'static str {
        match self {
            Metric::Line => "Line",
            Metric::Branch => "Branch",
        }
    }
}

/// Per-metric and overall conclusion, spelled the way GitHub check runs expect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Conclusion {
    Success,
    Neutral,
    Failure,
}

impl Conclusion {
    pub fn as_str(self) -> &'static str {
        match self {
            Conclusion::Success => "success",
            Conclusion::Neutral => "neutral",
            Conclusion::Failure => "failure",
        }
    }
}

impl fmt::Display for Conclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pipeline-facing outcome. A neutral verdict is a warning, not a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverageOutcome {
    Passed,
    Failed,
}

impl CoverageOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            CoverageOutcome::Passed => "Passed",
            CoverageOutcome::Failed => "Failed",
        }
    }
}

impl fmt::Display for CoverageOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configured thresholds in whole percent. Zero disables a metric.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Thresholds {
    pub line: u32,
    pub branch: u32,
}

/// One evaluated metric
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageMetric {
    pub metric: Metric,
    pub threshold: u32,
    pub actual_coverage: u32,
    pub conclusion: Conclusion,
    pub badge: String,
}

/// Result of evaluating a summary report. Built once by [`evaluate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageVerdict {
    pub line: CoverageMetric,
    pub branch: CoverageMetric,
    pub status_check_conclusion: Conclusion,
    pub coverage_outcome: CoverageOutcome,
}

impl CoverageVerdict {
    pub fn metrics(&self) -> [&CoverageMetric; 2] {
        [&self.line, &self.branch]
    }
}

/// Evaluate a summary report against the configured thresholds
pub fn evaluate(report_text: &str, thresholds: Thresholds, ignore_failures: bool) -> CoverageVerdict {
    let line = classify(
        Metric::Line,
        extract_coverage(report_text, Metric::Line),
        thresholds.line,
        ignore_failures,
    );
    let branch = classify(
        Metric::Branch,
        extract_coverage(report_text, Metric::Branch),
        thresholds.branch,
        ignore_failures,
    );

    let status_check_conclusion = aggregate(line.conclusion, branch.conclusion);
    let coverage_outcome = if status_check_conclusion == Conclusion::Failure {
        CoverageOutcome::Failed
    } else {
        CoverageOutcome::Passed
    };

    CoverageVerdict {
        line,
        branch,
        status_check_conclusion,
        coverage_outcome,
    }
}

fn aggregate(line: Conclusion, branch: Conclusion) -> Conclusion {
    if line == Conclusion::Failure || branch == Conclusion::Failure {
        Conclusion::Failure
    } else if line == Conclusion::Neutral || branch == Conclusion::Neutral {
        Conclusion::Neutral
    } else {
        Conclusion::Success
    }
}
