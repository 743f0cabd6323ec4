//! Step outputs and workflow annotations

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::coverage::CoverageOutcome;

/// Machine-readable results consumed by later workflow steps
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutputs {
    pub coverage_outcome: CoverageOutcome,
    pub status_check_id: Option<u64>,
    pub pr_comment_id: Option<u64>,
    pub coverage_results_truncated: bool,
    pub coverage_results_file_path: Option<PathBuf>,
}

impl RunOutputs {
    /// Outputs of a run that stopped before evaluating anything
    pub fn failed() -> Self {
        Self {
            coverage_outcome: CoverageOutcome::Failed,
            status_check_id: None,
            pr_comment_id: None,
            coverage_results_truncated: false,
            coverage_results_file_path: None,
        }
    }

    /// `(name, value)` pairs, absent values written empty
    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("coverage-outcome", self.coverage_outcome.to_string()),
            (
                "status-check-id",
                self.status_check_id.map(|id| id.to_string()).unwrap_or_default(),
            ),
            (
                "pr-comment-id",
                self.pr_comment_id.map(|id| id.to_string()).unwrap_or_default(),
            ),
            (
                "coverage-results-truncated",
                self.coverage_results_truncated.to_string(),
            ),
            (
                "coverage-results-file-path",
                self.coverage_results_file_path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default(),
            ),
        ]
    }

    /// Lines in the `$GITHUB_OUTPUT` file format
    pub fn to_output_lines(&self) -> String {
        self.pairs()
            .into_iter()
            .map(|(name, value)| format!("{}={}\n", name, value))
            .collect()
    }
}

/// Append outputs to `$GITHUB_OUTPUT`, or log them when running outside Actions
pub fn write_github_output(output_file: Option<&Path>, outputs: &RunOutputs) -> Result<()> {
    match output_file {
        Some(path) => {
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open output file: {}", path.display()))?;
            file.write_all(outputs.to_output_lines().as_bytes())
                .with_context(|| format!("Failed to write output file: {}", path.display()))?;
        }
        None => {
            for (name, value) in outputs.pairs() {
                info!("output {}={}", name, value);
            }
        }
    }
    Ok(())
}

/// Report a failure as a workflow error annotation
pub fn report_failure(message: &str) {
    debug!("failure: {}", message);
    println!("{}", error_annotation(message));
}

fn error_annotation(message: &str) -> String {
    format!("::error::{}", escape_annotation(message))
}

/// Workflow command data must not contain raw newlines or `%`
fn escape_annotation(message: &str) -> String {
    message
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}
