//! Markdown report rendering
//!
//! Produces the document shared by the check run, the pull request comment
//! and the persisted results file.

mod truncate;

pub use truncate::*;

use anyhow::{Context, Result};
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use crate::coverage::{CoverageMetric, CoverageVerdict};

fn summary_heading() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)# Summary").expect("regex for summary heading"))
}

/// Render the coverage table followed by the original report in a
/// collapsible block
pub fn render(report_text: &str, verdict: &CoverageVerdict, report_title: &str) -> String {
    let details = summary_heading().replace(report_text, "");

    let mut markdown = String::new();
    markdown.push_str(&format!("# {}\n\n", report_title.trim()));
    markdown.push_str("|Coverage Type|Threshold|Actual Coverage| Status |\n");
    markdown.push_str("|-------------|---------|---------------|--------|\n");
    markdown.push_str(&table_row(&verdict.line, " "));
    markdown.push_str(&table_row(&verdict.branch, ""));
    markdown.push_str("\n### Code Coverage Summary\n");
    markdown.push_str("<details>\n");
    markdown.push_str("<summary>Code Coverage Details</summary>\n\n");
    markdown.push_str(details.trim());
    markdown.push_str("\n</details>");
    markdown
}

fn table_row(metric: &CoverageMetric, badge_padding: &str) -> String {
    format!(
        "|{:<13}|{}%|{}%|{}{}|\n",
        metric.metric.label(),
        metric.threshold,
        metric.actual_coverage,
        metric.badge,
        badge_padding
    )
}

/// Write the full, untruncated report for downstream steps
pub fn write_report(markdown: &str, output_path: &Path) -> Result<()> {
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    fs::write(output_path, markdown)
        .with_context(|| format!("Failed to write results file: {}", output_path.display()))?;
    Ok(())
}
