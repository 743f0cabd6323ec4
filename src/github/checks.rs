//! GitHub check runs

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::info;

use super::{CheckRunOutput, CheckRunRequest, GithubApi};
use crate::context::TriggerContext;
use crate::coverage::Conclusion;

/// Build the completed check run for a coverage report.
///
/// `markdown` is the full report; check runs are never truncated.
pub fn build_check_run(
    check_name: &str,
    report_name: &str,
    trigger: &TriggerContext,
    conclusion: Conclusion,
    markdown: &str,
    checked_at: DateTime<Utc>,
) -> CheckRunRequest {
    CheckRunRequest {
        name: format!("status check - {}", check_name),
        head_sha: trigger.head_sha().to_string(),
        status: "completed",
        conclusion,
        output: CheckRunOutput {
            title: report_name.to_string(),
            summary: format!(
                "This run completed at `{}`",
                checked_at.format("%a, %d %b %Y %H:%M:%S GMT")
            ),
            text: markdown.to_string(),
        },
    }
}

/// Create the check run, returning its id
pub async fn publish_check_run(api: &dyn GithubApi, request: &CheckRunRequest) -> Result<u64> {
    info!(
        "Creating status check for GitSha: {} ({})",
        request.head_sha, request.conclusion
    );

    let id = api
        .create_check_run(request)
        .await
        .context("An error occurred trying to create the status check")?;

    info!("Created check: {} ({})", request.name, id);
    Ok(id)
}
