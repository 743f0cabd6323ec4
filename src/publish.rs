//! Publication pipeline
//!
//! load → evaluate → render → persist → check run → governed comment.
//! Each remote step is best-effort: its failure is recorded and the next
//! step still runs.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::{Cli, Config};
use crate::context::RunnerEnv;
use crate::coverage::{evaluate, CoverageOutcome};
use crate::github::{
    build_check_run, publish_check_run, publish_comment, CommentIdentity, CommentOutcome,
    GithubApi, GithubClient,
};
use crate::outputs::{report_failure, write_github_output, RunOutputs};
use crate::report::{limit, render, write_report, MAX_COMMENT_CHARS};

/// Outputs of a completed run plus the best-effort steps that failed
#[derive(Debug, Clone)]
pub struct RunReport {
    pub outputs: RunOutputs,
    pub failures: Vec<String>,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        self.failures.is_empty()
    }

    fn record_failure(&mut self, message: String) {
        report_failure(&message);
        self.failures.push(message);
    }
}

/// Where the full report is persisted for this job and step
pub fn results_file_path(env: &RunnerEnv) -> PathBuf {
    env.results_dir
        .join(format!("coverage-results-{}.md", env.identity.slug()))
}

/// Run the whole pipeline.
///
/// `Err` means the summary file is missing or could not be read, and nothing
/// was published.
pub async fn run(
    config: &Config,
    env: &RunnerEnv,
    api: &dyn GithubApi,
    checked_at: DateTime<Utc>,
) -> Result<RunReport> {
    let summary_file = &config.summary_file;
    if !summary_file.is_file() {
        bail!(
            "The summary file '{}' does not exist. No status check or PR comment will be created.",
            summary_file.display()
        );
    }
    let raw = fs::read(summary_file)
        .with_context(|| format!("Failed to read summary file: {}", summary_file.display()))?;
    // Undecodable bytes become U+FFFD; the markers are ASCII
    let report_text = String::from_utf8_lossy(&raw);

    let mut report = RunReport {
        outputs: RunOutputs::failed(),
        failures: Vec::new(),
    };

    if report_text.is_empty() {
        info!("The summary file does not contain any data. No status check or PR comment will be created.");
        return Ok(report);
    }

    let verdict = evaluate(
        &report_text,
        config.thresholds,
        config.ignore_threshold_failures,
    );
    println!("\n{} {}", "📊".cyan(), config.report_name.bold());
    verdict.print_summary();
    report.outputs.coverage_outcome = verdict.coverage_outcome;

    let markdown = render(&report_text, &verdict, &config.report_name);

    let results_path = results_file_path(env);
    match write_report(&markdown, &results_path) {
        Ok(()) => {
            info!("Coverage results written to {}", results_path.display());
            report.outputs.coverage_results_file_path = Some(results_path);
        }
        Err(e) => report.record_failure(format!("{:#}", e)),
    }

    info!("Check time is: {}", checked_at.to_rfc2822());

    if config.create_status_check {
        let request = build_check_run(
            &config.check_name,
            &config.report_name,
            &env.trigger,
            verdict.status_check_conclusion,
            &markdown,
            checked_at,
        );
        match publish_check_run(api, &request).await {
            Ok(id) => report.outputs.status_check_id = Some(id),
            Err(e) => report.record_failure(format!("{:#}", e)),
        }
    }

    if config.create_pr_comment {
        let identity = CommentIdentity::resolve(config.update_comment_key.as_deref(), &env.identity);
        // The marker line shares the comment size budget
        let budget = MAX_COMMENT_CHARS.saturating_sub(identity.marker().chars().count() + 1);
        let limited = limit(&markdown, budget);
        if limited.truncated {
            info!(
                "The coverage report exceeds {} characters and will be truncated in the PR comment.",
                budget
            );
        }

        match publish_comment(
            api,
            &env.trigger,
            &identity,
            &limited.text,
            config.update_comment_if_one_exists,
        )
        .await
        {
            Ok(CommentOutcome::Skipped) => {}
            Ok(outcome) => {
                report.outputs.pr_comment_id = outcome.comment_id();
                report.outputs.coverage_results_truncated = limited.truncated;
            }
            Err(e) => report.record_failure(format!("{:#}", e)),
        }
    }

    if report.outputs.coverage_outcome == CoverageOutcome::Failed {
        info!("Coverage did not meet the configured thresholds.");
    }

    Ok(report)
}

/// Entry point of the step: resolve inputs, run against GitHub, write outputs.
///
/// Returns whether every publish step succeeded. On any fatal error
/// `coverage-outcome=Failed` is still written before the error is returned.
pub async fn run_from_cli<F>(cli: &Cli, lookup: F, checked_at: DateTime<Utc>) -> Result<bool>
where
    F: Fn(&str) -> Option<String>,
{
    // Both are read before anything else so a bad setup publishes nothing
    let (config, env) = match load_inputs(cli, &lookup) {
        Ok(inputs) => inputs,
        Err(e) => {
            let output_file = lookup("GITHUB_OUTPUT")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from);
            write_github_output(output_file.as_deref(), &RunOutputs::failed())?;
            return Err(e);
        }
    };
    let output_file = env.output_file.as_deref();

    let client = match GithubClient::new(&env.api_url, &config.github_token, env.repo.clone()) {
        Ok(client) => client,
        Err(e) => return fail_with_outputs(output_file, e),
    };

    match run(&config, &env, &client, checked_at).await {
        Ok(report) => {
            write_github_output(output_file, &report.outputs)?;
            Ok(report.succeeded())
        }
        Err(e) => fail_with_outputs(output_file, e),
    }
}

fn load_inputs<F>(cli: &Cli, lookup: F) -> Result<(Config, RunnerEnv)>
where
    F: Fn(&str) -> Option<String>,
{
    let config = Config::from_cli(cli)?;
    let env = RunnerEnv::from_vars(lookup)?;
    Ok((config, env))
}

fn fail_with_outputs(output_file: Option<&Path>, error: anyhow::Error) -> Result<bool> {
    write_github_output(output_file, &RunOutputs::failed())?;
    Err(error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{RepoRef, RunnerIdentity, TriggerContext};
    use crate::coverage::{Conclusion, Thresholds};
    use crate::github::fake::FakeGithub;
    use crate::report::TRUNCATION_CALLOUT;
    use chrono::TimeZone;
    use tempfile::TempDir;

    const SUMMARY: &str = "# Summary\n|||\n|:---|---:|\n| Line coverage: | 82% |\n| Branch coverage: | 55% |\n";

    struct Fixture {
        _temp: TempDir,
        config: Config,
        env: RunnerEnv,
    }

    fn fixture(summary: Option<&str>, trigger: TriggerContext) -> Fixture {
        let temp = TempDir::new().unwrap();
        let summary_file = temp.path().join("SummaryGithub.md");
        if let Some(content) = summary {
            fs::write(&summary_file, content).unwrap();
        }

        let config = Config {
            github_token: "token".to_string(),
            summary_file,
            report_name: "Code Coverage Results".to_string(),
            check_name: "code coverage".to_string(),
            create_status_check: true,
            create_pr_comment: true,
            update_comment_if_one_exists: true,
            update_comment_key: None,
            ignore_threshold_failures: false,
            thresholds: Thresholds { line: 80, branch: 70 },
        };
        let env = RunnerEnv {
            repo: RepoRef {
                owner: "octo-org".to_string(),
                name: "widgets".to_string(),
            },
            api_url: "https://api.github.com".to_string(),
            trigger,
            identity: RunnerIdentity {
                workflow: "CI".to_string(),
                job: "coverage".to_string(),
                action: "__run".to_string(),
            },
            output_file: None,
            results_dir: temp.path().join("results"),
        };

        Fixture {
            _temp: temp,
            config,
            env,
        }
    }

    fn pull_request() -> TriggerContext {
        TriggerContext::PullRequest {
            event_name: "pull_request".to_string(),
            number: 17,
            head_sha: "pr-head".to_string(),
        }
    }

    fn push() -> TriggerContext {
        TriggerContext::Other {
            event_name: "push".to_string(),
            sha: "push-sha".to_string(),
        }
    }

    fn checked_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 21, 20, 21, 48).unwrap()
    }

    #[tokio::test]
    async fn test_pull_request_run_publishes_everything() {
        let f = fixture(Some(SUMMARY), pull_request());
        let api = FakeGithub::new();

        let report = run(&f.config, &f.env, &api, checked_at()).await.unwrap();

        assert!(report.succeeded());
        assert_eq!(report.outputs.coverage_outcome, CoverageOutcome::Failed);
        assert!(!report.outputs.coverage_results_truncated);

        let runs = api.check_runs();
        assert_eq!(runs.len(), 1);
        assert_eq!(report.outputs.status_check_id, Some(runs[0].0));
        assert_eq!(runs[0].1.head_sha, "pr-head");
        assert_eq!(runs[0].1.conclusion, Conclusion::Failure);

        let comments = api.comments(17);
        assert_eq!(comments.len(), 1);
        assert_eq!(report.outputs.pr_comment_id, Some(comments[0].id));
        assert!(comments[0].body().starts_with("<!-- covpub:job-"));
        assert!(comments[0].body().contains("|Branch       |70%|55%|"));

        let path = report.outputs.coverage_results_file_path.unwrap();
        assert_eq!(path, results_file_path(&f.env));
        assert_eq!(fs::read_to_string(path).unwrap(), runs[0].1.output.text);
    }

    #[tokio::test]
    async fn test_rerun_updates_the_same_comment() {
        let f = fixture(Some(SUMMARY), pull_request());
        let api = FakeGithub::new();

        let first = run(&f.config, &f.env, &api, checked_at()).await.unwrap();
        let second = run(&f.config, &f.env, &api, checked_at()).await.unwrap();

        assert_eq!(first.outputs.pr_comment_id, second.outputs.pr_comment_id);
        assert_eq!(api.comments(17).len(), 1);
        assert_eq!(api.check_runs().len(), 2);
    }

    #[tokio::test]
    async fn test_push_run_skips_comment_but_creates_check() {
        let f = fixture(Some(SUMMARY), push());
        let api = FakeGithub::new();

        let report = run(&f.config, &f.env, &api, checked_at()).await.unwrap();

        assert!(report.succeeded());
        assert_eq!(report.outputs.pr_comment_id, None);
        assert_eq!(api.check_runs()[0].1.head_sha, "push-sha");
        assert_eq!(api.call_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_summary_is_fatal() {
        let f = fixture(None, pull_request());
        let api = FakeGithub::new();

        let err = run(&f.config, &f.env, &api, checked_at()).await.unwrap_err();

        assert!(err.to_string().contains("does not exist"));
        assert_eq!(api.call_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_summary_fails_without_publishing() {
        let f = fixture(Some(""), pull_request());
        let api = FakeGithub::new();

        let report = run(&f.config, &f.env, &api, checked_at()).await.unwrap();

        assert!(report.succeeded());
        assert_eq!(report.outputs, RunOutputs::failed());
        assert_eq!(api.call_count(), 0);
    }

    #[tokio::test]
    async fn test_whitespace_only_summary_is_evaluated() {
        let mut f = fixture(Some("\n  \n"), pull_request());
        f.config.thresholds = Thresholds::default();
        let api = FakeGithub::new();

        let report = run(&f.config, &f.env, &api, checked_at()).await.unwrap();

        assert!(report.succeeded());
        assert_eq!(report.outputs.coverage_outcome, CoverageOutcome::Passed);
        assert_eq!(api.check_runs()[0].1.conclusion, Conclusion::Neutral);
        assert_eq!(api.comments(17).len(), 1);
    }

    #[tokio::test]
    async fn test_non_utf8_summary_is_still_published() {
        let f = fixture(None, pull_request());
        let mut bytes = SUMMARY.as_bytes().to_vec();
        bytes.extend_from_slice(b"| C:\\build\\caf\xe9\\Module.cs | 90% |\n");
        fs::write(&f.config.summary_file, bytes).unwrap();
        let api = FakeGithub::new();

        let report = run(&f.config, &f.env, &api, checked_at()).await.unwrap();

        assert!(report.succeeded());
        let runs = api.check_runs();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].1.conclusion, Conclusion::Failure);
        assert!(runs[0].1.output.text.contains("caf\u{FFFD}"));

        let comments = api.comments(17);
        assert_eq!(comments.len(), 1);
        assert!(comments[0].body().contains("|Line         |80%|82%|"));
    }

    #[tokio::test]
    async fn test_check_failure_does_not_block_comment() {
        let f = fixture(Some(SUMMARY), pull_request());
        let api = FakeGithub::new();
        api.fail_checks(true);

        let report = run(&f.config, &f.env, &api, checked_at()).await.unwrap();

        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].contains("status check"));
        assert_eq!(report.outputs.status_check_id, None);
        assert!(report.outputs.pr_comment_id.is_some());
    }

    #[tokio::test]
    async fn test_comment_failure_does_not_block_check() {
        let f = fixture(Some(SUMMARY), pull_request());
        let api = FakeGithub::new();
        api.fail_writes(true);

        let report = run(&f.config, &f.env, &api, checked_at()).await.unwrap();

        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].contains("PR comment"));
        assert!(report.outputs.status_check_id.is_some());
        assert_eq!(report.outputs.pr_comment_id, None);
    }

    #[tokio::test]
    async fn test_oversized_report_truncated_in_comment_only() {
        let mut summary = String::from(SUMMARY);
        summary.push_str(&"| src/module.rs | 100% |\n".repeat(3_000));
        let f = fixture(Some(&summary), pull_request());
        let api = FakeGithub::new();

        let report = run(&f.config, &f.env, &api, checked_at()).await.unwrap();

        assert!(report.outputs.coverage_results_truncated);
        let body = api.comments(17)[0].body().to_string();
        assert!(body.chars().count() <= MAX_COMMENT_CHARS);
        let (marker, rest) = body.split_once('\n').unwrap();
        assert!(marker.starts_with("<!-- covpub:"));
        assert!(rest.starts_with(TRUNCATION_CALLOUT));

        let full = &api.check_runs()[0].1.output.text;
        assert!(full.chars().count() > MAX_COMMENT_CHARS);
        let persisted = fs::read_to_string(report.outputs.coverage_results_file_path.unwrap()).unwrap();
        assert_eq!(&persisted, full);
    }

    #[tokio::test]
    async fn test_publish_paths_can_be_disabled() {
        let mut f = fixture(Some(SUMMARY), pull_request());
        f.config.create_status_check = false;
        f.config.create_pr_comment = false;
        f.config.ignore_threshold_failures = true;
        let api = FakeGithub::new();

        let report = run(&f.config, &f.env, &api, checked_at()).await.unwrap();

        assert_eq!(api.call_count(), 0);
        assert_eq!(report.outputs.coverage_outcome, CoverageOutcome::Passed);
        assert!(report.outputs.coverage_results_file_path.is_some());
    }

    fn vars(output_file: &Path) -> impl Fn(&str) -> Option<String> {
        let output_file = output_file.display().to_string();
        move |name| match name {
            "GITHUB_REPOSITORY" => Some("octo-org/widgets".to_string()),
            "GITHUB_EVENT_NAME" => Some("push".to_string()),
            "GITHUB_SHA" => Some("push-sha".to_string()),
            "GITHUB_OUTPUT" => Some(output_file.clone()),
            _ => None,
        }
    }

    #[tokio::test]
    async fn test_config_error_still_writes_failed_outcome() {
        let temp = TempDir::new().unwrap();
        let output_file = temp.path().join("github_output");
        let cli = Cli {
            summary_file: Some("SummaryGithub.md".to_string()),
            ..Default::default()
        };

        let err = run_from_cli(&cli, vars(&output_file), checked_at())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("github-token"));
        let written = fs::read_to_string(&output_file).unwrap();
        assert_eq!(written, RunOutputs::failed().to_output_lines());
    }

    #[tokio::test]
    async fn test_context_error_still_writes_failed_outcome() {
        let temp = TempDir::new().unwrap();
        let output_file = temp.path().join("github_output");
        let cli = Cli {
            github_token: Some("token".to_string()),
            summary_file: Some("SummaryGithub.md".to_string()),
            ..Default::default()
        };
        let base = vars(&output_file);
        let lookup = |name: &str| match name {
            "GITHUB_REPOSITORY" => Some("widgets".to_string()),
            _ => base(name),
        };

        let err = run_from_cli(&cli, lookup, checked_at()).await.unwrap_err();

        assert!(err.to_string().contains("owner/repo"));
        let written = fs::read_to_string(&output_file).unwrap();
        assert!(written.starts_with("coverage-outcome=Failed\n"));
    }

    #[tokio::test]
    async fn test_missing_summary_from_cli_writes_failed_outcome() {
        let temp = TempDir::new().unwrap();
        let output_file = temp.path().join("github_output");
        let cli = Cli {
            github_token: Some("token".to_string()),
            summary_file: Some(temp.path().join("missing.md").display().to_string()),
            ..Default::default()
        };

        let err = run_from_cli(&cli, vars(&output_file), checked_at())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("does not exist"));
        let written = fs::read_to_string(&output_file).unwrap();
        assert_eq!(written, RunOutputs::failed().to_output_lines());
    }
}
