use clap::Parser;
use std::path::PathBuf;
use thiserror::Error;

use crate::coverage::Thresholds;

pub const DEFAULT_REPORT_NAME: &str = "Code Coverage Results";
pub const DEFAULT_CHECK_NAME: &str = "code coverage";

/// Errors raised while turning raw inputs into a [`Config`]
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// A required input was absent or blank
    #[error("Input required and not supplied: {0}")]
    MissingInput(&'static str),

    /// A boolean input outside the Actions boolean grammar
    #[error("Input '{input}' is not a boolean (true|True|TRUE|false|False|FALSE): '{value}'")]
    InvalidBoolean { input: &'static str, value: String },

    /// A threshold that is not a whole percentage
    #[error("Input '{input}' must be a whole number percentage, got '{value}'")]
    InvalidThreshold { input: &'static str, value: String },
}

/// Raw inputs. Each flag falls back to the `INPUT_*` variable the Actions
/// runner sets for `with:` values.
#[derive(Parser, Debug, Default)]
#[command(name = "covpub")]
#[command(about = "Evaluate a code coverage summary and publish it to GitHub")]
#[command(version)]
pub struct Cli {
    /// Token used for the GitHub API
    #[arg(long, env = "INPUT_GITHUB-TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// Markdown coverage summary to evaluate
    #[arg(long, env = "INPUT_SUMMARY-FILE")]
    pub summary_file: Option<String>,

    /// Title of the rendered report
    #[arg(long, env = "INPUT_REPORT-NAME")]
    pub report_name: Option<String>,

    /// Name of the status check
    #[arg(long, env = "INPUT_CHECK-NAME")]
    pub check_name: Option<String>,

    #[arg(long, env = "INPUT_CREATE-STATUS-CHECK")]
    pub create_status_check: Option<String>,

    #[arg(long, env = "INPUT_CREATE-PR-COMMENT")]
    pub create_pr_comment: Option<String>,

    #[arg(long, env = "INPUT_UPDATE-COMMENT-IF-ONE-EXISTS")]
    pub update_comment_if_one_exists: Option<String>,

    /// Distinguishes comments of different reports on the same pull request
    #[arg(long, env = "INPUT_UPDATE-COMMENT-KEY")]
    pub update_comment_key: Option<String>,

    /// Report threshold failures as neutral instead of failing
    #[arg(long, env = "INPUT_IGNORE-THRESHOLD-FAILURES")]
    pub ignore_threshold_failures: Option<String>,

    /// Minimum line coverage percentage, 0 disables the check
    #[arg(long, env = "INPUT_LINE-THRESHOLD")]
    pub line_threshold: Option<String>,

    /// Minimum branch coverage percentage, 0 disables the check
    #[arg(long, env = "INPUT_BRANCH-THRESHOLD")]
    pub branch_threshold: Option<String>,
}

/// Validated configuration for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub github_token: String,
    pub summary_file: PathBuf,
    pub report_name: String,
    pub check_name: String,
    pub create_status_check: bool,
    pub create_pr_comment: bool,
    pub update_comment_if_one_exists: bool,
    pub update_comment_key: Option<String>,
    pub ignore_threshold_failures: bool,
    pub thresholds: Thresholds,
}

impl Config {
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let github_token = required("github-token", &cli.github_token)?;
        let summary_file = PathBuf::from(required("summary-file", &cli.summary_file)?);

        Ok(Self {
            github_token,
            summary_file,
            report_name: optional(&cli.report_name)
                .unwrap_or_else(|| DEFAULT_REPORT_NAME.to_string()),
            check_name: optional(&cli.check_name).unwrap_or_else(|| DEFAULT_CHECK_NAME.to_string()),
            create_status_check: boolean("create-status-check", &cli.create_status_check, true)?,
            create_pr_comment: boolean("create-pr-comment", &cli.create_pr_comment, true)?,
            update_comment_if_one_exists: boolean(
                "update-comment-if-one-exists",
                &cli.update_comment_if_one_exists,
                true,
            )?,
            update_comment_key: optional(&cli.update_comment_key),
            ignore_threshold_failures: boolean(
                "ignore-threshold-failures",
                &cli.ignore_threshold_failures,
                false,
            )?,
            thresholds: Thresholds {
                line: threshold("line-threshold", &cli.line_threshold)?,
                branch: threshold("branch-threshold", &cli.branch_threshold)?,
            },
        })
    }
}

/// Trimmed value, treating blank as absent
fn optional(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn required(input: &'static str, value: &Option<String>) -> Result<String, ConfigError> {
    optional(value).ok_or(ConfigError::MissingInput(input))
}

fn boolean(input: &'static str, value: &Option<String>, default: bool) -> Result<bool, ConfigError> {
    match optional(value).as_deref() {
        None => Ok(default),
        Some("true" | "True" | "TRUE") => Ok(true),
        Some("false" | "False" | "FALSE") => Ok(false),
        Some(other) => Err(ConfigError::InvalidBoolean {
            input,
            value: other.to_string(),
        }),
    }
}

fn threshold(input: &'static str, value: &Option<String>) -> Result<u32, ConfigError> {
    match optional(value) {
        None => Ok(0),
        Some(raw) => raw.parse::<u32>().map_err(|_| ConfigError::InvalidThreshold {
            input,
            value: raw,
        }),
    }
}
