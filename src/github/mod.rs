//! GitHub module
//!
//! Provides:
//! - The `GithubApi` boundary (comments and check runs)
//! - A reqwest-backed client
//! - Comment reconciliation keyed on an identity marker
//! - Check run publication

mod checks;
mod client;
mod comments;
#[cfg(test)]
pub mod fake;

pub use checks::*;
pub use client::*;
pub use comments::*;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::coverage::Conclusion;

/// A comment on an issue or pull request
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IssueComment {
    pub id: u64,
    #[serde(default)]
    pub body: Option<String>,
}

impl IssueComment {
    pub fn body(&self) -> &str {
        self.body.as_deref().unwrap_or_default()
    }
}

/// Output block of a check run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckRunOutput {
    pub title: String,
    pub summary: String,
    pub text: String,
}

/// Payload for creating a completed check run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckRunRequest {
    pub name: String,
    pub head_sha: String,
    pub status: &'static str,
    pub conclusion: Conclusion,
    pub output: CheckRunOutput,
}

/// Remote operations the publisher relies on.
///
/// Calls are issued one at a time; implementations are never retried.
#[async_trait]
pub trait GithubApi: Send + Sync {
    /// Every comment on the pull request, across all pages
    async fn list_issue_comments(&self, issue_number: u64) -> Result<Vec<IssueComment>>;

    /// Returns the new comment id
    async fn create_issue_comment(&self, issue_number: u64, body: &str) -> Result<u64>;

    /// Overwrites the body, returns the comment id
    async fn update_issue_comment(&self, comment_id: u64, body: &str) -> Result<u64>;

    /// Returns the check run id
    async fn create_check_run(&self, request: &CheckRunRequest) -> Result<u64>;
}
