//! Pull request comment reconciliation
//!
//! Every published body starts with an HTML comment marker carrying the
//! report identity. Reruns find their own marker and overwrite that comment;
//! reports with other identities on the same pull request are left alone.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use super::GithubApi;
use crate::context::{RunnerIdentity, TriggerContext};

const MARKER_PREFIX: &str = "<!-- covpub:";
const MARKER_SUFFIX: &str = " -->";
const RUNNER_TAG_HEX_CHARS: usize = 12;

/// Stable tag for "this report on this pull request"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentIdentity {
    tag: String,
}

impl CommentIdentity {
    /// Identity from a caller key. `None` when nothing alphanumeric is left.
    pub fn from_key(key: &str) -> Option<Self> {
        let sanitized: String = key.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
        if sanitized.is_empty() {
            None
        } else {
            Some(Self {
                tag: format!("key-{sanitized}"),
            })
        }
    }

    /// Identity derived from the workflow, job and step running the report
    pub fn from_runner(identity: &RunnerIdentity) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(identity.workflow.as_bytes());
        hasher.update([0u8]);
        hasher.update(identity.job.as_bytes());
        hasher.update([0u8]);
        hasher.update(identity.action.as_bytes());
        let digest = hex::encode(hasher.finalize());
        Self {
            tag: format!("job-{}", &digest[..RUNNER_TAG_HEX_CHARS]),
        }
    }

    /// Caller key when usable, runner identity otherwise
    pub fn resolve(key: Option<&str>, runner: &RunnerIdentity) -> Self {
        key.and_then(Self::from_key)
            .unwrap_or_else(|| Self::from_runner(runner))
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Invisible first line of every published body
    pub fn marker(&self) -> String {
        format!("{MARKER_PREFIX}{}{MARKER_SUFFIX}", self.tag)
    }

    pub fn matches(&self, body: &str) -> bool {
        body.starts_with(&self.marker())
    }

    /// Marker line followed by the report
    pub fn tagged_body(&self, markdown: &str) -> String {
        format!("{}\n{}", self.marker(), markdown)
    }
}

/// What [`publish_comment`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentOutcome {
    Created(u64),
    Updated(u64),
    /// The run was not triggered by a pull request
    Skipped,
}

impl CommentOutcome {
    pub fn comment_id(self) -> Option<u64> {
        match self {
            CommentOutcome::Created(id) | CommentOutcome::Updated(id) => Some(id),
            CommentOutcome::Skipped => None,
        }
    }
}

/// Create the report comment, or overwrite the one a previous run left.
///
/// Listing and writing are separate calls, so a concurrent run can still
/// slip a comment in between; the next rerun converges on the first match.
pub async fn publish_comment(
    api: &dyn GithubApi,
    trigger: &TriggerContext,
    identity: &CommentIdentity,
    markdown: &str,
    update_if_exists: bool,
) -> Result<CommentOutcome> {
    let Some(issue_number) = trigger.pull_request_number() else {
        info!(
            event = %trigger.event_name(),
            "This event was not triggered by a pull request. No comment will be created or updated."
        );
        return Ok(CommentOutcome::Skipped);
    };

    let body = identity.tagged_body(markdown);

    let existing = if update_if_exists {
        info!("Checking for existing comment on PR #{}...", issue_number);
        find_existing_comment(api, issue_number, identity).await
    } else {
        None
    };

    match existing {
        Some(comment_id) => {
            info!("Updating existing PR comment {}...", comment_id);
            let id = api
                .update_issue_comment(comment_id, &body)
                .await
                .context("An error occurred trying to update the PR comment")?;
            info!("PR comment was updated. ID: {}.", id);
            Ok(CommentOutcome::Updated(id))
        }
        None => {
            info!("Creating a new PR comment...");
            let id = api
                .create_issue_comment(issue_number, &body)
                .await
                .context("An error occurred trying to create the PR comment")?;
            info!("PR comment was created. ID: {}.", id);
            Ok(CommentOutcome::Created(id))
        }
    }
}

/// First comment carrying the identity marker. Listing failures fall back to
/// creating a new comment.
async fn find_existing_comment(
    api: &dyn GithubApi,
    issue_number: u64,
    identity: &CommentIdentity,
) -> Option<u64> {
    let comments = match api.list_issue_comments(issue_number).await {
        Ok(comments) => comments,
        Err(e) => {
            warn!(
                "Failed to list PR comments: {:#}. A new comment will be created.",
                e
            );
            return None;
        }
    };

    if comments.is_empty() {
        info!("There are no comments on the PR. A new comment will be created.");
        return None;
    }

    match comments.iter().find(|c| identity.matches(c.body())) {
        Some(comment) => {
            info!(
                "An existing code coverage summary comment ({}) was found and will be updated.",
                comment.id
            );
            Some(comment.id)
        }
        None => {
            info!(
                "No comment tagged '{}' was found. A new comment will be created.",
                identity.tag()
            );
            None
        }
    }
}
