//! GitHub Actions runner context
//!
//! Everything the run needs from the process environment is read here, once,
//! and handed to the rest of the crate as plain values.

use serde::Deserialize;
use std::env;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_API_URL: &str = "https://api.github.com";

#[derive(Error, Debug)]
pub enum ContextError {
    #[error("{0} not set")]
    MissingVariable(&'static str),

    #[error("GITHUB_REPOSITORY must look like 'owner/repo', got '{0}'")]
    InvalidRepository(String),

    #[error("Failed to read event payload {path}: {source}")]
    EventPayloadRead {
        path: String,
        source: std::io::Error,
    },

    #[error("Event payload for '{event}' has no usable pull_request: {source}")]
    EventPayloadParse {
        event: String,
        source: serde_json::Error,
    },
}

/// Repository the run belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn parse(raw: &str) -> Result<Self, ContextError> {
        let (owner, name) = raw
            .trim()
            .split_once('/')
            .ok_or_else(|| ContextError::InvalidRepository(raw.to_string()))?;
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return Err(ContextError::InvalidRepository(raw.to_string()));
        }
        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }
}

/// What triggered the workflow run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerContext {
    PullRequest {
        event_name: String,
        number: u64,
        head_sha: String,
    },
    Other {
        event_name: String,
        sha: String,
    },
}

#[derive(Debug, Deserialize)]
struct PullRequestPayload {
    pull_request: PullRequestRef,
}

#[derive(Debug, Deserialize)]
struct PullRequestRef {
    number: u64,
    head: HeadRef,
}

#[derive(Debug, Deserialize)]
struct HeadRef {
    sha: String,
}

impl TriggerContext {
    /// Build from the event name, the run SHA and the raw event payload
    pub fn from_event(event_name: &str, sha: &str, payload: &str) -> Result<Self, ContextError> {
        match event_name {
            "pull_request" | "pull_request_target" => {
                let parsed: PullRequestPayload = serde_json::from_str(payload).map_err(|source| {
                    ContextError::EventPayloadParse {
                        event: event_name.to_string(),
                        source,
                    }
                })?;
                Ok(TriggerContext::PullRequest {
                    event_name: event_name.to_string(),
                    number: parsed.pull_request.number,
                    head_sha: parsed.pull_request.head.sha,
                })
            }
            _ => Ok(TriggerContext::Other {
                event_name: event_name.to_string(),
                sha: sha.to_string(),
            }),
        }
    }

    /// Commit a check run attaches to
    pub fn head_sha(&self) -> &str {
        match self {
            TriggerContext::PullRequest { head_sha, .. } => head_sha,
            TriggerContext::Other { sha, .. } => sha,
        }
    }

    pub fn event_name(&self) -> &str {
        match self {
            TriggerContext::PullRequest { event_name, .. }
            | TriggerContext::Other { event_name, .. } => event_name,
        }
    }

    pub fn pull_request_number(&self) -> Option<u64> {
        match self {
            TriggerContext::PullRequest { number, .. } => Some(*number),
            TriggerContext::Other { .. } => None,
        }
    }
}

/// Workflow, job and step the run executes in
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunnerIdentity {
    pub workflow: String,
    pub job: String,
    pub action: String,
}

impl RunnerIdentity {
    /// Filesystem-safe `<job>-<step>` slug
    pub fn slug(&self) -> String {
        let raw = format!("{}-{}", self.job, self.action);
        let mut slug = String::new();
        let mut last_was_sep = true;
        for ch in raw.chars() {
            if ch.is_ascii_alphanumeric() {
                slug.push(ch.to_ascii_lowercase());
                last_was_sep = false;
            } else if !last_was_sep {
                slug.push('-');
                last_was_sep = true;
            }
        }
        let slug = slug.trim_end_matches('-');
        if slug.is_empty() {
            "local".to_string()
        } else {
            slug.to_string()
        }
    }
}

/// Immutable snapshot of the runner environment
#[derive(Debug, Clone)]
pub struct RunnerEnv {
    pub repo: RepoRef,
    pub api_url: String,
    pub trigger: TriggerContext,
    pub identity: RunnerIdentity,
    pub output_file: Option<PathBuf>,
    pub results_dir: PathBuf,
}

impl RunnerEnv {
    pub fn from_env() -> Result<Self, ContextError> {
        Self::from_vars(|name| env::var(name).ok())
    }

    /// Build from any variable lookup; blank values count as unset
    pub fn from_vars<F>(lookup: F) -> Result<Self, ContextError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let repository =
            var("GITHUB_REPOSITORY").ok_or(ContextError::MissingVariable("GITHUB_REPOSITORY"))?;
        let repo = RepoRef::parse(&repository)?;

        let event_name = var("GITHUB_EVENT_NAME").unwrap_or_default();
        let sha = var("GITHUB_SHA").unwrap_or_default();
        let payload = match var("GITHUB_EVENT_PATH") {
            Some(path) => fs::read_to_string(&path)
                .map_err(|source| ContextError::EventPayloadRead { path, source })?,
            None => String::new(),
        };
        let trigger = TriggerContext::from_event(&event_name, &sha, &payload)?;

        Ok(Self {
            repo,
            api_url: var("GITHUB_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            trigger,
            identity: RunnerIdentity {
                workflow: var("GITHUB_WORKFLOW").unwrap_or_default(),
                job: var("GITHUB_JOB").unwrap_or_default(),
                action: var("GITHUB_ACTION").unwrap_or_default(),
            },
            output_file: var("GITHUB_OUTPUT").map(PathBuf::from),
            results_dir: var("RUNNER_TEMP")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
        })
    }
}
