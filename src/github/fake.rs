//! In-memory [`GithubApi`] for tests

use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;

use super::client::paginate;
use super::{CheckRunRequest, GithubApi, IssueComment};

#[derive(Debug)]
struct State {
    comments: Vec<(u64, IssueComment)>,
    check_runs: Vec<(u64, CheckRunRequest)>,
    next_id: u64,
    page_size: usize,
    pages_served: usize,
    calls: usize,
    fail_listing: bool,
    fail_writes: bool,
    fail_checks: bool,
}

/// Comments and check runs kept in memory, with switches to inject failures
#[derive(Debug)]
pub struct FakeGithub {
    state: Mutex<State>,
}

impl Default for FakeGithub {
    fn default() -> Self {
        Self::with_page_size(100)
    }
}

impl FakeGithub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Listing is served in pages of `page_size`, like the REST API
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            state: Mutex::new(State {
                comments: Vec::new(),
                check_runs: Vec::new(),
                next_id: 1000,
                page_size: page_size.max(1),
                pages_served: 0,
                calls: 0,
                fail_listing: false,
                fail_writes: false,
                fail_checks: false,
            }),
        }
    }

    /// Add a comment without counting it as an API call
    pub fn seed_comment(&self, issue_number: u64, body: &str) -> u64 {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id;
        state.next_id += 1;
        state.comments.push((
            issue_number,
            IssueComment {
                id,
                body: Some(body.to_string()),
            },
        ));
        id
    }

    pub fn comments(&self, issue_number: u64) -> Vec<IssueComment> {
        let state = self.state.lock().unwrap();
        state
            .comments
            .iter()
            .filter(|(issue, _)| *issue == issue_number)
            .map(|(_, comment)| comment.clone())
            .collect()
    }

    pub fn check_runs(&self) -> Vec<(u64, CheckRunRequest)> {
        self.state.lock().unwrap().check_runs.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().unwrap().calls
    }

    pub fn list_pages_served(&self) -> usize {
        self.state.lock().unwrap().pages_served
    }

    pub fn fail_listing(&self, fail: bool) {
        self.state.lock().unwrap().fail_listing = fail;
    }

    pub fn fail_writes(&self, fail: bool) {
        self.state.lock().unwrap().fail_writes = fail;
    }

    pub fn fail_checks(&self, fail: bool) {
        self.state.lock().unwrap().fail_checks = fail;
    }
}

#[async_trait]
impl GithubApi for FakeGithub {
    async fn list_issue_comments(&self, issue_number: u64) -> Result<Vec<IssueComment>> {
        let (all, page_size) = {
            let mut state = self.state.lock().unwrap();
            state.calls += 1;
            if state.fail_listing {
                bail!("github api list issue comments failed with status 502: bad gateway");
            }
            let all: Vec<IssueComment> = state
                .comments
                .iter()
                .filter(|(issue, _)| *issue == issue_number)
                .map(|(_, comment)| comment.clone())
                .collect();
            (all, state.page_size)
        };

        paginate(page_size, |page| {
            self.state.lock().unwrap().pages_served += 1;
            let start = (page as usize - 1) * page_size;
            let chunk: Vec<IssueComment> = all.iter().skip(start).take(page_size).cloned().collect();
            async move { Ok(chunk) }
        })
        .await
    }

    async fn create_issue_comment(&self, issue_number: u64, body: &str) -> Result<u64> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        if state.fail_writes {
            bail!("github api create issue comment failed with status 403: forbidden");
        }
        let id = state.next_id;
        state.next_id += 1;
        state.comments.push((
            issue_number,
            IssueComment {
                id,
                body: Some(body.to_string()),
            },
        ));
        Ok(id)
    }

    async fn update_issue_comment(&self, comment_id: u64, body: &str) -> Result<u64> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        if state.fail_writes {
            bail!("github api update issue comment failed with status 403: forbidden");
        }
        match state
            .comments
            .iter_mut()
            .find(|(_, comment)| comment.id == comment_id)
        {
            Some((_, comment)) => {
                comment.body = Some(body.to_string());
                Ok(comment_id)
            }
            None => bail!("github api update issue comment failed with status 404: not found"),
        }
    }

    async fn create_check_run(&self, request: &CheckRunRequest) -> Result<u64> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        if state.fail_checks {
            bail!("github api create check run failed with status 422: unprocessable");
        }
        let id = state.next_id;
        state.next_id += 1;
        state.check_runs.push((id, request.clone()));
        Ok(id)
    }
}
