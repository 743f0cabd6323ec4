//! reqwest implementation of [`GithubApi`]

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

use super::{CheckRunRequest, GithubApi, IssueComment};
use crate::context::RepoRef;

const PAGE_SIZE: usize = 100;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const ERROR_BODY_LIMIT: usize = 800;

#[derive(Debug, Deserialize)]
struct CreatedResource {
    id: u64,
}

/// GitHub REST client scoped to one repository
#[derive(Clone)]
pub struct GithubClient {
    http: reqwest::Client,
    api_base: String,
    repo: RepoRef,
}

impl GithubClient {
    pub fn new(api_base: &str, token: &str, repo: RepoRef) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("covpub"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "x-github-api-version",
            reqwest::header::HeaderValue::from_static("2022-11-28"),
        );
        let mut auth = reqwest::header::HeaderValue::from_str(&format!("Bearer {}", token.trim()))
            .context("invalid github authorization header")?;
        auth.set_sensitive(true);
        headers.insert(reqwest::header::AUTHORIZATION, auth);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to create github api client")?;

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            repo,
        })
    }

    fn repo_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.api_base, self.repo.owner, self.repo.name, path
        )
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<T> {
        let response = request
            .send()
            .await
            .with_context(|| format!("github api {operation} request failed"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!(
                "github api {operation} failed with status {}: {}",
                status.as_u16(),
                truncate_for_error(&body, ERROR_BODY_LIMIT)
            );
        }

        response
            .json::<T>()
            .await
            .with_context(|| format!("failed to decode github {operation}"))
    }
}

#[async_trait]
impl GithubApi for GithubClient {
    async fn list_issue_comments(&self, issue_number: u64) -> Result<Vec<IssueComment>> {
        let url = self.repo_url(&format!("issues/{issue_number}/comments"));
        let per_page = PAGE_SIZE.to_string();
        paginate(PAGE_SIZE, |page| {
            let request = self.http.get(&url).query(&[
                ("per_page", per_page.as_str()),
                ("page", page.to_string().as_str()),
            ]);
            async move {
                let chunk: Vec<IssueComment> =
                    self.send_json("list issue comments", request).await?;
                debug!(page, comments = chunk.len(), "listed pull request comments");
                Ok(chunk)
            }
        })
        .await
    }

    async fn create_issue_comment(&self, issue_number: u64, body: &str) -> Result<u64> {
        let created: CreatedResource = self
            .send_json(
                "create issue comment",
                self.http
                    .post(self.repo_url(&format!("issues/{issue_number}/comments")))
                    .json(&json!({ "body": body })),
            )
            .await?;
        Ok(created.id)
    }

    async fn update_issue_comment(&self, comment_id: u64, body: &str) -> Result<u64> {
        let updated: CreatedResource = self
            .send_json(
                "update issue comment",
                self.http
                    .patch(self.repo_url(&format!("issues/comments/{comment_id}")))
                    .json(&json!({ "body": body })),
            )
            .await?;
        Ok(updated.id)
    }

    async fn create_check_run(&self, request: &CheckRunRequest) -> Result<u64> {
        let created: CreatedResource = self
            .send_json(
                "create check run",
                self.http.post(self.repo_url("check-runs")).json(request),
            )
            .await?;
        Ok(created.id)
    }
}

/// Fetch 1-based pages until one comes back short
pub(crate) async fn paginate<T, F, Fut>(page_size: usize, mut fetch_page: F) -> Result<Vec<T>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Vec<T>>>,
{
    let mut page = 1_u32;
    let mut rows = Vec::new();
    loop {
        let chunk = fetch_page(page).await?;
        let chunk_len = chunk.len();
        rows.extend(chunk);
        if chunk_len < page_size {
            break;
        }
        page = page.saturating_add(1);
    }
    Ok(rows)
}

/// Keep error messages readable when GitHub returns a large body
fn truncate_for_error(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(max_chars).collect();
    truncated.push_str("...");
    truncated
}
