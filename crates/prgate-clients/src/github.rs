//! GitHub REST client: pull-request context, issue comments, commit status.

use async_trait::async_trait;
use prgate_core::{
    ChangedFile, CollaboratorResult, CommentAction, CommentPayload, Outcome, PrContext,
    PullRequestHost, Verdict,
};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::error::{check_status, decode_error, transport, ClientError};
use crate::USER_AGENT;

pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Context name shown next to the commit status.
pub const STATUS_CONTEXT: &str = "prgate";

const JSON_MEDIA_TYPE: &str = "application/vnd.github+json";
const DIFF_MEDIA_TYPE: &str = "application/vnd.github.v3.diff";
const API_VERSION: &str = "2022-11-28";
const PER_PAGE: usize = 100;

/// GitHub caps PR file listings at 3000 entries.
const MAX_PAGES: usize = 30;

/// Connection settings for [`GitHubClient`].
#[derive(Debug, Clone)]
pub struct GitHubConfig {
    pub api_url: String,
    /// `owner/name`
    pub repository: String,
    pub token: String,
}

impl GitHubConfig {
    pub fn new(repository: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            repository: repository.into(),
            token: token.into(),
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct PullRequest {
    title: String,
    head: Head,
}

#[derive(Debug, Deserialize)]
struct Head {
    #[serde(rename = "ref")]
    branch: String,
    sha: String,
}

#[derive(Debug, Deserialize)]
struct PullFile {
    filename: String,
    status: String,
    #[serde(default)]
    patch: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IssueComment {
    id: u64,
    #[serde(default)]
    body: Option<String>,
}

/// [`PullRequestHost`] backed by the GitHub REST API.
#[derive(Clone)]
pub struct GitHubClient {
    config: GitHubConfig,
    http: reqwest::Client,
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("api_url", &self.config.api_url)
            .field("repository", &self.config.repository)
            .finish_non_exhaustive()
    }
}

impl GitHubClient {
    pub fn new(config: GitHubConfig) -> Result<Self, ClientError> {
        if config.repository.trim().is_empty() {
            return Err(ClientError::Missing("repository"));
        }
        if config.token.trim().is_empty() {
            return Err(ClientError::Missing("GitHub token"));
        }
        let http = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self { config, http })
    }

    pub fn repository(&self) -> &str {
        &self.config.repository
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}",
            self.config.api_url.trim_end_matches('/'),
            self.config.repository,
            path
        )
    }

    fn authed(&self, request: RequestBuilder, accept: &str) -> RequestBuilder {
        request
            .header(AUTHORIZATION, format!("Bearer {}", self.config.token))
            .header(ACCEPT, accept)
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> CollaboratorResult<T> {
        let request = self.authed(self.http.get(self.url(path)), JSON_MEDIA_TYPE);
        let response = check_status(request.send().await.map_err(transport)?).await?;
        response.json().await.map_err(|e| decode_error(path, e))
    }

    /// Follows `page=` until a short page or the page cap.
    async fn get_paged<T: DeserializeOwned>(&self, path: &str) -> CollaboratorResult<Vec<T>> {
        let mut items = Vec::new();
        for page in 1..=MAX_PAGES {
            let batch: Vec<T> = self
                .get_json(&format!("{path}?per_page={PER_PAGE}&page={page}"))
                .await?;
            let done = batch.len() < PER_PAGE;
            items.extend(batch);
            if done {
                break;
            }
        }
        Ok(items)
    }

    async fn fetch_diff(&self, number: u64) -> CollaboratorResult<String> {
        let path = format!("pulls/{number}");
        let request = self.authed(self.http.get(self.url(&path)), DIFF_MEDIA_TYPE);
        let response = check_status(request.send().await.map_err(transport)?).await?;
        response.text().await.map_err(|e| decode_error(&path, e))
    }

    async fn find_comment(
        &self,
        number: u64,
        payload: &CommentPayload,
    ) -> CollaboratorResult<Option<IssueComment>> {
        let comments: Vec<IssueComment> =
            self.get_paged(&format!("issues/{number}/comments")).await?;
        Ok(comments.into_iter().find(|c| {
            c.body
                .as_deref()
                .is_some_and(|body| payload.matches_key(body))
        }))
    }

    async fn send_body(&self, request: RequestBuilder, body: &str) -> CollaboratorResult<()> {
        let request = self
            .authed(request, JSON_MEDIA_TYPE)
            .json(&json!({ "body": body }));
        check_status(request.send().await.map_err(transport)?).await?;
        Ok(())
    }
}

/// Commit-status `state` for a verdict.
pub fn status_state(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::Approved => "success",
        Outcome::Blocked => "failure",
        Outcome::Indeterminate => "error",
    }
}

fn status_description(verdict: &Verdict) -> String {
    match verdict.outcome {
        Outcome::Approved => "All gate checks passed".to_string(),
        Outcome::Blocked => format!("{} blocking finding(s)", verdict.blocking_reasons.len()),
        Outcome::Indeterminate => "A mandatory check could not complete".to_string(),
    }
}

#[async_trait]
impl PullRequestHost for GitHubClient {
    async fn fetch_context(&self, number: u64) -> CollaboratorResult<PrContext> {
        let pr: PullRequest = self.get_json(&format!("pulls/{number}")).await?;
        let files: Vec<PullFile> = self.get_paged(&format!("pulls/{number}/files")).await?;
        let diff = self.fetch_diff(number).await?;
        debug!(number, files = files.len(), diff_bytes = diff.len(), "Fetched pull request");

        let mut ctx = PrContext::new(pr.head.branch, pr.title)
            .with_number(number)
            .with_diff(diff);
        ctx.head_sha = Some(pr.head.sha);
        ctx.files = files
            .into_iter()
            .map(|f| {
                let mut file = ChangedFile::new(f.filename);
                file.status = f.status;
                file.patch = f.patch;
                file
            })
            .collect();
        Ok(ctx)
    }

    async fn upsert_comment(
        &self,
        number: u64,
        payload: &CommentPayload,
    ) -> CollaboratorResult<CommentAction> {
        match self.find_comment(number, payload).await? {
            Some(existing)
                if existing
                    .body
                    .as_deref()
                    .is_some_and(|body| payload.is_current(body)) =>
            {
                Ok(CommentAction::Unchanged)
            }
            Some(existing) => {
                let url = self.url(&format!("issues/comments/{}", existing.id));
                self.send_body(self.http.patch(url), &payload.body).await?;
                Ok(CommentAction::Updated)
            }
            None => {
                let url = self.url(&format!("issues/{number}/comments"));
                self.send_body(self.http.post(url), &payload.body).await?;
                Ok(CommentAction::Created)
            }
        }
    }

    async fn set_status(&self, head_sha: &str, verdict: &Verdict) -> CollaboratorResult<()> {
        let request = self
            .authed(
                self.http.post(self.url(&format!("statuses/{head_sha}"))),
                JSON_MEDIA_TYPE,
            )
            .json(&json!({
                "state": status_state(verdict.outcome),
                "context": STATUS_CONTEXT,
                "description": status_description(verdict),
            }));
        check_status(request.send().await.map_err(transport)?).await?;
        Ok(())
    }
}
