//! Jira Cloud ticket lookup.

use async_trait::async_trait;
use prgate_core::{CollaboratorError, CollaboratorResult, TicketInfo, TicketTracker};
use reqwest::header::ACCEPT;
use serde::Deserialize;
use tracing::debug;

use crate::error::{check_status, decode_error, transport, ClientError};
use crate::USER_AGENT;

/// Connection settings for [`JiraClient`].
#[derive(Debug, Clone)]
pub struct JiraConfig {
    pub base_url: String,
    pub user: String,
    pub api_token: String,
}

impl JiraConfig {
    pub fn new(
        base_url: impl Into<String>,
        user: impl Into<String>,
        api_token: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            user: user.into(),
            api_token: api_token.into(),
        }
    }
}

/// Adds `https://` when no scheme is given and drops trailing slashes.
pub fn normalize_base_url(url: &str) -> String {
    let url = url.trim().trim_end_matches('/');
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}

#[derive(Debug, Deserialize)]
struct Issue {
    key: String,
    fields: IssueFields,
}

#[derive(Debug, Default, Deserialize)]
struct IssueFields {
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    status: Option<Named>,
    #[serde(default)]
    project: Option<Project>,
}

#[derive(Debug, Deserialize)]
struct Named {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Project {
    key: String,
}

impl Issue {
    fn into_info(self) -> TicketInfo {
        // Fall back to the key prefix when the project field is hidden.
        let project_key = match self.fields.project {
            Some(project) => project.key,
            None => self.key.split('-').next().unwrap_or_default().to_string(),
        };
        let status = self.fields.status.map(|s| s.name).unwrap_or_default();
        TicketInfo {
            summary: self.fields.summary,
            ..TicketInfo::found(project_key, status)
        }
    }
}

/// [`TicketTracker`] backed by the Jira REST API v3.
#[derive(Clone)]
pub struct JiraClient {
    base_url: String,
    user: String,
    api_token: String,
    http: reqwest::Client,
}

impl std::fmt::Debug for JiraClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JiraClient")
            .field("base_url", &self.base_url)
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

impl JiraClient {
    pub fn new(config: JiraConfig) -> Result<Self, ClientError> {
        if config.base_url.trim().is_empty() {
            return Err(ClientError::Missing("Jira base URL"));
        }
        if config.user.trim().is_empty() {
            return Err(ClientError::Missing("Jira user"));
        }
        if config.api_token.trim().is_empty() {
            return Err(ClientError::Missing("Jira API token"));
        }
        let http = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            base_url: normalize_base_url(&config.base_url),
            user: config.user,
            api_token: config.api_token,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl TicketTracker for JiraClient {
    async fn fetch_ticket(&self, ticket_id: &str) -> CollaboratorResult<TicketInfo> {
        let url = format!("{}/rest/api/3/issue/{}", self.base_url, ticket_id);
        let response = self
            .http
            .get(url)
            .query(&[("fields", "status,project,summary")])
            .basic_auth(&self.user, Some(&self.api_token))
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(transport)?;

        match check_status(response).await {
            Ok(response) => {
                let issue: Issue = response
                    .json()
                    .await
                    .map_err(|e| decode_error("issue", e))?;
                debug!(ticket_id, key = %issue.key, "Fetched ticket");
                Ok(issue.into_info())
            }
            Err(CollaboratorError::Http { status: 404, .. }) => {
                debug!(ticket_id, "Ticket not found");
                Ok(TicketInfo::missing())
            }
            Err(err) => Err(err),
        }
    }

    fn ticket_url(&self, ticket_id: &str) -> Option<String> {
        Some(format!("{}/browse/{}", self.base_url, ticket_id))
    }
}
