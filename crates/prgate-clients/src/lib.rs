//! HTTP collaborators for prgate
//!
//! - [`GitHubClient`]: pull-request host (context, comments, commit status)
//! - [`JiraClient`]: ticket tracker
//! - [`ChatCompletionsModel`]: review model over an OpenAI-compatible API
//!
//! Non-2xx responses map onto `CollaboratorError` so the check runner can
//! decide what to retry.

pub mod chat;
pub mod error;
pub mod github;
pub mod jira;

pub use chat::{ChatCompletionsModel, ChatConfig};
pub use error::ClientError;
pub use github::{GitHubClient, GitHubConfig};
pub use jira::{JiraClient, JiraConfig};

pub(crate) const USER_AGENT: &str = concat!("prgate/", env!("CARGO_PKG_VERSION"));
