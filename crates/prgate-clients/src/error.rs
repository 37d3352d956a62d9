//! Error types and HTTP status mapping for prgate-clients

use std::time::Duration;

use prgate_core::CollaboratorError;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Response, StatusCode};
use thiserror::Error;

/// Longest response body kept in an error.
const MAX_ERROR_BODY: usize = 300;

/// Errors constructing a client. Request failures are [`CollaboratorError`]s.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The underlying HTTP client could not be built
    #[error("failed to build HTTP client: {0}")]
    Build(String),

    /// A required setting is empty
    #[error("missing setting: {0}")]
    Missing(&'static str),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Build(err.to_string())
    }
}

/// A request that never produced a response.
pub(crate) fn transport(err: reqwest::Error) -> CollaboratorError {
    CollaboratorError::Transport(err.to_string())
}

/// Pass 2xx responses through; map everything else.
///
/// 401/403 are `Auth`, 429 is `RateLimited` (honouring `Retry-After`
/// seconds), any other status is `Http` with a trimmed body.
pub(crate) async fn check_status(response: Response) -> Result<Response, CollaboratorError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let retry_after = retry_after(response.headers());
    let body = response.text().await.unwrap_or_default();
    Err(map_status(status, retry_after, &body))
}

pub(crate) fn map_status(
    status: StatusCode,
    retry_after: Option<Duration>,
    body: &str,
) -> CollaboratorError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            CollaboratorError::Auth(format!("{status}: {}", trim_body(body)))
        }
        StatusCode::TOO_MANY_REQUESTS => CollaboratorError::RateLimited { retry_after },
        _ => CollaboratorError::Http {
            status: status.as_u16(),
            body: trim_body(body),
        },
    }
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

fn trim_body(body: &str) -> String {
    let body = body.trim();
    if body.chars().count() <= MAX_ERROR_BODY {
        return body.to_string();
    }
    let mut cut: String = body.chars().take(MAX_ERROR_BODY).collect();
    cut.push_str("...");
    cut
}

/// A 2xx body that did not decode into the expected shape.
pub(crate) fn decode_error(what: &str, err: impl std::fmt::Display) -> CollaboratorError {
    CollaboratorError::Transport(format!("invalid {what} response: {err}"))
}
