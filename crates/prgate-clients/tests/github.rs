//! GitHubClient against a mock GitHub API.

use prgate_clients::{GitHubClient, GitHubConfig};
use prgate_core::{
    CheckKind, CheckResult, CollaboratorError, CommentAction, CommentPayload, DecisionEngine,
    PullRequestHost,
};
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DIFF: &str = "diff --git a/src/a.rs b/src/a.rs\n--- a/src/a.rs\n+++ b/src/a.rs\n@@ -0,0 +1 @@\n+fn a() {}\n";

fn client(server: &MockServer) -> GitHubClient {
    GitHubClient::new(GitHubConfig::new("acme/app", "gh-token").with_api_url(server.uri())).unwrap()
}

fn file(i: usize) -> Value {
    json!({ "filename": format!("src/f{i}.rs"), "status": "modified", "patch": "@@ -1 +1 @@\n+x" })
}

async fn mount_pull(server: &MockServer, files_page_1: Vec<Value>, files_page_2: Option<Vec<Value>>) {
    Mock::given(method("GET"))
        .and(path("/repos/acme/app/pulls/7"))
        .and(header("accept", "application/vnd.github+json"))
        .and(header("authorization", "Bearer gh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "title": "PROJ-42 login",
            "head": { "ref": "feature/PROJ-42-login", "sha": "abc123" }
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/app/pulls/7"))
        .and(header("accept", "application/vnd.github.v3.diff"))
        .respond_with(ResponseTemplate::new(200).set_body_string(DIFF))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/app/pulls/7/files"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(files_page_1))
        .mount(server)
        .await;
    if let Some(page) = files_page_2 {
        Mock::given(method("GET"))
            .and(path("/repos/acme/app/pulls/7/files"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page))
            .mount(server)
            .await;
    }
}

async fn mount_comments(server: &MockServer, comments: Value) {
    Mock::given(method("GET"))
        .and(path("/repos/acme/app/issues/7/comments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(comments))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_fetch_context_assembles_pull_request() {
    let server = MockServer::start().await;
    mount_pull(&server, vec![file(0)], None).await;

    let ctx = client(&server).fetch_context(7).await.unwrap();
    assert_eq!(ctx.number, Some(7));
    assert_eq!(ctx.branch, "feature/PROJ-42-login");
    assert_eq!(ctx.title, "PROJ-42 login");
    assert_eq!(ctx.head_sha.as_deref(), Some("abc123"));
    assert_eq!(ctx.diff, DIFF);
    assert_eq!(ctx.files.len(), 1);
    assert_eq!(ctx.files[0].path, "src/f0.rs");
    assert!(ctx.files[0].patch.is_some());
}

#[tokio::test]
async fn test_file_listing_follows_pages() {
    let server = MockServer::start().await;
    mount_pull(&server, (0..100).map(file).collect(), Some(vec![file(100)])).await;

    let ctx = client(&server).fetch_context(7).await.unwrap();
    assert_eq!(ctx.files.len(), 101);
    assert_eq!(ctx.files[100].path, "src/f100.rs");
}

#[tokio::test]
async fn test_missing_pull_request_is_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/app/pulls/9"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
        .mount(&server)
        .await;

    let err = client(&server).fetch_context(9).await.unwrap_err();
    assert_eq!(
        err,
        CollaboratorError::Http {
            status: 404,
            body: "Not Found".to_string()
        }
    );
    assert!(!err.is_transient());
}

#[tokio::test]
async fn test_bad_token_is_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Bad credentials"))
        .mount(&server)
        .await;

    let err = client(&server).fetch_context(7).await.unwrap_err();
    assert!(matches!(err, CollaboratorError::Auth(msg) if msg.contains("Bad credentials")));
}

#[tokio::test]
async fn test_upsert_creates_missing_comment() {
    let server = MockServer::start().await;
    mount_comments(&server, json!([{ "id": 1, "body": "LGTM" }])).await;
    let payload = CommentPayload::for_check(CheckKind::SecretScan, "No problems found.");
    Mock::given(method("POST"))
        .and(path("/repos/acme/app/issues/7/comments"))
        .and(body_partial_json(json!({ "body": payload.body })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 2 })))
        .expect(1)
        .mount(&server)
        .await;

    let action = client(&server).upsert_comment(7, &payload).await.unwrap();
    assert_eq!(action, CommentAction::Created);
}

#[tokio::test]
async fn test_upsert_edits_stale_comment() {
    let server = MockServer::start().await;
    let stale = CommentPayload::for_check(CheckKind::SecretScan, "1 secret found");
    let fresh = CommentPayload::for_check(CheckKind::SecretScan, "No problems found.");
    mount_comments(&server, json!([{ "id": 55, "body": stale.body }])).await;
    Mock::given(method("PATCH"))
        .and(path("/repos/acme/app/issues/comments/55"))
        .and(body_partial_json(json!({ "body": fresh.body })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 55 })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let action = client(&server).upsert_comment(7, &fresh).await.unwrap();
    assert_eq!(action, CommentAction::Updated);
}

#[tokio::test]
async fn test_upsert_leaves_identical_comment_alone() {
    let server = MockServer::start().await;
    let payload = CommentPayload::summary("## Gate verdict: APPROVED");
    mount_comments(&server, json!([{ "id": 8, "body": payload.body }])).await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let action = client(&server).upsert_comment(7, &payload).await.unwrap();
    assert_eq!(action, CommentAction::Unchanged);
}

#[tokio::test]
async fn test_set_status_maps_verdict() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/repos/acme/app/statuses/abc123"))
        .and(body_partial_json(json!({ "state": "success", "context": "prgate" })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let results: Vec<CheckResult> = CheckKind::ALL.into_iter().map(CheckResult::pass).collect();
    let verdict = DecisionEngine::default().evaluate(&results);
    client(&server).set_status("abc123", &verdict).await.unwrap();
}

#[tokio::test]
async fn test_rate_limit_carries_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "3"))
        .mount(&server)
        .await;

    let results = vec![CheckResult::error(CheckKind::SecretScan, "boom")];
    let verdict = DecisionEngine::default().evaluate(&results);
    let err = client(&server).set_status("abc123", &verdict).await.unwrap_err();
    assert_eq!(err.retry_after(), Some(std::time::Duration::from_secs(3)));
    assert!(err.is_transient());
}
