//! Axum mock standing in for both the GitHub REST API and Ollama.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use mcp_security_review::config::{ModelConfig, ReviewConfig};
use serde_json::{json, Value};

pub const GOOD_TOKEN: &str = "ghp_good";
pub const OWNER: &str = "octo";
pub const REPO: &str = "widgets";

pub const FINDINGS: &str = "Hardcoded credential in src/config.rs";
pub const COMMENT: &str = "Security review: hardcoded credential found. Do not merge.";

#[derive(Default)]
pub struct MockState {
    pub open_pulls: Vec<u64>,
    pub requests: Mutex<Vec<String>>,
    pub comments: Mutex<Vec<(u64, String)>>,
    pub chat_prompts: Mutex<Vec<String>>,
    next_comment_id: AtomicU64,
}

impl MockState {
    fn record(&self, what: String) {
        self.requests.lock().unwrap().push(what);
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

pub struct MockUpstream {
    pub addr: SocketAddr,
    pub state: Arc<MockState>,
}

impl MockUpstream {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Review configuration pointing both GitHub and Ollama at this mock.
    pub fn review_config(&self) -> ReviewConfig {
        ReviewConfig {
            model: ModelConfig {
                base_url: self.url(),
                ..ModelConfig::default()
            },
            github_api_url: Some(self.url()),
            ..ReviewConfig::default()
        }
    }
}

pub async fn spawn_upstream(open_pulls: &[u64]) -> MockUpstream {
    let state = Arc::new(MockState {
        open_pulls: open_pulls.to_vec(),
        next_comment_id: AtomicU64::new(5000),
        ..Default::default()
    });

    let app = Router::new()
        .route("/repos/{owner}/{repo}/pulls", get(list_pulls))
        .route("/repos/{owner}/{repo}/pulls/{number}", get(get_pull))
        .route("/repos/{owner}/{repo}/pulls/{number}/files", get(pull_files))
        .route(
            "/repos/{owner}/{repo}/issues/{number}/comments",
            post(create_comment),
        )
        .route("/api/chat", post(chat))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

    MockUpstream { addr, state }
}

/// An Ollama stand-in whose chat endpoint always fails with `status`.
pub async fn spawn_failing_chat(status: StatusCode) -> String {
    let app = Router::new().route(
        "/api/chat",
        post(move || async move { (status, Json(json!({"error": "model crashed"}))) }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    format!("http://{}", addr)
}

type Reply = (StatusCode, Json<Value>);

fn github_error(status: StatusCode, message: &str) -> Reply {
    (
        status,
        Json(json!({
            "message": message,
            "documentation_url": "https://docs.github.com/rest",
        })),
    )
}

fn check(headers: &HeaderMap, owner: &str, repo: &str) -> Result<(), Reply> {
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.ends_with(GOOD_TOKEN));
    if !authorized {
        return Err(github_error(StatusCode::UNAUTHORIZED, "Bad credentials"));
    }
    if owner != OWNER || repo != REPO {
        return Err(github_error(StatusCode::NOT_FOUND, "Not Found"));
    }
    Ok(())
}

async fn list_pulls(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Path((owner, repo)): Path<(String, String)>,
) -> Reply {
    if let Err(reply) = check(&headers, &owner, &repo) {
        return reply;
    }
    state.record(format!("GET /repos/{}/{}/pulls", owner, repo));

    // Creation order is not number order on purpose.
    let pulls: Vec<Value> = state
        .open_pulls
        .iter()
        .map(|n| json!({"number": n, "title": format!("Change {}", n), "state": "open"}))
        .collect();
    (StatusCode::OK, Json(Value::Array(pulls)))
}

async fn get_pull(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Path((owner, repo, number)): Path<(String, String, u64)>,
) -> Reply {
    if let Err(reply) = check(&headers, &owner, &repo) {
        return reply;
    }
    state.record(format!("GET /repos/{}/{}/pulls/{}", owner, repo, number));
    if !state.open_pulls.contains(&number) {
        return github_error(StatusCode::NOT_FOUND, "Not Found");
    }
    (
        StatusCode::OK,
        Json(json!({
            "number": number,
            "title": format!("Change {}", number),
            "state": "open",
            "user": {"login": "dev"},
            "head": {"ref": "feature/config"},
            "base": {"ref": "main"},
            "body": "Adds a config loader",
        })),
    )
}

async fn pull_files(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Path((owner, repo, number)): Path<(String, String, u64)>,
) -> Reply {
    if let Err(reply) = check(&headers, &owner, &repo) {
        return reply;
    }
    state.record(format!("GET /repos/{}/{}/pulls/{}/files", owner, repo, number));
    if !state.open_pulls.contains(&number) {
        return github_error(StatusCode::NOT_FOUND, "Not Found");
    }
    (
        StatusCode::OK,
        Json(json!([{
            "filename": "src/config.rs",
            "status": "modified",
            "additions": 1,
            "deletions": 0,
            "patch": "@@ -1 +1,2 @@\n+const API_TOKEN: &str = \"hunter2\";",
        }])),
    )
}

async fn create_comment(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Path((owner, repo, number)): Path<(String, String, u64)>,
    Json(body): Json<Value>,
) -> Reply {
    if let Err(reply) = check(&headers, &owner, &repo) {
        return reply;
    }
    state.record(format!(
        "POST /repos/{}/{}/issues/{}/comments",
        owner, repo, number
    ));
    let text = body.get("body").and_then(Value::as_str).unwrap_or("").to_string();
    state.comments.lock().unwrap().push((number, text.clone()));
    let id = state.next_comment_id.fetch_add(1, Ordering::SeqCst);
    (
        StatusCode::CREATED,
        Json(json!({
            "id": id,
            "body": text,
            "created_at": "2026-10-16T12:00:00Z",
            "html_url": format!("https://github.com/{}/{}/pull/{}#issuecomment-{}", owner, repo, number, id),
            "user": {"login": "review-bot"},
        })),
    )
}

async fn chat(State(state): State<Arc<MockState>>, Json(request): Json<Value>) -> Reply {
    let prompt = request
        .pointer("/messages/1/content")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();
    let answer = if prompt.contains("Goal:") {
        format!("<think>drafting the comment</think>\n{}", COMMENT)
    } else {
        format!("<think>reading the diff</think>\n{}", FINDINGS)
    };
    state.chat_prompts.lock().unwrap().push(prompt);
    (
        StatusCode::OK,
        Json(json!({
            "model": request.get("model"),
            "message": {"role": "assistant", "content": answer},
            "done": true,
        })),
    )
}
