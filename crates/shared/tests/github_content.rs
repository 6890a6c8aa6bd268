use std::collections::VecDeque;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::{Value, json};
use shared::github::{GithubContentClient, GithubError, RepoConfig};
use tokio::net::TcpListener;
use tokio::sync::{Mutex, oneshot};

#[derive(Debug, Clone)]
struct MockReply {
    status: StatusCode,
    body: Value,
}

#[derive(Debug, Clone)]
struct TestServerState {
    get_replies: Arc<Mutex<VecDeque<MockReply>>>,
    put_replies: Arc<Mutex<VecDeque<MockReply>>>,
    seen_puts: Arc<Mutex<Vec<(String, Value)>>>,
}

impl TestServerState {
    fn new(get_replies: Vec<MockReply>, put_replies: Vec<MockReply>) -> Self {
        Self {
            get_replies: Arc::new(Mutex::new(VecDeque::from(get_replies))),
            put_replies: Arc::new(Mutex::new(VecDeque::from(put_replies))),
            seen_puts: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[tokio::test]
async fn first_creation_sends_no_revision_sha() {
    let state = TestServerState::new(
        vec![not_found_reply()],
        vec![MockReply {
            status: StatusCode::CREATED,
            body: json!({}),
        }],
    );
    let (url, shutdown_tx, server_task) = spawn_test_server(state.clone()).await;

    let client = content_client(url);
    client
        .upsert_file("landings/test-slug/index.html", "<html></html>", "Add landing test-slug")
        .await
        .expect("create should succeed");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    let puts = state.seen_puts.lock().await;
    assert_eq!(puts.len(), 1);
    let (path, body) = &puts[0];
    assert_eq!(path, "landings/test-slug/index.html");
    assert_eq!(body["message"], "Add landing test-slug");
    assert_eq!(body["branch"], "main");
    assert!(body.get("sha").is_none(), "create must not carry a sha");

    let decoded = BASE64
        .decode(body["content"].as_str().expect("content field"))
        .expect("content should be base64");
    assert_eq!(decoded, b"<html></html>");
}

#[tokio::test]
async fn update_carries_the_existing_revision_sha() {
    let state = TestServerState::new(
        vec![MockReply {
            status: StatusCode::OK,
            body: json!({ "sha": "abc123" }),
        }],
        vec![MockReply {
            status: StatusCode::OK,
            body: json!({}),
        }],
    );
    let (url, shutdown_tx, server_task) = spawn_test_server(state.clone()).await;

    let client = content_client(url);
    client
        .upsert_file("go/test-slug.html", "<html>redirect</html>", "Add redirect test-slug")
        .await
        .expect("update should succeed");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    let puts = state.seen_puts.lock().await;
    assert_eq!(puts[0].1["sha"], "abc123");
}

#[tokio::test]
async fn missing_file_resolves_to_no_sha() {
    let state = TestServerState::new(vec![not_found_reply()], vec![]);
    let (url, shutdown_tx, server_task) = spawn_test_server(state.clone()).await;

    let client = content_client(url);
    let sha = client
        .get_file_sha("landings/absent/index.html")
        .await
        .expect("404 is not an error");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    assert_eq!(sha, None);
}

#[tokio::test]
async fn api_failure_surfaces_status_and_message() {
    let state = TestServerState::new(
        vec![not_found_reply()],
        vec![MockReply {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            body: json!({ "message": "Invalid request" }),
        }],
    );
    let (url, shutdown_tx, server_task) = spawn_test_server(state.clone()).await;

    let client = content_client(url);
    let err = client
        .upsert_file("landings/x/index.html", "body", "Add landing x")
        .await
        .expect_err("422 must fail");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    assert!(
        matches!(err, GithubError::Api { status: 422, ref message } if message == "Invalid request"),
        "expected api error, got {err:?}"
    );
}

fn content_client(base_url: String) -> GithubContentClient {
    GithubContentClient::new(RepoConfig {
        token: "test-github-token".to_string(),
        owner: "acme".to_string(),
        repo: "site".to_string(),
        branch: "main".to_string(),
    })
    .expect("client should build")
    .with_base_url(base_url)
}

fn not_found_reply() -> MockReply {
    MockReply {
        status: StatusCode::NOT_FOUND,
        body: json!({ "message": "Not Found" }),
    }
}

async fn spawn_test_server(
    state: TestServerState,
) -> (String, oneshot::Sender<()>, tokio::task::JoinHandle<()>) {
    let app = Router::new()
        .route(
            "/repos/{owner}/{repo}/contents/{*path}",
            get(contents_get_handler).put(contents_put_handler),
        )
        .with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let local_addr = listener
        .local_addr()
        .expect("listener address should resolve");
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let server_task = tokio::spawn(async move {
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        });

        server.await.expect("test server should run");
    });

    (format!("http://{local_addr}"), shutdown_tx, server_task)
}

async fn contents_get_handler(
    State(state): State<TestServerState>,
    Path((_owner, _repo, _path)): Path<(String, String, String)>,
) -> (StatusCode, Json<Value>) {
    let reply = state
        .get_replies
        .lock()
        .await
        .pop_front()
        .unwrap_or_else(not_found_reply);
    (reply.status, Json(reply.body))
}

async fn contents_put_handler(
    State(state): State<TestServerState>,
    Path((_owner, _repo, path)): Path<(String, String, String)>,
    Json(payload): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.seen_puts.lock().await.push((path, payload));
    let reply = state.put_replies.lock().await.pop_front().unwrap_or(MockReply {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: json!({ "message": "exhausted_test_replies" }),
    });
    (reply.status, Json(reply.body))
}
