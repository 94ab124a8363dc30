#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

use copilot_api::config::ServerConfig;
use copilot_api::router::build_app_router;
use copilot_api::state::AppState;
use copilot_jobs::{EngineConfig, JobEngine};

/// A router backed by an engine rooted in a temporary directory.
///
/// The directory is removed when the value is dropped, so keep it alive
/// for the duration of the test.
pub struct TestApp {
    pub dir: TempDir,
    pub engine: Arc<JobEngine>,
    pub router: Router,
}

impl TestApp {
    pub fn display_config_path(&self) -> PathBuf {
        self.dir.path().join("display_config.json")
    }

    /// A fresh handle to the router; `oneshot` consumes it.
    pub fn app(&self) -> Router {
        self.router.clone()
    }
}

/// Build a test `ServerConfig` rooted in `dir`.
///
/// Uses `http://localhost:5173` as the only CORS origin and a 30-second
/// request timeout.
pub fn test_config(dir: &TempDir, generator_script: PathBuf) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        display_config_path: dir.path().join("display_config.json"),
        engine: EngineConfig {
            jobs_dir: dir.path().join("jobs"),
            generator_script,
            interpreter: Some("sh".to_string()),
        },
    }
}

/// Build the full application router around a `sh` generator script with
/// the given body.
///
/// The script is invoked as `sh generator.sh --output <path> ...`, so `$2`
/// is the output path.
pub fn build_test_app(script_body: &str) -> TestApp {
    let dir = tempfile::tempdir().expect("create temp dir");
    let script = dir.path().join("generator.sh");
    std::fs::write(&script, script_body).expect("write generator script");
    assemble(dir, script)
}

/// Build the application with a generator path that does not exist.
pub fn build_test_app_without_generator() -> TestApp {
    let dir = tempfile::tempdir().expect("create temp dir");
    let script = dir.path().join("missing.py");
    assemble(dir, script)
}

fn assemble(dir: TempDir, script: PathBuf) -> TestApp {
    let config = test_config(&dir, script);
    let engine = Arc::new(JobEngine::new(config.engine.clone()));
    let state = AppState {
        engine: Arc::clone(&engine),
        config: Arc::new(config),
    };
    TestApp {
        dir,
        engine,
        router: build_app_router(state),
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// GET with extra request headers, e.g. `Accept-Encoding`.
pub async fn get_with_headers(app: Router, uri: &str, headers: &[(&str, &str)]) -> Response<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    app.oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    let collected = tokio::time::timeout(Duration::from_secs(10), response.into_body().collect())
        .await
        .expect("body should finish within 10s")
        .expect("body should be readable");
    collected.to_bytes().to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = body_bytes(response).await;
    serde_json::from_slice(&bytes).expect("body should be JSON")
}

pub async fn body_text(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await).expect("body should be UTF-8")
}

/// Split an SSE body into `(event, data)` pairs, skipping comments.
pub fn parse_sse(body: &str) -> Vec<(String, String)> {
    body.split("\n\n")
        .filter_map(|block| {
            let mut event = None;
            let mut data: Vec<&str> = Vec::new();
            for line in block.lines() {
                if let Some(value) = line.strip_prefix("event:") {
                    event = Some(value.trim_start().to_string());
                } else if let Some(value) = line.strip_prefix("data:") {
                    data.push(value.strip_prefix(' ').unwrap_or(value));
                }
            }
            event.map(|event| (event, data.join("\n")))
        })
        .collect()
}

/// Poll the status endpoint until the job leaves `pending`/`running`.
pub async fn wait_for_terminal(app: &TestApp, job_id: &str) -> serde_json::Value {
    for _ in 0..200 {
        let response = get(app.app(), &format!("/api/generate/{job_id}/status")).await;
        let json = body_json(response).await;
        let status = json["data"]["status"].as_str().unwrap_or_default().to_string();
        if status == "completed" || status == "failed" {
            return json["data"].clone();
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("job {job_id} did not finish in time");
}
