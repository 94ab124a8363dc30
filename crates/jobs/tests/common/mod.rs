#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use copilot_events::{LogEvent, Subscription};
use copilot_jobs::{EngineConfig, JobEngine};
use tempfile::TempDir;

/// An engine rooted in a temporary directory.
///
/// The directory is removed when the value is dropped, so keep it alive
/// for the duration of the test.
pub struct TestEnv {
    pub dir: TempDir,
    pub engine: Arc<JobEngine>,
}

impl TestEnv {
    pub fn jobs_dir(&self) -> PathBuf {
        self.dir.path().join("jobs")
    }
}

/// Engine whose generator is a `sh` script with the given body.
pub fn engine_with_script(body: &str) -> TestEnv {
    let dir = tempfile::tempdir().expect("create temp dir");
    let script = dir.path().join("generator.sh");
    std::fs::write(&script, body).expect("write generator script");
    build(dir, script)
}

/// Engine pointing at a generator path that does not exist.
pub fn engine_without_script() -> TestEnv {
    let dir = tempfile::tempdir().expect("create temp dir");
    let script = dir.path().join("missing").join("generator.py");
    build(dir, script)
}

fn build(dir: TempDir, generator_script: PathBuf) -> TestEnv {
    let config = EngineConfig {
        jobs_dir: dir.path().join("jobs"),
        generator_script,
        interpreter: Some("sh".to_string()),
    };
    TestEnv {
        dir,
        engine: Arc::new(JobEngine::new(config)),
    }
}

/// Collect every remaining event of a subscription, up to and including `End`.
pub async fn drain(subscription: &mut Subscription) -> Vec<LogEvent> {
    let mut events = Vec::new();
    while let Some(event) = subscription.recv().await {
        events.push(event);
    }
    events
}

pub fn lines(texts: &[&str]) -> Vec<LogEvent> {
    texts
        .iter()
        .map(|text| LogEvent::Line(text.to_string()))
        .collect()
}
