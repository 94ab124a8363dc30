use std::sync::Arc;

use anyhow::{Context, Result};
use copilot_core::job::{GenerateRequest, Job, JobStatus};
use copilot_events::LogEvent;
use copilot_jobs::{JobEngine, LogStream};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

/// Cell name passed to the `index`-th job (zero-based) of a batch.
pub fn cell_name(index: usize) -> String {
    format!("test_cell_{}", index + 1)
}

/// Final state of every job in a batch, in creation order.
#[derive(Debug)]
pub struct BatchReport {
    pub jobs: Vec<Job>,
}

impl BatchReport {
    pub fn failed_count(&self) -> usize {
        self.jobs
            .iter()
            .filter(|job| job.status == JobStatus::Failed)
            .count()
    }
}

/// Create and start `count` jobs, forwarding their output to `out`.
///
/// Each job's log stream is opened before the job starts, so no line is
/// missed. Output lines are prefixed with `[<job id>] `. Returns once every
/// stream has ended.
pub async fn run_batch(
    engine: &Arc<JobEngine>,
    count: usize,
    out: mpsc::UnboundedSender<String>,
) -> Result<BatchReport> {
    let mut streams = JoinSet::new();
    let mut job_ids = Vec::with_capacity(count);

    for index in 0..count {
        let request = GenerateRequest::for_cell(cell_name(index));
        let job = engine
            .create(&request)
            .await
            .with_context(|| format!("Failed to create job {}", index + 1))?;
        let job_id = job.job_id;

        let log = engine
            .open_log_stream(job_id)
            .await
            .with_context(|| format!("Job {job_id} vanished before its stream opened"))?;
        streams.spawn(forward(log, out.clone()));

        let _handle = engine.start(job_id, request);
        tracing::info!(job_id = %job_id, "Started job");
        let _ = out.send(format!("Started job {job_id}"));
        job_ids.push(job_id);
    }

    while let Some(joined) = streams.join_next().await {
        joined.context("Log stream task failed")?;
    }

    let mut jobs = Vec::with_capacity(job_ids.len());
    for job_id in job_ids {
        let job = engine
            .get(job_id)
            .await
            .with_context(|| format!("Job {job_id} missing after completion"))?;
        jobs.push(job);
    }
    Ok(BatchReport { jobs })
}

async fn forward(log: LogStream, out: mpsc::UnboundedSender<String>) {
    let LogStream {
        history,
        mut subscription,
    } = log;
    let job_id = subscription.job_id();

    for line in history {
        let _ = out.send(format!("[{job_id}] {line}"));
    }
    while let Some(event) = subscription.recv().await {
        match event {
            LogEvent::Line(line) => {
                let _ = out.send(format!("[{job_id}] {line}"));
            }
            LogEvent::End(status) => {
                tracing::debug!(job_id = %job_id, status = %status, "Log stream ended");
                break;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
