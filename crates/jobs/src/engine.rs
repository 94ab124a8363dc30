//! The job engine: registration, lifecycle and log access.
//!
//! Job creation (identifier allocation, directory provisioning, initial
//! status write, log registration) runs under a single creation mutex and
//! the job becomes visible to readers with one map insert, so concurrent
//! callers never see duplicate ids or a half-registered job.
//!
//! Each started job runs in its own task. Status transitions are applied
//! in memory, then persisted, and only then are subscribers told about the
//! consequence (the terminal [`LogEvent::End`](copilot_events::LogEvent)).
//!
//! There is no timeout on the generator: a hung generator keeps its job in
//! `running` indefinitely. A restart after a crash leaves `running` jobs
//! stuck as well; in-flight processes are not recovered.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use copilot_core::error::CoreError;
use copilot_core::job::{GenerateRequest, Job, JobStatus};
use copilot_core::scripting::executor::{GeneratorError, GeneratorInvocation};
use copilot_core::types::JobId;
use copilot_events::{LogRegistry, Subscription};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

use crate::config::EngineConfig;
use crate::status_store::StatusStore;
use crate::supervisor;

/// File name of the generator's output artifact inside a job directory.
pub const OUTPUT_FILE_NAME: &str = "layout.yaml";

/// File name of the status snapshot inside a job directory.
pub const STATUS_FILE_NAME: &str = "status.json";

/// A job paired with its filesystem locations.
#[derive(Debug, Clone)]
pub struct JobContext {
    pub job: Job,
    /// Where the generator must write its layout artifact.
    pub output_path: PathBuf,
    /// Where the status snapshot is written.
    pub status_path: PathBuf,
}

impl JobContext {
    fn job_dir(&self) -> &Path {
        self.output_path.parent().unwrap_or_else(|| Path::new("."))
    }
}

/// History snapshot plus the live subscription that continues it.
///
/// Both are captured in one step, so the first live item is exactly the
/// first line produced after the snapshot.
pub struct LogStream {
    pub history: Vec<String>,
    pub subscription: Subscription,
}

/// Orchestrates job creation, generator supervision and log fan-out.
///
/// Shared via `Arc<JobEngine>`; [`start`](Self::start) needs the `Arc` to
/// hand the engine to the job's task.
pub struct JobEngine {
    config: EngineConfig,
    jobs: RwLock<HashMap<JobId, JobContext>>,
    logs: LogRegistry,
    store: StatusStore,
    /// Serializes identifier allocation and initial registration.
    create_lock: Mutex<()>,
}

impl JobEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            jobs: RwLock::new(HashMap::new()),
            logs: LogRegistry::new(),
            store: StatusStore,
            create_lock: Mutex::new(()),
        }
    }

    // ---- registration ----

    /// Register a new `pending` job and persist its first snapshot.
    ///
    /// The request itself is only needed by [`start`](Self::start).
    pub async fn create(&self, _request: &GenerateRequest) -> Result<Job, CoreError> {
        let _guard = self.create_lock.lock().await;

        let job_id = {
            let jobs = self.jobs.read().await;
            let mut candidate = uuid::Uuid::new_v4();
            while jobs.contains_key(&candidate) {
                candidate = uuid::Uuid::new_v4();
            }
            candidate
        };

        let job_dir = self.config.jobs_dir.join(job_id.to_string());
        tokio::fs::create_dir_all(&job_dir).await.map_err(|e| {
            CoreError::Internal(format!(
                "Failed to create job directory {}: {e}",
                job_dir.display()
            ))
        })?;

        let context = JobContext {
            job: Job::pending(job_id),
            output_path: job_dir.join(OUTPUT_FILE_NAME),
            status_path: job_dir.join(STATUS_FILE_NAME),
        };
        self.persist(&context.job, &context.status_path).await;
        self.logs.register(job_id);

        let job = context.job.clone();
        self.jobs.write().await.insert(job_id, context);

        tracing::info!(job_id = %job_id, "Job created");
        Ok(job)
    }

    /// Run the generator for `job_id` in a background task.
    ///
    /// Returns immediately. Unknown ids and jobs that are no longer
    /// `pending` are logged and ignored. The returned handle resolves once
    /// the job is terminal and its subscribers have been sent `End`.
    pub fn start(self: &Arc<Self>, job_id: JobId, request: GenerateRequest) -> JoinHandle<()> {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            let worker = Arc::clone(&engine);
            let run = tokio::spawn(async move { worker.run_job(job_id, request).await });
            if let Err(e) = run.await {
                tracing::error!(job_id = %job_id, error = %e, "Job task aborted");
                engine.fail_if_active(job_id, "Job task panicked").await;
            }
        })
    }

    // ---- queries ----

    /// Current snapshot of the job, or `None` if the id is unknown.
    pub async fn get(&self, job_id: JobId) -> Option<Job> {
        self.jobs.read().await.get(&job_id).map(|ctx| ctx.job.clone())
    }

    /// Path of the artifact of a completed job.
    ///
    /// `NotFound` for unknown ids or a missing file; `NotReady` while the
    /// job is in any status other than `completed`.
    pub async fn completed_output(&self, job_id: JobId) -> Result<PathBuf, CoreError> {
        let (job, output_path) = {
            let jobs = self.jobs.read().await;
            let ctx = jobs.get(&job_id).ok_or_else(|| CoreError::NotFound {
                entity: "Job",
                id: job_id.to_string(),
            })?;
            (ctx.job.clone(), ctx.output_path.clone())
        };

        if job.status != JobStatus::Completed {
            return Err(CoreError::NotReady(format!(
                "Job not completed: {}",
                job.status
            )));
        }

        match tokio::fs::try_exists(&output_path).await {
            Ok(true) => Ok(output_path),
            _ => Err(CoreError::NotFound {
                entity: "Layout file",
                id: job_id.to_string(),
            }),
        }
    }

    /// Copy of the job's history at call time.
    pub fn history(&self, job_id: JobId) -> Vec<String> {
        self.logs.history(job_id)
    }

    /// Register a subscription that replays history, then follows live.
    ///
    /// Always succeeds; on a terminal job it yields the history and then
    /// `End` immediately. An unknown id yields nothing and registers
    /// nothing.
    pub fn subscribe(&self, job_id: JobId) -> Subscription {
        self.logs.subscribe(job_id)
    }

    /// Stop deliveries to `subscription`. Never blocks and never affects
    /// the generator or other subscribers.
    pub fn unsubscribe(&self, subscription: Subscription) {
        self.logs.unsubscribe(subscription);
    }

    /// History snapshot and live subscription for a known job.
    pub async fn open_log_stream(&self, job_id: JobId) -> Option<LogStream> {
        if !self.jobs.read().await.contains_key(&job_id) {
            return None;
        }
        let mut subscription = self.logs.subscribe(job_id);
        let history = subscription.take_replay();
        Some(LogStream {
            history,
            subscription,
        })
    }

    // ---- job task ----

    async fn run_job(&self, job_id: JobId, request: GenerateRequest) {
        let Some(context) = self.jobs.read().await.get(&job_id).cloned() else {
            tracing::warn!(job_id = %job_id, "Start requested for unknown job");
            return;
        };
        if context.job.status != JobStatus::Pending {
            tracing::warn!(
                job_id = %job_id,
                status = %context.job.status,
                "Start requested for job that is not pending",
            );
            return;
        }

        let script = self.config.generator_script.clone();
        if !tokio::fs::try_exists(&script).await.unwrap_or(false) {
            self.finish(job_id, Err(GeneratorError::NotFound(script)))
                .await;
            return;
        }

        if let Err(e) = self.apply(job_id, Job::mark_running).await {
            tracing::warn!(job_id = %job_id, error = %e, "Could not mark job running");
            return;
        }

        let outcome = self.supervise(job_id, &context, script, &request).await;
        self.finish(job_id, outcome).await;
    }

    async fn supervise(
        &self,
        job_id: JobId,
        context: &JobContext,
        script: PathBuf,
        request: &GenerateRequest,
    ) -> Result<(), GeneratorError> {
        let config_path = match request.config() {
            Some(config) => Some(supervisor::write_config_payload(context.job_dir(), config).await?),
            None => None,
        };

        let invocation = GeneratorInvocation {
            interpreter: self.config.interpreter.clone(),
            script,
            output_path: context.output_path.clone(),
            cell_name: request.cell_name().map(str::to_string),
            config_path,
        };

        supervisor::run_generator(job_id, &invocation, |line| self.logs.publish(job_id, line)).await
    }

    /// Apply the terminal transition for `outcome`, persist it, then send
    /// `End` to every subscriber.
    async fn finish(&self, job_id: JobId, outcome: Result<(), GeneratorError>) {
        let result = match &outcome {
            Ok(()) => self.apply(job_id, Job::complete).await,
            Err(e) => {
                let message = e.to_string();
                self.apply(job_id, |job| job.fail(message)).await
            }
        };

        match result {
            Ok(job) => {
                match &job.error {
                    Some(error) => {
                        tracing::warn!(job_id = %job_id, error = %error, "Job failed");
                    }
                    None => tracing::info!(job_id = %job_id, "Job completed"),
                }
                self.logs.finish(job_id, job.status);
            }
            Err(e) => {
                tracing::error!(job_id = %job_id, error = %e, "Could not finish job");
            }
        }
    }

    /// Fail a job that is still `pending` or `running`; used when its task
    /// died without reaching a terminal status.
    async fn fail_if_active(&self, job_id: JobId, message: &str) {
        match self.get(job_id).await {
            Some(job) if !job.status.is_terminal() => {
                let failed = self.apply(job_id, |job| job.fail(message)).await;
                if let Ok(job) = failed {
                    self.logs.finish(job_id, job.status);
                }
            }
            _ => {}
        }
    }

    /// Mutate a job under the write lock, then persist the new snapshot.
    ///
    /// The lock is released before the file write so readers are never
    /// held up by disk I/O.
    async fn apply<F>(&self, job_id: JobId, mutate: F) -> Result<Job, CoreError>
    where
        F: FnOnce(&mut Job) -> Result<(), CoreError>,
    {
        let (job, status_path) = {
            let mut jobs = self.jobs.write().await;
            let ctx = jobs.get_mut(&job_id).ok_or_else(|| CoreError::NotFound {
                entity: "Job",
                id: job_id.to_string(),
            })?;
            mutate(&mut ctx.job)?;
            (ctx.job.clone(), ctx.status_path.clone())
        };
        tracing::debug!(job_id = %job_id, status = %job.status, "Job status changed");
        self.persist(&job, &status_path).await;
        Ok(job)
    }

    async fn persist(&self, job: &Job, status_path: &Path) {
        if let Err(e) = self.store.write(job, status_path).await {
            tracing::error!(
                job_id = %job.job_id,
                status = %job.status,
                error = %e,
                "Failed to persist job status",
            );
        }
    }
}
