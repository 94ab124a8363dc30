//! History buffer and live fan-out for job logs.
//!
//! Each job owns one [`JobLog`] behind its own mutex, so activity on one
//! job never blocks another. The mutex is held while a line is appended to
//! history *and* delivered to every live subscription, and while a new
//! subscription snapshots history and registers itself. A subscription
//! therefore starts with exactly the lines produced before it registered
//! and then receives every later line live: nothing is missed or duplicated
//! under any interleaving.
//!
//! Channels are unbounded. Memory per subscriber is bounded only by one
//! job's output, which is accepted: a runaway generator grows every queue.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};

use copilot_core::job::JobStatus;
use copilot_core::types::JobId;
use serde::Serialize;
use tokio::sync::mpsc;

/// One item of a job's log stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum LogEvent {
    /// A line of generator output.
    Line(String),
    /// No further lines will follow; carries the job's final status.
    End(JobStatus),
}

/// Per-job state: everything produced so far plus who is listening.
#[derive(Default)]
struct JobLog {
    history: Vec<String>,
    subscribers: HashMap<u64, mpsc::UnboundedSender<LogEvent>>,
    /// Set once the job reached a terminal status and `End` was sent.
    finished: Option<JobStatus>,
}

type SharedLog = Arc<Mutex<JobLog>>;

fn lock(log: &Mutex<JobLog>) -> MutexGuard<'_, JobLog> {
    // A panic while holding the lock cannot leave `JobLog` half-updated in a
    // way later readers would misinterpret, so poisoning is ignored.
    log.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Registry of per-job log histories and subscriptions.
///
/// Designed to be shared via `Arc<LogRegistry>`; all methods take `&self`.
#[derive(Default)]
pub struct LogRegistry {
    jobs: RwLock<HashMap<JobId, SharedLog>>,
    next_subscriber_id: AtomicU64,
}

impl LogRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the empty history/subscriber sets for `job_id`.
    ///
    /// Idempotent: an existing entry is kept as is.
    pub fn register(&self, job_id: JobId) {
        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
        jobs.entry(job_id).or_default();
    }

    fn get(&self, job_id: JobId) -> Option<SharedLog> {
        self.jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&job_id)
            .cloned()
    }

    /// Append `line` to the job's history and deliver it to every live
    /// subscription, in one step.
    ///
    /// Subscriptions whose receiver has been dropped are pruned here.
    pub fn publish(&self, job_id: JobId, line: impl Into<String>) {
        let Some(log) = self.get(job_id) else {
            tracing::warn!(job_id = %job_id, "Dropping log line for unregistered job");
            return;
        };
        let line = line.into();
        let mut log = lock(&log);
        if log.finished.is_some() {
            tracing::warn!(job_id = %job_id, "Dropping log line for finished job");
            return;
        }
        log.subscribers
            .retain(|_, tx| tx.send(LogEvent::Line(line.clone())).is_ok());
        log.history.push(line);
    }

    /// Deliver the terminal sentinel to every live subscription and close
    /// their channels.
    ///
    /// Subscriptions registered afterwards receive `End` immediately after
    /// their replay. Calling this twice is a no-op the second time.
    pub fn finish(&self, job_id: JobId, status: JobStatus) {
        let Some(log) = self.get(job_id) else {
            tracing::warn!(job_id = %job_id, "Finish requested for unregistered job");
            return;
        };
        let mut log = lock(&log);
        if log.finished.is_some() {
            return;
        }
        log.finished = Some(status);
        let delivered = log.subscribers.len();
        for (_, tx) in log.subscribers.drain() {
            let _ = tx.send(LogEvent::End(status));
        }
        tracing::debug!(job_id = %job_id, %status, delivered, "Log stream finished");
    }

    /// Copy of the job's history at call time. Empty for unknown jobs.
    pub fn history(&self, job_id: JobId) -> Vec<String> {
        self.get(job_id)
            .map(|log| lock(&log).history.clone())
            .unwrap_or_default()
    }

    /// Register a new subscription for `job_id`.
    ///
    /// The subscription first yields the history as it stood at
    /// registration, then live lines, then exactly one [`LogEvent::End`].
    /// Always succeeds: a finished job yields its history followed
    /// immediately by `End`. An unregistered job yields nothing at all and
    /// leaves no entry behind.
    pub fn subscribe(&self, job_id: JobId) -> Subscription {
        let id = self.next_subscriber_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        let Some(shared) = self.get(job_id) else {
            tracing::debug!(job_id = %job_id, "Subscription to unregistered job");
            // Dropping the only sender closes the channel.
            drop(tx);
            return Subscription {
                job_id,
                id,
                replay: VecDeque::new(),
                rx,
                log: Weak::new(),
                ended: false,
            };
        };

        let replay = {
            let mut log = lock(&shared);
            let replay: VecDeque<String> = log.history.iter().cloned().collect();
            match log.finished {
                Some(status) => {
                    let _ = tx.send(LogEvent::End(status));
                }
                None => {
                    log.subscribers.insert(id, tx);
                }
            }
            replay
        };

        Subscription {
            job_id,
            id,
            replay,
            rx,
            log: Arc::downgrade(&shared),
            ended: false,
        }
    }

    /// Deregister `subscription`. Equivalent to dropping it.
    pub fn unsubscribe(&self, subscription: Subscription) {
        drop(subscription);
    }

    #[cfg(test)]
    fn subscriber_count(&self, job_id: JobId) -> usize {
        self.get(job_id)
            .map(|log| lock(&log).subscribers.len())
            .unwrap_or(0)
    }
}

/// An observer's ordered view of one job's log.
///
/// Dropping a subscription deregisters it immediately; it never affects the
/// generator or other subscriptions.
pub struct Subscription {
    job_id: JobId,
    id: u64,
    replay: VecDeque<String>,
    rx: mpsc::UnboundedReceiver<LogEvent>,
    log: Weak<Mutex<JobLog>>,
    ended: bool,
}

impl Subscription {
    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    /// Remove and return the history captured at registration.
    ///
    /// After this call [`recv`](Self::recv) yields only live items. Used
    /// when the caller wants to handle the snapshot separately.
    pub fn take_replay(&mut self) -> Vec<String> {
        self.replay.drain(..).collect()
    }

    /// Next event: replayed history first, then live lines, then `End`.
    ///
    /// Returns `None` after `End` has been yielded.
    pub async fn recv(&mut self) -> Option<LogEvent> {
        if self.ended {
            return None;
        }
        if let Some(line) = self.replay.pop_front() {
            return Some(LogEvent::Line(line));
        }
        let event = self.rx.recv().await?;
        if matches!(event, LogEvent::End(_)) {
            self.ended = true;
        }
        Some(event)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(log) = self.log.upgrade() {
            lock(&log).subscribers.remove(&self.id);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
