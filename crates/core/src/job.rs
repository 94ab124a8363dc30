//! The job record and its status state machine.
//!
//! A [`Job`] only changes through [`Job::mark_running`], [`Job::complete`]
//! and [`Job::fail`], which keep two invariants:
//!
//! - `completed_at` is set if and only if the status is terminal;
//! - `error` is set if and only if the status is [`JobStatus::Failed`].

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CoreError;
use crate::types::{JobId, Timestamp};

/// Lifecycle status of a generation job.
///
/// ```text
/// Pending -> Running -> Completed
///    |          |
///    +----------+----> Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    /// Wire name, identical to the serde representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// `Completed` and `Failed` have no outgoing transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running)
                | (Self::Pending, Self::Failed)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Failed)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One request to run the layout generator, tracked end to end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub job_id: JobId,
    pub status: JobStatus,
    pub created_at: Timestamp,
    pub completed_at: Option<Timestamp>,
    pub error: Option<String>,
}

impl Job {
    /// A freshly registered job in `Pending`.
    pub fn pending(job_id: JobId) -> Self {
        Self {
            job_id,
            status: JobStatus::Pending,
            created_at: chrono::Utc::now(),
            completed_at: None,
            error: None,
        }
    }

    pub fn mark_running(&mut self) -> Result<(), CoreError> {
        self.transition(JobStatus::Running)
    }

    pub fn complete(&mut self) -> Result<(), CoreError> {
        self.transition(JobStatus::Completed)?;
        self.completed_at = Some(chrono::Utc::now());
        Ok(())
    }

    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), CoreError> {
        self.transition(JobStatus::Failed)?;
        self.completed_at = Some(chrono::Utc::now());
        self.error = Some(error.into());
        Ok(())
    }

    fn transition(&mut self, next: JobStatus) -> Result<(), CoreError> {
        if !self.status.can_transition_to(next) {
            return Err(CoreError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}

/// Body of a generation request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// Passed to the generator as `--cell-name`.
    #[serde(default)]
    pub cell_name: Option<String>,
    /// Written to `config.json` next to the output and passed as `--config`.
    #[serde(default)]
    pub config: Option<Map<String, Value>>,
}

impl GenerateRequest {
    pub fn for_cell(cell_name: impl Into<String>) -> Self {
        Self {
            cell_name: Some(cell_name.into()),
            config: None,
        }
    }

    /// Empty cell names and empty config objects are treated as absent.
    pub fn cell_name(&self) -> Option<&str> {
        self.cell_name.as_deref().filter(|name| !name.is_empty())
    }

    pub fn config(&self) -> Option<&Map<String, Value>> {
        self.config.as_ref().filter(|config| !config.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
