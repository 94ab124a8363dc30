//! Durable `status.json` snapshots.
//!
//! Every status transition rewrites the job's snapshot so a restarted
//! process can see the last observed status. Writes go to a temporary
//! sibling first and are renamed into place, so a reader never sees a
//! half-written file. Failures are reported to the caller, which logs them
//! and carries on: persistence is best-effort, not a transactional guard.

use std::path::{Path, PathBuf};

use copilot_core::job::Job;

#[derive(Debug, thiserror::Error)]
pub enum StatusStoreError {
    #[error("Failed to write status file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read status file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed status file {}: {source}", path.display())]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Stateless writer/reader of per-job status snapshots.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusStore;

impl StatusStore {
    /// Serialize `job` as pretty JSON to `path`.
    pub async fn write(&self, job: &Job, path: &Path) -> Result<(), StatusStoreError> {
        let payload = serde_json::to_vec_pretty(job).map_err(|source| StatusStoreError::Format {
            path: path.to_path_buf(),
            source,
        })?;

        let tmp_path = path.with_extension("json.tmp");
        let write_err = |source| StatusStoreError::Write {
            path: path.to_path_buf(),
            source,
        };
        tokio::fs::write(&tmp_path, &payload).await.map_err(write_err)?;
        tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
        Ok(())
    }

    /// Read a snapshot previously written by [`write`](Self::write).
    pub async fn load(&self, path: &Path) -> Result<Job, StatusStoreError> {
        let raw = tokio::fs::read(path)
            .await
            .map_err(|source| StatusStoreError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        serde_json::from_slice(&raw).map_err(|source| StatusStoreError::Format {
            path: path.to_path_buf(),
            source,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use copilot_core::job::JobStatus;

    use super::*;

    #[tokio::test]
    async fn snapshot_contains_all_fields() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("status.json");
        let mut job = Job::pending(uuid::Uuid::new_v4());
        job.fail("Generator exited with code 3").expect("fail");

        StatusStore.write(&job, &path).await.expect("write");

        let raw = std::fs::read_to_string(&path).expect("read");
        let json: serde_json::Value = serde_json::from_str(&raw).expect("parse");
        assert_eq!(json["job_id"], job.job_id.to_string());
        assert_eq!(json["status"], "failed");
        assert!(json["created_at"].is_string());
        assert!(json["completed_at"].is_string());
        assert_eq!(json["error"], "Generator exited with code 3");
        assert!(!dir.path().join("status.json.tmp").exists());
    }

    #[tokio::test]
    async fn rewrite_replaces_previous_snapshot() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("status.json");
        let mut job = Job::pending(uuid::Uuid::new_v4());
        StatusStore.write(&job, &path).await.expect("write pending");

        job.mark_running().expect("running");
        StatusStore.write(&job, &path).await.expect("write running");

        let loaded = StatusStore.load(&path).await.expect("load");
        assert_eq!(loaded.status, JobStatus::Running);
        assert_eq!(loaded, job);
    }

    #[tokio::test]
    async fn write_into_missing_directory_fails() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("gone").join("status.json");
        let job = Job::pending(uuid::Uuid::new_v4());
        assert_matches!(
            StatusStore.write(&job, &path).await,
            Err(StatusStoreError::Write { .. })
        );
    }

    #[tokio::test]
    async fn malformed_snapshot_is_a_format_error() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("status.json");
        std::fs::write(&path, "{not json").expect("write");
        assert_matches!(
            StatusStore.load(&path).await,
            Err(StatusStoreError::Format { .. })
        );
    }
}
