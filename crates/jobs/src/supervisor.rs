//! Runs the generator for exactly one job.
//!
//! The supervisor knows nothing about job status: it prepares inputs,
//! streams every output line to a callback in arrival order, and reports
//! how the process ended. The engine turns that outcome into a transition.

use std::path::{Path, PathBuf};

use copilot_core::scripting::executor::{check_exit, GeneratorError, GeneratorInvocation};
use copilot_core::scripting::subprocess;
use copilot_core::types::JobId;
use serde_json::{Map, Value};

/// File name of the serialized configuration payload inside a job directory.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Write the request's configuration payload next to the job's output.
///
/// The generator only ever receives the payload as a file path.
pub async fn write_config_payload(
    job_dir: &Path,
    config: &Map<String, Value>,
) -> Result<PathBuf, GeneratorError> {
    let path = job_dir.join(CONFIG_FILE_NAME);
    let payload = serde_json::to_vec_pretty(config).map_err(std::io::Error::other)?;
    tokio::fs::write(&path, payload).await?;
    Ok(path)
}

/// Spawn the generator and feed each line of merged output to `on_line`.
///
/// `on_line` is called for a line before the next one is read. Returns
/// once the output is exhausted and the process has exited; a non-zero
/// exit becomes [`GeneratorError::ExitCode`].
pub async fn run_generator<F>(
    job_id: JobId,
    invocation: &GeneratorInvocation,
    mut on_line: F,
) -> Result<(), GeneratorError>
where
    F: FnMut(String),
{
    let mut running = subprocess::spawn_merged(invocation)?;
    tracing::info!(
        job_id = %job_id,
        pid = running.id(),
        program = %invocation.program(),
        "Generator started",
    );

    let mut line_count: u64 = 0;
    while let Some(line) = running.next_line().await {
        on_line(line);
        line_count += 1;
    }

    let status = running.wait().await?;
    tracing::info!(job_id = %job_id, %status, line_count, "Generator exited");
    check_exit(status)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
