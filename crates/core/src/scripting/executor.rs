//! Generator argument contract and error taxonomy.
//!
//! The generator is invoked as
//!
//! ```text
//! [interpreter] <script> --output <path> [--cell-name <name>] [--config <path>]
//! ```
//!
//! Exit code 0 means success. Any other code is a failure whose message
//! embeds the numeric code.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitStatus;

use tokio::process::Command;

/// Everything needed to launch the generator for one job.
#[derive(Debug, Clone)]
pub struct GeneratorInvocation {
    /// Program used to run the script (e.g. `python3`). `None` executes the
    /// script directly.
    pub interpreter: Option<String>,
    /// Path to the generator script or executable.
    pub script: PathBuf,
    /// Where the generator must write its layout artifact.
    pub output_path: PathBuf,
    /// Optional cell name forwarded as `--cell-name`.
    pub cell_name: Option<String>,
    /// Path of the serialized configuration payload, forwarded as `--config`.
    pub config_path: Option<PathBuf>,
}

impl GeneratorInvocation {
    /// Name of the program actually spawned, for logs and error messages.
    pub fn program(&self) -> String {
        match &self.interpreter {
            Some(interpreter) => interpreter.clone(),
            None => self.script.display().to_string(),
        }
    }

    /// Full argument vector, excluding the program itself.
    pub fn args(&self) -> Vec<OsString> {
        let mut args = Vec::new();
        if self.interpreter.is_some() {
            args.push(self.script.clone().into_os_string());
        }
        args.push("--output".into());
        args.push(self.output_path.clone().into_os_string());
        if let Some(cell_name) = &self.cell_name {
            args.push("--cell-name".into());
            args.push(cell_name.into());
        }
        if let Some(config_path) = &self.config_path {
            args.push("--config".into());
            args.push(config_path.clone().into_os_string());
        }
        args
    }

    /// Build the (unspawned) command. Stdio is configured by
    /// [`spawn_merged`](super::subprocess::spawn_merged).
    pub fn command(&self) -> Command {
        let mut cmd = match &self.interpreter {
            Some(interpreter) => Command::new(interpreter),
            None => Command::new(&self.script),
        };
        cmd.args(self.args());
        cmd
    }
}

/// Environment faults raised while running the generator.
///
/// Every variant resolves to a failed job whose error is this `Display`
/// text; none of them propagate past the job's own task.
#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    /// The generator script does not exist on disk.
    #[error("Generator script not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The process could not be launched at all.
    #[error("Failed to launch generator {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// An I/O error while preparing inputs, reading output or waiting.
    #[error("Generator I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The process ran and exited with a non-zero code.
    #[error("Generator exited with code {0}")]
    ExitCode(i32),

    /// The process was terminated without an exit code (e.g. by a signal).
    #[error("Generator terminated by signal")]
    Signal,
}

/// Map a process exit status to success or a [`GeneratorError`].
pub fn check_exit(status: ExitStatus) -> Result<(), GeneratorError> {
    if status.success() {
        return Ok(());
    }
    match status.code() {
        Some(code) => Err(GeneratorError::ExitCode(code)),
        None => Err(GeneratorError::Signal),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
