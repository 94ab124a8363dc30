use std::path::PathBuf;

/// Where jobs live on disk and how the generator is launched.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Parent directory of all per-job directories.
    pub jobs_dir: PathBuf,
    /// Path to the generator script.
    pub generator_script: PathBuf,
    /// Program used to run the script; `None` executes it directly.
    pub interpreter: Option<String>,
}

impl EngineConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default              |
    /// |-------------------------|----------------------|
    /// | `JOBS_DIR`              | `jobs`               |
    /// | `GENERATOR_SCRIPT`      | `data/generator.py`  |
    /// | `GENERATOR_INTERPRETER` | `python3`            |
    ///
    /// An empty `GENERATOR_INTERPRETER` runs the script directly.
    pub fn from_env() -> Self {
        let jobs_dir = std::env::var("JOBS_DIR").unwrap_or_else(|_| "jobs".into());

        let generator_script =
            std::env::var("GENERATOR_SCRIPT").unwrap_or_else(|_| "data/generator.py".into());

        let interpreter = std::env::var("GENERATOR_INTERPRETER").unwrap_or_else(|_| "python3".into());

        Self {
            jobs_dir: PathBuf::from(jobs_dir),
            generator_script: PathBuf::from(generator_script),
            interpreter: normalize_interpreter(interpreter),
        }
    }
}

/// Blank interpreter names mean "execute the script directly".
pub fn normalize_interpreter(raw: String) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
