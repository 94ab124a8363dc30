//! Display configuration (layer colours, opacity, z-order) for the viewer.
//!
//! The file is re-read on every call so edits show up without a restart.
//! Nothing is cached and there is no concurrency contract beyond that of
//! the filesystem.

use std::io::ErrorKind;
use std::path::Path;

use serde_json::{Map, Value};

use crate::error::CoreError;

/// Load the display configuration mapping from `path`.
///
/// Returns [`CoreError::NotFound`] if the file does not exist and
/// [`CoreError::Validation`] if it is not a JSON object.
pub async fn load_display_config(path: &Path) -> Result<Map<String, Value>, CoreError> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(CoreError::NotFound {
                entity: "DisplayConfig",
                id: path.display().to_string(),
            });
        }
        Err(e) => {
            return Err(CoreError::Internal(format!(
                "Failed to read {}: {e}",
                path.display()
            )));
        }
    };

    match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(CoreError::Validation(format!(
            "{} must contain a JSON object",
            path.display()
        ))),
        Err(e) => Err(CoreError::Validation(format!(
            "Invalid display config {}: {e}",
            path.display()
        ))),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
