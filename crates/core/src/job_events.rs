//! Event names used when a job's log stream is sent over SSE.
//!
//! Used in `api/src/handlers/generate.rs` and mirrored by the frontend's
//! `EventSource` listeners.

/// One line of generator output.
pub const SSE_EVENT_LOG: &str = "log";

/// Terminal event; its data is the final job status (`completed` / `failed`).
pub const SSE_EVENT_COMPLETE: &str = "complete";
