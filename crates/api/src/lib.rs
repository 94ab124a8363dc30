//! Layout copilot HTTP/SSE server library.
//!
//! A thin adapter over [`copilot_jobs::JobEngine`]: it maps requests onto
//! the engine's create/start/get/open-log-stream operations and renders
//! the results. Exposed as a library so integration tests and the binary
//! entrypoint share the same router.

pub mod config;
pub mod error;
pub mod handlers;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
