//! Domain types and generator invocation for the layout copilot.
//!
//! Everything here is free of engine state: the job record and its state
//! machine, the error taxonomy shared by the other crates, the display
//! configuration loader, and the subprocess plumbing used to run the
//! external layout generator.

pub mod display_config;
pub mod error;
pub mod job;
pub mod job_events;
pub mod scripting;
pub mod types;
