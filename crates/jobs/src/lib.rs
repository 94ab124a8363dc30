//! Job execution and log distribution engine.
//!
//! [`JobEngine`] is the public contract: create, start, query and
//! subscribe. It coordinates the [`supervisor`] (one generator process per
//! job), the [`status_store`] (a `status.json` per job, rewritten on every
//! transition) and the per-job log registry from `copilot-events`.
//!
//! The engine is an explicitly constructed value. Wrap it in an `Arc` and
//! hand clones to whatever boundary layer needs it.

pub mod config;
pub mod engine;
pub mod status_store;
pub mod supervisor;

pub use config::EngineConfig;
pub use engine::{JobContext, JobEngine, LogStream};
pub use status_store::{StatusStore, StatusStoreError};
