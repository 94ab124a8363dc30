//! Per-job log fan-out.
//!
//! - [`LogRegistry`]: per-job history buffer plus the set of live
//!   subscriptions, with replay for late subscribers.
//! - [`LogEvent`]: one item of a job's log stream: a line, or the
//!   terminal [`LogEvent::End`] sentinel carrying the final status.
//! - [`Subscription`]: an observer's ordered, unbounded view of one job.

pub mod registry;

pub use registry::{LogEvent, LogRegistry, Subscription};
