//! Batch runner for the job engine.
//!
//! Drives several generation jobs side by side against a local generator,
//! printing their interleaved output. Useful for exercising a generator
//! script without the HTTP server.

pub mod batch;
