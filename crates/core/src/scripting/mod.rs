//! Layout generator invocation.
//!
//! [`executor`] describes *what* to run (script, interpreter, argument
//! contract) and the error taxonomy; [`subprocess`] owns the child process
//! and turns its merged stdout/stderr into a stream of text lines. Neither
//! knows about jobs, history or subscribers.

pub mod executor;
pub mod subprocess;
