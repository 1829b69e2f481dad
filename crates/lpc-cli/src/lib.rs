//! Operator CLI for the latency profile reconciler
//!
//! Wires file-backed providers into the reconciler and exposes one-shot and
//! watching passes, config observation and profile resolution.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod cli;
pub mod commands;
pub mod logging;
pub mod state;

pub use cli::command;
pub use logging::{init_logging, LogFormat};
pub use state::{ClusterState, StateError, StateFile, StateFormat};
