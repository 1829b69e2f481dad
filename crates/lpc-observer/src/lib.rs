//! Latency profile config observation
//!
//! Turns the cluster latency profile into the minimal server config patch:
//! only tracked paths whose value differs from the existing document are
//! written.
//!
//! # Example
//!
//! ```rust
//! use lpc_document::{ConfigDocument, ConfigPath};
//! use lpc_observer::observe;
//!
//! let path: ConfigPath = "apiServerArguments.default-not-ready-toleration-seconds"
//!     .parse()
//!     .unwrap();
//! let mut existing = ConfigDocument::new();
//!
//! let patch = observe(&path, "300", &existing).unwrap();
//! existing.merge(&patch);
//! assert!(observe(&path, "300", &existing).unwrap().is_empty());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod error;
pub mod observe;
pub mod pipeline;
pub mod step;

pub use error::{ObserveError, StepError};
pub use observe::observe;
pub use pipeline::{latency_profile_pipeline, Observation, ObservationPipeline, StepFailure};
pub use step::{LatencyProfileObserver, ObserverStep};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
