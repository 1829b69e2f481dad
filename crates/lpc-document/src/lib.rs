//! Configuration documents
//!
//! Path-addressed access to the nested configuration trees that rendered
//! server snapshots and observed configuration patches are made of.
//!
//! # Core Concepts
//!
//! - [`ConfigPath`]: Hierarchical key path inside a document
//! - [`ConfigDocument`]: Object-rooted JSON tree with typed reads,
//!   minimal writes, pruning and deep merge
//!
//! # Example
//!
//! ```rust
//! use lpc_document::{ConfigDocument, ConfigPath};
//!
//! let path: ConfigPath = "apiServerArguments.default-not-ready-toleration-seconds"
//!     .parse()
//!     .unwrap();
//! let mut patch = ConfigDocument::new();
//! patch.set_string_sequence(&path, &["300"]).unwrap();
//!
//! assert_eq!(patch.string_sequence(&path).unwrap(), Some(vec!["300".to_string()]));
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod document;
mod path;

pub use document::{type_name, ConfigDocument, DocumentError};
pub use path::{ConfigPath, PathError};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
