//! Error types for config observation

use lpc_core::{LookupError, ProfileError};
use lpc_document::DocumentError;

/// Errors comparing a desired value against an existing document
#[derive(Debug, thiserror::Error)]
pub enum ObserveError {
    /// The existing document has the wrong shape at the observed path
    #[error("unable to read {path} from the existing config: {source}")]
    MalformedDocument {
        path: String,
        #[source]
        source: DocumentError,
    },
}

/// Errors from a single observer step
///
/// Never fatal to an observation run; the step contributes no patch.
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    /// Existing document could not be read
    #[error(transparent)]
    Observe(#[from] ObserveError),

    /// Profile value is not a known profile
    #[error(transparent)]
    Profile(#[from] ProfileError),

    /// Profile source failed
    #[error("profile lookup failed: {0}")]
    Lookup(#[source] LookupError),
}
