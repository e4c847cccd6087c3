//! Error taxonomy for bundleplan.
//!
//! Missing flags, a missing version override and a placeholder that never
//! occurs are all resolved with defaults and never reach this type. What
//! remains is fatal: the configuration build stops before a descriptor exists.

/// bundleplan errors.
#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    /// The version-control collaborator could not report the current commit.
    #[error("commit lookup failed: {0}")]
    CommitLookup(String),

    /// The version-control collaborator could not report working-tree status.
    #[error("status lookup failed: {0}")]
    StatusLookup(String),

    #[error("invalid project config: {0}")]
    Config(String),

    #[error("invalid file pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl BundleError {
    /// Whether this error means provenance could not be established.
    pub fn is_provenance_failure(&self) -> bool {
        matches!(
            self,
            BundleError::CommitLookup(_) | BundleError::StatusLookup(_)
        )
    }
}

/// Result type for bundleplan operations.
pub type Result<T> = std::result::Result<T, BundleError>;
