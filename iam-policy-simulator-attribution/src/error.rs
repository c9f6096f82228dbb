//! Error types for policy loading, merging and simulation

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::aws::AwsError;

/// Result type alias for operations that can fail with `AttributionError`
pub type AttributionResult<T> = std::result::Result<T, AttributionError>;

/// Errors raised while building policy documents or running a simulation.
///
/// File and JSON errors are author errors: they name the offending policy file
/// and are expected to end the run. Conditions that only weaken attribution
/// (missing positions, unknown Sids) are never reported through this type.
#[derive(Error, Debug)]
pub enum AttributionError {
    /// File system operation errors with detailed context
    #[error("File system error during {operation} on policy file '{path}': {source}")]
    FileSystem {
        /// The operation that failed (e.g. "read")
        operation: String,
        /// The policy file involved
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The policy file is not valid JSON
    #[error("JSON parsing error in policy file '{path}': {source}")]
    JsonParsing {
        /// The policy file that failed to parse
        path: PathBuf,
        /// The underlying JSON error
        #[source]
        source: serde_json::Error,
    },

    /// The policy file is JSON but not a policy-shaped document
    #[error("Invalid policy document '{path}': {message}")]
    InvalidDocument {
        /// The offending policy file
        path: PathBuf,
        /// What was wrong with it
        message: String,
    },

    /// Serializing a document for transmission failed
    #[error("Failed to serialize {context}: {source}")]
    Serialization {
        /// What was being serialized
        context: String,
        /// The underlying JSON error
        #[source]
        source: serde_json::Error,
    },

    /// The simulation call itself failed
    #[error(transparent)]
    Simulation(#[from] AwsError),
}

impl AttributionError {
    pub(crate) fn file_system(
        operation: impl Into<String>,
        path: impl AsRef<Path>,
        source: std::io::Error,
    ) -> Self {
        Self::FileSystem {
            operation: operation.into(),
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub(crate) fn json_parsing(path: impl AsRef<Path>, source: serde_json::Error) -> Self {
        Self::JsonParsing {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub(crate) fn invalid_document(path: impl AsRef<Path>, message: impl Into<String>) -> Self {
        Self::InvalidDocument {
            path: path.as_ref().to_path_buf(),
            message: message.into(),
        }
    }

    pub(crate) fn serialization(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Serialization {
            context: context.into(),
            source,
        }
    }

    /// Whether this error comes from broken policy input rather than the simulation call.
    #[must_use]
    pub const fn is_author_error(&self) -> bool {
        matches!(
            self,
            Self::FileSystem { .. } | Self::JsonParsing { .. } | Self::InvalidDocument { .. }
        )
    }
}
