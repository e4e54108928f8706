//! Error types for key/value storage operations.

use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Key contains characters that cannot be mapped to a file name.
    #[error("Invalid storage key: {0:?}")]
    InvalidKey(String),

    /// Stored value is not valid JSON for the requested type.
    #[error("Failed to decode value under {key}: {source}")]
    Decode {
        /// Key whose value failed to decode.
        key: String,
        /// Underlying parser error.
        #[source]
        source: serde_json::Error,
    },

    /// Value could not be serialized to JSON.
    #[error("Failed to encode value under {key}: {source}")]
    Encode {
        /// Key whose value failed to encode.
        key: String,
        /// Underlying serializer error.
        #[source]
        source: serde_json::Error,
    },

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
