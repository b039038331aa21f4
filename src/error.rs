//! Error types for avro-registry.

use std::fmt::Display;

use thiserror::Error;

use crate::registry::RegistryError;

/// Main error type for all codec and registry operations.
#[derive(Debug, Error)]
pub enum AvroRegistryError {
    /// Encoding attempted while no schema id is configured.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Wire-level framing error (bad magic byte, truncated header).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Schema registry failure, with the failing operation as context.
    #[error("Registry error during {operation}: {source}")]
    Registry {
        /// Registry operation that failed.
        operation: String,
        /// Underlying transport or API error.
        #[source]
        source: RegistryError,
    },

    /// A value does not fit the schema (missing field without default, wrong type).
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Failure while decoding a payload, including schema reconciliation.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Failure while mapping a value into the native tree.
    #[error("Encode error: {0}")]
    Encode(String),

    /// Schema text could not be parsed.
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),
}

impl AvroRegistryError {
    /// Wrap a registry error with the operation that produced it.
    pub fn registry(operation: impl Into<String>, source: RegistryError) -> Self {
        Self::Registry {
            operation: operation.into(),
            source,
        }
    }
}

impl serde::ser::Error for AvroRegistryError {
    fn custom<T: Display>(msg: T) -> Self {
        Self::Encode(msg.to_string())
    }
}

impl serde::de::Error for AvroRegistryError {
    fn custom<T: Display>(msg: T) -> Self {
        Self::Decode(msg.to_string())
    }
}

/// Result type alias using AvroRegistryError.
pub type Result<T> = std::result::Result<T, AvroRegistryError>;
