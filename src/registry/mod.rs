//! Schema registry clients.
//!
//! [`SchemaRegistry`] is the seam between the codec cache and the registry:
//!
//! - [`ConfluentSchemaRegistry`] - Confluent REST API over blocking `reqwest`
//! - [`MemorySchemaRegistry`] - in-process store for tests and offline use

mod confluent;
mod memory;

pub use confluent::{ConfluentSchemaRegistry, DEFAULT_REGISTRY_URL};
pub use memory::MemorySchemaRegistry;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::protocol::SchemaId;

/// Registry error code for an unknown subject.
pub const SUBJECT_NOT_FOUND: i32 = 40401;
/// Registry error code for an unknown schema.
pub const SCHEMA_NOT_FOUND: i32 = 40403;

/// A schema as stored by the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Schema {
    /// Schema definition text.
    pub schema: String,
    /// Subject the schema is registered under.
    pub subject: String,
    /// Version within the subject.
    pub version: i32,
    /// Registry-wide unique id.
    pub id: SchemaId,
}

/// Errors raised by registry clients.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Transport failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Unparsable request or response body.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error reported by the registry itself.
    #[error("{message} ({code})")]
    Api {
        /// Registry error code, e.g. 40403.
        code: i32,
        /// Registry error message.
        message: String,
    },

    /// Unknown subject, version or id.
    #[error("not found: {0}")]
    NotFound(String),

    /// Registry URL is not usable.
    #[error("invalid registry URL: {0}")]
    InvalidUrl(String),
}

impl RegistryError {
    /// Whether the error means the schema or subject does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            RegistryError::NotFound(_) => true,
            RegistryError::Api { code, .. } => {
                *code == SUBJECT_NOT_FOUND || *code == SCHEMA_NOT_FOUND
            }
            _ => false,
        }
    }
}

/// Result type for registry operations.
pub type RegistryResult<T> = std::result::Result<T, RegistryError>;

/// Operations the codec cache needs from a schema registry.
pub trait SchemaRegistry: Send {
    /// All subjects.
    fn subjects(&self) -> RegistryResult<Vec<String>>;

    /// Versions registered under `subject`.
    fn versions(&self, subject: &str) -> RegistryResult<Vec<i32>>;

    /// Register schema text under `subject`, returning its id.
    fn register_new_schema(&self, subject: &str, schema: &str) -> RegistryResult<SchemaId>;

    /// Look schema text up under `subject`.
    ///
    /// An unknown subject or schema is `Ok((false, None))`, not an error.
    fn is_registered(&self, subject: &str, schema: &str)
        -> RegistryResult<(bool, Option<Schema>)>;

    /// Schema text for a registry id.
    fn schema_by_id(&self, id: SchemaId) -> RegistryResult<String>;

    /// Schema registered under `subject` at `version`.
    fn schema_by_subject(&self, subject: &str, version: i32) -> RegistryResult<Schema>;

    /// Latest schema registered under `subject`.
    fn latest_schema(&self, subject: &str) -> RegistryResult<Schema>;

    /// Delete `subject`, returning the versions it had.
    fn delete_subject(&self, subject: &str) -> RegistryResult<Vec<i32>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_json_shape() {
        let schema: Schema = serde_json::from_str(
            r#"{"subject":"person","version":2,"id":7,"schema":"\"string\""}"#,
        )
        .unwrap();

        assert_eq!(schema.subject, "person");
        assert_eq!(schema.version, 2);
        assert_eq!(schema.id, 7);
        assert_eq!(schema.schema, r#""string""#);
    }

    #[test]
    fn test_schema_by_id_response_has_defaults() {
        let schema: Schema = serde_json::from_str(r#"{"schema":"\"int\""}"#).unwrap();
        assert_eq!(schema.schema, r#""int""#);
        assert_eq!(schema.id, 0);
    }

    #[test]
    fn test_is_not_found() {
        assert!(RegistryError::NotFound("x".into()).is_not_found());
        assert!(RegistryError::Api {
            code: SCHEMA_NOT_FOUND,
            message: "Schema not found".into()
        }
        .is_not_found());
        assert!(!RegistryError::Api {
            code: 50001,
            message: "backend".into()
        }
        .is_not_found());
    }

    #[test]
    fn test_api_error_display() {
        let err = RegistryError::Api {
            code: SUBJECT_NOT_FOUND,
            message: "Subject not found".into(),
        };
        assert_eq!(err.to_string(), "Subject not found (40401)");
    }
}
