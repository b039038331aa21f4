//! Codec module - one schema, typed values in and Avro bytes out.
//!
//! - [`BinarySchema`] - Avro binary encoding of [`Native`] values (`apache-avro`)
//! - [`AvroCodec`] - binary schema plus the record mapper and naming context
//!
//! # Example
//!
//! ```
//! use avro_registry::AvroCodec;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct Person {
//!     name: String,
//!     age: i32,
//! }
//!
//! let codec = AvroCodec::new(r#"{
//!     "type": "record", "name": "Person",
//!     "fields": [{"name": "name", "type": "string"}, {"name": "age", "type": "int"}]
//! }"#).unwrap();
//!
//! let person = Person { name: "Nico".to_string(), age: 36 };
//! let encoded = codec.marshal(&person).unwrap();
//! let decoded: Person = codec.unmarshal(&encoded).unwrap();
//! assert_eq!(decoded, person);
//! ```

mod binary;
mod native;

pub use binary::{branch_name, BinarySchema};
pub use native::Native;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;
use crate::mapper::{from_native, to_native};
use crate::naming::{default_type_name_encoder, TypeNameEncoder, TypeNaming};

/// Codec for one schema.
#[derive(Debug, Clone)]
pub struct AvroCodec {
    schema_text: String,
    binary: BinarySchema,
    naming: TypeNaming,
}

impl AvroCodec {
    /// Build a codec with the default type-name encoder.
    ///
    /// The namespace is taken from the schema's top-level `namespace`.
    pub fn new(schema_text: &str) -> Result<Self> {
        Self::with_naming(schema_text, default_type_name_encoder(), None)
    }

    /// Build a codec with an explicit encoder and optional namespace override.
    pub fn with_naming(
        schema_text: &str,
        encoder: TypeNameEncoder,
        namespace: Option<String>,
    ) -> Result<Self> {
        let binary = BinarySchema::parse(schema_text)?;
        let namespace = namespace.or_else(|| schema_namespace(schema_text));
        Ok(Self {
            schema_text: schema_text.to_string(),
            binary,
            naming: TypeNaming::new(namespace, encoder),
        })
    }

    /// Schema definition text.
    #[inline]
    pub fn schema_text(&self) -> &str {
        &self.schema_text
    }

    /// Namespace applied to union branch names.
    #[inline]
    pub fn namespace(&self) -> Option<&str> {
        self.naming.namespace.as_deref()
    }

    /// Override the namespace.
    pub fn set_namespace(&mut self, namespace: Option<String>) {
        self.naming.namespace = namespace;
    }

    /// Replace the type-name encoder.
    pub fn set_type_name_encoder(&mut self, encoder: TypeNameEncoder) {
        self.naming.encoder = encoder;
    }

    /// Naming context used by the record mapper.
    #[inline]
    pub fn naming(&self) -> &TypeNaming {
        &self.naming
    }

    /// Encode a native value.
    #[inline]
    pub fn encode_native(&self, native: &Native) -> Result<Vec<u8>> {
        self.binary.encode(native)
    }

    /// Decode into a native value.
    #[inline]
    pub fn decode_native(&self, bytes: &[u8]) -> Result<Native> {
        self.binary.decode(bytes)
    }

    /// Encode a typed value.
    pub fn marshal<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        let native = to_native(value, &self.naming)?;
        self.binary.encode(&native)
    }

    /// Decode into a typed value.
    pub fn unmarshal<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        let native = self.binary.decode(bytes)?;
        from_native(native)
    }
}

/// Top-level `namespace` of a schema, if any.
fn schema_namespace(schema_text: &str) -> Option<String> {
    let json: serde_json::Value = serde_json::from_str(schema_text).ok()?;
    json.get("namespace")?
        .as_str()
        .filter(|ns| !ns.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AvroRegistryError;
    use serde::Deserialize;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    const OPTIONAL_FIELDS: &str = r#"{
        "type": "record",
        "name": "Person",
        "namespace": "lbc",
        "fields": [
            {"name": "Name", "type": ["null", "string"], "default": null},
            {"name": "Age", "type": ["null", "int"], "default": null},
            {"name": "Married", "type": ["null", "boolean"], "default": null}
        ]
    }"#;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    #[allow(non_snake_case)]
    struct OptionalPerson {
        Name: Option<String>,
        Age: Option<i32>,
        Married: Option<bool>,
    }

    #[test]
    fn test_namespace_from_schema() {
        let codec = AvroCodec::new(OPTIONAL_FIELDS).unwrap();
        assert_eq!(codec.namespace(), Some("lbc"));

        let codec = AvroCodec::new(r#""string""#).unwrap();
        assert_eq!(codec.namespace(), None);

        let codec = AvroCodec::with_naming(
            OPTIONAL_FIELDS,
            default_type_name_encoder(),
            Some("other".into()),
        )
        .unwrap();
        assert_eq!(codec.namespace(), Some("other"));
    }

    #[test]
    fn test_optional_fields_roundtrip() {
        let codec = AvroCodec::new(OPTIONAL_FIELDS).unwrap();

        let full = OptionalPerson {
            Name: Some("MyName".into()),
            Age: Some(42),
            Married: Some(true),
        };
        let decoded: OptionalPerson = codec.unmarshal(&codec.marshal(&full).unwrap()).unwrap();
        assert_eq!(decoded, full);

        let sparse = OptionalPerson {
            Name: Some("MyName".into()),
            Age: None,
            Married: None,
        };
        let decoded: OptionalPerson = codec.unmarshal(&codec.marshal(&sparse).unwrap()).unwrap();
        assert_eq!(decoded, sparse);
    }

    #[test]
    fn test_union_into_generic_map() {
        let codec = AvroCodec::new(r#"["null", "string"]"#).unwrap();
        let value = Native::union("string", "testo".into());

        let bytes = codec.encode_native(&value).unwrap();
        let decoded: BTreeMap<String, Native> = codec.unmarshal(&bytes).unwrap();
        assert_eq!(decoded.get("string"), Some(&Native::from("testo")));
    }

    #[test]
    fn test_type_name_encoder_changes_union_keys() {
        let mut codec = AvroCodec::new(
            r#"{"type": "record", "name": "R", "fields": [
                {"name": "v", "type": ["null", {"type": "record", "name": "INNER",
                    "fields": [{"name": "x", "type": "int"}]}]}
            ]}"#,
        )
        .unwrap();

        #[derive(Serialize)]
        struct Inner {
            x: i32,
        }

        #[derive(Serialize)]
        struct R {
            v: Option<Inner>,
        }

        let value = R {
            v: Some(Inner { x: 1 }),
        };

        // Default naming yields "inner", which the schema does not know.
        let err = codec.marshal(&value).unwrap_err();
        assert!(matches!(err, AvroRegistryError::SchemaMismatch(_)));

        codec.set_type_name_encoder(Arc::new(|name: &str| name.to_uppercase()));
        assert!(codec.marshal(&value).is_ok());
    }

    #[test]
    fn test_set_namespace_qualifies_union_keys() {
        #[derive(Serialize)]
        struct Inner {
            x: i32,
        }

        #[derive(Serialize)]
        struct R {
            v: Option<Inner>,
        }

        let mut codec = AvroCodec::new(
            r#"{"type": "record", "name": "R", "namespace": "lbc", "fields": [
                {"name": "v", "type": ["null", {"type": "record", "name": "inner",
                    "fields": [{"name": "x", "type": "int"}]}]}
            ]}"#,
        )
        .unwrap();
        let value = R {
            v: Some(Inner { x: 1 }),
        };
        assert!(codec.marshal(&value).is_ok());

        codec.set_namespace(Some("other".into()));
        assert_eq!(codec.namespace(), Some("other"));
        let err = codec.marshal(&value).unwrap_err();
        assert!(matches!(err, AvroRegistryError::SchemaMismatch(_)));

        codec.set_namespace(None);
        assert_eq!(codec.namespace(), None);
        assert!(codec.marshal(&value).is_ok());
    }

    #[test]
    fn test_invalid_schema_text() {
        let err = AvroCodec::new(r#"{"type": "record"}"#).unwrap_err();
        assert!(matches!(err, AvroRegistryError::InvalidSchema(_)));
    }
}
