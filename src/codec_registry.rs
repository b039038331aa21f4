//! Registry-backed codec cache.
//!
//! [`CodecRegistry`] holds the codecs of every schema id it has seen for one
//! subject. Encoding uses the current schema and frames the payload with the
//! 5-byte header. Decoding looks the writer schema up by the header id,
//! fetching it from the registry on first use.
//!
//! A payload written with another schema than the current one is reconciled:
//! it is decoded with the writer schema, re-encoded with the current schema
//! (missing fields take their defaults) and decoded again.
//!
//! # Example
//!
//! ```
//! use avro_registry::registry::MemorySchemaRegistry;
//! use avro_registry::CodecRegistry;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct Person {
//!     name: String,
//!     age: i32,
//! }
//!
//! let schema = r#"{
//!     "type": "record", "name": "Person",
//!     "fields": [{"name": "name", "type": "string"}, {"name": "age", "type": "int"}]
//! }"#;
//!
//! let mut codecs = CodecRegistry::builder("person")
//!     .registry(MemorySchemaRegistry::new())
//!     .schema(schema)
//!     .connect_or_register()
//!     .unwrap();
//!
//! let person = Person { name: "Nico".to_string(), age: 36 };
//! let payload = codecs.encode(&person).unwrap();
//! assert_eq!(payload[0], 0);
//!
//! let decoded: Person = codecs.decode(&payload).unwrap();
//! assert_eq!(decoded, person);
//! ```

use std::collections::HashMap;
use std::fmt;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::codec::{AvroCodec, Native};
use crate::error::{AvroRegistryError, Result};
use crate::naming::{default_type_name_encoder, TypeNameEncoder};
use crate::protocol::{build_frame, Frame, SchemaId, UNKNOWN_ID, UNKNOWN_VERSION};
use crate::registry::{
    ConfluentSchemaRegistry, RegistryError, Schema, SchemaRegistry, DEFAULT_REGISTRY_URL,
};

/// Builder for a [`CodecRegistry`].
///
/// Without a schema the cache starts empty and can only decode.
pub struct CodecRegistryBuilder {
    subject: String,
    registry: Option<Box<dyn SchemaRegistry>>,
    registry_url: String,
    schema: Option<String>,
    encoder: TypeNameEncoder,
    namespace: Option<String>,
}

impl CodecRegistryBuilder {
    /// Create a builder for `subject`.
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            registry: None,
            registry_url: DEFAULT_REGISTRY_URL.to_string(),
            schema: None,
            encoder: default_type_name_encoder(),
            namespace: None,
        }
    }

    /// Set the URL of the Confluent registry to connect to.
    ///
    /// Ignored when a client is given with [`registry`](Self::registry).
    /// Default: `http://localhost:8081`
    pub fn registry_url(mut self, url: impl Into<String>) -> Self {
        self.registry_url = url.into();
        self
    }

    /// Use an existing registry client.
    pub fn registry(mut self, registry: impl SchemaRegistry + 'static) -> Self {
        self.registry = Some(Box::new(registry));
        self
    }

    /// Set the schema used for encoding.
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Set the translator from Rust type names to Avro names.
    pub fn type_name_encoder<F>(mut self, encoder: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.encoder = std::sync::Arc::new(encoder);
        self
    }

    /// Override the namespace read from each schema.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Build the cache, requiring the schema to be registered already.
    pub fn connect(self) -> Result<CodecRegistry> {
        self.build(false)
    }

    /// Build the cache, registering the schema when it is missing.
    pub fn connect_or_register(self) -> Result<CodecRegistry> {
        self.build(true)
    }

    fn build(self, register_missing: bool) -> Result<CodecRegistry> {
        let registry = match self.registry {
            Some(registry) => registry,
            None => Box::new(
                ConfluentSchemaRegistry::new(&self.registry_url)
                    .map_err(|e| AvroRegistryError::registry("connect", e))?,
            ),
        };

        let mut codecs = CodecRegistry {
            subject: self.subject,
            registry,
            codecs: HashMap::new(),
            schemas: HashMap::new(),
            schema_id: UNKNOWN_ID,
            schema_version: UNKNOWN_VERSION,
            encoder: self.encoder,
            namespace: self.namespace,
        };

        match self.schema.filter(|schema| !schema.is_empty()) {
            Some(schema) => codecs.attach(&schema, register_missing)?,
            None => tracing::debug!("Codec registry for {} has no encoding schema", codecs.subject),
        }
        Ok(codecs)
    }
}

/// Codec cache for one subject.
///
/// `register` and `decode` update the cache and take `&mut self`; share a
/// cache between threads behind a lock.
pub struct CodecRegistry {
    subject: String,
    registry: Box<dyn SchemaRegistry>,
    codecs: HashMap<SchemaId, AvroCodec>,
    schemas: HashMap<SchemaId, Schema>,
    schema_id: SchemaId,
    schema_version: i32,
    encoder: TypeNameEncoder,
    namespace: Option<String>,
}

impl CodecRegistry {
    /// Create a builder for `subject`.
    pub fn builder(subject: impl Into<String>) -> CodecRegistryBuilder {
        CodecRegistryBuilder::new(subject)
    }

    /// Subject this cache registers and resolves schemas under.
    #[inline]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Current encoding schema id, [`UNKNOWN_ID`] when encoding is disabled.
    #[inline]
    pub fn schema_id(&self) -> SchemaId {
        self.schema_id
    }

    /// Current encoding schema version, [`UNKNOWN_VERSION`] when unknown.
    #[inline]
    pub fn schema_version(&self) -> i32 {
        self.schema_version
    }

    /// Cached codec for a schema id.
    pub fn codec(&self, id: SchemaId) -> Option<&AvroCodec> {
        self.codecs.get(&id)
    }

    /// Registry metadata of a schema this cache resolved or registered.
    pub fn schema(&self, id: SchemaId) -> Option<&Schema> {
        self.schemas.get(&id)
    }

    /// Ids of all cached codecs, ascending.
    pub fn cached_ids(&self) -> Vec<SchemaId> {
        let mut ids: Vec<_> = self.codecs.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Underlying registry client.
    pub fn registry(&self) -> &dyn SchemaRegistry {
        self.registry.as_ref()
    }

    /// Replace the type-name translator, for this cache and every cached codec.
    pub fn set_type_name_encoder(&mut self, encoder: TypeNameEncoder) {
        for codec in self.codecs.values_mut() {
            codec.set_type_name_encoder(encoder.clone());
        }
        self.encoder = encoder;
    }

    /// Register `schema` under the subject and make it the encoding schema.
    ///
    /// Returns the id confirmed by the registry.
    pub fn register(&mut self, schema: &str) -> Result<SchemaId> {
        let id = self
            .registry
            .register_new_schema(&self.subject, schema)
            .map_err(|e| AvroRegistryError::registry("register", e))?;
        tracing::debug!("Registered schema {} under {}", id, self.subject);

        let resolved = self.resolve(schema)?.ok_or_else(|| {
            tracing::warn!(
                "Schema {} registered under {} but not found on lookup",
                id,
                self.subject
            );
            self.not_registered()
        })?;
        self.adopt(schema, resolved)
    }

    /// Encode a value with the current schema, header included.
    pub fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Bytes> {
        let body = self.current_codec()?.marshal(value)?;
        Ok(build_frame(self.schema_id, &body))
    }

    /// Encode a native value with the current schema, header included.
    pub fn encode_native(&self, value: &Native) -> Result<Bytes> {
        let body = self.current_codec()?.encode_native(value)?;
        Ok(build_frame(self.schema_id, &body))
    }

    /// Decode a framed payload into `T`.
    ///
    /// Payloads from another schema than the current one are reconciled
    /// through the current schema first.
    pub fn decode<T: DeserializeOwned>(&mut self, payload: &[u8]) -> Result<T> {
        self.decode_frame(Frame::parse(Bytes::copy_from_slice(payload))?)
    }

    /// Decode an already parsed frame into `T`.
    pub fn decode_frame<T: DeserializeOwned>(&mut self, frame: Frame) -> Result<T> {
        let writer_id = frame.schema_id();
        self.load_codec(writer_id)?;

        if writer_id == self.schema_id || self.schema_id == UNKNOWN_ID {
            return self.cached_codec(writer_id)?.unmarshal(frame.body());
        }

        let reframed = Frame::parse(self.reconcile(writer_id, frame.body())?)?;
        self.decode_frame(reframed).map_err(|e| {
            AvroRegistryError::Decode(format!("decoding reconciled payload: {}", e))
        })
    }

    /// Decode a framed payload into the native tree.
    pub fn decode_native(&mut self, payload: &[u8]) -> Result<Native> {
        self.decode(payload)
    }

    fn attach(&mut self, schema: &str, register_missing: bool) -> Result<()> {
        match self.resolve(schema)? {
            Some(resolved) => {
                self.adopt(schema, resolved)?;
            }
            None if register_missing => {
                self.register(schema)?;
            }
            None => {
                tracing::warn!("Schema is not registered under {}", self.subject);
                return Err(self.not_registered());
            }
        }
        Ok(())
    }

    fn resolve(&self, schema: &str) -> Result<Option<Schema>> {
        let (found, resolved) = self
            .registry
            .is_registered(&self.subject, schema)
            .map_err(|e| AvroRegistryError::registry("resolve", e))?;
        Ok(resolved.filter(|_| found))
    }

    fn not_registered(&self) -> AvroRegistryError {
        AvroRegistryError::registry(
            "resolve",
            RegistryError::NotFound(format!("schema under subject {}", self.subject)),
        )
    }

    fn adopt(&mut self, text: &str, schema: Schema) -> Result<SchemaId> {
        let codec = self.new_codec(text)?;
        let id = schema.id;
        self.codecs.insert(id, codec);
        self.schema_id = id;
        self.schema_version = schema.version;
        self.schemas.insert(id, schema);
        tracing::debug!(
            "Encoding with schema {} version {} of {}",
            id,
            self.schema_version,
            self.subject
        );
        Ok(id)
    }

    fn new_codec(&self, text: &str) -> Result<AvroCodec> {
        AvroCodec::with_naming(text, self.encoder.clone(), self.namespace.clone())
    }

    fn load_codec(&mut self, id: SchemaId) -> Result<()> {
        if self.codecs.contains_key(&id) {
            return Ok(());
        }

        tracing::debug!("Schema {} not cached, fetching from registry", id);
        let text = self
            .registry
            .schema_by_id(id)
            .map_err(|e| AvroRegistryError::registry("fetch", e))?;
        let codec = self.new_codec(&text)?;
        self.codecs.insert(id, codec);
        Ok(())
    }

    fn cached_codec(&self, id: SchemaId) -> Result<&AvroCodec> {
        self.codecs
            .get(&id)
            .ok_or_else(|| AvroRegistryError::Decode(format!("no codec for schema {}", id)))
    }

    fn current_codec(&self) -> Result<&AvroCodec> {
        if self.schema_id == UNKNOWN_ID {
            return Err(AvroRegistryError::Configuration(
                "no encoding schema has been initialized".to_string(),
            ));
        }
        self.codecs.get(&self.schema_id).ok_or_else(|| {
            AvroRegistryError::Configuration(format!(
                "no codec for encoding schema {}",
                self.schema_id
            ))
        })
    }

    /// Re-encode a body written with `writer_id` under the current schema.
    fn reconcile(&self, writer_id: SchemaId, body: &[u8]) -> Result<Bytes> {
        tracing::debug!(
            "Reconciling payload from schema {} to schema {}",
            writer_id,
            self.schema_id
        );

        let native = self
            .cached_codec(writer_id)?
            .decode_native(body)
            .map_err(|e| {
                AvroRegistryError::Decode(format!(
                    "decoding with writer schema {}: {}",
                    writer_id, e
                ))
            })?;

        let body = self
            .cached_codec(self.schema_id)?
            .encode_native(&native)
            .map_err(|e| {
                AvroRegistryError::Decode(format!(
                    "re-encoding with schema {}: {}",
                    self.schema_id, e
                ))
            })?;

        Ok(build_frame(self.schema_id, &body))
    }
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("subject", &self.subject)
            .field("schema_id", &self.schema_id)
            .field("schema_version", &self.schema_version)
            .field("cached_ids", &self.cached_ids())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::HEADER_SIZE;
    use crate::registry::MemorySchemaRegistry;
    use std::sync::Arc;

    const PERSON: &str = r#"{
        "type": "record",
        "name": "Person",
        "fields": [
            {"name": "name", "type": "string"},
            {"name": "age", "type": "int"}
        ]
    }"#;

    fn memory_cache(registry: &MemorySchemaRegistry, schema: &str) -> CodecRegistry {
        CodecRegistry::builder("person")
            .registry(registry.clone())
            .schema(schema)
            .connect_or_register()
            .unwrap()
    }

    #[test]
    fn test_connect_requires_registered_schema() {
        let err = CodecRegistry::builder("person")
            .registry(MemorySchemaRegistry::new())
            .schema(PERSON)
            .connect()
            .unwrap_err();

        match err {
            AvroRegistryError::Registry { operation, source } => {
                assert_eq!(operation, "resolve");
                assert!(source.is_not_found());
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_connect_attaches_existing_schema() {
        let registry = MemorySchemaRegistry::new();
        registry.register_new_schema("person", "\"int\"").unwrap();
        registry.register_new_schema("person", PERSON).unwrap();

        let codecs = CodecRegistry::builder("person")
            .registry(registry)
            .schema(PERSON)
            .connect()
            .unwrap();

        assert_eq!(codecs.schema_id(), 1);
        assert_eq!(codecs.schema_version(), 2);
        assert_eq!(codecs.schema(1).map(|s| s.subject.as_str()), Some("person"));
    }

    #[test]
    fn test_empty_mode() {
        let codecs = CodecRegistry::builder("person")
            .registry(MemorySchemaRegistry::new())
            .schema("")
            .connect()
            .unwrap();

        assert_eq!(codecs.schema_id(), UNKNOWN_ID);
        assert_eq!(codecs.schema_version(), UNKNOWN_VERSION);
        assert!(codecs.cached_ids().is_empty());

        let err = codecs.encode(&Native::Null).unwrap_err();
        assert!(matches!(err, AvroRegistryError::Configuration(_)));
    }

    #[test]
    fn test_register_switches_encoding_schema() {
        let registry = MemorySchemaRegistry::new();
        let mut codecs = memory_cache(&registry, "\"int\"");
        assert_eq!(codecs.schema_id(), 0);

        let id = codecs.register("\"long\"").unwrap();
        assert_eq!(id, 1);
        assert_eq!(codecs.schema_id(), 1);
        assert_eq!(codecs.cached_ids(), vec![0, 1]);

        let payload = codecs.encode(&5i64).unwrap();
        assert_eq!(&payload[..HEADER_SIZE], &[0, 0, 0, 0, 1]);
    }

    #[test]
    fn test_decode_fetches_unknown_ids() {
        let registry = MemorySchemaRegistry::new();
        let writer = memory_cache(&registry, PERSON);
        let payload = writer
            .encode_native(&Native::from([
                ("name", Native::from("Nico")),
                ("age", Native::Int(36)),
            ]))
            .unwrap();

        let mut reader = CodecRegistry::builder("person")
            .registry(registry)
            .connect()
            .unwrap();
        assert!(reader.codec(0).is_none());

        let decoded = reader.decode_native(&payload).unwrap();
        assert_eq!(decoded.get("age"), Some(&Native::Int(36)));
        assert!(reader.codec(0).is_some());
    }

    #[test]
    fn test_decode_unknown_id_fails_with_registry_error() {
        let mut codecs = CodecRegistry::builder("person")
            .registry(MemorySchemaRegistry::new())
            .connect()
            .unwrap();

        let err = codecs.decode_native(&[0, 0, 0, 0, 9, 0]).unwrap_err();
        match err {
            AvroRegistryError::Registry { operation, .. } => assert_eq!(operation, "fetch"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_decode_rejects_bad_header() {
        let registry = MemorySchemaRegistry::new();
        let mut codecs = memory_cache(&registry, PERSON);

        let err = codecs.decode_native(&[1, 0, 0, 0, 0, 0]).unwrap_err();
        assert!(matches!(err, AvroRegistryError::Protocol(_)));

        let err = codecs.decode_native(&[0, 0]).unwrap_err();
        assert!(matches!(err, AvroRegistryError::Protocol(_)));
    }

    #[test]
    fn test_decode_frame_reconciles() {
        let registry = MemorySchemaRegistry::new();
        let writer = memory_cache(&registry, "\"int\"");
        let mut reader = memory_cache(&registry, "\"long\"");

        let frame = Frame::parse(writer.encode(&7i32).unwrap()).unwrap();
        assert_eq!(frame.schema_id(), 0);

        let decoded: i64 = reader.decode_frame(frame.clone()).unwrap();
        assert_eq!(decoded, 7);
        assert_eq!(reader.decode_native(&frame.to_bytes()).unwrap(), Native::Long(7));
    }

    #[test]
    fn test_set_type_name_encoder_applies_to_cached_codecs() {
        let registry = MemorySchemaRegistry::new();
        let mut codecs = memory_cache(&registry, PERSON);

        codecs.set_type_name_encoder(Arc::new(|name: &str| format!("x_{}", name)));
        let codec = codecs.codec(codecs.schema_id()).unwrap();
        assert_eq!(codec.naming().encode_type_name("Person"), "x_Person");

        codecs.register("\"string\"").unwrap();
        let codec = codecs.codec(codecs.schema_id()).unwrap();
        assert_eq!(codec.naming().encode_type_name("Person"), "x_Person");
    }

    #[test]
    fn test_namespace_override_reaches_codecs() {
        let codecs = CodecRegistry::builder("person")
            .registry(MemorySchemaRegistry::new())
            .schema(PERSON)
            .namespace("lbc")
            .connect_or_register()
            .unwrap();

        let codec = codecs.codec(codecs.schema_id()).unwrap();
        assert_eq!(codec.namespace(), Some("lbc"));
    }

    #[test]
    fn test_invalid_registry_url() {
        let err = CodecRegistry::builder("person")
            .registry_url("not a url")
            .connect()
            .unwrap_err();

        match err {
            AvroRegistryError::Registry { operation, source } => {
                assert_eq!(operation, "connect");
                assert!(matches!(source, RegistryError::InvalidUrl(_)));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
