//! # avro-registry
//!
//! Avro encoding of Rust values against a Confluent-style schema registry.
//!
//! Payloads carry a small schema id instead of the schema itself:
//!
//! ```text
//! [0x00][schema id: i32 big-endian][Avro binary body]
//! ```
//!
//! ## Architecture
//!
//! - **Codec cache** ([`CodecRegistry`]): one codec per schema id, lazily
//!   fetched from the registry; reconciles payloads written with older or
//!   newer schema versions
//! - **Record mapper** ([`mapper`]): serde-based mapping between typed values
//!   and the [`Native`] tree the binary codec works on
//! - **Registry clients** ([`registry`]): Confluent REST API and in-memory
//!
//! ## Example
//!
//! ```
//! use avro_registry::registry::MemorySchemaRegistry;
//! use avro_registry::CodecRegistry;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct Person {
//!     name: String,
//!     nickname: Option<String>,
//! }
//!
//! let schema = r#"{
//!     "type": "record", "name": "Person",
//!     "fields": [
//!         {"name": "name", "type": "string"},
//!         {"name": "nickname", "type": ["null", "string"], "default": null}
//!     ]
//! }"#;
//!
//! let mut codecs = CodecRegistry::builder("person")
//!     .registry(MemorySchemaRegistry::new())
//!     .schema(schema)
//!     .connect_or_register()
//!     .unwrap();
//!
//! let person = Person { name: "Nico".into(), nickname: Some("nic".into()) };
//! let payload = codecs.encode(&person).unwrap();
//! let decoded: Person = codecs.decode(&payload).unwrap();
//! assert_eq!(decoded, person);
//! ```

pub mod codec;
pub mod error;
pub mod mapper;
pub mod naming;
pub mod protocol;
pub mod registry;

mod codec_registry;

pub use codec::{AvroCodec, Native};
pub use codec_registry::{CodecRegistry, CodecRegistryBuilder};
pub use error::{AvroRegistryError, Result};
pub use mapper::{custom_decode, custom_name, is_default, AvroName, AvroUnmarshal};
