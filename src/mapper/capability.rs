//! Per-field capabilities for structured types.
//!
//! Field-level behaviour is declared with serde attributes:
//!
//! | capability      | attribute                                                            |
//! |-----------------|----------------------------------------------------------------------|
//! | omit            | `#[serde(skip)]`                                                     |
//! | omit-if-default | `#[serde(skip_serializing_if = "avro_registry::is_default")]`        |
//! | custom name     | `#[serde(with = "avro_registry::custom_name")]` (`::option` for `Option`) |
//! | custom decode   | `#[serde(with = "avro_registry::custom_decode")]` (`::option` for `Option`) |
//!
//! An omitted field is filled from the schema default when encoding, or
//! fails with a schema mismatch when the schema declares none.

use std::fmt::{self, Display};

use serde::de::{self, Deserialize, Deserializer, Visitor};
use serde::ser::{Serialize, SerializeTupleStruct, Serializer};

/// Tuple-struct name recognised by the record mapper as `(name, value)`.
pub(crate) const CUSTOM_NAME_TOKEN: &str = "$avro_registry::private::CustomName";

/// `true` when `value` equals its type's default.
///
/// Meant for `skip_serializing_if`.
pub fn is_default<T: Default + PartialEq>(value: &T) -> bool {
    *value == T::default()
}

/// Explicit Avro name of a type, used as its union branch name.
///
/// The name is used verbatim and namespace-prefixed unless it is a
/// primitive name or already qualified.
pub trait AvroName {
    /// Avro-visible type name.
    fn avro_name(&self) -> String;
}

/// Serde helpers attaching an [`AvroName`] to a field.
///
/// Only the record mapper understands the attached name; other serializers
/// see a `(name, value)` tuple.
pub mod custom_name {
    use super::*;

    struct Named<'a, T: ?Sized>(&'a T);

    impl<T: AvroName + Serialize + ?Sized> Serialize for Named<'_, T> {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let mut carrier = serializer.serialize_tuple_struct(CUSTOM_NAME_TOKEN, 2)?;
            carrier.serialize_field(&self.0.avro_name())?;
            carrier.serialize_field(self.0)?;
            carrier.end()
        }
    }

    /// Serialize `value` carrying its [`AvroName`].
    pub fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: AvroName + Serialize,
        S: Serializer,
    {
        Named(value).serialize(serializer)
    }

    /// Plain deserialization; the name only matters when encoding.
    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        T::deserialize(deserializer)
    }

    /// Same helpers for `Option` fields.
    pub mod option {
        use super::*;

        /// Serialize `Some(value)` as a union branch named after the value.
        pub fn serialize<T, S>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
        where
            T: AvroName + Serialize,
            S: Serializer,
        {
            match value {
                Some(v) => serializer.serialize_some(&Named(v)),
                None => serializer.serialize_none(),
            }
        }

        /// Plain `Option` deserialization.
        pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
        where
            T: Deserialize<'de>,
            D: Deserializer<'de>,
        {
            Option::<T>::deserialize(deserializer)
        }
    }
}

/// Type decoded from the raw string or bytes of its Avro value.
pub trait AvroUnmarshal: Sized {
    /// Error reported when `data` is not acceptable.
    type Error: Display;

    /// Build the value from raw data.
    fn unmarshal_avro(data: &[u8]) -> Result<Self, Self::Error>;
}

/// Raw payload of a string or bytes value.
struct RawData(Vec<u8>);

impl<'de> Deserialize<'de> for RawData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RawVisitor;

        impl<'de> Visitor<'de> for RawVisitor {
            type Value = RawData;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a string or bytes value")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<RawData, E> {
                Ok(RawData(v.as_bytes().to_vec()))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<RawData, E> {
                Ok(RawData(v.into_bytes()))
            }

            fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<RawData, E> {
                Ok(RawData(v.to_vec()))
            }

            fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> Result<RawData, E> {
                Ok(RawData(v))
            }
        }

        deserializer.deserialize_any(RawVisitor)
    }
}

/// Serde helpers routing a field through [`AvroUnmarshal`].
///
/// Encoding writes the value's `Display` output as a string.
pub mod custom_decode {
    use super::*;

    /// Serialize through `Display`.
    pub fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Display,
        S: Serializer,
    {
        serializer.collect_str(value)
    }

    /// Decode the raw string or bytes with [`AvroUnmarshal::unmarshal_avro`].
    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        T: AvroUnmarshal,
        D: Deserializer<'de>,
    {
        let RawData(data) = RawData::deserialize(deserializer)?;
        T::unmarshal_avro(&data).map_err(de::Error::custom)
    }

    /// Same helpers for `Option` fields.
    pub mod option {
        use super::*;

        /// Serialize `Some` through `Display`, `None` as null.
        pub fn serialize<T, S>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
        where
            T: Display,
            S: Serializer,
        {
            match value {
                Some(v) => serializer.serialize_some(&v.to_string()),
                None => serializer.serialize_none(),
            }
        }

        /// Decode a present value with [`AvroUnmarshal::unmarshal_avro`].
        pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
        where
            T: AvroUnmarshal,
            D: Deserializer<'de>,
        {
            match Option::<RawData>::deserialize(deserializer)? {
                Some(RawData(data)) => T::unmarshal_avro(&data)
                    .map(Some)
                    .map_err(de::Error::custom),
                None => Ok(None),
            }
        }
    }
}
