//! Generic value tree exchanged with the binary codec.
//!
//! A union value is a [`Native::Map`] with exactly one key, the Avro name of
//! the chosen branch. A `null` branch decodes to plain [`Native::Null`].

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

/// Schema-agnostic value produced and consumed by the binary codec.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Native {
    /// Avro `null`.
    #[default]
    Null,
    /// Avro `boolean`.
    Boolean(bool),
    /// Avro `int`.
    Int(i32),
    /// Avro `long`.
    Long(i64),
    /// Avro `float`.
    Float(f32),
    /// Avro `double`.
    Double(f64),
    /// Avro `bytes` and `fixed`.
    Bytes(Vec<u8>),
    /// Avro `string` and enum symbols.
    String(String),
    /// Avro `array`.
    Array(Vec<Native>),
    /// Avro `record`, `map`, or a single-key union.
    Map(BTreeMap<String, Native>),
}

impl Native {
    /// Build a single-key union value.
    pub fn union(branch: impl Into<String>, value: Native) -> Self {
        let mut map = BTreeMap::new();
        map.insert(branch.into(), value);
        Native::Map(map)
    }

    /// Split a single-key map into its branch name and value.
    ///
    /// Maps with any other number of keys are not unions.
    pub fn as_union(&self) -> Option<(&str, &Native)> {
        match self {
            Native::Map(map) if map.len() == 1 => {
                map.iter().next().map(|(k, v)| (k.as_str(), v))
            }
            _ => None,
        }
    }

    /// Look up a field of a map value.
    pub fn get(&self, key: &str) -> Option<&Native> {
        match self {
            Native::Map(map) => map.get(key),
            _ => None,
        }
    }

    /// Check for `Null`.
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Native::Null)
    }

    /// Short kind name used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Native::Null => "null",
            Native::Boolean(_) => "boolean",
            Native::Int(_) => "int",
            Native::Long(_) => "long",
            Native::Float(_) => "float",
            Native::Double(_) => "double",
            Native::Bytes(_) => "bytes",
            Native::String(_) => "string",
            Native::Array(_) => "array",
            Native::Map(_) => "map",
        }
    }
}

impl From<&str> for Native {
    fn from(value: &str) -> Self {
        Native::String(value.to_string())
    }
}

impl From<String> for Native {
    fn from(value: String) -> Self {
        Native::String(value)
    }
}

impl From<i32> for Native {
    fn from(value: i32) -> Self {
        Native::Int(value)
    }
}

impl From<i64> for Native {
    fn from(value: i64) -> Self {
        Native::Long(value)
    }
}

impl From<bool> for Native {
    fn from(value: bool) -> Self {
        Native::Boolean(value)
    }
}

impl<const N: usize> From<[(&str, Native); N]> for Native {
    fn from(fields: [(&str, Native); N]) -> Self {
        Native::Map(
            fields
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }
}

impl Serialize for Native {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Native::Null => serializer.serialize_unit(),
            Native::Boolean(b) => serializer.serialize_bool(*b),
            Native::Int(i) => serializer.serialize_i32(*i),
            Native::Long(l) => serializer.serialize_i64(*l),
            Native::Float(f) => serializer.serialize_f32(*f),
            Native::Double(d) => serializer.serialize_f64(*d),
            Native::Bytes(b) => serializer.serialize_bytes(b),
            Native::String(s) => serializer.serialize_str(s),
            Native::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Native::Map(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map {
                    out.serialize_entry(k, v)?;
                }
                out.end()
            }
        }
    }
}

struct NativeVisitor;

impl<'de> Visitor<'de> for NativeVisitor {
    type Value = Native;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("any Avro value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Native, E> {
        Ok(Native::Boolean(v))
    }

    fn visit_i8<E: de::Error>(self, v: i8) -> Result<Native, E> {
        Ok(Native::Int(v.into()))
    }

    fn visit_i16<E: de::Error>(self, v: i16) -> Result<Native, E> {
        Ok(Native::Int(v.into()))
    }

    fn visit_i32<E: de::Error>(self, v: i32) -> Result<Native, E> {
        Ok(Native::Int(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Native, E> {
        Ok(Native::Long(v))
    }

    fn visit_u8<E: de::Error>(self, v: u8) -> Result<Native, E> {
        Ok(Native::Int(v.into()))
    }

    fn visit_u16<E: de::Error>(self, v: u16) -> Result<Native, E> {
        Ok(Native::Int(v.into()))
    }

    fn visit_u32<E: de::Error>(self, v: u32) -> Result<Native, E> {
        Ok(Native::Long(v.into()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Native, E> {
        i64::try_from(v)
            .map(Native::Long)
            .map_err(|_| E::custom(format!("{} does not fit in an Avro long", v)))
    }

    fn visit_f32<E: de::Error>(self, v: f32) -> Result<Native, E> {
        Ok(Native::Float(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Native, E> {
        Ok(Native::Double(v))
    }

    fn visit_char<E: de::Error>(self, v: char) -> Result<Native, E> {
        Ok(Native::String(v.to_string()))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Native, E> {
        Ok(Native::String(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Native, E> {
        Ok(Native::String(v))
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Native, E> {
        Ok(Native::Bytes(v.to_vec()))
    }

    fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> Result<Native, E> {
        Ok(Native::Bytes(v))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Native, E> {
        Ok(Native::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Native, E> {
        Ok(Native::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Native, D::Error> {
        Native::deserialize(deserializer)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Native, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Native::Array(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Native, A::Error> {
        let mut map = BTreeMap::new();
        while let Some((k, v)) = access.next_entry::<String, Native>()? {
            map.insert(k, v);
        }
        Ok(Native::Map(map))
    }
}

impl<'de> Deserialize<'de> for Native {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(NativeVisitor)
    }
}
