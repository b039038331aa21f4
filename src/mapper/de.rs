//! Serde `Deserializer` over [`Native`] values.
//!
//! `Option` destinations unwrap single-key union maps; everything else is
//! handed to the visitor as is.

use serde::de::value::{MapDeserializer, SeqDeserializer, StringDeserializer};
use serde::de::{Deserializer, IntoDeserializer, Visitor};
use serde::forward_to_deserialize_any;

use crate::codec::Native;
use crate::error::{AvroRegistryError, Result};

impl<'de> IntoDeserializer<'de, AvroRegistryError> for Native {
    type Deserializer = Native;

    fn into_deserializer(self) -> Native {
        self
    }
}

fn visit_array<'de, V: Visitor<'de>>(items: Vec<Native>, visitor: V) -> Result<V::Value> {
    let mut seq = SeqDeserializer::<_, AvroRegistryError>::new(items.into_iter());
    let value = visitor.visit_seq(&mut seq)?;
    seq.end()?;
    Ok(value)
}

fn visit_map<'de, V, I>(entries: I, visitor: V) -> Result<V::Value>
where
    V: Visitor<'de>,
    I: Iterator<Item = (String, Native)>,
{
    let mut map = MapDeserializer::<_, AvroRegistryError>::new(entries);
    let value = visitor.visit_map(&mut map)?;
    map.end()?;
    Ok(value)
}

impl<'de> Deserializer<'de> for Native {
    type Error = AvroRegistryError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self {
            Native::Null => visitor.visit_unit(),
            Native::Boolean(b) => visitor.visit_bool(b),
            Native::Int(i) => visitor.visit_i32(i),
            Native::Long(l) => visitor.visit_i64(l),
            Native::Float(f) => visitor.visit_f32(f),
            Native::Double(d) => visitor.visit_f64(d),
            Native::Bytes(b) => visitor.visit_byte_buf(b),
            Native::String(s) => visitor.visit_string(s),
            Native::Array(items) => visit_array(items, visitor),
            Native::Map(map) => visit_map(map.into_iter(), visitor),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self {
            Native::Null => visitor.visit_none(),
            Native::Map(mut map) if map.len() == 1 => match map.pop_first() {
                Some((_, inner)) => visitor.visit_some(inner),
                None => visitor.visit_none(),
            },
            other => visitor.visit_some(other),
        }
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        match self {
            Native::Null => visit_map(std::iter::empty(), visitor),
            other => other.deserialize_any(visitor),
        }
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        match self {
            Native::String(symbol) => {
                let symbol: StringDeserializer<AvroRegistryError> = symbol.into_deserializer();
                visitor.visit_enum(symbol)
            }
            other => Err(AvroRegistryError::Decode(format!(
                "enum {} expects a symbol string, got {}",
                name,
                other.kind()
            ))),
        }
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self {
            Native::Bytes(bytes) => {
                let mut seq = SeqDeserializer::<_, AvroRegistryError>::new(bytes.into_iter());
                let value = visitor.visit_seq(&mut seq)?;
                seq.end()?;
                Ok(value)
            }
            other => other.deserialize_any(visitor),
        }
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_string(visitor)
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self {
            Native::Bytes(bytes) => match String::from_utf8(bytes) {
                Ok(s) => visitor.visit_string(s),
                Err(e) => visitor.visit_byte_buf(e.into_bytes()),
            },
            other => other.deserialize_any(visitor),
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_unit()
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char bytes byte_buf
        unit unit_struct tuple tuple_struct map identifier
    }
}
