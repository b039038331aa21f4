//! Serde `Serializer` producing [`Native`] values.
//!
//! Every serialized value carries a [`TypeTag`] next to it, so that an
//! enclosing `Option` can name its union branch after the inner value's type.

use std::collections::BTreeMap;

use serde::ser::{
    Impossible, Serialize, SerializeMap, SerializeSeq, SerializeStruct, SerializeTuple,
    SerializeTupleStruct, Serializer,
};

use super::capability::CUSTOM_NAME_TOKEN;
use crate::codec::Native;
use crate::error::{AvroRegistryError, Result};
use crate::naming::TypeNaming;

/// Where a value's union branch name comes from.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TypeTag {
    /// Rust type name, passed through the type-name encoder.
    Rust(&'static str),
    /// Avro name used as is (`string`, `bytes`, `array`, `map`, `null`).
    Builtin(&'static str),
    /// Name supplied by an `AvroName` implementation.
    Custom(String),
}

type Tagged = (Native, TypeTag);

/// Serializer from any `Serialize` value into [`Native`].
#[derive(Clone, Copy)]
pub(crate) struct NativeSerializer<'a> {
    naming: &'a TypeNaming,
}

impl<'a> NativeSerializer<'a> {
    pub(crate) fn new(naming: &'a TypeNaming) -> Self {
        Self { naming }
    }

    fn union_key(&self, tag: &TypeTag) -> String {
        match tag {
            TypeTag::Rust(name) => self.naming.qualify(&self.naming.encode_type_name(name)),
            TypeTag::Builtin(name) => name.to_string(),
            TypeTag::Custom(name) => self.naming.qualify(name),
        }
    }
}

fn unsupported(what: &str, name: &str, variant: &str) -> AvroRegistryError {
    AvroRegistryError::Encode(format!(
        "{} {}::{} is not supported, only fieldless enum variants map to Avro",
        what, name, variant
    ))
}

impl<'a> Serializer for NativeSerializer<'a> {
    type Ok = Tagged;
    type Error = AvroRegistryError;

    type SerializeSeq = SeqSerializer<'a>;
    type SerializeTuple = SeqSerializer<'a>;
    type SerializeTupleStruct = TupleStructSerializer<'a>;
    type SerializeTupleVariant = Impossible<Tagged, AvroRegistryError>;
    type SerializeMap = MapSerializer<'a>;
    type SerializeStruct = StructSerializer<'a>;
    type SerializeStructVariant = Impossible<Tagged, AvroRegistryError>;

    fn serialize_bool(self, v: bool) -> Result<Tagged> {
        Ok((Native::Boolean(v), TypeTag::Rust("bool")))
    }

    fn serialize_i8(self, v: i8) -> Result<Tagged> {
        Ok((Native::Int(v.into()), TypeTag::Rust("i8")))
    }

    fn serialize_i16(self, v: i16) -> Result<Tagged> {
        Ok((Native::Int(v.into()), TypeTag::Rust("i16")))
    }

    fn serialize_i32(self, v: i32) -> Result<Tagged> {
        Ok((Native::Int(v), TypeTag::Rust("i32")))
    }

    fn serialize_i64(self, v: i64) -> Result<Tagged> {
        Ok((Native::Long(v), TypeTag::Rust("i64")))
    }

    fn serialize_u8(self, v: u8) -> Result<Tagged> {
        Ok((Native::Int(v.into()), TypeTag::Rust("u8")))
    }

    fn serialize_u16(self, v: u16) -> Result<Tagged> {
        Ok((Native::Int(v.into()), TypeTag::Rust("u16")))
    }

    fn serialize_u32(self, v: u32) -> Result<Tagged> {
        // Carried as a long; the binary codec narrows it for `int` fields.
        Ok((Native::Long(v.into()), TypeTag::Rust("u32")))
    }

    fn serialize_u64(self, v: u64) -> Result<Tagged> {
        let v = i64::try_from(v).map_err(|_| {
            AvroRegistryError::Encode(format!("{} does not fit in an Avro long", v))
        })?;
        Ok((Native::Long(v), TypeTag::Rust("u64")))
    }

    fn serialize_f32(self, v: f32) -> Result<Tagged> {
        Ok((Native::Float(v), TypeTag::Rust("f32")))
    }

    fn serialize_f64(self, v: f64) -> Result<Tagged> {
        Ok((Native::Double(v), TypeTag::Rust("f64")))
    }

    fn serialize_char(self, v: char) -> Result<Tagged> {
        Ok((Native::String(v.to_string()), TypeTag::Builtin("string")))
    }

    fn serialize_str(self, v: &str) -> Result<Tagged> {
        Ok((Native::String(v.to_string()), TypeTag::Builtin("string")))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Tagged> {
        Ok((Native::Bytes(v.to_vec()), TypeTag::Builtin("bytes")))
    }

    fn serialize_none(self) -> Result<Tagged> {
        Ok((Native::Null, TypeTag::Builtin("null")))
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<Tagged> {
        let (inner, tag) = value.serialize(self)?;
        if tag == TypeTag::Builtin("null") {
            return Ok((inner, tag));
        }
        let key = self.union_key(&tag);
        Ok((Native::union(key, inner), tag))
    }

    fn serialize_unit(self) -> Result<Tagged> {
        Ok((Native::Null, TypeTag::Builtin("null")))
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Tagged> {
        Ok((Native::Null, TypeTag::Builtin("null")))
    }

    fn serialize_unit_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<Tagged> {
        Ok((Native::String(variant.to_string()), TypeTag::Rust(name)))
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        name: &'static str,
        value: &T,
    ) -> Result<Tagged> {
        let (inner, _) = value.serialize(self)?;
        Ok((inner, TypeTag::Rust(name)))
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _value: &T,
    ) -> Result<Tagged> {
        Err(unsupported("newtype variant", name, variant))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<SeqSerializer<'a>> {
        Ok(SeqSerializer {
            ser: self,
            items: Vec::with_capacity(len.unwrap_or(0)),
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<SeqSerializer<'a>> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        name: &'static str,
        len: usize,
    ) -> Result<TupleStructSerializer<'a>> {
        Ok(TupleStructSerializer {
            ser: self,
            name,
            items: Vec::with_capacity(len),
        })
    }

    fn serialize_tuple_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        Err(unsupported("tuple variant", name, variant))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<MapSerializer<'a>> {
        Ok(MapSerializer {
            ser: self,
            map: BTreeMap::new(),
            next_key: None,
        })
    }

    fn serialize_struct(self, name: &'static str, _len: usize) -> Result<StructSerializer<'a>> {
        Ok(StructSerializer {
            ser: self,
            name,
            fields: BTreeMap::new(),
        })
    }

    fn serialize_struct_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        Err(unsupported("struct variant", name, variant))
    }
}

pub(crate) struct SeqSerializer<'a> {
    ser: NativeSerializer<'a>,
    items: Vec<Native>,
}

impl<'a> SerializeSeq for SeqSerializer<'a> {
    type Ok = Tagged;
    type Error = AvroRegistryError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.items.push(value.serialize(self.ser)?.0);
        Ok(())
    }

    fn end(self) -> Result<Tagged> {
        Ok((Native::Array(self.items), TypeTag::Builtin("array")))
    }
}

impl<'a> SerializeTuple for SeqSerializer<'a> {
    type Ok = Tagged;
    type Error = AvroRegistryError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Tagged> {
        SerializeSeq::end(self)
    }
}

/// Tuple structs become arrays, except the custom-name carrier which holds
/// `(name, value)`.
pub(crate) struct TupleStructSerializer<'a> {
    ser: NativeSerializer<'a>,
    name: &'static str,
    items: Vec<Native>,
}

impl<'a> SerializeTupleStruct for TupleStructSerializer<'a> {
    type Ok = Tagged;
    type Error = AvroRegistryError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.items.push(value.serialize(self.ser)?.0);
        Ok(())
    }

    fn end(self) -> Result<Tagged> {
        if self.name != CUSTOM_NAME_TOKEN {
            return Ok((Native::Array(self.items), TypeTag::Rust(self.name)));
        }

        let mut items = self.items.into_iter();
        match (items.next(), items.next()) {
            (Some(Native::String(name)), Some(value)) => Ok((value, TypeTag::Custom(name))),
            _ => Err(AvroRegistryError::Encode(
                "malformed custom-name value".to_string(),
            )),
        }
    }
}

pub(crate) struct MapSerializer<'a> {
    ser: NativeSerializer<'a>,
    map: BTreeMap<String, Native>,
    next_key: Option<String>,
}

impl<'a> SerializeMap for MapSerializer<'a> {
    type Ok = Tagged;
    type Error = AvroRegistryError;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Result<()> {
        match key.serialize(self.ser)?.0 {
            Native::String(key) => {
                self.next_key = Some(key);
                Ok(())
            }
            other => Err(AvroRegistryError::Encode(format!(
                "map keys must be strings, got {}",
                other.kind()
            ))),
        }
    }

    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        let key = self.next_key.take().ok_or_else(|| {
            AvroRegistryError::Encode("map value serialized before its key".to_string())
        })?;
        self.map.insert(key, value.serialize(self.ser)?.0);
        Ok(())
    }

    fn end(self) -> Result<Tagged> {
        Ok((Native::Map(self.map), TypeTag::Builtin("map")))
    }
}

pub(crate) struct StructSerializer<'a> {
    ser: NativeSerializer<'a>,
    name: &'static str,
    fields: BTreeMap<String, Native>,
}

impl<'a> SerializeStruct for StructSerializer<'a> {
    type Ok = Tagged;
    type Error = AvroRegistryError;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<()> {
        self.fields
            .insert(key.to_string(), value.serialize(self.ser)?.0);
        Ok(())
    }

    fn end(self) -> Result<Tagged> {
        Ok((Native::Map(self.fields), TypeTag::Rust(self.name)))
    }
}
