//! Binary codec over `apache-avro`.
//!
//! [`BinarySchema`] wraps one parsed schema and converts between Avro binary
//! datums and the [`Native`] tree. The binary layout itself is delegated to
//! `apache_avro::{to_avro_datum, from_avro_datum}`; this module only bridges
//! the value representations:
//!
//! - unions are single-key maps keyed by the branch's Avro name
//! - enums are their symbol strings
//! - record fields missing from a map take the schema default, or fail
//!   with [`AvroRegistryError::SchemaMismatch`] when there is none

use std::collections::{BTreeMap, HashMap};

use apache_avro::schema::{RecordSchema, UnionSchema};
use apache_avro::types::Value;
use apache_avro::{from_avro_datum, to_avro_datum, Schema};
use serde_json::Value as JsonValue;

use super::native::Native;
use crate::error::{AvroRegistryError, Result};

/// One parsed schema able to encode and decode [`Native`] values.
#[derive(Debug, Clone)]
pub struct BinarySchema {
    schema: Schema,
    /// Named types by full name, for resolving references.
    names: HashMap<String, Schema>,
}

impl BinarySchema {
    /// Parse schema text.
    pub fn parse(text: &str) -> Result<Self> {
        let schema =
            Schema::parse_str(text).map_err(|e| AvroRegistryError::InvalidSchema(e.to_string()))?;
        Ok(Self::new(schema))
    }

    /// Wrap an already parsed schema.
    pub fn new(schema: Schema) -> Self {
        let mut names = HashMap::new();
        collect_names(&schema, &mut names);
        Self { schema, names }
    }

    /// The underlying schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Encode a native value into an Avro binary datum.
    pub fn encode(&self, native: &Native) -> Result<Vec<u8>> {
        let value = self.to_value(native, &self.schema, "")?;
        to_avro_datum(&self.schema, value)
            .map_err(|e| AvroRegistryError::SchemaMismatch(e.to_string()))
    }

    /// Decode an Avro binary datum into a native value.
    pub fn decode(&self, bytes: &[u8]) -> Result<Native> {
        let mut reader = bytes;
        let value = from_avro_datum(&self.schema, &mut reader, None)
            .map_err(|e| AvroRegistryError::Decode(e.to_string()))?;
        self.to_native(value, &self.schema)
    }

    fn resolve<'a>(&'a self, schema: &'a Schema) -> Result<&'a Schema> {
        match schema {
            Schema::Ref { name } => {
                let fullname = name.fullname(None);
                self.names.get(&fullname).ok_or_else(|| {
                    AvroRegistryError::InvalidSchema(format!("unresolved reference {}", fullname))
                })
            }
            other => Ok(other),
        }
    }

    fn to_value(&self, native: &Native, schema: &Schema, path: &str) -> Result<Value> {
        let schema = self.resolve(schema)?;
        let mismatch = || {
            AvroRegistryError::SchemaMismatch(format!(
                "{}: cannot encode {} as {}",
                display_path(path),
                native.kind(),
                branch_name(schema)
            ))
        };

        match schema {
            Schema::Null if native.is_null() => Ok(Value::Null),
            Schema::Boolean => match native {
                Native::Boolean(b) => Ok(Value::Boolean(*b)),
                _ => Err(mismatch()),
            },
            Schema::Int => as_int(native).map(Value::Int).ok_or_else(mismatch),
            Schema::Date => as_int(native).map(Value::Date).ok_or_else(mismatch),
            Schema::TimeMillis => as_int(native).map(Value::TimeMillis).ok_or_else(mismatch),
            Schema::Long => as_long(native).map(Value::Long).ok_or_else(mismatch),
            Schema::TimeMicros => as_long(native).map(Value::TimeMicros).ok_or_else(mismatch),
            Schema::TimestampMillis => {
                as_long(native).map(Value::TimestampMillis).ok_or_else(mismatch)
            }
            Schema::TimestampMicros => {
                as_long(native).map(Value::TimestampMicros).ok_or_else(mismatch)
            }
            Schema::LocalTimestampMillis => as_long(native)
                .map(Value::LocalTimestampMillis)
                .ok_or_else(mismatch),
            Schema::LocalTimestampMicros => as_long(native)
                .map(Value::LocalTimestampMicros)
                .ok_or_else(mismatch),
            Schema::Float => as_double(native)
                .map(|f| Value::Float(f as f32))
                .ok_or_else(mismatch),
            Schema::Double => as_double(native).map(Value::Double).ok_or_else(mismatch),
            Schema::Bytes => as_bytes(native).map(Value::Bytes).ok_or_else(mismatch),
            Schema::String => match native {
                Native::String(s) => Ok(Value::String(s.clone())),
                Native::Bytes(b) => String::from_utf8(b.clone())
                    .map(Value::String)
                    .map_err(|_| mismatch()),
                _ => Err(mismatch()),
            },
            Schema::Array(array) => match native {
                Native::Array(items) => items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| {
                        self.to_value(item, &array.items, &format!("{}[{}]", path, i))
                    })
                    .collect::<Result<Vec<_>>>()
                    .map(Value::Array),
                _ => Err(mismatch()),
            },
            Schema::Map(map) => match native {
                Native::Map(entries) => entries
                    .iter()
                    .map(|(k, v)| Ok((k.clone(), self.to_value(v, &map.types, &child(path, k))?)))
                    .collect::<Result<HashMap<_, _>>>()
                    .map(Value::Map),
                _ => Err(mismatch()),
            },
            Schema::Record(record) => match native {
                Native::Map(fields) => self.record_to_value(fields, record, path),
                _ => Err(mismatch()),
            },
            Schema::Enum(enum_schema) => match native {
                Native::String(symbol) => enum_schema
                    .symbols
                    .iter()
                    .position(|s| s == symbol)
                    .map(|idx| Value::Enum(idx as u32, symbol.clone()))
                    .ok_or_else(|| {
                        AvroRegistryError::SchemaMismatch(format!(
                            "{}: {:?} is not a symbol of enum {}",
                            display_path(path),
                            symbol,
                            enum_schema.name.fullname(None)
                        ))
                    }),
                _ => Err(mismatch()),
            },
            Schema::Fixed(fixed) => match as_bytes(native) {
                Some(bytes) if bytes.len() == fixed.size => Ok(Value::Fixed(fixed.size, bytes)),
                _ => Err(mismatch()),
            },
            Schema::Union(union) => self.union_to_value(native, union, path),
            _ => Err(mismatch()),
        }
    }

    fn record_to_value(
        &self,
        fields: &BTreeMap<String, Native>,
        record: &RecordSchema,
        path: &str,
    ) -> Result<Value> {
        let mut out = Vec::with_capacity(record.fields.len());
        for field in &record.fields {
            let field_path = child(path, &field.name);
            let value = match (fields.get(&field.name), &field.default) {
                (Some(native), _) => self.to_value(native, &field.schema, &field_path)?,
                (None, Some(default)) => {
                    let native = self.default_to_native(default, &field.schema, &field_path)?;
                    self.to_value(&native, &field.schema, &field_path)?
                }
                (None, None) => {
                    return Err(AvroRegistryError::SchemaMismatch(format!(
                        "{}: field of record {} has no value and no default",
                        field_path,
                        record.name.fullname(None)
                    )))
                }
            };
            out.push((field.name.clone(), value));
        }
        Ok(Value::Record(out))
    }

    fn union_to_value(&self, native: &Native, union: &UnionSchema, path: &str) -> Result<Value> {
        let (key, inner) = match native {
            Native::Null => ("null", native),
            other => other.as_union().ok_or_else(|| {
                AvroRegistryError::SchemaMismatch(format!(
                    "{}: union value must be null or a single-key map naming the branch, got {}",
                    display_path(path),
                    native.kind()
                ))
            })?,
        };

        let (idx, branch) = union
            .variants()
            .iter()
            .enumerate()
            .find(|(_, branch)| branch_matches(branch, key))
            .ok_or_else(|| {
                AvroRegistryError::SchemaMismatch(format!(
                    "{}: union has no branch named {:?}",
                    display_path(path),
                    key
                ))
            })?;

        let value = self.to_value(inner, branch, path)?;
        Ok(Value::Union(idx as u32, Box::new(value)))
    }

    fn to_native(&self, value: Value, schema: &Schema) -> Result<Native> {
        let schema = self.resolve(schema)?;
        let unexpected = |what: &str| {
            AvroRegistryError::Decode(format!(
                "decoded {} does not match schema {}",
                what,
                branch_name(schema)
            ))
        };

        Ok(match value {
            Value::Null => Native::Null,
            Value::Boolean(b) => Native::Boolean(b),
            Value::Int(i) | Value::Date(i) | Value::TimeMillis(i) => Native::Int(i),
            Value::Long(l)
            | Value::TimeMicros(l)
            | Value::TimestampMillis(l)
            | Value::TimestampMicros(l)
            | Value::LocalTimestampMillis(l)
            | Value::LocalTimestampMicros(l) => Native::Long(l),
            Value::Float(f) => Native::Float(f),
            Value::Double(d) => Native::Double(d),
            Value::Bytes(b) | Value::Fixed(_, b) => Native::Bytes(b),
            Value::String(s) | Value::Enum(_, s) => Native::String(s),
            Value::Uuid(u) => Native::String(u.to_string()),
            Value::Array(items) => {
                let Schema::Array(array) = schema else {
                    return Err(unexpected("array"));
                };
                Native::Array(
                    items
                        .into_iter()
                        .map(|item| self.to_native(item, &array.items))
                        .collect::<Result<_>>()?,
                )
            }
            Value::Map(entries) => {
                let Schema::Map(map) = schema else {
                    return Err(unexpected("map"));
                };
                Native::Map(
                    entries
                        .into_iter()
                        .map(|(k, v)| Ok((k, self.to_native(v, &map.types)?)))
                        .collect::<Result<_>>()?,
                )
            }
            Value::Record(fields) => {
                let Schema::Record(record) = schema else {
                    return Err(unexpected("record"));
                };
                let mut map = BTreeMap::new();
                for (name, value) in fields {
                    let field = record
                        .fields
                        .iter()
                        .find(|f| f.name == name)
                        .ok_or_else(|| unexpected(&format!("field {:?}", name)))?;
                    map.insert(name, self.to_native(value, &field.schema)?);
                }
                Native::Map(map)
            }
            Value::Union(idx, inner) => {
                let Schema::Union(union) = schema else {
                    return Err(unexpected("union"));
                };
                let branch = union
                    .variants()
                    .get(idx as usize)
                    .ok_or_else(|| unexpected(&format!("union branch {}", idx)))?;
                let inner = self.to_native(*inner, branch)?;
                if matches!(self.resolve(branch)?, Schema::Null) {
                    Native::Null
                } else {
                    Native::union(branch_name(branch), inner)
                }
            }
            other => {
                return Err(AvroRegistryError::Decode(format!(
                    "unsupported Avro value {:?}",
                    other
                )))
            }
        })
    }

    /// Convert a JSON schema default into a native value for `schema`.
    ///
    /// Union defaults always refer to the first branch.
    fn default_to_native(&self, json: &JsonValue, schema: &Schema, path: &str) -> Result<Native> {
        let schema = self.resolve(schema)?;
        let bad = || {
            AvroRegistryError::SchemaMismatch(format!(
                "{}: default {} does not fit {}",
                display_path(path),
                json,
                branch_name(schema)
            ))
        };

        let native = match schema {
            Schema::Null => json.is_null().then_some(Native::Null),
            Schema::Boolean => json.as_bool().map(Native::Boolean),
            Schema::Int | Schema::Date | Schema::TimeMillis => json
                .as_i64()
                .and_then(|v| i32::try_from(v).ok())
                .map(Native::Int),
            Schema::Long
            | Schema::TimeMicros
            | Schema::TimestampMillis
            | Schema::TimestampMicros
            | Schema::LocalTimestampMillis
            | Schema::LocalTimestampMicros => json.as_i64().map(Native::Long),
            Schema::Float => json.as_f64().map(|f| Native::Float(f as f32)),
            Schema::Double => json.as_f64().map(Native::Double),
            // Byte defaults are strings of code points 0-255.
            Schema::Bytes | Schema::Fixed(_) => json
                .as_str()
                .map(|s| Native::Bytes(s.chars().map(|c| c as u32 as u8).collect())),
            Schema::String | Schema::Enum(_) => json.as_str().map(Native::from),
            Schema::Array(array) => match json.as_array() {
                Some(items) => Some(Native::Array(
                    items
                        .iter()
                        .enumerate()
                        .map(|(i, item)| {
                            self.default_to_native(item, &array.items, &format!("{}[{}]", path, i))
                        })
                        .collect::<Result<_>>()?,
                )),
                None => None,
            },
            Schema::Map(map) => match json.as_object() {
                Some(entries) => Some(Native::Map(
                    entries
                        .iter()
                        .map(|(k, v)| {
                            Ok((k.clone(), self.default_to_native(v, &map.types, &child(path, k))?))
                        })
                        .collect::<Result<_>>()?,
                )),
                None => None,
            },
            Schema::Record(record) => match json.as_object() {
                Some(object) => {
                    let mut fields = BTreeMap::new();
                    for field in &record.fields {
                        let field_path = child(path, &field.name);
                        let source = object.get(&field.name).or(field.default.as_ref());
                        let Some(source) = source else {
                            return Err(AvroRegistryError::SchemaMismatch(format!(
                                "{}: default record lacks field with no default",
                                field_path
                            )));
                        };
                        fields.insert(
                            field.name.clone(),
                            self.default_to_native(source, &field.schema, &field_path)?,
                        );
                    }
                    Some(Native::Map(fields))
                }
                None => None,
            },
            Schema::Union(union) => {
                let first = union.variants().first().ok_or_else(bad)?;
                let inner = self.default_to_native(json, first, path)?;
                if matches!(self.resolve(first)?, Schema::Null) {
                    Some(Native::Null)
                } else {
                    Some(Native::union(branch_name(first), inner))
                }
            }
            _ => None,
        };
        native.ok_or_else(bad)
    }
}

/// Avro-visible name of a schema when used as a union branch.
pub fn branch_name(schema: &Schema) -> String {
    match schema {
        Schema::Null => "null".to_string(),
        Schema::Boolean => "boolean".to_string(),
        Schema::Int | Schema::Date | Schema::TimeMillis => "int".to_string(),
        Schema::Long
        | Schema::TimeMicros
        | Schema::TimestampMillis
        | Schema::TimestampMicros
        | Schema::LocalTimestampMillis
        | Schema::LocalTimestampMicros => "long".to_string(),
        Schema::Float => "float".to_string(),
        Schema::Double => "double".to_string(),
        Schema::Bytes => "bytes".to_string(),
        Schema::String | Schema::Uuid => "string".to_string(),
        Schema::Array(_) => "array".to_string(),
        Schema::Map(_) => "map".to_string(),
        Schema::Record(record) => record.name.fullname(None),
        Schema::Enum(enum_schema) => enum_schema.name.fullname(None),
        Schema::Fixed(fixed) => fixed.name.fullname(None),
        Schema::Ref { name } => name.fullname(None),
        other => format!("{:?}", other),
    }
}

/// A union key selects a branch by full name, or by bare name for named types.
fn branch_matches(branch: &Schema, key: &str) -> bool {
    let name = branch_name(branch);
    name == key || name.rsplit('.').next() == Some(key)
}

fn collect_names(schema: &Schema, names: &mut HashMap<String, Schema>) {
    match schema {
        Schema::Record(record) => {
            names.insert(record.name.fullname(None), schema.clone());
            for field in &record.fields {
                collect_names(&field.schema, names);
            }
        }
        Schema::Enum(enum_schema) => {
            names.insert(enum_schema.name.fullname(None), schema.clone());
        }
        Schema::Fixed(fixed) => {
            names.insert(fixed.name.fullname(None), schema.clone());
        }
        Schema::Array(array) => collect_names(&array.items, names),
        Schema::Map(map) => collect_names(&map.types, names),
        Schema::Union(union) => {
            for branch in union.variants() {
                collect_names(branch, names);
            }
        }
        _ => {}
    }
}

fn as_int(native: &Native) -> Option<i32> {
    match native {
        Native::Int(i) => Some(*i),
        Native::Long(l) => i32::try_from(*l).ok(),
        _ => None,
    }
}

fn as_long(native: &Native) -> Option<i64> {
    match native {
        Native::Int(i) => Some(i64::from(*i)),
        Native::Long(l) => Some(*l),
        _ => None,
    }
}

fn as_double(native: &Native) -> Option<f64> {
    match native {
        Native::Float(f) => Some(f64::from(*f)),
        Native::Double(d) => Some(*d),
        Native::Int(i) => Some(f64::from(*i)),
        Native::Long(l) => Some(*l as f64),
        _ => None,
    }
}

fn as_bytes(native: &Native) -> Option<Vec<u8>> {
    match native {
        Native::Bytes(b) => Some(b.clone()),
        Native::String(s) => Some(s.clone().into_bytes()),
        Native::Array(items) => items
            .iter()
            .map(|item| as_long(item).and_then(|v| u8::try_from(v).ok()))
            .collect(),
        _ => None,
    }
}

fn child(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", path, name)
    }
}

fn display_path(path: &str) -> &str {
    if path.is_empty() {
        "<root>"
    } else {
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PERSON: &str = r#"{
        "type": "record",
        "name": "Person",
        "fields": [
            {"name": "name", "type": "string"},
            {"name": "age", "type": "int"}
        ]
    }"#;

    fn person(name: &str, age: i32) -> Native {
        Native::from([("name", Native::from(name)), ("age", Native::Int(age))])
    }

    #[test]
    fn test_record_roundtrip() {
        let codec = BinarySchema::parse(PERSON).unwrap();
        let bytes = codec.encode(&person("Nico", 36)).unwrap();

        // "Nico" = len 4 (zigzag 8) + bytes, 36 zigzag = 72
        assert_eq!(bytes, vec![0x08, b'N', b'i', b'c', b'o', 72]);
        assert_eq!(codec.decode(&bytes).unwrap(), person("Nico", 36));
    }

    #[test]
    fn test_missing_field_without_default_fails() {
        let codec = BinarySchema::parse(PERSON).unwrap();
        let err = codec
            .encode(&Native::from([("age", Native::Int(1))]))
            .unwrap_err();

        assert!(matches!(err, AvroRegistryError::SchemaMismatch(_)));
        assert!(err.to_string().contains("name"));
    }

    #[test]
    fn test_missing_field_takes_default() {
        let codec = BinarySchema::parse(
            r#"{"type": "record", "name": "P", "fields": [
                {"name": "age", "type": "int", "default": -1}
            ]}"#,
        )
        .unwrap();

        let bytes = codec.encode(&Native::Map(BTreeMap::new())).unwrap();
        assert_eq!(bytes, vec![0x01]);
        assert_eq!(
            codec.decode(&bytes).unwrap(),
            Native::from([("age", Native::Int(-1))])
        );
    }

    #[test]
    fn test_extra_fields_are_ignored() {
        let codec = BinarySchema::parse(PERSON).unwrap();
        let mut value = person("Nico", 36);
        if let Native::Map(map) = &mut value {
            map.insert("height".into(), Native::Int(180));
        }

        let bytes = codec.encode(&value).unwrap();
        assert_eq!(codec.decode(&bytes).unwrap(), person("Nico", 36));
    }

    #[test]
    fn test_union_branches() {
        let codec = BinarySchema::parse(r#"["null", "string", "long"]"#).unwrap();

        let bytes = codec.encode(&Native::union("string", "testo".into())).unwrap();
        assert_eq!(
            codec.decode(&bytes).unwrap(),
            Native::union("string", "testo".into())
        );

        let bytes = codec.encode(&Native::Null).unwrap();
        assert_eq!(bytes, vec![0x00]);
        assert_eq!(codec.decode(&bytes).unwrap(), Native::Null);

        let bytes = codec.encode(&Native::union("null", Native::Null)).unwrap();
        assert_eq!(codec.decode(&bytes).unwrap(), Native::Null);
    }

    #[test]
    fn test_union_requires_wrapped_value() {
        let codec = BinarySchema::parse(r#"["null", "string"]"#).unwrap();

        let err = codec.encode(&Native::from("bare")).unwrap_err();
        assert!(matches!(err, AvroRegistryError::SchemaMismatch(_)));

        let err = codec
            .encode(&Native::union("int", Native::Int(1)))
            .unwrap_err();
        assert!(err.to_string().contains("no branch named"));
    }

    #[test]
    fn test_named_union_branch_uses_full_name() {
        let codec = BinarySchema::parse(
            r#"{"type": "record", "name": "Holder", "namespace": "lbc", "fields": [
                {"name": "inner", "type": ["null", {"type": "record", "name": "inner_rec",
                    "fields": [{"name": "v", "type": "int"}]}], "default": null}
            ]}"#,
        )
        .unwrap();

        let inner = Native::from([("v", Native::Int(3))]);
        let value = Native::from([("inner", Native::union("lbc.inner_rec", inner.clone()))]);
        let decoded = codec.decode(&codec.encode(&value).unwrap()).unwrap();
        assert_eq!(decoded, value);

        // Bare names are accepted on encode.
        let bare = Native::from([("inner", Native::union("inner_rec", inner))]);
        assert_eq!(codec.decode(&codec.encode(&bare).unwrap()).unwrap(), value);

        // Union default null applies when the field is absent.
        let empty = codec.encode(&Native::Map(BTreeMap::new())).unwrap();
        assert_eq!(
            codec.decode(&empty).unwrap(),
            Native::from([("inner", Native::Null)])
        );
    }

    #[test]
    fn test_enum_symbols() {
        let codec = BinarySchema::parse(
            r#"{"type": "enum", "name": "my_enum", "symbols": ["value1", "value2"]}"#,
        )
        .unwrap();

        let bytes = codec.encode(&Native::from("value2")).unwrap();
        assert_eq!(bytes, vec![0x02]);
        assert_eq!(codec.decode(&bytes).unwrap(), Native::from("value2"));

        let err = codec.encode(&Native::from("value3")).unwrap_err();
        assert!(err.to_string().contains("not a symbol"));
    }

    #[test]
    fn test_numeric_widening_and_narrowing() {
        let long = BinarySchema::parse(r#""long""#).unwrap();
        let bytes = long.encode(&Native::Int(7)).unwrap();
        assert_eq!(long.decode(&bytes).unwrap(), Native::Long(7));

        let int = BinarySchema::parse(r#""int""#).unwrap();
        assert!(int.encode(&Native::Long(7)).is_ok());
        assert!(int.encode(&Native::Long(i64::MAX)).is_err());

        let double = BinarySchema::parse(r#""double""#).unwrap();
        let bytes = double.encode(&Native::Float(1.5)).unwrap();
        assert_eq!(double.decode(&bytes).unwrap(), Native::Double(1.5));
    }

    #[test]
    fn test_bytes_accept_integer_arrays() {
        let codec = BinarySchema::parse(r#""bytes""#).unwrap();
        let array = Native::Array(vec![Native::Int(b'a'.into()), Native::Int(b'b'.into())]);

        let bytes = codec.encode(&array).unwrap();
        assert_eq!(codec.decode(&bytes).unwrap(), Native::Bytes(b"ab".to_vec()));
    }

    #[test]
    fn test_record_default_in_nested_record() {
        let codec = BinarySchema::parse(
            r#"{"type": "record", "name": "Outer", "fields": [
                {"name": "point", "type": {"type": "record", "name": "Point", "fields": [
                    {"name": "x", "type": "int"},
                    {"name": "y", "type": "int", "default": 9}
                ]}, "default": {"x": 1}}
            ]}"#,
        )
        .unwrap();

        let decoded = codec
            .decode(&codec.encode(&Native::Map(BTreeMap::new())).unwrap())
            .unwrap();
        assert_eq!(
            decoded,
            Native::from([(
                "point",
                Native::from([("x", Native::Int(1)), ("y", Native::Int(9))])
            )])
        );
    }

    #[test]
    fn test_invalid_schema() {
        let err = BinarySchema::parse("{not json").unwrap_err();
        assert!(matches!(err, AvroRegistryError::InvalidSchema(_)));
    }

    #[test]
    fn test_decode_garbage_fails() {
        let codec = BinarySchema::parse(PERSON).unwrap();
        let err = codec.decode(&[0xFF]).unwrap_err();
        assert!(matches!(err, AvroRegistryError::Decode(_)));
    }
}
