//! Type-name translation from Rust identifiers to Avro-visible names.
//!
//! Two independent mappings are composed for the default behaviour:
//! - [`rust_to_avro_type`] maps Rust primitive names to Avro primitive names
//! - [`camel_to_snake`] translates `CamelCase` identifiers to `snake_case`
//!
//! Either can be swapped through a custom [`TypeNameEncoder`].
//!
//! # Example
//!
//! ```
//! use avro_registry::naming::{add_namespace, default_type_name};
//!
//! assert_eq!(default_type_name("i64"), "long");
//! assert_eq!(default_type_name("LogoImageURL"), "logo_image_url");
//! assert_eq!(add_namespace("my.example", "address"), "my.example.address");
//! ```

use std::fmt;
use std::sync::Arc;

/// Translates a Rust type name into its Avro name.
pub type TypeNameEncoder = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Avro primitive type names. These are never namespaced.
pub const AVRO_PRIMITIVES: [&str; 8] = [
    "null", "boolean", "int", "long", "float", "double", "bytes", "string",
];

/// Map a Rust primitive type name to the Avro primitive carrying it.
///
/// Anything that is not a Rust numeric or boolean primitive passes through.
pub fn rust_to_avro_type(name: &str) -> &str {
    match name {
        "i8" | "i16" | "i32" | "u8" | "u16" | "u32" => "int",
        "i64" | "u64" | "isize" | "usize" => "long",
        "f32" => "float",
        "f64" => "double",
        "bool" => "boolean",
        other => other,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Lower,
    Upper,
    Digit,
    Other,
}

impl CharClass {
    fn of(c: char) -> Self {
        if c.is_lowercase() {
            CharClass::Lower
        } else if c.is_uppercase() {
            CharClass::Upper
        } else if c.is_numeric() {
            CharClass::Digit
        } else {
            CharClass::Other
        }
    }
}

/// Translate a `CamelCase` identifier into `snake_case`.
///
/// The identifier is split on case, digit and acronym boundaries; segments
/// are lowercased and joined with `_`. Non-alphanumeric characters act as
/// separators, so already snake-cased names are left as they are.
///
/// Acronyms followed by a lowercase run lose their last letter to it:
/// `LogoImageURLs` becomes `logo_image_ur_ls`.
pub fn camel_to_snake(name: &str) -> String {
    let mut runs: Vec<(CharClass, String)> = Vec::new();
    for c in name.chars() {
        let class = CharClass::of(c);
        match runs.last_mut() {
            Some((last, run)) if *last == class => run.push(c),
            _ => runs.push((class, c.to_string())),
        }
    }

    for i in 1..runs.len() {
        if runs[i - 1].0 == CharClass::Upper && runs[i].0 == CharClass::Lower {
            if let Some(c) = runs[i - 1].1.pop() {
                runs[i].1.insert(0, c);
            }
        }
    }

    runs.into_iter()
        .filter(|(class, run)| *class != CharClass::Other && !run.is_empty())
        .map(|(_, run)| run.to_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}

/// Default translation: primitive table first, then snake casing.
pub fn default_type_name(name: &str) -> String {
    camel_to_snake(rust_to_avro_type(name))
}

/// The default [`TypeNameEncoder`].
pub fn default_type_name_encoder() -> TypeNameEncoder {
    Arc::new(default_type_name)
}

/// Join a namespace and a type name the Avro way.
pub fn add_namespace(namespace: &str, type_name: &str) -> String {
    if namespace.is_empty() {
        return type_name.to_string();
    }
    format!("{}.{}", namespace, type_name)
}

/// Check whether `name` is an Avro primitive type name.
#[inline]
pub fn is_avro_primitive(name: &str) -> bool {
    AVRO_PRIMITIVES.contains(&name)
}

/// Naming context shared by a codec and its record mapper.
#[derive(Clone)]
pub struct TypeNaming {
    /// Namespace prefixed to every non-primitive name.
    pub namespace: Option<String>,
    /// Translator applied to Rust type names.
    pub encoder: TypeNameEncoder,
}

impl TypeNaming {
    /// Create a naming context.
    pub fn new(namespace: Option<String>, encoder: TypeNameEncoder) -> Self {
        Self { namespace, encoder }
    }

    /// Translate a Rust type name with the configured encoder.
    #[inline]
    pub fn encode_type_name(&self, name: &str) -> String {
        (self.encoder)(name)
    }

    /// Qualify an Avro name with the namespace.
    ///
    /// Primitive names and names that already carry a namespace are
    /// returned unchanged.
    pub fn qualify(&self, name: &str) -> String {
        if is_avro_primitive(name) || name.contains('.') {
            return name.to_string();
        }
        match &self.namespace {
            Some(ns) => add_namespace(ns, name),
            None => name.to_string(),
        }
    }
}

impl Default for TypeNaming {
    fn default() -> Self {
        Self::new(None, default_type_name_encoder())
    }
}

impl fmt::Debug for TypeNaming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeNaming")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_namespace() {
        assert_eq!(add_namespace("", "mytype"), "mytype");
        assert_eq!(add_namespace("test", "mytype"), "test.mytype");
    }

    #[test]
    fn test_camel_to_snake() {
        assert_eq!(camel_to_snake("int"), "int");
        assert_eq!(camel_to_snake("myObject"), "my_object");
        assert_eq!(camel_to_snake("MyObject"), "my_object");
        assert_eq!(camel_to_snake("already_snake"), "already_snake");
        assert_eq!(camel_to_snake("Item2Go"), "item_2_go");
    }

    #[test]
    fn test_default_type_name() {
        assert_eq!(default_type_name("i64"), "long");
        assert_eq!(default_type_name("MyObject"), "my_object");
        assert_eq!(default_type_name("MyURL"), "my_url");
        assert_eq!(default_type_name("LogoImageURL"), "logo_image_url");
        // Acronym followed by a lowercase run splits inside the acronym.
        assert_eq!(default_type_name("LogoImageURLs"), "logo_image_ur_ls");
    }

    #[test]
    fn test_rust_to_avro_type() {
        for int in ["i8", "i16", "i32", "u8", "u16", "u32"] {
            assert_eq!(rust_to_avro_type(int), "int");
        }
        for long in ["i64", "u64", "isize", "usize"] {
            assert_eq!(rust_to_avro_type(long), "long");
        }
        assert_eq!(rust_to_avro_type("f32"), "float");
        assert_eq!(rust_to_avro_type("f64"), "double");
        assert_eq!(rust_to_avro_type("bool"), "boolean");
        assert_eq!(rust_to_avro_type("String"), "String");
    }

    #[test]
    fn test_qualify() {
        let naming = TypeNaming::new(Some("lbc".into()), default_type_name_encoder());
        assert_eq!(naming.qualify("person"), "lbc.person");
        assert_eq!(naming.qualify("string"), "string");
        assert_eq!(naming.qualify("other.person"), "other.person");

        let bare = TypeNaming::default();
        assert_eq!(bare.qualify("person"), "person");
    }

    #[test]
    fn test_custom_encoder() {
        let naming = TypeNaming::new(None, Arc::new(|name: &str| name.to_uppercase()));
        assert_eq!(naming.encode_type_name("Person"), "PERSON");
    }
}
