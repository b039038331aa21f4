//! Record mapper - typed values to and from the [`Native`] tree.
//!
//! - [`to_native`] runs any `Serialize` value through a serde serializer
//!   that builds `Native`, turning `Some(v)` into a union keyed by `v`'s
//!   Avro type name
//! - [`from_native`] feeds a `Native` into any `Deserialize` type,
//!   unwrapping union maps for `Option` fields
//!
//! Field capabilities live in [`capability`].
//!
//! # Example
//!
//! ```
//! use avro_registry::mapper::{from_native, to_native};
//! use avro_registry::naming::TypeNaming;
//! use avro_registry::Native;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct Person {
//!     name: String,
//!     age: Option<i32>,
//! }
//!
//! let person = Person { name: "Nico".to_string(), age: Some(36) };
//! let native = to_native(&person, &TypeNaming::default()).unwrap();
//! assert_eq!(native.get("age"), Some(&Native::union("int", Native::Int(36))));
//!
//! let decoded: Person = from_native(native).unwrap();
//! assert_eq!(decoded, person);
//! ```

pub mod capability;
mod de;
mod ser;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::codec::Native;
use crate::error::Result;
use crate::naming::TypeNaming;

pub use capability::{custom_decode, custom_name, is_default, AvroName, AvroUnmarshal};

/// Map a value into the native tree.
pub fn to_native<T: Serialize + ?Sized>(value: &T, naming: &TypeNaming) -> Result<Native> {
    value
        .serialize(ser::NativeSerializer::new(naming))
        .map(|(native, _)| native)
}

/// Map a native tree into a typed value.
pub fn from_native<T: DeserializeOwned>(native: Native) -> Result<T> {
    T::deserialize(native)
}
