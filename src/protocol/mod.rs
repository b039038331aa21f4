//! Protocol module - wire header and framing.
//!
//! This module implements the registry wire convention:
//! - 5-byte header encoding/decoding (magic byte + big-endian schema id)
//! - Frame struct splitting header from the Avro body

mod frame;
mod wire_format;

pub use frame::{build_frame, Frame};
pub use wire_format::{
    Header, SchemaId, HEADER_SIZE, MAGIC_BYTE, UNKNOWN_ID, UNKNOWN_VERSION,
};
