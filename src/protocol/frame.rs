//! Framed payload: header plus Avro body.
//!
//! Uses `bytes::Bytes` so the body can be handed to a codec without copying.
//!
//! # Example
//!
//! ```
//! use avro_registry::protocol::{build_frame, Frame};
//!
//! let bytes = build_frame(3, b"\x02");
//! let frame = Frame::parse(bytes).unwrap();
//!
//! assert_eq!(frame.schema_id(), 3);
//! assert_eq!(frame.body(), b"\x02");
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use super::wire_format::{Header, SchemaId, HEADER_SIZE};
use crate::error::Result;

/// A complete framed payload.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Decoded header.
    pub header: Header,
    /// Avro body (zero-copy via `bytes::Bytes`).
    pub body: Bytes,
}

impl Frame {
    /// Create a new frame from header and body.
    pub fn new(header: Header, body: Bytes) -> Self {
        Self { header, body }
    }

    /// Parse a framed payload, validating the header.
    pub fn parse(bytes: impl Into<Bytes>) -> Result<Self> {
        let mut bytes = bytes.into();
        let header = Header::decode(&bytes)?;
        let body = bytes.split_off(HEADER_SIZE);
        Ok(Self { header, body })
    }

    /// Get a reference to the body bytes.
    #[inline]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Get the schema id from the header.
    #[inline]
    pub fn schema_id(&self) -> SchemaId {
        self.header.schema_id
    }

    /// Re-encode the frame into a contiguous buffer.
    pub fn to_bytes(&self) -> Bytes {
        build_frame(self.header.schema_id, &self.body)
    }
}

/// Build a complete frame as a single buffer.
///
/// Emits the magic byte, the big-endian schema id, then the body.
pub fn build_frame(schema_id: SchemaId, body: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(HEADER_SIZE + body.len());
    buf.put_slice(&Header::new(schema_id).encode());
    buf.put_slice(body);
    buf.freeze()
}
