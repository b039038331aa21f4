//! Wire format encoding and decoding.
//!
//! Every payload starts with a 5-byte header:
//! ```text
//! ┌────────────┬─────────────┬──────────────┐
//! │ Magic byte │ Schema ID   │ Avro body    │
//! │ 1 byte = 0 │ int32 BE    │ N bytes      │
//! └────────────┴─────────────┴──────────────┘
//! ```
//!
//! The schema id is signed; `-1` is reserved to mean "no encoding schema".

use crate::error::{AvroRegistryError, Result};

/// Header size in bytes (fixed, exactly 5).
pub const HEADER_SIZE: usize = 5;

/// First byte of every framed payload.
pub const MAGIC_BYTE: u8 = 0x0;

/// Schema id used when no schema is configured for encoding.
pub const UNKNOWN_ID: SchemaId = -1;

/// Schema version used before any schema has been resolved.
pub const UNKNOWN_VERSION: i32 = -1;

/// Identifier assigned to a schema by the registry.
pub type SchemaId = i32;

/// Decoded header from wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Magic byte, always [`MAGIC_BYTE`] for valid payloads.
    pub magic_byte: u8,
    /// Registry id of the writer schema.
    pub schema_id: SchemaId,
}

impl Header {
    /// Create a new header for the given schema id.
    pub fn new(schema_id: SchemaId) -> Self {
        Self {
            magic_byte: MAGIC_BYTE,
            schema_id,
        }
    }

    /// Encode header to bytes (Big Endian).
    ///
    /// # Example
    ///
    /// ```
    /// use avro_registry::protocol::Header;
    ///
    /// let bytes = Header::new(7).encode();
    /// assert_eq!(bytes, [0, 0, 0, 0, 7]);
    /// ```
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        self.encode_into(&mut buf);
        buf
    }

    /// Encode header into an existing buffer.
    ///
    /// # Panics
    ///
    /// Panics if buffer is smaller than `HEADER_SIZE` (5 bytes).
    pub fn encode_into(&self, buf: &mut [u8]) {
        debug_assert!(buf.len() >= HEADER_SIZE);
        buf[0] = self.magic_byte;
        buf[1..5].copy_from_slice(&self.schema_id.to_be_bytes());
    }

    /// Decode and validate a header from the start of `buf`.
    ///
    /// Fails if fewer than 5 bytes are available or the magic byte is not 0.
    ///
    /// # Example
    ///
    /// ```
    /// use avro_registry::protocol::Header;
    ///
    /// let header = Header::decode(&[0, 0, 0, 1, 2, 0xAA]).unwrap();
    /// assert_eq!(header.schema_id, 258);
    /// ```
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_SIZE {
            return Err(AvroRegistryError::Protocol(format!(
                "truncated header: expected {} bytes, got {}",
                HEADER_SIZE,
                buf.len()
            )));
        }
        if buf[0] != MAGIC_BYTE {
            return Err(AvroRegistryError::Protocol(format!(
                "the parsed magic byte {:#04x} is not correct (expected {:#04x})",
                buf[0], MAGIC_BYTE
            )));
        }
        Ok(Self {
            magic_byte: buf[0],
            schema_id: SchemaId::from_be_bytes([buf[1], buf[2], buf[3], buf[4]]),
        })
    }

    /// Check if the header carries the reserved "no schema" id.
    #[inline]
    pub fn is_unknown(&self) -> bool {
        self.schema_id == UNKNOWN_ID
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_encode_decode_roundtrip() {
        let original = Header::new(42);
        let decoded = Header::decode(&original.encode()).unwrap();
        assert_eq!(original, decoded);
    }

    #[test]
    fn test_header_big_endian_byte_order() {
        let bytes = Header::new(0x0102_0304).encode();

        assert_eq!(bytes[0], MAGIC_BYTE);
        assert_eq!(bytes[1], 0x01);
        assert_eq!(bytes[2], 0x02);
        assert_eq!(bytes[3], 0x03);
        assert_eq!(bytes[4], 0x04);
    }

    #[test]
    fn test_header_size_is_exactly_5() {
        assert_eq!(HEADER_SIZE, 5);
        assert_eq!(Header::new(1).encode().len(), 5);
    }

    #[test]
    fn test_negative_id_is_signed() {
        let bytes = Header::new(UNKNOWN_ID).encode();
        assert_eq!(bytes, [0x00, 0xFF, 0xFF, 0xFF, 0xFF]);

        let header = Header::decode(&bytes).unwrap();
        assert!(header.is_unknown());
    }

    #[test]
    fn test_decode_too_short_buffer() {
        let err = Header::decode(&[0u8; 4]).unwrap_err();
        assert!(matches!(err, AvroRegistryError::Protocol(_)));
        assert!(err.to_string().contains("truncated header"));
    }

    #[test]
    fn test_decode_rejects_bad_magic_byte() {
        let err = Header::decode(&[1, 0, 0, 0, 1]).unwrap_err();
        assert!(matches!(err, AvroRegistryError::Protocol(_)));
        assert!(err.to_string().contains("magic byte"));
    }

    #[test]
    fn test_decode_ignores_trailing_body() {
        let header = Header::decode(&[0, 0, 0, 0, 9, 1, 2, 3]).unwrap();
        assert_eq!(header.schema_id, 9);
    }

    #[test]
    fn test_encode_into() {
        let header = Header::new(i32::MAX);
        let mut buf = [0xEEu8; HEADER_SIZE];
        header.encode_into(&mut buf);

        assert_eq!(Header::decode(&buf).unwrap(), header);
    }
}
