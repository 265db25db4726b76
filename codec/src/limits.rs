//! Limits applied when compiling layouts and encoding/decoding packets.

/// Codec-specific limits.
///
/// Layout limits are checked once when an [`EntityLayout`](crate::EntityLayout)
/// is compiled; string limits are checked on every encode and decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecLimits {
    /// Maximum number of blocks per entity (never more than 32).
    pub max_blocks_per_entity: usize,
    /// Maximum declared field count per block.
    pub max_fields_per_block: usize,
    /// Maximum number of elements in an array field.
    pub max_array_len: usize,
    /// Maximum number of bytes in a string field (never more than 255).
    pub max_string_bytes: usize,
}

/// Strings carry an 8-bit length prefix.
pub(crate) const WIRE_MAX_STRING_BYTES: usize = u8::MAX as usize;

impl Default for CodecLimits {
    fn default() -> Self {
        Self {
            max_blocks_per_entity: schema::MAX_BLOCKS,
            max_fields_per_block: 1024,
            max_array_len: 256,
            max_string_bytes: WIRE_MAX_STRING_BYTES,
        }
    }
}

impl CodecLimits {
    /// Creates limits suitable for testing with smaller values.
    #[must_use]
    pub const fn for_testing() -> Self {
        Self {
            max_blocks_per_entity: 8,
            max_fields_per_block: 128,
            max_array_len: 32,
            max_string_bytes: 64,
        }
    }

    /// Creates limits bounded only by what the wire format can express.
    #[must_use]
    pub const fn unlimited() -> Self {
        Self {
            max_blocks_per_entity: schema::MAX_BLOCKS,
            max_fields_per_block: usize::MAX,
            max_array_len: usize::MAX,
            max_string_bytes: WIRE_MAX_STRING_BYTES,
        }
    }

    pub(crate) fn string_bytes(&self) -> usize {
        self.max_string_bytes.min(WIRE_MAX_STRING_BYTES)
    }
}
