//! Error types for codec operations.

use std::fmt;

use schema::{BitIndex, BlockId, SchemaError};

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while compiling layouts or encoding/decoding packets.
///
/// Wiring bugs at runtime (out-of-range bits, handle type mismatches, mask
/// size mismatches) are not represented here; they panic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Schema failed validation.
    Schema(SchemaError),

    /// Bitstream error.
    Bitstream(bitstream::BitError),

    /// Limits exceeded.
    LimitsExceeded {
        kind: LimitKind,
        limit: usize,
        actual: usize,
    },

    /// A stored or decoded value does not fit its field codec.
    InvalidValue {
        block: BlockId,
        bit: BitIndex,
        reason: ValueReason,
    },

    /// Invalid mask data in a decoded packet.
    InvalidMask { kind: MaskKind, reason: MaskReason },

    /// A create packet carried recipient flags this version does not know.
    InvalidRecipientFlags { raw: u8 },

    /// Packet had non-padding bits after the last field.
    TrailingData { remaining_bits: usize },
}

/// Specific limit that was exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitKind {
    BlocksPerEntity,
    FieldsPerBlock,
    ArrayLength,
    StringBytes,
}

/// Mask validation error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskKind {
    BlockMask,
    FieldMask { block: BlockId },
}

/// Details for invalid mask errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskReason {
    UnknownBlock { bit: usize },
    BitOutOfRange { field_count: u16 },
    Empty,
}

/// Details for invalid value errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueReason {
    UnsignedOutOfRange { bits: u8, value: u64 },
    SignedOutOfRange { bits: u8, value: i64 },
    StringTooLong { len: usize, max: usize },
    InvalidUtf8,
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Schema(e) => write!(f, "schema error: {e}"),
            Self::Bitstream(e) => write!(f, "bitstream error: {e}"),
            Self::LimitsExceeded {
                kind,
                limit,
                actual,
            } => {
                write!(f, "{kind} limit exceeded: {actual} > {limit}")
            }
            Self::InvalidValue { block, bit, reason } => {
                write!(f, "invalid value for block {block} bit {bit}: {reason}")
            }
            Self::InvalidMask { kind, reason } => {
                write!(f, "invalid {kind}: {reason}")
            }
            Self::InvalidRecipientFlags { raw } => {
                write!(f, "unknown recipient flags 0b{raw:08b}")
            }
            Self::TrailingData { remaining_bits } => {
                write!(f, "trailing data after last field: {remaining_bits} bits")
            }
        }
    }
}

impl fmt::Display for LimitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::BlocksPerEntity => "blocks per entity",
            Self::FieldsPerBlock => "fields per block",
            Self::ArrayLength => "array length",
            Self::StringBytes => "string bytes",
        };
        f.write_str(name)
    }
}

impl fmt::Display for MaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BlockMask => f.write_str("block mask"),
            Self::FieldMask { block } => write!(f, "field mask of block {block}"),
        }
    }
}

impl fmt::Display for MaskReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownBlock { bit } => write!(f, "bit {bit} names no declared block"),
            Self::BitOutOfRange { field_count } => {
                write!(f, "bits set beyond field count {field_count}")
            }
            Self::Empty => f.write_str("present but empty"),
        }
    }
}

impl fmt::Display for ValueReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsignedOutOfRange { bits, value } => {
                write!(f, "{value} does not fit in {bits} unsigned bits")
            }
            Self::SignedOutOfRange { bits, value } => {
                write!(f, "{value} does not fit in {bits} signed bits")
            }
            Self::StringTooLong { len, max } => {
                write!(f, "string of {len} bytes exceeds {max}")
            }
            Self::InvalidUtf8 => f.write_str("string is not valid UTF-8"),
            Self::TypeMismatch { expected, found } => {
                write!(f, "expected {expected} value, found {found}")
            }
        }
    }
}

impl std::error::Error for CodecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Schema(e) => Some(e),
            Self::Bitstream(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SchemaError> for CodecError {
    fn from(err: SchemaError) -> Self {
        Self::Schema(err)
    }
}

impl From<bitstream::BitError> for CodecError {
    fn from(err: bitstream::BitError) -> Self {
        Self::Bitstream(err)
    }
}
