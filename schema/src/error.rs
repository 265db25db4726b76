//! Schema validation errors.

use std::fmt;

use crate::{BitIndex, BlockId};

/// Result type for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors that can occur when building or validating a schema.
///
/// All of these describe wiring bugs in the static schema; an entity type
/// whose schema fails validation must not be instantiated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// Duplicate block ID in a schema.
    DuplicateBlockId { id: BlockId },

    /// More blocks than fit in the top-level mask word.
    TooManyBlocks { count: usize, max: usize },

    /// Block declares zero fields.
    EmptyBlock { block: BlockId },

    /// A field's bits extend past the block's declared field count.
    BitOutOfRange {
        block: BlockId,
        bit: usize,
        field_count: u16,
    },

    /// Two fields claim the same bit.
    BitCollision { block: BlockId, bit: BitIndex },

    /// A bit below the declared field count is not claimed by any field.
    UnassignedBit { block: BlockId, bit: BitIndex },

    /// Invalid bit width for fixed-width integers.
    InvalidBitWidth {
        block: BlockId,
        bit: BitIndex,
        bits: u8,
    },

    /// Array declared with zero elements.
    EmptyArray { block: BlockId, bit: BitIndex },

    /// Array size field is missing or is not a scalar unsigned integer.
    InvalidSizeField {
        block: BlockId,
        array_bit: BitIndex,
        size_bit: BitIndex,
    },
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateBlockId { id } => write!(f, "duplicate block id {id}"),
            Self::TooManyBlocks { count, max } => {
                write!(f, "schema declares {count} blocks, maximum is {max}")
            }
            Self::EmptyBlock { block } => write!(f, "block {block} declares no fields"),
            Self::BitOutOfRange {
                block,
                bit,
                field_count,
            } => write!(
                f,
                "block {block}: bit {bit} outside declared field count {field_count}"
            ),
            Self::BitCollision { block, bit } => {
                write!(f, "block {block}: bit {bit} claimed by more than one field")
            }
            Self::UnassignedBit { block, bit } => {
                write!(f, "block {block}: bit {bit} is not assigned to any field")
            }
            Self::InvalidBitWidth { block, bit, bits } => {
                write!(f, "block {block}: field {bit} has invalid bit width {bits}")
            }
            Self::EmptyArray { block, bit } => {
                write!(f, "block {block}: array at bit {bit} has no elements")
            }
            Self::InvalidSizeField {
                block,
                array_bit,
                size_bit,
            } => write!(
                f,
                "block {block}: array at bit {array_bit} sized by bit {size_bit}, which is not a scalar uint wide enough for its capacity"
            ),
        }
    }
}

impl std::error::Error for SchemaError {}
