//! Schema definitions and validation.

use std::collections::HashSet;

use crate::error::{SchemaError, SchemaResult};
use crate::{BitIndex, BlockId, FieldCodec, FieldDef, FieldShape, MAX_BLOCKS};

/// A block definition: one layer of an entity's fields sharing a change mask.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BlockDef {
    pub id: BlockId,
    pub name: String,
    /// Number of mask bits the block declares.
    pub field_count: u16,
    pub fields: Vec<FieldDef>,
}

impl BlockDef {
    /// Creates a new block with no fields.
    #[must_use]
    pub fn new(id: BlockId, name: impl Into<String>, field_count: u16) -> Self {
        Self {
            id,
            name: name.into(),
            field_count,
            fields: Vec::new(),
        }
    }

    /// Adds a field to the block.
    #[must_use]
    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Returns the field declared at `bit`, if any.
    ///
    /// Only matches a field's own bit, not the element bits of an array.
    #[must_use]
    pub fn field_at(&self, bit: BitIndex) -> Option<&FieldDef> {
        self.fields.iter().find(|field| field.bit == bit)
    }

    fn validate(&self) -> SchemaResult<()> {
        if self.field_count == 0 {
            return Err(SchemaError::EmptyBlock { block: self.id });
        }

        let mut claimed = vec![false; self.field_count as usize];
        for field in &self.fields {
            validate_field(self.id, field)?;

            let start = field.bit as usize;
            let end = start + field.bits_used();
            if end > claimed.len() {
                return Err(SchemaError::BitOutOfRange {
                    block: self.id,
                    bit: end - 1,
                    field_count: self.field_count,
                });
            }
            for (offset, slot) in claimed[start..end].iter_mut().enumerate() {
                if *slot {
                    return Err(SchemaError::BitCollision {
                        block: self.id,
                        bit: (start + offset) as BitIndex,
                    });
                }
                *slot = true;
            }
        }

        if let Some(bit) = claimed.iter().position(|claimed| !claimed) {
            return Err(SchemaError::UnassignedBit {
                block: self.id,
                bit: bit as BitIndex,
            });
        }

        for field in &self.fields {
            if let FieldShape::Array {
                len,
                size_bit: Some(size_bit),
            } = field.shape
            {
                // The size field must be able to hold the full capacity.
                let valid = self.field_at(size_bit).is_some_and(|size| {
                    size.shape == FieldShape::Scalar
                        && matches!(size.codec, FieldCodec::UInt { bits }
                            if bits >= 64 || u64::from(len) >> bits == 0)
                });
                if !valid {
                    return Err(SchemaError::InvalidSizeField {
                        block: self.id,
                        array_bit: field.bit,
                        size_bit,
                    });
                }
            }
        }
        Ok(())
    }
}

/// An entity schema: its blocks in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntitySchema {
    pub blocks: Vec<BlockDef>,
}

impl EntitySchema {
    /// Creates a schema from blocks after validation.
    pub fn new(blocks: Vec<BlockDef>) -> SchemaResult<Self> {
        let schema = Self { blocks };
        schema.validate()?;
        Ok(schema)
    }

    /// Creates a schema builder.
    #[must_use]
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder { blocks: Vec::new() }
    }

    /// Returns the declaration index of the block with `id`.
    #[must_use]
    pub fn block_index(&self, id: BlockId) -> Option<usize> {
        self.blocks.iter().position(|block| block.id == id)
    }

    /// Validates schema invariants.
    ///
    /// Deserialized schemas bypass [`EntitySchema::new`] and must be
    /// validated before use.
    pub fn validate(&self) -> SchemaResult<()> {
        if self.blocks.len() > MAX_BLOCKS {
            return Err(SchemaError::TooManyBlocks {
                count: self.blocks.len(),
                max: MAX_BLOCKS,
            });
        }

        let mut block_ids = HashSet::new();
        for block in &self.blocks {
            if !block_ids.insert(block.id) {
                return Err(SchemaError::DuplicateBlockId { id: block.id });
            }
            block.validate()?;
        }
        Ok(())
    }
}

/// Builder for `EntitySchema`.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    blocks: Vec<BlockDef>,
}

impl SchemaBuilder {
    /// Adds a block definition.
    #[must_use]
    pub fn block(mut self, block: BlockDef) -> Self {
        self.blocks.push(block);
        self
    }

    /// Builds the schema after validation.
    pub fn build(self) -> SchemaResult<EntitySchema> {
        EntitySchema::new(self.blocks)
    }
}

fn validate_field(block: BlockId, field: &FieldDef) -> SchemaResult<()> {
    match field.codec {
        FieldCodec::UInt { bits } | FieldCodec::SInt { bits } => {
            if bits == 0 || bits > 64 {
                return Err(SchemaError::InvalidBitWidth {
                    block,
                    bit: field.bit,
                    bits,
                });
            }
        }
        FieldCodec::Bool | FieldCodec::F32 | FieldCodec::Guid | FieldCodec::Str => {}
    }

    if let FieldShape::Array { len: 0, .. } = field.shape {
        return Err(SchemaError::EmptyArray {
            block,
            bit: field.bit,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::VisibilityFlags;

    fn object_block() -> BlockDef {
        BlockDef::new(1, "object", 4)
            .field(FieldDef::new(0, FieldCodec::guid()))
            .field(FieldDef::new(1, FieldCodec::uint(32)))
            .field(FieldDef::new(2, FieldCodec::f32()))
            .field(FieldDef::new(3, FieldCodec::uint(8)).visibility(VisibilityFlags::OWNER))
    }

    #[test]
    fn schema_builder_roundtrip() {
        let schema = EntitySchema::builder()
            .block(object_block())
            .build()
            .unwrap();
        assert_eq!(schema.blocks.len(), 1);
        assert_eq!(schema.block_index(1), Some(0));
        assert_eq!(schema.block_index(2), None);
    }

    #[test]
    fn schema_rejects_duplicate_block_ids() {
        let err = EntitySchema::new(vec![object_block(), object_block()]).unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateBlockId { id: 1 }));
    }

    #[test]
    fn schema_rejects_too_many_blocks() {
        let blocks = (0..=MAX_BLOCKS as u16)
            .map(|id| BlockDef::new(id, "b", 1).field(FieldDef::new(0, FieldCodec::bool())))
            .collect();
        let err = EntitySchema::new(blocks).unwrap_err();
        assert!(matches!(err, SchemaError::TooManyBlocks { count: 33, max: 32 }));
    }

    #[test]
    fn schema_rejects_empty_block() {
        let err = EntitySchema::new(vec![BlockDef::new(1, "empty", 0)]).unwrap_err();
        assert!(matches!(err, SchemaError::EmptyBlock { block: 1 }));
    }

    #[test]
    fn schema_rejects_bit_collision() {
        let block = BlockDef::new(1, "b", 2)
            .field(FieldDef::new(0, FieldCodec::bool()))
            .field(FieldDef::new(0, FieldCodec::uint(8)));
        let err = EntitySchema::new(vec![block]).unwrap_err();
        assert!(matches!(err, SchemaError::BitCollision { block: 1, bit: 0 }));
    }

    #[test]
    fn schema_rejects_array_overlapping_scalar() {
        let block = BlockDef::new(1, "b", 4)
            .field(FieldDef::array(0, 3, FieldCodec::uint(8)))
            .field(FieldDef::new(2, FieldCodec::bool()));
        let err = EntitySchema::new(vec![block]).unwrap_err();
        assert!(matches!(err, SchemaError::BitCollision { block: 1, bit: 2 }));
    }

    #[test]
    fn schema_rejects_unassigned_bit() {
        let block = BlockDef::new(1, "b", 3)
            .field(FieldDef::new(0, FieldCodec::bool()))
            .field(FieldDef::new(2, FieldCodec::bool()));
        let err = EntitySchema::new(vec![block]).unwrap_err();
        assert!(matches!(err, SchemaError::UnassignedBit { block: 1, bit: 1 }));
    }

    #[test]
    fn schema_rejects_bit_out_of_range() {
        let block = BlockDef::new(1, "b", 3).field(FieldDef::array(0, 3, FieldCodec::bool()));
        let err = EntitySchema::new(vec![block]).unwrap_err();
        assert!(matches!(err, SchemaError::BitOutOfRange { bit: 3, .. }));
    }

    #[test]
    fn schema_rejects_invalid_bit_width() {
        let block = BlockDef::new(1, "b", 1).field(FieldDef::new(0, FieldCodec::uint(0)));
        let err = EntitySchema::new(vec![block]).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidBitWidth { bits: 0, .. }));

        let block = BlockDef::new(1, "b", 1).field(FieldDef::new(0, FieldCodec::sint(65)));
        let err = EntitySchema::new(vec![block]).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidBitWidth { bits: 65, .. }));
    }

    #[test]
    fn schema_rejects_empty_array() {
        let block = BlockDef::new(1, "b", 1).field(FieldDef::array(0, 0, FieldCodec::bool()));
        let err = EntitySchema::new(vec![block]).unwrap_err();
        assert!(matches!(err, SchemaError::EmptyArray { block: 1, bit: 0 }));
    }

    #[test]
    fn schema_accepts_sized_array() {
        let block = BlockDef::new(7, "container", 6)
            .field(FieldDef::new(0, FieldCodec::uint(8)))
            .field(FieldDef::array(1, 4, FieldCodec::guid()).sized_by(0));
        assert!(EntitySchema::new(vec![block]).is_ok());
    }

    #[test]
    fn schema_rejects_size_field_of_wrong_kind() {
        let block = BlockDef::new(7, "container", 6)
            .field(FieldDef::new(0, FieldCodec::f32()))
            .field(FieldDef::array(1, 4, FieldCodec::guid()).sized_by(0));
        let err = EntitySchema::new(vec![block]).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::InvalidSizeField {
                array_bit: 1,
                size_bit: 0,
                ..
            }
        ));
    }

    #[test]
    fn schema_rejects_size_field_too_narrow_for_capacity() {
        let block = BlockDef::new(1, "slots", 5)
            .field(FieldDef::new(0, FieldCodec::uint(2)))
            .field(FieldDef::array(1, 4, FieldCodec::guid()).sized_by(0));
        let err = EntitySchema::new(vec![block]).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::InvalidSizeField {
                block: 1,
                array_bit: 1,
                size_bit: 0
            }
        ));

        let block = BlockDef::new(1, "slots", 4)
            .field(FieldDef::new(0, FieldCodec::uint(2)))
            .field(FieldDef::array(1, 3, FieldCodec::guid()).sized_by(0));
        assert!(EntitySchema::new(vec![block]).is_ok());
    }

    #[test]
    fn schema_rejects_missing_size_field() {
        let block = BlockDef::new(7, "container", 5)
            .field(FieldDef::array(0, 4, FieldCodec::guid()).sized_by(2));
        let err = EntitySchema::new(vec![block]).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidSizeField { .. }));
    }
}
