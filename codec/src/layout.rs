//! Compiled entity layouts and typed field handles.

use std::fmt;
use std::marker::PhantomData;

use schema::{
    schema_hash, BitIndex, BlockDef, BlockId, EntitySchema, FieldCodec, FieldShape,
};
use tracing::debug;

use crate::change_mask::ChangeMask;
use crate::error::{CodecError, CodecResult, LimitKind};
use crate::limits::CodecLimits;
use crate::value::FieldType;
use crate::visibility::VisibilityFilter;

/// What a single bit of a block's change mask stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// A scalar field's value.
    Scalar { codec: FieldCodec },
    /// An array's any-element-dirty bit; carries no value.
    ArrayHeader { len: u16 },
    /// One element of an array.
    Element {
        codec: FieldCodec,
        header: BitIndex,
        index: u16,
    },
}

impl Slot {
    /// The codec of the value carried by this bit, if any.
    #[must_use]
    pub const fn codec(self) -> Option<FieldCodec> {
        match self {
            Self::Scalar { codec } | Self::Element { codec, .. } => Some(codec),
            Self::ArrayHeader { .. } => None,
        }
    }
}

/// Bit-indexed view of one block definition.
#[derive(Debug, Clone)]
pub struct BlockLayout {
    def: BlockDef,
    slots: Vec<Slot>,
    all_fields: ChangeMask,
    max_string_bytes: usize,
}

impl BlockLayout {
    fn compile(def: &BlockDef, limits: &CodecLimits) -> Self {
        let count = def.field_count as usize;
        let mut slots = vec![Slot::ArrayHeader { len: 0 }; count];
        for field in &def.fields {
            let bit = field.bit as usize;
            match field.shape {
                FieldShape::Scalar => {
                    slots[bit] = Slot::Scalar { codec: field.codec };
                }
                FieldShape::Array { len, .. } => {
                    slots[bit] = Slot::ArrayHeader { len };
                    for index in 0..len {
                        slots[bit + 1 + index as usize] = Slot::Element {
                            codec: field.codec,
                            header: field.bit,
                            index,
                        };
                    }
                }
            }
        }
        Self {
            def: def.clone(),
            slots,
            all_fields: ChangeMask::full(count),
            max_string_bytes: limits.string_bytes(),
        }
    }

    /// The block definition this layout was compiled from.
    #[must_use]
    pub const fn def(&self) -> &BlockDef {
        &self.def
    }

    /// The block's schema identifier.
    #[must_use]
    pub const fn id(&self) -> BlockId {
        self.def.id
    }

    /// Declared field count (mask bits).
    #[must_use]
    pub fn field_count(&self) -> usize {
        self.slots.len()
    }

    /// What bit `bit` stands for. Panics if out of range.
    #[must_use]
    pub fn slot(&self, bit: usize) -> Slot {
        assert!(
            bit < self.slots.len(),
            "bit {bit} out of range for block {} with {} fields",
            self.def.id,
            self.slots.len()
        );
        self.slots[bit]
    }

    /// Mask with every declared bit set.
    #[must_use]
    pub const fn all_fields(&self) -> &ChangeMask {
        &self.all_fields
    }

    /// Longest string a field of this block may hold.
    #[must_use]
    pub const fn max_string_bytes(&self) -> usize {
        self.max_string_bytes
    }
}

/// A compiled entity schema shared by every entity of one type.
///
/// Holds the bit-indexed block layouts, the visibility filter, the limits
/// used for encoding, and the schema hash.
#[derive(Debug, Clone)]
pub struct EntityLayout {
    schema: EntitySchema,
    blocks: Vec<BlockLayout>,
    filter: VisibilityFilter,
    limits: CodecLimits,
    hash: u64,
}

impl EntityLayout {
    /// Validates `schema` against itself and `limits` and compiles it.
    pub fn compile(schema: EntitySchema, limits: &CodecLimits) -> CodecResult<Self> {
        schema.validate()?;

        if schema.blocks.len() > limits.max_blocks_per_entity {
            return Err(CodecError::LimitsExceeded {
                kind: LimitKind::BlocksPerEntity,
                limit: limits.max_blocks_per_entity,
                actual: schema.blocks.len(),
            });
        }
        for block in &schema.blocks {
            if block.field_count as usize > limits.max_fields_per_block {
                return Err(CodecError::LimitsExceeded {
                    kind: LimitKind::FieldsPerBlock,
                    limit: limits.max_fields_per_block,
                    actual: block.field_count as usize,
                });
            }
            for field in &block.fields {
                if let FieldShape::Array { len, .. } = field.shape {
                    if len as usize > limits.max_array_len {
                        return Err(CodecError::LimitsExceeded {
                            kind: LimitKind::ArrayLength,
                            limit: limits.max_array_len,
                            actual: len as usize,
                        });
                    }
                }
            }
        }

        let blocks = schema
            .blocks
            .iter()
            .map(|def| BlockLayout::compile(def, limits))
            .collect();
        let filter = VisibilityFilter::new(&schema);
        let hash = schema_hash(&schema);
        debug!(
            blocks = schema.blocks.len(),
            hash = format_args!("0x{hash:016X}"),
            "compiled entity layout"
        );
        Ok(Self {
            schema,
            blocks,
            filter,
            limits: limits.clone(),
            hash,
        })
    }

    /// The schema this layout was compiled from.
    #[must_use]
    pub const fn schema(&self) -> &EntitySchema {
        &self.schema
    }

    /// Deterministic hash of the schema.
    #[must_use]
    pub const fn schema_hash(&self) -> u64 {
        self.hash
    }

    /// Limits applied when encoding and decoding.
    #[must_use]
    pub const fn limits(&self) -> &CodecLimits {
        &self.limits
    }

    /// The visibility filter for this entity type.
    #[must_use]
    pub const fn filter(&self) -> &VisibilityFilter {
        &self.filter
    }

    /// Number of blocks.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Layout of the block at declaration index `index`.
    #[must_use]
    pub fn block(&self, index: usize) -> &BlockLayout {
        &self.blocks[index]
    }

    /// Block layouts in declaration order.
    pub fn blocks(&self) -> impl Iterator<Item = &BlockLayout> {
        self.blocks.iter()
    }

    /// Binds a typed handle to the scalar field at `bit` of block `block`.
    ///
    /// Panics if the block or field does not exist or if `T` cannot hold
    /// the field's codec.
    #[must_use]
    pub fn field<T: FieldType>(&self, block: BlockId, bit: BitIndex) -> Field<T> {
        let index = self.block_index(block);
        match self.blocks[index].slot(bit as usize) {
            Slot::Scalar { codec } => {
                assert!(
                    T::accepts(codec),
                    "block {block} bit {bit}: {} cannot hold a {} field",
                    T::NAME,
                    codec.name()
                );
            }
            other => panic!("block {block} bit {bit} is not a scalar field: {other:?}"),
        }
        Field {
            block: index,
            bit,
            _marker: PhantomData,
        }
    }

    /// Binds a typed handle to the array field whose summary bit is `bit`.
    ///
    /// Panics if the block or array does not exist or if `T` cannot hold
    /// the array's element codec.
    #[must_use]
    pub fn array<T: FieldType>(&self, block: BlockId, bit: BitIndex) -> ArrayField<T> {
        let index = self.block_index(block);
        let layout = &self.blocks[index];
        let Some(FieldShape::Array { len, size_bit }) =
            layout.def.field_at(bit).map(|field| field.shape)
        else {
            panic!("block {block} bit {bit} is not an array field");
        };
        if let Slot::Element { codec, .. } = layout.slot(bit as usize + 1) {
            assert!(
                T::accepts(codec),
                "block {block} array {bit}: {} cannot hold {} elements",
                T::NAME,
                codec.name()
            );
        }
        ArrayField {
            block: index,
            bit,
            len,
            size_bit,
            _marker: PhantomData,
        }
    }

    fn block_index(&self, block: BlockId) -> usize {
        match self.schema.block_index(block) {
            Some(index) => index,
            None => panic!("unknown block id {block}"),
        }
    }
}

/// Typed handle to a scalar tracked field.
///
/// The binding to a block and bit is fixed when the handle is created.
pub struct Field<T> {
    block: usize,
    bit: BitIndex,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Field<T> {
    /// Declaration index of the owning block.
    #[must_use]
    pub const fn block(&self) -> usize {
        self.block
    }

    /// Bit index within the owning block.
    #[must_use]
    pub const fn bit(&self) -> BitIndex {
        self.bit
    }
}

impl<T> Clone for Field<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Field<T> {}

impl<T> fmt::Debug for Field<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("block", &self.block)
            .field("bit", &self.bit)
            .finish()
    }
}

/// Typed handle to a tracked array field.
///
/// Element `i` lives at bit `bit + 1 + i`; `bit` itself is the array's
/// any-element-dirty bit.
pub struct ArrayField<T> {
    block: usize,
    bit: BitIndex,
    len: u16,
    size_bit: Option<BitIndex>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ArrayField<T> {
    /// Declaration index of the owning block.
    #[must_use]
    pub const fn block(&self) -> usize {
        self.block
    }

    /// The array's summary bit.
    #[must_use]
    pub const fn bit(&self) -> BitIndex {
        self.bit
    }

    /// Fixed capacity.
    #[must_use]
    pub const fn len(&self) -> u16 {
        self.len
    }

    /// Always `false`; schemas reject empty arrays.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bit of the scalar field holding the logical size, if declared.
    #[must_use]
    pub const fn size_bit(&self) -> Option<BitIndex> {
        self.size_bit
    }

    /// Bit of element `index`. Panics if `index` is out of range.
    #[must_use]
    pub fn element_bit(&self, index: u16) -> BitIndex {
        assert!(
            index < self.len,
            "array index {index} out of range for capacity {}",
            self.len
        );
        self.bit + 1 + index
    }
}

impl<T> Clone for ArrayField<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ArrayField<T> {}

impl<T> fmt::Debug for ArrayField<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrayField")
            .field("block", &self.block)
            .field("bit", &self.bit)
            .field("len", &self.len)
            .field("size_bit", &self.size_bit)
            .finish()
    }
}
