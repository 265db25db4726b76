//! Per-entity replicated state.

use std::sync::Arc;

use schema::BitIndex;

use crate::block::ReplicationBlock;
use crate::change_mask::ChangeMask;
use crate::layout::{ArrayField, EntityLayout, Field};
use crate::value::{FieldType, FieldValue};

/// The replicated state of one entity: its blocks plus a top-level mask
/// with one bit per block.
///
/// Top-level bit `b` is set iff block `b` has pending changes. Every write
/// goes through this type so the two levels never drift apart.
#[derive(Debug, Clone)]
pub struct EntityValueSet {
    layout: Arc<EntityLayout>,
    blocks: Vec<ReplicationBlock>,
    changed: ChangeMask,
}

impl EntityValueSet {
    /// Creates a value set with neutral values and no pending changes.
    #[must_use]
    pub fn new(layout: Arc<EntityLayout>) -> Self {
        let blocks = layout.blocks().map(ReplicationBlock::new).collect();
        let changed = ChangeMask::new(layout.block_count());
        Self {
            layout,
            blocks,
            changed,
        }
    }

    /// The shared layout.
    #[must_use]
    pub fn layout(&self) -> &Arc<EntityLayout> {
        &self.layout
    }

    /// Block at declaration index `index`.
    #[must_use]
    pub fn block(&self, index: usize) -> &ReplicationBlock {
        &self.blocks[index]
    }

    /// Reads a scalar field.
    ///
    /// # Panics
    ///
    /// Panics if the stored value does not convert to `T`, which only
    /// happens when the handle was bound to a different field.
    #[must_use]
    pub fn get<T: FieldType>(&self, field: Field<T>) -> T {
        self.typed(field.block(), field.bit())
    }

    /// Writes a scalar field; returns `true` if the value changed.
    ///
    /// # Panics
    ///
    /// Panics if `value` does not fit the field's width. A `u32` handle may
    /// be bound to a narrower `uint` field.
    pub fn set<T: FieldType>(&mut self, field: Field<T>, value: T) -> bool {
        self.set_value(field.block(), field.bit(), value.into_value())
    }

    /// Reads element `index` of an array.
    #[must_use]
    pub fn get_element<T: FieldType>(&self, array: ArrayField<T>, index: u16) -> T {
        self.typed(array.block(), array.element_bit(index))
    }

    /// Writes element `index` of an array; returns `true` if it changed.
    pub fn set_element<T: FieldType>(&mut self, array: ArrayField<T>, index: u16, value: T) -> bool {
        self.set_value(array.block(), array.element_bit(index), value.into_value())
    }

    /// Logical size of an array, read from its size field.
    ///
    /// Arrays without a size field always report their full capacity.
    #[must_use]
    pub fn array_size<T: FieldType>(&self, array: ArrayField<T>) -> u16 {
        match array.size_bit() {
            Some(bit) => match self.value(array.block(), bit) {
                Some(FieldValue::UInt(size)) => (*size).min(u64::from(array.len())) as u16,
                _ => array.len(),
            },
            None => array.len(),
        }
    }

    /// Resizes an array to `len` elements.
    ///
    /// Writes the size field, if the array declares one, and resets every
    /// element at or beyond `len` to its neutral value. Each write follows
    /// the usual dirty-on-change rule. Returns `true` if anything changed.
    ///
    /// # Panics
    ///
    /// Panics if `len` exceeds the array's capacity.
    pub fn resize_array<T: FieldType>(&mut self, array: ArrayField<T>, len: u16) -> bool {
        assert!(
            len <= array.len(),
            "array size {len} exceeds capacity {}",
            array.len()
        );
        let mut changed = false;
        if let Some(size_bit) = array.size_bit() {
            changed |= self.set_value(array.block(), size_bit, FieldValue::UInt(u64::from(len)));
        }
        let element = self
            .layout
            .block(array.block())
            .slot(array.element_bit(0) as usize);
        if let Some(codec) = element.codec() {
            for index in len..array.len() {
                changed |=
                    self.set_value(array.block(), array.element_bit(index), FieldValue::neutral(codec));
            }
        }
        changed
    }

    /// Writes a value by block index and bit; returns `true` if it changed.
    ///
    /// # Panics
    ///
    /// Panics if the bit is out of range, is an array summary bit, or if the
    /// value does not match the field's codec or fit its width.
    pub fn set_value(&mut self, block: usize, bit: BitIndex, value: FieldValue) -> bool {
        let changed = self.blocks[block].set(self.layout.block(block), bit as usize, value);
        if changed {
            self.changed.set(block);
        }
        changed
    }

    /// Reads a value by block index and bit; `None` for array summary bits.
    #[must_use]
    pub fn value(&self, block: usize, bit: BitIndex) -> Option<&FieldValue> {
        self.blocks[block].get(bit as usize)
    }

    /// Marks a field dirty without changing its value.
    pub fn mark_changed(&mut self, block: usize, bit: BitIndex) {
        self.blocks[block].mark_changed(self.layout.block(block), bit as usize);
        self.changed.set(block);
    }

    /// Returns `true` if block `block` has pending changes.
    #[must_use]
    pub fn has_changed(&self, block: usize) -> bool {
        self.changed.is_set(block)
    }

    /// The raw top-level mask: bit `b` set iff block `b` changed.
    #[must_use]
    pub fn changed_block_mask(&self) -> u32 {
        if self.changed.word_count() == 0 {
            0
        } else {
            self.changed.block(0)
        }
    }

    /// Returns `true` if any block has pending changes.
    #[must_use]
    pub fn is_any_changed(&self) -> bool {
        self.changed.is_any_set()
    }

    /// Clears every block's pending changes and the top-level mask.
    pub fn clear_changes_mask(&mut self) {
        for index in self.changed.iter_set() {
            self.blocks[index].clear_changes_mask();
        }
        self.changed.reset_all();
    }

    fn typed<T: FieldType>(&self, block: usize, bit: BitIndex) -> T {
        match self.value(block, bit).and_then(T::from_value) {
            Some(value) => value,
            None => panic!(
                "block {} bit {bit} does not hold a valid {}",
                self.layout.block(block).id(),
                T::NAME
            ),
        }
    }
}
