//! A replication block: values addressed by bit index plus one change mask.

use crate::change_mask::ChangeMask;
use crate::field_codec::check_value;
use crate::layout::{BlockLayout, Slot};
use crate::value::FieldValue;

/// Storage for one block of an entity.
///
/// `values[bit]` holds the value of the field (or array element) at `bit`;
/// array summary bits carry no value. Writes that change a value set the
/// field's bit, and element writes also set their array's summary bit.
#[derive(Debug, Clone)]
pub struct ReplicationBlock {
    values: Vec<Option<FieldValue>>,
    changes: ChangeMask,
}

impl ReplicationBlock {
    /// Creates a block with every field at its neutral value and no
    /// pending changes.
    #[must_use]
    pub fn new(layout: &BlockLayout) -> Self {
        let values = (0..layout.field_count())
            .map(|bit| layout.slot(bit).codec().map(FieldValue::neutral))
            .collect();
        Self {
            values,
            changes: ChangeMask::new(layout.field_count()),
        }
    }

    /// Current value at `bit`, or `None` for an array summary bit.
    ///
    /// Panics if `bit` is out of range.
    #[must_use]
    pub fn get(&self, bit: usize) -> Option<&FieldValue> {
        self.values[bit].as_ref()
    }

    /// Stores `value` at `bit`; returns `true` if the stored value changed.
    ///
    /// Bitwise-equal writes leave the change mask untouched.
    ///
    /// # Panics
    ///
    /// Panics if `bit` is out of range, names an array summary bit, if the
    /// value's variant does not match the field's codec, or if the value
    /// does not fit the codec's width or string limit.
    pub fn set(&mut self, layout: &BlockLayout, bit: usize, value: FieldValue) -> bool {
        let slot = layout.slot(bit);
        let Some(codec) = slot.codec() else {
            panic!("block {} bit {bit} is an array summary bit", layout.id());
        };
        assert!(
            value.matches_codec(codec),
            "block {} bit {bit}: cannot store {} in a {} field",
            layout.id(),
            value.kind_name(),
            codec.name()
        );
        if let Err(reason) = check_value(codec, &value, layout.max_string_bytes()) {
            panic!("block {} bit {bit}: {reason}", layout.id());
        }

        if self.values[bit].as_ref() == Some(&value) {
            return false;
        }
        self.values[bit] = Some(value);
        self.mark(slot, bit);
        true
    }

    /// Marks `bit` dirty without changing its value.
    pub fn mark_changed(&mut self, layout: &BlockLayout, bit: usize) {
        let slot = layout.slot(bit);
        self.mark(slot, bit);
    }

    fn mark(&mut self, slot: Slot, bit: usize) {
        self.changes.set(bit);
        if let Slot::Element { header, .. } = slot {
            self.changes.set(header as usize);
        }
    }

    /// Pending changes since the last clear.
    #[must_use]
    pub const fn changes_mask(&self) -> &ChangeMask {
        &self.changes
    }

    /// Returns `true` if any field is dirty.
    #[must_use]
    pub fn is_changed(&self) -> bool {
        self.changes.is_any_set()
    }

    /// Clears every pending change.
    pub fn clear_changes_mask(&mut self) {
        self.changes.reset_all();
    }
}
