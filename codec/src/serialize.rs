//! Create and update packet serialization.
//!
//! Update packet: a `u32` top-level block mask, then for each present block
//! (ascending) its field-mask words followed by the values of every
//! value-bearing bit in the mask, ascending.
//!
//! Create packet: one byte of recipient flags, then every field value the
//! recipient may see, block declaration order, ascending bit order.

use bitstream::BitWriter;
use schema::VisibilityFlags;
use tracing::trace;

use crate::change_mask::ChangeMask;
use crate::error::CodecResult;
use crate::field_codec::write_field_value;
use crate::value_set::EntityValueSet;
use crate::visibility::VisibilityFilter;

/// Writes a create packet carrying every field `recipient` may see.
///
/// Change masks are not consulted.
pub fn write_create(
    set: &EntityValueSet,
    recipient: VisibilityFlags,
    writer: &mut BitWriter,
) -> CodecResult<()> {
    let layout = set.layout();
    let flags = VisibilityFilter::effective_flags(recipient);
    writer.write_u8(flags.raw());
    for index in 0..layout.block_count() {
        let allowed = layout.filter().allow_mask(index, flags);
        write_values(set, index, allowed, writer)?;
    }
    Ok(())
}

/// Writes an update packet carrying the fields `recipient` may see that
/// changed since the last clear, or every visible field if `force_all`.
pub fn write_update(
    set: &EntityValueSet,
    recipient: VisibilityFlags,
    force_all: bool,
    writer: &mut BitWriter,
) -> CodecResult<()> {
    let allowed = allowed_update_masks(set, recipient, force_all);
    writer.write_u32(block_mask(&allowed));
    for (index, mask) in allowed.iter().enumerate() {
        let Some(mask) = mask else { continue };
        for word in 0..mask.word_count() {
            writer.write_u32(mask.block(word));
        }
        write_values(set, index, mask, writer)?;
    }
    Ok(())
}

/// Encodes a create packet into a fresh buffer.
pub fn encode_create(set: &EntityValueSet, recipient: VisibilityFlags) -> CodecResult<Vec<u8>> {
    let mut writer = BitWriter::new();
    write_create(set, recipient, &mut writer)?;
    let bytes = writer.finish();
    trace!(
        recipient = recipient.raw(),
        bytes = bytes.len(),
        "encoded create packet"
    );
    Ok(bytes)
}

/// Encodes an update packet into a fresh buffer.
pub fn encode_update(
    set: &EntityValueSet,
    recipient: VisibilityFlags,
    force_all: bool,
) -> CodecResult<Vec<u8>> {
    let mut writer = BitWriter::new();
    write_update(set, recipient, force_all, &mut writer)?;
    let bytes = writer.finish();
    trace!(
        recipient = recipient.raw(),
        force_all,
        bytes = bytes.len(),
        "encoded update packet"
    );
    Ok(bytes)
}

/// The top-level mask an update for `recipient` would carry.
///
/// Zero means the update would carry no fields.
#[must_use]
pub fn update_block_mask(set: &EntityValueSet, recipient: VisibilityFlags, force_all: bool) -> u32 {
    block_mask(&allowed_update_masks(set, recipient, force_all))
}

fn allowed_update_masks(
    set: &EntityValueSet,
    recipient: VisibilityFlags,
    force_all: bool,
) -> Vec<Option<ChangeMask>> {
    let layout = set.layout();
    let flags = VisibilityFilter::effective_flags(recipient);
    (0..layout.block_count())
        .map(|index| {
            let requested = if force_all {
                layout.block(index).all_fields()
            } else if set.has_changed(index) {
                set.block(index).changes_mask()
            } else {
                return None;
            };
            let allowed = layout.filter().filter(index, requested, flags);
            allowed.is_any_set().then_some(allowed)
        })
        .collect()
}

fn block_mask(allowed: &[Option<ChangeMask>]) -> u32 {
    allowed
        .iter()
        .enumerate()
        .filter(|(_, mask)| mask.is_some())
        .fold(0u32, |acc, (index, _)| acc | (1 << index))
}

fn write_values(
    set: &EntityValueSet,
    index: usize,
    mask: &ChangeMask,
    writer: &mut BitWriter,
) -> CodecResult<()> {
    let layout = set.layout();
    let block = layout.block(index);
    let limits = layout.limits();
    for bit in mask.iter_set() {
        let Some(codec) = block.slot(bit).codec() else {
            continue;
        };
        if let Some(value) = set.block(index).get(bit) {
            write_field_value(block.id(), bit as u16, codec, value, limits, writer)?;
        }
    }
    Ok(())
}
