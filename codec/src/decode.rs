//! Bounded decoding of create and update packets.

use bitstream::BitReader;
use schema::{BitIndex, BlockId, VisibilityFlags};

use crate::change_mask::{words_for, ChangeMask};
use crate::error::{CodecError, CodecResult, MaskKind, MaskReason};
use crate::field_codec::read_field_value;
use crate::layout::EntityLayout;
use crate::value::FieldValue;

/// A decoded packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedEntity {
    /// Recipient flags carried by a create packet; `None` for updates.
    pub recipient: Option<VisibilityFlags>,
    /// Blocks that carried at least one bit, in declaration order.
    pub blocks: Vec<DecodedBlock>,
}

/// One decoded block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedBlock {
    /// Declaration index.
    pub index: usize,
    /// Schema block id.
    pub id: BlockId,
    /// Bits present in the packet. Update packets only.
    pub mask: Option<ChangeMask>,
    /// Field values in ascending bit order.
    pub fields: Vec<(BitIndex, FieldValue)>,
}

impl DecodedEntity {
    /// Looks up a decoded value by block id and bit.
    #[must_use]
    pub fn value(&self, block: BlockId, bit: BitIndex) -> Option<&FieldValue> {
        self.blocks
            .iter()
            .find(|decoded| decoded.id == block)?
            .fields
            .iter()
            .find(|(field_bit, _)| *field_bit == bit)
            .map(|(_, value)| value)
    }
}

/// Decodes an update packet.
pub fn decode_update(layout: &EntityLayout, bytes: &[u8]) -> CodecResult<DecodedEntity> {
    let mut reader = BitReader::new(bytes);
    let top = reader.read_u32()?;

    let block_count = layout.block_count();
    if block_count < 32 && top >> block_count != 0 {
        let bit = (top >> block_count).trailing_zeros() as usize + block_count;
        return Err(CodecError::InvalidMask {
            kind: MaskKind::BlockMask,
            reason: MaskReason::UnknownBlock { bit },
        });
    }

    let mut blocks = Vec::new();
    for index in 0..block_count {
        if top & (1 << index) == 0 {
            continue;
        }
        let block = layout.block(index);
        let field_count = block.field_count();
        let mut words = Vec::with_capacity(words_for(field_count));
        for _ in 0..words_for(field_count) {
            words.push(reader.read_u32()?);
        }
        let kind = MaskKind::FieldMask { block: block.id() };
        let mask = ChangeMask::from_words(field_count, &words).ok_or(CodecError::InvalidMask {
            kind,
            reason: MaskReason::BitOutOfRange {
                field_count: field_count as u16,
            },
        })?;
        if !mask.is_any_set() {
            return Err(CodecError::InvalidMask {
                kind,
                reason: MaskReason::Empty,
            });
        }
        let fields = read_values(layout, index, &mask, &mut reader)?;
        blocks.push(DecodedBlock {
            index,
            id: block.id(),
            mask: Some(mask),
            fields,
        });
    }

    ensure_consumed(&reader)?;
    Ok(DecodedEntity {
        recipient: None,
        blocks,
    })
}

/// Decodes a create packet.
pub fn decode_create(layout: &EntityLayout, bytes: &[u8]) -> CodecResult<DecodedEntity> {
    let mut reader = BitReader::new(bytes);
    let raw = reader.read_u8()?;
    let recipient = VisibilityFlags::from_raw(raw);
    if recipient.unknown_bits() != 0 {
        return Err(CodecError::InvalidRecipientFlags { raw });
    }

    let mut blocks = Vec::new();
    for index in 0..layout.block_count() {
        let allowed = layout.filter().allow_mask(index, recipient);
        let fields = read_values(layout, index, allowed, &mut reader)?;
        if fields.is_empty() {
            continue;
        }
        blocks.push(DecodedBlock {
            index,
            id: layout.block(index).id(),
            mask: None,
            fields,
        });
    }

    ensure_consumed(&reader)?;
    Ok(DecodedEntity {
        recipient: Some(recipient),
        blocks,
    })
}

fn read_values(
    layout: &EntityLayout,
    index: usize,
    mask: &ChangeMask,
    reader: &mut BitReader<'_>,
) -> CodecResult<Vec<(BitIndex, FieldValue)>> {
    let block = layout.block(index);
    let mut fields = Vec::new();
    for bit in mask.iter_set() {
        let Some(codec) = block.slot(bit).codec() else {
            continue;
        };
        let bit = bit as BitIndex;
        let value = read_field_value(block.id(), bit, codec, layout.limits(), reader)?;
        fields.push((bit, value));
    }
    Ok(fields)
}

fn ensure_consumed(reader: &BitReader<'_>) -> CodecResult<()> {
    if reader.remaining_is_padding() {
        Ok(())
    } else {
        Err(CodecError::TrailingData {
            remaining_bits: reader.bits_remaining(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limits::CodecLimits;
    use crate::serialize::{encode_create, encode_update};
    use crate::value::Guid;
    use crate::value_set::EntityValueSet;
    use schema::{BlockDef, EntitySchema, FieldCodec, FieldDef};
    use std::sync::Arc;

    fn layout() -> Arc<EntityLayout> {
        let schema = EntitySchema::new(vec![
            BlockDef::new(1, "object", 4)
                .field(FieldDef::new(0, FieldCodec::guid()))
                .field(FieldDef::new(1, FieldCodec::sint(12)))
                .field(FieldDef::new(2, FieldCodec::bool()).visibility(VisibilityFlags::OWNER))
                .field(FieldDef::new(3, FieldCodec::string())),
            BlockDef::new(2, "stack", 5)
                .field(FieldDef::new(0, FieldCodec::uint(4)))
                .field(FieldDef::array(1, 3, FieldCodec::f32()).sized_by(0)),
        ])
        .unwrap();
        Arc::new(EntityLayout::compile(schema, &CodecLimits::default()).unwrap())
    }

    #[test]
    fn update_roundtrip() {
        let layout = layout();
        let mut set = EntityValueSet::new(layout.clone());
        set.set(layout.field::<i16>(1, 1), -900);
        set.set_element(layout.array::<f32>(2, 1), 2, 2.5);

        let bytes = encode_update(&set, VisibilityFlags::NONE, false).unwrap();
        let decoded = decode_update(&layout, &bytes).unwrap();
        assert_eq!(decoded.recipient, None);
        assert_eq!(decoded.blocks.len(), 2);
        assert_eq!(decoded.value(1, 1), Some(&FieldValue::SInt(-900)));
        assert_eq!(decoded.value(2, 4), Some(&FieldValue::F32(2.5)));
        let stack_bits: Vec<_> = decoded.blocks[1]
            .mask
            .as_ref()
            .unwrap()
            .iter_set()
            .collect();
        assert_eq!(stack_bits, vec![1, 4]);
    }

    #[test]
    fn create_roundtrip() {
        let layout = layout();
        let mut set = EntityValueSet::new(layout.clone());
        set.set(layout.field::<Guid>(1, 0), Guid::new(0x1234));
        set.set(layout.field::<bool>(1, 2), true);
        set.set(layout.field::<String>(1, 3), "crate".to_string());

        let bytes = encode_create(&set, VisibilityFlags::OWNER).unwrap();
        let decoded = decode_create(&layout, &bytes).unwrap();
        assert_eq!(decoded.recipient, Some(VisibilityFlags::OWNER));
        assert_eq!(decoded.value(1, 0), Some(&FieldValue::Guid(Guid::new(0x1234))));
        assert_eq!(decoded.value(1, 2), Some(&FieldValue::Bool(true)));
        assert_eq!(decoded.value(1, 3), Some(&FieldValue::Str("crate".into())));
        assert_eq!(decoded.blocks[1].fields.len(), 4);

        let bytes = encode_create(&set, VisibilityFlags::NONE).unwrap();
        let decoded = decode_create(&layout, &bytes).unwrap();
        assert_eq!(decoded.value(1, 2), None);
    }

    #[test]
    fn unknown_block_bit_rejected() {
        let layout = layout();
        let err = decode_update(&layout, &[0, 0, 0, 0b100]).unwrap_err();
        assert!(matches!(
            err,
            CodecError::InvalidMask {
                kind: MaskKind::BlockMask,
                reason: MaskReason::UnknownBlock { bit: 2 }
            }
        ));
    }

    #[test]
    fn field_bit_beyond_count_rejected() {
        let layout = layout();
        let bytes = [0, 0, 0, 0b01, 0, 0, 0, 0b1_0000];
        let err = decode_update(&layout, &bytes).unwrap_err();
        assert!(matches!(
            err,
            CodecError::InvalidMask {
                kind: MaskKind::FieldMask { block: 1 },
                reason: MaskReason::BitOutOfRange { field_count: 4 }
            }
        ));
    }

    #[test]
    fn empty_field_mask_rejected() {
        let layout = layout();
        let bytes = [0, 0, 0, 0b01, 0, 0, 0, 0];
        let err = decode_update(&layout, &bytes).unwrap_err();
        assert!(matches!(
            err,
            CodecError::InvalidMask {
                reason: MaskReason::Empty,
                ..
            }
        ));
    }

    #[test]
    fn trailing_data_rejected() {
        let layout = layout();
        let err = decode_update(&layout, &[0, 0, 0, 0, 0xFF]).unwrap_err();
        assert!(matches!(
            err,
            CodecError::TrailingData { remaining_bits: 8 }
        ));
    }

    #[test]
    fn unknown_recipient_flags_rejected() {
        let layout = layout();
        let err = decode_create(&layout, &[0b1000_0000]).unwrap_err();
        assert!(matches!(
            err,
            CodecError::InvalidRecipientFlags { raw: 0b1000_0000 }
        ));
    }

    #[test]
    fn truncated_packet_is_bitstream_error() {
        let layout = layout();
        let err = decode_update(&layout, &[0, 0, 0, 0b01, 0, 0]).unwrap_err();
        assert!(matches!(err, CodecError::Bitstream(_)));
    }
}
