//! Deterministic schema hashing.

use blake3::Hasher;

use crate::{EntitySchema, FieldCodec, FieldShape};

/// Computes a deterministic hash of an entity schema.
///
/// Peers compare hashes to detect that they disagree on block order, bit
/// assignment, codecs, or visibility before exchanging packets.
#[must_use]
pub fn schema_hash(schema: &EntitySchema) -> u64 {
    let mut hasher = Hasher::new();
    write_u32(&mut hasher, schema.blocks.len() as u32);

    for block in &schema.blocks {
        write_u16(&mut hasher, block.id);
        write_u16(&mut hasher, block.field_count);
        write_u32(&mut hasher, block.fields.len() as u32);

        for field in &block.fields {
            write_u16(&mut hasher, field.bit);
            write_codec(&mut hasher, field.codec);
            write_shape(&mut hasher, field.shape);
            write_u8(&mut hasher, field.visibility.raw());
        }
    }

    let hash = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash.as_bytes()[0..8]);
    u64::from_le_bytes(bytes)
}

fn write_codec(hasher: &mut Hasher, codec: FieldCodec) {
    match codec {
        FieldCodec::Bool => write_u8(hasher, 0),
        FieldCodec::UInt { bits } => {
            write_u8(hasher, 1);
            write_u8(hasher, bits);
        }
        FieldCodec::SInt { bits } => {
            write_u8(hasher, 2);
            write_u8(hasher, bits);
        }
        FieldCodec::F32 => write_u8(hasher, 3),
        FieldCodec::Guid => write_u8(hasher, 4),
        FieldCodec::Str => write_u8(hasher, 5),
    }
}

fn write_shape(hasher: &mut Hasher, shape: FieldShape) {
    match shape {
        FieldShape::Scalar => write_u8(hasher, 0),
        FieldShape::Array { len, size_bit } => {
            write_u8(hasher, 1);
            write_u16(hasher, len);
            match size_bit {
                Some(bit) => {
                    write_u8(hasher, 1);
                    write_u16(hasher, bit);
                }
                None => write_u8(hasher, 0),
            }
        }
    }
}

fn write_u8(hasher: &mut Hasher, value: u8) {
    hasher.update(&[value]);
}

fn write_u16(hasher: &mut Hasher, value: u16) {
    hasher.update(&value.to_le_bytes());
}

fn write_u32(hasher: &mut Hasher, value: u32) {
    hasher.update(&value.to_le_bytes());
}
