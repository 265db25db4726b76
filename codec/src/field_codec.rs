//! Wire encoding of individual field values.

use bitstream::{BitReader, BitWriter};
use schema::{BitIndex, BlockId, FieldCodec};

use crate::error::{CodecError, CodecResult, LimitKind, ValueReason};
use crate::limits::CodecLimits;
use crate::value::{FieldValue, Guid};

pub(crate) fn write_field_value(
    block: BlockId,
    bit: BitIndex,
    codec: FieldCodec,
    value: &FieldValue,
    limits: &CodecLimits,
    writer: &mut BitWriter,
) -> CodecResult<()> {
    match (codec, value) {
        (FieldCodec::Bool, FieldValue::Bool(v)) => writer.write_bool(*v),
        (FieldCodec::UInt { bits }, FieldValue::UInt(v)) => {
            validate_uint(block, bit, bits, *v)?;
            writer.write_bits(*v, bits as usize)?;
        }
        (FieldCodec::SInt { bits }, FieldValue::SInt(v)) => {
            let encoded = encode_sint(block, bit, bits, *v)?;
            writer.write_bits(encoded, bits as usize)?;
        }
        (FieldCodec::F32, FieldValue::F32(v)) => writer.write_f32(*v),
        (FieldCodec::Guid, FieldValue::Guid(v)) => write_guid(*v, writer),
        (FieldCodec::Str, FieldValue::Str(v)) => {
            let max = limits.string_bytes();
            if v.len() > max {
                return Err(CodecError::InvalidValue {
                    block,
                    bit,
                    reason: ValueReason::StringTooLong { len: v.len(), max },
                });
            }
            writer.write_u8(v.len() as u8);
            writer.write_bytes(v.as_bytes());
        }
        _ => {
            return Err(CodecError::InvalidValue {
                block,
                bit,
                reason: ValueReason::TypeMismatch {
                    expected: codec.name(),
                    found: value.kind_name(),
                },
            });
        }
    }
    Ok(())
}

pub(crate) fn read_field_value(
    block: BlockId,
    bit: BitIndex,
    codec: FieldCodec,
    limits: &CodecLimits,
    reader: &mut BitReader<'_>,
) -> CodecResult<FieldValue> {
    match codec {
        FieldCodec::Bool => Ok(FieldValue::Bool(reader.read_bool()?)),
        FieldCodec::UInt { bits } => {
            let value = reader.read_bits(bits as usize)?;
            Ok(FieldValue::UInt(value))
        }
        FieldCodec::SInt { bits } => {
            let raw = reader.read_bits(bits as usize)?;
            Ok(FieldValue::SInt(decode_sint(bits, raw)))
        }
        FieldCodec::F32 => Ok(FieldValue::F32(reader.read_f32()?)),
        FieldCodec::Guid => Ok(FieldValue::Guid(read_guid(reader)?)),
        FieldCodec::Str => {
            let len = reader.read_u8()? as usize;
            let max = limits.string_bytes();
            if len > max {
                return Err(CodecError::LimitsExceeded {
                    kind: LimitKind::StringBytes,
                    limit: max,
                    actual: len,
                });
            }
            let bytes = reader.read_bytes(len)?;
            let value = String::from_utf8(bytes).map_err(|_| CodecError::InvalidValue {
                block,
                bit,
                reason: ValueReason::InvalidUtf8,
            })?;
            Ok(FieldValue::Str(value))
        }
    }
}

/// Writes a presence byte (bit `i` set iff little-endian byte `i` is
/// non-zero) followed by the non-zero bytes in ascending order.
fn write_guid(guid: Guid, writer: &mut BitWriter) {
    let bytes = guid.raw().to_le_bytes();
    let mut presence = 0u8;
    for (i, byte) in bytes.iter().enumerate() {
        if *byte != 0 {
            presence |= 1 << i;
        }
    }
    writer.write_u8(presence);
    for byte in bytes.iter().filter(|byte| **byte != 0) {
        writer.write_u8(*byte);
    }
}

fn read_guid(reader: &mut BitReader<'_>) -> CodecResult<Guid> {
    let presence = reader.read_u8()?;
    let mut bytes = [0u8; 8];
    for (i, byte) in bytes.iter_mut().enumerate() {
        if presence & (1 << i) != 0 {
            *byte = reader.read_u8()?;
        }
    }
    Ok(Guid::new(u64::from_le_bytes(bytes)))
}

/// Checks that `value` is representable by `codec`.
pub(crate) fn check_value(
    codec: FieldCodec,
    value: &FieldValue,
    max_string_bytes: usize,
) -> Result<(), ValueReason> {
    match (codec, value) {
        (FieldCodec::UInt { bits }, FieldValue::UInt(v)) if !uint_fits(bits, *v) => {
            Err(ValueReason::UnsignedOutOfRange { bits, value: *v })
        }
        (FieldCodec::SInt { bits }, FieldValue::SInt(v)) if !sint_fits(bits, *v) => {
            Err(ValueReason::SignedOutOfRange { bits, value: *v })
        }
        (FieldCodec::Str, FieldValue::Str(v)) if v.len() > max_string_bytes => {
            Err(ValueReason::StringTooLong {
                len: v.len(),
                max: max_string_bytes,
            })
        }
        _ if !value.matches_codec(codec) => Err(ValueReason::TypeMismatch {
            expected: codec.name(),
            found: value.kind_name(),
        }),
        _ => Ok(()),
    }
}

const fn uint_fits(bits: u8, value: u64) -> bool {
    bits >= 64 || value >> bits == 0
}

const fn sint_fits(bits: u8, value: i64) -> bool {
    bits >= 64 || (value >= -(1i64 << (bits - 1)) && value < (1i64 << (bits - 1)))
}

fn validate_uint(block: BlockId, bit: BitIndex, bits: u8, value: u64) -> CodecResult<()> {
    if !uint_fits(bits, value) {
        return Err(CodecError::InvalidValue {
            block,
            bit,
            reason: ValueReason::UnsignedOutOfRange { bits, value },
        });
    }
    Ok(())
}

fn encode_sint(block: BlockId, bit: BitIndex, bits: u8, value: i64) -> CodecResult<u64> {
    if bits == 64 {
        return Ok(value as u64);
    }
    if !sint_fits(bits, value) {
        return Err(CodecError::InvalidValue {
            block,
            bit,
            reason: ValueReason::SignedOutOfRange { bits, value },
        });
    }
    let mask = (1u64 << bits) - 1;
    Ok((value as u64) & mask)
}

fn decode_sint(bits: u8, raw: u64) -> i64 {
    if bits == 64 {
        return raw as i64;
    }
    let sign_bit = 1u64 << (bits - 1);
    if raw & sign_bit == 0 {
        raw as i64
    } else {
        let mask = (1u64 << bits) - 1;
        ((raw & mask) as i64) - (1i64 << bits)
    }
}
