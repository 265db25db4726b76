//! MSB-first bit writer.

use crate::error::{BitError, BitResult};

/// Packs values into a growable byte buffer, most significant bit first.
///
/// Whole bytes go straight into the buffer; a trailing partial byte is held
/// back until it fills up or [`finish`](Self::finish) pads it with zeros.
#[derive(Debug, Default)]
pub struct BitWriter {
    buf: Vec<u8>,
    /// Pending bits, right-aligned.
    partial: u8,
    /// Number of pending bits in `partial` (0-7).
    partial_bits: u32,
}

impl BitWriter {
    /// Creates an empty writer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty writer with room for `bytes` bytes.
    #[must_use]
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            buf: Vec::with_capacity(bytes),
            ..Self::default()
        }
    }

    /// Number of bits written so far.
    #[must_use]
    pub fn bits_written(&self) -> usize {
        self.buf.len() * 8 + self.partial_bits as usize
    }

    /// Writes a single bit.
    pub fn write_bool(&mut self, value: bool) {
        self.push(u64::from(value), 1);
    }

    /// Writes the low `bits` bits of `value` (at most 64).
    ///
    /// # Errors
    ///
    /// Returns [`BitError::InvalidBitCount`] if `bits > 64`.
    /// Returns [`BitError::ValueOutOfRange`] if `value` doesn't fit in `bits`.
    pub fn write_bits(&mut self, value: u64, bits: usize) -> BitResult<()> {
        if bits > 64 {
            return Err(BitError::InvalidBitCount { bits, max_bits: 64 });
        }
        if bits < 64 && value >> bits != 0 {
            return Err(BitError::ValueOutOfRange { value, bits });
        }
        self.push(value, bits as u32);
        Ok(())
    }

    /// Writes a full byte.
    pub fn write_u8(&mut self, value: u8) {
        self.push(u64::from(value), 8);
    }

    /// Writes a full 32-bit word.
    pub fn write_u32(&mut self, value: u32) {
        self.push(u64::from(value), 32);
    }

    /// Writes the IEEE-754 bit pattern of an `f32`.
    pub fn write_f32(&mut self, value: f32) {
        self.write_u32(value.to_bits());
    }

    /// Writes a run of whole bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        if self.partial_bits == 0 {
            self.buf.extend_from_slice(bytes);
        } else {
            for byte in bytes {
                self.write_u8(*byte);
            }
        }
    }

    /// Appends the low `bits` bits of `value`, filling the partial byte
    /// first and then whole bytes.
    fn push(&mut self, value: u64, bits: u32) {
        let mut remaining = bits;
        while remaining > 0 {
            let take = (8 - self.partial_bits).min(remaining);
            let chunk = (value >> (remaining - take)) & ((1u64 << take) - 1);
            self.partial = ((u32::from(self.partial) << take) as u8) | chunk as u8;
            self.partial_bits += take;
            remaining -= take;
            if self.partial_bits == 8 {
                self.buf.push(self.partial);
                self.partial = 0;
                self.partial_bits = 0;
            }
        }
    }

    fn flush_partial(&mut self) {
        if self.partial_bits > 0 {
            self.buf.push(self.partial << (8 - self.partial_bits));
            self.partial = 0;
            self.partial_bits = 0;
        }
    }

    /// Returns the written bytes, zero-padding the last one.
    #[must_use]
    pub fn finish(mut self) -> Vec<u8> {
        self.flush_partial();
        self.buf
    }

    /// Appends the written bytes to `out`, zero-padding the last one.
    pub fn finish_into(mut self, out: &mut Vec<u8>) {
        self.flush_partial();
        out.append(&mut self.buf);
    }
}
