//! MSB-first bit reader.

use crate::error::{BitError, BitResult};

/// Reads values back out of a buffer produced by [`BitWriter`](crate::BitWriter).
///
/// Every read checks the remaining length first, so malformed input yields
/// [`BitError::EndOfBuffer`] and leaves the cursor where it was.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    /// Next bit to read, counted from the start of `data`.
    cursor: usize,
}

impl<'a> BitReader<'a> {
    /// Creates a reader positioned at the first bit of `data`.
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, cursor: 0 }
    }

    /// Bits left between the cursor and the end of the buffer.
    #[must_use]
    pub const fn bits_remaining(&self) -> usize {
        (self.data.len() * 8).saturating_sub(self.cursor)
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bits_remaining() == 0
    }

    /// Bits consumed so far.
    #[must_use]
    pub const fn bit_position(&self) -> usize {
        self.cursor
    }

    /// `true` when only the zero padding of the final byte is left.
    #[must_use]
    pub fn remaining_is_padding(&self) -> bool {
        match self.bits_remaining() {
            0 => true,
            n if n < 8 => match self.data.last() {
                Some(last) => last & ((1u8 << n) - 1) == 0,
                None => true,
            },
            _ => false,
        }
    }

    pub fn read_bool(&mut self) -> BitResult<bool> {
        self.ensure_bits(1)?;
        Ok(self.take(1) == 1)
    }

    /// Reads `bits` bits (at most 64) as an unsigned value.
    ///
    /// # Errors
    ///
    /// [`BitError::InvalidBitCount`] for more than 64 bits,
    /// [`BitError::EndOfBuffer`] if the buffer is too short.
    pub fn read_bits(&mut self, bits: usize) -> BitResult<u64> {
        if bits > 64 {
            return Err(BitError::InvalidBitCount { bits, max_bits: 64 });
        }
        self.ensure_bits(bits)?;
        Ok(self.take(bits as u32))
    }

    pub fn read_u8(&mut self) -> BitResult<u8> {
        self.ensure_bits(8)?;
        Ok(self.take(8) as u8)
    }

    pub fn read_u32(&mut self) -> BitResult<u32> {
        self.ensure_bits(32)?;
        Ok(self.take(32) as u32)
    }

    pub fn read_f32(&mut self) -> BitResult<f32> {
        self.read_u32().map(f32::from_bits)
    }

    /// Reads `len` whole bytes, aligned or not.
    pub fn read_bytes(&mut self, len: usize) -> BitResult<Vec<u8>> {
        self.ensure_bits(len.saturating_mul(8))?;
        if self.cursor % 8 == 0 {
            let start = self.cursor / 8;
            self.cursor += len * 8;
            return Ok(self.data[start..start + len].to_vec());
        }
        Ok((0..len).map(|_| self.take(8) as u8).collect())
    }

    fn ensure_bits(&self, requested: usize) -> BitResult<()> {
        let available = self.bits_remaining();
        if requested > available {
            return Err(BitError::EndOfBuffer {
                requested,
                available,
            });
        }
        Ok(())
    }

    /// Consumes `bits` bits, taking as many as the current byte holds per
    /// step. Callers check the length first.
    fn take(&mut self, bits: u32) -> u64 {
        let mut value = 0u64;
        let mut remaining = bits;
        while remaining > 0 {
            let byte = u32::from(self.data[self.cursor / 8]);
            let left_in_byte = 8 - (self.cursor % 8) as u32;
            let step = left_in_byte.min(remaining);
            let chunk = (byte >> (left_in_byte - step)) & ((1 << step) - 1);
            value = (value << step) | u64::from(chunk);
            self.cursor += step as usize;
            remaining -= step;
        }
        value
    }
}
