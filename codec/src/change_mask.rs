//! Two-level dirty bitmap.

use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign};

const WORD_BITS: usize = 32;

/// Number of 32-bit words needed to hold `bits` bits.
#[must_use]
pub const fn words_for(bits: usize) -> usize {
    bits.div_ceil(WORD_BITS)
}

/// A fixed-size dirty bitmap with a summary level.
///
/// `words` holds one bit per tracked field. `blocks` holds one bit per word
/// of `words`; a summary bit is set iff the word it covers is non-zero, so
/// clean 32-field groups can be skipped without scanning them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeMask {
    bits: usize,
    words: Vec<u32>,
    blocks: Vec<u32>,
}

impl ChangeMask {
    /// Creates an all-clear mask of `bits` bits.
    #[must_use]
    pub fn new(bits: usize) -> Self {
        let word_count = words_for(bits);
        Self {
            bits,
            words: vec![0; word_count],
            blocks: vec![0; words_for(word_count)],
        }
    }

    /// Creates a mask with every bit set.
    #[must_use]
    pub fn full(bits: usize) -> Self {
        let mut mask = Self::new(bits);
        mask.set_all();
        mask
    }

    /// Rebuilds a mask from raw dirty words.
    ///
    /// Returns `None` if the word count does not match `bits` or if any bit
    /// at or above `bits` is set.
    #[must_use]
    pub fn from_words(bits: usize, words: &[u32]) -> Option<Self> {
        if words.len() != words_for(bits) {
            return None;
        }
        if let Some(last) = words.last() {
            if *last & !tail_mask(bits) != 0 {
                return None;
            }
        }
        let mut mask = Self::new(bits);
        mask.words.copy_from_slice(words);
        for (index, word) in mask.words.iter().enumerate() {
            if *word != 0 {
                mask.blocks[index / WORD_BITS] |= 1 << (index % WORD_BITS);
            }
        }
        Some(mask)
    }

    /// Returns the declared bit count.
    #[must_use]
    pub const fn bit_count(&self) -> usize {
        self.bits
    }

    /// Returns the number of dirty-bit words.
    #[must_use]
    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    /// Returns the number of summary words.
    #[must_use]
    pub fn blocks_mask_count(&self) -> usize {
        self.blocks.len()
    }

    /// Returns the raw dirty word at `index`.
    #[must_use]
    pub fn block(&self, index: usize) -> u32 {
        self.words[index]
    }

    /// Returns the raw summary word at `index`.
    #[must_use]
    pub fn blocks_mask(&self, index: usize) -> u32 {
        self.blocks[index]
    }

    /// Returns `true` if bit `index` is set.
    #[must_use]
    pub fn is_set(&self, index: usize) -> bool {
        self.check_index(index);
        self.words[index / WORD_BITS] & (1 << (index % WORD_BITS)) != 0
    }

    /// Sets bit `index`.
    pub fn set(&mut self, index: usize) {
        self.check_index(index);
        let word = index / WORD_BITS;
        self.words[word] |= 1 << (index % WORD_BITS);
        self.blocks[word / WORD_BITS] |= 1 << (word % WORD_BITS);
    }

    /// Clears bit `index`.
    pub fn reset(&mut self, index: usize) {
        self.check_index(index);
        let word = index / WORD_BITS;
        self.words[word] &= !(1 << (index % WORD_BITS));
        if self.words[word] == 0 {
            self.blocks[word / WORD_BITS] &= !(1 << (word % WORD_BITS));
        }
    }

    /// Returns `true` if any bit is set. Only the summary level is scanned.
    #[must_use]
    pub fn is_any_set(&self) -> bool {
        self.blocks.iter().any(|summary| *summary != 0)
    }

    /// Returns the number of set bits.
    #[must_use]
    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|word| word.count_ones() as usize).sum()
    }

    /// Sets every bit below the declared bit count.
    pub fn set_all(&mut self) {
        self.words.fill(u32::MAX);
        if let Some(last) = self.words.last_mut() {
            *last &= tail_mask(self.bits);
        }
        self.blocks.fill(u32::MAX);
        let word_count = self.words.len();
        if let Some(last) = self.blocks.last_mut() {
            *last &= tail_mask(word_count);
        }
    }

    /// Clears every bit.
    pub fn reset_all(&mut self) {
        self.words.fill(0);
        self.blocks.fill(0);
    }

    /// Iterates set bits in ascending order, skipping clean words.
    pub fn iter_set(&self) -> impl Iterator<Item = usize> + '_ {
        self.blocks
            .iter()
            .enumerate()
            .flat_map(|(summary_index, summary)| {
                SetBits(*summary).map(move |bit| summary_index * WORD_BITS + bit)
            })
            .flat_map(move |word| {
                SetBits(self.words[word]).map(move |bit| word * WORD_BITS + bit)
            })
    }

    fn check_index(&self, index: usize) {
        assert!(
            index < self.bits,
            "change mask bit {index} out of range for {} bits",
            self.bits
        );
    }

    fn check_same_size(&self, other: &Self) {
        assert_eq!(
            self.bits, other.bits,
            "change mask size mismatch: {} bits vs {} bits",
            self.bits, other.bits
        );
    }
}

/// Mask of the bits in use in the final word of a `bits`-bit level.
const fn tail_mask(bits: usize) -> u32 {
    match bits % WORD_BITS {
        0 => u32::MAX,
        used => (1u32 << used) - 1,
    }
}

struct SetBits(u32);

impl Iterator for SetBits {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.0 == 0 {
            return None;
        }
        let bit = self.0.trailing_zeros() as usize;
        self.0 &= self.0 - 1;
        Some(bit)
    }
}

impl BitAndAssign<&ChangeMask> for ChangeMask {
    fn bitand_assign(&mut self, rhs: &ChangeMask) {
        self.check_same_size(rhs);
        for (word, other) in self.words.iter_mut().zip(&rhs.words) {
            *word &= *other;
        }
        for (summary, other) in self.blocks.iter_mut().zip(&rhs.blocks) {
            *summary &= *other;
        }
        // A word can AND to zero while both summary bits were set.
        for (index, word) in self.words.iter().enumerate() {
            if *word == 0 {
                self.blocks[index / WORD_BITS] &= !(1 << (index % WORD_BITS));
            }
        }
    }
}

impl BitOrAssign<&ChangeMask> for ChangeMask {
    fn bitor_assign(&mut self, rhs: &ChangeMask) {
        self.check_same_size(rhs);
        for (word, other) in self.words.iter_mut().zip(&rhs.words) {
            *word |= *other;
        }
        for (summary, other) in self.blocks.iter_mut().zip(&rhs.blocks) {
            *summary |= *other;
        }
    }
}

impl BitAnd for &ChangeMask {
    type Output = ChangeMask;

    fn bitand(self, rhs: Self) -> ChangeMask {
        let mut out = self.clone();
        out &= rhs;
        out
    }
}

impl BitOr for &ChangeMask {
    type Output = ChangeMask;

    fn bitor(self, rhs: Self) -> ChangeMask {
        let mut out = self.clone();
        out |= rhs;
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_mask_is_clear() {
        let mask = ChangeMask::new(48);
        assert_eq!(mask.bit_count(), 48);
        assert_eq!(mask.word_count(), 2);
        assert_eq!(mask.blocks_mask_count(), 1);
        assert!(!mask.is_any_set());
    }

    #[test]
    fn zero_bit_mask() {
        let mut mask = ChangeMask::new(0);
        assert_eq!(mask.word_count(), 0);
        assert_eq!(mask.blocks_mask_count(), 0);
        mask.set_all();
        assert!(!mask.is_any_set());
    }

    #[test]
    fn set_and_reset_maintain_summary() {
        let mut mask = ChangeMask::new(70);
        mask.set(40);
        assert!(mask.is_set(40));
        assert_eq!(mask.block(1), 1 << 8);
        assert_eq!(mask.blocks_mask(0), 0b010);

        mask.set(41);
        mask.reset(40);
        assert_eq!(mask.blocks_mask(0), 0b010);

        mask.reset(41);
        assert_eq!(mask.blocks_mask(0), 0);
        assert!(!mask.is_any_set());
    }

    #[test]
    fn set_all_masks_unused_high_bits() {
        let mut mask = ChangeMask::new(40);
        mask.set_all();
        assert_eq!(mask.block(0), u32::MAX);
        assert_eq!(mask.block(1), 0xFF);
        assert_eq!(mask.blocks_mask(0), 0b11);
        assert_eq!(mask.count_ones(), 40);
    }

    #[test]
    fn set_all_exact_word_multiple() {
        let mut mask = ChangeMask::new(64);
        mask.set_all();
        assert_eq!(mask.block(1), u32::MAX);
        assert_eq!(mask.blocks_mask(0), 0b11);
    }

    #[test]
    fn set_all_summary_level_spans_multiple_words() {
        // 33 dirty words need two summary words; only one bit of the second is used.
        let bits = 32 * 33;
        let mut mask = ChangeMask::new(bits);
        mask.set_all();
        assert_eq!(mask.blocks_mask_count(), 2);
        assert_eq!(mask.blocks_mask(0), u32::MAX);
        assert_eq!(mask.blocks_mask(1), 1);
        assert_eq!(mask.count_ones(), bits);
    }

    #[test]
    fn reset_all_clears_both_levels() {
        let mut mask = ChangeMask::full(100);
        mask.reset_all();
        assert!(!mask.is_any_set());
        assert_eq!(mask.count_ones(), 0);
        assert!((0..mask.blocks_mask_count()).all(|i| mask.blocks_mask(i) == 0));
    }

    #[test]
    fn and_rederives_summary() {
        let mut a = ChangeMask::new(64);
        a.set(3);
        a.set(40);
        let mut b = ChangeMask::new(64);
        b.set(4);
        b.set(40);

        let out = &a & &b;
        assert!(!out.is_set(3));
        assert!(out.is_set(40));
        // Word 0 ANDed to zero even though both summary bits were set.
        assert_eq!(out.blocks_mask(0), 0b10);
    }

    #[test]
    fn and_to_empty_is_not_any_set() {
        let mut a = ChangeMask::new(10);
        a.set(1);
        let mut b = ChangeMask::new(10);
        b.set(2);
        a &= &b;
        assert!(!a.is_any_set());
    }

    #[test]
    fn or_combines_both_levels() {
        let mut a = ChangeMask::new(64);
        a.set(1);
        let mut b = ChangeMask::new(64);
        b.set(33);
        let out = &a | &b;
        assert!(out.is_set(1));
        assert!(out.is_set(33));
        assert_eq!(out.blocks_mask(0), 0b11);
    }

    #[test]
    #[should_panic(expected = "size mismatch")]
    fn and_mismatched_sizes_panics() {
        let a = ChangeMask::new(8);
        let b = ChangeMask::new(16);
        let _ = &a & &b;
    }

    #[test]
    #[should_panic(expected = "size mismatch")]
    fn or_mismatched_sizes_panics() {
        let mut a = ChangeMask::new(8);
        let b = ChangeMask::new(16);
        a |= &b;
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn set_out_of_range_panics() {
        let mut mask = ChangeMask::new(8);
        mask.set(8);
    }

    #[test]
    fn iter_set_is_ascending_and_skips_clean_words() {
        let mut mask = ChangeMask::new(200);
        for bit in [199, 3, 64, 9, 40] {
            mask.set(bit);
        }
        let bits: Vec<usize> = mask.iter_set().collect();
        assert_eq!(bits, vec![3, 9, 40, 64, 199]);
    }

    #[test]
    fn from_words_rejects_high_bits() {
        assert!(ChangeMask::from_words(40, &[0, 0x100]).is_none());
        assert!(ChangeMask::from_words(40, &[0]).is_none());

        let mask = ChangeMask::from_words(40, &[0b1000, 0x80]).unwrap();
        assert!(mask.is_set(3));
        assert!(mask.is_set(39));
        assert_eq!(mask.blocks_mask(0), 0b11);
    }
}
