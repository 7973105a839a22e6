use std::ops::Range;

use bitvec::field::BitField as _;
use bitvec::order::Lsb0;
use bitvec::view::BitView;

/// Mask covering the lowest `width` bits of a word
pub fn mask(width: u32) -> u64 {
    if width >= u64::BITS {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

// Bits past the top of the word are simply not addressed
fn bit_span(offset: u32, width: u32) -> Option<Range<usize>> {
    if width == 0 || offset >= u64::BITS {
        return None;
    }
    let end = offset.saturating_add(width).min(u64::BITS);
    Some(offset as usize..end as usize)
}

/// Place `value` at `offset` in an otherwise empty word. Anything wider than `width` is dropped,
/// which is how the front-end hardware behaves, so this never fails.
pub fn pack(offset: u32, width: u32, value: u64) -> u64 {
    let mut word: u64 = 0;
    if let Some(span) = bit_span(offset, width) {
        word.view_bits_mut::<Lsb0>()[span].store_le(value & mask(width));
    }
    word
}

/// Pull the `width` bits at `offset` back out of `word`
pub fn unpack(word: u64, offset: u32, width: u32) -> u64 {
    match bit_span(offset, width) {
        Some(span) => word.view_bits::<Lsb0>()[span].load_le::<u64>(),
        None => 0,
    }
}

/// # BitField
/// A named slice of a 64-bit record word. Every word layout in the codec is a list of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitField {
    pub name: &'static str,
    pub offset: u32,
    pub width: u32,
}

impl BitField {
    pub const fn new(name: &'static str, offset: u32, width: u32) -> Self {
        BitField { name, offset, width }
    }

    pub fn mask(&self) -> u64 {
        mask(self.width)
    }

    pub fn pack(&self, value: u64) -> u64 {
        pack(self.offset, self.width, value)
    }

    pub fn unpack(&self, word: u64) -> u64 {
        unpack(word, self.offset, self.width)
    }

    /// Returns true if the value survives packing unchanged
    pub fn fits(&self, value: u64) -> bool {
        value & !self.mask() == 0
    }
}
