//! Splitting an address into the fields a set-associative cache looks at.
//!
//! With `s` set-index bits and `b` block-offset bits an address reads as
//!
//! ```text
//! | tag | set index (s bits) | block offset (b bits) |
//! ```
//!
//! Shifts of 64 bits or more produce 0 rather than overflowing, so every
//! function here is total over `u64`.

/// Set an address maps to: `(address >> b) mod 2^s`.
pub fn set_index(address: u64, set_bits: u32, block_bits: u32) -> u64 {
    shr(address, block_bits) & low_mask(set_bits)
}

/// Tag stored in a line: everything above the index and offset bits.
pub fn tag(address: u64, set_bits: u32, block_bits: u32) -> u64 {
    shr(address, set_bits.saturating_add(block_bits))
}

/// Byte offset inside the block. Never consulted for hit/miss decisions.
pub fn block_offset(address: u64, block_bits: u32) -> u64 {
    address & low_mask(block_bits)
}

fn shr(value: u64, bits: u32) -> u64 {
    value.checked_shr(bits).unwrap_or(0)
}

fn low_mask(bits: u32) -> u64 {
    if bits >= u64::BITS {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}
