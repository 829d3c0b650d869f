//! The 16-bit machine word and its bit fields.

/// The universal value type for registers, memory cells and the bus.
pub type Word = u16;

/// Full 16-bit mask.
pub const WORD_MASK: Word = 0xFFFF;

/// Low 12 bits: address field of an instruction, width of AR and PC.
pub const ADDRESS_MASK: Word = 0x0FFF;

/// Low 8 bits: width of the I/O registers.
pub const BYTE_MASK: Word = 0x00FF;

/// Bit 15 of a memory-reference instruction selects indirect addressing.
pub const INDIRECT_BIT: Word = 0x8000;

/// Bit 15 of AC is its sign.
pub const SIGN_BIT: Word = 0x8000;

/// Extract the 3-bit opcode field (bits 12-14).
#[inline]
pub(crate) const fn opcode_field(word: Word) -> Word {
    (word >> 12) & 0x7
}
