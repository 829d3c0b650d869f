//! Instruction set of the Mano basic computer.
//!
//! This module provides:
//! - [`Word`] and the bit-field constants shared by the CPU and assembler
//! - The fixed 25-entry instruction table ([`INSTRUCTIONS`])
//! - [`Instruction`], a table entry paired with the word it was decoded from

mod word;
mod table;

pub use word::{Word, ADDRESS_MASK, BYTE_MASK, INDIRECT_BIT, SIGN_BIT, WORD_MASK};
pub use table::{Instruction, InstructionInfo, Opcode, INSTRUCTIONS};
