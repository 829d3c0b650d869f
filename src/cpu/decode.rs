//! Control-unit state.
//!
//! The sequence counter is not stored as a number: the control unit is in
//! exactly one [`Cycle`] and SC is derived from it.

use crate::isa::{Instruction, Opcode, Word};
use serde::{Serialize, Deserialize};

/// The fields of IR the execute states still need after decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decoded {
    pub opcode: Opcode,
    /// IR(0-11).
    pub address: Word,
    /// IR(15). Only consulted for memory-reference instructions.
    pub indirect: bool,
}

impl Decoded {
    pub fn from_instruction(instr: &Instruction) -> Self {
        Self {
            opcode: instr.opcode(),
            address: instr.address(),
            indirect: instr.is_indirect(),
        }
    }
}

/// Which timing state the next call to `advance_one_cycle` runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cycle {
    /// R'T0, or RT0 when an interrupt is pending.
    Fetch0,
    /// R'T1.
    Fetch1,
    /// R'T2.
    Decode,
    /// T3 onward of a decoded instruction. `step` 0 is T3.
    Execute { op: Decoded, step: u8 },
    /// T3 after a word that matched no instruction.
    Stall,
    /// RT1.
    Interrupt1,
    /// RT2.
    Interrupt2,
}

impl Cycle {
    /// The sequence counter value of this state.
    pub fn sequence_counter(&self) -> u8 {
        match self {
            Cycle::Fetch0 => 0,
            Cycle::Fetch1 | Cycle::Interrupt1 => 1,
            Cycle::Decode | Cycle::Interrupt2 => 2,
            Cycle::Execute { step, .. } => 3 + step,
            Cycle::Stall => 3,
        }
    }

    /// Whether this state is part of the interrupt cycle.
    pub fn is_interrupt(&self) -> bool {
        matches!(self, Cycle::Interrupt1 | Cycle::Interrupt2)
    }
}

impl Default for Cycle {
    fn default() -> Self {
        Cycle::Fetch0
    }
}
