//! Mano machine registers and flags.
//!
//! The machine has 8 registers that share one 16-bit bus:
//! - AR (12 bits): address register
//! - PC (12 bits): program counter
//! - DR, AC, IR, TR (16 bits): data, accumulator, instruction, temporary
//! - OUTR, INPR (8 bits): output and input character registers
//!
//! Every write is truncated to the register's width.

use crate::isa::{Word, ADDRESS_MASK, BYTE_MASK, WORD_MASK};
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Register identifiers, in register-file order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Register {
    Ar,
    Pc,
    Dr,
    Ac,
    Ir,
    Tr,
    Outr,
    Inpr,
}

impl Register {
    /// All registers, in index order.
    pub const ALL: [Register; 8] = [
        Register::Ar,
        Register::Pc,
        Register::Dr,
        Register::Ac,
        Register::Ir,
        Register::Tr,
        Register::Outr,
        Register::Inpr,
    ];

    /// Look up a register by its index in the register file.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Width in bits.
    pub fn width(self) -> u32 {
        match self {
            Register::Ar | Register::Pc => 12,
            Register::Outr | Register::Inpr => 8,
            Register::Dr | Register::Ac | Register::Ir | Register::Tr => 16,
        }
    }

    /// Mask applied on every write.
    pub fn mask(self) -> Word {
        match self.width() {
            12 => ADDRESS_MASK,
            8 => BYTE_MASK,
            _ => WORD_MASK,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Register::Ar => "AR",
            Register::Pc => "PC",
            Register::Dr => "DR",
            Register::Ac => "AC",
            Register::Ir => "IR",
            Register::Tr => "TR",
            Register::Outr => "OUTR",
            Register::Inpr => "INPR",
        }
    }
}

impl std::fmt::Display for Register {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Register {
    type Err = ParseRegisterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|reg| reg.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseRegisterError(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown register: {0}")]
pub struct ParseRegisterError(String);

/// The register file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    values: [Word; 8],
}

impl Registers {
    /// Create a register file with every register cleared.
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn get(&self, reg: Register) -> Word {
        self.values[reg as usize]
    }

    /// Write a register, truncating to its width.
    #[inline]
    pub fn set(&mut self, reg: Register, value: Word) {
        self.values[reg as usize] = value & reg.mask();
    }

    /// Add one, wrapping at the register's width.
    pub fn increment(&mut self, reg: Register) {
        self.set(reg, self.get(reg).wrapping_add(1));
    }

    /// Read by numeric index. Out-of-range indices read as zero.
    pub fn get_index(&self, index: usize) -> Word {
        Register::from_index(index).map_or(0, |reg| self.get(reg))
    }

    /// Write by numeric index. Out-of-range indices are ignored.
    pub fn set_index(&mut self, index: usize, value: Word) {
        if let Some(reg) = Register::from_index(index) {
            self.set(reg, value);
        }
    }

    /// Iterate over `(register, value)` pairs in index order.
    pub fn iter(&self) -> impl Iterator<Item = (Register, Word)> + '_ {
        Register::ALL.into_iter().map(move |reg| (reg, self.get(reg)))
    }
}

/// Single-bit machine state outside the register file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flags {
    /// Carry/extend.
    pub e: bool,
    /// Start/stop: the computer runs while set.
    pub s: bool,
    /// Interrupt cycle pending.
    pub r: bool,
    /// Interrupt enable.
    pub ien: bool,
    /// Input flag: a character is waiting in INPR.
    pub fgi: bool,
    /// Output flag: OUTR is free for the next character.
    pub fgo: bool,
}

impl Flags {
    /// Power-on state: running, output device ready, everything else clear.
    pub fn new() -> Self {
        Self { e: false, s: true, r: false, ien: false, fgi: false, fgo: true }
    }

    /// Whether an interrupt cycle should follow the current instruction.
    pub fn interrupt_requested(&self) -> bool {
        self.ien && (self.fgi || self.fgo)
    }
}

impl Default for Flags {
    fn default() -> Self {
        Self::new()
    }
}
