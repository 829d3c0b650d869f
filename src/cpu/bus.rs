//! The common bus.
//!
//! Every data movement in the machine is a [`Bus::load`] from one
//! [`Endpoint`] to another. Memory is reached through an I/O latch that
//! is filled from, or written back to, the cell addressed by AR.

use crate::cpu::memory::Memory;
use crate::cpu::registers::{Register, Registers};
use crate::isa::Word;
use serde::{Serialize, Deserialize};

/// Something that can drive or receive the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Endpoint {
    Ar,
    Pc,
    Dr,
    Ac,
    Ir,
    Tr,
    /// The memory unit's I/O latch.
    Memory,
    Outr,
}

impl Endpoint {
    fn register(self) -> Option<Register> {
        match self {
            Endpoint::Ar => Some(Register::Ar),
            Endpoint::Pc => Some(Register::Pc),
            Endpoint::Dr => Some(Register::Dr),
            Endpoint::Ac => Some(Register::Ac),
            Endpoint::Ir => Some(Register::Ir),
            Endpoint::Tr => Some(Register::Tr),
            Endpoint::Outr => Some(Register::Outr),
            Endpoint::Memory => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self.register() {
            Some(reg) => reg.name(),
            None => "M",
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One value moved across the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub source: Endpoint,
    pub destination: Endpoint,
    pub value: Word,
}

impl std::fmt::Display for Transfer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} <- {} ({:04X})", self.destination, self.source, self.value)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bus {
    memory: Memory,
    latch: Word,
    last: Option<Transfer>,
}

impl Bus {
    pub fn new(memory: Memory) -> Self {
        Self { memory, latch: 0, last: None }
    }

    /// Latch `Memory[AR]`.
    pub fn read_memory(&mut self, regs: &Registers) {
        self.latch = self.memory.read(regs.get(Register::Ar));
    }

    /// Store the latch into `Memory[AR]`.
    pub fn write_memory(&mut self, regs: &Registers) {
        self.memory.write(regs.get(Register::Ar), self.latch);
    }

    /// Move a value from `source` to `destination`.
    ///
    /// The destination register applies its own width mask. Returns the
    /// value that was driven onto the bus.
    pub fn load(&mut self, regs: &mut Registers, destination: Endpoint, source: Endpoint) -> Word {
        let value = match source.register() {
            Some(reg) => regs.get(reg),
            None => self.latch,
        };
        match destination.register() {
            Some(reg) => regs.set(reg, value),
            None => self.latch = value,
        }
        self.last = Some(Transfer { source, destination, value });
        value
    }

    pub fn last_transfer(&self) -> Option<Transfer> {
        self.last
    }

    pub fn clear_transfer(&mut self) {
        self.last = None;
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }
}
