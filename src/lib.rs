//! # Mano Emulator
//!
//! A cycle-accurate emulator of the basic computer from Morris Mano's
//! *Computer System Architecture*, together with its two-pass assembler.
//!
//! The control unit advances one T-state per call, so every register
//! transfer and bus movement of the fetch, decode, execute and interrupt
//! cycles can be observed.

pub mod isa;
pub mod cpu;
pub mod asm;

// Re-export commonly used types
pub use isa::{Instruction, Opcode, Word};
pub use cpu::{Cpu, Cycle, Flags, Memory, Register, Registers, Snapshot};
pub use asm::{assemble, AsmError, AsmErrorKind, Assembler, AssemblyErrors, Program};
