//! Emulation of the basic computer.
//!
//! - 4096 sixteen-bit memory words
//! - AR, PC (12 bits), DR, AC, IR, TR (16 bits), INPR, OUTR (8 bits)
//! - A control unit that advances one T-state per call

pub mod alu;
pub mod bus;
pub mod decode;
pub mod execute;
pub mod memory;
pub mod registers;
pub mod snapshot;

pub use alu::{Alu, AluActivity, AluOp};
pub use bus::{Bus, Endpoint, Transfer};
pub use decode::{Cycle, Decoded};
pub use execute::Cpu;
pub use memory::{Memory, MemorySizeError, MEMORY_SIZE, UNPROGRAMMED};
pub use registers::{Flags, ParseRegisterError, Register, Registers};
pub use snapshot::{InstructionView, RegisterView, Snapshot};
