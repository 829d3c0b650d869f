//! Read-only views of machine state for front ends.

use crate::cpu::alu::AluActivity;
use crate::cpu::bus::Transfer;
use crate::cpu::execute::Cpu;
use crate::cpu::registers::{Flags, Register};
use crate::isa::{Instruction, Word};
use serde::Serialize;

/// Register values by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RegisterView {
    pub ar: Word,
    pub pc: Word,
    pub dr: Word,
    pub ac: Word,
    pub ir: Word,
    pub tr: Word,
    pub outr: Word,
    pub inpr: Word,
}

/// The decoded instruction as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstructionView {
    pub mnemonic: &'static str,
    pub description: &'static str,
    pub text: String,
    pub indirect: bool,
}

impl From<&Instruction> for InstructionView {
    fn from(instr: &Instruction) -> Self {
        Self {
            mnemonic: instr.mnemonic(),
            description: instr.description(),
            text: instr.to_string(),
            indirect: instr.is_indirect(),
        }
    }
}

/// Everything a front end needs to render one cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub registers: RegisterView,
    pub flags: Flags,
    /// The I flip-flop.
    pub i: bool,
    pub sequence_counter: u8,
    pub cycle_label: &'static str,
    pub instruction: Option<InstructionView>,
    pub transfer: Option<Transfer>,
    pub alu: Option<AluActivity>,
    pub cycles: u64,
    pub memory: Vec<Word>,
}

impl Snapshot {
    pub fn capture(cpu: &Cpu) -> Self {
        let regs = cpu.registers();
        Self {
            registers: RegisterView {
                ar: regs.get(Register::Ar),
                pc: regs.get(Register::Pc),
                dr: regs.get(Register::Dr),
                ac: regs.get(Register::Ac),
                ir: regs.get(Register::Ir),
                tr: regs.get(Register::Tr),
                outr: regs.get(Register::Outr),
                inpr: regs.get(Register::Inpr),
            },
            flags: *cpu.flags(),
            i: cpu.indirect(),
            sequence_counter: cpu.sequence_counter(),
            cycle_label: cpu.cycle_label(),
            instruction: cpu.instruction().as_ref().map(InstructionView::from),
            transfer: cpu.last_transfer(),
            alu: cpu.alu_activity(),
            cycles: cpu.cycles_executed(),
            memory: cpu.memory().cells().to_vec(),
        }
    }
}
