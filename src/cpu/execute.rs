//! The control unit.
//!
//! Implements the timing sequence of the basic computer one T-state per
//! call: fetch (T0-T1), decode (T2), execute (T3-T6) and the three-state
//! interrupt cycle (RT0-RT2).

use crate::cpu::alu::{Alu, AluActivity, AluOp};
use crate::cpu::bus::{Bus, Endpoint, Transfer};
use crate::cpu::decode::{Cycle, Decoded};
use crate::cpu::memory::Memory;
use crate::cpu::registers::{Flags, Register, Registers};
use crate::cpu::snapshot::Snapshot;
use crate::isa::{Instruction, Opcode, Word, INDIRECT_BIT, SIGN_BIT};
use tracing::{debug, trace};

/// Register file, flags, ALU, bus and control unit of one machine.
#[derive(Clone)]
pub struct Cpu {
    regs: Registers,
    flags: Flags,
    alu: Alu,
    bus: Bus,
    cycle: Cycle,
    /// Instruction latched at the last decode.
    instruction: Option<Instruction>,
    /// The I flip-flop, IR(15) at the last decode.
    indirect: bool,
    cycle_label: &'static str,
    /// Cycles executed (for profiling).
    cycles: u64,
}

impl Cpu {
    /// Power on a machine with the given memory contents.
    pub fn new(memory: Memory) -> Self {
        Self {
            regs: Registers::new(),
            flags: Flags::new(),
            alu: Alu::new(),
            bus: Bus::new(memory),
            cycle: Cycle::Fetch0,
            instruction: None,
            indirect: false,
            cycle_label: "",
            cycles: 0,
        }
    }

    /// Run exactly one T-state.
    ///
    /// Returns `false` without touching any state when the computer is
    /// stopped (S clear) and no interrupt cycle is pending.
    pub fn advance_one_cycle(&mut self) -> bool {
        if !self.flags.s && !self.flags.r {
            return false;
        }

        self.bus.clear_transfer();
        self.alu.clear_activity();

        let cycle = self.cycle;
        self.cycle = match cycle {
            // A pending R abandons whatever instruction is in progress.
            _ if self.flags.r && !cycle.is_interrupt() => self.interrupt_t0(),
            Cycle::Fetch0 => self.fetch_t0(),
            Cycle::Fetch1 => self.fetch_t1(),
            Cycle::Decode => self.decode_t2(),
            Cycle::Execute { op, step: 0 } => self.execute_t3(op),
            Cycle::Execute { op, step } => self.execute_memory_reference(op, step),
            Cycle::Stall => {
                self.cycle_label = "Stall T3";
                self.end_instruction()
            }
            Cycle::Interrupt1 => self.interrupt_t1(),
            Cycle::Interrupt2 => self.interrupt_t2(),
        };
        self.cycles += 1;

        trace!(
            sc = self.cycle.sequence_counter(),
            label = self.cycle_label,
            transfer = ?self.bus.last_transfer(),
            "cycle"
        );
        true
    }

    /// Run up to `count` cycles. Returns how many actually ran.
    pub fn run_cycles(&mut self, count: u64) -> u64 {
        let mut executed = 0;
        while executed < count && self.advance_one_cycle() {
            executed += 1;
        }
        executed
    }

    /// Run until the current instruction (or interrupt service) finishes.
    ///
    /// Gives up after `max_cycles`. Returns how many cycles ran.
    pub fn complete_instruction(&mut self, max_cycles: u64) -> u64 {
        let mut executed = 0;
        while executed < max_cycles && self.advance_one_cycle() {
            executed += 1;
            if self.cycle == Cycle::Fetch0 {
                break;
            }
        }
        executed
    }

    /// Run until the computer stops, for at most `max_cycles`.
    pub fn run_until_halt(&mut self, max_cycles: u64) -> u64 {
        self.run_cycles(max_cycles)
    }

    // ==================== Fetch and decode ====================

    fn fetch_t0(&mut self) -> Cycle {
        self.cycle_label = "Fetch R'T0";
        // AR <- PC
        self.bus.load(&mut self.regs, Endpoint::Ar, Endpoint::Pc);
        Cycle::Fetch1
    }

    fn fetch_t1(&mut self) -> Cycle {
        self.cycle_label = "Fetch R'T1";
        // IR <- M[AR], PC <- PC + 1
        self.bus.read_memory(&self.regs);
        self.bus.load(&mut self.regs, Endpoint::Ir, Endpoint::Memory);
        self.regs.increment(Register::Pc);
        Cycle::Decode
    }

    fn decode_t2(&mut self) -> Cycle {
        self.cycle_label = "Decode R'T2";
        let ir = self.regs.get(Register::Ir);
        self.instruction = Instruction::from_opcode(ir);
        // AR <- IR(0-11), I <- IR(15)
        self.bus.load(&mut self.regs, Endpoint::Ar, Endpoint::Ir);
        self.indirect = ir & INDIRECT_BIT != 0;

        match &self.instruction {
            Some(instr) => {
                debug!(ir, instruction = %instr, "decoded");
                Cycle::Execute { op: Decoded::from_instruction(instr), step: 0 }
            }
            None => {
                debug!(ir, "undecodable word, stalling");
                Cycle::Stall
            }
        }
    }

    // ==================== Execute ====================

    fn execute_t3(&mut self, op: Decoded) -> Cycle {
        if !op.opcode.is_memory_reference() {
            self.execute_register_reference(op.opcode);
            self.cycle_label = op.opcode.info().cycle_labels[0];
            return self.end_instruction();
        }

        if op.indirect {
            self.cycle_label = "Decode D7'IT3";
            // AR <- M[AR]
            self.bus.read_memory(&self.regs);
            self.bus.load(&mut self.regs, Endpoint::Ar, Endpoint::Memory);
            Cycle::Execute { op, step: 1 }
        } else {
            // Direct addressing goes straight into T4.
            self.execute_memory_reference(op, 1)
        }
    }

    /// Execute state `step` (1 = T4) of a memory-reference instruction.
    fn execute_memory_reference(&mut self, op: Decoded, step: u8) -> Cycle {
        let labels = op.opcode.info().cycle_labels;
        self.cycle_label = labels.get(usize::from(step) - 1).copied().unwrap_or("T?");

        let done = match op.opcode {
            Opcode::And => self.operate_on_memory(step, AluOp::And),
            Opcode::Add => self.operate_on_memory(step, AluOp::Add),
            Opcode::Lda => self.operate_on_memory(step, AluOp::Transfer),
            Opcode::Sta => {
                // M[AR] <- AC
                self.bus.load(&mut self.regs, Endpoint::Memory, Endpoint::Ac);
                self.bus.write_memory(&self.regs);
                true
            }
            Opcode::Bun => {
                // PC <- AR
                self.bus.load(&mut self.regs, Endpoint::Pc, Endpoint::Ar);
                true
            }
            Opcode::Bsa => match step {
                1 => {
                    // M[AR] <- PC, AR <- AR + 1
                    self.bus.load(&mut self.regs, Endpoint::Memory, Endpoint::Pc);
                    self.bus.write_memory(&self.regs);
                    self.regs.increment(Register::Ar);
                    false
                }
                _ => {
                    // PC <- AR
                    self.bus.load(&mut self.regs, Endpoint::Pc, Endpoint::Ar);
                    true
                }
            },
            Opcode::Isz => match step {
                1 => {
                    // DR <- M[AR]
                    self.bus.read_memory(&self.regs);
                    self.bus.load(&mut self.regs, Endpoint::Dr, Endpoint::Memory);
                    false
                }
                2 => {
                    // DR <- DR + 1
                    self.regs.increment(Register::Dr);
                    false
                }
                _ => {
                    // M[AR] <- DR, if DR = 0 then PC <- PC + 1
                    self.bus.load(&mut self.regs, Endpoint::Memory, Endpoint::Dr);
                    self.bus.write_memory(&self.regs);
                    if self.regs.get(Register::Dr) == 0 {
                        self.regs.increment(Register::Pc);
                    }
                    true
                }
            },
            Opcode::Cla
            | Opcode::Cle
            | Opcode::Cma
            | Opcode::Cme
            | Opcode::Cir
            | Opcode::Cil
            | Opcode::Inc
            | Opcode::Spa
            | Opcode::Sna
            | Opcode::Sza
            | Opcode::Sze
            | Opcode::Hlt
            | Opcode::Inp
            | Opcode::Out
            | Opcode::Ski
            | Opcode::Sko
            | Opcode::Ion
            | Opcode::Iof => true,
        };

        if done {
            self.end_instruction()
        } else {
            Cycle::Execute { op, step: step + 1 }
        }
    }

    /// AND, ADD and LDA: T4 reads the operand into DR, T5 combines it with AC.
    fn operate_on_memory(&mut self, step: u8, op: AluOp) -> bool {
        if step == 1 {
            // DR <- M[AR]
            self.bus.read_memory(&self.regs);
            self.bus.load(&mut self.regs, Endpoint::Dr, Endpoint::Memory);
            return false;
        }
        match op {
            AluOp::Transfer => self.alu.load(&self.regs, Register::Dr),
            _ => self.alu.load_pair(&self.regs, Register::Ac, Register::Dr),
        }
        let result = self.alu.operate(op, &mut self.flags.e);
        self.regs.set(Register::Ac, result);
        true
    }

    fn execute_register_reference(&mut self, opcode: Opcode) {
        let ac = self.regs.get(Register::Ac);
        match opcode {
            Opcode::Cla => self.regs.set(Register::Ac, 0),
            Opcode::Cle => self.flags.e = false,
            Opcode::Cma => self.operate_on_ac(AluOp::Complement),
            Opcode::Cme => {
                self.alu.operate(AluOp::ComplementE, &mut self.flags.e);
            }
            Opcode::Cir => self.operate_on_ac(AluOp::CirculateRight),
            Opcode::Cil => self.operate_on_ac(AluOp::CirculateLeft),
            Opcode::Inc => self.regs.increment(Register::Ac),
            Opcode::Spa => self.skip_if(ac & SIGN_BIT == 0),
            Opcode::Sna => self.skip_if(ac & SIGN_BIT != 0),
            Opcode::Sza => self.skip_if(ac == 0),
            Opcode::Sze => self.skip_if(!self.flags.e),
            Opcode::Hlt => {
                self.flags.s = false;
                debug!(pc = self.regs.get(Register::Pc), "halted");
            }
            Opcode::Inp => {
                // AC <- INPR, FGI <- 0
                self.alu.load(&self.regs, Register::Inpr);
                let value = self.alu.operate(AluOp::Transfer, &mut self.flags.e);
                self.regs.set(Register::Ac, value);
                self.flags.fgi = false;
            }
            Opcode::Out => {
                // OUTR <- AC, FGO <- 0
                self.bus.load(&mut self.regs, Endpoint::Outr, Endpoint::Ac);
                self.flags.fgo = false;
            }
            Opcode::Ski => self.skip_if(self.flags.fgi),
            Opcode::Sko => self.skip_if(self.flags.fgo),
            Opcode::Ion => self.flags.ien = true,
            Opcode::Iof => self.flags.ien = false,
            Opcode::And
            | Opcode::Add
            | Opcode::Lda
            | Opcode::Sta
            | Opcode::Bun
            | Opcode::Bsa
            | Opcode::Isz => {}
        }
    }

    fn operate_on_ac(&mut self, op: AluOp) {
        self.alu.load(&self.regs, Register::Ac);
        let result = self.alu.operate(op, &mut self.flags.e);
        self.regs.set(Register::Ac, result);
    }

    fn skip_if(&mut self, condition: bool) {
        if condition {
            self.regs.increment(Register::Pc);
        }
    }

    /// SC <- 0 and latch R for the next cycle.
    fn end_instruction(&mut self) -> Cycle {
        self.flags.r = self.flags.interrupt_requested();
        Cycle::Fetch0
    }

    // ==================== Interrupt cycle ====================

    fn interrupt_t0(&mut self) -> Cycle {
        self.cycle_label = "Interrupt RT0";
        debug!(pc = self.regs.get(Register::Pc), "entering interrupt cycle");
        // AR <- 0, AC <- 0, TR <- PC
        self.regs.set(Register::Ar, 0);
        self.regs.set(Register::Ac, 0);
        self.bus.load(&mut self.regs, Endpoint::Tr, Endpoint::Pc);
        Cycle::Interrupt1
    }

    fn interrupt_t1(&mut self) -> Cycle {
        self.cycle_label = "Interrupt RT1";
        // M[AR] <- TR, PC <- 0
        self.bus.load(&mut self.regs, Endpoint::Memory, Endpoint::Tr);
        self.bus.write_memory(&self.regs);
        self.regs.set(Register::Pc, 0);
        Cycle::Interrupt2
    }

    fn interrupt_t2(&mut self) -> Cycle {
        self.cycle_label = "Interrupt RT2";
        // PC <- PC + 1, IEN <- 0, R <- 0, SC <- 0
        self.regs.increment(Register::Pc);
        self.flags.ien = false;
        self.flags.r = false;
        Cycle::Fetch0
    }

    // ==================== Observation ====================

    pub fn registers(&self) -> &Registers {
        &self.regs
    }

    pub fn register(&self, reg: Register) -> Word {
        self.regs.get(reg)
    }

    pub fn flags(&self) -> &Flags {
        &self.flags
    }

    pub fn memory(&self) -> &Memory {
        self.bus.memory()
    }

    pub fn cycle(&self) -> Cycle {
        self.cycle
    }

    /// The sequence counter: which T-state runs next.
    pub fn sequence_counter(&self) -> u8 {
        self.cycle.sequence_counter()
    }

    /// Label of the T-state that ran last, e.g. `"Fetch R'T0"` or `"D2T5"`.
    pub fn cycle_label(&self) -> &'static str {
        self.cycle_label
    }

    /// The instruction latched at the last decode.
    pub fn instruction(&self) -> Option<Instruction> {
        self.instruction
    }

    /// The I flip-flop.
    pub fn indirect(&self) -> bool {
        self.indirect
    }

    /// The bus transfer performed by the last cycle, if any.
    pub fn last_transfer(&self) -> Option<Transfer> {
        self.bus.last_transfer()
    }

    /// The ALU operation performed by the last cycle, if any.
    pub fn alu_activity(&self) -> Option<AluActivity> {
        self.alu.activity()
    }

    pub fn cycles_executed(&self) -> u64 {
        self.cycles
    }

    /// Check if the computer is stopped.
    pub fn is_halted(&self) -> bool {
        !self.flags.s
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(self)
    }

    // ==================== Debugging hooks ====================

    pub fn set_register(&mut self, reg: Register, value: Word) {
        self.regs.set(reg, value);
    }

    pub fn write_memory(&mut self, addr: Word, value: Word) {
        self.bus.memory_mut().write(addr, value);
    }

    pub fn flags_mut(&mut self) -> &mut Flags {
        &mut self.flags
    }

    /// Set S so a stopped computer resumes.
    pub fn start(&mut self) {
        self.flags.s = true;
    }

    /// A character arrives from the input device: INPR <- byte, FGI <- 1.
    pub fn inject_input(&mut self, byte: u8) {
        debug!(byte, "input arrived");
        self.regs.set(Register::Inpr, Word::from(byte));
        self.flags.fgi = true;
    }

    /// The output device consumes OUTR if the program has filled it.
    ///
    /// Returns the character and sets FGO when FGO was clear.
    pub fn take_output(&mut self) -> Option<u8> {
        if self.flags.fgo {
            return None;
        }
        self.flags.fgo = true;
        let byte = self.regs.get(Register::Outr) as u8;
        debug!(byte, "output consumed");
        Some(byte)
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new(Memory::new())
    }
}

impl std::fmt::Debug for Cpu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cpu")
            .field("cycle", &self.cycle)
            .field("cycles", &self.cycles)
            .field("regs", &self.regs)
            .field("flags", &self.flags)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::assemble;

    fn cpu_with(cells: &[(Word, Word)]) -> Cpu {
        let mut mem = Memory::new();
        for &(addr, value) in cells {
            mem.write(addr, value);
        }
        Cpu::new(mem)
    }

    fn run_source(source: &str) -> Cpu {
        let program = assemble(source).unwrap();
        let mut cpu = Cpu::new(program.memory);
        cpu.run_until_halt(10_000);
        assert!(cpu.is_halted());
        cpu
    }

    #[test]
    fn test_fetch_and_decode() {
        let mut cpu = cpu_with(&[(0x100, 0x2064)]);
        cpu.set_register(Register::Pc, 0x100);

        cpu.run_cycles(2);
        assert_eq!(cpu.register(Register::Ar), 0x100);
        assert_eq!(cpu.register(Register::Ir), 0x2064);

        cpu.run_cycles(2);
        assert_eq!(cpu.register(Register::Pc), 0x101);
        assert_eq!(cpu.register(Register::Ar), 0x064);
        assert_eq!(cpu.instruction().unwrap().mnemonic(), "LDA");
    }

    #[test]
    fn test_cycle_labels() {
        let mut cpu = cpu_with(&[(0, 0x2004), (4, 7)]);
        let mut labels = Vec::new();
        for _ in 0..5 {
            assert!(cpu.advance_one_cycle());
            labels.push(cpu.cycle_label());
        }
        assert_eq!(labels, ["Fetch R'T0", "Fetch R'T1", "Decode R'T2", "D2T4", "D2T5"]);
        assert_eq!(cpu.sequence_counter(), 0);
        assert_eq!(cpu.register(Register::Ac), 7);
    }

    #[test]
    fn test_indirect_adds_one_cycle() {
        let mut direct = cpu_with(&[(0, 0x2020), (0x20, 0x0055)]);
        let direct_cycles = direct.complete_instruction(20);

        let mut indirect = cpu_with(&[(0, 0xA020), (0x20, 0x0030), (0x30, 0x0055)]);
        indirect.run_cycles(4);
        assert_eq!(indirect.cycle_label(), "Decode D7'IT3");
        assert_eq!(indirect.register(Register::Ar), 0x030);
        let indirect_cycles = 4 + indirect.complete_instruction(20);

        assert_eq!(direct.register(Register::Ac), 0x55);
        assert_eq!(indirect.register(Register::Ac), 0x55);
        assert_eq!(indirect_cycles, direct_cycles + 1);
        assert_eq!(direct_cycles as usize, 3 + Opcode::Lda.info().execute_cycles(false));
    }

    #[test]
    fn test_isz_skips_on_zero() {
        let mut cpu = cpu_with(&[(0, 0x6010), (0x10, 0xFFFF)]);
        cpu.complete_instruction(20);
        assert_eq!(cpu.memory().read(0x10), 0);
        assert_eq!(cpu.register(Register::Pc), 2);
    }

    #[test]
    fn test_isz_without_skip() {
        let mut cpu = cpu_with(&[(0, 0x6010), (0x10, 0)]);
        let cycles = cpu.complete_instruction(20);
        assert_eq!(cycles, 6);
        assert_eq!(cpu.memory().read(0x10), 1);
        assert_eq!(cpu.register(Register::Pc), 1);
        assert_eq!(cpu.cycle_label(), "D6T6");
    }

    #[test]
    fn test_store_and_branch() {
        let mut cpu = cpu_with(&[(0, 0x3040), (1, 0x4123)]);
        cpu.set_register(Register::Ac, 0xBEEF);
        cpu.complete_instruction(20);
        assert_eq!(cpu.memory().read(0x040), 0xBEEF);

        cpu.complete_instruction(20);
        assert_eq!(cpu.register(Register::Pc), 0x123);
        assert_eq!(
            cpu.last_transfer(),
            Some(Transfer { source: Endpoint::Ar, destination: Endpoint::Pc, value: 0x123 })
        );
    }

    #[test]
    fn test_bsa_saves_return_address() {
        let mut cpu = cpu_with(&[(0x005, 0x5100)]);
        cpu.set_register(Register::Pc, 0x005);
        cpu.complete_instruction(20);
        assert_eq!(cpu.memory().read(0x100), 0x006);
        assert_eq!(cpu.register(Register::Pc), 0x101);
    }

    #[test]
    fn test_add_and() {
        let cpu = run_source(
            "LDA A\nADD B\nSTA S\nLDA A\nAND B\nSTA N\nHLT\n\
             A, HEX F0\nB, HEX 3C\nS, HEX 0\nN, HEX 0\nEND",
        );
        let mem = cpu.memory();
        assert_eq!(mem.read(9), 0x012C);
        assert_eq!(mem.read(10), 0x0030);
        assert!(!cpu.flags().e);
    }

    #[test]
    fn test_add_carry_sets_e() {
        let mut cpu = cpu_with(&[(0, 0x1010), (1, 0x7001), (0x10, 0x0001)]);
        cpu.set_register(Register::Ac, 0xFFFF);
        cpu.run_until_halt(100);
        assert_eq!(cpu.register(Register::Ac), 0);
        assert!(cpu.flags().e);
    }

    #[test]
    fn test_register_reference_instructions() {
        // CLA, CMA, CIL, CIR, CME, CLE, INC, HLT
        let mut cpu = cpu_with(&[
            (0, 0x7800),
            (1, 0x7200),
            (2, 0x7040),
            (3, 0x7080),
            (4, 0x7100),
            (5, 0x7400),
            (6, 0x7020),
            (7, 0x7001),
        ]);
        cpu.complete_instruction(10);
        assert_eq!(cpu.register(Register::Ac), 0);
        assert_eq!(cpu.cycle_label(), "rB11");
        cpu.complete_instruction(10);
        assert_eq!(cpu.register(Register::Ac), 0xFFFF);
        cpu.complete_instruction(10);
        assert_eq!(cpu.register(Register::Ac), 0xFFFE);
        assert!(cpu.flags().e);
        cpu.complete_instruction(10);
        assert_eq!(cpu.register(Register::Ac), 0xFFFF);
        assert!(!cpu.flags().e);
        cpu.complete_instruction(10);
        assert!(cpu.flags().e);
        cpu.complete_instruction(10);
        assert!(!cpu.flags().e);
        cpu.complete_instruction(10);
        assert_eq!(cpu.register(Register::Ac), 0);
        cpu.complete_instruction(10);
        assert!(cpu.is_halted());
    }

    #[test]
    fn test_register_reference_takes_four_cycles() {
        let mut cpu = cpu_with(&[(0, 0x7800)]);
        assert_eq!(cpu.complete_instruction(10), 4);
        assert_eq!(cpu.sequence_counter(), 0);
    }

    #[test]
    fn test_skip_instructions() {
        // (AC, instruction, skipped?)
        let cases = [
            (0x0001, 0x7010, true),
            (0x8000, 0x7010, false),
            (0x8000, 0x7008, true),
            (0x0001, 0x7008, false),
            (0x0000, 0x7004, true),
            (0x0001, 0x7004, false),
            (0x0000, 0x7002, true),
        ];
        for (ac, word, skipped) in cases {
            let mut cpu = cpu_with(&[(0, word)]);
            cpu.set_register(Register::Ac, ac);
            cpu.complete_instruction(10);
            let expected = if skipped { 2 } else { 1 };
            assert_eq!(cpu.register(Register::Pc), expected, "word {word:04X} with AC {ac:04X}");
        }
    }

    #[test]
    fn test_sze_with_e_set() {
        let mut cpu = cpu_with(&[(0, 0x7002)]);
        cpu.flags_mut().e = true;
        cpu.complete_instruction(10);
        assert_eq!(cpu.register(Register::Pc), 1);
    }

    #[test]
    fn test_halt_freezes_everything() {
        let mut cpu = cpu_with(&[(0, 0x7001)]);
        cpu.run_until_halt(100);
        assert!(cpu.is_halted());

        let snapshot = cpu.snapshot();
        let cycles = cpu.cycles_executed();
        assert!(!cpu.advance_one_cycle());
        assert_eq!(cpu.run_cycles(50), 0);
        assert_eq!(cpu.cycles_executed(), cycles);
        assert_eq!(cpu.snapshot(), snapshot);
    }

    #[test]
    fn test_start_resumes_after_halt() {
        let mut cpu = cpu_with(&[(0, 0x7001), (1, 0x7020), (2, 0x7001)]);
        cpu.run_until_halt(100);
        cpu.start();
        cpu.run_until_halt(100);
        assert_eq!(cpu.register(Register::Ac), 1);
        assert_eq!(cpu.register(Register::Pc), 3);
    }

    #[test]
    fn test_undecodable_word_stalls() {
        // 0x7003 has opcode field 7 but is no register instruction.
        let mut cpu = cpu_with(&[(0, 0x7003), (1, 0x7001)]);
        cpu.run_cycles(3);
        assert!(cpu.instruction().is_none());
        assert_eq!(cpu.cycle(), Cycle::Stall);
        cpu.run_cycles(1);
        assert_eq!(cpu.sequence_counter(), 0);
        assert_eq!(cpu.cycle_label(), "Stall T3");

        cpu.run_until_halt(100);
        assert!(cpu.is_halted());
        assert_eq!(cpu.register(Register::Pc), 2);
    }

    #[test]
    fn test_input_output() {
        // INP, OUT, HLT
        let mut cpu = cpu_with(&[(0, 0xF800), (1, 0xF400), (2, 0x7001)]);
        cpu.inject_input(b'A');
        assert!(cpu.flags().fgi);

        cpu.complete_instruction(10);
        assert_eq!(cpu.register(Register::Ac), 0x41);
        assert!(!cpu.flags().fgi);

        assert_eq!(cpu.take_output(), None);
        cpu.complete_instruction(10);
        assert_eq!(cpu.register(Register::Outr), 0x41);
        assert!(!cpu.flags().fgo);
        assert_eq!(cpu.take_output(), Some(b'A'));
        assert!(cpu.flags().fgo);
        assert_eq!(cpu.take_output(), None);
    }

    #[test]
    fn test_ski_sko() {
        let mut cpu = cpu_with(&[(0, 0xF200), (2, 0xF100)]);
        cpu.inject_input(1);
        cpu.complete_instruction(10);
        assert_eq!(cpu.register(Register::Pc), 2);

        cpu.flags_mut().fgo = false;
        cpu.complete_instruction(10);
        assert_eq!(cpu.register(Register::Pc), 3);
    }

    #[test]
    fn test_interrupt_cycle() {
        // ION at 0x100; FGO is set at power-on so R latches immediately.
        let mut cpu = cpu_with(&[(0x100, 0xF080)]);
        cpu.set_register(Register::Pc, 0x100);
        cpu.set_register(Register::Ac, 0xBEEF);
        cpu.complete_instruction(10);
        assert!(cpu.flags().ien);
        assert!(cpu.flags().r);

        cpu.advance_one_cycle();
        assert_eq!(cpu.cycle_label(), "Interrupt RT0");
        assert_eq!(cpu.register(Register::Ac), 0);
        assert_eq!(cpu.register(Register::Ar), 0);
        assert_eq!(cpu.register(Register::Tr), 0x101);

        assert_eq!(cpu.complete_instruction(10), 2);
        assert_eq!(cpu.cycle_label(), "Interrupt RT2");
        assert_eq!(cpu.memory().read(0), 0x101);
        assert_eq!(cpu.register(Register::Pc), 1);
        assert_eq!(cpu.register(Register::Tr), 0x101);
        assert!(!cpu.flags().ien);
        assert!(!cpu.flags().r);
    }

    #[test]
    fn test_interrupt_preempts_instruction_in_progress() {
        // LDA 010 is interrupted after its fetch.
        let mut cpu = cpu_with(&[(0, 0x2010), (0x10, 0x1234)]);
        cpu.run_cycles(2);
        cpu.flags_mut().r = true;

        cpu.advance_one_cycle();
        assert_eq!(cpu.cycle_label(), "Interrupt RT0");
        assert_eq!(cpu.register(Register::Tr), 1);

        assert_eq!(cpu.complete_instruction(10), 2);
        assert_eq!(cpu.memory().read(0), 1);
        assert_eq!(cpu.register(Register::Pc), 1);
        assert_eq!(cpu.register(Register::Ac), 0);
        assert_eq!(cpu.sequence_counter(), 0);
    }

    #[test]
    fn test_interrupt_sequence_counter() {
        let mut cpu = cpu_with(&[(0, 0xF080)]);
        cpu.complete_instruction(10);
        cpu.advance_one_cycle();
        assert!(cpu.cycle().is_interrupt());
        assert_eq!(cpu.sequence_counter(), 1);
        cpu.advance_one_cycle();
        assert_eq!(cpu.sequence_counter(), 2);
        cpu.advance_one_cycle();
        assert_eq!(cpu.sequence_counter(), 0);
    }

    #[test]
    fn test_interrupt_runs_after_halt() {
        // HLT with IEN and FGO set: R is latched and the service cycle still runs.
        let mut cpu = cpu_with(&[(0, 0x7001)]);
        cpu.flags_mut().ien = true;
        cpu.complete_instruction(10);
        assert!(cpu.is_halted());
        assert!(cpu.flags().r);

        assert_eq!(cpu.run_cycles(10), 3);
        assert_eq!(cpu.memory().read(0), 1);
        assert_eq!(cpu.register(Register::Pc), 1);
        assert!(!cpu.advance_one_cycle());
    }

    #[test]
    fn test_iof_disables_interrupts() {
        let mut cpu = cpu_with(&[(0, 0xF080), (1, 0xF040)]);
        cpu.flags_mut().fgo = false;
        cpu.complete_instruction(10);
        assert!(cpu.flags().ien);
        assert!(!cpu.flags().r);
        cpu.complete_instruction(10);
        assert!(!cpu.flags().ien);
    }

    #[test]
    fn test_bus_transfer_cleared_each_cycle() {
        let mut cpu = cpu_with(&[(0, 0x7020)]);
        cpu.advance_one_cycle();
        assert_eq!(cpu.last_transfer().unwrap().destination, Endpoint::Ar);
        cpu.run_cycles(3);
        // INC does not use the bus.
        assert!(cpu.last_transfer().is_none());
    }

    #[test]
    fn test_counted_loop() {
        // Add X to SUM three times, counting CNT up from -3 with ISZ.
        let cpu = run_source(
            "      ORG 0\n\
                   LDA C\n\
                   CMA\n\
                   INC\n\
                   STA CNT\n\
             LOP,  LDA SUM\n\
                   ADD X\n\
                   STA SUM\n\
                   ISZ CNT\n\
                   BUN LOP\n\
                   HLT\n\
             C,    DEC 3\n\
             X,    DEC 7\n\
             SUM,  DEC 0\n\
             CNT,  HEX 0   / loop counter\n\
                   END",
        );
        assert_eq!(cpu.memory().read(12), 21);
        assert_eq!(cpu.memory().read(13), 0);
    }

    #[test]
    fn test_subroutine_with_indirect_return() {
        let cpu = run_source(
            "      ORG 0\n\
                   LDA X\n\
                   BSA SUB\n\
                   STA Y\n\
                   HLT\n\
             X,    DEC 21\n\
             Y,    DEC 0\n\
             SUB,  HEX 0\n\
                   CIL\n\
                   BUN SUB I\n\
                   END",
        );
        assert_eq!(cpu.memory().read(5), 42);
        assert_eq!(cpu.memory().read(6), 2);
    }
}
