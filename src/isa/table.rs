//! The instruction table.
//!
//! Seven memory-reference instructions occupy opcode field values 0-6 and
//! carry a 12-bit address plus an indirect bit. The remaining eighteen
//! register-reference (`0x7xxx`) and I/O (`0xFxxx`) instructions are
//! identified by their full 16-bit pattern.

use serde::{Serialize, Deserialize};

use super::word::{opcode_field, Word, ADDRESS_MASK, INDIRECT_BIT};

/// Every operation the machine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Opcode {
    // ==================== Memory reference ====================
    And,
    Add,
    Lda,
    Sta,
    Bun,
    Bsa,
    Isz,

    // ==================== Register reference ====================
    Cla,
    Cle,
    Cma,
    Cme,
    Cir,
    Cil,
    Inc,
    Spa,
    Sna,
    Sza,
    Sze,
    Hlt,

    // ==================== Input-output ====================
    Inp,
    Out,
    Ski,
    Sko,
    Ion,
    Iof,
}

impl Opcode {
    /// Whether this operation takes an address operand.
    pub fn is_memory_reference(self) -> bool {
        matches!(
            self,
            Opcode::And
                | Opcode::Add
                | Opcode::Lda
                | Opcode::Sta
                | Opcode::Bun
                | Opcode::Bsa
                | Opcode::Isz
        )
    }

    /// The table entry for this operation.
    pub fn info(self) -> &'static InstructionInfo {
        // Table order matches declaration order.
        &INSTRUCTIONS[self as usize]
    }
}

/// An immutable instruction table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InstructionInfo {
    pub opcode: Opcode,
    pub mnemonic: &'static str,
    /// Opcode field value (0-6) for memory-reference entries, the full
    /// 16-bit word otherwise.
    pub pattern: Word,
    pub memory_reference: bool,
    /// Control-unit labels of the execute states, one per state.
    pub cycle_labels: &'static [&'static str],
    pub description: &'static str,
}

impl InstructionInfo {
    /// Encode this entry with an operand.
    ///
    /// Register and I/O entries ignore both arguments.
    pub fn encode(&self, address: Word, indirect: bool) -> Word {
        if !self.memory_reference {
            return self.pattern;
        }
        let indirect = if indirect { INDIRECT_BIT } else { 0 };
        indirect | (self.pattern << 12) | (address & ADDRESS_MASK)
    }

    /// Cycles this instruction takes after decode (T3 onward).
    pub fn execute_cycles(&self, indirect: bool) -> usize {
        if !self.memory_reference {
            return 1;
        }
        // Direct addressing runs the first execute state during T3.
        self.cycle_labels.len() + usize::from(indirect)
    }
}

const fn mri(
    opcode: Opcode,
    mnemonic: &'static str,
    pattern: Word,
    cycle_labels: &'static [&'static str],
    description: &'static str,
) -> InstructionInfo {
    InstructionInfo { opcode, mnemonic, pattern, memory_reference: true, cycle_labels, description }
}

const fn rri(
    opcode: Opcode,
    mnemonic: &'static str,
    pattern: Word,
    cycle_labels: &'static [&'static str],
    description: &'static str,
) -> InstructionInfo {
    InstructionInfo { opcode, mnemonic, pattern, memory_reference: false, cycle_labels, description }
}

/// The complete instruction set, in [`Opcode`] declaration order.
pub static INSTRUCTIONS: [InstructionInfo; 25] = [
    mri(Opcode::And, "AND", 0x0, &["D0T4", "D0T5"], "AND M to AC"),
    mri(Opcode::Add, "ADD", 0x1, &["D1T4", "D1T5"], "Add M to AC, carry to E"),
    mri(Opcode::Lda, "LDA", 0x2, &["D2T4", "D2T5"], "Load AC from M"),
    mri(Opcode::Sta, "STA", 0x3, &["D3T4"], "Store AC in M"),
    mri(Opcode::Bun, "BUN", 0x4, &["D4T4"], "Branch unconditionally to m"),
    mri(Opcode::Bsa, "BSA", 0x5, &["D5T4", "D5T5"], "Save return address in m and branch to m + 1"),
    mri(Opcode::Isz, "ISZ", 0x6, &["D6T4", "D6T5", "D6T6"], "Increment M and skip if zero"),
    rri(Opcode::Cla, "CLA", 0x7800, &["rB11"], "Clear AC"),
    rri(Opcode::Cle, "CLE", 0x7400, &["rB10"], "Clear E"),
    rri(Opcode::Cma, "CMA", 0x7200, &["rB9"], "Complement AC"),
    rri(Opcode::Cme, "CME", 0x7100, &["rB8"], "Complement E"),
    rri(Opcode::Cir, "CIR", 0x7080, &["rB7"], "Circulate right E and AC"),
    rri(Opcode::Cil, "CIL", 0x7040, &["rB6"], "Circulate left E and AC"),
    rri(Opcode::Inc, "INC", 0x7020, &["rB5"], "Increment AC"),
    rri(Opcode::Spa, "SPA", 0x7010, &["rB4"], "Skip if AC is positive"),
    rri(Opcode::Sna, "SNA", 0x7008, &["rB3"], "Skip if AC is negative"),
    rri(Opcode::Sza, "SZA", 0x7004, &["rB2"], "Skip if AC is zero"),
    rri(Opcode::Sze, "SZE", 0x7002, &["rB1"], "Skip if E is zero"),
    rri(Opcode::Hlt, "HLT", 0x7001, &["rB0"], "Halt computer"),
    rri(Opcode::Inp, "INP", 0xF800, &["pB11"], "Input character to AC and clear flag"),
    rri(Opcode::Out, "OUT", 0xF400, &["pB10"], "Output character from AC and clear flag"),
    rri(Opcode::Ski, "SKI", 0xF200, &["pB9"], "Skip if input flag is on"),
    rri(Opcode::Sko, "SKO", 0xF100, &["pB8"], "Skip if output flag is on"),
    rri(Opcode::Ion, "ION", 0xF080, &["pB7"], "Turn interrupt on"),
    rri(Opcode::Iof, "IOF", 0xF040, &["pB6"], "Turn interrupt off"),
];

/// A table entry together with the word it stands for.
///
/// For memory-reference instructions decoded from memory the word keeps
/// the address field and indirect bit recoverable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Instruction {
    info: &'static InstructionInfo,
    word: Word,
}

impl Instruction {
    /// Look up an instruction by mnemonic.
    pub fn from_mnemonic(text: &str) -> Option<Self> {
        INSTRUCTIONS
            .iter()
            .find(|info| info.mnemonic == text)
            .map(|info| Self { info, word: info.pattern })
    }

    /// Decode a word.
    ///
    /// Exact register/I-O patterns are tried first; otherwise an opcode
    /// field of 0-6 selects a memory-reference instruction.
    pub fn from_opcode(word: Word) -> Option<Self> {
        if let Some(info) = INSTRUCTIONS[7..].iter().find(|info| info.pattern == word) {
            return Some(Self { info, word });
        }
        let field = opcode_field(word) as usize;
        if field <= 6 {
            return Some(Self { info: &INSTRUCTIONS[field], word });
        }
        None
    }

    pub fn info(&self) -> &'static InstructionInfo {
        self.info
    }

    pub fn opcode(&self) -> Opcode {
        self.info.opcode
    }

    pub fn mnemonic(&self) -> &'static str {
        self.info.mnemonic
    }

    pub fn description(&self) -> &'static str {
        self.info.description
    }

    pub fn is_memory_reference(&self) -> bool {
        self.info.memory_reference
    }

    /// The word this instruction was built from.
    pub fn word(&self) -> Word {
        self.word
    }

    /// Low 12 bits of the word.
    pub fn address(&self) -> Word {
        self.word & ADDRESS_MASK
    }

    /// Bit 15 set on a memory-reference instruction.
    pub fn is_indirect(&self) -> bool {
        self.info.memory_reference && self.word & INDIRECT_BIT != 0
    }
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_memory_reference() {
            write!(f, "{} {:03X}", self.mnemonic(), self.address())?;
            if self.is_indirect() {
                write!(f, " I")?;
            }
            Ok(())
        } else {
            write!(f, "{}", self.mnemonic())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_order_matches_opcodes() {
        for (i, info) in INSTRUCTIONS.iter().enumerate() {
            assert_eq!(info.opcode as usize, i);
            assert_eq!(info.opcode.is_memory_reference(), info.memory_reference);
        }
        assert_eq!(INSTRUCTIONS.iter().filter(|i| i.memory_reference).count(), 7);
    }

    #[test]
    fn test_from_mnemonic() {
        let lda = Instruction::from_mnemonic("LDA").unwrap();
        assert_eq!(lda.opcode(), Opcode::Lda);
        assert!(lda.is_memory_reference());

        let hlt = Instruction::from_mnemonic("HLT").unwrap();
        assert_eq!(hlt.word(), 0x7001);

        assert!(Instruction::from_mnemonic("NOP").is_none());
        assert!(Instruction::from_mnemonic("lda").is_none());
    }

    #[test]
    fn test_from_opcode_register_reference() {
        for info in &INSTRUCTIONS[7..] {
            let decoded = Instruction::from_opcode(info.pattern).unwrap();
            assert_eq!(decoded.opcode(), info.opcode);
            assert!(!decoded.is_indirect());
        }
    }

    #[test]
    fn test_from_opcode_memory_reference() {
        let direct = Instruction::from_opcode(0x2064).unwrap();
        assert_eq!(direct.mnemonic(), "LDA");
        assert_eq!(direct.address(), 0x064);
        assert!(!direct.is_indirect());

        let indirect = Instruction::from_opcode(0xE123).unwrap();
        assert_eq!(indirect.mnemonic(), "ISZ");
        assert_eq!(indirect.address(), 0x123);
        assert!(indirect.is_indirect());
    }

    #[test]
    fn test_from_opcode_not_found() {
        // Opcode field 7 but not an exact register or I/O pattern.
        assert!(Instruction::from_opcode(0x7003).is_none());
        assert!(Instruction::from_opcode(0xF000).is_none());
        assert!(Instruction::from_opcode(0xFFFF).is_none());
    }

    #[test]
    fn test_encode() {
        assert_eq!(Opcode::Lda.info().encode(0x010, false), 0x2010);
        assert_eq!(Opcode::Bun.info().encode(0x1234, true), 0xC234);
        assert_eq!(Opcode::Cla.info().encode(0x123, true), 0x7800);
    }

    #[test]
    fn test_display() {
        assert_eq!(Instruction::from_opcode(0x2064).unwrap().to_string(), "LDA 064");
        assert_eq!(Instruction::from_opcode(0x9001).unwrap().to_string(), "ADD 001 I");
        assert_eq!(Instruction::from_opcode(0xF080).unwrap().to_string(), "ION");
    }

    #[test]
    fn test_execute_cycles() {
        assert_eq!(Opcode::Isz.info().execute_cycles(false), 3);
        assert_eq!(Opcode::Isz.info().execute_cycles(true), 4);
        assert_eq!(Opcode::Sta.info().execute_cycles(false), 1);
        assert_eq!(Opcode::Cla.info().execute_cycles(true), 1);
    }
}
