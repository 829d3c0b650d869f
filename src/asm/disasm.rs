//! Disassembler for memory images.
//!
//! Renders words back to assembler syntax, naming addresses by their labels
//! where a symbol table is available.

use crate::cpu::memory::Memory;
use crate::isa::{Instruction, Word};
use std::collections::{BTreeMap, HashMap};

/// Disassemble a single word.
///
/// Words that match no instruction are shown as data.
pub fn disassemble_word(word: Word) -> String {
    match Instruction::from_opcode(word) {
        Some(instr) => instr.to_string(),
        None => format!("HEX {:04X}", word),
    }
}

/// List every programmed cell of `memory`, one per line.
///
/// ```text
/// 000  2010  LDA N
/// 001  7001  HLT
/// 010  0005  N,   AND 005
/// ```
pub fn listing(memory: &Memory, symbols: &HashMap<String, Word>) -> String {
    // Lowest label wins when several share an address.
    let mut labels: BTreeMap<Word, &str> = BTreeMap::new();
    for (name, &addr) in symbols {
        labels
            .entry(addr)
            .and_modify(|current| {
                if name.as_str() < *current {
                    *current = name.as_str();
                }
            })
            .or_insert(name.as_str());
    }

    let mut output = String::new();
    for (addr, word) in memory.programmed() {
        let label = labels
            .get(&addr)
            .map(|name| format!("{},", name))
            .unwrap_or_default();
        let text = match Instruction::from_opcode(word) {
            Some(instr) if instr.is_memory_reference() => match labels.get(&instr.address()) {
                Some(target) if instr.is_indirect() => format!("{} {} I", instr.mnemonic(), target),
                Some(target) => format!("{} {}", instr.mnemonic(), target),
                None => instr.to_string(),
            },
            Some(instr) => instr.to_string(),
            None => format!("HEX {:04X}", word),
        };
        output.push_str(&format!("{:03X}  {:04X}  {:<5}{}\n", addr, word, label, text));
    }
    output
}
