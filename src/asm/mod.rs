//! Assembler and disassembler for basic computer programs.
//!
//! This module provides:
//! - A two-pass assembler (source text to memory image)
//! - A disassembler (memory image to readable text)

pub mod assembler;
pub mod disasm;
pub mod lexer;

pub use assembler::{assemble, AsmError, AsmErrorKind, Assembler, AssemblyErrors, Program, Severity};
pub use disasm::{disassemble_word, listing};
