//! Two-pass assembler for the basic computer.
//!
//! Syntax:
//! ```text
//!       ORG 100      / Set the location counter (hex)
//! LOP,  LDA X I      / Label, memory-reference instruction, indirect
//!       CMA          / Register-reference instruction
//!       BUN LOP
//! X,    DEC -5       / Signed 8-bit decimal literal
//!       HEX 3F       / Unsigned 8-bit hex literal
//!       END
//! ```
//!
//! Pass 1 builds the symbol table. Pass 2 encodes every line into a
//! [`Memory`] image. Invalid or duplicate labels are recoverable: they are
//! recorded and assembly continues. Every other error aborts assembly.

use crate::asm::lexer::LineCursor;
use crate::cpu::memory::{Memory, MEMORY_SIZE};
use crate::isa::{Instruction, Word};
use std::collections::HashMap;
use std::num::IntErrorKind;
use std::ops::RangeInclusive;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Assemble source text with a fresh [`Assembler`].
pub fn assemble(source: &str) -> Result<Program, AssemblyErrors> {
    Assembler::new().assemble(source)
}

/// A successfully assembled program.
#[derive(Debug, Clone)]
pub struct Program {
    /// The memory image. Cells the source never wrote hold `0xFFFF`.
    pub memory: Memory,
    /// Label -> address.
    pub symbols: HashMap<String, Word>,
    /// Recoverable diagnostics.
    pub warnings: Vec<AsmError>,
}

/// Whether a diagnostic stops assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Recoverable,
    Fatal,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AsmErrorKind {
    #[error("invalid label `{0}`: labels are at most 3 characters and start with a letter")]
    InvalidLabel(String),

    #[error("label `{0}` is already defined")]
    DuplicateLabel(String),

    #[error("expected a number after {directive}")]
    MissingInteger { directive: &'static str },

    #[error("`{text}` is not a valid base-{radix} number")]
    InvalidInteger { text: String, radix: u32 },

    #[error("`{text}` is out of range for {directive}")]
    IntegerOutOfRange { text: String, directive: &'static str },

    #[error("origin `{0}` is beyond the end of memory")]
    OriginOutOfRange(String),

    #[error("program exceeds memory size")]
    ProgramTooLarge,

    #[error("there was no END directive in the source")]
    MissingEnd,

    #[error("`{0}` is not a valid instruction")]
    UnknownMnemonic(String),

    #[error("unrecognized symbol `{symbol}` after {mnemonic}")]
    UndefinedSymbol { symbol: String, mnemonic: &'static str },

    #[error("expected a symbol after {mnemonic}")]
    MissingSymbol { mnemonic: &'static str },

    #[error("unexpected `{token}` after {mnemonic}, expected the indirect marker I")]
    InvalidIndirect { token: String, mnemonic: &'static str },

    #[error("expected an instruction after label `{0}`")]
    MissingInstruction(String),

    #[error("unexpected `{0}`")]
    UnexpectedContent(String),
}

impl AsmErrorKind {
    pub fn severity(&self) -> Severity {
        match self {
            AsmErrorKind::InvalidLabel(_) | AsmErrorKind::DuplicateLabel(_) => Severity::Recoverable,
            _ => Severity::Fatal,
        }
    }
}

/// A diagnostic tied to a source line (1-based).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {kind}")]
pub struct AsmError {
    pub line: usize,
    pub kind: AsmErrorKind,
}

impl AsmError {
    pub fn new(line: usize, kind: AsmErrorKind) -> Self {
        Self { line, kind }
    }

    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }

    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

/// Every diagnostic of a failed assembly, in order of detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyErrors(pub Vec<AsmError>);

impl AssemblyErrors {
    pub fn errors(&self) -> &[AsmError] {
        &self.0
    }

    /// The error that stopped assembly.
    pub fn fatal(&self) -> Option<&AsmError> {
        self.0.iter().find(|err| err.is_fatal())
    }
}

impl std::fmt::Display for AssemblyErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for AssemblyErrors {}

/// The assembler state. Reset at the start of every [`Assembler::assemble`].
#[derive(Debug, Default)]
pub struct Assembler {
    memory: Memory,
    symbols: HashMap<String, Word>,
    errors: Vec<AsmError>,
    /// Location counter.
    lc: usize,
}

impl Assembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assemble(&mut self, source: &str) -> Result<Program, AssemblyErrors> {
        self.memory.clear();
        self.symbols.clear();
        self.errors.clear();

        let result = self.first_pass(source).and_then(|()| {
            debug!(symbols = self.symbols.len(), "pass 1 complete");
            self.second_pass(source)
        });

        match result {
            Ok(()) => {
                info!(
                    cells = self.memory.programmed().count(),
                    warnings = self.errors.len(),
                    "assembled"
                );
                Ok(Program {
                    memory: self.memory.clone(),
                    symbols: self.symbols.clone(),
                    warnings: self.errors.clone(),
                })
            }
            Err(err) => {
                debug!(%err, "assembly failed");
                self.errors.push(err);
                Err(AssemblyErrors(self.errors.clone()))
            }
        }
    }

    /// Diagnostics from the last call to [`Assembler::assemble`].
    pub fn errors(&self) -> &[AsmError] {
        &self.errors
    }

    pub fn symbols(&self) -> &HashMap<String, Word> {
        &self.symbols
    }

    // ==================== Pass 1 ====================

    fn first_pass(&mut self, source: &str) -> Result<(), AsmError> {
        self.lc = 0;
        let mut last_line = 0;
        let mut lines = source.lines().enumerate();

        while let Some((index, text)) = lines.next() {
            let line = index + 1;
            last_line = line;
            let mut cursor = LineCursor::new(text);
            let Some(token) = cursor.next_token() else {
                continue;
            };

            match token {
                "END" => {
                    finish_line(&mut cursor, line)?;
                    for (index, text) in lines.by_ref() {
                        finish_line(&mut LineCursor::new(text), index + 1)?;
                    }
                    return Ok(());
                }
                "ORG" => {
                    self.lc = parse_origin(&mut cursor).map_err(|kind| AsmError::new(line, kind))?;
                    finish_line(&mut cursor, line)?;
                    continue;
                }
                _ => {}
            }

            if cursor.take_label_comma() {
                self.define_label(line, token);
            }

            if self.lc >= MEMORY_SIZE {
                return Err(AsmError::new(line, AsmErrorKind::ProgramTooLarge));
            }
            self.lc += 1;
        }

        Err(AsmError::new(last_line.max(1), AsmErrorKind::MissingEnd))
    }

    fn define_label(&mut self, line: usize, label: &str) {
        let valid = label.chars().count() <= 3
            && label.chars().next().is_some_and(|c| c.is_ascii_alphabetic());

        let kind = if !valid {
            AsmErrorKind::InvalidLabel(label.to_string())
        } else if self.symbols.contains_key(label) {
            AsmErrorKind::DuplicateLabel(label.to_string())
        } else {
            self.symbols.insert(label.to_string(), self.lc as Word);
            return;
        };

        let err = AsmError::new(line, kind);
        warn!("{err}");
        self.errors.push(err);
    }

    // ==================== Pass 2 ====================

    fn second_pass(&mut self, source: &str) -> Result<(), AsmError> {
        self.lc = 0;

        for (index, text) in source.lines().enumerate() {
            let line = index + 1;
            let mut cursor = LineCursor::new(text);
            let Some(mut token) = cursor.next_token() else {
                continue;
            };

            match token {
                "END" => return Ok(()),
                "ORG" => {
                    self.lc = parse_origin(&mut cursor).map_err(|kind| AsmError::new(line, kind))?;
                    continue;
                }
                _ => {}
            }

            if cursor.take_label_comma() {
                token = cursor
                    .next_token()
                    .ok_or_else(|| AsmError::new(line, AsmErrorKind::MissingInstruction(token.to_string())))?;
            }

            let word = self.encode(&mut cursor, token).map_err(|kind| AsmError::new(line, kind))?;
            self.memory.write(self.lc as Word, word);
            self.lc += 1;

            finish_line(&mut cursor, line)?;
        }

        Ok(())
    }

    /// Encode one statement. `token` is the mnemonic or data directive.
    fn encode(&self, cursor: &mut LineCursor<'_>, token: &str) -> Result<Word, AsmErrorKind> {
        match token {
            "DEC" => {
                let value = parse_integer(cursor, "DEC", 10, -128..=127)?;
                // Stored as the low byte only.
                return Ok(Word::from(value as u8));
            }
            "HEX" => {
                let value = parse_integer(cursor, "HEX", 16, 0..=0xFF)?;
                return Ok(value as Word);
            }
            _ => {}
        }

        let instr = Instruction::from_mnemonic(token)
            .ok_or_else(|| AsmErrorKind::UnknownMnemonic(token.to_string()))?;
        if !instr.is_memory_reference() {
            return Ok(instr.word());
        }

        let mnemonic = instr.mnemonic();
        let symbol = cursor
            .next_token()
            .ok_or(AsmErrorKind::MissingSymbol { mnemonic })?;
        let address = *self.symbols.get(symbol).ok_or_else(|| AsmErrorKind::UndefinedSymbol {
            symbol: symbol.to_string(),
            mnemonic,
        })?;

        let indirect = match cursor.next_token() {
            None => false,
            Some("I") => true,
            Some(other) => {
                return Err(AsmErrorKind::InvalidIndirect { token: other.to_string(), mnemonic });
            }
        };

        Ok(instr.info().encode(address, indirect))
    }
}

fn finish_line(cursor: &mut LineCursor<'_>, line: usize) -> Result<(), AsmError> {
    cursor
        .finish()
        .map_err(|text| AsmError::new(line, AsmErrorKind::UnexpectedContent(text.to_string())))
}

/// Parse the hex operand of `ORG`.
fn parse_origin(cursor: &mut LineCursor<'_>) -> Result<usize, AsmErrorKind> {
    let text = cursor
        .next_token()
        .ok_or(AsmErrorKind::MissingInteger { directive: "ORG" })?;
    match usize::from_str_radix(text, 16) {
        Ok(addr) if addr < MEMORY_SIZE => Ok(addr),
        Ok(_) => Err(AsmErrorKind::OriginOutOfRange(text.to_string())),
        Err(e) if matches!(e.kind(), IntErrorKind::PosOverflow) => {
            Err(AsmErrorKind::OriginOutOfRange(text.to_string()))
        }
        Err(_) => Err(AsmErrorKind::InvalidInteger { text: text.to_string(), radix: 16 }),
    }
}

/// Parse an integer operand and check it against `range`.
fn parse_integer(
    cursor: &mut LineCursor<'_>,
    directive: &'static str,
    radix: u32,
    range: RangeInclusive<i64>,
) -> Result<i64, AsmErrorKind> {
    let text = cursor
        .next_token()
        .ok_or(AsmErrorKind::MissingInteger { directive })?;
    let out_of_range = || AsmErrorKind::IntegerOutOfRange { text: text.to_string(), directive };

    match i64::from_str_radix(text, radix) {
        Ok(value) if range.contains(&value) => Ok(value),
        Ok(_) => Err(out_of_range()),
        Err(e) if matches!(e.kind(), IntErrorKind::PosOverflow | IntErrorKind::NegOverflow) => {
            Err(out_of_range())
        }
        Err(_) => Err(AsmErrorKind::InvalidInteger { text: text.to_string(), radix }),
    }
}
