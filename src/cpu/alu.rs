//! The arithmetic-logic unit.
//!
//! Operands are latched from the register file with [`Alu::load`] or
//! [`Alu::load_pair`] just before [`Alu::operate`].

use crate::cpu::registers::{Register, Registers};
use crate::isa::Word;
use serde::{Serialize, Deserialize};

/// Operations the ALU performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AluOp {
    /// A AND B.
    And,
    /// A + B, carry out into E.
    Add,
    /// Pass A through unchanged.
    Transfer,
    /// Complement A.
    Complement,
    /// Complement E. Produces no result word.
    ComplementE,
    /// Circulate E and A right.
    CirculateRight,
    /// Circulate E and A left.
    CirculateLeft,
}

impl AluOp {
    pub fn name(self) -> &'static str {
        match self {
            AluOp::And => "And",
            AluOp::Add => "Add",
            AluOp::Transfer => "Load",
            AluOp::Complement => "CMA",
            AluOp::ComplementE => "CME",
            AluOp::CirculateRight => "CIR",
            AluOp::CirculateLeft => "CIL",
        }
    }
}

/// What the ALU did most recently, for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AluActivity {
    pub op: AluOp,
    pub a_source: Option<Register>,
    pub b_source: Option<Register>,
    pub result: Word,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Alu {
    a: Word,
    b: Word,
    a_source: Option<Register>,
    b_source: Option<Register>,
    result: Word,
    activity: Option<AluActivity>,
}

impl Alu {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latch a single operand.
    pub fn load(&mut self, regs: &Registers, a: Register) {
        self.a = regs.get(a);
        self.a_source = Some(a);
        self.b_source = None;
    }

    /// Latch two operands.
    pub fn load_pair(&mut self, regs: &Registers, a: Register, b: Register) {
        self.a = regs.get(a);
        self.b = regs.get(b);
        self.a_source = Some(a);
        self.b_source = Some(b);
    }

    /// Run `op` on the latched operands.
    ///
    /// `ADD`, `CME`, `CIR` and `CIL` update `e`. `CME` leaves the previous
    /// result in place.
    pub fn operate(&mut self, op: AluOp, e: &mut bool) -> Word {
        let a = self.a;
        let b = self.b;
        self.result = match op {
            AluOp::And => a & b,
            AluOp::Add => {
                let (sum, carry) = a.overflowing_add(b);
                *e = carry;
                sum
            }
            AluOp::Transfer => a,
            AluOp::Complement => !a,
            AluOp::ComplementE => {
                *e = !*e;
                self.result
            }
            AluOp::CirculateRight => {
                let result = (Word::from(*e) << 15) | (a >> 1);
                *e = a & 0x1 != 0;
                result
            }
            AluOp::CirculateLeft => {
                let result = Word::from(*e) | (a << 1);
                *e = a & 0x8000 != 0;
                result
            }
        };

        let (a_source, b_source) = match op {
            AluOp::ComplementE => (None, None),
            AluOp::And | AluOp::Add => (self.a_source, self.b_source),
            _ => (self.a_source, None),
        };
        self.activity = Some(AluActivity { op, a_source, b_source, result: self.result });
        self.result
    }

    pub fn activity(&self) -> Option<AluActivity> {
        self.activity
    }

    pub fn clear_activity(&mut self) {
        self.activity = None;
    }
}
