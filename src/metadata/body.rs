//! Method instruction bodies.
//!
//! An [`InstructionBody`] owns the ordered instruction list of one concrete
//! method together with its register file declaration: `registers` total
//! slots, of which the top `ins` hold the incoming parameters (including the
//! implicit `this` for instance methods). Exception regions are carried along
//! untouched; the editor shifts their instruction indices on insertion but
//! never interprets them.
//!
//! Instruction positions exist in two coordinate systems: the instruction
//! *index* (what editing operations address) and the code-unit *address*
//! (what branch distances are measured in). [`InstructionBody::address_of`]
//! and [`InstructionBody::index_at_address`] convert between the two.

use crate::assembly::instruction::{Instruction, Register};
use crate::metadata::ty::TypeName;
use crate::{Error, Result};

/// One exception handler region, in instruction indices.
///
/// Preserved across edits but never interpreted by the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TryRegion {
    /// First covered instruction index
    pub start: usize,
    /// One past the last covered instruction index
    pub end: usize,
    /// Index of the handler's first instruction
    pub handler: usize,
    /// Caught exception type, `None` for catch-all
    pub exception: Option<TypeName>,
}

/// The instruction body of one concrete method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionBody {
    /// Declared register count
    pub registers: u16,
    /// Incoming parameter register count, occupying the top of the file
    pub ins: u16,
    /// The instructions, in execution order
    pub instructions: Vec<Instruction>,
    /// Exception regions, preserved verbatim
    pub try_regions: Vec<TryRegion>,
}

impl InstructionBody {
    /// Create an empty body with the given register declaration.
    #[must_use]
    pub fn new(registers: u16, ins: u16) -> Self {
        InstructionBody {
            registers,
            ins,
            instructions: Vec::new(),
            try_regions: Vec::new(),
        }
    }

    /// Create a body from an instruction list.
    #[must_use]
    pub fn with_instructions(registers: u16, ins: u16, instructions: Vec<Instruction>) -> Self {
        InstructionBody {
            registers,
            ins,
            instructions,
            try_regions: Vec::new(),
        }
    }

    /// Number of instructions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Returns `true` if the body holds no instructions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Number of local (non-parameter) registers.
    #[must_use]
    pub fn locals(&self) -> u16 {
        self.registers - self.ins
    }

    /// Total size of the body in 16-bit code units.
    #[must_use]
    pub fn code_units(&self) -> usize {
        self.instructions.iter().map(Instruction::units).sum()
    }

    /// Code-unit address of the instruction at `index`.
    ///
    /// `index == len()` is allowed and yields the end address. Out-of-range
    /// indices yield `None`.
    #[must_use]
    pub fn address_of(&self, index: usize) -> Option<usize> {
        if index > self.instructions.len() {
            return None;
        }
        Some(self.instructions[..index].iter().map(Instruction::units).sum())
    }

    /// Instruction index at an exact code-unit address.
    ///
    /// `None` if the address falls mid-instruction or past the end.
    #[must_use]
    pub fn index_at_address(&self, address: usize) -> Option<usize> {
        let mut current = 0;
        for (index, instruction) in self.instructions.iter().enumerate() {
            if current == address {
                return Some(index);
            }
            if current > address {
                return None;
            }
            current += instruction.units();
        }
        None
    }

    /// Prefix table of code-unit addresses, one entry per instruction plus
    /// the end address.
    #[must_use]
    pub fn addresses(&self) -> Vec<usize> {
        let mut table = Vec::with_capacity(self.instructions.len() + 1);
        let mut current = 0;
        table.push(current);
        for instruction in &self.instructions {
            current += instruction.units();
            table.push(current);
        }
        table
    }

    /// Absolute register file position of a symbolic register.
    ///
    /// Parameters map to the top of the file:
    /// `p(i)` resolves to `registers - ins + i`.
    #[must_use]
    pub fn resolve_register(&self, register: Register) -> u16 {
        match register {
            Register::Local(n) => n,
            Register::Parameter(n) => self.registers - self.ins + n,
        }
    }

    /// Check the register file invariants of this body.
    ///
    /// Every register operand must resolve strictly below the declared
    /// register count, and exception regions must stay within the instruction
    /// list.
    ///
    /// # Errors
    ///
    /// [`Error::Malformed`] for an inconsistent register declaration or
    /// exception region, [`Error::RegisterOutOfRange`] for a violating
    /// operand.
    pub fn validate(&self) -> Result<()> {
        if self.ins > self.registers {
            return Err(malformed_error!(
                "parameter register count {} exceeds declared register count {}",
                self.ins,
                self.registers
            ));
        }

        for instruction in &self.instructions {
            for register in instruction.registers() {
                let resolved = match register {
                    Register::Local(n) => n,
                    Register::Parameter(n) => {
                        if n >= self.ins {
                            return Err(Error::RegisterOutOfRange {
                                register: self.registers - self.ins + n,
                                count: self.registers,
                            });
                        }
                        self.resolve_register(register)
                    }
                };
                if resolved >= self.registers {
                    return Err(Error::RegisterOutOfRange {
                        register: resolved,
                        count: self.registers,
                    });
                }
            }
        }

        for region in &self.try_regions {
            if region.start > region.end
                || region.end > self.instructions.len()
                || region.handler >= self.instructions.len()
            {
                return Err(malformed_error!(
                    "exception region {}..{} (handler {}) outside body of {} instructions",
                    region.start,
                    region.end,
                    region.handler,
                    self.instructions.len()
                ));
            }
        }

        Ok(())
    }
}
