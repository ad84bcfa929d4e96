//! Instruction model and assembly for register-based bytecode.
//!
//! This module provides the building blocks the patching layer operates on:
//!
//! - [`Opcode`] - the supported Dalvik opcode table with encoding formats
//! - [`Instruction`] / [`Operand`] / [`Register`] - the instruction model with
//!   symbolic references and symbolic registers
//! - [`InstructionAssembler`] - fluent construction of labeled sequences
//! - [`InstructionSequence`] - a finished sequence awaiting insertion
//!
//! Branch targets stay symbolic ([`Operand::Label`]) until a sequence is
//! spliced into a method body; the editor then resolves them to code-unit
//! distances. See [`crate::patching::editor`] for the resolution rules.

pub mod assembler;
pub mod instruction;
pub mod opcode;

pub use assembler::{InstructionAssembler, InstructionSequence};
pub use instruction::{Instruction, Operand, Register};
pub use opcode::{BranchKind, Format, InvocationKind, Opcode};
