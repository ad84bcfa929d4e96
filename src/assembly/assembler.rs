//! Fluent assembler for labeled instruction sequences.
//!
//! [`InstructionAssembler`] builds the sequences that the instruction stream
//! editor splices into method bodies. Branches name their targets with
//! symbolic labels; a label marks the position of the next emitted
//! instruction, and resolution to concrete code-unit distances happens after
//! splicing, once final instruction addresses are known.
//!
//! # Examples
//!
//! The guarded-return prologue used to gate an event handler behind an
//! injected check:
//!
//! ```rust
//! use dexscope::assembly::{InstructionAssembler, Register};
//! use dexscope::metadata::refs::MethodRef;
//!
//! let guard = MethodRef::new("Lapp/Hook;", "disableLongPress", &[], "Z");
//! let mut asm = InstructionAssembler::new();
//! asm.invoke_static(&[], guard)?
//!     .move_result(Register::local(0))?
//!     .if_eqz(Register::local(0), "cont")?
//!     .return_void()?
//!     .label("cont")?
//!     .nop()?;
//! let sequence = asm.finish();
//! assert_eq!(sequence.len(), 5);
//! # Ok::<(), dexscope::Error>(())
//! ```

use std::collections::HashMap;

use crate::assembly::instruction::{Instruction, Operand, Register};
use crate::assembly::opcode::Opcode;
use crate::metadata::refs::{FieldRef, MethodRef};
use crate::metadata::ty::TypeName;
use crate::{Error, Result};

/// A finished, still-unresolved instruction sequence with its label table.
///
/// Produced by [`InstructionAssembler::finish`] and consumed by the editor.
/// Labels map to instruction indices within the sequence; a label may sit one
/// past the last instruction, in which case it resolves to whatever follows
/// the insertion point.
#[derive(Debug, Clone, Default)]
pub struct InstructionSequence {
    pub(crate) instructions: Vec<Instruction>,
    pub(crate) labels: HashMap<String, usize>,
}

impl InstructionSequence {
    /// Number of instructions in the sequence.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Returns `true` if the sequence contains no instructions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// The instructions, in emission order.
    #[must_use]
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// The index a label points at, if defined.
    #[must_use]
    pub fn label_target(&self, name: &str) -> Option<usize> {
        self.labels.get(name).copied()
    }
}

impl From<Vec<Instruction>> for InstructionSequence {
    fn from(instructions: Vec<Instruction>) -> Self {
        InstructionSequence {
            instructions,
            labels: HashMap::new(),
        }
    }
}

/// Builds instruction sequences through chained opcode methods.
///
/// All emitting methods return `Result<&mut Self>` so sequences read as one
/// `?`-chained expression. Validation at emission time covers label
/// uniqueness, literal encodability and invocation arity; register bounds are
/// checked later against the body the sequence is inserted into.
#[derive(Debug, Default)]
pub struct InstructionAssembler {
    instructions: Vec<Instruction>,
    labels: HashMap<String, usize>,
}

impl InstructionAssembler {
    /// Create an empty assembler.
    #[must_use]
    pub fn new() -> Self {
        InstructionAssembler {
            instructions: Vec::new(),
            labels: HashMap::new(),
        }
    }

    /// Define a label at the current position.
    ///
    /// The label resolves to the next emitted instruction.
    ///
    /// # Errors
    ///
    /// [`Error::DuplicateLabel`] if the name is already defined,
    /// [`Error::Malformed`] for an empty name.
    pub fn label(&mut self, name: &str) -> Result<&mut Self> {
        if name.is_empty() {
            return Err(malformed_error!("empty label name"));
        }
        if self
            .labels
            .insert(name.to_string(), self.instructions.len())
            .is_some()
        {
            return Err(Error::DuplicateLabel(name.to_string()));
        }
        Ok(self)
    }

    fn emit(&mut self, opcode: Opcode, operands: Vec<Operand>) -> Result<&mut Self> {
        self.instructions.push(Instruction::new(opcode, operands));
        Ok(self)
    }

    fn branch(&mut self, opcode: Opcode, regs: &[Register], label: &str) -> Result<&mut Self> {
        let mut operands: Vec<Operand> = regs.iter().map(|r| Operand::Register(*r)).collect();
        operands.push(Operand::Label(label.to_string()));
        self.emit(opcode, operands)
    }

    fn invoke(
        &mut self,
        opcode: Opcode,
        args: &[Register],
        method: MethodRef,
    ) -> Result<&mut Self> {
        if args.len() > 5 {
            return Err(malformed_error!(
                "{} with {} arguments exceeds the five registers of format 35c",
                opcode,
                args.len()
            ));
        }
        let mut operands: Vec<Operand> = args.iter().map(|r| Operand::Register(*r)).collect();
        operands.push(Operand::Method(method));
        self.emit(opcode, operands)
    }

    /// Emit `nop`.
    pub fn nop(&mut self) -> Result<&mut Self> {
        self.emit(Opcode::Nop, vec![])
    }

    /// Emit `move dst, src`.
    pub fn move_reg(&mut self, dst: Register, src: Register) -> Result<&mut Self> {
        self.emit(
            Opcode::Move,
            vec![Operand::Register(dst), Operand::Register(src)],
        )
    }

    /// Emit `move-object dst, src`.
    pub fn move_object(&mut self, dst: Register, src: Register) -> Result<&mut Self> {
        self.emit(
            Opcode::MoveObject,
            vec![Operand::Register(dst), Operand::Register(src)],
        )
    }

    /// Emit `move-result dst`.
    pub fn move_result(&mut self, dst: Register) -> Result<&mut Self> {
        self.emit(Opcode::MoveResult, vec![Operand::Register(dst)])
    }

    /// Emit `move-result-object dst`.
    pub fn move_result_object(&mut self, dst: Register) -> Result<&mut Self> {
        self.emit(Opcode::MoveResultObject, vec![Operand::Register(dst)])
    }

    /// Emit `return-void`.
    pub fn return_void(&mut self) -> Result<&mut Self> {
        self.emit(Opcode::ReturnVoid, vec![])
    }

    /// Emit `return src`.
    pub fn return_value(&mut self, src: Register) -> Result<&mut Self> {
        self.emit(Opcode::Return, vec![Operand::Register(src)])
    }

    /// Emit `return-object src`.
    pub fn return_object(&mut self, src: Register) -> Result<&mut Self> {
        self.emit(Opcode::ReturnObject, vec![Operand::Register(src)])
    }

    /// Emit `const/4 dst, value`.
    ///
    /// # Errors
    ///
    /// [`Error::Malformed`] if the literal does not fit the signed 4-bit
    /// encoding (-8..=7).
    pub fn const4(&mut self, dst: Register, value: i64) -> Result<&mut Self> {
        if !(-8..=7).contains(&value) {
            return Err(malformed_error!("const/4 literal {} out of range", value));
        }
        self.emit(
            Opcode::Const4,
            vec![Operand::Register(dst), Operand::Literal(value)],
        )
    }

    /// Emit `const/16 dst, value`.
    ///
    /// # Errors
    ///
    /// [`Error::Malformed`] if the literal does not fit a signed 16-bit
    /// encoding.
    pub fn const16(&mut self, dst: Register, value: i64) -> Result<&mut Self> {
        if value < i64::from(i16::MIN) || value > i64::from(i16::MAX) {
            return Err(malformed_error!("const/16 literal {} out of range", value));
        }
        self.emit(
            Opcode::Const16,
            vec![Operand::Register(dst), Operand::Literal(value)],
        )
    }

    /// Emit `const-string dst, "value"`.
    pub fn const_string(&mut self, dst: Register, value: &str) -> Result<&mut Self> {
        self.emit(
            Opcode::ConstString,
            vec![Operand::Register(dst), Operand::String(value.to_string())],
        )
    }

    /// Emit `const-class dst, type`.
    pub fn const_class(&mut self, dst: Register, ty: TypeName) -> Result<&mut Self> {
        self.emit(
            Opcode::ConstClass,
            vec![Operand::Register(dst), Operand::Type(ty)],
        )
    }

    /// Emit `goto :label`.
    ///
    /// The editor promotes to `goto/16` or `goto/32` if the resolved distance
    /// requires it.
    pub fn goto(&mut self, label: &str) -> Result<&mut Self> {
        self.branch(Opcode::Goto, &[], label)
    }

    /// Emit `if-eq a, b, :label`.
    pub fn if_eq(&mut self, a: Register, b: Register, label: &str) -> Result<&mut Self> {
        self.branch(Opcode::IfEq, &[a, b], label)
    }

    /// Emit `if-ne a, b, :label`.
    pub fn if_ne(&mut self, a: Register, b: Register, label: &str) -> Result<&mut Self> {
        self.branch(Opcode::IfNe, &[a, b], label)
    }

    /// Emit `if-lt a, b, :label`.
    pub fn if_lt(&mut self, a: Register, b: Register, label: &str) -> Result<&mut Self> {
        self.branch(Opcode::IfLt, &[a, b], label)
    }

    /// Emit `if-ge a, b, :label`.
    pub fn if_ge(&mut self, a: Register, b: Register, label: &str) -> Result<&mut Self> {
        self.branch(Opcode::IfGe, &[a, b], label)
    }

    /// Emit `if-gt a, b, :label`.
    pub fn if_gt(&mut self, a: Register, b: Register, label: &str) -> Result<&mut Self> {
        self.branch(Opcode::IfGt, &[a, b], label)
    }

    /// Emit `if-le a, b, :label`.
    pub fn if_le(&mut self, a: Register, b: Register, label: &str) -> Result<&mut Self> {
        self.branch(Opcode::IfLe, &[a, b], label)
    }

    /// Emit `if-eqz reg, :label`.
    pub fn if_eqz(&mut self, reg: Register, label: &str) -> Result<&mut Self> {
        self.branch(Opcode::IfEqz, &[reg], label)
    }

    /// Emit `if-nez reg, :label`.
    pub fn if_nez(&mut self, reg: Register, label: &str) -> Result<&mut Self> {
        self.branch(Opcode::IfNez, &[reg], label)
    }

    /// Emit `if-ltz reg, :label`.
    pub fn if_ltz(&mut self, reg: Register, label: &str) -> Result<&mut Self> {
        self.branch(Opcode::IfLtz, &[reg], label)
    }

    /// Emit `if-gez reg, :label`.
    pub fn if_gez(&mut self, reg: Register, label: &str) -> Result<&mut Self> {
        self.branch(Opcode::IfGez, &[reg], label)
    }

    /// Emit `if-gtz reg, :label`.
    pub fn if_gtz(&mut self, reg: Register, label: &str) -> Result<&mut Self> {
        self.branch(Opcode::IfGtz, &[reg], label)
    }

    /// Emit `if-lez reg, :label`.
    pub fn if_lez(&mut self, reg: Register, label: &str) -> Result<&mut Self> {
        self.branch(Opcode::IfLez, &[reg], label)
    }

    /// Emit `iget dst, obj, field`.
    pub fn iget(&mut self, dst: Register, obj: Register, field: FieldRef) -> Result<&mut Self> {
        self.emit(
            Opcode::Iget,
            vec![
                Operand::Register(dst),
                Operand::Register(obj),
                Operand::Field(field),
            ],
        )
    }

    /// Emit `iget-object dst, obj, field`.
    pub fn iget_object(
        &mut self,
        dst: Register,
        obj: Register,
        field: FieldRef,
    ) -> Result<&mut Self> {
        self.emit(
            Opcode::IgetObject,
            vec![
                Operand::Register(dst),
                Operand::Register(obj),
                Operand::Field(field),
            ],
        )
    }

    /// Emit `iput src, obj, field`.
    pub fn iput(&mut self, src: Register, obj: Register, field: FieldRef) -> Result<&mut Self> {
        self.emit(
            Opcode::Iput,
            vec![
                Operand::Register(src),
                Operand::Register(obj),
                Operand::Field(field),
            ],
        )
    }

    /// Emit `iput-object src, obj, field`.
    pub fn iput_object(
        &mut self,
        src: Register,
        obj: Register,
        field: FieldRef,
    ) -> Result<&mut Self> {
        self.emit(
            Opcode::IputObject,
            vec![
                Operand::Register(src),
                Operand::Register(obj),
                Operand::Field(field),
            ],
        )
    }

    /// Emit `sget dst, field`.
    pub fn sget(&mut self, dst: Register, field: FieldRef) -> Result<&mut Self> {
        self.emit(
            Opcode::Sget,
            vec![Operand::Register(dst), Operand::Field(field)],
        )
    }

    /// Emit `sget-object dst, field`.
    pub fn sget_object(&mut self, dst: Register, field: FieldRef) -> Result<&mut Self> {
        self.emit(
            Opcode::SgetObject,
            vec![Operand::Register(dst), Operand::Field(field)],
        )
    }

    /// Emit `sput src, field`.
    pub fn sput(&mut self, src: Register, field: FieldRef) -> Result<&mut Self> {
        self.emit(
            Opcode::Sput,
            vec![Operand::Register(src), Operand::Field(field)],
        )
    }

    /// Emit `sput-object src, field`.
    pub fn sput_object(&mut self, src: Register, field: FieldRef) -> Result<&mut Self> {
        self.emit(
            Opcode::SputObject,
            vec![Operand::Register(src), Operand::Field(field)],
        )
    }

    /// Emit `invoke-virtual {args}, method`.
    pub fn invoke_virtual(&mut self, args: &[Register], method: MethodRef) -> Result<&mut Self> {
        self.invoke(Opcode::InvokeVirtual, args, method)
    }

    /// Emit `invoke-super {args}, method`.
    pub fn invoke_super(&mut self, args: &[Register], method: MethodRef) -> Result<&mut Self> {
        self.invoke(Opcode::InvokeSuper, args, method)
    }

    /// Emit `invoke-direct {args}, method`.
    pub fn invoke_direct(&mut self, args: &[Register], method: MethodRef) -> Result<&mut Self> {
        self.invoke(Opcode::InvokeDirect, args, method)
    }

    /// Emit `invoke-static {args}, method`.
    pub fn invoke_static(&mut self, args: &[Register], method: MethodRef) -> Result<&mut Self> {
        self.invoke(Opcode::InvokeStatic, args, method)
    }

    /// Emit `invoke-interface {args}, method`.
    pub fn invoke_interface(&mut self, args: &[Register], method: MethodRef) -> Result<&mut Self> {
        self.invoke(Opcode::InvokeInterface, args, method)
    }

    /// Consume the assembler and return the finished sequence.
    #[must_use]
    pub fn finish(self) -> InstructionSequence {
        InstructionSequence {
            instructions: self.instructions,
            labels: self.labels,
        }
    }
}
