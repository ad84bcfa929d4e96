//! Instruction and operand model.
//!
//! An [`Instruction`] is an opcode plus a list of typed operands. Operands
//! carry resolved symbols ([`crate::metadata::refs::FieldRef`],
//! [`crate::metadata::refs::MethodRef`], string and type constants) rather
//! than pool indices, and branch targets are either a symbolic [`Operand::Label`]
//! awaiting resolution or a resolved [`Operand::Offset`] distance in code
//! units.
//!
//! Registers are kept symbolic as well: [`Register::Parameter`] names an
//! incoming parameter slot without committing to its absolute position in the
//! register file. Parameters live at the top of the file, so their absolute
//! position depends on the body's declared register count; resolving them late
//! is what allows the editor to grow the register file without rewriting
//! existing instructions.

use std::fmt;

use crate::assembly::opcode::Opcode;
use crate::metadata::refs::{FieldRef, MethodRef};
use crate::metadata::ty::TypeName;

/// A register operand, either a local slot or an incoming parameter slot.
///
/// Locals are numbered from the bottom of the register file (`v0`, `v1`, ...);
/// parameters from the start of the incoming window (`p0`, `p1`, ...). For a
/// body with `registers` total slots and `ins` incoming slots,
/// `p(i)` occupies `v(registers - ins + i)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    /// A local register, absolute position `n`
    Local(u16),
    /// An incoming parameter register, position `n` within the parameter window
    Parameter(u16),
}

impl Register {
    /// Local register `v{n}`.
    #[must_use]
    pub const fn local(n: u16) -> Self {
        Register::Local(n)
    }

    /// Parameter register `p{n}`.
    #[must_use]
    pub const fn parameter(n: u16) -> Self {
        Register::Parameter(n)
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Register::Local(n) => write!(f, "v{}", n),
            Register::Parameter(n) => write!(f, "p{}", n),
        }
    }
}

/// A single instruction operand.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operand {
    /// A register
    Register(Register),
    /// An integer literal
    Literal(i64),
    /// A string constant
    String(String),
    /// A type reference
    Type(TypeName),
    /// A field reference
    Field(FieldRef),
    /// A method reference
    Method(MethodRef),
    /// An unresolved symbolic branch target
    Label(String),
    /// A resolved branch distance in 16-bit code units, relative to the start
    /// of the branch instruction
    Offset(i32),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Register(r) => write!(f, "{}", r),
            Operand::Literal(v) => write!(f, "{}", v),
            Operand::String(s) => write!(f, "\"{}\"", s),
            Operand::Type(t) => write!(f, "{}", t),
            Operand::Field(fr) => write!(f, "{}", fr),
            Operand::Method(mr) => write!(f, "{}", mr),
            Operand::Label(l) => write!(f, ":{}", l),
            Operand::Offset(d) => write!(f, "{:+}", d),
        }
    }
}

/// One instruction: an opcode tag plus its operand list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Instruction {
    /// The opcode tag
    pub opcode: Opcode,
    /// Operands, in the order the mnemonic renders them
    pub operands: Vec<Operand>,
}

impl Instruction {
    /// Create an instruction from an opcode and operand list.
    #[must_use]
    pub fn new(opcode: Opcode, operands: Vec<Operand>) -> Self {
        Instruction { opcode, operands }
    }

    /// Width of this instruction in 16-bit code units.
    #[must_use]
    pub fn units(&self) -> usize {
        self.opcode.units()
    }

    /// Iterates over all register operands.
    pub fn registers(&self) -> impl Iterator<Item = Register> + '_ {
        self.operands.iter().filter_map(|op| match op {
            Operand::Register(r) => Some(*r),
            _ => None,
        })
    }

    /// The branch target operand, if this is a branch instruction.
    #[must_use]
    pub fn branch_operand(&self) -> Option<&Operand> {
        if self.opcode.branch_kind().is_none() {
            return None;
        }
        self.operands
            .iter()
            .find(|op| matches!(op, Operand::Label(_) | Operand::Offset(_)))
    }

    /// The resolved branch distance, if this is a resolved branch.
    #[must_use]
    pub fn branch_offset(&self) -> Option<i32> {
        match self.branch_operand() {
            Some(Operand::Offset(d)) => Some(*d),
            _ => None,
        }
    }

    /// The symbolic branch label, if this branch is still unresolved.
    #[must_use]
    pub fn branch_label(&self) -> Option<&str> {
        match self.branch_operand() {
            Some(Operand::Label(l)) => Some(l),
            _ => None,
        }
    }

    /// The referenced field, for field access instructions.
    #[must_use]
    pub fn field_ref(&self) -> Option<&FieldRef> {
        self.operands.iter().find_map(|op| match op {
            Operand::Field(fr) => Some(fr),
            _ => None,
        })
    }

    /// The referenced method, for invocation instructions.
    #[must_use]
    pub fn method_ref(&self) -> Option<&MethodRef> {
        self.operands.iter().find_map(|op| match op {
            Operand::Method(mr) => Some(mr),
            _ => None,
        })
    }

    /// The string constant, for `const-string`.
    #[must_use]
    pub fn string_value(&self) -> Option<&str> {
        self.operands.iter().find_map(|op| match op {
            Operand::String(s) => Some(s.as_str()),
            _ => None,
        })
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.opcode)?;
        if self.operands.is_empty() {
            return Ok(());
        }

        if self.opcode.invocation().is_some() {
            // invoke-* renders its argument registers in braces
            let regs: Vec<String> = self.registers().map(|r| r.to_string()).collect();
            write!(f, " {{{}}}", regs.join(", "))?;
            for op in &self.operands {
                if !matches!(op, Operand::Register(_)) {
                    write!(f, ", {}", op)?;
                }
            }
            return Ok(());
        }

        let rendered: Vec<String> = self.operands.iter().map(|op| op.to_string()).collect();
        write!(f, " {}", rendered.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guard_call() -> Instruction {
        Instruction::new(
            Opcode::InvokeStatic,
            vec![Operand::Method(MethodRef::new(
                "Lapp/Hook;",
                "disableLongPress",
                &[],
                "Z",
            ))],
        )
    }

    #[test]
    fn test_register_display() {
        assert_eq!(format!("{}", Register::local(3)), "v3");
        assert_eq!(format!("{}", Register::parameter(0)), "p0");
    }

    #[test]
    fn test_instruction_units() {
        assert_eq!(Instruction::new(Opcode::Nop, vec![]).units(), 1);
        assert_eq!(guard_call().units(), 3);
    }

    #[test]
    fn test_branch_accessors() {
        let branch = Instruction::new(
            Opcode::IfEqz,
            vec![
                Operand::Register(Register::local(0)),
                Operand::Label("skip".into()),
            ],
        );
        assert_eq!(branch.branch_label(), Some("skip"));
        assert_eq!(branch.branch_offset(), None);

        let resolved = Instruction::new(
            Opcode::IfEqz,
            vec![
                Operand::Register(Register::local(0)),
                Operand::Offset(7),
            ],
        );
        assert_eq!(resolved.branch_offset(), Some(7));
        assert_eq!(resolved.branch_label(), None);

        let not_branch = Instruction::new(Opcode::Nop, vec![]);
        assert!(not_branch.branch_operand().is_none());
    }

    #[test]
    fn test_reference_accessors() {
        let read = Instruction::new(
            Opcode::IgetObject,
            vec![
                Operand::Register(Register::local(0)),
                Operand::Register(Register::parameter(0)),
                Operand::Field(FieldRef::new("Lapp/A;", "listener", "Lapp/L;")),
            ],
        );
        assert_eq!(read.field_ref().map(|f| f.name.as_str()), Some("listener"));
        assert!(read.method_ref().is_none());

        assert_eq!(
            guard_call().method_ref().map(|m| m.name.as_str()),
            Some("disableLongPress")
        );
    }

    #[test]
    fn test_string_accessor() {
        let load = Instruction::new(
            Opcode::ConstString,
            vec![
                Operand::Register(Register::local(0)),
                Operand::String("onScale".into()),
            ],
        );
        assert_eq!(load.string_value(), Some("onScale"));
    }

    #[test]
    fn test_display_plain() {
        let mv = Instruction::new(
            Opcode::Move,
            vec![
                Operand::Register(Register::local(0)),
                Operand::Register(Register::local(1)),
            ],
        );
        assert_eq!(format!("{}", mv), "move v0, v1");
        assert_eq!(format!("{}", Instruction::new(Opcode::Nop, vec![])), "nop");
    }

    #[test]
    fn test_display_branch() {
        let branch = Instruction::new(
            Opcode::IfEqz,
            vec![
                Operand::Register(Register::local(0)),
                Operand::Label("skip".into()),
            ],
        );
        assert_eq!(format!("{}", branch), "if-eqz v0, :skip");

        let goto = Instruction::new(Opcode::Goto, vec![Operand::Offset(-3)]);
        assert_eq!(format!("{}", goto), "goto -3");
    }

    #[test]
    fn test_display_invoke() {
        let call = Instruction::new(
            Opcode::InvokeStatic,
            vec![
                Operand::Register(Register::local(1)),
                Operand::Register(Register::parameter(0)),
                Operand::Method(MethodRef::new("Lapp/Hook;", "onTouch", &["I"], "V")),
            ],
        );
        assert_eq!(
            format!("{}", call),
            "invoke-static {v1, p0}, Lapp/Hook;->onTouch(I)V"
        );
    }

    #[test]
    fn test_registers_iterator() {
        let read = Instruction::new(
            Opcode::IgetObject,
            vec![
                Operand::Register(Register::local(2)),
                Operand::Register(Register::parameter(1)),
                Operand::Field(FieldRef::new("Lapp/A;", "f", "I")),
            ],
        );
        let regs: Vec<Register> = read.registers().collect();
        assert_eq!(regs, vec![Register::local(2), Register::parameter(1)]);
    }
}
