//! Opcode table for the supported Dalvik instruction subset.
//!
//! Each [`Opcode`] carries its DEX opcode byte as the enum discriminant and
//! maps to an encoding [`Format`], which determines the instruction's width in
//! 16-bit code units. Widths drive all branch distance arithmetic: a branch
//! operand counts code units from the start of the branch instruction itself.
//!
//! The table covers the instructions structural patching works with: moves,
//! constants, returns, branches, field accessors and invocations. It is a
//! deliberate subset of the full opcode map, keeping the DEX byte values of
//! the real encoding so rendered instructions line up with disassembler
//! output.

use std::fmt;

use strum::{EnumCount, EnumIter, IntoStaticStr};

/// Instruction encoding formats, named after the DEX format identifiers.
///
/// The leading digit is the width in 16-bit code units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// No registers, no operands (`nop`, `return-void`)
    F10x,
    /// Two 4-bit registers (`move`)
    F12x,
    /// One 8-bit register (`move-result`, `return`)
    F11x,
    /// One 4-bit register, 4-bit literal (`const/4`)
    F11n,
    /// One 8-bit register, 16-bit literal (`const/16`)
    F21s,
    /// One 8-bit register, pool reference (`const-string`, `sget`)
    F21c,
    /// One 8-bit register, 16-bit branch target (`if-eqz`)
    F21t,
    /// Two 4-bit registers, pool reference (`iget`, `iput`)
    F22c,
    /// Two 4-bit registers, 16-bit branch target (`if-eq`)
    F22t,
    /// 8-bit branch target (`goto`)
    F10t,
    /// 16-bit branch target (`goto/16`)
    F20t,
    /// 32-bit branch target (`goto/32`)
    F30t,
    /// Up to five registers, pool reference (`invoke-*`)
    F35c,
}

impl Format {
    /// Width of this format in 16-bit code units.
    #[must_use]
    pub const fn units(self) -> usize {
        match self {
            Format::F10x | Format::F12x | Format::F11x | Format::F11n | Format::F10t => 1,
            Format::F21s
            | Format::F21c
            | Format::F21t
            | Format::F22c
            | Format::F22t
            | Format::F20t => 2,
            Format::F30t | Format::F35c => 3,
        }
    }
}

/// Classification of branch instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BranchKind {
    /// `goto` family; promotable to wider encodings
    Unconditional,
    /// `if-*` family; single fixed encoding
    Conditional,
}

/// Invocation kinds, mirroring the five `invoke-*` opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum InvocationKind {
    /// `invoke-virtual`
    Virtual,
    /// `invoke-super`
    Super,
    /// `invoke-direct`
    Direct,
    /// `invoke-static`
    Static,
    /// `invoke-interface`
    Interface,
}

/// The supported Dalvik opcodes. Discriminants are the DEX opcode bytes.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumCount, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum Opcode {
    /// No operation; also the conventional landing pad for inserted labels
    Nop = 0x00,
    /// Register to register move
    Move = 0x01,
    /// Object register move
    MoveObject = 0x07,
    /// Capture the result of the preceding invocation
    MoveResult = 0x0a,
    /// Capture the object result of the preceding invocation
    MoveResultObject = 0x0c,
    /// Return from a void method
    ReturnVoid = 0x0e,
    /// Return a value
    Return = 0x0f,
    /// Return an object
    ReturnObject = 0x11,
    /// Load a 4-bit literal
    #[strum(serialize = "const/4")]
    Const4 = 0x12,
    /// Load a 16-bit literal
    #[strum(serialize = "const/16")]
    Const16 = 0x13,
    /// Load a string constant
    ConstString = 0x1a,
    /// Load a class reference
    ConstClass = 0x1c,
    /// Unconditional branch, 8-bit target
    Goto = 0x28,
    /// Unconditional branch, 16-bit target
    #[strum(serialize = "goto/16")]
    Goto16 = 0x29,
    /// Unconditional branch, 32-bit target
    #[strum(serialize = "goto/32")]
    Goto32 = 0x2a,
    /// Branch if two registers are equal
    IfEq = 0x32,
    /// Branch if two registers differ
    IfNe = 0x33,
    /// Branch if less than
    IfLt = 0x34,
    /// Branch if greater or equal
    IfGe = 0x35,
    /// Branch if greater than
    IfGt = 0x36,
    /// Branch if less or equal
    IfLe = 0x37,
    /// Branch if a register is zero or null
    IfEqz = 0x38,
    /// Branch if a register is non-zero
    IfNez = 0x39,
    /// Branch if a register is negative
    IfLtz = 0x3a,
    /// Branch if a register is zero or positive
    IfGez = 0x3b,
    /// Branch if a register is positive
    IfGtz = 0x3c,
    /// Branch if a register is zero or negative
    IfLez = 0x3d,
    /// Read an instance field
    Iget = 0x52,
    /// Read an instance object field
    IgetObject = 0x54,
    /// Write an instance field
    Iput = 0x59,
    /// Write an instance object field
    IputObject = 0x5b,
    /// Read a static field
    Sget = 0x60,
    /// Read a static object field
    SgetObject = 0x62,
    /// Write a static field
    Sput = 0x67,
    /// Write a static object field
    SputObject = 0x6b,
    /// Virtual method invocation
    InvokeVirtual = 0x6e,
    /// Superclass method invocation
    InvokeSuper = 0x6f,
    /// Direct (private or constructor) invocation
    InvokeDirect = 0x70,
    /// Static method invocation
    InvokeStatic = 0x71,
    /// Interface method invocation
    InvokeInterface = 0x72,
}

impl Opcode {
    /// The DEX opcode byte of this instruction.
    #[must_use]
    pub const fn value(self) -> u8 {
        self as u8
    }

    /// The mnemonic of this opcode (`"invoke-static"`, `"goto/16"`, ...).
    #[must_use]
    pub fn mnemonic(self) -> &'static str {
        self.into()
    }

    /// The encoding format of this opcode.
    #[must_use]
    pub const fn format(self) -> Format {
        match self {
            Opcode::Nop | Opcode::ReturnVoid => Format::F10x,
            Opcode::Move | Opcode::MoveObject => Format::F12x,
            Opcode::MoveResult
            | Opcode::MoveResultObject
            | Opcode::Return
            | Opcode::ReturnObject => Format::F11x,
            Opcode::Const4 => Format::F11n,
            Opcode::Const16 => Format::F21s,
            Opcode::ConstString
            | Opcode::ConstClass
            | Opcode::Sget
            | Opcode::SgetObject
            | Opcode::Sput
            | Opcode::SputObject => Format::F21c,
            Opcode::Goto => Format::F10t,
            Opcode::Goto16 => Format::F20t,
            Opcode::Goto32 => Format::F30t,
            Opcode::IfEq
            | Opcode::IfNe
            | Opcode::IfLt
            | Opcode::IfGe
            | Opcode::IfGt
            | Opcode::IfLe => Format::F22t,
            Opcode::IfEqz
            | Opcode::IfNez
            | Opcode::IfLtz
            | Opcode::IfGez
            | Opcode::IfGtz
            | Opcode::IfLez => Format::F21t,
            Opcode::Iget | Opcode::IgetObject | Opcode::Iput | Opcode::IputObject => Format::F22c,
            Opcode::InvokeVirtual
            | Opcode::InvokeSuper
            | Opcode::InvokeDirect
            | Opcode::InvokeStatic
            | Opcode::InvokeInterface => Format::F35c,
        }
    }

    /// Width of this instruction in 16-bit code units.
    #[must_use]
    pub const fn units(self) -> usize {
        self.format().units()
    }

    /// Branch classification, or `None` for non-branch opcodes.
    #[must_use]
    pub const fn branch_kind(self) -> Option<BranchKind> {
        match self {
            Opcode::Goto | Opcode::Goto16 | Opcode::Goto32 => Some(BranchKind::Unconditional),
            Opcode::IfEq
            | Opcode::IfNe
            | Opcode::IfLt
            | Opcode::IfGe
            | Opcode::IfGt
            | Opcode::IfLe
            | Opcode::IfEqz
            | Opcode::IfNez
            | Opcode::IfLtz
            | Opcode::IfGez
            | Opcode::IfGtz
            | Opcode::IfLez => Some(BranchKind::Conditional),
            _ => None,
        }
    }

    /// Inclusive signed range of branch distances this opcode can encode,
    /// in code units. `None` for non-branch opcodes.
    #[must_use]
    pub const fn branch_range(self) -> Option<(i64, i64)> {
        match self {
            Opcode::Goto => Some((i8::MIN as i64, i8::MAX as i64)),
            Opcode::Goto16 => Some((i16::MIN as i64, i16::MAX as i64)),
            Opcode::Goto32 => Some((i32::MIN as i64, i32::MAX as i64)),
            _ => match self.branch_kind() {
                Some(BranchKind::Conditional) => Some((i16::MIN as i64, i16::MAX as i64)),
                _ => None,
            },
        }
    }

    /// The narrowest `goto` encoding that can reach `distance` code units.
    #[must_use]
    pub const fn goto_for(distance: i64) -> Opcode {
        if distance >= i8::MIN as i64 && distance <= i8::MAX as i64 {
            Opcode::Goto
        } else if distance >= i16::MIN as i64 && distance <= i16::MAX as i64 {
            Opcode::Goto16
        } else {
            Opcode::Goto32
        }
    }

    /// Invocation kind, or `None` for non-invocation opcodes.
    #[must_use]
    pub const fn invocation(self) -> Option<InvocationKind> {
        match self {
            Opcode::InvokeVirtual => Some(InvocationKind::Virtual),
            Opcode::InvokeSuper => Some(InvocationKind::Super),
            Opcode::InvokeDirect => Some(InvocationKind::Direct),
            Opcode::InvokeStatic => Some(InvocationKind::Static),
            Opcode::InvokeInterface => Some(InvocationKind::Interface),
            _ => None,
        }
    }

    /// Returns `true` for field reading opcodes (`iget*`, `sget*`).
    #[must_use]
    pub const fn is_field_read(self) -> bool {
        matches!(
            self,
            Opcode::Iget | Opcode::IgetObject | Opcode::Sget | Opcode::SgetObject
        )
    }

    /// Returns `true` for field writing opcodes (`iput*`, `sput*`).
    #[must_use]
    pub const fn is_field_write(self) -> bool {
        matches!(
            self,
            Opcode::Iput | Opcode::IputObject | Opcode::Sput | Opcode::SputObject
        )
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}
