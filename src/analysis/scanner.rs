//! Positional symbol extraction from matched method bodies.
//!
//! After a fingerprint has located a method, the names of the members that
//! method touches still have to be recovered: an obfuscator renames fields
//! and methods freely between builds, so the only stable way to refer to
//! them is by structural position ("the field read by the first `iget-object`",
//! "the method invoked at the second static call site"). [`BodyScanner`]
//! answers exactly those queries.
//!
//! Positions are zero-based over the filtered instruction subsequence. The
//! common "excluding the first" convention from hand-written extraction rules
//! is expressed by asking for position `k` with `k >= 1`.
//!
//! # Examples
//!
//! ```rust
//! use dexscope::analysis::scanner::BodyScanner;
//! use dexscope::assembly::{InstructionAssembler, InvocationKind, Register};
//! use dexscope::metadata::body::InstructionBody;
//! use dexscope::metadata::refs::{FieldRef, MethodRef};
//!
//! let mut asm = InstructionAssembler::new();
//! asm.iget_object(
//!     Register::local(0),
//!     Register::parameter(0),
//!     FieldRef::new("Lapp/Player;", "controller", "Lapp/Controller;"),
//! )?
//! .invoke_static(&[Register::local(0)], MethodRef::new("Lapp/Util;", "log", &["Lapp/Controller;"], "V"))?
//! .return_void()?;
//!
//! let body = InstructionBody::with_instructions(2, 1, asm.finish().instructions().to_vec());
//! let scanner = BodyScanner::new(&body, "Lapp/Player;->setup");
//!
//! assert_eq!(scanner.nth_field_read(0)?.name, "controller");
//! assert_eq!(scanner.nth_invocation_of(InvocationKind::Static, 0)?.name, "log");
//! # Ok::<(), dexscope::Error>(())
//! ```

use crate::assembly::instruction::Instruction;
use crate::assembly::opcode::InvocationKind;
use crate::metadata::body::InstructionBody;
use crate::metadata::refs::{FieldRef, MethodRef};
use crate::{Error, Result};

/// Read-only positional queries over one method body.
///
/// The scanner never mutates the body and holds no state beyond the borrow,
/// so repeated queries over an unmodified body always return the same
/// symbols. The `context` string (conventionally `Lclass;->method`) is only
/// used to make extraction errors actionable.
#[derive(Debug, Clone, Copy)]
pub struct BodyScanner<'a> {
    body: &'a InstructionBody,
    context: &'a str,
}

impl<'a> BodyScanner<'a> {
    /// Creates a scanner over `body`, with `context` naming the method for
    /// error reporting.
    #[must_use]
    pub fn new(body: &'a InstructionBody, context: &'a str) -> Self {
        BodyScanner { body, context }
    }

    /// The scanned instructions, in body order.
    #[must_use]
    pub fn instructions(&self) -> &'a [Instruction] {
        &self.body.instructions
    }

    /// The field referenced by the `position`-th field-read instruction
    /// (`iget` family), zero-based.
    ///
    /// # Errors
    ///
    /// [`Error::ExtractionPositionMissing`] if the body contains fewer than
    /// `position + 1` field reads.
    pub fn nth_field_read(&self, position: usize) -> Result<&'a FieldRef> {
        self.body
            .instructions
            .iter()
            .filter(|i| i.opcode.is_field_read())
            .nth(position)
            .and_then(Instruction::field_ref)
            .ok_or_else(|| Error::ExtractionPositionMissing {
                what: "field read",
                position,
                method: self.context.to_string(),
            })
    }

    /// The field referenced by the `position`-th field-write instruction
    /// (`iput`/`sput` family), zero-based.
    ///
    /// # Errors
    ///
    /// [`Error::ExtractionPositionMissing`] if the body contains fewer than
    /// `position + 1` field writes.
    pub fn nth_field_write(&self, position: usize) -> Result<&'a FieldRef> {
        self.body
            .instructions
            .iter()
            .filter(|i| i.opcode.is_field_write())
            .nth(position)
            .and_then(Instruction::field_ref)
            .ok_or_else(|| Error::ExtractionPositionMissing {
                what: "field write",
                position,
                method: self.context.to_string(),
            })
    }

    /// The method referenced by the `position`-th invocation of `kind`,
    /// zero-based.
    ///
    /// The returned reference carries the invoked method's name and return
    /// type; interface-call extraction reads both.
    ///
    /// # Errors
    ///
    /// [`Error::ExtractionPositionMissing`] if the body contains fewer than
    /// `position + 1` invocations of that kind.
    pub fn nth_invocation_of(
        &self,
        kind: InvocationKind,
        position: usize,
    ) -> Result<&'a MethodRef> {
        self.body
            .instructions
            .iter()
            .filter(|i| i.opcode.invocation() == Some(kind))
            .nth(position)
            .and_then(Instruction::method_ref)
            .ok_or_else(|| Error::ExtractionPositionMissing {
                what: invocation_label(kind),
                position,
                method: self.context.to_string(),
            })
    }

    /// Number of field-read instructions in the body.
    #[must_use]
    pub fn field_read_count(&self) -> usize {
        self.body
            .instructions
            .iter()
            .filter(|i| i.opcode.is_field_read())
            .count()
    }

    /// Number of invocations of `kind` in the body.
    #[must_use]
    pub fn invocation_count(&self, kind: InvocationKind) -> usize {
        self.body
            .instructions
            .iter()
            .filter(|i| i.opcode.invocation() == Some(kind))
            .count()
    }
}

fn invocation_label(kind: InvocationKind) -> &'static str {
    match kind {
        InvocationKind::Virtual => "virtual invocation",
        InvocationKind::Super => "super invocation",
        InvocationKind::Direct => "direct invocation",
        InvocationKind::Static => "static invocation",
        InvocationKind::Interface => "interface invocation",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::assembler::InstructionAssembler;
    use crate::assembly::instruction::Register;

    fn sample_body() -> InstructionBody {
        let mut asm = InstructionAssembler::new();
        asm.iget_object(
            Register::local(0),
            Register::parameter(0),
            FieldRef::new("Lapp/Player;", "detector", "Lapp/Detector;"),
        )
        .unwrap()
        .invoke_static(
            &[Register::local(0)],
            MethodRef::new("Lapp/Hooks;", "first", &["Lapp/Detector;"], "V"),
        )
        .unwrap()
        .iget_object(
            Register::local(1),
            Register::parameter(0),
            FieldRef::new("Lapp/Player;", "listener", "Lapp/Listener;"),
        )
        .unwrap()
        .invoke_static(
            &[Register::local(1)],
            MethodRef::new("Lapp/Hooks;", "second", &["Lapp/Listener;"], "V"),
        )
        .unwrap()
        .invoke_interface(
            &[Register::local(1)],
            MethodRef::new("Lapp/Listener;", "onEvent", &[], "Z"),
        )
        .unwrap()
        .return_void()
        .unwrap();
        InstructionBody::with_instructions(2, 1, asm.finish().instructions().to_vec())
    }

    #[test]
    fn test_nth_field_read() {
        let body = sample_body();
        let scanner = BodyScanner::new(&body, "Lapp/Player;->setup");

        assert_eq!(scanner.nth_field_read(0).unwrap().name, "detector");
        assert_eq!(scanner.nth_field_read(1).unwrap().name, "listener");
        assert_eq!(scanner.field_read_count(), 2);
    }

    #[test]
    fn test_nth_invocation_excluding_first() {
        let body = sample_body();
        let scanner = BodyScanner::new(&body, "Lapp/Player;->setup");

        // position 1 is "the second static call", the excluding-the-first form
        let second = scanner.nth_invocation_of(InvocationKind::Static, 1).unwrap();
        assert_eq!(second.name, "second");
        assert_eq!(scanner.invocation_count(InvocationKind::Static), 2);
    }

    #[test]
    fn test_interface_invocation_carries_return_type() {
        let body = sample_body();
        let scanner = BodyScanner::new(&body, "Lapp/Player;->setup");

        let callee = scanner
            .nth_invocation_of(InvocationKind::Interface, 0)
            .unwrap();
        assert_eq!(callee.name, "onEvent");
        assert_eq!(callee.returns.as_str(), "Z");
    }

    #[test]
    fn test_missing_position_reports_context() {
        let body = sample_body();
        let scanner = BodyScanner::new(&body, "Lapp/Player;->setup");

        let err = scanner.nth_field_read(2).unwrap_err();
        match err {
            Error::ExtractionPositionMissing {
                what,
                position,
                method,
            } => {
                assert_eq!(what, "field read");
                assert_eq!(position, 2);
                assert_eq!(method, "Lapp/Player;->setup");
            }
            other => panic!("unexpected error: {other}"),
        }

        assert!(scanner
            .nth_invocation_of(InvocationKind::Virtual, 0)
            .is_err());
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let body = sample_body();
        let scanner = BodyScanner::new(&body, "Lapp/Player;->setup");

        let first_pass = (
            scanner.nth_field_read(0).unwrap().name.clone(),
            scanner
                .nth_invocation_of(InvocationKind::Static, 1)
                .unwrap()
                .name
                .clone(),
        );
        let second_pass = (
            scanner.nth_field_read(0).unwrap().name.clone(),
            scanner
                .nth_invocation_of(InvocationKind::Static, 1)
                .unwrap()
                .name
                .clone(),
        );
        assert_eq!(first_pass, second_pass);
    }
}
