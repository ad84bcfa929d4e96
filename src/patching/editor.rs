//! In-place instruction stream editing.
//!
//! [`Editor`] mutates one method's [`InstructionBody`]: it splices labeled
//! sequences into the stream, resolves the labels to relative branch
//! distances, and recomputes the distances of every pre-existing branch
//! whose source and target ended up on opposite sides of the splice.
//!
//! # Architecture
//!
//! Distances are measured in 16-bit code units from the start of the branch
//! instruction, so any edit that changes instruction addresses invalidates
//! them. The editor therefore works in target-index form: before a splice,
//! every resolved branch is converted from a distance to the index of its
//! target instruction; after the splice, a relaxation loop recomputes
//! addresses and widens `goto` encodings until every distance fits, then
//! writes the final distances back. Conditional branches have a single
//! fixed encoding; a conditional whose recomputed distance no longer fits
//! is a hard [`Error::BranchOutOfRange`]. An unconditional `goto` instead
//! promotes through `goto/16` and `goto/32`, the one case in which an
//! instruction outside the inserted range changes its opcode (its width).
//!
//! All fallible work happens on a working copy; when an edit returns an
//! error the body is untouched.
//!
//! # Examples
//!
//! ```rust
//! use dexscope::assembly::{InstructionAssembler, Register};
//! use dexscope::metadata::body::InstructionBody;
//! use dexscope::metadata::refs::MethodRef;
//! use dexscope::patching::editor::Editor;
//!
//! let mut asm = InstructionAssembler::new();
//! asm.return_void()?;
//! let mut body =
//!     InstructionBody::with_instructions(2, 1, asm.finish().instructions().to_vec());
//!
//! let mut editor = Editor::new(&mut body);
//! editor.prepend_call(
//!     MethodRef::new("Lapp/Hook;", "onCreate", &["Ljava/lang/Object;"], "V"),
//!     &[Register::parameter(0)],
//! )?;
//! assert_eq!(body.len(), 2);
//! # Ok::<(), dexscope::Error>(())
//! ```

use crate::assembly::assembler::{InstructionAssembler, InstructionSequence};
use crate::assembly::instruction::{Instruction, Operand, Register};
use crate::assembly::opcode::{BranchKind, Opcode};
use crate::metadata::body::InstructionBody;
use crate::metadata::refs::MethodRef;
use crate::{Error, Result};

/// One branch whose distance must be recomputed after a splice.
///
/// Indices are post-splice instruction indices; `target` may equal the
/// instruction count, meaning the end of the body.
#[derive(Debug)]
struct BranchFixup {
    source: usize,
    target: usize,
    /// Label for error reporting; synthesized from the old target address
    /// for branches that were already resolved.
    label: String,
}

/// Mutable editing facade over one method body.
#[derive(Debug)]
pub struct Editor<'a> {
    body: &'a mut InstructionBody,
}

impl<'a> Editor<'a> {
    /// Creates an editor borrowing `body` for the duration of the edit.
    #[must_use]
    pub fn new(body: &'a mut InstructionBody) -> Self {
        Editor { body }
    }

    /// Read access to the body being edited.
    #[must_use]
    pub fn body(&self) -> &InstructionBody {
        self.body
    }

    /// Splices `sequence` into the stream before the instruction at
    /// `offset`; `0` prepends, `len()` appends.
    ///
    /// Labels in the sequence resolve after the splice, against the final
    /// addresses, so a label may sit before any instruction of the sequence
    /// or one past its end (branching to the instruction the sequence was
    /// inserted in front of). Pre-existing branches keep their targets: a
    /// branch over the insertion point has its distance recomputed.
    ///
    /// On success the body grows by exactly the sequence's instruction
    /// count. On error the body is unchanged.
    ///
    /// # Errors
    ///
    /// - [`Error::OffsetOutOfBounds`] if `offset > len()`.
    /// - [`Error::RegisterOutOfRange`] if the sequence references a
    ///   register at or above the declared count.
    /// - [`Error::UnresolvedLabel`] if a branch references a label the
    ///   sequence never defines, or the body already held an unresolved
    ///   label.
    /// - [`Error::BranchOutOfRange`] if a conditional branch's distance
    ///   exceeds its fixed encoding.
    /// - [`Error::Malformed`] if an already-resolved branch lands between
    ///   instruction boundaries.
    pub fn insert(&mut self, offset: usize, sequence: InstructionSequence) -> Result<()> {
        let existing_len = self.body.instructions.len();
        if offset > existing_len {
            return Err(Error::OffsetOutOfBounds {
                offset,
                len: existing_len,
            });
        }

        let inserted = sequence.len();
        if inserted == 0 {
            return Ok(());
        }

        // Register safety first: inserted code must fit the declared file.
        for instruction in sequence.instructions() {
            for register in instruction.registers() {
                let resolved = self.body.resolve_register(register);
                if resolved >= self.body.registers {
                    return Err(Error::RegisterOutOfRange {
                        register: resolved,
                        count: self.body.registers,
                    });
                }
            }
        }

        let shift = |index: usize| {
            if index >= offset {
                index + inserted
            } else {
                index
            }
        };

        let mut fixups = Vec::new();

        // Incoming branches: labels resolve against the sequence's own
        // layout, already-resolved distances are reinterpreted relative to
        // their placement.
        let sequence_addresses = address_table(sequence.instructions());
        for (index, instruction) in sequence.instructions().iter().enumerate() {
            if let Some(label) = instruction.branch_label() {
                let Some(target) = sequence.label_target(label) else {
                    return Err(Error::UnresolvedLabel(label.to_string()));
                };
                fixups.push(BranchFixup {
                    source: offset + index,
                    target: offset + target,
                    label: label.to_string(),
                });
            } else if let Some(distance) = instruction.branch_offset() {
                let target_address = sequence_addresses[index] as i64 + i64::from(distance);
                let Some(target) = index_at(&sequence_addresses, target_address) else {
                    return Err(malformed_error!(
                        "branch at sequence index {} targets code unit {} outside the sequence",
                        index,
                        target_address
                    ));
                };
                fixups.push(BranchFixup {
                    source: offset + index,
                    target: offset + target,
                    label: format!("@{target_address}"),
                });
            }
        }

        // Pre-existing branches: convert distance to target index so the
        // target survives the splice, whichever side of it the target is on.
        let addresses = self.body.addresses();
        for (index, instruction) in self.body.instructions.iter().enumerate() {
            if let Some(label) = instruction.branch_label() {
                return Err(Error::UnresolvedLabel(label.to_string()));
            }
            let Some(distance) = instruction.branch_offset() else {
                continue;
            };
            let target_address = addresses[index] as i64 + i64::from(distance);
            let Some(target) = index_at(&addresses, target_address) else {
                return Err(malformed_error!(
                    "branch at index {} targets code unit {} between instructions",
                    index,
                    target_address
                ));
            };
            fixups.push(BranchFixup {
                source: shift(index),
                target: shift(target),
                label: format!("@{target_address}"),
            });
        }

        // Splice into a working copy; the body is only replaced on success.
        let mut working = Vec::with_capacity(existing_len + inserted);
        working.extend_from_slice(&self.body.instructions[..offset]);
        working.extend(sequence.instructions);
        working.extend_from_slice(&self.body.instructions[offset..]);

        relax_and_resolve(&mut working, &fixups)?;

        for region in &mut self.body.try_regions {
            if region.start >= offset {
                region.start += inserted;
            }
            if region.end > offset {
                region.end += inserted;
            }
            if region.handler >= offset {
                region.handler += inserted;
            }
        }
        self.body.instructions = working;
        Ok(())
    }

    /// Prepends a static call to `method` passing `args`.
    ///
    /// The usual hook shape: hand the original parameters (as
    /// [`Register::Parameter`]) to an injected static method before any
    /// original instruction runs. The register file is not grown; args must
    /// already fit it.
    ///
    /// # Errors
    ///
    /// As [`Editor::insert`], plus [`Error::Malformed`] for more than five
    /// argument registers.
    pub fn prepend_call(&mut self, method: MethodRef, args: &[Register]) -> Result<()> {
        let mut asm = InstructionAssembler::new();
        asm.invoke_static(args, method)?;
        self.insert(0, asm.finish())
    }

    /// Raises the declared register count to at least `count`.
    ///
    /// Parameter registers are represented symbolically and occupy the top
    /// of the file, so raising the count moves the parameter window up
    /// without rewriting any instruction. Lowering never happens; a `count`
    /// at or below the current declaration is a no-op.
    pub fn ensure_registers(&mut self, count: u16) {
        if count > self.body.registers {
            self.body.registers = count;
        }
    }

    /// Sets the declared register file: `registers` total, `ins` incoming.
    ///
    /// # Errors
    ///
    /// [`Error::Malformed`] if `ins > registers`.
    pub fn declare_registers(&mut self, registers: u16, ins: u16) -> Result<()> {
        if ins > registers {
            return Err(malformed_error!(
                "parameter register count {} exceeds declared register count {}",
                ins,
                registers
            ));
        }
        self.body.registers = registers;
        self.body.ins = ins;
        Ok(())
    }

    /// Replaces every instruction of the body with `sequence`, dropping
    /// exception regions (they indexed the discarded instructions).
    ///
    /// On error the body is unchanged.
    ///
    /// # Errors
    ///
    /// As [`Editor::insert`].
    pub fn replace_all(&mut self, sequence: InstructionSequence) -> Result<()> {
        let saved_instructions = std::mem::take(&mut self.body.instructions);
        let saved_regions = std::mem::take(&mut self.body.try_regions);
        match self.insert(0, sequence) {
            Ok(()) => Ok(()),
            Err(error) => {
                self.body.instructions = saved_instructions;
                self.body.try_regions = saved_regions;
                Err(error)
            }
        }
    }
}

/// Widen `goto` encodings until every fixup distance fits, then write the
/// distances. Widths only ever grow, so the loop terminates.
fn relax_and_resolve(working: &mut [Instruction], fixups: &[BranchFixup]) -> Result<()> {
    loop {
        let addresses = address_table(working);
        let mut changed = false;
        for fixup in fixups {
            let distance = addresses[fixup.target] as i64 - addresses[fixup.source] as i64;
            let opcode = working[fixup.source].opcode;
            if opcode.branch_kind() == Some(BranchKind::Unconditional) {
                let needed = Opcode::goto_for(distance);
                if needed.units() > opcode.units() {
                    working[fixup.source].opcode = needed;
                    changed = true;
                }
            }
        }
        if !changed {
            break;
        }
    }

    let addresses = address_table(working);
    for fixup in fixups {
        let distance = addresses[fixup.target] as i64 - addresses[fixup.source] as i64;
        let opcode = working[fixup.source].opcode;
        let Some((low, high)) = opcode.branch_range() else {
            return Err(malformed_error!(
                "distance fixup on non-branch instruction at index {}",
                fixup.source
            ));
        };
        if distance < low || distance > high {
            return Err(Error::BranchOutOfRange {
                label: fixup.label.clone(),
                distance,
            });
        }
        set_branch_operand(&mut working[fixup.source], distance as i32)?;
    }
    Ok(())
}

fn set_branch_operand(instruction: &mut Instruction, distance: i32) -> Result<()> {
    for operand in &mut instruction.operands {
        if matches!(operand, Operand::Label(_) | Operand::Offset(_)) {
            *operand = Operand::Offset(distance);
            return Ok(());
        }
    }
    Err(malformed_error!(
        "branch instruction carries no target operand"
    ))
}

/// Code-unit prefix table over a slice: `len + 1` entries, last is the end
/// address.
fn address_table(instructions: &[Instruction]) -> Vec<usize> {
    let mut table = Vec::with_capacity(instructions.len() + 1);
    let mut current = 0;
    table.push(current);
    for instruction in instructions {
        current += instruction.units();
        table.push(current);
    }
    table
}

/// Index of the instruction starting at `address`, or the end index for the
/// end address. `None` for mid-instruction or out-of-range addresses.
fn index_at(table: &[usize], address: i64) -> Option<usize> {
    if address < 0 {
        return None;
    }
    table.binary_search(&(address as usize)).ok()
}
