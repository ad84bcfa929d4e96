//! Module mutation: editing, propagation, orchestration.
//!
//! This is the write side of the crate. The [`editor`] splices assembled
//! instruction sequences into method bodies and keeps branch distances
//! coherent; [`propagate`] rewrites support class initializers with
//! extracted name constants; [`runner`] sequences whole patches over a
//! module with fail-fast abort semantics.
//!
//! # Key Components
//!
//! - [`Editor`] - In-place instruction stream editing for one method body
//! - [`ConstantPropagator`] - Writes extracted constants into a support class
//! - [`Patch`] / [`PatchRunner`] - Declarative patches and their orchestration
//! - [`PatchContext`] - Capability surface a running patch works through
//!
//! # Examples
//!
//! ```rust
//! use dexscope::assembly::{InstructionAssembler, Register};
//! use dexscope::metadata::body::InstructionBody;
//! use dexscope::patching::Editor;
//!
//! let mut body = InstructionBody::new(1, 0);
//! let mut asm = InstructionAssembler::new();
//! asm.const4(Register::local(0), 0)?.return_value(Register::local(0))?;
//! Editor::new(&mut body).insert(0, asm.finish())?;
//! assert_eq!(body.len(), 2);
//! # Ok::<(), dexscope::Error>(())
//! ```

/// Implementation of the instruction stream editor
pub mod editor;
/// Implementation of constant propagation into support class initializers
pub mod propagate;
/// Implementation of patch orchestration
pub mod runner;

// Re-export primary types at module level
pub use editor::Editor;
pub use propagate::ConstantPropagator;
pub use runner::{Patch, PatchContext, PatchRunner, RunState};
