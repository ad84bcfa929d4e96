//! # dexscope Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the dexscope library. Import this module to get quick access to the essential
//! types for structural matching and patching of register-based modules.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all dexscope operations
pub use crate::Error;

/// The result type used throughout dexscope
pub use crate::Result;

// ================================================================================================
// Main Entry Points
// ================================================================================================

/// The loaded module under analysis and patching
pub use crate::metadata::module::DexModule;

/// Read-only query facade over a module
pub use crate::metadata::catalog::Catalog;

/// Programmatic module construction
pub use crate::metadata::builder::{ClassBuilder, MethodBuilder, ModuleBuilder};

// ================================================================================================
// Metadata System - Core Types
// ================================================================================================

/// Interned type descriptor
pub use crate::metadata::ty::TypeName;

/// Access flag bit groups shared by classes, methods and fields
pub use crate::metadata::flags::AccessFlags;

/// Class, field and method definitions with their shared-ownership aliases
pub use crate::metadata::{
    class::{Class, ClassRc},
    field::{Field, FieldRc},
    method::{Method, MethodRc},
};

/// Method bodies and exception regions
pub use crate::metadata::body::{InstructionBody, TryRegion};

/// Symbolic references to members, as carried in instruction operands
pub use crate::metadata::refs::{FieldRef, MethodRef};

// ================================================================================================
// Assembly - Instructions and Sequences
// ================================================================================================

/// The instruction model with symbolic operands and registers
pub use crate::assembly::{Instruction, Operand, Register};

/// The supported opcode table and its encoding classification
pub use crate::assembly::{BranchKind, Format, InvocationKind, Opcode};

/// Fluent construction of labeled instruction sequences
pub use crate::assembly::{InstructionAssembler, InstructionSequence};

// ================================================================================================
// Analysis - Fingerprints and Matching
// ================================================================================================

/// Declarative structural fingerprints and their building blocks
pub use crate::analysis::{
    FieldQuery, Fingerprint, InstructionQuery, MemberSelector, MethodQuery, OpcodeSelector,
    Predicate, ReferenceMatch, Scope,
};

/// Deterministic fingerprint resolution
pub use crate::analysis::{MatchResult, Matcher};

/// Positional symbol extraction from matched bodies
pub use crate::analysis::BodyScanner;

/// Diagnostic collection for matching and patching runs
pub use crate::analysis::{Diagnostic, DiagnosticCategory, DiagnosticSeverity, Diagnostics};

// ================================================================================================
// Patching - Editing and Orchestration
// ================================================================================================

/// Transactional instruction-level editing of method bodies
pub use crate::patching::Editor;

/// Propagation of extracted symbol names into support-class initializers
pub use crate::patching::ConstantPropagator;

/// The patch surface and its orchestration
pub use crate::patching::{Patch, PatchContext, PatchRunner, RunState};
