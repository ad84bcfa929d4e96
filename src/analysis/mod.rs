//! Structural analysis: fingerprints, matching, and symbol extraction.
//!
//! Everything in this module is read-only over the loaded module. The
//! pipeline is: describe the wanted class by shape ([`fingerprint`]),
//! resolve it deterministically ([`matcher`]), then recover the renamed
//! member names the matched code touches ([`scanner`]). Surprising
//! outcomes along the way are collected as data ([`diagnostics`]) rather
//! than printed.
//!
//! # Key Components
//!
//! - [`fingerprint`] - Declarative predicate sets locating classes by shape
//! - [`matcher`] - Predicate interpreter with per-run result cache
//! - [`scanner`] - Positional symbol extraction from matched bodies
//! - [`diagnostics`] - Thread-safe diagnostic collection

/// Implementation of diagnostic collection for matching and patching runs
pub mod diagnostics;
/// Implementation of declarative structural fingerprints
pub mod fingerprint;
/// Implementation of fingerprint resolution with caching
pub mod matcher;
/// Implementation of positional symbol extraction
pub mod scanner;

// Re-export primary types at module level
pub use diagnostics::{Diagnostic, DiagnosticCategory, DiagnosticSeverity, Diagnostics};
pub use fingerprint::{
    FieldQuery, Fingerprint, InstructionQuery, MemberSelector, MethodQuery, OpcodeSelector,
    Predicate, ReferenceMatch, Scope,
};
pub use matcher::{MatchResult, Matcher};
pub use scanner::BodyScanner;
