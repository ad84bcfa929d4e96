use thiserror::Error;

use crate::metadata::ty::TypeName;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// This enum covers all possible error conditions that can occur during module construction,
/// fingerprint matching, instruction editing, and patch orchestration. Each variant provides
/// specific context about the failure mode to enable appropriate error handling.
///
/// # Error Categories
///
/// ## Module Construction Errors
/// - [`Error::Malformed`] - A module under construction violates a structural invariant
/// - [`Error::DuplicateType`] - Two class definitions share the same type descriptor
/// - [`Error::TypeNotFound`] - A required type is not present in the module
///
/// ## Matching Errors
/// - [`Error::FingerprintNotFound`] - A required structural fingerprint did not match
/// - [`Error::ExtractionPositionMissing`] - Expected instruction pattern absent at a
///   structural position
///
/// ## Instruction Editing Errors
/// - [`Error::UnresolvedLabel`] - A branch references a label that was never defined
/// - [`Error::DuplicateLabel`] - A label was defined twice in one sequence
/// - [`Error::OffsetOutOfBounds`] - Insertion offset beyond the end of a method body
/// - [`Error::BranchOutOfRange`] - Branch distance exceeds the encoding's addressable range
/// - [`Error::RegisterOutOfRange`] - Instruction references a register beyond the declared count
/// - [`Error::MissingBody`] - Attempted to edit an abstract or native method
///
/// ## Orchestration Errors
/// - [`Error::InvalidState`] - A patch run was driven through an illegal state transition
///
/// # Examples
///
/// ```rust
/// use dexscope::{Error, metadata::builder::ModuleBuilder};
///
/// match ModuleBuilder::new().build() {
///     Ok(module) => {
///         println!("Module with {} classes", module.classes().len());
///     }
///     Err(Error::Malformed { message, file, line }) => {
///         eprintln!("Malformed module: {} ({}:{})", message, file, line);
///     }
///     Err(Error::DuplicateType(name)) => {
///         eprintln!("Type declared twice: {}", name);
///     }
///     Err(e) => {
///         eprintln!("Other error: {}", e);
///     }
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    // Module construction Errors
    /// A module under construction is damaged and violates a structural invariant.
    ///
    /// This error indicates that the classes, methods or instruction bodies handed
    /// to the builder do not form a valid register-based module. The error includes
    /// the source location where the malformation was detected for debugging purposes.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// Two class definitions share the same type descriptor.
    ///
    /// Type descriptors are the globally unique identifiers of classes within a
    /// module; registering a second class under an existing descriptor would make
    /// catalog lookups ambiguous.
    ///
    /// The associated [`TypeName`] identifies the duplicated descriptor.
    #[error("Type declared more than once in module - {0}")]
    DuplicateType(TypeName),

    /// Failed to find a type in the module.
    ///
    /// This error occurs when an operation requires a class that is not present,
    /// such as rewriting the initializer of a support class that does not exist.
    /// Plain catalog queries never produce it; absence is a normal query result.
    ///
    /// The associated [`TypeName`] identifies which type was not found.
    #[error("Failed to find type in module - {0}")]
    TypeNotFound(TypeName),

    // Matching Errors
    /// A required structural fingerprint did not match anything in the module.
    ///
    /// Fatal to the governing patch: the orchestrator aborts the run when a patch
    /// declares a fingerprint that resolves empty. Usually indicates a binary
    /// version the fingerprint set was not written for.
    #[error("Fingerprint '{fingerprint}' did not match (required by patch '{patch}')")]
    FingerprintNotFound {
        /// Name of the fingerprint that failed to resolve
        fingerprint: String,
        /// Identifier of the patch that required it
        patch: String,
    },

    /// An expected instruction pattern is absent at the requested structural position.
    ///
    /// Raised by positional extraction queries, e.g. asking for the name referenced
    /// by the third static invocation of a body that only contains two. Fatal to
    /// the governing patch.
    #[error("No {what} at position {position} in '{method}'")]
    ExtractionPositionMissing {
        /// Kind of instruction pattern that was expected (e.g. "field read")
        what: &'static str,
        /// Zero-based position that was requested
        position: usize,
        /// Name of the method that was scanned
        method: String,
    },

    // Instruction editing Errors
    /// A branch instruction references a label that was never defined.
    ///
    /// Labels are resolved after an inserted sequence has been spliced into the
    /// body; a reference without a definition is a bug in the patch's instruction
    /// template and is never recovered from.
    #[error("Branch references undefined label '{0}'")]
    UnresolvedLabel(String),

    /// The same label was defined twice within one instruction sequence.
    #[error("Label '{0}' defined more than once")]
    DuplicateLabel(String),

    /// An insertion offset lies beyond the end of the method body.
    #[error("Offset {offset} out of bounds for body of {len} instructions")]
    OffsetOutOfBounds {
        /// The instruction offset that was requested
        offset: usize,
        /// The number of instructions in the body
        len: usize,
    },

    /// A branch distance exceeds the addressable range of its encoding.
    ///
    /// Unconditional branches are transparently promoted to wider encodings, so
    /// this error only occurs for conditional branches, whose single encoding has
    /// a fixed signed 16-bit reach.
    #[error("Branch to '{label}' out of range ({distance} code units)")]
    BranchOutOfRange {
        /// Label or rendered location of the branch target
        label: String,
        /// The distance that failed to encode, in 16-bit code units
        distance: i64,
    },

    /// An instruction references a register beyond the declared register count.
    #[error("Register v{register} out of range (register count {count})")]
    RegisterOutOfRange {
        /// The register number that was referenced
        register: u16,
        /// The declared register count of the body
        count: u16,
    },

    /// Attempted to edit a method that has no instruction body.
    ///
    /// Abstract and native methods carry no body; only concrete methods can be
    /// edited or scanned.
    #[error("Method '{0}' has no instruction body")]
    MissingBody(String),

    // Orchestration Errors
    /// A patch run was driven through an illegal state transition.
    ///
    /// Runs move `Registered → Running → {Committed, Aborted}` exactly once;
    /// re-running a consumed runner or registering patches mid-run is a
    /// programming error on the caller's side.
    #[error("{0}")]
    InvalidState(String),

    /// Generic error for miscellaneous failures.
    ///
    /// Used by patch transformation procedures to signal failures that don't
    /// fit the structured categories above.
    #[error("{0}")]
    Error(String),
}
