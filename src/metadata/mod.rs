//! Metadata representation for register-based VM modules.
//!
//! This module contains the structural model a loaded module is analyzed and
//! patched through: classes with their fields and methods, method bodies as
//! decoded instruction streams, and the catalog view used for lookup.
//!
//! # Key Components
//!
//! - [`module`] - Loaded module with its ordered class spine and type index
//! - [`catalog`] - Read-only query facade over a module
//! - [`class`] / [`field`] / [`method`] - Definition model with shared ownership
//! - [`body`] - Register-machine method bodies and their addressing rules
//! - [`builder`] - Programmatic construction, the seam external loaders use
//! - [`ty`] / [`refs`] / [`flags`] - Descriptors, member references, access flags
//!
//! # Examples
//!
//! ```rust
//! use dexscope::metadata::builder::{ClassBuilder, MethodBuilder, ModuleBuilder};
//!
//! let module = ModuleBuilder::new()
//!     .class(
//!         ClassBuilder::new("Lapp/Session;")
//!             .field("token", "Ljava/lang/String;")
//!             .method(MethodBuilder::new("close", &[], "V")),
//!     )
//!     .build()?;
//!
//! let catalog = module.catalog();
//! assert!(catalog.class_by_type(&"Lapp/Session;".into()).is_some());
//! # Ok::<(), dexscope::Error>(())
//! ```

/// Implementation of method bodies as decoded instruction streams
pub mod body;
/// Implementation of programmatic module construction
pub mod builder;
/// Implementation of the read-only module query facade
pub mod catalog;
/// Implementation of class definitions and member lists
pub mod class;
/// Implementation of field definitions
pub mod field;
/// Implementation of access flag handling
pub mod flags;
/// Implementation of method definitions and body access
pub mod method;
/// Implementation of the loaded module container
pub mod module;
/// Implementation of member references (field and method)
pub mod refs;
/// Implementation of type descriptors
pub mod ty;
