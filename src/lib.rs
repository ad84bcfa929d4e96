// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]
#![allow(dead_code)]

//! # dexscope
//!
//! [![Crates.io](https://img.shields.io/crates/v/dexscope.svg)](https://crates.io/crates/dexscope)
//! [![Documentation](https://docs.rs/dexscope/badge.svg)](https://docs.rs/dexscope)
//! [![License](https://img.shields.io/badge/license-Apache--2.0-blue.svg)](https://github.com/BinFlip/dexscope/blob/main/LICENSE-APACHE)
//!
//! A structural patching core for register-based Android bytecode. Built in pure Rust,
//! `dexscope` locates classes and methods by *shape* rather than by name, rewrites method
//! bodies at the instruction level, and orchestrates whole patch sets, all against a
//! loaded in-memory module, without requiring a device, an emulator, or the Android SDK.
//!
//! Obfuscated builds rename every class, method and field on each release. The structure
//! of the code survives: a gesture handler still has its three detector fields, a settings
//! class still implements its single-method listener interface. `dexscope` turns those
//! structural facts into declarative fingerprints and makes the matched code editable.
//!
//! ## Features
//!
//! - **🔍 Structural fingerprints** - Declarative predicate sets that survive identifier renaming
//! - **⚡ Deterministic matching** - Parallel candidate scans with stable first-in-order selection
//! - **🔧 Instruction-level editing** - Splice labeled sequences; branch distances and exception
//!   regions are recomputed automatically
//! - **🛡️ Transactional mutations** - A failed edit leaves the method body exactly as it was
//! - **📦 Symbol extraction** - Recover renamed member names from matched bodies and propagate
//!   them into companion code as string constants
//! - **🧩 Patch orchestration** - Ordered, fail-fast patch runs over one shared match cache
//!
//! ## Quick Start
//!
//! Add `dexscope` to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! dexscope = "0.2"
//! ```
//!
//! ### Using the Prelude
//!
//! For convenient access to the most commonly used types, import the prelude:
//!
//! ```rust
//! use dexscope::prelude::*;
//!
//! struct DisableTelemetry;
//!
//! impl Patch for DisableTelemetry {
//!     fn id(&self) -> &str {
//!         "disable-telemetry"
//!     }
//!
//!     fn fingerprints(&self) -> Vec<Fingerprint> {
//!         vec![Fingerprint::named("reporter-class")
//!             .with_field_of_type("Ljava/net/Socket;")
//!             .selecting_method(MethodQuery::new().named("flush"))]
//!     }
//!
//!     fn apply(&self, context: &mut PatchContext<'_>) -> Result<()> {
//!         let matched = context.matched("reporter-class")?;
//!         let method = matched.require_method("reporter-class")?;
//!         context.edit(&method, |editor| {
//!             editor.prepend_call(MethodRef::new("Lapp/Hook;", "suppress", &[], "V"), &[])
//!         })
//!     }
//! }
//!
//! // A module as a loader front-end would hand it over.
//! let module = ModuleBuilder::new()
//!     .class(
//!         ClassBuilder::new("Lapp/a;")
//!             .field("a", "Ljava/net/Socket;")
//!             .method(MethodBuilder::new("flush", &[], "V").body(
//!                 InstructionBody::with_instructions(
//!                     1,
//!                     1,
//!                     vec![Instruction::new(Opcode::ReturnVoid, vec![])],
//!                 ),
//!             )),
//!     )
//!     .build()?;
//!
//! let mut runner = PatchRunner::new(&module);
//! runner.register(DisableTelemetry);
//! runner.run()?;
//! assert_eq!(runner.state(), RunState::Committed);
//! # Ok::<(), dexscope::Error>(())
//! ```
//!
//! ## Architecture
//!
//! `dexscope` is organized into several key modules:
//!
//! - [`prelude`] - Convenient re-exports of commonly used types and traits
//! - [`metadata`] - The loaded module: classes, members, instruction bodies, catalog queries
//! - [`assembly`] - The instruction model and the fluent assembler for labeled sequences
//! - [`analysis`] - Fingerprints, the matcher, positional symbol extraction, diagnostics
//! - [`patching`] - The body editor, constant propagation, and the patch runner
//!
//! ### Metadata Model
//!
//! [`DexModule`] owns the class spine in declaration order; [`metadata::catalog::Catalog`]
//! is the read-only query view everything downstream works through. Modules are built
//! programmatically via [`ModuleBuilder`], which is the seam a DEX loader front-end plugs
//! into. Method bodies carry their register file declaration and exception regions next to
//! the decoded instruction list.
//!
//! ### Matching
//!
//! A [`analysis::fingerprint::Fingerprint`] bundles cheap structural predicates (field
//! counts, access flags, field types, superclass, interface shape, opcode probes) with an
//! optional member selector. The [`analysis::matcher::Matcher`] evaluates predicates in
//! declared order with short-circuiting and scans candidates in parallel; the first match
//! in module declaration order always wins, so results are reproducible run to run.
//! Resolved fingerprints land in a per-run cache that later fingerprints can chain on.
//!
//! ### Editing
//!
//! The [`patching::editor::Editor`] splices [`assembly::InstructionSequence`]s into method
//! bodies. Branch targets stay symbolic until the splice; the editor then resolves labels
//! to code-unit distances, retargets existing branches that straddle the insertion point,
//! widens `goto` encodings when a distance outgrows them, and rejects conditional branches
//! whose single encoding cannot reach. Every failure mode is checked before the body is
//! touched.
//!
//! ### Orchestration
//!
//! [`PatchRunner`] drives registered [`Patch`] implementations exactly once each, in
//! registration order, aborting the run on the first failure. Patches act through a
//! capability context rather than on the module directly, which keeps every mutation
//! attributable to the patch that made it.
//!
//! ## Error Handling
//!
//! All operations return [`Result<T, Error>`](Result) with comprehensive error information:
//!
//! ```rust
//! use dexscope::{Error, metadata::builder::{ClassBuilder, ModuleBuilder}};
//!
//! let result = ModuleBuilder::new()
//!     .class(ClassBuilder::new("Lapp/Twice;"))
//!     .class(ClassBuilder::new("Lapp/Twice;"))
//!     .build();
//!
//! match result {
//!     Ok(module) => println!("Module with {} classes", module.len()),
//!     Err(Error::DuplicateType(name)) => println!("Type declared twice: {}", name),
//!     Err(Error::Malformed { message, .. }) => println!("Malformed module: {}", message),
//!     Err(e) => println!("Other error: {}", e),
//! }
//! ```
//!
//! ## Development and Testing
//!
//! The crate includes fuzzing support for the splice path, which carries the trickiest
//! arithmetic in the codebase:
//!
//! ### Fuzzing
//!
//! ```bash
//! # Install fuzzing tools
//! cargo install cargo-fuzz
//!
//! # Run fuzzer
//! cargo +nightly fuzz run splice --release
//!
//! # Multi-core fuzzing
//! cargo +nightly fuzz run splice --release -- -jobs=4 -fork=1
//! ```
//!
//! ### Testing
//!
//! The test suite covers the matcher's determinism guarantees, the editor's branch
//! arithmetic, and complete patch scenarios end to end:
//!
//! ```bash
//! cargo test
//! cargo bench  # Matcher throughput over synthetic modules
//! ```
#[macro_use]
pub(crate) mod macros;

#[macro_use]
pub(crate) mod error;

/// Convenient re-exports of the most commonly used types and traits.
///
/// This module provides a curated selection of the most frequently used types
/// from across the dexscope library, allowing for convenient glob imports.
///
/// # Example
///
/// ```rust
/// use dexscope::prelude::*;
///
/// let module = ModuleBuilder::new().build()?;
/// let mut runner = PatchRunner::new(&module);
/// runner.run()?;
/// assert_eq!(runner.state(), RunState::Committed);
/// # Ok::<(), dexscope::Error>(())
/// ```
pub mod prelude;

/// Structural model of a loaded register-based module.
///
/// Classes with their fields and methods, instruction bodies with register
/// file declarations, the [`metadata::builder`] construction seam, and the
/// [`metadata::catalog`] query facade.
pub mod metadata;

/// Instruction model and fluent assembly of labeled sequences.
///
/// The supported opcode table with encoding formats, the
/// [`assembly::Instruction`] model with symbolic operands, and the
/// [`assembly::InstructionAssembler`] used to build insertion sequences.
pub mod assembly;

/// Read-only structural analysis of a module.
///
/// Declarative [`analysis::Fingerprint`]s, the deterministic
/// [`analysis::Matcher`], positional symbol extraction via
/// [`analysis::BodyScanner`], and the [`analysis::Diagnostics`] container.
pub mod analysis;

/// Module mutation and patch orchestration.
///
/// The transactional [`patching::Editor`] for instruction splicing, the
/// [`patching::ConstantPropagator`] for support-class rewrites, and the
/// [`patching::PatchRunner`] driving [`Patch`] sets.
pub mod patching;

/// `dexscope` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
/// This is used consistently throughout the crate for all fallible operations.
///
/// # Examples
///
/// ```rust
/// use dexscope::{metadata::module::DexModule, Result};
///
/// fn class_count(module: &DexModule) -> Result<usize> {
///     Ok(module.len())
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// `dexscope` Error type
///
/// The main error type for all operations in this crate. Provides detailed error
/// information for module construction, fingerprint matching, instruction editing,
/// and patch orchestration.
///
/// # Examples
///
/// ```rust
/// use dexscope::{Error, metadata::builder::ModuleBuilder};
///
/// match ModuleBuilder::new().build() {
///     Ok(module) => println!("Module with {} classes", module.len()),
///     Err(Error::Malformed { message, .. }) => println!("Malformed: {}", message),
///     Err(e) => println!("Error: {}", e),
/// }
/// ```
pub use error::Error;

/// The loaded module every other layer operates on.
///
/// See [`metadata::module::DexModule`] for the class spine and catalog access,
/// and [`metadata::builder::ModuleBuilder`] for construction.
///
/// # Example
///
/// ```rust
/// use dexscope::{DexModule, ModuleBuilder};
///
/// let module: DexModule = ModuleBuilder::new().build()?;
/// assert!(module.is_empty());
/// # Ok::<(), dexscope::Error>(())
/// ```
pub use metadata::module::DexModule;

/// Programmatic module construction, the seam loader front-ends plug into.
pub use metadata::builder::ModuleBuilder;

/// The patch surface: implement [`Patch`], register it on a [`PatchRunner`], run.
///
/// # Example
///
/// ```rust
/// use dexscope::{ModuleBuilder, PatchRunner, RunState};
///
/// let module = ModuleBuilder::new().build()?;
/// let mut runner = PatchRunner::new(&module);
/// runner.run()?;
/// assert_eq!(runner.state(), RunState::Committed);
/// # Ok::<(), dexscope::Error>(())
/// ```
pub use patching::{Patch, PatchRunner, RunState};
