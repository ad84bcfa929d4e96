//! Patch orchestration.
//!
//! [`PatchRunner`] drives registered [`Patch`] implementations over one
//! module, exactly once each, in registration order. Before a patch's
//! [`Patch::apply`] runs, every fingerprint it declares must resolve; the
//! first unresolvable fingerprint aborts the run with a typed error naming
//! both the fingerprint and the patch. Aborting is fail-fast: the failing
//! patch applies nothing further and later patches never run. Mutations
//! already committed by earlier patches stay in place.
//!
//! Fingerprint results are cached in one [`Matcher`] shared across the whole
//! run, so patches that declare the same fingerprint resolve it once, and a
//! fingerprint may chain on a match produced under an earlier patch.
//!
//! Patches never see the module directly. [`PatchContext`] is the capability
//! surface: catalog queries, cached and ad-hoc fingerprint resolution, body
//! editing and scanning, and constant propagation.
//!
//! # Examples
//!
//! ```rust
//! use dexscope::prelude::*;
//!
//! struct MutePatch;
//!
//! impl Patch for MutePatch {
//!     fn id(&self) -> &str {
//!         "mute-feedback"
//!     }
//!
//!     fn fingerprints(&self) -> Vec<Fingerprint> {
//!         vec![Fingerprint::named("feedback-class")
//!             .with_field_of_type("Lapp/Vibrator;")
//!             .selecting_method(MethodQuery::new().named("buzz"))]
//!     }
//!
//!     fn apply(&self, context: &mut PatchContext<'_>) -> Result<()> {
//!         let matched = context.matched("feedback-class")?;
//!         let method = matched.require_method("feedback-class")?;
//!         context.edit(&method, |editor| {
//!             editor.prepend_call(
//!                 MethodRef::new("Lapp/Hook;", "onBuzz", &[], "V"),
//!                 &[],
//!             )
//!         })
//!     }
//! }
//!
//! # fn demo(module: &dexscope::metadata::module::DexModule) -> Result<()> {
//! let mut runner = PatchRunner::new(module);
//! runner.register(MutePatch);
//! runner.run()?;
//! assert_eq!(runner.state(), RunState::Committed);
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::Arc;

use crate::analysis::diagnostics::{DiagnosticCategory, Diagnostics};
use crate::analysis::fingerprint::Fingerprint;
use crate::analysis::matcher::{MatchResult, Matcher};
use crate::analysis::scanner::BodyScanner;
use crate::metadata::catalog::Catalog;
use crate::metadata::method::Method;
use crate::metadata::module::DexModule;
use crate::patching::editor::Editor;
use crate::patching::propagate::ConstantPropagator;
use crate::{Error, Result};

/// A self-contained transformation of a module.
///
/// Implementations declare what they need ([`Patch::fingerprints`]) and
/// perform their mutations through the capabilities of a [`PatchContext`].
pub trait Patch {
    /// Stable identifier, used in errors and diagnostics.
    fn id(&self) -> &str;

    /// Human-readable name; defaults to the identifier.
    fn name(&self) -> &str {
        self.id()
    }

    /// Optional longer description.
    fn description(&self) -> Option<&str> {
        None
    }

    /// Opaque target-compatibility identifiers. The core never interprets
    /// them; packaging layers match them against the binary at hand.
    fn compatible_packages(&self) -> &[String] {
        &[]
    }

    /// Fingerprints that must all resolve before [`Patch::apply`] runs.
    ///
    /// Results are available inside `apply` via [`PatchContext::matched`].
    fn fingerprints(&self) -> Vec<Fingerprint> {
        Vec::new()
    }

    /// Perform the transformation.
    ///
    /// # Errors
    ///
    /// Any error aborts the whole run.
    fn apply(&self, context: &mut PatchContext<'_>) -> Result<()>;
}

/// Lifecycle of a [`PatchRunner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunState {
    /// Accepting registrations, nothing executed yet
    Registered,
    /// `run` is in progress
    Running,
    /// Every registered patch applied successfully
    Committed,
    /// A patch failed; later patches did not run
    Aborted,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RunState::Registered => "registered",
            RunState::Running => "running",
            RunState::Committed => "committed",
            RunState::Aborted => "aborted",
        };
        write!(f, "{}", label)
    }
}

/// Capability surface handed to [`Patch::apply`].
///
/// Everything a patch may touch goes through here: the catalog for
/// structural queries, the run's shared matcher for fingerprint results,
/// scoped editing and scanning of method bodies, and a propagator wired to
/// the run's diagnostics.
pub struct PatchContext<'a> {
    patch: &'a str,
    matcher: &'a Matcher<'a>,
    diagnostics: &'a Arc<Diagnostics>,
}

impl<'a> PatchContext<'a> {
    /// The catalog over the module being patched.
    #[must_use]
    pub fn catalog(&self) -> Catalog<'a> {
        self.matcher.catalog()
    }

    /// The run-wide matcher and its fingerprint cache.
    #[must_use]
    pub fn matcher(&self) -> &'a Matcher<'a> {
        self.matcher
    }

    /// The run's diagnostics sink.
    #[must_use]
    pub fn diagnostics(&self) -> &Diagnostics {
        self.diagnostics
    }

    /// The match for a fingerprint this patch declared.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`] when no fingerprint of that name was
    /// resolved for this run; declare it via [`Patch::fingerprints`].
    pub fn matched(&self, fingerprint: &str) -> Result<MatchResult> {
        self.matcher.cached(fingerprint).ok_or_else(|| {
            Error::InvalidState(format!(
                "fingerprint '{}' was not resolved before patch '{}' ran",
                fingerprint, self.patch
            ))
        })
    }

    /// Resolves an additional fingerprint on the spot, treating absence as
    /// an error attributed to this patch.
    ///
    /// # Errors
    ///
    /// [`Error::FingerprintNotFound`] when nothing in scope matches.
    pub fn require(&self, fingerprint: &Fingerprint) -> Result<MatchResult> {
        self.matcher.require(fingerprint, self.patch)
    }

    /// Resolves an optional fingerprint; `None` when nothing matches.
    #[must_use]
    pub fn resolve(&self, fingerprint: &Fingerprint) -> Option<MatchResult> {
        self.matcher.resolve(fingerprint)
    }

    /// Runs an editing closure against `method`'s instruction body.
    ///
    /// # Errors
    ///
    /// [`Error::MissingBody`] for abstract or native methods; otherwise
    /// whatever the closure returns.
    pub fn edit<F>(&self, method: &Method, f: F) -> Result<()>
    where
        F: FnOnce(&mut Editor<'_>) -> Result<()>,
    {
        method
            .with_body_mut(|body| f(&mut Editor::new(body)))
            .unwrap_or_else(|| {
                Err(Error::MissingBody(format!(
                    "{}{}",
                    method.name,
                    method.descriptor()
                )))
            })
    }

    /// Runs a read-only scan against `method`'s instruction body.
    ///
    /// # Errors
    ///
    /// [`Error::MissingBody`] for abstract or native methods; otherwise
    /// whatever the closure returns.
    pub fn scan<R, F>(&self, method: &Method, f: F) -> Result<R>
    where
        F: FnOnce(BodyScanner<'_>) -> Result<R>,
    {
        method
            .with_body(|body| f(BodyScanner::new(body, &method.name)))
            .unwrap_or_else(|| {
                Err(Error::MissingBody(format!(
                    "{}{}",
                    method.name,
                    method.descriptor()
                )))
            })
    }

    /// A fresh constant propagator wired to the run's diagnostics.
    #[must_use]
    pub fn propagator(&self) -> ConstantPropagator {
        ConstantPropagator::new().with_diagnostics(self.diagnostics.clone())
    }
}

/// Sequences patches over one module.
///
/// `Registered → Running → {Committed, Aborted}`; a runner is consumed by
/// its single `run` and can only be inspected afterwards.
pub struct PatchRunner<'a> {
    module: &'a DexModule,
    patches: Vec<Box<dyn Patch>>,
    state: RunState,
    diagnostics: Arc<Diagnostics>,
    ambiguity_diagnostics: bool,
}

impl<'a> PatchRunner<'a> {
    /// Creates a runner with no patches registered.
    #[must_use]
    pub fn new(module: &'a DexModule) -> Self {
        PatchRunner {
            module,
            patches: Vec::new(),
            state: RunState::Registered,
            diagnostics: Arc::new(Diagnostics::new()),
            ambiguity_diagnostics: false,
        }
    }

    /// Shares an external diagnostics container instead of the internal one.
    #[must_use]
    pub fn with_diagnostics(mut self, diagnostics: Arc<Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Enables ambiguity warnings during fingerprint resolution.
    ///
    /// Candidate scans then run sequentially so every match is seen, not
    /// just the first; resolution results are unchanged.
    #[must_use]
    pub fn with_ambiguity_diagnostics(mut self) -> Self {
        self.ambiguity_diagnostics = true;
        self
    }

    /// Registers a patch. Patches run in registration order.
    pub fn register(&mut self, patch: impl Patch + 'static) -> &mut Self {
        self.patches.push(Box::new(patch));
        self
    }

    /// Number of registered patches.
    #[must_use]
    pub fn len(&self) -> usize {
        self.patches.len()
    }

    /// Returns `true` if no patches are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> RunState {
        self.state
    }

    /// The run's diagnostics.
    #[must_use]
    pub fn diagnostics(&self) -> &Arc<Diagnostics> {
        &self.diagnostics
    }

    /// Applies every registered patch, in order, exactly once.
    ///
    /// Each patch's fingerprints resolve first, through the run-wide cache;
    /// then its `apply` runs. The first failure transitions to
    /// [`RunState::Aborted`] and propagates: earlier patches keep their
    /// mutations, later patches never run. Success of all patches
    /// transitions to [`RunState::Committed`].
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`] when the runner already ran;
    /// [`Error::FingerprintNotFound`] for the first unresolvable required
    /// fingerprint; any error a patch's `apply` returns.
    pub fn run(&mut self) -> Result<()> {
        if self.state != RunState::Registered {
            return Err(Error::InvalidState(format!(
                "patch runner already {}",
                self.state
            )));
        }
        self.state = RunState::Running;

        let mut matcher = Matcher::new(self.module.catalog());
        if self.ambiguity_diagnostics {
            matcher = matcher.with_diagnostics(self.diagnostics.clone());
        }

        for index in 0..self.patches.len() {
            if let Err(error) = self.apply_one(index, &matcher) {
                self.state = RunState::Aborted;
                self.diagnostics.error(
                    DiagnosticCategory::Patch,
                    format!("patch '{}' failed: {}", self.patches[index].id(), error),
                );
                return Err(error);
            }
        }

        self.state = RunState::Committed;
        self.diagnostics.info(
            DiagnosticCategory::Patch,
            format!("{} patch(es) committed", self.patches.len()),
        );
        Ok(())
    }

    fn apply_one(&self, index: usize, matcher: &Matcher<'_>) -> Result<()> {
        let patch = &self.patches[index];
        self.diagnostics.info(
            DiagnosticCategory::Patch,
            format!("applying patch '{}'", patch.id()),
        );

        for fingerprint in patch.fingerprints() {
            matcher.require(&fingerprint, patch.id())?;
        }

        let mut context = PatchContext {
            patch: patch.id(),
            matcher,
            diagnostics: &self.diagnostics,
        };
        patch.apply(&mut context)
    }
}
