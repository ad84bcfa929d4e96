//! Fingerprint resolution against a catalog.
//!
//! [`Matcher`] is the interpreter for the predicate language defined in
//! [`crate::analysis::fingerprint`]. For every fingerprint it walks the
//! candidate classes of the fingerprint's scope and tests the declared
//! predicates in order, short-circuiting per candidate on the first failure.
//! Candidates are evaluated in parallel; the returned match is always the
//! first satisfying class in module declaration order, so resolution is
//! deterministic regardless of thread scheduling.
//!
//! Results are cached for the lifetime of the matcher, keyed by fingerprint
//! name. The cache is what makes chained fingerprints work: a fingerprint
//! scoped with [`Scope::ClassOf`] or [`Scope::FieldTypesOf`] reads the
//! earlier fingerprint's result from the cache, so fingerprints must be
//! resolved in dependency order. Misses are cached too; a fingerprint that
//! resolved empty once stays empty for this matcher.
//!
//! # Ambiguity
//!
//! Several classes satisfying one fingerprint is not an error: the first in
//! declaration order wins, every run. For drift investigations there is an
//! opt-in diagnostic mode ([`Matcher::with_diagnostics`]) that records a
//! warning naming the extra candidates without changing the result.
//!
//! # Examples
//!
//! ```rust
//! use dexscope::analysis::fingerprint::Fingerprint;
//! use dexscope::analysis::matcher::Matcher;
//! use dexscope::metadata::builder::{ClassBuilder, ModuleBuilder};
//!
//! let module = ModuleBuilder::new()
//!     .class(ClassBuilder::new("Lapp/A;").field("x", "I"))
//!     .class(ClassBuilder::new("Lapp/B;").field("x", "I").field("y", "J"))
//!     .build()?;
//!
//! let catalog = module.catalog();
//! let matcher = Matcher::new(catalog);
//!
//! let two_fields = Fingerprint::named("two-fields").with_field_count(2);
//! let hit = matcher.resolve(&two_fields).unwrap();
//! assert_eq!(hit.class.name.as_str(), "Lapp/B;");
//! # Ok::<(), dexscope::Error>(())
//! ```

use std::sync::Arc;

use dashmap::DashMap;
use rayon::prelude::*;

use crate::analysis::diagnostics::{Diagnostic, DiagnosticCategory, DiagnosticSeverity, Diagnostics};
use crate::analysis::fingerprint::{
    FieldQuery, Fingerprint, MemberSelector, MethodQuery, Predicate, Scope,
};
use crate::metadata::catalog::Catalog;
use crate::metadata::class::ClassRc;
use crate::metadata::field::FieldRc;
use crate::metadata::method::MethodRc;
use crate::metadata::ty::TypeName;
use crate::{Error, Result};

/// The class, and optionally one member, a fingerprint resolved to.
#[derive(Debug, Clone)]
pub struct MatchResult {
    /// The satisfying class.
    pub class: ClassRc,

    /// The selected method, when the fingerprint selects one.
    pub method: Option<MethodRc>,

    /// The selected field, when the fingerprint selects one.
    pub field: Option<FieldRc>,
}

impl MatchResult {
    fn class_only(class: ClassRc) -> Self {
        MatchResult {
            class,
            method: None,
            field: None,
        }
    }

    /// The selected method, or an error naming the fingerprint.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`] when the fingerprint did not select a method.
    pub fn require_method(&self, fingerprint: &str) -> Result<MethodRc> {
        self.method.clone().ok_or_else(|| {
            Error::InvalidState(format!(
                "fingerprint '{fingerprint}' did not select a method"
            ))
        })
    }

    /// The selected field, or an error naming the fingerprint.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`] when the fingerprint did not select a field.
    pub fn require_field(&self, fingerprint: &str) -> Result<FieldRc> {
        self.field.clone().ok_or_else(|| {
            Error::InvalidState(format!(
                "fingerprint '{fingerprint}' did not select a field"
            ))
        })
    }
}

/// Resolves fingerprints against a catalog, caching results by name.
///
/// Cheap to construct; one matcher per patch run. The matcher is `Sync`,
/// so independent fingerprints may be resolved from parallel threads.
#[derive(Debug)]
pub struct Matcher<'a> {
    catalog: Catalog<'a>,
    cache: DashMap<String, Option<MatchResult>>,
    diagnostics: Option<Arc<Diagnostics>>,
}

impl<'a> Matcher<'a> {
    /// Creates a matcher over `catalog` with an empty result cache.
    #[must_use]
    pub fn new(catalog: Catalog<'a>) -> Self {
        Matcher {
            catalog,
            cache: DashMap::new(),
            diagnostics: None,
        }
    }

    /// Enables ambiguity reporting into `diagnostics`.
    ///
    /// When a fingerprint matches more than one candidate, a warning naming
    /// the kept and the extra candidates is recorded. Resolution behavior
    /// is unchanged.
    #[must_use]
    pub fn with_diagnostics(mut self, diagnostics: Arc<Diagnostics>) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }

    /// The catalog this matcher searches.
    #[must_use]
    pub fn catalog(&self) -> Catalog<'a> {
        self.catalog
    }

    /// Resolves `fingerprint`, consulting and filling the cache.
    ///
    /// `None` means nothing in scope satisfied the predicates; callers
    /// decide whether that is fatal.
    pub fn resolve(&self, fingerprint: &Fingerprint) -> Option<MatchResult> {
        if let Some(cached) = self.cache.get(fingerprint.name()) {
            return cached.value().clone();
        }

        let result = self.evaluate(fingerprint);
        self.cache
            .insert(fingerprint.name().to_string(), result.clone());
        result
    }

    /// Resolves `fingerprint`, treating absence as an error attributed to
    /// `patch`.
    ///
    /// # Errors
    ///
    /// [`Error::FingerprintNotFound`] when nothing satisfied the
    /// fingerprint.
    pub fn require(&self, fingerprint: &Fingerprint, patch: &str) -> Result<MatchResult> {
        self.resolve(fingerprint)
            .ok_or_else(|| Error::FingerprintNotFound {
                fingerprint: fingerprint.name().to_string(),
                patch: patch.to_string(),
            })
    }

    /// Returns the cached result for a fingerprint name, if it has been
    /// resolved by this matcher.
    #[must_use]
    pub fn cached(&self, name: &str) -> Option<MatchResult> {
        self.cache.get(name).and_then(|entry| entry.value().clone())
    }

    fn evaluate(&self, fingerprint: &Fingerprint) -> Option<MatchResult> {
        let candidates = self.candidates(fingerprint.scope());

        match &self.diagnostics {
            None => candidates
                .par_iter()
                .find_map_first(|class| self.candidate_match(fingerprint, class)),
            Some(diagnostics) => {
                let hits: Vec<MatchResult> = candidates
                    .par_iter()
                    .filter_map(|class| self.candidate_match(fingerprint, class))
                    .collect();
                if hits.len() > 1 {
                    let extras: Vec<&str> = hits[1..]
                        .iter()
                        .map(|hit| hit.class.name.as_str())
                        .collect();
                    diagnostics.push(
                        Diagnostic::new(
                            DiagnosticSeverity::Warning,
                            DiagnosticCategory::Matching,
                            format!(
                                "matched {} candidates, keeping '{}' (extra: {})",
                                hits.len(),
                                hits[0].class.name,
                                extras.join(", ")
                            ),
                        )
                        .with_fingerprint(fingerprint.name()),
                    );
                }
                hits.into_iter().next()
            }
        }
    }

    /// The candidate classes for a scope, in deterministic order.
    fn candidates(&self, scope: &Scope) -> Vec<ClassRc> {
        match scope {
            Scope::Module => self.catalog.classes().to_vec(),
            Scope::ClassOf(name) => match self.cached(name) {
                Some(result) => vec![result.class],
                None => {
                    self.warn_unresolved_scope(name);
                    Vec::new()
                }
            },
            Scope::FieldTypesOf(name) => match self.cached(name) {
                Some(result) => {
                    let mut seen: Vec<TypeName> = Vec::new();
                    let mut candidates = Vec::new();
                    for field in result.class.fields() {
                        if seen.contains(&field.ty) {
                            continue;
                        }
                        seen.push(field.ty.clone());
                        if let Some(class) = self.catalog.class_by_type(&field.ty) {
                            candidates.push(class);
                        }
                    }
                    candidates
                }
                None => {
                    self.warn_unresolved_scope(name);
                    Vec::new()
                }
            },
        }
    }

    fn warn_unresolved_scope(&self, name: &str) {
        if let Some(diagnostics) = &self.diagnostics {
            diagnostics.warning(
                DiagnosticCategory::Matching,
                format!("scope references fingerprint '{name}' which has not been resolved"),
            );
        }
    }

    /// Full test of one candidate: every predicate in declaration order,
    /// then member selection. `None` rejects the candidate.
    fn candidate_match(&self, fingerprint: &Fingerprint, class: &ClassRc) -> Option<MatchResult> {
        for predicate in fingerprint.predicates() {
            if !self.satisfies(class, predicate) {
                return None;
            }
        }

        match fingerprint.member() {
            None => Some(MatchResult::class_only(class.clone())),
            Some(MemberSelector::Method(query)) => {
                self.select_method(class, query).map(|method| MatchResult {
                    class: class.clone(),
                    method: Some(method),
                    field: None,
                })
            }
            Some(MemberSelector::Field(query)) => {
                self.select_field(class, query).map(|field| MatchResult {
                    class: class.clone(),
                    method: None,
                    field: Some(field),
                })
            }
        }
    }

    fn satisfies(&self, class: &ClassRc, predicate: &Predicate) -> bool {
        match predicate {
            Predicate::FieldCountEquals(count) => class.field_count() == *count,
            Predicate::AccessFlagsContain(flags) => class.flags.contains(*flags),
            Predicate::HasFieldOfType(ty) => class.has_field_of_type(ty),
            Predicate::SuperclassIs(ty) => class.superclass.as_ref() == Some(ty),
            Predicate::ImplementsSingleMethodInterface { params, returns } => class
                .interfaces
                .iter()
                .any(|iface| self.interface_shape_matches(iface, params, returns)),
            Predicate::HasMethodWhere(query) => self.select_method(class, query).is_some(),
        }
    }

    /// Duck-typing core: the interface class must exist in the module,
    /// carry the interface flag, and declare exactly one instance method
    /// whose shape matches. Interfaces outside the module cannot be
    /// verified and never satisfy the predicate.
    fn interface_shape_matches(
        &self,
        iface: &TypeName,
        params: &[TypeName],
        returns: &TypeName,
    ) -> bool {
        let Some(class) = self.catalog.class_by_type(iface) else {
            return false;
        };
        if !class.is_interface() {
            return false;
        }
        class
            .single_virtual_method()
            .is_some_and(|method| method.matches_shape(params, returns))
    }

    /// First declared method satisfying every populated part of the query.
    fn select_method(&self, class: &ClassRc, query: &MethodQuery) -> Option<MethodRc> {
        class
            .methods()
            .find(|method| {
                if let Some(name) = &query.name {
                    if method.name != *name {
                        return false;
                    }
                }
                if let Some(params) = &query.params {
                    if method.params != *params {
                        return false;
                    }
                }
                if let Some(returns) = &query.returns {
                    if method.returns != *returns {
                        return false;
                    }
                }
                if let Some(instruction) = &query.instruction {
                    let found = method
                        .with_body(|body| {
                            body.instructions.iter().any(|i| instruction.matches(i))
                        })
                        .unwrap_or(false);
                    if !found {
                        return false;
                    }
                }
                true
            })
            .cloned()
    }

    /// First declared field satisfying every populated part of the query.
    fn select_field(&self, class: &ClassRc, query: &FieldQuery) -> Option<FieldRc> {
        class
            .fields()
            .find(|field| {
                if let Some(name) = &query.name {
                    if field.name != *name {
                        return false;
                    }
                }
                if let Some(ty) = &query.ty {
                    if field.ty != *ty {
                        return false;
                    }
                }
                if let Some(superclass) = &query.ty_superclass {
                    let extends = self
                        .catalog
                        .class_by_type(&field.ty)
                        .is_some_and(|c| c.superclass.as_ref() == Some(superclass));
                    if !extends {
                        return false;
                    }
                }
                true
            })
            .cloned()
    }
}
