//! The symbol catalog: read-only structural queries over a module.
//!
//! [`Catalog`] is the capability handed to fingerprint evaluation. It wraps a
//! borrowed [`DexModule`] and exposes exactly the read side: O(1) type lookup
//! and predicate-filtered iteration over classes, methods and fields. Queries
//! that find nothing return empty results, never errors; absence is a normal
//! answer during structural matching.
//!
//! # Thread Safety
//!
//! The catalog performs no mutation and borrows only immutable module state,
//! so independent fingerprints may evaluate against the same catalog from
//! many threads. [`Catalog::classes_where`] scans candidates in parallel
//! while preserving declaration order in its result.

use rayon::prelude::*;

use crate::metadata::class::{Class, ClassRc};
use crate::metadata::field::FieldRc;
use crate::metadata::method::MethodRc;
use crate::metadata::module::DexModule;
use crate::metadata::ty::TypeName;

/// Read-only structural query view over a [`DexModule`].
#[derive(Debug, Clone, Copy)]
pub struct Catalog<'a> {
    module: &'a DexModule,
}

impl<'a> Catalog<'a> {
    /// Create a catalog over a module.
    #[must_use]
    pub fn new(module: &'a DexModule) -> Self {
        Catalog { module }
    }

    /// O(1) class lookup by type descriptor.
    #[must_use]
    pub fn class_by_type(&self, ty: &TypeName) -> Option<ClassRc> {
        self.module.class_by_type(ty)
    }

    /// All classes, in declaration order.
    #[must_use]
    pub fn classes(&self) -> &'a [ClassRc] {
        self.module.classes()
    }

    /// Number of classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.module.len()
    }

    /// Returns `true` for an empty module.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.module.is_empty()
    }

    /// Classes satisfying `predicate`, in declaration order.
    ///
    /// Candidates are evaluated in parallel; the collected result keeps the
    /// module's declaration order, so "first match" stays deterministic.
    #[must_use]
    pub fn classes_where<P>(&self, predicate: P) -> Vec<ClassRc>
    where
        P: Fn(&Class) -> bool + Sync,
    {
        self.module
            .classes()
            .par_iter()
            .filter(|class| predicate(class))
            .cloned()
            .collect()
    }

    /// `(class, method)` pairs satisfying `predicate`, in declaration order.
    #[must_use]
    pub fn methods_where<P>(&self, predicate: P) -> Vec<(ClassRc, MethodRc)>
    where
        P: Fn(&Class, &MethodRc) -> bool,
    {
        let mut found = Vec::new();
        for class in self.module.classes() {
            for method in class.methods() {
                if predicate(class, method) {
                    found.push((class.clone(), method.clone()));
                }
            }
        }
        found
    }

    /// `(class, field)` pairs satisfying `predicate`, in declaration order.
    #[must_use]
    pub fn fields_where<P>(&self, predicate: P) -> Vec<(ClassRc, FieldRc)>
    where
        P: Fn(&Class, &FieldRc) -> bool,
    {
        let mut found = Vec::new();
        for class in self.module.classes() {
            for field in class.fields() {
                if predicate(class, field) {
                    found.push((class.clone(), field.clone()));
                }
            }
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::builder::{ClassBuilder, MethodBuilder, ModuleBuilder};
    use crate::metadata::flags::AccessFlags;

    fn sample_module() -> DexModule {
        ModuleBuilder::new()
            .class(
                ClassBuilder::new("Lapp/First;")
                    .field("count", "I")
                    .method(MethodBuilder::new("get", &[], "I")),
            )
            .class(
                ClassBuilder::new("Lapp/Second;")
                    .flags(AccessFlags::PUBLIC | AccessFlags::INTERFACE)
                    .field("count", "I")
                    .field("extra", "J"),
            )
            .build()
            .expect("valid module")
    }

    #[test]
    fn test_catalog_lookup_and_absence() {
        let module = sample_module();
        let catalog = module.catalog();

        assert_eq!(catalog.len(), 2);
        assert!(catalog.class_by_type(&TypeName::new("Lapp/First;")).is_some());
        assert!(catalog.class_by_type(&TypeName::new("Lapp/Nope;")).is_none());
    }

    #[test]
    fn test_catalog_classes_where_keeps_order() {
        let module = sample_module();
        let catalog = module.catalog();

        let with_count = catalog.classes_where(|c| c.field_named("count").is_some());
        assert_eq!(with_count.len(), 2);
        assert_eq!(with_count[0].name.as_str(), "Lapp/First;");
        assert_eq!(with_count[1].name.as_str(), "Lapp/Second;");

        let none = catalog.classes_where(|c| c.field_count() > 5);
        assert!(none.is_empty());
    }

    #[test]
    fn test_catalog_member_queries() {
        let module = sample_module();
        let catalog = module.catalog();

        let getters = catalog.methods_where(|_, m| m.returns == TypeName::new("I"));
        assert_eq!(getters.len(), 1);
        assert_eq!(getters[0].1.name, "get");

        let longs = catalog.fields_where(|_, f| f.ty == TypeName::new("J"));
        assert_eq!(longs.len(), 1);
        assert_eq!(longs[0].0.name.as_str(), "Lapp/Second;");
    }
}
