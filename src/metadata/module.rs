//! The module arena.
//!
//! A [`DexModule`] owns every class of the program under analysis for its
//! whole lifetime. The class list is the declaration-order spine all
//! deterministic tie-breaks refer to; a `DashMap` keyed by type descriptor
//! provides O(1) lookup on top of it. The index is populated once at
//! construction and only read afterwards, so any number of fingerprint
//! evaluations can query it concurrently.
//!
//! The module's structure is immutable after construction. The only sanctioned
//! mutation path is through the instruction stream editor, which changes
//! method bodies but never the class graph.

use dashmap::DashMap;

use crate::metadata::catalog::Catalog;
use crate::metadata::class::ClassRc;
use crate::metadata::ty::TypeName;
use crate::{Error, Result};

/// A loaded module: the ordered set of class definitions.
#[derive(Debug)]
pub struct DexModule {
    classes: Vec<ClassRc>,
    index: DashMap<TypeName, usize>,
}

impl DexModule {
    /// Assemble a module from a class list, building the type index.
    ///
    /// # Errors
    ///
    /// [`Error::DuplicateType`] if two classes share a descriptor.
    pub(crate) fn from_classes(classes: Vec<ClassRc>) -> Result<Self> {
        let index = DashMap::with_capacity(classes.len());
        for (position, class) in classes.iter().enumerate() {
            if index.insert(class.name.clone(), position).is_some() {
                return Err(Error::DuplicateType(class.name.clone()));
            }
        }
        Ok(DexModule { classes, index })
    }

    /// All classes, in declaration order.
    #[must_use]
    pub fn classes(&self) -> &[ClassRc] {
        &self.classes
    }

    /// Number of classes in the module.
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Returns `true` for a module without classes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// O(1) class lookup by type descriptor. Absence is a normal result.
    #[must_use]
    pub fn class_by_type(&self, ty: &TypeName) -> Option<ClassRc> {
        self.index
            .get(ty)
            .and_then(|position| self.classes.get(*position).cloned())
    }

    /// A read-only catalog view over this module.
    #[must_use]
    pub fn catalog(&self) -> Catalog<'_> {
        Catalog::new(self)
    }
}
