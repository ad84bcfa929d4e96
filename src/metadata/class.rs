//! Class definitions and structural member queries.
//!
//! A [`Class`] owns its fields and methods in declaration order. Member lists
//! use `boxcar::Vec`, so population and concurrent read-side queries need no
//! locking. The query helpers on this type are the vocabulary fingerprint
//! predicates are built from: member counts, type-based field lookups and
//! signature-shape method lookups, never name-based discovery of unknown
//! members.

use std::sync::Arc;

use crate::metadata::field::{Field, FieldList, FieldRc};
use crate::metadata::flags::AccessFlags;
use crate::metadata::method::{Method, MethodList, MethodRc};
use crate::metadata::ty::TypeName;

/// A reference-counted class definition.
pub type ClassRc = Arc<Class>;

/// One class definition within a module.
#[derive(Debug)]
pub struct Class {
    /// Type descriptor, unique within the module
    pub name: TypeName,
    /// Superclass descriptor, `None` for root types
    pub superclass: Option<TypeName>,
    /// Implemented interface descriptors, in declaration order
    pub interfaces: Vec<TypeName>,
    /// Access flags
    pub flags: AccessFlags,
    /// Fields, in declaration order
    pub fields: FieldList,
    /// Methods, in declaration order
    pub methods: MethodList,
}

impl Class {
    /// Create a class with empty member lists.
    pub fn new(
        name: impl Into<TypeName>,
        superclass: Option<TypeName>,
        interfaces: Vec<TypeName>,
        flags: AccessFlags,
    ) -> Self {
        Class {
            name: name.into(),
            superclass,
            interfaces,
            flags,
            fields: Arc::new(boxcar::Vec::new()),
            methods: Arc::new(boxcar::Vec::new()),
        }
    }

    /// Append a field definition.
    pub fn add_field(&self, field: Field) -> FieldRc {
        let rc = Arc::new(field);
        self.fields.push(rc.clone());
        rc
    }

    /// Append a method definition.
    pub fn add_method(&self, method: Method) -> MethodRc {
        let rc = Arc::new(method);
        self.methods.push(rc.clone());
        rc
    }

    /// Number of declared fields.
    #[must_use]
    pub fn field_count(&self) -> usize {
        self.fields.count()
    }

    /// Number of declared methods.
    #[must_use]
    pub fn method_count(&self) -> usize {
        self.methods.count()
    }

    /// Iterates over fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldRc> {
        self.fields.iter().map(|(_, f)| f)
    }

    /// Iterates over methods in declaration order.
    pub fn methods(&self) -> impl Iterator<Item = &MethodRc> {
        self.methods.iter().map(|(_, m)| m)
    }

    /// The first field with the given name.
    #[must_use]
    pub fn field_named(&self, name: &str) -> Option<FieldRc> {
        self.fields().find(|f| f.name == name).cloned()
    }

    /// The first field declared with the given type.
    #[must_use]
    pub fn field_of_type(&self, ty: &TypeName) -> Option<FieldRc> {
        self.fields().find(|f| &f.ty == ty).cloned()
    }

    /// Returns `true` if any field is declared with the given type.
    #[must_use]
    pub fn has_field_of_type(&self, ty: &TypeName) -> bool {
        self.fields().any(|f| &f.ty == ty)
    }

    /// The first method with the given name.
    #[must_use]
    pub fn method_named(&self, name: &str) -> Option<MethodRc> {
        self.methods().find(|m| m.name == name).cloned()
    }

    /// All methods whose parameter types equal the given sequence, in
    /// declaration order.
    #[must_use]
    pub fn methods_with_params(&self, params: &[TypeName]) -> Vec<MethodRc> {
        self.methods()
            .filter(|m| m.params == params)
            .cloned()
            .collect()
    }

    /// The sole virtually-dispatched method of this class, if exactly one
    /// exists.
    ///
    /// Constructors, static and private methods do not count; this is the
    /// lookup behind single-method-interface duck typing.
    #[must_use]
    pub fn single_virtual_method(&self) -> Option<MethodRc> {
        let mut found = None;
        for method in self.methods() {
            if method.is_direct() {
                continue;
            }
            if found.is_some() {
                return None;
            }
            found = Some(method.clone());
        }
        found
    }

    /// Returns `true` if the interface bit is set.
    #[must_use]
    pub fn is_interface(&self) -> bool {
        self.flags.is_interface()
    }
}
