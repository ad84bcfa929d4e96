//! Symbolic references to fields and methods.
//!
//! Instruction operands never carry raw pool indices or file offsets; a field
//! access names its target with a [`FieldRef`] and an invocation with a
//! [`MethodRef`]. Because references are resolved symbols, splicing
//! instructions into a body never requires recomputing reference operands,
//! only branch distances.

use std::fmt;

use crate::metadata::ty::TypeName;

/// A resolved reference to a field, as carried by field access instructions.
///
/// Rendered in the conventional `Lcom/a/B;->name:Ltype;` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldRef {
    /// Type that declares the field
    pub class: TypeName,
    /// Field name
    pub name: String,
    /// Declared type of the field
    pub ty: TypeName,
}

impl FieldRef {
    /// Create a field reference.
    pub fn new(class: impl Into<TypeName>, name: impl Into<String>, ty: impl Into<TypeName>) -> Self {
        FieldRef {
            class: class.into(),
            name: name.into(),
            ty: ty.into(),
        }
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}:{}", self.class, self.name, self.ty)
    }
}

/// A resolved reference to a method, as carried by invocation instructions.
///
/// Rendered in the conventional `Lcom/a/B;->name(params)ret` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodRef {
    /// Type that declares the method
    pub class: TypeName,
    /// Method name
    pub name: String,
    /// Parameter types, in declaration order
    pub params: Vec<TypeName>,
    /// Return type
    pub returns: TypeName,
}

impl MethodRef {
    /// Create a method reference.
    pub fn new(
        class: impl Into<TypeName>,
        name: impl Into<String>,
        params: &[&str],
        returns: impl Into<TypeName>,
    ) -> Self {
        MethodRef {
            class: class.into(),
            name: name.into(),
            params: params.iter().map(|p| TypeName::new(p)).collect(),
            returns: returns.into(),
        }
    }

    /// The `(params)ret` shorthand of this method's shape.
    #[must_use]
    pub fn descriptor(&self) -> String {
        let mut out = String::from("(");
        for param in &self.params {
            out.push_str(param.as_str());
        }
        out.push(')');
        out.push_str(self.returns.as_str());
        out
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}{}", self.class, self.name, self.descriptor())
    }
}
