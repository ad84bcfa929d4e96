//! Field definitions.

use std::sync::Arc;

use crate::metadata::flags::AccessFlags;
use crate::metadata::refs::FieldRef;
use crate::metadata::ty::TypeName;

/// A reference-counted field definition.
pub type FieldRc = Arc<Field>;

/// An append-only, thread-safe list of fields.
pub type FieldList = Arc<boxcar::Vec<FieldRc>>;

/// One field definition, owned by exactly one class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Field name
    pub name: String,
    /// Declared type of the field
    pub ty: TypeName,
    /// Access flags
    pub flags: AccessFlags,
}

impl Field {
    /// Create a field definition.
    pub fn new(name: impl Into<String>, ty: impl Into<TypeName>, flags: AccessFlags) -> Self {
        Field {
            name: name.into(),
            ty: ty.into(),
            flags,
        }
    }

    /// The symbolic reference to this field as declared by `class`.
    #[must_use]
    pub fn to_ref(&self, class: TypeName) -> FieldRef {
        FieldRef {
            class,
            name: self.name.clone(),
            ty: self.ty.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_to_ref() {
        let field = Field::new("detector", "Landroid/view/GestureDetector;", AccessFlags::PRIVATE);
        let fref = field.to_ref(TypeName::new("Lapp/Player;"));
        assert_eq!(fref.class.as_str(), "Lapp/Player;");
        assert_eq!(fref.name, "detector");
        assert_eq!(fref.ty.as_str(), "Landroid/view/GestureDetector;");
    }
}
