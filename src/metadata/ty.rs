//! Type descriptors for register-based VM modules.
//!
//! Types are identified by their descriptor string in the standard JVM/Dalvik
//! form: `V` for void, single characters for primitives (`Z`, `B`, `S`, `C`,
//! `I`, `J`, `F`, `D`), `Lpkg/Name;` for reference types and `[` prefixes for
//! arrays. A descriptor is the globally unique identifier of a type within a
//! module, so [`TypeName`] doubles as the lookup key of the symbol catalog.
//!
//! [`TypeName`] is backed by a shared string and is cheap to clone, compare
//! and hash, which matters because descriptors are copied into every symbolic
//! instruction operand that references a type, field or method.

use std::fmt;
use std::sync::Arc;

/// A type descriptor, the unique identifier of a type within a module.
///
/// Wraps a shared descriptor string (`"Landroid/view/MotionEvent;"`, `"V"`,
/// `"[B"`, ...). Cloning is a reference-count increment; equality and hashing
/// operate on the descriptor text.
///
/// # Examples
///
/// ```rust
/// use dexscope::metadata::ty::TypeName;
///
/// let event = TypeName::from("Landroid/view/MotionEvent;");
/// assert!(event.is_reference());
/// assert_eq!(event.simple_name(), Some("MotionEvent"));
///
/// let void = TypeName::void();
/// assert!(void.is_void());
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeName(Arc<str>);

impl TypeName {
    /// Create a type name from a descriptor string.
    #[must_use]
    pub fn new(descriptor: &str) -> Self {
        TypeName(Arc::from(descriptor))
    }

    /// The `void` descriptor, `"V"`.
    #[must_use]
    pub fn void() -> Self {
        TypeName::new("V")
    }

    /// Returns the raw descriptor string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if this is the void descriptor.
    #[must_use]
    pub fn is_void(&self) -> bool {
        &*self.0 == "V"
    }

    /// Returns `true` if this is a primitive value descriptor
    /// (`Z`, `B`, `S`, `C`, `I`, `J`, `F`, `D`). Void is not a value and
    /// reports `false`.
    #[must_use]
    pub fn is_primitive(&self) -> bool {
        matches!(&*self.0, "Z" | "B" | "S" | "C" | "I" | "J" | "F" | "D")
    }

    /// Returns `true` if this is a reference (class or interface) descriptor.
    #[must_use]
    pub fn is_reference(&self) -> bool {
        self.0.starts_with('L') && self.0.ends_with(';')
    }

    /// Returns `true` if this is an array descriptor.
    #[must_use]
    pub fn is_array(&self) -> bool {
        self.0.starts_with('[')
    }

    /// Returns `true` for the two descriptors that occupy a register pair
    /// (`J` and `D`).
    #[must_use]
    pub fn is_wide(&self) -> bool {
        matches!(&*self.0, "J" | "D")
    }

    /// For array descriptors, the component type; `None` otherwise.
    #[must_use]
    pub fn component(&self) -> Option<TypeName> {
        self.0.strip_prefix('[').map(TypeName::new)
    }

    /// For reference descriptors, the unqualified class name
    /// (`"Lcom/foo/Bar;"` → `"Bar"`); `None` otherwise.
    #[must_use]
    pub fn simple_name(&self) -> Option<&str> {
        if !self.is_reference() {
            return None;
        }

        let inner = &self.0[1..self.0.len() - 1];
        Some(inner.rsplit('/').next().unwrap_or(inner))
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeName({})", self.0)
    }
}

impl From<&str> for TypeName {
    fn from(descriptor: &str) -> Self {
        TypeName::new(descriptor)
    }
}

impl From<String> for TypeName {
    fn from(descriptor: String) -> Self {
        TypeName(Arc::from(descriptor))
    }
}

impl AsRef<str> for TypeName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typename_new() {
        let name = TypeName::new("Lcom/example/Player;");
        assert_eq!(name.as_str(), "Lcom/example/Player;");
    }

    #[test]
    fn test_typename_clone_eq() {
        let a = TypeName::new("I");
        let b = a.clone();
        assert_eq!(a, b);
        assert_ne!(a, TypeName::new("J"));
    }

    #[test]
    fn test_typename_void() {
        assert!(TypeName::void().is_void());
        assert!(!TypeName::void().is_primitive());
        assert!(!TypeName::new("I").is_void());
    }

    #[test]
    fn test_typename_primitive() {
        for desc in ["Z", "B", "S", "C", "I", "J", "F", "D"] {
            assert!(TypeName::new(desc).is_primitive(), "{} is primitive", desc);
        }
        assert!(!TypeName::new("Ljava/lang/Object;").is_primitive());
        assert!(!TypeName::new("[I").is_primitive());
    }

    #[test]
    fn test_typename_reference() {
        assert!(TypeName::new("Ljava/lang/String;").is_reference());
        assert!(!TypeName::new("I").is_reference());
        assert!(!TypeName::new("[Ljava/lang/String;").is_reference());
    }

    #[test]
    fn test_typename_array() {
        let arr = TypeName::new("[[B");
        assert!(arr.is_array());
        assert_eq!(arr.component(), Some(TypeName::new("[B")));
        assert_eq!(TypeName::new("I").component(), None);
    }

    #[test]
    fn test_typename_wide() {
        assert!(TypeName::new("J").is_wide());
        assert!(TypeName::new("D").is_wide());
        assert!(!TypeName::new("I").is_wide());
        assert!(!TypeName::new("F").is_wide());
    }

    #[test]
    fn test_typename_simple_name() {
        assert_eq!(
            TypeName::new("Landroid/view/GestureDetector;").simple_name(),
            Some("GestureDetector")
        );
        assert_eq!(TypeName::new("LNoPackage;").simple_name(), Some("NoPackage"));
        assert_eq!(TypeName::new("I").simple_name(), None);
    }

    #[test]
    fn test_typename_display() {
        assert_eq!(format!("{}", TypeName::new("[I")), "[I");
        assert_eq!(
            format!("{:?}", TypeName::new("V")),
            "TypeName(V)".to_string()
        );
    }

    #[test]
    fn test_typename_from_string() {
        let owned: TypeName = String::from("Lcom/a/B;").into();
        assert_eq!(owned.as_str(), "Lcom/a/B;");
        assert_eq!(owned.as_ref(), "Lcom/a/B;");
    }

    #[test]
    fn test_typename_hash_usable_as_key() {
        use std::collections::HashMap;

        let mut map = HashMap::new();
        map.insert(TypeName::new("Lcom/a/B;"), 1);
        assert_eq!(map.get(&TypeName::new("Lcom/a/B;")), Some(&1));
        assert_eq!(map.get(&TypeName::new("Lcom/a/C;")), None);
    }
}
