//! Access flags for classes, methods and fields.
//!
//! One shared [`AccessFlags`] group covers the Dalvik `access_flags` bit
//! layout. The numeric values follow the DEX format specification; class,
//! method and field definitions reuse the same constants (the format assigns
//! overlapping bit positions per member kind, of which this module keeps the
//! ones structural matching cares about).

use bitflags::bitflags;

bitflags! {
    /// Dalvik access flags shared by classes, methods and fields.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AccessFlags: u32 {
        /// Visible everywhere
        const PUBLIC = 0x0001;
        /// Visible only to the defining class
        const PRIVATE = 0x0002;
        /// Visible to package and subclasses
        const PROTECTED = 0x0004;
        /// Defined on type, else per instance
        const STATIC = 0x0008;
        /// No further derivation or overriding
        const FINAL = 0x0010;
        /// Method wraps a monitor enter/exit pair
        const SYNCHRONIZED = 0x0020;
        /// Field has special volatile access rules
        const VOLATILE = 0x0040;
        /// Compiler-generated bridge method
        const BRIDGE = 0x0040;
        /// Field is not serialized
        const TRANSIENT = 0x0080;
        /// Last parameter is a rest argument
        const VARARGS = 0x0080;
        /// Implemented in native code
        const NATIVE = 0x0100;
        /// Class is an interface
        const INTERFACE = 0x0200;
        /// No implementation is provided
        const ABSTRACT = 0x0400;
        /// Strict floating point rules
        const STRICT = 0x0800;
        /// Not directly present in source code
        const SYNTHETIC = 0x1000;
        /// Class is an annotation type
        const ANNOTATION = 0x2000;
        /// Class is an enum type
        const ENUM = 0x4000;
        /// Method is a constructor
        const CONSTRUCTOR = 0x1_0000;
        /// Synchronized declared in source
        const DECLARED_SYNCHRONIZED = 0x2_0000;
    }
}

impl AccessFlags {
    /// Returns `true` if the interface bit is set.
    #[must_use]
    pub fn is_interface(self) -> bool {
        self.contains(AccessFlags::INTERFACE)
    }

    /// Returns `true` if the abstract bit is set.
    #[must_use]
    pub fn is_abstract(self) -> bool {
        self.contains(AccessFlags::ABSTRACT)
    }

    /// Returns `true` if the static bit is set.
    #[must_use]
    pub fn is_static(self) -> bool {
        self.contains(AccessFlags::STATIC)
    }

    /// Returns `true` if the native bit is set.
    #[must_use]
    pub fn is_native(self) -> bool {
        self.contains(AccessFlags::NATIVE)
    }

    /// Returns `true` if the constructor bit is set.
    #[must_use]
    pub fn is_constructor(self) -> bool {
        self.contains(AccessFlags::CONSTRUCTOR)
    }
}

impl Default for AccessFlags {
    fn default() -> Self {
        AccessFlags::PUBLIC
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_queries() {
        let flags = AccessFlags::PUBLIC | AccessFlags::STATIC | AccessFlags::FINAL;
        assert!(flags.is_static());
        assert!(!flags.is_interface());
        assert!(!flags.is_abstract());
    }

    #[test]
    fn test_flags_interface_abstract() {
        let flags = AccessFlags::PUBLIC | AccessFlags::INTERFACE | AccessFlags::ABSTRACT;
        assert!(flags.is_interface());
        assert!(flags.is_abstract());
    }

    #[test]
    fn test_flags_from_bits() {
        let flags = AccessFlags::from_bits_truncate(0x0001 | 0x0008);
        assert_eq!(flags, AccessFlags::PUBLIC | AccessFlags::STATIC);
    }

    #[test]
    fn test_flags_constructor() {
        let flags = AccessFlags::CONSTRUCTOR | AccessFlags::PUBLIC;
        assert!(flags.is_constructor());
        assert!(!AccessFlags::default().is_constructor());
    }
}
