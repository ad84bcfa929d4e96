//! Programmatic module construction.
//!
//! A [`DexModule`] is normally produced by an external loader; this builder
//! is the seam that loader plugs into, and the way test suites put together
//! synthetic modules. Construction is consume-and-chain:
//!
//! ```rust
//! use dexscope::metadata::builder::{ClassBuilder, MethodBuilder, ModuleBuilder};
//! use dexscope::metadata::body::InstructionBody;
//!
//! let module = ModuleBuilder::new()
//!     .class(
//!         ClassBuilder::new("Lapp/Player;")
//!             .superclass("Ljava/lang/Object;")
//!             .field("detector", "Landroid/view/GestureDetector;")
//!             .method(
//!                 MethodBuilder::new("onTouchEvent", &["Landroid/view/MotionEvent;"], "Z")
//!                     .body(InstructionBody::new(3, 2)),
//!             ),
//!     )
//!     .build()?;
//! assert_eq!(module.len(), 1);
//! # Ok::<(), dexscope::Error>(())
//! ```
//!
//! `build()` is where the module invariants are enforced: descriptor
//! uniqueness and the register bounds of every supplied instruction body.

use std::sync::Arc;

use crate::metadata::body::InstructionBody;
use crate::metadata::class::Class;
use crate::metadata::field::Field;
use crate::metadata::flags::AccessFlags;
use crate::metadata::method::Method;
use crate::metadata::module::DexModule;
use crate::metadata::ty::TypeName;
use crate::Result;

/// Builder for a single method definition.
#[derive(Debug)]
pub struct MethodBuilder {
    name: String,
    flags: AccessFlags,
    params: Vec<TypeName>,
    returns: TypeName,
    body: Option<InstructionBody>,
}

impl MethodBuilder {
    /// Start a method with the given name and signature shape.
    #[must_use]
    pub fn new(name: &str, params: &[&str], returns: &str) -> Self {
        MethodBuilder {
            name: name.to_string(),
            flags: AccessFlags::PUBLIC,
            params: params.iter().map(|p| TypeName::new(p)).collect(),
            returns: TypeName::new(returns),
            body: None,
        }
    }

    /// Replace the access flags (default: `PUBLIC`).
    #[must_use]
    pub fn flags(mut self, flags: AccessFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Attach an instruction body. Methods without one are abstract/native.
    #[must_use]
    pub fn body(mut self, body: InstructionBody) -> Self {
        self.body = Some(body);
        self
    }

    fn build(self) -> Method {
        Method::new(self.name, self.flags, self.params, self.returns, self.body)
    }
}

/// Builder for a single class definition.
#[derive(Debug)]
pub struct ClassBuilder {
    name: TypeName,
    superclass: Option<TypeName>,
    interfaces: Vec<TypeName>,
    flags: AccessFlags,
    fields: Vec<Field>,
    methods: Vec<MethodBuilder>,
}

impl ClassBuilder {
    /// Start a class with the given type descriptor.
    #[must_use]
    pub fn new(name: &str) -> Self {
        ClassBuilder {
            name: TypeName::new(name),
            superclass: None,
            interfaces: Vec::new(),
            flags: AccessFlags::PUBLIC,
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// Set the superclass descriptor.
    #[must_use]
    pub fn superclass(mut self, name: &str) -> Self {
        self.superclass = Some(TypeName::new(name));
        self
    }

    /// Add an implemented interface descriptor.
    #[must_use]
    pub fn implements(mut self, name: &str) -> Self {
        self.interfaces.push(TypeName::new(name));
        self
    }

    /// Replace the access flags (default: `PUBLIC`).
    #[must_use]
    pub fn flags(mut self, flags: AccessFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Add a private field with the given name and type.
    #[must_use]
    pub fn field(mut self, name: &str, ty: &str) -> Self {
        self.fields.push(Field::new(name, ty, AccessFlags::PRIVATE));
        self
    }

    /// Add a field with explicit access flags.
    #[must_use]
    pub fn field_with_flags(mut self, name: &str, ty: &str, flags: AccessFlags) -> Self {
        self.fields.push(Field::new(name, ty, flags));
        self
    }

    /// Add a method.
    #[must_use]
    pub fn method(mut self, method: MethodBuilder) -> Self {
        self.methods.push(method);
        self
    }

    fn build(self) -> Result<Class> {
        let class = Class::new(self.name.clone(), self.superclass, self.interfaces, self.flags);
        for field in self.fields {
            class.add_field(field);
        }
        for method in self.methods {
            let method = method.build();
            if let Some(issue) = method.with_body(InstructionBody::validate) {
                issue.map_err(|e| {
                    malformed_error!("invalid body for {}->{}: {}", self.name, method.name, e)
                })?;
            }
            class.add_method(method);
        }
        Ok(class)
    }
}

/// Builder for a whole module.
#[derive(Debug, Default)]
pub struct ModuleBuilder {
    classes: Vec<ClassBuilder>,
}

impl ModuleBuilder {
    /// Start an empty module.
    #[must_use]
    pub fn new() -> Self {
        ModuleBuilder {
            classes: Vec::new(),
        }
    }

    /// Add a class, keeping declaration order.
    #[must_use]
    pub fn class(mut self, class: ClassBuilder) -> Self {
        self.classes.push(class);
        self
    }

    /// Validate and assemble the module.
    ///
    /// # Errors
    ///
    /// [`crate::Error::DuplicateType`] for repeated descriptors,
    /// [`crate::Error::Malformed`] for a method body that violates its
    /// register declaration.
    pub fn build(self) -> Result<DexModule> {
        let mut classes = Vec::with_capacity(self.classes.len());
        for builder in self.classes {
            classes.push(Arc::new(builder.build()?));
        }
        DexModule::from_classes(classes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::instruction::{Instruction, Operand, Register};
    use crate::assembly::opcode::Opcode;
    use crate::Error;

    #[test]
    fn test_build_minimal_module() -> Result<()> {
        let module = ModuleBuilder::new()
            .class(ClassBuilder::new("Lapp/A;"))
            .class(ClassBuilder::new("Lapp/B;").superclass("Lapp/A;"))
            .build()?;

        assert_eq!(module.len(), 2);
        let b = module.class_by_type(&TypeName::new("Lapp/B;")).unwrap();
        assert_eq!(b.superclass.as_ref().map(TypeName::as_str), Some("Lapp/A;"));
        Ok(())
    }

    #[test]
    fn test_build_with_members() -> Result<()> {
        let module = ModuleBuilder::new()
            .class(
                ClassBuilder::new("Lapp/Holder;")
                    .implements("Lapp/IThing;")
                    .field("one", "I")
                    .field_with_flags("shared", "J", AccessFlags::PUBLIC | AccessFlags::STATIC)
                    .method(
                        MethodBuilder::new("get", &[], "I")
                            .body(InstructionBody::new(2, 1)),
                    )
                    .method(
                        MethodBuilder::new("abstractOne", &["I"], "V")
                            .flags(AccessFlags::PUBLIC | AccessFlags::ABSTRACT),
                    ),
            )
            .build()?;

        let holder = module.class_by_type(&TypeName::new("Lapp/Holder;")).unwrap();
        assert_eq!(holder.field_count(), 2);
        assert_eq!(holder.method_count(), 2);
        assert!(holder.method_named("get").unwrap().has_body());
        assert!(!holder.method_named("abstractOne").unwrap().has_body());
        assert_eq!(holder.interfaces.len(), 1);
        Ok(())
    }

    #[test]
    fn test_build_rejects_duplicate_descriptor() {
        let result = ModuleBuilder::new()
            .class(ClassBuilder::new("Lapp/A;"))
            .class(ClassBuilder::new("Lapp/A;"))
            .build();
        assert!(matches!(result, Err(Error::DuplicateType(_))));
    }

    #[test]
    fn test_build_rejects_invalid_body() {
        // register v9 referenced against a register count of 1
        let bad = InstructionBody::with_instructions(
            1,
            0,
            vec![Instruction::new(
                Opcode::MoveResult,
                vec![Operand::Register(Register::local(9))],
            )],
        );
        let result = ModuleBuilder::new()
            .class(
                ClassBuilder::new("Lapp/A;")
                    .method(MethodBuilder::new("broken", &[], "V").body(bad)),
            )
            .build();
        assert!(matches!(result, Err(Error::Malformed { .. })));
    }
}
