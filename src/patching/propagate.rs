//! Constant propagation into support class initializers.
//!
//! Structural matching recovers member names that obfuscation renames
//! between builds; those names have to reach runtime code that cannot
//! hardcode them. [`ConstantPropagator`] is that bridge: it collects
//! (static field, string value) pairs and rewrites a pre-existing support
//! class's initializer so each field is assigned its value. The support
//! class then resolves the named members generically at runtime.
//!
//! The rewrite replaces the initializer body entirely: one
//! `const-string` / `sput-object` pair per constant through register `v0`,
//! a final `return-void`, and a declared register count of 1. Everything
//! the initializer previously did is discarded.
//!
//! # Examples
//!
//! ```rust
//! use dexscope::metadata::builder::{ClassBuilder, MethodBuilder, ModuleBuilder};
//! use dexscope::metadata::body::InstructionBody;
//! use dexscope::metadata::flags::AccessFlags;
//! use dexscope::patching::propagate::ConstantPropagator;
//!
//! let module = ModuleBuilder::new()
//!     .class(
//!         ClassBuilder::new("Lapp/Support;")
//!             .field_with_flags(
//!                 "scaleMethod",
//!                 "Ljava/lang/String;",
//!                 AccessFlags::PRIVATE | AccessFlags::STATIC,
//!             )
//!             .method(
//!                 MethodBuilder::new("<clinit>", &[], "V")
//!                     .flags(AccessFlags::STATIC | AccessFlags::CONSTRUCTOR)
//!                     .body(InstructionBody::new(1, 0)),
//!             ),
//!     )
//!     .build()?;
//!
//! let support = module.class_by_type(&"Lapp/Support;".into()).unwrap();
//! let mut propagator = ConstantPropagator::new();
//! propagator.set("scaleMethod", "a");
//! propagator.propagate(&support, "<clinit>")?;
//! # Ok::<(), dexscope::Error>(())
//! ```

use std::sync::Arc;

use crate::analysis::diagnostics::{DiagnosticCategory, Diagnostics};
use crate::assembly::assembler::InstructionAssembler;
use crate::assembly::instruction::Register;
use crate::metadata::class::Class;
use crate::patching::editor::Editor;
use crate::{Error, Result};

/// Collects extracted name constants and writes them into a support class.
#[derive(Debug, Default)]
pub struct ConstantPropagator {
    constants: Vec<(String, String)>,
    diagnostics: Option<Arc<Diagnostics>>,
}

impl ConstantPropagator {
    /// Creates a propagator with no constants.
    #[must_use]
    pub fn new() -> Self {
        ConstantPropagator::default()
    }

    /// Attaches a diagnostics sink recording each rewrite.
    #[must_use]
    pub fn with_diagnostics(mut self, diagnostics: Arc<Diagnostics>) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }

    /// Stages `value` for the static field named `field`.
    ///
    /// Setting the same field again replaces its value in place, keeping
    /// the original emission position.
    pub fn set(&mut self, field: &str, value: &str) -> &mut Self {
        match self.constants.iter_mut().find(|(name, _)| name == field) {
            Some(entry) => entry.1 = value.to_string(),
            None => self
                .constants
                .push((field.to_string(), value.to_string())),
        }
        self
    }

    /// The staged (field, value) pairs, in emission order.
    #[must_use]
    pub fn constants(&self) -> &[(String, String)] {
        &self.constants
    }

    /// Rewrites the body of `class`'s method named `initializer` to assign
    /// every staged constant and nothing else.
    ///
    /// The class and the named static fields must already exist; only the
    /// initializer's instruction body changes. The resulting body declares
    /// one register, loads each value with `const-string v0` and stores it
    /// with `sput-object`, then returns. Running the propagator again over
    /// the result produces the identical body.
    ///
    /// # Errors
    ///
    /// [`Error::Malformed`] when the initializer method or a named field is
    /// missing, or a named field is not static. [`Error::MissingBody`] when
    /// the initializer has no instruction body.
    pub fn propagate(&self, class: &Class, initializer: &str) -> Result<()> {
        let Some(method) = class.method_named(initializer) else {
            return Err(malformed_error!(
                "support class {} has no initializer method {}",
                class.name,
                initializer
            ));
        };

        let mut asm = InstructionAssembler::new();
        for (field_name, value) in &self.constants {
            let Some(field) = class.field_named(field_name) else {
                return Err(malformed_error!(
                    "support class {} has no field {}",
                    class.name,
                    field_name
                ));
            };
            if !field.flags.is_static() {
                return Err(malformed_error!(
                    "support field {}->{} is not static",
                    class.name,
                    field_name
                ));
            }
            asm.const_string(Register::local(0), value)?
                .sput_object(Register::local(0), field.to_ref(class.name.clone()))?;
        }
        asm.return_void()?;
        let sequence = asm.finish();

        let rewritten = method.with_body_mut(|body| {
            let saved = (body.registers, body.ins);
            let mut editor = Editor::new(body);
            editor.declare_registers(1, 0)?;
            if let Err(error) = editor.replace_all(sequence) {
                body.registers = saved.0;
                body.ins = saved.1;
                return Err(error);
            }
            Ok(())
        });
        match rewritten {
            Some(result) => result?,
            None => {
                return Err(Error::MissingBody(format!(
                    "{}->{}{}",
                    class.name,
                    initializer,
                    method.descriptor()
                )))
            }
        }

        if let Some(diagnostics) = &self.diagnostics {
            diagnostics.info(
                DiagnosticCategory::Extraction,
                format!(
                    "propagated {} constant(s) into {}->{}",
                    self.constants.len(),
                    class.name,
                    initializer
                ),
            );
        }
        Ok(())
    }
}
