//! Method definitions.
//!
//! A [`Method`] owns its optional [`InstructionBody`] behind a read-write
//! lock: fingerprint evaluation takes shared read access from any number of
//! threads, while the editor's mutations take the exclusive write side. The
//! closure-based [`Method::with_body`] / [`Method::with_body_mut`] accessors
//! keep lock guards from escaping into calling code.
//!
//! Abstract and native methods carry no body; every accessor treats that as a
//! normal `None`, not an error.

use std::sync::{Arc, RwLock};

use crate::metadata::body::InstructionBody;
use crate::metadata::flags::AccessFlags;
use crate::metadata::refs::MethodRef;
use crate::metadata::ty::TypeName;

/// A reference-counted method definition.
pub type MethodRc = Arc<Method>;

/// An append-only, thread-safe list of methods.
pub type MethodList = Arc<boxcar::Vec<MethodRc>>;

/// One method definition, owned by exactly one class.
#[derive(Debug)]
pub struct Method {
    /// Method name
    pub name: String,
    /// Access flags
    pub flags: AccessFlags,
    /// Parameter types, in declaration order
    pub params: Vec<TypeName>,
    /// Return type
    pub returns: TypeName,
    body: RwLock<Option<InstructionBody>>,
}

impl Method {
    /// Create a method definition. `body` is `None` for abstract and native
    /// methods.
    pub fn new(
        name: impl Into<String>,
        flags: AccessFlags,
        params: Vec<TypeName>,
        returns: impl Into<TypeName>,
        body: Option<InstructionBody>,
    ) -> Self {
        Method {
            name: name.into(),
            flags,
            params,
            returns: returns.into(),
            body: RwLock::new(body),
        }
    }

    /// Returns `true` if this method carries an instruction body.
    pub fn has_body(&self) -> bool {
        with_read!(self.body, |body: &Option<InstructionBody>| body.is_some())
    }

    /// Run `f` with shared access to the body, or `None` for bodyless
    /// methods.
    pub fn with_body<R>(&self, f: impl FnOnce(&InstructionBody) -> R) -> Option<R> {
        with_read!(self.body, |body: &Option<InstructionBody>| body
            .as_ref()
            .map(f))
    }

    /// Run `f` with exclusive access to the body, or `None` for bodyless
    /// methods.
    pub fn with_body_mut<R>(&self, f: impl FnOnce(&mut InstructionBody) -> R) -> Option<R> {
        with_write!(self.body, |body: &mut Option<InstructionBody>| body
            .as_mut()
            .map(f))
    }

    /// Install or replace the instruction body.
    pub fn set_body(&self, body: InstructionBody) {
        let mut guard = write_lock!(self.body);
        *guard = Some(body);
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

    /// The symbolic reference to this method as declared by `class`.
    #[must_use]
    pub fn to_ref(&self, class: TypeName) -> MethodRef {
        MethodRef {
            class,
            name: self.name.clone(),
            params: self.params.clone(),
            returns: self.returns.clone(),
        }
    }

    /// Returns `true` if parameter and return types equal the given shape.
    #[must_use]
    pub fn matches_shape(&self, params: &[TypeName], returns: &TypeName) -> bool {
        self.params == params && &self.returns == returns
    }

    /// Returns `true` for methods dispatched directly rather than through a
    /// vtable: static methods, constructors and private methods.
    #[must_use]
    pub fn is_direct(&self) -> bool {
        self.flags.is_static()
            || self.flags.is_constructor()
            || self.flags.contains(AccessFlags::PRIVATE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::opcode::Opcode;
    use crate::assembly::Instruction;

    fn concrete_method() -> Method {
        Method::new(
            "onTouchEvent",
            AccessFlags::PUBLIC,
            vec![TypeName::new("Landroid/view/MotionEvent;")],
            "Z",
            Some(InstructionBody::with_instructions(
                2,
                2,
                vec![Instruction::new(Opcode::ReturnVoid, vec![])],
            )),
        )
    }

    #[test]
    fn test_method_has_body() {
        assert!(concrete_method().has_body());

        let abstract_method = Method::new(
            "onScale",
            AccessFlags::PUBLIC | AccessFlags::ABSTRACT,
            vec![],
            "V",
            None,
        );
        assert!(!abstract_method.has_body());
        assert_eq!(abstract_method.with_body(|b| b.len()), None);
    }

    #[test]
    fn test_method_with_body() {
        let method = concrete_method();
        assert_eq!(method.with_body(|b| b.len()), Some(1));
        method.with_body_mut(|b| b.instructions.push(Instruction::new(Opcode::Nop, vec![])));
        assert_eq!(method.with_body(|b| b.len()), Some(2));
    }

    #[test]
    fn test_method_set_body() {
        let method = Method::new("later", AccessFlags::PUBLIC, vec![], "V", None);
        assert!(!method.has_body());
        method.set_body(InstructionBody::new(1, 0));
        assert!(method.has_body());
    }

    #[test]
    fn test_method_descriptor_and_ref() {
        let method = concrete_method();
        assert_eq!(method.descriptor(), "(Landroid/view/MotionEvent;)Z");

        let mref = method.to_ref(TypeName::new("Lapp/Player;"));
        assert_eq!(
            format!("{}", mref),
            "Lapp/Player;->onTouchEvent(Landroid/view/MotionEvent;)Z"
        );
    }

    #[test]
    fn test_method_matches_shape() {
        let method = concrete_method();
        let event = TypeName::new("Landroid/view/MotionEvent;");
        assert!(method.matches_shape(&[event.clone()], &TypeName::new("Z")));
        assert!(!method.matches_shape(&[event], &TypeName::void()));
        assert!(!method.matches_shape(&[], &TypeName::new("Z")));
    }

    #[test]
    fn test_method_is_direct() {
        let direct = Method::new("<init>", AccessFlags::CONSTRUCTOR, vec![], "V", None);
        assert!(direct.is_direct());

        let static_m = Method::new("of", AccessFlags::STATIC, vec![], "V", None);
        assert!(static_m.is_direct());

        let virtual_m = Method::new("run", AccessFlags::PUBLIC, vec![], "V", None);
        assert!(!virtual_m.is_direct());
    }
}
