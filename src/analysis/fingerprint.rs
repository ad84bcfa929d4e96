//! Declarative structural fingerprints.
//!
//! A [`Fingerprint`] describes a class (and optionally one of its members)
//! by shape instead of by name: field counts, access flags, superclass,
//! single-method-interface duck-typing, and opcode-level scans over method
//! bodies. Names are the one thing an obfuscator is guaranteed to change
//! between builds, so fingerprints never depend on them unless the author
//! explicitly opts in for a member that is known to survive renaming.
//!
//! Fingerprints are plain data. They are evaluated by the interpreter in
//! [`crate::analysis::matcher`], which walks the predicates in the order the
//! author declared them and short-circuits on the first failure. Authors are
//! expected to declare cheap structural predicates (field counts, flags)
//! before expensive body scans; the matcher does not reorder.
//!
//! # Examples
//!
//! ```rust
//! use dexscope::analysis::fingerprint::{Fingerprint, MethodQuery, Scope};
//!
//! // The gesture class: exactly three fields, one of them the detector,
//! // plus a characteristic callback shape.
//! let gesture = Fingerprint::named("gesture-class")
//!     .with_field_count(3)
//!     .with_field_of_type("Landroid/view/ScaleGestureDetector;")
//!     .implementing_single_method_interface(&["Landroid/view/MotionEvent;"], "V");
//!
//! // A chained fingerprint: search only among the types of the fields of
//! // whatever class "gesture-class" resolved to.
//! let listener = Fingerprint::named("long-press-listener")
//!     .in_scope(Scope::FieldTypesOf("gesture-class".into()))
//!     .with_superclass("Landroid/view/GestureDetector$SimpleOnGestureListener;")
//!     .selecting_method(
//!         MethodQuery::new()
//!             .named("onLongPress")
//!             .with_params(&["Landroid/view/MotionEvent;"]),
//!     );
//! assert_eq!(listener.name(), "long-press-listener");
//! ```

use std::fmt;

use crate::assembly::instruction::Instruction;
use crate::assembly::opcode::{InvocationKind, Opcode};
use crate::metadata::flags::AccessFlags;
use crate::metadata::ty::TypeName;

/// Which classes a fingerprint considers as candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Every class in the module, in declaration order.
    Module,

    /// Only the class an earlier fingerprint resolved to.
    ///
    /// The referenced fingerprint must already be in the run's cache when
    /// this one is evaluated; an unresolved reference yields no candidates.
    ClassOf(String),

    /// The classes that are the field types of an earlier fingerprint's
    /// resolved class, in field declaration order.
    ///
    /// Field types not present in the module are skipped; repeated types
    /// are considered once, at their first occurrence.
    FieldTypesOf(String),
}

/// Selects instructions by opcode identity or opcode category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpcodeSelector {
    /// Exactly this opcode.
    Exact(Opcode),

    /// Any instance field read (`iget` family).
    FieldRead,

    /// Any field write (`iput`/`sput` family).
    FieldWrite,

    /// Any invocation of the given kind.
    Invocation(InvocationKind),
}

impl OpcodeSelector {
    /// Whether `opcode` falls under this selector.
    #[must_use]
    pub fn covers(&self, opcode: Opcode) -> bool {
        match self {
            OpcodeSelector::Exact(wanted) => opcode == *wanted,
            OpcodeSelector::FieldRead => opcode.is_field_read(),
            OpcodeSelector::FieldWrite => opcode.is_field_write(),
            OpcodeSelector::Invocation(kind) => opcode.invocation() == Some(*kind),
        }
    }
}

/// Predicate over the symbol reference an instruction resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceMatch {
    /// Any reference (or none); the opcode alone decides.
    Any,

    /// The instruction references a field of this type.
    FieldOfType(TypeName),

    /// The instruction references a method returning this type.
    MethodReturning(TypeName),

    /// The instruction carries exactly this string literal.
    StringLiteral(String),
}

impl ReferenceMatch {
    /// Whether `instruction`'s resolved reference satisfies this predicate.
    #[must_use]
    pub fn matches(&self, instruction: &Instruction) -> bool {
        match self {
            ReferenceMatch::Any => true,
            ReferenceMatch::FieldOfType(ty) => {
                instruction.field_ref().is_some_and(|f| f.ty == *ty)
            }
            ReferenceMatch::MethodReturning(ty) => {
                instruction.method_ref().is_some_and(|m| m.returns == *ty)
            }
            ReferenceMatch::StringLiteral(value) => {
                instruction.string_value() == Some(value.as_str())
            }
        }
    }
}

/// An instruction-level test: "an instruction covered by `selector` exists
/// whose reference satisfies `reference`".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionQuery {
    /// Which opcodes qualify.
    pub selector: OpcodeSelector,

    /// Constraint on the qualifying instruction's reference.
    pub reference: ReferenceMatch,
}

impl InstructionQuery {
    /// Query for an exact opcode, any reference.
    #[must_use]
    pub fn opcode(opcode: Opcode) -> Self {
        InstructionQuery {
            selector: OpcodeSelector::Exact(opcode),
            reference: ReferenceMatch::Any,
        }
    }

    /// Query for any field read.
    #[must_use]
    pub fn field_read() -> Self {
        InstructionQuery {
            selector: OpcodeSelector::FieldRead,
            reference: ReferenceMatch::Any,
        }
    }

    /// Query for any field write.
    #[must_use]
    pub fn field_write() -> Self {
        InstructionQuery {
            selector: OpcodeSelector::FieldWrite,
            reference: ReferenceMatch::Any,
        }
    }

    /// Query for an invocation of `kind`.
    #[must_use]
    pub fn invocation(kind: InvocationKind) -> Self {
        InstructionQuery {
            selector: OpcodeSelector::Invocation(kind),
            reference: ReferenceMatch::Any,
        }
    }

    /// Constrain the qualifying instruction's reference.
    #[must_use]
    pub fn referencing(mut self, reference: ReferenceMatch) -> Self {
        self.reference = reference;
        self
    }

    /// Whether `instruction` satisfies both halves of the query.
    #[must_use]
    pub fn matches(&self, instruction: &Instruction) -> bool {
        self.selector.covers(instruction.opcode) && self.reference.matches(instruction)
    }
}

/// Shape constraints selecting a method within a matched class.
///
/// Every populated part must hold; `None` parts are unconstrained. A query
/// with all parts `None` selects the class's first declared method.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodQuery {
    /// Exact method name, for members known to survive renaming.
    pub name: Option<String>,

    /// Exact parameter type list.
    pub params: Option<Vec<TypeName>>,

    /// Exact return type.
    pub returns: Option<TypeName>,

    /// An instruction in the method's body must satisfy this query.
    /// Methods without a body never satisfy it.
    pub instruction: Option<InstructionQuery>,
}

impl MethodQuery {
    /// An unconstrained query.
    #[must_use]
    pub fn new() -> Self {
        MethodQuery::default()
    }

    /// Require an exact method name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Require an exact parameter type list.
    #[must_use]
    pub fn with_params(mut self, params: &[&str]) -> Self {
        self.params = Some(params.iter().map(|p| TypeName::new(p)).collect());
        self
    }

    /// Require an exact return type.
    #[must_use]
    pub fn returning(mut self, returns: &str) -> Self {
        self.returns = Some(TypeName::new(returns));
        self
    }

    /// Require the body to contain a satisfying instruction.
    #[must_use]
    pub fn containing(mut self, query: InstructionQuery) -> Self {
        self.instruction = Some(query);
        self
    }
}

/// Shape constraints selecting a field within a matched class.
///
/// Every populated part must hold; `None` parts are unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldQuery {
    /// Exact field name, for members known to survive renaming.
    pub name: Option<String>,

    /// Exact field type.
    pub ty: Option<TypeName>,

    /// The field type's class must exist in the module and extend this type.
    pub ty_superclass: Option<TypeName>,
}

impl FieldQuery {
    /// An unconstrained query.
    #[must_use]
    pub fn new() -> Self {
        FieldQuery::default()
    }

    /// Require an exact field name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Require an exact field type.
    #[must_use]
    pub fn of_type(mut self, ty: &str) -> Self {
        self.ty = Some(TypeName::new(ty));
        self
    }

    /// Require the field type's class to extend the given type.
    #[must_use]
    pub fn whose_type_extends(mut self, superclass: &str) -> Self {
        self.ty_superclass = Some(TypeName::new(superclass));
        self
    }
}

/// Class-level structural predicate.
///
/// Evaluated in declaration order with short-circuit on the first failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// The class declares exactly this many fields.
    FieldCountEquals(usize),

    /// The class's access flags contain all of the given flags.
    AccessFlagsContain(AccessFlags),

    /// The class declares at least one field of this type.
    HasFieldOfType(TypeName),

    /// The class's superclass descriptor equals this type.
    SuperclassIs(TypeName),

    /// The class implements an interface that declares exactly one instance
    /// method, and that method's shape matches.
    ///
    /// Structural duck-typing: the interface is identified by the shape of
    /// its single method, never by its name. The interface class itself must
    /// be present in the module to be verifiable.
    ImplementsSingleMethodInterface {
        /// Required parameter types of the interface's single method.
        params: Vec<TypeName>,
        /// Required return type of the interface's single method.
        returns: TypeName,
    },

    /// The class declares a method satisfying the query.
    ///
    /// Pure constraint; the satisfying method is not reported. Use
    /// [`Fingerprint::selecting_method`] when the method itself is wanted.
    HasMethodWhere(MethodQuery),
}

/// What member of the matched class, if any, the fingerprint resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberSelector {
    /// Resolve the first declared method satisfying the query.
    Method(MethodQuery),

    /// Resolve the first declared field satisfying the query.
    Field(FieldQuery),
}

/// A reusable, declarative description of a class (and optionally one
/// member) to locate by structure.
///
/// The name identifies the fingerprint in the per-run result cache and in
/// one fingerprint's references to another ([`Scope::ClassOf`],
/// [`Scope::FieldTypesOf`]); it has no relation to any name inside the
/// module being matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    name: String,
    scope: Scope,
    predicates: Vec<Predicate>,
    member: Option<MemberSelector>,
}

impl Fingerprint {
    /// Start a fingerprint searching the whole module.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Fingerprint {
            name: name.into(),
            scope: Scope::Module,
            predicates: Vec::new(),
            member: None,
        }
    }

    /// Restrict the candidate set.
    #[must_use]
    pub fn in_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// Require an exact declared field count.
    #[must_use]
    pub fn with_field_count(mut self, count: usize) -> Self {
        self.predicates.push(Predicate::FieldCountEquals(count));
        self
    }

    /// Require the class's access flags to contain `flags`.
    #[must_use]
    pub fn with_access_flags(mut self, flags: AccessFlags) -> Self {
        self.predicates.push(Predicate::AccessFlagsContain(flags));
        self
    }

    /// Require a field of the given type to be declared.
    #[must_use]
    pub fn with_field_of_type(mut self, ty: &str) -> Self {
        self.predicates
            .push(Predicate::HasFieldOfType(TypeName::new(ty)));
        self
    }

    /// Require the superclass descriptor to equal `ty`.
    #[must_use]
    pub fn with_superclass(mut self, ty: &str) -> Self {
        self.predicates
            .push(Predicate::SuperclassIs(TypeName::new(ty)));
        self
    }

    /// Require an implemented single-method interface with this shape.
    #[must_use]
    pub fn implementing_single_method_interface(
        mut self,
        params: &[&str],
        returns: &str,
    ) -> Self {
        self.predicates.push(Predicate::ImplementsSingleMethodInterface {
            params: params.iter().map(|p| TypeName::new(p)).collect(),
            returns: TypeName::new(returns),
        });
        self
    }

    /// Require a method satisfying `query` to be declared.
    #[must_use]
    pub fn with_method_where(mut self, query: MethodQuery) -> Self {
        self.predicates.push(Predicate::HasMethodWhere(query));
        self
    }

    /// Additionally resolve the first method satisfying `query`.
    ///
    /// A candidate class with no satisfying method fails the fingerprint.
    #[must_use]
    pub fn selecting_method(mut self, query: MethodQuery) -> Self {
        self.member = Some(MemberSelector::Method(query));
        self
    }

    /// Additionally resolve the first field satisfying `query`.
    ///
    /// A candidate class with no satisfying field fails the fingerprint.
    #[must_use]
    pub fn selecting_field(mut self, query: FieldQuery) -> Self {
        self.member = Some(MemberSelector::Field(query));
        self
    }

    /// The fingerprint's cache name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The candidate scope.
    #[must_use]
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// The class predicates, in declaration order.
    #[must_use]
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// The member selector, if any.
    #[must_use]
    pub fn member(&self) -> Option<&MemberSelector> {
        self.member.as_ref()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' ({} predicates)", self.name, self.predicates.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::instruction::{Operand, Register};
    use crate::metadata::refs::{FieldRef, MethodRef};

    #[test]
    fn test_predicates_keep_declaration_order() {
        let fp = Fingerprint::named("ordered")
            .with_field_count(3)
            .with_access_flags(AccessFlags::PUBLIC)
            .with_superclass("Ljava/lang/Object;");

        assert_eq!(fp.predicates().len(), 3);
        assert!(matches!(fp.predicates()[0], Predicate::FieldCountEquals(3)));
        assert!(matches!(fp.predicates()[1], Predicate::AccessFlagsContain(_)));
        assert!(matches!(fp.predicates()[2], Predicate::SuperclassIs(_)));
    }

    #[test]
    fn test_opcode_selector_categories() {
        assert!(OpcodeSelector::FieldRead.covers(Opcode::IgetObject));
        assert!(!OpcodeSelector::FieldRead.covers(Opcode::IputObject));
        assert!(OpcodeSelector::FieldWrite.covers(Opcode::SputObject));
        assert!(OpcodeSelector::Invocation(InvocationKind::Static).covers(Opcode::InvokeStatic));
        assert!(!OpcodeSelector::Invocation(InvocationKind::Static).covers(Opcode::InvokeVirtual));
        assert!(OpcodeSelector::Exact(Opcode::Nop).covers(Opcode::Nop));
    }

    #[test]
    fn test_reference_match_field_type() {
        let read = Instruction::new(
            Opcode::IgetObject,
            vec![
                Operand::Register(Register::local(0)),
                Operand::Register(Register::parameter(0)),
                Operand::Field(FieldRef::new("Lapp/A;", "x", "Lapp/Detector;")),
            ],
        );

        assert!(ReferenceMatch::FieldOfType(TypeName::new("Lapp/Detector;")).matches(&read));
        assert!(!ReferenceMatch::FieldOfType(TypeName::new("Lapp/Other;")).matches(&read));
        assert!(ReferenceMatch::Any.matches(&read));
    }

    #[test]
    fn test_reference_match_method_return() {
        let call = Instruction::new(
            Opcode::InvokeInterface,
            vec![
                Operand::Register(Register::local(1)),
                Operand::Method(MethodRef::new("Lapp/I;", "get", &[], "Z")),
            ],
        );

        assert!(ReferenceMatch::MethodReturning(TypeName::new("Z")).matches(&call));
        assert!(!ReferenceMatch::MethodReturning(TypeName::new("V")).matches(&call));
    }

    #[test]
    fn test_reference_match_string_literal() {
        let load = Instruction::new(
            Opcode::ConstString,
            vec![
                Operand::Register(Register::local(0)),
                Operand::String("ad_unit".into()),
            ],
        );

        assert!(ReferenceMatch::StringLiteral("ad_unit".into()).matches(&load));
        assert!(!ReferenceMatch::StringLiteral("other".into()).matches(&load));
    }

    #[test]
    fn test_instruction_query_combines_both_halves() {
        let read = Instruction::new(
            Opcode::IgetObject,
            vec![
                Operand::Register(Register::local(0)),
                Operand::Register(Register::parameter(0)),
                Operand::Field(FieldRef::new("Lapp/A;", "x", "Lapp/Detector;")),
            ],
        );

        let hit = InstructionQuery::field_read()
            .referencing(ReferenceMatch::FieldOfType(TypeName::new("Lapp/Detector;")));
        let wrong_ref = InstructionQuery::field_read()
            .referencing(ReferenceMatch::FieldOfType(TypeName::new("Lapp/Other;")));
        let wrong_opcode = InstructionQuery::invocation(InvocationKind::Static);

        assert!(hit.matches(&read));
        assert!(!wrong_ref.matches(&read));
        assert!(!wrong_opcode.matches(&read));
    }

    #[test]
    fn test_member_selector_replaces_previous() {
        let fp = Fingerprint::named("member")
            .selecting_method(MethodQuery::new().named("first"))
            .selecting_field(FieldQuery::new().of_type("I"));

        assert!(matches!(fp.member(), Some(MemberSelector::Field(_))));
    }

    #[test]
    fn test_display() {
        let fp = Fingerprint::named("scale-listener").with_field_count(2);
        assert_eq!(format!("{fp}"), "'scale-listener' (1 predicates)");
    }
}
