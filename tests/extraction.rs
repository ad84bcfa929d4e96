//! Name extraction and support-class propagation.
//!
//! Obfuscation renames the members a runtime hook needs to reach. These
//! tests locate a gesture handler structurally, pull the renamed member
//! names out of its instruction stream by position, and propagate them as
//! string constants into a support class initializer.

use dexscope::prelude::*;

/// Handler body. The positions matter: the field read holding the callback
/// comes first, the boolean classifier is the second static call (the first
/// static call only normalizes the event), and the callback itself is the
/// lone interface call.
fn handler_body() -> InstructionBody {
    let mut asm = InstructionAssembler::new();
    asm.iget_object(
        Register::local(0),
        Register::parameter(0),
        FieldRef::new("Lapp/q/a;", "b", "Lapp/q/c;"),
    )
    .expect("iget-object")
    .invoke_static(
        &[Register::parameter(1)],
        MethodRef::new(
            "Lapp/u/a;",
            "d",
            &["Landroid/view/MotionEvent;"],
            "Landroid/view/MotionEvent;",
        ),
    )
    .expect("invoke-static d")
    .move_result_object(Register::local(1))
    .expect("move-result-object")
    .invoke_static(
        &[Register::local(1)],
        MethodRef::new("Lapp/u/a;", "e", &["Landroid/view/MotionEvent;"], "Z"),
    )
    .expect("invoke-static e")
    .move_result(Register::local(1))
    .expect("move-result")
    .invoke_interface(
        &[Register::local(0), Register::parameter(1)],
        MethodRef::new("Lapp/q/c;", "f", &["Landroid/view/MotionEvent;"], "Z"),
    )
    .expect("invoke-interface")
    .move_result(Register::local(1))
    .expect("move-result")
    .return_value(Register::local(1))
    .expect("return");
    InstructionBody::with_instructions(4, 2, asm.finish().instructions().to_vec())
}

fn gesture_module() -> Result<DexModule> {
    ModuleBuilder::new()
        .class(
            ClassBuilder::new("Lapp/q/c;")
                .flags(AccessFlags::PUBLIC | AccessFlags::INTERFACE | AccessFlags::ABSTRACT)
                .method(
                    MethodBuilder::new("f", &["Landroid/view/MotionEvent;"], "Z")
                        .flags(AccessFlags::PUBLIC | AccessFlags::ABSTRACT),
                ),
        )
        .class(
            ClassBuilder::new("Lapp/q/a;")
                .superclass("Ljava/lang/Object;")
                .field("b", "Lapp/q/c;")
                .method(
                    MethodBuilder::new("a", &["Landroid/view/MotionEvent;"], "Z")
                        .body(handler_body()),
                ),
        )
        .class(
            ClassBuilder::new("Lapp/u/a;")
                .superclass("Ljava/lang/Object;")
                .method(
                    MethodBuilder::new(
                        "d",
                        &["Landroid/view/MotionEvent;"],
                        "Landroid/view/MotionEvent;",
                    )
                    .flags(AccessFlags::PUBLIC | AccessFlags::STATIC),
                )
                .method(
                    MethodBuilder::new("e", &["Landroid/view/MotionEvent;"], "Z")
                        .flags(AccessFlags::PUBLIC | AccessFlags::STATIC),
                ),
        )
        .class(
            ClassBuilder::new("Lapp/patches/Config;")
                .superclass("Ljava/lang/Object;")
                .flags(AccessFlags::PUBLIC | AccessFlags::FINAL)
                .field_with_flags(
                    "targetField",
                    "Ljava/lang/String;",
                    AccessFlags::PRIVATE | AccessFlags::STATIC,
                )
                .field_with_flags(
                    "scaleMethod",
                    "Ljava/lang/String;",
                    AccessFlags::PRIVATE | AccessFlags::STATIC,
                )
                .field_with_flags(
                    "callbackMethod",
                    "Ljava/lang/String;",
                    AccessFlags::PRIVATE | AccessFlags::STATIC,
                )
                .field_with_flags(
                    "callbackReturns",
                    "Ljava/lang/String;",
                    AccessFlags::PRIVATE | AccessFlags::STATIC,
                )
                .method(
                    MethodBuilder::new("<clinit>", &[], "V")
                        .flags(AccessFlags::STATIC | AccessFlags::CONSTRUCTOR)
                        .body(InstructionBody::with_instructions(
                            1,
                            0,
                            vec![Instruction::new(Opcode::ReturnVoid, vec![])],
                        )),
                ),
        )
        .build()
}

/// Only one class in the module owns a concrete `(MotionEvent)Z` method
/// that calls through an interface.
fn gesture_handler() -> Fingerprint {
    Fingerprint::named("gesture-handler").selecting_method(
        MethodQuery::new()
            .with_params(&["Landroid/view/MotionEvent;"])
            .returning("Z")
            .containing(InstructionQuery::invocation(InvocationKind::Interface)),
    )
}

struct ExtractGestureNames;

impl Patch for ExtractGestureNames {
    fn id(&self) -> &str {
        "extract-gesture-names"
    }

    fn fingerprints(&self) -> Vec<Fingerprint> {
        vec![gesture_handler()]
    }

    fn apply(&self, context: &mut PatchContext<'_>) -> Result<()> {
        let handler = context.matched("gesture-handler")?;
        let method = handler.require_method("gesture-handler")?;

        // Step 1: read the renamed members out of the instruction stream.
        let (field, classifier, callback, returns) = context.scan(&method, |scan| {
            let field = scan.nth_field_read(0)?.name.clone();
            let classifier = scan.nth_invocation_of(InvocationKind::Static, 1)?.name.clone();
            let callback = scan.nth_invocation_of(InvocationKind::Interface, 0)?;
            Ok((
                field,
                classifier,
                callback.name.clone(),
                callback.returns.as_str().to_string(),
            ))
        })?;

        // Step 2: push them into the support class initializer.
        let support_name = TypeName::new("Lapp/patches/Config;");
        let support = context
            .catalog()
            .class_by_type(&support_name)
            .ok_or(Error::TypeNotFound(support_name))?;
        let mut propagator = context.propagator();
        propagator
            .set("targetField", &field)
            .set("scaleMethod", &classifier)
            .set("callbackMethod", &callback)
            .set("callbackReturns", &returns);
        propagator.propagate(&support, "<clinit>")
    }
}

fn initializer_body(module: &DexModule) -> InstructionBody {
    module
        .class_by_type(&TypeName::new("Lapp/patches/Config;"))
        .expect("support class present")
        .method_named("<clinit>")
        .expect("initializer present")
        .with_body(Clone::clone)
        .expect("initializer has a body")
}

#[test]
fn extract_then_propagate_rewrites_the_initializer() -> Result<()> {
    let module = gesture_module()?;
    let mut runner = PatchRunner::new(&module);
    runner.register(ExtractGestureNames);
    runner.run()?;
    assert_eq!(runner.state(), RunState::Committed);

    let body = initializer_body(&module);
    assert_eq!(body.registers, 1, "rewritten initializer declares one register");
    assert_eq!(body.ins, 0);
    assert_eq!(body.len(), 9, "four pairs plus the return");

    let opcodes: Vec<Opcode> = body.instructions.iter().map(|i| i.opcode).collect();
    assert_eq!(
        opcodes,
        vec![
            Opcode::ConstString,
            Opcode::SputObject,
            Opcode::ConstString,
            Opcode::SputObject,
            Opcode::ConstString,
            Opcode::SputObject,
            Opcode::ConstString,
            Opcode::SputObject,
            Opcode::ReturnVoid,
        ],
        "nothing but const/store pairs and a return"
    );

    let expected = [
        ("b", "targetField"),
        ("e", "scaleMethod"),
        ("f", "callbackMethod"),
        ("Z", "callbackReturns"),
    ];
    for (pair, (value, field)) in expected.iter().enumerate() {
        let load = &body.instructions[pair * 2];
        let store = &body.instructions[pair * 2 + 1];
        assert_eq!(load.string_value(), Some(*value), "constant for {field}");
        assert_eq!(
            store.field_ref().map(|f| f.name.as_str()),
            Some(*field),
            "store target for {field}"
        );
        assert_eq!(
            store.field_ref().map(|f| f.class.as_str()),
            Some("Lapp/patches/Config;"),
            "store owner for {field}"
        );
    }
    Ok(())
}

#[test]
fn second_static_call_convention_skips_the_first() -> Result<()> {
    let body = handler_body();
    let scanner = BodyScanner::new(&body, "a");

    assert_eq!(
        scanner.nth_invocation_of(InvocationKind::Static, 0)?.name,
        "d",
        "position zero is the normalizer"
    );
    assert_eq!(
        scanner.nth_invocation_of(InvocationKind::Static, 1)?.name,
        "e",
        "position one is the classifier"
    );

    let callback = scanner.nth_invocation_of(InvocationKind::Interface, 0)?;
    assert_eq!(callback.name, "f");
    assert_eq!(callback.returns.as_str(), "Z", "return type rides along");
    Ok(())
}

#[test]
fn extraction_and_propagation_are_idempotent() -> Result<()> {
    let module = gesture_module()?;

    // Scanning is read-only: two passes over the same body agree.
    let handler = module
        .class_by_type(&TypeName::new("Lapp/q/a;"))
        .expect("handler class present");
    let method = handler.method_named("a").expect("handler method present");
    let scans: Vec<(String, String)> = (0..2)
        .map(|_| {
            method
                .with_body(|body| {
                    let scan = BodyScanner::new(body, "a");
                    Ok::<_, Error>((
                        scan.nth_field_read(0)?.name.clone(),
                        scan.nth_invocation_of(InvocationKind::Static, 1)?.name.clone(),
                    ))
                })
                .expect("handler has a body")
        })
        .collect::<Result<_>>()?;
    assert_eq!(scans[0], scans[1]);

    // Applying the patch twice converges on the same initializer body.
    let mut first_runner = PatchRunner::new(&module);
    first_runner.register(ExtractGestureNames);
    first_runner.run()?;
    let first = initializer_body(&module);

    let mut second_runner = PatchRunner::new(&module);
    second_runner.register(ExtractGestureNames);
    second_runner.run()?;
    let second = initializer_body(&module);

    assert_eq!(first, second, "second application must change nothing");
    Ok(())
}

#[test]
fn absent_extraction_position_is_a_typed_error() {
    let body = handler_body();
    let scanner = BodyScanner::new(&body, "a");

    let err = scanner
        .nth_invocation_of(InvocationKind::Static, 3)
        .unwrap_err();
    match err {
        Error::ExtractionPositionMissing {
            what,
            position,
            method,
        } => {
            assert_eq!(what, "static invocation");
            assert_eq!(position, 3);
            assert_eq!(method, "a");
        }
        other => panic!("unexpected error: {other}"),
    }

    assert!(matches!(
        scanner.nth_field_read(1),
        Err(Error::ExtractionPositionMissing { position: 1, .. })
    ));
}

#[test]
fn propagation_rejects_unknown_field_without_mutation() -> Result<()> {
    let module = gesture_module()?;
    let support = module
        .class_by_type(&TypeName::new("Lapp/patches/Config;"))
        .expect("support class present");
    let before = initializer_body(&module);

    let mut propagator = ConstantPropagator::new();
    propagator.set("targetField", "b").set("absent", "x");
    let err = propagator.propagate(&support, "<clinit>").unwrap_err();
    assert!(matches!(err, Error::Malformed { .. }));

    assert_eq!(
        initializer_body(&module),
        before,
        "failed propagation must not touch the initializer"
    );
    Ok(())
}
