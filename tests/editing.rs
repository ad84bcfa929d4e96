//! Instruction splicing under branch and register invariants.
//!
//! The editor's contract: a successful insert grows the body by exactly
//! the sequence length and touches nothing else, every pre-existing branch
//! keeps its target instruction, widths widen when stretched distances
//! demand it, and a failed insert leaves the body byte-for-byte as it was.

use dexscope::prelude::*;

/// Assemble a sequence into a fresh body, resolving any labels.
fn body_from(registers: u16, ins: u16, sequence: InstructionSequence) -> InstructionBody {
    let mut body = InstructionBody::new(registers, ins);
    Editor::new(&mut body)
        .insert(0, sequence)
        .expect("fixture body must assemble");
    body
}

fn nops(count: usize) -> InstructionSequence {
    InstructionSequence::from(vec![Instruction::new(Opcode::Nop, vec![]); count])
}

#[test]
fn insertion_grows_the_body_and_preserves_everything_else() -> Result<()> {
    let mut asm = InstructionAssembler::new();
    asm.const4(Register::local(0), 0)?
        .nop()?
        .nop()?
        .nop()?
        .return_void()?;
    let mut body = body_from(2, 0, asm.finish());
    let original = body.clone();

    Editor::new(&mut body).insert(3, nops(2))?;

    assert_eq!(body.len(), original.len() + 2);
    assert_eq!(&body.instructions[..3], &original.instructions[..3]);
    assert_eq!(body.instructions[3].opcode, Opcode::Nop);
    assert_eq!(body.instructions[4].opcode, Opcode::Nop);
    assert_eq!(&body.instructions[5..], &original.instructions[3..]);
    assert_eq!(body.registers, original.registers);
    assert_eq!(body.ins, original.ins);
    Ok(())
}

#[test]
fn straddled_branch_keeps_its_target_instruction() -> Result<()> {
    let mut asm = InstructionAssembler::new();
    asm.const4(Register::local(0), 0)?
        .if_eqz(Register::local(0), "end")?
        .nop()?
        .nop()?
        .label("end")?
        .return_void()?;
    let mut body = body_from(1, 0, asm.finish());

    // The conditional at index 1 spans one code unit of const4 behind it:
    // target address 5, distance 4.
    assert_eq!(body.instructions[1].opcode, Opcode::IfEqz);
    assert_eq!(body.instructions[1].branch_offset(), Some(4));

    // Splice three instructions between the branch and its target.
    Editor::new(&mut body).insert(2, nops(3))?;

    // Same opcode, same encoding, distance stretched by the three inserted
    // code units.
    assert_eq!(body.instructions[1].opcode, Opcode::IfEqz);
    assert_eq!(body.instructions[1].branch_offset(), Some(7));

    let from = body.address_of(1).expect("branch address");
    let landing = body
        .index_at_address(from + 7)
        .expect("branch lands on an instruction boundary");
    assert_eq!(body.instructions[landing].opcode, Opcode::ReturnVoid);
    Ok(())
}

#[test]
fn goto_widens_when_inserted_code_stretches_it() -> Result<()> {
    let mut asm = InstructionAssembler::new();
    asm.goto("end")?
        .nop()?
        .nop()?
        .label("end")?
        .return_void()?;
    let mut body = body_from(1, 0, asm.finish());

    assert_eq!(body.instructions[0].opcode, Opcode::Goto);
    assert_eq!(body.instructions[0].branch_offset(), Some(3));

    Editor::new(&mut body).insert(1, nops(300))?;

    // 303 code units no longer fit the single-unit encoding; the goto
    // grows to goto/16 and the distance accounts for its own extra unit.
    assert_eq!(body.instructions[0].opcode, Opcode::Goto16);
    assert_eq!(body.instructions[0].branch_offset(), Some(304));
    assert_eq!(body.len(), 304);
    assert_eq!(body.code_units(), 305);

    let landing = body
        .index_at_address(304)
        .expect("widened goto lands on an instruction boundary");
    assert_eq!(body.instructions[landing].opcode, Opcode::ReturnVoid);
    Ok(())
}

#[test]
fn failed_insertion_leaves_the_body_untouched() -> Result<()> {
    let mut asm = InstructionAssembler::new();
    asm.const4(Register::local(0), 0)?
        .if_eqz(Register::local(0), "end")?
        .nop()?
        .label("end")?
        .return_void()?;
    let mut body = body_from(1, 0, asm.finish());
    let snapshot = body.clone();

    // Stretching the conditional past its fixed 16-bit encoding must fail
    // as a whole; conditionals have no wider form to fall back to.
    let err = Editor::new(&mut body).insert(2, nops(33_000)).unwrap_err();
    match err {
        Error::BranchOutOfRange { distance, .. } => {
            assert!(distance.unsigned_abs() > 32_767, "distance {distance}")
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(body, snapshot, "failed insert must not mutate");

    // Out-of-bounds offsets fail before anything is examined.
    let out = body.len() + 1;
    let err = Editor::new(&mut body).insert(out, nops(1)).unwrap_err();
    assert!(
        matches!(err, Error::OffsetOutOfBounds { offset, len } if offset == out && len == out - 1)
    );
    assert_eq!(body, snapshot);
    Ok(())
}

#[test]
fn register_safety_is_checked_before_any_mutation() -> Result<()> {
    let mut asm = InstructionAssembler::new();
    asm.nop()?.return_void()?;
    let mut body = body_from(2, 1, asm.finish());
    let snapshot = body.clone();

    // A local beyond the declared file is rejected up front.
    let mut high_local = InstructionAssembler::new();
    high_local.const4(Register::local(5), 1)?;
    let err = Editor::new(&mut body)
        .insert(0, high_local.finish())
        .unwrap_err();
    assert!(matches!(
        err,
        Error::RegisterOutOfRange {
            register: 5,
            count: 2
        }
    ));
    assert_eq!(body, snapshot);

    // So is a parameter index beyond the incoming window.
    let mut high_param = InstructionAssembler::new();
    high_param.move_reg(Register::local(0), Register::parameter(1))?;
    let err = Editor::new(&mut body)
        .insert(0, high_param.finish())
        .unwrap_err();
    assert!(matches!(err, Error::RegisterOutOfRange { count: 2, .. }));
    assert_eq!(body, snapshot);

    // Growing the file first makes the same sequence legal, and every
    // register in the result resolves below the declared count.
    let mut grown = InstructionAssembler::new();
    grown.const4(Register::local(5), 1)?;
    {
        let mut editor = Editor::new(&mut body);
        editor.ensure_registers(6);
        editor.insert(0, grown.finish())?;
    }
    assert_eq!(body.registers, 6);
    assert_eq!(body.len(), snapshot.len() + 1);
    body.validate()?;
    for instruction in &body.instructions {
        for register in instruction.registers() {
            assert!(body.resolve_register(register) < body.registers);
        }
    }
    Ok(())
}

#[test]
fn try_regions_track_spliced_code() -> Result<()> {
    let mut asm = InstructionAssembler::new();
    asm.nop()?.nop()?.nop()?.nop()?.return_void()?;
    let mut body = body_from(1, 0, asm.finish());
    body.try_regions.push(TryRegion {
        start: 1,
        end: 3,
        handler: 4,
        exception: None,
    });

    Editor::new(&mut body).insert(2, nops(2))?;

    let region = &body.try_regions[0];
    assert_eq!(region.start, 1, "start before the splice stays put");
    assert_eq!(region.end, 5, "end beyond the splice moves with it");
    assert_eq!(region.handler, 6, "handler moves with the code it guards");
    body.validate()?;
    Ok(())
}

#[test]
fn prepend_call_hands_parameters_to_the_hook() -> Result<()> {
    let module = ModuleBuilder::new()
        .class(
            ClassBuilder::new("Lapp/Player;").method(
                MethodBuilder::new("seek", &["Landroid/view/MotionEvent;"], "V").body({
                    let mut asm = InstructionAssembler::new();
                    asm.nop().expect("nop").return_void().expect("return");
                    body_from(3, 2, asm.finish())
                }),
            ),
        )
        .build()?;

    let player = module
        .class_by_type(&TypeName::new("Lapp/Player;"))
        .expect("player class");
    let method = player.method_named("seek").expect("seek method");

    method
        .with_body_mut(|body| {
            Editor::new(body).prepend_call(
                MethodRef::new(
                    "Lapp/Hook;",
                    "before",
                    &["Landroid/view/MotionEvent;"],
                    "V",
                ),
                &[Register::parameter(1)],
            )
        })
        .expect("seek has a body")?;

    let body = method.with_body(Clone::clone).expect("seek has a body");
    assert_eq!(body.len(), 3);
    let call = &body.instructions[0];
    assert_eq!(call.opcode, Opcode::InvokeStatic);
    assert_eq!(call.method_ref().map(|m| m.name.as_str()), Some("before"));
    let args: Vec<Register> = call.registers().collect();
    assert_eq!(args, vec![Register::parameter(1)]);
    Ok(())
}
