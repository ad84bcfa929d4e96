#![no_main]

use dexscope::assembly::{InstructionAssembler, Register};
use dexscope::metadata::body::{InstructionBody, TryRegion};
use dexscope::patching::Editor;
use libfuzzer_sys::fuzz_target;

// Each input byte steers one shape decision; the interesting state space is
// branch placement relative to the insertion point.
fuzz_target!(|data: &[u8]| {
    if data.len() < 6 {
        return;
    }

    let body_len = usize::from(data[0]) % 96 + 2;
    let branch_at = usize::from(data[1]) % body_len;
    let target = usize::from(data[2]) % (body_len + 1);
    let offset = usize::from(data[3]) % (body_len + 2);
    let insert_len = usize::from(data[4]) % 48;
    let covered = usize::from(data[5] >> 1) % body_len;

    // Seed body: nops around one conditional branch, resolved by splicing
    // into an empty body.
    let mut seed = InstructionAssembler::new();
    for index in 0..body_len {
        if index == target {
            seed.label("t").expect("label");
        }
        if index == branch_at {
            seed.if_eqz(Register::local(0), "t").expect("branch");
        } else {
            seed.nop().expect("nop");
        }
    }
    if target == body_len {
        seed.label("t").expect("label");
    }

    let mut body = InstructionBody::new(2, 0);
    Editor::new(&mut body)
        .insert(0, seed.finish())
        .expect("seed body must assemble");
    body.try_regions.push(TryRegion {
        start: covered,
        end: covered + 1,
        handler: body_len - 1,
        exception: None,
    });

    let mut patch = InstructionAssembler::new();
    for _ in 0..insert_len {
        patch.nop().expect("nop");
    }
    if data[5] & 1 == 0 && insert_len > 0 {
        patch.goto("x").expect("goto");
        patch.label("x").expect("label");
    }
    let sequence = patch.finish();
    let inserted = sequence.len();

    let snapshot = body.clone();
    match Editor::new(&mut body).insert(offset, sequence) {
        Ok(()) => {
            assert_eq!(body.len(), snapshot.len() + inserted);
            body.validate().expect("spliced body must stay valid");

            let units = body.code_units() as i64;
            for (index, instruction) in body.instructions.iter().enumerate() {
                if let Some(distance) = instruction.branch_offset() {
                    let from = body.address_of(index).expect("indexed instruction") as i64;
                    let landing = from + i64::from(distance);
                    assert!((0..=units).contains(&landing), "branch left the body");
                    assert!(
                        landing == units || body.index_at_address(landing as usize).is_some(),
                        "branch landed mid-instruction"
                    );
                }
            }
        }
        Err(_) => assert_eq!(body, snapshot, "failed insert must not mutate"),
    }
});
