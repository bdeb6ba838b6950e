// created = "2026-10-17"
// modified = "2026-10-17"
// driver = "Isaac Clayton"

//! Builder and decoder agree on every opcode, and decoding arbitrary bytes
//! never panics.

use proptest::prelude::*;

use confluence::ir::END;
use confluence::ir::Instruction;
use confluence::ir::IrBuilder;
use confluence::ir::Op;
use confluence::ir::Opcode;
use confluence::ir::decode;
use confluence::ir::decode_stream;
use confluence::ir::dequantize_score;
use confluence::ir::quantize_score;

/// Decode a program and return its first instruction.
fn first(bytes: &[u8]) -> Op {
    return decode(bytes).instructions.remove(0).op;
}

fn concepts() -> impl Strategy<Value = Vec<u8>> {
    return prop::collection::vec(0..END, 0..40);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn op_round_trip(op_id in any::<u8>(), args in prop::collection::vec(any::<u8>(), 0..=255)) {
        let bytes = IrBuilder::new().op(op_id, &args).build();
        prop_assert_eq!(first(&bytes), Op::Operator { op_id, args });
    }

    #[test]
    fn assert_round_trip(c in concepts()) {
        prop_assert_eq!(first(&IrBuilder::new().assert(&c).build()), Op::Assert { concepts: c });
    }

    #[test]
    fn ref_round_trip(index in any::<u8>()) {
        prop_assert_eq!(first(&IrBuilder::new().reference(index).build()), Op::Ref { index });
    }

    #[test]
    fn score_round_trip(score in 0.0..=1.0f64) {
        let op = first(&IrBuilder::new().score(score).build());
        let decoded = op.score().unwrap();
        prop_assert!((decoded - score).abs() <= 1.0 / 65535.0);
        prop_assert_eq!(op, Op::Score { quantized: quantize_score(score) });
    }

    #[test]
    fn trace_round_trip(step in any::<u8>(), c in concepts()) {
        let bytes = IrBuilder::new().trace(step, &c).build();
        prop_assert_eq!(first(&bytes), Op::Trace { step, concepts: c });
    }

    #[test]
    fn state_round_trip(from in any::<u8>(), to in any::<u8>()) {
        prop_assert_eq!(first(&IrBuilder::new().state(from, to).build()), Op::State { from, to });
    }

    #[test]
    fn compose_round_trip(a in any::<u8>(), b in any::<u8>()) {
        prop_assert_eq!(first(&IrBuilder::new().compose(a, b).build()), Op::Compose { a, b });
    }

    #[test]
    fn merge_round_trip(sources in prop::collection::vec(any::<u8>(), 0..=255)) {
        let bytes = IrBuilder::new().merge(&sources).build();
        let program = decode(&bytes);
        prop_assert_eq!(&program.instructions[0].op, &Op::Merge { sources });
        prop_assert_eq!(program.instructions.len(), 2);
    }

    #[test]
    fn call_round_trip(
        tool_id in any::<u8>(),
        args in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..20), 0..8),
    ) {
        let bytes = IrBuilder::new().call(tool_id, &args).build();
        let program = decode(&bytes);
        prop_assert_eq!(&program.instructions[0].op, &Op::Call { tool_id, args });
        prop_assert_eq!(program.instructions.len(), 2);
    }

    #[test]
    fn return_round_trip(c in concepts()) {
        prop_assert_eq!(first(&IrBuilder::new().ret(&c).build()), Op::Return { concepts: c });
    }

    #[test]
    fn branch_round_trip(condition in any::<u8>(), then_refs in prop::collection::vec(any::<u8>(), 0..20), else_c in concepts()) {
        let mut then_builder = IrBuilder::new();
        for index in &then_refs {
            then_builder.reference(*index);
        }
        let then_program = then_builder.build();
        let else_program = IrBuilder::new().assert(&else_c).build();

        let mut builder = IrBuilder::new();
        builder.branch(condition, &then_program, &else_program).unwrap();
        let Op::Branch { condition: c, then_branch, else_branch } = first(&builder.build()) else {
            return Err(TestCaseError::fail("expected BRANCH"));
        };
        prop_assert_eq!(c, condition);

        let refs: Vec<u8> = then_branch
            .iter()
            .filter_map(|i| match i.op {
                Op::Ref { index } => Some(index),
                _ => None,
            })
            .collect();
        prop_assert_eq!(refs, then_refs);
        prop_assert_eq!(&else_branch[0].op, &Op::Assert { concepts: else_c });
        prop_assert_eq!(&else_branch[1].op, &Op::End);
    }

    #[test]
    fn decode_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let program = decode(&bytes);
        prop_assert!(program.consumed <= bytes.len());
        prop_assert_eq!(program.stats.count, program.instructions.len());
        let histogram_total: usize = program.stats.histogram.values().sum();
        prop_assert_eq!(histogram_total, program.stats.count);

        let programs = decode_stream(&bytes);
        let consumed: usize = programs.iter().map(|p| p.consumed).sum();
        prop_assert!(consumed <= bytes.len());
    }

    #[test]
    fn offsets_increase(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        let offsets: Vec<usize> = decode(&bytes).instructions.iter().map(|i| i.offset).collect();
        prop_assert!(offsets.windows(2).all(|w| w[0] < w[1]));
    }
}

#[test]
fn nop_and_end_round_trip() {
    let program = decode(&IrBuilder::new().nop().end().build());
    let ops: Vec<&Op> = program.instructions.iter().map(|i| &i.op).collect();
    assert_eq!(ops, vec![&Op::Nop, &Op::End]);
}

#[test]
fn every_opcode_appears_in_one_program() {
    let mut builder = IrBuilder::new();
    builder
        .nop()
        .op(1, &[2])
        .assert(&[3])
        .reference(4)
        .score(0.25)
        .trace(0u8, &[5])
        .state(6, 7)
        .compose(8, 9);
    builder.branch(1, &[0x00], &[]).unwrap();
    builder.merge(&[1]).call(2, &["a"]).ret(&[10]).end();

    let program = decode(&builder.build());
    for opcode in Opcode::ALL {
        assert_eq!(program.stats.occurrences(opcode.mnemonic()), 1, "{}", opcode.mnemonic());
    }
    assert_eq!(program.stats.count, Opcode::ALL.len());
    assert_eq!(program.stats.concept_refs, 1 + 1 + 1 + 1);
}

#[test]
fn score_extremes() {
    assert_eq!(dequantize_score(quantize_score(0.0)), 0.0);
    assert_eq!(dequantize_score(quantize_score(1.0)), 1.0);
    assert_eq!(first(&[0x04, 0x80, 0x00]), Op::Score { quantized: 0x8000 });
}

#[test]
fn stray_bytes_after_end_are_not_decoded() {
    let program = decode(&[0x00, END, 0x42]);
    assert_eq!(
        program.instructions,
        vec![
            Instruction { offset: 0, op: Op::Nop },
            Instruction { offset: 1, op: Op::End },
        ]
    );
}
