// created = "2026-10-17"
// modified = "2026-10-17"
// driver = "Isaac Clayton"

//! Human-readable listings of decoded programs.

use std::fmt::Write;

use glyph::ConceptDictionary;

use crate::ir::Instruction;
use crate::ir::Op;
use crate::ir::Program;
use crate::ir::StepKind;
use crate::ir::dequantize_score;

/// Render a program as one line per instruction, with concept bytes looked
/// up in `dictionary`. Unknown concepts print as `#n`.
///
/// ```text
/// 0000  TRACE query [sky blue]
/// 0005  ASSERT [sky blue]
/// 0009  SCORE 0.9000
/// ```
pub fn render<D: ConceptDictionary + ?Sized>(program: &Program, dictionary: &D) -> String {
    let mut out = String::new();
    render_into(&mut out, &program.instructions, dictionary, 0);
    return out;
}

fn render_into<D: ConceptDictionary + ?Sized>(out: &mut String, instructions: &[Instruction], dictionary: &D, depth: usize) {
    for instruction in instructions {
        let indent = "  ".repeat(depth);
        let line = describe(&instruction.op, dictionary);
        // Writing to a String can not fail.
        let _ = writeln!(out, "{indent}{:04}  {line}", instruction.offset);

        if let Op::Branch { then_branch, else_branch, .. } = &instruction.op {
            let _ = writeln!(out, "{indent}  then:");
            render_into(out, then_branch, dictionary, depth + 2);
            let _ = writeln!(out, "{indent}  else:");
            render_into(out, else_branch, dictionary, depth + 2);
        }
    }
}

fn describe<D: ConceptDictionary + ?Sized>(op: &Op, dictionary: &D) -> String {
    let name = op.mnemonic();
    return match op {
        Op::Nop | Op::End => name.to_string(),
        Op::Operator { op_id, args } => format!("{name} {op_id} {args:?}"),
        Op::Assert { concepts } | Op::Return { concepts } => {
            format!("{name} [{}]", words(concepts, dictionary))
        }
        Op::Ref { index } => format!("{name} {}", word(*index, dictionary)),
        Op::Score { quantized } => format!("{name} {:.4}", dequantize_score(*quantized)),
        Op::Trace { step, concepts } => {
            let kind = StepKind::from_byte(*step).map_or_else(|| format!("step{step}"), |k| k.name().to_string());
            format!("{name} {kind} [{}]", words(concepts, dictionary))
        }
        Op::State { from, to } => format!("{name} {from} -> {to}"),
        Op::Compose { a, b } => format!("{name} {a} {b} = {}", a ^ b),
        Op::Branch { condition, .. } => format!("{name} if {condition}"),
        Op::Merge { sources } => format!("{name} {sources:?}"),
        Op::Call { tool_id, args } => {
            let args: Vec<String> = args.iter().map(|a| format!("{:?}", String::from_utf8_lossy(a))).collect();
            format!("{name} tool{tool_id}({})", args.join(", "))
        }
        Op::Unknown(byte) => format!("{name} 0x{byte:02x}"),
        Op::Truncated { opcode } => format!("{name} {}", opcode.mnemonic()),
    };
}

fn word<D: ConceptDictionary + ?Sized>(index: u8, dictionary: &D) -> String {
    return match dictionary.get_concept(index) {
        Some(concept) => concept.to_string(),
        None => format!("#{index}"),
    };
}

fn words<D: ConceptDictionary + ?Sized>(concepts: &[u8], dictionary: &D) -> String {
    return concepts
        .iter()
        .map(|c| word(*c, dictionary))
        .collect::<Vec<_>>()
        .join(" ");
}
