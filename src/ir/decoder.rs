// created = "2026-10-17"
// modified = "2026-10-17"
// driver = "Isaac Clayton"

//! Best-effort decoding of IR programs.
//!
//! Decoding never fails. Unknown opcode bytes become [`Op::Unknown`] and are
//! skipped one byte at a time. An instruction whose operands run past the
//! end of the buffer becomes [`Op::Truncated`] and ends decoding. A concept
//! run that reaches the end of the buffer without END is accepted as is.

use std::collections::BTreeMap;

use crate::ir::END;
use crate::ir::Opcode;
use crate::ir::dequantize_score;

/// A decoded instruction and the byte offset it starts at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Instruction {
    pub offset: usize,
    pub op: Op,
}

/// A decoded operation with its operands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Op {
    Nop,
    Operator { op_id: u8, args: Vec<u8> },
    Assert { concepts: Vec<u8> },
    Ref { index: u8 },
    /// The quantized score; see [`Op::score`].
    Score { quantized: u16 },
    Trace { step: u8, concepts: Vec<u8> },
    State { from: u8, to: u8 },
    Compose { a: u8, b: u8 },
    /// Sub-program offsets are relative to the start of each sub-program.
    Branch {
        condition: u8,
        then_branch: Vec<Instruction>,
        else_branch: Vec<Instruction>,
    },
    Merge { sources: Vec<u8> },
    Call { tool_id: u8, args: Vec<Vec<u8>> },
    Return { concepts: Vec<u8> },
    End,
    Unknown(u8),
    Truncated { opcode: Opcode },
}

impl Op {
    /// The opcode this operation was decoded from, if the byte was known.
    pub fn opcode(&self) -> Option<Opcode> {
        return match self {
            Op::Nop => Some(Opcode::Nop),
            Op::Operator { .. } => Some(Opcode::Op),
            Op::Assert { .. } => Some(Opcode::Assert),
            Op::Ref { .. } => Some(Opcode::Ref),
            Op::Score { .. } => Some(Opcode::Score),
            Op::Trace { .. } => Some(Opcode::Trace),
            Op::State { .. } => Some(Opcode::State),
            Op::Compose { .. } => Some(Opcode::Compose),
            Op::Branch { .. } => Some(Opcode::Branch),
            Op::Merge { .. } => Some(Opcode::Merge),
            Op::Call { .. } => Some(Opcode::Call),
            Op::Return { .. } => Some(Opcode::Return),
            Op::End => Some(Opcode::End),
            Op::Unknown(_) => None,
            Op::Truncated { opcode } => Some(*opcode),
        };
    }

    /// Name used in listings and histograms.
    pub fn mnemonic(&self) -> &'static str {
        return match self {
            Op::Unknown(_) => "UNKNOWN",
            Op::Truncated { .. } => "TRUNCATED",
            other => other.opcode().map(Opcode::mnemonic).unwrap_or("UNKNOWN"),
        };
    }

    /// The reconstructed score of a SCORE instruction.
    pub fn score(&self) -> Option<f64> {
        return match self {
            Op::Score { quantized } => Some(dequantize_score(*quantized)),
            _ => None,
        };
    }

    /// The concept run of ASSERT, TRACE, and RETURN.
    pub fn concepts(&self) -> Option<&[u8]> {
        return match self {
            Op::Assert { concepts } | Op::Trace { concepts, .. } | Op::Return { concepts } => Some(concepts.as_slice()),
            _ => None,
        };
    }
}

/// Aggregate counts over the top-level instructions of a program.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    /// Number of instructions, END and UNKNOWN included.
    pub count: usize,
    /// Instructions per mnemonic.
    pub histogram: BTreeMap<&'static str, usize>,
    /// Concept bytes in ASSERT, TRACE, and RETURN, plus one per REF.
    pub concept_refs: usize,
}

impl Stats {
    fn record(&mut self, op: &Op) {
        self.count += 1;
        *self.histogram.entry(op.mnemonic()).or_default() += 1;
        self.concept_refs += match op {
            Op::Ref { .. } => 1,
            other => other.concepts().map_or(0, |c| c.len()),
        };
    }

    /// Number of instructions with a given mnemonic.
    pub fn occurrences(&self, mnemonic: &str) -> usize {
        return self.histogram.get(mnemonic).copied().unwrap_or(0);
    }
}

/// A decoded program.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Program {
    pub instructions: Vec<Instruction>,
    pub stats: Stats,
    /// Bytes consumed, up to and including the terminating END.
    pub consumed: usize,
}

impl Program {
    /// Every top-level operation with a given opcode.
    pub fn ops(&self, opcode: Opcode) -> impl Iterator<Item = &Op> {
        return self
            .instructions
            .iter()
            .map(|i| &i.op)
            .filter(move |op| op.opcode() == Some(opcode) && !matches!(op, Op::Truncated { .. }));
    }
}

/// Decode one program, stopping after the first top-level END.
pub fn decode(bytes: &[u8]) -> Program {
    let mut reader = Reader { bytes, pos: 0 };
    let mut program = Program::default();
    while !reader.is_done() {
        let offset = reader.pos;
        let op = reader.next_op();
        program.stats.record(&op);
        let stop = matches!(op, Op::End | Op::Truncated { .. });
        program.instructions.push(Instruction { offset, op });
        if stop {
            break;
        }
    }
    program.consumed = reader.pos;
    return program;
}

/// Decode back-to-back programs until the buffer is exhausted.
///
/// Instruction offsets are relative to the start of each program.
pub fn decode_stream(bytes: &[u8]) -> Vec<Program> {
    let mut programs = Vec::new();
    let mut rest = bytes;
    while !rest.is_empty() {
        let program = decode(rest);
        let truncated = program
            .instructions
            .last()
            .is_some_and(|i| matches!(i.op, Op::Truncated { .. }));
        rest = &rest[program.consumed..];
        programs.push(program);
        if truncated {
            break;
        }
    }
    return programs;
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn is_done(&self) -> bool {
        return self.pos >= self.bytes.len();
    }

    fn byte(&mut self) -> Option<u8> {
        let byte = *self.bytes.get(self.pos)?;
        self.pos += 1;
        return Some(byte);
    }

    fn take(&mut self, len: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(len)?;
        let slice = self.bytes.get(self.pos..end)?;
        self.pos = end;
        return Some(slice);
    }

    /// Read up to END, consuming it, or to the end of the buffer.
    fn run(&mut self) -> Vec<u8> {
        let bytes: &'a [u8] = self.bytes;
        let rest = &bytes[self.pos..];
        let len = rest.iter().position(|b| *b == END).unwrap_or(rest.len());
        self.pos += len;
        // Skip END if present.
        if self.pos < self.bytes.len() {
            self.pos += 1;
        }
        return rest[..len].to_vec();
    }

    /// Consume a trailing END if the next byte is one.
    fn optional_end(&mut self) {
        if self.bytes.get(self.pos) == Some(&END) {
            self.pos += 1;
        }
    }

    fn next_op(&mut self) -> Op {
        let Some(byte) = self.byte() else {
            return Op::End;
        };
        let Some(opcode) = Opcode::from_byte(byte) else {
            return Op::Unknown(byte);
        };
        return match self.operands(opcode) {
            Some(op) => op,
            None => {
                self.pos = self.bytes.len();
                Op::Truncated { opcode }
            }
        };
    }

    fn operands(&mut self, opcode: Opcode) -> Option<Op> {
        let op = match opcode {
            Opcode::Nop => Op::Nop,
            Opcode::End => Op::End,
            Opcode::Op => {
                let op_id = self.byte()?;
                let arity = self.byte()?;
                let args = self.take(arity as usize)?.to_vec();
                Op::Operator { op_id, args }
            }
            Opcode::Assert => Op::Assert { concepts: self.run() },
            Opcode::Ref => Op::Ref { index: self.byte()? },
            Opcode::Score => {
                let high = self.byte()?;
                let low = self.byte()?;
                Op::Score { quantized: u16::from_be_bytes([high, low]) }
            }
            Opcode::Trace => {
                let step = self.byte()?;
                Op::Trace { step, concepts: self.run() }
            }
            Opcode::State => Op::State { from: self.byte()?, to: self.byte()? },
            Opcode::Compose => Op::Compose { a: self.byte()?, b: self.byte()? },
            Opcode::Branch => {
                let condition = self.byte()?;
                let then_len = self.byte()?;
                let then_bytes = self.take(then_len as usize)?;
                let else_len = self.byte()?;
                let else_bytes = self.take(else_len as usize)?;
                Op::Branch {
                    condition,
                    then_branch: decode_nested(then_bytes),
                    else_branch: decode_nested(else_bytes),
                }
            }
            Opcode::Merge => {
                let count = self.byte()?;
                let sources = self.take(count as usize)?.to_vec();
                self.optional_end();
                Op::Merge { sources }
            }
            Opcode::Call => {
                let tool_id = self.byte()?;
                let count = self.byte()?;
                let mut args = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    let len = self.byte()?;
                    args.push(self.take(len as usize)?.to_vec());
                }
                self.optional_end();
                Op::Call { tool_id, args }
            }
            Opcode::Return => Op::Return { concepts: self.run() },
        };
        return Some(op);
    }
}

/// Decode a whole sub-program, END instructions included.
fn decode_nested(bytes: &[u8]) -> Vec<Instruction> {
    let mut reader = Reader { bytes, pos: 0 };
    let mut instructions = Vec::new();
    while !reader.is_done() {
        let offset = reader.pos;
        let op = reader.next_op();
        let stop = matches!(op, Op::Truncated { .. });
        instructions.push(Instruction { offset, op });
        if stop {
            break;
        }
    }
    return instructions;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::IrBuilder;

    fn ops(bytes: &[u8]) -> Vec<Op> {
        return decode(bytes).instructions.into_iter().map(|i| i.op).collect();
    }

    #[test]
    fn empty_buffer() {
        let program = decode(&[]);
        assert!(program.instructions.is_empty());
        assert_eq!(program.stats.count, 0);
    }

    #[test]
    fn decodes_built_program() {
        let bytes = IrBuilder::new()
            .trace(0u8, &[1, 2])
            .assert(&[3])
            .reference(4)
            .score(0.5)
            .ret(&[5])
            .build();
        assert_eq!(
            ops(&bytes),
            vec![
                Op::Trace { step: 0, concepts: vec![1, 2] },
                Op::Assert { concepts: vec![3] },
                Op::Ref { index: 4 },
                Op::Score { quantized: 32768 },
                Op::Return { concepts: vec![5] },
                Op::End,
            ]
        );
    }

    #[test]
    fn offsets_are_recorded() {
        let bytes = IrBuilder::new().nop().reference(1).nop().build();
        let offsets: Vec<usize> = decode(&bytes).instructions.iter().map(|i| i.offset).collect();
        assert_eq!(offsets, vec![0, 1, 3, 4]);
    }

    #[test]
    fn stats_count_histogram_and_concepts() {
        let bytes = IrBuilder::new()
            .assert(&[1, 2])
            .assert(&[3])
            .reference(9)
            .trace(1u8, &[4, 5, 6])
            .build();
        let stats = decode(&bytes).stats;
        assert_eq!(stats.count, 5);
        assert_eq!(stats.occurrences("ASSERT"), 2);
        assert_eq!(stats.occurrences("END"), 1);
        assert_eq!(stats.occurrences("CALL"), 0);
        assert_eq!(stats.concept_refs, 2 + 1 + 1 + 3);
    }

    #[test]
    fn unknown_bytes_are_skipped_one_at_a_time() {
        assert_eq!(ops(&[0x42, 0x43, 0x00]), vec![Op::Unknown(0x42), Op::Unknown(0x43), Op::Nop]);
        assert_eq!(decode(&[0x42]).stats.occurrences("UNKNOWN"), 1);
    }

    #[test]
    fn truncated_operands_stop_decoding() {
        assert_eq!(ops(&[0x00, 0x04, 0x12]), vec![Op::Nop, Op::Truncated { opcode: Opcode::Score }]);
        assert_eq!(ops(&[0x01, 1, 3, 0]), vec![Op::Truncated { opcode: Opcode::Op }]);
        assert_eq!(ops(&[0x0A, 1, 1, 5, b'a']), vec![Op::Truncated { opcode: Opcode::Call }]);
        assert_eq!(decode(&[0x06, 1]).consumed, 2);
    }

    #[test]
    fn run_without_end_is_accepted() {
        assert_eq!(ops(&[0x02, 1, 2]), vec![Op::Assert { concepts: vec![1, 2] }]);
    }

    #[test]
    fn decode_stops_at_end() {
        let program = decode(&[0x00, END, 0x00]);
        assert_eq!(program.instructions.len(), 2);
        assert_eq!(program.consumed, 2);
    }

    #[test]
    fn decode_stream_splits_programs() {
        let mut bytes = IrBuilder::new().nop().build();
        bytes.extend(IrBuilder::new().reference(1).build());
        let programs = decode_stream(&bytes);
        assert_eq!(programs.len(), 2);
        assert_eq!(programs[1].instructions[0].op, Op::Ref { index: 1 });
    }

    #[test]
    fn nested_branch() {
        let inner = IrBuilder::new().reference(7).build();
        let mut builder = IrBuilder::new();
        builder.branch(2, &inner, &[0x00]).unwrap();
        let program = decode(&builder.build());
        assert_eq!(
            program.instructions[0].op,
            Op::Branch {
                condition: 2,
                then_branch: vec![
                    Instruction { offset: 0, op: Op::Ref { index: 7 } },
                    Instruction { offset: 2, op: Op::End },
                ],
                else_branch: vec![Instruction { offset: 0, op: Op::Nop }],
            }
        );
        // Nested instructions do not count.
        assert_eq!(program.stats.count, 2);
    }

    #[test]
    fn call_and_merge() {
        let bytes = IrBuilder::new().call(3, &["x", "yz"]).merge(&[1, 2]).build();
        assert_eq!(
            ops(&bytes),
            vec![
                Op::Call { tool_id: 3, args: vec![b"x".to_vec(), b"yz".to_vec()] },
                Op::Merge { sources: vec![1, 2] },
                Op::End,
            ]
        );
    }

    #[test]
    fn merge_may_carry_end_as_source_id() {
        let bytes = IrBuilder::new().merge(&[END]).build();
        assert_eq!(ops(&bytes), vec![Op::Merge { sources: vec![END] }, Op::End]);
    }
}
