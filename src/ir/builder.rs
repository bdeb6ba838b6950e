// created = "2026-10-17"
// modified = "2026-10-17"
// driver = "Isaac Clayton"

//! Incremental construction of IR programs.

use crate::error::Error;
use crate::error::Result;
use crate::ir::END;
use crate::ir::MAX_OPERAND_LEN;
use crate::ir::Opcode;
use crate::ir::quantize_score;

/// Appends instructions to a byte buffer.
///
/// Every method writes one instruction and returns the builder, so calls
/// chain. Operands that do not fit their one-byte length prefix are
/// truncated to 255 entries, except BRANCH sub-programs, which are an error.
///
/// ```
/// use confluence::ir::{IrBuilder, decode};
///
/// let bytes = IrBuilder::new().assert(&[1, 2]).score(0.5).build();
/// assert_eq!(decode(&bytes).stats.count, 3);
/// ```
#[derive(Clone, Debug, Default)]
pub struct IrBuilder {
    buf: Vec<u8>,
    ended: bool,
}

impl IrBuilder {
    pub fn new() -> IrBuilder {
        return IrBuilder::default();
    }

    /// Bytes written so far.
    pub fn as_bytes(&self) -> &[u8] {
        return &self.buf;
    }

    pub fn len(&self) -> usize {
        return self.buf.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.buf.is_empty();
    }

    pub fn nop(&mut self) -> &mut Self {
        return self.opcode(Opcode::Nop);
    }

    /// OP: an operator with up to 255 one-byte arguments.
    pub fn op(&mut self, op_id: u8, args: &[u8]) -> &mut Self {
        let args = capped(args, "OP arguments");
        self.opcode(Opcode::Op);
        self.buf.push(op_id);
        self.buf.push(args.len() as u8);
        self.buf.extend_from_slice(args);
        return self;
    }

    /// ASSERT: a constraint as a concept run.
    pub fn assert(&mut self, concepts: &[u8]) -> &mut Self {
        self.opcode(Opcode::Assert);
        self.concept_run(concepts);
        return self;
    }

    /// REF: a reference to a concept index.
    pub fn reference(&mut self, index: u8) -> &mut Self {
        self.opcode(Opcode::Ref);
        self.buf.push(index);
        return self;
    }

    /// SCORE: a confidence in `[0, 1]`, quantized to 16 bits.
    pub fn score(&mut self, score: f64) -> &mut Self {
        self.opcode(Opcode::Score);
        self.buf.extend_from_slice(&quantize_score(score).to_be_bytes());
        return self;
    }

    /// TRACE: one reasoning step as a concept run.
    pub fn trace(&mut self, step: impl Into<u8>, concepts: &[u8]) -> &mut Self {
        self.opcode(Opcode::Trace);
        self.buf.push(step.into());
        self.concept_run(concepts);
        return self;
    }

    /// STATE: a transition between two states.
    pub fn state(&mut self, from: u8, to: u8) -> &mut Self {
        self.opcode(Opcode::State);
        self.buf.push(from);
        self.buf.push(to);
        return self;
    }

    /// COMPOSE: two concepts whose composition is `a ^ b`.
    pub fn compose(&mut self, a: u8, b: u8) -> &mut Self {
        self.opcode(Opcode::Compose);
        self.buf.push(a);
        self.buf.push(b);
        return self;
    }

    /// BRANCH: two nested sub-programs selected by `condition`.
    ///
    /// Sub-programs are written as given, without an appended END. Either
    /// one longer than 255 bytes is rejected and nothing is written.
    pub fn branch(&mut self, condition: u8, then_program: &[u8], else_program: &[u8]) -> Result<&mut Self> {
        if then_program.len() > MAX_OPERAND_LEN {
            return Err(Error::BranchTooLong { branch: "then", len: then_program.len() });
        }
        if else_program.len() > MAX_OPERAND_LEN {
            return Err(Error::BranchTooLong { branch: "else", len: else_program.len() });
        }
        self.opcode(Opcode::Branch);
        self.buf.push(condition);
        self.buf.push(then_program.len() as u8);
        self.buf.extend_from_slice(then_program);
        self.buf.push(else_program.len() as u8);
        self.buf.extend_from_slice(else_program);
        return Ok(self);
    }

    /// MERGE: the ids of merged sources.
    pub fn merge(&mut self, sources: &[u8]) -> &mut Self {
        let sources = capped(sources, "MERGE sources");
        self.opcode(Opcode::Merge);
        self.buf.push(sources.len() as u8);
        self.buf.extend_from_slice(sources);
        self.buf.push(END);
        return self;
    }

    /// CALL: a tool invocation with length-prefixed arguments.
    pub fn call<A: AsRef<[u8]>>(&mut self, tool_id: u8, args: &[A]) -> &mut Self {
        let args = capped(args, "CALL arguments");
        self.opcode(Opcode::Call);
        self.buf.push(tool_id);
        self.buf.push(args.len() as u8);
        for arg in args {
            let arg = capped(arg.as_ref(), "CALL argument bytes");
            self.buf.push(arg.len() as u8);
            self.buf.extend_from_slice(arg);
        }
        self.buf.push(END);
        return self;
    }

    /// RETURN: the final answer as a concept run.
    pub fn ret(&mut self, concepts: &[u8]) -> &mut Self {
        self.opcode(Opcode::Return);
        self.concept_run(concepts);
        return self;
    }

    /// END: terminate the program.
    pub fn end(&mut self) -> &mut Self {
        self.buf.push(END);
        self.ended = true;
        return self;
    }

    /// The finished program, with a trailing END unless the last
    /// instruction written was END.
    pub fn build(&self) -> Vec<u8> {
        let mut bytes = self.buf.clone();
        if !self.ended {
            bytes.push(END);
        }
        return bytes;
    }

    fn opcode(&mut self, opcode: Opcode) -> &mut Self {
        self.buf.push(opcode.byte());
        self.ended = false;
        return self;
    }

    fn concept_run(&mut self, concepts: &[u8]) {
        let before = self.buf.len();
        self.buf.extend(concepts.iter().copied().filter(|c| *c != END));
        let stripped = concepts.len() - (self.buf.len() - before);
        if stripped > 0 {
            tracing::warn!(stripped, "stripped reserved END bytes from concept run");
        }
        self.buf.push(END);
    }
}

/// The first 255 entries of `items`, logging when anything is cut.
fn capped<'a, T>(items: &'a [T], what: &'static str) -> &'a [T] {
    if items.len() <= MAX_OPERAND_LEN {
        return items;
    }
    tracing::warn!(what, len = items.len(), "truncating operand to 255 entries");
    return &items[..MAX_OPERAND_LEN];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_build_is_just_end() {
        assert_eq!(IrBuilder::new().build(), vec![END]);
    }

    #[test]
    fn fixed_layouts() {
        let bytes = IrBuilder::new()
            .nop()
            .op(7, &[1, 2])
            .reference(9)
            .state(1, 2)
            .compose(3, 5)
            .build();
        assert_eq!(bytes, vec![0x00, 0x01, 7, 2, 1, 2, 0x03, 9, 0x06, 1, 2, 0x07, 3, 5, END]);
    }

    #[test]
    fn score_is_big_endian() {
        let bytes = IrBuilder::new().score(1.0).build();
        assert_eq!(bytes, vec![0x04, 0xFF, 0xFF, END]);
        let bytes = IrBuilder::new().score(0.0).build();
        assert_eq!(bytes, vec![0x04, 0x00, 0x00, END]);
    }

    #[test]
    fn concept_runs_are_end_terminated() {
        let bytes = IrBuilder::new().assert(&[1, 2]).trace(0u8, &[3]).ret(&[]).build();
        assert_eq!(bytes, vec![0x02, 1, 2, END, 0x05, 0, 3, END, 0x0B, END, END]);
    }

    #[test]
    fn concept_runs_strip_reserved_byte() {
        let bytes = IrBuilder::new().assert(&[1, END, 2]).build();
        assert_eq!(bytes, vec![0x02, 1, 2, END, END]);
    }

    #[test]
    fn call_layout() {
        let bytes = IrBuilder::new().call(4, &["ab", ""]).build();
        assert_eq!(bytes, vec![0x0A, 4, 2, 2, b'a', b'b', 0, END, END]);
    }

    #[test]
    fn merge_layout() {
        let bytes = IrBuilder::new().merge(&[1, 2, 3]).build();
        assert_eq!(bytes, vec![0x09, 3, 1, 2, 3, END, END]);
    }

    #[test]
    fn branch_layout() {
        let then_program = IrBuilder::new().nop().build();
        let mut builder = IrBuilder::new();
        builder.branch(1, &then_program, &[]).unwrap();
        assert_eq!(builder.build(), vec![0x08, 1, 2, 0x00, END, 0, END]);
    }

    #[test]
    fn branch_too_long_is_rejected() {
        let mut builder = IrBuilder::new();
        let long = vec![0u8; 256];
        assert!(matches!(
            builder.branch(0, &long, &[]),
            Err(Error::BranchTooLong { branch: "then", len: 256 })
        ));
        assert!(matches!(
            builder.branch(0, &[], &long),
            Err(Error::BranchTooLong { branch: "else", len: 256 })
        ));
        assert!(builder.is_empty());
    }

    #[test]
    fn explicit_end_is_not_doubled() {
        assert_eq!(IrBuilder::new().nop().end().build(), vec![0x00, END]);
        assert_eq!(IrBuilder::new().end().nop().build(), vec![END, 0x00, END]);
    }

    #[test]
    fn oversized_operands_are_truncated() {
        let args = vec![1u8; 300];
        let bytes = IrBuilder::new().op(0, &args).build();
        assert_eq!(bytes[2], 255);
        assert_eq!(bytes.len(), 3 + 255 + 1);
    }
}
