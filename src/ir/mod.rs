// created = "2026-10-17"
// modified = "2026-10-17"
// driver = "Isaac Clayton"

//! The artifact IR: a flat, tagged-instruction byte format.
//!
//! A program is a sequence of instructions, each an opcode byte followed by
//! its operands, terminated by [`END`] or by the end of the buffer. Nothing
//! points outside the buffer. The only structure is BRANCH, which nests two
//! length-prefixed sub-programs.
//!
//! | Opcode | Byte | Operands |
//! |--------|------|----------|
//! | NOP | `0x00` | none |
//! | OP | `0x01` | op id, arity, arity × arg |
//! | ASSERT | `0x02` | concept bytes, END |
//! | REF | `0x03` | index |
//! | SCORE | `0x04` | 16-bit big-endian quantized score |
//! | TRACE | `0x05` | step kind, concept bytes, END |
//! | STATE | `0x06` | from, to |
//! | COMPOSE | `0x07` | a, b |
//! | BRANCH | `0x08` | condition, then len, then, else len, else |
//! | MERGE | `0x09` | source count, source ids, END |
//! | CALL | `0x0A` | tool id, arg count, arg count × (len, bytes), END |
//! | RETURN | `0x0B` | concept bytes, END |
//! | END | `0xFF` | none |
//!
//! Concept runs (ASSERT, TRACE, RETURN) are END-terminated, so `0xFF` can
//! not appear inside one.

mod builder;
mod decoder;
mod render;

pub use builder::IrBuilder;
pub use decoder::Instruction;
pub use decoder::Op;
pub use decoder::Program;
pub use decoder::Stats;
pub use decoder::decode;
pub use decoder::decode_stream;
pub use render::render;

/// Terminates a variable-length run or a whole program.
pub const END: u8 = 0xFF;

/// Largest value a one-byte length or count operand can hold.
pub const MAX_OPERAND_LEN: usize = u8::MAX as usize;

/// Instruction opcodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Opcode {
    Nop = 0x00,
    Op = 0x01,
    Assert = 0x02,
    Ref = 0x03,
    Score = 0x04,
    Trace = 0x05,
    State = 0x06,
    Compose = 0x07,
    Branch = 0x08,
    Merge = 0x09,
    Call = 0x0A,
    Return = 0x0B,
    End = 0xFF,
}

impl Opcode {
    /// Every opcode, in byte order.
    pub const ALL: [Opcode; 13] = [
        Opcode::Nop,
        Opcode::Op,
        Opcode::Assert,
        Opcode::Ref,
        Opcode::Score,
        Opcode::Trace,
        Opcode::State,
        Opcode::Compose,
        Opcode::Branch,
        Opcode::Merge,
        Opcode::Call,
        Opcode::Return,
        Opcode::End,
    ];

    /// Decode an opcode byte.
    pub fn from_byte(byte: u8) -> Option<Opcode> {
        return match byte {
            0x00 => Some(Opcode::Nop),
            0x01 => Some(Opcode::Op),
            0x02 => Some(Opcode::Assert),
            0x03 => Some(Opcode::Ref),
            0x04 => Some(Opcode::Score),
            0x05 => Some(Opcode::Trace),
            0x06 => Some(Opcode::State),
            0x07 => Some(Opcode::Compose),
            0x08 => Some(Opcode::Branch),
            0x09 => Some(Opcode::Merge),
            0x0A => Some(Opcode::Call),
            0x0B => Some(Opcode::Return),
            0xFF => Some(Opcode::End),
            _ => None,
        };
    }

    #[inline]
    pub fn byte(self) -> u8 {
        return self as u8;
    }

    /// Upper-case name used in listings and histograms.
    pub fn mnemonic(self) -> &'static str {
        return match self {
            Opcode::Nop => "NOP",
            Opcode::Op => "OP",
            Opcode::Assert => "ASSERT",
            Opcode::Ref => "REF",
            Opcode::Score => "SCORE",
            Opcode::Trace => "TRACE",
            Opcode::State => "STATE",
            Opcode::Compose => "COMPOSE",
            Opcode::Branch => "BRANCH",
            Opcode::Merge => "MERGE",
            Opcode::Call => "CALL",
            Opcode::Return => "RETURN",
            Opcode::End => "END",
        };
    }
}

/// The role of a TRACE step, stored in its first operand.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum StepKind {
    Premise = 0,
    Inference = 1,
    Conclusion = 2,
    Query = 3,
}

impl StepKind {
    pub fn from_byte(byte: u8) -> Option<StepKind> {
        return match byte {
            0 => Some(StepKind::Premise),
            1 => Some(StepKind::Inference),
            2 => Some(StepKind::Conclusion),
            3 => Some(StepKind::Query),
            _ => None,
        };
    }

    /// The kind of step `index` in a chain of `count` reasoning steps.
    pub fn for_position(index: usize, count: usize) -> StepKind {
        if index == 0 {
            return StepKind::Premise;
        }
        if index + 1 == count {
            return StepKind::Conclusion;
        }
        return StepKind::Inference;
    }

    pub fn name(self) -> &'static str {
        return match self {
            StepKind::Premise => "premise",
            StepKind::Inference => "inference",
            StepKind::Conclusion => "conclusion",
            StepKind::Query => "query",
        };
    }
}

impl From<StepKind> for u8 {
    fn from(kind: StepKind) -> u8 {
        return kind as u8;
    }
}

/// Quantize a score in `[0, 1]` to 16 bits.
///
/// Out-of-range values are clamped and NaN maps to 0. The result is
/// `round(score * 65535)`, so [`dequantize_score`] reconstructs any in-range
/// score to within `1 / 65535`.
pub fn quantize_score(score: f64) -> u16 {
    if score.is_nan() {
        return 0;
    }
    return (score.clamp(0.0, 1.0) * u16::MAX as f64).round() as u16;
}

/// Reconstruct a quantized score as `n / 65535`.
pub fn dequantize_score(quantized: u16) -> f64 {
    return quantized as f64 / u16::MAX as f64;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_bytes_round_trip() {
        for opcode in Opcode::ALL {
            assert_eq!(Opcode::from_byte(opcode.byte()), Some(opcode));
        }
        assert_eq!(Opcode::from_byte(0x0C), None);
        assert_eq!(Opcode::from_byte(0xFE), None);
    }

    #[test]
    fn quantize_bounds() {
        assert_eq!(quantize_score(0.0), 0);
        assert_eq!(quantize_score(1.0), u16::MAX);
        assert_eq!(quantize_score(-3.0), 0);
        assert_eq!(quantize_score(7.0), u16::MAX);
        assert_eq!(quantize_score(f64::NAN), 0);
        assert_eq!(quantize_score(f64::INFINITY), u16::MAX);
    }

    #[test]
    fn quantize_error_is_bounded() {
        for i in 0..=1000 {
            let score = i as f64 / 1000.0;
            let back = dequantize_score(quantize_score(score));
            assert!((back - score).abs() <= 1.0 / 65535.0, "{score} -> {back}");
        }
    }

    #[test]
    fn step_kind_for_position() {
        assert_eq!(StepKind::for_position(0, 1), StepKind::Premise);
        assert_eq!(StepKind::for_position(0, 3), StepKind::Premise);
        assert_eq!(StepKind::for_position(1, 3), StepKind::Inference);
        assert_eq!(StepKind::for_position(2, 3), StepKind::Conclusion);
    }
}
