// created = "2026-10-17"
// modified = "2026-10-17"
// driver = "Isaac Clayton"

//! The distilled corpus and its training-record export.

use glyph::Braille;
use glyph::ConceptDictionary;
use glyph::SymbolCodec;
use serde::Deserialize;
use serde::Serialize;

use crate::error::Result;
use crate::ir::Program;
use crate::ir::decode;
use crate::ir::render;

/// Task type of every exported training record.
pub const TASK_TYPE: &str = "replicated_distillation";

const INSTRUCTION: &str = "Give the merged reasoning for the following query as Braille.";

/// The final program built from a merged session.
#[derive(Clone, Debug, PartialEq)]
pub struct Corpus {
    /// The IR program.
    pub bytes: Vec<u8>,
    /// The program, decoded.
    pub program: Program,
    /// One braille cell per byte.
    pub symbols: String,
    /// A human-readable listing.
    pub listing: String,
    /// The winning answer text, if any replica answered.
    pub answer: Option<String>,
}

/// One line of a JSONL training file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingRecord {
    pub instruction: String,
    pub input: String,
    pub output: String,
    pub task_type: String,
}

impl Corpus {
    /// Decode and render a finished program.
    pub fn new<D: ConceptDictionary + ?Sized>(bytes: Vec<u8>, answer: Option<String>, dictionary: &D) -> Corpus {
        let program = decode(&bytes);
        let listing = render(&program, dictionary);
        let symbols = Braille.encode(&bytes);
        return Corpus {
            bytes,
            program,
            symbols,
            listing,
            answer,
        };
    }

    /// The training record pairing `query` with this corpus.
    pub fn to_training_record(&self, query: &str) -> TrainingRecord {
        return TrainingRecord {
            instruction: INSTRUCTION.to_string(),
            input: query.to_string(),
            output: self.symbols.clone(),
            task_type: TASK_TYPE.to_string(),
        };
    }
}

impl TrainingRecord {
    /// Serialize as one JSON line, without the trailing newline.
    pub fn to_jsonl(&self) -> Result<String> {
        return Ok(serde_json::to_string(self)?);
    }
}
