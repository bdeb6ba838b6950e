// created = "2026-10-17"
// modified = "2026-10-17"
// driver = "Isaac Clayton"

//! Compiling one teacher artifact into IR and replica-scoped CRDTs.

use glyph::ConceptDictionary;
use glyph::extract_concepts;
use serde::Deserialize;
use serde::Serialize;

use crate::config::DistillerConfig;
use crate::crdt::Crdt;
use crate::crdt::chunk_log::ChunkLog;
use crate::crdt::chunk_log::ChunkLogState;
use crate::crdt::lww::LwwRegister;
use crate::crdt::lww::LwwState;
use crate::crdt::or_set::OrSet;
use crate::crdt::or_set::OrSetState;
use crate::crdt::sequence::Sequence;
use crate::crdt::sequence::SequenceState;
use crate::crdt::tag::ReplicaId;
use crate::distill::artifact::Artifact;
use crate::distill::artifact::ParsedArtifact;
use crate::hash::fnv1a;
use crate::ir::IrBuilder;
use crate::ir::StepKind;

/// The four CRDTs every replica, and the master, carries.
#[derive(Clone, Debug, PartialEq)]
pub struct ReplicaState {
    /// Constraints as concept sequences.
    pub constraints: OrSet,
    /// The answer text, scored by confidence.
    pub answer: LwwRegister,
    /// The IR byte stream, one node per byte.
    pub trace: Sequence,
    /// The IR byte stream, chunked.
    pub chunks: ChunkLog,
}

/// Persisted form of a [`ReplicaState`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReplicaStateExport {
    pub constraints: OrSetState,
    pub answer: LwwState,
    pub trace: SequenceState,
    pub chunks: ChunkLogState,
}

impl ReplicaState {
    /// Fresh, empty instances owned by `replica`.
    pub fn new(replica: &ReplicaId, chunk_size: usize) -> ReplicaState {
        return ReplicaState {
            constraints: OrSet::new(replica.clone()),
            answer: LwwRegister::new(replica.clone()),
            trace: Sequence::new(replica.clone()),
            chunks: ChunkLog::new(replica.clone(), chunk_size),
        };
    }

    pub fn export(&self) -> ReplicaStateExport {
        return ReplicaStateExport {
            constraints: self.constraints.export(),
            answer: self.answer.export(),
            trace: self.trace.export(),
            chunks: self.chunks.export(),
        };
    }

    pub fn import(state: ReplicaStateExport) -> ReplicaState {
        return ReplicaState {
            constraints: OrSet::import(state.constraints),
            answer: LwwRegister::import(state.answer),
            trace: Sequence::import(state.trace),
            chunks: ChunkLog::import(state.chunks),
        };
    }
}

impl Crdt for ReplicaState {
    fn merge(&mut self, other: &Self) {
        self.constraints.merge(&other.constraints);
        self.answer.merge(&other.answer);
        self.trace.merge(&other.trace);
        self.chunks.merge(&other.chunks);
    }
}

/// One replica's contribution to a session.
#[derive(Clone, Debug)]
pub struct CompiledReplica {
    pub replica: ReplicaId,
    /// The compiled IR program.
    pub ir: Vec<u8>,
    pub state: ReplicaState,
    /// Whether the artifact came from unparseable content.
    pub fallback: bool,
}

/// Compile an artifact into an IR program and populate fresh CRDTs from it.
///
/// The program holds one TRACE per reasoning step, one ASSERT per
/// constraint, one CALL per tool call, then SCORE and RETURN.
pub fn compile<D: ConceptDictionary + ?Sized>(
    artifact: &ParsedArtifact,
    replica: ReplicaId,
    dictionary: &D,
    config: &DistillerConfig,
) -> CompiledReplica {
    let resolved = artifact.resolve(config.fallback_score);
    let score = resolved.score.unwrap_or(config.fallback_score).clamp(0.0, 1.0);
    let constraints: Vec<Vec<u8>> = resolved
        .constraints
        .iter()
        .map(|c| extract_concepts(c, dictionary))
        .collect();

    let ir = build_program(&resolved, &constraints, score, dictionary);

    let mut state = ReplicaState::new(&replica, config.chunk_size);
    for concepts in &constraints {
        if !concepts.is_empty() {
            state.constraints.add(concepts);
        }
    }
    state.answer.set_now(resolved.answer.as_bytes(), score);
    state.trace.extend(&ir);
    state.chunks.append(&ir);

    tracing::debug!(
        %replica,
        ir_len = ir.len(),
        steps = resolved.reasoning.len(),
        constraints = constraints.len(),
        fallback = artifact.is_fallback(),
        "compiled replica"
    );

    return CompiledReplica {
        replica,
        ir,
        state,
        fallback: artifact.is_fallback(),
    };
}

fn build_program<D: ConceptDictionary + ?Sized>(
    artifact: &Artifact,
    constraints: &[Vec<u8>],
    score: f64,
    dictionary: &D,
) -> Vec<u8> {
    let mut builder = IrBuilder::new();
    let steps = artifact.reasoning.len();
    for (i, step) in artifact.reasoning.iter().enumerate() {
        builder.trace(StepKind::for_position(i, steps), &extract_concepts(step, dictionary));
    }
    for concepts in constraints {
        builder.assert(concepts);
    }
    for call in &artifact.tool_calls {
        builder.call(tool_id(&call.tool, dictionary), &call.args);
    }
    builder
        .score(score)
        .ret(&extract_concepts(&artifact.answer, dictionary));
    return builder.build();
}

/// The concept index of a tool name, or a byte derived from its hash.
pub fn tool_id<D: ConceptDictionary + ?Sized>(tool: &str, dictionary: &D) -> u8 {
    return match dictionary.get_index(tool) {
        Some(index) => index,
        None => fnv1a(tool.as_bytes()) as u8,
    };
}

#[cfg(test)]
mod tests {
    use glyph::Vocabulary;

    use super::*;
    use crate::distill::artifact::ToolCall;
    use crate::ir::Op;
    use crate::ir::Opcode;
    use crate::ir::decode;

    fn artifact() -> ParsedArtifact {
        return ParsedArtifact::Structured(Artifact {
            reasoning: vec!["light hits air".into(), "blue light scatter".into(), "sky is blue".into()],
            constraints: vec!["sky is blue".into(), "".into()],
            answer: "blue".into(),
            score: Some(0.8),
            tool_calls: vec![ToolCall {
                tool: "search".into(),
                args: vec!["sky".into()],
            }],
        });
    }

    #[test]
    fn program_layout() {
        let vocab = Vocabulary::builtin();
        let compiled = compile(&artifact(), ReplicaId::from("r"), &vocab, &DistillerConfig::default());
        let program = decode(&compiled.ir);

        let steps: Vec<u8> = program
            .ops(Opcode::Trace)
            .map(|op| match op {
                Op::Trace { step, .. } => *step,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(steps, vec![0, 1, 2]);
        assert_eq!(program.stats.occurrences("ASSERT"), 2);
        assert_eq!(program.stats.occurrences("CALL"), 1);
        assert_eq!(program.stats.occurrences("SCORE"), 1);
        assert_eq!(program.stats.occurrences("RETURN"), 1);
        assert_eq!(program.instructions.last().map(|i| &i.op), Some(&Op::End));

        let score = program.ops(Opcode::Score).next().and_then(Op::score).unwrap();
        assert!((score - 0.8).abs() <= 1.0 / 65535.0);
    }

    #[test]
    fn crdts_are_populated() {
        let vocab = Vocabulary::builtin();
        let compiled = compile(&artifact(), ReplicaId::from("r"), &vocab, &DistillerConfig::default());

        // The empty constraint is not added.
        assert_eq!(compiled.state.constraints.len(), 1);
        assert!(compiled.state.constraints.contains(&extract_concepts("sky is blue", &vocab)));
        assert_eq!(compiled.state.answer.get(), Some(b"blue".as_slice()));
        assert_eq!(compiled.state.answer.score(), Some(0.8));
        assert_eq!(compiled.state.trace.to_bytes(), compiled.ir);
        assert_eq!(compiled.state.chunks.to_bytes(), compiled.ir);
        assert!(!compiled.fallback);
    }

    #[test]
    fn fallback_artifact() {
        let vocab = Vocabulary::builtin();
        let parsed = ParsedArtifact::parse("water is wet");
        let compiled = compile(&parsed, ReplicaId::from("r"), &vocab, &DistillerConfig::default());

        assert!(compiled.fallback);
        assert!(compiled.state.constraints.is_empty());
        assert_eq!(compiled.state.answer.get(), Some(b"water is wet".as_slice()));
        assert_eq!(compiled.state.answer.score(), Some(0.1));

        let program = decode(&compiled.ir);
        assert_eq!(program.stats.occurrences("TRACE"), 1);
        assert_eq!(program.stats.occurrences("ASSERT"), 0);
    }

    #[test]
    fn scores_are_clamped() {
        let vocab = Vocabulary::builtin();
        let parsed = ParsedArtifact::Structured(Artifact {
            answer: "x".into(),
            score: Some(3.0),
            ..Artifact::default()
        });
        let compiled = compile(&parsed, ReplicaId::from("r"), &vocab, &DistillerConfig::default());
        assert_eq!(compiled.state.answer.score(), Some(1.0));
    }

    #[test]
    fn tool_ids() {
        let vocab = Vocabulary::from_words(["search"]);
        assert_eq!(tool_id("search", &vocab), 0);
        assert_eq!(tool_id("calculator", &vocab), fnv1a(b"calculator") as u8);
    }

    #[test]
    fn state_export_import() {
        let vocab = Vocabulary::builtin();
        let compiled = compile(&artifact(), ReplicaId::from("r"), &vocab, &DistillerConfig::default());
        let json = serde_json::to_string(&compiled.state.export()).unwrap();
        let back = ReplicaState::import(serde_json::from_str(&json).unwrap());
        assert_eq!(back, compiled.state);
    }
}
