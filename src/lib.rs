// created = "2026-10-17"
// modified = "2026-10-17"
// driver = "Isaac Clayton"

//! Confluence - conflict-free merging of reasoning artifacts.
//!
//! Several teacher replicas answer the same query with no coordination.
//! Each answer is compiled into a compact instruction stream (the artifact
//! IR), deposited into a fresh set of replica-scoped CRDTs, and every
//! replica is then merged into one master state from which a single
//! curriculum entry is built.
//!
//! # Quick Start
//!
//! ```
//! use confluence::distill::{Distiller, ParsedArtifact};
//! use confluence::crdt::tag::ReplicaId;
//! use glyph::Vocabulary;
//!
//! let mut distiller = Distiller::new(Vocabulary::builtin());
//!
//! let artifact = ParsedArtifact::parse(
//!     r#"{"reasoning": ["light scatter in air"], "constraints": ["sky is blue"],
//!         "answer": "blue", "score": 0.9, "tool_calls": []}"#,
//! );
//! let compiled = distiller.compile_replica(&artifact, ReplicaId::from("teacher-a"));
//! distiller.collect(compiled).unwrap();
//! distiller.merge_all();
//!
//! let corpus = distiller.build_corpus("why is the sky blue").unwrap();
//! assert_eq!(corpus.answer.as_deref(), Some("blue"));
//! ```

pub mod config;
pub mod crdt;
pub mod distill;
pub mod error;
pub mod hash;
pub mod ir;

pub use config::DistillerConfig;
pub use error::Error;
pub use error::Result;
