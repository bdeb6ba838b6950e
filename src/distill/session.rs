// created = "2026-10-17"
// modified = "2026-10-17"
// driver = "Isaac Clayton"

//! A distillation session: collect replicas, merge them, build the corpus.
//!
//! A session is `Collecting` until [`Distiller::merge_all`] runs and
//! `Merged` afterwards. Replicas can only be collected while collecting, and
//! the corpus can only be built once merged, with one exception: a session
//! that never collected anything builds an empty corpus.

use std::sync::Arc;

use glyph::ConceptDictionary;
use glyph::extract_concepts;
use rayon::prelude::*;
use serde::Deserialize;
use serde::Serialize;

use crate::config::DistillerConfig;
use crate::crdt::Crdt;
use crate::crdt::tag::ReplicaId;
use crate::distill::artifact::ParsedArtifact;
use crate::distill::corpus::Corpus;
use crate::distill::replica::CompiledReplica;
use crate::distill::replica::ReplicaState;
use crate::distill::replica::ReplicaStateExport;
use crate::distill::replica::compile;
use crate::distill::teacher::QueryContext;
use crate::distill::teacher::TeacherService;
use crate::distill::teacher::query_all;
use crate::error::Error;
use crate::error::Result;
use crate::ir::IrBuilder;
use crate::ir::StepKind;

/// Where a session is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Collecting,
    Merged,
}

/// The merged master CRDTs and the replicas folded into them.
#[derive(Clone, Debug, PartialEq)]
pub struct MasterSnapshot {
    pub replicas: Vec<ReplicaId>,
    pub state: ReplicaState,
}

/// Persisted form of a [`MasterSnapshot`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MasterSnapshotExport {
    pub replicas: Vec<ReplicaId>,
    #[serde(flatten)]
    pub state: ReplicaStateExport,
}

impl MasterSnapshot {
    /// A snapshot with no replicas.
    pub fn empty(config: &DistillerConfig) -> MasterSnapshot {
        return MasterSnapshot {
            replicas: Vec::new(),
            state: ReplicaState::new(&ReplicaId::from(config.master_replica.as_str()), config.chunk_size),
        };
    }

    /// Fold replicas into fresh master instances, in order.
    pub fn fold<'a>(config: &DistillerConfig, replicas: impl IntoIterator<Item = &'a CompiledReplica>) -> MasterSnapshot {
        let mut master = MasterSnapshot::empty(config);
        for replica in replicas {
            master.state.merge(&replica.state);
            master.replicas.push(replica.replica.clone());
        }
        return master;
    }

    pub fn export(&self) -> MasterSnapshotExport {
        return MasterSnapshotExport {
            replicas: self.replicas.clone(),
            state: self.state.export(),
        };
    }

    pub fn import(export: MasterSnapshotExport) -> MasterSnapshot {
        return MasterSnapshot {
            replicas: export.replicas,
            state: ReplicaState::import(export.state),
        };
    }

    /// Serialize the snapshot as a JSON checkpoint.
    pub fn to_json(&self) -> Result<String> {
        return Ok(serde_json::to_string(&self.export())?);
    }

    /// Restore a snapshot from a JSON checkpoint.
    pub fn from_json(json: &str) -> Result<MasterSnapshot> {
        let export: MasterSnapshotExport = serde_json::from_str(json)?;
        return Ok(MasterSnapshot::import(export));
    }
}

/// Orchestrates one distillation session.
pub struct Distiller<D: ConceptDictionary> {
    dictionary: D,
    config: DistillerConfig,
    replicas: Vec<CompiledReplica>,
    master: Option<MasterSnapshot>,
}

impl<D: ConceptDictionary + Sync> Distiller<D> {
    /// A session with the default configuration.
    pub fn new(dictionary: D) -> Distiller<D> {
        return Distiller {
            dictionary,
            config: DistillerConfig::default(),
            replicas: Vec::new(),
            master: None,
        };
    }

    /// A session with a validated configuration.
    pub fn with_config(dictionary: D, config: DistillerConfig) -> Result<Distiller<D>> {
        config.validate()?;
        return Ok(Distiller {
            dictionary,
            config,
            replicas: Vec::new(),
            master: None,
        });
    }

    /// Resume a merged session from a checkpoint.
    pub fn restore(dictionary: D, config: DistillerConfig, snapshot: MasterSnapshot) -> Result<Distiller<D>> {
        let mut distiller = Distiller::with_config(dictionary, config)?;
        distiller.master = Some(snapshot);
        return Ok(distiller);
    }

    pub fn dictionary(&self) -> &D {
        return &self.dictionary;
    }

    pub fn config(&self) -> &DistillerConfig {
        return &self.config;
    }

    pub fn state(&self) -> SessionState {
        return match self.master {
            Some(_) => SessionState::Merged,
            None => SessionState::Collecting,
        };
    }

    /// Replicas collected so far.
    pub fn replicas(&self) -> &[CompiledReplica] {
        return &self.replicas;
    }

    /// The master snapshot, once merged.
    pub fn master(&self) -> Option<&MasterSnapshot> {
        return self.master.as_ref();
    }

    /// Compile one artifact with this session's dictionary and config.
    pub fn compile_replica(&self, artifact: &ParsedArtifact, replica: ReplicaId) -> CompiledReplica {
        return compile(artifact, replica, &self.dictionary, &self.config);
    }

    /// Compile many artifacts in parallel. Output order matches input order.
    pub fn compile_all(&self, artifacts: Vec<(ReplicaId, ParsedArtifact)>) -> Vec<CompiledReplica> {
        return artifacts
            .into_par_iter()
            .map(|(replica, artifact)| self.compile_replica(&artifact, replica))
            .collect();
    }

    /// Add a compiled replica to the merge set.
    ///
    /// Replica ids must be unique within a session. Two replicas with one
    /// id mint the same tags, and merging them would silently drop nodes.
    pub fn collect(&mut self, replica: CompiledReplica) -> Result<()> {
        if self.master.is_some() {
            return Err(Error::AlreadyMerged);
        }
        if self.replicas.iter().any(|r| r.replica == replica.replica) {
            return Err(Error::DuplicateReplica { replica: replica.replica });
        }
        tracing::debug!(replica = %replica.replica, fallback = replica.fallback, "collected replica");
        self.replicas.push(replica);
        return Ok(());
    }

    /// Fold every collected replica into the master CRDTs and move to
    /// `Merged`. Calling it again returns the existing snapshot.
    pub fn merge_all(&mut self) -> &MasterSnapshot {
        let config = &self.config;
        let replicas = &self.replicas;
        return self.master.get_or_insert_with(|| {
            let master = MasterSnapshot::fold(config, replicas);
            tracing::info!(
                replicas = master.replicas.len(),
                constraints = master.state.constraints.len(),
                chunks = master.state.chunks.len(),
                "merged replicas"
            );
            return master;
        });
    }

    /// Build the corpus program for `query` from the merged state.
    ///
    /// The program is a query TRACE, one ASSERT per distinct merged
    /// constraint, and SCORE plus RETURN for the winning answer when there is
    /// one.
    pub fn build_corpus(&self, query: &str) -> Result<Corpus> {
        let empty;
        let master = match &self.master {
            Some(master) => master,
            None if self.replicas.is_empty() => {
                empty = MasterSnapshot::empty(&self.config);
                &empty
            }
            None => return Err(Error::NotMerged),
        };

        let mut builder = IrBuilder::new();
        builder.trace(StepKind::Query, &extract_concepts(query, &self.dictionary));
        for constraint in master.state.constraints.values() {
            builder.assert(&constraint);
        }

        let register = &master.state.answer;
        let answer = match (register.get(), register.score()) {
            (Some(text), Some(score)) => {
                let text = String::from_utf8_lossy(text).into_owned();
                builder.score(score).ret(&extract_concepts(&text, &self.dictionary));
                Some(text)
            }
            _ => None,
        };

        let corpus = Corpus::new(builder.build(), answer, &self.dictionary);
        tracing::info!(
            bytes = corpus.bytes.len(),
            instructions = corpus.program.stats.count,
            answered = corpus.answer.is_some(),
            "built corpus"
        );
        return Ok(corpus);
    }

    /// Run a whole session: query every teacher, compile and collect the
    /// replies, merge, and build the corpus.
    pub fn distill(&mut self, services: &[Arc<dyn TeacherService>], query: &str, context: &QueryContext) -> Result<Corpus> {
        let answered = query_all(services, query, context, self.config.replica_timeout());
        let artifacts = answered
            .into_iter()
            .map(|a| (a.replica, ParsedArtifact::parse(&a.reply.content)))
            .collect();
        for compiled in self.compile_all(artifacts) {
            self.collect(compiled)?;
        }
        self.merge_all();
        return self.build_corpus(query);
    }
}
