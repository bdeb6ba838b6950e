// created = "2026-10-17"
// modified = "2026-10-17"
// driver = "Isaac Clayton"

//! Turning teacher replies into one merged corpus.
//!
//! ```text
//! teacher replies -> compile -> replica CRDTs -> merge into master -> corpus
//! ```
//!
//! Querying and compiling fan out across replicas on the rayon pool. Each
//! replica gets brand-new CRDT instances, so nothing is shared until the
//! merge, which folds replicas into the master one at a time.

mod artifact;
mod corpus;
mod replica;
mod session;
mod teacher;

pub use artifact::Artifact;
pub use artifact::ParsedArtifact;
pub use artifact::TeacherReply;
pub use artifact::ToolCall;
pub use corpus::Corpus;
pub use corpus::TASK_TYPE;
pub use corpus::TrainingRecord;
pub use replica::CompiledReplica;
pub use replica::ReplicaState;
pub use replica::ReplicaStateExport;
pub use replica::compile;
pub use replica::tool_id;
pub use session::Distiller;
pub use session::MasterSnapshot;
pub use session::MasterSnapshotExport;
pub use session::SessionState;
pub use teacher::Answered;
pub use teacher::QueryContext;
pub use teacher::TeacherError;
pub use teacher::TeacherService;
pub use teacher::distinct_replica_ids;
pub use teacher::query_all;
