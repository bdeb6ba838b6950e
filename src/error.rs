// created = "2026-10-17"
// modified = "2026-10-17"
// driver = "Isaac Clayton"

//! Error types.
//!
//! CRDT operations and IR decoding are total and never fail. Errors only
//! arise at boundaries: importing persisted state, reading configuration,
//! building an IR program that cannot be encoded, and misusing a session,
//! including collecting two replicas under one id.

use thiserror::Error;

use crate::crdt::tag::ReplicaId;

/// Errors from importing state, configuration, IR building, and sessions.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration value for `{field}`: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[error("branch {branch} is {len} bytes, sub-programs are limited to 255")]
    BranchTooLong { branch: &'static str, len: usize },

    #[error("session has not been merged yet")]
    NotMerged,

    #[error("session is already merged and no longer accepts replicas")]
    AlreadyMerged,

    #[error("replica `{replica}` was already collected in this session")]
    DuplicateReplica { replica: ReplicaId },
}

/// Result type for fallible boundary operations.
pub type Result<T> = std::result::Result<T, Error>;
