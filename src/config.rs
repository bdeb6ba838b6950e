// created = "2026-10-17"
// modified = "2026-10-17"
// driver = "Isaac Clayton"

//! Distiller configuration.
//!
//! ```toml
//! chunk_size = 32
//! fallback_score = 0.1
//! master_replica = "master"
//! replica_timeout_ms = 30000
//! ```

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::error::Error;
use crate::error::Result;

/// Default chunk size of the content-addressed log, in bytes.
pub const DEFAULT_CHUNK_SIZE: usize = 32;

/// Score given to a replica whose content could not be parsed.
pub const DEFAULT_FALLBACK_SCORE: f64 = 0.1;

/// Replica id of the session's master instances.
pub const DEFAULT_MASTER_REPLICA: &str = "master";

/// Settings for one distillation session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistillerConfig {
    /// Chunk size of every content-addressed log in the session.
    pub chunk_size: usize,
    /// Score of an answer recovered from unparseable teacher content.
    pub fallback_score: f64,
    /// Replica id owning the master CRDTs.
    pub master_replica: String,
    /// Replies whose query took longer than this are left out of the merge.
    pub replica_timeout_ms: Option<u64>,
}

impl Default for DistillerConfig {
    fn default() -> Self {
        return DistillerConfig {
            chunk_size: DEFAULT_CHUNK_SIZE,
            fallback_score: DEFAULT_FALLBACK_SCORE,
            master_replica: DEFAULT_MASTER_REPLICA.to_string(),
            replica_timeout_ms: None,
        };
    }
}

impl DistillerConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> Result<DistillerConfig> {
        let config: DistillerConfig = toml::from_str(source)?;
        config.validate()?;
        return Ok(config);
    }

    /// Read, parse, and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<DistillerConfig> {
        let source = std::fs::read_to_string(path)?;
        return DistillerConfig::from_toml_str(&source);
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::InvalidConfig {
                field: "chunk_size",
                reason: "must be at least 1".to_string(),
            });
        }
        if !self.fallback_score.is_finite() || !(0.0..=1.0).contains(&self.fallback_score) {
            return Err(Error::InvalidConfig {
                field: "fallback_score",
                reason: format!("{} is not in [0, 1]", self.fallback_score),
            });
        }
        if self.master_replica.is_empty() {
            return Err(Error::InvalidConfig {
                field: "master_replica",
                reason: "must not be empty".to_string(),
            });
        }
        return Ok(());
    }

    /// The per-replica deadline, if any.
    pub fn replica_timeout(&self) -> Option<Duration> {
        return self.replica_timeout_ms.map(Duration::from_millis);
    }
}
