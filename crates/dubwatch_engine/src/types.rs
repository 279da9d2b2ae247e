use dubwatch_core::{Channel, JobId, JobSnapshot};
use serde::Deserialize;
use thiserror::Error;

use crate::persist::PersistError;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// The service does not know the job. Not worth retrying.
    #[error("job {0} not found")]
    NotFound(JobId),
    /// The service refused the request (bad input, artifact not ready).
    #[error("{0}")]
    Rejected(String),
    /// Network failure, timeout, unexpected status or undecodable body.
    #[error("transport error: {0}")]
    Transport(String),
    #[error(transparent)]
    Persist(#[from] PersistError),
}

impl ServiceError {
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ServiceError::Transport(_))
    }
}

/// What a channel hands to its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    Snapshot {
        source: Channel,
        snapshot: JobSnapshot,
    },
    /// The push channel stopped for good after this many consecutive failures.
    PushExhausted { failures: u32 },
    /// The service no longer knows the job. The reporting channel has ended.
    JobGone,
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: ChannelEvent);
}

/// One decoded push message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushFrame {
    Snapshot(JobSnapshot),
    /// A frame that could not be turned into a snapshot, with the reason.
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Language {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub native_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthReport {
    pub healthy: bool,
    #[serde(default)]
    pub details: String,
    #[serde(default)]
    pub cuda_available: bool,
    #[serde(default)]
    pub gpu_name: Option<String>,
}
