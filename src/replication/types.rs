use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::membership::types::NodeIdentity;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Success,
    Failure,
}

/// Result of placing one copy of a write on one node.
///
/// A write reports one of these per node it touched, primary first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReplicationOutcome {
    pub target: NodeIdentity,
    pub status: OutcomeStatus,
    pub detail: String,
}

impl ReplicationOutcome {
    pub fn success(target: NodeIdentity, detail: impl Into<String>) -> Self {
        Self {
            target,
            status: OutcomeStatus::Success,
            detail: detail.into(),
        }
    }

    pub fn failure(target: NodeIdentity, detail: impl Into<String>) -> Self {
        Self {
            target,
            status: OutcomeStatus::Failure,
            detail: detail.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }
}

/// Failures a caller of the coordinator has to tell apart.
///
/// A cache miss is not an error; reads return `Ok(None)` for it.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The ring is empty, so no node can serve the key.
    #[error("no owner available for key '{key}'")]
    Unavailable { key: String },

    /// A single peer call failed (transport error or non-2xx answer).
    #[error("peer {target} unreachable: {reason}")]
    PeerUnreachable {
        target: NodeIdentity,
        reason: String,
    },

    #[error("invalid value payload: {0}")]
    InvalidValue(#[from] serde_json::Error),
}
