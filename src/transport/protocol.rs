//! Cache Network Protocol
//!
//! Defines the API endpoints and Data Transfer Objects (DTOs) used by clients and
//! by nodes talking to each other (forwarding, replication, remote reads).
//!
//! Values travel as JSON-encoded strings (`value_json`) so that a stored JSON
//! `null` stays distinguishable from "no value".

use serde::{Deserialize, Serialize};

use crate::membership::types::NodeIdentity;
use crate::replication::types::ReplicationOutcome;

// --- API Endpoints ---

/// Public endpoint for client write requests. Resolves the owner and forwards if needed.
pub const ENDPOINT_PUT: &str = "/put";
/// Public endpoint for client read requests (`?key=`). Reads from the primary owner.
pub const ENDPOINT_GET: &str = "/get";
/// Endpoint a forwarder calls on the primary. The receiver acts as primary unconditionally.
pub const ENDPOINT_FORWARD_PUT: &str = "/forward_put";
/// Local-only write used by a primary to place a replica. Never forwarded or fanned out.
pub const ENDPOINT_REPLICATE: &str = "/replicate";
/// Local-only read of this node's store (`?key=`), bypassing routing logic.
pub const ENDPOINT_GET_INTERNAL: &str = "/internal/get";
/// Diagnostics: current ring snapshot and store usage.
pub const ENDPOINT_RING_INFO: &str = "/internal/ring";
/// Liveness probe.
pub const ENDPOINT_HEALTH: &str = "/health";

// --- Data Transfer Objects ---

/// Client write: any key, routed by the receiving node.
#[derive(Debug, Serialize, Deserialize)]
pub struct PutRequest {
    /// Cache key.
    pub key: String,
    /// Any JSON value, serialized to a string.
    pub value_json: String,
}

/// Query string of both read endpoints. Any key `/put` accepts, including
/// `""`, `.` and `..`, survives the trip.
#[derive(Debug, Serialize, Deserialize)]
pub struct KeyQuery {
    pub key: String,
}

/// Write handed from a non-owner to the primary.
#[derive(Debug, Serialize, Deserialize)]
pub struct ForwardPutRequest {
    /// Operation ID carried across hops for log correlation.
    pub op_id: String,
    pub key: String,
    pub value_json: String,
}

/// Copy of a write pushed from the primary to a successor.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReplicateRequest {
    pub op_id: String,
    pub key: String,
    pub value_json: String,
}

/// Answer to public and internal reads.
#[derive(Debug, Serialize, Deserialize)]
pub struct GetResponse {
    /// The value, if found, serialized as a JSON string.
    /// `None` indicates the key does not exist (or the request failed, see `error`).
    pub value_json: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Response to public and forwarded writes.
#[derive(Debug, Serialize, Deserialize)]
pub struct WriteResponse {
    /// True once the primary copy was stored.
    pub success: bool,
    /// One entry per node contacted, primary first.
    pub outcomes: Vec<ReplicationOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Acknowledgment for a replica write.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReplicateResponse {
    pub success: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RingInfoResponse {
    pub node: NodeIdentity,
    pub generation: u64,
    pub members: Vec<NodeIdentity>,
    pub virtual_nodes: usize,
    pub fan_out: usize,
    pub store_len: usize,
    pub store_capacity: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub node: NodeIdentity,
}
