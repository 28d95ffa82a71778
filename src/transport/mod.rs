//! Peer Transport Module
//!
//! HTTP/JSON surface of a node, inbound and outbound.
//!
//! ## Endpoints
//! - **Public** (`/put`, `/get?key=`): accept any key and route it through the coordinator.
//! - **Forwarding** (`/forward_put`): the receiver acts as primary for the write.
//! - **Local-only** (`/replicate`, `/internal/get?key=`): touch this node's store only; used by peers.
//!
//! Outbound calls go through the `PeerClient` trait. Transport errors and non-2xx
//! answers come back as errors, which the coordinator records as failed outcomes
//! (writes) or `PeerUnreachable` (reads).

pub mod client;
pub mod handlers;
pub mod protocol;
