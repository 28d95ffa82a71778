//! Replication Module
//!
//! Decides, per request, whether this node is the primary for a key or only a
//! forwarder, and places copies accordingly.
//!
//! ## Core Concepts
//! - **Primary**: The ring owner stores the key and pushes copies to `W - 1` successors.
//! - **Successors**: Distinct physical nodes taken round-robin from the member list, never by re-hashing.
//! - **Outcomes**: A write reports one `ReplicationOutcome` per node contacted; partial failure is data, not an error.
//! - **Errors**: `CacheError` separates "no owner" from "peer unreachable". A miss is `Ok(None)`.

pub mod coordinator;
pub mod types;
