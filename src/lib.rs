//! Replicated Cache Node Library
//!
//! This library crate defines the core modules of one node of a horizontally
//! partitioned, replicated in-memory cache. It serves as the foundation for the
//! binary executable (`main.rs`).
//!
//! ## Architecture Modules
//! - **`storage`**: The bounded, thread-safe LRU store holding this node's data.
//! - **`membership`**: Node identities and the sources that report the live member list.
//! - **`ring`**: Consistent hashing with virtual nodes. Rebuilt periodically from membership
//!   and swapped in atomically.
//! - **`replication`**: The write path (primary store + sequential fan-out, or forward to
//!   the primary) and the read path (primary only).
//! - **`transport`**: HTTP endpoints a node exposes and the client it uses to call peers.
//! - **`config`**: Command line / environment configuration.

pub mod config;
pub mod membership;
pub mod replication;
pub mod ring;
pub mod storage;
pub mod transport;
