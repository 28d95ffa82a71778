//! Local Storage Module
//!
//! Holds the authoritative per-key data of a single node.
//!
//! ## Core Concepts
//! - **Bounded**: `LruStore` never holds more than its configured capacity.
//! - **Recency**: Every hit or write promotes the key; eviction always takes the least recently used entry.
//! - **Thread Safety**: One mutex guards the key index and the recency list together.
//!
//! The store knows nothing about the ring or replication. The coordinator decides
//! which keys land here (as primary or as replica).

pub mod lru;
