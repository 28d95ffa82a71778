//! Consistent Hashing Module
//!
//! Maps keys to owning nodes over a dynamic membership.
//!
//! ## Core Concepts
//! - **Hashing**: Keys and virtual nodes share one 32-bit space (MD5 prefix, big-endian).
//! - **Virtual Nodes**: Each physical node takes `V` positions on the ring, hashed from `"{host:port}-VN{i}"`.
//! - **Ownership**: A key belongs to the first position at or after its hash, wrapping past the maximum.
//! - **Snapshots**: `RingRouter` rebuilds a fresh immutable ring from each membership snapshot and swaps it in atomically.
//!   A failed membership fetch keeps the previous ring.

pub mod hashing;
pub mod ring;
pub mod router;

#[cfg(test)]
mod tests;
