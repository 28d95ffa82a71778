//! Replication Coordinator
//!
//! Runs the write and read paths of a node on top of the ring and the local store.
//!
//! ## Write path
//! 1. Resolve the primary owner of the key on the current ring snapshot.
//! 2. **Primary**: store locally, then push a copy to up to `W - 1` successor
//!    nodes one after another. A failed successor is recorded and skipped.
//! 3. **Forwarder**: hand the write to the primary in one call and report that
//!    single outcome.
//!
//! Success is declared once the primary's local write is done; the outcome list
//! is informational and no acknowledgment count is enforced.
//!
//! ## Read path
//! Reads go to the primary only. A miss or an unreachable primary is returned
//! as such, without trying any replica.

use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use super::types::{CacheError, ReplicationOutcome};
use crate::membership::types::NodeIdentity;
use crate::ring::router::{RingRouter, RoutingSnapshot};
use crate::storage::lru::LruStore;
use crate::transport::client::PeerClient;

pub type LocalStore = LruStore<String, Value>;

pub struct ReplicationCoordinator {
    router: Arc<RingRouter>,
    store: Arc<LocalStore>,
    peers: Arc<dyn PeerClient>,
    local: NodeIdentity,
    /// Copies placed per write, primary included.
    fan_out: usize,
}

impl ReplicationCoordinator {
    pub fn new(
        router: Arc<RingRouter>,
        store: Arc<LocalStore>,
        peers: Arc<dyn PeerClient>,
        fan_out: usize,
    ) -> Arc<Self> {
        let local = router.local_identity().clone();
        Arc::new(Self {
            router,
            store,
            peers,
            local,
            fan_out,
        })
    }

    pub fn local_identity(&self) -> &NodeIdentity {
        &self.local
    }

    pub fn router(&self) -> &Arc<RingRouter> {
        &self.router
    }

    pub fn store(&self) -> &Arc<LocalStore> {
        &self.store
    }

    pub fn fan_out(&self) -> usize {
        self.fan_out
    }

    pub async fn write(
        &self,
        key: String,
        value: Value,
    ) -> Result<Vec<ReplicationOutcome>, CacheError> {
        let op_id = Uuid::new_v4().to_string();
        self.write_with_op(op_id, key, value).await
    }

    /// Client-facing write. `op_id` only tags log lines across hops.
    pub async fn write_with_op(
        &self,
        op_id: String,
        key: String,
        value: Value,
    ) -> Result<Vec<ReplicationOutcome>, CacheError> {
        let snapshot = self.router.snapshot();
        let owner = snapshot.owner_of(&key).ok_or_else(|| {
            tracing::warn!("WRITE {}: no owner for key '{}', ring is empty", op_id, key);
            CacheError::Unavailable { key: key.clone() }
        })?;

        if owner == self.local {
            tracing::debug!("WRITE {}: primary for key '{}'", op_id, key);
            Ok(self.replicate_from(&snapshot, &op_id, key, value).await)
        } else {
            tracing::debug!("WRITE {}: forwarding key '{}' to {}", op_id, key, owner);
            Ok(vec![self.forward(owner, &op_id, &key, &value).await])
        }
    }

    /// Write arriving from a forwarder: this node acts as primary without
    /// resolving the owner again, so diverging ring views cannot bounce the
    /// write between nodes.
    pub async fn write_as_primary(
        &self,
        op_id: String,
        key: String,
        value: Value,
    ) -> Vec<ReplicationOutcome> {
        let snapshot = self.router.snapshot();
        self.replicate_from(&snapshot, &op_id, key, value).await
    }

    async fn replicate_from(
        &self,
        snapshot: &RoutingSnapshot,
        op_id: &str,
        key: String,
        value: Value,
    ) -> Vec<ReplicationOutcome> {
        let successors = snapshot.successors(&self.local, &self.local, self.fan_out);

        self.store_local(key.clone(), value.clone());
        let mut outcomes = Vec::with_capacity(successors.len() + 1);
        outcomes.push(ReplicationOutcome::success(
            self.local.clone(),
            "stored as primary",
        ));

        for target in successors {
            match self.peers.local_write(&target, op_id, &key, &value).await {
                Ok(()) => {
                    tracing::debug!("WRITE {}: replica stored on {}", op_id, target);
                    outcomes.push(ReplicationOutcome::success(target, "replica stored"));
                }
                Err(e) => {
                    tracing::warn!("WRITE {}: replication to {} failed: {}", op_id, target, e);
                    outcomes.push(ReplicationOutcome::failure(target, e.to_string()));
                }
            }
        }

        outcomes
    }

    async fn forward(
        &self,
        owner: NodeIdentity,
        op_id: &str,
        key: &str,
        value: &Value,
    ) -> ReplicationOutcome {
        match self.peers.forward_write(&owner, op_id, key, value).await {
            Ok(remote) => {
                let stored = remote.iter().filter(|o| o.is_success()).count();
                ReplicationOutcome::success(
                    owner,
                    format!("forwarded to primary; {}/{} copies stored", stored, remote.len()),
                )
            }
            Err(e) => {
                tracing::warn!("WRITE {}: forward to {} failed: {}", op_id, owner, e);
                ReplicationOutcome::failure(owner, e.to_string())
            }
        }
    }

    /// Client-facing read against the primary owner only.
    pub async fn read(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let owner = self.router.owner_of(key).ok_or_else(|| {
            tracing::warn!("READ: no owner for key '{}', ring is empty", key);
            CacheError::Unavailable {
                key: key.to_string(),
            }
        })?;

        if owner == self.local {
            tracing::debug!("READ: key '{}' is local", key);
            return Ok(self.local_read(key));
        }

        tracing::debug!("READ: fetching key '{}' from {}", key, owner);
        self.peers
            .local_read(&owner, key)
            .await
            .map_err(|e| {
                tracing::warn!("READ: primary {} unreachable: {}", owner, e);
                CacheError::PeerUnreachable {
                    target: owner,
                    reason: e.to_string(),
                }
            })
    }

    /// Reads only this node's store.
    pub fn local_read(&self, key: &str) -> Option<Value> {
        self.store.get(key)
    }

    /// Writes only this node's store. Used for replicas; never fans out.
    pub fn local_write(&self, key: String, value: Value) {
        self.store_local(key, value);
    }

    fn store_local(&self, key: String, value: Value) {
        if let Some((evicted, _)) = self.store.set(key, value) {
            tracing::debug!("Evicted key '{}' to make room", evicted);
        }
    }
}
