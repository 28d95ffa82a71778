//! Ring Router
//!
//! Owns the current routing snapshot (ring + member list) and rebuilds it from
//! a `MembershipSource` on a fixed interval.
//!
//! ## Concurrency
//! A snapshot is never modified after construction. Readers clone the `Arc`
//! under a momentary read lock and do all lookups on their own copy; a rebuild
//! builds a complete new snapshot first and then swaps the `Arc`. A reader
//! therefore always sees either the old or the new snapshot, never a mix.

use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::ring::HashRing;
use crate::membership::source::MembershipSource;
use crate::membership::types::NodeIdentity;

/// One generation of routing state: the ring and the member list it was built
/// from, swapped together.
#[derive(Debug, Default)]
pub struct RoutingSnapshot {
    ring: HashRing,
    members: Vec<NodeIdentity>,
    generation: u64,
}

impl RoutingSnapshot {
    fn new(members: Vec<NodeIdentity>, virtual_nodes: usize, generation: u64) -> Self {
        let ring = HashRing::build(&members, virtual_nodes);
        Self {
            ring,
            members,
            generation,
        }
    }

    pub fn ring(&self) -> &HashRing {
        &self.ring
    }

    /// Distinct members, sorted by address then id.
    pub fn members(&self) -> &[NodeIdentity] {
        &self.members
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn owner_of(&self, key: &str) -> Option<NodeIdentity> {
        self.ring.owner_of(key).cloned()
    }

    /// Physical nodes that receive copies after `owner`.
    ///
    /// Walks the member list round-robin starting right after `owner`,
    /// skipping `owner` and `local`, and returns at most
    /// `min(fan_out - 1, members - 1)` distinct nodes.
    pub fn successors(
        &self,
        owner: &NodeIdentity,
        local: &NodeIdentity,
        fan_out: usize,
    ) -> Vec<NodeIdentity> {
        let count = self.members.len();
        let wanted = fan_out
            .saturating_sub(1)
            .min(count.saturating_sub(1));
        if wanted == 0 {
            return Vec::new();
        }

        let start = self
            .members
            .iter()
            .position(|member| member == owner)
            .map(|idx| idx + 1)
            .unwrap_or(0);

        (0..count)
            .map(|step| &self.members[(start + step) % count])
            .filter(|member| *member != owner && *member != local)
            .take(wanted)
            .cloned()
            .collect()
    }
}

/// Summary of the current ring for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RingInfo {
    pub generation: u64,
    pub members: Vec<NodeIdentity>,
    /// Ring positions in use (`virtual_nodes` per member, minus collisions).
    pub positions: usize,
}

/// Result of a single rebuild attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Rebuilt {
        members: usize,
        virtual_nodes: usize,
        changed: bool,
    },
    /// Membership fetch failed; the previous snapshot stays authoritative.
    Skipped,
}

pub struct RingRouter {
    source: Arc<dyn MembershipSource>,
    local: NodeIdentity,
    virtual_nodes: usize,
    snapshot: RwLock<Arc<RoutingSnapshot>>,
    rebuild_lock: Mutex<()>,
}

impl RingRouter {
    /// Creates a router with an empty ring. Call `refresh` to populate it.
    pub fn new(source: Arc<dyn MembershipSource>, virtual_nodes: usize) -> Arc<Self> {
        let local = source.local_identity();
        Arc::new(Self {
            source,
            local,
            virtual_nodes,
            snapshot: RwLock::new(Arc::new(RoutingSnapshot::default())),
            rebuild_lock: Mutex::new(()),
        })
    }

    pub fn local_identity(&self) -> &NodeIdentity {
        &self.local
    }

    pub fn virtual_nodes(&self) -> usize {
        self.virtual_nodes
    }

    /// The current snapshot. Lookups on it never block a rebuild.
    pub fn snapshot(&self) -> Arc<RoutingSnapshot> {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn owner_of(&self, key: &str) -> Option<NodeIdentity> {
        self.snapshot().owner_of(key)
    }

    pub fn is_local(&self, key: &str) -> bool {
        self.owner_of(key).as_ref() == Some(&self.local)
    }

    /// Members on the ring currently in use. This is the snapshot count, not a
    /// fresh `MembershipSource::active_count`, so it always agrees with routing.
    pub fn active_count(&self) -> usize {
        self.snapshot().members().len()
    }

    pub fn ring_info(&self) -> RingInfo {
        let snapshot = self.snapshot();
        RingInfo {
            generation: snapshot.generation(),
            members: snapshot.members().to_vec(),
            positions: snapshot.ring().len(),
        }
    }

    /// Builds a new snapshot from `members` and swaps it in.
    ///
    /// Entries naming the local address under another id are dropped so the
    /// local node holds a single set of ring positions.
    pub fn rebuild(&self, members: Vec<NodeIdentity>) -> RefreshOutcome {
        let mut members = members;
        members.retain(|member| {
            let alias = member.is_alias_of(&self.local);
            if alias {
                tracing::warn!("Ignoring {}: same address as local node {}", member, self.local);
            }
            !alias
        });
        members.sort_by(|a, b| {
            a.address()
                .cmp(&b.address())
                .then_with(|| a.id.cmp(&b.id))
        });
        members.dedup();

        // Serializes rebuilders only; readers keep using the current snapshot
        // until the final swap.
        let _rebuilding = self.rebuild_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = self.snapshot();
        let changed = previous.members() != members.as_slice();

        let next = RoutingSnapshot::new(members, self.virtual_nodes, previous.generation() + 1);
        let outcome = RefreshOutcome::Rebuilt {
            members: next.members().len(),
            virtual_nodes: next.ring().len(),
            changed,
        };

        if changed {
            tracing::info!(
                "Ring rebuilt: {} members, {} virtual nodes (was {:?}, now {:?})",
                next.members().len(),
                next.ring().len(),
                previous.members().iter().map(|m| m.address()).collect::<Vec<_>>(),
                next.members().iter().map(|m| m.address()).collect::<Vec<_>>(),
            );
        } else {
            tracing::debug!(
                "Ring rebuilt with unchanged membership ({} members)",
                next.members().len()
            );
        }
        if next.ring().is_empty() {
            tracing::warn!("Ring is empty; no key can be routed");
        }

        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(next);
        outcome
    }

    /// Fetches membership and rebuilds. A failed fetch leaves the current
    /// snapshot in place.
    pub async fn refresh(&self) -> RefreshOutcome {
        match self.source.list_members().await {
            Ok(members) => self.rebuild(members),
            Err(e) => {
                tracing::warn!("Membership fetch failed, keeping previous ring: {}", e);
                RefreshOutcome::Skipped
            }
        }
    }

    /// Starts the periodic rebuild task.
    ///
    /// The first rebuild happens one `period` from now; callers are expected to
    /// have run `refresh` once already.
    pub fn spawn_refresh(self: Arc<Self>, period: Duration) -> RefreshHandle {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let router = self;

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        router.refresh().await;
                    }
                    _ = &mut shutdown_rx => {
                        tracing::info!("Ring refresh task stopping");
                        break;
                    }
                }
            }
        });

        tracing::info!("Ring refresh scheduled every {:?}", period);

        RefreshHandle {
            shutdown: Some(shutdown_tx),
            task: Some(task),
        }
    }
}

/// Handle to the background refresh task. Dropping it aborts the task.
pub struct RefreshHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl RefreshHandle {
    /// Signals the task to stop and waits for it to finish.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            tracing::warn!("Ring refresh task ended abnormally: {}", e);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
