//! Ring Module Tests
//!
//! ## Test Scopes
//! - **Hashing**: Positions are stable and match the MD5-prefix definition.
//! - **HashRing**: Successor lookup, wrap-around and virtual node placement.
//! - **RingRouter**: Snapshot swaps (including under concurrent lookups), failure handling during refresh, successor selection and the timer task.

#[cfg(test)]
mod tests {
    use crate::membership::source::MembershipSource;
    use crate::membership::types::NodeIdentity;
    use crate::ring::hashing::{hash32, virtual_node_label};
    use crate::ring::ring::HashRing;
    use crate::ring::router::{RefreshOutcome, RingInfo, RingRouter};
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    fn node(id: &str, port: u16) -> NodeIdentity {
        NodeIdentity::new(id, "10.0.0.1", port)
    }

    fn cluster(size: u16) -> Vec<NodeIdentity> {
        (0..size).map(|i| node(&format!("node-{}", i), 7000 + i)).collect()
    }

    /// Membership source whose answer and failure mode can be changed mid-test.
    struct ScriptedMembership {
        local: NodeIdentity,
        members: Mutex<Vec<NodeIdentity>>,
        failing: AtomicBool,
        calls: AtomicUsize,
    }

    impl ScriptedMembership {
        fn new(local: NodeIdentity, members: Vec<NodeIdentity>) -> Arc<Self> {
            Arc::new(Self {
                local,
                members: Mutex::new(members),
                failing: AtomicBool::new(false),
                calls: AtomicUsize::new(0),
            })
        }

        fn set_members(&self, members: Vec<NodeIdentity>) {
            *self.members.lock().unwrap() = members;
        }

        fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl MembershipSource for ScriptedMembership {
        async fn list_members(&self) -> anyhow::Result<Vec<NodeIdentity>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                return Err(anyhow::anyhow!("registry unreachable"));
            }
            Ok(self.members.lock().unwrap().clone())
        }

        fn local_identity(&self) -> NodeIdentity {
            self.local.clone()
        }
    }

    fn sample_keys() -> Vec<String> {
        (0..500).map(|i| format!("key-{}", i)).collect()
    }

    // ============================================================
    // HASHING TESTS
    // ============================================================

    #[test]
    fn test_hash32_matches_md5_prefix() {
        assert_eq!(hash32(""), 3_558_706_393); // d41d8cd9
        assert_eq!(hash32("a"), 214_005_177); // 0cc175b9
        assert_eq!(hash32("user:42"), 1_457_184_536);
    }

    #[test]
    fn test_hash32_is_deterministic() {
        assert_eq!(hash32("book_100"), hash32("book_100"));
        assert_ne!(hash32("book_100"), hash32("book_101"));
    }

    #[test]
    fn test_virtual_node_label_format() {
        assert_eq!(virtual_node_label("10.0.0.1:7000", 3), "10.0.0.1:7000-VN3");
    }

    // ============================================================
    // HASH RING TESTS
    // ============================================================

    #[test]
    fn test_lookup_wraps_to_lowest_position() {
        let (a, b, c) = (node("A", 1), node("B", 2), node("C", 3));
        let ring = HashRing::from_entries([(10, a.clone()), (50, b.clone()), (90, c.clone())]);

        assert_eq!(ring.owner_of_hash(95), Some(&a));
        assert_eq!(ring.owner_of_hash(30), Some(&b));
        assert_eq!(ring.owner_of_hash(50), Some(&b), "exact position belongs to that entry");
        assert_eq!(ring.owner_of_hash(0), Some(&a));
        assert_eq!(ring.owner_of_hash(u32::MAX), Some(&a));
        assert_eq!(ring.owner_of_hash(51), Some(&c));
    }

    #[test]
    fn test_empty_ring_has_no_owner() {
        let ring = HashRing::empty();
        assert!(ring.is_empty());
        assert_eq!(ring.owner_of("anything"), None);
        assert!(HashRing::build(&[], 8).is_empty());
    }

    #[test]
    fn test_build_places_virtual_nodes_per_member() {
        let members = cluster(4);
        let ring = HashRing::build(&members, 16);

        assert_eq!(ring.len(), 4 * 16);
        let owners: HashSet<_> = ring.positions().map(|(_, owner)| owner.clone()).collect();
        assert_eq!(owners.len(), 4);
    }

    #[test]
    fn test_build_uses_address_labels() {
        let member = node("solo", 7000);
        let ring = HashRing::build(std::slice::from_ref(&member), 2);

        let positions: Vec<u32> = ring.positions().map(|(p, _)| p).collect();
        let mut expected = vec![
            hash32("10.0.0.1:7000-VN0"),
            hash32("10.0.0.1:7000-VN1"),
        ];
        expected.sort();
        assert_eq!(positions, expected);
    }

    #[test]
    fn test_rebuild_with_same_members_keeps_ownership() {
        let members = cluster(5);
        let first = HashRing::build(&members, 32);
        let second = HashRing::build(&members, 32);

        for key in sample_keys() {
            assert_eq!(first.owner_of(&key), second.owner_of(&key));
        }
    }

    #[test]
    fn test_all_members_receive_keys() {
        let members = cluster(4);
        let ring = HashRing::build(&members, 64);

        let owners: HashSet<_> = sample_keys()
            .iter()
            .filter_map(|key| ring.owner_of(key).cloned())
            .collect();
        assert_eq!(owners.len(), 4);
    }

    // ============================================================
    // RING ROUTER TESTS
    // ============================================================

    #[tokio::test]
    async fn test_router_starts_empty() {
        let members = cluster(3);
        let source = ScriptedMembership::new(members[0].clone(), members);
        let router = RingRouter::new(source, 8);

        assert_eq!(router.owner_of("k"), None);
        assert!(!router.is_local("k"));
        assert_eq!(router.snapshot().generation(), 0);
    }

    #[tokio::test]
    async fn test_refresh_builds_ring_from_source() {
        let members = cluster(3);
        let source = ScriptedMembership::new(members[0].clone(), members.clone());
        let router = RingRouter::new(source, 8);

        let outcome = router.refresh().await;

        assert_eq!(
            outcome,
            RefreshOutcome::Rebuilt {
                members: 3,
                virtual_nodes: 24,
                changed: true
            }
        );
        assert_eq!(router.active_count(), 3);
        assert_eq!(
            router.ring_info(),
            RingInfo {
                generation: 1,
                members: members.clone(),
                positions: 24,
            }
        );
        assert_eq!(router.snapshot().generation(), 1);
        assert!(router.owner_of("k").is_some());
    }

    #[tokio::test]
    async fn test_refresh_twice_is_stable() {
        let members = cluster(4);
        let source = ScriptedMembership::new(members[0].clone(), members);
        let router = RingRouter::new(source, 16);

        router.refresh().await;
        let before: Vec<_> = sample_keys().iter().map(|k| router.owner_of(k)).collect();

        let outcome = router.refresh().await;
        let after: Vec<_> = sample_keys().iter().map(|k| router.owner_of(k)).collect();

        assert!(matches!(outcome, RefreshOutcome::Rebuilt { changed: false, .. }));
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_ring() {
        let members = cluster(4);
        let source = ScriptedMembership::new(members[0].clone(), members.clone());
        let router = RingRouter::new(source.clone(), 16);

        router.refresh().await;
        let snapshot_before = router.snapshot();
        let before: Vec<_> = sample_keys().iter().map(|k| router.owner_of(k)).collect();

        source.set_failing(true);
        assert_eq!(router.refresh().await, RefreshOutcome::Skipped);

        let after: Vec<_> = sample_keys().iter().map(|k| router.owner_of(k)).collect();
        assert_eq!(before, after);
        assert_eq!(router.snapshot().generation(), snapshot_before.generation());
        assert_eq!(router.snapshot().members(), members_sorted(&members).as_slice());
    }

    fn members_sorted(members: &[NodeIdentity]) -> Vec<NodeIdentity> {
        let mut sorted = members.to_vec();
        sorted.sort_by(|a, b| a.address().cmp(&b.address()).then_with(|| a.id.cmp(&b.id)));
        sorted
    }

    #[tokio::test]
    async fn test_refresh_to_empty_membership_empties_ring() {
        let members = cluster(2);
        let source = ScriptedMembership::new(members[0].clone(), members);
        let router = RingRouter::new(source.clone(), 4);
        router.refresh().await;

        source.set_members(vec![]);
        router.refresh().await;

        assert_eq!(router.owner_of("k"), None);
        assert_eq!(router.active_count(), 0);
    }

    #[tokio::test]
    async fn test_membership_change_moves_only_some_keys() {
        let members = cluster(4);
        let source = ScriptedMembership::new(members[0].clone(), members.clone());
        let router = RingRouter::new(source.clone(), 64);
        router.refresh().await;
        let before: Vec<_> = sample_keys().iter().map(|k| router.owner_of(k)).collect();

        let mut grown = members.clone();
        grown.push(node("node-new", 7999));
        source.set_members(grown);
        router.refresh().await;
        let after: Vec<_> = sample_keys().iter().map(|k| router.owner_of(k)).collect();

        let moved = before.iter().zip(&after).filter(|(b, a)| b != a).count();
        assert!(moved > 0);
        assert!(moved < sample_keys().len() / 2, "moved {} keys", moved);
        for (b, a) in before.iter().zip(&after) {
            if b != a {
                assert_eq!(a.as_ref().map(|n| n.id.as_str()), Some("node-new"));
            }
        }
    }

    #[tokio::test]
    async fn test_rebuild_collapses_duplicate_members() {
        let members = cluster(2);
        let source = ScriptedMembership::new(members[0].clone(), vec![]);
        let router = RingRouter::new(source, 4);

        let outcome = router.rebuild(vec![
            members[1].clone(),
            members[0].clone(),
            members[1].clone(),
        ]);

        assert!(matches!(outcome, RefreshOutcome::Rebuilt { members: 2, .. }));
        assert_eq!(router.snapshot().members(), members.as_slice());
    }

    #[tokio::test]
    async fn test_rebuild_drops_aliases_of_local_node() {
        let local = NodeIdentity::new("me", "127.0.0.1", 7000);
        let listed: Vec<NodeIdentity> = (7000..7003)
            .map(|port| NodeIdentity::from_address("127.0.0.1", port))
            .chain(std::iter::once(local.clone()))
            .collect();
        let source = ScriptedMembership::new(local.clone(), listed);
        let router = RingRouter::new(source, 16);

        router.refresh().await;
        let snapshot = router.snapshot();

        assert_eq!(snapshot.members().len(), 3);
        assert_eq!(snapshot.ring().len(), 48);
        for key in sample_keys() {
            let owner = snapshot.owner_of(&key).unwrap();
            if owner.address() == local.address() {
                assert_eq!(owner, local);
            }
        }

        let successors = snapshot.successors(&local, &local, 3);
        assert_eq!(successors.len(), 2);
        assert!(successors.iter().all(|s| s.address() != local.address()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_lookups_during_rebuilds_see_whole_snapshots() {
        const VNODES: usize = 16;
        let small = cluster(3);
        let large = cluster(5);
        let source = ScriptedMembership::new(small[0].clone(), small.clone());
        let router = RingRouter::new(source, VNODES);
        router.refresh().await;

        let small_ring = HashRing::build(&small, VNODES);
        let large_ring = HashRing::build(&large, VNODES);
        let expected: Arc<Vec<(String, NodeIdentity, NodeIdentity)>> = Arc::new(
            sample_keys()
                .into_iter()
                .map(|key| {
                    let a = small_ring.owner_of(&key).unwrap().clone();
                    let b = large_ring.owner_of(&key).unwrap().clone();
                    (key, a, b)
                })
                .collect(),
        );
        let stop = Arc::new(AtomicBool::new(false));

        let mut readers = Vec::new();
        for _ in 0..4 {
            let router = router.clone();
            let expected = expected.clone();
            let stop = stop.clone();
            let (small, large) = (small.clone(), large.clone());

            readers.push(tokio::spawn(async move {
                let mut lookups = 0usize;
                loop {
                    for (key, small_owner, large_owner) in expected.iter() {
                        let snapshot = router.snapshot();
                        assert_eq!(snapshot.ring().len(), VNODES * snapshot.members().len());
                        assert!(
                            snapshot.members() == small.as_slice()
                                || snapshot.members() == large.as_slice()
                        );

                        let owner = router.owner_of(key).unwrap();
                        assert!(
                            owner == *small_owner || owner == *large_owner,
                            "key '{}' routed to {} outside both rings",
                            key,
                            owner
                        );
                        lookups += 1;
                    }
                    if stop.load(Ordering::SeqCst) {
                        break;
                    }
                    tokio::task::yield_now().await;
                }
                lookups
            }));
        }

        let writer = {
            let router = router.clone();
            tokio::task::spawn_blocking(move || {
                for round in 0..200 {
                    let members = if round % 2 == 0 { large.clone() } else { small.clone() };
                    router.rebuild(members);
                }
            })
        };
        writer.await.unwrap();
        stop.store(true, Ordering::SeqCst);

        for reader in readers {
            assert!(reader.await.unwrap() > 0);
        }
        assert_eq!(router.snapshot().generation(), 201);
    }

    #[tokio::test]
    async fn test_is_local_matches_owner() {
        let members = cluster(3);
        let local = members[1].clone();
        let source = ScriptedMembership::new(local.clone(), members);
        let router = RingRouter::new(source, 16);
        router.refresh().await;

        for key in sample_keys() {
            let owner = router.owner_of(&key).unwrap();
            assert_eq!(router.is_local(&key), owner == local);
        }
    }

    // ============================================================
    // SUCCESSOR SELECTION TESTS
    // ============================================================

    #[tokio::test]
    async fn test_successors_are_distinct_physical_nodes() {
        let members = cluster(4);
        let source = ScriptedMembership::new(members[0].clone(), members.clone());
        let router = RingRouter::new(source, 16);
        router.refresh().await;
        let snapshot = router.snapshot();

        for owner in &members {
            let successors = snapshot.successors(owner, owner, 3);
            assert_eq!(successors.len(), 2);
            assert!(!successors.contains(owner));
            let distinct: HashSet<_> = successors.iter().collect();
            assert_eq!(distinct.len(), 2);
        }
    }

    #[tokio::test]
    async fn test_successors_follow_member_order() {
        let members = cluster(4);
        let source = ScriptedMembership::new(members[0].clone(), members.clone());
        let router = RingRouter::new(source, 4);
        router.refresh().await;
        let snapshot = router.snapshot();

        // node-3 is last in address order, so its successors wrap to the front.
        let successors = snapshot.successors(&members[3], &members[3], 3);
        assert_eq!(successors, vec![members[0].clone(), members[1].clone()]);
    }

    #[tokio::test]
    async fn test_successors_capped_by_cluster_size() {
        let members = cluster(3);
        let source = ScriptedMembership::new(members[0].clone(), members.clone());
        let router = RingRouter::new(source, 4);
        router.refresh().await;
        let snapshot = router.snapshot();

        assert_eq!(snapshot.successors(&members[0], &members[0], 10).len(), 2);
        assert!(snapshot.successors(&members[0], &members[0], 1).is_empty());
        assert!(snapshot.successors(&members[0], &members[0], 0).is_empty());
    }

    #[tokio::test]
    async fn test_successors_skip_local_node() {
        let members = cluster(4);
        let source = ScriptedMembership::new(members[0].clone(), members.clone());
        let router = RingRouter::new(source, 4);
        router.refresh().await;
        let snapshot = router.snapshot();

        let successors = snapshot.successors(&members[0], &members[1], 3);
        assert_eq!(successors, vec![members[2].clone(), members[3].clone()]);
    }

    // ============================================================
    // REFRESH TASK TESTS
    // ============================================================

    #[tokio::test]
    async fn test_refresh_task_picks_up_changes_and_stops() {
        let members = cluster(2);
        let source = ScriptedMembership::new(members[0].clone(), members.clone());
        let router = RingRouter::new(source.clone(), 4);
        router.refresh().await;

        let handle = router.clone().spawn_refresh(Duration::from_millis(10));

        source.set_members(cluster(3));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(router.active_count(), 3);

        handle.shutdown().await;
        let calls = source.calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), calls, "no refresh after shutdown");
    }

    #[tokio::test]
    async fn test_refresh_task_survives_failures() {
        let members = cluster(2);
        let source = ScriptedMembership::new(members[0].clone(), members);
        let router = RingRouter::new(source.clone(), 4);
        router.refresh().await;

        source.set_failing(true);
        let handle = router.clone().spawn_refresh(Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(60)).await;

        assert!(!handle.is_finished());
        assert_eq!(router.active_count(), 2);

        handle.shutdown().await;
    }
}
