//! Bounded LRU store.
//!
//! Entries live in a slot vector threaded by a doubly-linked recency list
//! (head = most recently used, tail = least recently used) and are indexed by
//! key through a `HashMap`. Both structures sit behind one `Mutex` so they are
//! never observed out of sync.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};

struct Slot<K, V> {
    key: K,
    value: V,
    prev: Option<usize>,
    next: Option<usize>,
}

struct LruInner<K, V> {
    index: HashMap<K, usize>,
    slots: Vec<Slot<K, V>>,
    head: Option<usize>,
    tail: Option<usize>,
}

impl<K, V> LruInner<K, V> {
    fn unlink(&mut self, idx: usize) {
        let (prev, next) = (self.slots[idx].prev, self.slots[idx].next);

        match prev {
            Some(p) => self.slots[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.slots[n].prev = prev,
            None => self.tail = prev,
        }

        self.slots[idx].prev = None;
        self.slots[idx].next = None;
    }

    fn push_front(&mut self, idx: usize) {
        self.slots[idx].prev = None;
        self.slots[idx].next = self.head;

        match self.head {
            Some(h) => self.slots[h].prev = Some(idx),
            None => self.tail = Some(idx),
        }
        self.head = Some(idx);
    }

    fn move_to_front(&mut self, idx: usize) {
        if self.head == Some(idx) {
            return;
        }
        self.unlink(idx);
        self.push_front(idx);
    }
}

/// Thread-safe key/value store holding at most `capacity` entries.
///
/// `get` and `set` are O(1). A hit or a write moves the key to the
/// most-recently-used position; inserting a new key into a full store evicts
/// the least-recently-used entry and nothing else.
pub struct LruStore<K, V> {
    capacity: NonZeroUsize,
    inner: Mutex<LruInner<K, V>>,
}

impl<K, V> LruStore<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(LruInner {
                index: HashMap::with_capacity(capacity.get()),
                slots: Vec::with_capacity(capacity.get()),
                head: None,
                tail: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruInner<K, V>> {
        // Every mutation leaves both structures consistent before it can panic,
        // so a poisoned guard is still safe to use.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns a clone of the stored value and marks the key as most recently
    /// used. A miss leaves the recency order untouched.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut guard = self.lock();
        let inner = &mut *guard;

        let idx = *inner.index.get(key)?;
        inner.move_to_front(idx);

        Some(inner.slots[idx].value.clone())
    }

    /// Inserts or replaces `key`, making it the most recently used entry.
    ///
    /// Returns the entry evicted to make room, if any.
    pub fn set(&self, key: K, value: V) -> Option<(K, V)> {
        let mut guard = self.lock();
        let inner = &mut *guard;

        if let Some(&idx) = inner.index.get(&key) {
            inner.slots[idx].value = value;
            inner.move_to_front(idx);
            return None;
        }

        if inner.slots.len() < self.capacity.get() {
            let idx = inner.slots.len();
            inner.slots.push(Slot {
                key: key.clone(),
                value,
                prev: None,
                next: None,
            });
            inner.index.insert(key, idx);
            inner.push_front(idx);
            return None;
        }

        // Full: the tail slot is recycled for the new entry.
        let idx = inner.tail?;
        inner.unlink(idx);

        let evicted_key = std::mem::replace(&mut inner.slots[idx].key, key.clone());
        let evicted_value = std::mem::replace(&mut inner.slots[idx].value, value);

        inner.index.remove(&evicted_key);
        inner.index.insert(key, idx);
        inner.push_front(idx);

        Some((evicted_key, evicted_value))
    }

    /// Checks presence without touching the recency order.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.lock().index.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.lock().index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// Keys ordered from most to least recently used.
    pub fn keys_by_recency(&self) -> Vec<K> {
        let inner = self.lock();
        let mut keys = Vec::with_capacity(inner.index.len());

        let mut cursor = inner.head;
        while let Some(idx) = cursor {
            keys.push(inner.slots[idx].key.clone());
            cursor = inner.slots[idx].next;
        }

        keys
    }
}
