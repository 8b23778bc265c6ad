//! Arena-backed LRU ordering guarded by a single mutex

use crate::types::IndexStats;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Stable position of a node inside the arena
type Handle = usize;

#[derive(Debug)]
struct Node {
    key: String,
    value: String,
    prev: Option<Handle>,
    next: Option<Handle>,
}

/// Ordering plus lookup. Front is most recently used, back is the next
/// eviction candidate.
#[derive(Debug, Default)]
struct Slots {
    nodes: Vec<Node>,
    lookup: HashMap<String, Handle>,
    head: Option<Handle>,
    tail: Option<Handle>,
}

impl Slots {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            lookup: HashMap::with_capacity(capacity),
            head: None,
            tail: None,
        }
    }

    fn len(&self) -> usize {
        self.lookup.len()
    }

    /// Unlink a node from the ordering. The node stays in the arena.
    fn detach(&mut self, handle: Handle) {
        let (prev, next) = {
            let node = &self.nodes[handle];
            (node.prev, node.next)
        };

        match prev {
            Some(p) => self.nodes[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.nodes[n].prev = prev,
            None => self.tail = prev,
        }

        let node = &mut self.nodes[handle];
        node.prev = None;
        node.next = None;
    }

    /// Link a detached node in at the front.
    fn push_front(&mut self, handle: Handle) {
        let old_head = self.head;
        {
            let node = &mut self.nodes[handle];
            node.prev = None;
            node.next = old_head;
        }
        match old_head {
            Some(h) => self.nodes[h].prev = Some(handle),
            None => self.tail = Some(handle),
        }
        self.head = Some(handle);
    }

    /// Promote a node to most recently used: detach, then push to the front.
    fn move_to_front(&mut self, handle: Handle) {
        if self.head == Some(handle) {
            return;
        }
        self.detach(handle);
        self.push_front(handle);
    }

    /// Drop the least recently used entry and hand back its slot for reuse.
    fn evict_back(&mut self) -> Option<(Handle, String)> {
        let handle = self.tail?;
        self.detach(handle);
        let key = std::mem::take(&mut self.nodes[handle].key);
        self.lookup.remove(&key);
        Some((handle, key))
    }

    #[cfg(test)]
    fn keys_front_to_back(&self) -> Vec<String> {
        let mut keys = Vec::with_capacity(self.len());
        let mut cursor = self.head;
        while let Some(handle) = cursor {
            let node = &self.nodes[handle];
            keys.push(node.key.clone());
            cursor = node.next;
        }
        keys
    }
}

/// Fixed-capacity LRU index from cache key to artifact filename.
///
/// Every operation takes one exclusive lock for its whole duration. The index
/// only references stored artifacts by name; it never touches the disk.
#[derive(Debug)]
pub struct CacheIndex {
    capacity: usize,
    slots: Mutex<Slots>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl CacheIndex {
    /// Create an index holding at most `capacity` entries. A capacity below 1
    /// is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            slots: Mutex::new(Slots::with_capacity(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slots> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or replace `key`, promoting it to most recently used.
    ///
    /// Returns `true` when the key was already present. Inserting a new key
    /// into a full index evicts exactly one entry, the least recently used.
    pub fn set(&self, key: &str, value: &str) -> bool {
        let mut slots = self.lock();

        if let Some(&handle) = slots.lookup.get(key) {
            slots.nodes[handle].value = value.to_string();
            slots.move_to_front(handle);
            return true;
        }

        let node = Node {
            key: key.to_string(),
            value: value.to_string(),
            prev: None,
            next: None,
        };

        let handle = if slots.len() >= self.capacity {
            match slots.evict_back() {
                Some((handle, evicted)) => {
                    self.evictions.fetch_add(1, Ordering::Relaxed);
                    debug!(key = %evicted, "Evicted least recently used entry");
                    slots.nodes[handle] = node;
                    handle
                }
                None => {
                    slots.nodes.push(node);
                    slots.nodes.len() - 1
                }
            }
        } else {
            slots.nodes.push(node);
            slots.nodes.len() - 1
        };

        slots.push_front(handle);
        slots.lookup.insert(key.to_string(), handle);
        false
    }

    /// Look up `key`. A hit counts as a use and promotes the entry.
    pub fn get(&self, key: &str) -> Option<String> {
        let mut slots = self.lock();

        let Some(&handle) = slots.lookup.get(key) else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        };

        slots.move_to_front(handle);
        self.hits.fetch_add(1, Ordering::Relaxed);
        Some(slots.nodes[handle].value.clone())
    }

    /// Forget every entry. Stored artifacts are left alone.
    pub fn clear(&self) {
        let mut slots = self.lock();
        *slots = Slots::with_capacity(self.capacity);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Keys from most to least recently used
    #[cfg(test)]
    pub(crate) fn keys(&self) -> Vec<String> {
        self.lock().keys_front_to_back()
    }

    pub fn stats(&self) -> IndexStats {
        let entries = self.len();
        IndexStats {
            entries,
            capacity: self.capacity,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}
