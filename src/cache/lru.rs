//! LRU List Module
//!
//! Recency-ordered key/value storage backing the LRU cache.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::mem;

/// Sentinel index for "no node".
const NIL: usize = usize::MAX;

#[derive(Debug)]
struct Node<K, V> {
    key: K,
    value: V,
    prev: usize,
    next: usize,
}

// == LRU List ==
/// Doubly-linked list over a slab of nodes, indexed by a hash map.
///
/// - Head = Most recently used
/// - Tail = Least recently used
///
/// Every operation is O(1). Freed slots are recycled through a free list so
/// the slab never grows beyond the peak number of live entries.
#[derive(Debug)]
pub struct LruList<K, V> {
    /// Key to slab index
    map: HashMap<K, usize>,
    /// Node slab; `None` marks a free slot
    nodes: Vec<Option<Node<K, V>>>,
    /// Indices of free slots
    free: Vec<usize>,
    head: usize,
    tail: usize,
}

impl<K, V> Default for LruList<K, V>
where
    K: Hash + Eq + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> LruList<K, V>
where
    K: Hash + Eq + Clone,
{
    // == Constructor ==
    /// Creates a new empty list.
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
            nodes: Vec::new(),
            free: Vec::new(),
            head: NIL,
            tail: NIL,
        }
    }

    // == Insert ==
    /// Inserts or overwrites a value and marks the key most recently used.
    ///
    /// Returns the previous value when the key was already present.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        if let Some(&idx) = self.map.get(&key) {
            self.touch(idx);
            return self.nodes[idx]
                .as_mut()
                .map(|node| mem::replace(&mut node.value, value));
        }

        let node = Node {
            key: key.clone(),
            value,
            prev: NIL,
            next: NIL,
        };
        let idx = match self.free.pop() {
            Some(idx) => {
                self.nodes[idx] = Some(node);
                idx
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        };
        self.map.insert(key, idx);
        self.attach_front(idx);
        None
    }

    // == Get ==
    /// Returns the value and marks the key most recently used.
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = *self.map.get(key)?;
        self.touch(idx);
        self.nodes[idx].as_ref().map(|node| &node.value)
    }

    // == Peek ==
    /// Returns the value without changing recency.
    pub fn peek<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = *self.map.get(key)?;
        self.nodes[idx].as_ref().map(|node| &node.value)
    }

    // == Remove ==
    /// Removes a key, returning its value. Absent keys are a no-op.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = self.map.remove(key)?;
        self.take(idx).map(|node| node.value)
    }

    // == Evict Oldest ==
    /// Removes and returns the least recently used entry.
    pub fn evict_oldest(&mut self) -> Option<(K, V)> {
        if self.tail == NIL {
            return None;
        }
        let node = self.take(self.tail)?;
        self.map.remove(&node.key);
        Some((node.key, node.value))
    }

    /// Least recently used key, left in place.
    #[cfg(test)]
    fn peek_oldest(&self) -> Option<&K> {
        if self.tail == NIL {
            return None;
        }
        self.nodes[self.tail].as_ref().map(|node| &node.key)
    }

    /// Iterates entries from most to least recently used.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            list: self,
            cursor: self.head,
        }
    }

    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn clear(&mut self) {
        self.map.clear();
        self.nodes.clear();
        self.free.clear();
        self.head = NIL;
        self.tail = NIL;
    }

    // == Link Maintenance ==
    fn touch(&mut self, idx: usize) {
        if self.head != idx {
            self.detach(idx);
            self.attach_front(idx);
        }
    }

    fn take(&mut self, idx: usize) -> Option<Node<K, V>> {
        self.detach(idx);
        let node = self.nodes[idx].take();
        if node.is_some() {
            self.free.push(idx);
        }
        node
    }

    fn detach(&mut self, idx: usize) {
        let (prev, next) = match &self.nodes[idx] {
            Some(node) => (node.prev, node.next),
            None => return,
        };

        if prev == NIL {
            self.head = next;
        } else if let Some(node) = self.nodes[prev].as_mut() {
            node.next = next;
        }

        if next == NIL {
            self.tail = prev;
        } else if let Some(node) = self.nodes[next].as_mut() {
            node.prev = prev;
        }
    }

    fn attach_front(&mut self, idx: usize) {
        let old_head = self.head;
        if let Some(node) = self.nodes[idx].as_mut() {
            node.prev = NIL;
            node.next = old_head;
        }

        if old_head == NIL {
            self.tail = idx;
        } else if let Some(node) = self.nodes[old_head].as_mut() {
            node.prev = idx;
        }
        self.head = idx;
    }
}

// == Iterator ==
/// Iterator over `(key, value)` pairs, most recently used first.
#[derive(Debug)]
pub struct Iter<'a, K, V> {
    list: &'a LruList<K, V>,
    cursor: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor == NIL {
            return None;
        }
        let node = self.list.nodes[self.cursor].as_ref()?;
        self.cursor = node.next;
        Some((&node.key, &node.value))
    }
}
