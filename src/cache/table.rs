/*!
 * Cache Table
 *
 * Single-owner, insertion-ordered hash table used to deduplicate keyed
 * enumeration results. Entries live in an ordered list (boxed, so an entry
 * never moves once added) and are chained into buckets by a polynomial
 * hash of the key bytes.
 *
 * Not safe for concurrent mutation; it is `Send` but never shared.
 */

use crate::core::data_structures::InlineString;
use crate::core::limits::{CACHE_GROWTH_FACTOR, CACHE_HASH_MULTIPLIER, DEFAULT_CACHE_CAPACITY};
use tracing::trace;

/// Case-sensitive `h = h * 33 + byte` over the key
#[inline]
fn hash(key: &str) -> u32 {
    key.bytes().fold(0u32, |h, byte| {
        h.wrapping_mul(CACHE_HASH_MULTIPLIER).wrapping_add(byte as u32)
    })
}

#[derive(Debug)]
pub struct CacheEntry<V> {
    key: InlineString,
    data: Option<V>,
    index: usize,
    next: Option<u32>,
}

impl<V> CacheEntry<V> {
    #[inline]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Position in insertion order
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn data(&self) -> Option<&V> {
        self.data.as_ref()
    }

    pub fn data_mut(&mut self) -> Option<&mut V> {
        self.data.as_mut()
    }

    /// Attach data, returning what was there
    pub fn set(&mut self, data: V) -> Option<V> {
        self.data.replace(data)
    }

    pub fn take(&mut self) -> Option<V> {
        self.data.take()
    }

    pub fn get_or_insert_with(&mut self, f: impl FnOnce() -> V) -> &mut V {
        self.data.get_or_insert_with(f)
    }
}

#[derive(Debug)]
pub struct CacheTable<V> {
    entries: Vec<Box<CacheEntry<V>>>,
    buckets: Vec<Option<u32>>,
    capacity: usize,
}

impl<V> CacheTable<V> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }

    /// Table sized for `capacity` entries before its first growth
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Vec::with_capacity(capacity),
            buckets: vec![None; capacity],
            capacity,
        }
    }

    /// Entry for `key`, inserted at the end if absent
    ///
    /// Idempotent: adding a present key returns the existing entry
    /// untouched.
    pub fn add(&mut self, key: &str) -> &mut CacheEntry<V> {
        if let Some(position) = self.position(key) {
            return &mut self.entries[position];
        }
        if self.entries.len() == self.capacity {
            self.grow();
        }

        let index = self.entries.len();
        let bucket = self.bucket_of(key);
        self.entries.push(Box::new(CacheEntry {
            key: key.into(),
            data: None,
            index,
            next: self.buckets[bucket],
        }));
        self.buckets[bucket] = Some(index as u32);
        &mut self.entries[index]
    }

    pub fn find(&self, key: &str) -> Option<&CacheEntry<V>> {
        let position = self.position(key)?;
        Some(&self.entries[position])
    }

    pub fn find_mut(&mut self, key: &str) -> Option<&mut CacheEntry<V>> {
        let position = self.position(key)?;
        Some(&mut self.entries[position])
    }

    pub fn contains(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    /// Entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &CacheEntry<V>> + '_ {
        self.entries.iter().map(|entry| &**entry)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut CacheEntry<V>> + '_ {
        self.entries.iter_mut().map(|entry| &mut **entry)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.iter().map(CacheEntry::key)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries the table holds before it next grows
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Hand every entry to `destructor` in insertion order, then free the
    /// table
    pub fn destroy_with(self, mut destructor: impl FnMut(&str, Option<V>)) {
        for entry in self.entries {
            let CacheEntry { key, data, .. } = *entry;
            destructor(&key, data);
        }
    }

    fn bucket_of(&self, key: &str) -> usize {
        hash(key) as usize % self.buckets.len()
    }

    fn position(&self, key: &str) -> Option<usize> {
        let mut cursor = self.buckets[self.bucket_of(key)];
        while let Some(position) = cursor {
            let entry = &self.entries[position as usize];
            if entry.key.as_str() == key {
                return Some(position as usize);
            }
            cursor = entry.next;
        }
        None
    }

    fn grow(&mut self) {
        self.capacity *= CACHE_GROWTH_FACTOR;
        self.entries.reserve_exact(self.capacity - self.entries.len());

        self.buckets = vec![None; self.capacity];
        for position in 0..self.entries.len() {
            let bucket = self.bucket_of(&self.entries[position].key);
            self.entries[position].next = self.buckets[bucket];
            self.buckets[bucket] = Some(position as u32);
        }
        trace!(capacity = self.capacity, entries = self.entries.len(), "Cache table grown");
    }
}

impl<V> Default for CacheTable<V> {
    fn default() -> Self {
        Self::new()
    }
}
