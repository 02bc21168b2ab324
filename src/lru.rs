// this_file: src/lru.rs

//! Bounded least-recently-used store for owned GPU resources.
//!
//! The store owns every resource placed into it and hands each one back to a
//! caller-supplied `release` closure exactly once: on replacement, on
//! eviction, or on [`LruStore::clear`]. It never drops a resource silently,
//! because releasing a texture needs the backend that created it.
//!
//! Recency is tracked by an `lru` map with no bound of its own; this module
//! enforces either an entry-count or a byte-weight bound after every `put`.

use lru::LruCache;
use rustc_hash::FxBuildHasher;
use std::any::Any;
use std::fmt;

use crate::config::Capacity;
use crate::key::CacheKey;

/// Opaque user data attached to a cache entry.
///
/// The optional destructor runs exactly once, when the payload is dropped
/// together with its entry.
pub struct Payload {
    value: Option<Box<dyn Any>>,
    destructor: Option<Box<dyn FnOnce(Box<dyn Any>)>>,
}

impl Payload {
    /// Payload released by its own `Drop`.
    pub fn new<T: Any>(value: T) -> Self {
        Self {
            value: Some(Box::new(value)),
            destructor: None,
        }
    }

    /// Payload released by an explicit destructor.
    pub fn with_destructor<T: Any>(value: T, destructor: impl FnOnce(T) + 'static) -> Self {
        Self {
            value: Some(Box::new(value)),
            destructor: Some(Box::new(move |boxed: Box<dyn Any>| {
                if let Ok(value) = boxed.downcast::<T>() {
                    destructor(*value);
                }
            })),
        }
    }

    /// Borrow the payload as `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.as_ref().and_then(|value| value.downcast_ref::<T>())
    }
}

impl Drop for Payload {
    fn drop(&mut self) {
        if let (Some(value), Some(destructor)) = (self.value.take(), self.destructor.take()) {
            destructor(value);
        }
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Payload")
            .field("has_destructor", &self.destructor.is_some())
            .finish()
    }
}

/// A cached resource with its payload and budget weight.
#[derive(Debug)]
pub struct Entry<R> {
    resource: R,
    payload: Option<Payload>,
    weight: usize,
}

impl<R> Entry<R> {
    /// Entry with no payload and zero weight.
    pub fn new(resource: R) -> Self {
        Self {
            resource,
            payload: None,
            weight: 0,
        }
    }

    /// Set the weight counted against a byte budget.
    pub fn with_weight(mut self, weight: usize) -> Self {
        self.weight = weight;
        self
    }

    /// Attach a payload.
    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Cached resource.
    pub fn resource(&self) -> &R {
        &self.resource
    }

    /// Attached payload, if any.
    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }

    /// Weight counted against a byte budget.
    pub fn weight(&self) -> usize {
        self.weight
    }

    /// Hand the resource to `release`, then drop the payload.
    fn release(self, release: &mut impl FnMut(R)) {
        let Entry {
            resource, payload, ..
        } = self;
        release(resource);
        drop(payload);
    }
}

/// What a `put` did besides inserting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PutOutcome {
    /// An entry under the same key was released first.
    pub replaced: bool,
    /// Number of least-recently-used entries evicted.
    pub evicted: usize,
}

/// Recency-ordered map from [`CacheKey`] to owned resources.
pub struct LruStore<R> {
    map: LruCache<CacheKey, Entry<R>, FxBuildHasher>,
    capacity: Capacity,
    weight: usize,
}

impl<R> LruStore<R> {
    /// Create an empty store with the given bound.
    pub fn new(capacity: Capacity) -> Self {
        Self {
            map: LruCache::unbounded_with_hasher(FxBuildHasher),
            capacity,
            weight: 0,
        }
    }

    /// Configured bound.
    pub fn capacity(&self) -> Capacity {
        self.capacity
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// True when the store holds nothing.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Sum of entry weights.
    pub fn weight(&self) -> usize {
        self.weight
    }

    /// Look up `key`; a hit becomes the most recently used entry.
    pub fn get(&mut self, key: &CacheKey) -> Option<&Entry<R>> {
        self.map.get(key)
    }

    /// Look up `key` without touching recency.
    pub fn peek(&self, key: &CacheKey) -> Option<&Entry<R>> {
        self.map.peek(key)
    }

    /// True when `key` is present. Does not touch recency.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.map.contains(key)
    }

    /// Keys from most to least recently used.
    pub fn keys_mru(&self) -> impl Iterator<Item = &CacheKey> {
        self.map.iter().map(|(key, _)| key)
    }

    /// Insert or replace the entry for `key`.
    ///
    /// A previous entry under `key` is released before the new one goes in.
    /// Least-recently-used entries are then released until the new entry fits
    /// the bound. An entry that exceeds the bound on its own is kept alone.
    pub fn put(
        &mut self,
        key: CacheKey,
        entry: Entry<R>,
        release: &mut impl FnMut(R),
    ) -> (&Entry<R>, PutOutcome) {
        let mut outcome = PutOutcome::default();

        if let Some(old) = self.map.pop(&key) {
            self.weight -= old.weight;
            old.release(release);
            outcome.replaced = true;
        }

        outcome.evicted = self.make_room(entry.weight, release);
        if self.map.is_empty() && self.exceeds(1, entry.weight) {
            log::debug!(
                "Entry {:?} ({} bytes) exceeds cache bound {:?}; holding it alone",
                key,
                entry.weight,
                self.capacity
            );
        }

        self.weight += entry.weight;
        let inserted = self.map.get_or_insert(key, move || entry);
        (inserted, outcome)
    }

    /// Release every entry. Returns how many were released.
    pub fn clear(&mut self, release: &mut impl FnMut(R)) -> usize {
        let mut released = 0;
        while let Some((_, entry)) = self.map.pop_lru() {
            entry.release(release);
            released += 1;
        }
        self.weight = 0;
        released
    }

    /// Change the bound, evicting immediately if the store no longer fits.
    ///
    /// The most recently used entry is always kept.
    pub fn set_capacity(&mut self, capacity: Capacity, release: &mut impl FnMut(R)) -> usize {
        self.capacity = capacity;
        let mut evicted = 0;
        while self.map.len() > 1 && self.exceeds(self.map.len(), self.weight) {
            if !self.evict_one(release) {
                break;
            }
            evicted += 1;
        }
        evicted
    }

    /// True when `len` entries weighing `weight` in total break the bound.
    fn exceeds(&self, len: usize, weight: usize) -> bool {
        match self.capacity {
            Capacity::Entries(max) => len > max,
            Capacity::Bytes(max) => weight > max,
        }
    }

    /// Evict until an incoming entry of `incoming` weight fits.
    fn make_room(&mut self, incoming: usize, release: &mut impl FnMut(R)) -> usize {
        let mut evicted = 0;
        while !self.map.is_empty() && self.exceeds(self.map.len() + 1, self.weight + incoming) {
            if !self.evict_one(release) {
                break;
            }
            evicted += 1;
        }
        evicted
    }

    fn evict_one(&mut self, release: &mut impl FnMut(R)) -> bool {
        match self.map.pop_lru() {
            Some((key, entry)) => {
                log::debug!("Evicting {:?} ({} bytes)", key, entry.weight);
                self.weight -= entry.weight;
                entry.release(release);
                true
            }
            None => false,
        }
    }
}

impl<R> fmt::Debug for LruStore<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruStore")
            .field("capacity", &self.capacity)
            .field("len", &self.map.len())
            .field("weight", &self.weight)
            .finish()
    }
}
