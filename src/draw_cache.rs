// this_file: src/draw_cache.rs

//! Texture cache shared by every shape drawer of a renderer.
//!
//! `DrawCache` binds the [`LruStore`] to a backend's texture type. Textures
//! that fall out of the store (replacement, eviction, teardown) are handed
//! back to [`Backend::destroy_texture`] before the call that displaced them
//! returns, so the backend can reuse the slot right away.

use log::{debug, trace, warn};
use serde::Serialize;

use crate::backend::{texture_bytes, Backend};
use crate::config::{CacheConfig, Capacity};
use crate::key::CacheKey;
use crate::lru::{Entry, LruStore, Payload};

/// Lightweight stats for observability.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Entries currently cached
    pub entries: usize,
    /// Bytes of cached texture data
    pub bytes: usize,
    /// Lookups that found an entry
    pub hits: u64,
    /// Lookups that found nothing
    pub misses: u64,
    /// Entries inserted
    pub inserts: u64,
    /// Inserts that replaced an entry under the same key
    pub replacements: u64,
    /// Entries evicted to respect the bound
    pub evictions: u64,
}

#[derive(Clone, Copy, Debug, Default)]
struct Counters {
    hits: u64,
    misses: u64,
    inserts: u64,
    replacements: u64,
    evictions: u64,
}

/// LRU texture cache owned by one renderer.
#[derive(Debug)]
pub struct DrawCache<T> {
    store: LruStore<T>,
    counters: Counters,
}

impl<T> DrawCache<T> {
    /// Create the cache. Pair with [`DrawCache::shutdown`].
    pub fn init(config: CacheConfig) -> Self {
        debug!("Draw cache initialised with {:?}", config.capacity);
        Self {
            store: LruStore::new(config.capacity),
            counters: Counters::default(),
        }
    }

    /// Cached texture for `key`, marking it most recently used.
    pub fn get_cached(&mut self, key: &CacheKey) -> Option<&T> {
        self.get_cached_with_payload(key).map(|(texture, _)| texture)
    }

    /// Cached texture and payload for `key`, marking it most recently used.
    pub fn get_cached_with_payload(&mut self, key: &CacheKey) -> Option<(&T, Option<&Payload>)> {
        match self.store.get(key) {
            Some(entry) => {
                self.counters.hits += 1;
                trace!("Cache hit {:?}", key);
                Some((entry.resource(), entry.payload()))
            }
            None => {
                self.counters.misses += 1;
                trace!("Cache miss {:?}", key);
                None
            }
        }
    }

    /// Cache `texture` under `key` and return it.
    pub fn put_cached<B>(&mut self, backend: &mut B, key: CacheKey, texture: T) -> &T
    where
        B: Backend<Texture = T>,
    {
        let (width, height) = backend.texture_size(&texture);
        let entry = Entry::new(texture).with_weight(texture_bytes(width, height));
        self.insert(backend, key, entry)
    }

    /// Cache `texture` with an attached payload and return it.
    pub fn put_cached_with_payload<B>(
        &mut self,
        backend: &mut B,
        key: CacheKey,
        texture: T,
        payload: Payload,
    ) -> &T
    where
        B: Backend<Texture = T>,
    {
        let (width, height) = backend.texture_size(&texture);
        let entry = Entry::new(texture)
            .with_weight(texture_bytes(width, height))
            .with_payload(payload);
        self.insert(backend, key, entry)
    }

    fn insert<B>(&mut self, backend: &mut B, key: CacheKey, entry: Entry<T>) -> &T
    where
        B: Backend<Texture = T>,
    {
        let (inserted, outcome) =
            self.store
                .put(key, entry, &mut |texture| backend.destroy_texture(texture));
        self.counters.inserts += 1;
        self.counters.evictions += outcome.evicted as u64;
        if outcome.replaced {
            self.counters.replacements += 1;
        }
        inserted.resource()
    }

    /// Cached texture for `key` without touching recency or stats.
    pub fn peek(&self, key: &CacheKey) -> Option<&T> {
        self.store.peek(key).map(Entry::resource)
    }

    /// True when `key` is cached. Does not touch recency or stats.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.store.contains(key)
    }

    /// Number of cached textures.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// True when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Configured bound.
    pub fn capacity(&self) -> Capacity {
        self.store.capacity()
    }

    /// Keys from most to least recently used.
    pub fn keys_mru(&self) -> impl Iterator<Item = &CacheKey> {
        self.store.keys_mru()
    }

    /// Current stats.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.store.len(),
            bytes: self.store.weight(),
            hits: self.counters.hits,
            misses: self.counters.misses,
            inserts: self.counters.inserts,
            replacements: self.counters.replacements,
            evictions: self.counters.evictions,
        }
    }

    /// Change the bound, destroying textures that no longer fit.
    pub fn set_capacity<B>(&mut self, backend: &mut B, capacity: Capacity)
    where
        B: Backend<Texture = T>,
    {
        let evicted = self
            .store
            .set_capacity(capacity, &mut |texture| backend.destroy_texture(texture));
        self.counters.evictions += evicted as u64;
    }

    /// Destroy every cached texture.
    pub fn clear<B>(&mut self, backend: &mut B)
    where
        B: Backend<Texture = T>,
    {
        let released = self
            .store
            .clear(&mut |texture| backend.destroy_texture(texture));
        debug!("Draw cache cleared ({} textures destroyed)", released);
    }

    /// Destroy every cached texture and retire the cache.
    pub fn shutdown<B>(mut self, backend: &mut B)
    where
        B: Backend<Texture = T>,
    {
        self.clear(backend);
    }
}

impl<T> Drop for DrawCache<T> {
    fn drop(&mut self) {
        if !self.store.is_empty() {
            warn!(
                "Draw cache dropped without shutdown; {} texture(s) leaked",
                self.store.len()
            );
        }
    }
}
