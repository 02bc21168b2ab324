// this_file: tests/cache_properties.rs
//! Behavioural properties of the LRU store and the texture cache

use drawcache::key::{BorderKey, ImageKey, RectBgKey, ShadowKey};
use drawcache::software::{SoftwareBackend, TextureId};
use drawcache::{
    key_equals, key_hash, Backend, CacheConfig, CacheKey, Capacity, Color, DrawCache, Entry,
    LruStore, Payload, ShapeKey,
};
use std::cell::Cell;
use std::rc::Rc;

fn key(name: &str) -> CacheKey {
    let mut bytes = vec![0x11];
    bytes.extend_from_slice(name.as_bytes());
    CacheKey::from_bytes(&bytes)
}

fn texture(backend: &mut SoftwareBackend, side: u32) -> TextureId {
    let alpha = vec![0xFF; (side * side) as usize];
    backend
        .create_texture_from_alpha(&alpha, side, side, side)
        .expect("texture created")
}

#[test]
fn recently_used_entry_survives_eviction() {
    let mut store = LruStore::new(Capacity::Entries(2));
    let mut released = Vec::new();
    store.put(key("A"), Entry::new("A"), &mut |r| released.push(r));
    store.put(key("B"), Entry::new("B"), &mut |r| released.push(r));
    store.put(key("C"), Entry::new("C"), &mut |r| released.push(r));
    assert_eq!(released, vec!["A"]);

    assert!(store.get(&key("B")).is_some());
    store.put(key("D"), Entry::new("D"), &mut |r| released.push(r));

    assert_eq!(released, vec!["A", "C"]);
    assert!(store.contains(&key("B")));
    assert!(store.contains(&key("D")));
    assert!(!store.contains(&key("C")));
}

#[test]
fn get_after_put_returns_same_texture() {
    let mut backend = SoftwareBackend::new(4, 4, Color::BLACK);
    let mut cache = DrawCache::init(CacheConfig::with_entries(8));
    let tex = texture(&mut backend, 2);
    let raw = tex.raw();
    cache.put_cached(&mut backend, key("A"), tex);

    assert_eq!(cache.get_cached(&key("A")).map(TextureId::raw), Some(raw));
    assert!(cache.get_cached(&key("B")).is_none());
    cache.shutdown(&mut backend);
}

#[test]
fn entry_bound_is_never_exceeded() {
    let mut backend = SoftwareBackend::new(4, 4, Color::BLACK);
    let mut cache = DrawCache::init(CacheConfig::with_entries(3));
    for n in 0..10 {
        let tex = texture(&mut backend, 2);
        cache.put_cached(&mut backend, key(&n.to_string()), tex);
        assert!(cache.len() <= 3);
        assert_eq!(backend.live_textures(), cache.len());
    }
    assert_eq!(cache.stats().evictions, 7);
    cache.shutdown(&mut backend);
    assert_eq!(backend.live_textures(), 0);
}

#[test]
fn byte_budget_counts_texture_area() {
    let mut backend = SoftwareBackend::new(4, 4, Color::BLACK);
    // Each 4x4 texture weighs 64 bytes.
    let mut cache = DrawCache::init(CacheConfig::with_bytes(150));
    for name in ["A", "B", "C"] {
        let tex = texture(&mut backend, 4);
        cache.put_cached(&mut backend, key(name), tex);
    }
    let stats = cache.stats();
    assert_eq!(stats.entries, 2);
    assert_eq!(stats.bytes, 128);
    assert!(!cache.contains(&key("A")));
    assert_eq!(backend.stats().destroyed, 1);
    cache.shutdown(&mut backend);
}

#[test]
fn oversized_texture_is_cached_alone() {
    let mut backend = SoftwareBackend::new(4, 4, Color::BLACK);
    let mut cache = DrawCache::init(CacheConfig::with_bytes(100));
    let small = texture(&mut backend, 2);
    cache.put_cached(&mut backend, key("small"), small);
    let big = texture(&mut backend, 16);
    cache.put_cached(&mut backend, key("big"), big);

    assert_eq!(cache.len(), 1);
    assert!(cache.contains(&key("big")));
    assert_eq!(backend.live_textures(), 1);
    cache.shutdown(&mut backend);
    assert_eq!(backend.live_textures(), 0);
}

#[test]
fn replacing_a_key_destroys_old_texture_once() {
    let mut backend = SoftwareBackend::new(4, 4, Color::BLACK);
    let mut cache = DrawCache::init(CacheConfig::with_entries(4));
    let first = texture(&mut backend, 2);
    cache.put_cached(&mut backend, key("A"), first);
    let second = texture(&mut backend, 2);
    let second_raw = second.raw();
    cache.put_cached(&mut backend, key("A"), second);

    assert_eq!(cache.len(), 1);
    assert_eq!(backend.stats().destroyed, 1);
    assert_eq!(cache.stats().replacements, 1);
    assert_eq!(cache.peek(&key("A")).map(TextureId::raw), Some(second_raw));

    cache.shutdown(&mut backend);
    assert_eq!(backend.stats().destroyed, 2);
    assert_eq!(backend.stats().created, 2);
}

#[test]
fn clear_releases_every_texture_and_payload() {
    let mut backend = SoftwareBackend::new(4, 4, Color::BLACK);
    let mut cache = DrawCache::init(CacheConfig::with_entries(8));
    let dropped = Rc::new(Cell::new(0));
    for n in 0..5 {
        let counter = Rc::clone(&dropped);
        let tex = texture(&mut backend, 2);
        cache.put_cached_with_payload(
            &mut backend,
            key(&n.to_string()),
            tex,
            Payload::with_destructor(n, move |_| counter.set(counter.get() + 1)),
        );
    }
    cache.clear(&mut backend);
    assert!(cache.is_empty());
    assert_eq!(backend.live_textures(), 0);
    assert_eq!(dropped.get(), 5);

    // The cache stays usable after a clear.
    let tex = texture(&mut backend, 2);
    cache.put_cached(&mut backend, key("again"), tex);
    assert_eq!(cache.len(), 1);
    cache.shutdown(&mut backend);
    assert_eq!(backend.live_textures(), 0);
}

#[test]
fn failed_lookup_keeps_recency_order() {
    let mut backend = SoftwareBackend::new(4, 4, Color::BLACK);
    let mut cache = DrawCache::init(CacheConfig::with_entries(4));
    for name in ["A", "B", "C"] {
        let tex = texture(&mut backend, 2);
        cache.put_cached(&mut backend, key(name), tex);
    }
    let before: Vec<_> = cache.keys_mru().cloned().collect();
    assert!(cache.get_cached(&key("missing")).is_none());
    let after: Vec<_> = cache.keys_mru().cloned().collect();
    assert_eq!(before, after);
    assert_eq!(after.first(), Some(&key("C")));
    cache.shutdown(&mut backend);
}

#[test]
fn keys_are_byte_canonical() {
    let a = ShadowKey {
        width: 40,
        height: 30,
        radius: 4,
        blur: 10,
        offset_x: 0,
        offset_y: 2,
    };
    let b = a;
    assert_eq!(a.cache_key(), b.cache_key());
    assert!(key_equals(a.cache_key().as_bytes(), b.cache_key().as_bytes()));
    assert_eq!(
        key_hash(a.cache_key().as_bytes()),
        key_hash(b.cache_key().as_bytes())
    );

    let moved = ShadowKey { offset_y: 3, ..a };
    assert_ne!(a.cache_key(), moved.cache_key());
}

#[test]
fn different_shapes_never_collide() {
    let keys = [
        RectBgKey {
            circle: false,
            radius: 4,
            width: 5,
            height: 5,
        }
        .cache_key(),
        RectBgKey {
            circle: true,
            radius: 4,
            width: 5,
            height: 5,
        }
        .cache_key(),
        BorderKey {
            rout: 4,
            rin: 5,
            width: 5,
            height: 0,
            thickness: 0,
            side: 0,
        }
        .cache_key(),
        ImageKey {
            id: 4,
            width: 5,
            height: 5,
        }
        .cache_key(),
    ];
    for (i, a) in keys.iter().enumerate() {
        for b in keys.iter().skip(i + 1) {
            assert!(!key_equals(a.as_bytes(), b.as_bytes()));
        }
    }
}

#[test]
fn shrinking_the_bound_evicts_least_recent() {
    let mut backend = SoftwareBackend::new(4, 4, Color::BLACK);
    let mut cache = DrawCache::init(CacheConfig::with_entries(4));
    for name in ["A", "B", "C", "D"] {
        let tex = texture(&mut backend, 2);
        cache.put_cached(&mut backend, key(name), tex);
    }
    assert!(cache.get_cached(&key("A")).is_some());
    cache.set_capacity(&mut backend, Capacity::Entries(2));

    assert!(cache.contains(&key("A")));
    assert!(cache.contains(&key("D")));
    assert!(!cache.contains(&key("B")));
    assert_eq!(backend.live_textures(), 2);
    cache.shutdown(&mut backend);
}
