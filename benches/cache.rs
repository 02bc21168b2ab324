// this_file: benches/cache.rs
//! Benchmarks for key building, cache lookups and cached drawing

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use drawcache::key::{RectBgKey, ShadowKey};
use drawcache::{
    Area, Backend, CacheConfig, Color, DrawCache, RectDsc, Renderer, ShapeKey, SoftwareBackend,
};

fn bench_keys(c: &mut Criterion) {
    c.bench_function("shadow_key_build", |b| {
        b.iter(|| {
            black_box(
                ShadowKey {
                    width: black_box(120),
                    height: 80,
                    radius: 12,
                    blur: 20,
                    offset_x: 0,
                    offset_y: 4,
                }
                .cache_key(),
            )
        });
    });
}

fn bench_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache_lookup");
    for entries in [16usize, 256, 4096] {
        let mut backend = SoftwareBackend::new(8, 8, Color::BLACK);
        let mut cache = DrawCache::init(CacheConfig::with_entries(entries));
        let keys: Vec<_> = (0..entries as i32)
            .map(|radius| {
                RectBgKey {
                    circle: false,
                    radius,
                    width: 8,
                    height: 8,
                }
                .cache_key()
            })
            .collect();
        for key in &keys {
            let texture = backend
                .create_texture_from_alpha(&[0xFF; 4], 2, 2, 2)
                .expect("texture");
            cache.put_cached(&mut backend, key.clone(), texture);
        }

        group.bench_with_input(BenchmarkId::from_parameter(entries), &keys, |b, keys| {
            let mut i = 0;
            b.iter(|| {
                i = (i + 1) % keys.len();
                black_box(cache.get_cached(&keys[i]).is_some())
            });
        });
        cache.shutdown(&mut backend);
    }
    group.finish();
}

fn bench_draw(c: &mut Criterion) {
    let clip = Area::from_origin_size(0, 0, 256, 256);
    let dsc = RectDsc {
        radius: 16,
        border_width: 3,
        shadow_width: 12,
        shadow_ofs_y: 4,
        ..RectDsc::default()
    };

    c.bench_function("draw_rect_cached", |b| {
        let mut renderer = Renderer::new(
            SoftwareBackend::new(256, 256, Color::WHITE),
            CacheConfig::default(),
        );
        renderer.draw_rect(&Area::new(32, 32, 223, 223), &clip, &dsc);
        b.iter(|| renderer.draw_rect(black_box(&Area::new(32, 32, 223, 223)), &clip, &dsc));
        renderer.shutdown();
    });

    c.bench_function("draw_rect_uncached", |b| {
        let mut renderer = Renderer::new(
            SoftwareBackend::new(256, 256, Color::WHITE),
            CacheConfig::with_entries(1),
        );
        let mut grow = 0;
        b.iter(|| {
            grow = (grow + 1) % 16;
            renderer.draw_rect(&Area::new(32, 32, 207 + grow, 223), &clip, &dsc)
        });
        renderer.shutdown();
    });
}

criterion_group!(benches, bench_keys, bench_lookup, bench_draw);
criterion_main!(benches);
