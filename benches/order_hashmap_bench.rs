use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use order_hashmap::OrderHashMap;
use std::time::Duration;

fn lcg(mut s: u64) -> impl Iterator<Item = u64> {
    std::iter::from_fn(move || {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        Some(s)
    })
}

fn key(n: u64) -> String {
    format!("k{:016x}", n)
}

fn bench_insert(c: &mut Criterion) {
    c.bench_function("order_hashmap_insert_10k", |b| {
        b.iter_batched(
            || lcg(1).take(10_000).map(key).collect::<Vec<_>>(),
            |keys| {
                let mut m = OrderHashMap::<String, u64>::new();
                for (i, k) in keys.into_iter().enumerate() {
                    m.insert(k, i as u64);
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_get_hit(c: &mut Criterion) {
    c.bench_function("order_hashmap_get_hit", |b| {
        let mut m = OrderHashMap::new();
        let keys: Vec<_> = lcg(7).take(20_000).map(key).collect();
        for (i, k) in keys.iter().enumerate() {
            m.insert(k.clone(), i as u64);
        }
        let mut it = keys.iter().cycle();
        b.iter(|| {
            let k = it.next().unwrap();
            black_box(m.get(k.as_str()));
        })
    });
}

fn bench_get_miss(c: &mut Criterion) {
    c.bench_function("order_hashmap_get_miss", |b| {
        let mut m = OrderHashMap::new();
        for (i, x) in lcg(11).take(10_000).enumerate() {
            m.insert(key(x), i as u64);
        }
        let mut miss = lcg(0xdead_beef);
        b.iter(|| {
            // generate keys unlikely in map
            let k = key(miss.next().unwrap());
            black_box(m.get(k.as_str()));
        })
    });
}

fn bench_iter(c: &mut Criterion) {
    c.bench_function("order_hashmap_iter_10k", |b| {
        let mut m = OrderHashMap::new();
        for (i, x) in lcg(13).take(10_000).enumerate() {
            m.insert(key(x), i as u64);
        }
        b.iter(|| {
            let mut acc = 0u64;
            for (_, v) in m.iter() {
                acc = acc.wrapping_add(*v);
            }
            black_box(acc)
        })
    });
}

fn bench_insert_remove_churn(c: &mut Criterion) {
    c.bench_function("order_hashmap_insert_remove_churn", |b| {
        let keys: Vec<_> = lcg(17).take(1_000).map(key).collect();
        b.iter_batched(
            || {
                let mut m = OrderHashMap::new();
                for (i, k) in keys.iter().enumerate() {
                    m.insert(k.clone(), i as u64);
                }
                m
            },
            |mut m| {
                for k in &keys {
                    m.remove(k.as_str());
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_config() -> Criterion {
    Criterion::default()
        .sample_size(50)
        .measurement_time(Duration::from_secs(8))
        .warm_up_time(Duration::from_secs(2))
}

criterion_group! {
    name = benches;
    config = bench_config();
    targets = bench_insert, bench_get_hit, bench_get_miss, bench_iter, bench_insert_remove_churn
}
criterion_main!(benches);
