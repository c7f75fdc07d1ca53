//! Benchmarks for the explorer's hot paths.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::prelude::*;

use cdbwalk::fen::parse_fen;
use cdbwalk::packed::{decode, encode, PackedKey};
use cdbwalk::progress::progress_index;
use cdbwalk::shard::{ShardedDepthMap, ShardedSet};
use shakmaty::Chess;

const KIWIPETE: &str = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";

fn bench_progress(c: &mut Criterion) {
    let mut group = c.benchmark_group("progress");

    let startpos = Chess::default();
    group.bench_function("startpos", |b| {
        b.iter(|| progress_index(black_box(&startpos)))
    });

    let kiwipete = parse_fen(KIWIPETE).expect("valid fen");
    group.bench_function("kiwipete", |b| {
        b.iter(|| progress_index(black_box(&kiwipete)))
    });

    group.finish();
}

fn bench_packed(c: &mut Criterion) {
    let mut group = c.benchmark_group("packed");

    let kiwipete = parse_fen(KIWIPETE).expect("valid fen");
    group.bench_function("encode", |b| b.iter(|| encode(black_box(&kiwipete))));

    let key = encode(&kiwipete);
    group.bench_function("decode", |b| {
        b.iter(|| decode(black_box(&key)).expect("decodable"))
    });

    group.finish();
}

fn bench_sharded(c: &mut Criterion) {
    let mut group = c.benchmark_group("sharded");

    let mut rng = StdRng::seed_from_u64(42);
    let keys: Vec<PackedKey> = (0..10_000)
        .map(|_| {
            let mut bytes = [0u8; 24];
            rng.fill(&mut bytes[..]);
            PackedKey::from_bytes(bytes)
        })
        .collect();

    group.bench_function("set_insert_10k", |b| {
        b.iter(|| {
            let set = ShardedSet::new();
            for key in &keys {
                set.insert_if_absent(black_box(*key));
            }
            set.len()
        })
    });

    group.bench_function("map_upsert_10k", |b| {
        b.iter(|| {
            let map = ShardedDepthMap::new();
            for (i, key) in keys.iter().enumerate() {
                map.upsert_max(black_box(*key), (i % 16) as i16);
            }
            map.len()
        })
    });

    group.finish();
}

criterion_group!(benches, bench_progress, bench_packed, bench_sharded);
criterion_main!(benches);
