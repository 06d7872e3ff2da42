use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use ferrite::board::position::Position;
use ferrite::movegen::magic::init_attack_tables;
use ferrite::movegen::moves::{generate_moves, perft, MoveList};

const KIWIPETE: &str = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";

fn movegen_benchmark(c: &mut Criterion) {
    init_attack_tables();

    let mut group = c.benchmark_group("Move Generation");
    group.throughput(Throughput::Elements(1));

    group.bench_function("startpos", |b| {
        let pos = Position::startpos();
        b.iter(|| {
            let mut moves = MoveList::new();
            generate_moves(black_box(&pos), &mut moves);
            black_box(moves.len())
        });
    });

    group.bench_function("kiwipete", |b| {
        let pos = Position::from_fen(KIWIPETE).unwrap();
        b.iter(|| {
            let mut moves = MoveList::new();
            generate_moves(black_box(&pos), &mut moves);
            black_box(moves.len())
        });
    });

    group.finish();
}

fn perft_benchmark(c: &mut Criterion) {
    init_attack_tables();

    let mut group = c.benchmark_group("Perft");
    group.sample_size(20);

    group.bench_function("startpos depth 4", |b| {
        b.iter(|| {
            let mut pos = Position::startpos();
            black_box(perft(&mut pos, 4))
        });
    });

    group.bench_function("kiwipete depth 3", |b| {
        b.iter(|| {
            let mut pos = Position::from_fen(KIWIPETE).unwrap();
            black_box(perft(&mut pos, 3))
        });
    });

    group.finish();
}

criterion_group!(benches, movegen_benchmark, perft_benchmark);
criterion_main!(benches);
