use criterion::{black_box, criterion_group, criterion_main, Criterion};

use ferrite::board::position::Position;
use ferrite::eval::evaluate::evaluate;
use ferrite::movegen::magic::init_attack_tables;
use ferrite::search::alphabeta::SearchEngine;

const KIWIPETE: &str = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";
const CMK_POSITION: &str = "r2q1rk1/ppp2ppp/2n1bn2/2b1p3/3pP3/3P1NPP/PPP1NPB1/R1BQ1RK1 b - - 0 9";

fn evaluate_benchmark(c: &mut Criterion) {
    init_attack_tables();

    let mut group = c.benchmark_group("Evaluation");

    for (name, fen) in [("kiwipete", KIWIPETE), ("cmk", CMK_POSITION)] {
        let pos = Position::from_fen(fen).unwrap();
        group.bench_function(name, |b| {
            b.iter(|| black_box(evaluate(black_box(&pos))));
        });
    }

    group.finish();
}

fn search_benchmark(c: &mut Criterion) {
    init_attack_tables();

    let mut group = c.benchmark_group("Fixed Depth Search");
    group.sample_size(10);

    for (name, fen) in [("startpos", None), ("kiwipete", Some(KIWIPETE))] {
        group.bench_function(name, |b| {
            let mut engine = SearchEngine::new(16).unwrap();
            b.iter(|| {
                let mut pos = match fen {
                    Some(fen) => Position::from_fen(fen).unwrap(),
                    None => Position::startpos(),
                };
                black_box(engine.find_best_move(&mut pos, 5))
            });
        });
    }

    group.finish();
}

criterion_group!(benches, evaluate_benchmark, search_benchmark);
criterion_main!(benches);
