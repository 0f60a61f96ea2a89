use chess::{Board, ChessMove, Piece, Square};
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use recon_core::belief::{BeliefGrid, CandidateMove};
use std::str::FromStr;

fn spread_grid(seed: u64) -> BeliefGrid {
    let mut grid = BeliefGrid::with_seed(&Board::default(), seed);
    let moves = [
        ("e7e5", Piece::Pawn, 0.3),
        ("d7d5", Piece::Pawn, 0.3),
        ("g8f6", Piece::Knight, 0.2),
        ("b8c6", Piece::Knight, 0.2),
    ];
    let list: Vec<CandidateMove> = moves
        .iter()
        .map(|&(text, class, chance)| {
            let mv = ChessMove::new(
                Square::from_str(&text[..2]).unwrap(),
                Square::from_str(&text[2..]).unwrap(),
                None,
            );
            CandidateMove::new(mv, class, chance)
        })
        .collect();
    grid.handle_opponent_move(list, false, None);
    grid
}

fn belief_turn_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("belief_turn");

    group.bench_function("uncertainty_map", |b| {
        let grid = spread_grid(11);
        b.iter(|| black_box(grid.board_uncertainty()));
    });

    group.bench_function("choose_sense", |b| {
        let grid = spread_grid(11);
        b.iter(|| black_box(grid.choose_sense()));
    });

    group.bench_function("sample_board", |b| {
        let mut grid = spread_grid(11);
        b.iter(|| black_box(grid.sample_board()));
    });

    group.bench_function("capture_inference", |b| {
        b.iter(|| {
            let mut grid = spread_grid(11);
            grid.handle_opponent_move(
                Vec::new(),
                true,
                Some(Square::from_str("e2").unwrap()),
            );
            black_box(grid.estimated_state_count())
        });
    });

    group.finish();
}

criterion_group!(benches, belief_turn_bench);
criterion_main!(benches);
