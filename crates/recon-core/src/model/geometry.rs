//! Board geometry helpers: offsets, rays, and perspective mirroring.
//!
//! All bounds checks live here; callers never index the board with a raw,
//! unchecked coordinate.

use chess::{ChessMove, File, Rank, Square};

/// Knight jump offsets as `(rank delta, file delta)`.
pub const KNIGHT_OFFSETS: [(i32, i32); 8] = [
    (2, 1),
    (1, 2),
    (2, -1),
    (1, -2),
    (-1, 2),
    (-2, 1),
    (-1, -2),
    (-2, -1),
];

/// Horizontal/vertical ray directions.
pub const STRAIGHT_DIRS: [(i32, i32); 4] = [(0, 1), (0, -1), (1, 0), (-1, 0)];

/// Diagonal ray directions.
pub const DIAGONAL_DIRS: [(i32, i32); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];

pub fn square_at(rank: usize, file: usize) -> Square {
    Square::make_square(Rank::from_index(rank), File::from_index(file))
}

pub fn rank_of(square: Square) -> usize {
    square.get_rank().to_index()
}

pub fn file_of(square: Square) -> usize {
    square.get_file().to_index()
}

/// Steps from `(rank, file)` by the given deltas, returning `None` when the
/// result leaves the board.
pub fn offset(rank: usize, file: usize, dr: i32, df: i32) -> Option<(usize, usize)> {
    let r = rank as i32 + dr;
    let f = file as i32 + df;
    if (0..8).contains(&r) && (0..8).contains(&f) {
        Some((r as usize, f as usize))
    } else {
        None
    }
}

/// Point-reflects a square through the board center.
pub fn mirror_square(square: Square) -> Square {
    square_at(7 - rank_of(square), 7 - file_of(square))
}

/// Mirrors a move, preserving any promotion piece.
pub fn mirror_move(mv: ChessMove) -> ChessMove {
    ChessMove::new(
        mirror_square(mv.get_source()),
        mirror_square(mv.get_dest()),
        mv.get_promotion(),
    )
}
