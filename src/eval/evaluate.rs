use crate::board::bitboard::iter_bits;
use crate::board::position::{PieceType, Position, Side};
use crate::eval::pst::{mirror, PST};

pub const PIECE_VALUES: [i32; 6] = [100, 320, 330, 500, 900, 0];

// Phase weights per piece; a full board sums to 24.
const PHASE_WEIGHTS: [i32; 6] = [0, 1, 1, 2, 4, 0];
const TOTAL_PHASE: i32 = 24;

const PIECE_TYPES: [PieceType; 6] = [
    PieceType::Pawn,
    PieceType::Knight,
    PieceType::Bishop,
    PieceType::Rook,
    PieceType::Queen,
    PieceType::King,
];

/// Static evaluation in centipawns from the side-to-move's perspective:
/// tapered material plus piece-square terms, scaled down as the halfmove
/// clock approaches the fifty-move rule.
pub fn evaluate(pos: &Position) -> i32 {
    let mut mg = 0i32;
    let mut eg = 0i32;
    let mut phase = 0i32;

    for (slot, &piece) in PIECE_TYPES.iter().enumerate() {
        let table = &PST[slot];
        let value = PIECE_VALUES[slot];

        for square in iter_bits(pos.piece_bitboard(piece, Side::White)) {
            mg += value + table.mg[square as usize];
            eg += value + table.eg[square as usize];
            phase += PHASE_WEIGHTS[slot];
        }

        for square in iter_bits(pos.piece_bitboard(piece, Side::Black)) {
            let square = mirror(square) as usize;
            mg -= value + table.mg[square];
            eg -= value + table.eg[square];
            phase += PHASE_WEIGHTS[slot];
        }
    }

    let phase = phase.min(TOTAL_PHASE);
    let score = (mg * phase + eg * (TOTAL_PHASE - phase)) / TOTAL_PHASE;

    let score = if pos.side_to_move == Side::Black { -score } else { score };

    score * (100 - pos.halfmove_clock as i32) / 100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_startpos_is_balanced() {
        assert_eq!(evaluate(&Position::startpos()), 0);
    }

    #[test]
    fn test_perspective_flips_with_side_to_move() {
        let white_up = "4k3/8/8/8/8/8/8/Q3K3 w - - 0 1";
        let black_view = "4k3/8/8/8/8/8/8/Q3K3 b - - 0 1";
        let white_score = evaluate(&Position::from_fen(white_up).unwrap());
        let black_score = evaluate(&Position::from_fen(black_view).unwrap());
        assert!(white_score > 0);
        assert_eq!(white_score, -black_score);
    }

    #[test]
    fn test_material_dominates() {
        let up_a_queen = Position::from_fen("4k3/8/8/8/8/8/8/Q3K3 w - - 0 1").unwrap();
        assert!(evaluate(&up_a_queen) > 700);
    }

    #[test]
    fn test_halfmove_clock_scales_score_down() {
        let fresh = Position::from_fen("4k3/8/8/8/8/8/8/Q3K3 w - - 0 1").unwrap();
        let stale = Position::from_fen("4k3/8/8/8/8/8/8/Q3K3 w - - 50 60" ).unwrap();
        assert_eq!(evaluate(&stale), evaluate(&fresh) / 2);
    }
}
