use crate::engine::Move;
use crate::logic::board::{Board, Color, PieceKind, Square};
use crate::logic::generator::MoveGenerator;
use crate::logic::lookup::{AttackTables, BISHOP_DIRECTIONS, ROOK_DIRECTIONS};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum MoveError {
    #[error("square is outside the board")]
    InvalidSquare,
    #[error("no piece on the origin square")]
    NoPieceAtOrigin,
    #[error("piece belongs to the side not on move")]
    WrongSideToMove,
    #[error("move is not legal in this position")]
    IllegalMove,
    #[error("pawn reaches the last rank and needs a promotion piece")]
    PromotionRequired,
    #[error("search depth is out of range")]
    SearchDepthInvalid,
    #[error("the game is over")]
    GameOver,
    #[error("no move to undo")]
    NothingToUndo,
    #[error("search response does not match the outstanding request")]
    StaleSearchResponse,
    #[error("no search is outstanding")]
    NoSearchPending,
}

/// True if any piece of `by` could capture on `sq`.
///
/// Pawns count only for their diagonal captures, whether or not `sq` is
/// occupied. Castling never captures, so it plays no part here.
pub fn is_attacked(board: &Board, sq: Square, by: Color) -> bool {
    let tables = AttackTables::get();
    let is_enemy = |at: Square, kinds: &[PieceKind]| {
        board
            .piece_at(at)
            .is_some_and(|p| p.color == by && kinds.contains(&p.kind))
    };

    // A pawn of `by` attacks from one step behind, relative to its direction of travel.
    let behind = -by.pawn_direction();
    for d_col in [-1, 1] {
        if let Some(from) = sq.offset(behind, d_col) {
            if is_enemy(from, &[PieceKind::Pawn]) {
                return true;
            }
        }
    }

    if tables
        .knight_targets(sq)
        .iter()
        .any(|&from| is_enemy(from, &[PieceKind::Knight]))
    {
        return true;
    }

    if tables
        .king_targets(sq)
        .iter()
        .any(|&from| is_enemy(from, &[PieceKind::King]))
    {
        return true;
    }

    let slider_hit = |direction: usize, kinds: &[PieceKind]| {
        tables
            .ray(sq, direction)
            .iter()
            .find(|&&at| board.piece_at(at).is_some())
            .is_some_and(|&at| is_enemy(at, kinds))
    };

    ROOK_DIRECTIONS.into_iter().any(|d| slider_hit(d, &[PieceKind::Rook, PieceKind::Queen]))
        || BISHOP_DIRECTIONS
            .into_iter()
            .any(|d| slider_hit(d, &[PieceKind::Bishop, PieceKind::Queen]))
}

/// Checks if `color`'s king is attacked. A board without that king is never in check.
pub fn is_in_check(board: &Board, color: Color) -> bool {
    board
        .king_square(color)
        .is_some_and(|king| is_attacked(board, king, color.opposite()))
}

pub fn is_checkmate(board: &Board, color: Color) -> bool {
    is_in_check(board, color) && !MoveGenerator::new().has_legal_moves(board, color)
}

pub fn is_stalemate(board: &Board, color: Color) -> bool {
    !is_in_check(board, color) && !MoveGenerator::new().has_legal_moves(board, color)
}

/// Finds the legal move matching `from`/`to`/`promotion` for the side to move.
pub fn is_valid_move(
    board: &Board,
    from: Square,
    to: Square,
    promotion: Option<PieceKind>,
) -> Result<Move, MoveError> {
    let piece = board.piece_at(from).ok_or(MoveError::NoPieceAtOrigin)?;
    if piece.color != board.side_to_move {
        return Err(MoveError::WrongSideToMove);
    }

    let candidates: Vec<Move> = MoveGenerator::new()
        .legal_moves(board, from)
        .into_iter()
        .filter(|mv| mv.to == to)
        .collect();

    if candidates.is_empty() {
        return Err(MoveError::IllegalMove);
    }

    let promotes = candidates.iter().any(|mv| mv.promotion.is_some());
    match (promotes, promotion) {
        (true, None) => Err(MoveError::PromotionRequired),
        (_, choice) => candidates
            .into_iter()
            .find(|mv| mv.promotion == choice)
            .ok_or(MoveError::IllegalMove),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::board::Piece;

    fn sq(name: &str) -> Square {
        Square::from_algebraic(name).unwrap()
    }

    fn place(board: &mut Board, name: &str, kind: PieceKind, color: Color) {
        board.set_piece(sq(name), Some(Piece::new(kind, color)));
    }

    #[test]
    fn test_pawn_attacks_diagonally_only() {
        let mut board = Board::empty();
        place(&mut board, "e4", PieceKind::Pawn, Color::White);
        assert!(is_attacked(&board, sq("d5"), Color::White));
        assert!(is_attacked(&board, sq("f5"), Color::White));
        assert!(!is_attacked(&board, sq("e5"), Color::White));
        assert!(!is_attacked(&board, sq("d3"), Color::White));

        place(&mut board, "e5", PieceKind::Pawn, Color::Black);
        assert!(is_attacked(&board, sq("d4"), Color::Black));
        assert!(!is_attacked(&board, sq("d6"), Color::Black));
    }

    #[test]
    fn test_sliders_are_blocked() {
        let mut board = Board::empty();
        place(&mut board, "a1", PieceKind::Rook, Color::Black);
        assert!(is_attacked(&board, sq("a8"), Color::Black));
        assert!(is_attacked(&board, sq("h1"), Color::Black));
        assert!(!is_attacked(&board, sq("b2"), Color::Black));

        place(&mut board, "a4", PieceKind::Knight, Color::White);
        assert!(is_attacked(&board, sq("a4"), Color::Black));
        assert!(!is_attacked(&board, sq("a5"), Color::Black));

        place(&mut board, "c3", PieceKind::Queen, Color::Black);
        assert!(is_attacked(&board, sq("h8"), Color::Black));
        assert!(is_attacked(&board, sq("a5"), Color::Black));
    }

    #[test]
    fn test_knight_and_king_attacks() {
        let mut board = Board::empty();
        place(&mut board, "g1", PieceKind::Knight, Color::White);
        place(&mut board, "e8", PieceKind::King, Color::Black);
        assert!(is_attacked(&board, sq("f3"), Color::White));
        assert!(is_attacked(&board, sq("e2"), Color::White));
        assert!(!is_attacked(&board, sq("g3"), Color::White));
        assert!(is_attacked(&board, sq("d7"), Color::Black));
        assert!(!is_attacked(&board, sq("e6"), Color::Black));
    }

    #[test]
    fn test_check_detection() {
        let board = Board::from_fen("4k3/8/8/8/8/8/8/4K2r w - - 0 1").unwrap();
        assert!(is_in_check(&board, Color::White));
        assert!(!is_in_check(&board, Color::Black));
        assert!(!is_checkmate(&board, Color::White));
    }

    #[test]
    fn test_missing_king_is_not_in_check() {
        let board = Board::empty();
        assert!(!is_in_check(&board, Color::White));
    }

    #[test]
    fn test_back_rank_mate() {
        let board = Board::from_fen("3R2k1/5ppp/8/8/8/8/8/6K1 b - - 0 1").unwrap();
        assert!(is_checkmate(&board, Color::Black));
        assert!(!is_stalemate(&board, Color::Black));
    }

    #[test]
    fn test_stalemate() {
        let board = Board::from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap();
        assert!(is_stalemate(&board, Color::Black));
        assert!(!is_checkmate(&board, Color::Black));
    }

    #[test]
    fn test_is_valid_move_errors() {
        let board = Board::new();
        assert_eq!(
            is_valid_move(&board, sq("e4"), sq("e5"), None),
            Err(MoveError::NoPieceAtOrigin)
        );
        assert_eq!(
            is_valid_move(&board, sq("e7"), sq("e5"), None),
            Err(MoveError::WrongSideToMove)
        );
        assert_eq!(
            is_valid_move(&board, sq("e2"), sq("e5"), None),
            Err(MoveError::IllegalMove)
        );
        assert_eq!(
            is_valid_move(&board, sq("e2"), sq("e4"), Some(PieceKind::Queen)),
            Err(MoveError::IllegalMove)
        );
        let mv = is_valid_move(&board, sq("e2"), sq("e4"), None).unwrap();
        assert!(mv.is_double_push());
    }

    #[test]
    fn test_is_valid_move_promotion() {
        let board = Board::from_fen("4k3/P7/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        assert_eq!(
            is_valid_move(&board, sq("a7"), sq("a8"), None),
            Err(MoveError::PromotionRequired)
        );
        assert_eq!(
            is_valid_move(&board, sq("a7"), sq("a8"), Some(PieceKind::King)),
            Err(MoveError::IllegalMove)
        );
        let mv = is_valid_move(&board, sq("a7"), sq("a8"), Some(PieceKind::Knight)).unwrap();
        assert_eq!(mv.promotion, Some(PieceKind::Knight));
    }
}
