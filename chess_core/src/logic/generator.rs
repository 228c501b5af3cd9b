use crate::engine::{CastleSide, Move, MoveKind};
use crate::logic::board::{Board, Color, Piece, PieceKind, Square, BOARD_SIZE};
use crate::logic::lookup::{AttackTables, BISHOP_DIRECTIONS, QUEEN_DIRECTIONS, ROOK_DIRECTIONS};
use crate::logic::rules::{is_attacked, is_in_check};
use std::ops::Range;

const KING_HOME_COL: usize = 4;

#[derive(Debug, Clone, Copy, Default)]
pub struct MoveGenerator;

impl MoveGenerator {
    pub const fn new() -> Self {
        Self
    }

    /// Moves following the movement pattern of the piece on `from`, ignoring
    /// whether they leave the mover's own king attacked. Castling is the
    /// exception: its attacked-square conditions are already enforced here.
    pub fn pseudo_moves(&self, board: &Board, from: Square) -> Vec<Move> {
        let mut moves = Vec::with_capacity(32);
        let Some(piece) = board.piece_at(from) else {
            return moves;
        };

        match piece.kind {
            PieceKind::Pawn => self.generate_pawn_moves(board, from, piece, &mut moves),
            PieceKind::Knight => {
                let targets = AttackTables::get().knight_targets(from);
                self.generate_step_moves(board, from, piece, targets, &mut moves);
            }
            PieceKind::Bishop => {
                self.generate_sliding_moves(board, from, piece, BISHOP_DIRECTIONS, &mut moves);
            }
            PieceKind::Rook => {
                self.generate_sliding_moves(board, from, piece, ROOK_DIRECTIONS, &mut moves);
            }
            PieceKind::Queen => {
                self.generate_sliding_moves(board, from, piece, QUEEN_DIRECTIONS, &mut moves);
            }
            PieceKind::King => {
                let targets = AttackTables::get().king_targets(from);
                self.generate_step_moves(board, from, piece, targets, &mut moves);
                self.generate_castling_moves(board, from, piece, &mut moves);
            }
        }

        moves
    }

    /// Pseudo moves of the piece on `from` that keep its own king safe.
    pub fn legal_moves(&self, board: &Board, from: Square) -> Vec<Move> {
        let Some(piece) = board.piece_at(from) else {
            return Vec::new();
        };
        let mut work = board.clone();
        self.pseudo_moves(board, from)
            .into_iter()
            .filter(|mv| Self::keeps_king_safe(&mut work, mv, piece.color))
            .collect()
    }

    /// Every legal move of `color`, in row-major order of the origin square.
    pub fn all_legal_moves(&self, board: &Board, color: Color) -> Vec<Move> {
        let mut moves = Vec::with_capacity(64);
        for (from, piece) in board.pieces() {
            if piece.color == color {
                moves.extend(self.legal_moves(board, from));
            }
        }
        moves
    }

    /// Checks if `color` has at least one legal move.
    /// Returns as soon as one is found.
    pub fn has_legal_moves(&self, board: &Board, color: Color) -> bool {
        let mut work = board.clone();
        board
            .pieces()
            .filter(|(_, piece)| piece.color == color)
            .any(|(from, _)| {
                self.pseudo_moves(board, from)
                    .iter()
                    .any(|mv| Self::keeps_king_safe(&mut work, mv, color))
            })
    }

    // Plays `mv` on the scratch board and takes it back again.
    fn keeps_king_safe(work: &mut Board, mv: &Move, color: Color) -> bool {
        let Some(undo) = work.make_move(mv) else {
            return false;
        };
        let safe = !is_in_check(work, color);
        work.undo_move(mv, &undo);
        safe
    }

    fn generate_pawn_moves(&self, board: &Board, from: Square, piece: Piece, moves: &mut Vec<Move>) {
        let color = piece.color;
        let dir = color.pawn_direction();

        if let Some(one) = from.offset(dir, 0) {
            if board.piece_at(one).is_none() {
                push_pawn_move(Move::new(from, one, MoveKind::Quiet), color, moves);

                if from.row() == color.pawn_start_row() {
                    if let Some(two) = from.offset(2 * dir, 0) {
                        if board.piece_at(two).is_none() {
                            moves.push(Move::new(from, two, MoveKind::DoublePush));
                        }
                    }
                }
            }
        }

        for d_col in [-1, 1] {
            let Some(target) = from.offset(dir, d_col) else {
                continue;
            };
            match board.piece_at(target) {
                Some(victim) if victim.color != color => {
                    push_pawn_move(Move::new(from, target, MoveKind::Capture), color, moves);
                }
                Some(_) => {}
                None => {
                    if Self::is_en_passant_target(board, from, target, color) {
                        moves.push(Move::new(from, target, MoveKind::EnPassant));
                    }
                }
            }
        }
    }

    // The target must be the stored one, the capture must be made by the side
    // to move, and the double-pushed pawn must sit beside the capturer.
    fn is_en_passant_target(board: &Board, from: Square, target: Square, color: Color) -> bool {
        if board.en_passant != Some(target) || board.side_to_move != color {
            return false;
        }
        Square::new(from.row(), target.col())
            .ok()
            .and_then(|sq| board.piece_at(sq))
            .is_some_and(|p| p.kind == PieceKind::Pawn && p.color != color)
    }

    fn generate_step_moves(
        &self,
        board: &Board,
        from: Square,
        piece: Piece,
        targets: &[Square],
        moves: &mut Vec<Move>,
    ) {
        for &to in targets {
            match board.piece_at(to) {
                None => moves.push(Move::new(from, to, MoveKind::Quiet)),
                Some(other) if other.color != piece.color => {
                    moves.push(Move::new(from, to, MoveKind::Capture));
                }
                Some(_) => {}
            }
        }
    }

    fn generate_sliding_moves(
        &self,
        board: &Board,
        from: Square,
        piece: Piece,
        directions: Range<usize>,
        moves: &mut Vec<Move>,
    ) {
        let tables = AttackTables::get();
        for dir in directions {
            for &to in tables.ray(from, dir) {
                match board.piece_at(to) {
                    None => moves.push(Move::new(from, to, MoveKind::Quiet)),
                    Some(other) => {
                        if other.color != piece.color {
                            moves.push(Move::new(from, to, MoveKind::Capture));
                        }
                        break;
                    }
                }
            }
        }
    }

    fn generate_castling_moves(
        &self,
        board: &Board,
        from: Square,
        king: Piece,
        moves: &mut Vec<Move>,
    ) {
        let color = king.color;
        let home = color.home_row();
        if king.has_moved || from.row() != home || from.col() != KING_HOME_COL {
            return;
        }
        let enemy = color.opposite();

        for side in [CastleSide::KingSide, CastleSide::QueenSide] {
            if !board.castling.has(color, side) {
                continue;
            }

            let (rook_col, _) = side.rook_cols();
            let rook_ok = board
                .piece_at(square_on(home, rook_col))
                .is_some_and(|r| r.kind == PieceKind::Rook && r.color == color && !r.has_moved);
            if !rook_ok {
                continue;
            }

            let path_clear = side
                .between_cols()
                .iter()
                .all(|&col| board.piece_at(square_on(home, col)).is_none());
            if !path_clear {
                continue;
            }

            let king_safe = [KING_HOME_COL, side.king_pass_col(), side.king_target_col()]
                .into_iter()
                .all(|col| !is_attacked(board, square_on(home, col), enemy));
            if king_safe {
                let to = square_on(home, side.king_target_col());
                moves.push(Move::new(from, to, MoveKind::Castle(side)));
            }
        }
    }
}

// Rows and columns passed here come from board constants, always in range.
const fn square_on(row: usize, col: usize) -> Square {
    Square::from_index(row * BOARD_SIZE + col)
}

fn push_pawn_move(mv: Move, color: Color, moves: &mut Vec<Move>) {
    if mv.to.row() == color.promotion_row() {
        moves.extend(PieceKind::PROMOTIONS.iter().map(|&kind| mv.with_promotion(kind)));
    } else {
        moves.push(mv);
    }
}

/// Counts leaf nodes of the legal move tree to `depth` plies.
pub fn perft(board: &Board, depth: u32) -> u64 {
    if depth == 0 {
        return 1;
    }
    let moves = MoveGenerator::new().all_legal_moves(board, board.side_to_move);
    if depth == 1 {
        return moves.len() as u64;
    }

    let mut work = board.clone();
    let mut nodes = 0;
    for mv in &moves {
        if let Some(undo) = work.make_move(mv) {
            nodes += perft(&work, depth - 1);
            work.undo_move(mv, &undo);
        }
    }
    nodes
}
