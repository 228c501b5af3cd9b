use crate::logic::board::{Board, Color, PieceKind, Square};
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod config;
pub mod eval;
pub mod search;
pub mod zobrist;


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CastleSide {
    KingSide,
    QueenSide,
}

impl CastleSide {
    /// Column the king lands on.
    pub const fn king_target_col(self) -> usize {
        match self {
            Self::KingSide => 6,
            Self::QueenSide => 2,
        }
    }

    /// Column the king passes over on its way to the target.
    pub const fn king_pass_col(self) -> usize {
        match self {
            Self::KingSide => 5,
            Self::QueenSide => 3,
        }
    }

    /// (from, to) columns of the castling rook.
    pub const fn rook_cols(self) -> (usize, usize) {
        match self {
            Self::KingSide => (7, 5),
            Self::QueenSide => (0, 3),
        }
    }

    /// Columns that must be empty between king and rook.
    pub const fn between_cols(self) -> &'static [usize] {
        match self {
            Self::KingSide => &[5, 6],
            Self::QueenSide => &[1, 2, 3],
        }
    }
}

/// How a move interacts with the board. Only the move generator decides this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoveKind {
    Quiet,
    DoublePush,
    Capture,
    EnPassant,
    Castle(CastleSide),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Move {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<PieceKind>,
    kind: MoveKind,
}

impl Move {
    pub(crate) const fn new(from: Square, to: Square, kind: MoveKind) -> Self {
        Self {
            from,
            to,
            promotion: None,
            kind,
        }
    }

    #[must_use]
    pub(crate) const fn with_promotion(mut self, kind: PieceKind) -> Self {
        self.promotion = Some(kind);
        self
    }

    pub const fn kind(&self) -> MoveKind {
        self.kind
    }

    pub const fn is_capture(&self) -> bool {
        matches!(self.kind, MoveKind::Capture | MoveKind::EnPassant)
    }

    pub const fn is_en_passant(&self) -> bool {
        matches!(self.kind, MoveKind::EnPassant)
    }

    pub const fn is_double_push(&self) -> bool {
        matches!(self.kind, MoveKind::DoublePush)
    }

    pub const fn castle_side(&self) -> Option<CastleSide> {
        match self.kind {
            MoveKind::Castle(side) => Some(side),
            _ => None,
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(kind) = self.promotion {
            write!(f, "{}", kind.fen_char())?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStats {
    pub depth: u8,
    pub nodes: u64,
    pub time_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub best_move: Option<Move>,
    /// Always from White's point of view.
    pub evaluation: i32,
    pub stats: SearchStats,
}

/// One search job handed to a background searcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub request_id: u64,
    pub board: Board,
    pub depth: u8,
    pub side_to_move: Color,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub request_id: u64,
    pub best_move: Option<Move>,
    pub evaluation: i32,
    pub stats: SearchStats,
}

impl SearchResponse {
    pub const fn from_result(request_id: u64, result: SearchResult) -> Self {
        Self {
            request_id,
            best_move: result.best_move,
            evaluation: result.evaluation,
            stats: result.stats,
        }
    }
}

pub trait Evaluator {
    fn evaluate(&self, board: &Board) -> i32;
}

pub trait Searcher {
    /// Returns `None` only when the search was cancelled before finishing.
    fn find_best_move(
        &mut self,
        board: &Board,
        side_to_move: Color,
        depth: i32,
    ) -> Option<SearchResult>;
}
