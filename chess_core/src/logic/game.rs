use crate::engine::Move;
use crate::logic::board::{Board, Color, Piece, PieceKind, Square, Undo};
use crate::logic::generator::MoveGenerator;
use crate::logic::rules::{is_in_check, is_valid_move, MoveError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameStatus {
    Playing,
    Check(Color), // Side in check
    Checkmate { winner: Color },
    Stalemate,
}

impl GameStatus {
    pub const fn is_over(self) -> bool {
        matches!(self, Self::Checkmate { .. } | Self::Stalemate)
    }

    /// Classification of the position for the side to move.
    pub fn of(board: &Board) -> Self {
        let side = board.side_to_move;
        let in_check = is_in_check(board, side);
        let has_moves = MoveGenerator::new().has_legal_moves(board, side);
        match (in_check, has_moves) {
            (true, false) => Self::Checkmate {
                winner: side.opposite(),
            },
            (false, false) => Self::Stalemate,
            (true, true) => Self::Check(side),
            (false, true) => Self::Playing,
        }
    }
}

/// One applied move with everything needed to take it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRecord {
    pub mv: Move,
    pub undo: Undo,
    pub hash: u64, // Position key after the move
}

impl MoveRecord {
    pub const fn color(&self) -> Color {
        self.undo.side_to_move
    }

    pub const fn captured(&self) -> Option<Piece> {
        self.undo.captured
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveOutcome {
    pub mv: Move,
    pub captured: Option<Piece>,
    pub status: GameStatus,
    /// Set when no promotion piece was given and a Queen was chosen.
    pub promotion_defaulted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    pub board: Board,
    pub status: GameStatus,
    pub history: Vec<MoveRecord>,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

impl GameState {
    #[must_use]
    pub fn new() -> Self {
        Self::from_board(Board::new())
    }

    #[must_use]
    pub fn from_board(board: Board) -> Self {
        let status = GameStatus::of(&board);
        Self {
            board,
            status,
            history: Vec::new(),
        }
    }

    pub const fn side_to_move(&self) -> Color {
        self.board.side_to_move
    }

    pub const fn status(&self) -> GameStatus {
        self.status
    }

    pub fn last_move(&self) -> Option<&MoveRecord> {
        self.history.last()
    }

    /// Validates and plays a move for the side to move.
    ///
    /// With `auto_queen`, a promotion without a chosen piece becomes a Queen
    /// instead of failing with `PromotionRequired`. A rejected move leaves
    /// the state untouched.
    pub fn make_move(
        &mut self,
        from: Square,
        to: Square,
        promotion: Option<PieceKind>,
        auto_queen: bool,
    ) -> Result<MoveOutcome, MoveError> {
        if self.status.is_over() {
            return Err(MoveError::GameOver);
        }

        let (mv, promotion_defaulted) = match is_valid_move(&self.board, from, to, promotion) {
            Ok(mv) => (mv, false),
            Err(MoveError::PromotionRequired) if auto_queen => {
                log::warn!("No promotion piece given for {from}{to}, promoting to a Queen");
                let mv = is_valid_move(&self.board, from, to, Some(PieceKind::Queen))?;
                (mv, true)
            }
            Err(e) => return Err(e),
        };

        let undo = self
            .board
            .make_move(&mv)
            .ok_or(MoveError::NoPieceAtOrigin)?;
        self.history.push(MoveRecord {
            mv,
            undo,
            hash: self.board.zobrist_hash(),
        });
        self.update_status();

        log::debug!("{:?} played {mv}, status {:?}", undo.side_to_move, self.status);

        Ok(MoveOutcome {
            mv,
            captured: undo.captured,
            status: self.status,
            promotion_defaulted,
        })
    }

    /// Takes back the last move, restoring the exact prior position.
    pub fn undo_move(&mut self) -> Result<MoveRecord, MoveError> {
        let record = self.history.pop().ok_or(MoveError::NothingToUndo)?;
        self.board.undo_move(&record.mv, &record.undo);
        self.status = GameStatus::of(&self.board);
        Ok(record)
    }

    fn update_status(&mut self) {
        self.status = GameStatus::of(&self.board);
        match self.status {
            GameStatus::Checkmate { winner } => log::info!("Checkmate, {winner:?} wins"),
            GameStatus::Stalemate => log::info!("Stalemate"),
            GameStatus::Playing | GameStatus::Check(_) => {}
        }
    }
}
