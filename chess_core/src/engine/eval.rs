use crate::engine::config::EngineConfig;
use crate::engine::Evaluator;
use crate::logic::board::{Board, Color};
use crate::logic::eval_constants::get_pst_value;
use std::sync::Arc;

/// Material plus piece-square bonuses. Positive favors White.
pub struct SimpleEvaluator {
    config: Arc<EngineConfig>,
}

impl SimpleEvaluator {
    pub const fn new(config: Arc<EngineConfig>) -> Self {
        Self { config }
    }
}

impl Evaluator for SimpleEvaluator {
    fn evaluate(&self, board: &Board) -> i32 {
        board
            .pieces()
            .map(|(sq, piece)| {
                let value = self.config.piece_value(piece.kind)
                    + get_pst_value(piece.kind, piece.color, sq);
                match piece.color {
                    Color::White => value,
                    Color::Black => -value,
                }
            })
            .sum()
    }
}
