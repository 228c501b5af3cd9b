use crate::engine::config::EngineConfig;
use crate::engine::eval::SimpleEvaluator;
use crate::engine::{
    Evaluator, Move, SearchRequest, SearchResponse, SearchResult, SearchStats, Searcher,
};
use crate::logic::board::{Board, Color};
use crate::logic::generator::MoveGenerator;
use crate::logic::rules::is_in_check;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use web_time::Instant;

/// Minimax with alpha-beta pruning. White maximizes, Black minimizes.
pub struct AlphaBetaEngine {
    config: Arc<EngineConfig>,
    evaluator: SimpleEvaluator,
    generator: MoveGenerator,
    cancel: Option<Arc<AtomicBool>>,
    nodes_searched: u64,
}

impl AlphaBetaEngine {
    pub fn new(config: Arc<EngineConfig>) -> Self {
        Self {
            evaluator: SimpleEvaluator::new(config.clone()),
            config,
            generator: MoveGenerator::new(),
            cancel: None,
            nodes_searched: 0,
        }
    }

    pub fn update_config(&mut self, config: Arc<EngineConfig>) {
        self.evaluator = SimpleEvaluator::new(config.clone());
        self.config = config;
    }

    /// The search stops between sibling moves once `flag` is set.
    #[must_use]
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub const fn nodes_searched(&self) -> u64 {
        self.nodes_searched
    }

    /// Runs one protocol request. `None` means the search was cancelled.
    pub fn respond(&mut self, request: &SearchRequest) -> Option<SearchResponse> {
        self.find_best_move(
            &request.board,
            request.side_to_move,
            i32::from(request.depth),
        )
        .map(|result| SearchResponse::from_result(request.request_id, result))
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    // Score of a position with no legal moves: mate for the side to move, or stalemate.
    fn terminal_score(&self, board: &Board, ply: i32) -> i32 {
        let side = board.side_to_move;
        if !is_in_check(board, side) {
            return 0;
        }
        let mate = self.config.mate_score.saturating_sub(ply);
        match side {
            Color::White => mate.saturating_neg(),
            Color::Black => mate,
        }
    }

    fn minimax(
        &mut self,
        board: &mut Board,
        depth: u8,
        ply: i32,
        mut alpha: i32,
        mut beta: i32,
    ) -> Option<i32> {
        self.nodes_searched += 1;
        let side = board.side_to_move;

        if depth == 0 {
            if !self.generator.has_legal_moves(board, side) {
                return Some(self.terminal_score(board, ply));
            }
            return Some(self.evaluator.evaluate(board));
        }

        let moves = self.generator.all_legal_moves(board, side);
        if moves.is_empty() {
            return Some(self.terminal_score(board, ply));
        }

        let maximizing = side == Color::White;
        let mut best = if maximizing { i32::MIN } else { i32::MAX };

        for mv in &moves {
            if self.is_cancelled() {
                return None;
            }
            let Some(undo) = board.make_move(mv) else {
                continue;
            };
            let score = self.minimax(board, depth - 1, ply + 1, alpha, beta);
            board.undo_move(mv, &undo);
            let score = score?;

            if maximizing {
                best = best.max(score);
                alpha = alpha.max(score);
            } else {
                best = best.min(score);
                beta = beta.min(score);
            }
            if alpha >= beta {
                break;
            }
        }

        Some(best)
    }
}

impl Searcher for AlphaBetaEngine {
    fn find_best_move(
        &mut self,
        board: &Board,
        side_to_move: Color,
        depth: i32,
    ) -> Option<SearchResult> {
        let depth = self.config.clamp_depth(depth);
        let start = Instant::now();
        self.nodes_searched = 0;

        let mut root = board.clone();
        if root.side_to_move != side_to_move {
            log::debug!("Searching for {side_to_move:?} on a board with the other side to move");
            root.side_to_move = side_to_move;
        }

        log::debug!("Search start: {side_to_move:?} to move, depth {depth}");

        let moves = self.generator.all_legal_moves(&root, side_to_move);
        let maximizing = side_to_move == Color::White;
        let mut alpha = i32::MIN;
        let mut beta = i32::MAX;
        let mut best_move: Option<Move> = None;
        let mut best_value = self.terminal_score(&root, 0);

        for mv in &moves {
            if self.is_cancelled() {
                log::warn!("Search cancelled after {} nodes", self.nodes_searched);
                return None;
            }
            let Some(undo) = root.make_move(mv) else {
                continue;
            };
            let value = self.minimax(&mut root, depth - 1, 1, alpha, beta);
            root.undo_move(mv, &undo);
            let Some(value) = value else {
                log::warn!("Search cancelled after {} nodes", self.nodes_searched);
                return None;
            };

            // Strict comparison keeps the first of equally scored moves.
            let improves = match best_move {
                None => true,
                Some(_) if maximizing => value > best_value,
                Some(_) => value < best_value,
            };
            if improves {
                best_move = Some(*mv);
                best_value = value;
            }
            if maximizing {
                alpha = alpha.max(value);
            } else {
                beta = beta.min(value);
            }
        }

        let stats = SearchStats {
            depth,
            nodes: self.nodes_searched,
            time_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
        };
        match best_move {
            Some(mv) => log::info!(
                "Search done: {mv} eval {best_value} depth {} nodes {} in {} ms",
                stats.depth,
                stats.nodes,
                stats.time_ms
            ),
            None => log::info!("Search done: no legal move, eval {best_value}"),
        }

        Some(SearchResult {
            best_move,
            evaluation: best_value,
            stats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> AlphaBetaEngine {
        AlphaBetaEngine::new(Arc::new(EngineConfig::default()))
    }

    // Plain minimax over every branch, used as the reference for pruning.
    fn exhaustive(eval: &SimpleEvaluator, board: &Board, depth: u8, ply: i32, mate: i32) -> i32 {
        let side = board.side_to_move;
        let moves = MoveGenerator::new().all_legal_moves(board, side);
        if moves.is_empty() {
            if !is_in_check(board, side) {
                return 0;
            }
            return if side == Color::White { ply - mate } else { mate - ply };
        }
        if depth == 0 {
            return eval.evaluate(board);
        }
        let scores = moves
            .iter()
            .map(|mv| exhaustive(eval, &board.apply_move(mv), depth - 1, ply + 1, mate));
        if side == Color::White {
            scores.max().unwrap()
        } else {
            scores.min().unwrap()
        }
    }

    #[test]
    fn test_pruning_matches_exhaustive_minimax() {
        let config = Arc::new(EngineConfig::default());
        let eval = SimpleEvaluator::new(config.clone());
        let cases = [
            ("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1", 3),
            ("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1", 2),
            ("8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1", 3),
            ("r1bqkbnr/pppp1ppp/2n5/4p3/2B1P3/5Q2/PPPP1PPP/RNB1K1NR w KQkq - 4 4", 2),
            ("6k1/5ppp/8/8/8/8/5PPP/R5K1 b - - 0 1", 3),
        ];
        for (fen, depth) in cases {
            let board = Board::from_fen(fen).unwrap();
            let expected = exhaustive(&eval, &board, depth, 0, config.mate_score);
            let result = engine()
                .find_best_move(&board, board.side_to_move, i32::from(depth))
                .unwrap();
            assert_eq!(result.evaluation, expected, "{fen} at depth {depth}");
        }
    }

    #[test]
    fn test_takes_hanging_queen() {
        let board = Board::from_fen("4k3/8/8/3q4/8/8/8/3RK3 w - - 0 1").unwrap();
        let result = engine().find_best_move(&board, Color::White, 2).unwrap();
        assert_eq!(result.best_move.unwrap().to_string(), "d1d5");
        assert!(result.evaluation > 0);
    }

    #[test]
    fn test_tie_keeps_first_move() {
        // Lone kings: c2, d2 and e2 all score 0 for the White king, and c2 is
        // generated first.
        let board = Board::from_fen("k7/8/8/8/8/3K4/8/8 w - - 0 1").unwrap();
        let mut engine = engine();
        let first = engine.find_best_move(&board, Color::White, 1).unwrap();
        assert_eq!(first.best_move.unwrap().to_string(), "d3c2");

        let again = engine.find_best_move(&board, Color::White, 1).unwrap();
        assert_eq!(again.best_move, first.best_move);
        assert_eq!(again.evaluation, first.evaluation);
    }

    #[test]
    fn test_depth_is_clamped() {
        let board = Board::new();
        let mut engine = engine();
        let low = engine.find_best_move(&board, Color::White, 0).unwrap();
        assert_eq!(low.stats.depth, 1);
        assert!(low.best_move.is_some());

        let config = EngineConfig {
            max_depth: 2,
            ..EngineConfig::default()
        };
        engine.update_config(Arc::new(config));
        let high = engine.find_best_move(&board, Color::White, 99).unwrap();
        assert_eq!(high.stats.depth, 2);
    }

    #[test]
    fn test_no_legal_moves_returns_terminal_score() {
        let mated = Board::from_fen("3R2k1/5ppp/8/8/8/8/8/6K1 b - - 0 1").unwrap();
        let result = engine().find_best_move(&mated, Color::Black, 3).unwrap();
        assert_eq!(result.best_move, None);
        assert_eq!(result.evaluation, 1_000_000);

        let stalemate = Board::from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap();
        let result = engine().find_best_move(&stalemate, Color::Black, 3).unwrap();
        assert_eq!(result.best_move, None);
        assert_eq!(result.evaluation, 0);
    }

    #[test]
    fn test_extreme_mate_score_does_not_overflow() {
        let config = EngineConfig {
            mate_score: i32::MIN,
            ..EngineConfig::default()
        };
        let mut engine = AlphaBetaEngine::new(Arc::new(config));
        let board = Board::from_fen("6k1/5ppp/8/8/8/8/5PPP/R5K1 w - - 0 1").unwrap();
        assert!(engine.find_best_move(&board, Color::White, 2).is_some());

        let mated = Board::from_fen("3R2k1/5ppp/8/8/8/8/8/6K1 b - - 0 1").unwrap();
        let result = engine.find_best_move(&mated, Color::Black, 1).unwrap();
        assert_eq!(result.evaluation, i32::MIN);
    }

    #[test]
    fn test_cancelled_search_returns_none() {
        let flag = Arc::new(AtomicBool::new(true));
        let mut engine = engine().with_cancel_flag(flag.clone());
        assert!(engine.find_best_move(&Board::new(), Color::White, 3).is_none());

        flag.store(false, Ordering::Relaxed);
        assert!(engine.find_best_move(&Board::new(), Color::White, 1).is_some());
    }

    #[test]
    fn test_search_leaves_board_untouched() {
        let board = Board::new();
        let before = board.clone();
        let mut engine = engine();
        engine.find_best_move(&board, Color::White, 2).unwrap();
        assert_eq!(board, before);
        assert!(engine.nodes_searched() > 20);
    }

    #[test]
    fn test_respond_echoes_request_id() {
        let request = SearchRequest {
            request_id: 42,
            board: Board::new(),
            depth: 1,
            side_to_move: Color::White,
        };
        let response = engine().respond(&request).unwrap();
        assert_eq!(response.request_id, 42);
        assert!(response.best_move.is_some());
        assert_eq!(response.stats.depth, 1);
    }
}
