use crate::engine::config::EngineConfig;
use crate::engine::eval::SimpleEvaluator;
use crate::engine::search::AlphaBetaEngine;
use crate::engine::{Evaluator, Move, SearchRequest, SearchResponse, Searcher};
use crate::logic::board::{Board, Color, PieceKind, Square};
use crate::logic::game::{GameState, GameStatus, MoveOutcome, MoveRecord};
use crate::logic::generator::MoveGenerator;
use crate::logic::rules::{is_checkmate, is_in_check, is_stalemate, MoveError};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Promote to a Queen when a pawn move reaches the last rank without a choice.
    pub auto_promote_to_queen: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            auto_promote_to_queen: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPoll {
    Running,
    /// The search answered. `None` when the engine found no move to play.
    Finished(Option<MoveOutcome>),
}

// The one outstanding search. `receiver` is only set for searches this
// session runs on its own thread; worker searches answer through
// `accept_search_response`.
struct PendingSearch {
    request_id: u64,
    cancel: Arc<AtomicBool>,
    receiver: Option<Receiver<SearchResponse>>,
}

/// Owns the canonical game and brokers searches for the computer side.
///
/// At most one search is outstanding. Any change to the position (a move,
/// an undo, a new game) or a new search request supersedes it, and its
/// response is then rejected as stale.
pub struct GameSession {
    state: GameState,
    config: SessionConfig,
    engine_config: Arc<EngineConfig>,
    generator: MoveGenerator,
    evaluator: SimpleEvaluator,
    next_request_id: u64,
    pending: Option<PendingSearch>,
}

impl Default for GameSession {
    fn default() -> Self {
        Self::new(SessionConfig::default(), EngineConfig::default())
    }
}

impl GameSession {
    pub fn new(config: SessionConfig, engine_config: EngineConfig) -> Self {
        Self::from_board(Board::new(), config, engine_config)
    }

    /// Starts from an arbitrary position instead of the initial one.
    pub fn from_board(board: Board, config: SessionConfig, engine_config: EngineConfig) -> Self {
        let engine_config = Arc::new(engine_config);
        Self {
            state: GameState::from_board(board),
            config,
            evaluator: SimpleEvaluator::new(engine_config.clone()),
            engine_config,
            generator: MoveGenerator::new(),
            next_request_id: 1,
            pending: None,
        }
    }

    pub const fn state(&self) -> &GameState {
        &self.state
    }

    pub const fn board(&self) -> &Board {
        &self.state.board
    }

    pub const fn status(&self) -> GameStatus {
        self.state.status
    }

    pub const fn side_to_move(&self) -> Color {
        self.state.side_to_move()
    }

    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: SessionConfig) {
        self.config = config;
    }

    /// Legal moves of the piece on `from`. Empty unless it belongs to the side to move.
    pub fn legal_moves_from(&self, from: Square) -> Vec<Move> {
        let board = self.board();
        let movable = board
            .piece_at(from)
            .is_some_and(|p| p.color == board.side_to_move);
        if !movable || self.state.status.is_over() {
            return Vec::new();
        }
        self.generator.legal_moves(board, from)
    }

    pub fn attempt_move(
        &mut self,
        from: Square,
        to: Square,
        promotion: Option<PieceKind>,
    ) -> Result<MoveOutcome, MoveError> {
        let outcome =
            self.state
                .make_move(from, to, promotion, self.config.auto_promote_to_queen)?;
        self.supersede_search();
        Ok(outcome)
    }

    pub fn is_check(&self, color: Color) -> bool {
        is_in_check(self.board(), color)
    }

    pub fn is_checkmate(&self, color: Color) -> bool {
        is_checkmate(self.board(), color)
    }

    pub fn is_stalemate(&self, color: Color) -> bool {
        is_stalemate(self.board(), color)
    }

    /// Static evaluation of the current position, positive for White.
    pub fn evaluate(&self) -> i32 {
        self.evaluator.evaluate(self.board())
    }

    pub fn start_new_game(&mut self) {
        self.supersede_search();
        self.state = GameState::new();
        log::info!("New game started");
    }

    pub fn undo_last_move(&mut self) -> Result<MoveRecord, MoveError> {
        let record = self.state.undo_move()?;
        self.supersede_search();
        log::debug!("Took back {}", record.mv);
        Ok(record)
    }

    /// Searches on the calling thread and plays the result for the side to move.
    pub fn request_ai_move(&mut self, depth: i32) -> Result<Option<MoveOutcome>, MoveError> {
        if self.state.status.is_over() {
            return Err(MoveError::GameOver);
        }
        self.supersede_search();

        let mut engine = AlphaBetaEngine::new(self.engine_config.clone());
        let side = self.side_to_move();
        let Some(result) = engine.find_best_move(self.board(), side, depth) else {
            return Ok(None);
        };
        result
            .best_move
            .map(|mv| self.apply_engine_move(mv))
            .transpose()
    }

    /// Registers a new outstanding search and returns the request to hand to
    /// a background searcher. `None` uses the engine's default depth.
    pub fn prepare_search(&mut self, depth: Option<i32>) -> Result<SearchRequest, MoveError> {
        if self.state.status.is_over() {
            return Err(MoveError::GameOver);
        }
        self.supersede_search();

        let requested = depth.unwrap_or_else(|| i32::from(self.engine_config.default_depth));
        let request = SearchRequest {
            request_id: self.next_request_id,
            board: self.board().clone(),
            depth: self.engine_config.clamp_depth(requested),
            side_to_move: self.side_to_move(),
        };
        self.next_request_id += 1;
        self.pending = Some(PendingSearch {
            request_id: request.request_id,
            cancel: Arc::new(AtomicBool::new(false)),
            receiver: None,
        });

        log::debug!(
            "Search {} requested for {:?} at depth {}",
            request.request_id,
            request.side_to_move,
            request.depth
        );
        Ok(request)
    }

    /// Starts a search on a background thread. Returns its request id.
    pub fn begin_ai_search(&mut self, depth: Option<i32>) -> Result<u64, MoveError> {
        let request = self.prepare_search(depth)?;
        let request_id = request.request_id;
        let (sender, receiver) = mpsc::channel();

        let pending = self.pending.as_mut().ok_or(MoveError::NoSearchPending)?;
        pending.receiver = Some(receiver);
        let cancel = pending.cancel.clone();
        let engine_config = self.engine_config.clone();

        thread::spawn(move || {
            let mut engine = AlphaBetaEngine::new(engine_config).with_cancel_flag(cancel);
            if let Some(response) = engine.respond(&request) {
                if sender.send(response).is_err() {
                    log::debug!("Search {request_id} finished after the session moved on");
                }
            }
        });

        Ok(request_id)
    }

    /// Checks the background search without blocking.
    pub fn poll_ai_move(&mut self) -> Result<SearchPoll, MoveError> {
        let pending = self.pending.as_ref().ok_or(MoveError::NoSearchPending)?;
        let Some(receiver) = &pending.receiver else {
            return Ok(SearchPoll::Running);
        };
        match receiver.try_recv() {
            Ok(response) => self.accept_search_response(response).map(SearchPoll::Finished),
            Err(TryRecvError::Empty) => Ok(SearchPoll::Running),
            Err(TryRecvError::Disconnected) => {
                log::warn!("Search {} ended without an answer", pending.request_id);
                self.pending = None;
                Ok(SearchPoll::Finished(None))
            }
        }
    }

    /// Blocks until the background search answers, then plays its move.
    pub fn wait_ai_move(&mut self) -> Result<Option<MoveOutcome>, MoveError> {
        let receiver = self
            .pending
            .as_mut()
            .and_then(|p| p.receiver.take())
            .ok_or(MoveError::NoSearchPending)?;
        if let Ok(response) = receiver.recv() {
            self.accept_search_response(response)
        } else {
            log::warn!("Search ended without an answer");
            self.pending = None;
            Ok(None)
        }
    }

    /// Plays the answer to the outstanding search. Answers to any other
    /// request are discarded with `StaleSearchResponse` and change nothing.
    pub fn accept_search_response(
        &mut self,
        response: SearchResponse,
    ) -> Result<Option<MoveOutcome>, MoveError> {
        let current = self.pending.as_ref().map(|p| p.request_id);
        if current != Some(response.request_id) {
            log::debug!(
                "Discarding stale response {} (outstanding: {current:?})",
                response.request_id
            );
            return Err(MoveError::StaleSearchResponse);
        }
        self.pending = None;

        log::debug!(
            "Search {} answered with eval {} after {} nodes",
            response.request_id,
            response.evaluation,
            response.stats.nodes
        );
        response
            .best_move
            .map(|mv| self.apply_engine_move(mv))
            .transpose()
    }

    /// Abandons the outstanding search, if any.
    pub fn cancel_ai_search(&mut self) -> bool {
        let had_search = self.pending.is_some();
        if had_search {
            self.supersede_search();
        }
        had_search
    }

    pub fn pending_request_id(&self) -> Option<u64> {
        self.pending.as_ref().map(|p| p.request_id)
    }

    // Engine moves go through the same validation as human moves.
    fn apply_engine_move(&mut self, mv: Move) -> Result<MoveOutcome, MoveError> {
        let outcome = self.state.make_move(mv.from, mv.to, mv.promotion, false)?;
        self.supersede_search();
        Ok(outcome)
    }

    fn supersede_search(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.cancel.store(true, Ordering::Relaxed);
            log::debug!("Search {} superseded", pending.request_id);
        }
    }
}

impl Drop for GameSession {
    fn drop(&mut self) {
        if let Some(pending) = &self.pending {
            pending.cancel.store(true, Ordering::Relaxed);
        }
    }
}
