use chess_core::engine::config::EngineConfig;
use chess_core::engine::eval::SimpleEvaluator;
use chess_core::engine::{CastleSide, Evaluator};
use chess_core::logic::board::{Board, Color, Piece, PieceKind, Square};
use chess_core::logic::game::{GameState, GameStatus};
use chess_core::logic::generator::MoveGenerator;
use chess_core::logic::rules::{is_checkmate, is_in_check, MoveError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

fn sq(name: &str) -> Square {
    Square::from_algebraic(name).unwrap()
}

#[test]
fn test_twenty_moves_from_start() {
    let board = Board::new();
    let moves = MoveGenerator::new().all_legal_moves(&board, board.side_to_move);
    assert_eq!(moves.len(), 20);
}

#[test]
fn test_random_playouts_keep_invariants() {
    let generator = MoveGenerator::new();
    let mut rng = StdRng::seed_from_u64(2024);

    for _ in 0..20 {
        let mut board = Board::new();
        for _ in 0..60 {
            let color = board.side_to_move;
            let moves = generator.all_legal_moves(&board, color);
            if moves.is_empty() {
                break;
            }
            for mv in &moves {
                assert!(
                    !is_in_check(&board.apply_move(mv), color),
                    "{mv} leaves the king attacked in {}",
                    board.to_fen()
                );
            }

            let mv = moves[rng.gen_range(0..moves.len())];
            let before = board.clone();
            let undo = board.make_move(&mv).unwrap();
            assert_eq!(board, before.apply_move(&mv));

            // Undo must give back the exact position, then replay.
            board.undo_move(&mv, &undo);
            assert_eq!(board, before);
            board.make_move(&mv).unwrap();

            for color in [Color::White, Color::Black] {
                let kings = board
                    .pieces()
                    .filter(|(_, p)| p.kind == PieceKind::King && p.color == color)
                    .count();
                assert_eq!(kings, 1);
            }
        }
    }
}

#[test]
fn test_fools_mate_sequence() {
    let mut game = GameState::new();
    for (from, to) in [("f2", "f3"), ("e7", "e5"), ("g2", "g4"), ("d8", "h4")] {
        game.make_move(sq(from), sq(to), None, false).unwrap();
    }
    assert!(is_checkmate(&game.board, Color::White));
    assert!(MoveGenerator::new()
        .all_legal_moves(&game.board, Color::White)
        .is_empty());
    assert_eq!(
        game.status,
        GameStatus::Checkmate {
            winner: Color::Black
        }
    );
}

#[test]
fn test_king_side_castle_rejections() {
    let castle = |fen: &str| {
        let mut game = GameState::from_board(Board::from_fen(fen).unwrap());
        game.make_move(sq("e1"), sq("g1"), None, false)
    };

    // Knight still on g1.
    assert_eq!(
        castle("4k3/8/8/8/8/8/8/4K1NR w K - 0 1"),
        Err(MoveError::IllegalMove)
    );
    // f1 is attacked by the bishop on c4.
    assert_eq!(
        castle("4k3/8/8/8/2b5/8/8/4K2R w K - 0 1"),
        Err(MoveError::IllegalMove)
    );
    // g1 is attacked by the knight on h3.
    assert_eq!(
        castle("4k3/8/8/8/8/7n/8/4K2R w K - 0 1"),
        Err(MoveError::IllegalMove)
    );
    // Right already lost.
    assert_eq!(
        castle("4k3/8/8/8/8/8/8/4K2R w - - 0 1"),
        Err(MoveError::IllegalMove)
    );

    let outcome = castle("4k3/8/8/8/8/8/8/4K2R w K - 0 1").unwrap();
    assert!(outcome.mv.castle_side().is_some());
}

#[test]
fn test_castling_rights_are_monotonic() {
    let mut game = GameState::from_board(
        Board::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap(),
    );
    game.make_move(sq("h1"), sq("h2"), None, false).unwrap();
    game.make_move(sq("a8"), sq("a7"), None, false).unwrap();
    game.make_move(sq("h2"), sq("h1"), None, false).unwrap();

    let rights = game.board.castling;
    assert!(!rights.has(Color::White, CastleSide::KingSide));
    assert!(rights.has(Color::White, CastleSide::QueenSide));
    assert!(!rights.has(Color::Black, CastleSide::QueenSide));

    // The rook is home again but castling stays gone.
    game.make_move(sq("a7"), sq("a8"), None, false).unwrap();
    assert_eq!(
        game.make_move(sq("e1"), sq("g1"), None, false),
        Err(MoveError::IllegalMove)
    );
}

#[test]
fn test_en_passant_window_is_one_ply() {
    let mut game = GameState::new();
    for (from, to) in [("e2", "e4"), ("a7", "a6"), ("e4", "e5"), ("d7", "d5")] {
        game.make_move(sq(from), sq(to), None, false).unwrap();
    }
    let before = game.clone();
    let outcome = game.make_move(sq("e5"), sq("d6"), None, false).unwrap();
    assert!(outcome.mv.is_en_passant());
    assert_eq!(outcome.captured.map(|p| p.kind), Some(PieceKind::Pawn));
    assert!(game.board.piece_at(sq("d5")).is_none());

    // Wait a move instead: the chance is gone.
    let mut game = before;
    game.make_move(sq("g1"), sq("f3"), None, false).unwrap();
    game.make_move(sq("a6"), sq("a5"), None, false).unwrap();
    assert_eq!(
        game.make_move(sq("e5"), sq("d6"), None, false),
        Err(MoveError::IllegalMove)
    );
}

#[test]
fn test_promotion_never_leaves_a_pawn_on_the_last_rank() {
    let board = Board::from_fen("4k3/8/8/8/8/8/p7/4K3 b - - 0 1").unwrap();

    let mut game = GameState::from_board(board.clone());
    let outcome = game.make_move(sq("a2"), sq("a1"), None, true).unwrap();
    assert!(outcome.promotion_defaulted);
    let piece = game.board.piece_at(sq("a1")).unwrap();
    assert_eq!(piece, Piece { kind: PieceKind::Queen, color: Color::Black, has_moved: true });

    let mut game = GameState::from_board(board.clone());
    let outcome = game
        .make_move(sq("a2"), sq("a1"), Some(PieceKind::Knight), false)
        .unwrap();
    assert!(!outcome.promotion_defaulted);
    assert_eq!(game.board.piece_at(sq("a1")).unwrap().kind, PieceKind::Knight);

    let mut game = GameState::from_board(board);
    assert_eq!(
        game.make_move(sq("a2"), sq("a1"), None, false),
        Err(MoveError::PromotionRequired)
    );
    assert_eq!(game.board.piece_at(sq("a2")).unwrap().kind, PieceKind::Pawn);
}

#[test]
fn test_initial_evaluation_is_zero() {
    let eval = SimpleEvaluator::new(Arc::new(EngineConfig::default()));
    assert_eq!(eval.evaluate(&Board::new()), 0);
}

#[test]
fn test_fen_round_trip_through_play() {
    let mut game = GameState::new();
    for (from, to) in [("e2", "e4"), ("c7", "c5"), ("g1", "f3")] {
        game.make_move(sq(from), sq(to), None, false).unwrap();
    }
    let fen = game.board.to_fen();
    assert_eq!(
        fen,
        "rnbqkbnr/pp1ppppp/8/2p5/4P3/5N2/PPPP1PPP/RNBQKB1R b KQkq - 1 2"
    );
    assert_eq!(Board::from_fen(&fen).unwrap().to_fen(), fen);
}
