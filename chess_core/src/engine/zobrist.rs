use crate::engine::CastleSide;
use crate::logic::board::{Color, PieceKind, Square, NUM_SQUARES};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::OnceLock;

// 6 piece kinds * 2 colors * 64 squares
const NUM_PIECE_KINDS: usize = 6;
const NUM_COLORS: usize = 2;
const TABLE_SIZE: usize = NUM_PIECE_KINDS * NUM_COLORS * NUM_SQUARES;

// Fixed seed so hashes are stable across runs and processes.
const ZOBRIST_SEED: u64 = 0x5EED_C4E5_5000_0001;

pub struct ZobristKeys {
    piece_keys: Vec<u64>,
    pub side_key: u64,
    castling_keys: [u64; 4],
    en_passant_keys: [u64; 8],
}

impl ZobristKeys {
    fn new() -> Self {
        let mut rng = StdRng::seed_from_u64(ZOBRIST_SEED);
        let piece_keys = (0..TABLE_SIZE).map(|_| rng.gen()).collect();
        let side_key = rng.gen();
        let castling_keys = [rng.gen(), rng.gen(), rng.gen(), rng.gen()];
        let mut en_passant_keys = [0; 8];
        for key in &mut en_passant_keys {
            *key = rng.gen();
        }

        Self {
            piece_keys,
            side_key,
            castling_keys,
            en_passant_keys,
        }
    }

    pub fn get() -> &'static Self {
        static INSTANCE: OnceLock<ZobristKeys> = OnceLock::new();
        INSTANCE.get_or_init(ZobristKeys::new)
    }

    pub fn piece_key(&self, kind: PieceKind, color: Color, sq: Square) -> u64 {
        let idx = (color.index() * NUM_PIECE_KINDS + kind.index()) * NUM_SQUARES + sq.index();
        self.piece_keys.get(idx).copied().unwrap_or(0)
    }

    pub const fn castling_key(&self, color: Color, side: CastleSide) -> u64 {
        let side_idx = match side {
            CastleSide::KingSide => 0,
            CastleSide::QueenSide => 1,
        };
        self.castling_keys[color.index() * 2 + side_idx]
    }

    /// Keyed by file only, as the rank is implied by the side to move.
    pub const fn en_passant_key(&self, sq: Square) -> u64 {
        self.en_passant_keys[sq.col()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_distinct() {
        let keys = ZobristKeys::get();
        let a = Square::from_algebraic("a1").unwrap();
        let b = Square::from_algebraic("b1").unwrap();
        assert_ne!(
            keys.piece_key(PieceKind::Rook, Color::White, a),
            keys.piece_key(PieceKind::Rook, Color::White, b)
        );
        assert_ne!(
            keys.piece_key(PieceKind::Rook, Color::White, a),
            keys.piece_key(PieceKind::Rook, Color::Black, a)
        );
        assert_ne!(keys.side_key, 0);
    }
}
