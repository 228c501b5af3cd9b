use crate::logic::board::{Square, NUM_SQUARES};
use std::sync::OnceLock;

pub const KNIGHT_OFFSETS: [(i32, i32); 8] = [
    (-2, -1),
    (-2, 1),
    (-1, -2),
    (-1, 2),
    (1, -2),
    (1, 2),
    (2, -1),
    (2, 1),
];

pub const KING_OFFSETS: [(i32, i32); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// Orthogonal directions occupy indices 0..4, diagonals 4..8.
pub const DIRECTIONS: [(i32, i32); 8] = [
    (-1, 0),
    (1, 0),
    (0, -1),
    (0, 1),
    (-1, -1),
    (-1, 1),
    (1, -1),
    (1, 1),
];

pub const ROOK_DIRECTIONS: std::ops::Range<usize> = 0..4;
pub const BISHOP_DIRECTIONS: std::ops::Range<usize> = 4..8;
pub const QUEEN_DIRECTIONS: std::ops::Range<usize> = 0..8;

/// Per-square target lists, built once and shared.
pub struct AttackTables {
    knight: Vec<Vec<Square>>,
    king: Vec<Vec<Square>>,
    // rays[sq][dir] walks outward from sq until the board edge
    rays: Vec<Vec<Vec<Square>>>,
}

impl AttackTables {
    fn new() -> Self {
        let mut knight = Vec::with_capacity(NUM_SQUARES);
        let mut king = Vec::with_capacity(NUM_SQUARES);
        let mut rays = Vec::with_capacity(NUM_SQUARES);

        for sq in Square::all() {
            knight.push(offsets_from(sq, &KNIGHT_OFFSETS));
            king.push(offsets_from(sq, &KING_OFFSETS));
            rays.push(
                DIRECTIONS
                    .iter()
                    .map(|&(dr, dc)| compute_ray(sq, dr, dc))
                    .collect(),
            );
        }

        Self { knight, king, rays }
    }

    pub fn get() -> &'static Self {
        static INSTANCE: OnceLock<AttackTables> = OnceLock::new();
        INSTANCE.get_or_init(AttackTables::new)
    }

    pub fn knight_targets(&self, sq: Square) -> &[Square] {
        self.knight.get(sq.index()).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn king_targets(&self, sq: Square) -> &[Square] {
        self.king.get(sq.index()).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn ray(&self, sq: Square, direction: usize) -> &[Square] {
        self.rays
            .get(sq.index())
            .and_then(|dirs| dirs.get(direction))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

fn offsets_from(sq: Square, offsets: &[(i32, i32)]) -> Vec<Square> {
    offsets
        .iter()
        .filter_map(|&(dr, dc)| sq.offset(dr, dc))
        .collect()
}

fn compute_ray(sq: Square, dr: i32, dc: i32) -> Vec<Square> {
    let mut ray = Vec::new();
    let mut current = sq;
    while let Some(next) = current.offset(dr, dc) {
        ray.push(next);
        current = next;
    }
    ray
}
