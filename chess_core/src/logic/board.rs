use crate::engine::zobrist::ZobristKeys;
use crate::engine::{CastleSide, Move};
use crate::logic::rules::MoveError;
use serde::{Deserialize, Serialize};
use serde_big_array::BigArray;
use std::fmt;
use thiserror::Error;

pub const BOARD_SIZE: usize = 8;
pub const NUM_SQUARES: usize = BOARD_SIZE * BOARD_SIZE;

pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Color {
    White,
    Black,
}

impl Color {
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::White => Self::Black,
            Self::Black => Self::White,
        }
    }

    pub const fn index(self) -> usize {
        match self {
            Self::White => 0,
            Self::Black => 1,
        }
    }

    /// Row holding this side's king and rooks at the start. Row 0 is Black's back rank.
    pub const fn home_row(self) -> usize {
        match self {
            Self::White => 7,
            Self::Black => 0,
        }
    }

    pub const fn pawn_start_row(self) -> usize {
        match self {
            Self::White => 6,
            Self::Black => 1,
        }
    }

    pub const fn promotion_row(self) -> usize {
        match self {
            Self::White => 0,
            Self::Black => 7,
        }
    }

    /// Row delta of a pawn step.
    pub const fn pawn_direction(self) -> i32 {
        match self {
            Self::White => -1,
            Self::Black => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PieceKind {
    Pawn = 0,
    Knight = 1,
    Bishop = 2,
    Rook = 3,
    Queen = 4,
    King = 5,
}

impl PieceKind {
    /// Promotion choices in generation order.
    pub const PROMOTIONS: [Self; 4] = [Self::Queen, Self::Rook, Self::Bishop, Self::Knight];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn fen_char(self) -> char {
        match self {
            Self::Pawn => 'p',
            Self::Knight => 'n',
            Self::Bishop => 'b',
            Self::Rook => 'r',
            Self::Queen => 'q',
            Self::King => 'k',
        }
    }

    pub const fn from_fen_char(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            'p' => Some(Self::Pawn),
            'n' => Some(Self::Knight),
            'b' => Some(Self::Bishop),
            'r' => Some(Self::Rook),
            'q' => Some(Self::Queen),
            'k' => Some(Self::King),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Piece {
    pub kind: PieceKind,
    pub color: Color,
    pub has_moved: bool,
}

impl Piece {
    pub const fn new(kind: PieceKind, color: Color) -> Self {
        Self {
            kind,
            color,
            has_moved: false,
        }
    }

    fn fen_char(self) -> char {
        let c = self.kind.fen_char();
        match self.color {
            Color::White => c.to_ascii_uppercase(),
            Color::Black => c,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct RawSquare {
    row: u8,
    col: u8,
}

/// A board coordinate. Both components are always in `0..8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawSquare", into = "RawSquare")]
pub struct Square {
    row: u8,
    col: u8,
}

impl TryFrom<RawSquare> for Square {
    type Error = MoveError;

    fn try_from(raw: RawSquare) -> Result<Self, Self::Error> {
        Self::new(usize::from(raw.row), usize::from(raw.col))
    }
}

impl From<Square> for RawSquare {
    fn from(sq: Square) -> Self {
        Self {
            row: sq.row,
            col: sq.col,
        }
    }
}

impl Square {
    #[allow(clippy::cast_possible_truncation)]
    pub fn new(row: usize, col: usize) -> Result<Self, MoveError> {
        if row < BOARD_SIZE && col < BOARD_SIZE {
            Ok(Self {
                row: row as u8,
                col: col as u8,
            })
        } else {
            Err(MoveError::InvalidSquare)
        }
    }

    /// Callers guarantee `index < 64`.
    #[allow(clippy::cast_possible_truncation)]
    pub(crate) const fn from_index(index: usize) -> Self {
        Self {
            row: (index / BOARD_SIZE) as u8,
            col: (index % BOARD_SIZE) as u8,
        }
    }

    pub const fn row(self) -> usize {
        self.row as usize
    }

    pub const fn col(self) -> usize {
        self.col as usize
    }

    pub const fn index(self) -> usize {
        self.row() * BOARD_SIZE + self.col()
    }

    pub fn offset(self, d_row: i32, d_col: i32) -> Option<Self> {
        let row = i32::from(self.row) + d_row;
        let col = i32::from(self.col) + d_col;
        let row = usize::try_from(row).ok()?;
        let col = usize::try_from(col).ok()?;
        Self::new(row, col).ok()
    }

    /// Parses names like `e4`. Rank 8 is row 0.
    pub fn from_algebraic(name: &str) -> Result<Self, MoveError> {
        let mut chars = name.chars();
        let (Some(file), Some(rank), None) = (chars.next(), chars.next(), chars.next()) else {
            return Err(MoveError::InvalidSquare);
        };
        if !('a'..='h').contains(&file) || !('1'..='8').contains(&rank) {
            return Err(MoveError::InvalidSquare);
        }
        let col = file as usize - 'a' as usize;
        let row = BOARD_SIZE - (rank as usize - '0' as usize);
        Self::new(row, col)
    }

    pub fn all() -> impl Iterator<Item = Self> {
        (0..NUM_SQUARES).map(Self::from_index)
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let file = char::from(b'a' + self.col);
        let rank = BOARD_SIZE - self.row();
        write!(f, "{file}{rank}")
    }
}

/// Castling availability. Rights can be cleared but never granted again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CastlingRights {
    white_king_side: bool,
    white_queen_side: bool,
    black_king_side: bool,
    black_queen_side: bool,
}

impl Default for CastlingRights {
    fn default() -> Self {
        Self::all()
    }
}

impl CastlingRights {
    pub const fn all() -> Self {
        Self {
            white_king_side: true,
            white_queen_side: true,
            black_king_side: true,
            black_queen_side: true,
        }
    }

    pub const fn none() -> Self {
        Self {
            white_king_side: false,
            white_queen_side: false,
            black_king_side: false,
            black_queen_side: false,
        }
    }

    pub const fn has(&self, color: Color, side: CastleSide) -> bool {
        match (color, side) {
            (Color::White, CastleSide::KingSide) => self.white_king_side,
            (Color::White, CastleSide::QueenSide) => self.white_queen_side,
            (Color::Black, CastleSide::KingSide) => self.black_king_side,
            (Color::Black, CastleSide::QueenSide) => self.black_queen_side,
        }
    }

    pub const fn has_any(&self, color: Color) -> bool {
        self.has(color, CastleSide::KingSide) || self.has(color, CastleSide::QueenSide)
    }

    pub fn clear(&mut self, color: Color, side: CastleSide) {
        match (color, side) {
            (Color::White, CastleSide::KingSide) => self.white_king_side = false,
            (Color::White, CastleSide::QueenSide) => self.white_queen_side = false,
            (Color::Black, CastleSide::KingSide) => self.black_king_side = false,
            (Color::Black, CastleSide::QueenSide) => self.black_queen_side = false,
        }
    }

    pub fn clear_color(&mut self, color: Color) {
        self.clear(color, CastleSide::KingSide);
        self.clear(color, CastleSide::QueenSide);
    }

    fn from_fen_field(field: &str) -> Result<Self, FenError> {
        let mut rights = Self::none();
        if field == "-" {
            return Ok(rights);
        }
        for c in field.chars() {
            match c {
                'K' => rights.white_king_side = true,
                'Q' => rights.white_queen_side = true,
                'k' => rights.black_king_side = true,
                'q' => rights.black_queen_side = true,
                _ => return Err(FenError::BadCastling(field.to_string())),
            }
        }
        Ok(rights)
    }

    fn to_fen_field(self) -> String {
        let mut field = String::new();
        for (held, c) in [
            (self.white_king_side, 'K'),
            (self.white_queen_side, 'Q'),
            (self.black_king_side, 'k'),
            (self.black_queen_side, 'q'),
        ] {
            if held {
                field.push(c);
            }
        }
        if field.is_empty() {
            field.push('-');
        }
        field
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FenError {
    #[error("FEN is missing the {0} field")]
    MissingField(&'static str),
    #[error("bad piece placement: {0}")]
    BadPlacement(String),
    #[error("bad side to move: {0}")]
    BadSideToMove(String),
    #[error("bad castling field: {0}")]
    BadCastling(String),
    #[error("bad en passant field: {0}")]
    BadEnPassant(String),
    #[error("bad move counter: {0}")]
    BadCounter(String),
}

/// Everything `make_move` overwrites, so `undo_move` can restore it exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Undo {
    pub moved: Piece,
    pub captured: Option<Piece>,
    pub captured_square: Square,
    pub castle_rook: Option<Piece>,
    pub side_to_move: Color,
    pub castling: CastlingRights,
    pub en_passant: Option<Square>,
    pub halfmove_clock: u32,
    pub fullmove_number: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    #[serde(with = "BigArray")]
    grid: [Option<Piece>; NUM_SQUARES],
    pub side_to_move: Color,
    pub castling: CastlingRights,
    pub en_passant: Option<Square>,
    pub halfmove_clock: u32,
    pub fullmove_number: u32,
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    /// The standard initial arrangement, White to move.
    #[must_use]
    pub fn new() -> Self {
        let mut board = Self::empty();
        board.castling = CastlingRights::all();
        board.setup_pieces(Color::Black);
        board.setup_pieces(Color::White);
        board
    }

    /// No pieces, White to move, no castling rights.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            grid: [None; NUM_SQUARES],
            side_to_move: Color::White,
            castling: CastlingRights::none(),
            en_passant: None,
            halfmove_clock: 0,
            fullmove_number: 1,
        }
    }

    fn setup_pieces(&mut self, color: Color) {
        let back_rank = [
            PieceKind::Rook,
            PieceKind::Knight,
            PieceKind::Bishop,
            PieceKind::Queen,
            PieceKind::King,
            PieceKind::Bishop,
            PieceKind::Knight,
            PieceKind::Rook,
        ];
        let home = color.home_row() * BOARD_SIZE;
        let pawns = color.pawn_start_row() * BOARD_SIZE;
        for (col, kind) in back_rank.into_iter().enumerate() {
            self.grid[home + col] = Some(Piece::new(kind, color));
            self.grid[pawns + col] = Some(Piece::new(PieceKind::Pawn, color));
        }
    }

    pub const fn piece_at(&self, sq: Square) -> Option<Piece> {
        self.grid[sq.index()]
    }

    pub fn set_piece(&mut self, sq: Square, piece: Option<Piece>) {
        self.grid[sq.index()] = piece;
    }

    /// Occupied squares in row-major order.
    pub fn pieces(&self) -> impl Iterator<Item = (Square, Piece)> + '_ {
        self.grid
            .iter()
            .enumerate()
            .filter_map(|(idx, cell)| cell.map(|piece| (Square::from_index(idx), piece)))
    }

    pub fn king_square(&self, color: Color) -> Option<Square> {
        self.pieces()
            .find(|(_, p)| p.kind == PieceKind::King && p.color == color)
            .map(|(sq, _)| sq)
    }

    /// Returns the position after `mv`, leaving `self` untouched. No legality checks.
    #[must_use]
    pub fn apply_move(&self, mv: &Move) -> Self {
        let mut next = self.clone();
        next.make_move(mv);
        next
    }

    /// Plays `mv` in place. Returns `None` (board untouched) when the origin is empty.
    pub fn make_move(&mut self, mv: &Move) -> Option<Undo> {
        let moved = self.piece_at(mv.from)?;

        let captured_square = if mv.is_en_passant() {
            Square::from_index(mv.from.row() * BOARD_SIZE + mv.to.col())
        } else {
            mv.to
        };
        let captured = self.piece_at(captured_square);

        let mut undo = Undo {
            moved,
            captured,
            captured_square,
            castle_rook: None,
            side_to_move: self.side_to_move,
            castling: self.castling,
            en_passant: self.en_passant,
            halfmove_clock: self.halfmove_clock,
            fullmove_number: self.fullmove_number,
        };

        self.set_piece(captured_square, None);
        self.set_piece(mv.from, None);

        let mut placed = Piece {
            has_moved: true,
            ..moved
        };
        if moved.kind == PieceKind::Pawn && mv.to.row() == moved.color.promotion_row() {
            placed.kind = mv.promotion.unwrap_or(PieceKind::Queen);
        }
        self.set_piece(mv.to, Some(placed));

        if let Some(side) = mv.castle_side() {
            let (rook_from, rook_to) = side.rook_cols();
            let row = mv.from.row() * BOARD_SIZE;
            let rook_from = Square::from_index(row + rook_from);
            let rook_to = Square::from_index(row + rook_to);
            if let Some(rook) = self.piece_at(rook_from) {
                undo.castle_rook = Some(rook);
                self.set_piece(rook_from, None);
                self.set_piece(
                    rook_to,
                    Some(Piece {
                        has_moved: true,
                        ..rook
                    }),
                );
            }
        }

        if moved.kind == PieceKind::King {
            self.castling.clear_color(moved.color);
        }
        if moved.kind == PieceKind::Rook {
            self.clear_rook_right(mv.from, moved.color);
        }
        if let Some(cap) = captured {
            if cap.kind == PieceKind::Rook {
                self.clear_rook_right(captured_square, cap.color);
            }
        }

        self.en_passant = if moved.kind == PieceKind::Pawn && mv.from.row().abs_diff(mv.to.row()) == 2
        {
            let mid_row = (mv.from.row() + mv.to.row()) / 2;
            Some(Square::from_index(mid_row * BOARD_SIZE + mv.from.col()))
        } else {
            None
        };

        if moved.kind == PieceKind::Pawn || captured.is_some() {
            self.halfmove_clock = 0;
        } else {
            self.halfmove_clock = self.halfmove_clock.saturating_add(1);
        }
        if moved.color == Color::Black {
            self.fullmove_number = self.fullmove_number.saturating_add(1);
        }
        self.side_to_move = moved.color.opposite();

        Some(undo)
    }

    /// Reverses a `make_move` of the same `mv`.
    pub fn undo_move(&mut self, mv: &Move, undo: &Undo) {
        self.set_piece(mv.to, None);

        if let (Some(side), Some(rook)) = (mv.castle_side(), undo.castle_rook) {
            let (rook_from, rook_to) = side.rook_cols();
            let row = mv.from.row() * BOARD_SIZE;
            self.set_piece(Square::from_index(row + rook_to), None);
            self.set_piece(Square::from_index(row + rook_from), Some(rook));
        }

        self.set_piece(mv.from, Some(undo.moved));
        if undo.captured.is_some() {
            self.set_piece(undo.captured_square, undo.captured);
        }

        self.side_to_move = undo.side_to_move;
        self.castling = undo.castling;
        self.en_passant = undo.en_passant;
        self.halfmove_clock = undo.halfmove_clock;
        self.fullmove_number = undo.fullmove_number;
    }

    fn clear_rook_right(&mut self, sq: Square, color: Color) {
        if sq.row() != color.home_row() {
            return;
        }
        match sq.col() {
            0 => self.castling.clear(color, CastleSide::QueenSide),
            7 => self.castling.clear(color, CastleSide::KingSide),
            _ => {}
        }
    }

    pub fn zobrist_hash(&self) -> u64 {
        let keys = ZobristKeys::get();
        let mut hash = 0;
        for (sq, piece) in self.pieces() {
            hash ^= keys.piece_key(piece.kind, piece.color, sq);
        }
        if self.side_to_move == Color::Black {
            hash ^= keys.side_key;
        }
        for color in [Color::White, Color::Black] {
            for side in [CastleSide::KingSide, CastleSide::QueenSide] {
                if self.castling.has(color, side) {
                    hash ^= keys.castling_key(color, side);
                }
            }
        }
        if let Some(ep) = self.en_passant {
            hash ^= keys.en_passant_key(ep);
        }
        hash
    }

    pub fn to_fen(&self) -> String {
        let mut fen = String::new();
        for row in 0..BOARD_SIZE {
            let mut empty_count = 0;
            for col in 0..BOARD_SIZE {
                if let Some(piece) = self.grid[row * BOARD_SIZE + col] {
                    if empty_count > 0 {
                        fen.push_str(&empty_count.to_string());
                        empty_count = 0;
                    }
                    fen.push(piece.fen_char());
                } else {
                    empty_count += 1;
                }
            }
            if empty_count > 0 {
                fen.push_str(&empty_count.to_string());
            }
            if row + 1 < BOARD_SIZE {
                fen.push('/');
            }
        }

        fen.push(' ');
        fen.push(if self.side_to_move == Color::White { 'w' } else { 'b' });
        fen.push(' ');
        fen.push_str(&self.castling.to_fen_field());
        fen.push(' ');
        match self.en_passant {
            Some(sq) => fen.push_str(&sq.to_string()),
            None => fen.push('-'),
        }
        fen.push_str(&format!(" {} {}", self.halfmove_clock, self.fullmove_number));
        fen
    }

    /// Parses a FEN record. Clock fields are optional.
    ///
    /// `has_moved` is not part of FEN, so it is derived: pawns off their start
    /// row have moved, and kings and rooks count as unmoved only while a
    /// matching castling right is held.
    pub fn from_fen(fen: &str) -> Result<Self, FenError> {
        let mut fields = fen.split_whitespace();
        let placement = fields.next().ok_or(FenError::MissingField("placement"))?;
        let side = fields.next().ok_or(FenError::MissingField("side to move"))?;
        let castling = fields.next().ok_or(FenError::MissingField("castling"))?;
        let en_passant = fields.next().ok_or(FenError::MissingField("en passant"))?;
        let halfmove = fields.next().unwrap_or("0");
        let fullmove = fields.next().unwrap_or("1");

        let mut board = Self::empty();
        board.castling = CastlingRights::from_fen_field(castling)?;

        let rows: Vec<&str> = placement.split('/').collect();
        if rows.len() != BOARD_SIZE {
            return Err(FenError::BadPlacement(placement.to_string()));
        }
        for (row, rank) in rows.iter().enumerate() {
            let mut col = 0;
            for c in rank.chars() {
                if let Some(skip) = c.to_digit(10) {
                    col += skip as usize;
                    continue;
                }
                let kind = PieceKind::from_fen_char(c)
                    .ok_or_else(|| FenError::BadPlacement(placement.to_string()))?;
                let color = if c.is_ascii_uppercase() {
                    Color::White
                } else {
                    Color::Black
                };
                let sq = Square::new(row, col)
                    .map_err(|_| FenError::BadPlacement(placement.to_string()))?;
                let mut piece = Piece::new(kind, color);
                piece.has_moved = board.derive_has_moved(piece, sq);
                board.set_piece(sq, Some(piece));
                col += 1;
            }
            if col != BOARD_SIZE {
                return Err(FenError::BadPlacement(placement.to_string()));
            }
        }

        board.side_to_move = match side {
            "w" => Color::White,
            "b" => Color::Black,
            _ => return Err(FenError::BadSideToMove(side.to_string())),
        };

        board.en_passant = match en_passant {
            "-" => None,
            name => Some(
                Square::from_algebraic(name)
                    .map_err(|_| FenError::BadEnPassant(name.to_string()))?,
            ),
        };

        board.halfmove_clock = halfmove
            .parse()
            .map_err(|_| FenError::BadCounter(halfmove.to_string()))?;
        board.fullmove_number = fullmove
            .parse()
            .map_err(|_| FenError::BadCounter(fullmove.to_string()))?;

        Ok(board)
    }

    fn derive_has_moved(&self, piece: Piece, sq: Square) -> bool {
        let home = sq.row() == piece.color.home_row();
        match piece.kind {
            PieceKind::Pawn => sq.row() != piece.color.pawn_start_row(),
            PieceKind::King => !(home && sq.col() == 4 && self.castling.has_any(piece.color)),
            PieceKind::Rook => match (home, sq.col()) {
                (true, 0) => !self.castling.has(piece.color, CastleSide::QueenSide),
                (true, 7) => !self.castling.has(piece.color, CastleSide::KingSide),
                _ => true,
            },
            _ => false,
        }
    }
}
