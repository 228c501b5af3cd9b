use crate::logic::board::PieceKind;
use crate::logic::eval_constants::{
    VAL_BISHOP, VAL_KING, VAL_KNIGHT, VAL_PAWN, VAL_QUEEN, VAL_ROOK,
};
use crate::logic::rules::MoveError;
use serde::{Deserialize, Serialize};

/// Hard ceiling for any configured or requested depth.
pub const MAX_SEARCH_DEPTH: u8 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // Evaluation Parameters
    pub val_pawn: i32,
    pub val_knight: i32,
    pub val_bishop: i32,
    pub val_rook: i32,
    pub val_queen: i32,
    pub val_king: i32,

    // Search Parameters
    pub mate_score: i32, // Mated at ply p scores mate_score - p
    pub min_depth: u8,
    pub max_depth: u8,
    pub default_depth: u8,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            val_pawn: VAL_PAWN,
            val_knight: VAL_KNIGHT,
            val_bishop: VAL_BISHOP,
            val_rook: VAL_ROOK,
            val_queen: VAL_QUEEN,
            val_king: VAL_KING,

            mate_score: 1_000_000,
            min_depth: 1,
            max_depth: 6,
            default_depth: 3,
        }
    }
}

#[derive(Deserialize)]
struct EngineConfigJson {
    val_pawn: Option<f32>,
    val_knight: Option<f32>,
    val_bishop: Option<f32>,
    val_rook: Option<f32>,
    val_queen: Option<f32>,
    val_king: Option<f32>,

    mate_score: Option<i32>,
    min_depth: Option<u8>,
    max_depth: Option<u8>,
    default_depth: Option<u8>,
}

impl EngineConfig {
    /// Material values are multipliers of the defaults, the rest are absolute.
    pub fn load_from_json(json_str: &str) -> Result<Self, serde_json::Error> {
        let json_config: EngineConfigJson = serde_json::from_str(json_str)?;
        let default = Self::default();

        Ok(Self {
            val_pawn: apply_scale(default.val_pawn, json_config.val_pawn),
            val_knight: apply_scale(default.val_knight, json_config.val_knight),
            val_bishop: apply_scale(default.val_bishop, json_config.val_bishop),
            val_rook: apply_scale(default.val_rook, json_config.val_rook),
            val_queen: apply_scale(default.val_queen, json_config.val_queen),
            val_king: apply_scale(default.val_king, json_config.val_king),

            mate_score: json_config.mate_score.unwrap_or(default.mate_score),
            min_depth: json_config.min_depth.unwrap_or(default.min_depth),
            max_depth: json_config.max_depth.unwrap_or(default.max_depth),
            default_depth: json_config.default_depth.unwrap_or(default.default_depth),
        })
    }

    pub const fn piece_value(&self, kind: PieceKind) -> i32 {
        match kind {
            PieceKind::Pawn => self.val_pawn,
            PieceKind::Knight => self.val_knight,
            PieceKind::Bishop => self.val_bishop,
            PieceKind::Rook => self.val_rook,
            PieceKind::Queen => self.val_queen,
            PieceKind::King => self.val_king,
        }
    }

    /// Allowed depth range, always inside `1..=MAX_SEARCH_DEPTH` whatever was configured.
    pub fn depth_bounds(&self) -> (u8, u8) {
        let max = self.max_depth.clamp(1, MAX_SEARCH_DEPTH);
        let min = self.min_depth.clamp(1, max);
        (min, max)
    }

    pub fn validate_depth(&self, requested: i32) -> Result<u8, MoveError> {
        let (min, max) = self.depth_bounds();
        u8::try_from(requested)
            .ok()
            .filter(|depth| (min..=max).contains(depth))
            .ok_or(MoveError::SearchDepthInvalid)
    }

    /// Like `validate_depth`, but out-of-range requests are clamped and logged.
    pub fn clamp_depth(&self, requested: i32) -> u8 {
        self.validate_depth(requested).unwrap_or_else(|_| {
            let (min, max) = self.depth_bounds();
            let clamped = if requested < i32::from(min) { min } else { max };
            log::warn!("Search depth {requested} out of range {min}..={max}, using {clamped}");
            clamped
        })
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn apply_scale(default_val: i32, scale: Option<f32>) -> i32 {
    scale.map_or(default_val, |s| (default_val as f32 * s) as i32)
}
