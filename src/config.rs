//! Game configuration: JSON file model, defaults, presets and validation.

use crate::engine::matcher::MatchRule;
use crate::engine::piece::{LockPolicy, PieceShape, TetrominoKind};
use crate::engine::timer::interval_for_speed;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Which game the engine runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Falling pairs, chains of connected groups.
    #[default]
    Pairs,
    /// Falling tetrominoes, one kind per piece.
    ///
    /// Only same-kind connected groups clear (8 cells in the preset); a full
    /// row is not a clear on its own.
    Tetrominoes,
    /// Match-3: swap adjacent cells, no falling piece.
    Swap,
}

impl Variant {
    /// Every shape the variant can deal.
    pub fn shapes(self) -> Vec<PieceShape> {
        match self {
            Self::Pairs => vec![PieceShape::Pair],
            Self::Tetrominoes => TetrominoKind::ALL
                .iter()
                .map(|&t| PieceShape::Tetromino(t))
                .collect(),
            Self::Swap => Vec::new(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pairs => "pairs",
            Self::Tetrominoes => "tetrominoes",
            Self::Swap => "swap",
        }
    }
}

/// Options recognised in the config file. Keys are camelCase; missing keys
/// take the defaults of [`GameConfig::default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct GameConfig {
    pub rows: usize,
    pub cols: usize,
    pub min_match_count: usize,
    /// Active piece fall rate, cells per second.
    pub gravity_speed: f64,
    /// Added to `gravity_speed` after every lock, cells per second.
    pub fall_acceleration: f64,
    /// Upper bound for the accelerated fall rate.
    pub max_gravity_speed: f64,
    /// Fall rate of cells released during a cascade, cells per second.
    pub resolution_fall_speed: f64,
    pub score_per_unit: u32,
    /// Chain n scores `1 + (n - 1) * chainBonusMultiplier` times the base.
    pub chain_bonus_multiplier: f64,
    pub variant: Variant,
    pub match_rule: MatchRule,
    pub lock_policy: LockPolicy,
    /// Number of distinct cell kinds dealt.
    pub kinds: u8,
    /// Pivot column at spawn; centre when absent.
    pub spawn_column: Option<usize>,
    pub spawn_row: usize,
    pub lock_delay_ms: u64,
    /// Fall rate multiplier while soft drop is held.
    pub soft_drop_factor: f64,
    pub swap_back_delay_ms: u64,
    /// Piece sequence seed; random when absent.
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            rows: 12,
            cols: 6,
            min_match_count: 4,
            gravity_speed: 1.5,
            fall_acceleration: 0.02,
            max_gravity_speed: 20.0,
            resolution_fall_speed: 20.0,
            score_per_unit: 10,
            chain_bonus_multiplier: 1.0,
            variant: Variant::Pairs,
            match_rule: MatchRule::Connected,
            lock_policy: LockPolicy::Independent,
            kinds: 4,
            spawn_column: None,
            spawn_row: 1,
            lock_delay_ms: 0,
            soft_drop_factor: 10.0,
            swap_back_delay_ms: 250,
            seed: None,
        }
    }
}

impl GameConfig {
    /// Sensible defaults for each variant.
    pub fn preset(variant: Variant) -> Self {
        match variant {
            Variant::Pairs => Self::default(),
            Variant::Tetrominoes => Self {
                rows: 20,
                cols: 10,
                min_match_count: 8,
                gravity_speed: 1.0,
                variant,
                lock_policy: LockPolicy::Rigid,
                lock_delay_ms: 300,
                ..Self::default()
            },
            Variant::Swap => Self {
                rows: 8,
                cols: 8,
                min_match_count: 3,
                resolution_fall_speed: 16.0,
                variant,
                match_rule: MatchRule::Runs,
                kinds: 5,
                ..Self::default()
            },
        }
    }

    pub fn from_json(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a JSON config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let s = std::fs::read_to_string(path)?;
        let config = Self::from_json(&s)?;
        log::info!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Rejects settings no session can start with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));
        if self.rows == 0 || self.cols == 0 {
            return invalid(format!("grid must be non-empty, got {}x{}", self.rows, self.cols));
        }
        if self.rows > i32::MAX as usize || self.cols > i32::MAX as usize {
            return invalid("grid dimensions too large".to_string());
        }
        if self.min_match_count < 2 {
            return invalid(format!("minMatchCount must be >= 2, got {}", self.min_match_count));
        }
        for (name, v) in [
            ("gravitySpeed", self.gravity_speed),
            ("maxGravitySpeed", self.max_gravity_speed),
            ("resolutionFallSpeed", self.resolution_fall_speed),
        ] {
            if !(v.is_finite() && v > 0.0) {
                return invalid(format!("{name} must be positive, got {v}"));
            }
        }
        for (name, v) in [
            ("fallAcceleration", self.fall_acceleration),
            ("chainBonusMultiplier", self.chain_bonus_multiplier),
        ] {
            if !(v.is_finite() && v >= 0.0) {
                return invalid(format!("{name} must be >= 0, got {v}"));
            }
        }
        if !(self.soft_drop_factor.is_finite() && self.soft_drop_factor >= 1.0) {
            return invalid(format!("softDropFactor must be >= 1, got {}", self.soft_drop_factor));
        }
        if !(2..=26).contains(&self.kinds) {
            return invalid(format!("kinds must be in 2..=26, got {}", self.kinds));
        }
        let (sx, sy) = self.spawn_position();
        for shape in self.variant.shapes() {
            let off_grid = shape.offsets().iter().any(|&(dx, dy)| {
                let (x, y) = (sx + dx, sy + dy);
                x < 0 || y < 0 || x >= self.cols as i32 || y >= self.rows as i32
            });
            if off_grid {
                return invalid(format!(
                    "{shape:?} does not fit at spawn ({sx}, {sy}) on a {}x{} grid",
                    self.rows, self.cols
                ));
            }
        }
        Ok(())
    }

    /// Pivot position for newly spawned pieces.
    pub fn spawn_position(&self) -> (i32, i32) {
        let x = self
            .spawn_column
            .unwrap_or_else(|| self.cols.saturating_sub(1) / 2);
        (x as i32, self.spawn_row as i32)
    }

    pub fn resolution_interval(&self) -> Duration {
        interval_for_speed(self.resolution_fall_speed)
    }

    pub fn lock_delay(&self) -> Duration {
        Duration::from_millis(self.lock_delay_ms)
    }

    pub fn swap_back_delay(&self) -> Duration {
        Duration::from_millis(self.swap_back_delay_ms)
    }

    /// Score multiplier for the n-th clear of a chain (n >= 1).
    pub fn chain_multiplier(&self, chain: u32) -> f64 {
        1.0 + f64::from(chain.saturating_sub(1)) * self.chain_bonus_multiplier
    }
}
