//! Game session: owns the grid, the active piece, the bag and the resolution
//! state, and advances them all from one per-frame `update`.

use super::bag::{Bag, NextPiece};
use super::cascade::FloatingCell;
use super::events::GameEvent;
use super::grid::Grid;
use super::input::{FrameInput, Intent};
use super::matcher::find_groups;
use super::piece::{ActivePiece, CellState, LockEvent, PieceCell, PieceController, Rotation};
use super::resolution::{Phase, Resolution, Step};
use super::timer::{FallTimer, interval_for_speed};
use crate::config::{ConfigError, GameConfig, Variant};
use std::time::Duration;

/// Running totals for the current game.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub pieces_locked: u64,
    pub cells_cleared: u64,
    /// Resolution sessions that cleared at least once.
    pub chains: u64,
    pub best_chain: u32,
    pub swaps: u64,
}

/// Read-only copy of everything the presentation layer draws.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub grid: Grid,
    /// Active piece cells not yet written into the grid.
    pub piece: Vec<PieceCell>,
    /// Landing position of the piece; empty once it has split.
    pub ghost: Vec<(i32, i32)>,
    pub floating: Vec<FloatingCell>,
    /// Matched cells about to clear.
    pub clearing: Vec<(usize, usize)>,
    pub score: u64,
    pub chain: u32,
    pub phase: Phase,
    pub next: Option<NextPiece>,
    pub stats: Stats,
    /// Current piece fall rate, cells per second.
    pub gravity_speed: f64,
    pub variant: Variant,
}

/// A non-matching swap waiting to be undone.
#[derive(Debug, Clone, Copy)]
struct PendingSwap {
    a: (usize, usize),
    b: (usize, usize),
    timer: FallTimer,
}

#[derive(Debug, Clone)]
pub struct GameSession {
    config: GameConfig,
    grid: Grid,
    pieces: PieceController,
    bag: Bag,
    resolution: Resolution,
    phase: Phase,
    score: u64,
    stats: Stats,
    gravity_speed: f64,
    swap_back: Option<PendingSwap>,
    events: Vec<GameEvent>,
}

impl GameSession {
    /// Validates `config` and starts a game on an empty grid.
    pub fn new(config: GameConfig) -> Result<Self, ConfigError> {
        let grid = Grid::new(config.rows, config.cols);
        let mut session = Self::build(config, grid)?;
        session.start();
        Ok(session)
    }

    /// Session over a prepared grid. Nothing spawns until the first `update`
    /// (or `begin_resolution`).
    pub fn with_grid(config: GameConfig, grid: Grid) -> Result<Self, ConfigError> {
        if grid.rows() != config.rows || grid.cols() != config.cols {
            return Err(ConfigError::Invalid(format!(
                "grid is {}x{}, config expects {}x{}",
                grid.rows(),
                grid.cols(),
                config.rows,
                config.cols
            )));
        }
        Self::build(config, grid)
    }

    fn build(config: GameConfig, grid: Grid) -> Result<Self, ConfigError> {
        config.validate()?;
        let seed = config.seed.unwrap_or_else(rand::random);
        log::info!(
            "new {} session {}x{} (seed {seed})",
            config.variant.as_str(),
            config.rows,
            config.cols
        );
        Ok(Self {
            pieces: PieceController::new(config.lock_policy, config.lock_delay()),
            bag: Bag::new(seed, config.kinds, config.variant),
            resolution: Resolution::new(),
            phase: Phase::Idle,
            score: 0,
            stats: Stats::default(),
            gravity_speed: config.gravity_speed,
            swap_back: None,
            events: Vec::new(),
            grid,
            config,
        })
    }

    fn start(&mut self) {
        match self.config.variant {
            Variant::Swap => {
                self.bag.fill_board(
                    &mut self.grid,
                    self.config.match_rule,
                    self.config.min_match_count,
                );
                self.phase = Phase::Idle;
            }
            Variant::Pairs | Variant::Tetrominoes => self.spawn_next(),
        }
    }

    /// Throws the current game away and starts over with a fresh grid and bag.
    pub fn reset(&mut self) {
        let seed = self.config.seed.unwrap_or_else(rand::random);
        self.grid = Grid::new(self.config.rows, self.config.cols);
        self.pieces.clear();
        self.bag = Bag::new(seed, self.config.kinds, self.config.variant);
        self.resolution.reset();
        self.phase = Phase::Idle;
        self.score = 0;
        self.stats = Stats::default();
        self.gravity_speed = self.config.gravity_speed;
        self.swap_back = None;
        self.events.clear();
        log::info!("session reset (seed {seed})");
        self.start();
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn piece(&self) -> Option<&ActivePiece> {
        self.pieces.piece()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    pub fn chain_count(&self) -> u32 {
        self.resolution.chain_count()
    }

    pub fn gravity_speed(&self) -> f64 {
        self.gravity_speed
    }

    pub fn is_game_over(&self) -> bool {
        self.phase == Phase::GameOver
    }

    /// One frame: pressed intents, then gravity, then as many resolution
    /// transitions as are due.
    pub fn update(&mut self, dt: Duration, input: &FrameInput) {
        let mut budget = dt;
        match self.phase {
            Phase::GameOver => return,
            Phase::Falling => {
                self.update_falling(dt, input);
                budget = Duration::ZERO;
            }
            Phase::SwapBack => self.update_swap_back(dt),
            Phase::Idle => {
                if self.config.variant != Variant::Swap {
                    self.spawn_next();
                }
            }
            Phase::ReleaseFloating | Phase::CheckMatches | Phase::ClearAndCascade => {}
        }
        if self.phase.is_resolving() {
            self.run_resolution(budget);
        }
    }

    fn update_falling(&mut self, dt: Duration, input: &FrameInput) {
        for &intent in &input.pressed {
            self.apply_intent(intent);
            if self.phase != Phase::Falling {
                return;
            }
        }
        let soft = input.is_held(Intent::SoftDrop) || input.pressed.contains(&Intent::SoftDrop);
        let speed = if soft {
            self.gravity_speed * self.config.soft_drop_factor
        } else {
            self.gravity_speed
        };
        if let Some(ev) = self
            .pieces
            .step_gravity(&mut self.grid, dt, interval_for_speed(speed))
        {
            self.on_lock(ev);
        }
    }

    fn apply_intent(&mut self, intent: Intent) {
        match intent {
            Intent::MoveLeft => {
                self.pieces.try_move(&self.grid, -1, 0);
            }
            Intent::MoveRight => {
                self.pieces.try_move(&self.grid, 1, 0);
            }
            Intent::RotateCw => {
                self.pieces.try_rotate(&self.grid, Rotation::Clockwise);
            }
            Intent::RotateCcw => {
                self.pieces.try_rotate(&self.grid, Rotation::CounterClockwise);
            }
            // Folded into the gravity rate for this frame.
            Intent::SoftDrop => {}
            Intent::HardDrop => {
                if let Some(ev) = self.pieces.hard_drop(&mut self.grid) {
                    self.on_lock(ev);
                }
            }
        }
    }

    fn on_lock(&mut self, ev: LockEvent) {
        log::debug!("locked {:?} (complete: {})", ev.cells, ev.complete);
        let complete = ev.complete;
        self.events.push(GameEvent::Lock {
            cells: ev.cells,
            complete,
        });
        if complete {
            self.stats.pieces_locked += 1;
            self.gravity_speed = (self.gravity_speed + self.config.fall_acceleration)
                .min(self.config.max_gravity_speed.max(self.config.gravity_speed));
            self.begin_resolution();
        }
    }

    /// Drops the active piece (if any) and resolves the current grid from
    /// `ReleaseFloating`.
    pub fn begin_resolution(&mut self) {
        if self.phase == Phase::GameOver {
            return;
        }
        self.pieces.clear();
        self.resolution.begin(&mut self.grid);
        self.phase = self.resolution.phase();
    }

    fn run_resolution(&mut self, dt: Duration) {
        let mut dt = dt;
        while self.phase.is_resolving() {
            let refill = (self.config.variant == Variant::Swap).then_some(&mut self.bag);
            let step = self.resolution.step(&mut self.grid, &self.config, dt, refill);
            dt = Duration::ZERO;
            match step {
                Step::Waiting => break,
                Step::Advanced => {
                    self.phase = self.resolution.phase();
                    // Matched cells stay on screen for one frame before clearing.
                    if self.phase == Phase::ClearAndCascade {
                        break;
                    }
                }
                Step::Cleared(clear) => {
                    self.score += clear.score_delta;
                    self.stats.cells_cleared += clear.cells.len() as u64;
                    self.phase = self.resolution.phase();
                    self.events.push(GameEvent::Match {
                        group_sizes: clear.group_sizes,
                        chain: clear.chain,
                        score_delta: clear.score_delta,
                        cells: clear.cells,
                    });
                }
                Step::Finished { chain, score_delta } => {
                    self.finish_resolution(chain, score_delta);
                }
            }
        }
    }

    fn finish_resolution(&mut self, chain: u32, score_delta: u64) {
        self.phase = Phase::Idle;
        if chain > 0 {
            log::debug!("chain of {chain} ended, +{score_delta}");
            self.stats.chains += 1;
            self.stats.best_chain = self.stats.best_chain.max(chain);
            self.events.push(GameEvent::ChainEnded { chain, score_delta });
        }
        if self.config.variant != Variant::Swap {
            self.spawn_next();
        }
    }

    /// Runs the current resolution to the end, ignoring wall-clock pacing.
    pub fn resolve_now(&mut self) {
        let interval = self.config.resolution_interval();
        while self.phase.is_resolving() {
            self.run_resolution(interval);
        }
    }

    /// Deals the next piece. A colliding spawn ends the game without touching the grid.
    fn spawn_next(&mut self) {
        let next = self.bag.next();
        let at = self.config.spawn_position();
        if self
            .pieces
            .try_spawn(&self.grid, next.shape, &next.kinds, at)
        {
            log::debug!("spawned {:?} at {at:?}", next.shape);
            self.phase = Phase::Falling;
        } else {
            log::info!("game over: {:?} blocked at spawn, score {}", next.shape, self.score);
            self.phase = Phase::GameOver;
            self.events.push(GameEvent::GameOver { score: self.score });
        }
    }

    /// Swap variant: exchanges two orthogonally adjacent filled cells. A swap
    /// that makes no group is undone after `swap_back_delay`. Returns false,
    /// changing nothing, when the swap is not allowed right now.
    pub fn try_swap(&mut self, a: (usize, usize), b: (usize, usize)) -> bool {
        if self.config.variant != Variant::Swap || self.phase != Phase::Idle {
            return false;
        }
        if a.0.abs_diff(b.0) + a.1.abs_diff(b.1) != 1 {
            return false;
        }
        let both_filled = [a, b]
            .iter()
            .all(|&(x, y)| self.grid.kind_at(x, y).is_some());
        if !both_filled || !self.grid.swap(a, b) {
            return false;
        }
        self.stats.swaps += 1;
        if find_groups(&self.grid, self.config.match_rule, self.config.min_match_count).is_empty() {
            log::debug!("swap {a:?} <-> {b:?} made no match, reverting");
            self.swap_back = Some(PendingSwap {
                a,
                b,
                timer: FallTimer::new(),
            });
            self.phase = Phase::SwapBack;
        } else {
            self.resolution.begin_at_check();
            self.phase = self.resolution.phase();
        }
        true
    }

    fn update_swap_back(&mut self, dt: Duration) {
        let delay = self.config.swap_back_delay();
        let Some(pending) = self.swap_back.as_mut() else {
            self.phase = Phase::Idle;
            return;
        };
        if pending.timer.advance(dt, delay) == 0 {
            return;
        }
        let (a, b) = (pending.a, pending.b);
        self.swap_back = None;
        self.grid.swap(a, b);
        self.phase = Phase::Idle;
    }

    /// Events since the last drain, oldest first.
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn snapshot(&self) -> Snapshot {
        let piece = self.pieces.piece();
        let ghost = match piece {
            Some(p) if !p.is_detached() => self.pieces.ghost(&self.grid),
            _ => Vec::new(),
        };
        Snapshot {
            grid: self.grid.clone(),
            piece: piece
                .map(|p| {
                    p.cells
                        .iter()
                        .filter(|c| c.state != CellState::Locked)
                        .copied()
                        .collect()
                })
                .unwrap_or_default(),
            ghost,
            floating: self.resolution.floating().to_vec(),
            clearing: self
                .resolution
                .pending_groups()
                .iter()
                .flat_map(|g| g.cells.iter().copied())
                .collect(),
            score: self.score,
            chain: self.resolution.chain_count(),
            phase: self.phase,
            next: self.bag.peek().cloned(),
            stats: self.stats,
            gravity_speed: self.gravity_speed,
            variant: self.config.variant,
        }
    }
}
