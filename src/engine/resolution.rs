//! Resolution state machine: land floating cells, match, clear, cascade,
//! repeat until stable.
//!
//! `ReleaseFloating -> CheckMatches -> ClearAndCascade -> ReleaseFloating -> ...`
//! ends in `Idle` when a match check finds nothing. Each call to
//! [`Resolution::step`] performs at most one transition.

use super::bag::Bag;
use super::cascade::{FloatingCell, release_unsupported, step_floating_gravity};
use super::grid::Grid;
use super::matcher::{MatchGroup, find_groups};
use super::timer::FallTimer;
use crate::config::GameConfig;
use std::time::Duration;

/// Session-wide phase, as seen by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// The active piece is under control.
    Falling,
    ReleaseFloating,
    CheckMatches,
    ClearAndCascade,
    /// Stable grid, waiting for the next piece or swap.
    #[default]
    Idle,
    /// A non-matching swap is waiting to be undone.
    SwapBack,
    /// Terminal.
    GameOver,
}

impl Phase {
    pub fn is_resolving(self) -> bool {
        matches!(
            self,
            Self::ReleaseFloating | Self::CheckMatches | Self::ClearAndCascade
        )
    }
}

/// One cleared step of a chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClearOutcome {
    pub group_sizes: Vec<usize>,
    pub chain: u32,
    pub score_delta: u64,
    pub cells: Vec<(usize, usize)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Floating cells still need time.
    Waiting,
    /// Moved to the next phase with nothing to report.
    Advanced,
    Cleared(ClearOutcome),
    /// Stable; the session is back to `Idle`.
    Finished { chain: u32, score_delta: u64 },
}

/// Transient state from lock until the grid is stable.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    phase: Phase,
    chain_count: u32,
    score_delta: u64,
    floating: Vec<FloatingCell>,
    timer: FallTimer,
    groups: Vec<MatchGroup>,
}

impl Resolution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn chain_count(&self) -> u32 {
        self.chain_count
    }

    pub fn score_delta(&self) -> u64 {
        self.score_delta
    }

    pub fn floating(&self) -> &[FloatingCell] {
        &self.floating
    }

    /// Cells matched and about to clear.
    pub fn pending_groups(&self) -> &[MatchGroup] {
        &self.groups
    }

    /// Starts a session: detaches whatever is unsupported.
    pub fn begin(&mut self, grid: &mut Grid) {
        *self = Self::new();
        self.floating = release_unsupported(grid);
        self.phase = Phase::ReleaseFloating;
    }

    /// Starts a session straight at the match check (the grid is known to be settled).
    pub fn begin_at_check(&mut self) {
        *self = Self::new();
        self.phase = Phase::CheckMatches;
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// One transition. `refill`, when given, fills the empty cells once all
    /// floating cells have landed (swap boards never run dry).
    pub fn step(
        &mut self,
        grid: &mut Grid,
        config: &GameConfig,
        dt: Duration,
        refill: Option<&mut Bag>,
    ) -> Step {
        match self.phase {
            Phase::ReleaseFloating => {
                let floating = std::mem::take(&mut self.floating);
                self.floating = step_floating_gravity(
                    grid,
                    floating,
                    &mut self.timer,
                    dt,
                    config.resolution_interval(),
                );
                if !self.floating.is_empty() {
                    return Step::Waiting;
                }
                if let Some(bag) = refill {
                    let filled = bag.refill_empty(grid);
                    if filled > 0 {
                        log::trace!("refilled {filled} cells");
                    }
                }
                self.phase = Phase::CheckMatches;
                Step::Advanced
            }
            Phase::CheckMatches => {
                self.groups = find_groups(grid, config.match_rule, config.min_match_count);
                if self.groups.is_empty() {
                    let finished = Step::Finished {
                        chain: self.chain_count,
                        score_delta: self.score_delta,
                    };
                    self.reset();
                    return finished;
                }
                self.phase = Phase::ClearAndCascade;
                Step::Advanced
            }
            Phase::ClearAndCascade => {
                let groups = std::mem::take(&mut self.groups);
                let cells: Vec<(usize, usize)> =
                    groups.iter().flat_map(|g| g.cells.iter().copied()).collect();
                for &(x, y) in &cells {
                    grid.clear(x, y);
                }
                self.chain_count += 1;
                let group_sizes: Vec<usize> = groups.iter().map(MatchGroup::len).collect();
                let units: usize = group_sizes.iter().sum();
                let score_delta = (units as f64
                    * f64::from(config.score_per_unit)
                    * config.chain_multiplier(self.chain_count))
                .round() as u64;
                self.score_delta += score_delta;
                self.floating = release_unsupported(grid);
                self.timer.reset();
                self.phase = Phase::ReleaseFloating;
                log::debug!(
                    "chain {}: cleared {:?} for {}",
                    self.chain_count,
                    group_sizes,
                    score_delta
                );
                Step::Cleared(ClearOutcome {
                    group_sizes,
                    chain: self.chain_count,
                    score_delta,
                    cells,
                })
            }
            Phase::Idle | Phase::Falling | Phase::SwapBack | Phase::GameOver => Step::Waiting,
        }
    }
}
