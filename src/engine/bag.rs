//! Piece generation: random pairs, 7-bag tetrominoes, and swap-board fills.
//! Seeded, so one seed always deals the same sequence.

use super::grid::{Grid, Kind};
use super::matcher::{MatchRule, find_groups};
use super::piece::{PieceShape, TetrominoKind};
use crate::config::Variant;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

/// A dealt piece: shape plus one kind per cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextPiece {
    pub shape: PieceShape,
    pub kinds: Vec<Kind>,
}

#[derive(Debug, Clone)]
pub struct Bag {
    rng: Pcg32,
    kinds: u8,
    variant: Variant,
    tetrominoes: Vec<TetrominoKind>,
    upcoming: Option<NextPiece>,
}

impl Bag {
    pub fn new(seed: u64, kinds: u8, variant: Variant) -> Self {
        let mut bag = Self {
            rng: Pcg32::seed_from_u64(seed),
            kinds: kinds.max(1),
            variant,
            tetrominoes: Vec::with_capacity(14),
            upcoming: None,
        };
        let first = bag.deal();
        bag.upcoming = Some(first);
        bag
    }

    pub fn random_kind(&mut self) -> Kind {
        Kind(self.rng.random_range(0..self.kinds))
    }

    /// The piece the next call to [`Bag::next`] returns.
    pub fn peek(&self) -> Option<&NextPiece> {
        self.upcoming.as_ref()
    }

    pub fn next(&mut self) -> NextPiece {
        let dealt = self.deal();
        self.upcoming.replace(dealt).unwrap_or_else(|| self.deal())
    }

    fn deal(&mut self) -> NextPiece {
        match self.variant {
            Variant::Pairs => NextPiece {
                shape: PieceShape::Pair,
                kinds: vec![self.random_kind(), self.random_kind()],
            },
            Variant::Tetrominoes => {
                if self.tetrominoes.is_empty() {
                    self.refill();
                }
                let t = self.tetrominoes.remove(0);
                let kind = self.random_kind();
                NextPiece {
                    shape: PieceShape::Tetromino(t),
                    kinds: vec![kind; 4],
                }
            }
            Variant::Swap => NextPiece {
                shape: PieceShape::Single,
                kinds: vec![self.random_kind()],
            },
        }
    }

    fn refill(&mut self) {
        let mut all = TetrominoKind::ALL.to_vec();
        all.shuffle(&mut self.rng);
        self.tetrominoes.extend(all);
    }

    /// Fills every cell so that no group of `min_match_count` exists yet.
    pub fn fill_board(&mut self, grid: &mut Grid, rule: MatchRule, min_match_count: usize) {
        grid.clear_all();
        let (cols, rows) = (grid.cols(), grid.rows());
        for y in 0..rows {
            for x in 0..cols {
                let mut candidates: Vec<u8> = (0..self.kinds).collect();
                candidates.shuffle(&mut self.rng);
                let fallback = Kind(candidates[0]);
                let chosen = candidates.into_iter().map(Kind).find(|&k| {
                    grid.set(x, y, k);
                    find_groups(grid, rule, min_match_count).is_empty()
                });
                if chosen.is_none() {
                    log::debug!("no match-free kind for ({x}, {y}); using {fallback:?}");
                }
                grid.set(x, y, chosen.unwrap_or(fallback));
            }
        }
    }

    /// Fills every empty cell with a random kind; returns how many were filled.
    pub fn refill_empty(&mut self, grid: &mut Grid) -> usize {
        let empty: Vec<(usize, usize)> = grid
            .cells()
            .filter(|&(_, _, c)| !c.is_filled())
            .map(|(x, y, _)| (x, y))
            .collect();
        for &(x, y) in &empty {
            let k = self.random_kind();
            grid.set(x, y, k);
        }
        empty.len()
    }
}
