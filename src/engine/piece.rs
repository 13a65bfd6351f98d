//! Active piece: 1-4 cells above the committed grid, under player control.
//!
//! Cells go `Falling -> Locking -> Locked`. A locked cell is written into the
//! grid immediately; the piece is gone once every cell has locked.

use super::grid::{Grid, Kind};
use super::timer::FallTimer;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// After this many move/rotate resets, a resting piece locks on the next tick.
pub const LOCK_DELAY_RESET_LIMIT: u32 = 15;

/// Rotation kick order: first fit wins.
pub const KICKS: [(i32, i32); 4] = [(0, 0), (1, 0), (-1, 0), (0, -1)];

/// Tetromino kinds (I, O, T, S, Z, J, L).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TetrominoKind {
    I,
    O,
    T,
    S,
    Z,
    J,
    L,
}

impl TetrominoKind {
    pub const ALL: [Self; 7] = [Self::I, Self::O, Self::T, Self::S, Self::Z, Self::J, Self::L];

    /// Offsets from the pivot at (0, 0); y grows downward.
    fn offsets(self) -> &'static [(i32, i32)] {
        match self {
            Self::I => &[(-1, 0), (0, 0), (1, 0), (2, 0)],
            Self::O => &[(0, 0), (1, 0), (0, 1), (1, 1)],
            Self::T => &[(-1, 0), (0, 0), (1, 0), (0, -1)],
            Self::S => &[(-1, 0), (0, 0), (0, -1), (1, -1)],
            Self::Z => &[(-1, -1), (0, -1), (0, 0), (1, 0)],
            Self::J => &[(-1, -1), (-1, 0), (0, 0), (1, 0)],
            Self::L => &[(1, -1), (-1, 0), (0, 0), (1, 0)],
        }
    }
}

/// The closed set of piece shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PieceShape {
    Single,
    /// Pivot with its partner stacked on top.
    Pair,
    Tetromino(TetrominoKind),
}

impl PieceShape {
    /// Spawn offsets from the pivot position.
    pub fn offsets(self) -> &'static [(i32, i32)] {
        match self {
            Self::Single => &[(0, 0)],
            Self::Pair => &[(0, 0), (0, -1)],
            Self::Tetromino(t) => t.offsets(),
        }
    }

    pub fn len(self) -> usize {
        self.offsets().len()
    }

    pub fn is_empty(self) -> bool {
        self.offsets().is_empty()
    }

    fn rotates(self) -> bool {
        !matches!(self, Self::Single | Self::Tetromino(TetrominoKind::O))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Clockwise,
    CounterClockwise,
}

impl Rotation {
    /// Rotates an offset around the origin in screen space (y down).
    #[inline]
    fn apply(self, (dx, dy): (i32, i32)) -> (i32, i32) {
        match self {
            Self::Clockwise => (-dy, dx),
            Self::CounterClockwise => (dy, -dx),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellState {
    Falling,
    Locking,
    Locked,
}

/// Whether a partly blocked piece locks as one unit or cell by cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockPolicy {
    /// Each cell locks when it is blocked; the rest keep falling alone.
    #[default]
    Independent,
    /// The whole piece locks as soon as any cell is blocked.
    Rigid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PieceCell {
    pub x: i32,
    pub y: i32,
    pub kind: Kind,
    pub state: CellState,
}

/// Cells committed to the grid by one gravity step or drop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockEvent {
    pub cells: Vec<(usize, usize)>,
    /// Every cell of the piece is now in the grid.
    pub complete: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivePiece {
    pub shape: PieceShape,
    pub cells: Vec<PieceCell>,
    /// Index of the rotation pivot in `cells`.
    pivot: usize,
    /// Some cells locked while others still fall; control is lost.
    detached: bool,
}

impl ActivePiece {
    fn live(&self) -> impl Iterator<Item = &PieceCell> {
        self.cells.iter().filter(|c| c.state != CellState::Locked)
    }

    /// Positions of cells not yet in the grid.
    pub fn positions(&self) -> Vec<(i32, i32)> {
        self.live().map(|c| (c.x, c.y)).collect()
    }

    pub fn is_detached(&self) -> bool {
        self.detached
    }

    pub fn is_locking(&self) -> bool {
        let mut live = self.live().peekable();
        live.peek().is_some() && live.all(|c| c.state == CellState::Locking)
    }

    fn fits(&self, grid: &Grid, dx: i32, dy: i32) -> bool {
        self.live().all(|c| !grid.is_occupied(c.x + dx, c.y + dy))
    }

    /// Live cells that cannot fall: resting on the grid, or on a sibling that cannot fall.
    fn blocked(&self, grid: &Grid) -> Vec<bool> {
        let mut blocked: Vec<bool> = self
            .cells
            .iter()
            .map(|c| c.state != CellState::Locked && grid.is_occupied(c.x, c.y + 1))
            .collect();
        loop {
            let mut changed = false;
            for i in 0..self.cells.len() {
                let c = self.cells[i];
                if blocked[i] || c.state == CellState::Locked {
                    continue;
                }
                let resting_on_blocked = self
                    .cells
                    .iter()
                    .enumerate()
                    .any(|(j, o)| blocked[j] && o.x == c.x && o.y == c.y + 1);
                if resting_on_blocked {
                    blocked[i] = true;
                    changed = true;
                }
            }
            if !changed {
                return blocked;
            }
        }
    }
}

enum Fall {
    Moved,
    /// Some cells locked, the rest moved down.
    Split,
    Blocked,
    /// Piece has no live cells left.
    Done,
}

/// Owns the active piece and its timers.
#[derive(Debug, Clone)]
pub struct PieceController {
    piece: Option<ActivePiece>,
    policy: LockPolicy,
    lock_delay: Duration,
    gravity: FallTimer,
    lock_elapsed: Duration,
    lock_resets: u32,
}

impl PieceController {
    pub fn new(policy: LockPolicy, lock_delay: Duration) -> Self {
        Self {
            piece: None,
            policy,
            lock_delay,
            gravity: FallTimer::new(),
            lock_elapsed: Duration::ZERO,
            lock_resets: 0,
        }
    }

    pub fn piece(&self) -> Option<&ActivePiece> {
        self.piece.as_ref()
    }

    pub fn policy(&self) -> LockPolicy {
        self.policy
    }

    /// Discards the piece without touching the grid.
    pub fn clear(&mut self) {
        self.piece = None;
        self.gravity.reset();
        self.lock_elapsed = Duration::ZERO;
        self.lock_resets = 0;
    }

    /// Places a new piece with its pivot at `start`. Returns false (game over)
    /// if any cell collides; nothing changes in that case.
    pub fn try_spawn(
        &mut self,
        grid: &Grid,
        shape: PieceShape,
        kinds: &[Kind],
        start: (i32, i32),
    ) -> bool {
        debug_assert_eq!(kinds.len(), shape.len(), "one kind per piece cell");
        let cells: Vec<PieceCell> = shape
            .offsets()
            .iter()
            .zip(kinds)
            .map(|(&(dx, dy), &kind)| PieceCell {
                x: start.0 + dx,
                y: start.1 + dy,
                kind,
                state: CellState::Falling,
            })
            .collect();
        if cells.iter().any(|c| grid.is_occupied(c.x, c.y)) {
            return false;
        }
        let pivot = shape
            .offsets()
            .iter()
            .position(|&o| o == (0, 0))
            .unwrap_or(0);
        self.clear();
        self.piece = Some(ActivePiece {
            shape,
            cells,
            pivot,
            detached: false,
        });
        true
    }

    /// All-or-nothing translation of every live cell.
    pub fn try_move(&mut self, grid: &Grid, dx: i32, dy: i32) -> bool {
        let Some(piece) = self.piece.as_mut() else {
            return false;
        };
        if piece.detached || !piece.fits(grid, dx, dy) {
            return false;
        }
        for c in piece.cells.iter_mut() {
            c.x += dx;
            c.y += dy;
        }
        self.after_player_shift(grid);
        true
    }

    /// Rotates around the pivot, trying each of [`KICKS`] in order.
    pub fn try_rotate(&mut self, grid: &Grid, rotation: Rotation) -> bool {
        let Some(piece) = self.piece.as_mut() else {
            return false;
        };
        if piece.detached || !piece.shape.rotates() {
            return false;
        }
        let pivot = piece.cells[piece.pivot];
        let rotated: Vec<(i32, i32)> = piece
            .cells
            .iter()
            .map(|c| {
                let (rx, ry) = rotation.apply((c.x - pivot.x, c.y - pivot.y));
                (pivot.x + rx, pivot.y + ry)
            })
            .collect();
        let Some((kx, ky)) = KICKS.into_iter().find(|&(kx, ky)| {
            rotated
                .iter()
                .all(|&(x, y)| !grid.is_occupied(x + kx, y + ky))
        }) else {
            return false;
        };
        for (c, (x, y)) in piece.cells.iter_mut().zip(rotated) {
            c.x = x + kx;
            c.y = y + ky;
        }
        self.after_player_shift(grid);
        true
    }

    /// A successful move or rotation restarts the lock delay, up to the reset limit.
    fn after_player_shift(&mut self, grid: &Grid) {
        let Some(piece) = self.piece.as_mut() else {
            return;
        };
        if piece.is_locking() {
            self.lock_elapsed = Duration::ZERO;
            self.lock_resets = self.lock_resets.saturating_add(1);
        }
        let resting = match self.policy {
            LockPolicy::Rigid => !piece.fits(grid, 0, 1),
            LockPolicy::Independent => piece.blocked(grid).iter().zip(&piece.cells).all(
                |(&b, c)| b || c.state == CellState::Locked,
            ),
        };
        let state = if resting { CellState::Locking } else { CellState::Falling };
        for c in piece.cells.iter_mut().filter(|c| c.state != CellState::Locked) {
            c.state = state;
        }
    }

    /// Accumulates `dt`; each due interval tries a one-row fall. Returns the
    /// cells that locked during this call, if any.
    pub fn step_gravity(
        &mut self,
        grid: &mut Grid,
        dt: Duration,
        fall_interval: Duration,
    ) -> Option<LockEvent> {
        let locking = self.piece.as_ref()?.is_locking();
        if locking {
            self.lock_elapsed += dt;
        }
        let mut locked = Vec::new();
        let due = self.gravity.advance(dt, fall_interval);
        for _ in 0..due {
            match self.fall_once(grid, &mut locked) {
                Fall::Moved => self.lock_elapsed = Duration::ZERO,
                Fall::Split => {}
                Fall::Blocked | Fall::Done => break,
            }
        }
        if self.piece.as_ref().is_some_and(ActivePiece::is_locking)
            && (self.lock_elapsed >= self.lock_delay || self.lock_resets >= LOCK_DELAY_RESET_LIMIT)
        {
            self.commit_all(grid, &mut locked);
        }
        self.finish_lock(locked)
    }

    /// Drops every cell to rest and locks immediately.
    pub fn hard_drop(&mut self, grid: &mut Grid) -> Option<LockEvent> {
        self.piece.as_ref()?;
        let mut locked = Vec::new();
        let limit = grid.rows() + 1;
        for _ in 0..limit {
            match self.fall_once(grid, &mut locked) {
                Fall::Moved | Fall::Split => {}
                Fall::Blocked | Fall::Done => break,
            }
        }
        self.commit_all(grid, &mut locked);
        self.finish_lock(locked)
    }

    /// Where each live cell would rest after a hard drop. Under
    /// [`LockPolicy::Independent`] cells settle column by column, so a split
    /// piece shows split landing cells.
    pub fn ghost(&self, grid: &Grid) -> Vec<(i32, i32)> {
        let Some(piece) = self.piece.as_ref() else {
            return Vec::new();
        };
        let live = piece.positions();
        match self.policy {
            LockPolicy::Rigid => {
                let mut dy = 0;
                while piece.fits(grid, 0, dy + 1) {
                    dy += 1;
                }
                live.into_iter().map(|(x, y)| (x, y + dy)).collect()
            }
            LockPolicy::Independent => {
                let mut order: Vec<usize> = (0..live.len()).collect();
                order.sort_by_key(|&i| std::cmp::Reverse(live[i].1));
                let mut landed = live.clone();
                let mut resting: Vec<(i32, i32)> = Vec::with_capacity(live.len());
                for i in order {
                    let (x, mut y) = live[i];
                    while !grid.is_occupied(x, y + 1) && !resting.contains(&(x, y + 1)) {
                        y += 1;
                    }
                    resting.push((x, y));
                    landed[i] = (x, y);
                }
                landed
            }
        }
    }

    fn fall_once(&mut self, grid: &mut Grid, locked: &mut Vec<(usize, usize)>) -> Fall {
        let Some(piece) = self.piece.as_mut() else {
            return Fall::Done;
        };
        let blocked = piece.blocked(grid);
        let live = piece.live().count();
        let blocked_live = blocked.iter().filter(|&&b| b).count();
        if live == 0 {
            return Fall::Done;
        }
        if blocked_live == 0 {
            for c in piece.cells.iter_mut().filter(|c| c.state != CellState::Locked) {
                c.y += 1;
                c.state = CellState::Falling;
            }
            return Fall::Moved;
        }
        if blocked_live == live || self.policy == LockPolicy::Rigid {
            for c in piece.cells.iter_mut().filter(|c| c.state != CellState::Locked) {
                c.state = CellState::Locking;
            }
            return Fall::Blocked;
        }
        // Independent: blocked cells lock now, the rest fall on without control.
        piece.detached = true;
        for (c, &b) in piece.cells.iter_mut().zip(&blocked) {
            if c.state == CellState::Locked {
                continue;
            }
            if b {
                commit_cell(grid, c, locked);
            } else {
                c.y += 1;
                c.state = CellState::Falling;
            }
        }
        Fall::Split
    }

    fn commit_all(&mut self, grid: &mut Grid, locked: &mut Vec<(usize, usize)>) {
        if let Some(piece) = self.piece.as_mut() {
            for c in piece.cells.iter_mut().filter(|c| c.state != CellState::Locked) {
                commit_cell(grid, c, locked);
            }
        }
    }

    fn finish_lock(&mut self, locked: Vec<(usize, usize)>) -> Option<LockEvent> {
        if locked.is_empty() {
            return None;
        }
        let complete = self
            .piece
            .as_ref()
            .is_none_or(|p| p.cells.iter().all(|c| c.state == CellState::Locked));
        if complete {
            self.clear();
        }
        Some(LockEvent {
            cells: locked,
            complete,
        })
    }
}

fn commit_cell(grid: &mut Grid, cell: &mut PieceCell, locked: &mut Vec<(usize, usize)>) {
    debug_assert!(
        grid.in_bounds(cell.x, cell.y) && !grid.is_occupied(cell.x, cell.y),
        "locking onto an occupied or out-of-bounds cell: {cell:?}"
    );
    let (x, y) = (cell.x as usize, cell.y as usize);
    grid.set(x, y, cell.kind);
    cell.state = CellState::Locked;
    locked.push((x, y));
}
