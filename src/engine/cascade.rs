//! Cascade: detach unsupported cells and let them fall one row per interval.

use super::grid::{Grid, Kind};
use super::timer::FallTimer;
use std::time::Duration;

/// A cell detached from the grid, falling on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FloatingCell {
    pub x: usize,
    pub y: usize,
    pub kind: Kind,
}

/// Removes every occupied cell that has empty space (or another released
/// cell) directly below it. Columns are scanned bottom to top. Returns an
/// empty list, with the grid untouched, once nothing is unsupported.
pub fn release_unsupported(grid: &mut Grid) -> Vec<FloatingCell> {
    let mut floating = Vec::new();
    let rows = grid.rows();
    if rows < 2 {
        return floating;
    }
    for x in 0..grid.cols() {
        let mut gap_below = false;
        for y in (0..rows).rev() {
            match grid.kind_at(x, y) {
                None => gap_below = true,
                Some(kind) if gap_below => {
                    grid.clear(x, y);
                    floating.push(FloatingCell { x, y, kind });
                }
                Some(_) => {}
            }
        }
    }
    floating
}

/// Advances every floating cell by the rows due for `dt`. A cell that is
/// blocked by an occupied cell or the floor is written back into the grid.
/// Returns the cells still falling.
pub fn step_floating_gravity(
    grid: &mut Grid,
    floating: Vec<FloatingCell>,
    timer: &mut FallTimer,
    dt: Duration,
    fall_interval: Duration,
) -> Vec<FloatingCell> {
    let due = timer.advance(dt, fall_interval);
    let mut falling = floating;
    for _ in 0..due {
        if falling.is_empty() {
            break;
        }
        falling = fall_one_row(grid, falling);
    }
    if falling.is_empty() {
        timer.reset();
    }
    falling
}

/// Lowest cells first, so a stack falls together and lands together.
fn fall_one_row(grid: &mut Grid, mut falling: Vec<FloatingCell>) -> Vec<FloatingCell> {
    falling.sort_by(|a, b| b.y.cmp(&a.y).then(a.x.cmp(&b.x)));
    let mut still = Vec::with_capacity(falling.len());
    for mut cell in falling {
        if grid.is_occupied(cell.x as i32, cell.y as i32 + 1) {
            grid.set(cell.x, cell.y, cell.kind);
        } else {
            cell.y += 1;
            still.push(cell);
        }
    }
    still
}

/// Drops everything unsupported to rest immediately.
pub fn settle(grid: &mut Grid) {
    let mut falling = release_unsupported(grid);
    while !falling.is_empty() {
        falling = fall_one_row(grid, falling);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STEP: Duration = Duration::from_millis(50);

    #[test]
    fn test_release_lifts_whole_column_above_gap() {
        let mut grid = Grid::from_rows(&["A.", "B.", "..", "CD"]);
        let floating = release_unsupported(&mut grid);
        assert_eq!(floating.len(), 2);
        assert_eq!(grid.to_rows(), vec!["..", "..", "..", "CD"]);
        // Bottom-to-top within the column.
        assert_eq!(floating[0], FloatingCell { x: 0, y: 1, kind: Kind(1) });
        assert_eq!(floating[1], FloatingCell { x: 0, y: 0, kind: Kind(0) });
    }

    #[test]
    fn test_release_is_idempotent_when_stable() {
        let mut grid = Grid::from_rows(&["...", "A..", "AB.", "ABC"]);
        let before = grid.clone();
        assert!(release_unsupported(&mut grid).is_empty());
        assert_eq!(grid, before);
    }

    #[test]
    fn test_floating_cells_fall_one_row_per_interval() {
        let mut grid = Grid::from_rows(&["A", ".", ".", "B"]);
        let mut timer = FallTimer::new();
        let floating = release_unsupported(&mut grid);

        let floating = step_floating_gravity(&mut grid, floating, &mut timer, STEP / 2, STEP);
        assert_eq!(floating[0].y, 0);
        let floating = step_floating_gravity(&mut grid, floating, &mut timer, STEP / 2, STEP);
        assert_eq!(floating[0].y, 1);
        let floating = step_floating_gravity(&mut grid, floating, &mut timer, STEP, STEP);
        assert_eq!(floating[0].y, 2);
        let floating = step_floating_gravity(&mut grid, floating, &mut timer, STEP, STEP);
        assert!(floating.is_empty());
        assert_eq!(grid.to_rows(), vec![".", ".", "A", "B"]);
    }

    #[test]
    fn test_stacked_cells_fall_independently_but_keep_order() {
        let mut grid = Grid::from_rows(&["A.", "B.", "..", ".."]);
        let mut timer = FallTimer::new();
        let floating = release_unsupported(&mut grid);
        assert_eq!(floating.len(), 2);
        let floating = step_floating_gravity(&mut grid, floating, &mut timer, STEP * 10, STEP);
        assert!(floating.is_empty());
        assert_eq!(grid.to_rows(), vec!["..", "..", "A.", "B."]);
    }

    #[test]
    fn test_settle() {
        let mut grid = Grid::from_rows(&["AB", "..", "C.", ".."]);
        settle(&mut grid);
        assert_eq!(grid.to_rows(), vec!["..", "..", "A.", "CB"]);
    }
}
