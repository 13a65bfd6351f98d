//! Match detection: connected components or row/column runs of one kind.

use super::grid::{Grid, Kind};
use serde::{Deserialize, Serialize};

/// How same-kind cells qualify as a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchRule {
    /// 4-neighbour connected component (falling pairs).
    #[default]
    Connected,
    /// Straight horizontal/vertical runs (match-3). Touching runs of one kind merge.
    Runs,
}

/// Same-kind cells cleared together. Coordinates are `(x, y)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchGroup {
    pub kind: Kind,
    pub cells: Vec<(usize, usize)>,
}

impl MatchGroup {
    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

const NEIGHBOURS_4: [(i32, i32); 4] = [(0, -1), (-1, 0), (1, 0), (0, 1)];

/// Every group of size >= `min_match_count`, ordered by first seed cell in
/// row-major order. Groups are disjoint.
pub fn find_groups(grid: &Grid, rule: MatchRule, min_match_count: usize) -> Vec<MatchGroup> {
    match rule {
        MatchRule::Connected => connected_groups(grid, min_match_count, |_, _| true),
        MatchRule::Runs => {
            let marked = run_marks(grid, min_match_count);
            let cols = grid.cols();
            // Merged runs are at least one run long, so no size filter beyond 1.
            connected_groups(grid, 1, |x, y| marked[y * cols + x])
        }
    }
}

/// Flood fill over filled cells accepted by `include`.
fn connected_groups(
    grid: &Grid,
    min_size: usize,
    include: impl Fn(usize, usize) -> bool,
) -> Vec<MatchGroup> {
    let (cols, rows) = (grid.cols(), grid.rows());
    let mut visited = vec![false; rows * cols];
    let mut groups = Vec::new();

    for (sx, sy, cell) in grid.cells() {
        let Some(kind) = cell.kind() else { continue };
        if visited[sy * cols + sx] || !include(sx, sy) {
            continue;
        }
        visited[sy * cols + sx] = true;
        let mut component = Vec::new();
        let mut stack = vec![(sx, sy)];

        while let Some((x, y)) = stack.pop() {
            component.push((x, y));
            for (dx, dy) in NEIGHBOURS_4 {
                let nx = x as i32 + dx;
                let ny = y as i32 + dy;
                if !grid.in_bounds(nx, ny) {
                    continue;
                }
                let (nx, ny) = (nx as usize, ny as usize);
                if !visited[ny * cols + nx]
                    && grid.kind_at(nx, ny) == Some(kind)
                    && include(nx, ny)
                {
                    visited[ny * cols + nx] = true;
                    stack.push((nx, ny));
                }
            }
        }

        if component.len() >= min_size {
            groups.push(MatchGroup {
                kind,
                cells: component,
            });
        }
    }
    groups
}

/// Marks every cell that sits in a horizontal or vertical run of length >= `min_len`.
fn run_marks(grid: &Grid, min_len: usize) -> Vec<bool> {
    let (cols, rows) = (grid.cols(), grid.rows());
    let mut marked = vec![false; rows * cols];

    for y in 0..rows {
        let mut start = 0;
        while start < cols {
            let kind = grid.kind_at(start, y);
            let mut end = start + 1;
            while end < cols && kind.is_some() && grid.kind_at(end, y) == kind {
                end += 1;
            }
            if kind.is_some() && end - start >= min_len {
                for x in start..end {
                    marked[y * cols + x] = true;
                }
            }
            start = end;
        }
    }

    for x in 0..cols {
        let mut start = 0;
        while start < rows {
            let kind = grid.kind_at(x, start);
            let mut end = start + 1;
            while end < rows && kind.is_some() && grid.kind_at(x, end) == kind {
                end += 1;
            }
            if kind.is_some() && end - start >= min_len {
                for y in start..end {
                    marked[y * cols + x] = true;
                }
            }
            start = end;
        }
    }
    marked
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn sizes(groups: &[MatchGroup]) -> Vec<usize> {
        groups.iter().map(MatchGroup::len).collect()
    }

    #[test]
    fn test_connected_finds_l_shape() {
        let grid = Grid::from_rows(&["A..", "A..", "AA."]);
        let groups = find_groups(&grid, MatchRule::Connected, 4);
        assert_eq!(sizes(&groups), vec![4]);
        assert_eq!(groups[0].kind, Kind(0));
    }

    #[test]
    fn test_connected_ignores_small_and_diagonal() {
        let grid = Grid::from_rows(&["A.A", ".A.", "A.A"]);
        assert!(find_groups(&grid, MatchRule::Connected, 2).is_empty());
    }

    #[test]
    fn test_groups_ordered_by_row_major_seed() {
        let grid = Grid::from_rows(&["..BB", "..BB", "AAA."]);
        let groups = find_groups(&grid, MatchRule::Connected, 3);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].kind, Kind(1));
        assert_eq!(groups[1].kind, Kind(0));
    }

    #[test]
    fn test_runs_require_straight_line() {
        // An L of three is connected but not a run of three.
        let grid = Grid::from_rows(&["A..", "AA."]);
        assert!(find_groups(&grid, MatchRule::Runs, 3).is_empty());
        assert_eq!(sizes(&find_groups(&grid, MatchRule::Connected, 3)), vec![3]);
    }

    #[test]
    fn test_runs_merge_when_crossing() {
        let grid = Grid::from_rows(&[".A.", "AAA", ".A."]);
        let groups = find_groups(&grid, MatchRule::Runs, 3);
        assert_eq!(sizes(&groups), vec![5]);
    }

    #[test]
    fn test_runs_exclude_stray_neighbour() {
        // Bottom-left A touches the run but is not part of any run.
        let grid = Grid::from_rows(&["AAA", "A.."]);
        let groups = find_groups(&grid, MatchRule::Runs, 3);
        assert_eq!(sizes(&groups), vec![3]);
        let cells: HashSet<_> = groups[0].cells.iter().copied().collect();
        assert!(!cells.contains(&(0, 1)));
    }

    #[test]
    fn test_vertical_run() {
        let grid = Grid::from_rows(&["B", "A", "A", "A"]);
        let groups = find_groups(&grid, MatchRule::Runs, 3);
        assert_eq!(sizes(&groups), vec![3]);
        assert_eq!(groups[0].kind, Kind(0));
    }
}
