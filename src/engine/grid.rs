//! Playfield grid: fixed-size rows of typed cells. y=0 is top.

use std::fmt;

/// Cell type tag. Small integer, not a reference; `Kind(0)` prints as `A`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Kind(pub u8);

impl Kind {
    /// `A`..`Z` map to kinds 0..25.
    pub fn from_letter(c: char) -> Option<Self> {
        c.is_ascii_uppercase().then(|| Self(c as u8 - b'A'))
    }

    pub fn letter(self) -> char {
        (b'A' + self.0 % 26) as char
    }
}

/// Single cell: either empty or filled with a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Filled(Kind),
}

impl Cell {
    #[inline]
    pub fn kind(self) -> Option<Kind> {
        match self {
            Self::Empty => None,
            Self::Filled(k) => Some(k),
        }
    }

    #[inline]
    pub fn is_filled(self) -> bool {
        matches!(self, Self::Filled(_))
    }
}

/// Committed cells. Allocated once per session; never resized during play.
#[derive(Clone, PartialEq, Eq)]
pub struct Grid {
    rows: usize,
    cols: usize,
    /// cells[y][x]; cells[0] is top.
    cells: Vec<Vec<Cell>>,
}

impl Grid {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            cells: vec![vec![Cell::Empty; cols]; rows],
        }
    }

    /// Build a grid from text rows: `.` is empty, `A`..`Z` are kinds.
    /// All rows must have the same width.
    pub fn from_rows(rows: &[&str]) -> Self {
        let cols = rows.first().map_or(0, |r| r.chars().count());
        let mut grid = Self::new(rows.len(), cols);
        for (y, line) in rows.iter().enumerate() {
            assert_eq!(line.chars().count(), cols, "ragged grid row {y}: {line:?}");
            for (x, c) in line.chars().enumerate() {
                if let Some(kind) = Kind::from_letter(c) {
                    grid.set(x, y, kind);
                }
            }
        }
        grid
    }

    /// Inverse of [`Grid::from_rows`].
    pub fn to_rows(&self) -> Vec<String> {
        self.cells
            .iter()
            .map(|row| {
                row.iter()
                    .map(|c| c.kind().map_or('.', Kind::letter))
                    .collect()
            })
            .collect()
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.cols && (y as usize) < self.rows
    }

    /// Out-of-bounds positions are always blocked.
    #[inline]
    pub fn is_occupied(&self, x: i32, y: i32) -> bool {
        if !self.in_bounds(x, y) {
            return true;
        }
        self.cells[y as usize][x as usize].is_filled()
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<Cell> {
        self.cells.get(y).and_then(|row| row.get(x)).copied()
    }

    #[inline]
    pub fn kind_at(&self, x: usize, y: usize) -> Option<Kind> {
        self.get(x, y).and_then(Cell::kind)
    }

    /// No-op outside bounds.
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, kind: Kind) {
        if let Some(cell) = self.cells.get_mut(y).and_then(|row| row.get_mut(x)) {
            *cell = Cell::Filled(kind);
        }
    }

    /// No-op outside bounds.
    #[inline]
    pub fn clear(&mut self, x: usize, y: usize) {
        if let Some(cell) = self.cells.get_mut(y).and_then(|row| row.get_mut(x)) {
            *cell = Cell::Empty;
        }
    }

    /// Exchange two cells. Returns false (no change) if either is out of bounds.
    pub fn swap(&mut self, a: (usize, usize), b: (usize, usize)) -> bool {
        let (Some(ca), Some(cb)) = (self.get(a.0, a.1), self.get(b.0, b.1)) else {
            return false;
        };
        self.cells[a.1][a.0] = cb;
        self.cells[b.1][b.0] = ca;
        true
    }

    pub fn clear_all(&mut self) {
        for row in &mut self.cells {
            row.fill(Cell::Empty);
        }
    }

    /// Row-major traversal: top to bottom, left to right.
    pub fn for_each_cell(&self, mut f: impl FnMut(usize, usize, Cell)) {
        for (y, row) in self.cells.iter().enumerate() {
            for (x, &cell) in row.iter().enumerate() {
                f(x, y, cell);
            }
        }
    }

    /// Row-major iterator over `(x, y, cell)`.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, Cell)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .flat_map(|(y, row)| row.iter().enumerate().map(move |(x, &c)| (x, y, c)))
    }

    pub fn occupied_count(&self) -> usize {
        self.cells().filter(|&(_, _, c)| c.is_filled()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.occupied_count() == 0
    }
}

impl fmt::Debug for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Grid {}x{}", self.rows, self.cols)?;
        for line in self.to_rows() {
            writeln!(f, "  {line}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_bounds_is_occupied() {
        let grid = Grid::new(4, 3);
        assert!(grid.is_occupied(-1, 0));
        assert!(grid.is_occupied(3, 0));
        assert!(grid.is_occupied(0, 4));
        assert!(grid.is_occupied(0, -1));
        assert!(!grid.is_occupied(2, 3));
    }

    #[test]
    fn test_set_and_clear_outside_bounds_are_noops() {
        let mut grid = Grid::new(2, 2);
        grid.set(5, 0, Kind(1));
        grid.clear(0, 9);
        assert!(grid.is_empty());
    }

    #[test]
    fn test_from_rows_round_trips_text() {
        let rows = ["..A", "B.C"];
        let grid = Grid::from_rows(&rows);
        assert_eq!(grid.rows(), 2);
        assert_eq!(grid.cols(), 3);
        assert_eq!(grid.kind_at(2, 0), Some(Kind(0)));
        assert_eq!(grid.kind_at(0, 1), Some(Kind(1)));
        assert_eq!(grid.to_rows(), vec!["..A".to_string(), "B.C".to_string()]);
    }

    #[test]
    fn test_for_each_cell_is_row_major() {
        let grid = Grid::new(2, 3);
        let mut seen = Vec::new();
        grid.for_each_cell(|x, y, _| seen.push((x, y)));
        assert_eq!(seen, vec![(0, 0), (1, 0), (2, 0), (0, 1), (1, 1), (2, 1)]);
    }

    #[test]
    fn test_swap() {
        let mut grid = Grid::from_rows(&["AB"]);
        assert!(grid.swap((0, 0), (1, 0)));
        assert_eq!(grid.to_rows(), vec!["BA".to_string()]);
        assert!(!grid.swap((0, 0), (2, 0)));
    }
}
