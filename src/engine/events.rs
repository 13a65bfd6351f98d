//! Events emitted for the presentation/audio layer. Drained once per frame.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    /// Piece cells were written into the grid.
    Lock {
        cells: Vec<(usize, usize)>,
        /// The whole piece is now committed.
        complete: bool,
    },
    /// One clear of a chain.
    Match {
        group_sizes: Vec<usize>,
        chain: u32,
        score_delta: u64,
        cells: Vec<(usize, usize)>,
    },
    /// The grid is stable again.
    ChainEnded { chain: u32, score_delta: u64 },
    /// Spawn collided; the session is over.
    GameOver { score: u64 },
}
