//! Grid resolution engine: active piece, matching, cascades and chains.

pub mod bag;
pub mod cascade;
pub mod events;
pub mod grid;
pub mod input;
pub mod matcher;
pub mod piece;
pub mod resolution;
pub mod session;
pub mod timer;

pub use bag::{Bag, NextPiece};
pub use cascade::{FloatingCell, release_unsupported, settle, step_floating_gravity};
pub use events::GameEvent;
pub use grid::{Cell, Grid, Kind};
pub use input::{FrameInput, Intent};
pub use matcher::{MatchGroup, MatchRule, find_groups};
pub use piece::{
    ActivePiece, CellState, LockEvent, LockPolicy, PieceCell, PieceController, PieceShape,
    Rotation, TetrominoKind,
};
pub use resolution::{ClearOutcome, Phase, Resolution, Step};
pub use session::{GameSession, Snapshot, Stats};
pub use timer::{FallTimer, interval_for_speed};
