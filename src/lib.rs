//! chainfall: falling-block chain resolution engine.
//!
//! Pieces (pairs, tetrominoes or single swaps) settle into a grid; matched
//! groups clear, unsupported cells fall and any new matches extend the chain.
//! [`GameSession`] drives everything from one `update(dt, input)` per frame
//! and exposes a [`Snapshot`] for drawing.

pub mod config;
pub mod engine;

pub use config::{ConfigError, GameConfig, Variant};
pub use engine::{FrameInput, GameEvent, GameSession, Intent, Phase, Snapshot};
