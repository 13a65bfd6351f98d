//! Per-frame input intents. Raw key handling lives in the front-end.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    MoveLeft,
    MoveRight,
    RotateCw,
    RotateCcw,
    SoftDrop,
    HardDrop,
}

/// Intents for one frame: `pressed` fire once, in order; `held` are level-triggered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameInput {
    pub pressed: Vec<Intent>,
    pub held: Vec<Intent>,
}

impl FrameInput {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn press(intent: Intent) -> Self {
        Self {
            pressed: vec![intent],
            held: Vec::new(),
        }
    }

    pub fn hold(intent: Intent) -> Self {
        Self {
            pressed: Vec::new(),
            held: vec![intent],
        }
    }

    pub fn is_held(&self, intent: Intent) -> bool {
        self.held.contains(&intent)
    }
}
