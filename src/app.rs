//! App: terminal init, main loop, frame stepping and key handling.

use crate::input::{Action, key_to_action};
use crate::theme::Theme;
use anyhow::Result;
use chainfall::{FrameInput, GameConfig, GameEvent, GameSession, Intent, Variant};
use crossterm::event::{self, Event, KeyEventKind};
use ratatui::DefaultTerminal;
use std::time::{Duration, Instant};

/// DAS (Delayed Auto-Shift): delay before movement starts repeating when you hold a key.
const REPEAT_DELAY_MS: u64 = 170;
/// ARR (Auto-Repeat Rate): time between repeated moves while holding. 50 ms ≈ 20 moves/sec.
const REPEAT_INTERVAL_MS: u64 = 50;
/// Soft drop stays held this long after the last Down press when the
/// terminal does not report key releases.
const SOFT_DROP_HOLD_MS: u64 = 200;
const POPUP_LIFETIME: Duration = Duration::from_millis(1500);
const POPUP_RISE_EVERY: Duration = Duration::from_millis(300);

/// Floating "+score" label over a clear.
#[derive(Debug, Clone)]
pub struct ScorePopup {
    pub x: usize,
    pub y: usize,
    pub amount: u64,
    pub chain: u32,
    pub age: Duration,
}

/// Swap-variant cursor: where it is and which cell is picked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    pub at: (usize, usize),
    pub selected: Option<(usize, usize)>,
}

pub struct App {
    session: GameSession,
    theme: Theme,
    frame_interval: Duration,
    paused: bool,
    last_frame: Instant,
    repeat_state: Option<(Action, Instant)>,
    last_repeat_fire: Option<Instant>,
    soft_drop_until: Option<Instant>,
    /// Intents pressed since the last frame, in order.
    pending: Vec<Intent>,
    cursor: Cursor,
    popups: Vec<ScorePopup>,
}

impl App {
    pub fn new(config: GameConfig, theme: Theme, frame_rate: f64) -> Result<Self> {
        let session = GameSession::new(config)?;
        let cursor = Cursor {
            at: (session.config().cols / 2, session.config().rows / 2),
            selected: None,
        };
        Ok(Self {
            session,
            theme,
            frame_interval: Duration::from_secs_f64(1.0 / frame_rate.max(1.0)),
            paused: false,
            last_frame: Instant::now(),
            repeat_state: None,
            last_repeat_fire: None,
            soft_drop_until: None,
            pending: Vec::new(),
            cursor,
            popups: Vec::new(),
        })
    }

    fn restart(&mut self) {
        self.session.reset();
        self.paused = false;
        self.repeat_state = None;
        self.last_repeat_fire = None;
        self.soft_drop_until = None;
        self.pending.clear();
        self.cursor.selected = None;
        self.popups.clear();
        self.last_frame = Instant::now();
    }

    fn is_swap(&self) -> bool {
        self.session.config().variant == Variant::Swap
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
            execute,
            terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        // Release events are optional; without them soft drop times out instead.
        if let Err(e) = execute!(
            stdout,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        ) {
            log::debug!("keyboard enhancement unavailable: {e}");
        }
        let mut terminal = DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        let result = self.run_loop(&mut terminal);

        if let Err(e) = execute!(std::io::stdout(), PopKeyboardEnhancementFlags) {
            log::debug!("failed to pop keyboard flags: {e}");
        }
        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;
        log::info!(
            "final score {} ({:?})",
            self.session.score(),
            self.session.stats()
        );
        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        loop {
            let snapshot = self.session.snapshot();
            let view = crate::ui::View {
                snapshot: &snapshot,
                theme: &self.theme,
                paused: self.paused,
                cursor: self.is_swap().then_some(self.cursor),
                popups: &self.popups,
                max_speed: self.session.config().max_gravity_speed,
            };
            terminal.draw(|f| crate::ui::draw(f, &view))?;

            let timeout = self.frame_interval.saturating_sub(self.last_frame.elapsed());
            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    if let Event::Key(key) = event::read()? {
                        let action = key_to_action(key);
                        if key.kind == KeyEventKind::Release {
                            self.on_release(action);
                            continue;
                        }
                        if key.kind != KeyEventKind::Press {
                            continue;
                        }
                        if self.on_press(action) {
                            return Ok(());
                        }
                    }
                }
            }

            let now = Instant::now();
            let dt = now.duration_since(self.last_frame);
            if dt >= self.frame_interval {
                self.last_frame = now;
                if !self.paused && !self.session.is_game_over() {
                    self.step_frame(dt, now);
                }
            }
        }
    }

    /// Returns true when the app should exit.
    fn on_press(&mut self, action: Action) -> bool {
        match action {
            Action::Quit => return true,
            Action::Pause => self.paused = !self.paused,
            Action::Restart => self.restart(),
            Action::None => {}
            _ if self.paused || self.session.is_game_over() => {}
            _ if self.is_swap() => self.move_cursor(action),
            _ => {
                // Already repeating: ignore OS key-repeat presses.
                if self.repeat_state.map(|(a, _)| a) == Some(action) {
                    return false;
                }
                if action == Action::Down {
                    self.soft_drop_until =
                        Some(Instant::now() + Duration::from_millis(SOFT_DROP_HOLD_MS));
                }
                if let Some(intent) = action.intent() {
                    self.pending.push(intent);
                }
                if action.repeats() {
                    self.repeat_state = Some((action, Instant::now()));
                    self.last_repeat_fire = None;
                }
            }
        }
        false
    }

    fn on_release(&mut self, action: Action) {
        if self.repeat_state.map(|(a, _)| a) == Some(action) {
            self.repeat_state = None;
            self.last_repeat_fire = None;
        }
        if action == Action::Down {
            self.soft_drop_until = None;
        }
    }

    fn move_cursor(&mut self, action: Action) {
        let (cols, rows) = (self.session.config().cols, self.session.config().rows);
        let (x, y) = self.cursor.at;
        match action {
            Action::MoveLeft => self.cursor.at.0 = x.saturating_sub(1),
            Action::MoveRight => self.cursor.at.0 = (x + 1).min(cols - 1),
            Action::Up => self.cursor.at.1 = y.saturating_sub(1),
            Action::Down => self.cursor.at.1 = (y + 1).min(rows - 1),
            Action::Select => match self.cursor.selected {
                None => self.cursor.selected = Some(self.cursor.at),
                Some(picked) if picked == self.cursor.at => self.cursor.selected = None,
                Some(picked) => {
                    if self.session.try_swap(picked, self.cursor.at) {
                        self.cursor.selected = None;
                    } else {
                        self.cursor.selected = Some(self.cursor.at);
                    }
                }
            },
            _ => {}
        }
    }

    fn tick_repeat(&mut self, now: Instant) {
        let Some((action, first)) = self.repeat_state else {
            return;
        };
        if now.duration_since(first) < Duration::from_millis(REPEAT_DELAY_MS) {
            return;
        }
        let next = self.last_repeat_fire.unwrap_or(first) + Duration::from_millis(REPEAT_INTERVAL_MS);
        if now >= next {
            if let Some(intent) = action.intent() {
                self.pending.push(intent);
            }
            self.last_repeat_fire = Some(now);
        }
    }

    fn step_frame(&mut self, dt: Duration, now: Instant) {
        self.tick_repeat(now);
        let mut held = Vec::new();
        if self.soft_drop_until.is_some_and(|t| now < t) {
            held.push(Intent::SoftDrop);
        }
        let input = FrameInput {
            pressed: std::mem::take(&mut self.pending),
            held,
        };
        self.session.update(dt, &input);
        for ev in self.session.drain_events() {
            self.on_event(ev);
        }
        self.tick_popups(dt);
    }

    fn on_event(&mut self, ev: GameEvent) {
        match ev {
            GameEvent::Lock { complete: true, .. } => {
                // Don't carry a held move into the next piece.
                self.repeat_state = None;
                self.last_repeat_fire = None;
            }
            GameEvent::Lock { .. } => {}
            GameEvent::Match {
                chain,
                score_delta,
                cells,
                ..
            } => {
                if let Some(&(x, y)) = cells.iter().min_by_key(|&&(x, y)| (y, x)) {
                    self.popups.push(ScorePopup {
                        x,
                        y,
                        amount: score_delta,
                        chain,
                        age: Duration::ZERO,
                    });
                }
            }
            GameEvent::ChainEnded { chain, score_delta } => {
                log::info!("chain x{chain} for {score_delta}");
            }
            GameEvent::GameOver { score } => {
                log::info!("game over with {score}");
                self.repeat_state = None;
                self.soft_drop_until = None;
            }
        }
    }

    fn tick_popups(&mut self, dt: Duration) {
        self.popups.retain_mut(|p| {
            let before = p.age.as_millis() / POPUP_RISE_EVERY.as_millis();
            p.age += dt;
            let after = p.age.as_millis() / POPUP_RISE_EVERY.as_millis();
            if after > before {
                p.y = p.y.saturating_sub(1);
            }
            p.age < POPUP_LIFETIME
        });
    }
}

