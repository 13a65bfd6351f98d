//! Layout and drawing: playfield, sidebar, next preview, pause and game over overlays.

use crate::app::{Cursor, ScorePopup};
use crate::theme::Theme;
use chainfall::engine::{Kind, NextPiece};
use chainfall::{Phase, Snapshot, Variant};
use ratatui::Frame;
use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, Gauge, Paragraph, Widget};
use std::collections::HashSet;

/// Terminal columns per grid cell; two keeps cells roughly square.
const CELL_WIDTH: u16 = 2;
const SIDEBAR_WIDTH: u16 = 24;
const NEXT_PREVIEW_ROWS: u16 = 4;

/// Everything one frame draws.
pub struct View<'a> {
    pub snapshot: &'a Snapshot,
    pub theme: &'a Theme,
    pub paused: bool,
    pub cursor: Option<Cursor>,
    pub popups: &'a [ScorePopup],
    /// Gravity cap, for the speed gauge.
    pub max_speed: f64,
}

/// Playfield size in terminal cells, border included.
fn playfield_size(snapshot: &Snapshot) -> (u16, u16) {
    let cols = snapshot.grid.cols() as u16;
    let rows = snapshot.grid.rows() as u16;
    (cols * CELL_WIDTH + 2, rows + 2)
}

pub fn draw(frame: &mut Frame, view: &View) {
    let area = frame.area();
    let (pw, ph) = playfield_size(view.snapshot);
    let total_w = pw + SIDEBAR_WIDTH;

    let center_horiz = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(total_w),
            Constraint::Fill(1),
        ])
        .split(area)[1];
    let active_area = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(ph.max(20)),
            Constraint::Fill(1),
        ])
        .split(center_horiz)[1];
    let inner = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(pw), Constraint::Length(SIDEBAR_WIDTH)])
        .split(active_area);

    draw_playfield(frame, view, inner[0]);
    draw_sidebar(frame, view, inner[1]);

    if view.snapshot.phase == Phase::GameOver {
        draw_game_over(frame, view, area);
    } else if view.paused {
        draw_pause_overlay(frame, view.theme, area);
    }
}

fn set_cell(buf: &mut Buffer, board: Rect, x: usize, y: usize, symbol: &str, style: Style) {
    let rx = board.x + x as u16 * CELL_WIDTH;
    let ry = board.y + y as u16;
    if rx + CELL_WIDTH <= board.right() && ry < board.bottom() {
        buf.set_string(rx, ry, symbol, style);
    }
}

fn solid(color: Color) -> Style {
    Style::default().fg(color).bg(color)
}

fn draw_playfield(frame: &mut Frame, view: &View, area: Rect) {
    let snap = view.snapshot;
    let theme = view.theme;
    let title = match snap.variant {
        Variant::Swap => " chainfall  swap ".to_string(),
        _ if snap.chain > 0 => format!(" chainfall  chain x{} ", snap.chain),
        _ => " chainfall ".to_string(),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(title, theme.title));
    let board = block.inner(area);
    block.render(area, frame.buffer_mut());

    let clearing: HashSet<(usize, usize)> = snap.clearing.iter().copied().collect();
    let buf = frame.buffer_mut();

    for (x, y, cell) in snap.grid.cells() {
        let style = match cell.kind() {
            Some(_) if clearing.contains(&(x, y)) => solid(Color::White),
            Some(kind) => solid(theme.kind_color(kind)),
            None => Style::default().bg(theme.bg),
        };
        let symbol = if cell.is_filled() { "██" } else { "  " };
        set_cell(buf, board, x, y, symbol, style);
    }

    let ghost_style = Style::default().fg(theme.inactive_fg).bg(theme.bg);
    for &(x, y) in &snap.ghost {
        if x >= 0 && y >= 0 && snap.grid.kind_at(x as usize, y as usize).is_none() {
            set_cell(buf, board, x as usize, y as usize, "░░", ghost_style);
        }
    }
    for f in &snap.floating {
        set_cell(buf, board, f.x, f.y, "██", solid(theme.kind_color(f.kind)));
    }
    for c in &snap.piece {
        if c.x >= 0 && c.y >= 0 {
            set_cell(buf, board, c.x as usize, c.y as usize, "██", solid(theme.kind_color(c.kind)));
        }
    }

    if let Some(cursor) = view.cursor {
        draw_cursor(buf, board, snap, theme, cursor);
    }

    for popup in view.popups {
        let rx = board.x + popup.x as u16 * CELL_WIDTH;
        let ry = board.y + popup.y as u16;
        if rx < board.right() && ry < board.bottom() {
            let label = if popup.chain > 1 {
                format!("+{} x{}", popup.amount, popup.chain)
            } else {
                format!("+{}", popup.amount)
            };
            let width = board.right().saturating_sub(rx) as usize;
            let style = Style::default().fg(Color::Yellow).bg(theme.bg).bold();
            buf.set_stringn(rx, ry, label, width, style);
        }
    }
}

fn draw_cursor(buf: &mut Buffer, board: Rect, snap: &Snapshot, theme: &Theme, cursor: Cursor) {
    let under = |(x, y): (usize, usize)| {
        snap.grid
            .kind_at(x, y)
            .map_or(theme.bg, |k| theme.kind_color(k))
    };
    if let Some(picked) = cursor.selected {
        let style = Style::default().fg(Color::White).bg(under(picked)).bold();
        set_cell(buf, board, picked.0, picked.1, "**", style);
    }
    let (x, y) = cursor.at;
    let style = Style::default().fg(Color::Black).bg(under(cursor.at)).bold();
    set_cell(buf, board, x, y, "<>", style);
}

fn draw_sidebar(frame: &mut Frame, view: &View, area: Rect) {
    let snap = view.snapshot;
    let theme = view.theme;
    let title_style = Style::default().fg(theme.title);
    let fg_style = Style::default().fg(theme.main_fg);
    let border_style = Style::default().fg(theme.div_line).bg(theme.bg);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(NEXT_PREVIEW_ROWS + 3), // Next (border + title + preview)
            Constraint::Length(1),
            Constraint::Length(8), // Stats
            Constraint::Length(1),
            Constraint::Length(4), // Speed gauge
        ])
        .split(area);

    if snap.variant != Variant::Swap {
        let next_block = Block::default().borders(Borders::ALL).border_style(border_style);
        let next_inner = next_block.inner(chunks[0]);
        next_block.render(chunks[0], frame.buffer_mut());
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Length(NEXT_PREVIEW_ROWS)])
            .split(next_inner);
        Paragraph::new(Line::from(Span::styled("Next", title_style)))
            .render(rows[0], frame.buffer_mut());
        if let Some(next) = &snap.next {
            draw_next_preview(frame.buffer_mut(), theme, next, rows[1]);
        }
    }

    let stats_block = Block::default().borders(Borders::ALL).border_style(border_style);
    let stats_inner = stats_block.inner(chunks[2]);
    stats_block.render(chunks[2], frame.buffer_mut());
    let stat = |label: &'static str, value: String| {
        Line::from(vec![Span::styled(label, title_style), Span::styled(value, fg_style)])
    };
    let mut lines = vec![
        stat("Score: ", snap.score.to_string()),
        stat("Chain: ", snap.chain.to_string()),
        stat("Best chain: ", snap.stats.best_chain.to_string()),
        stat("Cleared: ", snap.stats.cells_cleared.to_string()),
    ];
    match snap.variant {
        Variant::Swap => lines.push(stat("Swaps: ", snap.stats.swaps.to_string())),
        _ => lines.push(stat("Pieces: ", snap.stats.pieces_locked.to_string())),
    }
    Paragraph::new(Text::from(lines)).render(stats_inner, frame.buffer_mut());

    if snap.variant != Variant::Swap {
        let speed_block = Block::default()
            .borders(Borders::ALL)
            .border_style(border_style)
            .title(Span::styled(format!("Speed {:.1}/s", snap.gravity_speed), title_style));
        let speed_inner = speed_block.inner(chunks[4]);
        speed_block.render(chunks[4], frame.buffer_mut());
        let ratio = (snap.gravity_speed / view.max_speed.max(f64::EPSILON)).clamp(0.0, 1.0);
        let bar_color = if ratio < 0.3 {
            Color::Green
        } else if ratio < 0.6 {
            Color::Yellow
        } else {
            Color::Red
        };
        Gauge::default()
            .ratio(ratio)
            .gauge_style(Style::default().fg(bar_color))
            .render(speed_inner, frame.buffer_mut());
    }
}

/// Next piece in its spawn orientation, centred in `area`.
fn draw_next_preview(buf: &mut Buffer, theme: &Theme, next: &NextPiece, area: Rect) {
    let cells: Vec<((i32, i32), Kind)> = next
        .shape
        .offsets()
        .iter()
        .copied()
        .zip(next.kinds.iter().copied())
        .collect();
    let Some(min_x) = cells.iter().map(|((x, _), _)| *x).min() else {
        return;
    };
    let min_y = cells.iter().map(|((_, y), _)| *y).min().unwrap_or(0);
    let max_x = cells.iter().map(|((x, _), _)| *x).max().unwrap_or(0);
    let max_y = cells.iter().map(|((_, y), _)| *y).max().unwrap_or(0);
    let bw = (max_x - min_x + 1) as u16 * CELL_WIDTH;
    let bh = (max_y - min_y + 1) as u16;
    let origin = Rect {
        x: area.x + area.width.saturating_sub(bw) / 2,
        y: area.y + area.height.saturating_sub(bh) / 2,
        width: bw.min(area.width),
        height: bh.min(area.height),
    };
    for ((dx, dy), kind) in cells {
        set_cell(
            buf,
            origin,
            (dx - min_x) as usize,
            (dy - min_y) as usize,
            "██",
            solid(theme.kind_color(kind)),
        );
    }
}

fn centered_popup(area: Rect, width: u16, height: u16) -> Rect {
    Rect {
        x: area.x + area.width.saturating_sub(width) / 2,
        y: area.y + area.height.saturating_sub(height) / 2,
        width: width.min(area.width),
        height: height.min(area.height),
    }
}

fn draw_pause_overlay(frame: &mut Frame, theme: &Theme, area: Rect) {
    let popup = centered_popup(area, 28, 5);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Paused ",
            Style::default().fg(Color::Black).bg(Color::Yellow),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " P resume   Q quit ",
            Style::default().fg(theme.main_fg),
        )),
    ];
    Clear.render(popup, frame.buffer_mut());
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
        )
        .render(popup, frame.buffer_mut());
}

fn draw_game_over(frame: &mut Frame, view: &View, area: Rect) {
    let theme = view.theme;
    let snap = view.snapshot;
    let popup = centered_popup(area, 30, 9);
    let fg = Style::default().fg(theme.main_fg);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Game Over ",
            Style::default().fg(Color::White).bg(Color::Red),
        )),
        Line::from(""),
        Line::from(Span::styled(format!(" Score: {} ", snap.score), fg)),
        Line::from(Span::styled(
            format!(" Best chain: {} ", snap.stats.best_chain),
            fg,
        )),
        Line::from(""),
        Line::from(Span::styled(" R restart   Q quit ", fg)),
    ];
    Clear.render(popup, frame.buffer_mut());
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
                .title(Span::styled(" chainfall ", theme.title)),
        )
        .render(popup, frame.buffer_mut());
}
