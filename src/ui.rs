//! Layout and drawing: board, active piece, sidebar, pause/quit/game-over overlays.

use crate::app::{QuitOption, Screen};
use crate::game::{Cell, GameState};
use crate::theme::Theme;
use ratatui::Frame;
use ratatui::layout::{Alignment, Position, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Widget};
use std::collections::HashSet;
use std::time::Instant;
use tachyonfx::{
    CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx, ref_count,
};

/// Each board cell is drawn two terminal cells wide, one tall.
const CELL_WIDTH: u16 = 2;

const SIDEBAR_WIDTH: u16 = 22;

/// Duration of the row-clear flash in ms.
const CLEAR_FLASH_MS: u32 = 350;

/// Board size in terminal cells including the border.
fn board_pixel_size(state: &GameState) -> (u16, u16) {
    (
        state.board.cols() as u16 * CELL_WIDTH + 2,
        state.board.rows() as u16 + 2,
    )
}

/// Outer rects for the bordered board and the sidebar, centred in `area`.
fn game_rects(area: Rect, state: &GameState) -> (Rect, Rect) {
    let (pw, ph) = board_pixel_size(state);
    let total_w = pw + SIDEBAR_WIDTH;
    let x = area.x + area.width.saturating_sub(total_w) / 2;
    let y = area.y + area.height.saturating_sub(ph) / 2;
    let board_outer = Rect {
        x,
        y,
        width: pw.min(area.width),
        height: ph.min(area.height),
    };
    let sidebar = Rect {
        x: (x + pw).min(area.x + area.width),
        y,
        width: SIDEBAR_WIDTH.min(area.width.saturating_sub(pw)),
        height: ph.min(area.height),
    };
    (board_outer, sidebar)
}

/// Board inner rect (cells only, no border); matches draw_game layout.
fn board_rect(area: Rect, state: &GameState) -> Rect {
    let (board_outer, _) = game_rects(area, state);
    Rect {
        x: board_outer.x + 1,
        y: board_outer.y + 1,
        width: (state.board.cols() as u16 * CELL_WIDTH).min(board_outer.width.saturating_sub(2)),
        height: (state.board.rows() as u16).min(board_outer.height.saturating_sub(2)),
    }
}

/// Build set of buffer (x, y) positions covering the flashed rows.
fn flash_buffer_positions(board_rect: Rect, rows: &[usize]) -> HashSet<(u16, u16)> {
    let mut set = HashSet::new();
    for &row in rows {
        let by = board_rect.y + row as u16;
        if by >= board_rect.y + board_rect.height {
            continue;
        }
        for bx in board_rect.x..board_rect.x + board_rect.width {
            set.insert((bx, by));
        }
    }
    set
}

/// Create or update the row-clear flash and process it (TachyonFX: fade the
/// cleared rows back in from white).
fn apply_clear_flash(
    frame: &mut Frame,
    state: &GameState,
    area: Rect,
    clear_flash: &mut Option<Effect>,
    clear_flash_process_time: &mut Option<Instant>,
    flash_rows: &[usize],
    now: Instant,
) {
    let rect = board_rect(area, state);
    let delta = clear_flash_process_time
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let delta_ms = delta.as_millis().min(u32::MAX as u128) as u32;
    let tfx_delta = TfxDuration::from_millis(delta_ms);
    *clear_flash_process_time = Some(now);

    if clear_flash.is_none() {
        let flash_set = flash_buffer_positions(rect, flash_rows);
        let filter = CellFilter::PositionFn(ref_count(move |pos: Position| {
            flash_set.contains(&(pos.x, pos.y))
        }));
        let effect = fx::fade_from(
            Color::White,
            Color::White,
            (CLEAR_FLASH_MS, Interpolation::Linear),
        )
        .with_filter(filter)
        .with_area(rect);
        *clear_flash = Some(effect);
    }

    if let Some(effect) = clear_flash {
        frame.render_effect(effect, rect, tfx_delta);
    }
}

/// Draw current screen: the game is always drawn; pause, quit-confirm and
/// game-over are overlays. When `flash_rows` is non-empty the TachyonFX flash
/// runs over the just-cleared rows.
pub fn draw(
    frame: &mut Frame,
    screen: Screen,
    state: &GameState,
    theme: &Theme,
    paused: bool,
    quit_selected: Option<QuitOption>,
    clear_flash: &mut Option<Effect>,
    clear_flash_process_time: &mut Option<Instant>,
    flash_rows: &[usize],
    now: Instant,
) {
    let area = frame.area();
    draw_game(frame, state, theme, area);
    if !flash_rows.is_empty() {
        apply_clear_flash(
            frame,
            state,
            area,
            clear_flash,
            clear_flash_process_time,
            flash_rows,
            now,
        );
    }
    match screen {
        Screen::Playing => {
            if paused {
                draw_pause_overlay(frame, theme, area);
            }
        }
        Screen::QuitMenu => {
            if let Some(opt) = quit_selected {
                draw_quit_menu(frame, theme, opt);
            }
        }
        Screen::GameOver => draw_game_over(frame, state, theme, area),
    }
}

/// Colour of the active piece's cell at board (row, col), if occupied.
fn piece_cell_color(state: &GameState, theme: &Theme, row: usize, col: usize) -> Option<Color> {
    let pattern = state.piece.pattern();
    let r = row as i32 - state.piece.y;
    let c = col as i32 - state.piece.x;
    if r < 0 || c < 0 {
        return None;
    }
    let (r, c) = (r as usize, c as usize);
    if r >= pattern.len() || c >= pattern[r].len() || pattern[r][c] == 0 {
        return None;
    }
    Some(theme.piece_color(state.piece.kind.color_index()))
}

/// Draw game: bordered board with the locked stack and active piece, plus
/// the sidebar; centred in the full area.
fn draw_game(frame: &mut Frame, state: &GameState, theme: &Theme, area: Rect) {
    let (board_outer, sidebar_area) = game_rects(area, state);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(" Gridfall ", Style::default().fg(theme.title)));
    let inner = block.inner(board_outer);
    block.render(board_outer, frame.buffer_mut());

    let buf = frame.buffer_mut();
    for row in 0..state.board.rows() {
        for col in 0..state.board.cols() {
            let color = piece_cell_color(state, theme, row, col).unwrap_or_else(|| {
                match state.board.get(row, col) {
                    Some(Cell::Block(i)) => theme.piece_color(i),
                    _ => theme.bg,
                }
            });
            let rx = inner.x + col as u16 * CELL_WIDTH;
            let ry = inner.y + row as u16;
            if ry >= inner.y + inner.height {
                continue;
            }
            for dx in 0..CELL_WIDTH {
                if rx + dx < inner.x + inner.width {
                    buf[(rx + dx, ry)]
                        .set_symbol(" ")
                        .set_style(Style::default().bg(color));
                }
            }
        }
    }

    draw_sidebar(frame, state, theme, sidebar_area);
}

fn draw_sidebar(frame: &mut Frame, state: &GameState, theme: &Theme, area: Rect) {
    let title_style = Style::default().fg(theme.title);
    let fg_style = Style::default().fg(theme.main_fg);
    let border_style = Style::default().fg(theme.div_line).bg(theme.bg);

    // Stats on top, controls below; free-floating blocks with a gap.
    let stats_outer = Rect {
        x: area.x,
        y: area.y,
        width: area.width,
        height: 4.min(area.height),
    };
    if stats_outer.height < 3 || stats_outer.width < 3 {
        return;
    }
    let stats_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style);
    let stats_inner = stats_block.inner(stats_outer);
    stats_block.render(stats_outer, frame.buffer_mut());
    let stats_lines = vec![
        Line::from(vec![
            Span::styled("Score: ", title_style),
            Span::styled(state.score.to_string(), fg_style),
        ]),
        Line::from(vec![
            Span::styled("Lines: ", title_style),
            Span::styled(state.lines_cleared.to_string(), fg_style),
        ]),
    ];
    Paragraph::new(ratatui::text::Text::from(stats_lines)).render(stats_inner, frame.buffer_mut());

    let controls_outer = Rect {
        x: area.x,
        y: area.y + 5,
        width: area.width,
        height: 7.min(area.height.saturating_sub(5)),
    };
    if controls_outer.height < 3 {
        return;
    }
    let controls_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(Span::styled("Keys", title_style));
    let controls_inner = controls_block.inner(controls_outer);
    controls_block.render(controls_outer, frame.buffer_mut());
    let controls_lines = vec![
        Line::from(Span::styled("←/→  move", fg_style)),
        Line::from(Span::styled("↑    rotate", fg_style)),
        Line::from(Span::styled("↓    soft drop", fg_style)),
        Line::from(Span::styled("p    pause", fg_style)),
        Line::from(Span::styled("q    quit", fg_style)),
    ];
    Paragraph::new(ratatui::text::Text::from(controls_lines))
        .render(controls_inner, frame.buffer_mut());
}

fn draw_pause_overlay(frame: &mut Frame, theme: &Theme, area: Rect) {
    let popup_w = 28u16;
    let popup_h = 5u16;
    let popup = Rect {
        x: area.x + area.width.saturating_sub(popup_w) / 2,
        y: area.y + area.height.saturating_sub(popup_h) / 2,
        width: popup_w.min(area.width),
        height: popup_h.min(area.height),
    };
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Paused ",
            Style::default().fg(Color::Black).bg(Color::Yellow),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " P — Resume    Q — Quit ",
            Style::default().fg(theme.main_fg),
        )),
    ];
    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
    );
    p.render(popup, frame.buffer_mut());
}

fn draw_game_over(frame: &mut Frame, state: &GameState, theme: &Theme, area: Rect) {
    let popup_w = 30u16;
    let popup_h = 9u16;
    let popup = Rect {
        x: area.x + area.width.saturating_sub(popup_w) / 2,
        y: area.y + area.height.saturating_sub(popup_h) / 2,
        width: popup_w.min(area.width),
        height: popup_h.min(area.height),
    };
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Game Over ",
            Style::default().fg(Color::White).bg(Color::Red),
        )),
        Line::from(""),
        Line::from(Span::styled(
            format!(" Score: {} ", state.score),
            Style::default().fg(theme.main_fg),
        )),
        Line::from(Span::styled(
            format!(" Lines: {} ", state.lines_cleared),
            Style::default().fg(theme.main_fg),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " R — Restart    Q — Quit ",
            Style::default().fg(theme.main_fg),
        )),
    ];
    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
            .title(Span::styled(" Gridfall ", Style::default().fg(theme.title))),
    );
    p.render(popup, frame.buffer_mut());
}

pub fn draw_quit_menu(frame: &mut Frame, theme: &Theme, selected: QuitOption) {
    let area = frame.area();
    let qw = 24;
    let qh = 8;
    let quit_rect = Rect {
        x: area.x + area.width.saturating_sub(qw) / 2,
        y: area.y + area.height.saturating_sub(qh) / 2,
        width: qw.min(area.width),
        height: qh.min(area.height),
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.title))
        .title(" Quit? ");

    // Clear background
    for y in quit_rect.y..quit_rect.y + quit_rect.height {
        for x in quit_rect.x..quit_rect.x + quit_rect.width {
            frame.buffer_mut()[(x, y)].set_style(Style::default().bg(theme.bg));
        }
    }

    let inner = block.inner(quit_rect);
    block.render(quit_rect, frame.buffer_mut());

    let options = [
        (QuitOption::Resume, " Resume "),
        (QuitOption::Restart, " Restart "),
        (QuitOption::Exit, " Exit "),
    ];

    for (i, (opt, label)) in options.iter().enumerate() {
        let style = if *opt == selected {
            Style::default().fg(theme.bg).bg(theme.title).bold()
        } else {
            Style::default().fg(theme.title)
        };
        let rx = inner.x + (inner.width.saturating_sub(label.len() as u16)) / 2;
        let ry = inner.y + 1 + i as u16 * 2;
        frame.buffer_mut().set_string(rx, ry, label, style);
    }
}
