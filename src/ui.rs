//! Layout and drawing: level select, board, sidebar, pause, game over, quit menu.

use crate::app::{GameOverInfo, MENU_COLUMNS, MenuState, PlayState, QuitOption, Screen};
use crate::theme::Theme;
use gemtui::grid::{Axis, GemKind, Grid, Pos};
use gemtui::level::Level;
use gemtui::progress::Progress;
use gemtui::session::Outcome;
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Style, Stylize};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Gauge, Paragraph, Widget};
use std::collections::HashSet;
use std::time::Instant;
use tachyonfx::{
    CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx, ref_count,
};

const SIDEBAR_WIDTH: u16 = 26;
/// Rows the sidebar sections need; the board area is at least this tall.
const SIDEBAR_HEIGHT: u16 = 25;
/// Cell sizes tried from largest to smallest until the board fits.
const CELL_SIZES: [(u16, u16); 3] = [(6, 3), (4, 2), (2, 1)];
/// A popup climbs one row per this many ms.
const POPUP_RISE_MS: u32 = 300;
const HINT_BLINK_MS: u128 = 400;

/// Largest cell (width, height) that fits the board plus sidebar into the terminal.
pub fn cell_size_for(area: Rect, rows: usize, cols: usize) -> (u16, u16) {
    let (rows, cols) = (rows as u16, cols as u16);
    CELL_SIZES
        .into_iter()
        .find(|&(w, h)| {
            cols * w + 2 + SIDEBAR_WIDTH <= area.width && rows * h + 2 <= area.height
        })
        .unwrap_or(CELL_SIZES[CELL_SIZES.len() - 1])
}

/// Board (with border) and sidebar rects, centred in `area`.
fn game_layout(area: Rect, grid: &Grid) -> (Rect, Rect, (u16, u16)) {
    let cell = cell_size_for(area, grid.rows(), grid.cols());
    let pw = grid.cols() as u16 * cell.0 + 2;
    let ph = grid.rows() as u16 * cell.1 + 2;
    let total_w = pw + SIDEBAR_WIDTH;

    // Center horizontally
    let horiz = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(total_w),
            Constraint::Fill(1),
        ])
        .split(area);

    // Center vertically
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(ph.max(SIDEBAR_HEIGHT)),
            Constraint::Fill(1),
        ])
        .split(horiz[1]);

    let inner = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(pw), Constraint::Length(SIDEBAR_WIDTH)])
        .split(vert[1]);
    let board = Rect {
        height: ph.min(inner[0].height),
        ..inner[0]
    };
    (board, inner[1], cell)
}

/// Terminal rect of one board cell, or None when it is clipped.
fn cell_rect(board_inner: Rect, pos: Pos, (cw, ch): (u16, u16)) -> Option<Rect> {
    let x = board_inner.x + pos.col as u16 * cw;
    let y = board_inner.y + pos.row as u16 * ch;
    let fits = x + cw <= board_inner.x + board_inner.width
        && y + ch <= board_inner.y + board_inner.height;
    fits.then_some(Rect {
        x,
        y,
        width: cw,
        height: ch,
    })
}

/// Build set of buffer (x, y) positions that belong to clearing cells.
fn clearing_buffer_positions(
    board_inner: Rect,
    cells: &[Pos],
    cell: (u16, u16),
) -> HashSet<(u16, u16)> {
    let mut set = HashSet::new();
    for r in cells.iter().filter_map(|&p| cell_rect(board_inner, p, cell)) {
        for bx in r.x..r.x + r.width {
            for by in r.y..r.y + r.height {
                set.insert((bx, by));
            }
        }
    }
    set
}

/// Create or update the clear fade and process it (TachyonFX: flashed cells fade to bg).
fn apply_clear_effect(
    frame: &mut Frame,
    play: &PlayState,
    theme: &Theme,
    area: Rect,
    clear_effect: &mut Option<Effect>,
    clear_process_time: &mut Option<Instant>,
    now: Instant,
    fade_ms: u32,
) {
    let (board, _, cell) = game_layout(area, play.session.grid());
    let board_inner = board.inner(ratatui::layout::Margin::new(1, 1));
    let delta = clear_process_time
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let delta_ms = delta.as_millis().min(u32::MAX as u128) as u32;
    *clear_process_time = Some(now);

    if clear_effect.is_none() {
        let clearing_set = clearing_buffer_positions(board_inner, &play.clearing, cell);
        let filter = CellFilter::PositionFn(ref_count(move |pos: Position| {
            clearing_set.contains(&(pos.x, pos.y))
        }));
        let bg = theme.bg;
        let effect = fx::fade_to(bg, bg, (fade_ms.max(1), Interpolation::Linear))
            .with_filter(filter)
            .with_area(board_inner);
        *clear_effect = Some(effect);
    }

    if let Some(effect) = clear_effect {
        frame.render_effect(effect, board_inner, TfxDuration::from_millis(delta_ms));
    }
}

/// Draw current screen with optional pause overlay and quit menu.
/// While cells are clearing and animations are on, runs the TachyonFX fade and updates
/// `clear_effect` / `clear_process_time`.
pub fn draw(
    frame: &mut Frame,
    screen: Screen,
    play: &PlayState,
    paused: bool,
    game_over: Option<&GameOverInfo>,
    levels: &[Level],
    progress: &Progress,
    menu_state: &MenuState,
    theme: &Theme,
    quit_selected: Option<QuitOption>,
    clear_effect: &mut Option<Effect>,
    clear_process_time: &mut Option<Instant>,
    now: Instant,
    animations: bool,
    step_delay_ms: u64,
) {
    let area = frame.area();
    frame
        .buffer_mut()
        .set_style(area, Style::default().bg(theme.bg));
    match screen {
        Screen::Menu => draw_menu(frame, levels, progress, menu_state, theme, area),
        Screen::Playing => {
            draw_game(frame, play, theme, area, now);
            if !play.clearing.is_empty() && animations {
                apply_clear_effect(
                    frame,
                    play,
                    theme,
                    area,
                    clear_effect,
                    clear_process_time,
                    now,
                    step_delay_ms.min(u32::MAX as u64) as u32,
                );
            }
            if paused {
                draw_pause_overlay(frame, theme, area);
            }
        }
        Screen::QuitMenu => {
            draw_game(frame, play, theme, area, now);
            if let Some(opt) = quit_selected {
                draw_quit_menu(frame, theme, opt);
            }
        }
        Screen::GameOver => {
            draw_game(frame, play, theme, area, now);
            if let Some(info) = game_over {
                draw_game_over(frame, play, info, theme, area);
            }
        }
    }
}

fn stars_text(stars: u8) -> String {
    let stars = stars.min(3) as usize;
    format!("{}{}", "★".repeat(stars), "☆".repeat(3 - stars))
}

fn draw_menu(
    frame: &mut Frame,
    levels: &[Level],
    progress: &Progress,
    menu_state: &MenuState,
    theme: &Theme,
    area: Rect,
) {
    let tile_rows = levels.len().div_ceil(MENU_COLUMNS) as u16;
    let popup_w = 56u16;
    let popup_h = 20 + tile_rows * 2;
    let popup = Rect {
        x: area.x + area.width.saturating_sub(popup_w) / 2,
        y: area.y + area.height.saturating_sub(popup_h) / 2,
        width: popup_w.min(area.width),
        height: popup_h.min(area.height),
    };

    let title = Line::from(vec![
        Span::styled(" Gem ", Style::default().fg(theme.gem_color(0)).bold()),
        Span::styled(" tui ", Style::default().fg(theme.main_fg).bold()),
    ]);

    let highlight_style = Style::default()
        .fg(Color::Black)
        .bg(theme.gem_color(1))
        .bold();
    let normal_style = Style::default().fg(theme.main_fg);
    let locked_style = Style::default().fg(theme.inactive_fg);
    let key_style = Style::default().fg(theme.gem_color(3));

    let mut lines = vec![
        Line::from(""),
        title,
        Line::from(""),
        Line::from(Span::styled(
            format!(
                " Stars {} / {}    Completed {} / {} ",
                progress.total_stars(),
                levels.len() * 3,
                progress.completed_count(),
                levels.len()
            ),
            Style::default().fg(theme.title),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " ─ LEVELS ─ ",
            Style::default().fg(theme.div_line),
        )),
    ];

    for (row, chunk) in levels.chunks(MENU_COLUMNS).enumerate() {
        let mut spans = Vec::new();
        for (col, level) in chunk.iter().enumerate() {
            let index = row * MENU_COLUMNS + col;
            let unlocked = progress.is_unlocked(levels, level.level);
            let label = if unlocked {
                format!(" {:>2} {} ", level.level, stars_text(progress.record(level.level).stars))
            } else {
                format!(" {:>2} ··· ", level.level)
            };
            let style = if index == menu_state.selected {
                highlight_style
            } else if unlocked {
                normal_style
            } else {
                locked_style
            };
            if col > 0 {
                spans.push(Span::from("  "));
            }
            spans.push(Span::styled(label, style));
        }
        lines.push(Line::from(spans));
        lines.push(Line::from(""));
    }

    if let Some(level) = levels.get(menu_state.selected) {
        let board = &level.board;
        let record = progress.record(level.level);
        let holes = board
            .layout
            .as_ref()
            .map_or(0, |l| l.iter().flatten().filter(|&&v| v == 0).count());
        lines.push(Line::from(Span::styled(
            format!(" {} ", level.title()),
            Style::default().fg(theme.title).bold(),
        )));
        lines.push(Line::from(Span::styled(
            format!(
                " {}×{}  {} colours  {} moves ",
                board.rows, board.cols, board.num_types, level.max_moves
            ),
            normal_style,
        )));
        lines.push(Line::from(Span::styled(
            format!(" Target {}   Best {} ", level.target_score, record.best),
            normal_style,
        )));
        lines.push(Line::from(Span::styled(
            format!(
                " Ice {}   Locks {}   Holes {} ",
                board.ice.len(),
                board.locks.len(),
                holes
            ),
            Style::default().fg(theme.ice_deep),
        )));
    }
    lines.push(Line::from(""));
    lines.push(match &menu_state.message {
        Some(msg) => Line::from(Span::styled(
            format!(" {msg} "),
            Style::default().fg(Color::Rgb(255, 80, 80)),
        )),
        None => Line::from(""),
    });
    lines.push(Line::from(vec![
        Span::styled(" ↕↔ ", key_style),
        Span::from("CHOOSE   "),
        Span::styled(" ENTER ", key_style),
        Span::from("PLAY   "),
        Span::styled(" Q ", key_style),
        Span::from("QUIT"),
    ]));

    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
    );
    p.render(popup, frame.buffer_mut());
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
        Line::from(Span::styled(
            " P  Resume    Q  Quit ",
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

fn draw_game_over(
    frame: &mut Frame,
    play: &PlayState,
    info: &GameOverInfo,
    theme: &Theme,
    area: Rect,
) {
    let session = &play.session;
    let popup_w = 40u16;
    let popup_h = 15u16;
    let popup = Rect {
        x: area.x + area.width.saturating_sub(popup_w) / 2,
        y: area.y + area.height.saturating_sub(popup_h) / 2,
        width: popup_w.min(area.width),
        height: popup_h.min(area.height),
    };
    frame.buffer_mut().set_style(popup, Style::default().bg(theme.bg));

    let (title, title_style) = match info.outcome {
        Outcome::Won => (
            " Level complete! ",
            Style::default().fg(Color::Black).bg(theme.gem_color(1)),
        ),
        _ => (" Out of moves ", Style::default().fg(Color::White).bg(Color::Red)),
    };
    let fg = Style::default().fg(theme.main_fg);
    let mut lines: Vec<Line> = vec![
        Line::from(""),
        Line::from(Span::styled(title, title_style)),
        Line::from(""),
        Line::from(Span::styled(
            format!(" Score: {} / {} ", info.score, session.level().target_score),
            fg,
        )),
        Line::from(Span::styled(
            format!(" {} ", stars_text(info.stars)),
            Style::default().fg(theme.title).bold(),
        )),
        Line::from(Span::styled(
            format!(" Best: {} ", info.previous_best.max(info.score)),
            fg,
        )),
        Line::from(Span::styled(
            format!(
                " Moves used: {}   Best combo: x{} ",
                session.moves_made(),
                session.best_combo()
            ),
            fg,
        )),
    ];
    if info.new_record {
        lines.push(Line::from(Span::styled(
            " New record! ",
            Style::default().fg(Color::Yellow).bold(),
        )));
    }
    lines.push(Line::from(""));
    let keys = if info.has_next {
        " Enter  Next level    R  Retry "
    } else {
        " Enter/R  Retry "
    };
    lines.push(Line::from(Span::styled(keys, fg)));
    lines.push(Line::from(Span::styled(" Q  Level select ", fg)));
    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
            .title(Span::styled(" Gemtui ", theme.title)),
    );
    p.render(popup, frame.buffer_mut());
}

/// Draw game: board + sidebar, centred.
fn draw_game(frame: &mut Frame, play: &PlayState, theme: &Theme, area: Rect, now: Instant) {
    let (board_area, sidebar_area, cell) = game_layout(area, play.session.grid());
    draw_board(frame, play, theme, board_area, cell, now);
    draw_sidebar(frame, play, theme, sidebar_area, now);
}

fn gem_glyph(kind: GemKind) -> &'static str {
    match kind {
        GemKind::Normal(_) => "●",
        GemKind::Striped {
            axis: Axis::Horizontal,
            ..
        } => "⇔",
        GemKind::Striped {
            axis: Axis::Vertical,
            ..
        } => "⇕",
        GemKind::Wrapped(_) => "◈",
        GemKind::Bomb => "✹",
    }
}

fn draw_board(
    frame: &mut Frame,
    play: &PlayState,
    theme: &Theme,
    area: Rect,
    cell: (u16, u16),
    now: Instant,
) {
    let session = &play.session;
    let grid = session.grid();
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(format!(" {} ", session.level().title()), theme.title));
    let inner = block.inner(area);
    block.render(area, frame.buffer_mut());

    let clearing: HashSet<Pos> = play.clearing.iter().copied().collect();
    let blink_on = play.elapsed(now).as_millis() / HINT_BLINK_MS % 2 == 0;
    let hinted = |p: Pos| blink_on && play.hint.is_some_and(|(a, b)| a == p || b == p);

    let buf = frame.buffer_mut();
    for pos in grid.positions() {
        let Some(r) = cell_rect(inner, pos, cell) else {
            continue;
        };
        if !grid.is_active(pos) {
            buf.set_style(r, Style::default().fg(theme.div_line).bg(theme.hole));
            for x in r.x..r.x + r.width {
                for y in r.y..r.y + r.height {
                    buf[(x, y)].set_symbol("░");
                }
            }
            continue;
        }

        let base = match grid.ice_layers(pos) {
            0 if (pos.row + pos.col) % 2 == 0 => theme.bg,
            0 => theme.cell_alt,
            1 => theme.ice,
            _ => theme.ice_deep,
        };
        let bg = if play.selected == Some(pos) {
            theme.selected
        } else if play.cursor == pos {
            theme.cursor
        } else if hinted(pos) {
            theme.hint
        } else {
            base
        };
        buf.set_style(r, Style::default().bg(bg));

        let cx = r.x + r.width / 2;
        let cy = r.y + r.height / 2;
        match grid.kind_at(pos) {
            Some(kind) => {
                let fg = kind.color().map_or(Color::White, |c| theme.gem_color(c));
                buf[(cx, cy)]
                    .set_symbol(gem_glyph(kind))
                    .set_style(Style::default().fg(fg).bold());
            }
            None if clearing.contains(&pos) => {
                buf[(cx, cy)]
                    .set_symbol("✦")
                    .set_style(Style::default().fg(Color::White));
            }
            None => {}
        }
        if grid.is_locked(pos) {
            let lock = Style::default().fg(theme.lock).bold();
            if r.width >= 3 {
                buf[(r.x, cy)].set_symbol("[").set_style(lock);
                buf[(r.x + r.width - 1, cy)].set_symbol("]").set_style(lock);
            } else {
                buf[(r.x, cy)].set_symbol("▪").set_style(lock);
            }
        }
    }

    // Floating score popups
    for popup in &play.popups {
        let Some(r) = cell_rect(inner, popup.pos, cell) else {
            continue;
        };
        let rise = (popup.age_ms / POPUP_RISE_MS) as u16;
        let ry = (r.y + r.height / 2).saturating_sub(rise).max(inner.y);
        let label = if popup.multiplier > 1 {
            format!("+{} (x{})", popup.amount, popup.multiplier)
        } else {
            format!("+{}", popup.amount)
        };
        let room = (inner.x + inner.width).saturating_sub(r.x);
        let label: String = label.chars().take(room as usize).collect();
        let style = Style::default().fg(popup.color).bg(theme.bg).bold();
        buf.set_string(r.x, ry, label, style);
    }
}

fn sidebar_block(theme: &Theme) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
}

fn draw_sidebar(frame: &mut Frame, play: &PlayState, theme: &Theme, area: Rect, now: Instant) {
    let session = &play.session;
    let grid = session.grid();
    let title_style = Style::default().fg(theme.title);
    let fg_style = Style::default().fg(theme.main_fg);

    // Free-floating sections with their own borders; vertical layout with small gaps
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6), // Score (border + score, gauge, stars)
            Constraint::Length(1), // gap
            Constraint::Length(5), // Moves (border + moves, combo, time)
            Constraint::Length(1), // gap
            Constraint::Length(4), // Obstacles
            Constraint::Length(1), // gap
            Constraint::Length(4), // Colours (border + title + strip)
            Constraint::Length(3), // Status
        ])
        .split(area);

    // --- Score ---
    let score_block = sidebar_block(theme);
    let score_inner = score_block.inner(chunks[0]);
    score_block.render(chunks[0], frame.buffer_mut());
    let score_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(score_inner);
    Paragraph::new(Line::from(vec![
        Span::styled("Score: ", title_style),
        Span::styled(
            format!("{} / {}", session.score(), session.level().target_score),
            fg_style,
        ),
    ]))
    .render(score_layout[0], frame.buffer_mut());
    let ratio = session.progress();
    let bar_color = if ratio >= 1.0 {
        theme.gem_color(1)
    } else if ratio > 0.5 {
        Color::Yellow
    } else {
        theme.gem_color(2)
    };
    Gauge::default()
        .ratio(ratio.clamp(0.0, 1.0))
        .gauge_style(Style::default().fg(bar_color).bg(theme.cell_alt))
        .render(score_layout[1], frame.buffer_mut());
    Paragraph::new(Line::from(vec![
        Span::styled("Stars: ", title_style),
        Span::styled(stars_text(session.stars()), Style::default().fg(Color::Yellow)),
    ]))
    .render(score_layout[2], frame.buffer_mut());

    // --- Moves, combo, time ---
    let moves_block = sidebar_block(theme);
    let moves_inner = moves_block.inner(chunks[2]);
    moves_block.render(chunks[2], frame.buffer_mut());
    let moves_style = if session.moves_left() <= 3 {
        Style::default().fg(Color::Red).bold()
    } else {
        fg_style
    };
    let elapsed = play.elapsed(now).as_secs();
    let combo = session.board().combo().max(1);
    let moves_lines = vec![
        Line::from(vec![
            Span::styled("Moves: ", title_style),
            Span::styled(session.moves_left().to_string(), moves_style),
        ]),
        Line::from(vec![
            Span::styled("Combo: ", title_style),
            Span::styled(
                format!("x{}  best x{}", combo, session.best_combo()),
                fg_style,
            ),
        ]),
        Line::from(vec![
            Span::styled("Time: ", title_style),
            Span::styled(format!("{:02}:{:02}", elapsed / 60, elapsed % 60), fg_style),
        ]),
    ];
    Paragraph::new(Text::from(moves_lines)).render(moves_inner, frame.buffer_mut());

    // --- Obstacles ---
    let obstacle_block = sidebar_block(theme);
    let obstacle_inner = obstacle_block.inner(chunks[4]);
    obstacle_block.render(chunks[4], frame.buffer_mut());
    let obstacle_lines = if grid.has_obstacles() {
        vec![
            Line::from(vec![
                Span::styled("Ice: ", Style::default().fg(theme.ice_deep)),
                Span::styled(grid.ice_remaining().to_string(), fg_style),
            ]),
            Line::from(vec![
                Span::styled("Locks: ", Style::default().fg(theme.lock)),
                Span::styled(grid.locks_remaining().to_string(), fg_style),
            ]),
        ]
    } else {
        vec![Line::from(Span::styled("No obstacles", Style::default().fg(theme.inactive_fg)))]
    };
    Paragraph::new(Text::from(obstacle_lines)).render(obstacle_inner, frame.buffer_mut());

    // --- Colours (own border) ---
    let colours_block = sidebar_block(theme);
    let colours_inner = colours_block.inner(chunks[6]);
    colours_block.render(chunks[6], frame.buffer_mut());
    let colours_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(colours_inner);
    Paragraph::new(Line::from(Span::styled("Colours", title_style)))
        .render(colours_layout[0], frame.buffer_mut());
    draw_colour_strip(frame, theme, session.board().num_colors(), colours_layout[1]);

    // --- Status ---
    if let Some(msg) = play.message(now) {
        Paragraph::new(Line::from(Span::styled(
            msg.to_string(),
            Style::default().fg(theme.title).bold(),
        )))
        .alignment(Alignment::Center)
        .render(chunks[7], frame.buffer_mut());
    } else if play.selected.is_some() {
        Paragraph::new(Line::from(Span::styled(
            "Arrow to swap",
            Style::default().fg(theme.inactive_fg),
        )))
        .alignment(Alignment::Center)
        .render(chunks[7], frame.buffer_mut());
    }
}

/// Draw a row of coloured blocks, one per gem colour in play.
fn draw_colour_strip(frame: &mut Frame, theme: &Theme, colors: u8, area: Rect) {
    let colors = colors.max(1);
    let block_w = (area.width / colors as u16).max(1);
    for i in 0..colors {
        let r = Rect {
            x: area.x + (i as u16) * block_w,
            y: area.y,
            width: block_w,
            height: area.height.min(1),
        };
        if r.x + r.width > area.x + area.width {
            break;
        }
        let c = theme.gem_color(i);
        let p = Paragraph::new("█".repeat(block_w as usize)).style(Style::default().fg(c).bg(c));
        p.render(r, frame.buffer_mut());
    }
}

pub fn draw_quit_menu(frame: &mut Frame, theme: &Theme, selected: QuitOption) {
    let area = frame.area();
    let qw = 24.min(area.width);
    let qh = 8.min(area.height);
    let quit_rect = Rect {
        x: area.x + area.width.saturating_sub(qw) / 2,
        y: area.y + area.height.saturating_sub(qh) / 2,
        width: qw,
        height: qh,
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.title))
        .title(" Quit? ");

    // Clear background
    frame
        .buffer_mut()
        .set_style(quit_rect, Style::default().bg(theme.bg));

    let inner = block.inner(quit_rect);
    block.render(quit_rect, frame.buffer_mut());

    let options = [
        (QuitOption::Resume, " Resume "),
        (QuitOption::LevelSelect, " Level select "),
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
        if ry < inner.y + inner.height {
            frame.buffer_mut().set_string(rx, ry, label, style);
        }
    }
}
