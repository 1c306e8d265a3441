//! App: main loop, screens, cursor handling and cascade pacing.

use crate::GameConfig;
use crate::input::{Action, key_to_action};
use crate::theme::Theme;
use anyhow::Result;
use crossterm::event::{self, Event as TermEvent, KeyEventKind};
use gemtui::cascade::{CascadeStep, EngineError, Event, Rejection, Verdict};
use gemtui::grid::Pos;
use gemtui::level::{self, Level, LevelError};
use gemtui::progress::Progress;
use gemtui::session::{Outcome, Session};
use log::{debug, info, warn};
use ratatui::DefaultTerminal;
use ratatui::style::Color;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tachyonfx::Effect;

/// Idle time before the hint pair lights up on its own.
const HINT_IDLE: Duration = Duration::from_secs(4);
/// How long a status message stays in the sidebar.
const MESSAGE_TTL: Duration = Duration::from_millis(1500);
const POPUP_LIFETIME_MS: u32 = 1500;
/// Levels per row on the level select screen.
pub const MENU_COLUMNS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Menu,
    Playing,
    GameOver,
    QuitMenu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuitOption {
    Resume,
    LevelSelect,
    Exit,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MenuState {
    /// Index into the level list.
    pub selected: usize,
    pub message: Option<String>,
}

/// Floating `+N` label over the cells a step cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScorePopup {
    pub pos: Pos,
    pub amount: u64,
    pub multiplier: u32,
    pub age_ms: u32,
    pub color: Color,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameOverInfo {
    pub outcome: Outcome,
    pub score: u64,
    pub stars: u8,
    pub previous_best: u64,
    pub new_record: bool,
    pub has_next: bool,
}

/// Everything the board view needs for the level being played.
#[derive(Debug, Clone)]
pub struct PlayState {
    pub session: Session,
    pub cursor: Pos,
    pub selected: Option<Pos>,
    pub hint: Option<(Pos, Pos)>,
    pub popups: Vec<ScorePopup>,
    /// Cells emptied by the last clear, flashed until the refill.
    pub clearing: Vec<Pos>,
    pub message: Option<(String, Instant)>,
    started: Instant,
    paused_for: Duration,
    paused_at: Option<Instant>,
    finished_at: Option<Instant>,
}

impl PlayState {
    fn new(session: Session, now: Instant) -> Self {
        let cursor = session
            .grid()
            .active_positions()
            .next()
            .unwrap_or(Pos::new(0, 0));
        Self {
            session,
            cursor,
            selected: None,
            hint: None,
            popups: Vec::new(),
            clearing: Vec::new(),
            message: None,
            started: now,
            paused_for: Duration::ZERO,
            paused_at: None,
            finished_at: None,
        }
    }

    /// Play time, not counting pauses.
    pub fn elapsed(&self, now: Instant) -> Duration {
        let end = self.finished_at.or(self.paused_at).unwrap_or(now);
        end.saturating_duration_since(self.started)
            .saturating_sub(self.paused_for)
    }

    pub fn message(&self, now: Instant) -> Option<&str> {
        self.message
            .as_ref()
            .filter(|(_, at)| now.saturating_duration_since(*at) < MESSAGE_TTL)
            .map(|(text, _)| text.as_str())
    }

    fn say(&mut self, text: impl Into<String>, now: Instant) {
        self.message = Some((text.into(), now));
    }

    fn set_paused(&mut self, paused: bool, now: Instant) {
        match (paused, self.paused_at) {
            (true, None) => self.paused_at = Some(now),
            (false, Some(at)) => {
                self.paused_for += now.saturating_duration_since(at);
                self.paused_at = None;
            }
            _ => {}
        }
    }

    fn move_cursor(&mut self, (dr, dc): (isize, isize)) {
        let grid = self.session.grid();
        if let Some(next) = self.cursor.offset(dr, dc).filter(|p| grid.in_bounds(*p)) {
            self.cursor = next;
        }
    }

    /// Ages popups and drops the expired ones.
    pub fn tick_popups(&mut self, delta_ms: u32) {
        for p in &mut self.popups {
            p.age_ms = p.age_ms.saturating_add(delta_ms);
        }
        self.popups.retain(|p| p.age_ms < POPUP_LIFETIME_MS);
    }
}

fn rejection_text(rejection: Rejection) -> &'static str {
    match rejection {
        Rejection::NotAdjacent => "Pick a neighbouring gem",
        Rejection::Inactive => "Nothing to swap there",
        Rejection::Locked => "That gem is locked",
        Rejection::NoMatch => "No match",
    }
}

pub struct App {
    config: GameConfig,
    theme: Theme,
    levels: Vec<Level>,
    progress: Progress,
    progress_path: PathBuf,
    screen: Screen,
    paused: bool,
    play: PlayState,
    menu_state: MenuState,
    quit_selected: QuitOption,
    game_over: Option<GameOverInfo>,
    last_input_time: Instant,
    next_step_at: Option<Instant>,
    games_started: u64,
    /// TachyonFX fade for cleared cells (created when a clear is shown).
    clear_effect: Option<Effect>,
    /// Last time we processed the clear effect (for delta).
    clear_effect_process_time: Option<Instant>,
}

impl App {
    pub fn new(
        config: GameConfig,
        theme: Theme,
        levels: Vec<Level>,
        progress: Progress,
        progress_path: PathBuf,
    ) -> Result<Self> {
        let now = Instant::now();
        let start = level::find(&levels, config.start_level)?.level;
        let selected = levels.iter().position(|l| l.level == start).unwrap_or(0);
        let session = build_session(&levels, &config, start, config.seed.unwrap_or(0))?;
        let screen = if config.show_menu {
            Screen::Menu
        } else {
            Screen::Playing
        };
        let mut app = Self {
            config,
            theme,
            levels,
            progress,
            progress_path,
            screen,
            paused: false,
            play: PlayState::new(session, now),
            menu_state: MenuState {
                selected,
                message: None,
            },
            quit_selected: QuitOption::Resume,
            game_over: None,
            last_input_time: now,
            next_step_at: None,
            games_started: 0,
            clear_effect: None,
            clear_effect_process_time: None,
        };
        if screen == Screen::Playing {
            app.start_level(start)?;
        }
        Ok(app)
    }

    fn next_seed(&self) -> u64 {
        match self.config.seed {
            Some(seed) => seed.wrapping_add(self.games_started),
            None => rand::random(),
        }
    }

    fn start_level(&mut self, number: u32) -> Result<(), LevelError> {
        let seed = self.next_seed();
        let session = build_session(&self.levels, &self.config, number, seed)?;
        info!("starting level {number} with seed {seed}");
        let now = Instant::now();
        self.games_started += 1;
        self.play = PlayState::new(session, now);
        self.screen = Screen::Playing;
        self.paused = false;
        self.game_over = None;
        self.last_input_time = now;
        self.next_step_at = None;
        self.clear_effect = None;
        self.clear_effect_process_time = None;
        Ok(())
    }

    fn current_level(&self) -> u32 {
        self.play.session.level().level
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

        // Release events let us drop key repeats on terminals that report them.
        let _ = execute!(
            stdout,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        );

        let mut terminal =
            ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        let result = self.run_loop(&mut terminal);

        // Restore
        let _ = execute!(std::io::stdout(), PopKeyboardEnhancementFlags);
        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        let frame_duration = Duration::from_secs_f64(1.0 / self.config.frame_rate);
        let frame_ms = frame_duration.as_millis() as u32;
        loop {
            let now = Instant::now();
            terminal.draw(|f| {
                crate::ui::draw(
                    f,
                    self.screen,
                    &self.play,
                    self.paused,
                    self.game_over.as_ref(),
                    &self.levels,
                    &self.progress,
                    &self.menu_state,
                    &self.theme,
                    (self.screen == Screen::QuitMenu).then_some(self.quit_selected),
                    &mut self.clear_effect,
                    &mut self.clear_effect_process_time,
                    now,
                    self.config.animations,
                    self.config.step_delay_ms,
                )
            })?;

            if !self.paused {
                self.play.tick_popups(frame_ms);
            }

            let timeout = frame_duration.saturating_sub(now.elapsed());
            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    let TermEvent::Key(key) = event::read()? else {
                        continue;
                    };
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    let action = key_to_action(key);
                    let now = Instant::now();
                    self.last_input_time = now;
                    let keep_running = match self.screen {
                        Screen::Menu => self.on_menu_key(action),
                        Screen::Playing => {
                            self.on_playing_key(action, now);
                            true
                        }
                        Screen::QuitMenu => self.on_quit_menu_key(action, now),
                        Screen::GameOver => {
                            self.on_game_over_key(action);
                            true
                        }
                    };
                    if !keep_running {
                        return Ok(());
                    }
                }
            }

            let now = Instant::now();
            self.pump_cascade(now);
            self.maybe_show_idle_hint(now);
        }
    }

    /// Returns false when the player asked to leave.
    fn on_menu_key(&mut self, action: Action) -> bool {
        let count = self.levels.len();
        match action {
            Action::Quit => return false,
            Action::Left => self.menu_state.selected = self.menu_state.selected.saturating_sub(1),
            Action::Right => {
                self.menu_state.selected = (self.menu_state.selected + 1).min(count - 1);
            }
            Action::Up => {
                self.menu_state.selected = self.menu_state.selected.saturating_sub(MENU_COLUMNS);
            }
            Action::Down => {
                let next = self.menu_state.selected + MENU_COLUMNS;
                if next < count {
                    self.menu_state.selected = next;
                }
            }
            Action::Select => {
                let Some(level) = self.levels.get(self.menu_state.selected) else {
                    return true;
                };
                let number = level.level;
                if !self.progress.is_unlocked(&self.levels, number) {
                    let message = level::previous(&self.levels, number)
                        .map_or_else(|| "Level locked".to_owned(), |prev| {
                            format!("Complete level {} first", prev.level)
                        });
                    self.menu_state.message = Some(message);
                    return true;
                }
                if let Err(e) = self.start_level(number) {
                    warn!("cannot start level {number}: {e}");
                    self.menu_state.message = Some(e.to_string());
                    return true;
                }
            }
            _ => return true,
        }
        if action != Action::Select {
            self.menu_state.message = None;
        }
        true
    }

    fn on_playing_key(&mut self, action: Action, now: Instant) {
        if self.paused {
            match action {
                Action::Pause => self.set_paused(false, now),
                Action::Quit => self.open_quit_menu(now),
                _ => {}
            }
            return;
        }
        match action {
            Action::Pause => {
                self.set_paused(true, now);
                return;
            }
            Action::Quit => {
                self.open_quit_menu(now);
                return;
            }
            _ => {}
        }
        // Input waits until the cascade settles.
        if !self.play.session.is_idle() || self.play.session.is_over() {
            return;
        }
        self.play.hint = None;
        if let Some(dir) = action.direction() {
            match self.play.selected {
                Some(from) => {
                    if let Some(to) = from.offset(dir.0, dir.1) {
                        self.try_swap(from, to, now);
                    }
                }
                None => self.play.move_cursor(dir),
            }
            return;
        }
        match action {
            Action::Select => {
                let cursor = self.play.cursor;
                match self.play.selected {
                    None => self.play.selected = Some(cursor),
                    Some(sel) if sel == cursor => self.play.selected = None,
                    Some(sel) if sel.is_adjacent(cursor) => self.try_swap(sel, cursor, now),
                    Some(_) => self.play.selected = Some(cursor),
                }
            }
            Action::Hint => {
                self.play.hint = self.play.session.hint();
                if self.play.hint.is_none() {
                    self.play.say("No moves on this board", now);
                }
            }
            Action::Restart => {
                let number = self.current_level();
                if let Err(e) = self.start_level(number) {
                    warn!("cannot restart level {number}: {e}");
                }
            }
            _ => {}
        }
    }

    fn try_swap(&mut self, a: Pos, b: Pos, now: Instant) {
        self.play.selected = None;
        match self.play.session.begin_swap(a, b) {
            Ok(Verdict::Accepted(kind)) => {
                debug!("swap {a} <-> {b} accepted as {kind:?}");
                self.play.cursor = b;
                self.next_step_at = Some(now);
            }
            Ok(Verdict::Rejected(rejection)) => {
                self.play.say(rejection_text(rejection), now);
            }
            // Swapping off the edge of the board.
            Err(EngineError::OutOfBounds(_)) => {}
            Err(e) => warn!("swap {a} <-> {b} refused: {e}"),
        }
    }

    fn open_quit_menu(&mut self, now: Instant) {
        self.set_paused(true, now);
        self.screen = Screen::QuitMenu;
        self.quit_selected = QuitOption::Resume;
    }

    fn set_paused(&mut self, paused: bool, now: Instant) {
        self.paused = paused;
        self.play.set_paused(paused, now);
    }

    /// Returns false when the player picked Exit.
    fn on_quit_menu_key(&mut self, action: Action, now: Instant) -> bool {
        match action {
            Action::Down | Action::Right => {
                self.quit_selected = match self.quit_selected {
                    QuitOption::Resume => QuitOption::LevelSelect,
                    QuitOption::LevelSelect => QuitOption::Exit,
                    QuitOption::Exit => QuitOption::Resume,
                };
            }
            Action::Up | Action::Left => {
                self.quit_selected = match self.quit_selected {
                    QuitOption::Resume => QuitOption::Exit,
                    QuitOption::LevelSelect => QuitOption::Resume,
                    QuitOption::Exit => QuitOption::LevelSelect,
                };
            }
            Action::Select => match self.quit_selected {
                QuitOption::Resume => self.resume(now),
                QuitOption::LevelSelect => self.open_menu(),
                QuitOption::Exit => return false,
            },
            Action::Pause | Action::Quit => self.resume(now),
            _ => {}
        }
        true
    }

    fn resume(&mut self, now: Instant) {
        self.screen = Screen::Playing;
        self.set_paused(false, now);
    }

    fn open_menu(&mut self) {
        self.screen = Screen::Menu;
        self.paused = false;
        self.menu_state.message = None;
        let current = self.current_level();
        if let Some(i) = self.levels.iter().position(|l| l.level == current) {
            self.menu_state.selected = i;
        }
    }

    fn on_game_over_key(&mut self, action: Action) {
        let Some(info) = self.game_over else {
            return;
        };
        let current = self.current_level();
        let next = level::next(&self.levels, current)
            .map(|l| l.level)
            .filter(|n| self.progress.is_unlocked(&self.levels, *n));
        let target = match action {
            Action::Select if info.outcome == Outcome::Won => next.or(Some(current)),
            Action::Select | Action::Restart => Some(current),
            Action::Next => next,
            Action::Quit => {
                self.open_menu();
                None
            }
            _ => None,
        };
        let Some(number) = target else {
            return;
        };
        if let Err(e) = self.start_level(number) {
            warn!("cannot start level {number}: {e}");
            self.open_menu();
            self.menu_state.message = Some(e.to_string());
        }
    }

    /// Pulls cascade events one at a time, `step_delay_ms` apart.
    fn pump_cascade(&mut self, now: Instant) {
        if self.screen != Screen::Playing || self.paused || self.play.session.is_idle() {
            return;
        }
        if !self.config.animations {
            while let Some(event) = self.play.session.advance() {
                self.on_event(event, now);
            }
            return;
        }
        if self.next_step_at.is_some_and(|at| now < at) {
            return;
        }
        if let Some(event) = self.play.session.advance() {
            self.on_event(event, now);
        }
        self.next_step_at = Some(now + Duration::from_millis(self.config.step_delay_ms));
    }

    fn on_event(&mut self, event: Event, now: Instant) {
        match event {
            Event::Cleared(step) => self.on_cleared(&step),
            Event::Refilled(_) => {
                self.play.clearing.clear();
                self.clear_effect = None;
                self.clear_effect_process_time = None;
            }
            Event::Reshuffled(r) => {
                let text = if r.exhausted {
                    "No moves left; board shuffled as best it could"
                } else {
                    "No moves left, shuffling"
                };
                self.play.say(text, now);
            }
            Event::Settled { .. } => {
                self.play.clearing.clear();
                self.next_step_at = None;
                self.last_input_time = now;
                if self.play.session.is_over() {
                    self.finish_game(now);
                }
            }
        }
    }

    fn on_cleared(&mut self, step: &CascadeStep) {
        self.play.clearing = step.destroyed.iter().copied().collect();
        self.clear_effect = None;
        self.clear_effect_process_time = None;
        if step.score == 0 {
            return;
        }
        let Some(&pos) = self.play.clearing.get(self.play.clearing.len() / 2) else {
            return;
        };
        let color = step
            .groups
            .first()
            .map_or(self.theme.title, |g| self.theme.gem_color(g.color));
        self.play.popups.push(ScorePopup {
            pos,
            amount: step.score,
            multiplier: step.combo,
            age_ms: 0,
            color,
        });
    }

    fn finish_game(&mut self, now: Instant) {
        self.play.finished_at = Some(now);
        let session = &self.play.session;
        let number = session.level().level;
        let outcome = session.outcome();
        let score = session.score();
        let stars = session.stars();
        let previous_best = self.progress.record(number).best;
        let new_record = match outcome {
            Outcome::Won => self.progress.complete_level(number, score, stars),
            _ => self.progress.record_attempt(number, score),
        };
        if let Err(e) = self.progress.save(&self.progress_path) {
            warn!("could not save progress to {}: {e:#}", self.progress_path.display());
        }
        self.game_over = Some(GameOverInfo {
            outcome,
            score,
            stars,
            previous_best,
            new_record,
            has_next: outcome == Outcome::Won && level::next(&self.levels, number).is_some(),
        });
        self.screen = Screen::GameOver;
    }

    fn maybe_show_idle_hint(&mut self, now: Instant) {
        let play = &self.play;
        if self.screen != Screen::Playing
            || self.paused
            || play.hint.is_some()
            || play.selected.is_some()
            || !play.session.is_idle()
            || play.session.is_over()
        {
            return;
        }
        if now.saturating_duration_since(self.last_input_time) >= HINT_IDLE {
            self.play.hint = self.play.session.hint();
        }
    }
}

/// Clones the level and applies the CLI overrides before dealing a board.
fn build_session(
    levels: &[Level],
    config: &GameConfig,
    number: u32,
    seed: u64,
) -> Result<Session, LevelError> {
    let mut level = level::find(levels, number)?.clone();
    if let Some(colors) = config.colors {
        level.board.num_types = colors;
    }
    if let Some(moves) = config.moves {
        level.max_moves = moves;
    }
    Session::new(level, seed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> GameConfig {
        GameConfig {
            start_level: 1,
            seed: Some(7),
            colors: None,
            moves: Some(3),
            step_delay_ms: 0,
            frame_rate: 60.0,
            animations: false,
            show_menu: true,
        }
    }

    #[test]
    fn overrides_apply_to_the_dealt_level() {
        let levels = Level::builtin().unwrap();
        let mut cfg = config();
        cfg.colors = Some(4);
        let session = build_session(&levels, &cfg, 2, 1).unwrap();
        assert_eq!(session.moves_left(), 3);
        assert_eq!(session.board().num_colors(), 4);
        assert!(build_session(&levels, &cfg, 99, 1).is_err());
    }

    #[test]
    fn popups_expire() {
        let levels = Level::builtin().unwrap();
        let session = build_session(&levels, &config(), 1, 1).unwrap();
        let mut play = PlayState::new(session, Instant::now());
        play.popups.push(ScorePopup {
            pos: Pos::new(0, 0),
            amount: 30,
            multiplier: 1,
            age_ms: 0,
            color: Color::White,
        });
        play.tick_popups(1000);
        assert_eq!(play.popups.len(), 1);
        play.tick_popups(600);
        assert!(play.popups.is_empty());
    }

    #[test]
    fn cursor_stays_on_the_board() {
        let levels = Level::builtin().unwrap();
        let session = build_session(&levels, &config(), 1, 1).unwrap();
        let mut play = PlayState::new(session, Instant::now());
        play.move_cursor((-1, 0));
        play.move_cursor((0, -1));
        assert_eq!(play.cursor, Pos::new(0, 0));
        for _ in 0..20 {
            play.move_cursor((1, 1));
        }
        assert_eq!(play.cursor, Pos::new(7, 7));
    }

    #[test]
    fn paused_time_is_not_counted() {
        let levels = Level::builtin().unwrap();
        let session = build_session(&levels, &config(), 1, 1).unwrap();
        let t0 = Instant::now();
        let mut play = PlayState::new(session, t0);
        play.set_paused(true, t0 + Duration::from_secs(2));
        play.set_paused(false, t0 + Duration::from_secs(10));
        assert_eq!(play.elapsed(t0 + Duration::from_secs(11)), Duration::from_secs(3));
    }
}
