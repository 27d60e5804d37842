//! App: terminal init, main loop, drop timer and key handling.

use crate::game::GameState;
use crate::input::{Action, key_to_action};
use crate::theme::Theme;
use crate::{Args, GameConfig};
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::DefaultTerminal;
use std::time::{Duration, Instant};
use tachyonfx::Effect;

/// DAS (Delayed Auto-Shift): delay before movement starts repeating when you hold a key.
const REPEAT_DELAY_MS: u64 = 170;
/// ARR (Auto-Repeat Rate): time between repeated moves while holding. 50 ms ≈ 20 moves/sec.
const REPEAT_INTERVAL_MS: u64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Playing,
    GameOver,
    QuitMenu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuitOption {
    Resume,
    Restart,
    Exit,
}

pub struct App {
    args: Args,
    config: GameConfig,
    theme: Theme,
    state: GameState,
    screen: Screen,
    paused: bool,
    /// Reference point for the automatic descent; reset on every timed drop.
    last_drop: Instant,
    repeat_state: Option<(Action, Instant)>,
    last_repeat_fire: Option<Instant>,
    /// Rows cleared by the latest lock, kept until their flash finishes.
    flash_rows: Vec<usize>,
    /// TachyonFX flash over just-cleared rows (created when the flash starts).
    clear_flash: Option<Effect>,
    /// Last time we processed the flash effect (for delta).
    clear_flash_process_time: Option<Instant>,
    quit_selected: QuitOption,
    /// Bumped on restart so each game gets a fresh piece sequence.
    games_played: u32,
}

impl App {
    pub fn new(args: Args, config: GameConfig, theme: Theme) -> Result<Self> {
        let state = GameState::new(args.width, args.height, config.seed);
        let now = Instant::now();
        Ok(Self {
            args,
            config,
            theme,
            state,
            screen: Screen::Playing,
            paused: false,
            last_drop: now,
            repeat_state: None,
            last_repeat_fire: None,
            flash_rows: Vec::new(),
            clear_flash: None,
            clear_flash_process_time: None,
            quit_selected: QuitOption::Resume,
            games_played: 0,
        })
    }

    fn reset_game(&mut self) {
        self.games_played += 1;
        let seed = self.config.seed.wrapping_add(self.games_played);
        self.state = GameState::new(self.args.width, self.args.height, seed);
        self.screen = Screen::Playing;
        self.paused = false;
        self.last_drop = Instant::now();
        self.repeat_state = None;
        self.last_repeat_fire = None;
        self.flash_rows.clear();
        self.clear_flash = None;
        self.clear_flash_process_time = None;
    }

    /// Returns true when the action locked the piece.
    fn apply_action(&mut self, action: Action) -> bool {
        match action {
            Action::MoveLeft => self.state.move_left(),
            Action::MoveRight => self.state.move_right(),
            Action::Rotate => self.state.rotate(),
            Action::SoftDrop => {
                if self.state.move_down() {
                    // The drop locked the piece; stop repeating so a held
                    // key does not slam the replacement piece down.
                    self.repeat_state = None;
                    self.last_repeat_fire = None;
                    return true;
                }
            }
            Action::Pause | Action::Quit | Action::Confirm | Action::None => {}
        }
        false
    }

    fn tick_repeat(&mut self) {
        let now = Instant::now();
        let (action, first) = match self.repeat_state {
            Some(s) => s,
            None => return,
        };
        if !matches!(
            action,
            Action::MoveLeft | Action::MoveRight | Action::SoftDrop
        ) {
            return;
        }
        if first.elapsed() < Duration::from_millis(REPEAT_DELAY_MS) {
            return;
        }
        let next = self.last_repeat_fire.unwrap_or(first) + Duration::from_millis(REPEAT_INTERVAL_MS);
        if now >= next && !self.apply_action(action) {
            self.last_repeat_fire = Some(now);
        }
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

        // Attempt to enable enhanced keyboard for Release events
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
        loop {
            let now = Instant::now();
            let quit_selected =
                (self.screen == Screen::QuitMenu).then_some(self.quit_selected);
            terminal.draw(|f| {
                crate::ui::draw(
                    f,
                    self.screen,
                    &self.state,
                    &self.theme,
                    self.paused,
                    quit_selected,
                    &mut self.clear_flash,
                    &mut self.clear_flash_process_time,
                    &self.flash_rows,
                    now,
                )
            })?;

            if self.clear_flash.as_ref().is_some_and(|e| e.done()) {
                self.flash_rows.clear();
                self.clear_flash = None;
                self.clear_flash_process_time = None;
            }

            let drop_interval = Duration::from_millis(self.config.drop_ms);
            // Limit event polling to hit ~60 FPS rendering (16ms)
            let frame_duration = Duration::from_millis(16);
            let timeout = frame_duration.saturating_sub(now.elapsed());

            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    if let Event::Key(key) = event::read()? {
                        let action = key_to_action(key);

                        // Ignore OS repeats and only process first Press.
                        if key.kind != KeyEventKind::Press {
                            if key.kind == KeyEventKind::Release
                                && self.repeat_state.map(|(a, _)| a) == Some(action)
                            {
                                self.repeat_state = None;
                                self.last_repeat_fire = None;
                            }
                            continue;
                        }
                        // If we are already repeating this action, ignore subsequent OS Press events
                        if self.repeat_state.map(|(a, _)| a) == Some(action) {
                            continue;
                        }

                        match self.screen {
                            Screen::Playing => {
                                if self.paused {
                                    if action == Action::Pause {
                                        self.paused = false;
                                    } else if action == Action::Quit {
                                        self.screen = Screen::QuitMenu;
                                        self.quit_selected = QuitOption::Resume;
                                    }
                                } else {
                                    match action {
                                        Action::Pause => self.paused = true,
                                        Action::Quit => {
                                            self.screen = Screen::QuitMenu;
                                            self.quit_selected = QuitOption::Resume;
                                            self.repeat_state = None;
                                        }
                                        _ => {
                                            let locked = self.apply_action(action);
                                            let repeatable = matches!(
                                                action,
                                                Action::MoveLeft
                                                    | Action::MoveRight
                                                    | Action::SoftDrop
                                            );
                                            if repeatable && !locked {
                                                self.repeat_state = Some((action, Instant::now()));
                                                self.last_repeat_fire = None;
                                            }
                                        }
                                    }
                                }
                            }
                            Screen::QuitMenu => match action {
                                Action::SoftDrop | Action::MoveRight => {
                                    self.quit_selected = match self.quit_selected {
                                        QuitOption::Resume => QuitOption::Restart,
                                        QuitOption::Restart => QuitOption::Exit,
                                        QuitOption::Exit => QuitOption::Resume,
                                    };
                                }
                                Action::Rotate | Action::MoveLeft => {
                                    self.quit_selected = match self.quit_selected {
                                        QuitOption::Resume => QuitOption::Exit,
                                        QuitOption::Restart => QuitOption::Resume,
                                        QuitOption::Exit => QuitOption::Restart,
                                    };
                                }
                                Action::Confirm => match self.quit_selected {
                                    QuitOption::Resume => self.screen = Screen::Playing,
                                    QuitOption::Restart => self.reset_game(),
                                    QuitOption::Exit => return Ok(()),
                                },
                                Action::Pause | Action::Quit => {
                                    self.screen = Screen::Playing;
                                }
                                _ => {}
                            },
                            Screen::GameOver => {
                                if action == Action::Quit {
                                    return Ok(());
                                }
                                if key.code == KeyCode::Char('r') || key.code == KeyCode::Char('R')
                                {
                                    self.reset_game();
                                }
                            }
                        }
                    }
                }
            }

            if self.screen == Screen::Playing && !self.paused {
                self.tick_repeat();
                // The drop stops rearming permanently once the game is over.
                if !self.state.game_over && self.last_drop.elapsed() >= drop_interval {
                    self.last_drop = Instant::now();
                    self.state.move_down();
                }
                if !self.state.last_clear_rows.is_empty() {
                    let rows = std::mem::take(&mut self.state.last_clear_rows);
                    if !self.config.no_animation {
                        self.flash_rows = rows;
                        self.clear_flash = None;
                        self.clear_flash_process_time = None;
                    }
                }
                if self.state.game_over {
                    self.screen = Screen::GameOver;
                    self.repeat_state = None;
                    self.last_repeat_fire = None;
                }
            }
        }
    }
}
