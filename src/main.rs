mod ui;

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use keypace::{
    config::{Config, ConfigStore, FileConfigStore, Theme},
    corpus::{Corpus, CorpusError, BUILTIN},
    input::InputBuffer,
    logging,
    metrics::FinalReport,
    runtime::{AppEvent, CrosstermEventSource, EventSource, FixedTicker, Runner, Ticker},
    session::{Phase, SessionController, SessionEvent, ALLOWED_DURATIONS},
    store::{KvStore, MemoryStore, SqliteStore},
    timer::SystemClock,
};
use rand::{rngs::StdRng, SeedableRng};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    io::{self, stdin},
};

/// Frames (one per poll interval) the best score pulses after a new record
const PULSE_FRAMES: u8 = 15;

/// countdown typing test with live wpm and accuracy
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A countdown typing test: type the passage before time runs out and see your words per minute, accuracy and best score."
)]
pub struct Cli {
    /// length of the test in seconds: 15, 30, 60 or 120 (defaults to the last one used)
    #[clap(short = 's', long, value_parser = parse_duration)]
    secs: Option<u32>,

    /// custom passage to type instead of the built-in ones
    #[clap(short = 'p', long)]
    prompt: Option<String>,

    /// use the light theme for this run
    #[clap(long)]
    light: bool,
}

fn parse_duration(s: &str) -> Result<u32, String> {
    let secs: u32 = s.parse().map_err(|_| format!("`{s}` is not a number"))?;
    if ALLOWED_DURATIONS.contains(&secs) {
        Ok(secs)
    } else {
        Err(format!("must be one of {ALLOWED_DURATIONS:?}"))
    }
}

impl Cli {
    fn corpus(&self) -> Result<Corpus, CorpusError> {
        match &self.prompt {
            Some(prompt) => Corpus::from_prompt(prompt.clone()),
            None => Corpus::builtin(BUILTIN),
        }
    }
}

/// Terminal front-end around a [`SessionController`]
pub struct App {
    pub controller: SessionController,
    pub input: InputBuffer,
    pub config: Config,
    pub theme: Theme,
    pub last_report: Option<FinalReport>,
    pub new_best: bool,
    pub pulse: u8,
    config_store: Box<dyn ConfigStore>,
}

impl App {
    pub fn new(
        cli: &Cli,
        config_store: Box<dyn ConfigStore>,
        store: Box<dyn KvStore>,
    ) -> Result<Self, CorpusError> {
        let mut config = config_store.load();
        if let Some(secs) = cli.secs {
            config.duration_secs = secs;
        }

        let controller = SessionController::new(
            cli.corpus()?,
            store,
            Box::new(StdRng::from_entropy()),
            Box::new(SystemClock),
        );

        let mut app = Self::from_controller(controller, config, config_store);
        if cli.light {
            app.theme = Theme::Light;
        }
        Ok(app)
    }

    /// Wraps an idle controller and configures the first session
    pub fn from_controller(
        controller: SessionController,
        config: Config,
        config_store: Box<dyn ConfigStore>,
    ) -> Self {
        let mut app = Self {
            controller,
            input: InputBuffer::new(),
            theme: config.theme,
            config,
            last_report: None,
            new_best: false,
            pulse: 0,
            config_store,
        };
        app.controller.configure(app.config.duration_secs);
        app.absorb_events();
        app
    }

    pub fn phase(&self) -> Phase {
        self.controller.phase()
    }

    /// Handles one key press. Returns false when the app should quit.
    pub fn on_key(&mut self, key: KeyEvent) -> bool {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        match key.code {
            KeyCode::Char('c') if ctrl => return false,
            KeyCode::Char('t') if ctrl => self.toggle_theme(),
            KeyCode::Esc => self.controller.restart(),
            KeyCode::Enter => match self.phase() {
                Phase::Ready => self.controller.start(),
                Phase::Ended => self.controller.restart(),
                Phase::Idle | Phase::Running => {}
            },
            KeyCode::Tab => self.cycle_duration(true),
            KeyCode::BackTab => self.cycle_duration(false),
            _ if self.phase() == Phase::Running => self.edit(key, ctrl),
            _ => {}
        }

        self.absorb_events();
        true
    }

    /// Called on every runtime step; fires due countdown ticks
    pub fn on_step(&mut self, event: &AppEvent) {
        self.controller.poll_timer();
        if matches!(event, AppEvent::Tick) {
            self.pulse = self.pulse.saturating_sub(1);
        }
        self.absorb_events();
    }

    fn edit(&mut self, key: KeyEvent, ctrl: bool) {
        let changed = match key.code {
            KeyCode::Char('w') | KeyCode::Backspace if ctrl => self.input.delete_word(),
            KeyCode::Char('h') if ctrl => self.input.backspace(),
            KeyCode::Char(c) if !ctrl => {
                self.input.write(c);
                true
            }
            KeyCode::Backspace => self.input.backspace(),
            _ => false,
        };
        if changed {
            self.controller.on_input_changed(self.input.as_str());
        }
    }

    fn cycle_duration(&mut self, forward: bool) {
        if self.phase() == Phase::Running {
            return;
        }

        let len = ALLOWED_DURATIONS.len();
        let current = ALLOWED_DURATIONS
            .iter()
            .position(|d| *d == self.config.duration_secs)
            .unwrap_or(0);
        let next = if forward {
            (current + 1) % len
        } else {
            (current + len - 1) % len
        };

        self.config.duration_secs = ALLOWED_DURATIONS[next];
        self.controller.configure(self.config.duration_secs);
        self.save_config();
    }

    fn toggle_theme(&mut self) {
        self.theme = self.theme.toggled();
        self.config.theme = self.theme;
        self.save_config();
    }

    fn save_config(&self) {
        if let Err(e) = self.config_store.save(&self.config) {
            log::warn!("unable to save config: {e}");
        }
    }

    fn absorb_events(&mut self) {
        for event in self.controller.drain_events() {
            match event {
                SessionEvent::Reset => {
                    self.input.clear();
                    self.last_report = None;
                    self.new_best = false;
                    self.pulse = 0;
                }
                SessionEvent::Ended(report) => self.last_report = Some(report),
                SessionEvent::NewBest(_) => {
                    self.new_best = true;
                    self.pulse = PULSE_FRAMES;
                }
                SessionEvent::Started | SessionEvent::Live(_) | SessionEvent::Progress(_) => {}
            }
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    logging::init()?;

    let store: Box<dyn KvStore> = match SqliteStore::open_default() {
        Ok(store) => Box::new(store),
        Err(e) => {
            log::warn!("best score will not be saved: {e}");
            Box::new(MemoryStore::new())
        }
    };
    let mut app = App::new(&cli, Box::new(FileConfigStore::new()), store)?;

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let runner = Runner::new(CrosstermEventSource::new(), FixedTicker::default());
    let result = run_tui(&mut terminal, &mut app, &runner);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_tui<B: Backend, E: EventSource, T: Ticker>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runner: &Runner<E, T>,
) -> Result<(), Box<dyn Error>> {
    loop {
        terminal.draw(|f| ui::draw(app, f))?;

        let event = runner.step();
        if let AppEvent::Key(key) = event {
            if !app.on_key(key) {
                break;
            }
        }
        app.on_step(&event);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use keypace::{
        store::BEST_WPM_KEY,
        timer::{ManualClock, TICK_PERIOD},
    };
    use ratatui::backend::TestBackend;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::mpsc;
    use std::time::Duration;

    #[derive(Clone, Default)]
    struct RecordingConfigStore {
        saved: Rc<RefCell<Vec<Config>>>,
    }

    impl ConfigStore for RecordingConfigStore {
        fn load(&self) -> Config {
            self.saved.borrow().last().cloned().unwrap_or_default()
        }

        fn save(&self, cfg: &Config) -> io::Result<()> {
            self.saved.borrow_mut().push(cfg.clone());
            Ok(())
        }
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn type_str(app: &mut App, s: &str) {
        for c in s.chars() {
            app.on_key(key(KeyCode::Char(c)));
        }
    }

    struct Harness {
        app: App,
        clock: ManualClock,
        store: MemoryStore,
        configs: RecordingConfigStore,
    }

    fn harness(prompt: &str, secs: u32) -> Harness {
        let clock = ManualClock::new();
        let store = MemoryStore::new();
        let configs = RecordingConfigStore::default();
        let controller = SessionController::new(
            Corpus::from_prompt(prompt).unwrap(),
            Box::new(store.clone()),
            Box::new(StdRng::seed_from_u64(3)),
            Box::new(clock.clone()),
        );
        let config = Config {
            duration_secs: secs,
            theme: Theme::Dark,
        };
        let app = App::from_controller(controller, config, Box::new(configs.clone()));
        Harness {
            app,
            clock,
            store,
            configs,
        }
    }

    fn render(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 24)).unwrap();
        terminal.draw(|f| ui::draw(app, f)).unwrap();
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::parse_from(["keypace"]);
        assert_eq!(cli.secs, None);
        assert_eq!(cli.prompt, None);
        assert!(!cli.light);
    }

    #[test]
    fn test_cli_secs() {
        let cli = Cli::parse_from(["keypace", "-s", "15"]);
        assert_eq!(cli.secs, Some(15));

        let cli = Cli::parse_from(["keypace", "--secs", "120"]);
        assert_eq!(cli.secs, Some(120));
    }

    #[test]
    fn test_cli_rejects_unsupported_secs() {
        assert!(Cli::try_parse_from(["keypace", "-s", "45"]).is_err());
        assert!(Cli::try_parse_from(["keypace", "-s", "soon"]).is_err());
    }

    #[test]
    fn test_cli_prompt_and_theme() {
        let cli = Cli::parse_from(["keypace", "-p", "hello world", "--light"]);
        assert_eq!(cli.prompt, Some("hello world".to_string()));
        assert!(cli.light);
        assert_eq!(cli.corpus().unwrap().passages(), ["hello world".to_string()]);
    }

    #[test]
    fn test_cli_blank_prompt_is_rejected() {
        let cli = Cli::parse_from(["keypace", "-p", "  "]);
        assert!(cli.corpus().is_err());
    }

    #[test]
    fn test_app_new_uses_cli_over_config() {
        let configs = RecordingConfigStore::default();
        configs
            .save(&Config {
                duration_secs: 30,
                theme: Theme::Dark,
            })
            .unwrap();
        let cli = Cli::parse_from(["keypace", "-s", "120", "--light", "-p", "hi"]);

        let app = App::new(&cli, Box::new(configs), Box::new(MemoryStore::new())).unwrap();

        assert_eq!(app.phase(), Phase::Ready);
        assert_eq!(app.controller.session().duration_total, 120);
        assert_eq!(app.controller.session().reference_text, "hi");
        assert_eq!(app.theme, Theme::Light);
    }

    #[test]
    fn test_app_new_reads_best_score() {
        let cli = Cli::parse_from(["keypace"]);
        let store = MemoryStore::with_value(BEST_WPM_KEY, "77");
        let app = App::new(
            &cli,
            Box::new(RecordingConfigStore::default()),
            Box::new(store),
        )
        .unwrap();
        assert_eq!(app.controller.best_wpm(), 77);
        assert_eq!(app.controller.session().duration_total, 60);
    }

    #[test]
    fn test_typing_before_start_is_ignored() {
        let mut h = harness("hi", 30);
        type_str(&mut h.app, "hi");
        assert!(h.app.input.is_empty());
        assert_eq!(h.app.phase(), Phase::Ready);
    }

    #[test]
    fn test_complete_session_flow() {
        let mut h = harness("hi there", 30);
        h.app.on_key(key(KeyCode::Enter));
        assert_eq!(h.app.phase(), Phase::Running);

        type_str(&mut h.app, "hi th");
        h.clock.advance(TICK_PERIOD * 2);
        h.app.on_step(&AppEvent::Tick);
        assert_eq!(h.app.controller.session().duration_remaining, 28);

        type_str(&mut h.app, "ere");
        assert_eq!(h.app.phase(), Phase::Ended);

        let report = h.app.last_report.unwrap();
        assert_eq!(report.elapsed_secs, 2);
        assert_eq!(report.wpm, 60);
        assert!(h.app.new_best);
        assert_eq!(h.app.pulse, PULSE_FRAMES);
        assert_eq!(h.store.writes().len(), 1);
    }

    #[test]
    fn test_backspace_and_delete_word_forward_input() {
        let mut h = harness("one two", 30);
        h.app.on_key(key(KeyCode::Enter));

        type_str(&mut h.app, "one twx");
        h.app.on_key(key(KeyCode::Backspace));
        assert_eq!(h.app.controller.session().typed_text, "one tw");

        h.app.on_key(ctrl('w'));
        assert_eq!(h.app.controller.session().typed_text, "one ");
        assert_eq!(h.app.controller.live().accuracy, 100);
    }

    #[test]
    fn test_escape_restarts_with_clean_input() {
        let mut h = harness("one two", 30);
        h.app.on_key(key(KeyCode::Enter));
        type_str(&mut h.app, "one");
        assert!(h.app.controller.is_ticking());

        h.app.on_key(key(KeyCode::Esc));

        assert_eq!(h.app.phase(), Phase::Ready);
        assert!(h.app.input.is_empty());
        assert!(!h.app.controller.is_ticking());
    }

    #[test]
    fn test_enter_after_end_starts_fresh_session() {
        let mut h = harness("go", 15);
        h.app.on_key(key(KeyCode::Enter));
        type_str(&mut h.app, "go");
        assert_eq!(h.app.phase(), Phase::Ended);

        h.app.on_key(key(KeyCode::Enter));
        assert_eq!(h.app.phase(), Phase::Ready);
        assert!(h.app.last_report.is_none());
        assert!(!h.app.new_best);
    }

    #[test]
    fn test_tab_cycles_duration_and_saves() {
        let mut h = harness("go", 60);
        h.app.on_key(key(KeyCode::Tab));
        assert_eq!(h.app.controller.session().duration_total, 120);

        h.app.on_key(key(KeyCode::Tab));
        assert_eq!(h.app.controller.session().duration_total, 15);

        h.app.on_key(key(KeyCode::BackTab));
        assert_eq!(h.app.controller.session().duration_total, 120);

        let saved: Vec<u32> = h
            .configs
            .saved
            .borrow()
            .iter()
            .map(|c| c.duration_secs)
            .collect();
        assert_eq!(saved, vec![120, 15, 120]);
    }

    #[test]
    fn test_tab_ignored_while_running() {
        let mut h = harness("go go", 60);
        h.app.on_key(key(KeyCode::Enter));
        h.app.on_key(key(KeyCode::Tab));
        assert_eq!(h.app.phase(), Phase::Running);
        assert_eq!(h.app.controller.session().duration_total, 60);
        assert!(h.configs.saved.borrow().is_empty());
    }

    #[test]
    fn test_theme_toggle_saves() {
        let mut h = harness("go", 60);
        h.app.on_key(ctrl('t'));
        assert_eq!(h.app.theme, Theme::Light);
        assert_eq!(h.configs.saved.borrow().last().unwrap().theme, Theme::Light);
    }

    #[test]
    fn test_ctrl_c_quits() {
        let mut h = harness("go", 60);
        assert!(!h.app.on_key(ctrl('c')));
        assert!(h.app.on_key(key(KeyCode::Char('c'))));
    }

    #[test]
    fn test_pulse_fades_on_poll_ticks() {
        let mut h = harness("go", 60);
        h.app.on_key(key(KeyCode::Enter));
        type_str(&mut h.app, "go");
        assert_eq!(h.app.pulse, PULSE_FRAMES);

        for _ in 0..PULSE_FRAMES {
            h.app.on_step(&AppEvent::Tick);
        }
        assert_eq!(h.app.pulse, 0);
        assert!(h.app.new_best);
    }

    #[test]
    fn test_timed_out_session_via_runner() {
        let mut h = harness("this will not be finished", 15);
        h.app.on_key(key(KeyCode::Enter));
        type_str(&mut h.app, "this will");

        let (_tx, rx) = mpsc::channel();
        let runner = Runner::new(
            keypace::runtime::TestEventSource::new(rx),
            FixedTicker::new(Duration::from_millis(1)),
        );

        for _ in 0..20 {
            let event = runner.step();
            h.clock.advance(TICK_PERIOD);
            h.app.on_step(&event);
            if h.app.phase() == Phase::Ended {
                break;
            }
        }

        assert_eq!(h.app.phase(), Phase::Ended);
        assert_eq!(h.app.controller.session().duration_remaining, 0);
        assert_eq!(h.app.last_report.unwrap().wpm, 8);
    }

    #[test]
    fn test_render_ready_screen() {
        let h = harness("render me please", 30);
        let screen = render(&h.app);
        assert!(screen.contains("render me please"));
        assert!(screen.contains("30s"));
        assert!(screen.contains("enter"));
    }

    #[test]
    fn test_render_running_screen_shows_typos() {
        let mut h = harness("abc def", 30);
        h.app.on_key(key(KeyCode::Enter));
        type_str(&mut h.app, "ab ");
        let screen = render(&h.app);
        assert!(screen.contains("67%"));
        assert!(screen.contains("·"));
    }

    #[test]
    fn test_render_results_screen() {
        let mut h = harness("done", 60);
        h.app.on_key(key(KeyCode::Enter));
        type_str(&mut h.app, "done");
        let screen = render(&h.app);
        assert!(screen.contains("new best"));
        assert!(screen.contains("1 wpm"));
    }

    #[test]
    fn test_render_light_theme_on_small_terminal() {
        let mut h = harness("a fairly long passage that has to wrap onto more than one line", 60);
        h.app.on_key(ctrl('t'));
        let mut terminal = Terminal::new(TestBackend::new(20, 6)).unwrap();
        terminal.draw(|f| ui::draw(&h.app, f)).unwrap();
    }
}
