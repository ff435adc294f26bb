use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{
        DisableFocusChange, DisableMouseCapture, EnableFocusChange, EnableMouseCapture, MouseButton,
        MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::Rect,
    Terminal,
};
use std::{
    any::Any,
    cell::{Cell, RefCell},
    error::Error,
    io::{self, stdin},
    panic::{self, AssertUnwindSafe},
    path::PathBuf,
    time::{Duration, Instant},
};
use tracing::{error, info};

use typist::{
    app::{App, EventOutcome, TYPING_TEXT},
    app_dirs::AppDirs,
    config::AnimationOverrides,
    host::{build_host_page, host_action, page_key, HostAction, HostOptions, HostPage},
    logging::{init_subscriber, Verbosity},
    page::{PageEvent, PaintEntry},
    runtime::{CrosstermEventSource, FixedTicker, HostEvent, Runner},
    transition::EntranceTransition,
    ui::{hits_container, PageView},
};

const FRAME_MS: u64 = 16;

/// typewriter-style text reveal with a blinking cursor
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Reveals a line of text one character at a time behind a blinking cursor. Space, enter or a click restarts the animation."
)]
pub struct Cli {
    /// text to type out
    #[clap(short = 't', long, default_value = TYPING_TEXT)]
    text: String,

    /// base delay between characters in milliseconds
    #[clap(short = 's', long)]
    type_speed: Option<u64>,

    /// delay before the first character in milliseconds
    #[clap(short = 'd', long)]
    initial_delay: Option<u64>,

    /// cursor glyph
    #[clap(short = 'c', long)]
    cursor_char: Option<char>,

    /// JSON object of animation options, e.g. '{"type_speed_ms": 80}'
    #[clap(long)]
    options: Option<String>,

    /// behave as if the reduced-motion preference were set
    #[clap(long)]
    reduced_motion: bool,

    /// pretend paint timing is unavailable
    #[clap(long)]
    no_paint_timing: bool,

    /// debug-level logging
    #[clap(short = 'v', long)]
    verbose: bool,

    /// only log errors
    #[clap(short = 'q', long)]
    quiet: bool,

    /// where to write the log
    #[clap(long)]
    log_file: Option<PathBuf>,
}

impl Cli {
    /// Widget defaults, then `--options`, then the dedicated flags
    fn overrides(&self) -> Result<AnimationOverrides, Box<dyn Error>> {
        let mut overrides = AnimationOverrides::widget();
        if let Some(json) = &self.options {
            overrides = overrides.overlay(&AnimationOverrides::from_json(json)?);
        }
        Ok(overrides.overlay(&AnimationOverrides {
            type_speed_ms: self.type_speed,
            initial_delay_ms: self.initial_delay,
            cursor_char: self.cursor_char,
            ..AnimationOverrides::default()
        }))
    }

    fn host_options(&self, overrides: &AnimationOverrides) -> HostOptions {
        HostOptions {
            cursor_char: overrides.cursor_char.unwrap_or('|'),
            reduced_motion: self.reduced_motion,
            paint_timing: !self.no_paint_timing,
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let overrides = match cli.overrides() {
        Ok(o) => o,
        Err(e) => Cli::command().error(ErrorKind::ValueValidation, e).exit(),
    };

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let log_path = cli
        .log_file
        .clone()
        .or_else(AppDirs::log_path)
        .unwrap_or_else(|| PathBuf::from("typist.log"));
    init_subscriber(Verbosity::from_flags(cli.verbose, cli.quiet), &log_path)?;
    install_panic_hook();

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(
        stdout,
        EnterAlternateScreen,
        EnableMouseCapture,
        EnableFocusChange
    )?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &cli, overrides);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableFocusChange,
        DisableMouseCapture,
        LeaveAlternateScreen,
    )?;
    terminal.show_cursor()?;

    if let Err(e) = &result {
        error!("terminal host failed: {e}");
    }
    result
}

thread_local! {
    // set while a host step runs under `catch_unwind`
    static GUARDED: Cell<bool> = const { Cell::new(false) };
    static CAUGHT: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Panics outside a guarded step are logged and the terminal restored
/// before the process goes down. Inside a step the message is kept for the
/// page's error logging and nothing reaches the terminal.
fn install_panic_hook() {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        if GUARDED.with(Cell::get) {
            CAUGHT.with(|c| *c.borrow_mut() = Some(panic_info.to_string()));
            return;
        }
        error!("Application error: {panic_info}");
        let _ = disable_raw_mode();
        let _ = execute!(
            io::stdout(),
            DisableFocusChange,
            DisableMouseCapture,
            LeaveAlternateScreen
        );
        default_hook(panic_info);
    }));
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Run `f`, turning a panic into its message
fn guarded<R>(f: impl FnOnce() -> R) -> Result<R, String> {
    let outer = GUARDED.with(|g| g.replace(true));
    let result = panic::catch_unwind(AssertUnwindSafe(f));
    GUARDED.with(|g| g.set(outer));
    result.map_err(|payload| {
        CAUGHT
            .with(|c| c.borrow_mut().take())
            .unwrap_or_else(|| panic_message(payload.as_ref()))
    })
}

struct Host {
    app: App,
    host: HostPage,
    transition: EntranceTransition,
    started: Instant,
    area: Rect,
    painted: bool,
}

impl Host {
    fn new(app: App, host: HostPage, started: Instant) -> Self {
        Self {
            app,
            host,
            transition: EntranceTransition::new(),
            started,
            area: Rect::default(),
            painted: false,
        }
    }

    fn now(&self) -> Duration {
        self.started.elapsed()
    }

    /// Catch the clock up to wall time, then report the page as loaded
    fn load(&mut self) {
        let now = self.now();
        self.app.advance_to(now);
        self.app.handle_event(PageEvent::DomContentLoaded);
    }

    fn draw<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        let now = self.app.now();
        self.transition.sync(self.app.page(), self.host.display, now);
        let paused = self.app.typing().is_some_and(|t| t.is_paused());
        let skip_link = self.app.accessibility().and_then(|a| a.skip_link());

        let frame = terminal.draw(|f| {
            f.render_widget(
                PageView {
                    page: self.app.page(),
                    host: &self.host,
                    skip_link,
                    transition: &self.transition,
                    now,
                    paused,
                },
                f.area(),
            )
        })?;
        self.area = frame.area;

        if !self.painted {
            self.painted = true;
            let at = self.now();
            self.app
                .handle_event(PageEvent::Paint(PaintEntry::first_paint(at)));
        }
        Ok(())
    }

    fn cycle_focus(&mut self) {
        let Some(link) = self.app.accessibility().and_then(|a| a.skip_link()) else {
            return;
        };
        if self.app.page().focused == Some(link) {
            self.app.handle_event(PageEvent::Blur(link));
        } else {
            self.app.handle_event(PageEvent::Focus(link));
        }
    }

    /// Apply one host event and fire whatever timers came due.
    /// Returns false once the user asked to quit.
    fn on_host_event(&mut self, event: HostEvent) -> bool {
        match event {
            HostEvent::Tick | HostEvent::Resize => {}
            HostEvent::FocusLost => {
                self.app
                    .handle_event(PageEvent::VisibilityChange { hidden: true });
            }
            HostEvent::FocusGained => {
                self.app
                    .handle_event(PageEvent::VisibilityChange { hidden: false });
            }
            HostEvent::Mouse(mouse) => {
                if let MouseEventKind::Down(MouseButton::Left) = mouse.kind {
                    if let Some(container) = self.app.container() {
                        if hits_container(self.area, mouse.column, mouse.row) {
                            self.app.handle_event(PageEvent::Click(container));
                        }
                    }
                }
            }
            HostEvent::Key(key) => {
                let outcome = match page_key(&key) {
                    Some(k) => self.app.handle_event(PageEvent::KeyDown(k)),
                    None => EventOutcome::Ignored,
                };
                if outcome != EventOutcome::DefaultPrevented {
                    match host_action(&key) {
                        HostAction::Quit => return false,
                        HostAction::TogglePause => self.app.toggle_pause(),
                        HostAction::CycleFocus => self.cycle_focus(),
                        HostAction::None => {}
                    }
                }
            }
        }

        let now = self.now();
        self.app.advance_to(now);
        true
    }

    /// Run one piece of the loop. A panic in it is logged as an uncaught
    /// page error and the page keeps running.
    fn run_guarded<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> Option<R> {
        match guarded(|| f(self)) {
            Ok(r) => Some(r),
            Err(message) => {
                self.app.handle_event(PageEvent::Error(message));
                None
            }
        }
    }
}

fn start_tui<B: Backend>(
    terminal: &mut Terminal<B>,
    cli: &Cli,
    overrides: AnimationOverrides,
) -> Result<(), Box<dyn Error>> {
    let (page, host_page) = build_host_page(cli.host_options(&overrides));
    let started = Instant::now();
    let app = App::new(page, cli.text.clone(), overrides);

    let mut host = Host::new(app, host_page, started);
    host.draw(terminal)?;

    // the page is fully built by now
    host.load();
    info!(log_level = ?tracing::level_filters::LevelFilter::current(), "terminal host started");

    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(FRAME_MS)),
    );

    loop {
        let until_due = host
            .app
            .next_deadline()
            .map(|d| d.saturating_sub(host.now()))
            .unwrap_or(Duration::from_millis(FRAME_MS));

        let event = runner.step_within(until_due);
        if host.run_guarded(|h| h.on_host_event(event)) == Some(false) {
            break;
        }
        if let Some(drawn) = host.run_guarded(|h| h.draw(terminal)) {
            drawn?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use ratatui::backend::TestBackend;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn capture_logs<R>(f: impl FnOnce() -> R) -> (R, String) {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let out = tracing::subscriber::with_default(subscriber, f);
        let logged = String::from_utf8_lossy(&captured.0.lock().unwrap()).into_owned();
        (out, logged)
    }

    fn loaded_host(text: &str, started: Instant) -> Host {
        let (page, host_page) = build_host_page(HostOptions::default());
        let app = App::new(page, text, AnimationOverrides::widget());
        let mut host = Host::new(app, host_page, started);
        host.load();
        host
    }

    fn key(code: KeyCode) -> HostEvent {
        HostEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::parse_from(["typist"]);
        assert_eq!(cli.text, TYPING_TEXT);
        assert_eq!(cli.type_speed, None);
        assert_eq!(cli.initial_delay, None);
        assert!(!cli.reduced_motion);
        assert!(!cli.no_paint_timing);
        assert_eq!(cli.log_file, None);
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::parse_from([
            "typist", "-t", "hello", "-s", "80", "-d", "0", "-c", "_", "--reduced-motion",
        ]);
        assert_eq!(cli.text, "hello");
        assert_eq!(cli.type_speed, Some(80));
        assert_eq!(cli.initial_delay, Some(0));
        assert_eq!(cli.cursor_char, Some('_'));
        assert!(cli.reduced_motion);
    }

    #[test]
    fn test_overrides_layering() {
        let cli = Cli::parse_from([
            "typist",
            "--options",
            r#"{"type_speed_ms": 40, "initial_delay_ms": 10}"#,
            "-s",
            "60",
        ]);
        let o = cli.overrides().unwrap();
        assert_eq!(o.type_speed_ms, Some(60));
        assert_eq!(o.initial_delay_ms, Some(10));
        assert_eq!(o.show_cursor, Some(true));
    }

    #[test]
    fn test_defaults_use_widget_overrides() {
        let cli = Cli::parse_from(["typist"]);
        assert_eq!(cli.overrides().unwrap(), AnimationOverrides::widget());
    }

    #[test]
    fn test_bad_options_json_is_an_error() {
        let cli = Cli::parse_from(["typist", "--options", "{nope"]);
        assert!(cli.overrides().is_err());
    }

    #[test]
    fn test_host_options_follow_flags() {
        let cli = Cli::parse_from(["typist", "-c", "▌", "--no-paint-timing"]);
        let opts = cli.host_options(&cli.overrides().unwrap());
        assert_eq!(opts.cursor_char, '▌');
        assert!(!opts.paint_timing);
    }

    #[test]
    fn test_first_draw_records_paint() {
        let cli = Cli::parse_from(["typist", "-t", "hi", "-d", "0"]);
        let overrides = cli.overrides().unwrap();
        let (page, host_page) = build_host_page(cli.host_options(&overrides));
        let mut host = Host::new(App::new(page, "hi", overrides), host_page, Instant::now());
        host.load();

        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        host.draw(&mut terminal).unwrap();
        assert!(host.app.monitor().record().first_paint.is_some());
        assert_eq!(host.area, Rect::new(0, 0, 80, 24));
    }

    #[test]
    fn test_cycle_focus_toggles_skip_link() {
        let mut host = loaded_host("hi", Instant::now());
        let link = host.app.accessibility().unwrap().skip_link().unwrap();

        host.cycle_focus();
        assert_eq!(host.app.page().focused, Some(link));
        assert_eq!(host.app.page().element(link).style("top"), Some("6px"));

        host.cycle_focus();
        assert_eq!(host.app.page().focused, None);
        assert_eq!(host.app.page().element(link).style("top"), Some("-40px"));
    }

    #[test]
    fn test_load_catches_the_clock_up_first() {
        let started = Instant::now()
            .checked_sub(Duration::from_millis(50))
            .unwrap();
        let host = loaded_host("hi", started);
        let dom_ready = host.app.monitor().record().dom_ready.unwrap();
        assert!(dom_ready >= Duration::from_millis(50));
        assert!(host.app.is_set_up());
    }

    #[test]
    fn test_panic_in_a_step_is_logged_and_the_loop_continues() {
        let mut host = loaded_host("hi", Instant::now());

        let (outcome, logged) =
            capture_logs(|| host.run_guarded(|_| -> bool { panic!("reveal step blew up") }));
        assert_eq!(outcome, None);
        assert!(logged.contains("ERROR"));
        assert!(logged.contains("Application error"));
        assert!(logged.contains("reveal step blew up"));

        // still handling events afterwards
        assert_eq!(host.run_guarded(|h| h.on_host_event(key(KeyCode::Char(' ')))), Some(true));
        assert_eq!(host.app.typing().unwrap().current_index(), 0);
        assert_eq!(host.run_guarded(|h| h.on_host_event(key(KeyCode::Esc))), Some(false));
    }

    #[test]
    fn test_panic_while_drawing_keeps_the_page() {
        let mut host = loaded_host("hi", Instant::now());
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();

        let (drawn, logged) = capture_logs(|| {
            host.run_guarded(|h| -> io::Result<()> {
                h.draw(&mut terminal)?;
                panic!("bad frame")
            })
        });
        assert!(drawn.is_none());
        assert!(logged.contains("bad frame"));

        let drawn = host.run_guarded(|h| h.draw(&mut terminal));
        assert!(matches!(drawn, Some(Ok(()))));
    }

    #[test]
    fn test_quit_keys_end_the_loop() {
        let mut host = loaded_host("hi", Instant::now());
        assert!(host.on_host_event(HostEvent::Tick));
        assert!(!host.on_host_event(key(KeyCode::Char('q'))));
        assert!(!host.on_host_event(HostEvent::Key(KeyEvent::new(
            KeyCode::Char('c'),
            KeyModifiers::CONTROL
        ))));
    }
}
