use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use crossterm::event::{self, DisableMouseCapture, EnableMouseCapture, Event};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::execute;
use is_terminal::IsTerminal;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tokio::sync::mpsc;

use vellum_shell::cli::Cli;
use vellum_shell::config::Settings;
use vellum_shell::ipc::{CoreLink, CoreSide, InboundEvent, MessageBus};
use vellum_shell::shell::{ShellApp, ShellMsg, ShellState};
use vellum_shell::tui::{Runtime, Theme, ThemeVariant};

fn default_log_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("vellum-shell.log")
}

/// Logs go to a file: the terminal belongs to the alternate screen.
fn init_logging(path: Option<&Path>) -> Result<()> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_log_path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating log directory {}", parent.display()))?;
    }
    let file =
        File::create(&path).with_context(|| format!("creating log file {}", path.display()))?;
    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

/// Drain outbound traffic until a core transport is attached to it.
async fn drain_core_side(mut side: CoreSide) {
    while let Some(envelope) = side.outbound.recv().await {
        log::debug!(
            "outbound {} {}",
            envelope.channel,
            envelope.payload
        );
    }
}

async fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    settings: Settings,
    theme: Theme,
    link: Rc<CoreLink>,
    mut events: mpsc::UnboundedReceiver<InboundEvent>,
) -> Result<()> {
    let state = ShellState::new(Rc::clone(&link) as Rc<dyn MessageBus>, &settings);
    let mut runtime: Runtime<ShellApp> = Runtime::new(state, theme);

    while runtime.is_running() {
        terminal.draw(|frame| runtime.render(frame))?;

        if event::poll(Duration::from_millis(50))? {
            match event::read()? {
                Event::Key(key) => runtime.handle_key(key)?,
                Event::Mouse(mouse) => runtime.handle_mouse(mouse)?,
                _ => {}
            }
        }

        runtime.poll_timers()?;
        runtime.poll_async().await?;
        link.pump();
        while let Ok(event) = events.try_recv() {
            runtime.dispatch(ShellMsg::CoreEvent(event))?;
        }
        for (topic, data) in runtime.take_publishes() {
            runtime.handle_publish(&topic, data)?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_file.as_deref())?;

    if !io::stdout().is_terminal() {
        bail!("vellum is an interactive application and needs a terminal");
    }

    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(theme) = &cli.theme {
        settings.theme = theme.parse::<ThemeVariant>()?;
    }
    let theme = Theme::new(settings.theme);
    log::info!("starting vellum shell, theme {:?}", settings.theme);

    let (link, side) = CoreLink::pair();
    tokio::spawn(drain_core_side(side));
    // Core events arrive here once a transport feeds the sender
    let (_events_tx, events_rx) = mpsc::unbounded_channel::<InboundEvent>();

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)?;

    let result = run(&mut terminal, settings, theme, link, events_rx).await;

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableMouseCapture,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;

    result
}
