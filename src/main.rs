mod app;
mod config;
mod core;
mod logging;
mod platform;
mod ui;
mod utils;

use std::io;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::prelude::*;
use tracing::{info, warn};

use crate::app::App;
use crate::config::{Cli, Command, Config};
use crate::core::enumerator::Enumerator;
use crate::core::orchestrator::MountOrchestrator;
use crate::core::store::{StoreSnapshot, VolumeStore};
use crate::core::{AppState, DesiredState, OperationReport, Outcome, Verdict, VolumeError};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from(&cli);

    match cli.command {
        None => run_interactive(&config).await,
        Some(command) => {
            logging::init_stderr();
            run_command(&config, command).await
        }
    }
}

/// Wires executor, enumerator and orchestrator into one store.
fn build_store(config: &Config, privileged: bool) -> VolumeStore {
    let executor = platform::get_executor(config, privileged);
    let enumerator = Enumerator::standard(
        executor.clone(),
        &config.volume_tool,
        &config.mount_table_tool,
    );
    let orchestrator = MountOrchestrator::new(
        executor,
        &config.volume_tool,
        &config.volumes_root,
        config.op_delay,
    );
    VolumeStore::new(Arc::new(enumerator), Arc::new(orchestrator), config.show_efi)
}

async fn run_command(config: &Config, command: Command) -> anyhow::Result<()> {
    let mut store = build_store(config, utils::is_root());
    store.refresh();
    store.settle().await;

    let json = match &command {
        Command::List { json, all } => {
            let snapshot = store.snapshot(*all);
            if *json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else {
                print_volumes(&snapshot);
            }
            return Ok(());
        }
        Command::Mount { json, .. }
        | Command::Unmount { json, .. }
        | Command::MountExternal { json }
        | Command::UnmountExternal { json }
        | Command::Eject { json, .. }
        | Command::MountEfi { json, .. } => *json,
    };

    let started = match command {
        Command::Mount { ids, .. } => store.apply(ids, DesiredState::Mounted),
        Command::Unmount { ids, .. } => store.apply(ids, DesiredState::Unmounted),
        Command::MountExternal { .. } => store.mount_all_external(),
        Command::UnmountExternal { .. } => store.unmount_all_external(),
        Command::Eject { id, .. } | Command::MountEfi { id, .. } if store.volume(&id).is_none() => {
            return Err(VolumeError::UnknownVolume(id).into());
        }
        Command::Eject { id, .. } => store.eject(&id),
        Command::MountEfi { id, .. } => store.mount_efi(&id),
        Command::List { .. } => false,
    };
    if !started {
        anyhow::bail!("no operation was started");
    }
    store.settle().await;

    let Some(report) = store.last_report() else {
        anyhow::bail!("operation finished without a report");
    };
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print_report(report);
    }

    match report.verdict {
        Verdict::AllSucceeded | Verdict::NothingToDo => Ok(()),
        Verdict::Partial | Verdict::AllFailed => {
            Err(VolumeError::CommandFailed(report.summary()).into())
        }
    }
}

fn print_volumes(snapshot: &StoreSnapshot) {
    println!(
        "{:<12} {:<24} {:>12} {:<10} {:<8} {}",
        "ID", "NAME", "SIZE", "TYPE", "FLAGS", "MOUNT POINT"
    );
    for view in &snapshot.volumes {
        let v = &view.record;
        let flags = format!(
            "{}{}{}",
            if v.is_internal { "i" } else { "e" },
            if v.is_efi { "E" } else { "-" },
            if view.is_system_volume { "S" } else { "-" },
        );
        let mount = if view.is_mounted { v.mount_point.as_str() } else { "-" };
        println!(
            "{:<12} {:<24} {:>12} {:<10} {:<8} {}",
            v.identifier, v.display_name, v.size_text, v.volume_type, flags, mount
        );
    }
}

fn print_report(report: &OperationReport) {
    for o in &report.outcomes {
        match &o.outcome {
            Outcome::Success => println!("{:<12} ok", o.identifier),
            Outcome::Failed(reason) => println!("{:<12} failed: {}", o.identifier, reason),
            Outcome::Skipped(reason) => println!("{:<12} skipped: {}", o.identifier, reason),
        }
    }
    println!("{}", report.summary());
}

async fn run_interactive(config: &Config) -> anyhow::Result<()> {
    // Validate terminal size before entering raw mode or the alternate screen.
    let (cols, rows) = crossterm::terminal::size()?;
    if cols == 0 || rows == 0 || cols > 1000 || rows > 1000 {
        anyhow::bail!(
            "Invalid terminal size detected ({}x{}). Please ensure you're running in a valid terminal.",
            cols,
            rows
        );
    }

    let log_status = logging::init_file(config.log_file.as_deref());

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let privileged = utils::is_root();
    let mut app = App::new(build_store(config, privileged), privileged);

    match log_status {
        Ok(path) => info!(path = %path.display(), "interactive session started"),
        Err(e) => app.state = AppState::Error(format!("Logging disabled: {e}")),
    }
    // Warn but don't exit
    if !app.privileged && app.state == AppState::Idle {
        app.state = AppState::Error(
            "Warning: Not running as root. Forced unmounts will ask for an administrator password."
                .to_string(),
        );
    }

    app.refresh();

    let result = run_app(&mut terminal, &mut app).await;

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        warn!(error = %e, "interactive session failed");
        eprintln!("Error: {e}");
    }

    Ok(())
}

async fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> anyhow::Result<()> {
    loop {
        app.tick = app.tick.wrapping_add(1);

        app.poll_store();

        terminal.draw(|f| ui::draw(f, app))?;

        // Poll for events with timeout for tick
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }

                match &app.state {
                    AppState::Idle => handle_idle_input(app, key.code),
                    AppState::InProgress(_) => {
                        // Block input during operations
                        if key.code == KeyCode::Char('q') {
                            app.should_quit = true;
                        }
                    }
                    AppState::Report(_) | AppState::Error(_) => handle_message_input(app, key.code),
                }

                if app.should_quit {
                    return Ok(());
                }
            }
        }

        // Let background tasks deliver before the next frame.
        tokio::task::yield_now().await;
    }
}

fn handle_idle_input(app: &mut App, key: KeyCode) {
    match key {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Up | KeyCode::Char('k') => app.select_previous(),
        KeyCode::Down | KeyCode::Char('j') => app.select_next(),
        KeyCode::Char('m') => app.toggle_mount(),
        KeyCode::Char('u') => app.toggle_unmount(),
        KeyCode::Char('a') => app.select_all_for_unmount(),
        KeyCode::Char('c') => app.clear_selections(),
        KeyCode::Char('M') => app.mount_selected(),
        KeyCode::Char('U') => app.unmount_selected(),
        KeyCode::Char('e') => app.mount_all_external(),
        KeyCode::Char('x') => app.unmount_all_external(),
        KeyCode::Char('f') => app.mount_efi(),
        KeyCode::Char('E') => app.eject(),
        KeyCode::Char('v') => app.toggle_efi_visibility(),
        KeyCode::Char('r') => app.refresh(),
        _ => {}
    }
}

fn handle_message_input(app: &mut App, key: KeyCode) {
    match key {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Esc | KeyCode::Enter => app.dismiss(),
        _ => {}
    }
}
