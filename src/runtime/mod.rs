use std::sync::mpsc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode};
use ratatui::{Terminal, backend::CrosstermBackend};

use crate::app::App;
use crate::audio::{AudioEvent, RodioOutput};
use crate::catalog;
use crate::mpris::ControlCmd;
use crate::player::{ControllerOptions, PlaybackController};

mod event_loop;
mod fetch;
mod logging;
mod mpris_sync;
mod settings;
mod startup;

pub fn run() -> Result<()> {
    let (mut settings, config_warning) = settings::load_settings();

    // A directory argument overrides the configured local catalog.
    if let Some(dir) = std::env::args_os().nth(1) {
        settings.catalog.source = crate::config::CatalogSource::Local;
        settings.catalog.music_dir = Some(dir.into());
    }

    let log_path = logging::init(&settings.logging)?;
    if let Some(w) = config_warning {
        tracing::warn!("{w}");
    }
    tracing::info!(log = ?log_path, catalog = ?settings.catalog.source, "starting encore");

    let catalog = catalog::open(&settings).context("opening catalog")?;

    let (event_tx, event_rx) = mpsc::channel::<AudioEvent>();
    let output =
        RodioOutput::new(settings.audio.clone(), event_tx).context("opening audio output")?;
    let mut controller = PlaybackController::new(
        output,
        catalog.clone(),
        ControllerOptions::from(&settings.playback),
    );
    let notifications = controller.subscribe();

    let mut app = App::new(
        startup::catalog_label(&settings),
        Duration::from_millis(settings.ui.search_debounce_ms),
    );
    app.follow_playback = settings.ui.follow_playback;
    app.collections = startup::has_collections(&settings);
    startup::apply_playback_defaults(&mut app, controller.state());

    let (control_tx, control_rx) = mpsc::channel::<ControlCmd>();
    let mpris = crate::mpris::spawn_mpris(control_tx.clone());
    mpris_sync::update_mpris(&mpris, &app);

    let mut session = event_loop::Session {
        controller,
        notifications,
        audio_events: event_rx,
        control_tx,
        control_rx,
        mpris,
        fetcher: fetch::Fetcher::new(catalog.clone()),
        playlist_fetcher: fetch::Fetcher::new(catalog),
        app,
        pending_gg: false,
    };
    session.request_catalog("");
    session.refresh_playlists();

    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let run_result = event_loop::run(&mut terminal, &settings, &mut session);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(e) = &run_result {
        tracing::error!("event loop failed: {e:#}");
    }
    run_result
}
