mod controller;
mod dbus;

use crate::core::settings::{Settings, SettingsWatcher};
use crate::source::HttpCheckoutSource;
use crate::ui::{JsonRenderer, Renderer, TerminalRenderer};
use anyhow::Result;
use clap::ValueEnum;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

pub use controller::{BoardConfig, BoardController, Clock, RefreshOutcome};
pub use dbus::{start_dbus_server, BoardProxy, DbusCommand, DBUS_NAME, DBUS_PATH};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    /// Full-screen board in the terminal
    Terminal,
    /// One JSON event per line on stdout
    Json,
}

type SharedRenderer = Arc<Mutex<Box<dyn Renderer>>>;

fn build_controller(
    settings: &Settings,
    renderer: SharedRenderer,
) -> Result<BoardController<Box<dyn Renderer>>> {
    let source = HttpCheckoutSource::new(&settings.source, settings.query.clone())?;
    Ok(BoardController::with_renderer(
        BoardConfig::from_settings(settings),
        Arc::new(source),
        renderer,
    ))
}

/// Runs the board until Ctrl-C, restarting it whenever the config changes.
pub async fn run(settings: Settings, config_path: PathBuf, output: OutputMode) -> Result<()> {
    tracing::info!(?output, "Starting checkout-board daemon");

    let mut settings_watcher = SettingsWatcher::new(config_path, settings.clone());
    if let Err(e) = settings_watcher.start_watching() {
        tracing::warn!(error = %e, "Config hot reload disabled");
    }
    let mut settings_rx = settings_watcher.subscribe();

    let renderer: Box<dyn Renderer> = match output {
        OutputMode::Terminal => Box::new(TerminalRenderer::stdout()?),
        OutputMode::Json => Box::new(JsonRenderer::new(std::io::stdout())),
    };
    let renderer: SharedRenderer = Arc::new(Mutex::new(renderer));

    let mut controller = build_controller(&settings, Arc::clone(&renderer))?;
    controller.start().await;

    let (dbus_tx, mut dbus_rx) = mpsc::unbounded_channel::<DbusCommand>();
    let _dbus_connection = match start_dbus_server(dbus_tx).await {
        Ok(connection) => Some(connection),
        Err(e) => {
            let message = format!("{:#}", e);
            tracing::warn!(error = %message, "Remote refresh unavailable");
            None
        }
    };

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown requested");
                break;
            }
            Some(cmd) = dbus_rx.recv() => match cmd {
                DbusCommand::Refresh => {
                    let pending = controller.trigger_refresh();
                    tokio::spawn(async move {
                        if let Ok(outcome) = pending.await {
                            tracing::info!(?outcome, "Remote refresh finished");
                        }
                    });
                }
            },
            Ok(()) = settings_rx.changed() => {
                let new_settings = settings_rx.borrow_and_update().clone();
                match build_controller(&new_settings, Arc::clone(&renderer)) {
                    Ok(next) => {
                        controller.shutdown().await;
                        controller = next;
                        controller.start().await;
                        tracing::info!("Board restarted with new settings");
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Keeping previous settings");
                    }
                }
            }
        }
    }

    controller.shutdown().await;
    Ok(())
}
