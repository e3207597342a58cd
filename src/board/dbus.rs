use anyhow::{Context, Result};
use tokio::sync::mpsc;
use zbus::{interface, proxy};

pub const DBUS_NAME: &str = "com.github.checkoutboard.Board";
pub const DBUS_PATH: &str = "/com/github/checkoutboard/Board";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbusCommand {
    Refresh,
}

pub struct BoardService {
    cmd_tx: mpsc::UnboundedSender<DbusCommand>,
}

impl BoardService {
    pub fn new(cmd_tx: mpsc::UnboundedSender<DbusCommand>) -> Self {
        Self { cmd_tx }
    }
}

#[interface(name = "com.github.checkoutboard.Board")]
impl BoardService {
    async fn refresh(&self) -> zbus::fdo::Result<()> {
        tracing::info!("D-Bus Refresh called");
        self.cmd_tx
            .send(DbusCommand::Refresh)
            .map_err(|_| zbus::fdo::Error::Failed("Board is shutting down".to_string()))
    }
}

/// Client side of [`BoardService`], used by `checkout-board refresh`.
#[proxy(
    interface = "com.github.checkoutboard.Board",
    default_service = "com.github.checkoutboard.Board",
    default_path = "/com/github/checkoutboard/Board"
)]
pub trait Board {
    fn refresh(&self) -> zbus::Result<()>;
}

pub async fn start_dbus_server(
    cmd_tx: mpsc::UnboundedSender<DbusCommand>,
) -> Result<zbus::Connection> {
    let connection = zbus::connection::Builder::session()
        .context("Failed to connect to session D-Bus")?
        .name(DBUS_NAME)
        .context("Failed to claim D-Bus name")?
        .serve_at(DBUS_PATH, BoardService::new(cmd_tx))
        .context("Failed to register D-Bus object")?
        .build()
        .await
        .context("Failed to start D-Bus service")?;

    tracing::info!(name = DBUS_NAME, path = DBUS_PATH, "D-Bus service registered");
    Ok(connection)
}
