use crate::board::{BoardProxy, DBUS_NAME};
use anyhow::{Context, Result};

/// Asks a running board to fetch now instead of waiting for its next tick.
pub async fn run() -> Result<()> {
    let connection = zbus::Connection::session()
        .await
        .context("Failed to connect to session D-Bus")?;

    let board = BoardProxy::new(&connection)
        .await
        .context("Failed to create board proxy")?;

    board
        .refresh()
        .await
        .with_context(|| format!("No board answered on {} - is `checkout-board run` active?", DBUS_NAME))?;

    tracing::debug!(name = DBUS_NAME, "Refresh delivered");
    println!("Board refresh requested");
    Ok(())
}
