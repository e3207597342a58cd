use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use checkout_board::board::{self, OutputMode};
use checkout_board::cli;
use checkout_board::core::settings::Settings;

#[derive(Parser)]
#[command(name = "checkout-board")]
#[command(author, version, about = "Now-serving display board for childcare checkout pickups")]
struct Cli {
    /// Path to config.toml (default: $XDG_CONFIG_HOME/checkout-board/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the display board
    Run {
        /// Where to draw the board
        #[arg(long, value_enum, default_value = "terminal")]
        output: OutputMode,
    },

    /// Fetch once and print who is being called
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Trigger a data refresh on the running board via D-Bus
    Refresh,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_logging(debug: bool, json: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // stdout belongs to the board; logs go to stderr.
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
            .init();
    }
}

fn load_settings(cli: &Cli) -> anyhow::Result<(Settings, PathBuf)> {
    let path = Settings::resolve_path(cli.config.as_deref())?;
    let settings = Settings::load_from(&path)?;
    init_logging(settings.debug, cli.log_json);
    tracing::info!(?path, exists = path.exists(), "Using config");
    Ok((settings, path))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { output } => {
            let (settings, path) = load_settings(&cli)?;
            board::run(settings, path, output).await
        }
        Commands::Status { json } => {
            let (settings, _) = load_settings(&cli)?;
            cli::status::run(&settings, json).await
        }
        Commands::Refresh => {
            init_logging(false, cli.log_json);
            cli::refresh::run().await
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
    }
}
