//! Bazaar flipper, entry point.
//!
//! Loads configuration, initialises structured logging, checks the API key,
//! prepares the storage layout and runs the interactive menu.

use anyhow::{Context, Result};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::watch;
use tracing::{error, info, warn};

use bazaar_flipper::api::hypixel::HypixelClient;
use bazaar_flipper::config::{self, AppConfig};
use bazaar_flipper::error::FlipperError;
use bazaar_flipper::menu::{self, App, Command};
use bazaar_flipper::storage::SnapshotStore;
use bazaar_flipper::strategy::flip;
use bazaar_flipper::types::SnapshotTag;

const BANNER: &str = "=== Hypixel Skyblock Bazaar Flipper ===";

type Input = Lines<BufReader<Stdin>>;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let config_path =
        std::env::var("FLIPPER_CONFIG").unwrap_or_else(|_| config::DEFAULT_CONFIG_PATH.to_string());
    let cfg = AppConfig::load_or_default(&config_path)?;

    init_logging();

    let api_key = match cfg.api_key() {
        Ok(key) => key,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    let store = SnapshotStore::from_config(&cfg.storage);
    store
        .ensure_layout()
        .context("Failed to create storage directories")?;

    let client = HypixelClient::new(&cfg.api, api_key)?;
    let app = App::new(Arc::new(client), store, cfg.poller.interval(), cfg.poller.top_n);

    println!("{BANNER}");
    info!(
        config = %config_path,
        reference_saved = app.store().exists(SnapshotTag::Reference),
        comparison_saved = app.store().exists(SnapshotTag::Comparison),
        interval_secs = cfg.poller.interval_secs,
        top_n = cfg.poller.top_n,
        "Flipper ready"
    );

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let Some(line) = prompt(&mut input, menu::MENU).await? else {
            break;
        };
        let Some(command) = Command::parse(&line) else {
            println!("Invalid option.");
            continue;
        };
        if command == Command::Quit {
            break;
        }
        if let Err(e) = dispatch(&app, command, &mut input).await {
            error!(error = %e, "Command failed");
            println!("Error: {e:#}");
            if is_fatal(&e) {
                warn!("Fatal error, exiting");
                std::process::exit(1);
            }
        }
    }

    println!("Goodbye!");
    Ok(())
}

/// Execute one menu command.
async fn dispatch(app: &App, command: Command, input: &mut Input) -> Result<()> {
    match command {
        Command::Inspect => {
            let Some(username) = prompt(input, "Username: ").await? else {
                return Ok(());
            };
            println!("{}", app.inspect(username.trim()).await?);
        }
        Command::SetReference | Command::SetComparison => {
            let tag = if command == Command::SetReference {
                SnapshotTag::Reference
            } else {
                SnapshotTag::Comparison
            };
            println!("Fetching {tag} data...");
            let listing = app.capture(tag).await?;
            println!(
                "{} products saved to {}",
                listing.len(),
                app.store().snapshot_path(tag).display()
            );

            if let Some(answer) = prompt(input, "Export to txt file? [Y/N]: ").await? {
                if menu::is_yes(&answer) {
                    let path = app.export_snapshot_text(tag)?;
                    println!("Done: {}", path.display());
                }
            }
        }
        Command::FindFlips => {
            let (flips, paths) = app.find_flips()?;
            for (rank, opportunity) in flip::top_profitable(&flips, app.top_n()).into_iter().enumerate() {
                println!("{:>3}. {opportunity}", rank + 1);
            }
            println!("{} items ranked, exported to {}", flips.len(), paths.json.display());
        }
        Command::Automatic => {
            println!("Automatic mode started. Press Ctrl+C to stop.");
            let (tx, rx) = watch::channel(false);
            let listener = tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Shutdown signal received, finishing current cycle");
                    let _ = tx.send(true);
                }
            });

            let mut poller = app.poller();
            let result = poller.run(rx).await;
            listener.abort();

            let cycles = result?;
            println!("\nStopping automatic mode after {cycles} cycle(s).");
        }
        Command::Quit => {}
    }
    Ok(())
}

/// Print `text` and read one line. `None` on end of input or Ctrl+C.
async fn prompt(input: &mut Input, text: &str) -> Result<Option<String>> {
    print!("{text}");
    std::io::stdout().flush()?;
    let interrupt = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };
    let line = menu::read_line_or_interrupt(input, interrupt).await?;
    if line.is_none() {
        println!();
    }
    Ok(line)
}

fn is_fatal(e: &anyhow::Error) -> bool {
    e.downcast_ref::<FlipperError>().is_some_and(FlipperError::is_fatal)
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("bazaar_flipper=info"));

    let json_logging = std::env::var("FLIPPER_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
