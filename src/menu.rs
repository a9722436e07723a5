//! Interactive menu commands.
//!
//! Parsing a key press into a `Command` and executing it are kept apart so
//! every action can be driven directly from tests.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, Lines};
use tracing::info;

use crate::api::MarketApi;
use crate::engine::inspector::PlayerInspector;
use crate::engine::poller::Poller;
use crate::error::Result;
use crate::export::{self, ExportPaths};
use crate::storage::SnapshotStore;
use crate::strategy::flip;
use crate::types::{FlipOpportunity, PriceListing, SnapshotTag};

pub const MENU: &str = "\nSelect Mode:\n\
[I] Inspect Player Stats\n\
[R] Update Reference Prices\n\
[C] Update Comparison Prices\n\
[F] Find Flips (reference vs comparison)\n\
[A] Automatic Mode\n\
[Q] Quit\n\
> ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Inspect,
    SetReference,
    SetComparison,
    FindFlips,
    Automatic,
    Quit,
}

impl Command {
    /// Case-insensitive single-key parse. Surrounding whitespace is ignored.
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_uppercase().as_str() {
            "I" => Some(Command::Inspect),
            "R" => Some(Command::SetReference),
            "C" => Some(Command::SetComparison),
            "F" => Some(Command::FindFlips),
            "A" => Some(Command::Automatic),
            "Q" => Some(Command::Quit),
            _ => None,
        }
    }
}

/// `Y`/`y` confirms; anything else declines.
pub fn is_yes(input: &str) -> bool {
    input.trim().eq_ignore_ascii_case("y")
}

/// Next input line, or `None` when input ends or `interrupt` resolves first.
///
/// The SIGINT handler stays installed once automatic mode has used it, so
/// the menu passes Ctrl+C in here to keep it usable as a way out.
pub async fn read_line_or_interrupt<R, F>(lines: &mut Lines<R>, interrupt: F) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
    F: Future<Output = ()>,
{
    tokio::select! {
        line = lines.next_line() => line,
        _ = interrupt => Ok(None),
    }
}

/// The operations behind the menu.
pub struct App {
    api: Arc<dyn MarketApi>,
    store: SnapshotStore,
    inspector: PlayerInspector,
    interval: Duration,
    top_n: usize,
}

impl App {
    pub fn new(api: Arc<dyn MarketApi>, store: SnapshotStore, interval: Duration, top_n: usize) -> Self {
        Self {
            inspector: PlayerInspector::new(Arc::clone(&api)),
            api,
            store,
            interval,
            top_n,
        }
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub async fn inspect(&self, username: &str) -> Result<String> {
        self.inspector.inspect(username).await
    }

    /// Fetch a fresh listing and store it under `tag`.
    pub async fn capture(&self, tag: SnapshotTag) -> Result<PriceListing> {
        let listing = self.api.fetch_bazaar_listing().await?;
        self.store.save(tag, &listing)?;
        Ok(listing)
    }

    /// Write the text dump of the snapshot under `tag`.
    pub fn export_snapshot_text(&self, tag: SnapshotTag) -> Result<std::path::PathBuf> {
        let listing = self.store.load(tag)?;
        export::export_snapshot_text(self.store.snapshot_dir(), tag, &listing)
    }

    /// Rank the stored reference against the stored comparison and export it.
    pub fn find_flips(&self) -> Result<(Vec<FlipOpportunity>, ExportPaths)> {
        let reference = self.store.load(SnapshotTag::Reference)?;
        let comparison = self.store.load(SnapshotTag::Comparison)?;
        let flips = flip::analyze(&reference, &comparison);
        let paths = export::export_flips(self.store.export_dir(), &reference, &comparison, &flips, self.top_n)?;
        info!(ranked = flips.len(), "Manual flip analysis exported");
        Ok((flips, paths))
    }

    pub fn top_n(&self) -> usize {
        self.top_n
    }

    pub fn poller(&self) -> Poller {
        Poller::new(Arc::clone(&self.api), self.store.clone(), self.interval, self.top_n)
    }
}
