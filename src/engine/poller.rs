//! Automated poller.
//!
//! Runs fetch → store → aggregate → analyze → export once per interval
//! until a shutdown signal arrives. The signal is only observed between
//! cycles, so a cycle that has started always finishes its writes.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::api::MarketApi;
use crate::error::Result;
use crate::export::{self, ExportPaths};
use crate::storage::SnapshotStore;
use crate::strategy::{daily, flip};
use crate::types::SnapshotTag;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Idle,
    Running,
}

/// Summary of one completed cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub cycle_number: u64,
    pub captured_at: DateTime<Utc>,
    pub products: usize,
    pub opportunities: usize,
    pub profitable: usize,
    pub best: Option<(String, f64)>,
    pub exports: ExportPaths,
}

pub struct Poller {
    api: Arc<dyn MarketApi>,
    store: SnapshotStore,
    interval: Duration,
    top_n: usize,
    state: PollerState,
    cycles: u64,
}

impl Poller {
    pub fn new(api: Arc<dyn MarketApi>, store: SnapshotStore, interval: Duration, top_n: usize) -> Self {
        Self {
            api,
            store,
            interval,
            top_n,
            state: PollerState::Idle,
            cycles: 0,
        }
    }

    pub fn state(&self) -> PollerState {
        self.state
    }

    /// Completed cycles since construction.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Loop until `shutdown` turns true. Returns the number of completed
    /// cycles, or the first fatal error.
    ///
    /// Network and missing-snapshot failures are logged and the loop waits
    /// for the next scheduled cycle.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> Result<u64> {
        self.state = PollerState::Running;
        info!(interval_secs = self.interval.as_secs(), "Automatic mode started");

        let outcome = loop {
            if *shutdown.borrow_and_update() {
                break Ok(());
            }

            match self.run_cycle().await {
                Ok(report) => log_cycle_report(&report),
                Err(e) if e.is_fatal() => {
                    error!(error = %e, "Fatal error in automatic mode");
                    break Err(e);
                }
                Err(e) => warn!(error = %e, "Cycle failed, continuing to next"),
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = shutdown_requested(&mut shutdown) => break Ok(()),
            }
        };

        self.state = PollerState::Idle;
        info!(cycles = self.cycles, "Automatic mode stopped");
        outcome.map(|_| self.cycles)
    }

    /// A single fetch → store → analyze → export pass.
    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        let cycle_number = self.cycles + 1;
        info!(cycle = cycle_number, "Starting cycle");

        let listing = self.api.fetch_bazaar_listing().await?;
        self.store.save(SnapshotTag::Comparison, &listing)?;
        self.store.record_hourly(&listing)?;

        let summary = daily::summarize(listing.captured_at.date_naive(), &self.store.load_hourly()?);
        self.store.save_daily(&summary)?;
        export::export_daily_profits(self.store.export_dir(), &summary)?;

        let reference = self.store.load(SnapshotTag::Reference)?;
        let flips = flip::analyze(&reference, &listing);
        let exports = export::export_flips(self.store.export_dir(), &reference, &listing, &flips, self.top_n)?;

        self.cycles = cycle_number;
        Ok(CycleReport {
            cycle_number,
            captured_at: listing.captured_at,
            products: listing.len(),
            opportunities: flips.len(),
            profitable: flips.iter().filter(|f| f.delta > 0.0).count(),
            best: flips.first().map(|f| (f.item_id.clone(), f.percent_change)),
            exports,
        })
    }
}

/// Resolves once the flag turns true. A dropped sender can never signal,
/// so it parks forever instead.
async fn shutdown_requested(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

fn log_cycle_report(report: &CycleReport) {
    let best = report
        .best
        .as_ref()
        .map(|(id, pct)| format!("{id} ({:+.2}%)", pct * 100.0))
        .unwrap_or_else(|| "n/a".to_string());
    info!(
        cycle = report.cycle_number,
        captured_at = %report.captured_at,
        products = report.products,
        ranked = report.opportunities,
        profitable = report.profitable,
        best = %best,
        export = %report.exports.json.display(),
        "Cycle complete"
    );
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockMarketApi;
    use crate::error::FlipperError;
    use crate::types::PriceListing;
    use chrono::TimeZone;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_test::{assert_err, assert_ok};

    fn temp_store() -> (SnapshotStore, PathBuf) {
        let mut root = std::env::temp_dir();
        root.push(format!("bazaar_flipper_poller_{}", uuid::Uuid::new_v4()));
        (SnapshotStore::under(&root), root)
    }

    fn comparison_listing() -> PriceListing {
        let mut listing = PriceListing::from_prices([("ITEM_A", 80.0, 130.0), ("ITEM_B", 5.0, 12.0)]);
        listing.captured_at = Utc.with_ymd_and_hms(2024, 5, 1, 13, 0, 0).unwrap();
        listing
    }

    fn reference_listing() -> PriceListing {
        PriceListing::from_prices([("ITEM_A", 100.0, 90.0), ("ITEM_B", 0.0, 10.0)])
    }

    async fn wait_until(mut cond: impl FnMut() -> bool) {
        for _ in 0..500 {
            if cond() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached in time");
    }

    #[tokio::test]
    async fn test_cycle_saves_comparison_and_exports() {
        let (store, root) = temp_store();
        store.save(SnapshotTag::Reference, &reference_listing()).unwrap();

        let mut api = MockMarketApi::new();
        api.expect_fetch_bazaar_listing()
            .times(1)
            .returning(|| Ok(comparison_listing()));

        let mut poller = Poller::new(Arc::new(api), store.clone(), Duration::from_secs(3600), 10);
        let report = poller.run_cycle().await.unwrap();

        assert_eq!(report.cycle_number, 1);
        assert_eq!(report.products, 2);
        // ITEM_B has a zero reference buy price.
        assert_eq!(report.opportunities, 1);
        assert_eq!(report.profitable, 1);
        assert_eq!(report.best.as_ref().map(|(id, _)| id.as_str()), Some("ITEM_A"));
        assert!(report.exports.json.exists());
        assert!(report.exports.text.exists());
        assert_eq!(store.load(SnapshotTag::Comparison).unwrap(), comparison_listing());
        assert_eq!(store.load_hourly().unwrap().len(), 1);
        assert_eq!(poller.cycles(), 1);

        std::fs::remove_dir_all(root).unwrap();
    }

    #[tokio::test]
    async fn test_cycle_without_reference_is_not_found() {
        let (store, root) = temp_store();

        let mut api = MockMarketApi::new();
        api.expect_fetch_bazaar_listing()
            .returning(|| Ok(comparison_listing()));

        let mut poller = Poller::new(Arc::new(api), store.clone(), Duration::from_secs(3600), 10);
        let err = poller.run_cycle().await.unwrap_err();

        assert!(matches!(err, FlipperError::NotFound(_)));
        // The fresh capture is still stored.
        assert!(store.exists(SnapshotTag::Comparison));
        assert_eq!(poller.cycles(), 0);

        std::fs::remove_dir_all(root).unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_during_sleep_keeps_last_snapshot() {
        let (store, root) = temp_store();
        store.save(SnapshotTag::Reference, &reference_listing()).unwrap();

        let mut api = MockMarketApi::new();
        api.expect_fetch_bazaar_listing()
            .times(1)
            .returning(|| Ok(comparison_listing()));

        let (tx, rx) = watch::channel(false);
        let mut poller = Poller::new(Arc::new(api), store.clone(), Duration::from_secs(3600), 10);
        let handle = tokio::spawn(async move {
            let result = poller.run(rx).await;
            (result, poller.state())
        });

        let probe = store.clone();
        wait_until(|| probe.exists(SnapshotTag::Comparison)).await;
        // Give the cycle time to finish its exports and enter the sleep.
        tokio::time::sleep(Duration::from_millis(100)).await;
        tx.send(true).unwrap();

        let (result, state) = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("poller did not stop")
            .unwrap();
        assert_eq!(assert_ok!(result), 1);
        assert_eq!(state, PollerState::Idle);
        assert_eq!(store.load(SnapshotTag::Comparison).unwrap(), comparison_listing());

        std::fs::remove_dir_all(root).unwrap();
    }

    #[tokio::test]
    async fn test_network_error_does_not_stop_loop() {
        let (store, root) = temp_store();
        store.save(SnapshotTag::Reference, &reference_listing()).unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut api = MockMarketApi::new();
        api.expect_fetch_bazaar_listing().returning(move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(FlipperError::Network("connection reset".into()))
            } else {
                Ok(comparison_listing())
            }
        });

        let (tx, rx) = watch::channel(false);
        let mut poller = Poller::new(Arc::new(api), store.clone(), Duration::from_millis(20), 10);
        let handle = tokio::spawn(async move { poller.run(rx).await });

        let probe = store.clone();
        wait_until(|| probe.exists(SnapshotTag::Comparison)).await;
        tx.send(true).unwrap();

        let completed = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("poller did not stop")
            .unwrap()
            .unwrap();
        assert!(completed >= 1);
        assert!(calls.load(Ordering::SeqCst) >= 2);

        std::fs::remove_dir_all(root).unwrap();
    }

    #[tokio::test]
    async fn test_auth_error_is_fatal() {
        let (store, root) = temp_store();

        let mut api = MockMarketApi::new();
        api.expect_fetch_bazaar_listing()
            .times(1)
            .returning(|| Err(FlipperError::Auth("Invalid API key".into())));

        let (_tx, rx) = watch::channel(false);
        let mut poller = Poller::new(Arc::new(api), store, Duration::from_millis(10), 10);
        let err = assert_err!(poller.run(rx).await);

        assert!(matches!(err, FlipperError::Auth(_)));
        assert_eq!(poller.state(), PollerState::Idle);

        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn test_shutdown_before_start_runs_nothing() {
        let (store, _root) = temp_store();
        let api = MockMarketApi::new();

        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();
        let mut poller = Poller::new(Arc::new(api), store.clone(), Duration::from_millis(10), 10);

        assert_eq!(poller.run(rx).await.unwrap(), 0);
        assert!(!store.exists(SnapshotTag::Comparison));
    }
}
