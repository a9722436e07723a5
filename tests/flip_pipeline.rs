//! End-to-end flip pipeline against an in-memory market.
//!
//! `StubMarket` is a deterministic `MarketApi` that serves queued listings
//! and can be forced into an error, so the store, analyzer, exporter and
//! poller run together without touching the network.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::collections::{BTreeMap, VecDeque};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

use bazaar_flipper::api::MarketApi;
use bazaar_flipper::error::{FlipperError, Result};
use bazaar_flipper::menu::App;
use bazaar_flipper::storage::SnapshotStore;
use bazaar_flipper::types::{PlayerSkillProfile, PriceListing, SkillLevel, SnapshotTag};

struct StubMarket {
    listings: Mutex<VecDeque<PriceListing>>,
    force_error: Mutex<Option<String>>,
}

impl StubMarket {
    fn new(listings: Vec<PriceListing>) -> Self {
        Self {
            listings: Mutex::new(listings.into()),
            force_error: Mutex::new(None),
        }
    }

    fn set_error(&self, msg: &str) {
        *self.force_error.lock().unwrap() = Some(msg.to_string());
    }
}

#[async_trait]
impl MarketApi for StubMarket {
    async fn fetch_bazaar_listing(&self) -> Result<PriceListing> {
        if let Some(msg) = self.force_error.lock().unwrap().clone() {
            return Err(FlipperError::Network(msg));
        }
        let mut queue = self.listings.lock().unwrap();
        // The last listing keeps being served once the queue drains.
        if queue.len() > 1 {
            Ok(queue.pop_front().unwrap())
        } else {
            queue
                .front()
                .cloned()
                .ok_or_else(|| FlipperError::Network("no listings queued".into()))
        }
    }

    async fn fetch_player_profile(&self, username: &str) -> Result<PlayerSkillProfile> {
        if username != "Technoblade" {
            return Err(FlipperError::NotFound(format!("player {username}")));
        }
        let mut skills = BTreeMap::new();
        skills.insert("combat".to_string(), SkillLevel { level: 60, xp: 111_672_425.0 });
        skills.insert("farming".to_string(), SkillLevel { level: 50, xp: 55_172_425.0 });
        Ok(PlayerSkillProfile {
            username: username.to_string(),
            uuid: "b876ec32e396476ba1158438d83c67d4".to_string(),
            skills,
        })
    }
}

fn temp_root() -> PathBuf {
    let mut p = std::env::temp_dir();
    p.push(format!("bazaar_flipper_it_{}", uuid::Uuid::new_v4()));
    p
}

fn reference() -> PriceListing {
    PriceListing::from_prices([
        ("ENCHANTED_DIAMOND", 1500.0, 1450.0),
        ("ENCHANTED_GOLD", 500.0, 480.0),
        ("BOOSTER_COOKIE", 2_000_000.0, 1_950_000.0),
        ("ZERO_PRICE", 0.0, 10.0),
        ("ONLY_IN_REFERENCE", 10.0, 9.0),
    ])
}

fn comparison() -> PriceListing {
    let mut listing = PriceListing::from_prices([
        ("ENCHANTED_DIAMOND", 1400.0, 1800.0),
        ("ENCHANTED_GOLD", 450.0, 400.0),
        ("BOOSTER_COOKIE", 2_100_000.0, 2_200_000.0),
        ("ZERO_PRICE", 5.0, 12.0),
        ("ONLY_IN_COMPARISON", 1.0, 100.0),
    ]);
    listing.captured_at = Utc.with_ymd_and_hms(2024, 5, 1, 13, 0, 0).unwrap();
    listing
}

#[tokio::test]
async fn test_manual_reference_then_comparison() {
    let root = temp_root();
    let market = Arc::new(StubMarket::new(vec![reference(), comparison()]));
    let app = App::new(market, SnapshotStore::under(&root), Duration::from_secs(3600), 10);

    app.capture(SnapshotTag::Reference).await.unwrap();
    app.capture(SnapshotTag::Comparison).await.unwrap();
    let (flips, paths) = app.find_flips().unwrap();

    let ids: Vec<&str> = flips.iter().map(|f| f.item_id.as_str()).collect();
    // Diamond +20%, cookie +10%, gold -20%. Zero-price and one-sided items are excluded.
    assert_eq!(ids, vec!["ENCHANTED_DIAMOND", "BOOSTER_COOKIE", "ENCHANTED_GOLD"]);
    assert_eq!(flips[0].delta, 300.0);
    assert!((flips[0].percent_change - 0.2).abs() < 1e-12);

    let text = std::fs::read_to_string(&paths.text).unwrap();
    assert!(text.contains("ENCHANTED_DIAMOND"));
    assert!(!text.contains("ENCHANTED_GOLD"));

    std::fs::remove_dir_all(root).unwrap();
}

#[tokio::test]
async fn test_automatic_mode_survives_outage_and_stops_cleanly() {
    let root = temp_root();
    let store = SnapshotStore::under(&root);
    store.save(SnapshotTag::Reference, &reference()).unwrap();

    let market = Arc::new(StubMarket::new(vec![comparison()]));
    market.set_error("upstream unavailable");

    let app = App::new(market.clone(), store.clone(), Duration::from_millis(20), 10);
    let mut poller = app.poller();
    let (tx, rx) = watch::channel(false);
    let handle = tokio::spawn(async move { poller.run(rx).await });

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!store.exists(SnapshotTag::Comparison));

    *market.force_error.lock().unwrap() = None;
    for _ in 0..300 {
        if store.exists(SnapshotTag::Comparison) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    tx.send(true).unwrap();

    let cycles = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("poller did not stop")
        .unwrap()
        .unwrap();
    assert!(cycles >= 1);
    assert_eq!(store.load(SnapshotTag::Comparison).unwrap(), comparison());
    assert!(!store.load_hourly().unwrap().is_empty());

    std::fs::remove_dir_all(root).unwrap();
}

#[tokio::test]
async fn test_inspect_known_and_unknown_players() {
    let root = temp_root();
    let market = Arc::new(StubMarket::new(Vec::new()));
    let app = App::new(market, SnapshotStore::under(&root), Duration::from_secs(3600), 10);

    let report = app.inspect("Technoblade").await.unwrap();
    assert!(report.contains("60 Combat"));
    assert!(report.contains("50 Farming"));

    let err = app.inspect("definitely_not_a_player").await.unwrap_err();
    assert!(matches!(err, FlipperError::NotFound(_)));
}
