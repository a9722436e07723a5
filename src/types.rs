//! Shared types for the flipper.
//!
//! Price listings, snapshot tags, flip opportunities and player skill
//! profiles. Everything that crosses a module boundary lives here.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Prices
// ---------------------------------------------------------------------------

/// Instant buy/sell price of a single Bazaar product, with the traded
/// volume of the last seven days.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub buy_price: f64,
    pub sell_price: f64,
    #[serde(default)]
    pub buy_moving_week: u64,
    #[serde(default)]
    pub sell_moving_week: u64,
}

impl PriceRecord {
    pub fn new(buy_price: f64, sell_price: f64) -> Self {
        Self {
            buy_price,
            sell_price,
            buy_moving_week: 0,
            sell_moving_week: 0,
        }
    }

    pub fn with_volume(mut self, buy_moving_week: u64, sell_moving_week: u64) -> Self {
        self.buy_moving_week = buy_moving_week;
        self.sell_moving_week = sell_moving_week;
        self
    }
}

/// All Bazaar prices captured at a single point in time.
///
/// Products are keyed by item identifier. A `BTreeMap` keeps serialised
/// snapshots and text dumps in a stable order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceListing {
    pub captured_at: DateTime<Utc>,
    pub products: BTreeMap<String, PriceRecord>,
}

impl PriceListing {
    pub fn new(captured_at: DateTime<Utc>) -> Self {
        Self {
            captured_at,
            products: BTreeMap::new(),
        }
    }

    /// Build a listing captured now from `(item_id, buy, sell)` triples.
    pub fn from_prices<I, S>(prices: I) -> Self
    where
        I: IntoIterator<Item = (S, f64, f64)>,
        S: Into<String>,
    {
        let products = prices
            .into_iter()
            .map(|(id, buy, sell)| (id.into(), PriceRecord::new(buy, sell)))
            .collect();
        Self {
            captured_at: Utc::now(),
            products,
        }
    }

    pub fn insert(&mut self, item_id: impl Into<String>, record: PriceRecord) {
        self.products.insert(item_id.into(), record);
    }

    pub fn get(&self, item_id: &str) -> Option<&PriceRecord> {
        self.products.get(item_id)
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Item identifiers present in both `self` and `other`, ascending.
    pub fn common_items<'a>(&'a self, other: &'a PriceListing) -> impl Iterator<Item = &'a str> {
        self.products
            .keys()
            .filter(move |id| other.products.contains_key(*id))
            .map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

/// Named snapshot slot. Each tag holds at most one listing at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotTag {
    Reference,
    Comparison,
}

impl SnapshotTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            SnapshotTag::Reference => "reference",
            SnapshotTag::Comparison => "comparison",
        }
    }
}

impl fmt::Display for SnapshotTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Flips
// ---------------------------------------------------------------------------

/// Spread between buying at the reference price and selling at the
/// comparison price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlipOpportunity {
    pub item_id: String,
    pub reference_buy: f64,
    pub reference_sell: f64,
    pub comparison_buy: f64,
    pub comparison_sell: f64,
    /// `comparison_sell - reference_buy`
    pub delta: f64,
    /// `delta / reference_buy` as a fraction (0.30 == +30%)
    pub percent_change: f64,
    /// Weekly volumes at comparison time.
    #[serde(default)]
    pub buy_moving_week: u64,
    #[serde(default)]
    pub sell_moving_week: u64,
}

impl fmt::Display for FlipOpportunity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<32} buy {:>12.2} -> sell {:>12.2} | delta {:>+12.2} | {:>+8.2}% | week vol {}/{}",
            self.item_id,
            self.reference_buy,
            self.comparison_sell,
            self.delta,
            self.percent_change * 100.0,
            self.buy_moving_week,
            self.sell_moving_week,
        )
    }
}

// ---------------------------------------------------------------------------
// Players
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkillLevel {
    pub level: u32,
    pub xp: f64,
}

/// Skill levels of one player, fetched on demand and never cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSkillProfile {
    pub username: String,
    pub uuid: String,
    /// Skill name ("combat", "farming", ...) to level and XP.
    pub skills: BTreeMap<String, SkillLevel>,
}

impl PlayerSkillProfile {
    /// Mean level over all known skills, 0.0 when none are known.
    pub fn average_level(&self) -> f64 {
        if self.skills.is_empty() {
            return 0.0;
        }
        let total: u32 = self.skills.values().map(|s| s.level).sum();
        total as f64 / self.skills.len() as f64
    }
}

// ---------------------------------------------------------------------------
// Daily aggregation
// ---------------------------------------------------------------------------

/// Per-item statistics over every hourly capture of a day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyItemStats {
    pub item_id: String,
    pub avg_buy: f64,
    pub avg_sell: f64,
    pub min_buy: f64,
    pub max_buy: f64,
    pub min_sell: f64,
    pub max_sell: f64,
    /// `avg_sell - avg_buy`
    pub profit: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub samples: usize,
    pub items: Vec<DailyItemStats>,
}

impl DailySummary {
    /// Items whose average sell beats their average buy, most profitable first.
    pub fn profitable(&self) -> Vec<&DailyItemStats> {
        let mut items: Vec<&DailyItemStats> = self
            .items
            .iter()
            .filter(|s| s.profit > 0.0 && s.avg_buy != 0.0)
            .collect();
        items.sort_by(|a, b| b.profit.total_cmp(&a.profit).then_with(|| a.item_id.cmp(&b.item_id)));
        items
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
