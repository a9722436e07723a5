//! Daily aggregation of hourly captures.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::types::{DailyItemStats, DailySummary, PriceListing};

#[derive(Default)]
struct Samples {
    buys: Vec<f64>,
    sells: Vec<f64>,
}

/// Average, min and max prices per item over `captures`.
///
/// Every item seen in at least one capture is included; an item missing
/// from some captures is averaged over the captures that list it.
pub fn summarize(date: NaiveDate, captures: &[PriceListing]) -> DailySummary {
    let mut per_item: BTreeMap<&str, Samples> = BTreeMap::new();
    for listing in captures {
        for (id, record) in &listing.products {
            let s = per_item.entry(id.as_str()).or_default();
            s.buys.push(record.buy_price);
            s.sells.push(record.sell_price);
        }
    }

    let items = per_item
        .into_iter()
        .map(|(id, s)| {
            let avg_buy = mean(&s.buys);
            let avg_sell = mean(&s.sells);
            DailyItemStats {
                item_id: id.to_string(),
                avg_buy,
                avg_sell,
                min_buy: s.buys.iter().copied().fold(f64::INFINITY, f64::min),
                max_buy: s.buys.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                min_sell: s.sells.iter().copied().fold(f64::INFINITY, f64::min),
                max_sell: s.sells.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                profit: avg_sell - avg_buy,
            }
        })
        .collect();

    DailySummary {
        date,
        samples: captures.len(),
        items,
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}
