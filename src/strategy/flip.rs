//! Flip detection.
//!
//! Compares a reference snapshot to a later comparison snapshot: an item
//! bought at the reference buy price and sold at the comparison sell price
//! yields `delta`, relative to the buy price `percent_change`.

use std::cmp::Ordering;
use tracing::debug;

use crate::types::{FlipOpportunity, PriceListing};

/// Rank every item present in both listings.
///
/// Items with a zero (or non-finite) reference buy price are skipped rather
/// than divided by. The result is sorted by `percent_change` descending,
/// then absolute `delta` descending, then `item_id` ascending, and is never
/// truncated.
pub fn analyze(reference: &PriceListing, comparison: &PriceListing) -> Vec<FlipOpportunity> {
    let mut skipped = 0usize;
    let mut flips: Vec<FlipOpportunity> = reference
        .common_items(comparison)
        .filter_map(|id| {
            let flip = opportunity(id, reference, comparison);
            if flip.is_none() {
                skipped += 1;
            }
            flip
        })
        .collect();

    flips.sort_by(rank);

    debug!(
        reference_items = reference.len(),
        comparison_items = comparison.len(),
        ranked = flips.len(),
        skipped_zero_price = skipped,
        "Flip analysis complete"
    );

    flips
}

/// The best `n` opportunities whose delta is strictly positive.
pub fn top_profitable(flips: &[FlipOpportunity], n: usize) -> Vec<&FlipOpportunity> {
    flips.iter().filter(|f| f.delta > 0.0).take(n).collect()
}

fn opportunity(id: &str, reference: &PriceListing, comparison: &PriceListing) -> Option<FlipOpportunity> {
    let r = reference.get(id)?;
    let c = comparison.get(id)?;

    if r.buy_price == 0.0 || !r.buy_price.is_finite() {
        return None;
    }

    let delta = c.sell_price - r.buy_price;
    let percent_change = delta / r.buy_price;
    if !percent_change.is_finite() {
        return None;
    }

    Some(FlipOpportunity {
        item_id: id.to_string(),
        reference_buy: r.buy_price,
        reference_sell: r.sell_price,
        comparison_buy: c.buy_price,
        comparison_sell: c.sell_price,
        delta,
        percent_change,
        buy_moving_week: c.buy_moving_week,
        sell_moving_week: c.sell_moving_week,
    })
}

fn rank(a: &FlipOpportunity, b: &FlipOpportunity) -> Ordering {
    b.percent_change
        .total_cmp(&a.percent_change)
        .then_with(|| b.delta.abs().total_cmp(&a.delta.abs()))
        .then_with(|| a.item_id.cmp(&b.item_id))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
