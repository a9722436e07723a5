//! Profit exports.
//!
//! A ranked flip list is written twice per export: the complete sequence as
//! JSON and a human-readable top-N as plain text. Snapshot text dumps use
//! one `"<id> <sell> <buy>"` line per product.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::Result;
use crate::storage::{write_atomic, write_json_atomic};
use crate::strategy::flip::top_profitable;
use crate::types::{DailySummary, FlipOpportunity, PriceListing, SnapshotTag};

/// Paths written by one flip export.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportPaths {
    pub json: PathBuf,
    pub text: PathBuf,
}

#[derive(Serialize)]
struct FlipExport<'a> {
    generated_at: DateTime<Utc>,
    reference_captured_at: DateTime<Utc>,
    comparison_captured_at: DateTime<Utc>,
    count: usize,
    opportunities: &'a [FlipOpportunity],
}

/// Write `flips` to `<dir>/flips_<timestamp>.{json,txt}`.
pub fn export_flips(
    dir: &Path,
    reference: &PriceListing,
    comparison: &PriceListing,
    flips: &[FlipOpportunity],
    top_n: usize,
) -> Result<ExportPaths> {
    let generated_at = Utc::now();
    let stem = format!("flips_{}", generated_at.format("%Y%m%d_%H%M%S"));
    let json = dir.join(format!("{stem}.json"));
    let text = dir.join(format!("{stem}.txt"));

    write_json_atomic(
        &json,
        &FlipExport {
            generated_at,
            reference_captured_at: reference.captured_at,
            comparison_captured_at: comparison.captured_at,
            count: flips.len(),
            opportunities: flips,
        },
    )?;
    write_atomic(&text, render_flips(reference, comparison, flips, top_n).as_bytes())?;

    info!(
        ranked = flips.len(),
        top_n,
        json = %json.display(),
        "Flip export written"
    );
    Ok(ExportPaths { json, text })
}

/// Human-readable report of the best `top_n` profitable flips.
pub fn render_flips(
    reference: &PriceListing,
    comparison: &PriceListing,
    flips: &[FlipOpportunity],
    top_n: usize,
) -> String {
    let top = top_profitable(flips, top_n);
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Flips: reference {} -> comparison {}",
        reference.captured_at.format("%Y-%m-%d %H:%M UTC"),
        comparison.captured_at.format("%Y-%m-%d %H:%M UTC"),
    );
    let _ = writeln!(out, "{} items compared, {} profitable shown", flips.len(), top.len());
    if top.is_empty() {
        let _ = writeln!(out, "No profitable flips.");
    }
    for (rank, flip) in top.iter().enumerate() {
        let _ = writeln!(out, "{:>3}. {flip}", rank + 1);
    }
    out
}

/// Plain text dump of a snapshot next to its JSON file.
pub fn export_snapshot_text(dir: &Path, tag: SnapshotTag, listing: &PriceListing) -> Result<PathBuf> {
    let path = dir.join(format!("{tag}_data.txt"));
    write_atomic(&path, render_snapshot(listing).as_bytes())?;
    info!(tag = %tag, path = %path.display(), "Snapshot text dump written");
    Ok(path)
}

pub fn render_snapshot(listing: &PriceListing) -> String {
    let mut out = String::with_capacity(listing.len() * 48);
    for (id, record) in &listing.products {
        let _ = writeln!(out, "{id} {} {}", record.sell_price, record.buy_price);
    }
    out
}

/// `Profit of: <x> on: <id>` lines for every profitable item of the day.
pub fn export_daily_profits(dir: &Path, summary: &DailySummary) -> Result<PathBuf> {
    let path = dir.join(format!("profits_{}.txt", summary.date.format("%Y-%m-%d")));
    let mut out = String::new();
    for item in summary.profitable() {
        let _ = writeln!(out, "Profit of: {:.2} on: {}", item.profit, item.item_id);
    }
    write_atomic(&path, out.as_bytes())?;
    Ok(path)
}
