//! Price analysis.
//!
//! `flip` ranks two snapshots against each other; `daily` folds the
//! hourly captures of a day into per-item statistics.

pub mod daily;
pub mod flip;
