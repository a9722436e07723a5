//! Bazaar flipper, Hypixel Skyblock Bazaar snapshot poller and flip finder.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod menu;
pub mod storage;
pub mod strategy;
pub mod types;
