//! Upstream API integrations.
//!
//! Defines the `MarketApi` trait consumed by the poller and the player
//! inspector, and provides implementations for:
//! - Hypixel: Bazaar prices and Skyblock profiles
//! - Mojang: username to UUID resolution

pub mod hypixel;
pub mod mojang;

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::error::{FlipperError, Result};
use crate::types::{PlayerSkillProfile, PriceListing};

/// Abstraction over the market API.
///
/// Every call is a single attempt. Failures surface immediately as
/// `Network`, `Auth` or `NotFound`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketApi: Send + Sync {
    /// Fetch the current instant buy/sell price of every Bazaar product.
    async fn fetch_bazaar_listing(&self) -> Result<PriceListing>;

    /// Fetch the skill levels of a player by Minecraft username.
    async fn fetch_player_profile(&self, username: &str) -> Result<PlayerSkillProfile>;
}

/// Map a Hypixel HTTP status to the error taxonomy.
///
/// `what` names the resource for the `NotFound` message.
pub(crate) fn status_error(status: StatusCode, what: &str, body: &str) -> Option<FlipperError> {
    if status.is_success() {
        return None;
    }
    let detail = if body.is_empty() { status.to_string() } else { format!("{status}: {body}") };
    Some(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => FlipperError::Auth(detail),
        StatusCode::NOT_FOUND | StatusCode::NO_CONTENT => FlipperError::NotFound(what.to_string()),
        _ => FlipperError::Network(detail),
    })
}
