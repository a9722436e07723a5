//! Hypixel public API integration.
//!
//! Bazaar prices and Skyblock profile skill experience.
//!
//! API docs: https://api.hypixel.net/
//! Base URL: https://api.hypixel.net/v2/
//! Auth: `API-Key` header.
//! Errors: `{"success": false, "cause": "..."}` with 403 for a bad key.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

use super::mojang::MojangClient;
use super::{status_error, MarketApi};
use crate::config::ApiConfig;
use crate::error::{FlipperError, Result};
use crate::types::{PlayerSkillProfile, PriceListing, PriceRecord, SkillLevel};

// ---------------------------------------------------------------------------
// Skill experience table
// ---------------------------------------------------------------------------

/// XP required to go from level `n` to `n + 1`, for n in 0..60.
const SKILL_XP_PER_LEVEL: [f64; 60] = [
    50.0, 125.0, 200.0, 300.0, 500.0, 750.0, 1_000.0, 1_500.0, 2_000.0, 3_500.0,
    5_000.0, 7_500.0, 10_000.0, 15_000.0, 20_000.0, 30_000.0, 50_000.0, 75_000.0, 100_000.0, 200_000.0,
    300_000.0, 400_000.0, 500_000.0, 600_000.0, 700_000.0, 800_000.0, 900_000.0, 1_000_000.0, 1_100_000.0, 1_200_000.0,
    1_300_000.0, 1_400_000.0, 1_500_000.0, 1_600_000.0, 1_700_000.0, 1_800_000.0, 1_900_000.0, 2_000_000.0, 2_100_000.0, 2_200_000.0,
    2_300_000.0, 2_400_000.0, 2_500_000.0, 2_600_000.0, 2_750_000.0, 2_900_000.0, 3_100_000.0, 3_400_000.0, 3_700_000.0, 4_000_000.0,
    4_300_000.0, 4_600_000.0, 4_900_000.0, 5_200_000.0, 5_500_000.0, 5_800_000.0, 6_100_000.0, 6_400_000.0, 6_700_000.0, 7_000_000.0,
];

/// Catacombs XP required to go from level `n` to `n + 1`, for n in 0..50.
const CATACOMBS_XP_PER_LEVEL: [f64; 50] = [
    50.0, 75.0, 110.0, 160.0, 230.0, 330.0, 470.0, 670.0, 950.0, 1_340.0,
    1_890.0, 2_665.0, 3_760.0, 5_260.0, 7_380.0, 10_300.0, 14_400.0, 20_000.0, 27_600.0, 38_000.0,
    52_500.0, 71_500.0, 97_000.0, 132_000.0, 180_000.0, 243_000.0, 328_000.0, 445_000.0, 600_000.0, 800_000.0,
    1_065_000.0, 1_410_000.0, 1_900_000.0, 2_500_000.0, 3_300_000.0, 4_300_000.0, 5_600_000.0, 7_200_000.0, 9_200_000.0, 12_000_000.0,
    15_000_000.0, 19_000_000.0, 24_000_000.0, 30_000_000.0, 38_000_000.0, 48_000_000.0, 60_000_000.0, 75_000_000.0, 93_000_000.0, 116_250_000.0,
];

/// Reported next to the skills, from the member's catacombs experience.
const DUNGEONS: &str = "dungeons";

/// Skills reported by the inspector: (profile field, display name, level cap).
const SKILLS: &[(&str, &str, u32)] = &[
    ("SKILL_COMBAT", "combat", 60),
    ("SKILL_FARMING", "farming", 60),
    ("SKILL_MINING", "mining", 60),
    ("SKILL_FORAGING", "foraging", 50),
    ("SKILL_TAMING", "taming", 60),
    ("SKILL_ENCHANTING", "enchanting", 60),
    ("SKILL_FISHING", "fishing", 50),
    ("SKILL_ALCHEMY", "alchemy", 50),
    ("SKILL_CARPENTRY", "carpentry", 50),
];

/// Level reached with `xp` cumulative experience, clamped to `cap`.
pub fn level_for_xp(xp: f64, cap: u32) -> u32 {
    level_in_table(&SKILL_XP_PER_LEVEL, xp, cap)
}

/// Catacombs level reached with `xp` cumulative dungeon experience.
pub fn dungeon_level_for_xp(xp: f64) -> u32 {
    level_in_table(&CATACOMBS_XP_PER_LEVEL, xp, CATACOMBS_XP_PER_LEVEL.len() as u32)
}

fn level_in_table(table: &[f64], xp: f64, cap: u32) -> u32 {
    let mut remaining = xp;
    let mut level = 0;
    for needed in table.iter().take(cap as usize) {
        if remaining < *needed {
            break;
        }
        remaining -= needed;
        level += 1;
    }
    level
}

// ---------------------------------------------------------------------------
// API response types (Hypixel JSON → Rust)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BazaarResponse {
    success: bool,
    #[serde(default)]
    cause: Option<String>,
    /// Last Bazaar refresh, ms since epoch.
    #[serde(default)]
    last_updated: Option<i64>,
    #[serde(default)]
    products: HashMap<String, BazaarProduct>,
}

#[derive(Debug, Deserialize)]
struct BazaarProduct {
    #[serde(default)]
    quick_status: Option<QuickStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuickStatus {
    #[serde(default)]
    buy_price: Option<f64>,
    #[serde(default)]
    sell_price: Option<f64>,
    #[serde(default)]
    buy_moving_week: Option<u64>,
    #[serde(default)]
    sell_moving_week: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ProfilesResponse {
    success: bool,
    #[serde(default)]
    cause: Option<String>,
    /// `null` for players who never joined Skyblock.
    #[serde(default)]
    profiles: Option<Vec<SkyblockProfile>>,
}

#[derive(Debug, Deserialize)]
struct SkyblockProfile {
    #[serde(default)]
    cute_name: Option<String>,
    #[serde(default)]
    selected: bool,
    #[serde(default)]
    members: HashMap<String, ProfileMember>,
}

#[derive(Debug, Deserialize)]
struct ProfileMember {
    #[serde(default)]
    player_data: Option<PlayerData>,
    #[serde(default)]
    dungeons: Option<MemberDungeons>,
}

#[derive(Debug, Deserialize)]
struct MemberDungeons {
    #[serde(default)]
    dungeon_types: Option<DungeonTypes>,
}

#[derive(Debug, Deserialize)]
struct DungeonTypes {
    #[serde(default)]
    catacombs: Option<DungeonProgress>,
}

#[derive(Debug, Deserialize)]
struct DungeonProgress {
    #[serde(default)]
    experience: f64,
}

#[derive(Debug, Deserialize)]
struct PlayerData {
    #[serde(default)]
    experience: HashMap<String, f64>,
}

/// Responses carrying the `success`/`cause` envelope.
trait Envelope {
    fn success(&self) -> bool;
    fn cause(&self) -> Option<&str>;
}

impl Envelope for BazaarResponse {
    fn success(&self) -> bool {
        self.success
    }
    fn cause(&self) -> Option<&str> {
        self.cause.as_deref()
    }
}

impl Envelope for ProfilesResponse {
    fn success(&self) -> bool {
        self.success
    }
    fn cause(&self) -> Option<&str> {
        self.cause.as_deref()
    }
}

fn check_envelope<T: Envelope>(resp: T) -> Result<T> {
    if resp.success() {
        return Ok(resp);
    }
    let cause = resp.cause().unwrap_or("unknown cause").to_string();
    if cause.to_lowercase().contains("key") {
        Err(FlipperError::Auth(cause))
    } else {
        Err(FlipperError::Network(cause))
    }
}

// ---------------------------------------------------------------------------
// Conversion
// ---------------------------------------------------------------------------

/// Missing quick-status prices count as 0, which the flip analyzer later
/// excludes. Missing volumes count as 0.
fn listing_from_response(resp: BazaarResponse) -> PriceListing {
    let captured_at = resp
        .last_updated
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        .unwrap_or_else(Utc::now);

    let mut listing = PriceListing::new(captured_at);
    for (id, product) in resp.products {
        let record = product
            .quick_status
            .map(|q| {
                PriceRecord::new(q.buy_price.unwrap_or(0.0), q.sell_price.unwrap_or(0.0))
                    .with_volume(q.buy_moving_week.unwrap_or(0), q.sell_moving_week.unwrap_or(0))
            })
            .unwrap_or_else(|| PriceRecord::new(0.0, 0.0));
        listing.insert(id, record);
    }
    listing
}

/// Pick the selected profile (or the first) and convert the member's
/// experience into skill levels.
fn skills_from_profiles(
    resp: ProfilesResponse,
    member_key: &str,
    username: &str,
) -> Result<BTreeMap<String, SkillLevel>> {
    let mut profiles = resp.profiles.unwrap_or_default();
    if profiles.is_empty() {
        return Err(FlipperError::NotFound(format!("Skyblock profile for {username}")));
    }

    let idx = profiles.iter().position(|p| p.selected).unwrap_or(0);
    let mut profile = profiles.swap_remove(idx);
    debug!(profile = ?profile.cute_name, "Using Skyblock profile");

    let missing = || FlipperError::NotFound(format!("profile member data for {username}"));
    let member = profile.members.remove(member_key).ok_or_else(missing)?;
    let experience = member.player_data.map(|d| d.experience).ok_or_else(missing)?;

    let mut skills: BTreeMap<String, SkillLevel> = SKILLS
        .iter()
        .map(|(field, name, cap)| {
            let xp = experience.get(*field).copied().unwrap_or(0.0);
            (
                name.to_string(),
                SkillLevel {
                    level: level_for_xp(xp, *cap),
                    xp,
                },
            )
        })
        .collect();

    let dungeon_xp = member
        .dungeons
        .and_then(|d| d.dungeon_types)
        .and_then(|t| t.catacombs)
        .map(|c| c.experience)
        .unwrap_or(0.0);
    skills.insert(
        DUNGEONS.to_string(),
        SkillLevel {
            level: dungeon_level_for_xp(dungeon_xp),
            xp: dungeon_xp,
        },
    );

    Ok(skills)
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct HypixelClient {
    http: Client,
    base_url: String,
    api_key: SecretString,
    mojang: MojangClient,
}

impl HypixelClient {
    pub fn new(config: &ApiConfig, api_key: SecretString) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .user_agent("bazaar-flipper/0.1.0")
            .build()
            .map_err(|e| FlipperError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            mojang: MojangClient::new(http.clone(), config.mojang_base_url.clone()),
            http,
            base_url: config.bazaar_base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Authenticated GET returning the decoded JSON body.
    async fn get_json<T: DeserializeOwned>(&self, path: &str, what: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "Hypixel request");

        let resp = self
            .http
            .get(&url)
            .header("API-Key", self.api_key.expose_secret())
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if let Some(err) = status_error(status, what, &body) {
            return Err(err);
        }

        serde_json::from_str(&body)
            .map_err(|e| FlipperError::Network(format!("Failed to parse Hypixel {what} response: {e}")))
    }
}

#[async_trait]
impl MarketApi for HypixelClient {
    async fn fetch_bazaar_listing(&self) -> Result<PriceListing> {
        let resp: BazaarResponse = self.get_json("/v2/skyblock/bazaar", "bazaar").await?;
        let listing = listing_from_response(check_envelope(resp)?);
        info!(products = listing.len(), captured_at = %listing.captured_at, "Bazaar listing fetched");
        Ok(listing)
    }

    async fn fetch_player_profile(&self, username: &str) -> Result<PlayerSkillProfile> {
        let player = self.mojang.resolve(username).await?;
        let member_key = player.uuid.simple().to_string();

        let resp: ProfilesResponse = self
            .get_json(
                &format!("/v2/skyblock/profiles?uuid={member_key}"),
                &format!("profiles of {}", player.username),
            )
            .await?;

        let skills = skills_from_profiles(check_envelope(resp)?, &member_key, &player.username)?;
        if skills.values().all(|s| s.xp == 0.0) {
            warn!(username = %player.username, "Profile has no skill experience (skills API disabled?)");
        }

        Ok(PlayerSkillProfile {
            username: player.username,
            uuid: member_key,
            skills,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
