//! Mojang username lookup.
//!
//! Hypixel keys players by UUID; the menu asks for a username.
//!
//! API: `GET https://api.mojang.com/users/profiles/minecraft/{username}`
//! Auth: None required.
//! Unknown usernames answer 204 or 404 depending on the edge node.

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use crate::error::{FlipperError, Result};

#[derive(Debug, Deserialize)]
struct MojangProfile {
    id: String,
    name: String,
}

/// A resolved Minecraft account.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPlayer {
    /// Canonical capitalisation as returned by Mojang.
    pub username: String,
    pub uuid: Uuid,
}

pub struct MojangClient {
    http: Client,
    base_url: String,
}

impl MojangClient {
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Resolve a username to its account UUID.
    pub async fn resolve(&self, username: &str) -> Result<ResolvedPlayer> {
        let username = username.trim();
        if username.is_empty() {
            return Err(FlipperError::NotFound("player with an empty username".into()));
        }

        let url = format!(
            "{}/users/profiles/minecraft/{}",
            self.base_url,
            urlencoding::encode(username)
        );
        debug!(url = %url, "Resolving Mojang username");

        let resp = self.http.get(&url).send().await?;
        if let Some(err) = lookup_status_error(resp.status(), username) {
            return Err(err);
        }

        let profile: MojangProfile = resp
            .json()
            .await
            .map_err(|e| FlipperError::Network(format!("Failed to parse Mojang response: {e}")))?;

        parse_profile(profile)
    }
}

/// The lookup is unauthenticated, so a 401/403 here is an upstream refusal
/// and never a rejected Hypixel key.
fn lookup_status_error(status: StatusCode, username: &str) -> Option<FlipperError> {
    match status {
        StatusCode::NO_CONTENT | StatusCode::NOT_FOUND => {
            Some(FlipperError::NotFound(format!("player {username}")))
        }
        s if s.is_success() => None,
        s => Some(FlipperError::Network(format!("Mojang lookup for {username} failed: {s}"))),
    }
}

fn parse_profile(profile: MojangProfile) -> Result<ResolvedPlayer> {
    let uuid = Uuid::parse_str(&profile.id)
        .map_err(|e| FlipperError::Network(format!("Mojang returned a malformed UUID '{}': {e}", profile.id)))?;
    Ok(ResolvedPlayer {
        username: profile.name,
        uuid,
    })
}
