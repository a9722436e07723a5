//! Player skill lookup and rendering.

use std::fmt::Write as _;
use std::sync::Arc;
use tracing::info;

use crate::api::MarketApi;
use crate::error::Result;
use crate::types::PlayerSkillProfile;

pub struct PlayerInspector {
    api: Arc<dyn MarketApi>,
}

impl PlayerInspector {
    pub fn new(api: Arc<dyn MarketApi>) -> Self {
        Self { api }
    }

    /// Fetch `username`'s profile and render its skill report.
    /// API errors are returned as-is.
    pub async fn inspect(&self, username: &str) -> Result<String> {
        let profile = self.api.fetch_player_profile(username).await?;
        info!(
            username = %profile.username,
            skills = profile.skills.len(),
            average = format!("{:.1}", profile.average_level()),
            "Player profile fetched"
        );
        Ok(render_profile(&profile))
    }
}

pub fn render_profile(profile: &PlayerSkillProfile) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Skills of {} ({})", profile.username, profile.uuid);
    if profile.skills.is_empty() {
        let _ = writeln!(out, "  No skill data available.");
        return out;
    }
    for (name, skill) in &profile.skills {
        let _ = writeln!(
            out,
            "  {:>2} {:<11} {:>14.1} xp",
            skill.level,
            capitalize(name),
            skill.xp
        );
    }
    let _ = writeln!(out, "  Average level: {:.2}", profile.average_level());
    out
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockMarketApi;
    use crate::error::FlipperError;
    use crate::types::SkillLevel;
    use mockall::predicate::eq;
    use std::collections::BTreeMap;

    fn profile() -> PlayerSkillProfile {
        let mut skills = BTreeMap::new();
        skills.insert("combat".to_string(), SkillLevel { level: 24, xp: 1_722_425.0 });
        skills.insert("fishing".to_string(), SkillLevel { level: 10, xp: 9_925.0 });
        PlayerSkillProfile {
            username: "Notch".into(),
            uuid: "069a79f444e94726a5befca90e38aaf5".into(),
            skills,
        }
    }

    #[test]
    fn test_render_profile() {
        let text = render_profile(&profile());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Skills of Notch (069a79f444e94726a5befca90e38aaf5)");
        assert!(lines[1].contains("24 Combat"));
        assert!(lines[1].contains("1722425.0 xp"));
        assert!(lines[2].contains("10 Fishing"));
        assert_eq!(lines[3], "  Average level: 17.00");
    }

    #[test]
    fn test_render_empty_profile() {
        let mut p = profile();
        p.skills.clear();
        assert!(render_profile(&p).contains("No skill data available."));
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("enchanting"), "Enchanting");
        assert_eq!(capitalize(""), "");
    }

    #[tokio::test]
    async fn test_inspect_renders_fetched_profile() {
        let mut api = MockMarketApi::new();
        api.expect_fetch_player_profile()
            .with(eq("Notch"))
            .times(1)
            .returning(|_| Ok(profile()));

        let inspector = PlayerInspector::new(Arc::new(api));
        let report = inspector.inspect("Notch").await.unwrap();
        assert!(report.starts_with("Skills of Notch"));
    }

    #[tokio::test]
    async fn test_inspect_propagates_not_found() {
        let mut api = MockMarketApi::new();
        api.expect_fetch_player_profile()
            .returning(|name| Err(FlipperError::NotFound(format!("player {name}"))));

        let inspector = PlayerInspector::new(Arc::new(api));
        let err = inspector.inspect("nobody_here_123").await.unwrap_err();
        assert_eq!(err.to_string(), "Not found: player nobody_here_123");
    }
}
