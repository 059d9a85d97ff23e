// Announcement text
//
// Layout:
//   <headline>
//
//   <emoji> <Name> Egg        (one line per drawn egg, in draw order)
//
//   <@&role> <@&role>         (one mention per distinct egg with a role)

use crate::catalog::Catalog;
use crate::errors::NotifyError;
use crate::models::ShopDocument;
use crate::secrets::DiscordSecrets;
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    pub content: String,
    /// Role ids mentioned, in the order they appear
    pub role_ids: Vec<String>,
}

impl Announcement {
    pub fn build(
        headline: &str,
        eggs: &[String],
        catalog: &Catalog,
        overrides: &DiscordSecrets,
    ) -> Self {
        let lines = eggs
            .iter()
            .map(|egg| {
                let emoji = catalog.emoji_or_fallback(egg);
                format!("{} {} Egg", emoji, egg).trim_start().to_string()
            })
            .collect::<Vec<_>>()
            .join("\n");

        let mut seen = HashSet::new();
        let role_ids: Vec<String> = eggs
            .iter()
            .filter(|egg| seen.insert(egg.as_str()))
            .filter_map(|egg| {
                overrides
                    .role_for(egg)
                    .or_else(|| catalog.role(egg))
                    .map(str::to_string)
            })
            .collect();

        let mentions = role_ids
            .iter()
            .map(|id| format!("<@&{}>", id))
            .collect::<Vec<_>>()
            .join(" ");

        let content = format!("{}\n\n{}\n\n{}", headline, lines, mentions)
            .trim_end()
            .to_string();

        Self { content, role_ids }
    }
}

/// Read the egg list from a shop artifact
pub async fn read_shop(path: &Path) -> Result<ShopDocument, NotifyError> {
    let raw = tokio::fs::read(path)
        .await
        .map_err(|e| NotifyError::ArtifactUnreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    serde_json::from_slice(&raw).map_err(|e| NotifyError::ArtifactUnreadable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::Secrets;

    const HEADLINE: &str = "🥚 **Egg Shop Refresh!**";

    fn catalog() -> Catalog {
        Catalog::from_reader(
            "EggName,PullChance,EmojiID,RoleID\n\
             Common,70,11,\n\
             Rare,25,22,900\n\
             Legendary,5,,901\n\
             Unknown,0,99,\n"
                .as_bytes(),
        )
        .unwrap()
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_full_layout() {
        let announcement = Announcement::build(
            HEADLINE,
            &names(&["Rare", "Common", "Legendary"]),
            &catalog(),
            &Default::default(),
        );
        assert_eq!(
            announcement.content,
            "🥚 **Egg Shop Refresh!**\n\n\
             <:Rare:22> Rare Egg\n\
             <:Common:11> Common Egg\n\
             <:Unknown:99> Legendary Egg\n\n\
             <@&900> <@&901>"
        );
    }

    #[test]
    fn test_mentions_are_deduplicated_in_first_seen_order() {
        let announcement = Announcement::build(
            HEADLINE,
            &names(&["Legendary", "Rare", "Legendary", "Rare", "Common"]),
            &catalog(),
            &Default::default(),
        );
        assert_eq!(announcement.role_ids, vec!["901", "900"]);
        assert_eq!(announcement.content.matches("Legendary Egg").count(), 2);
    }

    #[test]
    fn test_environment_roles_override_catalog() {
        let secrets = Secrets::from_vars([("DISCORD_ROLE_RARE", "777"), ("DISCORD_ROLE_COMMON", "100")]);
        let announcement = Announcement::build(
            HEADLINE,
            &names(&["Rare", "Common"]),
            &catalog(),
            &secrets.discord,
        );
        assert_eq!(announcement.role_ids, vec!["777", "100"]);
    }

    #[test]
    fn test_no_roles_means_no_trailing_blank_lines() {
        let announcement =
            Announcement::build(HEADLINE, &names(&["Common"]), &catalog(), &Default::default());
        assert_eq!(
            announcement.content,
            "🥚 **Egg Shop Refresh!**\n\n<:Common:11> Common Egg"
        );
        assert!(announcement.role_ids.is_empty());
    }

    #[test]
    fn test_egg_without_any_emoji_has_no_leading_space() {
        let catalog = Catalog::from_reader(
            "EggName,PullChance,EmojiID,RoleID\nCommon,90,11,\nLegendary,10,,\n".as_bytes(),
        )
        .unwrap();
        let announcement = Announcement::build(
            HEADLINE,
            &names(&["Legendary", "Common"]),
            &catalog,
            &Default::default(),
        );
        assert_eq!(
            announcement.content,
            "🥚 **Egg Shop Refresh!**\n\nLegendary Egg\n<:Common:11> Common Egg"
        );
    }

    #[tokio::test]
    async fn test_read_shop_accepts_legacy_key() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("shop.json");
        std::fs::write(&path, r#"{"current_shop": ["Rare"]}"#).unwrap();
        let doc = read_shop(&path).await.unwrap();
        assert_eq!(doc.shop, vec!["Rare".to_string()]);
    }

    #[tokio::test]
    async fn test_read_shop_missing_file() {
        let result = read_shop(Path::new("/nonexistent/shop.json")).await;
        assert!(matches!(result, Err(NotifyError::ArtifactUnreadable { .. })));
    }
}
