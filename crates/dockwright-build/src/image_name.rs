//! イメージ名とタグ
//!
//! `name[:tag]` 形式の文字列を分解し、明示的なタグリストと合わせて
//! 「ベース名 + 順序付きタグ集合」にまとめる。

use crate::error::{BuildError, BuildResult, EngineError};
use serde::Serialize;

/// イメージ名をベース名と埋め込みタグに分ける
///
/// 最後の `:` が最後の `/` より後ろにある場合だけタグとみなす
/// （`host:5000/app` の `:` はレジストリのポート区切り）。
///
/// # Examples
/// - `repo/name:tag` -> `("repo/name", Some("tag"))`
/// - `repo/name` -> `("repo/name", None)`
/// - `host:5000/repo/name:tag` -> `("host:5000/repo/name", Some("tag"))`
/// - `repo/name:` -> `("repo/name", None)`
pub fn parse_image_name(image: &str) -> BuildResult<(String, Option<String>)> {
    if image.trim().is_empty() {
        return Err(BuildError::Config(
            "image name must not be empty".to_string(),
        ));
    }

    let last_slash = image.rfind('/');
    match image.rfind(':') {
        Some(colon) if last_slash.is_none_or(|slash| colon > slash) => {
            let name = &image[..colon];
            let tag = &image[colon + 1..];
            Ok((name.to_string(), (!tag.is_empty()).then(|| tag.to_string())))
        }
        _ => Ok((image.to_string(), None)),
    }
}

/// Docker タグの検証
///
/// - 128文字以下
/// - 英数字、ピリオド、ハイフン、アンダースコアのみ
/// - 先頭はピリオドまたはハイフンではない
pub fn validate_tag(tag: &str) -> Result<(), EngineError> {
    if tag.is_empty() {
        return Err(EngineError::InvalidTag {
            tag: "(empty)".to_string(),
        });
    }

    if tag.len() > 128 {
        return Err(EngineError::InvalidTag {
            tag: format!("Tag too long ({} characters, max 128)", tag.len()),
        });
    }

    if tag.starts_with('.') || tag.starts_with('-') {
        return Err(EngineError::InvalidTag {
            tag: tag.to_string(),
        });
    }

    if let Some(c) = tag
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && *c != '.' && *c != '-' && *c != '_')
    {
        return Err(EngineError::InvalidTag {
            tag: format!("Invalid character '{}' in tag: {}", c, tag),
        });
    }

    Ok(())
}

/// ベース名とタグ集合
///
/// 最初のタグがビルド時に付くプライマリタグ、残りはビルド後に付与される。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageReference {
    pub name: String,
    pub tags: Vec<String>,
}

impl ImageReference {
    /// 埋め込みタグ → 明示タグの順でまとめる
    ///
    /// 空白だけのタグは無視し、重複は最初の出現だけ残す。
    /// タグが 1 つも無い場合は設定エラー。
    pub fn create(image: &str, tags: &[String]) -> BuildResult<Self> {
        let (name, embedded) = parse_image_name(image)?;

        let mut resolved: Vec<String> = Vec::new();
        for tag in embedded.iter().chain(tags.iter()) {
            let tag = tag.trim();
            if tag.is_empty() {
                tracing::debug!("Ignoring blank tag for {}", name);
                continue;
            }
            if resolved.iter().any(|t| t == tag) {
                continue;
            }
            validate_tag(tag)?;
            resolved.push(tag.to_string());
        }

        if resolved.is_empty() {
            return Err(BuildError::Config(format!(
                "no tag for image '{}': add a tag to the image name or a tags node",
                name
            )));
        }

        Ok(Self {
            name,
            tags: resolved,
        })
    }

    pub fn primary_tag(&self) -> &str {
        &self.tags[0]
    }

    /// `name:<最初のタグ>`
    pub fn primary(&self) -> String {
        self.with_tag(self.primary_tag())
    }

    /// ビルド後に付与するタグ
    pub fn additional_tags(&self) -> &[String] {
        &self.tags[1..]
    }

    pub fn with_tag(&self, tag: &str) -> String {
        format!("{}:{}", self.name, tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_with_tag() {
        let (name, tag) = parse_image_name("repo/name:tag").unwrap();
        assert_eq!(name, "repo/name");
        assert_eq!(tag.as_deref(), Some("tag"));
    }

    #[test]
    fn test_parse_without_tag() {
        let (name, tag) = parse_image_name("repo/name").unwrap();
        assert_eq!(name, "repo/name");
        assert_eq!(tag, None);
    }

    #[test]
    fn test_parse_registry_port() {
        let (name, tag) = parse_image_name("host:5000/repo/name:tag").unwrap();
        assert_eq!(name, "host:5000/repo/name");
        assert_eq!(tag.as_deref(), Some("tag"));

        let (name, tag) = parse_image_name("host:5000/repo/name").unwrap();
        assert_eq!(name, "host:5000/repo/name");
        assert_eq!(tag, None);
    }

    #[test]
    fn test_parse_empty_tag() {
        let (name, tag) = parse_image_name("repo/name:").unwrap();
        assert_eq!(name, "repo/name");
        assert_eq!(tag, None);
    }

    #[test]
    fn test_parse_empty_name() {
        assert!(matches!(parse_image_name(""), Err(BuildError::Config(_))));
    }

    #[test]
    fn test_create_requires_a_tag() {
        let result = ImageReference::create("img", &[]);
        assert!(matches!(result, Err(BuildError::Config(_))));
    }

    #[test]
    fn test_create_with_embedded_tag() {
        let image = ImageReference::create("img:1.0", &[]).unwrap();
        assert_eq!(image.name, "img");
        assert_eq!(image.tags, tags(&["1.0"]));
        assert_eq!(image.primary(), "img:1.0");
        assert!(image.additional_tags().is_empty());
    }

    #[test]
    fn test_create_merges_tags() {
        let image = ImageReference::create("img:1.0", &tags(&["2.0"])).unwrap();
        assert_eq!(image.tags, tags(&["1.0", "2.0"]));
        assert_eq!(image.additional_tags(), tags(&["2.0"]).as_slice());
    }

    #[test]
    fn test_create_skips_blank_and_duplicate_tags() {
        let image =
            ImageReference::create("registry:5000/img", &tags(&["latest", " ", "", "latest", "1.0"]))
                .unwrap();
        assert_eq!(image.name, "registry:5000/img");
        assert_eq!(image.tags, tags(&["latest", "1.0"]));
    }

    #[test]
    fn test_create_rejects_invalid_tag() {
        let result = ImageReference::create("img", &tags(&["bad tag"]));
        assert!(matches!(
            result,
            Err(BuildError::Engine(EngineError::InvalidTag { .. }))
        ));
    }

    #[test]
    fn test_validate_tag() {
        assert!(validate_tag("v1.0").is_ok());
        assert!(validate_tag("a1b2c3d.release-1.DIRTY").is_ok());
        assert!(validate_tag("feature_branch-1").is_ok());
        assert!(validate_tag("").is_err());
        assert!(validate_tag(".hidden").is_err());
        assert!(validate_tag("-flag").is_err());
        assert!(validate_tag("with/slash").is_err());
        assert!(validate_tag(&"a".repeat(129)).is_err());
    }
}
