//! `${key}` 変数展開
//!
//! 単一パスの置換のみ。置換後の値は再走査しないので、値に `${...}` が
//! 含まれていてもそのまま残る。

use crate::revision::RevisionInfo;
use dockwright_core::REVISION_KEY;
use std::collections::BTreeMap;

/// テンプレート中の `${key}` をテーブルの値で置換する
///
/// テーブルに無いキーはそのまま残す。
pub fn expand(template: &str, table: &BTreeMap<String, String>) -> String {
    if table.is_empty() || !template.contains("${") {
        return template.to_string();
    }

    let mut result = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        match after.find('}') {
            Some(end) => match table.get(&after[..end]) {
                Some(value) => {
                    result.push_str(value);
                    rest = &after[end + 1..];
                }
                None => {
                    // `${a${b}}` の内側を拾えるよう `$` だけ進める
                    result.push('$');
                    rest = &rest[start + 1..];
                }
            },
            None => {
                result.push_str(&rest[start..]);
                rest = "";
            }
        }
    }

    result.push_str(rest);
    result
}

/// 展開テーブルを作る（プロジェクトプロパティ + リビジョン）
pub fn expansion_table(
    properties: &BTreeMap<String, String>,
    revision: Option<&RevisionInfo>,
) -> BTreeMap<String, String> {
    let mut table = properties.clone();
    if let Some(info) = revision {
        table.insert(REVISION_KEY.to_string(), info.revision());
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_empty_table_is_identity() {
        let empty = BTreeMap::new();
        for s in ["", "plain", "${revision}", "a${b}c${", "$}{"] {
            assert_eq!(expand(s, &empty), s);
        }
    }

    #[test]
    fn test_replaces_every_occurrence() {
        let t = table(&[("v", "1.2")]);
        assert_eq!(expand("app:${v}-${v}", &t), "app:1.2-1.2");
    }

    #[test]
    fn test_substituted_values_are_not_rescanned() {
        let t = table(&[("a", "${b}"), ("b", "x")]);
        assert_eq!(expand("${a}", &t), "${b}");
        assert_eq!(expand("${b}${a}", &t), "x${b}");
    }

    #[test]
    fn test_unknown_keys_are_kept() {
        let t = table(&[("a", "1")]);
        assert_eq!(expand("${missing}:${a}", &t), "${missing}:1");
    }

    #[test]
    fn test_nested_placeholder_inner_key() {
        let t = table(&[("b", "x")]);
        assert_eq!(expand("${a${b}}", &t), "${ax}");
    }

    #[test]
    fn test_unterminated_placeholder() {
        let t = table(&[("a", "1")]);
        assert_eq!(expand("img:${a", &t), "img:${a");
    }

    #[test]
    fn test_expansion_table_includes_revision() {
        let props = table(&[("version", "2.0")]);
        let info = RevisionInfo {
            commit_id: "0123456789abcdef0123456789abcdef01234567".to_string(),
            short_id: "0123456".to_string(),
            tag: Some("v2.0".to_string()),
            dirty: true,
            remote_url: None,
        };

        let t = expansion_table(&props, Some(&info));
        assert_eq!(t.get("version").unwrap(), "2.0");
        assert_eq!(t.get(REVISION_KEY).unwrap(), "0123456.v2.0.DIRTY");
        assert_eq!(expand("app:${version}-${revision}", &t), "app:2.0-0123456.v2.0.DIRTY");
    }
}
