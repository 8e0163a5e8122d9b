//! Dockerfile 生成用ノードのパース

use super::first_string;
use crate::model::Healthcheck;
use kdl::KdlNode;
use std::collections::BTreeMap;

/// env ノードをパース
///
/// 子ノード形式 `env { KEY "value" }` とフラットな `env "KEY=VALUE"` の両方をサポート
pub fn parse_env(node: &KdlNode, env: &mut BTreeMap<String, String>) {
    if let Some(children) = node.children() {
        for child in children.nodes() {
            let key = child.name().value().to_string();
            let value = first_string(child).unwrap_or_default();
            env.insert(key, value);
        }
    } else if let Some(value) = first_string(node)
        && let Some((k, v)) = value.split_once('=')
    {
        env.insert(k.trim().to_string(), v.trim().to_string());
    }
}

/// healthcheck ブロックをパース
///
/// `cmd` が無いヘルスチェックは無効として扱う
pub fn parse_healthcheck(node: &KdlNode) -> Option<Healthcheck> {
    let children = node.children()?;
    let mut options = None;
    let mut cmd = None;

    for child in children.nodes() {
        match child.name().value() {
            "options" => options = first_string(child),
            "cmd" => cmd = first_string(child),
            _ => {}
        }
    }

    match cmd {
        Some(cmd) => Some(Healthcheck { options, cmd }),
        None => {
            tracing::warn!("healthcheck には cmd が必要です。無視します");
            None
        }
    }
}
