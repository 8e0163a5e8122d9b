//! build / push / engine / auth ブロックのパース

use super::{first_bool, first_string, first_u64};
use crate::error::{CoreError, Result};
use crate::model::{AuthSection, EngineSection, ProjectFile, PushSection};
use kdl::KdlNode;

/// build ブロックをパース
///
/// `squash_runs` は Dockerfile の生成方法なので recipe 側に入れる
pub fn parse_build(node: &KdlNode, project: &mut ProjectFile) -> Result<()> {
    let Some(children) = node.children() else {
        return Ok(());
    };

    for child in children.nodes() {
        let value = first_bool(child);
        match child.name().value() {
            "pull" => project.build.pull = value.unwrap_or(true),
            "no_cache" => project.build.no_cache = value.unwrap_or(true),
            "keep_containers" => project.build.keep_containers = value.unwrap_or(true),
            "quiet" => project.build.quiet = value.unwrap_or(true),
            "use_revision_tag" => project.build.use_revision_tag = value.unwrap_or(true),
            "force_tags" => project.build.force_tags = value.unwrap_or(true),
            "require_revision" => project.build.require_revision = value.unwrap_or(true),
            "squash_runs" => project.recipe.squash_runs = value.unwrap_or(true),
            "skip" => project.build.skip = Some(value.unwrap_or(true)),
            other => {
                return Err(CoreError::InvalidConfig(format!(
                    "unknown setting in build block: {}",
                    other
                )));
            }
        }
    }
    Ok(())
}

/// push ブロックをパース
pub fn parse_push(node: &KdlNode) -> Result<PushSection> {
    let mut push = PushSection::default();
    let Some(children) = node.children() else {
        return Ok(push);
    };

    for child in children.nodes() {
        match child.name().value() {
            "image" => push.image = first_bool(child).unwrap_or(true),
            "tags_only" => push.tags_only = first_bool(child).unwrap_or(true),
            "retries" => {
                push.retries = first_u64(child)?
                    .map(|v| {
                        u32::try_from(v).map_err(|_| CoreError::InvalidSetting {
                            key: "retries".to_string(),
                            value: v.to_string(),
                        })
                    })
                    .transpose()?;
            }
            "retry_delay" => push.retry_delay = first_u64(child)?,
            "skip" => push.skip = Some(first_bool(child).unwrap_or(true)),
            other => {
                return Err(CoreError::InvalidConfig(format!(
                    "unknown setting in push block: {}",
                    other
                )));
            }
        }
    }
    Ok(push)
}

/// engine ブロックをパース
pub fn parse_engine(node: &KdlNode) -> Result<EngineSection> {
    let mut engine = EngineSection::default();
    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "host" => engine.host = first_string(child),
                "read_timeout" => engine.read_timeout = first_u64(child)?,
                _ => {}
            }
        }
    }
    Ok(engine)
}

/// auth ブロックをパース
pub fn parse_auth(node: &KdlNode) -> AuthSection {
    let mut auth = AuthSection::default();
    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "username" => auth.username = first_string(child),
                "password" => auth.password = first_string(child),
                "email" => auth.email = first_string(child),
                "registry" => auth.registry = first_string(child),
                _ => {}
            }
        }
    }
    auth
}
