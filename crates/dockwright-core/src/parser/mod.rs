//! KDLパーサー
//!
//! dockwright のプロジェクトファイルをパースして [`ProjectFile`] を生成します。
//! ブロックごとのパース処理はモジュールに分離されています。

mod recipe;
mod resource;
mod sections;

use recipe::{parse_env, parse_healthcheck};
use resource::{parse_docker_directory, parse_resource};
use sections::{parse_auth, parse_build, parse_engine, parse_push};

use crate::error::{CoreError, Result};
use crate::model::ProjectFile;
use kdl::{KdlDocument, KdlNode, KdlValue};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// プロジェクトファイルをパース
pub fn parse_project_file<P: AsRef<Path>>(path: P) -> Result<ProjectFile> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| CoreError::ProjectFile {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let mut project = parse_project_string(&content)?;

    // project ノードが無ければディレクトリ名をプロジェクト名にする
    if project.name.is_none() {
        project.name = path
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .map(|s| s.to_string());
    }
    Ok(project)
}

/// KDL文字列をパース
pub fn parse_project_string(content: &str) -> Result<ProjectFile> {
    let doc: KdlDocument = content.parse()?;
    let mut project = ProjectFile::default();

    for node in doc.nodes() {
        match node.name().value() {
            "project" => {
                project.name = first_string(node);
                if let Some(children) = node.children() {
                    for child in children.nodes() {
                        if child.name().value() == "module"
                            && let Some(module) = first_string(child)
                        {
                            project.modules.push(module);
                        }
                    }
                }
            }
            "properties" => {
                project.properties = parse_string_map(node);
            }
            "image" => project.image = first_string(node),
            "tags" | "tag" => project.tags.extend(all_strings(node)),
            "base" => project.recipe.base_image = first_string(node),
            "maintainer" => project.recipe.maintainer = first_string(node),
            "workdir" => project.recipe.workdir = first_string(node),
            "user" => project.recipe.user = first_string(node),
            "entrypoint" => project.recipe.entrypoint = first_string(node),
            "cmd" => project.recipe.cmd = first_string(node),
            "env" | "environment" => parse_env(node, &mut project.recipe.env),
            "expose" => project.recipe.exposes.extend(all_scalars(node)),
            "run" => project.recipe.runs.extend(all_strings(node)),
            "volume" => project.recipe.volumes.extend(all_strings(node)),
            "label" => project.recipe.labels.extend(all_strings(node)),
            "healthcheck" => project.recipe.healthcheck = parse_healthcheck(node),
            "network" => project.network = first_string(node),
            "platform" => project.platform = first_string(node),
            "build_args" => project.build_args = parse_string_map(node),
            "resource" => project.resources.push(parse_resource(node)?),
            "docker_directory" => project.docker_directory = Some(parse_docker_directory(node)?),
            "context" => project.context = first_string(node).map(PathBuf::from),
            "archive" => project.archive = first_string(node).map(PathBuf::from),
            "manifest" => project.manifest = first_string(node).map(PathBuf::from),
            "build" => parse_build(node, &mut project)?,
            "push" => project.push = parse_push(node)?,
            "engine" => project.engine = parse_engine(node)?,
            "auth" => project.auth = parse_auth(node),
            "skip" => project.skip = first_bool(node),
            other => {
                tracing::debug!("Ignoring unknown node: {}", other);
            }
        }
    }

    Ok(project)
}

pub(crate) fn first_string(node: &KdlNode) -> Option<String> {
    node.entries()
        .first()
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
}

pub(crate) fn first_bool(node: &KdlNode) -> Option<bool> {
    node.entries().first().and_then(|e| e.value().as_bool())
}

pub(crate) fn first_u64(node: &KdlNode) -> Result<Option<u64>> {
    let Some(value) = node.entries().first().and_then(|e| e.value().as_integer()) else {
        return Ok(None);
    };
    u64::try_from(value)
        .map(Some)
        .map_err(|_| CoreError::InvalidSetting {
            key: node.name().value().to_string(),
            value: value.to_string(),
        })
}

pub(crate) fn all_strings(node: &KdlNode) -> Vec<String> {
    node.entries()
        .iter()
        .filter(|e| e.name().is_none())
        .filter_map(|e| e.value().as_string().map(|s| s.to_string()))
        .collect()
}

/// 文字列と整数の両方を受け付ける（`expose 8080 "9090/udp"`）
fn all_scalars(node: &KdlNode) -> Vec<String> {
    node.entries()
        .iter()
        .filter(|e| e.name().is_none())
        .filter_map(|e| match e.value() {
            KdlValue::String(s) => Some(s.clone()),
            KdlValue::Integer(i) => Some(i.to_string()),
            _ => None,
        })
        .collect()
}

/// `name { KEY "value" }` 形式のブロックを読む
pub(crate) fn parse_string_map(node: &KdlNode) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    if let Some(children) = node.children() {
        for child in children.nodes() {
            let key = child.name().value().to_string();
            let value = first_string(child).unwrap_or_default();
            map.insert(key, value);
        }
    }
    map
}
