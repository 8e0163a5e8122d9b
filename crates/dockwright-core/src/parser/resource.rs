//! resource / docker_directory ノードのパース

use super::{all_strings, first_string};
use crate::error::{CoreError, Result};
use crate::model::{DockerDirectory, ResourceSpec};
use kdl::KdlNode;

/// resource ノードをパース
pub fn parse_resource(node: &KdlNode) -> Result<ResourceSpec> {
    let directory = first_string(node)
        .ok_or_else(|| CoreError::InvalidConfig("resource requires a directory".to_string()))?;

    let mut spec = ResourceSpec::new(directory);
    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "include" => spec.includes.extend(all_strings(child)),
                "exclude" => spec.excludes.extend(all_strings(child)),
                "target" => spec.target_path = first_string(child),
                _ => {}
            }
        }
    }
    Ok(spec)
}

/// docker_directory ノードをパース
pub fn parse_docker_directory(node: &KdlNode) -> Result<DockerDirectory> {
    let path = first_string(node).ok_or_else(|| {
        CoreError::InvalidConfig("docker_directory requires a path".to_string())
    })?;

    let mut dir = DockerDirectory::new(path);
    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "include" => dir.includes.extend(all_strings(child)),
                "exclude" => dir.excludes.extend(all_strings(child)),
                _ => {}
            }
        }
    }
    Ok(dir)
}
