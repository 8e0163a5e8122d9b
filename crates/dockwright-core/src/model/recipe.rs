use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Dockerfile 生成に使う設定
///
/// `env` はキー順、`exposes` は重複なしの辞書順で保持する。
/// それ以外のリストは宣言順。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DockerfileRecipe {
    pub base_image: Option<String>,
    pub maintainer: Option<String>,
    pub env: BTreeMap<String, String>,
    pub workdir: Option<String>,
    pub runs: Vec<String>,
    /// RUN を1命令にまとめる
    pub squash_runs: bool,
    pub healthcheck: Option<Healthcheck>,
    pub exposes: BTreeSet<String>,
    pub user: Option<String>,
    pub entrypoint: Option<String>,
    pub cmd: Option<String>,
    pub volumes: Vec<String>,
    pub labels: Vec<String>,
}

/// HEALTHCHECK 命令
///
/// ```kdl
/// healthcheck {
///     options "--interval=30s --timeout=3s"
///     cmd "curl -f http://localhost/ || exit 1"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Healthcheck {
    pub options: Option<String>,
    pub cmd: String,
}
