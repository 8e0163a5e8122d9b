use super::recipe::DockerfileRecipe;
use super::resource::{DockerDirectory, ResourceSpec};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// KDL から読み取ったままのプロジェクト定義
///
/// 値はまだ展開もレイヤー解決もされていない。
/// [`crate::resolve_build_config`] で [`super::BuildConfig`] に変換する。
#[derive(Debug, Clone, Default)]
pub struct ProjectFile {
    pub name: Option<String>,
    /// 子モジュール（1つでもあれば集約プロジェクト）
    pub modules: Vec<String>,
    pub properties: BTreeMap<String, String>,
    pub image: Option<String>,
    pub tags: Vec<String>,
    pub recipe: DockerfileRecipe,
    pub network: Option<String>,
    pub platform: Option<String>,
    pub build_args: BTreeMap<String, String>,
    pub resources: Vec<ResourceSpec>,
    pub docker_directory: Option<DockerDirectory>,
    pub context: Option<PathBuf>,
    pub archive: Option<PathBuf>,
    pub manifest: Option<PathBuf>,
    pub build: BuildSection,
    pub push: PushSection,
    pub engine: EngineSection,
    pub auth: AuthSection,
    pub skip: Option<bool>,
}

/// `build { ... }` ブロック
#[derive(Debug, Clone, Default)]
pub struct BuildSection {
    pub pull: bool,
    pub no_cache: bool,
    pub keep_containers: bool,
    pub quiet: bool,
    pub use_revision_tag: bool,
    pub force_tags: bool,
    pub require_revision: bool,
    pub skip: Option<bool>,
}

/// `push { ... }` ブロック
#[derive(Debug, Clone, Default)]
pub struct PushSection {
    pub image: bool,
    pub tags_only: bool,
    pub retries: Option<u32>,
    /// ミリ秒
    pub retry_delay: Option<u64>,
    pub skip: Option<bool>,
}

/// `engine { ... }` ブロック
#[derive(Debug, Clone, Default)]
pub struct EngineSection {
    pub host: Option<String>,
    /// ミリ秒（0 はクライアントのデフォルト）
    pub read_timeout: Option<u64>,
}

/// `auth { ... }` ブロック
#[derive(Debug, Clone, Default)]
pub struct AuthSection {
    pub username: Option<String>,
    pub password: Option<String>,
    pub email: Option<String>,
    pub registry: Option<String>,
}
