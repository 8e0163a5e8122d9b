//! 設定モデル
//!
//! [`ProjectFile`] はKDLから読み取ったままの生の値、
//! [`BuildConfig`] はレイヤー解決を経た不変のビルド設定です。

mod build;
mod project;
mod recipe;
mod resource;

pub use build::{BuildConfig, BuildFlags, EngineSettings, RegistryCredentials, RetrySettings};
pub use project::{AuthSection, BuildSection, EngineSection, ProjectFile, PushSection};
pub use recipe::{DockerfileRecipe, Healthcheck};
pub use resource::{DockerDirectory, ResourceSpec};

/// リビジョン文字列を参照する展開キー（`${revision}`）
pub const REVISION_KEY: &str = "revision";

/// ビルドコンテキストのデフォルト位置（プロジェクトルート相対）
pub const DEFAULT_CONTEXT_DIR: &str = "build/docker";

/// ビルドマニフェストのデフォルト出力先（プロジェクトルート相対）
pub const DEFAULT_MANIFEST_PATH: &str = "build/image_info.json";
