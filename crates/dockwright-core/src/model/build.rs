use super::recipe::DockerfileRecipe;
use super::resource::{DockerDirectory, ResourceSpec};
use super::REVISION_KEY;
use crate::resolve::SettingKey;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// 1回のビルドで使う設定のスナップショット
///
/// オーケストレーション開始時に一度だけ解決され、以降は読み取り専用。
/// 例外は `image_name` と `recipe.base_image` で、リビジョン解決の直後に
/// 一度だけ変数展開される（展開はコピーに対して行う）。
#[derive(Debug, Clone, Serialize)]
pub struct BuildConfig {
    pub project_name: String,
    pub project_root: PathBuf,
    pub modules: Vec<String>,
    /// 変数展開テーブルの元になるプロジェクトプロパティ
    ///
    /// シリアライズ時は認証情報のキーの値を伏せる。
    #[serde(serialize_with = "serialize_properties")]
    pub properties: BTreeMap<String, String>,
    /// イメージ名テンプレート（`name[:tag]`）
    pub image_name: String,
    pub tags: Vec<String>,
    pub recipe: DockerfileRecipe,
    pub network: Option<String>,
    pub platform: Option<String>,
    pub build_args: BTreeMap<String, String>,
    pub resources: Vec<ResourceSpec>,
    pub docker_directory: Option<DockerDirectory>,
    pub context_dir: PathBuf,
    pub archive_path: Option<PathBuf>,
    pub manifest_path: PathBuf,
    pub flags: BuildFlags,
    pub retry: RetrySettings,
    pub engine: EngineSettings,
    #[serde(skip)]
    pub credentials: Option<RegistryCredentials>,
    pub registry_url: Option<String>,
}

impl BuildConfig {
    /// 子モジュールを持つ集約プロジェクトか
    pub fn is_aggregator(&self) -> bool {
        !self.modules.is_empty()
    }

    /// リビジョン情報が取得できないとビルドできない設定か
    pub fn requires_revision(&self) -> bool {
        self.flags.require_revision || self.revision_in_image()
    }

    /// イメージ名またはタグがリビジョンに依存するか
    pub fn revision_in_image(&self) -> bool {
        self.flags.use_revision_tag || self.image_name.contains(&format!("${{{}}}", REVISION_KEY))
    }
}

/// 伏せ字
const REDACTED: &str = "***";

/// 認証情報を持つプロパティか
fn is_credential_property(key: &str) -> bool {
    [SettingKey::USERNAME, SettingKey::PASSWORD, SettingKey::EMAIL]
        .iter()
        .any(|setting| setting.property == key)
}

fn serialize_properties<S>(
    properties: &BTreeMap<String, String>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_map(properties.iter().map(|(key, value)| {
        let value = if is_credential_property(key) {
            REDACTED
        } else {
            value.as_str()
        };
        (key, value)
    }))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BuildFlags {
    pub skip: bool,
    pub skip_build: bool,
    pub skip_push: bool,
    pub pull_on_build: bool,
    pub no_cache: bool,
    pub keep_containers: bool,
    pub quiet: bool,
    pub use_revision_tag: bool,
    pub force_tags: bool,
    pub push_image: bool,
    pub push_tags_only: bool,
    pub require_revision: bool,
}

/// プッシュのリトライ設定（固定間隔）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RetrySettings {
    pub count: u32,
    pub delay: Duration,
}

impl RetrySettings {
    pub const DEFAULT_COUNT: u32 = 5;
    pub const DEFAULT_DELAY_MS: u64 = 10_000;
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            count: Self::DEFAULT_COUNT,
            delay: Duration::from_millis(Self::DEFAULT_DELAY_MS),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EngineSettings {
    /// `unix:///var/run/docker.sock` や `tcp://host:2375`
    pub host: Option<String>,
    /// None はクライアントのデフォルト
    pub read_timeout: Option<Duration>,
}

/// レジストリ認証情報
#[derive(Clone, PartialEq, Eq)]
pub struct RegistryCredentials {
    pub username: String,
    pub password: String,
    pub email: Option<String>,
}

impl fmt::Debug for RegistryCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryCredentials")
            .field("username", &self.username)
            .field("password", &"***")
            .field("email", &self.email)
            .finish()
    }
}
