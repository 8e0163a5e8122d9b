//! 設定のレイヤー解決
//!
//! 優先順位:
//! 1. プロジェクトファイルの明示的な値
//! 2. プロジェクトプロパティ（`properties { }` ブロック + CLI の `-P`）
//! 3. 環境変数
//!
//! 値はオーケストレーション開始時に一度だけ解決され、[`BuildConfig`] に固定される。

use crate::error::{CoreError, Result};
use crate::model::{
    AuthSection, BuildConfig, BuildFlags, DEFAULT_CONTEXT_DIR, DEFAULT_MANIFEST_PATH,
    EngineSettings, ProjectFile, RegistryCredentials, RetrySettings,
};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// プロパティキーと環境変数名の組
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettingKey {
    pub property: &'static str,
    pub env: &'static str,
}

impl SettingKey {
    pub const USERNAME: Self = Self::new("docker.username", "DOCKER_USERNAME");
    pub const PASSWORD: Self = Self::new("docker.password", "DOCKER_PASSWORD");
    pub const EMAIL: Self = Self::new("docker.email", "DOCKER_EMAIL");
    pub const REGISTRY_URL: Self = Self::new("docker.registryUrl", "DOCKER_REGISTRY_URL");
    pub const HOST: Self = Self::new("docker.host", "DOCKER_HOST");
    pub const READ_TIMEOUT: Self = Self::new("docker.readTimeout", "DOCKWRIGHT_READ_TIMEOUT");
    pub const RETRY_COUNT: Self =
        Self::new("docker.retryPushCount", "DOCKWRIGHT_RETRY_PUSH_COUNT");
    pub const RETRY_DELAY: Self =
        Self::new("docker.retryPushDelay", "DOCKWRIGHT_RETRY_PUSH_DELAY");
    pub const SKIP: Self = Self::new("docker.skip", "DOCKWRIGHT_SKIP");
    pub const SKIP_BUILD: Self = Self::new("docker.skipBuild", "DOCKWRIGHT_SKIP_BUILD");
    pub const SKIP_PUSH: Self = Self::new("docker.skipPush", "DOCKWRIGHT_SKIP_PUSH");

    pub const fn new(property: &'static str, env: &'static str) -> Self {
        Self { property, env }
    }
}

/// 最初に見つかった空でない値を返す
pub fn resolve_layered(
    explicit: Option<&str>,
    property: Option<&str>,
    env: Option<&str>,
) -> Option<String> {
    [explicit, property, env]
        .into_iter()
        .flatten()
        .find(|v| !v.trim().is_empty())
        .map(|v| v.to_string())
}

/// プロジェクトプロパティと環境変数のスナップショット
#[derive(Debug, Clone, Default)]
pub struct Layers {
    properties: BTreeMap<String, String>,
    env: HashMap<String, String>,
}

impl Layers {
    pub fn new(properties: BTreeMap<String, String>, env: HashMap<String, String>) -> Self {
        Self { properties, env }
    }

    /// 現在のプロセス環境を取り込む
    pub fn with_process_env(properties: BTreeMap<String, String>) -> Self {
        Self::new(properties, std::env::vars().collect())
    }

    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    pub fn get(&self, explicit: Option<&str>, key: SettingKey) -> Option<String> {
        resolve_layered(
            explicit,
            self.properties.get(key.property).map(String::as_str),
            self.env.get(key.env).map(String::as_str),
        )
    }

    /// 型付きの値を解決する（明示値はパース済みなのでそのまま使う）
    pub fn get_parsed<T: FromStr>(&self, explicit: Option<T>, key: SettingKey) -> Result<Option<T>> {
        if explicit.is_some() {
            return Ok(explicit);
        }
        match self.get(None, key) {
            Some(raw) => raw
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| CoreError::InvalidSetting {
                    key: key.property.to_string(),
                    value: raw,
                }),
            None => Ok(None),
        }
    }

    pub fn get_flag(&self, explicit: Option<bool>, key: SettingKey) -> Result<bool> {
        if let Some(value) = explicit {
            return Ok(value);
        }
        match self.get(None, key) {
            Some(raw) => parse_flag(&raw).ok_or_else(|| CoreError::InvalidSetting {
                key: key.property.to_string(),
                value: raw,
            }),
            None => Ok(false),
        }
    }

    /// 認証情報を解決
    ///
    /// フィールド単位ではなくレイヤー単位で選ぶ。ユーザー名とパスワードが
    /// 両方揃った最初のレイヤーを採用し、どこにも無ければ認証なし。
    pub fn credentials(&self, auth: &AuthSection) -> Option<RegistryCredentials> {
        let explicit = (
            auth.username.clone(),
            auth.password.clone(),
            auth.email.clone(),
        );
        let lookup = |source: &dyn Fn(&str, &str) -> Option<String>| {
            (
                source(SettingKey::USERNAME.property, SettingKey::USERNAME.env),
                source(SettingKey::PASSWORD.property, SettingKey::PASSWORD.env),
                source(SettingKey::EMAIL.property, SettingKey::EMAIL.env),
            )
        };
        let from_properties = lookup(&|prop, _| self.properties.get(prop).cloned());
        let from_env = lookup(&|_, env| self.env.get(env).map(|v| v.trim().to_string()));

        [explicit, from_properties, from_env]
            .into_iter()
            .find_map(|(username, password, email)| {
                let username = username.filter(|v| !v.trim().is_empty())?;
                let password = password.filter(|v| !v.trim().is_empty())?;
                Some(RegistryCredentials {
                    username,
                    password,
                    email: email.filter(|v| !v.trim().is_empty()),
                })
            })
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn absolutize(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

/// プロジェクトファイルを不変のビルド設定に解決する
pub fn resolve_build_config(
    project: ProjectFile,
    root: &Path,
    layers: &Layers,
) -> Result<BuildConfig> {
    let flags = BuildFlags {
        skip: layers.get_flag(project.skip, SettingKey::SKIP)?,
        skip_build: layers.get_flag(project.build.skip, SettingKey::SKIP_BUILD)?,
        skip_push: layers.get_flag(project.push.skip, SettingKey::SKIP_PUSH)?,
        pull_on_build: project.build.pull,
        no_cache: project.build.no_cache,
        keep_containers: project.build.keep_containers,
        quiet: project.build.quiet,
        use_revision_tag: project.build.use_revision_tag,
        force_tags: project.build.force_tags,
        push_image: project.push.image,
        push_tags_only: project.push.tags_only,
        require_revision: project.build.require_revision,
    };

    // 集約プロジェクトやスキップ時はビルドしないので image は不要
    let image_name = match project.image.filter(|s| !s.trim().is_empty()) {
        Some(image) => image,
        None if !project.modules.is_empty() || flags.skip || flags.skip_build => String::new(),
        None => return Err(CoreError::MissingImage),
    };

    let retry = RetrySettings {
        count: layers
            .get_parsed(project.push.retries, SettingKey::RETRY_COUNT)?
            .unwrap_or(RetrySettings::DEFAULT_COUNT),
        delay: Duration::from_millis(
            layers
                .get_parsed(project.push.retry_delay, SettingKey::RETRY_DELAY)?
                .unwrap_or(RetrySettings::DEFAULT_DELAY_MS),
        ),
    };

    let engine = EngineSettings {
        host: layers.get(project.engine.host.as_deref(), SettingKey::HOST),
        read_timeout: layers
            .get_parsed(project.engine.read_timeout, SettingKey::READ_TIMEOUT)?
            .filter(|ms: &u64| *ms > 0)
            .map(Duration::from_millis),
    };

    let credentials = layers.credentials(&project.auth);
    let registry_url = layers.get(project.auth.registry.as_deref(), SettingKey::REGISTRY_URL);

    let resources = project
        .resources
        .into_iter()
        .map(|mut spec| {
            spec.directory = absolutize(root, &spec.directory);
            spec
        })
        .collect();
    let docker_directory = project.docker_directory.map(|mut dir| {
        dir.path = absolutize(root, &dir.path);
        dir
    });

    let context_dir = absolutize(
        root,
        project
            .context
            .as_deref()
            .unwrap_or(Path::new(DEFAULT_CONTEXT_DIR)),
    );
    let manifest_path = absolutize(
        root,
        project
            .manifest
            .as_deref()
            .unwrap_or(Path::new(DEFAULT_MANIFEST_PATH)),
    );
    let archive_path = project.archive.as_deref().map(|p| absolutize(root, p));

    let project_name = project.name.unwrap_or_else(|| {
        root.file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unnamed")
            .to_string()
    });

    tracing::debug!(
        "Resolved build config for {}: image={}, context={}",
        project_name,
        image_name,
        context_dir.display()
    );

    Ok(BuildConfig {
        project_name,
        project_root: root.to_path_buf(),
        modules: project.modules,
        properties: layers.properties().clone(),
        image_name,
        tags: project.tags,
        recipe: project.recipe,
        network: project.network,
        platform: project.platform,
        build_args: project.build_args,
        resources,
        docker_directory,
        context_dir,
        archive_path,
        manifest_path,
        flags,
        retry,
        engine,
        credentials,
        registry_url,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_project_string;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn props(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_resolve_layered_priority() {
        assert_eq!(
            resolve_layered(Some("a"), Some("b"), Some("c")),
            Some("a".to_string())
        );
        assert_eq!(
            resolve_layered(None, Some("b"), Some("c")),
            Some("b".to_string())
        );
        assert_eq!(resolve_layered(None, None, Some("c")), Some("c".to_string()));
        assert_eq!(resolve_layered(None, None, None), None);
    }

    #[test]
    fn test_resolve_layered_skips_blank_values() {
        assert_eq!(
            resolve_layered(Some("  "), Some(""), Some("c")),
            Some("c".to_string())
        );
    }

    #[test]
    fn test_flag_from_env() {
        let layers = Layers::new(BTreeMap::new(), env(&[("DOCKWRIGHT_SKIP_PUSH", "TRUE")]));
        assert!(layers.get_flag(None, SettingKey::SKIP_PUSH).unwrap());
        assert!(!layers.get_flag(Some(false), SettingKey::SKIP_PUSH).unwrap());
        assert!(!layers.get_flag(None, SettingKey::SKIP_BUILD).unwrap());
    }

    #[test]
    fn test_invalid_flag_is_error() {
        let layers = Layers::new(props(&[("docker.skip", "maybe")]), HashMap::new());
        let result = layers.get_flag(None, SettingKey::SKIP);
        assert!(matches!(result, Err(CoreError::InvalidSetting { .. })));
    }

    #[test]
    fn test_parsed_value_from_properties() {
        let layers = Layers::new(
            props(&[("docker.retryPushCount", "2")]),
            env(&[("DOCKWRIGHT_RETRY_PUSH_COUNT", "9")]),
        );
        let count: Option<u32> = layers.get_parsed(None, SettingKey::RETRY_COUNT).unwrap();
        assert_eq!(count, Some(2));
    }

    #[test]
    fn test_credentials_explicit_wins() {
        let layers = Layers::new(
            props(&[("docker.username", "prop"), ("docker.password", "prop-pw")]),
            env(&[("DOCKER_USERNAME", "env"), ("DOCKER_PASSWORD", "env-pw")]),
        );
        let auth = AuthSection {
            username: Some("explicit".to_string()),
            password: Some("explicit-pw".to_string()),
            ..Default::default()
        };
        let creds = layers.credentials(&auth).unwrap();
        assert_eq!(creds.username, "explicit");
        assert_eq!(creds.password, "explicit-pw");
    }

    #[test]
    fn test_credentials_are_not_mixed_across_layers() {
        // 明示設定はユーザー名だけなので不完全。プロパティ層が丸ごと採用される
        let layers = Layers::new(
            props(&[
                ("docker.username", "prop"),
                ("docker.password", "prop-pw"),
                ("docker.email", "prop@example.com"),
            ]),
            HashMap::new(),
        );
        let auth = AuthSection {
            username: Some("explicit".to_string()),
            ..Default::default()
        };
        let creds = layers.credentials(&auth).unwrap();
        assert_eq!(creds.username, "prop");
        assert_eq!(creds.email.as_deref(), Some("prop@example.com"));
    }

    #[test]
    fn test_credentials_from_env() {
        let layers = Layers::new(
            BTreeMap::new(),
            env(&[("DOCKER_USERNAME", " ci "), ("DOCKER_PASSWORD", "secret")]),
        );
        let creds = layers.credentials(&AuthSection::default()).unwrap();
        assert_eq!(creds.username, "ci");
        assert_eq!(creds.password, "secret");
        assert_eq!(creds.email, None);
    }

    #[test]
    fn test_no_credentials_anywhere() {
        let layers = Layers::default();
        assert!(layers.credentials(&AuthSection::default()).is_none());
    }

    #[test]
    fn test_resolve_build_config_defaults() {
        let project = parse_project_string(
            r#"
            image "example/app:1.0"
            base "alpine"
            resource "build/libs"
            "#,
        )
        .unwrap();
        let root = Path::new("/work/app");
        let config = resolve_build_config(project, root, &Layers::default()).unwrap();

        assert_eq!(config.project_name, "app");
        assert_eq!(config.context_dir, root.join("build/docker"));
        assert_eq!(config.manifest_path, root.join("build/image_info.json"));
        assert_eq!(config.archive_path, None);
        assert_eq!(config.resources[0].directory, root.join("build/libs"));
        assert_eq!(config.retry, RetrySettings::default());
        assert_eq!(config.engine.read_timeout, None);
        assert!(config.credentials.is_none());
        assert!(!config.flags.skip);
    }

    #[test]
    fn test_resolve_build_config_layers() {
        let project = parse_project_string(
            r#"
            image "example/app"
            push { retries 2; }
            engine { read_timeout 45000; }
            "#,
        )
        .unwrap();
        let layers = Layers::new(
            props(&[("docker.retryPushDelay", "250"), ("docker.skipBuild", "true")]),
            env(&[("DOCKER_HOST", "tcp://10.0.0.1:2375")]),
        );
        let config = resolve_build_config(project, Path::new("/p"), &layers).unwrap();

        assert_eq!(config.retry.count, 2);
        assert_eq!(config.retry.delay, Duration::from_millis(250));
        assert_eq!(config.engine.host.as_deref(), Some("tcp://10.0.0.1:2375"));
        assert_eq!(config.engine.read_timeout, Some(Duration::from_millis(45000)));
        assert!(config.flags.skip_build);
    }

    #[test]
    fn test_resolve_build_config_requires_image() {
        let project = parse_project_string(r#"base "alpine""#).unwrap();
        let result = resolve_build_config(project, Path::new("/p"), &Layers::default());
        assert!(matches!(result, Err(CoreError::MissingImage)));
    }

    #[test]
    fn test_aggregator_does_not_need_image() {
        let project = parse_project_string(
            r#"
            project "platform" {
                module "api"
            }
            "#,
        )
        .unwrap();
        let config = resolve_build_config(project, Path::new("/p"), &Layers::default()).unwrap();
        assert!(config.is_aggregator());
        assert!(config.image_name.is_empty());
    }

    #[test]
    fn test_requires_revision() {
        let project = parse_project_string(r#"image "example/app:${revision}""#).unwrap();
        let config = resolve_build_config(project, Path::new("/p"), &Layers::default()).unwrap();
        assert!(config.requires_revision());

        let project = parse_project_string(r#"image "example/app:1.0""#).unwrap();
        let config = resolve_build_config(project, Path::new("/p"), &Layers::default()).unwrap();
        assert!(!config.requires_revision());
    }
}
