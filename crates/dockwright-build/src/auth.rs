//! レジストリ認証処理
//!
//! 明示的に解決済みの認証情報（auth ブロック → プロパティ → 環境変数）を優先し、
//! 無ければ Docker config.json の auths / credential helper から取得して
//! Bollard の DockerCredentials に変換します。

use crate::error::{EngineError, EngineResult};
use base64::Engine;
use bollard::auth::DockerCredentials;
use dockwright_core::RegistryCredentials;
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

/// Docker config.json の構造
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DockerConfig {
    #[serde(default)]
    auths: HashMap<String, AuthEntry>,
    /// credential helper 名 (例: "osxkeychain", "desktop")
    #[serde(default)]
    creds_store: Option<String>,
    /// レジストリごとの credential helper
    #[serde(default)]
    cred_helpers: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct AuthEntry {
    /// Base64エンコードされた "username:password"
    auth: Option<String>,
}

/// credential helper からのレスポンス
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CredentialResponse {
    username: String,
    secret: String,
}

/// レジストリ認証を管理
#[derive(Debug, Clone)]
pub struct RegistryAuth {
    config_path: PathBuf,
    explicit: Option<RegistryCredentials>,
    registry_url: Option<String>,
}

impl Default for RegistryAuth {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryAuth {
    /// デフォルトで ~/.docker/config.json を使用（DOCKER_CONFIG を優先）
    pub fn new() -> Self {
        let config_path = std::env::var("DOCKER_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::home_dir()
                    .map(|h| h.join(".docker"))
                    .unwrap_or_else(|| PathBuf::from(".docker"))
            })
            .join("config.json");

        Self {
            config_path,
            explicit: None,
            registry_url: None,
        }
    }

    pub fn with_config_path(mut self, config_path: PathBuf) -> Self {
        self.config_path = config_path;
        self
    }

    /// レイヤー解決済みの認証情報を設定
    pub fn with_credentials(
        mut self,
        credentials: Option<RegistryCredentials>,
        registry_url: Option<String>,
    ) -> Self {
        self.explicit = credentials;
        self.registry_url = registry_url;
        self
    }

    /// イメージ名からレジストリの認証情報を取得
    ///
    /// * `Ok(Some(credentials))` - 認証情報が見つかった場合
    /// * `Ok(None)` - 認証なしで続行
    /// * `Err(e)` - config.json の読み込みや解釈に失敗した場合
    pub fn get_credentials(&self, image: &str) -> EngineResult<Option<DockerCredentials>> {
        let registry = self
            .registry_url
            .clone()
            .unwrap_or_else(|| extract_registry(image));

        if let Some(creds) = &self.explicit {
            tracing::debug!("Using configured credentials for {}", registry);
            let mut resolved =
                credentials(&registry, creds.username.clone(), creds.password.clone());
            resolved.email = creds.email.clone();
            return Ok(Some(resolved));
        }

        if !self.config_path.is_file() {
            tracing::debug!("No docker config at {}", self.config_path.display());
            return Ok(None);
        }

        let config = self.load_docker_config()?;

        if let Some(encoded) = config.auths.get(&registry).and_then(|e| e.auth.as_deref())
            && let Some(creds) = decode_auth(encoded, &registry)?
        {
            tracing::debug!("Using docker config auths entry for {}", registry);
            return Ok(Some(creds));
        }

        // レジストリ個別の credHelpers → 全体の credsStore
        let helper = config
            .cred_helpers
            .get(&registry)
            .or(config.creds_store.as_ref());
        if let Some(helper) = helper {
            tracing::debug!("Asking credential helper '{}' for {}", helper, registry);
            match get_from_helper(helper, &registry) {
                Ok(Some(creds)) => return Ok(Some(creds)),
                Ok(None) => {}
                Err(e) => tracing::debug!("Credential helper unavailable: {}", e),
            }
        }

        tracing::debug!("Pushing to {} without credentials", registry);
        Ok(None)
    }

    fn load_docker_config(&self) -> EngineResult<DockerConfig> {
        let location = self.config_path.display().to_string();
        let content = std::fs::read_to_string(&self.config_path)
            .map_err(|e| auth_error(&location, format!("cannot read docker config: {}", e)))?;
        serde_json::from_str(&content)
            .map_err(|e| auth_error(&location, format!("malformed docker config: {}", e)))
    }
}

fn auth_error(registry: &str, message: String) -> EngineError {
    EngineError::AuthFailed {
        registry: registry.to_string(),
        message,
    }
}

fn credentials(registry: &str, username: String, password: String) -> DockerCredentials {
    DockerCredentials {
        username: Some(username),
        password: Some(password),
        serveraddress: Some(registry.to_string()),
        ..Default::default()
    }
}

/// イメージ名からレジストリを抽出
///
/// # Examples
/// - `ghcr.io/org/app:tag` -> `ghcr.io`
/// - `myuser/app:tag` -> `docker.io`
/// - `localhost:5000/app` -> `localhost:5000`
pub fn extract_registry(image: &str) -> String {
    match image.split_once('/') {
        // `.` か `:` を含むか localhost ならレジストリ
        Some((host, _)) if host.contains(['.', ':']) || host == "localhost" => host.to_string(),
        _ => DOCKER_HUB.to_string(),
    }
}

const DOCKER_HUB: &str = "docker.io";

/// auths の `auth` フィールド（base64 の `user:password`）
fn decode_auth(encoded: &str, registry: &str) -> EngineResult<Option<DockerCredentials>> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| auth_error(registry, format!("auth entry is not base64: {}", e)))?;
    let pair = String::from_utf8(bytes)
        .map_err(|e| auth_error(registry, format!("auth entry is not UTF-8: {}", e)))?;

    Ok(pair.split_once(':').map(|(username, password)| {
        credentials(registry, username.to_string(), password.to_string())
    }))
}

/// `docker-credential-<helper> get` を実行する
///
/// ヘルパーが非ゼロで終了した場合は「認証情報なし」として扱う。
fn get_from_helper(helper: &str, registry: &str) -> EngineResult<Option<DockerCredentials>> {
    let program = format!("docker-credential-{}", helper);

    let mut child = Command::new(&program)
        .arg("get")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| auth_error(registry, format!("cannot start {}: {}", program, e)))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(registry.as_bytes()).ok();
    }

    let output = child
        .wait_with_output()
        .map_err(|e| auth_error(registry, format!("{} did not finish: {}", program, e)))?;

    if !output.status.success() {
        tracing::debug!(
            "{} has no credentials for {}: {}",
            program,
            registry,
            String::from_utf8_lossy(&output.stderr).trim()
        );
        return Ok(None);
    }

    let response: CredentialResponse = serde_json::from_slice(&output.stdout)
        .map_err(|e| auth_error(registry, format!("unexpected {} output: {}", program, e)))?;
    Ok(Some(credentials(
        registry,
        response.username,
        response.secret,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn auth_with_config(content: &str) -> (tempfile::TempDir, RegistryAuth) {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("config.json");
        fs::write(&path, content).unwrap();
        let auth = RegistryAuth::new().with_config_path(path);
        (temp, auth)
    }

    #[test]
    fn test_extract_registry() {
        assert_eq!(extract_registry("ghcr.io/org/app:v1.0"), "ghcr.io");
        assert_eq!(extract_registry("myuser/app:latest"), "docker.io");
        assert_eq!(extract_registry("nginx"), "docker.io");
        assert_eq!(extract_registry("localhost:5000/myapp"), "localhost:5000");
        assert_eq!(extract_registry("localhost/myapp"), "localhost");
        assert_eq!(
            extract_registry("123456789.dkr.ecr.ap-northeast-1.amazonaws.com/app"),
            "123456789.dkr.ecr.ap-northeast-1.amazonaws.com"
        );
    }

    #[test]
    fn test_explicit_credentials_win() {
        let (_temp, auth) = auth_with_config(r#"{"auths": {"ghcr.io": {"auth": "dTpw"}}}"#);
        let auth = auth.with_credentials(
            Some(RegistryCredentials {
                username: "ci".to_string(),
                password: "token".to_string(),
                email: Some("ci@example.com".to_string()),
            }),
            None,
        );

        let creds = auth.get_credentials("ghcr.io/org/app").unwrap().unwrap();
        assert_eq!(creds.username.as_deref(), Some("ci"));
        assert_eq!(creds.email.as_deref(), Some("ci@example.com"));
        assert_eq!(creds.serveraddress.as_deref(), Some("ghcr.io"));
    }

    #[test]
    fn test_registry_url_overrides_image_registry() {
        let auth = RegistryAuth::new()
            .with_config_path(PathBuf::from("/nonexistent/config.json"))
            .with_credentials(
                Some(RegistryCredentials {
                    username: "u".to_string(),
                    password: "p".to_string(),
                    email: None,
                }),
                Some("https://registry.example.com/v2/".to_string()),
            );

        let creds = auth.get_credentials("team/app").unwrap().unwrap();
        assert_eq!(
            creds.serveraddress.as_deref(),
            Some("https://registry.example.com/v2/")
        );
    }

    #[test]
    fn test_credentials_from_config_auths() {
        // "user:secret"
        let (_temp, auth) =
            auth_with_config(r#"{"auths": {"ghcr.io": {"auth": "dXNlcjpzZWNyZXQ="}}}"#);

        let creds = auth.get_credentials("ghcr.io/org/app:1").unwrap().unwrap();
        assert_eq!(creds.username.as_deref(), Some("user"));
        assert_eq!(creds.password.as_deref(), Some("secret"));
    }

    #[test]
    fn test_no_config_means_no_auth() {
        let auth =
            RegistryAuth::new().with_config_path(PathBuf::from("/nonexistent/config.json"));
        assert!(auth.get_credentials("ghcr.io/org/app").unwrap().is_none());
    }

    #[test]
    fn test_broken_config_is_error() {
        let (_temp, auth) = auth_with_config("{not json");
        let result = auth.get_credentials("ghcr.io/org/app");
        assert!(matches!(result, Err(EngineError::AuthFailed { .. })));
    }
}
