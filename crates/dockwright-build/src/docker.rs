//! Bollard による [`BuildEngine`] 実装
#![allow(deprecated)] // bollard::image::* の旧オプション構造体を使用

use crate::auth::RegistryAuth;
use crate::context::pack_context;
use crate::dockerfile::DOCKERFILE_NAME;
use crate::engine::{BuildEngine, BuildRequest, PushOutcome};
use crate::error::{EngineError, EngineResult};
use crate::image_name::validate_tag;
use crate::progress::EngineProgress;
use async_trait::async_trait;
use bollard::Docker;
use bollard::image::{BuildImageOptions, PushImageOptions, TagImageOptions};
use bollard::models::{BuildInfo, PushImageInfo};
use bytes::Bytes;
use dockwright_core::{EngineSettings, RegistryCredentials};
use futures_util::stream::{BoxStream, StreamExt};
use http_body_util::{Either, Full};
use std::collections::HashMap;
use std::path::Path;

/// 接続タイムアウト（秒）。read_timeout 未指定時のクライアント既定値
const DEFAULT_TIMEOUT_SECS: u64 = 120;

pub struct DockerEngine {
    docker: Docker,
    auth: RegistryAuth,
    quiet: bool,
}

impl DockerEngine {
    /// 設定に従って Docker デーモンに接続し、ping で疎通を確認する
    ///
    /// - host 未指定: ローカルのデフォルト（unix ソケット / named pipe）
    /// - `unix://...`: 指定ソケット
    /// - `tcp://...` / `http://...`: HTTP
    pub async fn connect(settings: &EngineSettings) -> EngineResult<Self> {
        let docker = match settings.host.as_deref() {
            None => Docker::connect_with_local_defaults()?,
            Some(host) if host.starts_with("unix://") => {
                Docker::connect_with_unix(host, DEFAULT_TIMEOUT_SECS, bollard::API_DEFAULT_VERSION)?
            }
            Some(host) => {
                let addr = host.replacen("tcp://", "http://", 1);
                Docker::connect_with_http(&addr, DEFAULT_TIMEOUT_SECS, bollard::API_DEFAULT_VERSION)?
            }
        };
        let docker = match settings.read_timeout {
            Some(timeout) => docker.with_timeout(timeout),
            None => docker,
        };

        docker.ping().await?;
        tracing::debug!(
            "Connected to Docker at {}",
            settings.host.as_deref().unwrap_or("local default")
        );

        Ok(Self {
            docker,
            auth: RegistryAuth::new(),
            quiet: false,
        })
    }

    pub fn with_credentials(
        mut self,
        credentials: Option<RegistryCredentials>,
        registry_url: Option<String>,
    ) -> Self {
        self.auth = self.auth.with_credentials(credentials, registry_url);
        self
    }

    /// スピナーを表示しない
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    fn progress(&self, action: &str, target: &str) -> EngineProgress {
        if self.quiet {
            EngineProgress::hidden(action)
        } else {
            EngineProgress::new(action, target)
        }
    }

    /// イメージの存在確認（存在すれば ID を返す）
    async fn image_id(&self, reference: &str) -> EngineResult<Option<String>> {
        match self.docker.inspect_image(reference).await {
            Ok(image) => Ok(image.id),
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            }) => Ok(None),
            Err(e) => Err(EngineError::Docker(e)),
        }
    }

    fn handle_build_output(output: BuildInfo, progress: &EngineProgress) -> EngineResult<()> {
        if let Some(error) = output.error {
            return Err(EngineError::BuildFailed(error));
        }

        if let Some(error_detail) = output.error_detail {
            let error_msg = error_detail
                .message
                .unwrap_or_else(|| "Unknown build error".to_string());
            return Err(EngineError::BuildFailed(error_msg));
        }

        if let Some(stream) = output.stream {
            tracing::debug!("{}", stream.trim_end());
            progress.set_message(&stream);
        }

        if let Some(status) = output.status {
            progress.set_message(&status);
        }

        Ok(())
    }

    fn handle_push_progress(info: &PushImageInfo, progress: &EngineProgress) {
        if let Some(status) = &info.status {
            match status.as_str() {
                // 準備中は表示をスキップ（ノイズ軽減）
                "Preparing" | "Waiting" => progress.tick(),
                _ => {
                    let detail = info.progress.as_deref().unwrap_or("");
                    progress.set_message(&format!("{} {}", status, detail));
                }
            }
        }
    }
}

/// プッシュのステータス行からダイジェストを取り出す
///
/// `latest: digest: sha256:abcd... size: 1234` -> `sha256:abcd...`
fn extract_digest(status: &str) -> Option<String> {
    let (_, rest) = status.split_once("digest: ")?;
    rest.split_whitespace()
        .next()
        .filter(|digest| digest.starts_with("sha256:"))
        .map(|digest| digest.to_string())
}

#[async_trait]
impl BuildEngine for DockerEngine {
    async fn build(&self, context: &Path, request: &BuildRequest) -> EngineResult<String> {
        tracing::info!("Building image {}", request.image);

        let context_data = pack_context(context)?;
        let build_args: HashMap<String, String> = request
            .build_args
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let options = BuildImageOptions::<String> {
            dockerfile: DOCKERFILE_NAME.to_string(),
            t: request.image.clone(),
            buildargs: build_args,
            nocache: request.no_cache,
            rm: !request.keep_containers,
            forcerm: !request.keep_containers,
            pull: request.pull,
            q: request.quiet,
            networkmode: request.network.clone().unwrap_or_default(),
            platform: request.platform.clone().unwrap_or_default(),
            ..Default::default()
        };
        tracing::debug!("Build options: {:?}", options);

        let body = Full::new(Bytes::from(context_data));
        let mut stream = self
            .docker
            .build_image(options, None, Some(Either::Left(body)));

        let progress = self.progress("Building", &request.image);
        while let Some(msg) = stream.next().await {
            let result = msg
                .map_err(EngineError::Docker)
                .and_then(|output| Self::handle_build_output(output, &progress));
            if let Err(e) = result {
                progress.finish_error(&e.to_string());
                return Err(e);
            }
        }

        let image_id = self.image_id(&request.image).await?.ok_or_else(|| {
            EngineError::BuildFailed(format!("built image {} not found", request.image))
        })?;
        progress.finish_success(&format!("Built {}", request.image));
        tracing::info!("Built {} ({})", request.image, image_id);
        Ok(image_id)
    }

    async fn tag(&self, image: &str, repo: &str, tag: &str, force: bool) -> EngineResult<()> {
        validate_tag(tag)?;
        let target = format!("{}:{}", repo, tag);

        if !force
            && let Some(existing) = self.image_id(&target).await?
            && existing != image
        {
            return Err(EngineError::TagConflict { target });
        }

        tracing::info!("Tagging {} with {}", image, target);
        let options = TagImageOptions::<String> {
            repo: repo.to_string(),
            tag: tag.to_string(),
        };
        self.docker.tag_image(image, Some(options)).await?;
        Ok(())
    }

    async fn push(&self, repo: &str, tag: &str) -> EngineResult<PushOutcome> {
        validate_tag(tag)?;
        let full_image = format!("{}:{}", repo, tag);
        tracing::info!("Pushing {}", full_image);

        let credentials = self.auth.get_credentials(&full_image)?;
        let options = PushImageOptions::<String> {
            tag: tag.to_string(),
        };
        let mut stream = self.docker.push_image(repo, Some(options), credentials);

        let progress = self.progress("Pushing", &full_image);
        let mut outcome = PushOutcome::default();
        while let Some(result) = stream.next().await {
            let info = match result {
                Ok(info) => info,
                Err(e) => {
                    progress.finish_error(&e.to_string());
                    return Err(EngineError::PushFailed {
                        image: full_image,
                        message: e.to_string(),
                    });
                }
            };

            if let Some(err) = info.error {
                progress.finish_error(&err);
                return Err(EngineError::PushFailed {
                    image: full_image,
                    message: err,
                });
            }
            if let Some(digest) = info.status.as_deref().and_then(extract_digest) {
                outcome.digest = Some(digest);
            }
            Self::handle_push_progress(&info, &progress);
        }

        progress.finish_success(&format!("Pushed {}", full_image));
        Ok(outcome)
    }

    fn save<'a>(&'a self, image: &'a str) -> BoxStream<'a, EngineResult<Bytes>> {
        tracing::info!("Saving image {}", image);
        self.docker
            .export_image(image)
            .map(|chunk| chunk.map_err(EngineError::Docker))
            .boxed()
    }
}
