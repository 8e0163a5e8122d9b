//! ビルドパイプラインのオーケストレーション
//!
//! `revision → validate → stage → build → tag → push → archive → manifest`
//! の順に実行する。[`Orchestrator::execute`] 全体は1つのロックで直列化され、
//! 同一プロセス内で2つのビルドがビルドコンテキストを奪い合うことはない。

use crate::dockerfile::{DOCKERFILE_NAME, synthesize, write_dockerfile};
use crate::engine::{BuildEngine, BuildRequest, PushOutcome};
use crate::error::{BuildError, BuildResult, PipelineStep};
use crate::expand::{expand, expansion_table};
use crate::image_name::{ImageReference, parse_image_name};
use crate::manifest::BuildManifest;
use crate::retry::RetryPolicy;
use crate::revision::{RevisionInfo, RevisionResolver};
use crate::stager::{StagedPaths, stage};
use dockwright_core::BuildConfig;
use futures_util::StreamExt;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// ビルドをスキップした理由
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// `skip`
    Disabled,
    /// `build.skip`
    BuildDisabled,
    /// 子モジュールを持つ集約プロジェクト
    Aggregator,
    /// docker_directory に Dockerfile が無い
    MissingDockerfile(PathBuf),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Disabled => write!(f, "skip is set"),
            SkipReason::BuildDisabled => write!(f, "build skip is set"),
            SkipReason::Aggregator => write!(f, "aggregator project has nothing to build"),
            SkipReason::MissingDockerfile(path) => {
                write!(f, "no Dockerfile at {}", path.display())
            }
        }
    }
}

/// エンジンに触れる前までの準備結果
#[derive(Debug, Clone)]
pub struct BuildPlan {
    pub revision: Option<RevisionInfo>,
    pub image: ImageReference,
    pub staged: StagedPaths,
    /// 生成した Dockerfile（docker_directory 使用時は None）
    pub dockerfile: Option<String>,
    pub context_dir: PathBuf,
    /// 変数展開済みの設定
    pub config: BuildConfig,
}

/// 成功したビルドの結果
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub image_id: String,
    pub image: ImageReference,
    /// プッシュした参照（`name:tag`）
    pub pushed: Vec<String>,
    pub digest: Option<String>,
    pub archive: Option<PathBuf>,
    pub manifest_path: PathBuf,
    pub manifest: BuildManifest,
}

#[derive(Debug, Clone)]
pub enum BuildOutcome {
    Skipped(SkipReason),
    Built(BuildReport),
}

pub struct Orchestrator {
    resolver: RevisionResolver,
    lock: Mutex<()>,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new(RevisionResolver::default())
    }
}

impl Orchestrator {
    pub fn new(resolver: RevisionResolver) -> Self {
        Self {
            resolver,
            lock: Mutex::new(()),
        }
    }

    /// スキップ条件を判定する（副作用なし）
    pub fn skip_reason(config: &BuildConfig) -> Option<SkipReason> {
        if config.flags.skip {
            return Some(SkipReason::Disabled);
        }
        if config.flags.skip_build {
            return Some(SkipReason::BuildDisabled);
        }
        if config.is_aggregator() {
            return Some(SkipReason::Aggregator);
        }
        match &config.docker_directory {
            Some(dir) if !dir.has_dockerfile() => {
                Some(SkipReason::MissingDockerfile(dir.dockerfile()))
            }
            _ => None,
        }
    }

    /// エンジンを使わずにビルドコンテキストまで準備する
    ///
    /// ビルドコンテキストを書き換えるので `execute` と同じロックを取る。
    pub async fn plan(&self, config: &BuildConfig) -> BuildResult<BuildPlan> {
        let _guard = self.lock.lock().await;
        self.prepare(config)
    }

    /// パイプライン全体を実行する
    pub async fn execute(
        &self,
        config: &BuildConfig,
        engine: &dyn BuildEngine,
    ) -> BuildResult<BuildOutcome> {
        let _guard = self.lock.lock().await;

        if let Some(reason) = Self::skip_reason(config) {
            tracing::info!("Skipping image build for {}: {}", config.project_name, reason);
            return Ok(BuildOutcome::Skipped(reason));
        }

        match self.run(config, engine).await {
            Ok(report) => Ok(BuildOutcome::Built(report)),
            Err(e) => {
                tracing::error!("Image build for {} failed: {}", config.project_name, e);
                Err(e)
            }
        }
    }

    async fn run(&self, config: &BuildConfig, engine: &dyn BuildEngine) -> BuildResult<BuildReport> {
        let plan = self.prepare(config)?;
        let config = &plan.config;
        let image = &plan.image;
        let primary = image.primary();

        // Building
        let request = BuildRequest {
            image: primary.clone(),
            pull: config.flags.pull_on_build,
            no_cache: config.flags.no_cache,
            keep_containers: config.flags.keep_containers,
            quiet: config.flags.quiet,
            build_args: config.build_args.clone(),
            network: config.network.clone(),
            platform: config.platform.clone(),
        };
        let image_id = engine
            .build(&plan.context_dir, &request)
            .await
            .map_err(|e| BuildError::from(e).at(PipelineStep::Building))?;
        tracing::info!("Built image {} ({})", primary, image_id);

        // Tagging
        for tag in image.additional_tags() {
            engine
                .tag(&image_id, &image.name, tag, config.flags.force_tags)
                .await
                .map_err(|e| BuildError::from(e).at(PipelineStep::Tagging))?;
            tracing::info!("Tagged {} as {}", image_id, image.with_tag(tag));
        }

        // Pushing
        let (pushed, digest) = self
            .push(config, image, engine)
            .await
            .map_err(|e| e.at(PipelineStep::Pushing))?;

        // Archiving
        let archive = match &config.archive_path {
            Some(path) => {
                save_archive(engine, &primary, path)
                    .await
                    .map_err(|e| e.at(PipelineStep::Archiving))?;
                Some(path.clone())
            }
            None => None,
        };

        // RecordingManifest
        let mut manifest = BuildManifest::new(primary);
        if let Some(revision) = &plan.revision {
            manifest.commit = Some(revision.commit_id.clone());
            manifest.repo = revision.remote_url.clone();
        }
        if let Some(digest) = &digest {
            manifest.set_digest(&image.name, digest);
        }
        manifest
            .write(&config.manifest_path)
            .map_err(|source| BuildError::Manifest {
                path: config.manifest_path.clone(),
                source,
            })
            .map_err(|e| e.at(PipelineStep::RecordingManifest))?;
        tracing::info!("Wrote build manifest to {}", config.manifest_path.display());

        Ok(BuildReport {
            image_id,
            image: image.clone(),
            pushed,
            digest,
            archive,
            manifest_path: config.manifest_path.clone(),
            manifest,
        })
    }

    /// revision → validate → stage
    fn prepare(&self, config: &BuildConfig) -> BuildResult<BuildPlan> {
        let revision = self
            .resolve_revision(config)
            .map_err(|e| e.at(PipelineStep::ResolvingRevision))?;

        let mut config = config.clone();
        let table = expansion_table(&config.properties, revision.as_ref());
        config.image_name = expand(&config.image_name, &table);
        config.recipe.base_image = config
            .recipe
            .base_image
            .as_deref()
            .map(|base| expand(base, &table));

        let image = validate(&config, revision.as_ref())
            .map_err(|e| e.at(PipelineStep::Validating))?;

        let (staged, dockerfile) =
            stage_context(&config).map_err(|e| e.at(PipelineStep::Staging))?;

        Ok(BuildPlan {
            revision,
            image,
            staged,
            dockerfile,
            context_dir: config.context_dir.clone(),
            config,
        })
    }

    fn resolve_revision(&self, config: &BuildConfig) -> BuildResult<Option<RevisionInfo>> {
        if !config.requires_revision() {
            return Ok(self.resolver.resolve_or_absent(&config.project_root));
        }

        match self.resolver.resolve(&config.project_root)? {
            Some(info) => {
                tracing::debug!("Resolved revision {}", info.revision());
                Ok(Some(info))
            }
            None => Err(BuildError::Config(format!(
                "a git revision is required but none could be resolved from {}",
                config.project_root.display()
            ))),
        }
    }

    async fn push(
        &self,
        config: &BuildConfig,
        image: &ImageReference,
        engine: &dyn BuildEngine,
    ) -> BuildResult<(Vec<String>, Option<String>)> {
        let mut pushed = Vec::new();
        let mut digest = None;

        if config.flags.skip_push {
            if config.flags.push_image || config.flags.push_tags_only {
                tracing::info!("Skipping push of {}", image.name);
            }
            return Ok((pushed, digest));
        }

        let policy = RetryPolicy::from(&config.retry);

        if config.flags.push_tags_only {
            for tag in explicit_tags(config) {
                push_with_retry(engine, &policy, &image.name, tag).await?;
                pushed.push(image.with_tag(tag));
            }
        }

        if config.flags.push_image {
            for tag in &image.tags {
                let outcome = push_with_retry(engine, &policy, &image.name, tag).await?;
                if tag == image.primary_tag() {
                    digest = outcome.digest;
                }
                let reference = image.with_tag(tag);
                if !pushed.contains(&reference) {
                    pushed.push(reference);
                }
            }
        }

        Ok((pushed, digest))
    }
}

/// 空白を除いた明示タグ
fn explicit_tags(config: &BuildConfig) -> impl Iterator<Item = &str> {
    config
        .tags
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
}

/// 展開済み設定を検証し、最終的なイメージ参照を決める
fn validate(config: &BuildConfig, revision: Option<&RevisionInfo>) -> BuildResult<ImageReference> {
    if config.docker_directory.is_none() {
        if config
            .recipe
            .base_image
            .as_deref()
            .is_none_or(|b| b.trim().is_empty())
        {
            return Err(BuildError::Config(
                "base image is required when no docker_directory is set".to_string(),
            ));
        }
    } else {
        warn_ignored_recipe_fields(config);
    }

    if config.flags.push_tags_only
        && !config.flags.skip_push
        && explicit_tags(config).next().is_none()
    {
        return Err(BuildError::Config(
            "push tags_only is set but no tags are declared".to_string(),
        ));
    }

    let mut tags = config.tags.clone();
    if config.flags.use_revision_tag {
        let (_, embedded) = parse_image_name(&config.image_name)?;
        if embedded.is_none() {
            let revision = revision.ok_or_else(|| {
                BuildError::Config("use_revision_tag is set but no revision is available".to_string())
            })?;
            tags.push(revision.revision());
        }
    }

    ImageReference::create(&config.image_name, &tags)
}

fn warn_ignored_recipe_fields(config: &BuildConfig) {
    let recipe = &config.recipe;
    let ignored = [
        ("maintainer", recipe.maintainer.is_some()),
        ("entrypoint", recipe.entrypoint.is_some()),
        ("cmd", recipe.cmd.is_some()),
        ("run", !recipe.runs.is_empty()),
        ("workdir", recipe.workdir.is_some()),
        ("user", recipe.user.is_some()),
    ];
    for (field, set) in ignored {
        if set {
            tracing::warn!("'{}' is ignored because docker_directory is set", field);
        }
    }
}

/// リソースをステージングし、必要なら Dockerfile を書き出す
fn stage_context(config: &BuildConfig) -> BuildResult<(StagedPaths, Option<String>)> {
    let context_dir = &config.context_dir;
    std::fs::create_dir_all(context_dir).map_err(|source| BuildError::Staging {
        path: context_dir.clone(),
        source,
    })?;

    let mut resources = config.resources.clone();
    if let Some(dir) = &config.docker_directory {
        resources.push(dir.as_resource());
    }
    let staged = stage(&resources, context_dir)?;
    tracing::info!("Staged {} path(s) into {}", staged.len(), context_dir.display());

    if config.docker_directory.is_some() {
        return Ok((staged, None));
    }

    let content = synthesize(&config.recipe, &staged);
    let path = write_dockerfile(context_dir, &content).map_err(|source| BuildError::Staging {
        path: context_dir.join(DOCKERFILE_NAME),
        source,
    })?;
    tracing::debug!("Wrote {}", path.display());
    Ok((staged, Some(content)))
}

async fn push_with_retry(
    engine: &dyn BuildEngine,
    policy: &RetryPolicy,
    repo: &str,
    tag: &str,
) -> BuildResult<PushOutcome> {
    let reference = format!("{}:{}", repo, tag);
    let outcome = policy
        .run(&reference, || engine.push(repo, tag))
        .await
        .map_err(|exhausted| BuildError::Push {
            image: reference.clone(),
            attempts: exhausted.attempts,
            source: exhausted.error,
        })?;
    tracing::info!("Pushed {}", reference);
    Ok(outcome)
}

/// イメージのアーカイブを書き出す（既存ファイルは上書き）
async fn save_archive(engine: &dyn BuildEngine, image: &str, path: &Path) -> BuildResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut file = tokio::fs::File::create(path).await?;
    let mut stream = engine.save(image);
    while let Some(chunk) = stream.next().await {
        file.write_all(&chunk?).await?;
    }
    file.flush().await?;
    tracing::info!("Saved {} to {}", image, path.display());
    Ok(())
}
