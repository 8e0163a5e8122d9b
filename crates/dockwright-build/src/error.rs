use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// パイプラインのステップ名
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStep {
    ResolvingRevision,
    Validating,
    Staging,
    Building,
    Tagging,
    Pushing,
    Archiving,
    RecordingManifest,
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStep::ResolvingRevision => "revision",
            PipelineStep::Validating => "validate",
            PipelineStep::Staging => "stage",
            PipelineStep::Building => "build",
            PipelineStep::Tagging => "tag",
            PipelineStep::Pushing => "push",
            PipelineStep::Archiving => "archive",
            PipelineStep::RecordingManifest => "manifest",
        };
        f.write_str(name)
    }
}

/// ビルドエンジン（Docker）のエラー
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Docker connection error: {0}")]
    Docker(#[from] bollard::errors::Error),

    #[error("Build failed: {0}")]
    BuildFailed(String),

    #[error("Push failed for {image}: {message}")]
    PushFailed { image: String, message: String },

    #[error("Tag {target} already points at a different image (use force_tags to overwrite)")]
    TagConflict { target: String },

    #[error("Invalid tag: {tag}")]
    InvalidTag { tag: String },

    #[error("Registry authentication failed for {registry}: {message}")]
    AuthFailed { registry: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// リビジョンソース（git）のエラー
#[derive(Debug, Error)]
pub enum RevisionError {
    #[error("Failed to discover git repository from {path}: {source}")]
    Discover {
        path: PathBuf,
        #[source]
        source: Box<gix::discover::Error>,
    },

    #[error("Failed to read {what} from git repository: {source}")]
    Read {
        what: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl RevisionError {
    pub(crate) fn read<E>(what: &'static str) -> impl FnOnce(E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        move |source| RevisionError::Read {
            what,
            source: Box::new(source),
        }
    }
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Invalid build configuration: {0}")]
    Config(String),

    #[error("Revision information unavailable: {0}")]
    Revision(#[from] RevisionError),

    #[error("Failed to stage {path}: {source}")]
    Staging {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Push of {image} failed after {attempts} attempt(s): {source}")]
    Push {
        image: String,
        attempts: u32,
        #[source]
        source: EngineError,
    },

    #[error("Failed to write build manifest {path}: {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{step} step failed: {source}")]
    Pipeline {
        step: PipelineStep,
        #[source]
        source: Box<BuildError>,
    },
}

impl BuildError {
    /// 失敗したステップ名を付与する
    pub fn at(self, step: PipelineStep) -> Self {
        match self {
            already @ BuildError::Pipeline { .. } => already,
            other => BuildError::Pipeline {
                step,
                source: Box::new(other),
            },
        }
    }

    /// 失敗したステップ（付与されていれば）
    pub fn step(&self) -> Option<PipelineStep> {
        match self {
            BuildError::Pipeline { step, .. } => Some(*step),
            _ => None,
        }
    }

    /// ステップ情報を剥がした根本原因
    pub fn cause(&self) -> &BuildError {
        match self {
            BuildError::Pipeline { source, .. } => source.cause(),
            other => other,
        }
    }

    /// ユーザー向けの分かりやすいエラーメッセージ
    pub fn user_message(&self) -> String {
        match self {
            BuildError::Pipeline { step, source } => {
                format!("[{}] {}", step, source.user_message())
            }
            BuildError::Config(msg) => {
                format!(
                    "設定エラー: {}\n\
                     \n\
                     dockwright.kdl の内容を確認してください。",
                    msg
                )
            }
            BuildError::Staging { path, source } => {
                format!(
                    "リソースのコピーに失敗しました: {}\n\
                     理由: {}\n\
                     \n\
                     resource ノードのディレクトリが存在するか確認してください。",
                    path.display(),
                    source
                )
            }
            BuildError::Push {
                image,
                attempts,
                source,
            } => {
                format!(
                    "{} のプッシュに {} 回失敗しました: {}\n\
                     \n\
                     レジストリの認証情報（auth ブロック、DOCKER_USERNAME / DOCKER_PASSWORD）を確認してください。",
                    image,
                    attempts,
                    source
                )
            }
            BuildError::Engine(EngineError::Docker(e)) => {
                format!(
                    "Docker に接続できません: {}\n\
                     \n\
                     Docker デーモンが起動しているか、engine の host 設定を確認してください。",
                    e
                )
            }
            _ => format!("{}", self),
        }
    }
}

pub type BuildResult<T> = std::result::Result<T, BuildError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_at_annotates_once() {
        let err = BuildError::Config("missing base".to_string())
            .at(PipelineStep::Validating)
            .at(PipelineStep::Building);

        assert_eq!(err.step(), Some(PipelineStep::Validating));
        assert!(matches!(err.cause(), BuildError::Config(_)));
        assert_eq!(
            err.to_string(),
            "validate step failed: Invalid build configuration: missing base"
        );
    }

    #[test]
    fn test_user_message_includes_step() {
        let err = BuildError::Config("no tags".to_string()).at(PipelineStep::Validating);
        let message = err.user_message();
        assert!(message.starts_with("[validate] 設定エラー: no tags"));
    }
}
