use serde::Serialize;
use std::path::PathBuf;

/// ビルドコンテキストへコピーするファイル群の宣言
///
/// ```kdl
/// resource "build/libs" {
///     include "*.jar"
///     exclude "*-plain.jar"
///     target "libs"
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResourceSpec {
    /// コピー元ディレクトリ
    pub directory: PathBuf,
    pub includes: Vec<String>,
    pub excludes: Vec<String>,
    /// ビルドコンテキスト内のコピー先サブパス
    pub target_path: Option<String>,
}

impl ResourceSpec {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            ..Default::default()
        }
    }

    pub fn include(mut self, pattern: impl Into<String>) -> Self {
        self.includes.push(pattern.into());
        self
    }

    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.excludes.push(pattern.into());
        self
    }

    pub fn target(mut self, target_path: impl Into<String>) -> Self {
        self.target_path = Some(target_path.into());
        self
    }

    /// フィルタなし＋コピー先指定ありならディレクトリごとコピーする
    pub fn copies_whole_directory(&self) -> bool {
        self.includes.is_empty() && self.excludes.is_empty() && self.target_path.is_some()
    }
}

/// 既存の Dockerfile を含むディレクトリ
///
/// 指定された場合は Dockerfile を生成せず、このディレクトリの内容を
/// ビルドコンテキストへステージングする。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DockerDirectory {
    pub path: PathBuf,
    pub includes: Vec<String>,
    pub excludes: Vec<String>,
}

impl DockerDirectory {
    pub const DEFAULT_INCLUDES: [&'static str; 3] = ["Docker*", "docker/**", "build/**"];
    pub const DEFAULT_EXCLUDES: [&'static str; 3] = [".git/**", ".dockwright/**", "src/**"];

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            includes: Vec::new(),
            excludes: Vec::new(),
        }
    }

    pub fn dockerfile(&self) -> PathBuf {
        self.path.join("Dockerfile")
    }

    pub fn has_dockerfile(&self) -> bool {
        self.dockerfile().is_file()
    }

    /// デフォルトのフィルタにユーザー指定を足したリソース宣言に変換
    pub fn as_resource(&self) -> ResourceSpec {
        let mut spec = ResourceSpec::new(&self.path);
        spec.includes = Self::DEFAULT_INCLUDES
            .iter()
            .map(|p| p.to_string())
            .chain(self.includes.iter().cloned())
            .collect();
        spec.excludes = Self::DEFAULT_EXCLUDES
            .iter()
            .map(|p| p.to_string())
            .chain(self.excludes.iter().cloned())
            .collect();
        spec
    }
}
