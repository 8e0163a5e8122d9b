//! リソースのステージング
//!
//! ResourceSpec に従ってプロジェクトのファイルをビルドコンテキストへコピーし、
//! コピーしたパスの一覧（Dockerfile の ADD 行の元）を返す。
//! 一覧はリソースごとに辞書順でソートされるので、ファイルシステムの
//! 列挙順に関係なく同じ入力からは同じ Dockerfile が生成される。

use crate::error::{BuildError, BuildResult};
use crate::pattern::FileFilter;
use dockwright_core::ResourceSpec;
use serde::Serialize;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PathKind {
    File,
    Directory,
}

/// コンテキストルートからの相対パス（常に `/` 区切り）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StagedPath {
    pub path: String,
    pub kind: PathKind,
}

/// ステージ済みパスの順序付き一覧
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StagedPaths(Vec<StagedPath>);

impl StagedPaths {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, path: impl Into<String>, kind: PathKind) {
        self.0.push(StagedPath {
            path: path.into(),
            kind,
        });
    }

    pub fn iter(&self) -> std::slice::Iter<'_, StagedPath> {
        self.0.iter()
    }

    pub fn paths(&self) -> Vec<&str> {
        self.0.iter().map(|p| p.path.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a StagedPaths {
    type Item = &'a StagedPath;
    type IntoIter = std::slice::Iter<'a, StagedPath>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// リソースを宣言順に `destination` へコピーする
pub fn stage(specs: &[ResourceSpec], destination: &Path) -> BuildResult<StagedPaths> {
    let mut staged = StagedPaths::new();
    for spec in specs {
        stage_one(spec, destination, &mut staged)?;
    }
    Ok(staged)
}

fn stage_one(spec: &ResourceSpec, destination: &Path, staged: &mut StagedPaths) -> BuildResult<()> {
    let source = &spec.directory;
    if !source.is_dir() {
        return Err(BuildError::Staging {
            path: source.clone(),
            source: std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "resource directory does not exist",
            ),
        });
    }

    let target = spec
        .target_path
        .as_deref()
        .map(to_unix)
        .unwrap_or_default();
    let target = target.trim_matches('/');
    let target_root = if target.is_empty() {
        destination.to_path_buf()
    } else {
        destination.join(target)
    };

    if spec.copies_whole_directory() {
        tracing::info!("Copying dir {} -> {}", source.display(), target_root.display());
        copy_tree(source, &target_root, destination)?;
        let entry = if target.is_empty() { "." } else { target };
        staged.push(entry, PathKind::Directory);
        return Ok(());
    }

    let filter = FileFilter::new(&spec.includes, &spec.excludes)?;
    let mut matched = Vec::new();
    for relative in walk_files(source, destination)? {
        if filter.matches(&relative) {
            matched.push(relative);
        }
    }

    if matched.is_empty() {
        tracing::info!(
            "No resources will be copied from {}, no files match specified patterns",
            source.display()
        );
        return Ok(());
    }

    let mut copied = Vec::with_capacity(matched.len());
    for relative in matched {
        let from = source.join(&relative);
        let to = target_root.join(&relative);
        tracing::info!("Copying {} -> {}", from.display(), to.display());
        copy_file(&from, &to)?;
        copied.push(join_relative(target, &relative));
    }

    copied.sort();
    for path in copied {
        staged.push(path, PathKind::File);
    }
    Ok(())
}

/// `source` 以下のファイルを `/` 区切りの相対パスで列挙する
///
/// コンテキストディレクトリ自身が `source` の中にある場合は辿らない。
fn walk_files(source: &Path, destination: &Path) -> BuildResult<Vec<String>> {
    let mut files = Vec::new();
    let walker = WalkDir::new(source)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !e.path().starts_with(destination));

    for entry in walker {
        let entry = entry.map_err(|e| walk_error(source, e))?;
        if !entry.file_type().is_file() {
            continue;
        }
        if let Ok(relative) = entry.path().strip_prefix(source) {
            files.push(to_unix(&relative.to_string_lossy()));
        }
    }
    Ok(files)
}

fn copy_tree(source: &Path, target_root: &Path, destination: &Path) -> BuildResult<()> {
    fs::create_dir_all(target_root).map_err(|e| staging_error(target_root, e))?;

    let walker = WalkDir::new(source)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !e.path().starts_with(destination));

    for entry in walker {
        let entry = entry.map_err(|e| walk_error(source, e))?;
        let Ok(relative) = entry.path().strip_prefix(source) else {
            continue;
        };
        let to = target_root.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&to).map_err(|e| staging_error(&to, e))?;
        } else if entry.file_type().is_file() {
            copy_file(entry.path(), &to)?;
        }
    }
    Ok(())
}

/// 上書きコピー。パーミッションと更新日時を引き継ぐ
fn copy_file(from: &Path, to: &Path) -> BuildResult<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(|e| staging_error(parent, e))?;
    }
    fs::copy(from, to).map_err(|e| staging_error(from, e))?;

    let modified = fs::metadata(from)
        .and_then(|meta| meta.modified())
        .map_err(|e| staging_error(from, e))?;
    if let Err(e) = File::open(to).and_then(|file| file.set_modified(modified)) {
        tracing::debug!("Could not preserve mtime of {}: {}", to.display(), e);
    }
    Ok(())
}

fn staging_error(path: &Path, source: std::io::Error) -> BuildError {
    BuildError::Staging {
        path: path.to_path_buf(),
        source,
    }
}

fn walk_error(root: &Path, error: walkdir::Error) -> BuildError {
    let path = error
        .path()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(root));
    BuildError::Staging {
        path,
        source: error.into(),
    }
}

fn to_unix(path: &str) -> String {
    path.replace('\\', "/")
}

fn join_relative(target: &str, relative: &str) -> String {
    if target.is_empty() {
        relative.to_string()
    } else {
        format!("{}/{}", target, relative)
    }
}
