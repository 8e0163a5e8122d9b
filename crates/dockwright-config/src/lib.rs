pub mod error;

pub use error::*;

use std::path::{Path, PathBuf};

/// プロジェクトファイルのパスを直接指定する環境変数
pub const CONFIG_ENV: &str = "DOCKWRIGHT_CONFIG";

/// プロジェクト専用ディレクトリ
pub const PROJECT_DIR: &str = ".dockwright";

const CANDIDATES: [&str; 4] = [
    "dockwright.local.kdl",
    ".dockwright.local.kdl",
    "dockwright.kdl",
    ".dockwright.kdl",
];

/// プロジェクトの dockwright.kdl を探す
///
/// 以下の優先順位で検索:
/// 1. 環境変数 DOCKWRIGHT_CONFIG (直接パス指定)
/// 2. カレントディレクトリ: dockwright.local.kdl, .dockwright.local.kdl, dockwright.kdl, .dockwright.kdl
/// 3. ./.dockwright/ ディレクトリ内: 同様の順序
pub fn find_project_file() -> Result<PathBuf> {
    // 1. 環境変数で直接指定
    if let Ok(config_path) = std::env::var(CONFIG_ENV)
        && !config_path.trim().is_empty()
    {
        let path = PathBuf::from(&config_path);
        if path.is_file() {
            return Ok(path);
        }
        return Err(ConfigError::OverrideNotFound(config_path));
    }

    find_project_file_in(&std::env::current_dir()?)
}

/// 指定ディレクトリから探す（環境変数は見ない）
pub fn find_project_file_in(dir: &Path) -> Result<PathBuf> {
    if let Some(path) = first_existing(dir) {
        return Ok(path);
    }

    let project_dir = dir.join(PROJECT_DIR);
    if project_dir.is_dir()
        && let Some(path) = first_existing(&project_dir)
    {
        return Ok(path);
    }

    Err(ConfigError::ProjectFileNotFound)
}

fn first_existing(dir: &Path) -> Option<PathBuf> {
    CANDIDATES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

/// プロジェクトファイルからプロジェクトルートを求める
///
/// `.dockwright/` 内のファイルならその親ディレクトリがルート
pub fn project_root(project_file: &Path) -> PathBuf {
    let parent = project_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    match parent.file_name() {
        Some(name) if name == PROJECT_DIR => parent
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."))
            .to_path_buf(),
        _ => parent.to_path_buf(),
    }
}
