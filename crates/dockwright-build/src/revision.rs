//! リビジョン解決
//!
//! ソース管理（git）から HEAD の短縮コミット ID、HEAD を指すタグ、
//! 作業ツリーの dirty 状態を取り出し、`<short>[.<tag>][.DIRTY]` 形式の
//! リビジョン文字列を作る。

use crate::error::RevisionError;
use crate::git::GitRepository;
use std::path::{Path, PathBuf};

/// 短縮コミット ID の長さ
pub const SHORT_ID_LEN: usize = 7;

/// dirty な作業ツリーに付くサフィックス
pub const DIRTY_SUFFIX: &str = "DIRTY";

/// 開いたリポジトリ
///
/// 所有権で寿命を管理し、どの経路でもスコープを抜けた時点で解放される。
#[derive(Debug)]
pub struct RepositoryHandle {
    pub git_dir: PathBuf,
    pub work_dir: PathBuf,
}

/// ソース管理へのアクセス
pub trait RevisionSource: Send + Sync {
    /// `start` から上方向にリポジトリを探す
    fn find_repository(&self, start: &Path) -> Result<Option<RepositoryHandle>, RevisionError>;

    /// HEAD のコミット ID（コミットが無ければ None）
    fn resolve_head(&self, repo: &RepositoryHandle) -> Result<Option<String>, RevisionError>;

    /// (タグ名, 対象コミット ID) の一覧
    fn list_tags(&self, repo: &RepositoryHandle) -> Result<Vec<(String, String)>, RevisionError>;

    /// ステージ済み・未ステージの変更があるか
    fn is_dirty(&self, repo: &RepositoryHandle) -> Result<bool, RevisionError>;

    fn remote_url(
        &self,
        repo: &RepositoryHandle,
        remote: &str,
    ) -> Result<Option<String>, RevisionError>;
}

/// 解決済みリビジョン情報
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionInfo {
    /// HEAD の完全なコミット ID
    pub commit_id: String,
    pub short_id: String,
    /// HEAD を指すタグの短い名前
    pub tag: Option<String>,
    pub dirty: bool,
    /// origin リモートの URL
    pub remote_url: Option<String>,
}

impl RevisionInfo {
    /// `<short>[.<tag>][.DIRTY]`
    pub fn revision(&self) -> String {
        let mut revision = self.short_id.clone();
        if let Some(tag) = &self.tag {
            revision.push('.');
            revision.push_str(tag);
        }
        if self.dirty {
            revision.push('.');
            revision.push_str(DIRTY_SUFFIX);
        }
        revision
    }
}

pub struct RevisionResolver {
    source: Box<dyn RevisionSource>,
    remote: String,
}

impl Default for RevisionResolver {
    fn default() -> Self {
        Self::new(Box::new(GitRepository))
    }
}

impl RevisionResolver {
    pub fn new(source: Box<dyn RevisionSource>) -> Self {
        Self {
            source,
            remote: "origin".to_string(),
        }
    }

    /// リビジョン情報を解決する
    ///
    /// リポジトリが無い、または HEAD が解決できない場合は `Ok(None)`。
    /// 読み取りエラーをどう扱うかは呼び出し側が決める。
    pub fn resolve(&self, start: &Path) -> Result<Option<RevisionInfo>, RevisionError> {
        let Some(repo) = self.source.find_repository(start)? else {
            tracing::debug!("No git repository found from {}", start.display());
            return Ok(None);
        };
        tracing::debug!("Using git repository at {}", repo.git_dir.display());

        let Some(commit_id) = self.source.resolve_head(&repo)? else {
            tracing::debug!("HEAD cannot be resolved (no commits yet?)");
            return Ok(None);
        };

        let short_id: String = commit_id.chars().take(SHORT_ID_LEN).collect();

        let mut tags = self.source.list_tags(&repo)?;
        tags.sort();
        let tag = tags
            .into_iter()
            .find(|(_, target)| *target == commit_id)
            .map(|(name, _)| short_tag_name(&name).to_string());

        let dirty = self.source.is_dirty(&repo)?;
        let remote_url = self.source.remote_url(&repo, &self.remote)?;

        Ok(Some(RevisionInfo {
            commit_id,
            short_id,
            tag,
            dirty,
            remote_url,
        }))
    }

    /// 読み取りエラーを警告に落として解決する
    pub fn resolve_or_absent(&self, start: &Path) -> Option<RevisionInfo> {
        match self.resolve(start) {
            Ok(info) => info,
            Err(e) => {
                tracing::warn!("Cannot read git metadata, continuing without revision: {}", e);
                None
            }
        }
    }
}

/// `refs/tags/release/1.0` -> `1.0`
fn short_tag_name(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

#[cfg(test)]
pub(crate) mod fake {
    use super::*;

    /// メモリ上のリビジョンソース
    #[derive(Debug, Clone, Default)]
    pub struct FakeRevisionSource {
        pub repository: bool,
        pub head: Option<String>,
        pub tags: Vec<(String, String)>,
        pub dirty: bool,
        pub remote_url: Option<String>,
        pub fail: bool,
    }

    impl FakeRevisionSource {
        pub fn at(head: &str) -> Self {
            Self {
                repository: true,
                head: Some(head.to_string()),
                ..Default::default()
            }
        }
    }

    impl RevisionSource for FakeRevisionSource {
        fn find_repository(
            &self,
            start: &Path,
        ) -> Result<Option<RepositoryHandle>, RevisionError> {
            if self.fail {
                return Err(RevisionError::Read {
                    what: "HEAD",
                    source: "corrupt repository".into(),
                });
            }
            Ok(self.repository.then(|| RepositoryHandle {
                git_dir: start.join(".git"),
                work_dir: start.to_path_buf(),
            }))
        }

        fn resolve_head(&self, _repo: &RepositoryHandle) -> Result<Option<String>, RevisionError> {
            Ok(self.head.clone())
        }

        fn list_tags(
            &self,
            _repo: &RepositoryHandle,
        ) -> Result<Vec<(String, String)>, RevisionError> {
            Ok(self.tags.clone())
        }

        fn is_dirty(&self, _repo: &RepositoryHandle) -> Result<bool, RevisionError> {
            Ok(self.dirty)
        }

        fn remote_url(
            &self,
            _repo: &RepositoryHandle,
            _remote: &str,
        ) -> Result<Option<String>, RevisionError> {
            Ok(self.remote_url.clone())
        }
    }
}
