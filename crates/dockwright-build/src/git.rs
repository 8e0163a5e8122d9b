//! gix によるリビジョンソース

use crate::error::RevisionError;
use crate::revision::{RepositoryHandle, RevisionSource};
use gix::discover::upwards::Error as UpwardsError;
use gix::remote::Direction;
use std::path::Path;

/// ローカルの git リポジトリを読む [`RevisionSource`]
///
/// 探索は `start` から親ディレクトリへ向かい、`GIT_DIR` などの環境変数も反映される。
#[derive(Debug, Clone, Copy, Default)]
pub struct GitRepository;

impl GitRepository {
    fn discover(start: &Path) -> Result<Option<gix::Repository>, RevisionError> {
        match gix::ThreadSafeRepository::discover_with_environment_overrides(start) {
            Ok(repo) => Ok(Some(repo.to_thread_local())),
            Err(gix::discover::Error::Discover(
                UpwardsError::NoGitRepository { .. }
                | UpwardsError::NoGitRepositoryWithinCeiling { .. }
                | UpwardsError::NoGitRepositoryWithinFs { .. },
            )) => Ok(None),
            Err(e) => Err(RevisionError::Discover {
                path: start.to_path_buf(),
                source: Box::new(e),
            }),
        }
    }

    fn open(handle: &RepositoryHandle) -> Result<gix::Repository, RevisionError> {
        Self::discover(&handle.work_dir)?.ok_or_else(|| RevisionError::Read {
            what: "repository",
            source: format!("{} is no longer a git repository", handle.work_dir.display())
                .into(),
        })
    }
}

impl RevisionSource for GitRepository {
    fn find_repository(&self, start: &Path) -> Result<Option<RepositoryHandle>, RevisionError> {
        let Some(repo) = Self::discover(start)? else {
            return Ok(None);
        };
        let work_dir = repo.workdir().unwrap_or(start).to_path_buf();
        Ok(Some(RepositoryHandle {
            git_dir: repo.git_dir().to_path_buf(),
            work_dir,
        }))
    }

    fn resolve_head(&self, handle: &RepositoryHandle) -> Result<Option<String>, RevisionError> {
        let repo = Self::open(handle)?;
        let head = repo.head().map_err(RevisionError::read("HEAD"))?;
        if head.is_unborn() {
            return Ok(None);
        }
        let id = repo.head_id().map_err(RevisionError::read("HEAD"))?;
        Ok(Some(id.to_string()))
    }

    fn list_tags(&self, handle: &RepositoryHandle) -> Result<Vec<(String, String)>, RevisionError> {
        let repo = Self::open(handle)?;
        let references = repo.references().map_err(RevisionError::read("tags"))?;

        let mut tags = Vec::new();
        for reference in references.tags().map_err(RevisionError::read("tags"))? {
            let mut reference =
                reference.map_err(|source| RevisionError::Read { what: "tags", source })?;
            let name = reference.name().as_bstr().to_string();
            // 注釈付きタグはコミットまで剥がす
            let target = reference
                .peel_to_id_in_place()
                .map_err(RevisionError::read("tags"))?;
            tags.push((name, target.to_string()));
        }
        Ok(tags)
    }

    fn is_dirty(&self, handle: &RepositoryHandle) -> Result<bool, RevisionError> {
        let repo = Self::open(handle)?;
        repo.is_dirty().map_err(RevisionError::read("worktree status"))
    }

    fn remote_url(
        &self,
        handle: &RepositoryHandle,
        remote: &str,
    ) -> Result<Option<String>, RevisionError> {
        let repo = Self::open(handle)?;
        let Some(found) = repo.try_find_remote(remote) else {
            return Ok(None);
        };
        let remote = found.map_err(RevisionError::read("remote"))?;
        Ok(remote
            .url(Direction::Fetch)
            .map(|url| url.to_bstring().to_string()))
    }
}
