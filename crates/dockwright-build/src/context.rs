use crate::error::EngineResult;
use flate2::Compression;
use flate2::write::GzEncoder;
use std::path::Path;
use tar::Builder;

/// これを超えるコンテキストは警告する
const MAX_CONTEXT_SIZE: usize = 500 * 1024 * 1024;

/// ビルドコンテキストディレクトリを tar.gz にまとめる
///
/// Dockerfile はステージング時点でコンテキストルートに置かれている前提。
pub fn pack_context(context_path: &Path) -> EngineResult<Vec<u8>> {
    tracing::debug!("Creating build context from: {}", context_path.display());

    let mut archive_data = Vec::new();
    {
        let encoder = GzEncoder::new(&mut archive_data, Compression::default());
        let mut tar = Builder::new(encoder);
        tar.follow_symlinks(false);
        tar.append_dir_all(".", context_path)?;
        tar.into_inner()?.finish()?;
    }

    tracing::debug!("Build context created: {} bytes", archive_data.len());
    check_context_size(archive_data.len());

    Ok(archive_data)
}

fn check_context_size(size: usize) {
    if size > MAX_CONTEXT_SIZE {
        tracing::warn!(
            "Build context is very large ({}MB). \
             Narrow the resource include patterns to stage fewer files.",
            size / 1024 / 1024
        );
    }
}
