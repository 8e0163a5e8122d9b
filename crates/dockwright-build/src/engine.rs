//! ビルドエンジンの抽象
//!
//! パイプラインはこのトレイト越しにエンジンを操作する。
//! 実装は [`crate::docker::DockerEngine`]、テストではメモリ上の偽物を使う。

use crate::error::EngineResult;
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use std::collections::BTreeMap;
use std::path::Path;

/// 1回のビルド呼び出しのパラメータ
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildRequest {
    /// ビルド時に付けるプライマリ参照（`name:tag`）
    pub image: String,
    pub pull: bool,
    pub no_cache: bool,
    /// 中間コンテナを残す
    pub keep_containers: bool,
    pub quiet: bool,
    pub build_args: BTreeMap<String, String>,
    pub network: Option<String>,
    pub platform: Option<String>,
}

/// プッシュ結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushOutcome {
    /// `sha256:...`
    pub digest: Option<String>,
}

#[async_trait]
pub trait BuildEngine: Send + Sync {
    /// コンテキストディレクトリからイメージをビルドし、イメージ ID を返す
    async fn build(&self, context: &Path, request: &BuildRequest) -> EngineResult<String>;

    /// `image` に `repo:tag` を付ける
    ///
    /// `force` が false のとき、別イメージを指す既存タグは上書きしない。
    async fn tag(&self, image: &str, repo: &str, tag: &str, force: bool) -> EngineResult<()>;

    async fn push(&self, repo: &str, tag: &str) -> EngineResult<PushOutcome>;

    /// イメージを tar アーカイブとしてストリームする
    fn save<'a>(&'a self, image: &'a str) -> BoxStream<'a, EngineResult<Bytes>>;
}
