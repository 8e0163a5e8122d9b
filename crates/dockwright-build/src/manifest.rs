//! ビルドマニフェスト
//!
//! 生成したイメージを記述する小さな JSON。キーは辞書順、値の無い
//! フィールドは出力しないので、同じ入力からは同じバイト列になる。

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;

/// フィールドの宣言順がそのまま出力順（辞書順）になる
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildManifest {
    /// HEAD の完全なコミット ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
    /// `name@sha256:...`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    pub image: String,
    /// ソースリポジトリの URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
}

impl BuildManifest {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            ..Default::default()
        }
    }

    /// プッシュで得たダイジェストを `name@digest` として記録する
    pub fn set_digest(&mut self, name: &str, digest: &str) {
        self.digest = Some(format!("{}@{}", name, digest));
    }

    pub fn to_json_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
    }

    /// 親ディレクトリを作って上書きする
    pub fn write(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let bytes = self.to_json_bytes().map_err(io::Error::other)?;
        fs::write(path, bytes)
    }
}
