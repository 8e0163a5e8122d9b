use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("KDLパースエラー: {0}")]
    KdlParse(#[from] kdl::KdlError),

    #[error("ファイル読み込みエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("プロジェクトファイルを読み込めません: {path}\n理由: {message}")]
    ProjectFile { path: PathBuf, message: String },

    #[error("無効な設定: {0}")]
    InvalidConfig(String),

    #[error("設定値 '{key}' が不正です: {value}")]
    InvalidSetting { key: String, value: String },

    #[error("image が指定されていません")]
    MissingImage,
}

pub type Result<T> = std::result::Result<T, CoreError>;
