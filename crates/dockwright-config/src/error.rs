use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(
        "プロジェクトファイルが見つかりません。以下の場所を確認してください:\n\
        - カレントディレクトリ: dockwright.local.kdl, .dockwright.local.kdl, dockwright.kdl, .dockwright.kdl\n\
        - ./.dockwright/ ディレクトリ\n\
        または DOCKWRIGHT_CONFIG 環境変数で直接指定できます"
    )]
    ProjectFileNotFound,

    #[error("DOCKWRIGHT_CONFIG が存在しないファイルを指しています: {0}")]
    OverrideNotFound(String),

    #[error("IO エラー: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
