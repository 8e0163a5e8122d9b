//! dockwright core
//!
//! プロジェクトファイル（KDL）のパース、設定モデル、
//! そして「明示設定 → プロジェクトプロパティ → 環境変数」の
//! レイヤー解決を提供します。

pub mod error;
pub mod model;
pub mod parser;
pub mod resolve;

pub use error::{CoreError, Result};
pub use model::*;
pub use parser::{parse_project_file, parse_project_string};
pub use resolve::{Layers, SettingKey, resolve_build_config, resolve_layered};
