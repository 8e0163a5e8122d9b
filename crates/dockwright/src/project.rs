use anyhow::Context;
use clap::Args;
use dockwright_core::{BuildConfig, Layers, parse_project_file, resolve_build_config};
use std::path::PathBuf;

/// プロジェクトファイルの指定（各コマンド共通）
#[derive(Args, Debug, Clone)]
pub struct ProjectArgs {
    /// プロジェクトファイル（省略時はカレントディレクトリから探索）
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// プロジェクトプロパティを上書き（KEY=VALUE、複数指定可）
    #[arg(short = 'P', long = "property", value_parser = parse_property)]
    pub properties: Vec<(String, String)>,
}

fn parse_property(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("KEY=VALUE の形式で指定してください: {}", s)),
    }
}

impl ProjectArgs {
    /// プロジェクトファイルを読み込み、レイヤー解決済みの設定を返す
    ///
    /// `-P` はプロジェクトファイルの `properties` より優先される。
    pub fn load(&self) -> anyhow::Result<BuildConfig> {
        let file = match &self.file {
            Some(file) => file.clone(),
            None => dockwright_config::find_project_file()?,
        };
        let root = std::path::absolute(dockwright_config::project_root(&file))?;
        tracing::debug!("Using project file {}", file.display());

        let mut project = parse_project_file(&file)
            .with_context(|| format!("{} を読み込めません", file.display()))?;
        project.properties.extend(self.properties.iter().cloned());

        let layers = Layers::with_process_env(project.properties.clone());
        let config = resolve_build_config(project, &root, &layers)
            .with_context(|| format!("{} の設定を解決できません", file.display()))?;
        Ok(config)
    }
}
