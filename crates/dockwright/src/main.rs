mod commands;
mod project;

use clap::{Parser, Subcommand};
use project::ProjectArgs;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dockwright")]
#[command(about = "KDL で書いたプロジェクトからコンテナイメージをビルドする", long_about = None)]
struct Cli {
    /// デバッグログを表示
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// イメージをビルドし、タグ付け・プッシュ・マニフェスト出力まで行う
    Build {
        #[command(flatten)]
        project: ProjectArgs,
        /// 追加するタグ（複数指定可）
        #[arg(short, long = "tag")]
        tags: Vec<String>,
        /// すべてのタグをプッシュする
        #[arg(long)]
        push: bool,
        /// プッシュをスキップ
        #[arg(long, conflicts_with = "push")]
        skip_push: bool,
        /// キャッシュを使わずにビルド
        #[arg(long)]
        no_cache: bool,
        /// ベースイメージを常に pull する
        #[arg(long)]
        pull: bool,
    },
    /// 生成される Dockerfile とステージング結果を表示（エンジンは使わない）
    Dockerfile {
        #[command(flatten)]
        project: ProjectArgs,
    },
    /// プロジェクトファイルを検証
    Validate {
        #[command(flatten)]
        project: ProjectArgs,
        /// 解決済みの設定を JSON で出力
        #[arg(long)]
        json: bool,
    },
    /// バージョン情報を表示
    Version,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Build {
            project,
            tags,
            push,
            skip_push,
            no_cache,
            pull,
        } => {
            let overrides = commands::build::Overrides {
                tags,
                push,
                skip_push,
                no_cache,
                pull,
            };
            commands::build::handle(&project, overrides).await
        }
        Commands::Dockerfile { project } => commands::dockerfile::handle(&project).await,
        Commands::Validate { project, json } => commands::validate::handle(&project, json),
        Commands::Version => {
            println!("dockwright {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
