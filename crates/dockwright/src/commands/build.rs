use crate::project::ProjectArgs;
use colored::Colorize;
use dockwright_build::{BuildOutcome, DockerEngine, Orchestrator};
use dockwright_core::BuildConfig;

/// CLI フラグによる上書き
#[derive(Debug, Default)]
pub struct Overrides {
    pub tags: Vec<String>,
    pub push: bool,
    pub skip_push: bool,
    pub no_cache: bool,
    pub pull: bool,
}

impl Overrides {
    fn apply(self, config: &mut BuildConfig) {
        config.tags.extend(self.tags);
        if self.push {
            config.flags.push_image = true;
        }
        if self.skip_push {
            config.flags.skip_push = true;
        }
        if self.no_cache {
            config.flags.no_cache = true;
        }
        if self.pull {
            config.flags.pull_on_build = true;
        }
    }
}

pub async fn handle(project: &ProjectArgs, overrides: Overrides) -> anyhow::Result<()> {
    let mut config = project.load()?;
    overrides.apply(&mut config);

    let orchestrator = Orchestrator::default();
    if let Some(reason) = Orchestrator::skip_reason(&config) {
        println!("{}", format!("⊘ スキップしました: {}", reason).yellow());
        return Ok(());
    }

    println!(
        "{}",
        format!("🔨 {} をビルド中...", config.project_name).blue()
    );

    let engine = DockerEngine::connect(&config.engine)
        .await
        .map_err(|e| anyhow::anyhow!("Docker に接続できません: {}", e))?
        .with_credentials(config.credentials.clone(), config.registry_url.clone())
        .quiet(config.flags.quiet);

    let report = match orchestrator.execute(&config, &engine).await {
        Ok(BuildOutcome::Built(report)) => report,
        Ok(BuildOutcome::Skipped(reason)) => {
            println!("{}", format!("⊘ スキップしました: {}", reason).yellow());
            return Ok(());
        }
        Err(e) => super::exit_with_build_error(&e),
    };

    println!();
    println!("{}", "✓ ビルドが完了しました".green().bold());
    println!("  イメージ: {}", report.image.primary().cyan());
    println!("  ID: {}", report.image_id);
    if report.image.tags.len() > 1 {
        println!("  タグ: {}", report.image.tags.join(", "));
    }
    for pushed in &report.pushed {
        println!("  プッシュ: {}", pushed.cyan());
    }
    if let Some(digest) = &report.manifest.digest {
        println!("  ダイジェスト: {}", digest);
    }
    if let Some(archive) = &report.archive {
        println!("  アーカイブ: {}", archive.display());
    }
    println!("  マニフェスト: {}", report.manifest_path.display());

    Ok(())
}
