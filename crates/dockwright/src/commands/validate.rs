use crate::project::ProjectArgs;
use colored::Colorize;
use dockwright_build::{ImageReference, Orchestrator, expand, expansion_table};

pub fn handle(project: &ProjectArgs, json: bool) -> anyhow::Result<()> {
    let config = match project.load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", "✗ 設定エラー".red().bold());
            eprintln!("  {:#}", e);
            std::process::exit(1);
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    println!("{}", "✓ プロジェクトファイルは正常です！".green().bold());
    println!();
    println!("サマリー:");
    println!("  プロジェクト: {}", config.project_name.cyan());
    println!("  ルート: {}", config.project_root.display());

    if let Some(reason) = Orchestrator::skip_reason(&config) {
        println!("  {}", format!("ビルドはスキップされます: {}", reason).yellow());
        return Ok(());
    }

    if config.revision_in_image() {
        // リビジョンはビルド時に git から解決される
        println!(
            "  イメージ: {} {}",
            config.image_name.cyan(),
            "(リビジョンはビルド時に解決)".dimmed()
        );
    } else {
        let table = expansion_table(&config.properties, None);
        let image_name = expand(&config.image_name, &table);
        match ImageReference::create(&image_name, &config.tags) {
            Ok(image) => {
                println!("  イメージ: {}", image.primary().cyan());
                for tag in image.additional_tags() {
                    println!("    - {}", tag);
                }
            }
            Err(e) => {
                eprintln!();
                eprintln!("{}", "✗ イメージ名が不正です".red().bold());
                eprintln!("  {}", e.user_message());
                std::process::exit(1);
            }
        }
    }

    let base = config.recipe.base_image.as_deref().unwrap_or("(未設定)");
    match &config.docker_directory {
        Some(dir) => println!("  Dockerfile: {}", dir.dockerfile().display()),
        None => println!("  ベースイメージ: {}", base),
    }
    println!("  リソース: {}個", config.resources.len());
    println!("  マニフェスト: {}", config.manifest_path.display());

    Ok(())
}
