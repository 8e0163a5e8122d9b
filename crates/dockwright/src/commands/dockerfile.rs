use crate::project::ProjectArgs;
use colored::Colorize;
use dockwright_build::Orchestrator;

pub async fn handle(project: &ProjectArgs) -> anyhow::Result<()> {
    let config = project.load()?;

    if let Some(reason) = Orchestrator::skip_reason(&config) {
        println!("{}", format!("⊘ スキップしました: {}", reason).yellow());
        return Ok(());
    }

    let plan = match Orchestrator::default().plan(&config).await {
        Ok(plan) => plan,
        Err(e) => super::exit_with_build_error(&e),
    };

    println!("{} {}", "イメージ:".bold(), plan.image.primary().cyan());
    if let Some(revision) = &plan.revision {
        println!("{} {}", "リビジョン:".bold(), revision.revision());
    }
    println!(
        "{} {}",
        "ビルドコンテキスト:".bold(),
        plan.context_dir.display()
    );
    println!();

    println!("{}", format!("ステージング ({}件):", plan.staged.len()).bold());
    for path in plan.staged.paths() {
        println!("  {}", path);
    }
    println!();

    match &plan.dockerfile {
        Some(content) => {
            println!("{}", "Dockerfile:".bold());
            print!("{}", content);
        }
        None => {
            println!(
                "{}",
                "docker_directory の Dockerfile をそのまま使用します".yellow()
            );
        }
    }

    Ok(())
}
