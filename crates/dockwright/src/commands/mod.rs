pub mod build;
pub mod dockerfile;
pub mod validate;

use colored::Colorize;
use dockwright_build::BuildError;

/// ビルドエラーを表示して終了する
pub(crate) fn exit_with_build_error(err: &BuildError) -> ! {
    eprintln!();
    match err.step() {
        Some(step) => eprintln!("{}", format!("✗ {} ステップで失敗しました", step).red().bold()),
        None => eprintln!("{}", "✗ ビルドに失敗しました".red().bold()),
    }
    eprintln!("  {}", err.user_message());
    std::process::exit(1);
}
