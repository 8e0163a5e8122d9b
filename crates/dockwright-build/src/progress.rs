use indicatif::{ProgressBar, ProgressStyle};

/// エンジン呼び出し中のスピナー
///
/// メッセージはエンジンが最後に報告した進捗行に追従する。
pub struct EngineProgress {
    progress_bar: ProgressBar,
    action: String,
}

impl EngineProgress {
    pub fn new(action: &str, target: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) =
            ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")
        {
            pb.set_style(style);
        }
        pb.set_message(format!("{} {}...", action, target));

        Self {
            progress_bar: pb,
            action: action.to_string(),
        }
    }

    /// 何も表示しない（quiet ビルド用）
    pub fn hidden(action: &str) -> Self {
        Self {
            progress_bar: ProgressBar::hidden(),
            action: action.to_string(),
        }
    }

    pub fn set_message(&self, msg: &str) {
        let line = msg.trim();
        if !line.is_empty() {
            self.progress_bar.set_message(line.to_string());
        }
    }

    pub fn tick(&self) {
        self.progress_bar.tick();
    }

    pub fn finish_success(&self, message: &str) {
        self.progress_bar.finish_with_message(format!("{} ✓", message));
    }

    pub fn finish_error(&self, error: &str) {
        self.progress_bar
            .finish_with_message(format!("{} failed: {}", self.action, error));
    }
}
