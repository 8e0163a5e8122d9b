//! プッシュのリトライ
//!
//! 固定間隔で最大 `retries` 回リトライする（試行回数は最大 `retries + 1`）。
//! 最後の試行のエラーをそのまま返す。

use crate::error::{EngineError, EngineResult};
use dockwright_core::RetrySettings;
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    retries: u32,
    delay: Duration,
}

/// リトライを使い切った
#[derive(Debug)]
pub struct RetryExhausted {
    pub attempts: u32,
    pub error: EngineError,
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self::new(settings.count, settings.delay)
    }
}

impl RetryPolicy {
    pub fn new(retries: u32, delay: Duration) -> Self {
        Self { retries, delay }
    }

    /// `operation` を成功するかリトライを使い切るまで実行する
    pub async fn run<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, RetryExhausted>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = EngineResult<T>>,
    {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match operation().await {
                Ok(value) => return Ok(value),
                Err(error) if attempt <= self.retries => {
                    tracing::warn!(
                        "Failed to push {}, retrying in {}s ({}/{}): {}",
                        label,
                        self.delay.as_secs(),
                        attempt,
                        self.retries,
                        error
                    );
                    tokio::time::sleep(self.delay).await;
                }
                Err(error) => {
                    return Err(RetryExhausted {
                        attempts: attempt,
                        error,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn failure(n: u32) -> EngineError {
        EngineError::PushFailed {
            image: "img:1".to_string(),
            message: format!("attempt {} refused", n),
        }
    }

    /// 最初の `failures` 回だけ失敗する操作
    async fn flaky(calls: &AtomicU32, failures: u32) -> EngineResult<&'static str> {
        let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
        if n <= failures {
            Err(failure(n))
        } else {
            Ok("pushed")
        }
    }

    #[tokio::test]
    async fn test_succeeds_after_failures_within_budget() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(3, Duration::ZERO);

        let result = policy.run("img:1", || flaky(&calls, 3)).await;
        assert_eq!(result.unwrap(), "pushed");
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_surfaces_last_error_when_exhausted() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(2, Duration::ZERO);

        let exhausted = policy.run("img:1", || flaky(&calls, 5)).await.unwrap_err();
        assert_eq!(exhausted.attempts, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(exhausted.error.to_string().contains("attempt 3 refused"));
    }

    #[tokio::test]
    async fn test_zero_retries_means_single_attempt() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(0, Duration::ZERO);

        let exhausted = policy.run("img:1", || flaky(&calls, 1)).await.unwrap_err();
        assert_eq!(exhausted.attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_fixed_delay_between_attempts() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(2, Duration::from_secs(10));
        let started = tokio::time::Instant::now();

        policy.run("img:1", || flaky(&calls, 2)).await.unwrap();
        assert_eq!(started.elapsed(), Duration::from_secs(20));
    }
}
