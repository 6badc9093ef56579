use std::time::Duration;

/// 再試行間隔と再試行上限。
///
/// 待機時間は `base * 2^(retry_count - 1)`。ジッターは付けず、待機時間自体にも上限を設けない
/// （上限は試行回数で掛ける）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    base: Duration,
    max_retries: u32,
}

impl BackoffPolicy {
    pub fn new(base: Duration, max_retries: u32) -> Self {
        Self { base, max_retries }
    }

    pub fn base(&self) -> Duration {
        self.base
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn delay_for(&self, retry_count: u32) -> Duration {
        if retry_count == 0 {
            return Duration::ZERO;
        }
        2u32.checked_pow(retry_count - 1)
            .and_then(|factor| self.base.checked_mul(factor))
            .unwrap_or(Duration::MAX)
    }

    pub fn is_exhausted(&self, retry_count: u32) -> bool {
        retry_count >= self.max_retries
    }
}
