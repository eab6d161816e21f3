//! ServiceConfig - サービス全体の設定値
//!
//! CLI（`turnpike-cli`）が clap で値を集めてここに詰めます。
//! 既定値は `Default` にまとめてあり、テストでは必要なフィールドだけ上書きします。

use std::time::Duration;

use crate::ports::LaunchOptions;

pub const DEFAULT_PORT: u16 = 5072;
pub const DEFAULT_WORKERS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    /// プールに起動する worker 数
    pub workers: usize,
    pub headless: bool,
    /// `/solve` を保護する API key。`None` なら誰でも呼べる。
    pub api_key: Option<String>,
    /// 1 タスクあたりの solve 予算（試行開始から計測）
    pub solve_timeout: Duration,
    pub acquire_timeout: Duration,
    pub poll_interval: Duration,
    pub reaper_interval: Duration,
    /// `created_at` からこの時間を超えた record は削除される
    pub retention: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            workers: DEFAULT_WORKERS,
            headless: true,
            api_key: None,
            solve_timeout: Duration::from_secs(60),
            acquire_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_secs(1),
            reaper_interval: Duration::from_secs(60),
            retention: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for `{key}`: {message}")]
    InvalidValue { key: &'static str, message: String },
}

impl ServiceConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::InvalidValue {
                key: "workers",
                message: "pool needs at least one worker".to_string(),
            });
        }
        let durations = [
            ("solve_timeout", self.solve_timeout),
            ("acquire_timeout", self.acquire_timeout),
            ("poll_interval", self.poll_interval),
            ("reaper_interval", self.reaper_interval),
            ("retention", self.retention),
        ];
        for (key, value) in durations {
            if value.is_zero() {
                return Err(ConfigError::InvalidValue {
                    key,
                    message: "must be greater than zero".to_string(),
                });
            }
        }
        if self.api_key.as_deref().is_some_and(|key| key.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                key: "api_key",
                message: "must not be blank".to_string(),
            });
        }
        Ok(())
    }

    pub fn launch_options(&self) -> LaunchOptions {
        LaunchOptions {
            headless: self.headless,
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn defaults_are_valid() {
        let config = ServiceConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.bind_addr(), "0.0.0.0:5072");
        assert!(config.launch_options().headless);
    }

    #[rstest]
    #[case::no_workers(ServiceConfig { workers: 0, ..Default::default() }, "workers")]
    #[case::zero_solve_budget(ServiceConfig { solve_timeout: Duration::ZERO, ..Default::default() }, "solve_timeout")]
    #[case::zero_poll(ServiceConfig { poll_interval: Duration::ZERO, ..Default::default() }, "poll_interval")]
    #[case::zero_retention(ServiceConfig { retention: Duration::ZERO, ..Default::default() }, "retention")]
    #[case::blank_api_key(ServiceConfig { api_key: Some("  ".into()), ..Default::default() }, "api_key")]
    fn invalid_values_are_rejected(#[case] config: ServiceConfig, #[case] expected_key: &str) {
        match config.validate() {
            Err(ConfigError::InvalidValue { key, .. }) => assert_eq!(key, expected_key),
            other => panic!("expected InvalidValue, got {other:?}"),
        }
    }
}
