//! Solver ports - 外部のブラウザ自動化（challenge solver）の抽象化
//!
//! ページ遷移・widget の注入・DOM のポーリングなどはこの crate の外側の責務です。
//! core が必要とするのは「worker を起動する」「challenge を仕込む」「token を覗く」だけ。
//!
//! # ポーリング前提
//! solver は「呼べば token が返る」API ではなく、副作用として token を出すので、
//! executor が `poll_token()` を一定間隔でサンプリングします。

use async_trait::async_trait;

use crate::domain::{Challenge, SolveError};

/// Options passed to every worker launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchOptions {
    /// `false` runs with a visible browser window.
    pub headless: bool,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self { headless: true }
    }
}

/// One long-lived, automation-capable unit (e.g. one launched browser).
///
/// A worker is only ever driven by one executor at a time, so methods take `&mut self`.
#[async_trait]
pub trait ChallengeWorker: Send {
    /// Open a fresh page for `challenge` and start the widget.
    async fn prepare(&mut self, challenge: &Challenge) -> Result<(), SolveError>;

    /// Sample the page for a token. `Ok(None)` means "not yet".
    async fn poll_token(&mut self) -> Result<Option<String>, SolveError>;

    /// Close whatever `prepare` opened. Called on every path, success or not.
    async fn reset(&mut self);

    /// Checked before the worker is returned to the idle set.
    async fn is_healthy(&mut self) -> bool {
        true
    }

    /// Release the underlying engine. The worker is not used afterwards.
    async fn shutdown(&mut self) {}
}

/// Launches workers for the pool (at startup, and to replace unhealthy ones).
#[async_trait]
pub trait WorkerFactory: Send + Sync {
    /// `slot` is the 1-based pool position, used for logging.
    async fn launch(
        &self,
        slot: usize,
        options: &LaunchOptions,
    ) -> Result<Box<dyn ChallengeWorker>, SolveError>;
}
