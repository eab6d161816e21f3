//! Errors - ドメインエラー
//!
//! # 分類
//! - **StoreError**: TaskStore の操作エラー（未登録・重複）
//! - **SolveError**: solver（外部のブラウザ自動化）の失敗
//!
//! executor 内部の失敗はすべて task の `failed` 状態に変換されます。
//! HTTP のステータスとして返るのは入力エラーと未登録エラーだけです。

use super::TaskId;

/// TaskStore の操作エラー
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("task not found: {0}")]
    NotFound(TaskId),

    #[error("task already exists: {0}")]
    AlreadyExists(TaskId),
}

/// Failure surfaced by the external solve capability.
///
/// The `Display` text is what ends up in the task's `error` field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SolveError {
    /// No token within the per-task budget.
    #[error("Timeout")]
    Timeout,

    #[error("worker launch failed: {0}")]
    Launch(String),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("worker crashed: {0}")]
    Crashed(String),

    #[error("{0}")]
    Other(String),
}
