//! State - タスクの状態
//!
//! # 状態遷移
//! - processing → ready
//! - processing → failed
//!
//! ready / failed は終端状態で、以降の遷移はありません。

use serde::{Deserialize, Serialize};
use std::fmt;

/// TaskStatus はタスクの状態を表現
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// 作成直後〜executor が終端状態を書くまで
    Processing,
    /// token を取得できた
    Ready,
    /// タイムアウト・worker 不足・solver エラー
    Failed,
}

impl TaskStatus {
    /// Is this a terminal state (no further transitions)?
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Ready | TaskStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Processing => "processing",
            TaskStatus::Ready => "ready",
            TaskStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
