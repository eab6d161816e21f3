//! TaskStore port - タスク状態の正本（source of truth）
//!
//! # 実装
//! - **InMemoryTaskStore**（`impls::inmem_task_store`）: プロセス内メモリのみ
//!
//! 再起動を跨いだ永続化はしません。

use async_trait::async_trait;
use std::time::Duration;

use crate::domain::{Challenge, StoreError, TaskId, TaskRecord};
use crate::observability::TaskCounts;

/// TaskStore は task_id → TaskRecord の並行アクセス可能なマップ
///
/// # 設計原則
/// - 作成した瞬間から `get` で見える（status = processing）
/// - 終端状態への書き込みは 1 回だけ有効（2 回目以降は no-op で現在の record を返す）
/// - 排他は store 自身が持つ（呼び出し側はロックを意識しない）
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// processing 状態で作成。同じ ID が既にあれば `AlreadyExists`。
    async fn create(&self, id: TaskId, challenge: Challenge) -> Result<TaskRecord, StoreError>;

    /// processing → ready
    async fn complete(&self, id: TaskId, token: String) -> Result<TaskRecord, StoreError>;

    /// processing → failed
    async fn fail(&self, id: TaskId, error: String) -> Result<TaskRecord, StoreError>;

    async fn get(&self, id: TaskId) -> Result<TaskRecord, StoreError>;

    /// `created_at` が `now - max_age` より古いものを削除して件数を返す
    async fn evict_older_than(&self, max_age: Duration) -> usize;

    async fn counts(&self) -> TaskCounts;
}
