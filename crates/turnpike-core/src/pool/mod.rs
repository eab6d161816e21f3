//! Pool - 長寿命 worker の固定サイズプール
//!
//! # 構成
//! - **WorkerPool**: 起動時に N 個の worker を作り、acquire / 返却を管理
//! - **WorkerLease**: 貸し出し中の worker 1 つ。drop でもプールに戻る
//!
//! # 設計原則
//! - 待ち行列は FIFO（`tokio::sync::Semaphore` は公平）
//! - permit 数 == idle worker 数 を常に保つ
//! - 返却は失敗しない

mod lease;
mod worker_pool;

use std::time::Duration;

pub use self::lease::WorkerLease;
pub use self::worker_pool::WorkerPool;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    /// acquire の待ち時間を使い切った
    #[error("No worker available")]
    NoWorkerAvailable { waited: Duration },

    #[error("worker pool is shut down")]
    Closed,

    #[error("worker already returned to the pool")]
    Released,
}
