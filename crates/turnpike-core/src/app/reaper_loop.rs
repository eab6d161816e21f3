//! ReaperLoop - 古い task record の回収
//!
//! 結果を取りに来ないクライアントがいても store が無制限に育たないよう、
//! `created_at` が保持期間を過ぎた record を定期的に削除します。

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::ports::TaskStore;

/// ReaperLoop は保持期間切れの record を削除し続ける
///
/// # フロー
/// 1. `interval` だけ sleep
/// 2. `TaskStore::evict_older_than(retention)`
/// 3. 削除件数が 0 でなければログ
///
/// 読み取りは保持期間を延ばしません。
pub struct ReaperLoop {
    store: Arc<dyn TaskStore>,
    interval: Duration,
    retention: Duration,
}

impl ReaperLoop {
    pub fn new(store: Arc<dyn TaskStore>, interval: Duration, retention: Duration) -> Self {
        Self {
            store,
            interval,
            retention,
        }
    }

    /// 1 回分の回収。削除した件数を返す。
    pub async fn sweep_once(&self) -> usize {
        let evicted = self.store.evict_older_than(self.retention).await;
        if evicted > 0 {
            let remaining = self.store.counts().await.total();
            debug!(evicted, remaining, "evicted expired task records");
        }
        evicted
    }

    pub async fn run(self) {
        info!(
            interval_secs = self.interval.as_secs(),
            retention_secs = self.retention.as_secs(),
            "reaper loop started"
        );
        loop {
            tokio::time::sleep(self.interval).await;
            self.sweep_once().await;
        }
    }

    /// プロセスが終わるまで回り続ける。止めるときは `JoinHandle::abort()`。
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}
