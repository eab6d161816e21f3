//! WorkerLease - 貸し出し中の worker

use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use super::PoolError;
use super::worker_pool::{PoolInner, PooledWorker};
use crate::domain::WorkerId;
use crate::ports::ChallengeWorker;

/// WorkerLease は 1 つの worker の排他的な貸し出し
///
/// # 返却
/// - `release().await`: 健全性を確認してから返却（不健全なら作り直す）
/// - drop: 確認なしでそのまま返却（panic や task のキャンセル時）
///
/// どちらの経路でも worker は必ずプールに戻ります。
pub struct WorkerLease {
    pooled: Option<PooledWorker>,
    id: WorkerId,
    slot: usize,
    pool: Arc<PoolInner>,
}

impl WorkerLease {
    pub(super) fn new(pooled: PooledWorker, pool: Arc<PoolInner>) -> Self {
        Self {
            id: pooled.id,
            slot: pooled.slot,
            pooled: Some(pooled),
            pool,
        }
    }

    pub fn id(&self) -> WorkerId {
        self.id
    }

    /// 1-based slot number (stable across replacements)
    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn worker_mut(&mut self) -> Result<&mut dyn ChallengeWorker, PoolError> {
        match self.pooled.as_mut() {
            Some(pooled) => Ok(pooled.worker.as_mut()),
            None => Err(PoolError::Released),
        }
    }

    /// worker をプールに返す。失敗しない。
    pub async fn release(mut self) {
        let Some(mut pooled) = self.pooled.take() else {
            return;
        };

        if self.pool.is_closed() {
            debug!(worker_id = %pooled.id, "pool closed, stopping returned worker");
            self.pool.retire(pooled).await;
            return;
        }

        if pooled.worker.is_healthy().await {
            debug!(worker_id = %pooled.id, slot = pooled.slot, "worker returned");
            self.pool.admit(pooled);
        } else if let Some(replacement) = self.pool.recycle(pooled).await {
            self.pool.admit(replacement);
        }
    }
}

impl fmt::Debug for WorkerLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerLease")
            .field("id", &self.id.to_string())
            .field("slot", &self.slot)
            .field("released", &self.pooled.is_none())
            .finish()
    }
}

impl Drop for WorkerLease {
    fn drop(&mut self) {
        if let Some(pooled) = self.pooled.take() {
            warn!(
                worker_id = %pooled.id,
                slot = pooled.slot,
                "lease dropped without release, returning worker unchecked"
            );
            self.pool.admit(pooled);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use crate::impls::SimulatedFactory;
    use crate::pool::WorkerPool;
    use crate::ports::{LaunchOptions, SystemClock, UlidGenerator};

    #[tokio::test]
    async fn debug_shows_worker_and_slot() {
        let pool = WorkerPool::launch(
            Arc::new(SimulatedFactory::new()),
            Arc::new(UlidGenerator::new(SystemClock)),
            1,
            LaunchOptions::default(),
        )
        .await;
        let lease = pool.acquire(Duration::from_secs(1)).await.unwrap();

        let rendered = format!("{lease:?}");

        assert!(rendered.contains(&lease.id().to_string()));
        assert!(rendered.contains("slot: 1"));
        assert!(rendered.contains("released: false"));
        lease.release().await;
    }
}
