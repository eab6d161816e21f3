//! WorkerPool - idle worker の管理と公平な貸し出し
//!
//! # 実装
//! - idle worker は `std::sync::Mutex<VecDeque<_>>`（ロック中に await しない）
//! - 貸し出し許可は `Semaphore`。acquire した permit は `forget()` し、
//!   返却時に `add_permits(1)` で戻す
//! - 返却は「idle に push → permit を追加」の順。逆順にすると permit を取った
//!   側が空の idle を見てしまう

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use super::{PoolError, WorkerLease};
use crate::domain::WorkerId;
use crate::ports::{ChallengeWorker, IdGenerator, LaunchOptions, WorkerFactory};

pub(super) struct PooledWorker {
    pub(super) id: WorkerId,
    pub(super) slot: usize,
    pub(super) worker: Box<dyn ChallengeWorker>,
}

pub(super) struct PoolInner {
    idle: Mutex<VecDeque<PooledWorker>>,
    permits: Semaphore,
    live: AtomicUsize,
    capacity: usize,
    factory: Arc<dyn WorkerFactory>,
    ids: Arc<dyn IdGenerator>,
    options: LaunchOptions,
}

impl PoolInner {
    fn lock_idle(&self) -> MutexGuard<'_, VecDeque<PooledWorker>> {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(super) fn is_closed(&self) -> bool {
        self.permits.is_closed()
    }

    /// idle に戻して permit を 1 つ追加する。閉じたプールには戻さない。
    pub(super) fn admit(&self, pooled: PooledWorker) {
        let mut idle = self.lock_idle();
        if self.permits.is_closed() {
            drop(idle);
            self.live.fetch_sub(1, Ordering::SeqCst);
            debug!(worker_id = %pooled.id, "pool closed, discarding returned worker");
            return;
        }
        idle.push_back(pooled);
        drop(idle);
        self.permits.add_permits(1);
    }

    /// 不健全な worker を止めて同じ slot に新しい worker を起動する
    pub(super) async fn recycle(&self, mut retired: PooledWorker) -> Option<PooledWorker> {
        warn!(worker_id = %retired.id, slot = retired.slot, "worker unhealthy, replacing");
        retired.worker.shutdown().await;
        match self.factory.launch(retired.slot, &self.options).await {
            Ok(worker) => {
                let id = self.ids.generate_worker_id();
                info!(worker_id = %id, slot = retired.slot, "replacement worker ready");
                Some(PooledWorker {
                    id,
                    slot: retired.slot,
                    worker,
                })
            }
            Err(e) => {
                let live = self.live.fetch_sub(1, Ordering::SeqCst) - 1;
                error!(
                    slot = retired.slot,
                    error = %e,
                    live,
                    "replacement launch failed, pool shrinks"
                );
                None
            }
        }
    }

    /// プールが閉じた後に返ってきた worker を止める
    pub(super) async fn retire(&self, mut pooled: PooledWorker) {
        pooled.worker.shutdown().await;
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

/// WorkerPool は固定サイズの worker プール
///
/// # 使用例
/// ```ignore
/// let pool = WorkerPool::launch(factory, ids, 2, LaunchOptions::default()).await;
/// let mut lease = pool.acquire(Duration::from_secs(30)).await?;
/// lease.worker_mut()?.prepare(&challenge).await?;
/// lease.release().await;
/// ```
#[derive(Clone)]
pub struct WorkerPool {
    inner: Arc<PoolInner>,
}

impl WorkerPool {
    /// `size` 個の worker を順番に起動する
    ///
    /// 起動に失敗した slot はログに残してスキップします（致命的エラーにはしない）。
    /// 実際のサイズは `size()` で確認できます。
    pub async fn launch(
        factory: Arc<dyn WorkerFactory>,
        ids: Arc<dyn IdGenerator>,
        size: usize,
        options: LaunchOptions,
    ) -> Self {
        let mut idle = VecDeque::with_capacity(size);
        for slot in 1..=size {
            match factory.launch(slot, &options).await {
                Ok(worker) => {
                    let id = ids.generate_worker_id();
                    info!(worker_id = %id, slot, "worker ready");
                    idle.push_back(PooledWorker { id, slot, worker });
                }
                Err(e) => error!(slot, error = %e, "worker launch failed"),
            }
        }

        let started = idle.len();
        if started < size {
            warn!(started, requested = size, "worker pool started below requested size");
        } else {
            info!(size = started, "worker pool started");
        }

        Self {
            inner: Arc::new(PoolInner {
                idle: Mutex::new(idle),
                permits: Semaphore::new(started),
                live: AtomicUsize::new(started),
                capacity: size,
                factory,
                ids,
                options,
            }),
        }
    }

    /// idle worker を 1 つ借りる。`deadline` 以内に空かなければ `NoWorkerAvailable`。
    ///
    /// 待っている呼び出しは到着順に処理されます。
    pub async fn acquire(&self, deadline: Duration) -> Result<WorkerLease, PoolError> {
        let permit = match tokio::time::timeout(deadline, self.inner.permits.acquire()).await {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => return Err(PoolError::Closed),
            Err(_) => return Err(PoolError::NoWorkerAvailable { waited: deadline }),
        };
        permit.forget();

        let pooled = self.inner.lock_idle().pop_front();
        match pooled {
            Some(pooled) => {
                debug!(worker_id = %pooled.id, slot = pooled.slot, "worker leased");
                Ok(WorkerLease::new(pooled, Arc::clone(&self.inner)))
            }
            // shutdown() が idle を空にした直後だけ起こる
            None => Err(PoolError::Closed),
        }
    }

    /// 生きている worker 数（貸し出し中 + idle）
    pub fn size(&self) -> usize {
        self.inner.live.load(Ordering::SeqCst)
    }

    /// 今すぐ貸し出せる worker 数
    pub fn available(&self) -> usize {
        self.inner.lock_idle().len()
    }

    /// 起動時に要求されたサイズ
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// 新規の貸し出しを止め、idle worker をすべて shutdown する
    ///
    /// 貸し出し中の worker は返却時に shutdown されます。
    pub async fn shutdown(&self) {
        let drained: Vec<PooledWorker> = {
            let mut idle = self.inner.lock_idle();
            self.inner.permits.close();
            idle.drain(..).collect()
        };
        let count = drained.len();
        for pooled in drained {
            self.inner.retire(pooled).await;
        }
        info!(stopped = count, "worker pool shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Challenge, SolveError};
    use crate::impls::SimulatedFactory;
    use crate::ports::{SystemClock, UlidGenerator};
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;
    use tokio::time::Instant;

    fn ids() -> Arc<dyn IdGenerator> {
        Arc::new(UlidGenerator::new(SystemClock))
    }

    async fn pool_of(factory: &SimulatedFactory, size: usize) -> WorkerPool {
        WorkerPool::launch(Arc::new(factory.clone()), ids(), size, LaunchOptions::default()).await
    }

    fn challenge() -> Challenge {
        Challenge::new("https://example.com", "0xTESTKEY")
    }

    #[tokio::test]
    async fn launches_requested_number_of_workers() {
        let factory = SimulatedFactory::new();
        let pool = pool_of(&factory, 3).await;

        assert_eq!(pool.size(), 3);
        assert_eq!(pool.available(), 3);
        assert_eq!(pool.capacity(), 3);
        assert_eq!(factory.launches(), 3);
    }

    #[tokio::test]
    async fn failed_launches_shrink_the_pool_without_error() {
        let factory = SimulatedFactory::new().failing_launch(&[2]);
        let pool = pool_of(&factory, 3).await;

        assert_eq!(pool.size(), 2);
        assert_eq!(pool.capacity(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn acquire_times_out_when_all_workers_are_leased() {
        let factory = SimulatedFactory::new();
        let pool = pool_of(&factory, 1).await;
        let _held = pool.acquire(Duration::from_secs(1)).await.unwrap();

        let start = Instant::now();
        let err = pool.acquire(Duration::from_secs(30)).await.unwrap_err();

        assert_eq!(
            err,
            PoolError::NoWorkerAvailable {
                waited: Duration::from_secs(30)
            }
        );
        assert_eq!(err.to_string(), "No worker available");
        assert!(start.elapsed() >= Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_pool_always_times_out() {
        let factory = SimulatedFactory::new().failing_launch(&[1]);
        let pool = pool_of(&factory, 1).await;

        assert_eq!(pool.size(), 0);
        assert!(matches!(
            pool.acquire(Duration::from_secs(5)).await,
            Err(PoolError::NoWorkerAvailable { .. })
        ));
    }

    #[tokio::test]
    async fn dropped_lease_returns_worker() {
        let factory = SimulatedFactory::new();
        let pool = pool_of(&factory, 1).await;

        let lease = pool.acquire(Duration::from_secs(1)).await.unwrap();
        assert_eq!(pool.available(), 0);
        drop(lease);

        assert_eq!(pool.available(), 1);
        assert!(pool.acquire(Duration::from_secs(1)).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn waiters_are_served_in_arrival_order() {
        let factory = SimulatedFactory::new();
        let pool = pool_of(&factory, 1).await;
        let order = Arc::new(StdMutex::new(Vec::new()));
        let held = pool.acquire(Duration::from_secs(1)).await.unwrap();

        let mut joins = Vec::new();
        for name in ["first", "second", "third"] {
            let pool = pool.clone();
            let order = Arc::clone(&order);
            joins.push(tokio::spawn(async move {
                let lease = pool.acquire(Duration::from_secs(60)).await.unwrap();
                order.lock().unwrap().push(name);
                tokio::time::sleep(Duration::from_millis(10)).await;
                lease.release().await;
            }));
            // 次の waiter より先に待ち行列に入れる
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        held.release().await;
        for join in joins {
            join.await.unwrap();
        }

        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_leases_never_exceed_pool_size() {
        let factory = SimulatedFactory::new();
        let pool = pool_of(&factory, 2).await;

        let mut joins = Vec::new();
        for _ in 0..6 {
            let pool = pool.clone();
            joins.push(tokio::spawn(async move {
                let mut lease = pool.acquire(Duration::from_secs(60)).await.unwrap();
                lease.worker_mut().unwrap().prepare(&challenge()).await.unwrap();
                tokio::time::sleep(Duration::from_secs(5)).await;
                lease.worker_mut().unwrap().reset().await;
                lease.release().await;
            }));
        }
        for join in joins {
            join.await.unwrap();
        }

        assert_eq!(factory.peak_active(), 2);
        assert_eq!(factory.launches(), 2);
        assert_eq!(pool.available(), 2);
    }

    #[tokio::test]
    async fn unhealthy_worker_is_replaced_on_release() {
        let factory = SimulatedFactory::new().unhealthy_after(1);
        let pool = pool_of(&factory, 1).await;

        let mut lease = pool.acquire(Duration::from_secs(1)).await.unwrap();
        let first_id = lease.id();
        lease.worker_mut().unwrap().prepare(&challenge()).await.unwrap();
        lease.worker_mut().unwrap().reset().await;
        lease.release().await;

        assert_eq!(factory.shutdowns(), 1);
        assert_eq!(factory.launches(), 2);
        assert_eq!(pool.size(), 1);

        let lease = pool.acquire(Duration::from_secs(1)).await.unwrap();
        assert_ne!(lease.id(), first_id);
        assert_eq!(lease.slot(), 1);
    }

    /// 最初の `allowed` 回だけ起動に成功する factory
    struct LimitedFactory {
        inner: SimulatedFactory,
        allowed: StdMutex<usize>,
    }

    #[async_trait]
    impl WorkerFactory for LimitedFactory {
        async fn launch(
            &self,
            slot: usize,
            options: &LaunchOptions,
        ) -> Result<Box<dyn ChallengeWorker>, SolveError> {
            {
                let mut allowed = self.allowed.lock().unwrap();
                if *allowed == 0 {
                    return Err(SolveError::Launch("out of browsers".into()));
                }
                *allowed -= 1;
            }
            self.inner.launch(slot, options).await
        }
    }

    #[tokio::test]
    async fn failed_replacement_shrinks_pool() {
        let factory = LimitedFactory {
            inner: SimulatedFactory::new().unhealthy_after(1),
            allowed: StdMutex::new(2),
        };
        let pool = WorkerPool::launch(Arc::new(factory), ids(), 2, LaunchOptions::default()).await;
        assert_eq!(pool.size(), 2);

        let mut lease = pool.acquire(Duration::from_secs(1)).await.unwrap();
        lease.worker_mut().unwrap().prepare(&challenge()).await.unwrap();
        lease.worker_mut().unwrap().reset().await;
        lease.release().await;

        assert_eq!(pool.size(), 1);
        assert_eq!(pool.available(), 1);
    }

    #[tokio::test]
    async fn shutdown_stops_idle_workers_and_closes_admission() {
        let factory = SimulatedFactory::new();
        let pool = pool_of(&factory, 2).await;
        let leased = pool.acquire(Duration::from_secs(1)).await.unwrap();

        pool.shutdown().await;
        assert_eq!(factory.shutdowns(), 1);
        assert_eq!(
            pool.acquire(Duration::from_secs(1)).await.unwrap_err(),
            PoolError::Closed
        );

        leased.release().await;
        assert_eq!(factory.shutdowns(), 2);
        assert_eq!(pool.size(), 0);
    }
}
