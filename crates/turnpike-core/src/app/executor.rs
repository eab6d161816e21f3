//! TaskExecutor - 1 タスクを終端状態まで進める
//!
//! # フロー
//! 1. `WorkerPool::acquire()` で worker を借りる（待ち時間は acquire_timeout）
//! 2. `prepare()` → `poll_token()` を poll_interval ごとに繰り返す
//! 3. token が出れば `complete`、予算切れなら `fail("Timeout")`、失敗なら `fail(理由)`
//! 4. 終端状態を書いた後、どの経路でも `reset()` → `release()` で worker を返す
//!    （不健全な worker の作り直しが遅くても task の結果は待たせない）
//!
//! # 設計原則
//! - 呼び出し側にエラーを返さない（すべて task の `failed` に変換）
//! - solve 予算は試行開始から計測。prepare / poll が固まっても、外側の
//!   `tokio::time::timeout` で予算 + 1 poll 間隔を超えない

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{Instrument, debug, error, info, warn};

use crate::config::ServiceConfig;
use crate::domain::{Challenge, SolveError, TaskId, TaskRecord};
use crate::pool::{PoolError, WorkerLease, WorkerPool};
use crate::ports::TaskStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorConfig {
    pub acquire_timeout: Duration,
    pub solve_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self::from(&ServiceConfig::default())
    }
}

impl From<&ServiceConfig> for ExecutorConfig {
    fn from(config: &ServiceConfig) -> Self {
        Self {
            acquire_timeout: config.acquire_timeout,
            solve_timeout: config.solve_timeout,
            poll_interval: config.poll_interval,
        }
    }
}

/// 1 回の実行で起こりうる失敗。`Display` がそのまま task の `error` になる。
#[derive(Debug, thiserror::Error)]
enum ExecutionFailure {
    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error(transparent)]
    Solve(#[from] SolveError),
}

#[derive(Clone)]
pub struct TaskExecutor {
    pool: WorkerPool,
    store: Arc<dyn TaskStore>,
    config: ExecutorConfig,
}

impl TaskExecutor {
    pub fn new(pool: WorkerPool, store: Arc<dyn TaskStore>, config: ExecutorConfig) -> Self {
        Self {
            pool,
            store,
            config,
        }
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// task を終端状態まで進め、書き込んだ record を返す
    ///
    /// record は呼び出し前に `TaskStore::create` 済みであること。
    /// store への書き込みに失敗した場合はログに残して `None`。
    pub async fn run(&self, id: TaskId, challenge: Challenge) -> Option<TaskRecord> {
        let span = tracing::info_span!("task", task_id = %id, url = %challenge.website_url);
        self.execute(id, challenge).instrument(span).await
    }

    /// `run` を tokio runtime に切り離して実行する
    pub fn spawn(&self, id: TaskId, challenge: Challenge) -> JoinHandle<Option<TaskRecord>> {
        let executor = self.clone();
        tokio::spawn(async move { executor.run(id, challenge).await })
    }

    async fn execute(&self, id: TaskId, challenge: Challenge) -> Option<TaskRecord> {
        let started = Instant::now();

        let mut lease = match self.pool.acquire(self.config.acquire_timeout).await {
            Ok(lease) => lease,
            Err(e) => return self.record(id, Err(e.into()), started).await,
        };
        debug!(worker_id = %lease.id(), slot = lease.slot(), "worker acquired");

        let outcome = self.attempt(&mut lease, &challenge).await;
        // 終端状態を先に書く。返却（作り直しを含む）はその後
        let record = self.record(id, outcome, started).await;

        if let Ok(worker) = lease.worker_mut() {
            worker.reset().await;
        }
        lease.release().await;
        record
    }

    async fn record(
        &self,
        id: TaskId,
        outcome: Result<String, ExecutionFailure>,
        started: Instant,
    ) -> Option<TaskRecord> {
        let elapsed_ms = started.elapsed().as_millis() as u64;
        let written = match outcome {
            Ok(token) => {
                info!(elapsed_ms, "task solved");
                self.store.complete(id, token).await
            }
            Err(failure) => {
                warn!(elapsed_ms, reason = %failure, "task failed");
                self.store.fail(id, failure.to_string()).await
            }
        };

        match written {
            Ok(record) => Some(record),
            Err(e) => {
                error!(error = %e, "could not record task outcome");
                None
            }
        }
    }

    async fn attempt(
        &self,
        lease: &mut WorkerLease,
        challenge: &Challenge,
    ) -> Result<String, ExecutionFailure> {
        let budget = self.config.solve_timeout;
        let hard_limit = budget + self.config.poll_interval;
        match tokio::time::timeout(hard_limit, self.solve(lease, challenge, budget)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(budget_ms = budget.as_millis() as u64, "worker did not respond within budget");
                Err(SolveError::Timeout.into())
            }
        }
    }

    async fn solve(
        &self,
        lease: &mut WorkerLease,
        challenge: &Challenge,
        budget: Duration,
    ) -> Result<String, ExecutionFailure> {
        let deadline = Instant::now() + budget;
        let worker = lease.worker_mut()?;
        worker.prepare(challenge).await?;

        let mut polls = 0u32;
        loop {
            polls += 1;
            if let Some(token) = worker.poll_token().await?
                && !token.is_empty()
            {
                debug!(polls, "token observed");
                return Ok(token);
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(SolveError::Timeout.into());
            }
            tokio::time::sleep(self.config.poll_interval.min(deadline - now)).await;
        }
    }
}
