//! App - 外部（HTTP）から呼ばれる操作の入り口
//!
//! # 操作
//! - `submit`: record を作って executor を切り離して起動、すぐ task_id を返す
//! - `get_result`: store をそのまま読む
//! - `solve_now`: 同期版。executor の完了まで待つ
//! - `health`: プールと store の状態
//!
//! `submit` は solve の完了を待ちません。

use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{error, info};

use super::executor::TaskExecutor;
use super::reaper_loop::ReaperLoop;
use super::status::HealthReport;
use crate::config::ServiceConfig;
use crate::domain::{Challenge, StoreError, TaskId, TaskRecord};
use crate::pool::WorkerPool;
use crate::ports::{IdGenerator, TaskStore};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Task not found")]
    NotFound(String),

    #[error("{0}")]
    Internal(String),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => AppError::NotFound(id.to_string()),
            StoreError::AlreadyExists(_) => AppError::Internal(e.to_string()),
        }
    }
}

/// 同期版 solve の結果
#[derive(Debug, Clone, PartialEq)]
pub struct SolveReport {
    pub record: TaskRecord,
    /// 秒（小数点以下 2 桁）
    pub elapsed: f64,
}

#[derive(Clone)]
pub struct App {
    config: Arc<ServiceConfig>,
    store: Arc<dyn TaskStore>,
    ids: Arc<dyn IdGenerator>,
    executor: TaskExecutor,
}

impl App {
    pub(super) fn new(
        config: ServiceConfig,
        store: Arc<dyn TaskStore>,
        ids: Arc<dyn IdGenerator>,
        executor: TaskExecutor,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            ids,
            executor,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn TaskStore> {
        &self.store
    }

    pub fn pool(&self) -> &WorkerPool {
        self.executor.pool()
    }

    /// processing の record を作り、solve を裏で開始して task_id を返す
    pub async fn submit(&self, challenge: Challenge) -> Result<TaskId, AppError> {
        let id = self.create(&challenge).await?;
        info!(task_id = %id, url = %challenge.website_url, "task submitted");
        self.executor.spawn(id, challenge);
        Ok(id)
    }

    pub async fn get_result(&self, id: TaskId) -> Result<TaskRecord, AppError> {
        Ok(self.store.get(id).await?)
    }

    /// 終端状態になるまで待ってから返す
    pub async fn solve_now(&self, challenge: Challenge) -> Result<SolveReport, AppError> {
        let id = self.create(&challenge).await?;
        info!(task_id = %id, url = %challenge.website_url, "synchronous solve started");
        let started = Instant::now();

        let record = match self.executor.run(id, challenge).await {
            Some(record) => record,
            None => {
                error!(task_id = %id, "synchronous solve lost its record");
                return Err(AppError::Internal("task record disappeared".to_string()));
            }
        };

        let elapsed = (started.elapsed().as_secs_f64() * 100.0).round() / 100.0;
        Ok(SolveReport { record, elapsed })
    }

    pub async fn health(&self) -> HealthReport {
        let pool = self.executor.pool();
        HealthReport::new(pool.available(), pool.size(), self.store.counts().await)
    }

    pub fn spawn_reaper(&self) -> JoinHandle<()> {
        ReaperLoop::new(
            Arc::clone(&self.store),
            self.config.reaper_interval,
            self.config.retention,
        )
        .spawn()
    }

    /// worker をすべて止める。実行中の task は worker 返却時に止まる。
    pub async fn shutdown(&self) {
        self.executor.pool().shutdown().await;
    }

    async fn create(&self, challenge: &Challenge) -> Result<TaskId, AppError> {
        if challenge.website_url.trim().is_empty() || challenge.website_key.trim().is_empty() {
            return Err(AppError::Validation(
                "Missing websiteURL or websiteKey".to_string(),
            ));
        }
        let id = self.ids.generate_task_id();
        self.store.create(id, challenge.clone()).await?;
        Ok(id)
    }
}
