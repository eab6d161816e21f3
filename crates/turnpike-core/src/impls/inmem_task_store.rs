//! InMemoryTaskStore - プロセス内メモリの TaskStore
//!
//! # 実装詳細
//! - `RwLock<HashMap<TaskId, TaskRecord>>` 1 つで管理
//! - 読み取り（HTTP の結果照会）は並行、書き込みは直列
//! - ロックを保持したまま await しない

use async_trait::async_trait;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::warn;

use crate::domain::{Challenge, StoreError, TaskId, TaskRecord, TaskStatus};
use crate::observability::TaskCounts;
use crate::ports::{Clock, SystemClock, TaskStore};

pub struct InMemoryTaskStore {
    records: RwLock<HashMap<TaskId, TaskRecord>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryTaskStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// 終端状態への遷移を 1 箇所にまとめる
    async fn finish(
        &self,
        id: TaskId,
        apply: impl FnOnce(&mut TaskRecord) -> bool,
    ) -> Result<TaskRecord, StoreError> {
        let mut records = self.records.write().await;
        let record = records.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        if !apply(record) {
            warn!(
                task_id = %id,
                status = %record.status,
                "ignoring second terminal write"
            );
        }
        Ok(record.clone())
    }
}

impl Default for InMemoryTaskStore {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn create(&self, id: TaskId, challenge: Challenge) -> Result<TaskRecord, StoreError> {
        let mut records = self.records.write().await;
        match records.entry(id) {
            Entry::Occupied(_) => Err(StoreError::AlreadyExists(id)),
            Entry::Vacant(slot) => {
                let record = TaskRecord::new(id, challenge, self.clock.now());
                Ok(slot.insert(record).clone())
            }
        }
    }

    async fn complete(&self, id: TaskId, token: String) -> Result<TaskRecord, StoreError> {
        self.finish(id, |record| record.mark_ready(token)).await
    }

    async fn fail(&self, id: TaskId, error: String) -> Result<TaskRecord, StoreError> {
        self.finish(id, |record| record.mark_failed(error)).await
    }

    async fn get(&self, id: TaskId) -> Result<TaskRecord, StoreError> {
        let records = self.records.read().await;
        records.get(&id).cloned().ok_or(StoreError::NotFound(id))
    }

    async fn evict_older_than(&self, max_age: Duration) -> usize {
        let now = self.clock.now();
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, record| record.age(now) <= max_age);
        before - records.len()
    }

    async fn counts(&self) -> TaskCounts {
        let records = self.records.read().await;
        let mut counts = TaskCounts::default();
        for record in records.values() {
            match record.status {
                TaskStatus::Processing => counts.processing += 1,
                TaskStatus::Ready => counts.ready += 1,
                TaskStatus::Failed => counts.failed += 1,
            }
        }
        counts
    }
}
