//! Status - `/health` の中身

use serde::{Deserialize, Serialize};

use crate::observability::TaskCounts;

/// HealthReport はプールと store の現在の状態
///
/// - `pool_size`: 今すぐ貸し出せる（idle な）worker 数。全 worker 貸し出し中なら 0
/// - `live_workers`: 生きている worker 数（貸し出し中 + idle）
/// - `pending_tasks`: processing 状態の task 数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub pool_size: usize,
    pub live_workers: usize,
    pub pending_tasks: usize,
}

impl HealthReport {
    pub fn new(idle: usize, live_workers: usize, counts: TaskCounts) -> Self {
        Self {
            status: "ok".to_string(),
            pool_size: idle,
            live_workers,
            pending_tasks: counts.processing,
        }
    }
}
