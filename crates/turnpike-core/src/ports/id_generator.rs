//! IdGenerator port - ID 生成の抽象化
//!
//! # 実装
//! - **UlidGenerator**: ULID ベース（本番用）

use crate::domain::ids::{TaskId, WorkerId};
use crate::ports::Clock;
use ulid::Ulid;

/// IdGenerator は衝突しない ID を生成
///
/// # Thread Safety
/// - `Send + Sync` を要求（HTTP handler から並行に呼ばれる）
pub trait IdGenerator: Send + Sync {
    fn generate_task_id(&self) -> TaskId;

    fn generate_worker_id(&self) -> WorkerId;
}

/// UlidGenerator は ULID ベースの ID 生成器
///
/// Clock を使って timestamp 部分を決めるので、FixedClock で決定的な timestamp を作れます。
/// ランダム部分（80-bit）は常に `rand` から取ります。
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    fn next_ulid(&self) -> Ulid {
        let timestamp_ms = self.clock.now().timestamp_millis().max(0) as u64;
        Ulid::from_parts(timestamp_ms, rand::random())
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_task_id(&self) -> TaskId {
        TaskId::from(self.next_ulid())
    }

    fn generate_worker_id(&self) -> WorkerId {
        WorkerId::from(self.next_ulid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{FixedClock, SystemClock};
    use chrono::{TimeZone, Utc};
    use std::collections::HashSet;

    #[test]
    fn ulid_generator_generates_unique_ids() {
        let id_gen = UlidGenerator::new(SystemClock);

        let ids: HashSet<TaskId> = (0..1_000).map(|_| id_gen.generate_task_id()).collect();
        assert_eq!(ids.len(), 1_000);
    }

    #[test]
    fn ulid_generator_with_fixed_clock_shares_timestamp() {
        let fixed_time = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let id_gen = UlidGenerator::new(FixedClock::new(fixed_time));

        let id1 = id_gen.generate_task_id();
        let id2 = id_gen.generate_task_id();

        // ランダム部分があるので ID は異なる
        assert_ne!(id1, id2);

        // timestamp 部分は同じ
        assert_eq!(id1.as_ulid().timestamp_ms(), id2.as_ulid().timestamp_ms());
        assert_eq!(
            id1.as_ulid().timestamp_ms(),
            fixed_time.timestamp_millis() as u64
        );
    }

    #[test]
    fn worker_and_task_ids_use_their_own_prefix() {
        let id_gen = UlidGenerator::new(SystemClock);

        assert!(id_gen.generate_task_id().to_string().starts_with("task-"));
        assert!(id_gen.generate_worker_id().to_string().starts_with("worker-"));
    }
}
