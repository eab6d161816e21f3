//! Impls - ports の実装（本番用のメモリ実装・開発用の solver）
//!
//! # 含まれる実装
//! - **InMemoryTaskStore**: TaskStore（プロセス内メモリ）
//! - **SimulatedFactory**: ブラウザを使わない WorkerFactory
//!
//! 実ブラウザの WorkerFactory は別クレートで `ports::WorkerFactory` を実装します。

pub mod inmem_task_store;
pub mod simulated;

pub use self::inmem_task_store::InMemoryTaskStore;
pub use self::simulated::SimulatedFactory;
