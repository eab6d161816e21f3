//! Ports - 抽象化レイヤー
//!
//! Hexagonal Architecture の「ポート」を定義します。
//! 各 trait は外部（ブラウザ自動化、時刻、ID 生成、状態の保存先）への
//! インターフェースで、実装は `impls` や利用側の crate が提供します。

pub mod clock;
pub mod id_generator;
pub mod solver;
pub mod task_store;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::solver::{ChallengeWorker, LaunchOptions, WorkerFactory};
pub use self::task_store::TaskStore;
