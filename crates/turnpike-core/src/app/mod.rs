//! App - アプリケーション層
//!
//! このモジュールは、ports と pool を組み合わせてアプリケーションロジックを実装します。
//!
//! # 主要コンポーネント
//! - **AppBuilder**: アプリケーションの構築とワイヤリング
//! - **App**: submit / get_result / solve_now / health
//! - **TaskExecutor**: acquire→prepare→poll→complete/fail→release
//! - **ReaperLoop**: 保持期間切れ record の回収
//! - **HealthReport**: `/health` の中身

pub mod builder;
pub mod executor;
pub mod reaper_loop;
pub mod service;
pub mod status;

// 主要な型を再エクスポート
pub use self::builder::{AppBuilder, BuildError};
pub use self::executor::{ExecutorConfig, TaskExecutor};
pub use self::reaper_loop::ReaperLoop;
pub use self::service::{App, AppError, SolveReport};
pub use self::status::HealthReport;
