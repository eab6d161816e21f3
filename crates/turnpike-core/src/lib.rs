//! turnpike-core
//!
//! Core building blocks for the turnpike challenge-solving service.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, challenge, state, task, errors）
//! - **ports**: 抽象化レイヤー（TaskStore, ChallengeWorker, WorkerFactory, Clock, IdGenerator）
//! - **impls**: 実装（InMemoryTaskStore, SimulatedFactory）
//! - **pool**: 固定サイズの worker プール
//! - **app**: アプリケーションロジック（builder, executor, reaper_loop, service, status）
//! - **api**: HTTP ルート（axum）
//! - **client**: HTTP クライアント（reqwest）
//! - **config**: サービス設定
//! - **observability**: health 用のカウンタ

pub mod api;
pub mod app;
pub mod client;
pub mod config;
pub mod domain;
pub mod impls;
pub mod observability;
pub mod pool;
pub mod ports;

pub use self::app::{App, AppBuilder};
pub use self::config::ServiceConfig;
