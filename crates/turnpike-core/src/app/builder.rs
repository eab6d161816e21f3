//! AppBuilder - アプリケーションの構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）
//! - 起動順序: プールの起動が終わってから App を返す（listen はその後）

use std::sync::Arc;

use super::executor::{ExecutorConfig, TaskExecutor};
use super::service::App;
use crate::config::{ConfigError, ServiceConfig};
use crate::impls::InMemoryTaskStore;
use crate::pool::WorkerPool;
use crate::ports::{Clock, IdGenerator, SystemClock, TaskStore, UlidGenerator, WorkerFactory};

/// AppBuilder はアプリケーションを構築
///
/// # 使用例
/// ```ignore
/// let app = AppBuilder::new(config)
///     .factory(SimulatedFactory::new())
///     .build()
///     .await?;
/// ```
///
/// # Fail-fast 設計
/// - build() 時に設定値を検証（`ServiceConfig::validate`）
/// - WorkerFactory が無ければ BuildError
/// - worker の起動失敗は致命的にしない（プールが小さくなるだけ）
pub struct AppBuilder {
    config: ServiceConfig,
    factory: Option<Arc<dyn WorkerFactory>>,
    store: Option<Arc<dyn TaskStore>>,
    clock: Option<Arc<dyn Clock>>,
}

/// BuildError はアプリケーション構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("No worker factory configured. Call AppBuilder::factory() before build().")]
    MissingFactory,

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl AppBuilder {
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            config,
            factory: None,
            store: None,
            clock: None,
        }
    }

    /// worker を起動する backend を設定（必須）
    pub fn factory(mut self, factory: impl WorkerFactory + 'static) -> Self {
        self.factory = Some(Arc::new(factory));
        self
    }

    /// 省略時は `InMemoryTaskStore`
    pub fn store(mut self, store: Arc<dyn TaskStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// 省略時は `SystemClock`。store を省略した場合はその store にも使われる。
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// 設定を検証し、worker プールを起動して App を返す
    pub async fn build(self) -> Result<App, BuildError> {
        self.config.validate()?;
        let factory = self.factory.ok_or(BuildError::MissingFactory)?;

        let clock: Arc<dyn Clock> = match self.clock {
            Some(clock) => clock,
            None => Arc::new(SystemClock),
        };
        let store: Arc<dyn TaskStore> = match self.store {
            Some(store) => store,
            None => Arc::new(InMemoryTaskStore::new(Arc::clone(&clock))),
        };
        let ids: Arc<dyn IdGenerator> = Arc::new(UlidGenerator::new(clock));

        let pool = WorkerPool::launch(
            factory,
            Arc::clone(&ids),
            self.config.workers,
            self.config.launch_options(),
        )
        .await;
        let executor = TaskExecutor::new(pool, Arc::clone(&store), ExecutorConfig::from(&self.config));

        Ok(App::new(self.config, store, ids, executor))
    }
}
