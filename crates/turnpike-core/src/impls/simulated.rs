//! SimulatedFactory - ブラウザを使わない開発用の WorkerFactory
//!
//! 実際のページは開かず、`prepare` 後に指定回数 `poll_token` されると token を返します。
//! ローカル実行（`turnpike --sim-polls N`）とテストで使います。
//!
//! # 振る舞いの切り替え
//! - `solving_after(n)`: n 回目の poll で token を返す
//! - `never_solving()`: token を返さない（タイムアウト確認用）
//! - `failing_prepare(err)`: prepare が失敗する
//! - `failing_launch(slots)`: 指定 slot の起動が失敗する
//! - `unhealthy_after(n)`: n 回使うと is_healthy() が false になる

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

use crate::domain::{Challenge, SolveError};
use crate::ports::{ChallengeWorker, LaunchOptions, WorkerFactory};

/// Shared counters, so tests can observe what the pool did with the workers.
#[derive(Debug, Default)]
struct Counters {
    launches: AtomicUsize,
    shutdowns: AtomicUsize,
    active: AtomicUsize,
    peak_active: AtomicUsize,
}

#[derive(Debug, Clone)]
pub struct SimulatedFactory {
    solve_after_polls: Option<u32>,
    token: Option<String>,
    prepare_error: Option<SolveError>,
    failing_slots: Vec<usize>,
    unhealthy_after_uses: Option<u32>,
    counters: Arc<Counters>,
}

impl SimulatedFactory {
    /// Solves on the third poll.
    pub fn new() -> Self {
        Self {
            solve_after_polls: Some(3),
            token: None,
            prepare_error: None,
            failing_slots: Vec::new(),
            unhealthy_after_uses: None,
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn solving_after(mut self, polls: u32) -> Self {
        self.solve_after_polls = Some(polls.max(1));
        self
    }

    pub fn never_solving(mut self) -> Self {
        self.solve_after_polls = None;
        self
    }

    /// Every worker returns this exact token instead of a random `sim-…` one.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn failing_prepare(mut self, error: SolveError) -> Self {
        self.prepare_error = Some(error);
        self
    }

    pub fn failing_launch(mut self, slots: &[usize]) -> Self {
        self.failing_slots = slots.to_vec();
        self
    }

    pub fn unhealthy_after(mut self, uses: u32) -> Self {
        self.unhealthy_after_uses = Some(uses);
        self
    }

    pub fn launches(&self) -> usize {
        self.counters.launches.load(Ordering::SeqCst)
    }

    pub fn shutdowns(&self) -> usize {
        self.counters.shutdowns.load(Ordering::SeqCst)
    }

    /// Highest number of workers that were mid-attempt at the same time.
    pub fn peak_active(&self) -> usize {
        self.counters.peak_active.load(Ordering::SeqCst)
    }
}

impl Default for SimulatedFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WorkerFactory for SimulatedFactory {
    async fn launch(
        &self,
        slot: usize,
        options: &LaunchOptions,
    ) -> Result<Box<dyn ChallengeWorker>, SolveError> {
        if self.failing_slots.contains(&slot) {
            return Err(SolveError::Launch(format!("simulated launch failure in slot {slot}")));
        }
        self.counters.launches.fetch_add(1, Ordering::SeqCst);
        debug!(slot, headless = options.headless, "simulated worker launched");
        Ok(Box::new(SimulatedWorker {
            config: self.clone(),
            polls: 0,
            uses: 0,
            prepared: false,
        }))
    }
}

struct SimulatedWorker {
    config: SimulatedFactory,
    polls: u32,
    uses: u32,
    prepared: bool,
}

impl SimulatedWorker {
    fn next_token(&self) -> String {
        match &self.config.token {
            Some(token) => token.clone(),
            None => format!("sim-{:016x}", rand::random::<u64>()),
        }
    }
}

#[async_trait]
impl ChallengeWorker for SimulatedWorker {
    async fn prepare(&mut self, challenge: &Challenge) -> Result<(), SolveError> {
        self.uses += 1;
        self.polls = 0;
        if let Some(err) = &self.config.prepare_error {
            return Err(err.clone());
        }
        let counters = &self.config.counters;
        let active = counters.active.fetch_add(1, Ordering::SeqCst) + 1;
        counters.peak_active.fetch_max(active, Ordering::SeqCst);
        self.prepared = true;
        debug!(url = %challenge.website_url, "simulated page prepared");
        Ok(())
    }

    async fn poll_token(&mut self) -> Result<Option<String>, SolveError> {
        if !self.prepared {
            return Err(SolveError::Other("poll before prepare".into()));
        }
        self.polls += 1;
        match self.config.solve_after_polls {
            Some(n) if self.polls >= n => Ok(Some(self.next_token())),
            _ => Ok(None),
        }
    }

    async fn reset(&mut self) {
        if self.prepared {
            self.config.counters.active.fetch_sub(1, Ordering::SeqCst);
            self.prepared = false;
        }
        self.polls = 0;
    }

    async fn is_healthy(&mut self) -> bool {
        match self.config.unhealthy_after_uses {
            Some(limit) => self.uses < limit,
            None => true,
        }
    }

    async fn shutdown(&mut self) {
        self.config.counters.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}
