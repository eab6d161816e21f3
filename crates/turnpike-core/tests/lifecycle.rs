//! Task lifecycle scenarios driven through `App` on virtual time.
//!
//! Every test runs with a paused tokio clock, so minute-long budgets finish instantly.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use turnpike_core::app::{App, AppBuilder, AppError};
use turnpike_core::config::ServiceConfig;
use turnpike_core::domain::{Challenge, TaskId, TaskStatus};
use turnpike_core::impls::SimulatedFactory;
use turnpike_core::ports::{FixedClock, TaskStore};
use ulid::Ulid;

fn challenge() -> Challenge {
    Challenge::new("https://example.com/login", "0x4AAAAAAA")
}

async fn app(factory: SimulatedFactory, workers: usize) -> App {
    let config = ServiceConfig {
        workers,
        ..Default::default()
    };
    AppBuilder::new(config).factory(factory).build().await.unwrap()
}

async fn status_of(app: &App, id: TaskId) -> TaskStatus {
    app.get_result(id).await.unwrap().status
}

#[tokio::test(start_paused = true)]
async fn solved_task_reports_its_token() {
    let app = app(SimulatedFactory::new().solving_after(3).with_token("tok_abc"), 1).await;

    let id = app.submit(challenge()).await.unwrap();
    assert_eq!(status_of(&app, id).await, TaskStatus::Processing);

    tokio::time::sleep(Duration::from_secs(5)).await;

    let record = app.get_result(id).await.unwrap();
    assert_eq!(record.status, TaskStatus::Ready);
    assert_eq!(record.token.as_deref(), Some("tok_abc"));
    assert_eq!(record.legacy_token(), Some("tok_abc"));
}

#[tokio::test(start_paused = true)]
async fn single_worker_runs_tasks_one_after_another() {
    // token on the 6th poll: 5 s per task
    let factory = SimulatedFactory::new().solving_after(6);
    let app = app(factory.clone(), 1).await;

    let first = app.submit(challenge()).await.unwrap();
    let second = app.submit(challenge()).await.unwrap();

    tokio::time::sleep(Duration::from_secs(7)).await;
    assert_eq!(status_of(&app, first).await, TaskStatus::Ready);
    assert_eq!(status_of(&app, second).await, TaskStatus::Processing);

    tokio::time::sleep(Duration::from_secs(4)).await;
    assert_eq!(status_of(&app, second).await, TaskStatus::Ready);

    assert_eq!(factory.peak_active(), 1);
    assert_eq!(app.health().await.pool_size, 1);
}

#[tokio::test(start_paused = true)]
async fn unsolvable_task_times_out_with_sentinel() {
    let app = app(SimulatedFactory::new().never_solving(), 1).await;

    let id = app.submit(challenge()).await.unwrap();

    tokio::time::sleep(Duration::from_secs(59)).await;
    assert_eq!(status_of(&app, id).await, TaskStatus::Processing);

    tokio::time::sleep(Duration::from_secs(2)).await;
    let record = app.get_result(id).await.unwrap();
    assert_eq!(record.status, TaskStatus::Failed);
    assert_eq!(record.error.as_deref(), Some("Timeout"));
    assert_eq!(record.legacy_token(), Some("CAPTCHA_FAIL"));
    assert_eq!(app.health().await.pool_size, 1);
}

#[tokio::test(start_paused = true)]
async fn waiting_longer_than_acquire_timeout_fails_the_task() {
    let app = app(SimulatedFactory::new().never_solving(), 1).await;

    let busy = app.submit(challenge()).await.unwrap();
    let starved = app.submit(challenge()).await.unwrap();

    tokio::time::sleep(Duration::from_secs(31)).await;
    let record = app.get_result(starved).await.unwrap();
    assert_eq!(record.status, TaskStatus::Failed);
    assert_eq!(record.error.as_deref(), Some("No worker available"));
    assert_eq!(status_of(&app, busy).await, TaskStatus::Processing);

    let health = app.health().await;
    assert_eq!(health.pool_size, 0);
    assert_eq!(health.live_workers, 1);
}

#[tokio::test(start_paused = true)]
async fn terminal_state_never_changes() {
    let app = app(SimulatedFactory::new().solving_after(1).with_token("tok_once"), 1).await;
    let id = app.submit(challenge()).await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    let first = app.get_result(id).await.unwrap();
    app.store().fail(id, "late failure".into()).await.unwrap();
    let second = app.get_result(id).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(second.token.as_deref(), Some("tok_once"));
}

#[tokio::test(start_paused = true)]
async fn reaper_evicts_records_past_retention() {
    let clock = Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    ));
    let config = ServiceConfig {
        workers: 1,
        ..Default::default()
    };
    let app = AppBuilder::new(config)
        .factory(SimulatedFactory::new().solving_after(1))
        .clock(clock.clone())
        .build()
        .await
        .unwrap();
    let reaper = app.spawn_reaper();

    let id = app.submit(challenge()).await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(status_of(&app, id).await, TaskStatus::Ready);

    clock.advance(Duration::from_secs(301));
    tokio::time::sleep(Duration::from_secs(60)).await;

    assert!(matches!(app.get_result(id).await, Err(AppError::NotFound(_))));
    reaper.abort();
}

#[tokio::test]
async fn unknown_task_is_not_found() {
    let app = app(SimulatedFactory::new(), 1).await;

    let result = app.get_result(TaskId::from_ulid(Ulid::new())).await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test(start_paused = true)]
async fn many_submissions_never_exceed_pool_size() {
    let factory = SimulatedFactory::new().solving_after(2);
    let app = app(factory.clone(), 2).await;

    let mut ids = Vec::new();
    for _ in 0..8 {
        ids.push(app.submit(challenge()).await.unwrap());
    }
    tokio::time::sleep(Duration::from_secs(20)).await;

    for id in ids {
        assert_eq!(status_of(&app, id).await, TaskStatus::Ready);
    }
    assert_eq!(factory.peak_active(), 2);
    assert_eq!(app.health().await.pending_tasks, 0);
}
