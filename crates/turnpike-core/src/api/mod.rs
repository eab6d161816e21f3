//! API - HTTP の入り口（axum）
//!
//! # ルート
//! - `POST /createTask`, `POST /getTaskResult`
//! - `GET /turnstile`, `GET /result`（旧クライアント向け）
//! - `GET /solve`（同期版）, `GET /health`, `GET /`
//!
//! handler は solve の完了を待ちません（`/solve` を除く）。

mod error;
mod handlers;
pub mod types;

use axum::Router;
use axum::routing::{get, post};

pub use self::error::ApiError;
pub use self::handlers::API_KEY_HEADER;

use crate::app::App;

pub fn routes(app: App) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/createTask", post(handlers::create_task))
        .route("/getTaskResult", post(handlers::get_task_result))
        .route("/turnstile", get(handlers::legacy_create))
        .route("/result", get(handlers::legacy_result))
        .route("/solve", get(handlers::solve))
        .route("/health", get(handlers::health))
        .with_state(app)
}
