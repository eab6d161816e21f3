//! Task record: one submitted solve request and its state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{Challenge, TaskId, TaskStatus};

/// Token value reported to legacy consumers when a task failed.
///
/// Legacy clients expect a value rather than `null` once a task is done.
pub const FAILURE_SENTINEL: &str = "CAPTCHA_FAIL";

/// The state record of a task.
///
/// - `token` is only set when `status == Ready`.
/// - `error` is only set when `status == Failed`.
/// - `created_at` never changes; it is used for eviction only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: TaskId,
    pub status: TaskStatus,
    pub token: Option<String>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub challenge: Challenge,
}

impl TaskRecord {
    pub fn new(id: TaskId, challenge: Challenge, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            status: TaskStatus::Processing,
            token: None,
            error: None,
            created_at,
            challenge,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// processing → ready. Returns `false` (and changes nothing) if already terminal.
    pub fn mark_ready(&mut self, token: String) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.status = TaskStatus::Ready;
        self.token = Some(token);
        true
    }

    /// processing → failed. Returns `false` (and changes nothing) if already terminal.
    pub fn mark_failed(&mut self, error: String) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.status = TaskStatus::Failed;
        self.error = Some(error);
        true
    }

    /// Token as seen by legacy consumers: the sentinel for failures, `None` while processing.
    pub fn legacy_token(&self) -> Option<&str> {
        match self.status {
            TaskStatus::Processing => None,
            TaskStatus::Ready => self.token.as_deref(),
            TaskStatus::Failed => Some(FAILURE_SENTINEL),
        }
    }

    /// Age at `now`. A record stamped in the future has age zero.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.created_at).to_std().unwrap_or(Duration::ZERO)
    }
}
