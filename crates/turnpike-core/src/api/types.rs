//! リクエスト / レスポンスの JSON 形
//!
//! フィールド名は既存クライアントとの互換のため camelCase（`websiteURL`, `taskId`, `errorId`）。

use serde::{Deserialize, Serialize};

use crate::domain::challenge::non_blank;
use crate::domain::{Challenge, TaskRecord, TaskStatus};

/// `POST /createTask`
///
/// `websiteURL` / `websiteKey` が空なら `url` / `sitekey` を使います。
#[derive(Debug, Default, Deserialize)]
pub struct CreateTaskRequest {
    #[serde(rename = "websiteURL", default)]
    pub website_url: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(rename = "websiteKey", default)]
    pub website_key: Option<String>,
    #[serde(default)]
    pub sitekey: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub cdata: Option<String>,
}

impl CreateTaskRequest {
    pub fn into_challenge(self) -> Option<Challenge> {
        let url = non_blank(self.website_url).or_else(|| non_blank(self.url));
        let key = non_blank(self.website_key).or_else(|| non_blank(self.sitekey));
        Challenge::from_fields(url, key).map(|c| c.with_action(self.action).with_cdata(self.cdata))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTaskResponse {
    #[serde(rename = "taskId")]
    pub task_id: String,
}

/// `POST /getTaskResult`
#[derive(Debug, Default, Deserialize)]
pub struct GetTaskResultRequest {
    #[serde(rename = "taskId", default)]
    pub task_id: Option<String>,
}

/// `token` は `null` でも省略しない（旧クライアントが `solution.token` を直接読む）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Solution {
    pub token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResultResponse {
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solution: Option<Solution>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&TaskRecord> for TaskResultResponse {
    fn from(record: &TaskRecord) -> Self {
        match record.status {
            TaskStatus::Processing => Self {
                status: TaskStatus::Processing,
                solution: None,
                error: None,
            },
            TaskStatus::Ready => Self {
                status: TaskStatus::Ready,
                solution: Some(Solution {
                    token: record.token.clone(),
                }),
                error: None,
            },
            TaskStatus::Failed => Self {
                status: TaskStatus::Failed,
                solution: None,
                error: Some(
                    record
                        .error
                        .clone()
                        .unwrap_or_else(|| "Unknown error".to_string()),
                ),
            },
        }
    }
}

/// `GET /turnstile`
#[derive(Debug, Default, Deserialize)]
pub struct LegacyTaskQuery {
    pub url: Option<String>,
    pub sitekey: Option<String>,
}

/// `GET /result`
#[derive(Debug, Default, Deserialize)]
pub struct LegacyResultQuery {
    pub id: Option<String>,
}

/// 失敗した task の token は `CAPTCHA_FAIL`、処理中は `null`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyResultResponse {
    pub solution: Solution,
}

impl From<&TaskRecord> for LegacyResultResponse {
    fn from(record: &TaskRecord) -> Self {
        Self {
            solution: Solution {
                token: record.legacy_token().map(str::to_string),
            },
        }
    }
}

/// `GET /solve`
#[derive(Debug, Default, Deserialize)]
pub struct SolveQuery {
    pub url: Option<String>,
    pub sitekey: Option<String>,
    pub action: Option<String>,
    pub cdata: Option<String>,
    /// `X-API-Key` ヘッダの代わり
    pub key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolveResponse {
    #[serde(rename = "errorId")]
    pub error_id: u8,
    pub status: TaskStatus,
    pub solution: Solution,
    pub elapsed: f64,
}
