//! Client - turnpike サーバーを呼ぶ HTTP クライアント（reqwest）
//!
//! - **TurnpikeClient**: `/createTask` + `/getTaskResult` のポーリング
//! - **LegacyClient**: `/turnstile` + `/result`（`CAPTCHA_FAIL` は `None` に変換）

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::api::types::{
    CreateTaskResponse, LegacyResultResponse, SolveResponse, TaskResultResponse,
};
use crate::app::HealthReport;
use crate::domain::{Challenge, FAILURE_SENTINEL, TaskId, TaskStatus};

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5072";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// サーバーが `{"error": ...}` を返した
    #[error("server returned {status}: {message}")]
    Server { status: StatusCode, message: String },

    #[error("unexpected response: {0}")]
    InvalidResponse(String),

    #[error("solve failed: {0}")]
    Failed(String),

    #[error("no result within {0:?}")]
    Timeout(Duration),
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }
    let body: serde_json::Value = response.json().await.unwrap_or_default();
    let message = body
        .get("error")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown error")
        .to_string();
    Err(ClientError::Server { status, message })
}

fn parse_task_id(raw: &str) -> Result<TaskId, ClientError> {
    raw.parse()
        .map_err(|_| ClientError::InvalidResponse(format!("bad task id `{raw}`")))
}

fn build_http() -> Result<reqwest::Client, ClientError> {
    Ok(reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?)
}

#[derive(Debug, Clone)]
pub struct TurnpikeClient {
    http: reqwest::Client,
    base_url: String,
}

impl TurnpikeClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Ok(Self {
            http: build_http()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn create_task(&self, challenge: &Challenge) -> Result<TaskId, ClientError> {
        let mut body = json!({
            "websiteURL": challenge.website_url,
            "websiteKey": challenge.website_key,
        });
        if let Some(action) = &challenge.action {
            body["action"] = json!(action);
        }
        if let Some(cdata) = &challenge.cdata {
            body["cdata"] = json!(cdata);
        }
        let response = self.http.post(self.url("/createTask")).json(&body).send().await?;
        let created: CreateTaskResponse = read_json(response).await?;
        parse_task_id(&created.task_id)
    }

    pub async fn get_result(&self, id: &TaskId) -> Result<TaskResultResponse, ClientError> {
        let response = self
            .http
            .post(self.url("/getTaskResult"))
            .json(&json!({ "taskId": id.to_string() }))
            .send()
            .await?;
        read_json(response).await
    }

    /// task を作って token が出るまでポーリングする
    pub async fn solve(
        &self,
        challenge: &Challenge,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<String, ClientError> {
        let id = self.create_task(challenge).await?;
        debug!(task_id = %id, "task created, polling");
        let started = Instant::now();

        while started.elapsed() < timeout {
            let result = self.get_result(&id).await?;
            match result.status {
                TaskStatus::Ready => {
                    return result
                        .solution
                        .and_then(|s| s.token)
                        .ok_or_else(|| ClientError::InvalidResponse("ready without token".into()));
                }
                TaskStatus::Failed => {
                    return Err(ClientError::Failed(
                        result.error.unwrap_or_else(|| "Unknown error".to_string()),
                    ));
                }
                TaskStatus::Processing => tokio::time::sleep(poll_interval).await,
            }
        }
        Err(ClientError::Timeout(timeout))
    }

    /// `GET /solve` を 1 回呼ぶ（サーバー側で完了まで待つ）
    pub async fn solve_sync(
        &self,
        challenge: &Challenge,
        api_key: Option<&str>,
    ) -> Result<SolveResponse, ClientError> {
        let mut query = vec![
            ("url", challenge.website_url.as_str()),
            ("sitekey", challenge.website_key.as_str()),
        ];
        if let Some(action) = challenge.action.as_deref() {
            query.push(("action", action));
        }
        if let Some(cdata) = challenge.cdata.as_deref() {
            query.push(("cdata", cdata));
        }
        let mut request = self.http.get(self.url("/solve")).query(&query);
        if let Some(key) = api_key {
            request = request.header(crate::api::API_KEY_HEADER, key);
        }
        read_json(request.send().await?).await
    }

    pub async fn health(&self) -> Result<HealthReport, ClientError> {
        let response = self.http.get(self.url("/health")).send().await?;
        read_json(response).await
    }
}

/// 旧 API のポーリング間隔
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegacyPollPolicy {
    pub initial_delay: Duration,
    pub retry_delay: Duration,
    pub max_retries: u32,
}

impl Default for LegacyPollPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(5),
            retry_delay: Duration::from_secs(2),
            max_retries: 30,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LegacyClient {
    http: reqwest::Client,
    base_url: String,
    policy: LegacyPollPolicy,
}

impl LegacyClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Ok(Self {
            http: build_http()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            policy: LegacyPollPolicy::default(),
        })
    }

    pub fn with_policy(mut self, policy: LegacyPollPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub async fn create_task(&self, url: &str, sitekey: &str) -> Result<TaskId, ClientError> {
        let response = self
            .http
            .get(format!("{}/turnstile", self.base_url))
            .query(&[("url", url), ("sitekey", sitekey)])
            .send()
            .await?;
        let created: CreateTaskResponse = read_json(response).await?;
        parse_task_id(&created.task_id)
    }

    /// token を返す。失敗（`CAPTCHA_FAIL`）・リトライ切れは `None`。
    ///
    /// 途中の通信エラーは次のリトライで回復できるので握りつぶします。
    pub async fn get_response(&self, id: &TaskId) -> Option<String> {
        tokio::time::sleep(self.policy.initial_delay).await;
        for attempt in 1..=self.policy.max_retries {
            match self.fetch(id).await {
                Ok(Some(token)) if token == FAILURE_SENTINEL => return None,
                Ok(Some(token)) => return Some(token),
                Ok(None) => {}
                Err(e) => debug!(task_id = %id, attempt, error = %e, "legacy poll failed"),
            }
            tokio::time::sleep(self.policy.retry_delay).await;
        }
        None
    }

    async fn fetch(&self, id: &TaskId) -> Result<Option<String>, ClientError> {
        let response = self
            .http
            .get(format!("{}/result", self.base_url))
            .query(&[("id", id.to_string())])
            .send()
            .await?;
        let result: LegacyResultResponse = read_json(response).await?;
        Ok(result.solution.token)
    }
}
