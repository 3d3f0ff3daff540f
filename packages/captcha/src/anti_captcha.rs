//! Anti-Captcha API client.
//!
//! Two-step protocol: `createTask` submits an `HCaptchaTaskProxyless` task
//! and returns a task id, then `getTaskResult` is polled until the task
//! reports `"ready"` with a solution token.
//!
//! See <https://anti-captcha.com/apidoc>

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::{ChallengeSolver, SolveError, SolverConfig};

/// Task type for hCaptcha challenges solved on the service's own proxies.
const TASK_TYPE: &str = "HCaptchaTaskProxyless";

/// Per-request timeout for calls to the solving service.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Lower bound on the poll interval.
const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Result of one `getTaskResult` poll.
#[derive(Debug, Clone, PartialEq, Eq)]
enum TaskStatus {
    Processing,
    Ready(String),
}

/// [`ChallengeSolver`] backed by the Anti-Captcha HTTP API.
pub struct AntiCaptchaSolver {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    poll_interval: Duration,
    max_wait: Duration,
}

impl AntiCaptchaSolver {
    /// Creates a solver bound to `api_key`.
    ///
    /// # Errors
    ///
    /// Returns [`SolveError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &SolverConfig, api_key: &str) -> Result<Self, SolveError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_owned(),
            api_key: api_key.to_owned(),
            poll_interval: config.poll_interval().max(MIN_POLL_INTERVAL),
            max_wait: config.max_wait(),
        })
    }

    async fn post(
        &self,
        method: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, SolveError> {
        let url = format!("{}/{method}", self.api_url);
        let resp = self.client.post(&url).json(body).send().await?;
        let body: serde_json::Value = resp.json().await?;
        Ok(body)
    }

    async fn create_task(&self, site_key: &str, page_url: &str) -> Result<u64, SolveError> {
        let body = json!({
            "clientKey": self.api_key,
            "task": {
                "type": TASK_TYPE,
                "websiteURL": page_url,
                "websiteKey": site_key,
            },
        });
        let response = self.post("createTask", &body).await?;
        parse_create_task(&response)
    }

    async fn wait_for_result(&self, task_id: u64) -> Result<String, SolveError> {
        let body = json!({
            "clientKey": self.api_key,
            "taskId": task_id,
        });

        let mut waited = Duration::ZERO;
        while waited < self.max_wait {
            tokio::time::sleep(self.poll_interval).await;
            waited += self.poll_interval;

            let response = self.post("getTaskResult", &body).await?;
            match parse_task_result(&response)? {
                TaskStatus::Ready(token) => return Ok(token),
                TaskStatus::Processing => {
                    log::debug!("Task {task_id} still processing after {waited:?}");
                }
            }
        }

        Err(SolveError::Timeout(self.max_wait))
    }

    async fn try_solve(&self, site_key: &str, page_url: &str) -> Result<String, SolveError> {
        log::info!("Submitting hCaptcha challenge to Anti-Captcha...");
        let task_id = self.create_task(site_key, page_url).await?;
        log::debug!("Anti-Captcha task {task_id} created for {page_url}");
        self.wait_for_result(task_id).await
    }
}

#[async_trait]
impl ChallengeSolver for AntiCaptchaSolver {
    async fn solve(&self, site_key: &str, page_url: &str) -> Option<String> {
        log::info!("Extracted hCaptcha sitekey: {site_key}");
        match self.try_solve(site_key, page_url).await {
            Ok(token) => {
                log::info!("hCaptcha solved successfully.");
                Some(token)
            }
            Err(SolveError::Service { code, description }) => {
                log::error!("Failed to solve hCaptcha. Error: {code} ({description})");
                None
            }
            Err(e) => {
                log::error!("Exception while solving hCaptcha: {e}");
                None
            }
        }
    }
}

/// Returns the service error carried by `body`, if `errorId` is non-zero.
fn service_error(body: &serde_json::Value) -> Option<SolveError> {
    let error_id = body["errorId"].as_u64().unwrap_or(0);
    if error_id == 0 {
        return None;
    }
    Some(SolveError::Service {
        code: body["errorCode"]
            .as_str()
            .map_or_else(|| format!("errorId {error_id}"), String::from),
        description: body["errorDescription"]
            .as_str()
            .unwrap_or_default()
            .to_owned(),
    })
}

/// Parses a `createTask` response into its task id.
fn parse_create_task(body: &serde_json::Value) -> Result<u64, SolveError> {
    if let Some(err) = service_error(body) {
        return Err(err);
    }
    body["taskId"]
        .as_u64()
        .ok_or_else(|| SolveError::Parse("missing taskId in createTask response".to_string()))
}

/// Parses a `getTaskResult` response.
fn parse_task_result(body: &serde_json::Value) -> Result<TaskStatus, SolveError> {
    if let Some(err) = service_error(body) {
        return Err(err);
    }
    match body["status"].as_str() {
        Some("processing") => Ok(TaskStatus::Processing),
        Some("ready") => body["solution"]["gRecaptchaResponse"]
            .as_str()
            .filter(|token| !token.is_empty())
            .map(|token| TaskStatus::Ready(token.to_owned()))
            .ok_or_else(|| SolveError::Parse("ready task has no solution token".to_string())),
        other => Err(SolveError::Parse(format!("unknown task status {other:?}"))),
    }
}
