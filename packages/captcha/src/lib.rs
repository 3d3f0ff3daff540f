#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Challenge solving behind a narrow `solve(site key, page URL)` contract.
//!
//! The pipeline only sees the [`ChallengeSolver`] trait. The production
//! implementation, [`anti_captcha::AntiCaptchaSolver`], submits an hCaptcha
//! task to an Anti-Captcha compatible service and polls for the token.
//! Solvers never retry: a failed solve is reported as `None` and the
//! caller decides what to skip.

pub mod anti_captcha;

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

/// Environment variable consulted when no API key is configured.
pub const API_KEY_ENV: &str = "ANTICAPTCHA_API_KEY";

/// Errors raised inside a solver. Callers of [`ChallengeSolver::solve`]
/// never see these; they are logged and collapsed to `None`.
#[derive(Debug, thiserror::Error)]
pub enum SolveError {
    /// HTTP request to the solving service failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service reported an error.
    #[error("service error {code}: {description}")]
    Service {
        /// Service error code (e.g. `ERROR_ZERO_BALANCE`).
        code: String,
        /// Human-readable description.
        description: String,
    },

    /// The service response did not have the expected shape.
    #[error("unexpected response: {0}")]
    Parse(String),

    /// The task was not solved within the configured wait.
    #[error("task not ready after {0:?}")]
    Timeout(Duration),
}

/// Solves a proof-of-humanity challenge for a page.
#[async_trait]
pub trait ChallengeSolver: Send + Sync {
    /// Returns a solved token for `site_key` on `page_url`, or `None` if
    /// the challenge could not be solved.
    async fn solve(&self, site_key: &str, page_url: &str) -> Option<String>;
}

/// Solver service settings, as found in the `[captcha]` config table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SolverConfig {
    /// Base URL of the Anti-Captcha compatible API.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Client key. Falls back to [`API_KEY_ENV`] when absent.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Seconds between result polls.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Seconds to wait for a task before giving up.
    #[serde(default = "default_max_wait_secs")]
    pub max_wait_secs: u64,
}

fn default_api_url() -> String {
    "https://api.anti-captcha.com".to_string()
}

const fn default_poll_interval_secs() -> u64 {
    5
}

const fn default_max_wait_secs() -> u64 {
    180
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_key: None,
            poll_interval_secs: default_poll_interval_secs(),
            max_wait_secs: default_max_wait_secs(),
        }
    }
}

impl SolverConfig {
    /// The configured key, or the value of [`API_KEY_ENV`].
    #[must_use]
    pub fn resolve_api_key(&self) -> Option<String> {
        let non_blank = |k: &String| !k.trim().is_empty();
        self.api_key
            .clone()
            .filter(non_blank)
            .or_else(|| std::env::var(API_KEY_ENV).ok().filter(non_blank))
    }

    /// Interval between result polls.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Maximum time to wait for a task.
    #[must_use]
    pub const fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_secs)
    }
}
