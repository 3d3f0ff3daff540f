//! Run configuration.
//!
//! One TOML document carries the solver settings (`[captcha]`), the
//! request policy (`[http]`), and one `[source."<name>"]` table per portal.
//! Only the `source` table is required.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use causelist_captcha::{API_KEY_ENV, SolverConfig};
use causelist_scraper::executor::{DEFAULT_MAX_ATTEMPTS, ExecutorConfig};
use causelist_scraper::session::SessionOptions;
use serde::Deserialize;

/// Errors raised while loading or querying the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File that was read.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The config document is not valid TOML or has the wrong shape.
    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),

    /// No `[source."<name>"]` table for the requested source.
    #[error("no configuration found for source: {0}")]
    MissingSource(String),

    /// Neither `captcha.api_key` nor the environment variable is set.
    #[error("no solver API key configured (set captcha.api_key or {API_KEY_ENV})")]
    MissingApiKey,
}

/// The whole configuration document.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Challenge-solving service settings.
    #[serde(default)]
    pub captcha: SolverConfig,
    /// Retry, timeout, and throttle settings.
    #[serde(default)]
    pub http: HttpConfig,
    /// Portal definitions keyed by source name.
    pub source: BTreeMap<String, SourceConfig>,
}

impl Config {
    /// Parses a configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Toml`] if the document does not parse.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Reads and parses the configuration file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Toml`] if it does not parse.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Looks up the definition for source `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingSource`] if there is no such source.
    pub fn source(&self, name: &str) -> Result<&SourceConfig, ConfigError> {
        self.source
            .get(name)
            .ok_or_else(|| ConfigError::MissingSource(name.to_owned()))
    }

    /// The solver API key from the config or the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingApiKey`] if neither is set.
    pub fn api_key(&self) -> Result<String, ConfigError> {
        self.captcha
            .resolve_api_key()
            .ok_or(ConfigError::MissingApiKey)
    }
}

/// Request policy shared by every exchange in a run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Attempts per request.
    pub max_attempts: u32,
    /// Per-attempt timeout in seconds.
    pub timeout_secs: u64,
    /// Inclusive `[min, max]` post-success cooldown in seconds.
    pub cooldown_secs: [u64; 2],
    /// Skip TLS certificate verification. The portal's chain does not
    /// validate against the default roots.
    pub accept_invalid_certs: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            timeout_secs: 30,
            cooldown_secs: [2, 5],
            accept_invalid_certs: false,
        }
    }
}

impl HttpConfig {
    /// Retry settings for the request executor.
    #[must_use]
    pub fn executor_config(&self) -> ExecutorConfig {
        let [min, max] = self.cooldown_secs;
        ExecutorConfig {
            max_attempts: self.max_attempts,
            cooldown_secs: min.min(max)..=max.max(min),
        }
    }

    /// Options for building the HTTP session.
    #[must_use]
    pub const fn session_options(&self) -> SessionOptions {
        SessionOptions {
            timeout: Duration::from_secs(self.timeout_secs),
            accept_invalid_certs: self.accept_invalid_certs,
        }
    }
}

/// One portal's endpoints, headers, base payload, and extraction
/// expressions.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SourceConfig {
    /// Page fetched first to establish session cookies.
    pub homepage: String,
    /// JSON endpoint returning the `CourtList`.
    pub causelist_api: String,
    /// Per-court search page; `CourtID` and `Date` are appended as query
    /// parameters.
    pub court_url: String,
    /// Headers for navigation `GET`s.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Headers for the search form `POST`.
    #[serde(default)]
    pub api_headers: BTreeMap<String, String>,
    /// Base form fields sent with every search.
    #[serde(default)]
    pub api_payload: BTreeMap<String, String>,
    /// Extraction expressions keyed by role (`viewstate`, `table_rows`, ...).
    #[serde(default)]
    pub parser: BTreeMap<String, String>,
}
