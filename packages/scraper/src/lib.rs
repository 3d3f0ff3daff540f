#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Building blocks for scraping stateful, form-driven web portals.
//!
//! - [`session`]: the [`Session`](session::Session) seam every HTTP
//!   exchange goes through, backed by a cookie-keeping `reqwest` client.
//! - [`executor`]: bounded retry with exponential backoff plus a
//!   randomized cooldown after each successful exchange.
//! - [`form_state`]: hidden ASP.NET form fields and the challenge site key.
//! - [`html_table`]: header labels and row records from a results table.
//!
//! Extraction is pure: both extractors take raw response bytes and never
//! touch the network.

pub mod delay;
pub mod executor;
pub mod expression;
pub mod form_state;
pub mod html_table;
pub mod session;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

/// Errors surfaced by the [`executor`] once its retry budget is spent.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Only `GET` and `POST` are supported. No attempt was made.
    #[error("unsupported HTTP method: {0}")]
    InvalidMethod(reqwest::Method),

    /// Every attempt returned a non-success status or a transport fault.
    #[error("all {attempts} attempt(s) failed for {url}: {last_error}")]
    AllAttemptsExhausted {
        /// Requested URL.
        url: String,
        /// Number of attempts made.
        attempts: u32,
        /// Description of the final attempt's failure.
        last_error: String,
    },
}

/// Errors produced while pulling values out of an HTML document.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// The parser configuration has no expression for this role.
    #[error("no extraction expression configured for '{0}'")]
    MissingExpression(String),

    /// The configured expression is not a valid selector.
    #[error("invalid extraction expression '{expression}': {message}")]
    InvalidExpression {
        /// The expression as configured.
        expression: String,
        /// Why it failed to parse.
        message: String,
    },

    /// A required expression matched nothing in the page.
    #[error("form field '{0}' not found in page")]
    MissingField(String),

    /// The page contains no `data-sitekey` attribute.
    #[error("challenge site key not found in page")]
    MissingChallengeKey,
}
