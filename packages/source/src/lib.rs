#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Cause-list sources and the per-court retrieval pipeline.
//!
//! A source is a court portal described entirely by configuration (see
//! [`config::SourceConfig`]): where to bootstrap the session, where the
//! court list lives, and how to pull form state and result tables out of
//! its pages. [`pipeline::run`] drives one source end to end and hands
//! each court's table to a [`sink::RecordSink`].

pub mod config;
pub mod payload;
pub mod pipeline;
pub mod progress;
pub mod registry;
pub mod sink;

use causelist_scraper::{ExtractError, FetchError};
use causelist_source_models::CourtStage;

use crate::sink::SinkError;

/// Errors that abort a whole run once the session is up.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// The portal homepage could not be fetched.
    #[error("failed to fetch homepage: {0}")]
    Bootstrap(#[source] FetchError),

    /// The court list could not be fetched.
    #[error("failed to fetch court list: {0}")]
    CourtList(#[source] FetchError),

    /// The court list body is not the expected JSON.
    #[error("failed to parse court list: {0}")]
    CourtListParse(#[from] serde_json::Error),
}

/// Errors that skip a single court.
#[derive(Debug, thiserror::Error)]
pub enum CourtError {
    /// The configured court URL is not a valid URL.
    #[error("invalid court URL '{url}': {message}")]
    InvalidUrl {
        /// URL as configured.
        url: String,
        /// Parse failure.
        message: String,
    },

    /// A page fetch or form submission failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// A required value could not be extracted.
    #[error(transparent)]
    Extract(#[from] ExtractError),

    /// The challenge solver returned no token.
    #[error("challenge could not be solved")]
    NoToken,

    /// The record sink failed.
    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// A [`CourtError`] tagged with the stage it happened in.
#[derive(Debug, thiserror::Error)]
#[error("{stage}: {error}")]
pub struct CourtFailure {
    /// Stage the court was in.
    pub stage: CourtStage,
    /// What went wrong.
    #[source]
    pub error: CourtError,
}

impl CourtFailure {
    /// Returns a closure that tags an error with `stage`, for use with
    /// `map_err`.
    pub fn at<E: Into<CourtError>>(stage: CourtStage) -> impl FnOnce(E) -> Self {
        move |error| Self {
            stage,
            error: error.into(),
        }
    }
}
