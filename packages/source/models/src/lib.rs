#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared data types for the cause-list retrieval pipeline.
//!
//! Courts come out of the portal's court-list endpoint as [`Court`]
//! descriptors, each court's HTML page yields a [`FormState`], and the
//! submission response is turned into a [`CauseListTable`] of
//! [`ExtractedRecord`]s. Per-court results are collected in a
//! [`RunReport`].

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use strum_macros::Display;

/// A court as listed by the portal's court-list endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Court {
    /// Portal court identifier. Numeric IDs are rendered to their decimal
    /// string.
    #[serde(rename = "CourtID", deserialize_with = "deserialize_court_id")]
    pub id: String,
    /// Human-readable court name (e.g. `"Mahkamah Sesyen Kuala Lumpur"`).
    #[serde(rename = "CourtName")]
    pub name: String,
}

/// Body of the court-list endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CourtList {
    /// Courts in the order the portal returns them. A missing or `null`
    /// array is treated as empty.
    #[serde(rename = "CourtList", default, deserialize_with = "deserialize_court_list")]
    pub courts: Vec<Court>,
}

fn deserialize_court_list<'de, D>(deserializer: D) -> Result<Vec<Court>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Vec<Court>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawCourtId {
    Text(String),
    Signed(i64),
    Unsigned(u64),
}

fn deserialize_court_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match RawCourtId::deserialize(deserializer)? {
        RawCourtId::Text(s) => s,
        RawCourtId::Signed(n) => n.to_string(),
        RawCourtId::Unsigned(n) => n.to_string(),
    })
}

/// Hidden form fields and challenge site key scraped from one court page.
///
/// Extracted fresh for every court and never reused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormState {
    /// Hidden field values keyed by the portal's form field name
    /// (e.g. `__VIEWSTATE`).
    pub viewstate_fields: BTreeMap<String, String>,
    /// Public site key of the embedded challenge widget.
    pub site_key: String,
}

/// One table row, keyed by header label.
///
/// Entries keep insertion order. Inserting a label that is already present
/// overwrites its value in place, so a repeated header keeps the position
/// of its first occurrence and the value of its last.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedRecord {
    entries: Vec<(String, String)>,
}

impl ExtractedRecord {
    /// Creates an empty record.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Pairs `values` with `headers` by position, stopping at the shorter
    /// of the two.
    #[must_use]
    pub fn from_positional<H, V>(headers: &[H], values: &[V]) -> Self
    where
        H: AsRef<str>,
        V: AsRef<str>,
    {
        let mut record = Self::new();
        for (header, value) in headers.iter().zip(values) {
            record.insert(header.as_ref(), value.as_ref());
        }
        record
    }

    /// Sets `label` to `value`, replacing any existing value for `label`.
    pub fn insert(&mut self, label: &str, value: &str) {
        if let Some(entry) = self.entries.iter_mut().find(|(l, _)| l == label) {
            value.clone_into(&mut entry.1);
        } else {
            self.entries.push((label.to_owned(), value.to_owned()));
        }
    }

    /// Returns the value stored for `label`.
    #[must_use]
    pub fn get(&self, label: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| v.as_str())
    }

    /// Number of distinct labels in the record.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the record has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates `(label, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(l, v)| (l.as_str(), v.as_str()))
    }
}

/// Headers and rows extracted from a cause-list results table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CauseListTable {
    /// Header labels in document order, duplicates included.
    pub headers: Vec<String>,
    /// One record per matched row, in document order.
    pub records: Vec<ExtractedRecord>,
}

/// The per-court step at which processing stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum CourtStage {
    /// Fetching the court's search page.
    PageFetch,
    /// Pulling hidden form fields and the site key out of the page.
    FormExtraction,
    /// Obtaining a challenge token from the solving service.
    ChallengeSolve,
    /// Posting the search form.
    Submission,
    /// Parsing the results table.
    TableExtraction,
    /// Handing records to the sink.
    Save,
}

/// Final status of one court within a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CourtOutcome {
    /// Records were written.
    Saved {
        /// Where the sink stored the records.
        path: PathBuf,
        /// Number of records written.
        rows: usize,
    },
    /// Processing stopped early; the run moved on to the next court.
    Skipped {
        /// Step that failed.
        stage: CourtStage,
        /// Human-readable cause.
        reason: String,
    },
}

/// A court paired with its outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourtReport {
    /// The court that was processed.
    pub court: Court,
    /// What happened to it.
    pub outcome: CourtOutcome,
}

/// Summary of a complete run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Hearing date the run queried.
    pub hearing_date: NaiveDate,
    /// One entry per attempted court, in processing order.
    pub courts: Vec<CourtReport>,
}

impl RunReport {
    /// Creates an empty report for `hearing_date`.
    #[must_use]
    pub const fn new(hearing_date: NaiveDate) -> Self {
        Self {
            hearing_date,
            courts: Vec::new(),
        }
    }

    /// Number of courts whose records were saved.
    #[must_use]
    pub fn saved_count(&self) -> usize {
        self.courts
            .iter()
            .filter(|c| matches!(c.outcome, CourtOutcome::Saved { .. }))
            .count()
    }

    /// Number of courts that were skipped.
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.courts.len() - self.saved_count()
    }
}
