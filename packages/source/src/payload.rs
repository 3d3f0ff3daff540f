//! Search form payload.
//!
//! The configured base payload is never mutated; each court gets a fresh
//! [`SubmissionPayload`] layered as base fields, then the page's form
//! state, then the challenge token.

use std::collections::BTreeMap;

use causelist_source_models::FormState;

/// Field names the portal reads the challenge token from.
pub const TOKEN_FIELDS: [&str; 3] = [
    "ctl00$Body$hCaptchaTokenField",
    "g-recaptcha-response",
    "h-captcha-response",
];

/// Builder for one court's search form body.
#[derive(Debug, Clone)]
pub struct SubmissionPayload {
    fields: BTreeMap<String, String>,
}

impl SubmissionPayload {
    /// Starts from a copy of the configured base payload.
    #[must_use]
    pub fn new(base: &BTreeMap<String, String>) -> Self {
        Self {
            fields: base.clone(),
        }
    }

    /// Overlays the hidden form fields scraped from the court page.
    #[must_use]
    pub fn with_form_state(mut self, form_state: &FormState) -> Self {
        for (name, value) in &form_state.viewstate_fields {
            self.fields.insert(name.clone(), value.clone());
        }
        self
    }

    /// Sets `token` under every name in [`TOKEN_FIELDS`].
    #[must_use]
    pub fn with_token(mut self, token: &str) -> Self {
        for name in TOKEN_FIELDS {
            self.fields.insert(name.to_owned(), token.to_owned());
        }
        self
    }

    /// The finished form body.
    #[must_use]
    pub fn build(self) -> BTreeMap<String, String> {
        self.fields
    }
}
