//! Hidden form-state extraction.
//!
//! ASP.NET WebForms pages embed their view state and event validation in
//! hidden inputs that must be echoed back on the next POST. The challenge
//! widget's site key is searched for in the raw response text instead,
//! since the widget may be rendered outside anything the selectors reach.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use causelist_source_models::FormState;
use regex::Regex;
use scraper::Html;

use crate::ExtractError;
use crate::expression::Expression;

static SITE_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)data-sitekey="(.*?)""#).expect("valid regex"));

/// Required form fields as `(parser role, form field name)`.
pub const VIEWSTATE_FIELDS: [(&str, &str); 5] = [
    ("viewstate", "__VIEWSTATE"),
    ("viewstate1", "__VIEWSTATE1"),
    ("viewstate_generator", "__VIEWSTATEGENERATOR"),
    ("event_validation", "__EVENTVALIDATION"),
    ("viewstate_count", "__VIEWSTATEFIELDCOUNT"),
];

/// The parsed expressions for every entry in [`VIEWSTATE_FIELDS`].
#[derive(Debug, Clone)]
pub struct FormStateExpressions {
    fields: Vec<(&'static str, &'static str, Expression)>,
}

impl FormStateExpressions {
    /// Looks up and parses the expression for each required role in a
    /// `role -> expression` parser map.
    ///
    /// # Errors
    ///
    /// * [`ExtractError::MissingExpression`] if a role has no entry.
    /// * [`ExtractError::InvalidExpression`] if an entry does not parse.
    pub fn from_parser(parser: &BTreeMap<String, String>) -> Result<Self, ExtractError> {
        let fields = VIEWSTATE_FIELDS
            .iter()
            .map(|&(role, field)| {
                let raw = parser
                    .get(role)
                    .ok_or_else(|| ExtractError::MissingExpression(role.to_owned()))?;
                Ok((role, field, Expression::parse(raw)?))
            })
            .collect::<Result<Vec<_>, ExtractError>>()?;
        Ok(Self { fields })
    }
}

/// Extracts the hidden form fields and the challenge site key from an
/// HTML page.
///
/// # Errors
///
/// * [`ExtractError::MissingField`] naming the first role whose
///   expression matched nothing.
/// * [`ExtractError::MissingChallengeKey`] if the page has no
///   `data-sitekey` attribute.
pub fn extract_form_state(
    html: &[u8],
    expressions: &FormStateExpressions,
) -> Result<FormState, ExtractError> {
    let text = String::from_utf8_lossy(html);
    let document = Html::parse_document(&text);

    let mut viewstate_fields = BTreeMap::new();
    for (role, field, expression) in &expressions.fields {
        let value = expression
            .first_value(&document)
            .ok_or_else(|| ExtractError::MissingField((*role).to_owned()))?;
        viewstate_fields.insert((*field).to_owned(), value);
    }

    let site_key = find_site_key(&text).ok_or(ExtractError::MissingChallengeKey)?;

    Ok(FormState {
        viewstate_fields,
        site_key,
    })
}

/// Returns the value of the first `data-sitekey="..."` attribute in `text`.
#[must_use]
pub fn find_site_key(text: &str) -> Option<String> {
    SITE_KEY_RE.captures(text).map(|caps| caps[1].to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> BTreeMap<String, String> {
        [
            ("viewstate", "input#__VIEWSTATE@value"),
            ("viewstate1", "input#__VIEWSTATE1@value"),
            ("viewstate_generator", "input#__VIEWSTATEGENERATOR@value"),
            ("event_validation", "input#__EVENTVALIDATION@value"),
            ("viewstate_count", "input#__VIEWSTATEFIELDCOUNT@value"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    const PAGE: &str = r#"<html><body><form id="aspnetForm">
        <input type="hidden" id="__VIEWSTATEFIELDCOUNT" value="2" />
        <input type="hidden" id="__VIEWSTATE" value="vs-part-0" />
        <input type="hidden" id="__VIEWSTATE1" value="vs-part-1" />
        <input type="hidden" id="__VIEWSTATEGENERATOR" value="A1B2C3D4" />
        <input type="hidden" id="__EVENTVALIDATION" value="ev-token" />
        <div class="h-captcha" data-sitekey="10000000-ffff-ffff-ffff-000000000001"></div>
        <p>unclosed <b>markup
    </form></body></html>"#;

    #[test]
    fn extracts_all_fields_and_site_key() {
        let expressions = FormStateExpressions::from_parser(&parser()).unwrap();
        let state = extract_form_state(PAGE.as_bytes(), &expressions).unwrap();

        assert_eq!(state.viewstate_fields.len(), 5);
        assert_eq!(state.viewstate_fields["__VIEWSTATE"], "vs-part-0");
        assert_eq!(state.viewstate_fields["__VIEWSTATE1"], "vs-part-1");
        assert_eq!(state.viewstate_fields["__VIEWSTATEGENERATOR"], "A1B2C3D4");
        assert_eq!(state.viewstate_fields["__EVENTVALIDATION"], "ev-token");
        assert_eq!(state.viewstate_fields["__VIEWSTATEFIELDCOUNT"], "2");
        assert_eq!(state.site_key, "10000000-ffff-ffff-ffff-000000000001");
    }

    #[test]
    fn missing_field_names_its_role() {
        let expressions = FormStateExpressions::from_parser(&parser()).unwrap();
        let page = PAGE.replace(r#"id="__EVENTVALIDATION""#, r#"id="other""#);

        let err = extract_form_state(page.as_bytes(), &expressions).unwrap_err();
        assert!(matches!(err, ExtractError::MissingField(role) if role == "event_validation"));
    }

    #[test]
    fn missing_site_key_is_reported() {
        let expressions = FormStateExpressions::from_parser(&parser()).unwrap();
        let page = PAGE.replace("data-sitekey", "data-theme");

        let err = extract_form_state(page.as_bytes(), &expressions).unwrap_err();
        assert!(matches!(err, ExtractError::MissingChallengeKey));
    }

    #[test]
    fn missing_expression_is_reported_before_parsing() {
        let mut parser = parser();
        parser.remove("viewstate1");

        let err = FormStateExpressions::from_parser(&parser).unwrap_err();
        assert!(matches!(err, ExtractError::MissingExpression(role) if role == "viewstate1"));
    }

    #[test]
    fn site_key_search_takes_first_and_spans_lines() {
        let text = "<script>var x;</script><div data-sitekey=\"abc\ndef\"></div>\
                    <div data-sitekey=\"second\"></div>";
        assert_eq!(find_site_key(text).as_deref(), Some("abc\ndef"));
        assert!(find_site_key("<div></div>").is_none());
    }

    #[test]
    fn site_key_search_is_repeatable() {
        let page = r#"<div class="h-captcha" data-sitekey="key-1"></div>"#;
        for _ in 0..3 {
            assert_eq!(find_site_key(page).as_deref(), Some("key-1"));
        }
    }
}
