//! Configurable extraction expressions.
//!
//! An expression is a CSS selector, optionally followed by `@attr` to read
//! an attribute instead of element text:
//!
//! ```text
//! input#__VIEWSTATE@value       -> value attribute of the first match
//! span#lblCourtName             -> text of the first match
//! table#gvResult tr:first-child th
//! ```

use scraper::{ElementRef, Html, Selector};

use crate::ExtractError;

/// A parsed extraction expression.
#[derive(Debug, Clone)]
pub struct Expression {
    source: String,
    selector: Selector,
    attribute: Option<String>,
}

impl Expression {
    /// Parses `expression`.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::InvalidExpression`] if the selector part is
    /// not valid CSS.
    pub fn parse(expression: &str) -> Result<Self, ExtractError> {
        let (selector_str, attribute) = match expression.rsplit_once('@') {
            Some((selector, attr)) if is_attribute_name(attr) => (selector, Some(attr.to_owned())),
            _ => (expression, None),
        };

        let selector =
            Selector::parse(selector_str.trim()).map_err(|e| ExtractError::InvalidExpression {
                expression: expression.to_owned(),
                message: e.to_string(),
            })?;

        Ok(Self {
            source: expression.to_owned(),
            selector,
            attribute,
        })
    }

    /// The expression as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Attribute to read, if the expression has an `@attr` suffix.
    #[must_use]
    pub fn attribute(&self) -> Option<&str> {
        self.attribute.as_deref()
    }

    /// All elements the selector matches, in document order.
    pub fn elements<'a>(&'a self, document: &'a Html) -> impl Iterator<Item = ElementRef<'a>> + 'a {
        document.select(&self.selector)
    }

    /// Value of the first match: the attribute value of the first element
    /// carrying the attribute, or the trimmed text of the first element.
    #[must_use]
    pub fn first_value(&self, document: &Html) -> Option<String> {
        match &self.attribute {
            Some(attr) => self
                .elements(document)
                .find_map(|el| el.value().attr(attr))
                .map(str::to_owned),
            None => self
                .elements(document)
                .next()
                .map(|el| joined_text(el).trim().to_owned()),
        }
    }
}

/// Concatenates every descendant text node of `element`, separated by
/// single spaces. Whitespace-only nodes are kept, so callers trim.
#[must_use]
pub fn joined_text(element: ElementRef<'_>) -> String {
    element.text().collect::<Vec<_>>().join(" ")
}

fn is_attribute_name(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':'))
}
