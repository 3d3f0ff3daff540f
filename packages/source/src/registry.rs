//! Source registry: the configuration baked into the binary.
//!
//! The default configuration lives in `packages/source/sources/` and is
//! embedded at compile time via [`include_str!`]. A `--config` file
//! replaces it wholesale.

use crate::config::Config;

/// Name of the source processed when none is given.
pub const DEFAULT_SOURCE: &str = "ecourtservices.kehakiman.gov";

/// Default configuration, embedded at compile time.
const DEFAULT_CONFIG_TOML: &str = include_str!("../sources/kehakiman.toml");

/// Returns the embedded default configuration.
///
/// # Panics
///
/// Panics if the embedded TOML is malformed (this is a compile-time
/// guarantee since the config is embedded).
#[must_use]
pub fn default_config() -> Config {
    Config::from_toml_str(DEFAULT_CONFIG_TOML)
        .unwrap_or_else(|e| panic!("Failed to parse kehakiman.toml: {e}"))
}

#[cfg(test)]
mod tests {
    use causelist_scraper::expression::Expression;
    use causelist_scraper::form_state::FormStateExpressions;

    use super::*;

    #[test]
    fn loads_default_source() {
        let config = default_config();
        let source = config.source(DEFAULT_SOURCE).unwrap();
        assert!(source.homepage.starts_with("https://"));
        assert!(source.causelist_api.starts_with("https://"));
        assert!(source.court_url.ends_with("SearchResultByHearingDate.aspx"));
    }

    #[test]
    fn default_source_has_no_embedded_api_key() {
        assert!(default_config().captcha.api_key.is_none());
    }

    #[test]
    fn default_parser_expressions_all_parse() {
        let config = default_config();
        let source = config.source(DEFAULT_SOURCE).unwrap();

        FormStateExpressions::from_parser(&source.parser).unwrap();
        for role in ["table_headers", "table_rows"] {
            let raw = source
                .parser
                .get(role)
                .unwrap_or_else(|| panic!("{role} missing"));
            Expression::parse(raw).unwrap();
        }
    }

    #[test]
    fn default_http_policy() {
        let config = default_config();
        assert_eq!(config.http.max_attempts, 3);
        assert_eq!(config.http.executor_config().cooldown_secs, 2..=5);
        assert!(config.http.accept_invalid_certs);
    }
}
