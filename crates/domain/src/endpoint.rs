//! Connection string parsing
//!
//! A connection string has the form `scheme://host[:port]/path?db=NAME`.
//! Parsing is deliberately literal: everything after `?db=` is the database
//! name, including any further `&key=value` pairs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::DATABASE_MARKER;
use crate::errors::{FluxlineError, Result};

/// Immutable `(endpoint_url, database_name)` pair parsed from a connection
/// string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    endpoint_url: String,
    database_name: String,
}

impl EndpointConfig {
    /// Parse a connection string.
    ///
    /// # Errors
    /// Returns `FluxlineError::Config` when the string has no `?db=`
    /// parameter.
    pub fn parse(url: &str) -> Result<Self> {
        let database_name = parse_database_name(url)?;
        Ok(Self { endpoint_url: parse_endpoint_url(url).to_string(), database_name })
    }

    /// Base URL with the query component (and a slash right before it) removed.
    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }

    pub fn database_name(&self) -> &str {
        &self.database_name
    }

    /// Join an endpoint path such as `/query` onto the base URL.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.endpoint_url, path)
    }
}

impl FromStr for EndpointConfig {
    type Err = FluxlineError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for EndpointConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.endpoint_url, DATABASE_MARKER, self.database_name)
    }
}

fn parse_endpoint_url(url: &str) -> &str {
    let Some(question_mark) = url.find('?') else {
        return url;
    };

    let base = &url[..question_mark];
    base.strip_suffix('/').unwrap_or(base)
}

fn parse_database_name(url: &str) -> Result<String> {
    url.find(DATABASE_MARKER)
        .map(|position| url[position + DATABASE_MARKER.len()..].to_string())
        .ok_or_else(|| FluxlineError::Config("No database specified".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_url_and_database() {
        let endpoint = EndpointConfig::parse("http://localhost:8086/p?db=metrics").unwrap();
        assert_eq!(endpoint.endpoint_url(), "http://localhost:8086/p");
        assert_eq!(endpoint.database_name(), "metrics");
    }

    #[test]
    fn drops_slash_before_query() {
        let endpoint = EndpointConfig::parse("http://localhost:8086/p/?db=metrics").unwrap();
        assert_eq!(endpoint.endpoint_url(), "http://localhost:8086/p");
        assert_eq!(endpoint.database_name(), "metrics");
    }

    #[test]
    fn root_path_with_slash_is_stripped() {
        let endpoint = EndpointConfig::parse("http://localhost:8086/?db=mydb").unwrap();
        assert_eq!(endpoint.endpoint_url(), "http://localhost:8086");
        assert_eq!(endpoint.url_for("/query"), "http://localhost:8086/query");
    }

    #[test]
    fn only_one_slash_is_dropped() {
        let endpoint = EndpointConfig::parse("http://h/p//?db=x").unwrap();
        assert_eq!(endpoint.endpoint_url(), "http://h/p/");
    }

    #[test]
    fn missing_database_is_config_error() {
        let err = EndpointConfig::parse("http://localhost:8086/").unwrap_err();
        assert_eq!(err, FluxlineError::Config("No database specified".into()));

        let err = EndpointConfig::parse("http://localhost:8086/?database=x").unwrap_err();
        assert!(matches!(err, FluxlineError::Config(_)));
    }

    #[test]
    fn extra_parameters_stay_in_database_name() {
        let endpoint = EndpointConfig::parse("http://h/?db=metrics&precision=s").unwrap();
        assert_eq!(endpoint.database_name(), "metrics&precision=s");
    }

    #[test]
    fn empty_database_name_is_accepted() {
        let endpoint = EndpointConfig::parse("http://h/?db=").unwrap();
        assert_eq!(endpoint.database_name(), "");
    }

    #[test]
    fn leading_question_mark_yields_empty_url() {
        let endpoint = EndpointConfig::parse("?db=x").unwrap();
        assert_eq!(endpoint.endpoint_url(), "");
        assert_eq!(endpoint.database_name(), "x");
    }

    #[test]
    fn from_str_and_display() {
        let endpoint: EndpointConfig = "https://tsdb.example.com:8086/?db=prod".parse().unwrap();
        assert_eq!(endpoint.to_string(), "https://tsdb.example.com:8086?db=prod");
    }
}
