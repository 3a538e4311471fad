//! Location adapter
//!
//! The URL query string doubles as the state store of the list view: the
//! options live under a named parameter and replacing it is a navigation.
//! [`Location`] is the narrow seam over "the current page URL";
//! [`UrlQueryData`] is the typed parse-on-read / serialize-on-write view of
//! one parameter.

use anyhow::{Context, Result};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

pub trait Location {
    fn url(&self) -> &Url;

    /// Replace the current URL, re-rendering whatever depends on it
    fn navigate(&mut self, url: Url) -> Result<()>;
}

/// Location that only lives in memory, keeping every URL it visited
#[derive(Debug, Clone)]
pub struct MemoryLocation {
    current: Url,
    history: Vec<Url>,
}

impl MemoryLocation {
    pub fn new(url: Url) -> Self {
        Self {
            current: url,
            history: Vec::new(),
        }
    }

    pub fn parse(url: &str) -> Result<Self> {
        let url = Url::parse(url).with_context(|| format!("Invalid URL '{}'", url))?;
        Ok(Self::new(url))
    }

    pub fn navigation_count(&self) -> usize {
        self.history.len()
    }
}

impl Location for MemoryLocation {
    fn url(&self) -> &Url {
        &self.current
    }

    fn navigate(&mut self, url: Url) -> Result<()> {
        debug!(target: "location", "Navigate to {}", url);
        let previous = std::mem::replace(&mut self.current, url);
        self.history.push(previous);
        Ok(())
    }
}

/// Typed JSON value stored in a single query parameter
#[derive(Debug, Clone)]
pub struct UrlQueryData<T> {
    param: String,
    default: T,
}

impl<T> UrlQueryData<T>
where
    T: Serialize + DeserializeOwned + Clone,
{
    pub fn new(param: &str, default: T) -> Self {
        Self {
            param: param.to_string(),
            default,
        }
    }

    /// Raw (decoded) parameter value
    pub fn query(&self, location: &dyn Location) -> Option<String> {
        location
            .url()
            .query_pairs()
            .find(|(name, _)| name == self.param.as_str())
            .map(|(_, value)| value.into_owned())
    }

    /// Parsed parameter value. A value that does not parse counts as absent.
    pub fn query_data(&self, location: &dyn Location) -> Option<T> {
        let raw = self.query(location)?;
        match serde_json::from_str(&raw) {
            Ok(data) => Some(data),
            Err(e) => {
                warn!(target: "location", "Ignoring malformed '{}' parameter: {}", self.param, e);
                None
            }
        }
    }

    pub fn query_data_or_default(&self, location: &dyn Location) -> T {
        self.query_data(location)
            .unwrap_or_else(|| self.default.clone())
    }

    /// Serialize `data` into the parameter, keeping every other parameter,
    /// and navigate to the resulting URL
    pub fn redirect_with_query(&self, location: &mut dyn Location, data: &T) -> Result<()> {
        let json = serde_json::to_string(data)?;

        let mut url = location.url().clone();
        let others: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(name, _)| name != self.param.as_str())
            .map(|(name, value)| (name.into_owned(), value.into_owned()))
            .collect();

        url.query_pairs_mut()
            .clear()
            .extend_pairs(others)
            .append_pair(&self.param, &json);

        location.navigate(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{Format, OptionsQuery, URL_OPTIONS};

    fn adapter() -> UrlQueryData<OptionsQuery> {
        UrlQueryData::new(URL_OPTIONS, OptionsQuery::default())
    }

    #[test]
    fn absent_parameter_reads_as_none() {
        let location = MemoryLocation::parse("http://localhost/logs?q=error").unwrap();
        assert_eq!(adapter().query_data(&location), None);
        assert_eq!(adapter().query_data_or_default(&location), OptionsQuery::default());
    }

    #[test]
    fn redirect_round_trips_and_keeps_other_params() {
        let mut location = MemoryLocation::parse("http://localhost/logs?q=error").unwrap();
        let options = OptionsQuery {
            max_lines: 7,
            format: Format::Table,
            ..Default::default()
        };

        adapter().redirect_with_query(&mut location, &options).unwrap();

        assert_eq!(location.navigation_count(), 1);
        assert_eq!(adapter().query_data(&location), Some(options));
        assert!(location
            .url()
            .query_pairs()
            .any(|(k, v)| k == "q" && v == "error"));
    }

    #[test]
    fn redirect_replaces_previous_value() {
        let mut location = MemoryLocation::parse("http://localhost/logs").unwrap();
        let adapter = adapter();

        adapter
            .redirect_with_query(&mut location, &OptionsQuery::default())
            .unwrap();
        let mut next = OptionsQuery::default();
        next.max_lines = 9;
        adapter.redirect_with_query(&mut location, &next).unwrap();

        let count = location
            .url()
            .query_pairs()
            .filter(|(k, _)| k == URL_OPTIONS)
            .count();
        assert_eq!(count, 1);
        assert_eq!(adapter.query_data(&location).unwrap().max_lines, 9);
    }

    #[test]
    fn malformed_parameter_reads_as_none() {
        let location = MemoryLocation::parse("http://localhost/logs?options=%7Bnope").unwrap();
        assert!(adapter().query(&location).is_some());
        assert_eq!(adapter().query_data(&location), None);
    }
}
