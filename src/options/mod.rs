//! List view options
//!
//! The user-configurable display settings for a log/trace list view and the
//! attribute descriptors that make up its selectable columns.

pub mod utils;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Name of the URL query parameter holding the options
pub const URL_OPTIONS: &str = "options";

/// Key of the persisted options blob
pub const LIST_OPTIONS: &str = "LIST_OPTIONS";

/// Attribute keys never offered as selectable columns
pub const EXCLUDED_ATTRIBUTE_KEYS: &[&str] = &["body"];

pub const DEFAULT_MAX_LINES: u32 = 2;

/// Output format of a list row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Raw,
    Table,
    #[default]
    List,
}

impl Format {
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Raw => "raw",
            Format::Table => "table",
            Format::List => "list",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "raw" => Ok(Format::Raw),
            "table" => Ok(Format::Table),
            "list" => Ok(Format::List),
            other => Err(anyhow::anyhow!(
                "Unknown format '{}', expected raw, table or list",
                other
            )),
        }
    }
}

/// Data source an attribute lookup is scoped to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Traces,
    #[default]
    Logs,
    Metrics,
}

impl DataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::Traces => "traces",
            DataSource::Logs => "logs",
            DataSource::Metrics => "metrics",
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named, typed field that can be displayed as a column.
///
/// Identity is the `key`; `id` is carried through when the server sends one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub key: String,
    #[serde(default)]
    pub data_type: String,
    #[serde(default, rename = "type")]
    pub attr_type: String,
    #[serde(default)]
    pub is_column: bool,
    #[serde(default, rename = "isJSON")]
    pub is_json: bool,
}

impl AttributeDescriptor {
    pub fn new(key: &str, data_type: &str, attr_type: &str) -> Self {
        Self {
            id: None,
            key: key.to_string(),
            data_type: data_type.to_string(),
            attr_type: attr_type.to_string(),
            is_column: false,
            is_json: false,
        }
    }
}

/// Display options of the list view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionsQuery {
    #[serde(default)]
    pub select_columns: Vec<AttributeDescriptor>,
    #[serde(default = "default_max_lines")]
    pub max_lines: u32,
    #[serde(default)]
    pub format: Format,
}

fn default_max_lines() -> u32 {
    DEFAULT_MAX_LINES
}

impl Default for OptionsQuery {
    fn default() -> Self {
        Self {
            select_columns: Vec::new(),
            max_lines: DEFAULT_MAX_LINES,
            format: Format::default(),
        }
    }
}

impl OptionsQuery {
    pub fn selected_keys(&self) -> Vec<&str> {
        self.select_columns.iter().map(|c| c.key.as_str()).collect()
    }

    /// Restore invariants on data that came from outside (URL, storage):
    /// duplicate keys are dropped keeping the first, a zero row limit
    /// falls back to the default
    pub fn normalized(mut self) -> Self {
        let mut seen = std::collections::HashSet::new();
        self.select_columns.retain(|c| seen.insert(c.key.clone()));
        if self.max_lines == 0 {
            self.max_lines = DEFAULT_MAX_LINES;
        }
        self
    }
}

/// Caller-supplied starting point for the options menu
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitialOptions {
    /// Column names to resolve into descriptors on mount
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub select_columns: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_lines: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<Format>,
}
