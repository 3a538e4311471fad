//! Options menu events and the read-only config the view renders from

use crate::options::utils::SelectOption;
use crate::options::{AttributeDescriptor, DataSource, Format, InitialOptions};

/// Edits raised by the view
#[derive(Debug, Clone, PartialEq)]
pub enum OptionsMenuEvent {
    /// Add-column input gained focus
    Focus,

    /// Add-column input lost focus; drops the typed text
    Blur,

    /// Text typed into the add-column input
    Search(String),

    /// Column picked from the dropdown (by key)
    Select(String),

    /// Column tag closed (by key)
    Remove(String),

    FormatChanged(Format),

    MaxLinesChanged(u32),
}

/// What the controller is mounted with
#[derive(Debug, Clone)]
pub struct OptionsMenuProps {
    pub data_source: DataSource,
    pub aggregate_operator: String,
    pub initial_options: InitialOptions,
}

impl OptionsMenuProps {
    pub fn new(data_source: DataSource, aggregate_operator: &str) -> Self {
        Self {
            data_source,
            aggregate_operator: aggregate_operator.to_string(),
            initial_options: InitialOptions::default(),
        }
    }

    pub fn with_initial_options(mut self, initial_options: InitialOptions) -> Self {
        self.initial_options = initial_options;
        self
    }
}

/// Snapshot of everything the options menu view needs to render
#[derive(Debug, Clone, PartialEq)]
pub struct OptionsMenuConfig {
    pub add_column: AddColumnConfig,
    pub format: FormatConfig,
    pub max_lines: MaxLinesConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AddColumnConfig {
    /// A lookup for the current search text is in flight
    pub is_fetching: bool,
    /// Currently selected columns
    pub value: Vec<AttributeDescriptor>,
    /// Dropdown entries from the live search
    pub options: Vec<SelectOption>,
    pub search_text: String,
    pub is_focused: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormatConfig {
    pub value: Format,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MaxLinesConfig {
    pub value: u32,
}
