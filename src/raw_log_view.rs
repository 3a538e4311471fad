//! Log rows rendered according to the list view options
//!
//! Each record becomes one row whose text is wrapped at a fixed width and
//! clamped to `maxLines` lines; a clamped row ends in an ellipsis. The
//! active row is highlighted unless the view is read-only.

use crate::options::{Format, OptionsQuery};
use anyhow::{Context, Result};
use comfy_table::{Attribute, Cell, ContentArrangement, Table};
use crossterm::style::Stylize;
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

const ELLIPSIS: char = '…';

#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub timestamp: String,
    pub body: String,
    pub attributes: Map<String, Value>,
}

impl LogRecord {
    /// Accepts `{"timestamp", "body", "attributes": {..}}` records as well as
    /// flat objects, where every other top-level field is an attribute
    pub fn from_value(value: Value) -> Self {
        let mut obj = match value {
            Value::Object(obj) => obj,
            other => {
                return Self {
                    timestamp: String::new(),
                    body: value_to_string(&other),
                    attributes: Map::new(),
                }
            }
        };

        let timestamp = obj
            .remove("timestamp")
            .map(|v| value_to_string(&v))
            .unwrap_or_default();
        let body = obj
            .remove("body")
            .map(|v| value_to_string(&v))
            .unwrap_or_default();

        let mut attributes = match obj.remove("attributes") {
            Some(Value::Object(nested)) => nested,
            Some(other) => {
                obj.insert("attributes".to_string(), other);
                Map::new()
            }
            None => Map::new(),
        };
        for (key, value) in obj {
            attributes.entry(key).or_insert(value);
        }

        Self {
            timestamp,
            body,
            attributes,
        }
    }

    pub fn attribute(&self, key: &str) -> Option<String> {
        self.attributes.get(key).map(value_to_string)
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        v => v.to_string(),
    }
}

/// Load records from a JSON array or from JSON lines
pub fn load_records(path: &Path) -> Result<Vec<LogRecord>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read logs from {}", path.display()))?;
    parse_records(&content)
}

pub fn parse_records(content: &str) -> Result<Vec<LogRecord>> {
    let trimmed = content.trim_start();
    if trimmed.starts_with('[') {
        let values: Vec<Value> = serde_json::from_str(trimmed).context("Invalid JSON log array")?;
        return Ok(values.into_iter().map(LogRecord::from_value).collect());
    }

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str::<Value>(line)
                .map(LogRecord::from_value)
                .with_context(|| format!("Invalid JSON on line {}", i + 1))
        })
        .collect()
}

/// Wrap `text` at `width` characters and keep at most `max_lines` lines.
/// The last kept line ends in an ellipsis when anything was cut.
pub fn clamp_lines(text: &str, max_lines: usize, width: usize) -> Vec<String> {
    let width = width.max(1);
    let max_lines = max_lines.max(1);

    let mut wrapped: Vec<String> = Vec::new();
    for line in text.lines() {
        let chars: Vec<char> = line.chars().collect();
        if chars.is_empty() {
            wrapped.push(String::new());
            continue;
        }
        for chunk in chars.chunks(width) {
            wrapped.push(chunk.iter().collect());
        }
    }
    if wrapped.is_empty() {
        wrapped.push(String::new());
    }

    if wrapped.len() <= max_lines {
        return wrapped;
    }

    wrapped.truncate(max_lines);
    if let Some(last) = wrapped.last_mut() {
        if last.chars().count() >= width {
            last.pop();
        }
        last.push(ELLIPSIS);
    }
    wrapped
}

#[derive(Debug, Clone)]
pub struct RawLogView {
    wrap_width: usize,
    read_only: bool,
    active: Option<usize>,
    use_color: bool,
}

impl RawLogView {
    pub fn new(wrap_width: usize) -> Self {
        Self {
            wrap_width,
            read_only: false,
            active: None,
            use_color: false,
        }
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn with_color(mut self, use_color: bool) -> Self {
        self.use_color = use_color;
        self
    }

    pub fn set_active(&mut self, active: Option<usize>) {
        self.active = active;
    }

    fn is_active(&self, index: usize) -> bool {
        !self.read_only && self.active == Some(index)
    }

    pub fn render(&self, records: &[LogRecord], options: &OptionsQuery) -> String {
        match options.format {
            Format::Raw => self.render_rows(records, options, |record| {
                join_nonempty(&[record.timestamp.as_str(), record.body.as_str()])
            }),
            Format::List => self.render_rows(records, options, |record| {
                let pairs: Vec<String> = options
                    .select_columns
                    .iter()
                    .map(|column| {
                        format!(
                            "{}={}",
                            column.key,
                            record.attribute(&column.key).unwrap_or_default()
                        )
                    })
                    .collect();
                let pairs = pairs.join(" ");
                join_nonempty(&[
                    record.timestamp.as_str(),
                    pairs.as_str(),
                    record.body.as_str(),
                ])
            }),
            Format::Table => self.render_table(records, options),
        }
    }

    fn render_rows<F>(&self, records: &[LogRecord], options: &OptionsQuery, line_for: F) -> String
    where
        F: Fn(&LogRecord) -> String,
    {
        // Two columns of gutter for the active marker
        let width = self.wrap_width.saturating_sub(2);
        let mut out = Vec::new();

        for (index, record) in records.iter().enumerate() {
            let active = self.is_active(index);
            let lines = clamp_lines(&line_for(record), options.max_lines as usize, width);
            for (i, line) in lines.into_iter().enumerate() {
                let gutter = if active && i == 0 { "> " } else { "  " };
                let line = format!("{}{}", gutter, line);
                if active && self.use_color {
                    out.push(line.bold().on_dark_yellow().to_string());
                } else {
                    out.push(line);
                }
            }
        }

        out.join("\n")
    }

    fn render_table(&self, records: &[LogRecord], options: &OptionsQuery) -> String {
        let mut table = Table::new();
        table.set_content_arrangement(ContentArrangement::Disabled);
        if !self.use_color {
            table.force_no_tty();
        }

        let mut headers = vec![Cell::new("timestamp").add_attribute(Attribute::Bold)];
        headers.extend(
            options
                .select_columns
                .iter()
                .map(|c| Cell::new(&c.key).add_attribute(Attribute::Bold)),
        );
        headers.push(Cell::new("body").add_attribute(Attribute::Bold));
        table.set_header(headers);

        for (index, record) in records.iter().enumerate() {
            let mut row = vec![record.timestamp.clone()];
            row.extend(
                options
                    .select_columns
                    .iter()
                    .map(|c| record.attribute(&c.key).unwrap_or_default()),
            );
            row.push(
                clamp_lines(&record.body, options.max_lines as usize, self.wrap_width).join("\n"),
            );

            let cells: Vec<Cell> = row
                .into_iter()
                .map(|text| {
                    let cell = Cell::new(text);
                    if self.is_active(index) {
                        cell.add_attribute(Attribute::Reverse)
                    } else {
                        cell
                    }
                })
                .collect();
            table.add_row(cells);
        }

        table.to_string()
    }
}

fn join_nonempty(parts: &[&str]) -> String {
    parts
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}
