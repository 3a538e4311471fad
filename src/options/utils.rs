use super::{AttributeDescriptor, InitialOptions, OptionsQuery};
use std::collections::HashSet;

/// An entry of the add-column dropdown
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub label: String,
    pub value: String,
    /// Already part of the current selection
    pub selected: bool,
}

/// Flatten the per-column lookup results into one candidate list.
/// A failed lookup contributes nothing.
pub fn aggregate_candidates<E>(
    results: impl IntoIterator<Item = Result<Vec<AttributeDescriptor>, E>>,
) -> Vec<AttributeDescriptor> {
    results
        .into_iter()
        .flat_map(|result| result.unwrap_or_default())
        .collect()
}

/// Keep the candidates matching the requested column names, in the
/// requested order. Names without a match are dropped.
pub fn resolve_initial_selection(
    requested: &[String],
    candidates: &[AttributeDescriptor],
) -> Vec<AttributeDescriptor> {
    let mut seen = HashSet::new();
    requested
        .iter()
        .filter(|column| seen.insert(column.as_str()))
        .filter_map(|column| candidates.iter().find(|attr| &attr.key == column))
        .cloned()
        .collect()
}

pub fn exclude_keys(
    attributes: &[AttributeDescriptor],
    excluded: &[String],
) -> Vec<AttributeDescriptor> {
    attributes
        .iter()
        .filter(|attr| !excluded.iter().any(|key| key == &attr.key))
        .cloned()
        .collect()
}

pub fn options_from_keys(
    attributes: &[AttributeDescriptor],
    selected_keys: &[&str],
) -> Vec<SelectOption> {
    attributes
        .iter()
        .map(|attr| SelectOption {
            label: attr.key.clone(),
            value: attr.key.clone(),
            selected: selected_keys.contains(&attr.key.as_str()),
        })
        .collect()
}

/// New selection after adding `key`.
///
/// Descriptors are looked up in the search results first, then in the
/// current selection. A key with no descriptor anywhere is dropped.
pub fn with_column_selected(
    current: &[AttributeDescriptor],
    searched: &[AttributeDescriptor],
    key: &str,
) -> Vec<AttributeDescriptor> {
    let mut keys: Vec<&str> = current.iter().map(|c| c.key.as_str()).collect();
    if !keys.contains(&key) {
        keys.push(key);
    }

    keys.into_iter()
        .filter_map(|k| searched.iter().chain(current.iter()).find(|attr| attr.key == k))
        .cloned()
        .collect()
}

pub fn without_column(current: &[AttributeDescriptor], key: &str) -> Vec<AttributeDescriptor> {
    current.iter().filter(|c| c.key != key).cloned().collect()
}

/// Defaults overlaid with the caller's options. The caller's column names
/// are replaced by the resolved descriptors.
pub fn merge_initial_options(
    initial: &InitialOptions,
    resolved: Vec<AttributeDescriptor>,
) -> OptionsQuery {
    let defaults = OptionsQuery::default();
    OptionsQuery {
        select_columns: if initial.select_columns.is_some() {
            resolved
        } else {
            defaults.select_columns
        },
        max_lines: initial.max_lines.unwrap_or(defaults.max_lines),
        format: initial.format.unwrap_or(defaults.format),
    }
    .normalized()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Format;

    fn attr(key: &str) -> AttributeDescriptor {
        AttributeDescriptor::new(key, "string", "tag")
    }

    fn keys(attrs: &[AttributeDescriptor]) -> Vec<&str> {
        attrs.iter().map(|a| a.key.as_str()).collect()
    }

    #[test]
    fn resolve_keeps_requested_order() {
        let requested = vec!["service.name".to_string(), "duration".to_string()];
        let candidates = vec![attr("duration"), attr("service.name"), attr("host")];

        let resolved = resolve_initial_selection(&requested, &candidates);
        assert_eq!(keys(&resolved), vec!["service.name", "duration"]);
    }

    #[test]
    fn resolve_drops_unmatched_silently() {
        let requested = vec!["service.name".to_string(), "duration".to_string()];
        let candidates = vec![attr("service.name")];

        let resolved = resolve_initial_selection(&requested, &candidates);
        assert_eq!(keys(&resolved), vec!["service.name"]);
    }

    #[test]
    fn resolve_ignores_repeated_requests() {
        let requested = vec!["a".to_string(), "a".to_string()];
        let resolved = resolve_initial_selection(&requested, &[attr("a"), attr("a")]);
        assert_eq!(keys(&resolved), vec!["a"]);
    }

    #[test]
    fn aggregate_skips_failed_lookups() {
        let results: Vec<Result<Vec<AttributeDescriptor>, String>> = vec![
            Ok(vec![attr("a")]),
            Err("timeout".to_string()),
            Ok(vec![attr("b"), attr("c")]),
        ];
        assert_eq!(keys(&aggregate_candidates(results)), vec!["a", "b", "c"]);
    }

    #[test]
    fn options_mark_selected_entries() {
        let options = options_from_keys(&[attr("a"), attr("b")], &["b"]);
        assert!(!options[0].selected);
        assert!(options[1].selected);
        assert_eq!(options[1].label, "b");
    }

    #[test]
    fn selecting_is_idempotent() {
        let current = vec![attr("a"), attr("b")];
        let next = with_column_selected(&current, &[attr("b")], "b");
        assert_eq!(next, current);
    }

    #[test]
    fn selecting_prefers_search_result_descriptor() {
        let current = vec![attr("a")];
        let searched = vec![AttributeDescriptor::new("a", "int64", "tag"), attr("b")];

        let next = with_column_selected(&current, &searched, "b");
        assert_eq!(keys(&next), vec!["a", "b"]);
        assert_eq!(next[0].data_type, "int64");
    }

    #[test]
    fn selecting_unknown_key_drops_it() {
        let current = vec![attr("a")];
        let next = with_column_selected(&current, &[], "ghost");
        assert_eq!(keys(&next), vec!["a"]);
    }

    #[test]
    fn removing_absent_key_is_noop() {
        let current = vec![attr("a")];
        assert_eq!(without_column(&current, "zzz"), current);
        assert!(without_column(&current, "a").is_empty());
    }

    #[test]
    fn merge_overlays_caller_options() {
        let initial = InitialOptions {
            select_columns: Some(vec!["a".to_string()]),
            max_lines: Some(5),
            format: None,
        };
        let merged = merge_initial_options(&initial, vec![attr("a")]);
        assert_eq!(keys(&merged.select_columns), vec!["a"]);
        assert_eq!(merged.max_lines, 5);
        assert_eq!(merged.format, Format::List);

        let merged = merge_initial_options(&InitialOptions::default(), vec![attr("x")]);
        assert!(merged.select_columns.is_empty());
    }
}
