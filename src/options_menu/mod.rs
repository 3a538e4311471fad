//! Options menu controller
//!
//! Owns the add-column search box state (text, focus, debounced text),
//! resolves the caller's initial columns, and keeps the list view options in
//! sync between the URL and persistent storage.
//!
//! ## Lifecycle
//!
//! 1. [`OptionsMenu::mount`] looks up every initial column name concurrently
//!    (skipped when the URL already carries options), joins the lookups, and
//!    seeds the URL once from storage or from the initial options.
//! 2. The view raises [`OptionsMenuEvent`]s through
//!    [`OptionsMenu::handle_event`]; every edit is pushed to the URL and then
//!    written to storage.
//! 3. The event loop calls [`OptionsMenu::tick`] to release debounced search
//!    text and collect finished lookups, or [`OptionsMenu::settle`] to wait
//!    for both.

pub mod events;

pub use events::{
    AddColumnConfig, FormatConfig, MaxLinesConfig, OptionsMenuConfig, OptionsMenuEvent,
    OptionsMenuProps,
};

use crate::api_client::{AttributeKeysRequest, AttributeSearchClient};
use crate::debouncer::Debouncer;
use crate::location::{Location, UrlQueryData};
use crate::options::utils::{
    aggregate_candidates, exclude_keys, merge_initial_options, options_from_keys,
    resolve_initial_selection, with_column_selected, without_column, SelectOption,
};
use crate::options::{
    AttributeDescriptor, Format, OptionsQuery, EXCLUDED_ATTRIBUTE_KEYS, LIST_OPTIONS, URL_OPTIONS,
};
use crate::store::KeyValueStore;
use anyhow::{bail, Result};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

pub const DEFAULT_DEBOUNCE_MS: u64 = 300;
pub const DEFAULT_SEARCH_CACHE_CAPACITY: usize = 64;

type LookupResult = Result<Vec<AttributeDescriptor>>;

/// A live search lookup that has not been collected yet
struct PendingSearch {
    search_text: String,
    handle: JoinHandle<LookupResult>,
}

pub struct OptionsMenu<S, L> {
    props: OptionsMenuProps,
    client: Arc<dyn AttributeSearchClient>,
    store: S,
    location: L,
    url_options: UrlQueryData<OptionsQuery>,
    excluded_keys: Vec<String>,

    search_text: String,
    is_focused: bool,
    debouncer: Debouncer<String>,
    debounced_search_text: String,

    /// Set once every initial lookup has settled
    initial_selection: Option<Vec<AttributeDescriptor>>,
    /// Hydrate-once latch
    hydrated: bool,

    /// Live search results per search text, oldest evicted first
    search_cache: HashMap<String, Vec<AttributeDescriptor>>,
    search_cache_order: VecDeque<String>,
    search_cache_capacity: usize,
    searched_attributes: Vec<AttributeDescriptor>,
    pending_searches: Vec<PendingSearch>,
}

impl<S, L> OptionsMenu<S, L>
where
    S: KeyValueStore,
    L: Location,
{
    pub fn new(
        props: OptionsMenuProps,
        client: Arc<dyn AttributeSearchClient>,
        store: S,
        location: L,
    ) -> Self {
        Self {
            props,
            client,
            store,
            location,
            url_options: UrlQueryData::new(URL_OPTIONS, OptionsQuery::default()),
            excluded_keys: EXCLUDED_ATTRIBUTE_KEYS
                .iter()
                .map(|k| k.to_string())
                .collect(),
            search_text: String::new(),
            is_focused: false,
            debouncer: Debouncer::new(DEFAULT_DEBOUNCE_MS),
            debounced_search_text: String::new(),
            initial_selection: None,
            hydrated: false,
            search_cache: HashMap::new(),
            search_cache_order: VecDeque::new(),
            search_cache_capacity: DEFAULT_SEARCH_CACHE_CAPACITY,
            searched_attributes: Vec::new(),
            pending_searches: Vec::new(),
        }
    }

    pub fn with_debounce_ms(mut self, debounce_ms: u64) -> Self {
        self.debouncer = Debouncer::new(debounce_ms);
        self
    }

    pub fn with_search_cache_capacity(mut self, capacity: usize) -> Self {
        self.search_cache_capacity = capacity.max(1);
        self
    }

    /// Extra keys hidden from the dropdown; `body` always stays excluded
    pub fn with_excluded_keys(mut self, keys: &[String]) -> Self {
        for key in keys {
            if !self.excluded_keys.contains(key) {
                self.excluded_keys.push(key.clone());
            }
        }
        self
    }

    /// Resolve the initial columns and seed the URL.
    ///
    /// Lookup failures only shrink the initial selection; errors come from
    /// reading storage or navigating.
    pub async fn mount(&mut self) -> Result<()> {
        let candidates = if self.url_has_options() {
            debug!(target: "options_menu", "URL already carries options, skipping initial lookups");
            Vec::new()
        } else {
            self.fetch_initial_attributes().await
        };

        let requested = self
            .props
            .initial_options
            .select_columns
            .clone()
            .unwrap_or_default();
        let resolved = resolve_initial_selection(&requested, &candidates);
        if resolved.len() < requested.len() {
            debug!(
                target: "options_menu",
                "Resolved {} of {} initial columns",
                resolved.len(),
                requested.len()
            );
        }
        self.initial_selection = Some(resolved);

        self.hydrate()?;
        Ok(())
    }

    /// One lookup per initial column name, all in flight at once; returns
    /// once every lookup has settled
    async fn fetch_initial_attributes(&self) -> Vec<AttributeDescriptor> {
        let columns: Vec<String> = self
            .props
            .initial_options
            .select_columns
            .iter()
            .flatten()
            .filter(|column| !column.is_empty())
            .cloned()
            .collect();

        if columns.is_empty() {
            return Vec::new();
        }

        let mut lookups = JoinSet::new();
        for (index, column) in columns.iter().enumerate() {
            let client = Arc::clone(&self.client);
            let request = self.request_for(column);
            lookups.spawn(async move { (index, client.attribute_keys(&request).await) });
        }

        let mut settled: Vec<Option<LookupResult>> = (0..columns.len()).map(|_| None).collect();
        while let Some(joined) = lookups.join_next().await {
            match joined {
                Ok((index, result)) => {
                    if let Err(e) = &result {
                        warn!(
                            target: "options_menu",
                            "Initial lookup for '{}' failed: {:#}",
                            columns[index],
                            e
                        );
                    }
                    settled[index] = Some(result);
                }
                Err(e) => warn!(target: "options_menu", "Initial lookup task failed: {}", e),
            }
        }

        aggregate_candidates(settled.into_iter().flatten())
    }

    /// Seed the URL from storage, or from the initial options when nothing
    /// is stored. Runs at most once, and never over options already in the URL.
    fn hydrate(&mut self) -> Result<bool> {
        if self.hydrated {
            return Ok(false);
        }
        let Some(initial_selection) = self.initial_selection.clone() else {
            return Ok(false);
        };
        if self.url_has_options() {
            self.hydrated = true;
            return Ok(false);
        }

        let initial = merge_initial_options(&self.props.initial_options, initial_selection);
        let next = match self.store.get(LIST_OPTIONS)? {
            Some(raw) => match serde_json::from_str::<OptionsQuery>(&raw) {
                Ok(stored) => {
                    debug!(target: "options_menu", "Hydrating from stored options");
                    stored.normalized()
                }
                Err(e) => {
                    warn!(
                        target: "options_menu",
                        "Stored {} is malformed ({}), using initial options",
                        LIST_OPTIONS,
                        e
                    );
                    initial
                }
            },
            None => initial,
        };

        self.url_options
            .redirect_with_query(&mut self.location, &next)?;
        self.hydrated = true;
        info!(
            target: "options_menu",
            "Hydrated options: format={} maxLines={} columns={:?}",
            next.format,
            next.max_lines,
            next.selected_keys()
        );
        Ok(true)
    }

    fn url_has_options(&self) -> bool {
        self.url_options.query(&self.location).is_some()
    }

    fn request_for(&self, search_text: &str) -> AttributeKeysRequest {
        AttributeKeysRequest::new(
            self.props.data_source,
            &self.props.aggregate_operator,
            search_text,
        )
    }

    /// Current options as read back from the URL
    pub fn options(&self) -> OptionsQuery {
        self.url_options
            .query_data_or_default(&self.location)
            .normalized()
    }

    pub fn config(&self) -> OptionsMenuConfig {
        let options = self.options();
        OptionsMenuConfig {
            add_column: AddColumnConfig {
                is_fetching: self.is_fetching(),
                options: self.select_options_for(&options),
                value: options.select_columns,
                search_text: self.search_text.clone(),
                is_focused: self.is_focused,
            },
            format: FormatConfig {
                value: options.format,
            },
            max_lines: MaxLinesConfig {
                value: options.max_lines,
            },
        }
    }

    /// Dropdown entries, with already selected columns marked
    pub fn select_options(&self) -> Vec<SelectOption> {
        self.select_options_for(&self.options())
    }

    fn select_options_for(&self, options: &OptionsQuery) -> Vec<SelectOption> {
        options_from_keys(&self.searched_candidates(), &options.selected_keys())
    }

    /// Live search results minus the excluded keys
    fn searched_candidates(&self) -> Vec<AttributeDescriptor> {
        exclude_keys(&self.searched_attributes, &self.excluded_keys)
    }

    pub fn handle_event(&mut self, event: OptionsMenuEvent) -> Result<()> {
        debug!(target: "options_menu", "Event: {:?}", event);
        match event {
            OptionsMenuEvent::Focus => self.focus(),
            OptionsMenuEvent::Blur => self.blur(),
            OptionsMenuEvent::Search(text) => self.search(&text),
            OptionsMenuEvent::Select(key) => self.select_column(&key)?,
            OptionsMenuEvent::Remove(key) => self.remove_column(&key)?,
            OptionsMenuEvent::FormatChanged(format) => self.change_format(format)?,
            OptionsMenuEvent::MaxLinesChanged(max_lines) => self.change_max_lines(max_lines)?,
        }
        Ok(())
    }

    pub fn focus(&mut self) {
        self.is_focused = true;
        self.refresh_search();
    }

    /// Leave the input: the typed text, anything still waiting in the
    /// debouncer and the displayed results are all dropped
    pub fn blur(&mut self) {
        self.is_focused = false;
        self.search_text.clear();
        self.debouncer.reset();
        self.debounced_search_text.clear();
        self.searched_attributes.clear();
    }

    pub fn search(&mut self, text: &str) {
        self.search_text = text.to_string();
        self.debouncer.trigger(self.search_text.clone());
    }

    pub fn select_column(&mut self, key: &str) -> Result<()> {
        let current = self.options();
        let select_columns =
            with_column_selected(&current.select_columns, &self.searched_candidates(), key);
        if !select_columns.iter().any(|c| c.key == key) {
            debug!(target: "options_menu", "No descriptor for '{}', not selected", key);
        }

        self.redirect_with_options(OptionsQuery {
            select_columns,
            ..current
        })
    }

    pub fn remove_column(&mut self, key: &str) -> Result<()> {
        let current = self.options();
        let select_columns = without_column(&current.select_columns, key);

        self.redirect_with_options(OptionsQuery {
            select_columns,
            ..current
        })
    }

    pub fn change_format(&mut self, format: Format) -> Result<()> {
        let current = self.options();
        self.redirect_with_options(OptionsQuery { format, ..current })
    }

    pub fn change_max_lines(&mut self, max_lines: u32) -> Result<()> {
        if max_lines == 0 {
            bail!("Max lines must be at least 1");
        }
        let current = self.options();
        self.redirect_with_options(OptionsQuery {
            max_lines,
            ..current
        })
    }

    /// Push new options to the URL, then persist them
    fn redirect_with_options(&mut self, options: OptionsQuery) -> Result<()> {
        self.url_options
            .redirect_with_query(&mut self.location, &options)?;
        self.store
            .set(LIST_OPTIONS, &serde_json::to_string(&options)?)?;
        debug!(target: "options_menu", "Persisted options: {:?}", options.selected_keys());
        Ok(())
    }

    /// Release debounced text if its quiet window passed and collect
    /// finished lookups. Call from the event loop.
    pub async fn tick(&mut self) {
        if let Some(text) = self.debouncer.poll() {
            self.debounced_search_text = text;
            self.refresh_search();
        }
        self.collect_finished_searches().await;
    }

    /// Wait until nothing is debouncing and no lookup is in flight
    pub async fn settle(&mut self) {
        loop {
            if let Some(remaining) = self.debouncer.time_remaining() {
                tokio::time::sleep(remaining).await;
            }
            self.tick().await;

            if !self.pending_searches.is_empty() {
                let pending = std::mem::take(&mut self.pending_searches);
                for search in pending {
                    let result = Self::join_search(search.handle).await;
                    self.apply_search_result(search.search_text, result);
                }
            }

            if !self.debouncer.is_pending() && self.pending_searches.is_empty() {
                return;
            }
        }
    }

    fn search_enabled(&self) -> bool {
        self.is_focused && !self.debounced_search_text.is_empty()
    }

    /// Show the results for the current (debounced text, focus) pair,
    /// starting a lookup if that pair has never been fetched
    fn refresh_search(&mut self) {
        if !self.search_enabled() {
            self.searched_attributes.clear();
            return;
        }

        let text = self.debounced_search_text.clone();
        if let Some(cached) = self.search_cache.get(&text) {
            self.searched_attributes = cached.clone();
            return;
        }

        self.searched_attributes.clear();
        if self.pending_searches.iter().any(|s| s.search_text == text) {
            return;
        }

        debug!(target: "options_menu", "Searching attributes for '{}'", text);
        let client = Arc::clone(&self.client);
        let request = self.request_for(&text);
        let handle = tokio::spawn(async move { client.attribute_keys(&request).await });
        self.pending_searches.push(PendingSearch {
            search_text: text,
            handle,
        });
    }

    async fn collect_finished_searches(&mut self) {
        let (finished, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending_searches)
            .into_iter()
            .partition(|search| search.handle.is_finished());
        self.pending_searches = pending;

        for search in finished {
            let result = Self::join_search(search.handle).await;
            self.apply_search_result(search.search_text, result);
        }
    }

    async fn join_search(handle: JoinHandle<LookupResult>) -> LookupResult {
        match handle.await {
            Ok(result) => result,
            Err(e) => Err(anyhow::anyhow!("Search task failed: {}", e)),
        }
    }

    fn apply_search_result(&mut self, search_text: String, result: LookupResult) {
        let is_current = self.search_enabled() && self.debounced_search_text == search_text;

        match result {
            Ok(attributes) => {
                debug!(
                    target: "options_menu",
                    "Search '{}' returned {} attributes",
                    search_text,
                    attributes.len()
                );
                if is_current {
                    self.searched_attributes = attributes.clone();
                }
                self.cache_search(search_text, attributes);
            }
            Err(e) => {
                warn!(target: "options_menu", "Search '{}' failed: {:#}", search_text, e);
                if is_current {
                    self.searched_attributes.clear();
                }
            }
        }
    }

    fn cache_search(&mut self, search_text: String, attributes: Vec<AttributeDescriptor>) {
        if self
            .search_cache
            .insert(search_text.clone(), attributes)
            .is_none()
        {
            self.search_cache_order.push_back(search_text);
        }
        while self.search_cache_order.len() > self.search_cache_capacity {
            if let Some(oldest) = self.search_cache_order.pop_front() {
                self.search_cache.remove(&oldest);
            }
        }
    }

    pub fn is_fetching(&self) -> bool {
        self.search_enabled()
            && self
                .pending_searches
                .iter()
                .any(|s| s.search_text == self.debounced_search_text)
    }

    pub fn search_text(&self) -> &str {
        &self.search_text
    }

    pub fn debounced_search_text(&self) -> &str {
        &self.debounced_search_text
    }

    pub fn is_focused(&self) -> bool {
        self.is_focused
    }

    pub fn is_hydrated(&self) -> bool {
        self.hydrated
    }

    /// Initial columns resolved on mount; None until every lookup settled
    pub fn initial_selection(&self) -> Option<&[AttributeDescriptor]> {
        self.initial_selection.as_deref()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn location(&self) -> &L {
        &self.location
    }
}
