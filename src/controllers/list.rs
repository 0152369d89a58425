use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::pagination::{total_pages, Pager, DEFAULT_WINDOW};
use super::{matches_status, ListQuery, Page, Resource};
use crate::error::ClientError;
use crate::notify::Notifier;
use crate::settings::Settings;

/// A server-backed, paginated collection.
#[async_trait]
pub trait ListSource: Send + Sync + 'static {
    type Item: Resource;

    async fn fetch(&self, query: &ListQuery) -> Result<Page<Self::Item>, ClientError>;

    /// Whether `item` still belongs in a list showing `query`.
    fn matches(&self, item: &Self::Item, query: &ListQuery) -> bool {
        matches_status(item, query)
    }
}

#[derive(Clone)]
pub struct ListOptions {
    pub page_size: u32,
    pub debounce: Duration,
    pub filters: BTreeMap<String, String>,
    pub sort: Option<String>,
    /// Remember page and filters across restarts under the list's name.
    pub remember: Option<Settings>,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            page_size: 12,
            debounce: Duration::from_millis(400),
            filters: BTreeMap::new(),
            sort: None,
            remember: None,
        }
    }
}

impl ListOptions {
    pub fn with_filter(mut self, key: &str, value: &str) -> Self {
        self.filters.insert(key.to_string(), value.to_string());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewStatus {
    Loading,
    Empty,
    Error,
    Populated,
}

#[derive(Debug, Clone)]
pub struct ListSnapshot<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub query: ListQuery,
    pub search_term: String,
    pub loading: bool,
    pub error: Option<String>,
}

impl<T> ListSnapshot<T> {
    pub fn page(&self) -> u32 {
        self.query.page
    }

    pub fn total_pages(&self) -> u32 {
        total_pages(self.total, self.query.page_size)
    }

    pub fn pager(&self) -> Pager {
        Pager::new(self.query.page, self.total_pages(), DEFAULT_WINDOW)
    }

    /// Previous items stay visible while reloading or after a failure.
    pub fn status(&self) -> ViewStatus {
        match (self.items.is_empty(), self.loading, self.error.is_some()) {
            (false, _, _) => ViewStatus::Populated,
            (true, true, _) => ViewStatus::Loading,
            (true, false, true) => ViewStatus::Error,
            (true, false, false) => ViewStatus::Empty,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchReason {
    Query,
    /// Re-fetch after clamping an out-of-range page; never clamps again.
    Clamp,
}

struct ListState<T> {
    search_term: String,
    query: ListQuery,
    items: Vec<T>,
    total: u64,
    loading: bool,
    error: Option<String>,
    mounted: bool,
    alive: bool,
    generation: u64,
    debounce_seq: u64,
    fetch_task: Option<JoinHandle<()>>,
    debounce_task: Option<JoinHandle<()>>,
}

struct Inner<S: ListSource> {
    name: String,
    source: S,
    notifier: Notifier,
    debounce: Duration,
    remember: Option<Settings>,
    state: Mutex<ListState<S::Item>>,
    changed: watch::Sender<u64>,
}

/// Request lifecycle for one list view.
///
/// Every state change that alters the effective query issues a fetch;
/// a newer fetch aborts the older one and bumps the generation, so a late
/// response can never overwrite fresher state. Must be used inside a
/// tokio runtime. Dropping the controller cancels in-flight work.
pub struct ListController<S: ListSource> {
    inner: Arc<Inner<S>>,
}

impl<S: ListSource> ListController<S> {
    pub fn new(name: impl Into<String>, source: S, notifier: Notifier, options: ListOptions) -> Self {
        let mut query = ListQuery::new(options.page_size);
        query.filters = options.filters;
        query.sort = options.sort;
        let (changed, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                name: name.into(),
                source,
                notifier,
                debounce: options.debounce,
                remember: options.remember,
                state: Mutex::new(ListState {
                    search_term: String::new(),
                    query,
                    items: Vec::new(),
                    total: 0,
                    loading: false,
                    error: None,
                    mounted: false,
                    alive: true,
                    generation: 0,
                    debounce_seq: 0,
                    fetch_task: None,
                    debounce_task: None,
                }),
                changed,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn source(&self) -> &S {
        &self.inner.source
    }

    /// Restores remembered page/filters and issues the initial fetch.
    /// Restoring does not reset the page.
    pub fn mount(&self) {
        let mut st = self.inner.lock();
        if st.mounted {
            return;
        }
        if let Some(settings) = &self.inner.remember {
            let filters = settings.remembered_filters(&self.inner.name);
            if !filters.is_empty() {
                st.query.filters = filters;
            }
            if let Some(page) = settings.remembered_page(&self.inner.name) {
                st.query.page = page;
            }
        }
        if let Some(task) = st.debounce_task.take() {
            task.abort();
        }
        st.query.search = st.search_term.trim().to_string();
        st.alive = true;
        st.mounted = true;
        debug!(list = %self.inner.name, page = st.query.page, "mounted");
        self.inner.spawn_fetch(&mut st, FetchReason::Query);
        drop(st);
        self.inner.bump();
    }

    /// Cancels in-flight work; late responses are ignored.
    pub fn unmount(&self) {
        let mut st = self.inner.lock();
        if !st.alive {
            return;
        }
        st.alive = false;
        st.mounted = false;
        st.loading = false;
        st.generation += 1;
        if let Some(task) = st.fetch_task.take() {
            task.abort();
        }
        if let Some(task) = st.debounce_task.take() {
            task.abort();
        }
        debug!(list = %self.inner.name, "unmounted");
        drop(st);
        self.inner.bump();
    }

    /// Records raw input; the query only changes once typing pauses.
    pub fn set_search(&self, text: &str) {
        let mut st = self.inner.lock();
        st.search_term = text.to_string();
        if let Some(prev) = st.debounce_task.take() {
            prev.abort();
        }
        st.debounce_seq += 1;
        let seq = st.debounce_seq;
        let delay = self.inner.debounce;
        let inner = Arc::clone(&self.inner);
        st.debounce_task = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            inner.apply_search(seq);
        }));
        drop(st);
        self.inner.bump();
    }

    /// Sets (or with `None`/blank, removes) a filter. Resets to page 1.
    pub fn set_filter(&self, key: &str, value: Option<&str>) {
        let value = value.map(str::trim).filter(|v| !v.is_empty());
        self.update_query(true, |q| match value {
            Some(v) => {
                q.filters.insert(key.to_string(), v.to_string());
            }
            None => {
                q.filters.remove(key);
            }
        });
    }

    pub fn set_sort(&self, sort: Option<&str>) {
        let sort = sort.map(str::to_string);
        self.update_query(true, |q| q.sort = sort);
    }

    /// Changes the page; filters are untouched.
    pub fn set_page(&self, page: u32) {
        self.update_query(false, |q| q.page = page.max(1));
    }

    pub fn set_page_size(&self, size: u32) {
        self.update_query(true, |q| q.page_size = size.max(1));
    }

    /// Re-issues the current query (retry affordance).
    pub fn reload(&self) {
        let mut st = self.inner.lock();
        if !st.mounted {
            return;
        }
        self.inner.spawn_fetch(&mut st, FetchReason::Query);
        drop(st);
        self.inner.bump();
    }

    fn update_query<F>(&self, resets_page: bool, change: F)
    where
        F: FnOnce(&mut ListQuery),
    {
        let mut st = self.inner.lock();
        let before = st.query.clone();
        change(&mut st.query);
        if st.query == before {
            return;
        }
        if resets_page && st.mounted {
            st.query.page = 1;
        }
        let query = st.query.clone();
        if st.mounted {
            self.inner.spawn_fetch(&mut st, FetchReason::Query);
        }
        drop(st);
        self.inner.remember(&query);
        self.inner.bump();
    }

    /// Replaces a loaded item with the server's copy, or drops it when it
    /// no longer matches the active filters. Returns false if not loaded.
    pub fn apply_patch(&self, item: S::Item) -> bool {
        let mut st = self.inner.lock();
        let Some(idx) = st.items.iter().position(|i| i.id() == item.id()) else {
            return false;
        };
        if self.inner.source.matches(&item, &st.query) {
            st.items[idx] = item;
        } else {
            st.items.remove(idx);
            st.total = st.total.saturating_sub(1);
        }
        drop(st);
        self.inner.bump();
        true
    }

    pub fn remove_item(&self, id: &str) -> bool {
        let mut st = self.inner.lock();
        let before = st.items.len();
        st.items.retain(|i| i.id() != id);
        let removed = st.items.len() != before;
        if removed {
            st.total = st.total.saturating_sub(1);
        }
        drop(st);
        if removed {
            self.inner.bump();
        }
        removed
    }

    pub fn snapshot(&self) -> ListSnapshot<S::Item> {
        let st = self.inner.lock();
        ListSnapshot {
            items: st.items.clone(),
            total: st.total,
            query: st.query.clone(),
            search_term: st.search_term.clone(),
            loading: st.loading,
            error: st.error.clone(),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.changed.subscribe()
    }

    /// Resolves once no fetch or pending search is outstanding.
    pub async fn settled(&self) {
        let mut rx = self.inner.changed.subscribe();
        loop {
            if self.inner.is_idle() {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

impl<S: ListSource> Drop for ListController<S> {
    fn drop(&mut self) {
        self.unmount();
    }
}

impl<S: ListSource> Inner<S> {
    fn lock(&self) -> MutexGuard<'_, ListState<S::Item>> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn bump(&self) {
        self.changed.send_modify(|v| *v = v.wrapping_add(1));
    }

    fn is_idle(&self) -> bool {
        let st = self.lock();
        !st.loading && st.debounce_task.is_none()
    }

    /// Persists page and filters. Never call with the state lock held:
    /// file-backed settings write synchronously.
    fn remember(&self, query: &ListQuery) {
        if let Some(settings) = &self.remember {
            settings.remember_page(&self.name, query.page);
            settings.remember_filters(&self.name, &query.filters);
        }
    }

    fn spawn_fetch(self: &Arc<Self>, st: &mut ListState<S::Item>, reason: FetchReason) {
        if let Some(prev) = st.fetch_task.take() {
            prev.abort();
        }
        st.generation += 1;
        st.loading = true;
        let generation = st.generation;
        let query = st.query.clone();
        debug!(
            list = %self.name,
            generation,
            page = query.page,
            search = %query.search,
            ?reason,
            "fetch"
        );
        let inner = Arc::clone(self);
        st.fetch_task = Some(tokio::spawn(async move {
            let result = inner.source.fetch(&query).await;
            inner.finish(generation, reason, result);
        }));
    }

    fn finish(
        self: &Arc<Self>,
        generation: u64,
        reason: FetchReason,
        result: Result<Page<S::Item>, ClientError>,
    ) {
        let mut st = self.lock();
        let mut clamped = None;
        if !st.alive || st.generation != generation {
            debug!(list = %self.name, generation, current = st.generation, "discarding stale response");
            return;
        }
        st.loading = false;
        st.fetch_task = None;

        match result {
            Ok(page) => {
                st.items = page.items;
                st.total = page.total;
                st.error = None;
                let last = total_pages(st.total, st.query.page_size);
                if st.query.page > last {
                    debug!(list = %self.name, from = st.query.page, to = last, "page out of range; clamping");
                    st.query.page = last;
                    clamped = Some(st.query.clone());
                    if reason == FetchReason::Query {
                        self.spawn_fetch(&mut st, FetchReason::Clamp);
                    }
                }
            }
            Err(err) => {
                warn!(list = %self.name, error = %err, "list load failed");
                let message = err.user_message();
                st.error = Some(message.clone());
                self.notifier
                    .error(&format!("{}:{}", self.name, err.dedup_key()), message);
            }
        }
        drop(st);
        if let Some(query) = clamped {
            self.remember(&query);
        }
        self.bump();
    }

    fn apply_search(self: &Arc<Self>, seq: u64) {
        let mut st = self.lock();
        if st.debounce_seq != seq {
            return;
        }
        st.debounce_task = None;
        if !st.alive {
            // picked up by the next mount()
            drop(st);
            self.bump();
            return;
        }
        let term = st.search_term.trim().to_string();
        let mut changed = None;
        if term != st.query.search {
            st.query.search = term;
            if st.mounted {
                st.query.page = 1;
                changed = Some(st.query.clone());
                self.spawn_fetch(&mut st, FetchReason::Query);
            }
        }
        drop(st);
        if let Some(query) = changed {
            self.remember(&query);
        }
        self.bump();
    }
}
