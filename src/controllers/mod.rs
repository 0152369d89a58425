//! Generic page controllers: paginated lists and mutate-then-patch actions.

pub mod list;
pub mod mutation;
pub mod pagination;
pub mod rest;

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;

pub use list::{ListController, ListOptions, ListSnapshot, ListSource, ViewStatus};
pub use mutation::{Action, MutationController, MutationSource};
pub use pagination::{page_window, total_pages, Pager};
pub use rest::RestListSource;

/// A server-owned entity the controllers can key and filter.
pub trait Resource: DeserializeOwned + Clone + Send + Sync + 'static {
    fn id(&self) -> &str;

    /// Value compared against the `status` filter, when the entity has one.
    fn status(&self) -> Option<&str> {
        None
    }
}

/// The effective query of a list view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub search: String,
    pub filters: BTreeMap<String, String>,
    pub sort: Option<String>,
    pub page: u32,
    pub page_size: u32,
}

impl ListQuery {
    pub fn new(page_size: u32) -> Self {
        Self {
            search: String::new(),
            filters: BTreeMap::new(),
            sort: None,
            page: 1,
            page_size: page_size.max(1),
        }
    }

    pub fn filter(&self, key: &str) -> Option<&str> {
        self.filters.get(key).map(String::as_str)
    }

    /// Wire parameters: `search`, filters, `sort`, `page`, `limit`.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if !self.search.is_empty() {
            params.push(("search".to_string(), self.search.clone()));
        }
        for (k, v) in &self.filters {
            params.push((k.clone(), v.clone()));
        }
        if let Some(sort) = &self.sort {
            params.push(("sort".to_string(), sort.clone()));
        }
        params.push(("page".to_string(), self.page.to_string()));
        params.push(("limit".to_string(), self.page_size.to_string()));
        params
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

/// Filter value meaning "no status restriction".
pub const ALL: &str = "all";

/// Default visibility rule: an item with a status must match the active
/// `status` filter.
pub fn matches_status<T: Resource>(item: &T, query: &ListQuery) -> bool {
    match (query.filter("status"), item.status()) {
        (None, _) | (Some(ALL), _) | (_, None) => true,
        (Some(wanted), Some(actual)) => wanted.eq_ignore_ascii_case(actual),
    }
}
