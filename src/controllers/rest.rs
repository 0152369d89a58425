use std::marker::PhantomData;

use async_trait::async_trait;
use serde_json::Value;
use tracing::instrument;

use super::list::ListSource;
use super::{ListQuery, Page, Resource};
use crate::error::ClientError;
use crate::http::ApiClient;

/// List source for the backend's `GET <path>?search&...&page&limit`
/// endpoints answering `{ "<collection>": [...], "total": N }`.
pub struct RestListSource<T> {
    api: ApiClient,
    path: String,
    collection: &'static str,
    _item: PhantomData<fn() -> T>,
}

impl<T> RestListSource<T> {
    pub fn new(api: ApiClient, path: impl Into<String>, collection: &'static str) -> Self {
        Self {
            api,
            path: path.into(),
            collection,
            _item: PhantomData,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Splits a list response into items and total. A bare array, or a body
/// without `total`, counts its own items.
pub fn parse_page<T: Resource>(value: Value, collection: &str) -> Result<Page<T>, ClientError> {
    let (items, total) = match value {
        Value::Array(items) => (Value::Array(items), None),
        Value::Object(mut map) => {
            let items = map.remove(collection).unwrap_or(Value::Array(Vec::new()));
            let total = map
                .get("total")
                .or_else(|| map.get("count"))
                .and_then(Value::as_u64);
            (items, total)
        }
        other => {
            return Err(ClientError::Decode(format!(
                "expected list of {}, got {}",
                collection, other
            )))
        }
    };
    let items: Vec<T> = serde_json::from_value(items)
        .map_err(|e| ClientError::Decode(format!("{}: {}", collection, e)))?;
    let total = total.unwrap_or(items.len() as u64);
    Ok(Page { items, total })
}

#[async_trait]
impl<T: Resource> ListSource for RestListSource<T> {
    type Item = T;

    #[instrument(skip(self, query), fields(path = %self.path, page = query.page))]
    async fn fetch(&self, query: &ListQuery) -> Result<Page<T>, ClientError> {
        let value: Value = self.api.get_query(&self.path, &query.to_params()).await?;
        parse_page(value, self.collection)
    }
}
