//! Shared fixtures: an in-process mock backend and in-memory fakes.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use serde::{Deserialize, Serialize};

use crate::auth::User;
use crate::config::AppConfig;
use crate::controllers::{ListQuery, ListSource, Page, Resource};
use crate::error::ClientError;
use crate::settings::Settings;
use crate::state::AppContext;
use crate::uploads::{PendingUpload, UploadClient};

/// Serves `router` on an ephemeral port and returns its base URL.
pub(crate) async fn spawn_backend(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock backend");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });
    format!("http://{}", addr)
}

pub(crate) fn context(base: &str) -> AppContext {
    context_with_settings(base, Settings::in_memory())
}

pub(crate) fn context_with_settings(base: &str, settings: Settings) -> AppContext {
    let config = AppConfig {
        api_base_url: base.to_string(),
        request_timeout: Duration::from_secs(5),
        ..AppConfig::default()
    };
    AppContext::from_parts(config, settings).expect("test context")
}

pub(crate) fn user(id: &str, email: &str) -> User {
    serde_json::from_value(serde_json::json!({
        "id": id,
        "firstName": "Test",
        "lastName": "User",
        "email": email,
        "role": "user"
    }))
    .expect("user fixture")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Item {
    pub id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub label: String,
}

impl Item {
    pub fn new(id: &str, status: &str) -> Self {
        Self {
            id: id.to_string(),
            status: status.to_string(),
            label: String::new(),
        }
    }
}

impl Resource for Item {
    fn id(&self) -> &str {
        &self.id
    }

    fn status(&self) -> Option<&str> {
        Some(&self.status)
    }
}

#[derive(Clone, Default)]
pub(crate) struct CallLog(Arc<Mutex<Vec<ListQuery>>>);

impl CallLog {
    pub fn len(&self) -> usize {
        self.0.lock().map(|c| c.len()).unwrap_or(0)
    }

    pub fn all(&self) -> Vec<ListQuery> {
        self.0.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

type Respond = dyn Fn(&ListQuery) -> (Duration, Result<Page<Item>, ClientError>) + Send + Sync;

/// Scripted list source: `respond` picks a latency and result per query.
pub(crate) struct FakeSource {
    respond: Box<Respond>,
    calls: CallLog,
}

impl FakeSource {
    pub fn new<F>(respond: F) -> Self
    where
        F: Fn(&ListQuery) -> (Duration, Result<Page<Item>, ClientError>) + Send + Sync + 'static,
    {
        Self {
            respond: Box::new(respond),
            calls: CallLog::default(),
        }
    }

    pub fn calls(&self) -> CallLog {
        self.calls.clone()
    }
}

#[async_trait]
impl ListSource for FakeSource {
    type Item = Item;

    async fn fetch(&self, query: &ListQuery) -> Result<Page<Item>, ClientError> {
        if let Ok(mut calls) = self.calls.0.lock() {
            calls.push(query.clone());
        }
        let (delay, result) = (self.respond)(query);
        tokio::time::sleep(delay).await;
        result
    }
}

/// Upload client that hands out predictable URLs, or fails on demand.
#[derive(Default)]
pub(crate) struct FakeUploads {
    pub fail: bool,
    calls: AtomicUsize,
}

impl FakeUploads {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UploadClient for FakeUploads {
    async fn upload_image(&self, file: &PendingUpload) -> Result<String, ClientError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail {
            return Err(ClientError::Upload("storage unavailable".into()));
        }
        Ok(format!("https://cdn.test/{}-{}", n, file.file_name()))
    }
}
