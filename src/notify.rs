use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: u64,
    pub level: Level,
    pub key: String,
    pub message: String,
}

#[derive(Default)]
struct Inner {
    active: Vec<Notification>,
    last_shown: HashMap<String, Instant>,
    next_id: u64,
}

/// Toast queue. Notifications sharing a key within `window` are coalesced.
#[derive(Clone)]
pub struct Notifier {
    inner: Arc<Mutex<Inner>>,
    window: Duration,
}

impl Notifier {
    pub fn new(window: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            window,
        }
    }

    pub fn info(&self, key: &str, message: impl Into<String>) -> Option<u64> {
        self.push(Level::Info, key, message.into())
    }

    pub fn success(&self, key: &str, message: impl Into<String>) -> Option<u64> {
        self.push(Level::Success, key, message.into())
    }

    pub fn error(&self, key: &str, message: impl Into<String>) -> Option<u64> {
        self.push(Level::Error, key, message.into())
    }

    /// Returns `None` when the notification was coalesced.
    fn push(&self, level: Level, key: &str, message: String) -> Option<u64> {
        let now = Instant::now();
        let mut inner = self.inner.lock().ok()?;
        let window = self.window;
        inner
            .last_shown
            .retain(|_, at| now.duration_since(*at) < window);
        if let Some(at) = inner.last_shown.get(key) {
            if now.duration_since(*at) < self.window {
                debug!(key, "notification coalesced");
                return None;
            }
        }
        inner.last_shown.insert(key.to_string(), now);
        inner.next_id += 1;
        let id = inner.next_id;
        inner.active.retain(|n| n.key != key);
        inner.active.push(Notification {
            id,
            level,
            key: key.to_string(),
            message,
        });
        Some(id)
    }

    pub fn dismiss(&self, id: u64) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.active.retain(|n| n.id != id);
        }
    }

    pub fn active(&self) -> Vec<Notification> {
        self.inner
            .lock()
            .map(|inner| inner.active.clone())
            .unwrap_or_default()
    }

    pub fn errors(&self) -> Vec<Notification> {
        self.active()
            .into_iter()
            .filter(|n| n.level == Level::Error)
            .collect()
    }
}
