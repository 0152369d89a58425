use std::collections::HashSet;
use std::fmt::Debug;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::{info, warn};

use super::list::{ListController, ListSource};
use super::Resource;
use crate::error::ClientError;
use crate::notify::Notifier;

/// A named state transition (approve, reject, block, ...).
pub trait Action: Debug + Send + Sync {
    fn name(&self) -> &'static str;

    fn success_message(&self) -> String {
        format!("{} succeeded", self.name())
    }
}

/// Performs a server-side transition and returns the updated entity.
#[async_trait]
pub trait MutationSource: Send + Sync {
    type Item: Resource;
    type Action: Action;

    async fn perform(&self, id: &str, action: &Self::Action) -> Result<Self::Item, ClientError>;
}

type InFlight = Arc<Mutex<HashSet<(String, &'static str)>>>;

/// Releases the in-flight slot even if the caller drops the future.
struct Slot {
    set: InFlight,
    key: (String, &'static str),
}

impl Drop for Slot {
    fn drop(&mut self) {
        if let Ok(mut set) = self.set.lock() {
            set.remove(&self.key);
        }
    }
}

/// Runs one action on one loaded item and patches the list from the
/// server's answer. Only the affected item is marked busy.
pub struct MutationController<M: MutationSource> {
    source: M,
    notifier: Notifier,
    in_flight: InFlight,
}

impl<M: MutationSource> MutationController<M> {
    pub fn new(source: M, notifier: Notifier) -> Self {
        Self {
            source,
            notifier,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn source(&self) -> &M {
        &self.source
    }

    /// True while any action on `id` is pending; drives per-item disabling.
    pub fn is_busy(&self, id: &str) -> bool {
        self.in_flight
            .lock()
            .map(|set| set.iter().any(|(busy, _)| busy == id))
            .unwrap_or(false)
    }

    fn claim(&self, id: &str, action: &M::Action) -> Option<Slot> {
        let key = (id.to_string(), action.name());
        let mut set = self.in_flight.lock().ok()?;
        if !set.insert(key.clone()) {
            return None;
        }
        Some(Slot {
            set: Arc::clone(&self.in_flight),
            key,
        })
    }

    /// On success the list item is replaced (or removed if filtered out);
    /// on failure the list is untouched and the server message is shown.
    pub async fn run<L>(
        &self,
        list: &ListController<L>,
        id: &str,
        action: M::Action,
    ) -> Result<M::Item, ClientError>
    where
        L: ListSource<Item = M::Item>,
    {
        let item = self.perform(id, action).await?;
        list.apply_patch(item.clone());
        Ok(item)
    }

    /// Same as [`run`](Self::run) for detail views without a list.
    pub async fn perform(&self, id: &str, action: M::Action) -> Result<M::Item, ClientError> {
        let Some(_slot) = self.claim(id, &action) else {
            return Err(ClientError::Busy);
        };

        match self.source.perform(id, &action).await {
            Ok(item) => {
                info!(id, action = action.name(), "mutation applied");
                self.notifier
                    .success(&format!("{}:{}", action.name(), id), action.success_message());
                Ok(item)
            }
            Err(err) => {
                warn!(id, action = action.name(), error = %err, "mutation failed");
                self.notifier.error(
                    &format!("{}:{}:{}", action.name(), id, err.dedup_key()),
                    err.user_message(),
                );
                Err(err)
            }
        }
    }
}
