//! In-memory [`Store`] backed by a `parking_lot::RwLock`-guarded map.
//!
//! Values are cloned on every `get`/`set` so callers never alias the
//! store's internal copy (mirroring the defensive-copy discipline of
//! `ag-ui-server::state::manager::StateManager`, here applied to raw JSON
//! rather than agent state). Notification fans out to one independent
//! `tokio::sync::mpsc::UnboundedSender` per watcher, so a slow subscriber
//! can never cause another subscriber to miss or coalesce a value.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::stream::BoxStream;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::StreamExt;

use super::{Store, StoreValue, WatchStream};
use crate::error::EngineResult;

struct Entry {
    value: StoreValue,
    inserted_at: Instant,
    last_touched: Instant,
}

struct Shared {
    entries: parking_lot::RwLock<HashMap<String, Entry>>,
    watchers: parking_lot::RwLock<HashMap<String, Vec<mpsc::UnboundedSender<Option<StoreValue>>>>>,
    ttl: Option<Duration>,
    max_size: Option<usize>,
}

/// In-memory store with optional TTL and max-size (LRU) eviction.
#[derive(Clone)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}

impl MemoryStore {
    #[must_use]
    pub fn new(ttl: Option<Duration>, max_size: Option<usize>) -> Self {
        Self {
            shared: Arc::new(Shared {
                entries: parking_lot::RwLock::new(HashMap::new()),
                watchers: parking_lot::RwLock::new(HashMap::new()),
                ttl,
                max_size,
            }),
        }
    }

    /// Spawns a background sweep task evicting TTL-expired entries every
    /// `interval`. Must be called from within a tokio runtime (typically
    /// once at server startup).
    pub fn spawn_ttl_sweeper(self: &Arc<Self>, interval: Duration) {
        let Some(ttl) = self.shared.ttl else {
            return;
        };
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let now = Instant::now();
                let expired: Vec<String> = {
                    let entries = shared.entries.read();
                    entries
                        .iter()
                        .filter(|(_, e)| now.duration_since(e.inserted_at) > ttl)
                        .map(|(k, _)| k.clone())
                        .collect()
                };
                for key in expired {
                    shared.entries.write().remove(&key);
                    notify_watchers(&shared, &key, None);
                }
            }
        });
    }

    fn evict_lru_if_over_capacity(&self) {
        let Some(max_size) = self.shared.max_size else {
            return;
        };
        let mut entries = self.shared.entries.write();
        while entries.len() > max_size {
            let oldest_key = entries
                .iter()
                .min_by_key(|(_, e)| e.last_touched)
                .map(|(k, _)| k.clone());
            match oldest_key {
                Some(key) => {
                    entries.remove(&key);
                }
                None => break,
            }
        }
    }
}

fn notify_watchers(shared: &Shared, key: &str, value: Option<StoreValue>) {
    let mut watchers = shared.watchers.write();
    if let Some(senders) = watchers.get_mut(key) {
        senders.retain(|tx| tx.send(value.clone()).is_ok());
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, key: &str) -> EngineResult<Option<StoreValue>> {
        let mut entries = self.shared.entries.write();
        if let Some(entry) = entries.get_mut(key) {
            entry.last_touched = Instant::now();
            return Ok(Some(entry.value.clone()));
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: Option<StoreValue>) -> EngineResult<()> {
        match &value {
            Some(v) => {
                let now = Instant::now();
                self.shared.entries.write().insert(
                    key.to_string(),
                    Entry {
                        value: v.clone(),
                        inserted_at: now,
                        last_touched: now,
                    },
                );
            }
            None => {
                self.shared.entries.write().remove(key);
            }
        }
        notify_watchers(&self.shared, key, value);
        self.evict_lru_if_over_capacity();
        Ok(())
    }

    async fn watch(
        &self,
        key: &str,
        ready: Option<oneshot::Sender<()>>,
    ) -> EngineResult<WatchStream> {
        let (tx, rx) = mpsc::unbounded_channel();
        let current = {
            let mut watchers = self.shared.watchers.write();
            watchers.entry(key.to_string()).or_default().push(tx);
            self.shared.entries.read().get(key).map(|e| e.value.clone())
        };
        if let Some(ready) = ready {
            let _ = ready.send(());
        }
        let initial = futures::stream::once(async move { current });
        let rest = UnboundedReceiverStream::new(rx);
        let stream: BoxStream<'static, Option<StoreValue>> =
            Box::pin(initial.chain(rest));
        Ok(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn get_after_set_observes_the_write() {
        let store = MemoryStore::new(None, None);
        store.set("k", Some(json!("v"))).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(json!("v")));
    }

    #[tokio::test]
    async fn set_none_deletes() {
        let store = MemoryStore::new(None, None);
        store.set("k", Some(json!(1))).await.unwrap();
        store.set("k", None).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn watch_yields_current_then_subsequent_values() {
        let store = MemoryStore::new(None, None);
        store.set("k", Some(json!(1))).await.unwrap();
        let mut stream = store.watch("k", None).await.unwrap();
        assert_eq!(stream.next().await, Some(Some(json!(1))));
        store.set("k", Some(json!(2))).await.unwrap();
        assert_eq!(stream.next().await, Some(Some(json!(2))));
    }

    #[tokio::test]
    async fn two_watchers_each_see_every_value() {
        let store = MemoryStore::new(None, None);
        let mut a = store.watch("k", None).await.unwrap();
        let mut b = store.watch("k", None).await.unwrap();
        assert_eq!(a.next().await, Some(None));
        assert_eq!(b.next().await, Some(None));
        store.set("k", Some(json!("x"))).await.unwrap();
        assert_eq!(a.next().await, Some(Some(json!("x"))));
        assert_eq!(b.next().await, Some(Some(json!("x"))));
    }

    #[tokio::test]
    async fn max_size_evicts_least_recently_touched() {
        let store = MemoryStore::new(None, Some(2));
        store.set("a", Some(json!(1))).await.unwrap();
        store.set("b", Some(json!(1))).await.unwrap();
        store.get("a").await.unwrap();
        store.set("c", Some(json!(1))).await.unwrap();
        // "b" was least recently touched and should have been evicted.
        assert_eq!(store.get("b").await.unwrap(), None);
        assert!(store.get("a").await.unwrap().is_some());
        assert!(store.get("c").await.unwrap().is_some());
    }
}
