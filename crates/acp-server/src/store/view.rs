//! [`StoreView`]: a typed, key-prefixed layer over a raw [`Store`].

use std::marker::PhantomData;
use std::sync::Arc;

use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::oneshot;

use super::{Store, WatchStream};
use crate::error::{EngineError, EngineResult};

/// Layers a key prefix and a typed value model on top of a raw byte/JSON
/// [`Store`], so the engine can allocate independent namespaces (RunData,
/// cancel tokens, resume values, Sessions) from a single backing store.
pub struct StoreView<T> {
    store: Arc<dyn Store>,
    prefix: &'static str,
    _marker: PhantomData<T>,
}

impl<T> Clone for StoreView<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            prefix: self.prefix,
            _marker: PhantomData,
        }
    }
}

impl<T> StoreView<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    #[must_use]
    pub fn new(store: Arc<dyn Store>, prefix: &'static str) -> Self {
        Self {
            store,
            prefix,
            _marker: PhantomData,
        }
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}:{key}", self.prefix)
    }

    pub async fn get(&self, key: &str) -> EngineResult<Option<T>> {
        let raw = self.store.get(&self.namespaced(key)).await?;
        raw.map(|v| serde_json::from_value(v).map_err(|e| EngineError::Internal(e.to_string())))
            .transpose()
    }

    pub async fn set(&self, key: &str, value: &T) -> EngineResult<()> {
        let raw = serde_json::to_value(value).map_err(|e| EngineError::Internal(e.to_string()))?;
        self.store.set(&self.namespaced(key), Some(raw)).await
    }

    pub async fn delete(&self, key: &str) -> EngineResult<()> {
        self.store.set(&self.namespaced(key), None).await
    }

    /// Subscribes to `key`, decoding every non-deleted value. `ready`
    /// signals once the subscription is live, matching [`Store::watch`].
    pub async fn watch(
        &self,
        key: &str,
        ready: Option<oneshot::Sender<()>>,
    ) -> EngineResult<TypedWatchStream<T>> {
        let raw: WatchStream = self.store.watch(&self.namespaced(key), ready).await?;
        let decoded = raw.filter_map(|value| async move {
            value.and_then(|v| serde_json::from_value(v).ok())
        });
        Ok(Box::pin(decoded))
    }
}

/// A decoded watch stream over `T`; deletions are silently filtered since
/// callers of typed views treat "absent" as "not yet written" rather than
/// a distinct observable state.
pub type TypedWatchStream<T> = std::pin::Pin<Box<dyn futures::Stream<Item = T> + Send>>;
