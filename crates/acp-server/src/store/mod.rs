//! The pluggable [`Store`] abstraction: a keyed value container whose
//! `watch` primitive is the run engine's only shared mutable state.

mod memory;
#[cfg(feature = "redis-backend")]
mod redis_backend;
#[cfg(feature = "sql-backend")]
mod sql_backend;
mod view;

pub use memory::MemoryStore;
#[cfg(feature = "redis-backend")]
pub use redis_backend::RedisStore;
#[cfg(feature = "sql-backend")]
pub use sql_backend::SqlStore;
pub use view::{StoreView, TypedWatchStream};

use async_trait::async_trait;
use futures::stream::BoxStream;
use tokio::sync::oneshot;

use crate::error::EngineResult;

/// A value as stored: raw JSON, so every backend can serialize/deserialize
/// the same way regardless of what it's keyed under.
pub type StoreValue = serde_json::Value;

/// A stream of values yielded by [`Store::watch`]; `None` means the key was
/// deleted.
pub type WatchStream = BoxStream<'static, Option<StoreValue>>;

/// Key→value persistence with a `watch` primitive that yields every
/// subsequent value for a key until the caller drops the returned stream.
///
/// Every operation is asynchronous; implementations must guarantee:
/// - `set` is atomic per key.
/// - `get` after `set` on the same connection observes the write.
/// - `watch` never drops or silently coalesces values away entirely; if a
///   backend can only deliver the latest value per notification, it must
///   still deliver the terminal value.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Reads the current value for `key`, or `None` if absent.
    async fn get(&self, key: &str) -> EngineResult<Option<StoreValue>>;

    /// Writes `value` for `key`; `None` deletes the key.
    async fn set(&self, key: &str, value: Option<StoreValue>) -> EngineResult<()>;

    /// Subscribes to `key`, yielding its current value followed by every
    /// subsequent value. `ready`, if given, is signalled once the
    /// subscription is active so a producer can safely begin writing
    /// without a race between "subscribe" and "first write".
    async fn watch(&self, key: &str, ready: Option<oneshot::Sender<()>>)
        -> EngineResult<WatchStream>;
}
