//! Redis-backed [`Store`], feature-gated behind `redis-backend`.
//!
//! Values are JSON-serialized strings; `watch` subscribes to Redis
//! keyspace notifications on the watched key (`PSUBSCRIBE
//! __keyspace@<db>__:<key>`), which requires the server have
//! `notify-keyspace-events` configured with at least `KEA`.

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use redis::AsyncCommands;
use tokio::sync::{mpsc, oneshot};

use super::{Store, StoreValue, WatchStream};
use crate::error::{EngineError, EngineResult};

fn store_err(e: redis::RedisError) -> EngineError {
    EngineError::Store(Box::new(e))
}

/// A [`Store`] backed by Redis (or a Redis-compatible service).
#[derive(Clone)]
pub struct RedisStore {
    client: redis::Client,
    db_index: u8,
}

impl RedisStore {
    pub fn new(redis_url: &str, db_index: u8) -> EngineResult<Self> {
        let client = redis::Client::open(redis_url).map_err(store_err)?;
        Ok(Self { client, db_index })
    }

    fn keyspace_channel(&self, key: &str) -> String {
        format!("__keyspace@{}__:{key}", self.db_index)
    }
}

#[async_trait]
impl Store for RedisStore {
    async fn get(&self, key: &str) -> EngineResult<Option<StoreValue>> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(store_err)?;
        let raw: Option<String> = conn.get(key).await.map_err(store_err)?;
        raw.map(|s| serde_json::from_str(&s).map_err(|e| EngineError::Internal(e.to_string())))
            .transpose()
    }

    async fn set(&self, key: &str, value: Option<StoreValue>) -> EngineResult<()> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(store_err)?;
        match value {
            Some(v) => {
                let raw =
                    serde_json::to_string(&v).map_err(|e| EngineError::Internal(e.to_string()))?;
                let _: () = conn.set(key, raw).await.map_err(store_err)?;
            }
            None => {
                let _: () = conn.del(key).await.map_err(store_err)?;
            }
        }
        Ok(())
    }

    async fn watch(
        &self,
        key: &str,
        ready: Option<oneshot::Sender<()>>,
    ) -> EngineResult<WatchStream> {
        let pubsub_conn = self.client.get_async_pubsub().await.map_err(store_err)?;
        let mut pubsub = pubsub_conn;
        let channel = self.keyspace_channel(key);
        pubsub.psubscribe(&channel).await.map_err(store_err)?;

        let initial = self.get(key).await?;
        if let Some(ready) = ready {
            let _ = ready.send(());
        }

        let (tx, rx) = mpsc::unbounded_channel::<Option<StoreValue>>();
        let this = self.clone();
        let key = key.to_string();
        tokio::spawn(async move {
            let mut messages = pubsub.into_on_message();
            while let Some(_msg) = messages.next().await {
                // The notification payload only tells us the key changed;
                // re-read authoritative state per the store's "watch does
                // not drop values, re-fetch on notify" contract.
                match this.get(&key).await {
                    Ok(value) => {
                        if tx.send(value).is_err() {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }
        });

        let initial_stream = stream::once(async move { initial });
        let rest = tokio_stream::wrappers::UnboundedReceiverStream::new(rx);
        let combined: BoxStream<'static, Option<StoreValue>> =
            Box::pin(initial_stream.chain(rest));
        Ok(combined)
    }
}
