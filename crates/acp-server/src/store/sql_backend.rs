//! Postgres-backed [`Store`], feature-gated behind `sql-backend`.
//!
//! Backed by a single `(key TEXT PRIMARY KEY, value JSONB)` table;
//! `watch` drives notification via `LISTEN`/`NOTIFY` on a fixed channel
//! whose payload is the changed key.

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use sqlx::postgres::{PgListener, PgPoolOptions};
use sqlx::{PgPool, Row};
use tokio::sync::{mpsc, oneshot};

use super::{Store, StoreValue, WatchStream};
use crate::error::{EngineError, EngineResult};

const NOTIFY_CHANNEL: &str = "acp_store_changed";

fn store_err(e: sqlx::Error) -> EngineError {
    EngineError::Store(Box::new(e))
}

/// A [`Store`] backed by a Postgres table with `LISTEN`/`NOTIFY`.
#[derive(Clone)]
pub struct SqlStore {
    pool: PgPool,
}

impl SqlStore {
    pub async fn connect(database_url: &str) -> EngineResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(store_err)?;
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS acp_store (key TEXT PRIMARY KEY, value JSONB NOT NULL)",
        )
        .execute(&pool)
        .await
        .map_err(store_err)?;
        Ok(Self { pool })
    }

    async fn notify_changed(&self, key: &str) -> EngineResult<()> {
        sqlx::query("SELECT pg_notify($1, $2)")
            .bind(NOTIFY_CHANNEL)
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(())
    }
}

#[async_trait]
impl Store for SqlStore {
    async fn get(&self, key: &str) -> EngineResult<Option<StoreValue>> {
        let row = sqlx::query("SELECT value FROM acp_store WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(row.map(|r| r.get::<StoreValue, _>("value")))
    }

    async fn set(&self, key: &str, value: Option<StoreValue>) -> EngineResult<()> {
        match value {
            Some(v) => {
                sqlx::query(
                    "INSERT INTO acp_store (key, value) VALUES ($1, $2) \
                     ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value",
                )
                .bind(key)
                .bind(v)
                .execute(&self.pool)
                .await
                .map_err(store_err)?;
            }
            None => {
                sqlx::query("DELETE FROM acp_store WHERE key = $1")
                    .bind(key)
                    .execute(&self.pool)
                    .await
                    .map_err(store_err)?;
            }
        }
        self.notify_changed(key).await?;
        Ok(())
    }

    async fn watch(
        &self,
        key: &str,
        ready: Option<oneshot::Sender<()>>,
    ) -> EngineResult<WatchStream> {
        let mut listener = PgListener::connect_with(&self.pool)
            .await
            .map_err(store_err)?;
        listener.listen(NOTIFY_CHANNEL).await.map_err(store_err)?;

        let initial = self.get(key).await?;
        if let Some(ready) = ready {
            let _ = ready.send(());
        }

        let (tx, rx) = mpsc::unbounded_channel::<Option<StoreValue>>();
        let this = self.clone();
        let watched_key = key.to_string();
        tokio::spawn(async move {
            loop {
                match listener.recv().await {
                    Ok(notification) => {
                        if notification.payload() != watched_key {
                            continue;
                        }
                        match this.get(&watched_key).await {
                            Ok(value) => {
                                if tx.send(value).is_err() {
                                    break;
                                }
                            }
                            Err(_) => break,
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

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    /// Requires a reachable Postgres, pointed to by `ACP_TEST_DATABASE_URL`.
    /// Not run by default.
    #[tokio::test]
    #[ignore = "requires a live Postgres instance"]
    async fn get_after_set_observes_the_write() {
        let url = std::env::var("ACP_TEST_DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/acp".to_string());
        let store = SqlStore::connect(&url).await.unwrap();
        let key = format!("acp-test:{}", uuid::Uuid::new_v4());
        store.set(&key, Some(serde_json::json!("v"))).await.unwrap();
        assert_eq!(store.get(&key).await.unwrap(), Some(serde_json::json!("v")));
    }

    #[tokio::test]
    #[ignore = "requires a live Postgres instance"]
    async fn watch_observes_a_subsequent_write() {
        let url = std::env::var("ACP_TEST_DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/acp".to_string());
        let store = SqlStore::connect(&url).await.unwrap();
        let key = format!("acp-test:{}", uuid::Uuid::new_v4());
        let mut watch = store.watch(&key, None).await.unwrap();
        assert_eq!(watch.next().await, Some(None));
        store.set(&key, Some(serde_json::json!(42))).await.unwrap();
        assert_eq!(watch.next().await, Some(Some(serde_json::json!(42))));
    }
}
