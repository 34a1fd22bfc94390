//! Process configuration, read from the environment with sensible
//! defaults; the core has no required CLI.

use std::time::Duration;

/// Which [`crate::store::Store`] backend to construct.
#[derive(Debug, Clone)]
pub enum StoreBackend {
    Memory {
        ttl: Option<Duration>,
        max_size: Option<usize>,
    },
    Redis {
        url: String,
        db_index: u8,
    },
    Sql {
        database_url: String,
    },
}

/// Server-wide configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: String,
    pub store_backend: StoreBackend,
    pub platform_url: Option<String>,
    pub production_mode: bool,
    pub self_registration_disabled: bool,
}

impl Config {
    /// Builds configuration from environment variables:
    ///
    /// - `ACP_BIND_ADDRESS` (default `0.0.0.0:8000`)
    /// - `ACP_STORE_BACKEND` ∈ `memory` (default) | `redis` | `sql`
    /// - `ACP_STORE_TTL_SECONDS` (in-memory only, default unset = no TTL)
    /// - `ACP_STORE_MAX_SIZE` (in-memory only, default unset = unbounded)
    /// - `ACP_REDIS_URL`, `ACP_REDIS_DB_INDEX` (redis backend)
    /// - `ACP_DATABASE_URL` (sql backend)
    /// - `PLATFORM_URL`, `PRODUCTION_MODE`, `ACP_DISABLE_SELF_REGISTRATION`
    #[must_use]
    pub fn from_env() -> Self {
        let bind_address =
            std::env::var("ACP_BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8000".to_string());

        let store_backend = match std::env::var("ACP_STORE_BACKEND").as_deref() {
            Ok("redis") => StoreBackend::Redis {
                url: std::env::var("ACP_REDIS_URL")
                    .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
                db_index: std::env::var("ACP_REDIS_DB_INDEX")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(0),
            },
            Ok("sql") => StoreBackend::Sql {
                database_url: std::env::var("ACP_DATABASE_URL").unwrap_or_else(|_| {
                    "postgres://localhost/acp".to_string()
                }),
            },
            _ => StoreBackend::Memory {
                ttl: std::env::var("ACP_STORE_TTL_SECONDS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .map(Duration::from_secs),
                max_size: std::env::var("ACP_STORE_MAX_SIZE")
                    .ok()
                    .and_then(|v| v.parse().ok()),
            },
        };

        let platform_url = std::env::var("PLATFORM_URL").ok();
        let production_mode = std::env::var("PRODUCTION_MODE")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);
        let self_registration_disabled = std::env::var("ACP_DISABLE_SELF_REGISTRATION")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        Self {
            bind_address,
            store_backend,
            platform_url,
            production_mode,
            self_registration_disabled,
        }
    }

    /// Whether the self-registration handshake should run: requires a
    /// platform URL and must not be explicitly disabled.
    #[must_use]
    pub fn should_self_register(&self) -> bool {
        self.platform_url.is_some() && !self.self_registration_disabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_registration_requires_url_and_not_disabled() {
        let mut config = Config {
            bind_address: "x".into(),
            store_backend: StoreBackend::Memory {
                ttl: None,
                max_size: None,
            },
            platform_url: None,
            production_mode: false,
            self_registration_disabled: false,
        };
        assert!(!config.should_self_register());

        config.platform_url = Some("https://platform.example".into());
        assert!(config.should_self_register());

        config.self_registration_disabled = true;
        assert!(!config.should_self_register());
    }
}
