//! The optional self-registration handshake: best-effort, fire-and-forget,
//! since the platform is an external collaborator whose own availability
//! is out of scope here.

use crate::config::Config;

#[derive(serde::Serialize)]
struct RegisterPayload<'a> {
    address: &'a str,
}

/// Spawns a background task POSTing `listening_address` to
/// `config.platform_url`, if self-registration is enabled. Logs and
/// continues on failure; never blocks server startup.
pub fn spawn_if_enabled(config: &Config, listening_address: String) {
    if !config.should_self_register() {
        tracing::debug!("self-registration disabled, skipping");
        return;
    }
    let Some(platform_url) = config.platform_url.clone() else {
        return;
    };
    tokio::spawn(async move {
        let client = reqwest::Client::new();
        let payload = RegisterPayload {
            address: &listening_address,
        };
        match client.post(&platform_url).json(&payload).send().await {
            Ok(resp) if resp.status().is_success() => {
                tracing::info!(%platform_url, "registered with platform");
            }
            Ok(resp) => {
                tracing::warn!(%platform_url, status = %resp.status(), "platform rejected registration");
            }
            Err(e) => {
                tracing::warn!(%platform_url, error = %e, "self-registration request failed");
            }
        }
    });
}
