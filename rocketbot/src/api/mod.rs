use anyhow::Context;

use crate::api::config::{Credentials, SessionBackend};
use crate::api::session::SessionStore;
use crate::api::state::ApiState;
use crate::config::AppConfig;
use crate::redis::RedisClient;
use crate::rocketreach::RocketReachApiKey;

pub mod config;
pub mod controllers;
pub mod endpoint;
pub mod models;
pub mod session;
pub mod state;
pub mod views;

#[cfg(test)]
mod test_utils;

pub async fn http_service(config: AppConfig) -> anyhow::Result<()> {
    let credentials = Credentials::from_env().context("Slack app credentials")?;
    let rocketreach_key = RocketReachApiKey::from_env().context("RocketReach API key")?;

    let sessions = match config.session.backend {
        SessionBackend::Memory => {
            tracing::info!("using in-memory session store");
            SessionStore::memory(config.session.ttl)
        }
        SessionBackend::Redis => {
            let redis_url = std::env::var("REDIS_URL").context("REDIS_URL not set")?;
            tracing::info!("connecting to Redis...");
            let client = RedisClient::new(&redis_url)
                .await
                .context("failed to connect to Redis")?;
            tracing::info!("Redis connected");
            SessionStore::redis(client, config.session.ttl)
        }
    };

    let http_client = reqwest::Client::builder()
        .user_agent(concat!("rocketbot/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("failed to build HTTP client")?;

    tracing::info!(listen_addr = %config.api.listen_addr, "API server starting...");

    let state = ApiState::builder()
        .with_config(config)
        .with_http_client(http_client)
        .with_session_store(sessions)
        .with_credentials(credentials)
        .with_rocketreach_key(rocketreach_key)
        .build()?;

    let endpoint = state.bind_endpoint().await?;
    endpoint.serve().await.context("API server failed")?;

    tracing::info!("API server stopped");
    Ok(())
}
