use crate::api::config::Credentials;
use crate::api::session::SessionStore;
use crate::api::state::ApiState;
use crate::config::AppConfig;
use crate::rocketreach::RocketReachApiKey;

pub const CLIENT_ID: &str = "123.456";
pub const CLIENT_SECRET: &str = "s3cr3t";
pub const VERIFICATION_TOKEN: &str = "verify-me";
pub const SCOPES: &str = "commands,bot";
pub const ROCKETREACH_KEY: &str = "rr-key";

pub fn credentials() -> Credentials {
    Credentials {
        client_id: CLIENT_ID.to_owned(),
        client_secret: CLIENT_SECRET.to_owned(),
        verification_token: VERIFICATION_TOKEN.to_owned(),
        scopes: SCOPES.to_owned(),
    }
}

/// Config talking to the given Slack and RocketReach base URLs, as deployed
/// behind a proxy that sets the forwarded headers.
pub fn config(slack_api_url: &str, rocketreach_url: &str) -> AppConfig {
    let mut config = AppConfig::default();
    config.api.trust_forwarded_proto = true;
    config.api.slack.api_url = slack_api_url.to_owned();
    config.rocketreach.base_url = rocketreach_url.to_owned();
    config.rocketreach.retries = 0;
    config
}

/// State with in-memory sessions built from [`config`].
pub fn api_state(slack_api_url: &str, rocketreach_url: &str) -> ApiState {
    api_state_from(config(slack_api_url, rocketreach_url))
}

pub fn api_state_from(config: AppConfig) -> ApiState {
    let sessions = SessionStore::memory(config.session.ttl);

    ApiState::builder()
        .with_config(config)
        .with_http_client(reqwest::Client::new())
        .with_session_store(sessions)
        .with_credentials(credentials())
        .with_rocketreach_key(RocketReachApiKey::new(ROCKETREACH_KEY))
        .build()
        .unwrap()
}
