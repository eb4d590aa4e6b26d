use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

pub use self::config::{RocketReachApiKey, RocketReachConfig};

mod config;

/// Profile record returned by `lookupProfile`. Fields we don't render are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub name: Option<String>,
    /// Social network name to profile URL. Values that aren't strings are skipped.
    #[serde(default)]
    pub links: Option<HashMap<String, Value>>,
    #[serde(default)]
    pub profile_pic: Option<String>,
    #[serde(default)]
    pub current_work_email: Option<String>,
}

impl Profile {
    pub fn link(&self, network: &str) -> Option<&str> {
        self.links
            .as_ref()?
            .get(network)?
            .as_str()
            .filter(|url| !url.is_empty())
    }
}

#[derive(Debug)]
pub enum ProfileLookup {
    Found(Box<Profile>),
    /// Empty result or an error object. `reason` carries the upstream message if any.
    NotFound { reason: Option<String> },
}

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("profile lookup request failed")]
    Request(#[from] reqwest::Error),
    #[error("RocketReach responded with {0}")]
    Upstream(reqwest::StatusCode),
    #[error("unexpected profile lookup response")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Clone)]
pub struct RocketReachClient {
    http_client: reqwest::Client,
    config: RocketReachConfig,
    api_key: RocketReachApiKey,
}

impl RocketReachClient {
    pub fn new(
        http_client: reqwest::Client,
        config: RocketReachConfig,
        api_key: RocketReachApiKey,
    ) -> Self {
        Self {
            http_client,
            config,
            api_key,
        }
    }

    /// Looks up a person by their LinkedIn profile URL.
    pub async fn lookup_profile(&self, li_url: &str) -> Result<ProfileLookup, LookupError> {
        let body = self.get("lookupProfile", &[("li_url", li_url)]).await?;
        parse_lookup(body)
    }

    async fn get(&self, method: &str, query: &[(&str, &str)]) -> Result<Value, LookupError> {
        let url = format!("{}/{method}", self.config.base_url.trim_end_matches('/'));

        let mut attempt = 0;
        let response = loop {
            let res = self
                .http_client
                .get(&url)
                .query(&[("api_key", self.api_key.expose())])
                .query(query)
                .timeout(self.config.timeout)
                .send()
                .await
                // The URL carries the API key.
                .map_err(reqwest::Error::without_url);

            match res {
                Ok(response) => break response,
                Err(e) if attempt < self.config.retries && (e.is_timeout() || e.is_connect()) => {
                    attempt += 1;
                    tracing::warn!(method, attempt, "RocketReach request failed, retrying: {e}");
                }
                Err(e) => return Err(e.into()),
            }
        };

        let status = response.status();
        tracing::debug!(method, %status, "RocketReach responded");
        if status.is_server_error() {
            return Err(LookupError::Upstream(status));
        }

        let body = response.bytes().await.map_err(reqwest::Error::without_url)?;

        serde_json::from_slice(&body).map_err(Into::into)
    }
}

fn parse_lookup(body: Value) -> Result<ProfileLookup, LookupError> {
    match body {
        Value::Array(records) => match records.into_iter().next() {
            Some(first) => Ok(ProfileLookup::Found(Box::new(serde_json::from_value(first)?))),
            None => Ok(ProfileLookup::NotFound { reason: None }),
        },
        other => Ok(ProfileLookup::NotFound {
            reason: error_message(&other),
        }),
    }
}

fn error_message(body: &Value) -> Option<String> {
    ["detail", "error", "message"]
        .iter()
        .find_map(|key| body.get(key))
        .map(|value| match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
}
