use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// TCP socket address to listen for incoming connections.
    ///
    /// Default: `0.0.0.0:8000`
    pub listen_addr: SocketAddr,

    /// Whether `X-Forwarded-Proto` and `X-Forwarded-Host` set by a reverse
    /// proxy are used to build the OAuth redirect URI.
    ///
    /// Leave off unless a proxy in front of the app overwrites these headers,
    /// otherwise any client can choose the redirect URI.
    ///
    /// Default: `false`
    pub trust_forwarded_proto: bool,

    pub slack: SlackConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen_addr: (Ipv4Addr::UNSPECIFIED, 8000).into(),
            trust_forwarded_proto: false,
            slack: SlackConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlackConfig {
    /// Page the user is redirected to in order to approve the app.
    pub authorize_url: String,

    /// Base URL of the Slack Web API (`oauth.access` lives under it).
    pub api_url: String,

    /// Timeout for the code exchange request.
    ///
    /// Default: `10s`
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            authorize_url: "https://slack.com/oauth/authorize".to_owned(),
            api_url: "https://slack.com/api".to_owned(),
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionBackend {
    /// Sessions live in the process memory. Fine for a single instance.
    #[default]
    Memory,
    /// Sessions are stored in Redis at `REDIS_URL`.
    Redis,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub backend: SessionBackend,

    /// Name of the cookie carrying the session id.
    pub cookie_name: String,

    /// How long a pending OAuth state stays valid.
    ///
    /// Default: `1h`
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            backend: SessionBackend::Memory,
            cookie_name: "sessionid".to_owned(),
            ttl: Duration::from_secs(3600),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("required setting `{0}` is not set")]
pub struct ConfigurationError(pub &'static str);

/// Slack app credentials. Loaded exclusively from environment variables.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub verification_token: String,
    /// Comma separated list of requested OAuth scopes.
    pub scopes: String,
}

impl Credentials {
    pub const CLIENT_ID: &'static str = "SLACK_CLIENT_ID";
    pub const CLIENT_SECRET: &'static str = "SLACK_CLIENT_SECRET";
    pub const VERIFICATION_TOKEN: &'static str = "SLACK_VERIFICATION_TOKEN";
    pub const SCOPES: &'static str = "SLACK_SCOPES";

    pub fn from_env() -> Result<Self, ConfigurationError> {
        Self::resolve(|key| std::env::var(key).ok())
    }

    /// Reads every credential through `lookup`. Empty values count as missing.
    pub fn resolve<F>(lookup: F) -> Result<Self, ConfigurationError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|value| !value.is_empty())
                .ok_or(ConfigurationError(key))
        };

        Ok(Self {
            client_id: required(Self::CLIENT_ID)?,
            client_secret: required(Self::CLIENT_SECRET)?,
            verification_token: required(Self::VERIFICATION_TOKEN)?,
            scopes: required(Self::SCOPES)?,
        })
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("scopes", &self.scopes)
            .finish_non_exhaustive()
    }
}
