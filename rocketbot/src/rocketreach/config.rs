use std::time::Duration;

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::api::config::ConfigurationError;

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RocketReachConfig {
    /// Base URL of the RocketReach API.
    ///
    /// Default: `https://api.rocketreach.co/v1/api`
    pub base_url: String,

    /// Timeout of a single lookup attempt.
    ///
    /// Default: `10s`
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Extra attempts made after a connection error or timeout.
    ///
    /// Default: `1`
    pub retries: u8,
}

impl Default for RocketReachConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.rocketreach.co/v1/api".to_owned(),
            timeout: Duration::from_secs(10),
            retries: 1,
        }
    }
}

#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct RocketReachApiKey(String);

impl RocketReachApiKey {
    pub const ENV: &'static str = "ROCKETREACH_API_KEY";

    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn from_env() -> Result<Self, ConfigurationError> {
        std::env::var(Self::ENV)
            .ok()
            .filter(|key| !key.is_empty())
            .map(Self::new)
            .ok_or(ConfigurationError(Self::ENV))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}
