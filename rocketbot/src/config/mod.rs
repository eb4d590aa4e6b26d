use serde::{Deserialize, Serialize};

use crate::api::config::{ApiConfig, SessionConfig};
use crate::rocketreach::RocketReachConfig;
use crate::utils::logger::LoggerConfig;

#[derive(Default, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,

    pub session: SessionConfig,

    pub rocketreach: RocketReachConfig,

    pub logger: LoggerConfig,
}
