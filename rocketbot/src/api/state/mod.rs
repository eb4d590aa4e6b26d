use std::sync::Arc;

use anyhow::Result;
use reqwest::Client as HttpClient;
use tokio::net::TcpListener;

use crate::api::config::{ApiConfig, Credentials, SessionConfig};
use crate::api::endpoint::ApiEndpoint;
use crate::api::session::SessionStore;
use crate::config::AppConfig;
use crate::rocketreach::{RocketReachApiKey, RocketReachClient};

pub struct ApiStateBuilder<MandatoryFields = (HttpClient, SessionStore)> {
    config: AppConfig,
    credentials: Option<Credentials>,
    rocketreach_key: Option<RocketReachApiKey>,
    mandatory_fields: MandatoryFields,
}

impl ApiStateBuilder {
    /// Credentials not provided explicitly are read from the environment.
    pub fn build(self) -> Result<ApiState> {
        let (http_client, sessions) = self.mandatory_fields;
        let config = self.config;

        let credentials = match self.credentials {
            Some(credentials) => credentials,
            None => Credentials::from_env()?,
        };
        let rocketreach_key = match self.rocketreach_key {
            Some(key) => key,
            None => RocketReachApiKey::from_env()?,
        };

        let rocketreach = RocketReachClient::new(
            http_client.clone(),
            config.rocketreach.clone(),
            rocketreach_key,
        );

        Ok(ApiState {
            inner: Arc::new(Inner {
                config,
                credentials,
                http_client,
                sessions,
                rocketreach,
            }),
        })
    }
}

impl<T2> ApiStateBuilder<((), T2)> {
    pub fn with_http_client(self, http_client: HttpClient) -> ApiStateBuilder<(HttpClient, T2)> {
        let (_, sessions) = self.mandatory_fields;

        ApiStateBuilder {
            config: self.config,
            credentials: self.credentials,
            rocketreach_key: self.rocketreach_key,
            mandatory_fields: (http_client, sessions),
        }
    }
}

impl<T1> ApiStateBuilder<(T1, ())> {
    pub fn with_session_store(self, sessions: SessionStore) -> ApiStateBuilder<(T1, SessionStore)> {
        let (http_client, _) = self.mandatory_fields;

        ApiStateBuilder {
            config: self.config,
            credentials: self.credentials,
            rocketreach_key: self.rocketreach_key,
            mandatory_fields: (http_client, sessions),
        }
    }
}

impl<T1, T2> ApiStateBuilder<(T1, T2)> {
    pub fn with_config(self, config: AppConfig) -> ApiStateBuilder<(T1, T2)> {
        ApiStateBuilder { config, ..self }
    }

    pub fn with_credentials(self, credentials: Credentials) -> ApiStateBuilder<(T1, T2)> {
        ApiStateBuilder {
            credentials: Some(credentials),
            ..self
        }
    }

    pub fn with_rocketreach_key(self, key: RocketReachApiKey) -> ApiStateBuilder<(T1, T2)> {
        ApiStateBuilder {
            rocketreach_key: Some(key),
            ..self
        }
    }
}

#[derive(Clone)]
#[repr(transparent)]
pub struct ApiState {
    inner: Arc<Inner>,
}

impl ApiState {
    pub fn builder() -> ApiStateBuilder<((), ())> {
        ApiStateBuilder {
            config: AppConfig::default(),
            credentials: None,
            rocketreach_key: None,
            mandatory_fields: ((), ()),
        }
    }

    pub async fn bind_socket(&self) -> std::io::Result<TcpListener> {
        TcpListener::bind(self.api_config().listen_addr).await
    }

    pub async fn bind_endpoint(&self) -> Result<ApiEndpoint> {
        ApiEndpoint::builder().bind(self.clone()).await
    }

    pub fn api_config(&self) -> &ApiConfig {
        &self.inner.config.api
    }

    pub fn session_config(&self) -> &SessionConfig {
        &self.inner.config.session
    }

    pub fn credentials(&self) -> &Credentials {
        &self.inner.credentials
    }

    pub fn http_client(&self) -> &HttpClient {
        &self.inner.http_client
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.inner.sessions
    }

    pub fn rocketreach(&self) -> &RocketReachClient {
        &self.inner.rocketreach
    }
}

struct Inner {
    config: AppConfig,
    credentials: Credentials,
    http_client: HttpClient,
    sessions: SessionStore,
    rocketreach: RocketReachClient,
}
