use axum::extract::{FromRef, FromRequestParts, Query, State};
use axum::http::request::Parts;
use axum::http::uri::Scheme;
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum_extra::extract::CookieJar;
use serde_json::Value;
use subtle::ConstantTimeEq;
use url::Url;

use crate::api::endpoint::OAUTH_CALLBACK_PATH;
use crate::api::models::auth::{OAuthAccessRequest, OAuthCallbackQuery};
use crate::api::session::{OAUTH_STATE_KEY, SessionId};
use crate::api::state::ApiState;
use crate::api::views;

/// Shown for every failed installation, whatever the cause.
pub const INSTALL_ERROR: &str = "Error while installing rocket app in your workspace.";

/// Bytes of entropy in a generated OAuth state.
const OAUTH_STATE_LEN: usize = 16;

// ── Request origin extractor ──────────────────────────────────────────────────

/// Scheme and host the client used to reach us.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOrigin {
    pub secure: bool,
    pub host: String,
}

impl RequestOrigin {
    /// `None` if the request carries no host at all.
    pub fn from_parts(parts: &Parts, trust_forwarded: bool) -> Option<Self> {
        let forwarded = |name: &str| {
            if !trust_forwarded {
                return None;
            }
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                // Proxy chains append values, the first one is the client facing hop.
                .and_then(|v| v.split(',').next())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        let secure = match forwarded("x-forwarded-proto") {
            Some(proto) => proto.eq_ignore_ascii_case("https"),
            None => parts.uri.scheme() == Some(&Scheme::HTTPS),
        };

        let host = forwarded("x-forwarded-host")
            .or_else(|| {
                parts
                    .headers
                    .get(header::HOST)
                    .and_then(|v| v.to_str().ok())
            })
            .or_else(|| parts.uri.authority().map(|a| a.as_str()))
            .filter(|host| !host.is_empty())?;

        Some(Self {
            secure,
            host: host.to_owned(),
        })
    }

    /// Callback URL registered with Slack. Must be identical for the
    /// authorization link and the code exchange.
    pub fn redirect_uri(&self) -> String {
        let scheme = if self.secure { "https" } else { "http" };
        format!("{scheme}://{}{OAUTH_CALLBACK_PATH}", self.host)
    }
}

impl<S> FromRequestParts<S> for RequestOrigin
where
    ApiState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let api_state = ApiState::from_ref(state);
        Self::from_parts(parts, api_state.api_config().trust_forwarded_proto)
            .ok_or_else(|| (StatusCode::BAD_REQUEST, "Missing Host header").into_response())
    }
}

// ── Handlers ──────────────────────────────────────────────────────────────────

pub async fn index(
    State(state): State<ApiState>,
    origin: RequestOrigin,
    jar: CookieJar,
) -> Response {
    index_impl(state, origin, jar).await.unwrap_or_else(|e| {
        tracing::error!("failed to render index page: {e:#}");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
    })
}

pub async fn callback(
    State(state): State<ApiState>,
    origin: RequestOrigin,
    jar: CookieJar,
    Query(params): Query<OAuthCallbackQuery>,
) -> Response {
    let session = SessionId::from_jar(&jar, &state.session_config().cookie_name);

    let page = match handle_callback(&state, &origin, session.as_ref(), params).await {
        Ok(payload) => {
            let team = payload.get("team_name").and_then(|v| v.as_str());
            let team_id = payload.get("team_id").and_then(|v| v.as_str());
            tracing::info!(
                team_id,
                team,
                "rocket app installed"
            );
            views::auth_result_page(Ok(team))
        }
        Err(e) => {
            e.log();
            views::auth_result_page(Err(INSTALL_ERROR))
        }
    };

    Html(page).into_response()
}

// ── Impl ──────────────────────────────────────────────────────────────────────

async fn index_impl(
    state: ApiState,
    origin: RequestOrigin,
    jar: CookieJar,
) -> anyhow::Result<Response> {
    let (jar, session) =
        SessionId::get_or_create(jar, &state.session_config().cookie_name, origin.secure);
    let authorization_url = build_authorization_url(&state, &session, &origin).await?;

    Ok((jar, Html(views::index_page(authorization_url.as_str()))).into_response())
}

/// Issues a fresh OAuth state for `session`, replacing any pending one, and
/// returns the Slack authorization URL embedding it.
pub async fn build_authorization_url(
    state: &ApiState,
    session: &SessionId,
    origin: &RequestOrigin,
) -> anyhow::Result<Url> {
    let oauth_state = generate_oauth_state();
    state
        .sessions()
        .put(session, OAUTH_STATE_KEY, &oauth_state)
        .await?;

    let credentials = state.credentials();
    let mut url = Url::parse(&state.api_config().slack.authorize_url)?;
    url.query_pairs_mut()
        .append_pair("client_id", &credentials.client_id)
        .append_pair("scope", &credentials.scopes)
        .append_pair("redirect_uri", &origin.redirect_uri())
        .append_pair("state", &oauth_state);

    tracing::debug!(host = %origin.host, "issued authorization link");
    Ok(url)
}

#[derive(Debug, thiserror::Error)]
pub enum CallbackError {
    #[error("authorization denied: {0}")]
    Denied(String),
    #[error("no state in callback")]
    MissingState,
    #[error("state does not match the pending one")]
    StateMismatch,
    #[error("no code in callback")]
    MissingCode,
    #[error("failed to read session")]
    Session(#[source] anyhow::Error),
    #[error("code exchange failed")]
    Exchange(#[from] reqwest::Error),
    #[error("code exchange rejected: {0}")]
    Rejected(String),
}

impl CallbackError {
    fn log(&self) {
        match self {
            Self::Denied(_) => tracing::info!("OAuth callback: {self}"),
            Self::MissingState | Self::StateMismatch | Self::MissingCode | Self::Rejected(_) => {
                tracing::warn!("OAuth callback rejected: {self}")
            }
            Self::Session(e) => tracing::error!("OAuth callback: {self}: {e:#}"),
            Self::Exchange(e) => tracing::error!("OAuth callback: {self}: {e}"),
        }
    }
}

/// Verifies the callback against the session and exchanges the code.
///
/// The pending state is consumed whatever the outcome, so a state can be
/// presented at most once.
pub async fn handle_callback(
    state: &ApiState,
    origin: &RequestOrigin,
    session: Option<&SessionId>,
    query: OAuthCallbackQuery,
) -> Result<Value, CallbackError> {
    let pending = match session {
        Some(session) => state
            .sessions()
            .take(session, OAUTH_STATE_KEY)
            .await
            .map_err(CallbackError::Session)?,
        None => None,
    };

    if let Some(error) = query.error.filter(|e| !e.is_empty()) {
        return Err(CallbackError::Denied(error));
    }

    let received = query
        .state
        .filter(|s| !s.is_empty())
        .ok_or(CallbackError::MissingState)?;

    let matches = pending
        .as_deref()
        .is_some_and(|pending| bool::from(pending.as_bytes().ct_eq(received.as_bytes())));
    if !matches {
        return Err(CallbackError::StateMismatch);
    }

    let code = query
        .code
        .filter(|c| !c.is_empty())
        .ok_or(CallbackError::MissingCode)?;

    exchange_code(state, origin, &code).await
}

async fn exchange_code(
    state: &ApiState,
    origin: &RequestOrigin,
    code: &str,
) -> Result<Value, CallbackError> {
    let slack = &state.api_config().slack;
    let credentials = state.credentials();
    let redirect_uri = origin.redirect_uri();

    // Codes are single use, so the exchange is never retried.
    let response: Value = state
        .http_client()
        .post(format!("{}/oauth.access", slack.api_url.trim_end_matches('/')))
        .form(&OAuthAccessRequest {
            client_id: &credentials.client_id,
            client_secret: &credentials.client_secret,
            redirect_uri: &redirect_uri,
            code,
        })
        .timeout(slack.timeout)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    if response.get("ok").and_then(Value::as_bool) != Some(true) {
        let error = response
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown_error");
        return Err(CallbackError::Rejected(error.to_owned()));
    }

    Ok(response)
}

fn generate_oauth_state() -> String {
    hex::encode(rand::random::<[u8; OAUTH_STATE_LEN]>())
}
