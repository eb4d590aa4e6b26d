use serde::{Deserialize, Serialize};

/// Query parameters Slack appends when redirecting back after authorization.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct OAuthCallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    /// Set instead of `code` when the user declined the installation.
    pub error: Option<String>,
}

/// Form body of the `oauth.access` request.
#[derive(Debug, Serialize)]
pub struct OAuthAccessRequest<'a> {
    pub client_id: &'a str,
    pub client_secret: &'a str,
    pub redirect_uri: &'a str,
    pub code: &'a str,
}
