use std::time::Duration;

use anyhow::Result;
use axum::extract::{DefaultBodyLimit, FromRef};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use tokio::net::TcpListener;

use crate::api::controllers;
use crate::api::state::*;

/// Path Slack redirects back to after the user approved the app.
pub const OAUTH_CALLBACK_PATH: &str = "/oauth-callback/";

#[derive(Default)]
pub struct ApiEndpointBuilder {
    common: ApiEndpointBuilderCommon,
}

impl ApiEndpointBuilder {
    pub async fn bind(self, state: ApiState) -> Result<ApiEndpoint> {
        let listener = state.bind_socket().await?;
        Ok(ApiEndpoint {
            listener,
            router: self.into_router(state),
        })
    }

    /// Router with all middleware applied, without binding a socket.
    pub fn into_router(self, state: ApiState) -> axum::Router<()> {
        with_middleware(self.common.build(), state)
    }
}

struct ApiEndpointBuilderCommon {
    healthcheck_route: Option<String>,
}

impl Default for ApiEndpointBuilderCommon {
    fn default() -> Self {
        Self {
            healthcheck_route: Some("/healthz".to_owned()),
        }
    }
}

impl ApiEndpointBuilderCommon {
    fn build<S>(self) -> axum::Router<S>
    where
        ApiState: FromRef<S>,
        S: Clone + Send + Sync + 'static,
    {
        let mut router = axum::Router::new();

        if let Some(route) = self.healthcheck_route {
            router = router.route(&route, get(health_check));
        }

        router.merge(install_router()).merge(command_router())
    }
}

pub struct ApiEndpoint {
    listener: TcpListener,
    router: axum::Router<()>,
}

impl ApiEndpoint {
    pub fn builder() -> ApiEndpointBuilder {
        ApiEndpointBuilder::default()
    }

    pub async fn serve(self) -> std::io::Result<()> {
        axum::serve(self.listener, self.router).await
    }
}

fn with_middleware<S>(router: axum::Router<S>, state: S) -> axum::Router<()>
where
    S: Clone + Send + Sync + 'static,
{
    use tower::ServiceBuilder;
    use tower_http::timeout::TimeoutLayer;

    // Prepare middleware
    let service = ServiceBuilder::new()
        .layer(DefaultBodyLimit::max(MAX_REQUEST_SIZE))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            REQUEST_TIMEOUT,
        ));

    #[cfg(feature = "compression")]
    let service = service.layer(tower_http::compression::CompressionLayer::new().gzip(true));

    router.layer(service).with_state(state)
}

fn install_router<S>() -> axum::Router<S>
where
    ApiState: FromRef<S>,
    S: Clone + Send + Sync + 'static,
{
    axum::Router::new()
        .route("/", get(controllers::auth::index))
        .route(OAUTH_CALLBACK_PATH, get(controllers::auth::callback))
}

fn command_router<S>() -> axum::Router<S>
where
    ApiState: FromRef<S>,
    S: Clone + Send + Sync + 'static,
{
    axum::Router::new().route("/command/", post(controllers::command::command))
}

fn health_check() -> futures_util::future::Ready<impl IntoResponse> {
    futures_util::future::ready(
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("system time before Unix epoch")
            .as_millis()
            .to_string(),
    )
}

const MAX_REQUEST_SIZE: usize = 2 << 17; // 256kb
const REQUEST_TIMEOUT: Duration = Duration::from_secs(25);

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, Response, header};
    use serde_json::json;
    use tower::ServiceExt;
    use url::Url;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::api::controllers::auth::INSTALL_ERROR;
    use crate::api::test_utils;

    async fn send(router: &axum::Router, request: Request<Body>) -> (Response<()>, String) {
        let response = router.clone().oneshot(request).await.unwrap();
        let (parts, body) = response.into_parts();
        let bytes = to_bytes(body, usize::MAX).await.unwrap();
        (
            Response::from_parts(parts, ()),
            String::from_utf8(bytes.to_vec()).unwrap(),
        )
    }

    fn router(slack: &str, rocketreach: &str) -> axum::Router {
        ApiEndpoint::builder().into_router(test_utils::api_state(slack, rocketreach))
    }

    /// Loads the index page and returns the session cookie with the issued state.
    async fn start_install(router: &axum::Router, host: &str) -> (String, Url) {
        let request = Request::get("/")
            .header(header::HOST, host)
            .header("x-forwarded-proto", "https")
            .body(Body::empty())
            .unwrap();
        let (response, html) = send(router, request).await;
        assert_eq!(response.status(), StatusCode::OK);

        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .unwrap()
            .to_owned();
        assert!(cookie.starts_with("sessionid="));

        let start = html.find("href=\"").unwrap() + "href=\"".len();
        let end = start + html[start..].find('"').unwrap();
        let link = Url::parse(&html[start..end].replace("&amp;", "&")).unwrap();

        (cookie, link)
    }

    fn param(url: &Url, name: &str) -> String {
        url.query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
            .unwrap()
    }

    fn callback_request(host: &str, cookie: &str, query: &str) -> Request<Body> {
        Request::get(format!("{OAUTH_CALLBACK_PATH}?{query}"))
            .header(header::HOST, host)
            .header("x-forwarded-proto", "https")
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap()
    }

    fn command_request(body: &str) -> Request<Body> {
        Request::post("/command/")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_owned()))
            .unwrap()
    }

    #[tokio::test]
    async fn install_flow_end_to_end() {
        let slack = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth.access"))
            .and(body_string_contains(
                "redirect_uri=https%3A%2F%2Fbot.example.com%2Foauth-callback%2F",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "access_token": "xoxp-1",
                "team_name": "Acme"
            })))
            .expect(1)
            .mount(&slack)
            .await;
        let router = router(&slack.uri(), "http://rocketreach.invalid");

        let (cookie, link) = start_install(&router, "bot.example.com").await;
        assert_eq!(
            param(&link, "redirect_uri"),
            "https://bot.example.com/oauth-callback/"
        );

        let query = format!("code=abc&state={}", param(&link, "state"));
        let (response, html) =
            send(&router, callback_request("bot.example.com", &cookie, &query)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(html.contains("Acme"), "{html}");
        assert!(!html.contains(INSTALL_ERROR));
    }

    #[tokio::test]
    async fn install_flow_rejects_forged_state() {
        let slack = MockServer::start().await;
        Mock::given(path("/oauth.access"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
            .expect(0)
            .mount(&slack)
            .await;
        let router = router(&slack.uri(), "http://rocketreach.invalid");

        let (cookie, _) = start_install(&router, "bot.example.com").await;
        let (_, html) = send(
            &router,
            callback_request("bot.example.com", &cookie, "code=abc&state=forged"),
        )
        .await;
        assert!(html.contains(INSTALL_ERROR));
    }

    #[tokio::test]
    async fn install_flow_reports_denied_authorization() {
        let router = router("http://slack.invalid", "http://rocketreach.invalid");

        let (cookie, link) = start_install(&router, "bot.example.com").await;
        let query = format!("error=access_denied&state={}", param(&link, "state"));
        let (_, html) = send(&router, callback_request("bot.example.com", &cookie, &query)).await;
        assert!(html.contains(INSTALL_ERROR));
    }

    #[tokio::test]
    async fn install_cookie_is_secure_behind_https_proxy() {
        let router = router("http://slack.invalid", "http://rocketreach.invalid");
        let request = Request::get("/")
            .header(header::HOST, "bot.example.com")
            .header("x-forwarded-proto", "https")
            .body(Body::empty())
            .unwrap();
        let (response, _) = send(&router, request).await;

        let cookie = response.headers().get(header::SET_COOKIE).unwrap();
        assert!(cookie.to_str().unwrap().contains("Secure"), "{cookie:?}");
    }

    #[tokio::test]
    async fn forwarded_headers_are_ignored_unless_trusted() {
        let mut config = test_utils::config("http://slack.invalid", "http://rocketreach.invalid");
        config.api.trust_forwarded_proto = false;
        let router = ApiEndpoint::builder().into_router(test_utils::api_state_from(config));

        let request = Request::get("/")
            .header(header::HOST, "10.0.0.5:8000")
            .header("x-forwarded-proto", "https")
            .header("x-forwarded-host", "evil.example.com")
            .body(Body::empty())
            .unwrap();
        let (response, html) = send(&router, request).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(
            html.contains("redirect_uri=http%3A%2F%2F10.0.0.5%3A8000%2Foauth-callback%2F"),
            "{html}"
        );
        assert!(!html.contains("evil.example.com"));

        let cookie = response.headers().get(header::SET_COOKIE).unwrap();
        assert!(!cookie.to_str().unwrap().contains("Secure"));
    }

    #[tokio::test]
    async fn index_without_host_is_bad_request() {
        let router = router("http://slack.invalid", "http://rocketreach.invalid");
        let request = Request::get("/").body(Body::empty()).unwrap();
        let (response, _) = send(&router, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn command_webhook_routes() {
        let router = router("http://slack.invalid", "http://rocketreach.invalid");

        let (response, body) = send(
            &router,
            command_request("token=wrong&command=%2Frocket&text=hi"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body, "Token does not match.");

        let (response, body) = send(
            &router,
            command_request(&format!(
                "token={}&command=%2Ffoo&text=hi",
                test_utils::VERIFICATION_TOKEN
            )),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body.is_empty());

        let (response, body) = send(
            &router,
            command_request(&format!(
                "token={}&command=%2Frocket&text=to+the+moon&team_id=T1&user_id=U1",
                test_utils::VERIFICATION_TOKEN
            )),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(&body).unwrap(),
            json!({ "text": "Testing of rocket command success and your keywords are to the moon" })
        );
    }

    #[tokio::test]
    async fn command_without_token_is_forbidden() {
        let router = router("http://slack.invalid", "http://rocketreach.invalid");
        let (response, _) = send(&router, command_request("command=%2Frocket")).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn health_check_responds() {
        let router = router("http://slack.invalid", "http://rocketreach.invalid");
        let (response, body) = send(
            &router,
            Request::get("/healthz").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body.parse::<u128>().is_ok());
    }
}
