use axum::Json;
use axum::extract::{Form, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use subtle::ConstantTimeEq;

use crate::api::models::command::{Command, CommandReply, CommandRequest};
use crate::api::state::ApiState;
use crate::rocketreach::ProfileLookup;

pub async fn command(State(state): State<ApiState>, Form(request): Form<CommandRequest>) -> Response {
    dispatch(&state, request).await.unwrap_or_else(|e| {
        tracing::error!("slash command failed: {e:#}");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
    })
}

/// Authenticates the webhook and routes it to the matching command.
///
/// Unknown commands are acknowledged with an empty `200 OK`.
pub async fn dispatch(state: &ApiState, request: CommandRequest) -> anyhow::Result<Response> {
    let expected = state.credentials().verification_token.as_bytes();
    if !bool::from(request.token.as_bytes().ct_eq(expected)) {
        tracing::warn!(command = %request.command, "incorrect verification token received");
        return Ok((StatusCode::FORBIDDEN, "Token does not match.").into_response());
    }

    let name = request
        .command
        .strip_prefix('/')
        .unwrap_or(&request.command);

    let Some(command) = Command::from_name(name) else {
        tracing::info!(command = name, "unhandled command");
        return Ok(StatusCode::OK.into_response());
    };

    let text = request.text.trim();
    tracing::debug!(command = command.name(), "handling slash command");

    let reply = match command {
        Command::Rocket => rocket(text),
        Command::Linkedin => linkedin(state, text).await?,
    };

    Ok(Json(reply).into_response())
}

fn rocket(text: &str) -> CommandReply {
    CommandReply::text(format!(
        "Testing of rocket command success and your keywords are {text}"
    ))
}

async fn linkedin(state: &ApiState, li_url: &str) -> anyhow::Result<CommandReply> {
    match state.rocketreach().lookup_profile(li_url).await? {
        ProfileLookup::Found(profile) => Ok(CommandReply::profile(&profile)),
        ProfileLookup::NotFound { reason } => {
            tracing::info!(li_url, reason = reason.as_deref(), "no RocketReach profile");
            Ok(CommandReply::no_profile())
        }
    }
}
