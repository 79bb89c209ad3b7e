// src/handlers/auth.rs

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;
use validator::Validate;

use crate::{
    auth::Identity,
    error::AppError,
    models::user::{SignInRequest, SignUpRequest},
    services::identity,
    state::AppState,
};

/// Registers a new user and opens their first session.
///
/// Returns 201 Created with the token, the identity and the landing view
/// (`/admin` for allow-listed emails).
pub async fn sign_up(
    State(state): State<AppState>,
    Json(payload): Json<SignUpRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let outcome = identity::sign_up(
        &state,
        &payload.email,
        &payload.password,
        &payload.display_name,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(outcome)))
}

/// Authenticates a user and returns a bearer token.
///
/// Unknown emails and wrong passwords produce the same 401.
pub async fn sign_in(
    State(state): State<AppState>,
    Json(payload): Json<SignInRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let outcome = identity::sign_in(&state, &payload.email, &payload.password).await?;
    Ok(Json(outcome))
}

/// Logs the session duration and revokes the token. Never fails once the
/// caller is authenticated.
pub async fn sign_out(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> impl IntoResponse {
    identity::sign_out(&state, &identity).await;
    Json(json!({ "message": "Signed out" }))
}

/// Tab-close flush. Always 202, whatever happened to the write.
pub async fn flush_session(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> StatusCode {
    identity::flush_session(&state, &identity).await;
    StatusCode::ACCEPTED
}
