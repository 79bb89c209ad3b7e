// src/handlers/profile.rs

use axum::{Extension, Json, extract::State, response::IntoResponse};
use validator::Validate;

use crate::{
    auth::{AuthState, Identity},
    config::MAX_TOTAL_SCORE,
    error::AppError,
    models::user::{MeResponse, UpdateProfileRequest, UserRecord},
    services::{activity, identity, scoring},
    state::AppState,
    store,
};

/// Current user's profile, avatar, totals and activity.
pub async fn get_me(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, AppError> {
    let user: UserRecord = store::read(state.store.as_ref(), &format!("users/{}", identity.uid))
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    let total = scoring::grand_total(&user.badges);
    Ok(Json(MeResponse {
        uid: identity.uid.clone(),
        email: user.email.clone(),
        display_name: user.display_name.clone(),
        is_admin: identity.is_admin,
        avatar: identity::avatar_of(&state, &identity.uid, &user).await,
        total_score: total,
        milestone: scoring::milestone_for_fraction(scoring::progress_fraction(
            total,
            MAX_TOTAL_SCORE,
        )),
        activity: activity::metrics_for(&user, chrono::Utc::now()),
    }))
}

/// Updates display name and avatar. Returns a fresh token carrying the new name.
///
/// Reads the caller from [`AuthState`], so a request that was never resolved
/// is told apart from a signed-out one.
pub async fn update_me(
    State(state): State<AppState>,
    auth: AuthState,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    let caller = auth.identity()?;
    payload.validate()?;

    let outcome = identity::update_profile(&state, caller, &payload).await?;
    Ok(Json(outcome))
}
