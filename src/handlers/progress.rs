// src/handlers/progress.rs

use std::collections::HashMap;

use axum::{Extension, Json, extract::State, response::IntoResponse};

use crate::{
    auth::Identity,
    config::{CATEGORIES, MAX_CATEGORY_SCORE, MAX_TOTAL_SCORE},
    error::AppError,
    models::{
        badge::{CategoryProgress, ProgressResponse},
        user::UserRecord,
    },
    services::scoring,
    state::AppState,
    store,
};

/// Per-category totals, overall milestone and the caller's rank.
pub async fn get_progress(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, AppError> {
    let users: HashMap<String, UserRecord> = store::read(state.store.as_ref(), "users")
        .await?
        .unwrap_or_default();
    let user = users
        .get(&identity.uid)
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    let categories = CATEGORIES
        .iter()
        .map(|&category| {
            let total = user
                .badges
                .get(category)
                .map(scoring::category_total)
                .unwrap_or(0);
            CategoryProgress {
                category: category.to_string(),
                total,
                max: MAX_CATEGORY_SCORE,
                fraction: scoring::progress_fraction(total, MAX_CATEGORY_SCORE),
            }
        })
        .collect();

    let totals: Vec<(String, u64)> = users
        .iter()
        .map(|(uid, u)| (uid.clone(), scoring::grand_total(&u.badges)))
        .collect();
    let total_score = scoring::grand_total(&user.badges);
    let fraction = scoring::progress_fraction(total_score, MAX_TOTAL_SCORE);

    Ok(Json(ProgressResponse {
        categories,
        total_score,
        max_score: MAX_TOTAL_SCORE,
        fraction,
        milestone: scoring::milestone_for_fraction(fraction),
        rank: scoring::rank(&identity.uid, &totals)?,
    }))
}

/// Leaderboard over every user. Public.
pub async fn get_ranking(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let standings = scoring::load_standings(state.store.as_ref()).await?;
    Ok(Json(standings))
}
