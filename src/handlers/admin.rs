// src/handlers/admin.rs

use std::cmp::Ordering;

use axum::{
    Json,
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    auth::Identity,
    config::QUESTIONS_PER_LABEL,
    error::AppError,
    models::{
        question::{LabelContent, QuizQuestion, SaveLabelRequest},
        user::{
            AdminSummary, AdminUserList, AdminUserRow, BulkDeleteFailure, BulkDeleteRequest,
            BulkDeleteResult, UserListParams,
        },
    },
    services::{activity, content, identity, progression, scoring},
    state::AppState,
    utils::avatar::avatar_for,
};

fn compare_rows(sort: &str, a: &AdminUserRow, b: &AdminUserRow) -> Ordering {
    let primary = match sort {
        "email" => a.email.to_lowercase().cmp(&b.email.to_lowercase()),
        "activity" => b
            .activity
            .today_active_minutes
            .cmp(&a.activity.today_active_minutes),
        "quizzes" => b.activity.today_quiz_count.cmp(&a.activity.today_quiz_count),
        _ => a
            .display_name
            .to_lowercase()
            .cmp(&b.display_name.to_lowercase()),
    };
    primary.then_with(|| a.uid.cmp(&b.uid))
}

/// Lists users from the live roster with their activity metrics.
/// Admin only.
///
/// * `search` filters on display name or email.
/// * `sort` is `name` (default), `email`, `activity` or `quizzes`.
pub async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<UserListParams>,
) -> Result<impl IntoResponse, AppError> {
    let now = chrono::Utc::now();
    let query = params
        .search
        .as_deref()
        .map(|s| s.trim().to_lowercase())
        .unwrap_or_default();

    let mut users: Vec<AdminUserRow> = state
        .roster
        .snapshot()
        .await
        .into_iter()
        .filter(|(_, u)| {
            query.is_empty()
                || u.display_name.to_lowercase().contains(&query)
                || u.email.to_lowercase().contains(&query)
        })
        .map(|(uid, u)| AdminUserRow {
            avatar: avatar_for(
                &u.display_name,
                u.avatar_icon.as_deref(),
                u.avatar_bg_color.as_deref(),
            ),
            total_score: scoring::grand_total(&u.badges),
            activity: activity::metrics_for(&u, now),
            is_admin: u.is_admin || state.config.is_admin_email(&u.email),
            uid,
            display_name: u.display_name,
            email: u.email,
        })
        .collect();

    let sort = params.sort.as_deref().unwrap_or("name");
    users.sort_by(|a, b| compare_rows(sort, a, b));

    let active_today = users
        .iter()
        .filter(|u| u.activity.today_active_minutes > 0)
        .count();
    let average_daily_minutes = match users.len() {
        0 => 0,
        n => {
            let sum: u64 = users.iter().map(|u| u.activity.average_daily_minutes).sum();
            (sum + n as u64 / 2) / n as u64
        }
    };

    Ok(Json(AdminUserList {
        summary: AdminSummary {
            total_users: users.len(),
            active_today,
            average_daily_minutes,
        },
        users,
    }))
}

/// Deletes a user record and account.
/// Admin only. Admins cannot delete themselves.
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(admin): Extension<Identity>,
    Path(uid): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    if uid == admin.uid {
        return Err(AppError::Forbidden(
            "You cannot delete your own account".to_string(),
        ));
    }

    identity::delete_user(&state, &uid).await?;
    tracing::info!(admin = %admin.uid, %uid, "Admin deleted user");

    Ok(StatusCode::NO_CONTENT)
}

/// Deletes several users, reporting each failure instead of stopping.
/// Admin only.
pub async fn bulk_delete_users(
    State(state): State<AppState>,
    Extension(admin): Extension<Identity>,
    Json(payload): Json<BulkDeleteRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut result = BulkDeleteResult::default();
    for uid in payload.uids {
        if uid == admin.uid {
            result.failed.push(BulkDeleteFailure {
                uid,
                error: "You cannot delete your own account".to_string(),
            });
            continue;
        }
        match identity::delete_user(&state, &uid).await {
            Ok(()) => result.deleted.push(uid),
            Err(e) => {
                tracing::warn!(%uid, "Bulk delete skipped user: {}", e);
                result.failed.push(BulkDeleteFailure {
                    uid,
                    error: e.to_string(),
                });
            }
        }
    }

    tracing::info!(
        admin = %admin.uid,
        deleted = result.deleted.len(),
        failed = result.failed.len(),
        "Bulk delete finished"
    );
    Ok(Json(result))
}

/// Ten editing slots for a label, blank where nothing is stored.
/// Admin only.
pub async fn get_label_content(
    State(state): State<AppState>,
    Path((category, label)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    progression::require_category(&category)?;

    let slots = content::load_label(state.store.as_ref(), &category, &label).await?;
    Ok(Json(LabelContent {
        category,
        label,
        slots,
    }))
}

/// Validates and replaces a label's questions in one write.
/// Admin only. The first incomplete row is reported and nothing is saved.
pub async fn save_label_content(
    State(state): State<AppState>,
    Extension(admin): Extension<Identity>,
    Path((category, label)): Path<(String, String)>,
    Json(payload): Json<SaveLabelRequest>,
) -> Result<impl IntoResponse, AppError> {
    progression::require_category(&category)?;

    content::save(state.store.as_ref(), &category, &label, &payload.slots).await?;
    tracing::info!(admin = %admin.uid, %category, %label, "Quizzes saved");

    let slots = content::load_label(state.store.as_ref(), &category, &label).await?;
    Ok(Json(LabelContent {
        category,
        label,
        slots,
    }))
}

/// Proposes the next label name with ten blank slots. Nothing is stored
/// until the admin saves.
/// Admin only.
pub async fn allocate_label(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    progression::require_category(&category)?;

    let label = content::allocate_next_label(state.store.as_ref(), &category).await?;
    Ok((
        StatusCode::CREATED,
        Json(LabelContent {
            category,
            label,
            slots: vec![QuizQuestion::blank(); QUESTIONS_PER_LABEL],
        }),
    ))
}
