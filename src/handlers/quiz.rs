// src/handlers/quiz.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    auth::Identity,
    config::CATEGORIES,
    error::AppError,
    models::{
        badge::LabelStatus,
        question::{
            CategoryLink, LabelListResponse, PublicQuestion, QuizResponse, SubmitAnswersRequest,
            SubmitResponse,
        },
        user::BadgeMap,
    },
    services::{activity, content, progression, scoring},
    state::AppState,
    store,
};

async fn badges_in(state: &AppState, uid: &str, category: &str) -> Result<BadgeMap, AppError> {
    Ok(
        store::read(state.store.as_ref(), &format!("users/{}/badges/{}", uid, category))
            .await?
            .unwrap_or_default(),
    )
}

/// Resolves `label` to its position and checks the gate.
async fn open_label(
    state: &AppState,
    uid: &str,
    category: &str,
    label: &str,
) -> Result<(Vec<String>, BadgeMap, usize), AppError> {
    progression::require_category(category)?;

    let labels = progression::labels_for(state.store.as_ref(), category).await?;
    let index = labels
        .iter()
        .position(|l| l == label)
        .ok_or_else(|| AppError::NotFound(format!("Label '{}' not found in {}", label, category)))?;

    let badges = badges_in(state, uid, category).await?;
    if !progression::can_access(&labels, &badges, index as i64)? {
        tracing::debug!(%uid, %category, %label, "Blocked access to locked label");
        return Err(progression::blocked_notice());
    }
    Ok((labels, badges, index))
}

/// Lists the fixed categories, each with the one that follows it.
pub async fn list_categories() -> impl IntoResponse {
    let links: Vec<CategoryLink> = CATEGORIES
        .iter()
        .map(|&name| CategoryLink {
            name,
            next: progression::next_category(name),
        })
        .collect();
    Json(links)
}

/// Label cards for one category: recorded score, medal and whether it is open.
pub async fn list_labels(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(category): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    progression::require_category(&category)?;

    let labels = progression::labels_for(state.store.as_ref(), &category).await?;
    let badges = badges_in(&state, &identity.uid, &category).await?;
    let first_unlocked = progression::first_unlocked_index(&labels, &badges);

    let cards = labels
        .iter()
        .enumerate()
        .map(|(index, label)| {
            let score = badges.get(label).copied();
            LabelStatus {
                index,
                label: label.clone(),
                score,
                medal: scoring::medal_for_score(score.unwrap_or(0)),
                accessible: index <= first_unlocked,
            }
        })
        .collect();

    Ok(Json(LabelListResponse {
        next_category: progression::next_category(&category),
        category,
        first_unlocked,
        labels: cards,
    }))
}

/// Opens a label. Locked labels answer 403 and read nothing else.
/// Answers are never sent to the player.
pub async fn get_quiz(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path((category, label)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let (_, _, index) = open_label(&state, &identity.uid, &category, &label).await?;

    let questions = content::playable_questions(state.store.as_ref(), &category, &label).await?;
    if questions.is_empty() {
        return Err(AppError::NotFound(format!(
            "No questions in {} / {} yet",
            category, label
        )));
    }

    let questions = questions
        .into_iter()
        .enumerate()
        .map(|(index, q)| PublicQuestion {
            index,
            question: q.question,
            options: q.options,
        })
        .collect();

    Ok(Json(QuizResponse {
        category,
        label,
        index,
        questions,
    }))
}

/// Grades a finished label.
///
/// * Strict positional matching, 10 points per correct answer.
/// * Records the badge (per the configured attempt policy) and a completion event.
/// * Reports which label, if any, the attempt opened.
pub async fn submit_quiz(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path((category, label)): Path<(String, String)>,
    Json(payload): Json<SubmitAnswersRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let (labels, mut badges, _) = open_label(&state, &identity.uid, &category, &label).await?;

    let questions = content::playable_questions(state.store.as_ref(), &category, &label).await?;
    if questions.is_empty() {
        return Err(AppError::NotFound(format!(
            "No questions in {} / {} yet",
            category, label
        )));
    }

    let (score, correct, results) = scoring::grade(&questions, &payload.answers);
    let now = chrono::Utc::now().timestamp_millis();

    let recorded_score = scoring::record_attempt(
        state.store.as_ref(),
        state.config.attempt_policy,
        &identity.uid,
        &category,
        &label,
        score,
        now,
    )
    .await?;

    if let Err(e) = activity::log_quiz_completion(
        state.store.as_ref(),
        &identity.uid,
        &category,
        &label,
        score,
        now,
    )
    .await
    {
        tracing::warn!(uid = %identity.uid, "Quiz completion not logged: {}", e);
    }

    let was_open = progression::first_unlocked_index(&labels, &badges);
    badges.insert(label.clone(), recorded_score);
    let now_open = progression::first_unlocked_index(&labels, &badges);
    let next_label = if now_open > was_open {
        labels.get(now_open).cloned()
    } else {
        None
    };

    tracing::info!(uid = %identity.uid, %category, %label, score, "Quiz submitted");

    Ok(Json(SubmitResponse {
        score,
        correct,
        total: questions.len(),
        medal: scoring::medal_for_score(score),
        recorded_score,
        results,
        next_label,
    }))
}
