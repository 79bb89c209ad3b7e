// src/services/scoring.rs

//! Label scores, medals, progress milestones and the leaderboard.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde_json::{Map, json};

use crate::{
    config::{AttemptPolicy, MAX_LABEL_SCORE, MAX_TOTAL_SCORE, POINTS_PER_CORRECT},
    error::AppError,
    models::{
        badge::{Medal, Milestone, RankingEntry},
        question::{AnswerResult, QuizQuestion},
        user::{BadgeBook, BadgeMap, UserRecord},
    },
    services::activity,
    store::{self, DocumentStore},
    utils::avatar::avatar_for,
};

/// Inclusive buckets. Scores between buckets, and zero, earn nothing.
pub fn medal_for_score(score: u32) -> Medal {
    match score {
        10..=20 => Medal::Bronze,
        30..=50 => Medal::Silver,
        60..=80 => Medal::Gold,
        90..=100 => Medal::Diamond,
        _ => Medal::None,
    }
}

pub fn milestone_for_fraction(fraction: f64) -> Milestone {
    if fraction >= 0.85 {
        Milestone::Crown
    } else if fraction >= 0.5 {
        Milestone::Star
    } else if fraction >= 0.2 {
        Milestone::Ribbon
    } else {
        Milestone::None
    }
}

pub fn category_total(badges: &BadgeMap) -> u64 {
    badges.values().map(|&s| s as u64).sum()
}

pub fn grand_total(book: &BadgeBook) -> u64 {
    book.values().map(category_total).sum()
}

/// `total / max_possible`, clamped to `[0, 1]`.
pub fn progress_fraction(total: u64, max_possible: u64) -> f64 {
    if max_possible == 0 {
        return 0.0;
    }
    (total as f64 / max_possible as f64).clamp(0.0, 1.0)
}

/// Attempt scores are whole tens between 0 and 100.
pub fn validate_score(score: u32) -> Result<(), AppError> {
    if score > MAX_LABEL_SCORE || score % POINTS_PER_CORRECT != 0 {
        return Err(AppError::Validation(format!(
            "Score must be a multiple of {} between 0 and {}, got {}",
            POINTS_PER_CORRECT, MAX_LABEL_SCORE, score
        )));
    }
    Ok(())
}

/// Grades positional answers with strict string matching.
/// Returns the score, the number of correct answers and the per-question results.
pub fn grade(questions: &[QuizQuestion], answers: &[String]) -> (u32, usize, Vec<AnswerResult>) {
    let results: Vec<AnswerResult> = questions
        .iter()
        .enumerate()
        .map(|(i, q)| {
            let user_answer = answers.get(i).cloned();
            AnswerResult {
                question: q.question.clone(),
                correct_answer: q.answer.clone(),
                correct: user_answer.as_deref() == Some(q.answer.as_str()),
                user_answer,
            }
        })
        .collect();

    let correct = results.iter().filter(|r| r.correct).count();
    let score = (correct as u32 * POINTS_PER_CORRECT).min(MAX_LABEL_SCORE);
    (score, correct, results)
}

/// Stores the badge for `(category, label)`, refreshing the cached total and
/// `lastActive` in the same write. Returns the score now on record.
///
/// `totalScore` is summed from the badges read at the start of the call, so
/// two concurrent submits for different labels can leave it one badge short.
/// Only the cache drifts: standings, progress and `/api/me` sum the badges.
pub async fn record_attempt(
    store: &dyn DocumentStore,
    policy: AttemptPolicy,
    uid: &str,
    category: &str,
    label: &str,
    score: u32,
    now_millis: i64,
) -> Result<u32, AppError> {
    validate_score(score)?;
    for key in [category, label] {
        store::tree::check_key(key)?;
    }
    activity::require_user(store, uid).await?;

    let mut book: BadgeBook = store::read(store, &format!("users/{}/badges", uid))
        .await?
        .unwrap_or_default();

    let previous = book.get(category).and_then(|m| m.get(label)).copied();
    let stored = match (policy, previous) {
        (AttemptPolicy::Best, Some(prev)) => prev.max(score),
        _ => score,
    };
    book.entry(category.to_string())
        .or_default()
        .insert(label.to_string(), stored);

    let mut fields = Map::new();
    fields.insert(format!("badges/{}/{}", category, label), json!(stored));
    fields.insert("totalScore".into(), json!(grand_total(&book)));
    fields.insert("lastActive".into(), json!(now_millis));
    store.update(&format!("users/{}", uid), fields).await?;

    tracing::info!(%uid, %category, %label, score, stored, "Attempt recorded");
    Ok(stored)
}

/// Total descending, then uid ascending so ties never depend on map order.
fn ranking_order(a: (&str, u64), b: (&str, u64)) -> Ordering {
    b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0))
}

/// 1-based position of `uid` among `totals`.
pub fn rank(uid: &str, totals: &[(String, u64)]) -> Result<usize, AppError> {
    let mut ordered: Vec<(&str, u64)> = totals.iter().map(|(u, t)| (u.as_str(), *t)).collect();
    ordered.sort_by(|a, b| ranking_order(*a, *b));

    ordered
        .iter()
        .position(|(u, _)| *u == uid)
        .map(|i| i + 1)
        .ok_or_else(|| AppError::NotFound(format!("User '{}' is not ranked", uid)))
}

/// Leaderboard rows. Totals are recomputed from badges, not the cache.
pub fn standings(users: &HashMap<String, UserRecord>) -> Vec<RankingEntry> {
    let mut rows: Vec<(&String, &UserRecord, u64)> = users
        .iter()
        .map(|(uid, user)| (uid, user, grand_total(&user.badges)))
        .collect();
    rows.sort_by(|a, b| ranking_order((a.0, a.2), (b.0, b.2)));

    rows.into_iter()
        .enumerate()
        .map(|(i, (uid, user, total))| RankingEntry {
            rank: i + 1,
            uid: uid.clone(),
            display_name: user.display_name.clone(),
            avatar: avatar_for(
                &user.display_name,
                user.avatar_icon.as_deref(),
                user.avatar_bg_color.as_deref(),
            ),
            total_score: total,
            milestone: milestone_for_fraction(progress_fraction(total, MAX_TOTAL_SCORE)),
        })
        .collect()
}

/// One-shot read of every user, then [`standings`].
pub async fn load_standings(store: &dyn DocumentStore) -> Result<Vec<RankingEntry>, AppError> {
    let users: HashMap<String, UserRecord> = store::read(store, "users")
        .await?
        .unwrap_or_default();
    Ok(standings(&users))
}
