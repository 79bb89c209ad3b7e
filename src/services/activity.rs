// src/services/activity.rs

//! Append-only session and quiz-completion logs, and the metrics derived from them.

use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde_json::{Map, json};

use crate::{
    error::AppError,
    models::{
        activity::{ActivityMetrics, QuizCompletion, SessionRecord},
        user::UserRecord,
    },
    store::{self, DocumentStore},
};

/// Self-owned writes are merges, so they would recreate a deleted user.
/// Every one of them checks the record first.
pub async fn require_user(store: &dyn DocumentStore, uid: &str) -> Result<(), AppError> {
    store::tree::check_key(uid)?;
    if store.get(&format!("users/{}", uid)).await?.is_none() {
        return Err(AppError::NotFound(format!("User '{}' not found", uid)));
    }
    Ok(())
}

/// Appends one session record and bumps `lastActive` in the same write.
/// Negative durations (clock skew) are stored as zero. Returns the record key.
pub async fn log_session(
    store: &dyn DocumentStore,
    uid: &str,
    duration_seconds: i64,
    now_millis: i64,
) -> Result<String, AppError> {
    require_user(store, uid).await?;

    let key = store::push_key();
    let record = SessionRecord {
        timestamp: now_millis,
        duration: duration_seconds.max(0) as u64,
    };

    let mut fields = Map::new();
    fields.insert(format!("sessions/{}", key), store::to_value(&record)?);
    fields.insert("lastActive".into(), json!(now_millis));
    store.update(&format!("users/{}", uid), fields).await?;

    tracing::debug!(%uid, duration = record.duration, "Session logged");
    Ok(key)
}

/// Appends a completion event. Only used for same-day counts, never for scoring.
pub async fn log_quiz_completion(
    store: &dyn DocumentStore,
    uid: &str,
    category: &str,
    label: &str,
    score: u32,
    now_millis: i64,
) -> Result<String, AppError> {
    require_user(store, uid).await?;

    let event = QuizCompletion {
        category: category.to_string(),
        label: label.to_string(),
        score,
        timestamp: now_millis,
    };
    let key = store
        .push(&format!("users/{}/quizzes", uid), store::to_value(&event)?)
        .await?;
    Ok(key)
}

fn rounded_minutes(seconds: u64) -> u64 {
    (seconds + 30) / 60
}

fn start_of_day(now: DateTime<Utc>) -> i64 {
    now.date_naive()
        .and_time(NaiveTime::MIN)
        .and_utc()
        .timestamp_millis()
}

/// Activity windows are closed intervals ending at `now`. "Today" is the UTC day.
pub fn metrics_for(user: &UserRecord, now: DateTime<Utc>) -> ActivityMetrics {
    let now_ms = now.timestamp_millis();
    let today = start_of_day(now);
    let week = (now - Duration::days(7)).timestamp_millis();
    let month = (now - Duration::days(30)).timestamp_millis();

    let window_sum = |from: i64| -> u64 {
        user.sessions
            .values()
            .filter(|s| s.timestamp >= from && s.timestamp <= now_ms)
            .map(|s| s.duration)
            .sum()
    };

    let today_secs = window_sum(today);
    let weekly_secs = window_sum(week);
    let monthly_secs = window_sum(month);

    let today_quiz_count = user
        .quizzes
        .values()
        .filter(|q| q.timestamp >= today && q.timestamp <= now_ms)
        .count() as u32;

    ActivityMetrics {
        today_active_minutes: rounded_minutes(today_secs),
        weekly_active_minutes: rounded_minutes(weekly_secs),
        monthly_active_minutes: rounded_minutes(monthly_secs),
        average_daily_minutes: (monthly_secs + 900) / 1800,
        today_quiz_count,
        last_active_date: user
            .last_active
            .and_then(DateTime::from_timestamp_millis)
            .map(|at| at.format("%Y-%m-%d").to_string()),
    }
}
