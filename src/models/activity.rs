// src/models/activity.rs

use serde::{Deserialize, Serialize};

/// `users/{uid}/sessions/{autoId}`. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Unix millis when the record was written.
    pub timestamp: i64,
    /// Seconds.
    pub duration: u64,
}

/// `users/{uid}/quizzes/{autoId}`. Independent of the badge record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizCompletion {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub label: String,
    pub score: u32,
    pub timestamp: i64,
}

/// Aggregated activity for the admin user list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityMetrics {
    pub today_active_minutes: u64,
    pub weekly_active_minutes: u64,
    pub monthly_active_minutes: u64,
    pub average_daily_minutes: u64,
    pub today_quiz_count: u32,
    /// `YYYY-MM-DD`, `None` when the user was never active.
    pub last_active_date: Option<String>,
}
