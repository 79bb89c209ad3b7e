// src/models/user.rs

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    models::{
        activity::{ActivityMetrics, QuizCompletion, SessionRecord},
        badge::Milestone,
    },
    utils::avatar::Avatar,
};

/// Scores per label within one category: `label -> score`.
pub type BadgeMap = BTreeMap<String, u32>;

/// Every badge of one user: `category -> label -> score`.
pub type BadgeBook = BTreeMap<String, BadgeMap>;

/// Represents `users/{uid}` in the document store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    #[serde(default)]
    pub display_name: String,

    #[serde(default)]
    pub email: String,

    /// Cached sum of all badge scores. Derivable from `badges`.
    #[serde(default)]
    pub total_score: u64,

    #[serde(default)]
    pub avatar_icon: Option<String>,

    #[serde(default)]
    pub avatar_bg_color: Option<String>,

    #[serde(default)]
    pub is_admin: bool,

    /// Unix millis of the last sign-in, sign-out or quiz completion.
    #[serde(default)]
    pub last_active: Option<i64>,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub sessions: HashMap<String, SessionRecord>,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub quizzes: HashMap<String, QuizCompletion>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub badges: BadgeBook,
}

impl UserRecord {
    pub fn new(display_name: &str, email: &str, is_admin: bool, now_millis: i64) -> Self {
        Self {
            display_name: display_name.to_string(),
            email: email.to_string(),
            is_admin,
            last_active: Some(now_millis),
            ..Self::default()
        }
    }
}

/// DTO for sign-up.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    #[validate(email(message = "A valid email address is required."))]
    pub email: String,
    #[validate(length(max = 128, message = "Password must be at most 128 characters."))]
    pub password: String,
    #[validate(length(
        min = 1,
        max = 50,
        message = "Display name length must be between 1 and 50 characters."
    ))]
    pub display_name: String,
}

/// DTO for sign-in.
#[derive(Debug, Deserialize, Validate)]
pub struct SignInRequest {
    #[validate(length(min = 1, max = 254))]
    pub email: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// DTO for profile edits. A missing colour falls back to the derived one.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[validate(length(
        min = 1,
        max = 50,
        message = "Display name length must be between 1 and 50 characters."
    ))]
    pub display_name: String,
    #[validate(length(max = 100))]
    pub avatar_icon: Option<String>,
    #[validate(length(max = 32))]
    pub avatar_bg_color: Option<String>,
}

/// Response DTO for `GET /api/me`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub uid: String,
    pub email: String,
    pub display_name: String,
    pub is_admin: bool,
    pub avatar: Avatar,
    pub total_score: u64,
    pub milestone: Milestone,
    pub activity: ActivityMetrics,
}

/// Query params for the admin user list.
#[derive(Debug, Default, Deserialize)]
pub struct UserListParams {
    /// `name` (default), `email`, `activity` or `quizzes`.
    pub sort: Option<String>,
    /// Case-insensitive match on display name or email.
    pub search: Option<String>,
}

/// One row of the admin user list.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUserRow {
    pub uid: String,
    pub display_name: String,
    pub email: String,
    pub is_admin: bool,
    pub avatar: Avatar,
    pub total_score: u64,
    pub activity: ActivityMetrics,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminSummary {
    pub total_users: usize,
    pub active_today: usize,
    pub average_daily_minutes: u64,
}

#[derive(Debug, Serialize)]
pub struct AdminUserList {
    pub summary: AdminSummary,
    pub users: Vec<AdminUserRow>,
}

/// DTO for bulk deletion.
#[derive(Debug, Deserialize, Validate)]
pub struct BulkDeleteRequest {
    #[validate(length(min = 1, max = 100, message = "Select between 1 and 100 users."))]
    pub uids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct BulkDeleteFailure {
    pub uid: String,
    pub error: String,
}

#[derive(Debug, Default, Serialize)]
pub struct BulkDeleteResult {
    pub deleted: Vec<String>,
    pub failed: Vec<BulkDeleteFailure>,
}
