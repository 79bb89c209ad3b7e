// src/models/badge.rs

use serde::Serialize;

use crate::utils::avatar::Avatar;

/// Per-attempt tier derived from a single label score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Medal {
    None,
    Bronze,
    Silver,
    Gold,
    Diamond,
}

/// Cumulative tier derived from the progress fraction. Unrelated to [`Medal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Milestone {
    None,
    Ribbon,
    Star,
    Crown,
}

/// One row of the leaderboard. Derived, never stored.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingEntry {
    pub rank: usize,
    pub uid: String,
    pub display_name: String,
    pub avatar: Avatar,
    pub total_score: u64,
    pub milestone: Milestone,
}

/// Label card on the category page.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelStatus {
    pub index: usize,
    pub label: String,
    pub score: Option<u32>,
    pub medal: Medal,
    pub accessible: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryProgress {
    pub category: String,
    pub total: u64,
    pub max: u64,
    pub fraction: f64,
}

/// Response DTO for `GET /api/progress`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressResponse {
    pub categories: Vec<CategoryProgress>,
    pub total_score: u64,
    pub max_score: u64,
    pub fraction: f64,
    pub milestone: Milestone,
    pub rank: usize,
}
