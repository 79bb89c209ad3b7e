// src/models/question.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    config::OPTIONS_PER_QUESTION,
    models::badge::{LabelStatus, Medal},
};

/// Represents `categories/{category}/labels/{label}/quizzes/{i}`.
///
/// Also the editing slot of the admin content editor: a blank slot is a
/// question with empty text, four empty options and an empty answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct QuizQuestion {
    #[serde(default)]
    #[validate(custom(function = not_blank, message = "question is empty"))]
    pub question: String,

    #[serde(default)]
    #[validate(custom(function = four_options))]
    pub options: Vec<String>,

    /// Must equal one of `options`. Checked when an admin saves.
    #[serde(default)]
    #[validate(custom(function = not_blank, message = "answer is empty"))]
    pub answer: String,
}

impl QuizQuestion {
    pub fn blank() -> Self {
        Self {
            question: String::new(),
            options: vec![String::new(); OPTIONS_PER_QUESTION],
            answer: String::new(),
        }
    }

    pub fn answer_is_an_option(&self) -> bool {
        let answer = self.answer.trim();
        self.options.iter().any(|o| o.trim() == answer)
    }
}

fn not_blank(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().is_empty() {
        return Err(validator::ValidationError::new("blank"));
    }
    Ok(())
}

fn four_options(options: &[String]) -> Result<(), validator::ValidationError> {
    if options.len() != OPTIONS_PER_QUESTION {
        let mut err = validator::ValidationError::new("option_count");
        err.message = Some(
            format!(
                "expected {} options, found {}",
                OPTIONS_PER_QUESTION,
                options.len()
            )
            .into(),
        );
        return Err(err);
    }
    Ok(())
}

/// DTO for sending a question to players (excludes the answer).
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub index: usize,
    pub question: String,
    pub options: Vec<String>,
}

/// DTO for submitting a finished label. Answers are positional.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitAnswersRequest {
    #[validate(length(max = 10))]
    pub answers: Vec<String>,
}

/// Per-question outcome shown on the result page.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerResult {
    pub question: String,
    pub correct_answer: String,
    pub user_answer: Option<String>,
    pub correct: bool,
}

/// DTO for the admin editor's save.
#[derive(Debug, Deserialize)]
pub struct SaveLabelRequest {
    pub slots: Vec<QuizQuestion>,
}

/// A category and the one after it in the fixed order.
#[derive(Debug, Serialize)]
pub struct CategoryLink {
    pub name: &'static str,
    pub next: &'static str,
}

/// Response DTO for a category's label page.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelListResponse {
    pub category: String,
    pub next_category: &'static str,
    pub first_unlocked: usize,
    pub labels: Vec<LabelStatus>,
}

/// Response DTO for an opened label.
#[derive(Debug, Serialize)]
pub struct QuizResponse {
    pub category: String,
    pub label: String,
    pub index: usize,
    pub questions: Vec<PublicQuestion>,
}

/// Response DTO for a graded submission.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub score: u32,
    pub correct: usize,
    pub total: usize,
    pub medal: Medal,
    /// Score kept on record, which differs from `score` under the best-score policy.
    pub recorded_score: u32,
    pub results: Vec<AnswerResult>,
    /// The label opened by this attempt, if any.
    pub next_label: Option<String>,
}

/// Response DTO for the admin editor.
#[derive(Debug, Serialize)]
pub struct LabelContent {
    pub category: String,
    pub label: String,
    pub slots: Vec<QuizQuestion>,
}
