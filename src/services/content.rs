// src/services/content.rs

//! Admin content editor: ten fixed slots per label, validated before every save.

use std::fmt;

use serde::Serialize;
use serde_json::Value;
use validator::Validate;

use crate::{
    config::{OPTIONS_PER_QUESTION, QUESTIONS_PER_LABEL},
    error::AppError,
    models::question::QuizQuestion,
    store::{self, DocumentStore},
};

fn quizzes_path(category: &str, label: &str) -> Result<String, AppError> {
    store::tree::check_key(category)?;
    store::tree::check_key(label)?;
    Ok(format!("categories/{}/labels/{}/quizzes", category, label))
}

/// First failing row of a batch. `row` is 1-based, as shown to the editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowError {
    pub row: usize,
    pub reason: String,
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Row {} incomplete: {}", self.row, self.reason)
    }
}

impl From<RowError> for AppError {
    fn from(err: RowError) -> Self {
        AppError::Validation(err.to_string())
    }
}

fn slot_from_value(value: Option<&Value>) -> QuizQuestion {
    let Some(value) = value else {
        return QuizQuestion::blank();
    };
    match serde_json::from_value::<QuizQuestion>(value.clone()) {
        Ok(mut slot) => {
            if slot.options.is_empty() {
                slot.options = vec![String::new(); OPTIONS_PER_QUESTION];
            }
            slot
        }
        Err(e) => {
            tracing::warn!("Unreadable quiz slot, showing it blank: {}", e);
            QuizQuestion::blank()
        }
    }
}

/// Stored questions as exactly ten editing slots, padding with blanks or
/// dropping extras. Accepts both array and index-keyed object layouts.
pub fn slots_from_value(stored: Option<Value>) -> Vec<QuizQuestion> {
    let lookup = |i: usize| -> Option<Value> {
        match &stored {
            Some(Value::Array(items)) => items.get(i).cloned(),
            Some(Value::Object(map)) => map.get(&i.to_string()).cloned(),
            _ => None,
        }
    };
    (0..QUESTIONS_PER_LABEL)
        .map(|i| slot_from_value(lookup(i).as_ref()))
        .collect()
}

pub async fn load_label(
    store: &dyn DocumentStore,
    category: &str,
    label: &str,
) -> Result<Vec<QuizQuestion>, AppError> {
    let stored = store.get(&quizzes_path(category, label)?).await?;
    Ok(slots_from_value(stored))
}

/// Questions a player can answer: the stored slots minus blank ones.
pub async fn playable_questions(
    store: &dyn DocumentStore,
    category: &str,
    label: &str,
) -> Result<Vec<QuizQuestion>, AppError> {
    Ok(load_label(store, category, label)
        .await?
        .into_iter()
        .filter(|q| !q.question.trim().is_empty())
        .collect())
}

fn first_reason(errors: &validator::ValidationErrors) -> String {
    let fields = errors.field_errors();
    for field in ["question", "options", "answer"] {
        if let Some(error) = fields.get(field).and_then(|list| list.first()) {
            return match &error.message {
                Some(message) => message.to_string(),
                None => format!("{} is invalid", field),
            };
        }
    }
    errors.to_string()
}

/// Fail-fast: reports only the first incomplete row.
pub fn validate_before_save(slots: &[QuizQuestion]) -> Result<(), RowError> {
    for (i, slot) in slots.iter().enumerate() {
        let row = i + 1;
        if let Err(errors) = slot.validate() {
            return Err(RowError {
                row,
                reason: first_reason(&errors),
            });
        }
        if !slot.answer_is_an_option() {
            return Err(RowError {
                row,
                reason: "answer must be one of the options".to_string(),
            });
        }
    }
    Ok(())
}

fn trimmed(slot: &QuizQuestion) -> QuizQuestion {
    QuizQuestion {
        question: slot.question.trim().to_string(),
        options: slot.options.iter().map(|o| o.trim().to_string()).collect(),
        answer: slot.answer.trim().to_string(),
    }
}

/// Replaces the label's questions in one write. Nothing is written when
/// validation fails, and a failed write leaves the old content in place.
pub async fn save(
    store: &dyn DocumentStore,
    category: &str,
    label: &str,
    slots: &[QuizQuestion],
) -> Result<(), AppError> {
    let path = quizzes_path(category, label)?;
    if slots.len() != QUESTIONS_PER_LABEL {
        return Err(AppError::Validation(format!(
            "A label needs exactly {} questions, got {}",
            QUESTIONS_PER_LABEL,
            slots.len()
        )));
    }
    validate_before_save(slots)?;

    let payload: Vec<QuizQuestion> = slots.iter().map(trimmed).collect();
    store.set(&path, store::to_value(&payload)?).await?;

    tracing::info!(%category, %label, "Label content saved");
    Ok(())
}

/// `label{n+1}` for a category with `n` labels. Reserves nothing, so two
/// concurrent callers can receive the same name.
pub async fn allocate_next_label(
    store: &dyn DocumentStore,
    category: &str,
) -> Result<String, AppError> {
    store::tree::check_key(category)?;
    let existing = store::child_keys(store, &format!("categories/{}/labels", category)).await?;
    Ok(format!("label{}", existing.len() + 1))
}
