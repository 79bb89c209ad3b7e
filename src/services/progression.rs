// src/services/progression.rs

//! Sequential gating of labels within one category.
//!
//! A label at position `i` is open once every label before it has a badge
//! record. Categories are gated independently of each other.

use std::sync::LazyLock;

use regex::Regex;

use crate::{
    config::{CATEGORIES, DEFAULT_LABEL_COUNT, is_known_category},
    error::AppError,
    models::user::BadgeMap,
    store::{self, DocumentStore, StoreError},
};

static NON_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^0-9]").expect("static pattern"));

/// `label1..label32`, used while a category has no content.
pub fn default_labels() -> Vec<String> {
    (1..=DEFAULT_LABEL_COUNT).map(|i| format!("label{}", i)).collect()
}

/// Orders label names by the number formed by their digits (`label2` before
/// `label10`). Names without digits go last, alphabetically.
pub fn sort_labels(mut labels: Vec<String>) -> Vec<String> {
    labels.sort_by_cached_key(|name| {
        let number = NON_DIGITS.replace_all(name, "").parse::<u64>().ok();
        (number.is_none(), number, name.clone())
    });
    labels
}

/// The ordered label sequence of a category, falling back to the defaults.
pub async fn labels_for(
    store: &dyn DocumentStore,
    category: &str,
) -> Result<Vec<String>, StoreError> {
    store::tree::check_key(category)?;
    let keys = store::child_keys(store, &format!("categories/{}/labels", category)).await?;
    if keys.is_empty() {
        return Ok(default_labels());
    }
    Ok(sort_labels(keys))
}

/// Index of the first label without a badge; `labels.len()` when all are done.
pub fn first_unlocked_index(labels: &[String], badges: &BadgeMap) -> usize {
    labels
        .iter()
        .position(|label| !badges.contains_key(label))
        .unwrap_or(labels.len())
}

/// Whether the label at `target_index` may be opened. Re-attempting any
/// completed label and attempting the next open one are both allowed.
pub fn can_access(labels: &[String], badges: &BadgeMap, target_index: i64) -> Result<bool, AppError> {
    if target_index < 0 {
        return Err(AppError::Validation(format!(
            "Invalid label index: {}",
            target_index
        )));
    }
    Ok(target_index as u64 <= first_unlocked_index(labels, badges) as u64)
}

/// What the caller shows when a locked label is opened. Reads and writes nothing.
pub fn blocked_notice() -> AppError {
    AppError::Forbidden("Please complete the previous labels first.".to_string())
}

/// Only the fixed category set is playable or editable.
pub fn require_category(category: &str) -> Result<(), AppError> {
    if !is_known_category(category) {
        return Err(AppError::NotFound(format!("Unknown category '{}'", category)));
    }
    Ok(())
}

/// Following category in the fixed order, wrapping around. Unknown names start over.
pub fn next_category(current: &str) -> &'static str {
    match CATEGORIES.iter().position(|c| *c == current) {
        Some(i) => CATEGORIES[(i + 1) % CATEGORIES.len()],
        None => CATEGORIES[0],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn prefix_badges(labels: &[String], k: usize) -> BadgeMap {
        labels.iter().take(k).map(|l| (l.clone(), 50)).collect()
    }

    #[test]
    fn prefix_of_length_k_unlocks_exactly_k() {
        let labels = default_labels();
        let n = labels.len();

        for k in 0..=n {
            let badges = prefix_badges(&labels, k);
            assert_eq!(first_unlocked_index(&labels, &badges), k);
            for idx in 0..=n as i64 + 1 {
                assert_eq!(
                    can_access(&labels, &badges, idx).unwrap(),
                    idx as usize <= k,
                    "k={} idx={}",
                    k,
                    idx
                );
            }
        }
    }

    #[test]
    fn gap_in_badges_locks_from_the_gap() {
        let labels = default_labels();
        let mut badges = BadgeMap::new();
        badges.insert("label1".into(), 100);
        badges.insert("label3".into(), 100);

        assert_eq!(first_unlocked_index(&labels, &badges), 1);
        assert!(!can_access(&labels, &badges, 2).unwrap());
    }

    #[test]
    fn negative_index_is_invalid() {
        let labels = default_labels();
        assert!(matches!(
            can_access(&labels, &BadgeMap::new(), -1),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn labels_sort_numerically() {
        let sorted = sort_labels(vec![
            "label10".into(),
            "bonus".into(),
            "label2".into(),
            "label1".into(),
        ]);
        assert_eq!(sorted, vec!["label1", "label2", "label10", "bonus"]);
    }

    #[test]
    fn next_category_wraps() {
        assert_eq!(next_category("Arts & Culture"), "History");
        assert_eq!(next_category("Animals & Wildlife"), "Arts & Culture");
        assert_eq!(next_category("Unknown"), "Arts & Culture");
    }

    #[test]
    fn unknown_category_is_not_found() {
        assert!(require_category("History").is_ok());
        assert!(matches!(require_category("Cooking"), Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn missing_content_falls_back_to_defaults() {
        let store = MemoryStore::new();
        let labels = labels_for(&store, "History").await.unwrap();
        assert_eq!(labels.len(), DEFAULT_LABEL_COUNT);
        assert_eq!(labels[0], "label1");
        assert_eq!(labels[31], "label32");
    }

    #[tokio::test]
    async fn configured_labels_are_read_and_ordered() {
        let store = MemoryStore::new();
        for label in ["label2", "label10", "label1"] {
            store
                .set(
                    &format!("categories/History/labels/{}/quizzes/0/question", label),
                    json!("q"),
                )
                .await
                .unwrap();
        }

        let labels = labels_for(&store, "History").await.unwrap();
        assert_eq!(labels, vec!["label1", "label2", "label10"]);
    }
}
