// src/config.rs

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

use dotenvy::dotenv;
use thiserror::Error;

/// Fixed topic order. Also drives the "next category" link.
pub const CATEGORIES: [&str; 16] = [
    "Arts & Culture",
    "History",
    "Science & Nature",
    "Geography",
    "Literature",
    "Movies & TV Shows",
    "Sports",
    "Technology",
    "Food & Drink",
    "General Knowledge",
    "Mythology",
    "Vocabulary",
    "Health & Wellness",
    "World Religions",
    "Space & Astronomy",
    "Animals & Wildlife",
];

/// Label count used when a category has no content configured yet.
pub const DEFAULT_LABEL_COUNT: usize = 32;
pub const QUESTIONS_PER_LABEL: usize = 10;
pub const OPTIONS_PER_QUESTION: usize = 4;
pub const POINTS_PER_CORRECT: u32 = 10;
pub const MAX_LABEL_SCORE: u32 = 100;

/// Configured ceilings for the progress bars. Not recomputed from content.
pub const MAX_CATEGORY_SCORE: u64 = 9_600;
pub const MAX_TOTAL_SCORE: u64 = 153_600;

pub fn is_known_category(name: &str) -> bool {
    CATEGORIES.contains(&name)
}

/// How a re-attempt of an already completed label is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttemptPolicy {
    /// Last attempt wins, even when it scores lower.
    #[default]
    Overwrite,
    /// Keep the highest score seen for the label.
    Best,
}

impl FromStr for AttemptPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "overwrite" => Ok(Self::Overwrite),
            "best" => Ok(Self::Best),
            other => Err(ConfigError::Invalid {
                key: "ATTEMPT_POLICY",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub log_dir: String,
    pub bind_addr: SocketAddr,
    /// Lower-cased allow-list; membership grants the admin flag at sign-up.
    pub admin_emails: Vec<String>,
    pub attempt_policy: AttemptPolicy,
    pub admin_seed_email: Option<String>,
    pub admin_seed_password: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url =
            lookup("DATABASE_URL").unwrap_or_else(|| "sqlite://quiz.db?mode=rwc".to_string());

        let jwt_secret = lookup("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let jwt_expiration = match lookup("JWT_EXPIRATION") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "JWT_EXPIRATION",
                value: raw,
            })?,
            None => 86_400,
        };

        let rust_log = lookup("RUST_LOG").unwrap_or_else(|| "info".to_string());
        let log_dir = lookup("LOG_DIR").unwrap_or_else(|| "logs".to_string());

        let bind_addr = match lookup("BIND_ADDR") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "BIND_ADDR",
                value: raw,
            })?,
            None => SocketAddr::from(([0, 0, 0, 0], 3000)),
        };

        let admin_emails = lookup("ADMIN_EMAILS")
            .map(|raw| parse_email_list(&raw))
            .unwrap_or_default();

        let attempt_policy = match lookup("ATTEMPT_POLICY") {
            Some(raw) => raw.parse()?,
            None => AttemptPolicy::default(),
        };

        Ok(Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            log_dir,
            bind_addr,
            admin_emails,
            attempt_policy,
            admin_seed_email: lookup("ADMIN_SEED_EMAIL"),
            admin_seed_password: lookup("ADMIN_SEED_PASSWORD"),
        })
    }

    pub fn is_admin_email(&self, email: &str) -> bool {
        let email = email.trim().to_lowercase();
        self.admin_emails.iter().any(|e| *e == email)
    }
}

fn parse_email_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn jwt_secret_is_required() {
        let err = Config::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("JWT_SECRET")));
    }

    #[test]
    fn admin_list_is_trimmed_and_case_insensitive() {
        let config = Config::from_lookup(lookup_from(&[
            ("JWT_SECRET", "s"),
            ("ADMIN_EMAILS", " Boss@Example.com, ,ops@example.com "),
        ]))
        .unwrap();

        assert_eq!(config.admin_emails, vec!["boss@example.com", "ops@example.com"]);
        assert!(config.is_admin_email("BOSS@example.com"));
        assert!(!config.is_admin_email("someone@example.com"));
    }

    #[test]
    fn defaults_apply() {
        let config = Config::from_lookup(lookup_from(&[("JWT_SECRET", "s")])).unwrap();
        assert_eq!(config.jwt_expiration, 86_400);
        assert_eq!(config.attempt_policy, AttemptPolicy::Overwrite);
        assert_eq!(config.bind_addr.port(), 3000);
    }

    #[test]
    fn bad_policy_is_rejected() {
        let err = Config::from_lookup(lookup_from(&[
            ("JWT_SECRET", "s"),
            ("ATTEMPT_POLICY", "sometimes"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "ATTEMPT_POLICY", .. }));
    }

    #[test]
    fn ceilings_are_consistent() {
        assert_eq!(MAX_TOTAL_SCORE, MAX_CATEGORY_SCORE * CATEGORIES.len() as u64);
    }
}
