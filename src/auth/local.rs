// src/auth/local.rs

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tokio::sync::Mutex;

use super::{Account, AuthProvider};
use crate::{
    error::{AppError, AuthError},
    store::{self, DocumentStore},
    utils::hash::{check_password_policy, hash_password, verify_password},
};

/// `accounts/{uid}`. Never exposed through the HTTP surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountRecord {
    email: String,
    password_hash: String,
    display_name: String,
    #[serde(default)]
    photo_url: Option<String>,
    created_at: i64,
}

impl AccountRecord {
    fn into_account(self, uid: &str) -> Account {
        Account {
            uid: uid.to_string(),
            email: self.email,
            display_name: self.display_name,
            photo_url: self.photo_url,
        }
    }
}

/// Identity provider kept in the same document store as the app data,
/// under `accounts/` plus an `accountEmails/` index.
///
/// `index_lock` is held from the duplicate check to the index write, so one
/// email maps to at most one account.
pub struct LocalAuthProvider {
    store: Arc<dyn DocumentStore>,
    index_lock: Mutex<()>,
}

impl LocalAuthProvider {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            index_lock: Mutex::new(()),
        }
    }

    async fn uid_for_email(&self, email: &str) -> Result<Option<String>, AppError> {
        let path = format!("accountEmails/{}", email_key(email));
        Ok(store::read::<String>(self.store.as_ref(), &path).await?)
    }

    async fn record(&self, uid: &str) -> Result<Option<AccountRecord>, AppError> {
        store::tree::check_key(uid)?;
        Ok(store::read(self.store.as_ref(), &format!("accounts/{}", uid)).await?)
    }
}

/// Index key for an email: case-folded, with characters the store reserves
/// percent-encoded.
fn email_key(email: &str) -> String {
    let mut key = String::new();
    for c in email.trim().to_lowercase().chars() {
        match c {
            '%' | '.' | '#' | '$' | '[' | ']' | '/' => key.push_str(&format!("%{:02X}", c as u32)),
            other => key.push(other),
        }
    }
    key
}

#[async_trait]
impl AuthProvider for LocalAuthProvider {
    async fn create_account(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<Account, AppError> {
        check_password_policy(password)?;
        let password_hash = hash_password(password)?;

        let email = email.trim();
        let _guard = self.index_lock.lock().await;
        if self.uid_for_email(email).await?.is_some() {
            return Err(AuthError::DuplicateAccount(email.to_string()).into());
        }

        let uid = uuid::Uuid::new_v4().simple().to_string();
        let record = AccountRecord {
            email: email.to_string(),
            password_hash,
            display_name: display_name.to_string(),
            photo_url: None,
            created_at: chrono::Utc::now().timestamp_millis(),
        };

        let mut fields = Map::new();
        fields.insert(format!("accounts/{}", uid), store::to_value(&record)?);
        fields.insert(format!("accountEmails/{}", email_key(email)), json!(uid));
        self.store.update("", fields).await?;

        tracing::info!(%uid, "Account created");
        Ok(record.into_account(&uid))
    }

    async fn verify_credentials(&self, email: &str, password: &str) -> Result<Account, AppError> {
        let uid = self
            .uid_for_email(email)
            .await?
            .ok_or(AuthError::InvalidCredential)?;
        let record = self.record(&uid).await?.ok_or(AuthError::InvalidCredential)?;

        if !verify_password(password, &record.password_hash)? {
            return Err(AuthError::InvalidCredential.into());
        }
        Ok(record.into_account(&uid))
    }

    async fn account(&self, uid: &str) -> Result<Option<Account>, AppError> {
        Ok(self.record(uid).await?.map(|r| r.into_account(uid)))
    }

    async fn update_profile(
        &self,
        uid: &str,
        display_name: &str,
        photo_url: Option<&str>,
    ) -> Result<(), AppError> {
        if self.record(uid).await?.is_none() {
            return Err(AppError::NotFound("Account not found".to_string()));
        }

        let mut fields = Map::new();
        fields.insert("displayName".into(), json!(display_name));
        fields.insert(
            "photoUrl".into(),
            photo_url.map_or(Value::Null, |p| json!(p)),
        );
        self.store.update(&format!("accounts/{}", uid), fields).await?;
        Ok(())
    }

    async fn delete_account(&self, uid: &str) -> Result<(), AppError> {
        let _guard = self.index_lock.lock().await;
        let record = self
            .record(uid)
            .await?
            .ok_or_else(|| AppError::NotFound("Account not found".to_string()))?;

        let mut fields = Map::new();
        fields.insert(format!("accounts/{}", uid), Value::Null);
        fields.insert(format!("accountEmails/{}", email_key(&record.email)), Value::Null);
        self.store.update("", fields).await?;
        Ok(())
    }
}
