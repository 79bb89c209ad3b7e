// src/auth/mod.rs

//! Identity provider seam and the per-request identity state.

pub mod local;
pub mod session;

use std::convert::Infallible;

use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use serde::Serialize;

use crate::error::{AppError, AuthError};

pub use local::LocalAuthProvider;
pub use session::SessionTracker;

/// An account as the identity provider sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub uid: String,
    pub email: String,
    pub display_name: String,
    /// Opaque avatar payload, see `utils::avatar::photo_payload`.
    pub photo_url: Option<String>,
}

/// Account creation, credential checks and the provider-side profile.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Fails with `DuplicateAccount` or `WeakCredential`.
    async fn create_account(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<Account, AppError>;

    /// Fails with `InvalidCredential` for unknown emails and wrong passwords alike.
    async fn verify_credentials(&self, email: &str, password: &str) -> Result<Account, AppError>;

    async fn account(&self, uid: &str) -> Result<Option<Account>, AppError>;

    async fn update_profile(
        &self,
        uid: &str,
        display_name: &str,
        photo_url: Option<&str>,
    ) -> Result<(), AppError>;

    async fn delete_account(&self, uid: &str) -> Result<(), AppError>;
}

/// The signed-in user of one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub uid: String,
    pub email: String,
    pub display_name: String,
    pub is_admin: bool,
    #[serde(skip)]
    pub session_id: String,
    /// Unix millis when the session was opened.
    #[serde(skip)]
    pub session_started: i64,
    /// Unix millis when every token of the session expires.
    #[serde(skip)]
    pub session_expires: i64,
}

/// Who is calling. `Unresolved` until the identity middleware has looked at
/// the request, which is different from being signed out.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthState {
    #[default]
    Unresolved,
    Authenticated(Identity),
    Anonymous,
}

impl AuthState {
    pub fn identity(&self) -> Result<&Identity, AuthError> {
        match self {
            AuthState::Authenticated(identity) => Ok(identity),
            AuthState::Anonymous => Err(AuthError::NotAuthenticated),
            AuthState::Unresolved => Err(AuthError::IdentityUnresolved),
        }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for AuthState {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<AuthState>()
            .cloned()
            .unwrap_or_default())
    }
}
