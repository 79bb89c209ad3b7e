// src/utils/jwt.rs

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{
    auth::{AuthState, Identity},
    error::{AppError, AuthError},
    state::AppState,
};

/// JWT Claims structure.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    /// Subject - the user's uid.
    pub sub: String,
    pub email: String,
    pub name: String,
    pub admin: bool,
    /// Session id, revoked on sign-out.
    pub sid: String,
    /// Session start as Unix millis.
    pub started: i64,
    /// Expiration time as Unix timestamp.
    pub exp: usize,
}

impl From<Claims> for Identity {
    fn from(claims: Claims) -> Self {
        Identity {
            uid: claims.sub,
            email: claims.email,
            display_name: claims.name,
            is_admin: claims.admin,
            session_id: claims.sid,
            session_started: claims.started,
            session_expires: claims.exp as i64 * 1000,
        }
    }
}

/// Signs a token for an open session. Every token of one session shares the
/// session's expiry, so a re-issued token never outlives a revocation.
pub fn sign_jwt(identity: &Identity, secret: &str) -> Result<String, AppError> {
    let expiration = usize::try_from(identity.session_expires / 1000)
        .map_err(|_| AppError::InternalServerError("session expiry before epoch".to_string()))?;

    let claims = Claims {
        sub: identity.uid.clone(),
        email: identity.email.clone(),
        name: identity.display_name.clone(),
        admin: identity.is_admin,
        sid: identity.session_id.clone(),
        started: identity.session_started,
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Verifies and decodes a JWT string.
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AuthError> {
    // Revocations are forgotten at `exp`, so no leeway past it.
    let mut validation = Validation::default();
    validation.leeway = 0;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|_| AuthError::NotAuthenticated)
}

fn bearer_token(req: &Request<Body>) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

/// Axum Middleware: identity resolution.
///
/// Runs on every request and records an [`AuthState`] in the extensions:
/// `Authenticated` for a valid, unrevoked bearer token, `Anonymous` otherwise.
pub async fn resolve_identity(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let auth_state = match bearer_token(&req).map(|t| verify_jwt(t, &state.config.jwt_secret)) {
        Some(Ok(claims)) if !state.sessions.is_revoked(&claims.sid) => {
            AuthState::Authenticated(claims.into())
        }
        Some(Ok(_)) => {
            tracing::debug!("Rejected token of a signed-out session");
            AuthState::Anonymous
        }
        Some(Err(_)) => {
            tracing::debug!("Rejected invalid bearer token");
            AuthState::Anonymous
        }
        None => AuthState::Anonymous,
    };

    req.extensions_mut().insert(auth_state);
    next.run(req).await
}

/// Axum Middleware: Authentication.
///
/// Must be used AFTER `resolve_identity`. Injects the caller's [`Identity`]
/// for handlers to use; anonymous callers get 401.
pub async fn auth_middleware(mut req: Request<Body>, next: Next) -> Result<Response, AppError> {
    let identity = req
        .extensions()
        .get::<AuthState>()
        .cloned()
        .unwrap_or_default()
        .identity()?
        .clone();

    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}

/// Axum Middleware: Admin Authorization.
///
/// Must be used AFTER `auth_middleware`. Non-admins get 403.
pub async fn admin_middleware(req: Request<Body>, next: Next) -> Result<Response, AppError> {
    let identity = req
        .extensions()
        .get::<Identity>()
        .ok_or(AuthError::NotAuthenticated)?;

    if !identity.is_admin {
        return Err(AppError::Forbidden("Access denied".to_string()));
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Whole seconds, so the expiry survives the trip through `exp`.
    fn in_a_minute() -> i64 {
        (chrono::Utc::now().timestamp() + 60) * 1000
    }

    fn identity() -> Identity {
        Identity {
            uid: "u1".into(),
            email: "ada@example.com".into(),
            display_name: "Ada".into(),
            is_admin: true,
            session_id: "s1".into(),
            session_started: 1_700_000_000_000,
            session_expires: in_a_minute(),
        }
    }

    #[test]
    fn token_round_trips_identity() {
        let identity = identity();
        let token = sign_jwt(&identity, "secret").unwrap();
        let claims = verify_jwt(&token, "secret").unwrap();
        assert_eq!(Identity::from(claims), identity);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = sign_jwt(&identity(), "secret").unwrap();
        assert_eq!(
            verify_jwt(&token, "other").unwrap_err(),
            AuthError::NotAuthenticated
        );
    }

    #[test]
    fn expired_session_is_rejected() {
        let mut expired = identity();
        expired.session_expires = (chrono::Utc::now().timestamp() - 5) * 1000;
        let token = sign_jwt(&expired, "secret").unwrap();
        assert_eq!(
            verify_jwt(&token, "secret").unwrap_err(),
            AuthError::NotAuthenticated
        );
    }
}
