// src/services/identity.rs

//! Sign-up, sign-in, sign-out and profile edits on top of the auth provider
//! and the `users/{uid}` record.
//!
//! The user record is the source of truth for profile fields. The provider
//! profile is a best-effort mirror that sign-in re-synchronises.

use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::{
    auth::{Account, Identity},
    error::{AppError, AuthError},
    models::user::{UpdateProfileRequest, UserRecord},
    services::activity,
    state::AppState,
    store::{self, DocumentStore},
    utils::{
        avatar::{Avatar, avatar_for, avatar_from_photo, photo_payload},
        jwt::sign_jwt,
    },
};

/// Returned by sign-up, sign-in and profile edits.
#[derive(Debug, Serialize)]
pub struct AuthOutcome {
    pub token: String,
    pub user: Identity,
    /// Where the client goes next: `/admin` for admins, `/` otherwise.
    pub landing: &'static str,
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn user_path(uid: &str) -> String {
    format!("users/{}", uid)
}

/// Opens a new session and issues its token.
fn open_session(
    state: &AppState,
    uid: &str,
    email: &str,
    record: &UserRecord,
) -> Result<AuthOutcome, AppError> {
    let started = now_millis();
    let expires = started + state.config.jwt_expiration as i64 * 1000;
    let session_id = uuid::Uuid::new_v4().to_string();
    state.sessions.open(&session_id, uid, started, expires);

    let is_admin = record.is_admin || state.config.is_admin_email(email);
    let identity = Identity {
        uid: uid.to_string(),
        email: email.to_string(),
        display_name: record.display_name.clone(),
        is_admin,
        session_id,
        session_started: started,
        session_expires: expires,
    };
    reissue(state, identity)
}

fn reissue(state: &AppState, identity: Identity) -> Result<AuthOutcome, AppError> {
    let token = sign_jwt(&identity, &state.config.jwt_secret)?;
    let landing = if identity.is_admin { "/admin" } else { "/" };
    Ok(AuthOutcome {
        token,
        user: identity,
        landing,
    })
}

pub async fn sign_up(
    state: &AppState,
    email: &str,
    password: &str,
    display_name: &str,
) -> Result<AuthOutcome, AppError> {
    let display_name = display_name.trim();
    let account = state
        .auth
        .create_account(email, password, display_name)
        .await?;

    let is_admin = state.config.is_admin_email(&account.email);
    let record = UserRecord::new(display_name, &account.email, is_admin, now_millis());
    if let Err(e) = state
        .store
        .set(&user_path(&account.uid), store::to_value(&record)?)
        .await
    {
        // The next sign-in recreates the record from the account.
        tracing::error!(uid = %account.uid, "Account created but user record failed: {}", e);
        return Err(e.into());
    }

    tracing::info!(uid = %account.uid, is_admin, "User signed up");
    open_session(state, &account.uid, &account.email, &record)
}

/// Recreates a missing user record, or pushes the record's profile back to
/// the provider when the two disagree.
async fn repair_profile(state: &AppState, account: &Account) -> Result<UserRecord, AppError> {
    let path = user_path(&account.uid);
    let Some(record) = store::read::<UserRecord>(state.store.as_ref(), &path).await? else {
        tracing::warn!(uid = %account.uid, "User record missing, recreating from account");
        let record = UserRecord::new(
            &account.display_name,
            &account.email,
            state.config.is_admin_email(&account.email),
            now_millis(),
        );
        state.store.set(&path, store::to_value(&record)?).await?;
        return Ok(record);
    };

    let photo = photo_payload(
        record.avatar_icon.as_deref(),
        record.avatar_bg_color.as_deref(),
    );
    if account.display_name != record.display_name || account.photo_url != photo {
        tracing::info!(uid = %account.uid, "Re-synchronising provider profile");
        if let Err(e) = state
            .auth
            .update_profile(&account.uid, &record.display_name, photo.as_deref())
            .await
        {
            tracing::warn!(uid = %account.uid, "Provider profile repair failed: {}", e);
        }
    }
    Ok(record)
}

pub async fn sign_in(state: &AppState, email: &str, password: &str) -> Result<AuthOutcome, AppError> {
    let account = state.auth.verify_credentials(email, password).await?;
    let record = repair_profile(state, &account).await?;

    let mut fields = Map::new();
    fields.insert("lastActive".into(), json!(now_millis()));
    state.store.update(&user_path(&account.uid), fields).await?;

    tracing::info!(uid = %account.uid, "User signed in");
    open_session(state, &account.uid, &account.email, &record)
}

/// Always completes. A failed session write is logged and dropped.
pub async fn sign_out(state: &AppState, identity: &Identity) {
    let now = now_millis();
    let seconds = state.sessions.close(
        &identity.session_id,
        identity.session_started,
        identity.session_expires,
        now,
    );

    if let Err(e) = activity::log_session(state.store.as_ref(), &identity.uid, seconds as i64, now).await {
        tracing::warn!(uid = %identity.uid, "Could not log session on sign-out: {}", e);
    }
    tracing::info!(uid = %identity.uid, seconds, "User signed out");
}

/// Best-effort flush of the time spent so far. The session stays open and
/// its clock restarts.
pub async fn flush_session(state: &AppState, identity: &Identity) {
    let now = now_millis();
    let seconds = state.sessions.flush(
        &identity.session_id,
        &identity.uid,
        identity.session_started,
        identity.session_expires,
        now,
    );

    if let Err(e) = activity::log_session(state.store.as_ref(), &identity.uid, seconds as i64, now).await {
        tracing::warn!(uid = %identity.uid, "Session flush dropped: {}", e);
    }
}

/// Writes the user record in one merge, then mirrors the change to the
/// provider. A provider failure is repaired at the next sign-in.
pub async fn update_profile(
    state: &AppState,
    identity: &Identity,
    req: &UpdateProfileRequest,
) -> Result<AuthOutcome, AppError> {
    let display_name = req.display_name.trim();
    let clean = |v: &Option<String>| {
        v.as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    let icon = clean(&req.avatar_icon);
    let bg_color = clean(&req.avatar_bg_color);

    activity::require_user(state.store.as_ref(), &identity.uid).await?;

    let mut fields = Map::new();
    fields.insert("displayName".into(), json!(display_name));
    fields.insert("avatarIcon".into(), icon.clone().map_or(Value::Null, Value::String));
    fields.insert(
        "avatarBgColor".into(),
        bg_color.clone().map_or(Value::Null, Value::String),
    );
    state.store.update(&user_path(&identity.uid), fields).await?;

    let photo = photo_payload(icon.as_deref(), bg_color.as_deref());
    if let Err(e) = state
        .auth
        .update_profile(&identity.uid, display_name, photo.as_deref())
        .await
    {
        tracing::warn!(uid = %identity.uid, "Provider profile update failed, will repair at sign-in: {}", e);
    }

    reissue(
        state,
        Identity {
            display_name: display_name.to_string(),
            ..identity.clone()
        },
    )
}

/// Avatar for a user record. Records without avatar fields fall back to the
/// provider's photo payload, and anything unreadable there shows initials.
pub async fn avatar_of(state: &AppState, uid: &str, record: &UserRecord) -> Avatar {
    if record.avatar_icon.is_some() || record.avatar_bg_color.is_some() {
        return avatar_for(
            &record.display_name,
            record.avatar_icon.as_deref(),
            record.avatar_bg_color.as_deref(),
        );
    }

    let photo = match state.auth.account(uid).await {
        Ok(account) => account.and_then(|a| a.photo_url),
        Err(e) => {
            tracing::warn!(%uid, "Provider profile unavailable for avatar: {}", e);
            None
        }
    };
    avatar_from_photo(&record.display_name, photo.as_deref())
}

/// Removes the user record, then the account. An account already gone is fine.
pub async fn delete_user(state: &AppState, uid: &str) -> Result<(), AppError> {
    store::tree::check_key(uid)?;
    let path = user_path(uid);
    if state.store.get(&path).await?.is_none() {
        return Err(AppError::NotFound(format!("User '{}' not found", uid)));
    }
    state.store.remove(&path).await?;
    let revoked = state.sessions.revoke_user(uid, now_millis());

    match state.auth.delete_account(uid).await {
        Ok(()) | Err(AppError::NotFound(_)) => {}
        Err(e) => tracing::warn!(%uid, "User record removed but account deletion failed: {}", e),
    }
    tracing::info!(%uid, revoked, "User deleted");
    Ok(())
}

/// Creates the configured admin account on first start. Existing accounts
/// only get their record's admin flag set.
pub async fn seed_admin(state: &AppState) -> Result<(), AppError> {
    let (Some(email), Some(password)) = (
        state.config.admin_seed_email.as_deref(),
        state.config.admin_seed_password.as_deref(),
    ) else {
        return Ok(());
    };

    let account = match state.auth.create_account(email, password, "Admin").await {
        Ok(account) => {
            tracing::info!(uid = %account.uid, "Seeded admin account");
            account
        }
        Err(AppError::Auth(AuthError::DuplicateAccount(_))) => {
            state.auth.verify_credentials(email, password).await?
        }
        Err(e) => return Err(e),
    };

    let path = user_path(&account.uid);
    match store::read::<UserRecord>(state.store.as_ref(), &path).await? {
        Some(record) if record.is_admin => {}
        Some(_) => {
            let mut fields = Map::new();
            fields.insert("isAdmin".into(), json!(true));
            state.store.update(&path, fields).await?;
        }
        None => {
            let record = UserRecord::new(&account.display_name, &account.email, true, now_millis());
            state.store.set(&path, store::to_value(&record)?).await?;
        }
    }
    Ok(())
}
