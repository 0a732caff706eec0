use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::{request::Parts, HeaderMap, StatusCode},
    Json,
};
use rand::Rng;
use sha2::{Digest, Sha256};
use std::sync::Arc;

use super::error::ApiError;
use crate::db::{
    now_local, Doctor, DoctorLoginLog, LoginRequest, LoginResponse, Role, Session,
    SessionContext, User,
};
use crate::AppState;

/// Format of `sessions.expires_at`, comparable with SQLite's `datetime('now')`
const SESSION_EXPIRY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Generate a random token
fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();
    hex::encode(bytes)
}

/// Hash a token for storage
fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Bearer token from the Authorization header
fn extract_token(headers: &HeaderMap) -> Option<String> {
    let header = headers.get("Authorization").and_then(|h| h.to_str().ok())?;
    header
        .strip_prefix("Bearer ")
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Resolve the session context behind a bearer token
pub async fn resolve_session(
    db: &sqlx::SqlitePool,
    token: &str,
) -> Result<Option<SessionContext>, sqlx::Error> {
    let Some(session) = Session::find_active(db, &hash_token(token)).await? else {
        return Ok(None);
    };

    let Some(user) = User::find(db, &session.username).await? else {
        return Ok(None);
    };
    let Some(role) = user.role_enum() else {
        return Ok(None);
    };

    let doctor = match role {
        Role::Doctor => Doctor::find_by_username(db, &user.username).await?,
        Role::Admin => None,
    };

    Ok(Some(SessionContext {
        username: user.username,
        role,
        doctor,
    }))
}

/// Login endpoint
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user = User::find(&state.db, request.username.trim()).await?;

    let user = match user {
        Some(u) if verify_password(&request.password, &u.password_hash) => u,
        _ => {
            tracing::warn!(username = %request.username, "Failed login attempt");
            return Err(ApiError::unauthorized("Invalid credentials"));
        }
    };

    // A doctor cannot use the admin portal and vice versa
    if user.role_enum() != Some(request.role) {
        tracing::warn!(
            username = %user.username,
            portal = %request.role,
            "Login rejected for wrong portal"
        );
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    let doctor = match request.role {
        Role::Doctor => {
            let doctor = Doctor::find_by_username(&state.db, &user.username)
                .await?
                .ok_or_else(|| ApiError::forbidden("No doctor profile for this account"))?;
            DoctorLoginLog::record_login(&state.db, &doctor.id, now_local()).await?;
            Some(doctor)
        }
        Role::Admin => None,
    };

    let token = generate_token();
    let expires_at = chrono::TimeDelta::try_hours(state.config.auth.session_ttl_hours)
        .and_then(|ttl| chrono::Utc::now().checked_add_signed(ttl))
        .ok_or_else(|| ApiError::internal("Invalid session lifetime"))?
        .format(SESSION_EXPIRY_FORMAT)
        .to_string();

    Session::create(&state.db, &user.username, &hash_token(&token), &expires_at).await?;

    tracing::info!(username = %user.username, role = %request.role, "User logged in");

    Ok(Json(LoginResponse {
        token,
        session: SessionContext {
            username: user.username,
            role: request.role,
            doctor,
        },
    }))
}

/// Logout endpoint. Closes a doctor's open shift and ends the session.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let token = extract_token(&headers).ok_or_else(|| ApiError::unauthorized("Not logged in"))?;
    let session = resolve_session(&state.db, &token)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Session expired or invalid"))?;

    if let Some(doctor) = &session.doctor {
        DoctorLoginLog::record_logout(&state.db, &doctor.id, now_local()).await?;
    }
    Session::delete(&state.db, &hash_token(&token)).await?;

    tracing::info!(username = %session.username, "User logged out");
    Ok(StatusCode::NO_CONTENT)
}

/// Current session
pub async fn me(session: SessionContext) -> Json<SessionContext> {
    Json(session)
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for SessionContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_token(&parts.headers)
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;
        resolve_session(&state.db, &token)
            .await?
            .ok_or_else(|| ApiError::unauthorized("Session expired or invalid"))
    }
}

/// Session of a logged-in admin
pub struct AdminSession(pub SessionContext);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AdminSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let session = SessionContext::from_request_parts(parts, state).await?;
        if !session.is_admin() {
            return Err(ApiError::forbidden("Admin access required"));
        }
        Ok(AdminSession(session))
    }
}

/// Session of a logged-in doctor, with the doctor profile resolved
pub struct DoctorSession {
    pub session: SessionContext,
    pub doctor: Doctor,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for DoctorSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let session = SessionContext::from_request_parts(parts, state).await?;
        match session.doctor.clone() {
            Some(doctor) if session.role == Role::Doctor => Ok(DoctorSession { session, doctor }),
            _ => Err(ApiError::forbidden("Doctor access required")),
        }
    }
}
