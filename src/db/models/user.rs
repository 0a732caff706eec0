//! User credential and session models.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

use super::Doctor;

/// Portal a credential belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Doctor,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Doctor => write!(f, "doctor"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "doctor" => Ok(Role::Doctor),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
    pub created_at: String,
}

impl User {
    /// Parsed role. Unknown values never authenticate.
    pub fn role_enum(&self) -> Option<Role> {
        self.role.parse().ok()
    }

    pub async fn find(db: &SqlitePool, username: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(db)
            .await
    }

    pub async fn create(
        db: &SqlitePool,
        username: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO users (username, password_hash, role) VALUES (?, ?, ?)")
            .bind(username)
            .bind(password_hash)
            .bind(role.to_string())
            .execute(db)
            .await?;
        Ok(())
    }

    pub async fn count_with_role(db: &SqlitePool, role: Role) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE role = ?")
            .bind(role.to_string())
            .fetch_one(db)
            .await?;
        Ok(count)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Session {
    pub id: String,
    pub username: String,
    pub token_hash: String,
    pub expires_at: String,
    pub created_at: String,
}

impl Session {
    pub async fn create(
        db: &SqlitePool,
        username: &str,
        token_hash: &str,
        expires_at: &str,
    ) -> Result<(), sqlx::Error> {
        let id = uuid::Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO sessions (id, username, token_hash, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(username)
        .bind(token_hash)
        .bind(expires_at)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Find a session by token hash that has not expired yet
    pub async fn find_active(
        db: &SqlitePool,
        token_hash: &str,
    ) -> Result<Option<Session>, sqlx::Error> {
        sqlx::query_as(
            "SELECT * FROM sessions WHERE token_hash = ? AND expires_at > datetime('now')",
        )
        .bind(token_hash)
        .fetch_optional(db)
        .await
    }

    pub async fn delete(db: &SqlitePool, token_hash: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
            .bind(token_hash)
            .execute(db)
            .await?;
        Ok(result.rows_affected())
    }
}

/// Who is logged in for the current request.
///
/// Resolved from the bearer token on every request and handed to handlers
/// explicitly, so nothing about the logged-in user lives in process globals.
#[derive(Debug, Clone, Serialize)]
pub struct SessionContext {
    pub username: String,
    pub role: Role,
    /// Doctor profile when `role` is `Doctor`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doctor: Option<Doctor>,
}

impl SessionContext {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// True when the session belongs to the given doctor
    pub fn is_doctor(&self, doctor_id: &str) -> bool {
        self.doctor.as_ref().map(|d| d.id == doctor_id).unwrap_or(false)
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    /// Portal the user is logging into
    pub role: Role,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub session: SessionContext,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        assert_eq!("Admin".parse::<Role>(), Ok(Role::Admin));
        assert_eq!("doctor".parse::<Role>(), Ok(Role::Doctor));
        assert!("nurse".parse::<Role>().is_err());
        assert_eq!(Role::Doctor.to_string(), "doctor");
    }

    #[test]
    fn test_session_context_doctor_match() {
        let ctx = SessionContext {
            username: "asmith".to_string(),
            role: Role::Doctor,
            doctor: Some(Doctor {
                id: "d-1".to_string(),
                name: "Alice Smith".to_string(),
                specialization: "Cardiology".to_string(),
                username: "asmith".to_string(),
                is_on_duty: false,
            }),
        };
        assert!(ctx.is_doctor("d-1"));
        assert!(!ctx.is_doctor("d-2"));
        assert!(!ctx.is_admin());
    }
}
