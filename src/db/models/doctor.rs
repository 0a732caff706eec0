//! Doctor, weekly availability and shift log models.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteConnection, SqlitePool};

use super::common::{format_datetime, format_time, parse_time, parse_weekday, weekday_to_db};
use crate::engine::WeeklyWindow;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Doctor {
    pub id: String,
    pub name: String,
    pub specialization: String,
    pub username: String,
    pub is_on_duty: bool,
}

impl Doctor {
    pub async fn list_all(db: &SqlitePool) -> Result<Vec<Doctor>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM doctors ORDER BY name")
            .fetch_all(db)
            .await
    }

    pub async fn list_on_duty(db: &SqlitePool) -> Result<Vec<Doctor>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM doctors WHERE is_on_duty = 1 ORDER BY name")
            .fetch_all(db)
            .await
    }

    pub async fn list_by_specialization(
        db: &SqlitePool,
        specialization: &str,
    ) -> Result<Vec<Doctor>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM doctors WHERE specialization = ? ORDER BY name")
            .bind(specialization)
            .fetch_all(db)
            .await
    }

    pub async fn find(db: &SqlitePool, id: &str) -> Result<Option<Doctor>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM doctors WHERE id = ?")
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn find_by_username(
        db: &SqlitePool,
        username: &str,
    ) -> Result<Option<Doctor>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM doctors WHERE username = ?")
            .bind(username)
            .fetch_optional(db)
            .await
    }

    /// Insert a doctor profile. The credential row must already exist.
    pub async fn create(
        db: &SqlitePool,
        name: &str,
        specialization: &str,
        username: &str,
    ) -> Result<Doctor, sqlx::Error> {
        let doctor = Doctor {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            specialization: specialization.to_string(),
            username: username.to_string(),
            is_on_duty: false,
        };

        sqlx::query(
            "INSERT INTO doctors (id, name, specialization, username, is_on_duty) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&doctor.id)
        .bind(&doctor.name)
        .bind(&doctor.specialization)
        .bind(&doctor.username)
        .bind(doctor.is_on_duty)
        .execute(db)
        .await?;

        Ok(doctor)
    }

    /// Set the on-duty flag, returning false when the doctor does not exist
    pub async fn set_on_duty(
        db: &SqlitePool,
        id: &str,
        on_duty: bool,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE doctors SET is_on_duty = ? WHERE id = ?")
            .bind(on_duty)
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// One recurring weekly availability window
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DoctorAvailability {
    pub id: i64,
    pub doctor_id: String,
    pub day_of_week: String,
    pub start_time: String,
    pub end_time: String,
}

impl DoctorAvailability {
    /// Convert to the slot calculator's window type, `None` for malformed rows
    pub fn to_window(&self) -> Option<WeeklyWindow> {
        Some(WeeklyWindow {
            day: parse_weekday(&self.day_of_week)?,
            start: parse_time(&self.start_time)?,
            end: parse_time(&self.end_time)?,
        })
    }

    pub async fn list_for_doctor(
        db: &SqlitePool,
        doctor_id: &str,
    ) -> Result<Vec<DoctorAvailability>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM doctor_availability WHERE doctor_id = ? ORDER BY id")
            .bind(doctor_id)
            .fetch_all(db)
            .await
    }

    /// Windows of a doctor in storage order, skipping rows that do not parse
    pub async fn windows_for_doctor(
        db: &SqlitePool,
        doctor_id: &str,
    ) -> Result<Vec<WeeklyWindow>, sqlx::Error> {
        let rows = Self::list_for_doctor(db, doctor_id).await?;
        Ok(rows
            .iter()
            .filter_map(|row| {
                let window = row.to_window();
                if window.is_none() {
                    tracing::warn!(
                        availability_id = row.id,
                        doctor_id = %row.doctor_id,
                        "Skipping malformed availability window"
                    );
                }
                window
            })
            .collect())
    }

    pub async fn create(
        db: &SqlitePool,
        doctor_id: &str,
        window: &WeeklyWindow,
    ) -> Result<DoctorAvailability, sqlx::Error> {
        let day_of_week = weekday_to_db(window.day);
        let start_time = format_time(window.start);
        let end_time = format_time(window.end);

        let result = sqlx::query(
            "INSERT INTO doctor_availability (doctor_id, day_of_week, start_time, end_time) VALUES (?, ?, ?, ?)",
        )
        .bind(doctor_id)
        .bind(day_of_week)
        .bind(&start_time)
        .bind(&end_time)
        .execute(db)
        .await?;

        Ok(DoctorAvailability {
            id: result.last_insert_rowid(),
            doctor_id: doctor_id.to_string(),
            day_of_week: day_of_week.to_string(),
            start_time,
            end_time,
        })
    }
}

/// Request to add an availability window
#[derive(Debug, Deserialize)]
pub struct CreateAvailabilityRequest {
    pub day_of_week: String,
    pub start_time: String,
    pub end_time: String,
}

/// Request to change a doctor's on-duty flag
#[derive(Debug, Deserialize)]
pub struct UpdateDutyRequest {
    pub on_duty: bool,
}

/// Shift log row. An open row (no logout) means the doctor is logged in.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DoctorLoginLog {
    pub id: String,
    pub doctor_id: String,
    pub login_time: String,
    pub logout_time: Option<String>,
}

impl DoctorLoginLog {
    /// Close any open shift of the doctor and open a new one
    pub async fn record_login(
        db: &SqlitePool,
        doctor_id: &str,
        at: NaiveDateTime,
    ) -> Result<(), sqlx::Error> {
        let mut tx = db.begin().await?;
        close_open(&mut *tx, doctor_id, at).await?;

        sqlx::query("INSERT INTO doctor_login_status (id, doctor_id, login_time) VALUES (?, ?, ?)")
            .bind(uuid::Uuid::new_v4().to_string())
            .bind(doctor_id)
            .bind(format_datetime(at))
            .execute(&mut *tx)
            .await?;

        tx.commit().await
    }

    /// Close the doctor's open shift, returning how many rows were closed
    pub async fn record_logout(
        db: &SqlitePool,
        doctor_id: &str,
        at: NaiveDateTime,
    ) -> Result<u64, sqlx::Error> {
        let mut conn = db.acquire().await?;
        close_open(&mut *conn, doctor_id, at).await
    }

    pub async fn latest(
        db: &SqlitePool,
        doctor_id: &str,
    ) -> Result<Option<DoctorLoginLog>, sqlx::Error> {
        sqlx::query_as(
            "SELECT * FROM doctor_login_status WHERE doctor_id = ? ORDER BY login_time DESC LIMIT 1",
        )
        .bind(doctor_id)
        .fetch_optional(db)
        .await
    }
}

async fn close_open(
    conn: &mut SqliteConnection,
    doctor_id: &str,
    at: NaiveDateTime,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE doctor_login_status SET logout_time = ? WHERE doctor_id = ? AND logout_time IS NULL",
    )
    .bind(format_datetime(at))
    .bind(doctor_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginState {
    LoggedIn,
    LoggedOut,
    Unknown,
}

impl std::fmt::Display for LoginState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LoggedIn => write!(f, "logged in"),
            Self::LoggedOut => write!(f, "logged out"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Login state derived from a doctor's latest shift row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginStatus {
    pub state: LoginState,
    /// Login time while logged in, logout time once logged out
    pub since: Option<String>,
}

impl LoginStatus {
    pub fn from_latest(latest: Option<&DoctorLoginLog>) -> Self {
        match latest {
            Some(log) => match &log.logout_time {
                None => Self {
                    state: LoginState::LoggedIn,
                    since: Some(log.login_time.clone()),
                },
                Some(logout) => Self {
                    state: LoginState::LoggedOut,
                    since: Some(logout.clone()),
                },
            },
            None => Self {
                state: LoginState::Unknown,
                since: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{init_in_memory, Role, User};
    use chrono::{NaiveDate, NaiveTime, Weekday};

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 3)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    async fn doctor(db: &SqlitePool) -> Doctor {
        User::create(db, "asmith", "hash", Role::Doctor).await.unwrap();
        Doctor::create(db, "Alice Smith", "Cardiology", "asmith")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_login_closes_previous_shift() {
        let db = init_in_memory().await.unwrap();
        let doc = doctor(&db).await;

        DoctorLoginLog::record_login(&db, &doc.id, at(8, 0)).await.unwrap();
        DoctorLoginLog::record_login(&db, &doc.id, at(9, 0)).await.unwrap();

        let (open,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM doctor_login_status WHERE doctor_id = ? AND logout_time IS NULL",
        )
        .bind(&doc.id)
        .fetch_one(&db)
        .await
        .unwrap();
        assert_eq!(open, 1);

        let latest = DoctorLoginLog::latest(&db, &doc.id).await.unwrap().unwrap();
        assert_eq!(latest.login_time, "2025-03-03 09:00:00");
        assert!(latest.logout_time.is_none());
    }

    #[tokio::test]
    async fn test_logout_and_status() {
        let db = init_in_memory().await.unwrap();
        let doc = doctor(&db).await;

        let status = LoginStatus::from_latest(None);
        assert_eq!(status.state, LoginState::Unknown);

        DoctorLoginLog::record_login(&db, &doc.id, at(8, 0)).await.unwrap();
        let latest = DoctorLoginLog::latest(&db, &doc.id).await.unwrap();
        assert_eq!(
            LoginStatus::from_latest(latest.as_ref()).state,
            LoginState::LoggedIn
        );

        let closed = DoctorLoginLog::record_logout(&db, &doc.id, at(12, 30))
            .await
            .unwrap();
        assert_eq!(closed, 1);

        let latest = DoctorLoginLog::latest(&db, &doc.id).await.unwrap();
        let status = LoginStatus::from_latest(latest.as_ref());
        assert_eq!(status.state, LoginState::LoggedOut);
        assert_eq!(status.since.as_deref(), Some("2025-03-03 12:30:00"));
    }

    #[tokio::test]
    async fn test_duty_flag_and_lookups() {
        let db = init_in_memory().await.unwrap();
        let doc = doctor(&db).await;

        assert!(Doctor::list_on_duty(&db).await.unwrap().is_empty());
        assert!(Doctor::set_on_duty(&db, &doc.id, true).await.unwrap());
        assert!(!Doctor::set_on_duty(&db, "missing", true).await.unwrap());

        let on_duty = Doctor::list_on_duty(&db).await.unwrap();
        assert_eq!(on_duty.len(), 1);
        assert!(on_duty[0].is_on_duty);

        let by_username = Doctor::find_by_username(&db, "asmith").await.unwrap();
        assert_eq!(by_username.map(|d| d.id), Some(doc.id));
    }

    #[tokio::test]
    async fn test_availability_windows_round_trip() {
        let db = init_in_memory().await.unwrap();
        let doc = doctor(&db).await;

        let window = WeeklyWindow {
            day: Weekday::Mon,
            start: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
        };
        let row = DoctorAvailability::create(&db, &doc.id, &window).await.unwrap();
        assert_eq!(row.day_of_week, "MONDAY");
        assert_eq!(row.start_time, "09:00");

        // A hand-inserted malformed row is skipped
        sqlx::query(
            "INSERT INTO doctor_availability (doctor_id, day_of_week, start_time, end_time) VALUES (?, 'NOTADAY', '09:00', '10:00')",
        )
        .bind(&doc.id)
        .execute(&db)
        .await
        .unwrap();

        let windows = DoctorAvailability::windows_for_doctor(&db, &doc.id)
            .await
            .unwrap();
        assert_eq!(windows, vec![window]);
    }
}
