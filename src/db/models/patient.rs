//! Patient records.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteConnection, SqlitePool};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Patient {
    pub id: i64,
    pub name: String,
    pub contact_number: String,
    pub age: i64,
}

/// Patient details collected at the booking desk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPatient {
    pub name: String,
    pub contact_number: String,
    pub age: i64,
}

impl Patient {
    /// Insert a patient and return the generated sequential id
    pub async fn insert(
        conn: &mut SqliteConnection,
        patient: &NewPatient,
    ) -> Result<i64, sqlx::Error> {
        let result =
            sqlx::query("INSERT INTO patients (name, contact_number, age) VALUES (?, ?, ?)")
                .bind(&patient.name)
                .bind(&patient.contact_number)
                .bind(patient.age)
                .execute(conn)
                .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn find(db: &SqlitePool, id: i64) -> Result<Option<Patient>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM patients WHERE id = ?")
            .bind(id)
            .fetch_optional(db)
            .await
    }

    /// Portal self-identification: id plus case-insensitive exact name
    pub async fn find_by_name_and_id(
        db: &SqlitePool,
        name: &str,
        id: i64,
    ) -> Result<Option<Patient>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM patients WHERE id = ? AND LOWER(name) = LOWER(?)")
            .bind(id)
            .bind(name.trim())
            .fetch_optional(db)
            .await
    }

    pub async fn list_all(db: &SqlitePool) -> Result<Vec<Patient>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM patients ORDER BY id")
            .fetch_all(db)
            .await
    }

    /// Case-insensitive substring search on the patient name
    pub async fn search_by_name(db: &SqlitePool, name: &str) -> Result<Vec<Patient>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM patients WHERE LOWER(name) LIKE LOWER(?) ORDER BY id")
            .bind(format!("%{}%", name.trim()))
            .fetch_all(db)
            .await
    }

    /// Distinct patients that have at least one consultation with the doctor
    pub async fn list_for_doctor(
        db: &SqlitePool,
        doctor_id: &str,
    ) -> Result<Vec<Patient>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT DISTINCT p.* FROM patients p
            JOIN consultations c ON p.id = c.patient_id
            WHERE c.doctor_id = ?
            ORDER BY p.id
            "#,
        )
        .bind(doctor_id)
        .fetch_all(db)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_in_memory;

    async fn insert(db: &SqlitePool, name: &str, age: i64) -> i64 {
        let mut conn = db.acquire().await.unwrap();
        Patient::insert(
            &mut conn,
            &NewPatient {
                name: name.to_string(),
                contact_number: "9876543210".to_string(),
                age,
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_ids_are_sequential() {
        let db = init_in_memory().await.unwrap();
        let first = insert(&db, "Ravi Kumar", 40).await;
        let second = insert(&db, "Meena Iyer", 8).await;
        assert_eq!(second, first + 1);

        let found = Patient::find(&db, second).await.unwrap().unwrap();
        assert_eq!(found.name, "Meena Iyer");
        assert_eq!(found.age, 8);
    }

    #[tokio::test]
    async fn test_portal_lookup_ignores_case() {
        let db = init_in_memory().await.unwrap();
        let id = insert(&db, "Ravi Kumar", 40).await;

        assert!(Patient::find_by_name_and_id(&db, "ravi kumar", id)
            .await
            .unwrap()
            .is_some());
        assert!(Patient::find_by_name_and_id(&db, "Ravi", id)
            .await
            .unwrap()
            .is_none());
        assert!(Patient::find_by_name_and_id(&db, "Ravi Kumar", id + 1)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_search_by_name_substring() {
        let db = init_in_memory().await.unwrap();
        insert(&db, "Ravi Kumar", 40).await;
        insert(&db, "Kumari Devi", 33).await;
        insert(&db, "Meena Iyer", 8).await;

        let found = Patient::search_by_name(&db, "KUMAR").await.unwrap();
        assert_eq!(found.len(), 2);
        assert!(Patient::search_by_name(&db, "zzz").await.unwrap().is_empty());
        assert_eq!(Patient::list_all(&db).await.unwrap().len(), 3);
    }
}
