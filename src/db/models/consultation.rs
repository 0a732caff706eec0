//! Consultations, prescriptions and prescribed tests.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteConnection, SqlitePool};

use super::common::{format_date, format_datetime, parse_datetime};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Consultation {
    pub id: String,
    pub patient_id: i64,
    pub doctor_id: String,
    pub consultation_datetime: String,
    pub consulting_reason: String,
    pub next_consulting_date: Option<String>,
}

/// Values for a new consultation row
#[derive(Debug, Clone)]
pub struct NewConsultation<'a> {
    pub patient_id: i64,
    pub doctor_id: &'a str,
    pub at: NaiveDateTime,
    pub reason: &'a str,
    pub next_visit: Option<NaiveDate>,
}

impl Consultation {
    /// Insert a consultation and return its generated id
    pub async fn insert(
        conn: &mut SqliteConnection,
        new: &NewConsultation<'_>,
    ) -> Result<String, sqlx::Error> {
        let id = uuid::Uuid::new_v4().to_string();
        sqlx::query(
            r#"
            INSERT INTO consultations
                (id, patient_id, doctor_id, consultation_datetime, consulting_reason, next_consulting_date)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(new.patient_id)
        .bind(new.doctor_id)
        .bind(format_datetime(new.at))
        .bind(new.reason)
        .bind(new.next_visit.map(format_date))
        .execute(conn)
        .await?;
        Ok(id)
    }

    /// A patient's history, newest first
    pub async fn list_for_patient(
        db: &SqlitePool,
        patient_id: i64,
    ) -> Result<Vec<Consultation>, sqlx::Error> {
        sqlx::query_as(
            "SELECT * FROM consultations WHERE patient_id = ? ORDER BY consultation_datetime DESC",
        )
        .bind(patient_id)
        .fetch_all(db)
        .await
    }

    /// Start times already taken for a doctor on a date
    pub async fn booked_times(
        conn: &mut SqliteConnection,
        doctor_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<NaiveTime>, sqlx::Error> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT consultation_datetime FROM consultations WHERE doctor_id = ? AND date(consultation_datetime) = ?",
        )
        .bind(doctor_id)
        .bind(format_date(date))
        .fetch_all(conn)
        .await?;

        Ok(rows
            .iter()
            .filter_map(|(value,)| parse_datetime(value).map(|dt| dt.time()))
            .collect())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Prescription {
    pub id: i64,
    pub consultation_id: String,
    pub medicine_name: String,
    pub dosage: Option<String>,
}

impl Prescription {
    pub async fn insert(
        conn: &mut SqliteConnection,
        consultation_id: &str,
        medicine_name: &str,
        dosage: Option<&str>,
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO prescriptions (consultation_id, medicine_name, dosage) VALUES (?, ?, ?)",
        )
        .bind(consultation_id)
        .bind(medicine_name)
        .bind(dosage)
        .execute(conn)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn list_for_consultation(
        db: &SqlitePool,
        consultation_id: &str,
    ) -> Result<Vec<Prescription>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM prescriptions WHERE consultation_id = ? ORDER BY id")
            .bind(consultation_id)
            .fetch_all(db)
            .await
    }
}

/// A test prescribed in a consultation, joined with the catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct PrescribedTest {
    pub test_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub category: Option<String>,
    pub quantity: i64,
}

impl PrescribedTest {
    pub async fn insert(
        conn: &mut SqliteConnection,
        consultation_id: &str,
        test_id: i64,
        quantity: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO consultation_tests (consultation_id, test_id, quantity) VALUES (?, ?, ?)",
        )
        .bind(consultation_id)
        .bind(test_id)
        .bind(quantity)
        .execute(conn)
        .await?;
        Ok(())
    }

    pub async fn list_for_consultation(
        db: &SqlitePool,
        consultation_id: &str,
    ) -> Result<Vec<PrescribedTest>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT mt.id AS test_id, mt.name, mt.description, mt.price, mt.category, ct.quantity
            FROM medical_tests mt
            JOIN consultation_tests ct ON mt.id = ct.test_id
            WHERE ct.consultation_id = ?
            ORDER BY ct.id
            "#,
        )
        .bind(consultation_id)
        .fetch_all(db)
        .await
    }
}

/// One history entry shown in the patient portal
#[derive(Debug, Clone, Serialize)]
pub struct ConsultationRecord {
    #[serde(flatten)]
    pub consultation: Consultation,
    pub doctor_name: Option<String>,
    pub doctor_specialization: Option<String>,
    pub prescriptions: Vec<Prescription>,
    pub tests: Vec<PrescribedTest>,
}

impl ConsultationRecord {
    /// Full history of a patient, newest first
    pub async fn history_for_patient(
        db: &SqlitePool,
        patient_id: i64,
    ) -> Result<Vec<ConsultationRecord>, sqlx::Error> {
        let consultations = Consultation::list_for_patient(db, patient_id).await?;
        let mut records = Vec::with_capacity(consultations.len());

        for consultation in consultations {
            let doctor = super::Doctor::find(db, &consultation.doctor_id).await?;
            let prescriptions = Prescription::list_for_consultation(db, &consultation.id).await?;
            let tests = PrescribedTest::list_for_consultation(db, &consultation.id).await?;
            records.push(ConsultationRecord {
                doctor_name: doctor.as_ref().map(|d| d.name.clone()),
                doctor_specialization: doctor.map(|d| d.specialization),
                consultation,
                prescriptions,
                tests,
            });
        }

        Ok(records)
    }
}

/// Upcoming appointment with patient and doctor names resolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Appointment {
    pub consultation_id: String,
    pub consultation_datetime: String,
    pub consulting_reason: String,
    pub patient_id: i64,
    pub patient_name: String,
    pub contact_number: String,
    pub doctor_id: String,
    pub doctor_name: Option<String>,
}

impl Appointment {
    /// Appointments at or after `from`, earliest first, optionally for one doctor
    pub async fn list_upcoming(
        db: &SqlitePool,
        from: NaiveDateTime,
        doctor_id: Option<&str>,
    ) -> Result<Vec<Appointment>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT c.id AS consultation_id, c.consultation_datetime, c.consulting_reason,
                   p.id AS patient_id, p.name AS patient_name, p.contact_number,
                   c.doctor_id, d.name AS doctor_name
            FROM consultations c
            JOIN patients p ON p.id = c.patient_id
            LEFT JOIN doctors d ON d.id = c.doctor_id
            WHERE c.consultation_datetime >= ? AND (? IS NULL OR c.doctor_id = ?)
            ORDER BY c.consultation_datetime ASC
            "#,
        )
        .bind(format_datetime(from))
        .bind(doctor_id)
        .bind(doctor_id)
        .fetch_all(db)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{init_in_memory, Doctor, NewPatient, Patient, Role, User};

    fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, day)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    async fn fixture(db: &SqlitePool) -> (Doctor, i64) {
        User::create(db, "asmith", "hash", Role::Doctor).await.unwrap();
        let doctor = Doctor::create(db, "Alice Smith", "Cardiology", "asmith")
            .await
            .unwrap();
        let mut conn = db.acquire().await.unwrap();
        let patient_id = Patient::insert(
            &mut conn,
            &NewPatient {
                name: "Ravi Kumar".to_string(),
                contact_number: "9876543210".to_string(),
                age: 40,
            },
        )
        .await
        .unwrap();
        (doctor, patient_id)
    }

    async fn book(db: &SqlitePool, doctor: &Doctor, patient_id: i64, when: NaiveDateTime) -> String {
        let mut conn = db.acquire().await.unwrap();
        Consultation::insert(
            &mut conn,
            &NewConsultation {
                patient_id,
                doctor_id: &doctor.id,
                at: when,
                reason: "chest pain",
                next_visit: None,
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_booked_times_are_per_doctor_and_date() {
        let db = init_in_memory().await.unwrap();
        let (doctor, patient_id) = fixture(&db).await;

        book(&db, &doctor, patient_id, at(3, 9, 30)).await;
        book(&db, &doctor, patient_id, at(3, 11, 0)).await;
        book(&db, &doctor, patient_id, at(4, 9, 0)).await;

        let mut conn = db.acquire().await.unwrap();
        let mut times = Consultation::booked_times(
            &mut conn,
            &doctor.id,
            NaiveDate::from_ymd_opt(2025, 3, 3).unwrap(),
        )
        .await
        .unwrap();
        times.sort();
        assert_eq!(
            times,
            vec![
                NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
                NaiveTime::from_hms_opt(11, 0, 0).unwrap(),
            ]
        );

        let other = Consultation::booked_times(
            &mut conn,
            "someone-else",
            NaiveDate::from_ymd_opt(2025, 3, 3).unwrap(),
        )
        .await
        .unwrap();
        assert!(other.is_empty());
    }

    #[tokio::test]
    async fn test_history_and_upcoming_ordering() {
        let db = init_in_memory().await.unwrap();
        let (doctor, patient_id) = fixture(&db).await;

        book(&db, &doctor, patient_id, at(3, 9, 0)).await;
        book(&db, &doctor, patient_id, at(10, 9, 0)).await;
        book(&db, &doctor, patient_id, at(5, 9, 0)).await;

        let history = Consultation::list_for_patient(&db, patient_id).await.unwrap();
        let dates: Vec<&str> = history
            .iter()
            .map(|c| c.consultation_datetime.as_str())
            .collect();
        assert_eq!(
            dates,
            vec!["2025-03-10 09:00:00", "2025-03-05 09:00:00", "2025-03-03 09:00:00"]
        );

        let upcoming = Appointment::list_upcoming(&db, at(5, 0, 0), Some(&doctor.id))
            .await
            .unwrap();
        assert_eq!(upcoming.len(), 2);
        assert_eq!(upcoming[0].consultation_datetime, "2025-03-05 09:00:00");
        assert_eq!(upcoming[0].patient_name, "Ravi Kumar");
        assert_eq!(upcoming[0].doctor_name.as_deref(), Some("Alice Smith"));

        let everyone = Appointment::list_upcoming(&db, at(4, 0, 0), None).await.unwrap();
        assert_eq!(everyone.len(), 2);
        let other = Appointment::list_upcoming(&db, at(1, 0, 0), Some("someone-else"))
            .await
            .unwrap();
        assert!(other.is_empty());
        assert!(Appointment::list_upcoming(&db, at(11, 0, 0), None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_patient_is_rejected_by_foreign_key() {
        let db = init_in_memory().await.unwrap();
        let (doctor, _) = fixture(&db).await;

        let mut conn = db.acquire().await.unwrap();
        let result = Consultation::insert(
            &mut conn,
            &NewConsultation {
                patient_id: 999,
                doctor_id: &doctor.id,
                at: at(3, 9, 0),
                reason: "checkup",
                next_visit: None,
            },
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_prescriptions_and_tests() {
        let db = init_in_memory().await.unwrap();
        let (doctor, patient_id) = fixture(&db).await;
        let consultation_id = book(&db, &doctor, patient_id, at(3, 9, 0)).await;

        let test_id: (i64,) = sqlx::query_as(
            "INSERT INTO medical_tests (name, description, price, category) VALUES ('ECG', 'Heart rhythm', 300.0, 'Cardiology') RETURNING id",
        )
        .fetch_one(&db)
        .await
        .unwrap();

        let mut conn = db.acquire().await.unwrap();
        Prescription::insert(&mut conn, &consultation_id, "Aspirin", Some("75mg daily"))
            .await
            .unwrap();
        PrescribedTest::insert(&mut conn, &consultation_id, test_id.0, 2)
            .await
            .unwrap();
        drop(conn);

        let prescriptions = Prescription::list_for_consultation(&db, &consultation_id)
            .await
            .unwrap();
        assert_eq!(prescriptions.len(), 1);
        assert_eq!(prescriptions[0].dosage.as_deref(), Some("75mg daily"));

        let tests = PrescribedTest::list_for_consultation(&db, &consultation_id)
            .await
            .unwrap();
        assert_eq!(tests.len(), 1);
        assert_eq!(tests[0].name, "ECG");
        assert_eq!(tests[0].quantity, 2);

        let history = ConsultationRecord::history_for_patient(&db, patient_id)
            .await
            .unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].doctor_specialization.as_deref(), Some("Cardiology"));
        assert_eq!(history[0].prescriptions.len(), 1);
        assert_eq!(history[0].tests.len(), 1);
    }
}
