//! Database seeders for built-in data
//!
//! The admin account is ensured on every start. Sample doctors, weekly
//! availability, medicines and the medical test catalog are only written
//! into a database that has no doctors yet.

use anyhow::{Context, Result};
use chrono::{NaiveTime, Weekday};
use sqlx::SqlitePool;
use tracing::info;

use super::{Doctor, DoctorAvailability, MedicalTest, Medicine, Role, User};
use crate::api::auth::hash_password;
use crate::engine::WeeklyWindow;

/// Create the configured admin account when no admin exists yet
pub async fn ensure_admin_user(pool: &SqlitePool, username: &str, password: &str) -> Result<()> {
    if User::count_with_role(pool, Role::Admin).await? > 0 {
        return Ok(());
    }

    let password_hash = hash_password(password)
        .map_err(|e| anyhow::anyhow!("Failed to hash admin password: {}", e))?;
    User::create(pool, username, &password_hash, Role::Admin)
        .await
        .with_context(|| format!("Failed to create admin user {}", username))?;

    info!(username = %username, "Created admin user");
    Ok(())
}

/// Seed sample doctors, availability, medicines and tests into an empty database
pub async fn seed_sample_data(pool: &SqlitePool) -> Result<()> {
    let (doctors,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM doctors")
        .fetch_one(pool)
        .await?;
    if doctors > 0 {
        return Ok(());
    }

    info!("Seeding sample doctors, medicines and tests...");

    // (username, password, name, specialization, weekly windows)
    let sample_doctors: Vec<(&str, &str, &str, &str, Vec<(Weekday, u32, u32)>)> = vec![
        (
            "asmith",
            "doc123",
            "Alice Smith",
            "Cardiology",
            vec![(Weekday::Mon, 9, 17), (Weekday::Wed, 9, 17)],
        ),
        (
            "bjohnson",
            "doc123",
            "Bob Johnson",
            "Pediatrics",
            vec![(Weekday::Tue, 10, 16)],
        ),
        (
            "cjones",
            "doc123",
            "Carol Jones",
            "General Medicine",
            vec![(Weekday::Fri, 8, 12)],
        ),
    ];

    for (username, password, name, specialization, windows) in sample_doctors {
        if User::find(pool, username).await?.is_none() {
            let password_hash = hash_password(password)
                .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?;
            User::create(pool, username, &password_hash, Role::Doctor).await?;
        }

        let doctor = Doctor::create(pool, name, specialization, username).await?;

        for (day, start_hour, end_hour) in windows {
            let window = WeeklyWindow {
                day,
                start: hour(start_hour)?,
                end: hour(end_hour)?,
            };
            DoctorAvailability::create(pool, &doctor.id, &window).await?;
        }
    }

    let mut conn = pool.acquire().await?;
    for (name, price, stock) in [
        ("Paracetamol", 20.00, 100),
        ("Aspirin", 35.50, 50),
        ("Ibuprofen", 45.00, 75),
    ] {
        Medicine::insert(&mut conn, name, price, stock).await?;
    }
    drop(conn);

    let tests: [(&str, &str, f64, &str); 8] = [
        (
            "Blood Test - Complete Blood Count (CBC)",
            "Comprehensive blood analysis including RBC, WBC, platelets",
            450.00,
            "Blood Tests",
        ),
        ("X-Ray Chest", "Chest X-ray to examine lungs and heart", 350.00, "Radiology"),
        (
            "ECG (Electrocardiogram)",
            "Heart rhythm and electrical activity test",
            300.00,
            "Cardiology",
        ),
        ("Urine Analysis", "Complete urine examination", 200.00, "Pathology"),
        ("Blood Sugar (Fasting)", "Fasting blood glucose level test", 150.00, "Blood Tests"),
        ("Lipid Profile", "Cholesterol and triglycerides analysis", 500.00, "Blood Tests"),
        ("Ultrasound Abdomen", "Abdominal organ imaging", 800.00, "Radiology"),
        ("Thyroid Function Test", "TSH, T3, T4 hormone levels", 600.00, "Endocrinology"),
    ];
    for (name, description, price, category) in tests {
        MedicalTest::insert_or_ignore(pool, name, description, price, category).await?;
    }

    info!("Sample data seeded");
    Ok(())
}

fn hour(h: u32) -> Result<NaiveTime> {
    NaiveTime::from_hms_opt(h, 0, 0).with_context(|| format!("Invalid hour {}", h))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_in_memory;

    #[tokio::test]
    async fn test_admin_is_created_once() {
        let db = init_in_memory().await.unwrap();
        ensure_admin_user(&db, "admin", "admin123").await.unwrap();
        ensure_admin_user(&db, "root", "other").await.unwrap();

        assert_eq!(User::count_with_role(&db, Role::Admin).await.unwrap(), 1);
        let admin = User::find(&db, "admin").await.unwrap().unwrap();
        assert_ne!(admin.password_hash, "admin123");
        assert!(User::find(&db, "root").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sample_data_is_seeded_once() {
        let db = init_in_memory().await.unwrap();
        seed_sample_data(&db).await.unwrap();
        seed_sample_data(&db).await.unwrap();

        let doctors = Doctor::list_all(&db).await.unwrap();
        assert_eq!(doctors.len(), 3);
        assert_eq!(Medicine::list_all(&db).await.unwrap().len(), 3);
        assert_eq!(MedicalTest::list_all(&db).await.unwrap().len(), 8);

        let cardiologist = doctors
            .iter()
            .find(|d| d.specialization == "Cardiology")
            .unwrap();
        let windows = DoctorAvailability::windows_for_doctor(&db, &cardiologist.id)
            .await
            .unwrap();
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].day, Weekday::Mon);
    }
}
