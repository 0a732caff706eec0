//! Medicine inventory and medical test catalog.

use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteConnection, SqlitePool};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Medicine {
    pub id: i64,
    pub name: String,
    pub price: f64,
    pub stock: i64,
}

/// Request to add a medicine to the inventory
#[derive(Debug, Deserialize)]
pub struct CreateMedicineRequest {
    pub name: String,
    pub price: f64,
    pub stock: i64,
}

/// Request to overwrite a medicine's stock count
#[derive(Debug, Deserialize)]
pub struct UpdateStockRequest {
    pub stock: i64,
}

impl Medicine {
    pub async fn list_all(db: &SqlitePool) -> Result<Vec<Medicine>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM medicines ORDER BY name")
            .fetch_all(db)
            .await
    }

    /// Case-insensitive substring search on the medicine name
    pub async fn search(db: &SqlitePool, query: &str) -> Result<Vec<Medicine>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM medicines WHERE LOWER(name) LIKE LOWER(?) ORDER BY name")
            .bind(format!("%{}%", query.trim()))
            .fetch_all(db)
            .await
    }

    pub async fn find(db: &SqlitePool, id: i64) -> Result<Option<Medicine>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM medicines WHERE id = ?")
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn insert(
        conn: &mut SqliteConnection,
        name: &str,
        price: f64,
        stock: i64,
    ) -> Result<Medicine, sqlx::Error> {
        let result = sqlx::query("INSERT INTO medicines (name, price, stock) VALUES (?, ?, ?)")
            .bind(name)
            .bind(price)
            .bind(stock)
            .execute(conn)
            .await?;
        Ok(Medicine {
            id: result.last_insert_rowid(),
            name: name.to_string(),
            price,
            stock,
        })
    }

    pub async fn set_stock(db: &SqlitePool, id: i64, stock: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE medicines SET stock = ? WHERE id = ?")
            .bind(stock)
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Add a prescribed medicine to the inventory when no medicine with the
    /// same name (ignoring case) exists yet. New entries get a random price in
    /// [10, 100) and a random stock in [50, 200]. Returns the inserted row.
    pub async fn ensure_in_inventory(
        conn: &mut SqliteConnection,
        name: &str,
    ) -> Result<Option<Medicine>, sqlx::Error> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM medicines WHERE LOWER(name) = LOWER(?)")
                .bind(name)
                .fetch_one(&mut *conn)
                .await?;
        if count > 0 {
            return Ok(None);
        }

        let (price, stock) = {
            let mut rng = rand::rng();
            let price: f64 = rng.random_range(10.0..100.0);
            let stock: i64 = rng.random_range(50..=200);
            ((price * 100.0).round() / 100.0, stock)
        };

        let medicine = Self::insert(conn, name, price, stock).await?;
        tracing::info!(
            medicine = %medicine.name,
            price = medicine.price,
            stock = medicine.stock,
            "Added prescribed medicine to inventory"
        );
        Ok(Some(medicine))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct MedicalTest {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub category: Option<String>,
}

impl MedicalTest {
    pub async fn list_all(db: &SqlitePool) -> Result<Vec<MedicalTest>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM medical_tests ORDER BY category, name")
            .fetch_all(db)
            .await
    }

    pub async fn find(db: &SqlitePool, id: i64) -> Result<Option<MedicalTest>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM medical_tests WHERE id = ?")
            .bind(id)
            .fetch_optional(db)
            .await
    }

    /// Insert a catalog entry, ignoring duplicates by name
    pub async fn insert_or_ignore(
        db: &SqlitePool,
        name: &str,
        description: &str,
        price: f64,
        category: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT OR IGNORE INTO medical_tests (name, description, price, category) VALUES (?, ?, ?, ?)",
        )
        .bind(name)
        .bind(description)
        .bind(price)
        .bind(category)
        .execute(db)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_in_memory;

    #[tokio::test]
    async fn test_search_is_case_insensitive() {
        let db = init_in_memory().await.unwrap();
        let mut conn = db.acquire().await.unwrap();
        Medicine::insert(&mut conn, "Paracetamol", 20.0, 100).await.unwrap();
        Medicine::insert(&mut conn, "Aspirin", 35.5, 50).await.unwrap();
        drop(conn);

        let found = Medicine::search(&db, "PARA").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Paracetamol");
        assert_eq!(Medicine::search(&db, "").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_ensure_in_inventory_adds_once() {
        let db = init_in_memory().await.unwrap();
        let mut conn = db.acquire().await.unwrap();

        let added = Medicine::ensure_in_inventory(&mut conn, "Amoxicillin")
            .await
            .unwrap()
            .unwrap();
        assert!(added.price >= 10.0 && added.price <= 100.0);
        assert!((50..=200).contains(&added.stock));

        let again = Medicine::ensure_in_inventory(&mut conn, "amoxicillin")
            .await
            .unwrap();
        assert!(again.is_none());
        drop(conn);

        assert_eq!(Medicine::list_all(&db).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_set_stock() {
        let db = init_in_memory().await.unwrap();
        let mut conn = db.acquire().await.unwrap();
        let med = Medicine::insert(&mut conn, "Ibuprofen", 45.0, 75).await.unwrap();
        drop(conn);

        assert!(Medicine::set_stock(&db, med.id, 10).await.unwrap());
        assert!(!Medicine::set_stock(&db, med.id + 1, 10).await.unwrap());
        assert_eq!(Medicine::find(&db, med.id).await.unwrap().unwrap().stock, 10);
    }

    #[tokio::test]
    async fn test_catalog_ignores_duplicate_names() {
        let db = init_in_memory().await.unwrap();
        MedicalTest::insert_or_ignore(&db, "ECG", "Heart rhythm", 300.0, "Cardiology")
            .await
            .unwrap();
        MedicalTest::insert_or_ignore(&db, "ECG", "Duplicate", 999.0, "Cardiology")
            .await
            .unwrap();
        MedicalTest::insert_or_ignore(&db, "Urine Analysis", "Complete urine examination", 200.0, "Pathology")
            .await
            .unwrap();

        let tests = MedicalTest::list_all(&db).await.unwrap();
        assert_eq!(tests.len(), 2);
        assert_eq!(tests[0].name, "ECG");
        assert_eq!(tests[0].price, 300.0);
    }
}
