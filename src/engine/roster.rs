//! Doctor roster monitor
//!
//! Runs as a background task that periodically rebuilds the roster shown on
//! the doctor status screen: every doctor with their duty flag and the state
//! of their latest shift. The snapshot is published through an `ArcSwap` so
//! request handlers read it without locking.

use arc_swap::ArcSwap;
use serde::Serialize;
use std::sync::Arc;
use tokio::time::{interval, Duration};

use crate::db::{format_datetime, now_local, Doctor, DoctorLoginLog, LoginState, LoginStatus};
use crate::DbPool;

#[derive(Debug, Clone, Serialize)]
pub struct RosterEntry {
    pub doctor_id: String,
    pub name: String,
    pub specialization: String,
    pub on_duty: bool,
    pub login_state: LoginState,
    /// Login or logout time of the latest shift
    pub last_activity: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RosterSnapshot {
    pub doctors: Vec<RosterEntry>,
    /// `None` until the first refresh completes
    pub refreshed_at: Option<String>,
}

impl RosterSnapshot {
    pub fn logged_in_count(&self) -> usize {
        self.doctors
            .iter()
            .filter(|d| d.login_state == LoginState::LoggedIn)
            .count()
    }
}

pub struct RosterMonitor {
    db: DbPool,
    snapshot: Arc<ArcSwap<RosterSnapshot>>,
}

impl RosterMonitor {
    pub fn new(db: DbPool, snapshot: Arc<ArcSwap<RosterSnapshot>>) -> Self {
        Self { db, snapshot }
    }

    /// Rebuild the roster from the database and publish it
    pub async fn refresh(&self) -> Result<usize, sqlx::Error> {
        let doctors = Doctor::list_all(&self.db).await?;
        let mut entries = Vec::with_capacity(doctors.len());

        for doctor in doctors {
            let latest = DoctorLoginLog::latest(&self.db, &doctor.id).await?;
            let status = LoginStatus::from_latest(latest.as_ref());
            entries.push(RosterEntry {
                doctor_id: doctor.id,
                name: doctor.name,
                specialization: doctor.specialization,
                on_duty: doctor.is_on_duty,
                login_state: status.state,
                last_activity: status.since,
            });
        }

        let snapshot = RosterSnapshot {
            doctors: entries,
            refreshed_at: Some(format_datetime(now_local())),
        };
        let count = snapshot.doctors.len();
        tracing::debug!(
            doctors = count,
            logged_in = snapshot.logged_in_count(),
            "Roster refreshed"
        );
        self.snapshot.store(Arc::new(snapshot));
        Ok(count)
    }
}

/// Spawn the roster refresh loop
pub fn spawn_roster_task(db: DbPool, snapshot: Arc<ArcSwap<RosterSnapshot>>, refresh_secs: u64) {
    let refresh_secs = refresh_secs.max(1);
    tracing::info!(refresh_secs, "Starting doctor roster task");

    let monitor = RosterMonitor::new(db, snapshot);

    tokio::spawn(async move {
        let mut tick = interval(Duration::from_secs(refresh_secs));
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tick.tick().await;

            if let Err(e) = monitor.refresh().await {
                tracing::warn!(error = %e, "Failed to refresh doctor roster");
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{init_in_memory, Role, User};
    use chrono::NaiveDate;

    #[tokio::test]
    async fn test_refresh_publishes_login_states() {
        let db = init_in_memory().await.unwrap();
        for (username, name) in [("asmith", "Alice Smith"), ("bjohnson", "Bob Johnson")] {
            User::create(&db, username, "hash", Role::Doctor).await.unwrap();
            Doctor::create(&db, name, "Cardiology", username).await.unwrap();
        }
        let alice = Doctor::find_by_username(&db, "asmith").await.unwrap().unwrap();
        let at = NaiveDate::from_ymd_opt(2025, 3, 3)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        DoctorLoginLog::record_login(&db, &alice.id, at).await.unwrap();

        let snapshot = Arc::new(ArcSwap::from_pointee(RosterSnapshot::default()));
        assert!(snapshot.load().refreshed_at.is_none());

        let monitor = RosterMonitor::new(db.clone(), snapshot.clone());
        assert_eq!(monitor.refresh().await.unwrap(), 2);

        let current = snapshot.load();
        assert!(current.refreshed_at.is_some());
        assert_eq!(current.logged_in_count(), 1);

        let alice_entry = current.doctors.iter().find(|d| d.name == "Alice Smith").unwrap();
        assert_eq!(alice_entry.login_state, LoginState::LoggedIn);
        assert_eq!(alice_entry.last_activity.as_deref(), Some("2025-03-03 09:00:00"));

        let bob_entry = current.doctors.iter().find(|d| d.name == "Bob Johnson").unwrap();
        assert_eq!(bob_entry.login_state, LoginState::Unknown);
        assert!(bob_entry.last_activity.is_none());
    }
}
