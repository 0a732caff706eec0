use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::auth::DoctorSession;
use super::error::{ApiError, ValidationErrorBuilder};
use super::patients::require_patient;
use super::validation::{validate_quantity, validate_required};
use crate::db::{
    format_datetime, now_local, parse_date, parse_datetime, Consultation, MedicalTest, Medicine,
    NewConsultation, PrescribedTest, Prescription,
};
use crate::engine::{consultation_bill, ConsultationBill};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct PrescriptionLine {
    #[serde(default)]
    pub medicine_name: String,
    pub dosage: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TestLine {
    pub test_id: i64,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
}

fn default_quantity() -> i64 {
    1
}

#[derive(Debug, Deserialize)]
pub struct RecordConsultationRequest {
    pub patient_id: i64,
    #[serde(default)]
    pub reason: String,
    /// `YYYY-MM-DD HH:MM:SS`, defaults to now
    pub datetime: Option<String>,
    /// `YYYY-MM-DD`
    pub next_visit: Option<String>,
    #[serde(default)]
    pub prescriptions: Vec<PrescriptionLine>,
    #[serde(default)]
    pub tests: Vec<TestLine>,
}

#[derive(Debug, Serialize)]
pub struct RecordConsultationResponse {
    pub consultation_id: String,
    pub patient_id: i64,
    pub doctor_id: String,
    pub consultation_datetime: String,
    /// Prescribed medicines that were added to the inventory
    pub added_medicines: Vec<Medicine>,
    pub bill: ConsultationBill,
}

/// Medical test catalog
pub async fn list_tests(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<MedicalTest>>, ApiError> {
    Ok(Json(MedicalTest::list_all(&state.db).await?))
}

/// Record a consultation for a patient (doctor)
pub async fn record_consultation(
    State(state): State<Arc<AppState>>,
    DoctorSession { doctor, .. }: DoctorSession,
    Json(req): Json<RecordConsultationRequest>,
) -> Result<(StatusCode, Json<RecordConsultationResponse>), ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    errors.check("reason", validate_required(&req.reason, "Reason"));

    let at = match req.datetime.as_deref().map(str::trim) {
        None | Some("") => Some(now_local()),
        Some(raw) => {
            let parsed = parse_datetime(raw);
            if parsed.is_none() {
                errors.add("datetime", "Date and time must be YYYY-MM-DD HH:MM:SS");
            }
            parsed
        }
    };

    let next_visit = match req.next_visit.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => {
            let parsed = parse_date(raw);
            if parsed.is_none() {
                errors.add("next_visit", "Next visit must be YYYY-MM-DD");
            }
            parsed
        }
    };

    for (i, line) in req.tests.iter().enumerate() {
        errors.check(&format!("tests[{}].quantity", i), validate_quantity(line.quantity));
    }
    errors.finish()?;

    let Some(at) = at else {
        return Err(ApiError::internal("Consultation failed validation"));
    };

    let patient = require_patient(&state.db, req.patient_id).await?;

    let mut priced_tests = Vec::with_capacity(req.tests.len());
    for line in &req.tests {
        let test = MedicalTest::find(&state.db, line.test_id)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("Medical test {} not found", line.test_id)))?;
        priced_tests.push((test.price, line.quantity));
    }

    let medicines: Vec<&PrescriptionLine> = req
        .prescriptions
        .iter()
        .filter(|line| !line.medicine_name.trim().is_empty())
        .collect();

    let mut tx = state.db.begin().await?;
    let consultation_id = Consultation::insert(
        &mut *tx,
        &NewConsultation {
            patient_id: patient.id,
            doctor_id: &doctor.id,
            at,
            reason: req.reason.trim(),
            next_visit,
        },
    )
    .await?;

    let mut added_medicines = Vec::new();
    for line in &medicines {
        let name = line.medicine_name.trim();
        if let Some(added) = Medicine::ensure_in_inventory(&mut *tx, name).await? {
            added_medicines.push(added);
        }
        let dosage = line.dosage.as_deref().map(str::trim).filter(|d| !d.is_empty());
        Prescription::insert(&mut *tx, &consultation_id, name, dosage).await?;
    }

    for line in &req.tests {
        PrescribedTest::insert(&mut *tx, &consultation_id, line.test_id, line.quantity).await?;
    }
    tx.commit().await?;

    let bill = consultation_bill(medicines.len(), &priced_tests);

    tracing::info!(
        consultation_id = %consultation_id,
        patient_id = patient.id,
        doctor_id = %doctor.id,
        medicines = medicines.len(),
        tests = priced_tests.len(),
        total = bill.total,
        "Consultation recorded"
    );

    Ok((
        StatusCode::CREATED,
        Json(RecordConsultationResponse {
            consultation_id,
            patient_id: patient.id,
            doctor_id: doctor.id,
            consultation_datetime: format_datetime(at),
            added_medicines,
            bill,
        }),
    ))
}
