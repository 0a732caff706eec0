use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::Arc;

use super::auth::{AdminSession, DoctorSession};
use super::error::{ApiError, ValidationErrorBuilder};
use super::validation::validate_required;
use crate::db::{now_local, Appointment, ConsultationRecord, Patient};
use crate::engine::{estimate_patient_bill_heuristic, VisitCharges};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct PortalLookupRequest {
    pub patient_id: i64,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct PatientHistory {
    pub patient: Patient,
    pub consultations: Vec<ConsultationRecord>,
}

#[derive(Debug, Serialize)]
pub struct BillEstimate {
    pub patient_id: i64,
    pub consultations: usize,
    pub prescription_lines: usize,
    pub amount: f64,
}

#[derive(Debug, Deserialize)]
pub struct PatientSearchQuery {
    pub name: Option<String>,
}

/// Find a patient or answer 404
pub(super) async fn require_patient(db: &SqlitePool, id: i64) -> Result<Patient, ApiError> {
    Patient::find(db, id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Patient {} not found", id)))
}

/// Bill estimate from a patient's consultation history
pub(super) fn estimate_bill(patient_id: i64, history: &[ConsultationRecord]) -> BillEstimate {
    let visits: Vec<VisitCharges> = history
        .iter()
        .map(|record| VisitCharges {
            specialization: record.doctor_specialization.clone(),
            prescription_lines: record.prescriptions.len(),
        })
        .collect();

    BillEstimate {
        patient_id,
        consultations: visits.len(),
        prescription_lines: visits.iter().map(|v| v.prescription_lines).sum(),
        amount: estimate_patient_bill_heuristic(&visits),
    }
}

/// Patient portal: identify by id and name, answer with the history
pub async fn portal_lookup(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PortalLookupRequest>,
) -> Result<Json<PatientHistory>, ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    errors.check("name", validate_required(&req.name, "Name"));
    errors.finish()?;

    let patient = Patient::find_by_name_and_id(&state.db, &req.name, req.patient_id)
        .await?
        .ok_or_else(|| ApiError::not_found("No patient found with that name and id"))?;

    let consultations = ConsultationRecord::history_for_patient(&state.db, patient.id).await?;
    tracing::info!(patient_id = patient.id, "Portal lookup");

    Ok(Json(PatientHistory {
        patient,
        consultations,
    }))
}

pub async fn history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<PatientHistory>, ApiError> {
    let patient = require_patient(&state.db, id).await?;
    let consultations = ConsultationRecord::history_for_patient(&state.db, id).await?;
    Ok(Json(PatientHistory {
        patient,
        consultations,
    }))
}

/// Estimated outstanding bill of a patient
pub async fn bill(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<BillEstimate>, ApiError> {
    require_patient(&state.db, id).await?;
    let history = ConsultationRecord::history_for_patient(&state.db, id).await?;
    Ok(Json(estimate_bill(id, &history)))
}

/// All patients, or those whose name contains `?name=` (admin)
pub async fn list_patients(
    State(state): State<Arc<AppState>>,
    AdminSession(_): AdminSession,
    Query(query): Query<PatientSearchQuery>,
) -> Result<Json<Vec<Patient>>, ApiError> {
    let patients = match query.name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => Patient::search_by_name(&state.db, name).await?,
        _ => Patient::list_all(&state.db).await?,
    };
    Ok(Json(patients))
}

/// Every upcoming appointment (admin)
pub async fn list_appointments(
    State(state): State<Arc<AppState>>,
    AdminSession(_): AdminSession,
) -> Result<Json<Vec<Appointment>>, ApiError> {
    Ok(Json(Appointment::list_upcoming(&state.db, now_local(), None).await?))
}

/// The logged-in doctor's upcoming appointments
pub async fn my_appointments(
    State(state): State<Arc<AppState>>,
    DoctorSession { doctor, .. }: DoctorSession,
) -> Result<Json<Vec<Appointment>>, ApiError> {
    Ok(Json(
        Appointment::list_upcoming(&state.db, now_local(), Some(&doctor.id)).await?,
    ))
}

/// Patients the logged-in doctor has seen or will see
pub async fn my_patients(
    State(state): State<Arc<AppState>>,
    DoctorSession { doctor, .. }: DoctorSession,
) -> Result<Json<Vec<Patient>>, ApiError> {
    Ok(Json(Patient::list_for_doctor(&state.db, &doctor.id).await?))
}
