use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::Arc;

use super::doctors::{open_slots, require_doctor};
use super::error::{ApiError, ValidationErrorBuilder};
use super::validation::{
    require_date, require_time, validate_age, validate_person_name, validate_phone,
    validate_required,
};
use crate::db::{
    format_date, format_time, now_local, Consultation, Doctor, DoctorAvailability,
    NewConsultation, NewPatient, Patient,
};
use crate::engine::{
    route_patient_heuristic, route_symptoms_heuristic, Specialization, PEDIATRIC_AGE_LIMIT,
};
use crate::AppState;

/// Patient details and symptoms from the first booking steps
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct IntakeRequest {
    pub name: String,
    pub contact_number: String,
    pub age: Option<i64>,
    pub symptoms: String,
}

#[derive(Debug, Serialize)]
pub struct IntakeResponse {
    pub patient: NewPatient,
    pub specialization: Specialization,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SuggestionRequest {
    pub symptoms: String,
    pub age: Option<i64>,
}

/// How the suggested doctor list was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionSource {
    Specialization,
    GeneralMedicine,
    OnDuty,
}

#[derive(Debug, Serialize)]
pub struct Suggestion {
    pub specialization: Specialization,
    pub pediatric_override: bool,
    pub source: SuggestionSource,
    pub doctors: Vec<Doctor>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BookingRequest {
    pub name: String,
    pub contact_number: String,
    pub age: Option<i64>,
    pub reason: String,
    pub doctor_id: String,
    pub date: String,
    pub time: String,
}

#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub patient_id: i64,
    pub consultation_id: String,
    pub doctor_id: String,
    pub doctor_name: String,
    pub date: String,
    pub time: String,
}

fn check_patient_fields(
    errors: &mut ValidationErrorBuilder,
    name: &str,
    contact_number: &str,
    age: Option<i64>,
) {
    errors.check("name", validate_person_name(name));
    errors.check("contact_number", validate_phone(contact_number));
    errors.check("age", validate_age(age));
}

/// Doctors to offer for the symptoms and age.
///
/// Doctors of the routed specialization, else General Medicine doctors.
/// A minor with nobody found either way falls back to every on-duty doctor.
pub async fn suggest_doctors(
    db: &SqlitePool,
    symptoms: &str,
    age: Option<i64>,
) -> Result<Suggestion, sqlx::Error> {
    let pediatric_override = age.map(|a| a < PEDIATRIC_AGE_LIMIT).unwrap_or(false);
    let specialization = match age {
        Some(a) => route_patient_heuristic(symptoms, a),
        None => route_symptoms_heuristic(symptoms),
    };

    let doctors = Doctor::list_by_specialization(db, specialization.as_str()).await?;
    if !doctors.is_empty() {
        return Ok(Suggestion {
            specialization,
            pediatric_override,
            source: SuggestionSource::Specialization,
            doctors,
        });
    }

    let general =
        Doctor::list_by_specialization(db, Specialization::GeneralMedicine.as_str()).await?;
    if !general.is_empty() || !pediatric_override {
        return Ok(Suggestion {
            specialization,
            pediatric_override,
            source: SuggestionSource::GeneralMedicine,
            doctors: general,
        });
    }

    Ok(Suggestion {
        specialization,
        pediatric_override,
        source: SuggestionSource::OnDuty,
        doctors: Doctor::list_on_duty(db).await?,
    })
}

/// Validate the patient details step
pub async fn validate_intake(
    Json(req): Json<IntakeRequest>,
) -> Result<Json<IntakeResponse>, ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    check_patient_fields(&mut errors, &req.name, &req.contact_number, req.age);
    errors.check("symptoms", validate_required(&req.symptoms, "Symptoms"));
    errors.finish()?;

    let age = req.age.unwrap_or_default();
    Ok(Json(IntakeResponse {
        specialization: route_patient_heuristic(&req.symptoms, age),
        patient: NewPatient {
            name: req.name.trim().to_string(),
            contact_number: req.contact_number.trim().to_string(),
            age,
        },
    }))
}

/// Suggest doctors for the symptoms
pub async fn suggestions(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SuggestionRequest>,
) -> Result<Json<Suggestion>, ApiError> {
    validate_required(&req.symptoms, "Symptoms")
        .map_err(|e| ApiError::validation_field("symptoms", e))?;
    if req.age.is_some() {
        validate_age(req.age).map_err(|e| ApiError::validation_field("age", e))?;
    }

    let suggestion = suggest_doctors(&state.db, &req.symptoms, req.age).await?;
    tracing::debug!(
        specialization = %suggestion.specialization,
        source = ?suggestion.source,
        doctors = suggestion.doctors.len(),
        "Doctor suggestions"
    );
    Ok(Json(suggestion))
}

/// Book an appointment: creates the patient and the consultation together
pub async fn book(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    check_patient_fields(&mut errors, &req.name, &req.contact_number, req.age);
    errors.check("reason", validate_required(&req.reason, "Reason"));
    errors.check("doctor_id", validate_required(&req.doctor_id, "Doctor"));

    let date = match require_date(&req.date, "Date") {
        Ok(d) => Some(d),
        Err(e) => {
            errors.add("date", e);
            None
        }
    };
    let time = match require_time(&req.time, "Time") {
        Ok(t) => Some(t),
        Err(e) => {
            errors.add("time", e);
            None
        }
    };

    let now = now_local();
    if let (Some(date), Some(time)) = (date, time) {
        if date < now.date() {
            errors.add("date", "Date cannot be in the past");
        } else if date.and_time(time) < now {
            errors.add("time", "Time cannot be in the past");
        }
    }
    errors.finish()?;

    let (Some(date), Some(time)) = (date, time) else {
        return Err(ApiError::internal("Booking failed validation"));
    };

    let doctor = require_doctor(&state, req.doctor_id.trim()).await?;
    let windows = DoctorAvailability::windows_for_doctor(&state.db, &doctor.id).await?;

    // Take the write lock before reading booked times so two bookings of
    // the same slot cannot both see it free
    let mut tx = state.db.begin_with("BEGIN IMMEDIATE").await?;
    if !open_slots(&mut *tx, &windows, &doctor.id, date)
        .await?
        .contains(&time)
    {
        return Err(ApiError::conflict(format!(
            "{} on {} is not an available slot for Dr. {}",
            format_time(time),
            format_date(date),
            doctor.name
        )));
    }

    let patient = NewPatient {
        name: req.name.trim().to_string(),
        contact_number: req.contact_number.trim().to_string(),
        age: req.age.unwrap_or_default(),
    };

    let patient_id = Patient::insert(&mut *tx, &patient).await?;
    let consultation_id = Consultation::insert(
        &mut *tx,
        &NewConsultation {
            patient_id,
            doctor_id: &doctor.id,
            at: date.and_time(time),
            reason: req.reason.trim(),
            next_visit: None,
        },
    )
    .await?;
    tx.commit().await?;

    tracing::info!(
        patient_id,
        consultation_id = %consultation_id,
        doctor_id = %doctor.id,
        date = %format_date(date),
        time = %format_time(time),
        "Appointment booked"
    );

    Ok((
        StatusCode::CREATED,
        Json(BookingResponse {
            patient_id,
            consultation_id,
            doctor_id: doctor.id,
            doctor_name: doctor.name,
            date: format_date(date),
            time: format_time(time),
        }),
    ))
}
