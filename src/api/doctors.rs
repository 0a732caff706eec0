use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{Datelike, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use std::collections::HashSet;
use std::sync::Arc;

use super::auth::AdminSession;
use super::error::{ApiError, ValidationErrorBuilder};
use super::validation::{require_date, require_time, validate_window};
use crate::db::{
    format_date, format_time, now_local, parse_weekday, weekday_to_db, Consultation,
    CreateAvailabilityRequest, Doctor, DoctorAvailability, DoctorLoginLog, LoginStatus,
    SessionContext, UpdateDutyRequest,
};
use crate::engine::{
    available_days as weekdays_with_windows, available_slots, bookable_dates, RosterMonitor,
    RosterSnapshot, WeeklyWindow,
};
use crate::utils::month_bounds;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct DoctorDetails {
    #[serde(flatten)]
    pub doctor: Doctor,
    pub login_status: LoginStatus,
}

#[derive(Debug, Serialize)]
pub struct AvailableDaysResponse {
    pub doctor_id: String,
    pub days: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct SlotsQuery {
    pub date: String,
}

#[derive(Debug, Serialize)]
pub struct SlotsResponse {
    pub doctor_id: String,
    pub date: String,
    pub day_of_week: String,
    pub slots: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct CalendarQuery {
    /// `YYYY-MM`, defaults to the current month
    pub month: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CalendarResponse {
    pub doctor_id: String,
    pub month: String,
    pub days: Vec<String>,
    pub dates: Vec<String>,
}

/// Find a doctor or answer 404
pub(super) async fn require_doctor(state: &AppState, id: &str) -> Result<Doctor, ApiError> {
    Doctor::find(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Doctor {} not found", id)))
}

/// Start times currently offered for a doctor on a date
pub(super) async fn offered_slots(
    state: &AppState,
    doctor_id: &str,
    date: NaiveDate,
) -> Result<Vec<NaiveTime>, ApiError> {
    let windows = DoctorAvailability::windows_for_doctor(&state.db, doctor_id).await?;
    let mut conn = state.db.acquire().await?;
    Ok(open_slots(&mut conn, &windows, doctor_id, date).await?)
}

/// Window slots minus the times already booked, read on `conn`
pub(super) async fn open_slots(
    conn: &mut SqliteConnection,
    windows: &[WeeklyWindow],
    doctor_id: &str,
    date: NaiveDate,
) -> Result<Vec<NaiveTime>, sqlx::Error> {
    let booked: HashSet<NaiveTime> = Consultation::booked_times(conn, doctor_id, date)
        .await?
        .into_iter()
        .collect();
    Ok(available_slots(windows, &booked, date))
}

/// List all doctors
pub async fn list_doctors(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Doctor>>, ApiError> {
    Ok(Json(Doctor::list_all(&state.db).await?))
}

/// List doctors whose on-duty flag is set
pub async fn list_on_duty(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Doctor>>, ApiError> {
    Ok(Json(Doctor::list_on_duty(&state.db).await?))
}

/// Latest roster snapshot. Built on demand until the background task has run.
pub async fn roster_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<RosterSnapshot>, ApiError> {
    if state.roster.load().refreshed_at.is_none() {
        RosterMonitor::new(state.db.clone(), state.roster.clone())
            .refresh()
            .await?;
    }
    let snapshot = state.roster.load_full();
    Ok(Json(RosterSnapshot::clone(&snapshot)))
}

pub async fn get_doctor(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DoctorDetails>, ApiError> {
    let doctor = require_doctor(&state, &id).await?;
    let latest = DoctorLoginLog::latest(&state.db, &doctor.id).await?;
    Ok(Json(DoctorDetails {
        doctor,
        login_status: LoginStatus::from_latest(latest.as_ref()),
    }))
}

/// Toggle the on-duty flag. Admins may change any doctor, doctors only themselves.
pub async fn set_duty(
    State(state): State<Arc<AppState>>,
    session: SessionContext,
    Path(id): Path<String>,
    Json(req): Json<UpdateDutyRequest>,
) -> Result<Json<Doctor>, ApiError> {
    if !session.is_admin() && !session.is_doctor(&id) {
        return Err(ApiError::forbidden("Only an admin or the doctor may change duty status"));
    }

    if !Doctor::set_on_duty(&state.db, &id, req.on_duty).await? {
        return Err(ApiError::not_found(format!("Doctor {} not found", id)));
    }

    tracing::info!(
        doctor_id = %id,
        on_duty = req.on_duty,
        by = %session.username,
        "Duty status changed"
    );

    Ok(Json(require_doctor(&state, &id).await?))
}

pub async fn list_availability(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<DoctorAvailability>>, ApiError> {
    require_doctor(&state, &id).await?;
    Ok(Json(DoctorAvailability::list_for_doctor(&state.db, &id).await?))
}

/// Validate an availability request into a window
fn validate_availability_request(req: &CreateAvailabilityRequest) -> Result<WeeklyWindow, ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    let day = parse_weekday(&req.day_of_week);
    if day.is_none() {
        errors.add("day_of_week", "Day of week must be a weekday name such as MONDAY");
    }

    let start = match require_time(&req.start_time, "Start time") {
        Ok(t) => Some(t),
        Err(e) => {
            errors.add("start_time", e);
            None
        }
    };
    let end = match require_time(&req.end_time, "End time") {
        Ok(t) => Some(t),
        Err(e) => {
            errors.add("end_time", e);
            None
        }
    };

    if let (Some(start), Some(end)) = (start, end) {
        errors.check("end_time", validate_window(start, end));
    }

    errors.finish()?;

    match (day, start, end) {
        (Some(day), Some(start), Some(end)) => Ok(WeeklyWindow { day, start, end }),
        _ => Err(ApiError::internal("Availability window failed validation")),
    }
}

/// Add a weekly availability window (admin)
pub async fn add_availability(
    State(state): State<Arc<AppState>>,
    AdminSession(admin): AdminSession,
    Path(id): Path<String>,
    Json(req): Json<CreateAvailabilityRequest>,
) -> Result<(StatusCode, Json<DoctorAvailability>), ApiError> {
    let window = validate_availability_request(&req)?;
    require_doctor(&state, &id).await?;

    let availability = DoctorAvailability::create(&state.db, &id, &window).await?;

    tracing::info!(
        doctor_id = %id,
        day = %availability.day_of_week,
        start = %availability.start_time,
        end = %availability.end_time,
        by = %admin.username,
        "Availability window added"
    );

    Ok((StatusCode::CREATED, Json(availability)))
}

/// Weekdays the doctor can be booked on
pub async fn available_days(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<AvailableDaysResponse>, ApiError> {
    require_doctor(&state, &id).await?;
    let windows = DoctorAvailability::windows_for_doctor(&state.db, &id).await?;

    Ok(Json(AvailableDaysResponse {
        doctor_id: id,
        days: weekdays_with_windows(&windows)
            .into_iter()
            .map(|d| weekday_to_db(d).to_string())
            .collect(),
    }))
}

/// Bookable start times on a date
pub async fn list_slots(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<SlotsResponse>, ApiError> {
    let date = require_date(&query.date, "Date").map_err(|e| ApiError::validation_field("date", e))?;
    require_doctor(&state, &id).await?;

    let slots = offered_slots(&state, &id, date).await?;

    Ok(Json(SlotsResponse {
        doctor_id: id,
        date: format_date(date),
        day_of_week: weekday_to_db(date.weekday()).to_string(),
        slots: slots.into_iter().map(format_time).collect(),
    }))
}

/// Dates of a month the doctor can be booked on, never before today
pub async fn calendar(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<CalendarQuery>,
) -> Result<Json<CalendarResponse>, ApiError> {
    let today = now_local().date();
    let month = query
        .month
        .unwrap_or_else(|| today.format("%Y-%m").to_string());
    let (first, last) = month_bounds(&month)
        .ok_or_else(|| ApiError::validation_field("month", "Month must be in YYYY-MM format"))?;

    require_doctor(&state, &id).await?;
    let windows = DoctorAvailability::windows_for_doctor(&state.db, &id).await?;

    Ok(Json(CalendarResponse {
        doctor_id: id,
        month,
        days: weekdays_with_windows(&windows)
            .into_iter()
            .map(|d| weekday_to_db(d).to_string())
            .collect(),
        dates: bookable_dates(&windows, first.max(today), last)
            .into_iter()
            .map(format_date)
            .collect(),
    }))
}
