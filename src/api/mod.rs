pub mod auth;
mod booking;
mod consultations;
mod doctors;
pub mod error;
mod patients;
mod payments;
mod pharmacy;
mod screens;
mod validation;

use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::AppState;

pub use booking::suggest_doctors;
pub use error::{ApiError, ErrorCode};

pub fn create_router(state: Arc<AppState>) -> Router {
    // Auth routes
    let auth_routes = Router::new()
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me));

    // Role checks live in the extractors each handler takes
    let api_routes = Router::new()
        // Doctors and schedules
        .route("/doctors", get(doctors::list_doctors))
        .route("/doctors/on-duty", get(doctors::list_on_duty))
        .route("/doctors/status", get(doctors::roster_status))
        .route("/doctors/:id", get(doctors::get_doctor))
        .route("/doctors/:id/duty", put(doctors::set_duty))
        .route(
            "/doctors/:id/availability",
            get(doctors::list_availability).post(doctors::add_availability),
        )
        .route("/doctors/:id/days", get(doctors::available_days))
        .route("/doctors/:id/slots", get(doctors::list_slots))
        .route("/doctors/:id/calendar", get(doctors::calendar))
        // Booking
        .route("/booking", post(booking::book))
        .route("/booking/intake", post(booking::validate_intake))
        .route("/booking/suggestions", post(booking::suggestions))
        // Patients and appointments
        .route("/portal/lookup", post(patients::portal_lookup))
        .route("/patients", get(patients::list_patients))
        .route("/patients/:id/history", get(patients::history))
        .route("/patients/:id/bill", get(patients::bill))
        .route("/appointments", get(patients::list_appointments))
        .route("/me/appointments", get(patients::my_appointments))
        .route("/me/patients", get(patients::my_patients))
        // Consultations
        .route("/consultations", post(consultations::record_consultation))
        .route("/tests", get(consultations::list_tests))
        // Pharmacy and payments
        .route(
            "/medicines",
            get(pharmacy::list_medicines).post(pharmacy::create_medicine),
        )
        .route("/medicines/:id/stock", put(pharmacy::update_stock))
        .route("/pharmacy/checkout", post(pharmacy::checkout))
        .route("/payments/consultation", post(payments::pay_consultation))
        // Navigation
        .route("/screens", get(screens::list_screens))
        .route("/screens/:screen", get(screens::get_screen));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/auth", auth_routes)
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
