//! Front-desk screens and the transitions between them.
//!
//! A front end driving the API walks this table instead of switching pages
//! by name. Every screen is a variant, every edge is listed in
//! [`Screen::transitions`], and [`navigate`] checks both the edge and the
//! role the target screen needs.

use serde::Serialize;
use thiserror::Error;

use crate::db::{Role, SessionContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Screen {
    Main,
    LoginChooser,
    AdminLogin,
    DoctorLogin,
    PatientLogin,
    AdminDashboard,
    DoctorDashboard,
    BookingPatientDetails,
    BookingSymptoms,
    BookingDoctor,
    BookingDate,
    BookingTime,
    PatientInfo,
    DoctorStatus,
    DoctorManagement,
    AppointmentsView,
    PatientDetails,
    UserManagement,
    Pharmacy,
    PatientMedicine,
    PharmacyStock,
    Address,
    PharmacyPayment,
    OnlinePayment,
    Consultation,
}

/// Who may open a screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    Public,
    /// Any logged-in admin or doctor
    Staff,
    Admin,
    Doctor,
}

impl Access {
    pub fn allows(&self, session: Option<&SessionContext>) -> bool {
        match self {
            Access::Public => true,
            Access::Staff => session.is_some(),
            Access::Admin => session.map(|s| s.role == Role::Admin).unwrap_or(false),
            Access::Doctor => session.map(|s| s.role == Role::Doctor).unwrap_or(false),
        }
    }
}

impl std::fmt::Display for Access {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Access::Public => write!(f, "public"),
            Access::Staff => write!(f, "staff"),
            Access::Admin => write!(f, "admin"),
            Access::Doctor => write!(f, "doctor"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NavigationError {
    #[error("Cannot navigate from {from} to {to}")]
    NotReachable { from: Screen, to: Screen },

    #[error("Screen {screen} requires {required} access")]
    NotPermitted { screen: Screen, required: Access },

    #[error("Unknown screen: {0}")]
    UnknownScreen(String),
}

impl Screen {
    pub const ALL: [Screen; 25] = [
        Screen::Main,
        Screen::LoginChooser,
        Screen::AdminLogin,
        Screen::DoctorLogin,
        Screen::PatientLogin,
        Screen::AdminDashboard,
        Screen::DoctorDashboard,
        Screen::BookingPatientDetails,
        Screen::BookingSymptoms,
        Screen::BookingDoctor,
        Screen::BookingDate,
        Screen::BookingTime,
        Screen::PatientInfo,
        Screen::DoctorStatus,
        Screen::DoctorManagement,
        Screen::AppointmentsView,
        Screen::PatientDetails,
        Screen::UserManagement,
        Screen::Pharmacy,
        Screen::PatientMedicine,
        Screen::PharmacyStock,
        Screen::Address,
        Screen::PharmacyPayment,
        Screen::OnlinePayment,
        Screen::Consultation,
    ];

    /// Identifier used in URLs and JSON
    pub fn as_str(&self) -> &'static str {
        match self {
            Screen::Main => "main",
            Screen::LoginChooser => "login-chooser",
            Screen::AdminLogin => "admin-login",
            Screen::DoctorLogin => "doctor-login",
            Screen::PatientLogin => "patient-login",
            Screen::AdminDashboard => "admin-dashboard",
            Screen::DoctorDashboard => "doctor-dashboard",
            Screen::BookingPatientDetails => "booking-patient-details",
            Screen::BookingSymptoms => "booking-symptoms",
            Screen::BookingDoctor => "booking-doctor",
            Screen::BookingDate => "booking-date",
            Screen::BookingTime => "booking-time",
            Screen::PatientInfo => "patient-info",
            Screen::DoctorStatus => "doctor-status",
            Screen::DoctorManagement => "doctor-management",
            Screen::AppointmentsView => "appointments-view",
            Screen::PatientDetails => "patient-details",
            Screen::UserManagement => "user-management",
            Screen::Pharmacy => "pharmacy",
            Screen::PatientMedicine => "patient-medicine",
            Screen::PharmacyStock => "pharmacy-stock",
            Screen::Address => "address",
            Screen::PharmacyPayment => "pharmacy-payment",
            Screen::OnlinePayment => "online-payment",
            Screen::Consultation => "consultation",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Screen::Main => "Home",
            Screen::LoginChooser => "Staff Login",
            Screen::AdminLogin => "Admin Login",
            Screen::DoctorLogin => "Doctor Login",
            Screen::PatientLogin => "Patient Portal",
            Screen::AdminDashboard => "Admin Dashboard",
            Screen::DoctorDashboard => "Doctor Dashboard",
            Screen::BookingPatientDetails => "Book Appointment: Patient Details",
            Screen::BookingSymptoms => "Book Appointment: Symptoms",
            Screen::BookingDoctor => "Book Appointment: Choose Doctor",
            Screen::BookingDate => "Book Appointment: Choose Date",
            Screen::BookingTime => "Book Appointment: Choose Time",
            Screen::PatientInfo => "Patient Information",
            Screen::DoctorStatus => "Doctor Status",
            Screen::DoctorManagement => "Doctor Management",
            Screen::AppointmentsView => "Upcoming Appointments",
            Screen::PatientDetails => "Patient Details",
            Screen::UserManagement => "User Management",
            Screen::Pharmacy => "Online Pharmacy",
            Screen::PatientMedicine => "Patient Medicines",
            Screen::PharmacyStock => "Pharmacy Stock",
            Screen::Address => "Delivery Address",
            Screen::PharmacyPayment => "Pharmacy Payment",
            Screen::OnlinePayment => "Online Payment",
            Screen::Consultation => "Consultation",
        }
    }

    /// Screens reachable in one step
    pub fn transitions(&self) -> &'static [Screen] {
        use Screen::*;
        match self {
            Main => &[LoginChooser, BookingPatientDetails, PatientLogin, OnlinePayment, Pharmacy],
            LoginChooser => &[AdminLogin, DoctorLogin, Main],
            AdminLogin => &[AdminDashboard, LoginChooser],
            DoctorLogin => &[DoctorDashboard, LoginChooser],
            PatientLogin => &[PatientInfo, Main],
            AdminDashboard => &[
                PatientDetails,
                AppointmentsView,
                DoctorStatus,
                DoctorManagement,
                UserManagement,
                LoginChooser,
            ],
            DoctorDashboard => &[PatientDetails, AppointmentsView, Consultation, LoginChooser],
            BookingPatientDetails => &[BookingSymptoms, Main],
            BookingSymptoms => &[BookingDoctor, BookingPatientDetails],
            BookingDoctor => &[BookingDate, BookingSymptoms],
            BookingDate => &[BookingTime, BookingDoctor],
            BookingTime => &[Main, BookingDate],
            PatientInfo => &[PatientLogin, Main],
            DoctorStatus => &[AdminDashboard],
            DoctorManagement => &[AdminDashboard],
            UserManagement => &[AdminDashboard],
            AppointmentsView => &[AdminDashboard, DoctorDashboard],
            PatientDetails => &[AdminDashboard, DoctorDashboard],
            Consultation => &[DoctorDashboard],
            Pharmacy => &[PatientMedicine, PharmacyStock, Main],
            PatientMedicine => &[Address, Pharmacy],
            PharmacyStock => &[Pharmacy],
            Address => &[PharmacyPayment, Pharmacy],
            PharmacyPayment => &[Main, Pharmacy],
            OnlinePayment => &[Main],
        }
    }

    /// Access a screen needs
    pub fn requires(&self) -> Access {
        match self {
            Screen::AdminDashboard
            | Screen::DoctorStatus
            | Screen::DoctorManagement
            | Screen::UserManagement => Access::Admin,
            Screen::DoctorDashboard | Screen::Consultation => Access::Doctor,
            Screen::AppointmentsView | Screen::PatientDetails => Access::Staff,
            _ => Access::Public,
        }
    }

    pub fn can_reach(&self, to: Screen) -> bool {
        self.transitions().contains(&to)
    }
}

impl std::fmt::Display for Screen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Screen {
    type Err = NavigationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Screen::ALL
            .iter()
            .copied()
            .find(|screen| screen.as_str() == s)
            .ok_or_else(|| NavigationError::UnknownScreen(s.to_string()))
    }
}

/// Move from one screen to another on behalf of the current session
pub fn navigate(
    from: Screen,
    to: Screen,
    session: Option<&SessionContext>,
) -> Result<Screen, NavigationError> {
    if !from.can_reach(to) {
        return Err(NavigationError::NotReachable { from, to });
    }

    let required = to.requires();
    if !required.allows(session) {
        return Err(NavigationError::NotPermitted {
            screen: to,
            required,
        });
    }

    Ok(to)
}
