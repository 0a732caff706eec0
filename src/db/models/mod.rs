//! Database models split into domain-specific modules.

pub mod common;
pub mod consultation;
pub mod doctor;
pub mod patient;
pub mod pharmacy;
pub mod user;

pub use common::*;
pub use consultation::*;
pub use doctor::*;
pub use patient::*;
pub use pharmacy::*;
pub use user::*;
