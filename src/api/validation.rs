//! Input validation for API requests.
//!
//! Each function checks one field and returns a human-readable message on
//! failure. Handlers collect them with `ValidationErrorBuilder` so a request
//! is rejected with every failing field before anything is written.

use chrono::{NaiveDate, NaiveTime};
use lazy_static::lazy_static;
use regex::Regex;

use crate::db::{parse_date, parse_time};

lazy_static! {
    /// Person names: letters and spaces only
    static ref PERSON_NAME_REGEX: Regex = Regex::new(r"^[a-zA-Z ]+$").unwrap();

    /// Indian mobile numbers as typed at the desk, exactly 10 digits
    static ref PHONE_REGEX: Regex = Regex::new(r"^\d{10}$").unwrap();

    /// Postal index number, exactly 6 digits
    static ref PINCODE_REGEX: Regex = Regex::new(r"^\d{6}$").unwrap();

    static ref NON_DIGIT_REGEX: Regex = Regex::new(r"\D").unwrap();
}

pub const MAX_AGE: i64 = 150;

/// Validate a patient or recipient name
pub fn validate_person_name(name: &str) -> Result<(), String> {
    let name = name.trim();
    if name.is_empty() {
        return Err("Name is required".to_string());
    }

    if !PERSON_NAME_REGEX.is_match(name) {
        return Err("Name should contain only letters and spaces".to_string());
    }

    Ok(())
}

/// Validate a 10 digit contact number
pub fn validate_phone(phone: &str) -> Result<(), String> {
    let phone = phone.trim();
    if phone.is_empty() {
        return Err("Contact number is required".to_string());
    }

    if !PHONE_REGEX.is_match(phone) {
        return Err("Contact number must be exactly 10 digits".to_string());
    }

    Ok(())
}

pub fn validate_age(age: Option<i64>) -> Result<(), String> {
    match age {
        None => Err("Age is required".to_string()),
        Some(a) if !(0..=MAX_AGE).contains(&a) => {
            Err(format!("Age must be between 0 and {}", MAX_AGE))
        }
        Some(_) => Ok(()),
    }
}

/// Validate a free-text field that must not be blank
pub fn validate_required(value: &str, label: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{} is required", label));
    }
    Ok(())
}

/// Validate a minimum trimmed length
pub fn validate_min_length(value: &str, label: &str, min: usize) -> Result<(), String> {
    let len = value.trim().chars().count();
    if len == 0 {
        return Err(format!("{} is required", label));
    }
    if len < min {
        return Err(format!("{} must be at least {} characters long", label, min));
    }
    Ok(())
}

pub fn validate_pincode(pincode: &str) -> Result<(), String> {
    let pincode = pincode.trim();
    if pincode.is_empty() {
        return Err("Pincode is required".to_string());
    }
    if !PINCODE_REGEX.is_match(pincode) {
        return Err("Pincode must be exactly 6 digits".to_string());
    }
    Ok(())
}

/// Digits of a card number with spaces and dashes removed
pub fn card_digits(number: &str) -> String {
    NON_DIGIT_REGEX.replace_all(number, "").into_owned()
}

pub fn validate_card_number(number: &str) -> Result<(), String> {
    if card_digits(number).len() != 16 {
        return Err("Card number must have 16 digits".to_string());
    }
    Ok(())
}

pub fn validate_cvv(cvv: &str) -> Result<(), String> {
    if cvv.trim().chars().count() < 3 {
        return Err("CVV must be at least 3 characters".to_string());
    }
    Ok(())
}

pub fn validate_quantity(quantity: i64) -> Result<(), String> {
    if quantity < 1 {
        return Err("Quantity must be at least 1".to_string());
    }
    Ok(())
}

pub fn validate_price(price: f64) -> Result<(), String> {
    if !price.is_finite() || price < 0.0 {
        return Err("Price must be a non-negative amount".to_string());
    }
    Ok(())
}

/// A billed amount must be strictly positive
pub fn validate_amount(amount: f64) -> Result<(), String> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err("Invalid billing amount".to_string());
    }
    Ok(())
}

pub fn validate_stock(stock: i64) -> Result<(), String> {
    if stock < 0 {
        return Err("Stock cannot be negative".to_string());
    }
    Ok(())
}

/// Parse a `YYYY-MM-DD` date field
pub fn require_date(value: &str, label: &str) -> Result<NaiveDate, String> {
    parse_date(value.trim()).ok_or_else(|| format!("{} must be a date in YYYY-MM-DD format", label))
}

/// Parse an `HH:MM` time field
pub fn require_time(value: &str, label: &str) -> Result<NaiveTime, String> {
    parse_time(value.trim()).ok_or_else(|| format!("{} must be a time in HH:MM format", label))
}

/// Validate an availability window, start strictly before end
pub fn validate_window(start: NaiveTime, end: NaiveTime) -> Result<(), String> {
    if start >= end {
        return Err("Start time must be before end time".to_string());
    }
    Ok(())
}
