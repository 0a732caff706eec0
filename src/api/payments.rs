use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::{ApiError, ValidationErrorBuilder};
use super::patients::{estimate_bill, require_patient};
use super::validation::{
    card_digits, validate_amount, validate_card_number, validate_cvv, validate_required,
};
use crate::db::ConsultationRecord;
use crate::engine::{consultation_payment, PaymentSummary};
use crate::AppState;

/// Payment method entered on the payment screens
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum PaymentDetails {
    Card {
        #[serde(default)]
        name: String,
        #[serde(default)]
        number: String,
        #[serde(default)]
        cvv: String,
    },
    Upi {
        #[serde(default)]
        upi_id: String,
    },
}

impl PaymentDetails {
    /// Add every problem with the payment details to `errors`
    pub fn check(&self, errors: &mut ValidationErrorBuilder) {
        match self {
            PaymentDetails::Card { name, number, cvv } => {
                errors.check("payment.name", validate_required(name, "Card holder name"));
                errors.check("payment.number", validate_card_number(number));
                errors.check("payment.cvv", validate_cvv(cvv));
            }
            PaymentDetails::Upi { upi_id } => {
                errors.check("payment.upi_id", validate_required(upi_id, "UPI ID"));
            }
        }
    }

    /// What the receipt shows as the payer, never the full card number
    pub fn describe(&self) -> String {
        match self {
            PaymentDetails::Card { name, number, .. } => {
                let digits = card_digits(number);
                let last4 = &digits[digits.len().saturating_sub(4)..];
                format!("Card ending {} ({})", last4, name.trim())
            }
            PaymentDetails::Upi { upi_id } => format!("UPI {}", upi_id.trim()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ConsultationPaymentRequest {
    pub patient_id: i64,
    /// Amount to pay, defaults to the patient's bill estimate
    pub amount: Option<f64>,
    pub payment: PaymentDetails,
}

#[derive(Debug, Serialize)]
pub struct PaymentReceipt {
    pub patient_id: i64,
    pub patient_name: String,
    #[serde(flatten)]
    pub summary: PaymentSummary,
    pub paid_by: String,
}

/// Pay a consultation bill
pub async fn pay_consultation(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ConsultationPaymentRequest>,
) -> Result<Json<PaymentReceipt>, ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    if let Some(amount) = req.amount {
        errors.check("amount", validate_amount(amount));
    }
    req.payment.check(&mut errors);
    errors.finish()?;

    let patient = require_patient(&state.db, req.patient_id).await?;
    let amount = match req.amount {
        Some(amount) => amount,
        None => {
            let history = ConsultationRecord::history_for_patient(&state.db, patient.id).await?;
            estimate_bill(patient.id, &history).amount
        }
    };

    let summary = consultation_payment(amount);
    let paid_by = req.payment.describe();

    tracing::info!(
        patient_id = patient.id,
        total = summary.total,
        paid_by = %paid_by,
        "Consultation payment confirmed"
    );

    Ok(Json(PaymentReceipt {
        patient_id: patient.id,
        patient_name: patient.name,
        summary,
        paid_by,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_details_are_checked() {
        let card: PaymentDetails = serde_json::from_value(serde_json::json!({
            "method": "card",
            "name": "Ravi Kumar",
            "number": "4111 1111 1111 1234",
            "cvv": "123"
        }))
        .unwrap();
        let mut errors = ValidationErrorBuilder::new();
        card.check(&mut errors);
        assert!(errors.is_empty());
        assert_eq!(card.describe(), "Card ending 1234 (Ravi Kumar)");

        let bad: PaymentDetails = serde_json::from_value(serde_json::json!({
            "method": "card",
            "number": "4111",
            "cvv": "1"
        }))
        .unwrap();
        let mut errors = ValidationErrorBuilder::new();
        bad.check(&mut errors);
        let err = errors.build().unwrap();
        assert!(err.to_string().contains("3 fields"));
    }

    #[test]
    fn test_upi_needs_an_id() {
        let upi: PaymentDetails =
            serde_json::from_value(serde_json::json!({"method": "upi", "upi_id": " "})).unwrap();
        let mut errors = ValidationErrorBuilder::new();
        upi.check(&mut errors);
        assert!(!errors.is_empty());
    }
}
