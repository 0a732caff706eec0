//! Billing figures shown at the desk.
//!
//! None of these are persisted. The patient bill is a display heuristic
//! derived from consultation history; the other figures are the totals the
//! consultation, payment and pharmacy screens show.

use serde::Serialize;

/// Flat fee charged when a patient has no consultation history
pub const BASE_FEE: f64 = 500.0;
pub const BILL_CAP: f64 = 5000.0;
pub const BILL_FLOOR: f64 = 200.0;
pub const PRESCRIPTION_LINE_FEE: f64 = 50.0;

pub const CONSULTATION_FEE: f64 = 500.0;
pub const MEDICINE_FEE: f64 = 50.0;
pub const GST_RATE: f64 = 0.18;

pub const PAYMENT_TAX_RATE: f64 = 0.18;
pub const PAYMENT_DISCOUNT: f64 = 50.0;

pub const DELIVERY_CHARGE: f64 = 50.0;
pub const PHARMACY_TAX_RATE: f64 = 0.05;

/// Round to paise for display
pub fn round2(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Per-visit fee by the consulting doctor's specialization
pub fn visit_fee_heuristic(specialization: &str) -> f64 {
    match specialization {
        "Cardiology" => 800.0,
        "Pediatrics" => 600.0,
        _ => 400.0,
    }
}

/// One past consultation as seen by the bill estimate
#[derive(Debug, Clone, PartialEq)]
pub struct VisitCharges {
    /// Specialization of the consulting doctor, `None` when the doctor no
    /// longer resolves
    pub specialization: Option<String>,
    pub prescription_lines: usize,
}

/// Estimate a patient's outstanding bill from their history.
///
/// No history gives the flat base fee. Otherwise the base fee plus visit and
/// prescription charges, capped at 5000 and floored at 200.
pub fn estimate_patient_bill_heuristic(history: &[VisitCharges]) -> f64 {
    if history.is_empty() {
        return BASE_FEE;
    }

    let charges: f64 = history
        .iter()
        .map(|visit| {
            let fee = visit
                .specialization
                .as_deref()
                .map(visit_fee_heuristic)
                .unwrap_or(0.0);
            fee + PRESCRIPTION_LINE_FEE * visit.prescription_lines as f64
        })
        .sum();

    (BASE_FEE + charges).min(BILL_CAP).max(BILL_FLOOR)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsultationBill {
    pub consultation_fee: f64,
    pub medicine_charges: f64,
    pub test_charges: f64,
    pub subtotal: f64,
    pub gst: f64,
    pub total: f64,
}

/// Bill for a recorded consultation: fee, medicines, tests and 18% GST.
///
/// `tests` holds `(unit price, quantity)` pairs.
pub fn consultation_bill(medicine_count: usize, tests: &[(f64, i64)]) -> ConsultationBill {
    let medicine_charges = MEDICINE_FEE * medicine_count as f64;
    let test_charges: f64 = tests.iter().map(|(price, qty)| price * *qty as f64).sum();
    let subtotal = CONSULTATION_FEE + medicine_charges + test_charges;
    let gst = subtotal * GST_RATE;

    ConsultationBill {
        consultation_fee: CONSULTATION_FEE,
        medicine_charges: round2(medicine_charges),
        test_charges: round2(test_charges),
        subtotal: round2(subtotal),
        gst: round2(gst),
        total: round2(subtotal + gst),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentSummary {
    pub amount: f64,
    pub tax: f64,
    pub discount: f64,
    pub total: f64,
}

/// Consultation payment: amount plus 18% tax less a flat 50 discount
pub fn consultation_payment(amount: f64) -> PaymentSummary {
    let tax = amount * PAYMENT_TAX_RATE;
    PaymentSummary {
        amount: round2(amount),
        tax: round2(tax),
        discount: PAYMENT_DISCOUNT,
        total: round2(amount + tax - PAYMENT_DISCOUNT),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderTotals {
    pub subtotal: f64,
    pub delivery: f64,
    pub tax: f64,
    pub total: f64,
}

/// Pharmacy order totals from `(unit price, quantity)` lines
pub fn pharmacy_order(lines: &[(f64, i64)]) -> OrderTotals {
    let subtotal: f64 = lines.iter().map(|(price, qty)| price * *qty as f64).sum();
    let tax = subtotal * PHARMACY_TAX_RATE;
    OrderTotals {
        subtotal: round2(subtotal),
        delivery: DELIVERY_CHARGE,
        tax: round2(tax),
        total: round2(subtotal + DELIVERY_CHARGE + tax),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn visit(specialization: Option<&str>, prescription_lines: usize) -> VisitCharges {
        VisitCharges {
            specialization: specialization.map(str::to_string),
            prescription_lines,
        }
    }

    #[test]
    fn test_no_history_is_base_fee() {
        assert_eq!(estimate_patient_bill_heuristic(&[]), 500.0);
    }

    #[test]
    fn test_fees_by_specialization() {
        assert_eq!(estimate_patient_bill_heuristic(&[visit(Some("Cardiology"), 0)]), 1300.0);
        assert_eq!(estimate_patient_bill_heuristic(&[visit(Some("Pediatrics"), 2)]), 1200.0);
        assert_eq!(
            estimate_patient_bill_heuristic(&[visit(Some("General Medicine"), 1)]),
            950.0
        );
        assert_eq!(estimate_patient_bill_heuristic(&[visit(Some("Dermatology"), 0)]), 900.0);
    }

    #[test]
    fn test_unresolved_doctor_adds_only_prescriptions() {
        assert_eq!(estimate_patient_bill_heuristic(&[visit(None, 3)]), 650.0);
    }

    #[test]
    fn test_bill_is_capped() {
        let history: Vec<VisitCharges> = (0..10).map(|_| visit(Some("Cardiology"), 2)).collect();
        assert_eq!(estimate_patient_bill_heuristic(&history), 5000.0);
    }

    #[test]
    fn test_consultation_bill_with_tests() {
        let bill = consultation_bill(2, &[(450.0, 1), (150.0, 2)]);
        assert_eq!(bill.medicine_charges, 100.0);
        assert_eq!(bill.test_charges, 750.0);
        assert_eq!(bill.subtotal, 1350.0);
        assert_eq!(bill.gst, 243.0);
        assert_eq!(bill.total, 1593.0);
    }

    #[test]
    fn test_consultation_payment() {
        let payment = consultation_payment(1000.0);
        assert_eq!(payment.tax, 180.0);
        assert_eq!(payment.total, 1130.0);
    }

    #[test]
    fn test_pharmacy_order_totals() {
        let order = pharmacy_order(&[(20.0, 2), (40.0, 1)]);
        assert_eq!(order.subtotal, 80.0);
        assert_eq!(order.delivery, 50.0);
        assert_eq!(order.tax, 4.0);
        assert_eq!(order.total, 134.0);
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(10.005_1), 10.01);
        assert_eq!(round2(3.774_9), 3.77);
    }
}
