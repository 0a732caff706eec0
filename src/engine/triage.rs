//! Symptom routing heuristic
//!
//! Keyword matching that picks the specialization a front-desk clerk would
//! suggest for a patient. It is a static rule table, not a classifier.

use serde::{Deserialize, Serialize};

/// Patients younger than this always route to Pediatrics
pub const PEDIATRIC_AGE_LIMIT: i64 = 18;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Specialization {
    Cardiology,
    Pediatrics,
    #[serde(rename = "General Medicine")]
    GeneralMedicine,
}

impl Specialization {
    /// Name as stored in the doctors table
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cardiology => "Cardiology",
            Self::Pediatrics => "Pediatrics",
            Self::GeneralMedicine => "General Medicine",
        }
    }
}

impl std::fmt::Display for Specialization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered rules, first match wins. Keywords are lower case.
pub const SYMPTOM_RULES: &[(&[&str], Specialization)] = &[
    (&["heart", "chest", "cardiac"], Specialization::Cardiology),
    (&["child", "baby"], Specialization::Pediatrics),
];

/// Route free-text symptoms to a specialization
pub fn route_symptoms_heuristic(symptoms: &str) -> Specialization {
    let symptoms = symptoms.to_lowercase();
    SYMPTOM_RULES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| symptoms.contains(k)))
        .map(|(_, specialization)| *specialization)
        .unwrap_or(Specialization::GeneralMedicine)
}

/// Route a patient, letting the age override beat the symptom text
pub fn route_patient_heuristic(symptoms: &str, age: i64) -> Specialization {
    if age < PEDIATRIC_AGE_LIMIT {
        Specialization::Pediatrics
    } else {
        route_symptoms_heuristic(symptoms)
    }
}
