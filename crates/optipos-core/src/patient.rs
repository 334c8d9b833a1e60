//! # Patients
//!
//! Patient records with their glasses and contact-lens prescriptions.
//!
//! ## Prescription History
//! ```text
//! register(rx₀)        rx = rx₀   history = [rx₀@t0]
//! update_rx(rx₁)       rx = rx₁   history = [rx₀@t0, rx₁@t1]
//! update_rx(rx₂)       rx = rx₂   history = [rx₀@t0, rx₁@t1, rx₂@t2]
//! ```
//! History is append-only, in call order. Patients are never deleted.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

// =============================================================================
// Prescriptions
// =============================================================================

/// Refraction values for one eye. Diopters; axis in degrees.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct EyeRx {
    pub sphere: Option<f64>,
    pub cylinder: Option<f64>,
    pub axis: Option<u16>,
    pub add: Option<f64>,
}

impl EyeRx {
    /// Compact form for tickets: `-1.25 / -0.50 x 180 add +2.00`.
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if let Some(sphere) = self.sphere {
            parts.push(format!("{:+.2}", sphere));
        }
        if let Some(cylinder) = self.cylinder {
            parts.push(format!("/ {:+.2}", cylinder));
        }
        if let Some(axis) = self.axis {
            parts.push(format!("x {}", axis));
        }
        if let Some(add) = self.add {
            parts.push(format!("add {:+.2}", add));
        }
        if parts.is_empty() {
            "-".to_string()
        } else {
            parts.join(" ")
        }
    }
}

/// A glasses prescription.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct RxData {
    pub right: EyeRx,
    pub left: EyeRx,
    /// Monocular pupillary distance in millimetres.
    pub pd_right: Option<f64>,
    pub pd_left: Option<f64>,
}

impl RxData {
    pub fn pd_summary(&self) -> String {
        match (self.pd_right, self.pd_left) {
            (Some(r), Some(l)) => format!("{:.1} / {:.1}", r, l),
            (Some(r), None) => format!("{:.1} / -", r),
            (None, Some(l)) => format!("- / {:.1}", l),
            (None, None) => "-".to_string(),
        }
    }
}

/// One entry of `rx_history`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct RxSnapshot {
    pub rx: RxData,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ContactLensEyeRx {
    pub sphere: Option<f64>,
    pub cylinder: Option<f64>,
    pub axis: Option<u16>,
    pub base_curve: Option<f64>,
    pub diameter: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ContactLensRx {
    pub id: String,
    pub right: ContactLensEyeRx,
    pub left: ContactLensEyeRx,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PatientNote {
    pub id: String,
    pub text: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Patient
// =============================================================================

/// Registration form input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewPatient {
    pub name: String,
    pub phone: String,
    #[ts(as = "Option<String>")]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub rx: Option<RxData>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: String,
    pub name: String,
    pub phone: String,
    #[ts(as = "Option<String>")]
    pub date_of_birth: Option<NaiveDate>,
    /// Free-text notes from the registration form.
    pub notes: String,
    /// Current glasses prescription.
    pub rx: Option<RxData>,
    pub rx_history: Vec<RxSnapshot>,
    #[serde(default)]
    pub contact_lens_rx_history: Vec<ContactLensRx>,
    #[serde(default)]
    pub patient_notes: Vec<PatientNote>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Patient {
    pub fn register(input: NewPatient, now: DateTime<Utc>) -> Self {
        let mut patient = Patient {
            id: Uuid::new_v4().to_string(),
            name: input.name.trim().to_string(),
            phone: input.phone.trim().to_string(),
            date_of_birth: input.date_of_birth,
            notes: input.notes,
            rx: None,
            rx_history: Vec::new(),
            contact_lens_rx_history: Vec::new(),
            patient_notes: Vec::new(),
            created_at: now,
        };
        if let Some(rx) = input.rx {
            patient.update_prescription(rx, now);
        }
        patient
    }

    /// Sets the current prescription and appends it to the history.
    pub fn update_prescription(&mut self, rx: RxData, now: DateTime<Utc>) {
        self.rx_history.push(RxSnapshot {
            rx: rx.clone(),
            created_at: now,
        });
        self.rx = Some(rx);
    }

    pub fn add_contact_lens_rx(
        &mut self,
        right: ContactLensEyeRx,
        left: ContactLensEyeRx,
        now: DateTime<Utc>,
    ) -> &ContactLensRx {
        self.contact_lens_rx_history.push(ContactLensRx {
            id: Uuid::new_v4().to_string(),
            right,
            left,
            created_at: now,
        });
        &self.contact_lens_rx_history[self.contact_lens_rx_history.len() - 1]
    }

    pub fn add_note(&mut self, text: impl Into<String>, now: DateTime<Utc>) -> &PatientNote {
        self.patient_notes.push(PatientNote {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            created_at: now,
        });
        &self.patient_notes[self.patient_notes.len() - 1]
    }

    /// Case-insensitive match on name, or digit match on phone.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim();
        if query.is_empty() {
            return true;
        }
        if self.name.to_lowercase().contains(&query.to_lowercase()) {
            return true;
        }
        let digits: String = query.chars().filter(char::is_ascii_digit).collect();
        let phone: String = self.phone.chars().filter(char::is_ascii_digit).collect();
        !digits.is_empty() && phone.contains(&digits)
    }
}

/// Patients matching `query`, in stored order.
pub fn search<'a>(patients: &'a [Patient], query: &str) -> Vec<&'a Patient> {
    patients.iter().filter(|p| p.matches(query)).collect()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn rx(sphere: f64) -> RxData {
        RxData {
            right: EyeRx {
                sphere: Some(sphere),
                cylinder: Some(-0.5),
                axis: Some(180),
                add: None,
            },
            left: EyeRx {
                sphere: Some(sphere),
                ..Default::default()
            },
            pd_right: Some(31.5),
            pd_left: Some(32.0),
        }
    }

    fn new_patient() -> NewPatient {
        NewPatient {
            name: "  Fatima Al-Sabah ".into(),
            phone: "+965 5555 1234".into(),
            rx: Some(rx(-1.25)),
            ..Default::default()
        }
    }

    #[test]
    fn test_register_records_initial_prescription() {
        let now = Utc::now();
        let patient = Patient::register(new_patient(), now);

        assert_eq!(patient.name, "Fatima Al-Sabah");
        assert_eq!(patient.rx_history.len(), 1);
        assert_eq!(patient.rx, Some(rx(-1.25)));
    }

    #[test]
    fn test_prescription_history_is_append_only() {
        let t0 = Utc::now();
        let mut patient = Patient::register(new_patient(), t0);

        patient.update_prescription(rx(-1.5), t0 + Duration::days(30));
        patient.update_prescription(rx(-1.75), t0 + Duration::days(60));

        let spheres: Vec<_> = patient
            .rx_history
            .iter()
            .map(|s| s.rx.right.sphere)
            .collect();
        assert_eq!(spheres, vec![Some(-1.25), Some(-1.5), Some(-1.75)]);
        assert_eq!(patient.rx, Some(rx(-1.75)));
    }

    #[test]
    fn test_notes_append_in_order() {
        let now = Utc::now();
        let mut patient = Patient::register(new_patient(), now);
        patient.add_note("Prefers light frames", now);
        patient.add_note("Called about pickup", now);

        assert_eq!(patient.patient_notes.len(), 2);
        assert_eq!(patient.patient_notes[1].text, "Called about pickup");
    }

    #[test]
    fn test_search_by_name_and_phone() {
        let now = Utc::now();
        let patients = vec![
            Patient::register(new_patient(), now),
            Patient::register(
                NewPatient {
                    name: "Omar".into(),
                    phone: "9999 0000".into(),
                    ..Default::default()
                },
                now,
            ),
        ];

        assert_eq!(search(&patients, "fatima").len(), 1);
        assert_eq!(search(&patients, "5555-1234").len(), 1);
        assert_eq!(search(&patients, "").len(), 2);
        assert!(search(&patients, "nobody").is_empty());
    }

    #[test]
    fn test_eye_rx_summary() {
        assert_eq!(rx(-1.25).right.summary(), "-1.25 / -0.50 x 180");
        assert_eq!(EyeRx::default().summary(), "-");
        assert_eq!(rx(0.0).pd_summary(), "31.5 / 32.0");
    }
}
