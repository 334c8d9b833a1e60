//! # Patient Commands
//!
//! Registration, prescriptions, notes and lookup.

use tracing::{debug, info};

use optipos_core::patient::{self, ContactLensEyeRx, NewPatient, RxData};
use optipos_core::validation::{validate_name, validate_note, validate_phone};
use optipos_core::{Change, Command, Invoice, Patient};

use crate::error::{ApiError, ApiResult};
use crate::state::StoreState;

fn expect_patient(change: Change) -> ApiResult<Patient> {
    match change {
        Change::Patient(patient) => Ok(patient),
        other => Err(ApiError::internal(format!("unexpected change: {:?}", other))),
    }
}

pub async fn register_patient(store: &StoreState, input: NewPatient) -> ApiResult<Patient> {
    debug!("register_patient command");
    validate_name(&input.name)?;
    validate_phone(&input.phone)?;

    let patient = expect_patient(store.execute(Command::RegisterPatient(input)).await?)?;
    info!(patient_id = %patient.id, "Patient registered");
    Ok(patient)
}

/// Replaces the current prescription; the old one stays in the history.
pub async fn update_prescription(
    store: &StoreState,
    patient_id: String,
    rx: RxData,
) -> ApiResult<Patient> {
    debug!(patient_id = %patient_id, "update_prescription command");
    expect_patient(
        store
            .execute(Command::UpdatePrescription { patient_id, rx })
            .await?,
    )
}

pub async fn add_contact_lens_rx(
    store: &StoreState,
    patient_id: String,
    right: ContactLensEyeRx,
    left: ContactLensEyeRx,
) -> ApiResult<Patient> {
    debug!(patient_id = %patient_id, "add_contact_lens_rx command");
    expect_patient(
        store
            .execute(Command::AddContactLensRx {
                patient_id,
                right,
                left,
            })
            .await?,
    )
}

pub async fn add_patient_note(
    store: &StoreState,
    patient_id: String,
    text: String,
) -> ApiResult<Patient> {
    debug!(patient_id = %patient_id, "add_patient_note command");
    validate_note(&text)?;
    expect_patient(
        store
            .execute(Command::AddPatientNote {
                patient_id,
                text: text.trim().to_string(),
            })
            .await?,
    )
}

pub fn get_patient(store: &StoreState, patient_id: &str) -> ApiResult<Patient> {
    store
        .snapshot()
        .patient(patient_id)
        .cloned()
        .ok_or_else(|| ApiError::not_found("Patient", patient_id))
}

/// Name substring or phone digits; an empty query lists everyone.
pub fn search_patients(store: &StoreState, query: &str) -> Vec<Patient> {
    let snapshot = store.snapshot();
    patient::search(&snapshot.patients, query)
        .into_iter()
        .cloned()
        .collect()
}

pub fn patient_invoices(store: &StoreState, patient_id: &str) -> Vec<Invoice> {
    store
        .snapshot()
        .invoices_for_patient(patient_id)
        .into_iter()
        .cloned()
        .collect()
}
