//! Lookups of the clinical records invoices are generated from.
//!
//! Services depend on [`ClinicalDirectory`] rather than on the repository
//! directly; every lookup is scoped to one hospital and a miss is a
//! [`ServiceError::NotFound`].

use async_trait::async_trait;
use medibill_core::clinical::{
    Appointment, Doctor, Hospital, LabOrder, Medication, Patient, Prescription,
};
use medibill_db::{ClinicalRepository, DbResult};

use crate::error::{ServiceError, ServiceResult};

/// Read access to hospitals, patients, doctors, source documents and the
/// medication catalog.
#[async_trait]
pub trait ClinicalDirectory: Send + Sync {
    async fn hospital(&self, id: &str) -> DbResult<Option<Hospital>>;
    async fn patient(&self, hospital_id: &str, id: &str) -> DbResult<Option<Patient>>;
    async fn doctor(&self, hospital_id: &str, id: &str) -> DbResult<Option<Doctor>>;
    async fn appointment(&self, hospital_id: &str, id: &str) -> DbResult<Option<Appointment>>;
    async fn prescription(&self, hospital_id: &str, id: &str) -> DbResult<Option<Prescription>>;
    async fn lab_order(&self, hospital_id: &str, id: &str) -> DbResult<Option<LabOrder>>;
    async fn medication(&self, hospital_id: &str, id: &str) -> DbResult<Option<Medication>>;
}

#[async_trait]
impl ClinicalDirectory for ClinicalRepository {
    async fn hospital(&self, id: &str) -> DbResult<Option<Hospital>> {
        self.get_hospital(id).await
    }

    async fn patient(&self, hospital_id: &str, id: &str) -> DbResult<Option<Patient>> {
        self.get_patient(hospital_id, id).await
    }

    async fn doctor(&self, hospital_id: &str, id: &str) -> DbResult<Option<Doctor>> {
        self.get_doctor(hospital_id, id).await
    }

    async fn appointment(&self, hospital_id: &str, id: &str) -> DbResult<Option<Appointment>> {
        self.get_appointment(hospital_id, id).await
    }

    async fn prescription(&self, hospital_id: &str, id: &str) -> DbResult<Option<Prescription>> {
        self.get_prescription(hospital_id, id).await
    }

    async fn lab_order(&self, hospital_id: &str, id: &str) -> DbResult<Option<LabOrder>> {
        self.get_lab_order(hospital_id, id).await
    }

    async fn medication(&self, hospital_id: &str, id: &str) -> DbResult<Option<Medication>> {
        self.get_medication(hospital_id, id).await
    }
}

/// Turns a lookup miss into `NotFound`.
pub(crate) fn found<T>(value: Option<T>, entity: &str, id: &str) -> ServiceResult<T> {
    value.ok_or_else(|| ServiceError::not_found(entity, id))
}
