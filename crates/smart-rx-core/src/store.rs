//! Store interface consumed by prescription drafting.

use crate::db::{Database, DbError, DbResult};
use crate::models::{Patient, PrescriptionRecord, PrescriptionStatus};

/// Read/write access to patients and prescriptions.
///
/// `Database` is the production implementation; drafting code only depends
/// on this trait.
pub trait PrescriptionStore {
    /// Load a patient, failing with [`DbError::NotFound`] for unknown IDs.
    fn find_patient(&self, id: &str) -> DbResult<Patient>;

    /// All prescriptions for a patient, sorted by issue date.
    fn list_prescriptions(
        &self,
        patient_id: &str,
        newest_first: bool,
    ) -> DbResult<Vec<PrescriptionRecord>>;

    /// Persist a record, returning its ID.
    fn insert_prescription(&self, record: &PrescriptionRecord) -> DbResult<String>;

    /// Apply a lifecycle transition.
    fn update_prescription_status(
        &self,
        id: &str,
        status: PrescriptionStatus,
    ) -> DbResult<PrescriptionRecord>;
}

impl PrescriptionStore for Database {
    fn find_patient(&self, id: &str) -> DbResult<Patient> {
        self.get_patient(id)?
            .ok_or_else(|| DbError::NotFound(format!("patient {}", id)))
    }

    fn list_prescriptions(
        &self,
        patient_id: &str,
        newest_first: bool,
    ) -> DbResult<Vec<PrescriptionRecord>> {
        self.list_prescriptions_for_patient(patient_id, newest_first)
    }

    fn insert_prescription(&self, record: &PrescriptionRecord) -> DbResult<String> {
        Database::insert_prescription(self, record)?;
        Ok(record.id.clone())
    }

    fn update_prescription_status(
        &self,
        id: &str,
        status: PrescriptionStatus,
    ) -> DbResult<PrescriptionRecord> {
        Database::update_prescription_status(self, id, status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_patient_not_found() {
        let db = Database::open_in_memory().unwrap();
        let result = db.find_patient("missing");
        assert!(matches!(result, Err(DbError::NotFound(_))));
    }

    #[test]
    fn test_insert_returns_id() {
        let db = Database::open_in_memory().unwrap();
        let patient = Patient::new("Jane".into());
        db.insert_patient(&patient).unwrap();

        let record = PrescriptionRecord::new(patient.id.clone(), "Flu".into());
        let id = PrescriptionStore::insert_prescription(&db, &record).unwrap();
        assert_eq!(id, record.id);

        let listed = db.list_prescriptions(&patient.id, true).unwrap();
        assert_eq!(listed.len(), 1);
    }
}
