//! Smart-Rx Core Library
//!
//! Clinical prescription drafting: patient history analysis, rule-based
//! treatment recommendation and prescription persistence.
//!
//! # Architecture
//!
//! ```text
//! Patient + history ──► History Analyzer ──► HistoryAnalysis
//!                                                 │
//!              ┌──────────────────────────────────┤
//!              │                                  │
//!              ▼                                  ▼
//!     Generative service               Rule-Based Fallback
//!     (smart-rx-llm crate)                 Recommender
//!              │                                  │
//!              └──────────────┬───────────────────┘
//!                             ▼
//!                  Pending PrescriptionRecord
//!                             │
//!                      Doctor review/edit
//!                             │
//!                             ▼
//!                   Store (status: active)
//! ```
//!
//! # Core Principle
//!
//! **Every generated prescription is a draft.** Nothing is persisted until a
//! doctor saves the reviewed record.
//!
//! # Modules
//!
//! - [`db`]: SQLite store for patients and prescriptions
//! - [`models`]: Domain types (Patient, PrescriptionRecord, Recommendation, etc.)
//! - [`analysis`]: Prescription history analyzer
//! - [`recommender`]: Rule-based fallback recommender
//! - [`store`]: Store trait consumed by drafting code

pub mod analysis;
pub mod db;
pub mod models;
pub mod recommender;
pub mod store;

// Re-export commonly used types
pub use analysis::analyze_history;
pub use db::{Database, DbError, DbResult};
pub use models::{
    HistoryAnalysis, MedicationCount, MedicationEntry, Patient, PatientUpdate, PrescriptionRecord,
    PrescriptionStatus, Recommendation, RecommendationSource,
};
pub use recommender::FallbackRecommender;
pub use store::PrescriptionStore;

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum SmartRxError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<db::DbError> for SmartRxError {
    fn from(e: db::DbError) -> Self {
        match e {
            db::DbError::NotFound(what) => SmartRxError::NotFound(what),
            db::DbError::Constraint(msg) => SmartRxError::InvalidInput(msg),
            other => SmartRxError::DatabaseError(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for SmartRxError {
    fn from(e: serde_json::Error) -> Self {
        SmartRxError::SerializationError(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for SmartRxError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        SmartRxError::DatabaseError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open or create a database at the given path.
#[uniffi::export]
pub fn open_database(path: String) -> Result<Arc<SmartRxCore>, SmartRxError> {
    let db = Database::open(&path)?;
    Ok(Arc::new(SmartRxCore {
        db: Arc::new(Mutex::new(db)),
    }))
}

/// Create an in-memory database (for testing).
#[uniffi::export]
pub fn open_database_in_memory() -> Result<Arc<SmartRxCore>, SmartRxError> {
    let db = Database::open_in_memory()?;
    Ok(Arc::new(SmartRxCore {
        db: Arc::new(Mutex::new(db)),
    }))
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe database wrapper for FFI.
#[derive(uniffi::Object)]
pub struct SmartRxCore {
    db: Arc<Mutex<Database>>,
}

#[uniffi::export]
impl SmartRxCore {
    // =========================================================================
    // Patient Operations
    // =========================================================================

    /// Create a new patient.
    pub fn create_patient(
        &self,
        name: String,
        age: Option<u32>,
        gender: Option<String>,
        allergies: Vec<String>,
    ) -> Result<FfiPatient, SmartRxError> {
        if name.trim().is_empty() {
            return Err(SmartRxError::InvalidInput("patient name is required".into()));
        }
        let db = self.db.lock()?;
        let mut patient = Patient::new(name);
        patient.age = age;
        patient.gender = gender;
        patient.allergies = allergies;
        db.insert_patient(&patient)?;
        Ok(patient.into())
    }

    /// Get a patient by ID.
    pub fn get_patient(&self, id: String) -> Result<Option<FfiPatient>, SmartRxError> {
        let db = self.db.lock()?;
        let patient = db.get_patient(&id)?;
        Ok(patient.map(|p| p.into()))
    }

    /// Search patients by name.
    pub fn search_patients(&self, query: String, limit: u32) -> Result<Vec<FfiPatient>, SmartRxError> {
        let db = self.db.lock()?;
        let patients = db.search_patients(&query, limit as usize)?;
        Ok(patients.into_iter().map(|p| p.into()).collect())
    }

    /// Apply a partial edit to a patient. `None` fields are left unchanged.
    pub fn update_patient(
        &self,
        id: String,
        update: FfiPatientUpdate,
    ) -> Result<FfiPatient, SmartRxError> {
        let db = self.db.lock()?;
        let patient = db.edit_patient(&id, update.into())?;
        Ok(patient.into())
    }

    /// All patients, ordered by name.
    pub fn list_patients(&self) -> Result<Vec<FfiPatient>, SmartRxError> {
        let db = self.db.lock()?;
        let patients = db.list_patients()?;
        Ok(patients.into_iter().map(|p| p.into()).collect())
    }

    // =========================================================================
    // Prescription Operations
    // =========================================================================

    /// Prescriptions across all patients in one status, newest first.
    pub fn list_prescriptions_by_status(
        &self,
        status: String,
    ) -> Result<Vec<FfiPrescription>, SmartRxError> {
        let status = parse_status(&status)?;
        let db = self.db.lock()?;
        let records = db.list_prescriptions_by_status(status)?;
        Ok(records.into_iter().map(|r| r.into()).collect())
    }

    /// A patient's prescriptions, newest first.
    pub fn list_prescriptions(&self, patient_id: String) -> Result<Vec<FfiPrescription>, SmartRxError> {
        let db = self.db.lock()?;
        let records = db.list_prescriptions(&patient_id, true)?;
        Ok(records.into_iter().map(|r| r.into()).collect())
    }

    /// Summarize a patient's prescription history as of now.
    pub fn analyze_history(&self, patient_id: String) -> Result<FfiHistoryAnalysis, SmartRxError> {
        let db = self.db.lock()?;
        let patient = db.find_patient(&patient_id)?;
        let records = db.list_prescriptions(&patient_id, true)?;
        Ok(analysis::analyze_history(&patient, &records, Utc::now()).into())
    }

    /// Draft a prescription with the rule-based recommender only.
    ///
    /// The draft is returned with status `pending` and is not persisted.
    pub fn recommend_offline(
        &self,
        patient_id: String,
        symptoms: Vec<String>,
        diagnosis: Option<String>,
        doctor_id: String,
        doctor_name: String,
    ) -> Result<FfiPrescription, SmartRxError> {
        let db = self.db.lock()?;
        let patient = db.find_patient(&patient_id)?;
        let records = db.list_prescriptions(&patient_id, true)?;

        let now = Utc::now();
        let history = analysis::analyze_history(&patient, &records, now);
        let recommendation = FallbackRecommender::new().recommend(
            &symptoms,
            &patient.allergies,
            &history,
            diagnosis.as_deref(),
        );

        let draft = PrescriptionRecord::draft(
            &patient,
            &recommendation,
            RecommendationSource::RuleBased,
            &symptoms,
            &doctor_id,
            &doctor_name,
            now,
        );
        Ok(draft.into())
    }

    /// Persist a reviewed prescription as active. Returns the new ID.
    pub fn save_prescription(&self, prescription: FfiPrescription) -> Result<String, SmartRxError> {
        let record = PrescriptionRecord::try_from(prescription)?.into_saved(Utc::now());
        record.validate().map_err(SmartRxError::InvalidInput)?;

        let db = self.db.lock()?;
        db.insert_prescription(&record)?;
        Ok(record.id)
    }

    /// Approve a pending prescription.
    pub fn approve_prescription(&self, id: String) -> Result<FfiPrescription, SmartRxError> {
        let db = self.db.lock()?;
        let record = db.update_prescription_status(&id, PrescriptionStatus::Active)?;
        Ok(record.into())
    }

    /// Move a prescription to `status` ("active", "completed", "cancelled").
    /// Transitions the lifecycle does not allow fail with `InvalidInput`.
    pub fn set_prescription_status(
        &self,
        id: String,
        status: String,
    ) -> Result<FfiPrescription, SmartRxError> {
        let status = parse_status(&status)?;
        let db = self.db.lock()?;
        let record = db.update_prescription_status(&id, status)?;
        Ok(record.into())
    }
}

fn parse_status(status: &str) -> Result<PrescriptionStatus, SmartRxError> {
    PrescriptionStatus::parse(status)
        .ok_or_else(|| SmartRxError::InvalidInput(format!("unknown status: {}", status)))
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe patient.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatient {
    pub id: String,
    pub name: String,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub allergies: Vec<String>,
    pub medical_history: Vec<String>,
    pub condition: Option<String>,
}

impl From<Patient> for FfiPatient {
    fn from(patient: Patient) -> Self {
        Self {
            id: patient.id,
            name: patient.name,
            age: patient.age,
            gender: patient.gender,
            allergies: patient.allergies,
            medical_history: patient.medical_history,
            condition: patient.condition,
        }
    }
}

/// FFI-safe partial patient edit.
#[derive(Debug, Clone, Default, uniffi::Record)]
pub struct FfiPatientUpdate {
    pub name: Option<String>,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub allergies: Option<Vec<String>>,
    pub medical_history: Option<Vec<String>>,
    pub condition: Option<String>,
}

impl From<FfiPatientUpdate> for PatientUpdate {
    fn from(update: FfiPatientUpdate) -> Self {
        Self {
            name: update.name,
            age: update.age,
            gender: update.gender,
            allergies: update.allergies,
            medical_history: update.medical_history,
            condition: update.condition,
        }
    }
}

/// FFI-safe medication line.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiMedication {
    pub name: String,
    pub strength: String,
    pub frequency: String,
    pub duration: String,
    pub instructions: Option<String>,
}

impl From<MedicationEntry> for FfiMedication {
    fn from(med: MedicationEntry) -> Self {
        Self {
            name: med.name,
            strength: med.strength,
            frequency: med.frequency,
            duration: med.duration,
            instructions: med.instructions,
        }
    }
}

impl From<FfiMedication> for MedicationEntry {
    fn from(med: FfiMedication) -> Self {
        MedicationEntry {
            name: med.name,
            strength: med.strength,
            frequency: med.frequency,
            duration: med.duration,
            instructions: med.instructions,
        }
    }
}

/// FFI-safe prescription. Timestamps are RFC 3339 strings.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPrescription {
    pub id: String,
    pub patient_id: String,
    pub patient_name: String,
    pub diagnosis: String,
    pub symptoms: Vec<String>,
    pub date: String,
    pub medications: Vec<FfiMedication>,
    pub doctor_id: String,
    pub doctor_name: String,
    pub status: String,
    pub source: String,
    pub confidence: Option<f64>,
    pub reasoning: String,
    pub conflict_warnings: Vec<String>,
    pub recommendations: Vec<String>,
    pub notes: String,
    pub history_insights: String,
}

impl From<PrescriptionRecord> for FfiPrescription {
    fn from(record: PrescriptionRecord) -> Self {
        Self {
            id: record.id,
            patient_id: record.patient_id,
            patient_name: record.patient_name,
            diagnosis: record.diagnosis,
            symptoms: record.symptoms,
            date: record.date.to_rfc3339(),
            medications: record.medications.into_iter().map(|m| m.into()).collect(),
            doctor_id: record.doctor_id,
            doctor_name: record.doctor_name,
            status: record.status.as_str().to_string(),
            source: record.source.as_str().to_string(),
            confidence: record.confidence,
            reasoning: record.reasoning,
            conflict_warnings: record.conflict_warnings,
            recommendations: record.recommendations,
            notes: record.notes,
            history_insights: record.history_insights,
        }
    }
}

impl TryFrom<FfiPrescription> for PrescriptionRecord {
    type Error = SmartRxError;

    fn try_from(p: FfiPrescription) -> Result<Self, Self::Error> {
        let date = DateTime::parse_from_rfc3339(&p.date)
            .map(|d| d.with_timezone(&Utc))
            .map_err(|e| SmartRxError::InvalidInput(format!("date {}: {}", p.date, e)))?;
        let status = PrescriptionStatus::parse(&p.status)
            .ok_or_else(|| SmartRxError::InvalidInput(format!("unknown status: {}", p.status)))?;
        let source = RecommendationSource::parse(&p.source)
            .ok_or_else(|| SmartRxError::InvalidInput(format!("unknown source: {}", p.source)))?;
        let now = Utc::now();

        Ok(PrescriptionRecord {
            id: p.id,
            patient_id: p.patient_id,
            patient_name: p.patient_name,
            diagnosis: p.diagnosis,
            symptoms: p.symptoms,
            date,
            medications: p.medications.into_iter().map(|m| m.into()).collect(),
            doctor_id: p.doctor_id,
            doctor_name: p.doctor_name,
            status,
            source,
            confidence: p.confidence,
            reasoning: p.reasoning,
            conflict_warnings: p.conflict_warnings,
            recommendations: p.recommendations,
            notes: p.notes,
            history_insights: p.history_insights,
            created_at: now,
            updated_at: now,
        })
    }
}

/// FFI-safe medication frequency.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiMedicationCount {
    pub name: String,
    pub count: u32,
}

/// FFI-safe history summary. Record lists are reduced to counts.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiHistoryAnalysis {
    pub has_history: bool,
    pub total_prescriptions: u32,
    pub active_prescriptions: u32,
    pub recent_prescriptions: u32,
    pub common_medications: Vec<FfiMedicationCount>,
    pub allergies: Vec<String>,
    pub warnings: Vec<String>,
    pub recommendations: Vec<String>,
}

impl From<HistoryAnalysis> for FfiHistoryAnalysis {
    fn from(analysis: HistoryAnalysis) -> Self {
        Self {
            has_history: analysis.has_history,
            total_prescriptions: analysis.total_prescriptions as u32,
            active_prescriptions: analysis.active_prescriptions.len() as u32,
            recent_prescriptions: analysis.recent_prescriptions.len() as u32,
            common_medications: analysis
                .common_medications
                .into_iter()
                .map(|m| FfiMedicationCount {
                    name: m.name,
                    count: m.count as u32,
                })
                .collect(),
            allergies: analysis.allergies,
            warnings: analysis.warnings,
            recommendations: analysis.recommendations,
        }
    }
}
