//! Prescription drafting pipeline.
//!
//! History Analyzer → Prompt Builder → Generative service → Response
//! Interpreter, with the rule-based recommender standing in whenever the
//! service is disabled, fails, times out or replies with nothing.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smart_rx_core::analysis::analyze_history;
use smart_rx_core::db::DbError;
use smart_rx_core::models::{
    HistoryAnalysis, Patient, PrescriptionRecord, PrescriptionStatus, Recommendation,
    RecommendationSource,
};
use smart_rx_core::recommender::{resolve_diagnosis, FallbackRecommender};
use smart_rx_core::store::PrescriptionStore;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::client::{complete_with_timeout, GenerativeTextService};
use crate::config::DEFAULT_TIMEOUT_SECS;
use crate::extraction::{interpret, Interpretation};
use crate::prompts::build_prescription_prompt;

/// Orchestrator errors. Generative service failures never appear here.
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Store error: {0}")]
    Store(DbError),

    #[error("Invalid prescription: {0}")]
    InvalidRecord(String),

    #[error("Invalid status transition: {0}")]
    InvalidTransition(String),
}

impl From<DbError> for OrchestratorError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound(what) => OrchestratorError::NotFound(what),
            other => OrchestratorError::Store(other),
        }
    }
}

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

/// Input for one drafting request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrescriptionRequest {
    pub patient_id: String,
    pub symptoms: Vec<String>,
    pub diagnosis: Option<String>,
    pub doctor_id: String,
    pub doctor_name: String,
}

/// A drafted prescription awaiting doctor review.
#[derive(Debug, Clone)]
pub struct GeneratedPrescription {
    /// Pending, not persisted
    pub record: PrescriptionRecord,
    pub recommendation: Recommendation,
    pub history_analysis: HistoryAnalysis,
}

impl GeneratedPrescription {
    pub fn source(&self) -> RecommendationSource {
        self.record.source
    }
}

/// Sequences one drafting request against a store and an optional service.
pub struct PrescriptionOrchestrator<'a, S: PrescriptionStore> {
    store: &'a S,
    service: Option<Arc<dyn GenerativeTextService>>,
    recommender: FallbackRecommender,
    timeout: Duration,
}

impl<'a, S: PrescriptionStore> PrescriptionOrchestrator<'a, S> {
    /// Create an orchestrator with no generative service.
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            service: None,
            recommender: FallbackRecommender::new(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_service(mut self, service: Arc<dyn GenerativeTextService>) -> Self {
        self.service = Some(service);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Draft a prescription as of now.
    pub async fn generate(
        &self,
        request: &PrescriptionRequest,
    ) -> OrchestratorResult<GeneratedPrescription> {
        self.generate_at(request, Utc::now()).await
    }

    /// Draft a prescription as of `now`.
    ///
    /// Fails only when the patient is unknown or the store cannot be read.
    pub async fn generate_at(
        &self,
        request: &PrescriptionRequest,
        now: DateTime<Utc>,
    ) -> OrchestratorResult<GeneratedPrescription> {
        let patient = self.store.find_patient(&request.patient_id)?;
        let history = self.store.list_prescriptions(&patient.id, true)?;
        let analysis = analyze_history(&patient, &history, now);

        let (mut recommendation, source) = match self.try_generate(&patient, request, &analysis).await
        {
            Some(Interpretation {
                recommendation,
                source,
            }) => (recommendation, source),
            None => (
                self.recommender.recommend(
                    &request.symptoms,
                    &patient.allergies,
                    &analysis,
                    request.diagnosis.as_deref(),
                ),
                RecommendationSource::RuleBased,
            ),
        };

        if recommendation.diagnosis.trim().is_empty() {
            recommendation.diagnosis =
                resolve_diagnosis(request.diagnosis.as_deref(), &request.symptoms);
        }

        let record = PrescriptionRecord::draft(
            &patient,
            &recommendation,
            source,
            &request.symptoms,
            &request.doctor_id,
            &request.doctor_name,
            now,
        );

        info!(
            patient_id = %patient.id,
            source = source.as_str(),
            confidence = recommendation.confidence,
            medications = recommendation.medications.len(),
            "Prescription drafted"
        );

        Ok(GeneratedPrescription {
            record,
            recommendation,
            history_analysis: analysis,
        })
    }

    /// Call the service once. `None` means use the rule-based recommender.
    async fn try_generate(
        &self,
        patient: &Patient,
        request: &PrescriptionRequest,
        analysis: &HistoryAnalysis,
    ) -> Option<Interpretation> {
        let Some(service) = self.service.as_ref() else {
            debug!(patient_id = %patient.id, "Generative service disabled, using rule-based recommender");
            return None;
        };

        let prompt = build_prescription_prompt(
            patient,
            &request.symptoms,
            request.diagnosis.as_deref(),
            analysis,
        );

        match complete_with_timeout(service.as_ref(), &prompt, self.timeout).await {
            Ok(text) => Some(interpret(&text)),
            Err(e) => {
                warn!(
                    error = %e,
                    patient_id = %patient.id,
                    "Generative service failed, using rule-based recommender"
                );
                None
            }
        }
    }

    /// Persist a reviewed prescription as active and return its new ID.
    ///
    /// A fresh ID is issued on every call; retrying a save that already
    /// succeeded stores a duplicate.
    pub fn save(&self, record: PrescriptionRecord) -> OrchestratorResult<String> {
        let record = record.into_saved(Utc::now());
        record
            .validate()
            .map_err(OrchestratorError::InvalidRecord)?;

        let id = self.store.insert_prescription(&record)?;
        info!(prescription_id = %id, patient_id = %record.patient_id, "Prescription saved");
        Ok(id)
    }

    /// Approve a pending prescription.
    pub fn approve(&self, prescription_id: &str) -> OrchestratorResult<PrescriptionRecord> {
        self.transition(prescription_id, PrescriptionStatus::Active)
    }

    /// Mark an active prescription as completed.
    pub fn complete(&self, prescription_id: &str) -> OrchestratorResult<PrescriptionRecord> {
        self.transition(prescription_id, PrescriptionStatus::Completed)
    }

    /// Cancel a pending or active prescription.
    pub fn cancel(&self, prescription_id: &str) -> OrchestratorResult<PrescriptionRecord> {
        self.transition(prescription_id, PrescriptionStatus::Cancelled)
    }

    /// Apply one lifecycle transition.
    pub fn transition(
        &self,
        prescription_id: &str,
        status: PrescriptionStatus,
    ) -> OrchestratorResult<PrescriptionRecord> {
        let record = self
            .store
            .update_prescription_status(prescription_id, status)
            .map_err(|e| match e {
                DbError::Constraint(msg) => OrchestratorError::InvalidTransition(msg),
                other => other.into(),
            })?;
        info!(prescription_id, status = status.as_str(), "Prescription status updated");
        Ok(record)
    }
}
