//! Prescription models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::patient::Patient;
use super::recommendation::Recommendation;

/// A single medication line embedded in a prescription.
///
/// Stored documents carry medications either as objects or as bare name
/// strings. Both shapes deserialize into this type; absent fields become
/// empty strings.
#[derive(Debug, Clone, Serialize, PartialEq, Default)]
pub struct MedicationEntry {
    /// Drug name (e.g., "Amoxicillin")
    pub name: String,
    /// Strength (e.g., "500mg")
    pub strength: String,
    /// Frequency (e.g., "Every 8 hours")
    pub frequency: String,
    /// Duration (e.g., "10 days")
    pub duration: String,
    /// Patient-facing instructions
    pub instructions: Option<String>,
}

impl MedicationEntry {
    /// Create a fully specified entry.
    pub fn new(
        name: &str,
        strength: &str,
        frequency: &str,
        duration: &str,
        instructions: &str,
    ) -> Self {
        Self {
            name: name.to_string(),
            strength: strength.to_string(),
            frequency: frequency.to_string(),
            duration: duration.to_string(),
            instructions: Some(instructions.to_string()),
        }
    }

    /// Entry carrying only a drug name.
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// One-line summary, e.g. "Amoxicillin 500mg - Every 8 hours for 10 days".
    pub fn summary(&self) -> String {
        let mut line = self.name.clone();
        if !self.strength.is_empty() {
            line.push(' ');
            line.push_str(&self.strength);
        }
        if !self.frequency.is_empty() {
            line.push_str(" - ");
            line.push_str(&self.frequency);
        }
        if !self.duration.is_empty() {
            line.push_str(" for ");
            line.push_str(&self.duration);
        }
        line
    }
}

/// Object form of a stored medication; every field optional.
#[derive(Deserialize, Default)]
#[serde(default)]
struct MedicationFields {
    name: Option<String>,
    strength: Option<String>,
    frequency: Option<String>,
    duration: Option<String>,
    instructions: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredMedication {
    Name(String),
    Entry(MedicationFields),
}

impl<'de> Deserialize<'de> for MedicationEntry {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match StoredMedication::deserialize(deserializer)? {
            StoredMedication::Name(name) => MedicationEntry {
                name,
                ..MedicationEntry::default()
            },
            StoredMedication::Entry(fields) => MedicationEntry {
                name: fields.name.unwrap_or_default(),
                strength: fields.strength.unwrap_or_default(),
                frequency: fields.frequency.unwrap_or_default(),
                duration: fields.duration.unwrap_or_default(),
                instructions: fields.instructions,
            },
        })
    }
}

/// Lifecycle status of a prescription.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PrescriptionStatus {
    /// Drafted, awaiting doctor review
    Pending,
    /// Approved by the doctor
    Active,
    /// Course finished
    Completed,
    /// Withdrawn
    Cancelled,
}

impl PrescriptionStatus {
    /// Storage/wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            PrescriptionStatus::Pending => "pending",
            PrescriptionStatus::Active => "active",
            PrescriptionStatus::Completed => "completed",
            PrescriptionStatus::Cancelled => "cancelled",
        }
    }

    /// Parse the storage representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PrescriptionStatus::Pending),
            "active" => Some(PrescriptionStatus::Active),
            "completed" => Some(PrescriptionStatus::Completed),
            "cancelled" => Some(PrescriptionStatus::Cancelled),
            _ => None,
        }
    }

    /// Whether a record in this status may move to `next`.
    pub fn can_transition_to(&self, next: PrescriptionStatus) -> bool {
        matches!(
            (self, next),
            (PrescriptionStatus::Pending, PrescriptionStatus::Active)
                | (PrescriptionStatus::Pending, PrescriptionStatus::Cancelled)
                | (PrescriptionStatus::Active, PrescriptionStatus::Completed)
                | (PrescriptionStatus::Active, PrescriptionStatus::Cancelled)
        )
    }
}

/// Where the content of a prescription came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationSource {
    /// Parsed from the generative service's JSON reply
    Ai,
    /// Generative service replied without usable JSON
    InterpreterFallback,
    /// Keyword table, service unavailable
    RuleBased,
    /// Written by the doctor
    Manual,
}

impl RecommendationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationSource::Ai => "ai",
            RecommendationSource::InterpreterFallback => "interpreter_fallback",
            RecommendationSource::RuleBased => "rule_based",
            RecommendationSource::Manual => "manual",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ai" => Some(RecommendationSource::Ai),
            "interpreter_fallback" => Some(RecommendationSource::InterpreterFallback),
            "rule_based" => Some(RecommendationSource::RuleBased),
            "manual" => Some(RecommendationSource::Manual),
            _ => None,
        }
    }
}

/// A prescription document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrescriptionRecord {
    /// Unique prescription ID
    pub id: String,
    /// Patient ID
    pub patient_id: String,
    /// Patient name (denormalized for display/export)
    #[serde(default)]
    pub patient_name: String,
    /// Diagnosis text
    pub diagnosis: String,
    /// Symptoms the draft was generated from
    #[serde(default)]
    pub symptoms: Vec<String>,
    /// Issue date
    pub date: DateTime<Utc>,
    /// Ordered medication lines
    #[serde(default)]
    pub medications: Vec<MedicationEntry>,
    /// Prescribing doctor ID
    #[serde(default)]
    pub doctor_id: String,
    /// Prescribing doctor name
    #[serde(default)]
    pub doctor_name: String,
    /// Lifecycle status
    pub status: PrescriptionStatus,
    /// Content origin
    pub source: RecommendationSource,
    /// Recommendation confidence (0.0 - 1.0), absent for manual records
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub conflict_warnings: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub history_insights: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl PrescriptionRecord {
    /// Create a manual prescription with required fields.
    pub fn new(patient_id: String, diagnosis: String) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            patient_id,
            patient_name: String::new(),
            diagnosis,
            symptoms: Vec::new(),
            date: now,
            medications: Vec::new(),
            doctor_id: String::new(),
            doctor_name: String::new(),
            status: PrescriptionStatus::Pending,
            source: RecommendationSource::Manual,
            confidence: None,
            reasoning: String::new(),
            conflict_warnings: Vec::new(),
            recommendations: Vec::new(),
            notes: String::new(),
            history_insights: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Build a pending draft from a recommendation.
    pub fn draft(
        patient: &Patient,
        recommendation: &Recommendation,
        source: RecommendationSource,
        symptoms: &[String],
        doctor_id: &str,
        doctor_name: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            patient_id: patient.id.clone(),
            patient_name: patient.name.clone(),
            diagnosis: recommendation.diagnosis.clone(),
            symptoms: symptoms.to_vec(),
            date: now,
            medications: recommendation.medications.clone(),
            doctor_id: doctor_id.to_string(),
            doctor_name: doctor_name.to_string(),
            status: PrescriptionStatus::Pending,
            source,
            confidence: Some(recommendation.confidence),
            reasoning: recommendation.reasoning.clone(),
            conflict_warnings: recommendation.conflict_warnings.clone(),
            recommendations: recommendation.recommendations.clone(),
            notes: recommendation.notes.clone(),
            history_insights: recommendation.history_insights.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Check the fields every persisted record must carry.
    pub fn validate(&self) -> Result<(), String> {
        if self.patient_id.trim().is_empty() {
            return Err("patient_id is required".into());
        }
        if self.diagnosis.trim().is_empty() {
            return Err("diagnosis is required".into());
        }
        Ok(())
    }

    /// Turn a reviewed draft into a record ready to persist.
    ///
    /// Every call issues a new ID, so saving the same draft twice stores two
    /// records.
    pub fn into_saved(mut self, now: DateTime<Utc>) -> Self {
        self.id = uuid::Uuid::new_v4().to_string();
        self.status = PrescriptionStatus::Active;
        self.created_at = now;
        self.updated_at = now;
        self
    }

    /// Whether this record is currently active.
    pub fn is_active(&self) -> bool {
        self.status == PrescriptionStatus::Active
    }

    /// Medication names in order, skipping blank entries.
    pub fn medication_names(&self) -> impl Iterator<Item = &str> {
        self.medications
            .iter()
            .map(|m| m.name.trim())
            .filter(|name| !name.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_medication_accepts_bare_string_and_object() {
        let json = r#"["Ibuprofen", {"name":"Amoxicillin","strength":"500mg","frequency":"Every 8 hours"}]"#;
        let meds: Vec<MedicationEntry> = serde_json::from_str(json).unwrap();

        assert_eq!(meds.len(), 2);
        assert_eq!(meds[0], MedicationEntry::named("Ibuprofen"));
        assert_eq!(meds[1].name, "Amoxicillin");
        assert_eq!(meds[1].strength, "500mg");
        assert_eq!(meds[1].duration, "");
        assert_eq!(meds[1].instructions, None);
    }

    #[test]
    fn test_medication_null_fields_default() {
        let json = r#"{"name":"Loratadine","strength":null,"instructions":null}"#;
        let med: MedicationEntry = serde_json::from_str(json).unwrap();
        assert_eq!(med.name, "Loratadine");
        assert_eq!(med.strength, "");
    }

    #[test]
    fn test_medication_summary() {
        let med = MedicationEntry::new("Amoxicillin", "500mg", "Every 8 hours", "10 days", "");
        assert_eq!(med.summary(), "Amoxicillin 500mg - Every 8 hours for 10 days");
        assert_eq!(MedicationEntry::named("Zinc").summary(), "Zinc");
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            PrescriptionStatus::Pending,
            PrescriptionStatus::Active,
            PrescriptionStatus::Completed,
            PrescriptionStatus::Cancelled,
        ] {
            assert_eq!(PrescriptionStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(PrescriptionStatus::parse("archived"), None);
    }

    #[test]
    fn test_status_transitions() {
        use PrescriptionStatus::*;
        assert!(Pending.can_transition_to(Active));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Active.can_transition_to(Completed));
        assert!(!Active.can_transition_to(Pending));
        assert!(!Completed.can_transition_to(Active));
        assert!(!Cancelled.can_transition_to(Active));
    }

    #[test]
    fn test_into_saved_issues_new_id() {
        let draft = PrescriptionRecord::new("p1".into(), "Flu".into());
        let now = Utc::now();

        let first = draft.clone().into_saved(now);
        let second = draft.clone().into_saved(now);

        assert_eq!(first.status, PrescriptionStatus::Active);
        assert_ne!(first.id, draft.id);
        assert_ne!(first.id, second.id);
        assert_eq!(first.diagnosis, "Flu");
    }

    #[test]
    fn test_validate_requires_patient_and_diagnosis() {
        let record = PrescriptionRecord::new("p1".into(), "Acute bronchitis".into());
        assert!(record.validate().is_ok());

        let record = PrescriptionRecord::new("".into(), "Acute bronchitis".into());
        assert!(record.validate().is_err());

        let record = PrescriptionRecord::new("p1".into(), "   ".into());
        assert!(record.validate().is_err());
    }

    #[test]
    fn test_draft_copies_recommendation() {
        let patient = Patient::new("Jane Doe".into());
        let recommendation = Recommendation {
            diagnosis: "Common cold".into(),
            confidence: 0.8,
            medications: vec![MedicationEntry::named("Loratadine")],
            ..Recommendation::default()
        };
        let now = Utc::now();

        let record = PrescriptionRecord::draft(
            &patient,
            &recommendation,
            RecommendationSource::RuleBased,
            &["runny nose".to_string()],
            "doc-1",
            "Dr. Smith",
            now,
        );

        assert_eq!(record.patient_id, patient.id);
        assert_eq!(record.patient_name, "Jane Doe");
        assert_eq!(record.status, PrescriptionStatus::Pending);
        assert_eq!(record.confidence, Some(0.8));
        assert_eq!(record.medication_names().collect::<Vec<_>>(), vec!["Loratadine"]);
        assert_eq!(record.date, now);
    }
}
