//! Recommendation and history-analysis models.

use serde::{Deserialize, Serialize};

use super::prescription::{MedicationEntry, PrescriptionRecord};

/// Maximum medications carried by a generated recommendation.
pub const MAX_RECOMMENDED_MEDICATIONS: usize = 4;

/// A treatment recommendation, produced either from the generative service's
/// reply or by the rule-based recommender.
///
/// Field names follow the JSON schema the generative service is asked to
/// reply with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Recommendation {
    #[serde(rename = "finalDiagnosis")]
    pub diagnosis: String,
    /// Confidence (0.0 - 1.0)
    pub confidence: f64,
    pub reasoning: String,
    /// At most [`MAX_RECOMMENDED_MEDICATIONS`] entries
    pub medications: Vec<MedicationEntry>,
    pub conflict_warnings: Vec<String>,
    pub recommendations: Vec<String>,
    pub notes: String,
    pub history_insights: String,
}

impl Recommendation {
    /// Enforce the medication cap, keeping order.
    pub fn cap_medications(&mut self) {
        self.medications.truncate(MAX_RECOMMENDED_MEDICATIONS);
    }
}

/// How often a medication appears across a patient's history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MedicationCount {
    pub name: String,
    pub count: usize,
}

/// Aggregate facts derived from a patient's prescription history.
///
/// Recomputed for every request; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct HistoryAnalysis {
    pub has_history: bool,
    pub total_prescriptions: usize,
    /// Records with status `active`
    pub active_prescriptions: Vec<PrescriptionRecord>,
    /// Records issued within the trailing 30 days
    pub recent_prescriptions: Vec<PrescriptionRecord>,
    /// Top 5 medications by frequency, ties in first-seen order
    pub common_medications: Vec<MedicationCount>,
    /// Copied from the patient
    pub allergies: Vec<String>,
    pub warnings: Vec<String>,
    pub recommendations: Vec<String>,
}

impl HistoryAnalysis {
    /// Names of the `n` most common medications.
    pub fn top_medication_names(&self, n: usize) -> Vec<&str> {
        self.common_medications
            .iter()
            .take(n)
            .map(|m| m.name.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recommendation_json_field_names() {
        let rec = Recommendation {
            diagnosis: "Migraine".into(),
            confidence: 0.7,
            conflict_warnings: vec!["none".into()],
            history_insights: "first visit".into(),
            ..Recommendation::default()
        };
        let json = serde_json::to_value(&rec).unwrap();

        assert_eq!(json["finalDiagnosis"], "Migraine");
        assert_eq!(json["conflictWarnings"][0], "none");
        assert_eq!(json["historyInsights"], "first visit");
    }

    #[test]
    fn test_recommendation_missing_fields_default() {
        let rec: Recommendation = serde_json::from_str(r#"{"finalDiagnosis":"Flu"}"#).unwrap();
        assert_eq!(rec.diagnosis, "Flu");
        assert_eq!(rec.confidence, 0.0);
        assert!(rec.medications.is_empty());
    }

    #[test]
    fn test_cap_medications_keeps_order() {
        let mut rec = Recommendation {
            medications: ["A", "B", "C", "D", "E", "F"]
                .iter()
                .map(|n| MedicationEntry::named(n))
                .collect(),
            ..Recommendation::default()
        };
        rec.cap_medications();

        let names: Vec<&str> = rec.medications.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn test_top_medication_names() {
        let analysis = HistoryAnalysis {
            common_medications: vec![
                MedicationCount { name: "A".into(), count: 3 },
                MedicationCount { name: "B".into(), count: 2 },
            ],
            ..HistoryAnalysis::default()
        };
        assert_eq!(analysis.top_medication_names(3), vec!["A", "B"]);
        assert_eq!(analysis.top_medication_names(1), vec!["A"]);
    }
}
