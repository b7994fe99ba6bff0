//! Rule-based prescription recommender.
//!
//! Deterministic keyword-to-treatment mapping used whenever the generative
//! service is disabled or its reply cannot be used. Two matching disciplines
//! apply:
//!
//! 1. Every pattern group matched by any symptom contributes its medications
//!    (accumulate-all, table order).
//! 2. Only when nothing matched, the keyword buckets are tried top to bottom
//!    and the first hit supplies a single medication (first-match-wins).

mod patterns;

pub use patterns::*;

use crate::models::{HistoryAnalysis, MedicationEntry, Recommendation, MAX_RECOMMENDED_MEDICATIONS};

/// Confidence when at least one pattern group matched.
pub const PATTERN_MATCH_CONFIDENCE: f64 = 0.8;

/// Confidence when only the keyword buckets applied.
pub const KEYWORD_FALLBACK_CONFIDENCE: f64 = 0.6;

/// Allergy checked by the conflict scan.
const PENICILLIN: &str = "Penicillin";

/// Minimum length (exclusive) for prefix matching.
const PREFIX_MIN_LEN: usize = 3;

/// Rule-based recommender over a fixed pattern table.
#[derive(Debug, Clone, Copy)]
pub struct FallbackRecommender {
    groups: &'static [PatternGroup],
    buckets: &'static [KeywordBucket],
    default_medication: MedicationTemplate,
}

impl Default for FallbackRecommender {
    fn default() -> Self {
        Self::new()
    }
}

impl FallbackRecommender {
    /// Create a recommender over the built-in table.
    pub fn new() -> Self {
        Self {
            groups: PATTERN_GROUPS,
            buckets: KEYWORD_BUCKETS,
            default_medication: GENERAL_RELIEF,
        }
    }

    /// Produce a recommendation from symptoms, allergies and history.
    ///
    /// `diagnosis` is used verbatim when present and non-blank.
    pub fn recommend(
        &self,
        symptoms: &[String],
        allergies: &[String],
        history: &HistoryAnalysis,
        diagnosis: Option<&str>,
    ) -> Recommendation {
        let normalized = normalize_symptoms(symptoms);
        let matched = self.match_groups(&normalized);

        let mut medications: Vec<MedicationEntry> = if matched.is_empty() {
            vec![self.classify_unmatched(&normalized).to_entry()]
        } else {
            matched
                .iter()
                .flat_map(|group| group.medications.iter().take(2))
                .map(MedicationTemplate::to_entry)
                .collect()
        };
        medications.truncate(MAX_RECOMMENDED_MEDICATIONS);

        let conflict_warnings = check_allergy_conflicts(&medications, allergies);
        let labels: Vec<&str> = matched.iter().map(|g| g.label()).collect();

        tracing::debug!(
            patterns = ?labels,
            medications = medications.len(),
            "Rule-based recommendation"
        );

        let confidence = if matched.is_empty() {
            KEYWORD_FALLBACK_CONFIDENCE
        } else {
            PATTERN_MATCH_CONFIDENCE
        };

        Recommendation {
            diagnosis: resolve_diagnosis(diagnosis, symptoms),
            confidence,
            reasoning: build_reasoning(&labels, history),
            medications,
            conflict_warnings,
            recommendations: build_follow_ups(labels.len(), history),
            notes: build_notes(&labels, history),
            history_insights: build_history_insights(history),
        }
    }

    /// Pattern groups matched by any symptom, in table order, each at most once.
    pub fn match_groups(&self, normalized: &[String]) -> Vec<&'static PatternGroup> {
        self.groups
            .iter()
            .filter(|group| {
                normalized
                    .iter()
                    .any(|symptom| group.triggers.iter().any(|t| symptom_matches(symptom, t)))
            })
            .collect()
    }

    /// Pick the single medication used when no pattern group matched.
    pub fn classify_unmatched(&self, normalized: &[String]) -> MedicationTemplate {
        let combined = normalized.join(" ");
        self.buckets
            .iter()
            .find(|bucket| bucket.keywords.iter().any(|k| combined.contains(k)))
            .map(|bucket| bucket.medication)
            .unwrap_or(self.default_medication)
    }
}

/// Lowercase and trim each symptom, dropping blanks.
pub fn normalize_symptoms(symptoms: &[String]) -> Vec<String> {
    symptoms
        .iter()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Whether a normalized symptom hits a trigger phrase.
///
/// Containment in either direction, or a shared three-character prefix when
/// both strings are longer than three characters.
pub fn symptom_matches(symptom: &str, trigger: &str) -> bool {
    if symptom.contains(trigger) || trigger.contains(symptom) {
        return true;
    }
    if symptom.chars().count() > PREFIX_MIN_LEN && trigger.chars().count() > PREFIX_MIN_LEN {
        let prefix = |s: &str| s.chars().take(PREFIX_MIN_LEN).collect::<String>();
        return prefix(symptom) == prefix(trigger);
    }
    false
}

/// Literal penicillin check against medication names.
///
/// Only fires when the allergy list holds exactly "Penicillin" and a
/// medication name contains that string. Drug classes are not considered.
pub fn check_allergy_conflicts(medications: &[MedicationEntry], allergies: &[String]) -> Vec<String> {
    if !allergies.iter().any(|a| a == PENICILLIN) {
        return Vec::new();
    }
    medications
        .iter()
        .filter(|m| m.name.contains(PENICILLIN))
        .map(|m| {
            format!(
                "ALLERGY ALERT: Patient is allergic to Penicillin - avoid {}",
                m.name
            )
        })
        .collect()
}

/// The provided diagnosis, or one derived from the symptom list.
pub fn resolve_diagnosis(diagnosis: Option<&str>, symptoms: &[String]) -> String {
    match diagnosis.map(str::trim).filter(|d| !d.is_empty()) {
        Some(d) => d.to_string(),
        None => {
            let listed: Vec<&str> = symptoms
                .iter()
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .collect();
            if listed.is_empty() {
                "Clinical assessment required".to_string()
            } else {
                format!("Clinical assessment based on symptoms: {}", listed.join(", "))
            }
        }
    }
}

fn build_reasoning(labels: &[&str], history: &HistoryAnalysis) -> String {
    let mut reasoning = String::from("Enhanced AI analysis using pattern matching. ");
    if !labels.is_empty() {
        reasoning.push_str(&format!("Identified patterns: {}. ", labels.join(", ")));
    }
    if history.has_history {
        reasoning.push_str("Previous prescriptions reviewed for safety.");
    } else {
        reasoning.push_str("No prescription history available.");
    }
    reasoning
}

fn build_follow_ups(matched: usize, history: &HistoryAnalysis) -> Vec<String> {
    let mut recommendations = history.recommendations.clone();
    recommendations.push("Monitor patient response to treatment".to_string());
    if matched > 1 {
        recommendations.push("Multiple symptoms identified - monitor for interactions".to_string());
    } else {
        recommendations.push("Schedule follow-up in 3-5 days".to_string());
    }
    if matched == 0 {
        recommendations.push("Consider specialist consultation for unspecified symptoms".to_string());
    }
    recommendations
}

fn build_notes(labels: &[&str], history: &HistoryAnalysis) -> String {
    let patterns = if labels.is_empty() {
        "general symptoms".to_string()
    } else {
        labels.join(", ")
    };
    let mut notes = format!("Pattern-based analysis identified: {}.", patterns);
    if history.has_history {
        notes.push_str(&format!(
            " Patient has {} previous prescription(s) on record.",
            history.total_prescriptions
        ));
    }
    notes
}

fn build_history_insights(history: &HistoryAnalysis) -> String {
    if !history.has_history {
        return "No prescription history available.".to_string();
    }
    let top = history.top_medication_names(3);
    if top.is_empty() {
        "Patient commonly uses: none recorded".to_string()
    } else {
        format!("Patient commonly uses: {}", top.join(", "))
    }
}
