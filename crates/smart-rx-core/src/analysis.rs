//! Prescription history analysis.
//!
//! Derives the aggregate facts the drafting pipeline needs from a patient's
//! raw prescription list. The current time is always passed in so results are
//! reproducible.

use chrono::{DateTime, Duration, Utc};

use crate::models::{HistoryAnalysis, MedicationCount, Patient, PrescriptionRecord};

/// Trailing window for "recent" prescriptions.
pub const RECENT_WINDOW_DAYS: i64 = 30;

/// Number of medications kept in the frequency ranking.
pub const COMMON_MEDICATION_LIMIT: usize = 5;

/// Recent prescriptions above this count trigger a warning.
const FREQUENT_PRESCRIPTION_THRESHOLD: usize = 2;

/// Analyze a patient's prescription history as of `now`.
///
/// Records may be in any order; only the tie-breaking of the medication
/// ranking depends on it (first-encountered wins).
pub fn analyze_history(
    patient: &Patient,
    records: &[PrescriptionRecord],
    now: DateTime<Utc>,
) -> HistoryAnalysis {
    let cutoff = now - Duration::days(RECENT_WINDOW_DAYS);

    let active_prescriptions: Vec<PrescriptionRecord> =
        records.iter().filter(|r| r.is_active()).cloned().collect();
    let recent_prescriptions: Vec<PrescriptionRecord> =
        records.iter().filter(|r| r.date >= cutoff).cloned().collect();

    let common_medications = rank_medications(records, COMMON_MEDICATION_LIMIT);

    let mut warnings = Vec::new();
    let mut recommendations = Vec::new();

    if !active_prescriptions.is_empty() {
        warnings.push(format!(
            "Patient has {} active prescription(s)",
            active_prescriptions.len()
        ));
        recommendations.push("Review active medications for potential interactions".to_string());
    }

    if recent_prescriptions.len() > FREQUENT_PRESCRIPTION_THRESHOLD {
        warnings.push(format!(
            "Patient has received {} prescriptions in the last 30 days",
            recent_prescriptions.len()
        ));
        recommendations.push("Consider underlying cause for frequent prescriptions".to_string());
    }

    if !common_medications.is_empty() {
        let top: Vec<&str> = common_medications
            .iter()
            .take(3)
            .map(|m| m.name.as_str())
            .collect();
        recommendations.push(format!("Patient frequently uses: {}", top.join(", ")));
    }

    HistoryAnalysis {
        has_history: !records.is_empty(),
        total_prescriptions: records.len(),
        active_prescriptions,
        recent_prescriptions,
        common_medications,
        allergies: patient.allergies.clone(),
        warnings,
        recommendations,
    }
}

/// Count medication names across all records and keep the `limit` most
/// frequent. Ties keep the order names were first encountered.
pub fn rank_medications(records: &[PrescriptionRecord], limit: usize) -> Vec<MedicationCount> {
    // Vec instead of a map: insertion order is the tie-breaker.
    let mut counts: Vec<MedicationCount> = Vec::new();

    for name in records.iter().flat_map(|r| r.medication_names()) {
        match counts.iter_mut().find(|c| c.name == name) {
            Some(entry) => entry.count += 1,
            None => counts.push(MedicationCount {
                name: name.to_string(),
                count: 1,
            }),
        }
    }

    // sort_by is stable
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts.truncate(limit);
    counts
}
