//! History analyzer integration tests.

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use smart_rx_core::analysis::{analyze_history, rank_medications, COMMON_MEDICATION_LIMIT};
use smart_rx_core::db::Database;
use smart_rx_core::models::{MedicationEntry, Patient, PrescriptionRecord, PrescriptionStatus};
use smart_rx_core::store::PrescriptionStore;

fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

fn make_record(
    patient_id: &str,
    days_ago: i64,
    status: PrescriptionStatus,
    meds: &[&str],
) -> PrescriptionRecord {
    let mut record = PrescriptionRecord::new(patient_id.to_string(), "Follow-up".to_string());
    record.date = fixed_now() - Duration::days(days_ago);
    record.status = status;
    record.medications = meds.iter().map(|m| MedicationEntry::named(m)).collect();
    record
}

#[test]
fn test_analysis_from_store() {
    let db = Database::open_in_memory().unwrap();
    let mut patient = Patient::new("Maria Lopez".to_string());
    patient.allergies = vec!["Penicillin".to_string()];
    db.insert_patient(&patient).unwrap();

    let records = [
        make_record(&patient.id, 3, PrescriptionStatus::Active, &["Ibuprofen", "Loratadine"]),
        make_record(&patient.id, 12, PrescriptionStatus::Completed, &["Ibuprofen"]),
        make_record(&patient.id, 25, PrescriptionStatus::Completed, &["Cetirizine"]),
        make_record(&patient.id, 90, PrescriptionStatus::Cancelled, &["Loratadine"]),
    ];
    for record in &records {
        db.insert_prescription(record).unwrap();
    }

    let history = db.list_prescriptions(&patient.id, true).unwrap();
    let analysis = analyze_history(&patient, &history, fixed_now());

    assert!(analysis.has_history);
    assert_eq!(analysis.total_prescriptions, 4);
    assert_eq!(analysis.active_prescriptions.len(), 1);
    assert_eq!(analysis.recent_prescriptions.len(), 3);
    assert_eq!(analysis.allergies, vec!["Penicillin"]);
    assert_eq!(
        analysis.warnings,
        vec![
            "Patient has 1 active prescription(s)",
            "Patient has received 3 prescriptions in the last 30 days",
        ]
    );

    // Newest first: Ibuprofen and Loratadine are seen before Cetirizine.
    let names = analysis.top_medication_names(5);
    assert_eq!(names, vec!["Ibuprofen", "Loratadine", "Cetirizine"]);
    assert_eq!(
        analysis.recommendations.last().unwrap(),
        "Patient frequently uses: Ibuprofen, Loratadine, Cetirizine"
    );
}

#[test]
fn test_ranking_ties_follow_input_order() {
    let records = vec![
        make_record("p1", 1, PrescriptionStatus::Completed, &["Melatonin"]),
        make_record("p1", 2, PrescriptionStatus::Completed, &["Cetirizine"]),
        make_record("p1", 3, PrescriptionStatus::Completed, &["Amoxicillin"]),
    ];
    let names: Vec<String> = rank_medications(&records, 5)
        .into_iter()
        .map(|m| m.name)
        .collect();
    assert_eq!(names, vec!["Melatonin", "Cetirizine", "Amoxicillin"]);

    let reversed: Vec<PrescriptionRecord> = records.into_iter().rev().collect();
    let names: Vec<String> = rank_medications(&reversed, 5)
        .into_iter()
        .map(|m| m.name)
        .collect();
    assert_eq!(names, vec!["Amoxicillin", "Cetirizine", "Melatonin"]);
}

#[test]
fn test_ranking_keeps_top_five() {
    let records = vec![
        make_record("p1", 1, PrescriptionStatus::Completed, &["A", "B", "C"]),
        make_record("p1", 2, PrescriptionStatus::Completed, &["D", "E", "F"]),
        make_record("p1", 3, PrescriptionStatus::Completed, &["F", "E"]),
    ];
    let ranked = rank_medications(&records, COMMON_MEDICATION_LIMIT);
    let names: Vec<&str> = ranked.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["E", "F", "A", "B", "C"]);
}

fn record_strategy() -> impl Strategy<Value = PrescriptionRecord> {
    (
        0i64..120,
        prop_oneof![
            Just(PrescriptionStatus::Pending),
            Just(PrescriptionStatus::Active),
            Just(PrescriptionStatus::Completed),
            Just(PrescriptionStatus::Cancelled),
        ],
        proptest::collection::vec(
            prop_oneof![Just("Ibuprofen"), Just("Zinc"), Just("Melatonin"), Just("Cetirizine")],
            0..4,
        ),
    )
        .prop_map(|(days, status, meds)| make_record("p1", days, status, &meds))
}

proptest! {
    /// Counts partition the input consistently
    #[test]
    fn counts_are_consistent(records in proptest::collection::vec(record_strategy(), 0..12)) {
        let patient = Patient::new("Prop".to_string());
        let analysis = analyze_history(&patient, &records, fixed_now());

        prop_assert_eq!(analysis.has_history, !records.is_empty());
        prop_assert_eq!(analysis.total_prescriptions, records.len());
        prop_assert!(analysis.active_prescriptions.len() <= records.len());
        prop_assert!(analysis.recent_prescriptions.len() <= records.len());
        prop_assert!(analysis.common_medications.len() <= COMMON_MEDICATION_LIMIT);
    }

    /// Ranking counts never increase down the list
    #[test]
    fn ranking_is_sorted(records in proptest::collection::vec(record_strategy(), 0..12)) {
        let ranked = rank_medications(&records, COMMON_MEDICATION_LIMIT);
        for pair in ranked.windows(2) {
            prop_assert!(pair[0].count >= pair[1].count);
        }
    }
}
