//! Prompts for prescription drafting and the chat assistant.
//!
//! Pure string formatting; the same inputs always produce the same prompt.

use smart_rx_core::models::{HistoryAnalysis, Patient, PrescriptionRecord};

/// Recent prescriptions listed in the prompt.
pub const RECENT_PRESCRIPTIONS_IN_PROMPT: usize = 3;

/// System context for prescription drafting.
pub const SYSTEM_PROMPT: &str = r#"You are an experienced clinical assistant helping a licensed doctor draft a prescription.

Consider the patient's allergies, active medications and prescription history before suggesting treatment.
Suggest at most 4 medications. Prefer common first-line treatments.
Every suggestion is reviewed by the doctor before it is issued."#;

/// JSON schema the reply must follow.
pub const RESPONSE_SCHEMA: &str = r#"{
  "finalDiagnosis": "string",
  "confidence": 0.0,
  "reasoning": "string",
  "medications": [
    {
      "name": "string",
      "strength": "string",
      "frequency": "string",
      "duration": "string",
      "instructions": "string"
    }
  ],
  "conflictWarnings": ["string"],
  "recommendations": ["string"],
  "notes": "string",
  "historyInsights": "string"
}"#;

/// System context for the chat assistant.
pub const ASSISTANT_SYSTEM_PROMPT: &str = r#"You are a concise medical reference assistant for doctors.

Answer clinical questions about medications, dosing, interactions and treatment guidelines.
Keep answers short and practical. Say so when a question needs specialist input."#;

/// Build the drafting prompt for one patient visit.
pub fn build_prescription_prompt(
    patient: &Patient,
    symptoms: &[String],
    diagnosis: Option<&str>,
    analysis: &HistoryAnalysis,
) -> String {
    let mut prompt = String::new();

    prompt.push_str(SYSTEM_PROMPT);
    prompt.push_str("\n\n");

    // Demographics
    prompt.push_str("PATIENT INFORMATION:\n");
    prompt.push_str(&format!("- Name: {}\n", patient.name));
    prompt.push_str(&format!(
        "- Age: {}\n",
        patient
            .age
            .map(|a| a.to_string())
            .unwrap_or_else(|| "Unknown".into())
    ));
    prompt.push_str(&format!(
        "- Gender: {}\n",
        patient.gender.as_deref().unwrap_or("Not specified")
    ));
    prompt.push_str(&format!("- Allergies: {}\n", patient.allergies_display()));
    if !patient.medical_history.is_empty() {
        prompt.push_str(&format!(
            "- Medical history: {}\n",
            patient.medical_history.join("; ")
        ));
    }

    // Presentation
    prompt.push_str("\nCURRENT PRESENTATION:\n");
    prompt.push_str(&format!("- Symptoms: {}\n", symptoms.join(", ")));
    prompt.push_str(&format!(
        "- Provided diagnosis: {}\n",
        diagnosis
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .unwrap_or("Not provided")
    ));

    // History summary
    prompt.push_str("\nPRESCRIPTION HISTORY SUMMARY:\n");
    prompt.push_str(&format!(
        "- Total prescriptions: {}\n",
        analysis.total_prescriptions
    ));
    prompt.push_str(&format!(
        "- Active prescriptions: {}\n",
        analysis.active_prescriptions.len()
    ));
    prompt.push_str(&format!(
        "- Prescriptions in last 30 days: {}\n",
        analysis.recent_prescriptions.len()
    ));
    if !analysis.common_medications.is_empty() {
        let common: Vec<String> = analysis
            .common_medications
            .iter()
            .map(|m| format!("{} ({}x)", m.name, m.count))
            .collect();
        prompt.push_str(&format!(
            "- Commonly prescribed: {}\n",
            common.join(", ")
        ));
    }
    for warning in &analysis.warnings {
        prompt.push_str(&format!("- Warning: {}\n", warning));
    }

    if !analysis.recent_prescriptions.is_empty() {
        prompt.push_str("\nRECENT PRESCRIPTIONS:\n");
        for record in analysis
            .recent_prescriptions
            .iter()
            .take(RECENT_PRESCRIPTIONS_IN_PROMPT)
        {
            prompt.push_str(&format_record_line(record));
        }
    }

    if !analysis.active_prescriptions.is_empty() {
        prompt.push_str("\nACTIVE PRESCRIPTIONS:\n");
        for record in &analysis.active_prescriptions {
            prompt.push_str(&format_record_line(record));
        }
    }

    prompt.push_str(
        "\nRespond with ONLY a JSON object in exactly this format, with no other text:\n",
    );
    prompt.push_str(RESPONSE_SCHEMA);
    prompt.push('\n');

    prompt
}

/// Build a single-turn assistant prompt, optionally grounded on a patient.
pub fn build_assistant_prompt(question: &str, patient: Option<&Patient>) -> String {
    let mut prompt = String::new();
    prompt.push_str(ASSISTANT_SYSTEM_PROMPT);
    prompt.push_str("\n\n");

    if let Some(patient) = patient {
        prompt.push_str(&format!(
            "PATIENT CONTEXT: {}, age {}, allergies: {}\n\n",
            patient.name,
            patient
                .age
                .map(|a| a.to_string())
                .unwrap_or_else(|| "unknown".into()),
            patient.allergies_display()
        ));
    }

    prompt.push_str(&format!("QUESTION: {}\n", question.trim()));
    prompt
}

fn format_record_line(record: &PrescriptionRecord) -> String {
    let meds: Vec<String> = record
        .medications
        .iter()
        .filter(|m| !m.name.trim().is_empty())
        .map(|m| m.summary())
        .collect();
    format!(
        "- {} | {} | {} | Medications: {}\n",
        record.date.format("%Y-%m-%d"),
        record.diagnosis,
        record.status.as_str(),
        if meds.is_empty() {
            "none recorded".to_string()
        } else {
            meds.join("; ")
        }
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use smart_rx_core::analysis::analyze_history;
    use smart_rx_core::models::{MedicationEntry, PrescriptionStatus};

    fn patient() -> Patient {
        let mut patient = Patient::new("Maria Lopez".into());
        patient.age = Some(30);
        patient.gender = Some("female".into());
        patient.allergies = vec!["Penicillin".into()];
        patient
    }

    fn record(days_ago: i64, diagnosis: &str, status: PrescriptionStatus) -> PrescriptionRecord {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let mut r = PrescriptionRecord::new("p1".into(), diagnosis.into());
        r.date = now - Duration::days(days_ago);
        r.status = status;
        r.medications = vec![MedicationEntry::new(
            "Ibuprofen",
            "400mg",
            "Every 8 hours",
            "5 days",
            "",
        )];
        r
    }

    #[test]
    fn test_prompt_without_history() {
        let p = patient();
        let analysis = HistoryAnalysis::default();
        let prompt = build_prescription_prompt(
            &p,
            &["headache".into(), "fever".into()],
            None,
            &analysis,
        );

        assert!(prompt.contains("- Name: Maria Lopez"));
        assert!(prompt.contains("- Age: 30"));
        assert!(prompt.contains("- Allergies: Penicillin"));
        assert!(prompt.contains("- Symptoms: headache, fever"));
        assert!(prompt.contains("- Provided diagnosis: Not provided"));
        assert!(prompt.contains("- Total prescriptions: 0"));
        assert!(!prompt.contains("RECENT PRESCRIPTIONS"));
        assert!(prompt.contains("\"finalDiagnosis\""));
        assert!(prompt.contains("\"historyInsights\""));
    }

    #[test]
    fn test_prompt_lists_three_recent_and_all_active() {
        let p = patient();
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let records = vec![
            record(1, "Dx-1", PrescriptionStatus::Completed),
            record(2, "Dx-2", PrescriptionStatus::Completed),
            record(3, "Dx-3", PrescriptionStatus::Completed),
            record(4, "Dx-4", PrescriptionStatus::Completed),
            record(60, "Dx-old-active", PrescriptionStatus::Active),
        ];
        let analysis = analyze_history(&p, &records, now);
        let prompt =
            build_prescription_prompt(&p, &["cough".into()], Some("Bronchitis"), &analysis);

        assert!(prompt.contains("- Provided diagnosis: Bronchitis"));
        assert!(prompt.contains("Dx-3"));
        assert!(!prompt.contains("Dx-4"));
        assert!(prompt.contains("Dx-old-active"));
        assert!(prompt.contains("Ibuprofen 400mg - Every 8 hours for 5 days"));
        assert!(prompt.contains("- Prescriptions in last 30 days: 4"));
        assert!(prompt.contains("Ibuprofen (5x)"));
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let p = patient();
        let analysis = HistoryAnalysis::default();
        let symptoms = vec!["cough".to_string()];
        assert_eq!(
            build_prescription_prompt(&p, &symptoms, None, &analysis),
            build_prescription_prompt(&p, &symptoms, None, &analysis)
        );
    }

    #[test]
    fn test_assistant_prompt() {
        let p = patient();
        let with_patient = build_assistant_prompt("  Max dose of ibuprofen? ", Some(&p));
        assert!(with_patient.contains("PATIENT CONTEXT: Maria Lopez, age 30"));
        assert!(with_patient.contains("QUESTION: Max dose of ibuprofen?"));

        let without = build_assistant_prompt("Interactions of warfarin?", None);
        assert!(!without.contains("PATIENT CONTEXT"));
    }
}
