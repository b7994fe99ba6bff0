//! Patient models.

use serde::{Deserialize, Serialize};

/// A patient record as held by the clinic store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    /// Unique patient ID (UUID)
    pub id: String,
    /// Full name
    pub name: String,
    /// Age in years
    #[serde(default)]
    pub age: Option<u32>,
    /// Gender as recorded at intake
    #[serde(default)]
    pub gender: Option<String>,
    /// Known allergies (e.g., ["Penicillin", "Sulfa"])
    #[serde(default)]
    pub allergies: Vec<String>,
    /// Free-text medical history entries
    #[serde(default)]
    pub medical_history: Vec<String>,
    /// Current condition label
    #[serde(default)]
    pub condition: Option<String>,
    /// Contact phone
    #[serde(default)]
    pub phone: Option<String>,
    /// Contact email
    #[serde(default)]
    pub email: Option<String>,
    /// Creation timestamp
    pub created_at: String,
    /// Last update timestamp
    pub updated_at: String,
}

impl Patient {
    /// Create a new patient with required fields.
    pub fn new(name: String) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            age: None,
            gender: None,
            allergies: Vec::new(),
            medical_history: Vec::new(),
            condition: None,
            phone: None,
            email: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Check for a recorded allergy (exact string comparison).
    pub fn has_allergy(&self, allergy: &str) -> bool {
        self.allergies.iter().any(|a| a == allergy)
    }

    /// Allergies formatted for display, or "None known".
    pub fn allergies_display(&self) -> String {
        if self.allergies.is_empty() {
            "None known".to_string()
        } else {
            self.allergies.join(", ")
        }
    }
}

/// Partial patient edit. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatientUpdate {
    pub name: Option<String>,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub allergies: Option<Vec<String>>,
    pub medical_history: Option<Vec<String>>,
    pub condition: Option<String>,
}

impl PatientUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl Patient {
    /// Apply a partial edit. A blank name is rejected and nothing changes.
    pub fn apply_update(&mut self, update: PatientUpdate) -> Result<(), String> {
        if let Some(name) = &update.name {
            if name.trim().is_empty() {
                return Err("patient name must not be blank".into());
            }
        }

        if let Some(name) = update.name {
            self.name = name.trim().to_string();
        }
        if update.age.is_some() {
            self.age = update.age;
        }
        if update.gender.is_some() {
            self.gender = update.gender;
        }
        if let Some(allergies) = update.allergies {
            self.allergies = allergies;
        }
        if let Some(history) = update.medical_history {
            self.medical_history = history;
        }
        if update.condition.is_some() {
            self.condition = update.condition;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_patient() {
        let patient = Patient::new("Jane Doe".into());
        assert_eq!(patient.name, "Jane Doe");
        assert!(patient.allergies.is_empty());
        assert_eq!(patient.id.len(), 36); // UUID format
    }

    #[test]
    fn test_has_allergy_is_exact() {
        let mut patient = Patient::new("Jane Doe".into());
        patient.allergies = vec!["Penicillin".into()];

        assert!(patient.has_allergy("Penicillin"));
        assert!(!patient.has_allergy("penicillin"));
        assert_eq!(patient.allergies_display(), "Penicillin");
    }

    #[test]
    fn test_deserialize_with_missing_optional_fields() {
        let json = r#"{"id":"p1","name":"Sam","created_at":"","updated_at":""}"#;
        let patient: Patient = serde_json::from_str(json).unwrap();
        assert_eq!(patient.age, None);
        assert!(patient.medical_history.is_empty());
        assert_eq!(patient.allergies_display(), "None known");
    }

    #[test]
    fn test_apply_update_changes_only_given_fields() {
        let mut patient = Patient::new("Jane Doe".into());
        patient.age = Some(40);
        patient.allergies = vec!["Latex".into()];

        patient
            .apply_update(PatientUpdate {
                allergies: Some(vec!["Latex".into(), "Sulfa".into()]),
                condition: Some("Asthma".into()),
                ..PatientUpdate::default()
            })
            .unwrap();

        assert_eq!(patient.name, "Jane Doe");
        assert_eq!(patient.age, Some(40));
        assert_eq!(patient.allergies, vec!["Latex", "Sulfa"]);
        assert_eq!(patient.condition.as_deref(), Some("Asthma"));
    }

    #[test]
    fn test_apply_update_rejects_blank_name() {
        let mut patient = Patient::new("Jane Doe".into());
        let result = patient.apply_update(PatientUpdate {
            name: Some("  ".into()),
            age: Some(12),
            ..PatientUpdate::default()
        });

        assert!(result.is_err());
        assert_eq!(patient.name, "Jane Doe");
        assert_eq!(patient.age, None);
        assert!(PatientUpdate::default().is_empty());
    }
}
