//! Patient database operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbError, DbResult};
use crate::models::{Patient, PatientUpdate};

const PATIENT_COLUMNS: &str = "id, name, age, gender, allergies, medical_history, condition, \
                               phone, email, created_at, updated_at";

impl Database {
    /// Insert a new patient.
    pub fn insert_patient(&self, patient: &Patient) -> DbResult<()> {
        let allergies_json = serde_json::to_string(&patient.allergies)?;
        let history_json = serde_json::to_string(&patient.medical_history)?;

        self.conn.execute(
            r#"
            INSERT INTO patients (
                id, name, age, gender, allergies, medical_history,
                condition, phone, email, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                patient.id,
                patient.name,
                patient.age,
                patient.gender,
                allergies_json,
                history_json,
                patient.condition,
                patient.phone,
                patient.email,
                patient.created_at,
                patient.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Update an existing patient.
    pub fn update_patient(&self, patient: &Patient) -> DbResult<bool> {
        let allergies_json = serde_json::to_string(&patient.allergies)?;
        let history_json = serde_json::to_string(&patient.medical_history)?;

        let rows_affected = self.conn.execute(
            r#"
            UPDATE patients SET
                name = ?2,
                age = ?3,
                gender = ?4,
                allergies = ?5,
                medical_history = ?6,
                condition = ?7,
                phone = ?8,
                email = ?9,
                updated_at = ?10
            WHERE id = ?1
            "#,
            params![
                patient.id,
                patient.name,
                patient.age,
                patient.gender,
                allergies_json,
                history_json,
                patient.condition,
                patient.phone,
                patient.email,
                chrono::Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Apply a partial edit to a stored patient and return the stored result.
    pub fn edit_patient(&self, id: &str, update: PatientUpdate) -> DbResult<Patient> {
        let mut patient = self
            .get_patient(id)?
            .ok_or_else(|| DbError::NotFound(format!("patient {}", id)))?;
        patient.apply_update(update).map_err(DbError::Constraint)?;
        self.update_patient(&patient)?;

        self.get_patient(id)?
            .ok_or_else(|| DbError::NotFound(format!("patient {}", id)))
    }

    /// Get a patient by ID.
    pub fn get_patient(&self, id: &str) -> DbResult<Option<Patient>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM patients WHERE id = ?", PATIENT_COLUMNS),
                [id],
                PatientRow::from_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// Search patients by name (prefix match).
    pub fn search_patients(&self, query: &str, limit: usize) -> DbResult<Vec<Patient>> {
        let pattern = format!("{}%", query);
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM patients WHERE name LIKE ? ORDER BY name LIMIT ?",
            PATIENT_COLUMNS
        ))?;

        let rows = stmt.query_map(params![pattern, limit as i64], PatientRow::from_row)?;

        let mut patients = Vec::new();
        for row in rows {
            patients.push(row?.try_into()?);
        }
        Ok(patients)
    }

    /// List all patients.
    pub fn list_patients(&self) -> DbResult<Vec<Patient>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM patients ORDER BY name",
            PATIENT_COLUMNS
        ))?;

        let rows = stmt.query_map([], PatientRow::from_row)?;

        let mut patients = Vec::new();
        for row in rows {
            patients.push(row?.try_into()?);
        }
        Ok(patients)
    }
}

/// Intermediate row struct for database mapping.
struct PatientRow {
    id: String,
    name: String,
    age: Option<u32>,
    gender: Option<String>,
    allergies: String,
    medical_history: String,
    condition: Option<String>,
    phone: Option<String>,
    email: Option<String>,
    created_at: String,
    updated_at: String,
}

impl PatientRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            age: row.get(2)?,
            gender: row.get(3)?,
            allergies: row.get(4)?,
            medical_history: row.get(5)?,
            condition: row.get(6)?,
            phone: row.get(7)?,
            email: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }
}

impl TryFrom<PatientRow> for Patient {
    type Error = DbError;

    fn try_from(row: PatientRow) -> Result<Self, Self::Error> {
        Ok(Patient {
            id: row.id,
            name: row.name,
            age: row.age,
            gender: row.gender,
            allergies: serde_json::from_str(&row.allergies)?,
            medical_history: serde_json::from_str(&row.medical_history)?,
            condition: row.condition,
            phone: row.phone,
            email: row.email,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn test_insert_and_get() {
        let db = setup_db();

        let mut patient = Patient::new("Jane Doe".into());
        patient.age = Some(42);
        patient.gender = Some("female".into());
        patient.allergies = vec!["Penicillin".into(), "Latex".into()];
        patient.medical_history = vec!["Asthma since childhood".into()];

        db.insert_patient(&patient).unwrap();

        let retrieved = db.get_patient(&patient.id).unwrap().unwrap();
        assert_eq!(retrieved.name, "Jane Doe");
        assert_eq!(retrieved.age, Some(42));
        assert_eq!(retrieved.allergies, vec!["Penicillin", "Latex"]);
        assert_eq!(retrieved.medical_history.len(), 1);
    }

    #[test]
    fn test_get_missing_patient() {
        let db = setup_db();
        assert!(db.get_patient("nope").unwrap().is_none());
    }

    #[test]
    fn test_update_patient() {
        let db = setup_db();

        let mut patient = Patient::new("Jane Doe".into());
        db.insert_patient(&patient).unwrap();

        patient.condition = Some("Hypertension".into());
        patient.allergies.push("Sulfa".into());
        assert!(db.update_patient(&patient).unwrap());

        let retrieved = db.get_patient(&patient.id).unwrap().unwrap();
        assert_eq!(retrieved.condition, Some("Hypertension".into()));
        assert_eq!(retrieved.allergies, vec!["Sulfa"]);
        let created = chrono::DateTime::parse_from_rfc3339(&retrieved.created_at).unwrap();
        let updated = chrono::DateTime::parse_from_rfc3339(&retrieved.updated_at).unwrap();
        assert!(updated >= created);
    }

    #[test]
    fn test_update_unknown_patient() {
        let db = setup_db();
        let patient = Patient::new("Ghost".into());
        assert!(!db.update_patient(&patient).unwrap());
    }

    #[test]
    fn test_edit_patient() {
        let db = setup_db();
        let patient = Patient::new("Jane Doe".into());
        db.insert_patient(&patient).unwrap();

        let edited = db
            .edit_patient(
                &patient.id,
                PatientUpdate {
                    name: Some(" Jane Smith ".into()),
                    age: Some(43),
                    ..PatientUpdate::default()
                },
            )
            .unwrap();
        assert_eq!(edited.name, "Jane Smith");
        assert_eq!(edited.age, Some(43));

        let blank = db.edit_patient(
            &patient.id,
            PatientUpdate {
                name: Some(String::new()),
                ..PatientUpdate::default()
            },
        );
        assert!(matches!(blank, Err(DbError::Constraint(_))));

        let missing = db.edit_patient("nope", PatientUpdate::default());
        assert!(matches!(missing, Err(DbError::NotFound(_))));
    }

    #[test]
    fn test_search_patients() {
        let db = setup_db();

        db.insert_patient(&Patient::new("Maria Lopez".into())).unwrap();
        db.insert_patient(&Patient::new("Mark Chen".into())).unwrap();
        db.insert_patient(&Patient::new("Luna Park".into())).unwrap();

        let results = db.search_patients("Mar", 10).unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().any(|p| p.name == "Maria Lopez"));
        assert!(results.iter().any(|p| p.name == "Mark Chen"));

        let limited = db.search_patients("Mar", 1).unwrap();
        assert_eq!(limited.len(), 1);
    }
}
