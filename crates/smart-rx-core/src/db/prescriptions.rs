//! Prescription database operations.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbError, DbResult};
use crate::models::{
    MedicationEntry, PrescriptionRecord, PrescriptionStatus, RecommendationSource,
};

const PRESCRIPTION_COLUMNS: &str = "id, patient_id, patient_name, diagnosis, symptoms, date, \
                                    medications, doctor_id, doctor_name, status, source, \
                                    confidence, reasoning, conflict_warnings, recommendations, \
                                    notes, history_insights, created_at, updated_at";

impl Database {
    /// Insert a prescription record.
    pub fn insert_prescription(&self, record: &PrescriptionRecord) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO prescriptions (
                id, patient_id, patient_name, diagnosis, symptoms, date,
                medications, doctor_id, doctor_name, status, source,
                confidence, reasoning, conflict_warnings, recommendations,
                notes, history_insights, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)
            "#,
            params![
                record.id,
                record.patient_id,
                record.patient_name,
                record.diagnosis,
                serde_json::to_string(&record.symptoms)?,
                format_timestamp(&record.date),
                serde_json::to_string(&record.medications)?,
                record.doctor_id,
                record.doctor_name,
                record.status.as_str(),
                record.source.as_str(),
                record.confidence,
                record.reasoning,
                serde_json::to_string(&record.conflict_warnings)?,
                serde_json::to_string(&record.recommendations)?,
                record.notes,
                record.history_insights,
                format_timestamp(&record.created_at),
                format_timestamp(&record.updated_at),
            ],
        )?;
        Ok(())
    }

    /// Get a prescription by ID.
    pub fn get_prescription(&self, id: &str) -> DbResult<Option<PrescriptionRecord>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM prescriptions WHERE id = ?", PRESCRIPTION_COLUMNS),
                [id],
                PrescriptionRow::from_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// List a patient's prescriptions sorted by issue date.
    pub fn list_prescriptions_for_patient(
        &self,
        patient_id: &str,
        newest_first: bool,
    ) -> DbResult<Vec<PrescriptionRecord>> {
        let order = if newest_first { "DESC" } else { "ASC" };
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM prescriptions WHERE patient_id = ? ORDER BY date {}, created_at {}",
            PRESCRIPTION_COLUMNS, order, order
        ))?;

        let rows = stmt.query_map([patient_id], PrescriptionRow::from_row)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?.try_into()?);
        }
        Ok(records)
    }

    /// List prescriptions in a given status, newest first.
    pub fn list_prescriptions_by_status(
        &self,
        status: PrescriptionStatus,
    ) -> DbResult<Vec<PrescriptionRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM prescriptions WHERE status = ? ORDER BY date DESC",
            PRESCRIPTION_COLUMNS
        ))?;

        let rows = stmt.query_map([status.as_str()], PrescriptionRow::from_row)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?.try_into()?);
        }
        Ok(records)
    }

    /// Move a prescription to a new status.
    ///
    /// Fails with `NotFound` for unknown IDs and `Constraint` for transitions
    /// the lifecycle does not allow.
    pub fn update_prescription_status(
        &self,
        id: &str,
        status: PrescriptionStatus,
    ) -> DbResult<PrescriptionRecord> {
        let mut record = self
            .get_prescription(id)?
            .ok_or_else(|| DbError::NotFound(format!("prescription {}", id)))?;

        if !record.status.can_transition_to(status) {
            return Err(DbError::Constraint(format!(
                "cannot move prescription {} from {} to {}",
                id,
                record.status.as_str(),
                status.as_str()
            )));
        }

        let now = Utc::now();
        self.conn.execute(
            "UPDATE prescriptions SET status = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, status.as_str(), format_timestamp(&now)],
        )?;

        record.status = status;
        record.updated_at = now;
        Ok(record)
    }
}

/// Intermediate row struct for database mapping.
struct PrescriptionRow {
    id: String,
    patient_id: String,
    patient_name: String,
    diagnosis: String,
    symptoms: String,
    date: String,
    medications: String,
    doctor_id: String,
    doctor_name: String,
    status: String,
    source: String,
    confidence: Option<f64>,
    reasoning: String,
    conflict_warnings: String,
    recommendations: String,
    notes: String,
    history_insights: String,
    created_at: String,
    updated_at: String,
}

impl PrescriptionRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            patient_id: row.get(1)?,
            patient_name: row.get(2)?,
            diagnosis: row.get(3)?,
            symptoms: row.get(4)?,
            date: row.get(5)?,
            medications: row.get(6)?,
            doctor_id: row.get(7)?,
            doctor_name: row.get(8)?,
            status: row.get(9)?,
            source: row.get(10)?,
            confidence: row.get(11)?,
            reasoning: row.get(12)?,
            conflict_warnings: row.get(13)?,
            recommendations: row.get(14)?,
            notes: row.get(15)?,
            history_insights: row.get(16)?,
            created_at: row.get(17)?,
            updated_at: row.get(18)?,
        })
    }
}

impl TryFrom<PrescriptionRow> for PrescriptionRecord {
    type Error = DbError;

    fn try_from(row: PrescriptionRow) -> Result<Self, Self::Error> {
        let medications: Vec<MedicationEntry> = serde_json::from_str(&row.medications)?;
        let status = PrescriptionStatus::parse(&row.status).ok_or_else(|| {
            DbError::Constraint(format!("Unknown prescription status: {}", row.status))
        })?;
        // Records written by older clients carry no source; treat them as manual.
        let source = RecommendationSource::parse(&row.source).unwrap_or(RecommendationSource::Manual);

        Ok(PrescriptionRecord {
            id: row.id,
            patient_id: row.patient_id,
            patient_name: row.patient_name,
            diagnosis: row.diagnosis,
            symptoms: serde_json::from_str(&row.symptoms)?,
            date: parse_timestamp(&row.date)?,
            medications,
            doctor_id: row.doctor_id,
            doctor_name: row.doctor_name,
            status,
            source,
            confidence: row.confidence,
            reasoning: row.reasoning,
            conflict_warnings: serde_json::from_str(&row.conflict_warnings)?,
            recommendations: serde_json::from_str(&row.recommendations)?,
            notes: row.notes,
            history_insights: row.history_insights,
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
        })
    }
}

/// Fixed-width UTC timestamps so `ORDER BY date` sorts chronologically.
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(value: &str) -> DbResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|source| DbError::InvalidTimestamp {
            value: value.to_string(),
            source,
        })
}
