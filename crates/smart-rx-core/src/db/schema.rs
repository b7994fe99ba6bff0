//! SQLite schema definition.

/// Complete database schema for the prescription store.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Patients
-- ============================================================================

CREATE TABLE IF NOT EXISTS patients (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    age INTEGER,
    gender TEXT,
    allergies TEXT NOT NULL DEFAULT '[]',         -- JSON array of strings
    medical_history TEXT NOT NULL DEFAULT '[]',   -- JSON array of strings
    condition TEXT,
    phone TEXT,
    email TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_patients_name ON patients(name);

-- ============================================================================
-- Prescriptions (never deleted; only status changes)
-- ============================================================================

CREATE TABLE IF NOT EXISTS prescriptions (
    id TEXT PRIMARY KEY,
    patient_id TEXT NOT NULL REFERENCES patients(id),
    patient_name TEXT NOT NULL DEFAULT '',
    diagnosis TEXT NOT NULL CHECK (length(trim(diagnosis)) > 0),
    symptoms TEXT NOT NULL DEFAULT '[]',          -- JSON array of strings
    date TEXT NOT NULL,                           -- RFC 3339 issue date
    medications TEXT NOT NULL DEFAULT '[]',       -- JSON array of MedicationEntry (objects or bare names)
    doctor_id TEXT NOT NULL DEFAULT '',
    doctor_name TEXT NOT NULL DEFAULT '',
    status TEXT NOT NULL DEFAULT 'pending'
        CHECK (status IN ('pending', 'active', 'completed', 'cancelled')),
    source TEXT NOT NULL DEFAULT 'manual',
    confidence REAL,
    reasoning TEXT NOT NULL DEFAULT '',
    conflict_warnings TEXT NOT NULL DEFAULT '[]', -- JSON array of strings
    recommendations TEXT NOT NULL DEFAULT '[]',   -- JSON array of strings
    notes TEXT NOT NULL DEFAULT '',
    history_insights TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_prescriptions_patient ON prescriptions(patient_id, date);
CREATE INDEX IF NOT EXISTS idx_prescriptions_status ON prescriptions(status);
"#;
