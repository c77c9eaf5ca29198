//! SQLite schema definition.

/// Complete database schema for clinic records.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Patients
-- ============================================================================

CREATE TABLE IF NOT EXISTS patients (
    id INTEGER PRIMARY KEY AUTOINCREMENT,        -- never reused after delete
    first_name TEXT NOT NULL
        CHECK (length(trim(first_name)) > 0 AND length(first_name) <= 100),
    last_name TEXT NOT NULL
        CHECK (length(trim(last_name)) > 0 AND length(last_name) <= 100),
    birthdate TEXT                               -- YYYY-MM-DD, NULL if unknown
);

CREATE INDEX IF NOT EXISTS idx_patients_first_name ON patients(first_name);
CREATE INDEX IF NOT EXISTS idx_patients_last_name ON patients(last_name);
CREATE INDEX IF NOT EXISTS idx_patients_birthdate ON patients(birthdate);

-- ============================================================================
-- Medical Tests (owning side of the patient relation)
-- ============================================================================

CREATE TABLE IF NOT EXISTS medical_tests (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    description TEXT NOT NULL DEFAULT '',
    date_time TEXT NOT NULL,                     -- YYYY-MM-DD HH:MM:SS[.fff]
    patient_id INTEGER NOT NULL REFERENCES patients(id)
);

CREATE INDEX IF NOT EXISTS idx_medical_tests_patient ON medical_tests(patient_id);
"#;
