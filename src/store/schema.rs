//! SQLite schema definition.

/// Complete database schema.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Supplement Catalog
-- ============================================================================

CREATE TABLE IF NOT EXISTS supplement_categories (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS supplements (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    category INTEGER NOT NULL REFERENCES supplement_categories(id),
    delivery_form TEXT                            -- pre-fill for new line items
);

CREATE INDEX IF NOT EXISTS idx_supplements_category ON supplements(category, id);

-- ============================================================================
-- Patients
-- ============================================================================

CREATE TABLE IF NOT EXISTS patients (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    patient_name TEXT NOT NULL UNIQUE,
    birth_date TEXT,
    sex TEXT,
    height_cm INTEGER,
    weight_kg REAL,
    therapy_start TEXT,
    duration_months INTEGER NOT NULL,
    blood_work_discussed INTEGER NOT NULL DEFAULT 0,
    allergies TEXT NOT NULL DEFAULT '',
    diagnoses TEXT NOT NULL DEFAULT '',
    control_appointment INTEGER NOT NULL DEFAULT 0,
    lab_review INTEGER NOT NULL DEFAULT 0,
    follow_up_remarks TEXT NOT NULL DEFAULT '',
    revision INTEGER NOT NULL DEFAULT 1,          -- bumped on every save
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- ============================================================================
-- Prescriptions
-- ============================================================================

CREATE TABLE IF NOT EXISTS patient_prescriptions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    patient_id INTEGER NOT NULL REFERENCES patients(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    supplement_id TEXT NOT NULL REFERENCES supplements(id),
    total_dose INTEGER NOT NULL,
    delivery_form TEXT NOT NULL DEFAULT '',
    per_intake TEXT NOT NULL DEFAULT '',
    fasting TEXT NOT NULL DEFAULT '',             -- '' = slot unused
    morning TEXT NOT NULL DEFAULT '',
    midday TEXT NOT NULL DEFAULT '',
    evening TEXT NOT NULL DEFAULT '',
    night TEXT NOT NULL DEFAULT '',
    comment TEXT NOT NULL DEFAULT ''
);

CREATE INDEX IF NOT EXISTS idx_prescriptions_patient ON patient_prescriptions(patient_id, position);

-- ============================================================================
-- Section Data
-- ============================================================================

CREATE TABLE IF NOT EXISTS patient_sections (
    patient_id INTEGER NOT NULL REFERENCES patients(id) ON DELETE CASCADE,
    domain TEXT NOT NULL CHECK (domain IN ('therapy_plan', 'infusion', 'notes')),
    data TEXT NOT NULL,                           -- versioned JSON blob
    PRIMARY KEY (patient_id, domain)
);
"#;
