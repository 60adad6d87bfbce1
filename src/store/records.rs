//! Patient record load/save.

use log::{debug, info};
use rusqlite::{params, OptionalExtension, Transaction};

use super::{PersistenceError, PersistenceResult, RecordStore, SqliteStore};
use crate::model::{
    CatalogEntry, FollowUp, LineItem, PatientRecord, Schedule, Sex, SlotAmount, StoredRecord,
};
use crate::sections::{SectionBundle, SectionData, SectionDomain};

/// Raw prescription row before slot codes are parsed.
struct PrescriptionRow {
    catalog_id: String,
    name: String,
    total_dose: u32,
    delivery_form: String,
    per_intake: String,
    slots: [String; 5],
    comment: String,
}

fn parse_slot(code: &str) -> PersistenceResult<Option<SlotAmount>> {
    if code.trim().is_empty() {
        return Ok(None);
    }
    SlotAmount::parse(code)
        .map(Some)
        .ok_or_else(|| PersistenceError::Corrupt(format!("slot amount {:?}", code)))
}

fn slot_code(amount: Option<SlotAmount>) -> &'static str {
    amount.map(|a| a.code()).unwrap_or("")
}

impl TryFrom<PrescriptionRow> for LineItem {
    type Error = PersistenceError;

    fn try_from(row: PrescriptionRow) -> PersistenceResult<Self> {
        let [fasting, morning, midday, evening, night] = &row.slots;
        Ok(LineItem {
            catalog_id: row.catalog_id,
            name: row.name,
            total_dose: row.total_dose,
            delivery_form: row.delivery_form,
            per_intake: row.per_intake,
            schedule: Schedule {
                fasting: parse_slot(fasting)?,
                morning: parse_slot(morning)?,
                midday: parse_slot(midday)?,
                evening: parse_slot(evening)?,
                night: parse_slot(night)?,
            },
            comment: row.comment,
        })
    }
}

impl SqliteStore {
    fn load_items(&self, patient_id: i64) -> PersistenceResult<Vec<LineItem>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT p.supplement_id, s.name, p.total_dose, p.delivery_form, p.per_intake,
                   p.fasting, p.morning, p.midday, p.evening, p.night, p.comment
            FROM patient_prescriptions p
            JOIN supplements s ON s.id = p.supplement_id
            WHERE p.patient_id = ?1
            ORDER BY p.position
            "#,
        )?;
        let rows = stmt
            .query_map([patient_id], |row| {
                Ok(PrescriptionRow {
                    catalog_id: row.get(0)?,
                    name: row.get(1)?,
                    total_dose: row.get(2)?,
                    delivery_form: row.get(3)?,
                    per_intake: row.get(4)?,
                    slots: [row.get(5)?, row.get(6)?, row.get(7)?, row.get(8)?, row.get(9)?],
                    comment: row.get(10)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(LineItem::try_from).collect()
    }

    fn load_sections(&self, patient_id: i64) -> PersistenceResult<SectionBundle> {
        let mut stmt = self
            .conn
            .prepare("SELECT domain, data FROM patient_sections WHERE patient_id = ?1")?;
        let blobs = stmt
            .query_map([patient_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut bundle = SectionBundle::default();
        for (key, json) in blobs {
            let domain = SectionDomain::parse(&key)
                .ok_or_else(|| PersistenceError::Corrupt(format!("section domain {:?}", key)))?;
            *bundle.get_mut(domain) = SectionData::from_json(&json)?;
        }
        Ok(bundle)
    }
}

fn write_items(tx: &Transaction<'_>, patient_id: i64, items: &[LineItem]) -> PersistenceResult<()> {
    tx.execute(
        "DELETE FROM patient_prescriptions WHERE patient_id = ?1",
        [patient_id],
    )?;
    let mut known = tx.prepare("SELECT EXISTS(SELECT 1 FROM supplements WHERE id = ?1)")?;
    let mut insert = tx.prepare(
        r#"
        INSERT INTO patient_prescriptions (
            patient_id, position, supplement_id, total_dose, delivery_form, per_intake,
            fasting, morning, midday, evening, night, comment
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )?;
    for (position, item) in items.iter().enumerate() {
        let exists: bool = known.query_row([&item.catalog_id], |row| row.get(0))?;
        if !exists {
            return Err(PersistenceError::UnknownCatalogItem(item.catalog_id.clone()));
        }
        let s = &item.schedule;
        insert.execute(params![
            patient_id,
            position as i64,
            item.catalog_id,
            item.total_dose,
            item.delivery_form,
            item.per_intake,
            slot_code(s.fasting),
            slot_code(s.morning),
            slot_code(s.midday),
            slot_code(s.evening),
            slot_code(s.night),
            item.comment,
        ])?;
    }
    Ok(())
}

fn write_sections(
    tx: &Transaction<'_>,
    patient_id: i64,
    sections: &SectionBundle,
) -> PersistenceResult<()> {
    for domain in SectionDomain::ALL {
        tx.execute(
            r#"
            INSERT INTO patient_sections (patient_id, domain, data) VALUES (?1, ?2, ?3)
            ON CONFLICT(patient_id, domain) DO UPDATE SET data = excluded.data
            "#,
            params![patient_id, domain.key(), sections.get(domain).to_json()?],
        )?;
    }
    Ok(())
}

impl RecordStore for SqliteStore {
    fn load_record(&self, name: &str) -> PersistenceResult<Option<StoredRecord>> {
        let row = self
            .conn
            .query_row(
                r#"
                SELECT id, revision, patient_name, birth_date, sex, height_cm, weight_kg,
                       therapy_start, duration_months, blood_work_discussed, allergies,
                       diagnoses, control_appointment, lab_review, follow_up_remarks
                FROM patients
                WHERE patient_name = ?1
                "#,
                [name],
                |row| {
                    let sex: Option<String> = row.get(4)?;
                    let patient = PatientRecord {
                        name: row.get(2)?,
                        birth_date: row.get(3)?,
                        sex: sex.as_deref().and_then(Sex::parse),
                        height_cm: row.get(5)?,
                        weight_kg: row.get(6)?,
                        therapy_start: row.get(7)?,
                        duration_months: row.get(8)?,
                        blood_work_discussed: row.get(9)?,
                        allergies: row.get(10)?,
                        diagnoses: row.get(11)?,
                        follow_up: FollowUp {
                            control_appointment: row.get(12)?,
                            lab_review: row.get(13)?,
                            remarks: row.get(14)?,
                        },
                    };
                    Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?, patient))
                },
            )
            .optional()?;

        let Some((patient_id, revision, patient)) = row else {
            debug!("No stored record for {}", name);
            return Ok(None);
        };

        Ok(Some(StoredRecord {
            patient,
            items: self.load_items(patient_id)?,
            sections: self.load_sections(patient_id)?,
            revision,
        }))
    }

    fn save_record(
        &mut self,
        patient: &PatientRecord,
        items: &[LineItem],
        sections: &SectionBundle,
        expected_revision: Option<i64>,
    ) -> PersistenceResult<i64> {
        let tx = self.conn.transaction()?;

        let existing: Option<(i64, i64)> = tx
            .query_row(
                "SELECT id, revision FROM patients WHERE patient_name = ?1",
                [&patient.name],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let found = existing.map(|(_, revision)| revision);
        if found != expected_revision {
            return Err(PersistenceError::Conflict {
                name: patient.name.clone(),
                expected: expected_revision,
                found,
            });
        }

        let sex = patient.sex.map(|s| s.code());
        let (patient_id, revision) = match existing {
            Some((id, revision)) => {
                tx.execute(
                    r#"
                    UPDATE patients SET
                        birth_date = ?2, sex = ?3, height_cm = ?4, weight_kg = ?5,
                        therapy_start = ?6, duration_months = ?7, blood_work_discussed = ?8,
                        allergies = ?9, diagnoses = ?10, control_appointment = ?11,
                        lab_review = ?12, follow_up_remarks = ?13,
                        revision = ?14, updated_at = datetime('now')
                    WHERE id = ?1
                    "#,
                    params![
                        id,
                        patient.birth_date,
                        sex,
                        patient.height_cm,
                        patient.weight_kg,
                        patient.therapy_start,
                        patient.duration_months,
                        patient.blood_work_discussed,
                        patient.allergies,
                        patient.diagnoses,
                        patient.follow_up.control_appointment,
                        patient.follow_up.lab_review,
                        patient.follow_up.remarks,
                        revision + 1,
                    ],
                )?;
                (id, revision + 1)
            }
            None => {
                tx.execute(
                    r#"
                    INSERT INTO patients (
                        patient_name, birth_date, sex, height_cm, weight_kg, therapy_start,
                        duration_months, blood_work_discussed, allergies, diagnoses,
                        control_appointment, lab_review, follow_up_remarks, revision
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, 1)
                    "#,
                    params![
                        patient.name,
                        patient.birth_date,
                        sex,
                        patient.height_cm,
                        patient.weight_kg,
                        patient.therapy_start,
                        patient.duration_months,
                        patient.blood_work_discussed,
                        patient.allergies,
                        patient.diagnoses,
                        patient.follow_up.control_appointment,
                        patient.follow_up.lab_review,
                        patient.follow_up.remarks,
                    ],
                )?;
                (tx.last_insert_rowid(), 1)
            }
        };

        write_items(&tx, patient_id, items)?;
        write_sections(&tx, patient_id, sections)?;
        tx.commit()?;

        info!(
            "Saved {} ({} items, revision {})",
            patient.name,
            items.len(),
            revision
        );
        Ok(revision)
    }

    fn delete_record(&mut self, name: &str) -> PersistenceResult<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM patients WHERE patient_name = ?1", [name])?;
        if rows > 0 {
            info!("Deleted {}", name);
        }
        Ok(rows > 0)
    }

    fn list_names(&self) -> PersistenceResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT patient_name FROM patients ORDER BY patient_name")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(names)
    }

    fn list_catalog(&self) -> PersistenceResult<Vec<CatalogEntry>> {
        self.catalog_entries()
    }
}
