//! Record-level default vs. per-item override for line item durations.
//!
//! Every line item either follows the record's `duration_months`
//! ([`Provenance::Inherited`]) or keeps its own value
//! ([`Provenance::Pinned`]). Provenance is only tracked in memory. On load it
//! is rebuilt from the stored values: an item equal to the stored default is
//! inherited, anything else is pinned.

use log::{debug, info};

use crate::error::{Error, Result};
use crate::model::{
    CatalogEntry, LineItem, PatientRecord, PlanFile, SlotAmount, StoredRecord, TimeSlot,
    DEFAULT_DURATION_MONTHS,
};
use crate::sections::{SectionBundle, SectionDomain, SectionValue};
use crate::store::{PersistenceError, RecordStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    Inherited,
    Pinned,
}

/// Values a new session starts from.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionDefaults {
    pub duration_months: u32,
    /// Pre-fill for a new line item's per-intake text.
    pub per_intake: String,
}

impl Default for SessionDefaults {
    fn default() -> Self {
        Self {
            duration_months: DEFAULT_DURATION_MONTHS,
            per_intake: "1x täglich".to_string(),
        }
    }
}

/// A line item plus where its total dose comes from.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkingItem {
    item: LineItem,
    provenance: Provenance,
}

impl WorkingItem {
    pub fn line_item(&self) -> &LineItem {
        &self.item
    }

    pub fn provenance(&self) -> Provenance {
        self.provenance
    }

    pub fn total_dose(&self) -> u32 {
        self.item.total_dose
    }

    pub fn set_slot(&mut self, slot: TimeSlot, amount: Option<SlotAmount>) {
        self.item.schedule.set(slot, amount);
    }

    pub fn set_comment(&mut self, comment: &str) {
        self.item.comment = comment.to_string();
    }

    pub fn set_delivery_form(&mut self, form: &str) {
        self.item.delivery_form = form.to_string();
    }

    pub fn set_per_intake(&mut self, per_intake: &str) {
        self.item.per_intake = per_intake.to_string();
    }
}

/// The in-session copy of one patient's record.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkingRecord {
    patient: PatientRecord,
    items: Vec<WorkingItem>,
    sections: SectionBundle,
    revision: Option<i64>,
}

impl WorkingRecord {
    pub fn new(name: &str, defaults: &SessionDefaults) -> Self {
        let mut patient = PatientRecord::new(name);
        patient.duration_months = defaults.duration_months;
        Self {
            patient,
            items: Vec::new(),
            sections: SectionBundle::default(),
            revision: None,
        }
    }

    pub fn patient(&self) -> &PatientRecord {
        &self.patient
    }

    /// Edit patient fields. A changed duration is propagated like
    /// [`set_global_default`]; a changed name makes the next save create a
    /// new record.
    pub fn edit_patient(&mut self, edit: impl FnOnce(&mut PatientRecord)) {
        let before = self.patient.clone();
        edit(&mut self.patient);
        if self.patient.name != before.name {
            self.revision = None;
        }
        if self.patient.duration_months != before.duration_months {
            self.propagate_default();
        }
    }

    pub fn global_default(&self) -> u32 {
        self.patient.duration_months
    }

    pub fn items(&self) -> &[WorkingItem] {
        &self.items
    }

    pub fn item(&self, catalog_id: &str) -> Option<&WorkingItem> {
        self.items.iter().find(|w| w.item.catalog_id == catalog_id)
    }

    /// Mutable access for everything except the total dose.
    pub fn item_mut(&mut self, catalog_id: &str) -> Result<&mut WorkingItem> {
        self.items
            .iter_mut()
            .find(|w| w.item.catalog_id == catalog_id)
            .ok_or_else(|| Error::UnknownItem(catalog_id.to_string()))
    }

    pub fn sections(&self) -> &SectionBundle {
        &self.sections
    }

    /// Set a checklist value; the key and value kind are checked against
    /// the domain's schema.
    pub fn set_section(
        &mut self,
        domain: SectionDomain,
        key: &str,
        value: SectionValue,
    ) -> Result<()> {
        domain
            .schema()
            .set(self.sections.get_mut(domain), key, value)
    }

    /// Revision this copy was loaded at, `None` if never saved.
    pub fn revision(&self) -> Option<i64> {
        self.revision
    }

    pub fn line_items(&self) -> Vec<LineItem> {
        self.items.iter().map(|w| w.item.clone()).collect()
    }

    fn propagate_default(&mut self) -> usize {
        let value = self.patient.duration_months;
        let mut updated = 0;
        for working in &mut self.items {
            if working.provenance == Provenance::Inherited && working.item.total_dose != value {
                working.item.total_dose = value;
                updated += 1;
            }
        }
        updated
    }
}

/// Change the record default. Inherited items follow; pinned items keep
/// their value. Returns the number of items that changed.
pub fn set_global_default(record: &mut WorkingRecord, value: u32) -> usize {
    record.patient.duration_months = value;
    let updated = record.propagate_default();
    debug!("Default set to {} months, {} items updated", value, updated);
    updated
}

/// Set one item's total dose. Matching the current default makes it
/// inherited again; any other value pins it.
pub fn set_item_value(
    record: &mut WorkingRecord,
    catalog_id: &str,
    value: u32,
) -> Result<Provenance> {
    let default = record.global_default();
    let working = record.item_mut(catalog_id)?;
    working.item.total_dose = value;
    working.provenance = if value == default {
        Provenance::Inherited
    } else {
        Provenance::Pinned
    };
    Ok(working.provenance)
}

/// Append a catalog item with the current default and the catalog's
/// delivery form hint.
pub fn add_item<'a>(
    record: &'a mut WorkingRecord,
    entry: &CatalogEntry,
    defaults: &SessionDefaults,
) -> Result<&'a mut WorkingItem> {
    if record.item(&entry.id).is_some() {
        return Err(Error::Input(format!("{} is already prescribed", entry.name)));
    }
    let item = LineItem {
        catalog_id: entry.id.clone(),
        name: entry.name.clone(),
        total_dose: record.global_default(),
        delivery_form: entry.delivery_form.clone().unwrap_or_default(),
        per_intake: defaults.per_intake.clone(),
        schedule: Default::default(),
        comment: String::new(),
    };
    record.items.push(WorkingItem {
        item,
        provenance: Provenance::Inherited,
    });
    let index = record.items.len() - 1;
    Ok(&mut record.items[index])
}

pub fn remove_item(record: &mut WorkingRecord, catalog_id: &str) -> Result<LineItem> {
    let index = record
        .items
        .iter()
        .position(|w| w.item.catalog_id == catalog_id)
        .ok_or_else(|| Error::UnknownItem(catalog_id.to_string()))?;
    Ok(record.items.remove(index).item)
}

/// Build the working copy from what the store returned.
///
/// With nothing stored, the record starts from the session defaults. Section
/// data is migrated to the current schema.
pub fn reconcile_on_load(
    persisted: Option<StoredRecord>,
    name: &str,
    defaults: &SessionDefaults,
) -> WorkingRecord {
    let Some(stored) = persisted else {
        debug!("Starting new record for {}", name);
        return WorkingRecord::new(name, defaults);
    };
    classify(
        stored.patient,
        stored.items,
        stored.sections,
        Some(stored.revision),
    )
}

/// Working copy of a plan file, to be saved over `revision`.
pub fn from_plan(plan: PlanFile, revision: Option<i64>) -> WorkingRecord {
    classify(plan.patient, plan.items, plan.sections, revision)
}

fn classify(
    patient: PatientRecord,
    items: Vec<LineItem>,
    sections: SectionBundle,
    revision: Option<i64>,
) -> WorkingRecord {
    let default = patient.duration_months;
    let items: Vec<WorkingItem> = items
        .into_iter()
        .map(|item| {
            let provenance = if item.total_dose == default {
                Provenance::Inherited
            } else {
                Provenance::Pinned
            };
            WorkingItem { item, provenance }
        })
        .collect();
    let pinned = items
        .iter()
        .filter(|w| w.provenance == Provenance::Pinned)
        .count();
    debug!(
        "{} at revision {:?}: {} items, {} pinned",
        patient.name,
        revision,
        items.len(),
        pinned
    );

    WorkingRecord {
        patient,
        items,
        sections: sections.migrated(),
        revision,
    }
}

/// Load a record by name, or start a new one.
pub fn load<S: RecordStore + ?Sized>(
    store: &S,
    name: &str,
    defaults: &SessionDefaults,
) -> std::result::Result<WorkingRecord, PersistenceError> {
    let persisted = store.load_record(name)?;
    Ok(reconcile_on_load(persisted, name, defaults))
}

/// Save the working copy. The revision only advances on success.
pub fn save<S: RecordStore + ?Sized>(
    record: &mut WorkingRecord,
    store: &mut S,
) -> std::result::Result<i64, PersistenceError> {
    let revision = store.save_record(
        &record.patient,
        &record.line_items(),
        &record.sections,
        record.revision,
    )?;
    record.revision = Some(revision);
    info!("{} saved at revision {}", record.patient.name, revision);
    Ok(revision)
}
