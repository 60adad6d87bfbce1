use therapy_plan_pdf::merge::{self, add_item, set_global_default, set_item_value};
use therapy_plan_pdf::model::{SlotAmount, TimeSlot};
use therapy_plan_pdf::render::table::supplement_table;
use therapy_plan_pdf::sections::{SectionDomain, SectionValue, CURRENT_VERSION};
use therapy_plan_pdf::{PersistenceError, Provenance, RecordStore, SessionDefaults, SqliteStore};

fn prescribe(store: &SqliteStore, record: &mut therapy_plan_pdf::WorkingRecord, ids: &[&str]) {
    let defaults = SessionDefaults::default();
    for id in ids {
        let entry = store.catalog_entry(id).unwrap().unwrap();
        let item = add_item(record, &entry, &defaults).unwrap();
        item.set_slot(TimeSlot::Morning, Some(SlotAmount::One));
    }
}

#[test]
fn test_session_edit_save_reload() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    let defaults = SessionDefaults::default();

    let mut record = merge::load(&store, "Erika Mustermann", &defaults).unwrap();
    prescribe(&store, &mut record, &["S001", "S020", "S015"]);

    set_global_default(&mut record, 6);
    set_item_value(&mut record, "S001", 6).unwrap();
    set_global_default(&mut record, 8);
    set_item_value(&mut record, "S020", 3).unwrap();
    set_global_default(&mut record, 10);
    merge::save(&mut record, &mut store).unwrap();

    let reloaded = merge::load(&store, "Erika Mustermann", &defaults).unwrap();
    let doses: Vec<(String, u32, Provenance)> = reloaded
        .items()
        .iter()
        .map(|w| {
            (
                w.line_item().catalog_id.clone(),
                w.total_dose(),
                w.provenance(),
            )
        })
        .collect();
    assert_eq!(
        doses,
        vec![
            ("S001".to_string(), 10, Provenance::Inherited),
            ("S020".to_string(), 3, Provenance::Pinned),
            ("S015".to_string(), 10, Provenance::Inherited),
        ]
    );

    // Rendered rows show each item's own duration
    let table = supplement_table(&reloaded.line_items(), 277.0).unwrap();
    let totals: Vec<&str> = table.rows.iter().map(|row| row[1].as_str()).collect();
    assert_eq!(totals, vec!["10 M", "3 M", "10 M"]);
}

#[test]
fn test_concurrent_editors_conflict() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    let defaults = SessionDefaults::default();

    let mut initial = merge::load(&store, "Max Muster", &defaults).unwrap();
    prescribe(&store, &mut initial, &["S001"]);
    merge::save(&mut initial, &mut store).unwrap();

    let mut first = merge::load(&store, "Max Muster", &defaults).unwrap();
    let mut second = merge::load(&store, "Max Muster", &defaults).unwrap();

    set_global_default(&mut first, 12);
    assert_eq!(merge::save(&mut first, &mut store).unwrap(), 2);

    set_global_default(&mut second, 3);
    let err = merge::save(&mut second, &mut store).unwrap_err();
    assert!(matches!(err, PersistenceError::Conflict { .. }));

    let stored = store.load_record("Max Muster").unwrap().unwrap();
    assert_eq!(stored.patient.duration_months, 12);
    assert_eq!(stored.items[0].total_dose, 12);
}

#[test]
fn test_legacy_sections_migrate_on_load() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    let defaults = SessionDefaults::default();
    let mut record = merge::load(&store, "Max Muster", &defaults).unwrap();
    merge::save(&mut record, &mut store).unwrap();

    store
        .conn()
        .execute(
            "UPDATE patient_sections SET data = ?1 WHERE domain = 'therapy_plan'",
            [r#"{"Labor": true, "sport": ["Yoga"], "Akupunktur": true}"#],
        )
        .unwrap();

    let reloaded = merge::load(&store, "Max Muster", &defaults).unwrap();
    let data = reloaded.sections().get(SectionDomain::TherapyPlan);
    assert_eq!(data.version, CURRENT_VERSION);
    assert_eq!(data.get("lab_basic"), Some(&SectionValue::Flag(true)));
    assert_eq!(
        data.get("sports"),
        Some(&SectionValue::Choices(vec!["Yoga".to_string()]))
    );
    // Unknown keys survive
    assert_eq!(data.get("Akupunktur"), Some(&SectionValue::Flag(true)));
}

#[test]
fn test_delete_then_load_starts_fresh() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    let defaults = SessionDefaults::default();
    let mut record = merge::load(&store, "Max Muster", &defaults).unwrap();
    prescribe(&store, &mut record, &["S001"]);
    merge::save(&mut record, &mut store).unwrap();

    assert!(store.delete_record("Max Muster").unwrap());
    let fresh = merge::load(&store, "Max Muster", &defaults).unwrap();
    assert!(fresh.items().is_empty());
    assert_eq!(fresh.revision(), None);
}

#[test]
fn test_checklist_values_survive_save() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    let defaults = SessionDefaults::default();
    let mut record = merge::load(&store, "Max Muster", &defaults).unwrap();
    record
        .set_section(
            SectionDomain::TherapyPlan,
            "sports",
            SectionValue::Choices(vec!["Yoga".to_string(), "Schwimmen".to_string()]),
        )
        .unwrap();
    assert!(record
        .set_section(SectionDomain::TherapyPlan, "sports", SectionValue::Flag(true))
        .is_err());
    merge::save(&mut record, &mut store).unwrap();

    let reloaded = merge::load(&store, "Max Muster", &defaults).unwrap();
    assert_eq!(reloaded.sections(), record.sections());
}
