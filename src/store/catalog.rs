//! Supplement catalog seeding and lookup.

use log::info;
use rusqlite::{params, OptionalExtension};
use serde::Deserialize;

use super::{PersistenceResult, SqliteStore};
use crate::model::CatalogEntry;

const CATALOG_SEED: &str = include_str!("../../data/catalog.json");

#[derive(Deserialize)]
struct CatalogSeed {
    categories: Vec<CategorySeed>,
    items: Vec<ItemSeed>,
}

#[derive(Deserialize)]
struct CategorySeed {
    id: u32,
    name: String,
}

#[derive(Deserialize)]
struct ItemSeed {
    id: String,
    name: String,
    category: u32,
    #[serde(default)]
    delivery_form: Option<String>,
}

const ENTRY_SELECT: &str = r#"
    SELECT s.id, s.name, s.category, c.name, s.delivery_form
    FROM supplements s
    JOIN supplement_categories c ON c.id = s.category
"#;

fn entry_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CatalogEntry> {
    Ok(CatalogEntry {
        id: row.get(0)?,
        name: row.get(1)?,
        category: row.get(2)?,
        category_name: row.get(3)?,
        delivery_form: row.get(4)?,
    })
}

impl SqliteStore {
    /// Fill an empty catalog from the bundled seed.
    pub(super) fn seed_catalog(&mut self) -> PersistenceResult<()> {
        let existing: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM supplements", [], |row| row.get(0))?;
        if existing > 0 {
            return Ok(());
        }

        let seed: CatalogSeed = serde_json::from_str(CATALOG_SEED)?;
        let tx = self.conn.transaction()?;
        {
            let mut insert_category =
                tx.prepare("INSERT INTO supplement_categories (id, name) VALUES (?1, ?2)")?;
            for category in &seed.categories {
                insert_category.execute(params![category.id, category.name])?;
            }
            let mut insert_item = tx.prepare(
                r#"
                INSERT INTO supplements (id, name, category, delivery_form)
                VALUES (?1, ?2, ?3, ?4)
                "#,
            )?;
            for item in &seed.items {
                insert_item.execute(params![
                    item.id,
                    item.name,
                    item.category,
                    item.delivery_form
                ])?;
            }
        }
        tx.commit()?;
        info!(
            "Seeded catalog with {} categories and {} supplements",
            seed.categories.len(),
            seed.items.len()
        );
        Ok(())
    }

    /// All catalog entries, grouped by category.
    pub(super) fn catalog_entries(&self) -> PersistenceResult<Vec<CatalogEntry>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{} ORDER BY s.category, s.id", ENTRY_SELECT))?;
        let entries = stmt
            .query_map([], entry_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Look up one catalog entry.
    pub fn catalog_entry(&self, id: &str) -> PersistenceResult<Option<CatalogEntry>> {
        self.conn
            .query_row(&format!("{} WHERE s.id = ?1", ENTRY_SELECT), [id], entry_from_row)
            .optional()
            .map_err(Into::into)
    }
}
