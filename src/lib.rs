//! therapy-plan-pdf: clinic therapy plans as paginated PDF documents.
//!
//! The crate has two halves. The layout half ([`layout`], [`render`]) turns a
//! patient record, its supplement prescriptions and checklist sections into
//! A4 landscape pages. The record half ([`merge`], [`store`]) keeps the
//! record-level therapy duration and per-item overrides consistent across
//! edits, saves and reloads.

pub mod config;
pub mod error;
pub mod layout;
pub mod merge;
pub mod model;
pub mod render;
pub mod sections;
pub mod store;

pub use config::ClinicProfile;
pub use error::{Error, Result};
pub use merge::{Provenance, SessionDefaults, WorkingItem, WorkingRecord};
pub use model::{CatalogEntry, LineItem, PatientRecord, PlanFile, StoredRecord};
pub use render::{Block, DocumentBuilder};
pub use store::{PersistenceError, RecordStore, SqliteStore};
