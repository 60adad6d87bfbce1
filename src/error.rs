// Error types shared by the layout engine, the record model and the store

use thiserror::Error;

use crate::store::PersistenceError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid column plan: {0}")]
    Configuration(String),
    #[error("Table \"{0}\" has no active line items")]
    EmptyTable(String),
    #[error("Asset missing: {0}")]
    AssetMissing(String),
    #[error("Storage failure: {0}")]
    Persistence(#[from] PersistenceError),
    #[error("Failed to create PDF: {0}")]
    Pdf(String),
    #[error("Unknown line item: {0}")]
    UnknownItem(String),
    #[error("Invalid input: {0}")]
    Input(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
