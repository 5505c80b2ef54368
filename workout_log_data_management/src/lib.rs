use const_format::concatcp;
use thiserror::Error;
use workout_log_lib::{STORAGE_KEY, error::StorageError};

pub mod database;
mod data_manager;
mod file_storage;

pub use data_manager::*;
pub use file_storage::FileStorage;

pub const DATA_DIR: &str = "data/";
pub const DATABASE_FILE_NAME: &str = "database.db";
pub const SESSIONS_FILE_NAME: &str = concatcp!(STORAGE_KEY, ".json");

#[derive(Debug, Error)]
pub enum DataManagerError {
    #[error("database: {0}")]
    Database(String),
    #[error("file: {0}")]
    File(String),
}

impl From<DataManagerError> for StorageError {
    fn from(err: DataManagerError) -> Self {
        StorageError(err.to_string())
    }
}
