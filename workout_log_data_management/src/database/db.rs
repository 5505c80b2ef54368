use std::path::Path;

use const_format::concatcp;
use sqlx::{query, query_as, sqlite::SqliteConnectOptions, Executor, Pool, Sqlite, SqlitePool};
use tokio::runtime::Runtime;
use workout_log_lib::{collaborators::SessionStorage, error::StorageError, STORAGE_KEY};

use crate::DataManagerError;

use super::constants::*;

/// Key/value table in a SQLite file.
///
/// Storage collaborators are synchronous, so the database owns a current-thread
/// runtime and blocks on every query. It must not be used from inside another
/// tokio runtime.
pub struct SessionDatabase {
    // Dropped before the runtime.
    pool: Pool<Sqlite>,
    runtime: Runtime,
}

impl SessionDatabase {
    pub fn connect(path: &Path) -> Result<Self, DataManagerError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|err| DataManagerError::Database(format!("Failed to start database runtime: {err}")))?;

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);

        let pool = runtime
            .block_on(SqlitePool::connect_with(options))
            .map_err(|err| DataManagerError::Database(format!("Failed to connect to database {:?}: {err}", path)))?;

        let db = Self { pool, runtime };
        db.init()?;

        tracing::debug!("Connected to database {:?}", path);
        Ok(db)
    }

    fn init(&self) -> Result<(), DataManagerError> {
        self.runtime
            .block_on(self.pool.execute(concatcp!("
                CREATE TABLE IF NOT EXISTS ", KEY_VALUE_TABLE_NAME, "(",
                    KEY,   " TEXT PRIMARY KEY,",
                    VALUE, " TEXT NOT NULL
                )")))
            .map_err(|err| DataManagerError::Database(format!("Failed to create tables: {err}")))
            .map(|_| ())
    }

    pub fn get_value(&self, key: &str) -> Result<Option<String>, DataManagerError> {
        self.runtime
            .block_on(
                query_as::<_, (String,)>(concatcp!("SELECT ", VALUE, " FROM ", KEY_VALUE_TABLE_NAME, " WHERE ", KEY, " = ?1"))
                    .bind(key)
                    .fetch_optional(&self.pool),
            )
            .map_err(|err| DataManagerError::Database(format!("Failed to read {key}: {err}")))
            .map(|row| row.map(|row| row.0))
    }

    pub fn set_value(&self, key: &str, value: &str) -> Result<(), DataManagerError> {
        self.runtime
            .block_on(
                query(concatcp!("
                    INSERT INTO ", KEY_VALUE_TABLE_NAME, "(", KEY, ", ", VALUE, ") VALUES (?1, ?2)
                    ON CONFLICT(", KEY, ") DO UPDATE SET ", VALUE, " = excluded.", VALUE))
                    .bind(key)
                    .bind(value)
                    .execute(&self.pool),
            )
            .map_err(|err| DataManagerError::Database(format!("Failed to write {key}: {err}")))
            .map(|_| ())
    }

    pub fn delete_value(&self, key: &str) -> Result<(), DataManagerError> {
        self.runtime
            .block_on(
                query(concatcp!("DELETE FROM ", KEY_VALUE_TABLE_NAME, " WHERE ", KEY, " = ?1"))
                    .bind(key)
                    .execute(&self.pool),
            )
            .map_err(|err| DataManagerError::Database(format!("Failed to delete {key}: {err}")))
            .map(|_| ())
    }
}

impl SessionStorage for SessionDatabase {
    fn read_raw(&self) -> Result<Option<String>, StorageError> {
        Ok(self.get_value(STORAGE_KEY)?)
    }

    fn write_raw(&mut self, text: &str) -> Result<(), StorageError> {
        Ok(self.set_value(STORAGE_KEY, text)?)
    }

    fn clear(&mut self) -> Result<(), StorageError> {
        Ok(self.delete_value(STORAGE_KEY)?)
    }
}
