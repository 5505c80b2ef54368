use std::path::PathBuf;

use workout_log_lib::{collaborators::SessionStorage, error::StorageError};

use crate::{database::db::SessionDatabase, DataManagerError, FileStorage, DATABASE_FILE_NAME, DATA_DIR};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StorageBackend {
    #[default]
    File,
    Sqlite,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub backend: StorageBackend,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            backend: StorageBackend::default(),
        }
    }
}

/// `data/` under the project root, or under the working directory when there is no project root.
pub fn default_data_dir() -> PathBuf {
    project_root::get_project_root()
        .map(|root| root.join(DATA_DIR))
        .unwrap_or_else(|_| PathBuf::from(DATA_DIR))
}

/// The storage collaborator selected by a [`StorageConfig`].
pub enum DataStorage {
    File(FileStorage),
    Sqlite(SessionDatabase),
}

impl DataStorage {
    pub fn open(config: &StorageConfig) -> Result<Self, DataManagerError> {
        tracing::debug!("Opening {:?} storage in {:?}", config.backend, config.data_dir);

        match config.backend {
            StorageBackend::File => FileStorage::in_dir(&config.data_dir).map(DataStorage::File),
            StorageBackend::Sqlite => {
                if !config.data_dir.exists() {
                    std::fs::create_dir_all(&config.data_dir)
                        .map_err(|_| DataManagerError::Database(format!("Failed to create data directory: {:?}", config.data_dir)))?;
                }
                SessionDatabase::connect(&config.data_dir.join(DATABASE_FILE_NAME)).map(DataStorage::Sqlite)
            }
        }
    }
}

impl SessionStorage for DataStorage {
    fn read_raw(&self) -> Result<Option<String>, StorageError> {
        match self {
            DataStorage::File(storage) => storage.read_raw(),
            DataStorage::Sqlite(storage) => storage.read_raw(),
        }
    }

    fn write_raw(&mut self, text: &str) -> Result<(), StorageError> {
        match self {
            DataStorage::File(storage) => storage.write_raw(text),
            DataStorage::Sqlite(storage) => storage.write_raw(text),
        }
    }

    fn clear(&mut self) -> Result<(), StorageError> {
        match self {
            DataStorage::File(storage) => storage.clear(),
            DataStorage::Sqlite(storage) => storage.clear(),
        }
    }
}

#[cfg(test)]
mod tests {
    use workout_log_lib::{
        collaborators::{FormView, MapView, MarkerHandle, SessionList},
        controller::{RawFields, SessionController},
        render::RenderedSession,
        session::{geo_point, Session},
    };

    use super::*;

    #[derive(Default)]
    struct NullUi {
        items: usize,
    }

    impl MapView for NullUi {
        fn add_marker(&mut self, _position: geo_types::Point, _label: &str) -> MarkerHandle {
            MarkerHandle(0)
        }

        fn recenter(&mut self, _position: geo_types::Point, _zoom: u8) {}
    }

    impl FormView for NullUi {
        fn show(&mut self) {}
        fn hide(&mut self) {}
        fn reset(&mut self) {}
        fn report_error(&mut self, _message: &str) {}
    }

    impl SessionList for NullUi {
        fn append_item(&mut self, _item: &RenderedSession) {
            self.items += 1;
        }
    }

    fn log_two_and_reload(backend: StorageBackend) {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            data_dir: dir.path().join("data"),
            backend,
        };

        let mut controller = SessionController::new(DataStorage::open(&config).unwrap(), NullUi::default());
        controller.startup().unwrap();
        let run = RawFields {
            kind: "Run".into(),
            distance: "5".into(),
            duration: "25".into(),
            cadence_or_elevation: "180".into(),
        };
        let ride = RawFields {
            kind: "Ride".into(),
            distance: "20".into(),
            duration: "60".into(),
            cadence_or_elevation: "-50".into(),
        };
        let first = controller.create_from_input(geo_point(52.52, 13.40), &run).unwrap();
        let second = controller.create_from_input(geo_point(48.85, 2.35), &ride).unwrap();
        drop(controller);

        let mut reopened = SessionController::new(DataStorage::open(&config).unwrap(), NullUi::default());
        let rejected = reopened.startup().unwrap();

        assert!(rejected.is_empty());
        assert_eq!(reopened.store().all().cloned().collect::<Vec<Session>>(), vec![first, second]);
        assert_eq!(reopened.ui().items, 2);
    }

    #[test]
    fn file_backend_persists_across_restarts() {
        log_two_and_reload(StorageBackend::File);
    }

    #[test]
    fn sqlite_backend_persists_across_restarts() {
        log_two_and_reload(StorageBackend::Sqlite);
    }
}
