use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use workout_log_lib::{collaborators::SessionStorage, error::StorageError};

use crate::{DataManagerError, SESSIONS_FILE_NAME};

/// Sessions document kept as a single JSON file.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Storage file inside `data_dir`, creating the directory if needed.
    pub fn in_dir(data_dir: &Path) -> Result<Self, DataManagerError> {
        if !data_dir.exists() {
            fs::create_dir_all(data_dir)
                .map_err(|err| DataManagerError::File(format!("Failed to create data directory {:?}: {err}", data_dir)))?;
        }

        Ok(Self::new(data_dir.join(SESSIONS_FILE_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStorage for FileStorage {
    fn read_raw(&self) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(DataManagerError::File(format!("Failed to read {:?}: {err}", self.path)).into()),
        }
    }

    /// Written next to the target and renamed over it, so readers never see half a document.
    fn write_raw(&mut self, text: &str) -> Result<(), StorageError> {
        let temp_path = self.path.with_extension("json.tmp");

        fs::write(&temp_path, text)
            .map_err(|err| DataManagerError::File(format!("Failed to write {:?}: {err}", temp_path)))?;
        fs::rename(&temp_path, &self.path)
            .map_err(|err| DataManagerError::File(format!("Failed to replace {:?}: {err}", self.path)))?;

        Ok(())
    }

    fn clear(&mut self) -> Result<(), StorageError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(DataManagerError::File(format!("Failed to remove {:?}: {err}", self.path)).into()),
        }
    }
}
