//! Narrow interfaces to the things around the session core: the map, the entry
//! form, the session list and the storage medium.

use geo_types::Point;

use crate::{error::StorageError, render::RenderedSession};

/// Opaque handle to a marker placed by a [`MapView`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MarkerHandle(pub u64);

pub trait MapView {
    fn add_marker(&mut self, position: Point, label: &str) -> MarkerHandle;

    fn recenter(&mut self, position: Point, zoom: u8);
}

pub trait FormView {
    fn show(&mut self);

    fn hide(&mut self);

    fn reset(&mut self);

    /// Shows a message to the user, e.g. a validation failure.
    fn report_error(&mut self, message: &str);
}

pub trait SessionList {
    fn append_item(&mut self, item: &RenderedSession);
}

/// Everything the controller renders to.
pub trait SessionUi: MapView + FormView + SessionList {}

impl<T: MapView + FormView + SessionList> SessionUi for T {}

/// Flat text storage under a single fixed key.
pub trait SessionStorage {
    /// `None` when nothing has been stored yet.
    fn read_raw(&self) -> Result<Option<String>, StorageError>;

    /// Replaces the stored text wholesale.
    fn write_raw(&mut self, text: &str) -> Result<(), StorageError>;

    fn clear(&mut self) -> Result<(), StorageError>;
}

impl<S: SessionStorage + ?Sized> SessionStorage for Box<S> {
    fn read_raw(&self) -> Result<Option<String>, StorageError> {
        (**self).read_raw()
    }

    fn write_raw(&mut self, text: &str) -> Result<(), StorageError> {
        (**self).write_raw(text)
    }

    fn clear(&mut self) -> Result<(), StorageError> {
        (**self).clear()
    }
}

/// Storage that lives only as long as the process.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    slot: Option<String>,
    writes: usize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contents(text: impl Into<String>) -> Self {
        Self {
            slot: Some(text.into()),
            writes: 0,
        }
    }

    pub fn contents(&self) -> Option<&str> {
        self.slot.as_deref()
    }

    /// Number of successful `write_raw` calls.
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl SessionStorage for MemoryStorage {
    fn read_raw(&self) -> Result<Option<String>, StorageError> {
        Ok(self.slot.clone())
    }

    fn write_raw(&mut self, text: &str) -> Result<(), StorageError> {
        self.slot = Some(text.to_string());
        self.writes += 1;
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StorageError> {
        self.slot = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_storage_roundtrip_and_clear() {
        let mut storage = MemoryStorage::new();
        assert_eq!(storage.read_raw(), Ok(None));

        storage.write_raw("[]").unwrap();
        storage.write_raw("{}").unwrap();
        assert_eq!(storage.read_raw(), Ok(Some("{}".to_string())));
        assert_eq!(storage.writes(), 2);

        storage.clear().unwrap();
        assert_eq!(storage.contents(), None);
    }
}
