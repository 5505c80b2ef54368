use thiserror::Error;

/// Rejected user input. Nothing is mutated when one of these is returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{field}: not a number")]
    NotANumber { field: &'static str },

    #[error("{field}: must be positive")]
    NotPositive { field: &'static str },

    #[error("{field}: out of range")]
    OutOfRange { field: &'static str },

    #[error("unknown session kind: {0:?}")]
    UnknownKind(String),

    #[error("no location selected")]
    NoLocation,

    #[error("no session ids left")]
    IdsExhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no session with id {0}")]
pub struct NotFound(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("a session with id {0} already exists")]
pub struct DuplicateSessionId(pub i64);

/// Failure reported by a storage collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("storage failure: {0}")]
pub struct StorageError(pub String);

/// A single persisted record that could not be restored.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("record {index}{}: {reason}", .id.map(|id| format!(" (id {id})")).unwrap_or_default())]
pub struct CorruptRecordError {
    pub index: usize,
    pub id: Option<i64>,
    pub reason: String,
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("failed to serialize sessions: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("stored document is corrupt: {0}")]
    CorruptDocument(String),

    #[error("stored document has unsupported version {0}")]
    UnsupportedVersion(u64),
}

/// Errors returned by controller operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    NotFound(#[from] NotFound),

    #[error(transparent)]
    Duplicate(#[from] DuplicateSessionId),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    /// The session was added and rendered but could not be written to storage.
    #[error("session {id} was kept in memory but not saved: {source}")]
    NotPersisted {
        id: i64,
        #[source]
        source: PersistenceError,
    },
}
