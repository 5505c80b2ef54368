pub mod collaborators;
pub mod controller;
pub mod error;
pub mod persistence;
pub mod render;
pub mod session;
pub mod session_store;

/// Zoom level the map is set to when a session is brought back into view.
pub const MAP_ZOOM_LEVEL: u8 = 14;

/// The single key all sessions are persisted under.
pub const STORAGE_KEY: &str = "workouts";
