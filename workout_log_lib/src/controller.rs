use chrono::{DateTime, Utc};
use geo_types::Point;

use crate::{
    collaborators::{SessionStorage, SessionUi},
    error::{CorruptRecordError, NotFound, PersistenceError, SessionError, ValidationError},
    persistence::PersistenceCodec,
    render::{marker_text, RenderedSession},
    session::{self, Session, SessionKind},
    session_store::SessionStore,
    MAP_ZOOM_LEVEL,
};

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// The entry form's values, exactly as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFields {
    pub kind: String,
    pub distance: String,
    pub duration: String,
    /// Cadence for a run, elevation gain for a ride.
    pub cadence_or_elevation: String,
}

/// Ties the session store to its storage and to the map, form and list.
///
/// Every operation runs to completion before returning. Input is fully
/// validated before anything is touched, so a rejected submission leaves both
/// the store and the stored document exactly as they were.
pub struct SessionController<S, U, C = SystemClock> {
    store: SessionStore,
    codec: PersistenceCodec,
    storage: S,
    ui: U,
    clock: C,
    pending_point: Option<Point>,
    last_id: Option<i64>,
}

impl<S: SessionStorage, U: SessionUi> SessionController<S, U, SystemClock> {
    pub fn new(storage: S, ui: U) -> Self {
        Self::with_clock(storage, ui, SystemClock)
    }
}

impl<S: SessionStorage, U: SessionUi, C: Clock> SessionController<S, U, C> {
    pub fn with_clock(storage: S, ui: U, clock: C) -> Self {
        Self {
            store: SessionStore::new(),
            codec: PersistenceCodec::new(),
            storage,
            ui,
            clock,
            pending_point: None,
            last_id: None,
        }
    }

    /// Restores the stored sessions and renders each of them.
    /// Returns the records that had to be skipped.
    pub fn startup(&mut self) -> Result<Vec<CorruptRecordError>, SessionError> {
        let report = self.codec.load(&self.storage)?;

        if report.format_version == 0 && !report.sessions.is_empty() {
            tracing::info!("Stored sessions use the legacy layout, they will be rewritten on the next save");
        }

        self.store.replace_all(report.sessions)?;
        self.last_id = self.store.max_id();

        for session in self.store.all() {
            render(&mut self.ui, session);
        }

        tracing::info!("Restored {} sessions, skipped {}", self.store.len(), report.rejected.len());
        Ok(report.rejected)
    }

    pub fn on_map_click(&mut self, point: Point) {
        self.pending_point = Some(point);
        self.ui.show();
    }

    /// Creates a session at the last clicked point.
    pub fn on_form_submit(&mut self, raw: &RawFields) -> Result<Session, SessionError> {
        let Some(point) = self.pending_point else {
            let err = ValidationError::NoLocation;
            self.ui.report_error(&err.to_string());
            return Err(err.into());
        };

        let result = self.create_from_input(point, raw);
        if matches!(result, Ok(_) | Err(SessionError::NotPersisted { .. })) {
            self.pending_point = None;
            self.ui.reset();
            self.ui.hide();
        }
        result
    }

    pub fn create_from_input(&mut self, point: Point, raw: &RawFields) -> Result<Session, SessionError> {
        let session = match self.build_session(point, raw) {
            Ok(session) => session,
            Err(err) => {
                tracing::debug!("Rejected input: {err}");
                self.ui.report_error(&err.to_string());
                return Err(err.into());
            }
        };

        self.store.add(session.clone())?;
        self.last_id = Some(session.id());

        let saved = self.codec.save(&self.store, &mut self.storage);
        render(&mut self.ui, &session);

        match saved {
            Ok(()) => {
                tracing::info!("Logged {} ({})", session.label(), session.id());
                Ok(session)
            }
            Err(source) => {
                tracing::warn!("Session {} not saved: {source}", session.id());
                self.ui.report_error(&source.to_string());
                Err(SessionError::NotPersisted {
                    id: session.id(),
                    source,
                })
            }
        }
    }

    pub fn resolve_by_element_id(&self, id: i64) -> Result<&Session, NotFound> {
        self.store.find_by_id(id)
    }

    /// Brings a listed session back into view on the map.
    pub fn on_item_activate(&mut self, id: i64) -> Result<(), NotFound> {
        let position = match self.store.find_by_id(id) {
            Ok(session) => session.position(),
            Err(err) => {
                tracing::debug!("Ignoring activation of stale item: {err}");
                return Err(err);
            }
        };

        self.ui.recenter(position, MAP_ZOOM_LEVEL);
        Ok(())
    }

    /// Forgets every session, in storage and in memory.
    pub fn reset(&mut self) -> Result<(), SessionError> {
        self.storage.clear().map_err(PersistenceError::from)?;
        self.store.replace_all(Vec::new())?;
        self.pending_point = None;
        tracing::info!("All sessions removed");
        Ok(())
    }

    /// Replaces every session with the contents of `text` and saves the result.
    /// The store only changes once the imported sessions have been saved.
    pub fn import_document(&mut self, text: &str) -> Result<Vec<CorruptRecordError>, SessionError> {
        let report = self.codec.decode(text)?;
        let mut imported = SessionStore::new();
        imported.replace_all(report.sessions)?;

        self.codec.save(&imported, &mut self.storage)?;

        self.store = imported;
        self.last_id = self.last_id.max(self.store.max_id());
        tracing::info!("Imported {} sessions, skipped {}", self.store.len(), report.rejected.len());
        Ok(report.rejected)
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn ui(&self) -> &U {
        &self.ui
    }

    pub fn ui_mut(&mut self) -> &mut U {
        &mut self.ui
    }

    fn build_session(&self, point: Point, raw: &RawFields) -> Result<Session, ValidationError> {
        let kind: SessionKind = raw.kind.parse()?;
        let extra_field = match kind {
            SessionKind::Run => "cadence",
            SessionKind::Ride => "elevation",
        };

        let distance = parse_number("distance", &raw.distance)?;
        let duration = parse_number("duration", &raw.duration)?;
        let extra = parse_number(extra_field, &raw.cadence_or_elevation)?;

        session::require_positive("distance", distance)?;
        session::require_positive("duration", duration)?;
        if kind == SessionKind::Run {
            session::require_positive("cadence", extra)?;
        }
        session::validate_point(point)?;

        let created_at = self.clock.now();
        let id = self.next_id(created_at)?;

        match kind {
            SessionKind::Run => Session::new_run(id, created_at, point, distance, duration, extra),
            SessionKind::Ride => Session::new_ride(id, created_at, point, distance, duration, extra),
        }
    }

    /// Millisecond timestamp, bumped past the last id handed out.
    fn next_id(&self, created_at: DateTime<Utc>) -> Result<i64, ValidationError> {
        let candidate = created_at.timestamp_millis();
        match self.last_id {
            Some(last) if candidate <= last => last.checked_add(1).ok_or(ValidationError::IdsExhausted),
            _ => Ok(candidate),
        }
    }
}

fn parse_number(field: &'static str, text: &str) -> Result<f64, ValidationError> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or(ValidationError::NotANumber { field })
}

fn render<U: SessionUi>(ui: &mut U, session: &Session) {
    ui.add_marker(session.position(), &marker_text(session));
    ui.append_item(&RenderedSession::from_session(session));
}
