//! Flat text representation of the session store.
//!
//! The current layout is a versioned JSON object holding one flat record per
//! session. Documents written by the earlier browser version of the app (a bare
//! array with `type` set to `running` / `cycling`) are still read. Each record is
//! restored on its own; a broken record is reported and skipped so the others load.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    collaborators::SessionStorage,
    error::{CorruptRecordError, PersistenceError, ValidationError},
    session::{self, geo_point, RideSession, RunSession, Session, Variant},
    session_store::SessionStore,
};

pub const FORMAT_VERSION: u64 = 1;

#[derive(Debug, Default)]
pub struct LoadReport {
    /// Restored sessions in stored order.
    pub sessions: Vec<Session>,
    pub rejected: Vec<CorruptRecordError>,
    /// 0 for the unversioned legacy layout.
    pub format_version: u64,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PersistenceCodec;

impl PersistenceCodec {
    pub fn new() -> Self {
        Self
    }

    pub fn encode(&self, store: &SessionStore) -> Result<String, PersistenceError> {
        let document = StoredDocument {
            version: FORMAT_VERSION,
            sessions: store.all().map(SessionRecord::from).collect(),
        };
        Ok(serde_json::to_string(&document)?)
    }

    pub fn decode(&self, text: &str) -> Result<LoadReport, PersistenceError> {
        let document: Value = serde_json::from_str(text)
            .map_err(|err| PersistenceError::CorruptDocument(err.to_string()))?;

        let (records, format_version) = match document {
            Value::Array(records) => (records, 0),
            Value::Object(mut fields) => {
                let version = fields
                    .get("version")
                    .and_then(Value::as_u64)
                    .ok_or_else(|| PersistenceError::CorruptDocument("missing version".into()))?;
                if version != FORMAT_VERSION {
                    return Err(PersistenceError::UnsupportedVersion(version));
                }
                match fields.remove("sessions") {
                    Some(Value::Array(records)) => (records, version),
                    _ => return Err(PersistenceError::CorruptDocument("missing sessions array".into())),
                }
            }
            _ => return Err(PersistenceError::CorruptDocument("expected an array or an object".into())),
        };

        let mut report = LoadReport {
            format_version,
            ..LoadReport::default()
        };
        let mut seen_ids = HashSet::new();

        for (index, record) in records.into_iter().enumerate() {
            let id = record.get("id").and_then(Value::as_i64);

            let restored = if format_version == 0 {
                restore_legacy(record)
            } else {
                restore_record(record)
            };

            let restored = restored.and_then(|session| {
                if seen_ids.insert(session.id()) {
                    Ok(session)
                } else {
                    Err(format!("duplicate id {}", session.id()))
                }
            });

            match restored {
                Ok(session) => report.sessions.push(session),
                Err(reason) => {
                    let error = CorruptRecordError { index, id, reason };
                    tracing::warn!("Skipping stored session: {error}");
                    report.rejected.push(error);
                }
            }
        }

        Ok(report)
    }

    /// Writes the whole store. The store itself is never touched.
    pub fn save<S: SessionStorage + ?Sized>(&self, store: &SessionStore, storage: &mut S) -> Result<(), PersistenceError> {
        let text = self.encode(store)?;
        storage.write_raw(&text)?;
        tracing::debug!("Saved {} sessions", store.len());
        Ok(())
    }

    /// Nothing stored yet gives an empty report.
    pub fn load<S: SessionStorage + ?Sized>(&self, storage: &S) -> Result<LoadReport, PersistenceError> {
        match storage.read_raw()? {
            Some(text) => self.decode(&text),
            None => Ok(LoadReport::default()),
        }
    }
}

#[derive(Serialize)]
struct StoredDocument {
    version: u64,
    sessions: Vec<SessionRecord>,
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "kind")]
enum SessionRecord {
    Run(RunRecord),
    Ride(RideRecord),
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BaseRecord {
    id: i64,
    created_at: DateTime<Utc>,
    lat: f64,
    lng: f64,
    distance_km: f64,
    duration_min: f64,
    label: String,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunRecord {
    #[serde(flatten)]
    base: BaseRecord,
    cadence_spm: f64,
    pace_min_per_km: f64,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RideRecord {
    #[serde(flatten)]
    base: BaseRecord,
    elevation_gain_m: f64,
    speed_kmh: f64,
}

impl From<&Session> for SessionRecord {
    fn from(session: &Session) -> Self {
        let base = BaseRecord {
            id: session.id(),
            created_at: session.created_at(),
            lat: session.lat(),
            lng: session.lng(),
            distance_km: session.distance_km(),
            duration_min: session.duration_min(),
            label: session.label().to_string(),
        };

        match session.variant() {
            Variant::Run(run) => SessionRecord::Run(RunRecord {
                base,
                cadence_spm: run.cadence_spm(),
                pace_min_per_km: run.pace_min_per_km(),
            }),
            Variant::Ride(ride) => SessionRecord::Ride(RideRecord {
                base,
                elevation_gain_m: ride.elevation_gain_m(),
                speed_kmh: ride.speed_kmh(),
            }),
        }
    }
}

impl BaseRecord {
    fn into_session(self, variant: Variant) -> Result<Session, ValidationError> {
        let position = geo_point(self.lat, self.lng);
        session::validate_point(position)?;
        session::require_positive("distanceKm", self.distance_km)?;
        session::require_positive("durationMin", self.duration_min)?;

        Ok(Session::restore(
            self.id,
            self.created_at,
            position,
            self.distance_km,
            self.duration_min,
            self.label,
            variant,
        ))
    }
}

impl SessionRecord {
    fn into_session(self) -> Result<Session, ValidationError> {
        match self {
            SessionRecord::Run(run) => {
                session::require_positive("cadenceSpm", run.cadence_spm)?;
                session::require_finite("paceMinPerKm", run.pace_min_per_km)?;
                let variant = Variant::Run(RunSession::restore(run.cadence_spm, run.pace_min_per_km));
                run.base.into_session(variant)
            }
            SessionRecord::Ride(ride) => {
                session::require_finite("elevationGainM", ride.elevation_gain_m)?;
                session::require_finite("speedKmh", ride.speed_kmh)?;
                let variant = Variant::Ride(RideSession::restore(ride.elevation_gain_m, ride.speed_kmh));
                ride.base.into_session(variant)
            }
        }
    }
}

fn restore_record(record: Value) -> Result<Session, String> {
    let record: SessionRecord = serde_json::from_value(record).map_err(|err| err.to_string())?;
    record.into_session().map_err(|err| err.to_string())
}

// Layout of the unversioned browser documents.

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum LegacyRecord {
    Running(LegacyRunning),
    Cycling(LegacyCycling),
}

#[derive(Deserialize)]
struct LegacyBase {
    id: i64,
    date: DateTime<Utc>,
    /// [lat, lng]
    coordinates: [f64; 2],
    distance: f64,
    duration: f64,
    description: String,
}

#[derive(Deserialize)]
struct LegacyRunning {
    #[serde(flatten)]
    base: LegacyBase,
    cadence: f64,
    pace: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyCycling {
    #[serde(flatten)]
    base: LegacyBase,
    elevation_gain: f64,
    speed: f64,
}

impl From<LegacyBase> for BaseRecord {
    fn from(legacy: LegacyBase) -> Self {
        let [lat, lng] = legacy.coordinates;
        BaseRecord {
            id: legacy.id,
            created_at: legacy.date,
            lat,
            lng,
            distance_km: legacy.distance,
            duration_min: legacy.duration,
            label: legacy.description,
        }
    }
}

fn restore_legacy(record: Value) -> Result<Session, String> {
    let record: LegacyRecord = serde_json::from_value(record).map_err(|err| err.to_string())?;

    let record = match record {
        LegacyRecord::Running(running) => SessionRecord::Run(RunRecord {
            base: running.base.into(),
            cadence_spm: running.cadence,
            pace_min_per_km: running.pace,
        }),
        LegacyRecord::Cycling(cycling) => SessionRecord::Ride(RideRecord {
            base: cycling.base.into(),
            elevation_gain_m: cycling.elevation_gain,
            speed_kmh: cycling.speed,
        }),
    };

    record.into_session().map_err(|err| err.to_string())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;
    use crate::{collaborators::MemoryStorage, error::StorageError, session::SessionKind};

    fn sample_store() -> SessionStore {
        let mut store = SessionStore::new();
        let at = Utc.with_ymd_and_hms(2024, 4, 14, 9, 30, 12).unwrap();
        store
            .add(Session::new_run(1_713_087_012_000, at, geo_point(52.52, 13.40), 5.0, 25.0, 180.0).unwrap())
            .unwrap();
        store
            .add(Session::new_ride(1_713_087_012_001, at, geo_point(48.85, 2.35), 20.0, 60.0, -50.0).unwrap())
            .unwrap();
        store
            .add(Session::new_run(1_713_087_012_002, at, geo_point(-33.9, 151.2), 7.3, 41.9, 171.5).unwrap())
            .unwrap();
        store
    }

    fn run_record(id: i64) -> Value {
        json!({
            "kind": "Run", "id": id, "createdAt": "2024-04-14T09:30:00Z",
            "lat": 52.52, "lng": 13.4, "distanceKm": 5.0, "durationMin": 25.0,
            "label": "Run on April 14", "cadenceSpm": 180.0, "paceMinPerKm": 5.0
        })
    }

    struct BrokenStorage;

    impl SessionStorage for BrokenStorage {
        fn read_raw(&self) -> Result<Option<String>, StorageError> {
            Err(StorageError("disk on fire".into()))
        }

        fn write_raw(&mut self, _text: &str) -> Result<(), StorageError> {
            Err(StorageError("disk full".into()))
        }

        fn clear(&mut self) -> Result<(), StorageError> {
            Ok(())
        }
    }

    #[test]
    fn save_then_load_reproduces_store() {
        let store = sample_store();
        let codec = PersistenceCodec::new();
        let mut storage = MemoryStorage::new();

        codec.save(&store, &mut storage).unwrap();
        let report = codec.load(&storage).unwrap();

        assert!(report.rejected.is_empty());
        assert_eq!(report.format_version, FORMAT_VERSION);
        assert_eq!(report.sessions, store.all().cloned().collect::<Vec<_>>());
    }

    #[test]
    fn saving_twice_is_stable() {
        let store = sample_store();
        let codec = PersistenceCodec::new();
        let mut storage = MemoryStorage::new();

        codec.save(&store, &mut storage).unwrap();
        let first_text = storage.contents().unwrap().to_string();
        let first = codec.load(&storage).unwrap().sessions;

        codec.save(&store, &mut storage).unwrap();
        let second = codec.load(&storage).unwrap().sessions;

        assert_eq!(storage.contents().unwrap(), first_text);
        assert_eq!(first, second);
    }

    #[test]
    fn records_are_flat_and_tagged() {
        let text = PersistenceCodec::new().encode(&sample_store()).unwrap();
        let document: Value = serde_json::from_str(&text).unwrap();

        assert_eq!(document["version"], json!(1));
        let run = &document["sessions"][0];
        assert_eq!(run["kind"], json!("Run"));
        assert_eq!(run["paceMinPerKm"], json!(5.0));
        assert_eq!(run["label"], json!("Run on April 14"));
        assert!(run.get("speedKmh").is_none());

        let ride = &document["sessions"][1];
        assert_eq!(ride["kind"], json!("Ride"));
        assert_eq!(ride["speedKmh"], json!(20.0));
        assert_eq!(ride["elevationGainM"], json!(-50.0));
    }

    #[test]
    fn missing_storage_loads_empty() {
        let report = PersistenceCodec::new().load(&MemoryStorage::new()).unwrap();

        assert!(report.sessions.is_empty());
        assert!(report.rejected.is_empty());
    }

    #[test]
    fn unknown_kind_is_rejected_alone() {
        let mut swim = run_record(2);
        swim["kind"] = json!("Swim");
        let text = json!({ "version": 1, "sessions": [run_record(1), swim, run_record(3)] }).to_string();

        let report = PersistenceCodec::new().decode(&text).unwrap();

        assert_eq!(report.sessions.iter().map(Session::id).collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].index, 1);
        assert_eq!(report.rejected[0].id, Some(2));
        assert!(report.rejected[0].reason.contains("Swim"));
    }

    #[test]
    fn missing_or_invalid_fields_are_rejected() {
        let mut no_cadence = run_record(2);
        no_cadence.as_object_mut().unwrap().remove("cadenceSpm");
        let mut zero_distance = run_record(3);
        zero_distance["distanceKm"] = json!(0.0);
        let mut no_kind = run_record(4);
        no_kind.as_object_mut().unwrap().remove("kind");
        let text = json!({
            "version": 1,
            "sessions": [no_cadence, zero_distance, no_kind, "not a record", run_record(1)]
        })
        .to_string();

        let report = PersistenceCodec::new().decode(&text).unwrap();

        assert_eq!(report.sessions.len(), 1);
        assert_eq!(report.sessions[0].id(), 1);
        let reasons: Vec<&str> = report.rejected.iter().map(|r| r.reason.as_str()).collect();
        assert!(reasons[0].contains("cadenceSpm"));
        assert!(reasons[1].contains("must be positive"));
        assert!(reasons[2].contains("kind"));
        assert_eq!(report.rejected[3].id, None);
    }

    #[test]
    fn later_duplicate_id_is_rejected() {
        let text = json!({ "version": 1, "sessions": [run_record(9), run_record(9)] }).to_string();

        let report = PersistenceCodec::new().decode(&text).unwrap();

        assert_eq!(report.sessions.len(), 1);
        assert_eq!(report.rejected[0].index, 1);
        assert!(report.rejected[0].reason.contains("duplicate"));
    }

    #[test]
    fn derived_values_are_restored_verbatim() {
        let mut record = run_record(5);
        record["paceMinPerKm"] = json!(4.75);
        record["label"] = json!("Morning run");
        let text = json!({ "version": 1, "sessions": [record] }).to_string();

        let report = PersistenceCodec::new().decode(&text).unwrap();
        let session = &report.sessions[0];

        assert_eq!(session.as_run().unwrap().pace_min_per_km(), 4.75);
        assert_eq!(session.label(), "Morning run");
    }

    #[test]
    fn reads_legacy_browser_document() {
        let text = json!([
            {
                "date": "2023-05-02T16:04:11.512Z", "id": 1683043451512_i64,
                "coordinates": [51.5, -0.12], "distance": 3, "duration": 18,
                "type": "running", "cadence": 170, "pace": 6, "description": "Running on May 2"
            },
            {
                "date": "2023-05-03T07:00:00.000Z", "id": 1683097200000_i64,
                "coordinates": [51.6, -0.1], "distance": 30, "duration": 90,
                "type": "cycling", "elevationGain": 220, "speed": 20, "description": "Cycling on May 3"
            },
            { "id": 5, "type": "rowing" }
        ])
        .to_string();

        let report = PersistenceCodec::new().decode(&text).unwrap();

        assert_eq!(report.format_version, 0);
        assert_eq!(report.sessions.len(), 2);
        assert_eq!(report.rejected.len(), 1);

        let run = &report.sessions[0];
        assert_eq!(run.kind(), SessionKind::Run);
        assert_eq!(run.lat(), 51.5);
        assert_eq!(run.lng(), -0.12);
        assert_eq!(run.label(), "Running on May 2");
        assert_eq!(run.as_run().unwrap().pace_min_per_km(), 6.0);

        let ride = &report.sessions[1];
        assert_eq!(ride.as_ride().unwrap().elevation_gain_m(), 220.0);
        assert_eq!(ride.as_ride().unwrap().speed_kmh(), 20.0);
    }

    #[test]
    fn whole_document_errors() {
        let codec = PersistenceCodec::new();

        assert!(matches!(codec.decode("not json"), Err(PersistenceError::CorruptDocument(_))));
        assert!(matches!(codec.decode("42"), Err(PersistenceError::CorruptDocument(_))));
        assert!(matches!(codec.decode(r#"{"version":1}"#), Err(PersistenceError::CorruptDocument(_))));
        assert!(matches!(
            codec.decode(r#"{"version":2,"sessions":[]}"#),
            Err(PersistenceError::UnsupportedVersion(2))
        ));
    }

    #[test]
    fn storage_failures_are_surfaced() {
        let codec = PersistenceCodec::new();
        let store = sample_store();

        assert!(matches!(codec.save(&store, &mut BrokenStorage), Err(PersistenceError::Storage(_))));
        assert!(matches!(codec.load(&BrokenStorage), Err(PersistenceError::Storage(_))));
        assert_eq!(store.len(), 3);
    }
}
