use std::{fmt, str::FromStr};

use chrono::{DateTime, Datelike, Utc};
use geo_types::Point;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

const MONTHS: [&str; 12] = [
    "January", "February", "March", "April", "May", "June",
    "July", "August", "September", "October", "November", "December",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionKind {
    Run,
    Ride,
}

impl SessionKind {
    pub fn name(self) -> &'static str {
        match self {
            SessionKind::Run => "Run",
            SessionKind::Ride => "Ride",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            SessionKind::Run => "🏃",
            SessionKind::Ride => "🚴",
        }
    }
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parses the kind selector of the entry form. Accepts the old `running` / `cycling` values too.
impl FromStr for SessionKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "run" | "running" => Ok(SessionKind::Run),
            "ride" | "cycling" => Ok(SessionKind::Ride),
            _ => Err(ValidationError::UnknownKind(s.to_string())),
        }
    }
}

/// Run specific fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSession {
    cadence_spm: f64,
    pace_min_per_km: f64,
}

impl RunSession {
    pub(crate) fn restore(cadence_spm: f64, pace_min_per_km: f64) -> Self {
        Self { cadence_spm, pace_min_per_km }
    }

    pub fn cadence_spm(&self) -> f64 {
        self.cadence_spm
    }

    /// Minutes per kilometre.
    pub fn pace_min_per_km(&self) -> f64 {
        self.pace_min_per_km
    }
}

/// Ride specific fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RideSession {
    elevation_gain_m: f64,
    speed_kmh: f64,
}

impl RideSession {
    pub(crate) fn restore(elevation_gain_m: f64, speed_kmh: f64) -> Self {
        Self { elevation_gain_m, speed_kmh }
    }

    /// Zero or negative for descents.
    pub fn elevation_gain_m(&self) -> f64 {
        self.elevation_gain_m
    }

    pub fn speed_kmh(&self) -> f64 {
        self.speed_kmh
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Variant {
    Run(RunSession),
    Ride(RideSession),
}

/// One logged exercise session.
///
/// Sessions are immutable once built. The derived metrics and the label are
/// computed in the constructor and stored, so a restored session keeps the exact
/// values it was saved with.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    id: i64,
    created_at: DateTime<Utc>,
    position: Point,
    distance_km: f64,
    duration_min: f64,
    label: String,
    variant: Variant,
}

impl Session {
    pub fn new_run(
        id: i64,
        created_at: DateTime<Utc>,
        position: Point,
        distance_km: f64,
        duration_min: f64,
        cadence_spm: f64,
    ) -> Result<Self, ValidationError> {
        validate_base(position, distance_km, duration_min)?;
        require_positive("cadence", cadence_spm)?;

        let pace_min_per_km = duration_min / distance_km;
        require_in_range("pace", pace_min_per_km)?;

        let run = RunSession {
            cadence_spm,
            pace_min_per_km,
        };

        Ok(Self::build(id, created_at, position, distance_km, duration_min, Variant::Run(run)))
    }

    pub fn new_ride(
        id: i64,
        created_at: DateTime<Utc>,
        position: Point,
        distance_km: f64,
        duration_min: f64,
        elevation_gain_m: f64,
    ) -> Result<Self, ValidationError> {
        validate_base(position, distance_km, duration_min)?;
        require_finite("elevation", elevation_gain_m)?;

        let speed_kmh = distance_km * 60.0 / duration_min;
        require_in_range("speed", speed_kmh)?;

        let ride = RideSession {
            elevation_gain_m,
            speed_kmh,
        };

        Ok(Self::build(id, created_at, position, distance_km, duration_min, Variant::Ride(ride)))
    }

    fn build(id: i64, created_at: DateTime<Utc>, position: Point, distance_km: f64, duration_min: f64, variant: Variant) -> Self {
        let kind = match variant {
            Variant::Run(_) => SessionKind::Run,
            Variant::Ride(_) => SessionKind::Ride,
        };

        Self {
            id,
            created_at,
            position,
            distance_km,
            duration_min,
            label: label_for(kind, created_at),
            variant,
        }
    }

    /// Rebuilds a session from persisted values without recomputing anything.
    /// The caller has already checked the stored values.
    pub(crate) fn restore(
        id: i64,
        created_at: DateTime<Utc>,
        position: Point,
        distance_km: f64,
        duration_min: f64,
        label: String,
        variant: Variant,
    ) -> Self {
        Self {
            id,
            created_at,
            position,
            distance_km,
            duration_min,
            label,
            variant,
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn lat(&self) -> f64 {
        self.position.y()
    }

    pub fn lng(&self) -> f64 {
        self.position.x()
    }

    pub fn distance_km(&self) -> f64 {
        self.distance_km
    }

    pub fn duration_min(&self) -> f64 {
        self.duration_min
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn kind(&self) -> SessionKind {
        match self.variant {
            Variant::Run(_) => SessionKind::Run,
            Variant::Ride(_) => SessionKind::Ride,
        }
    }

    pub fn variant(&self) -> &Variant {
        &self.variant
    }

    pub fn as_run(&self) -> Option<&RunSession> {
        match &self.variant {
            Variant::Run(run) => Some(run),
            Variant::Ride(_) => None,
        }
    }

    pub fn as_ride(&self) -> Option<&RideSession> {
        match &self.variant {
            Variant::Ride(ride) => Some(ride),
            Variant::Run(_) => None,
        }
    }
}

/// Point from map coordinates. x is longitude, y is latitude.
pub fn geo_point(lat: f64, lng: f64) -> Point {
    Point::new(lng, lat)
}

/// "Run on April 14". Always English month names, day taken in UTC.
pub fn label_for(kind: SessionKind, created_at: DateTime<Utc>) -> String {
    format!("{} on {} {}", kind, MONTHS[created_at.month0() as usize], created_at.day())
}

pub fn validate_point(position: Point) -> Result<(), ValidationError> {
    let (lat, lng) = (position.y(), position.x());
    require_finite("latitude", lat)?;
    require_finite("longitude", lng)?;

    if !(-90.0..=90.0).contains(&lat) {
        return Err(ValidationError::OutOfRange { field: "latitude" });
    }
    if !(-180.0..=180.0).contains(&lng) {
        return Err(ValidationError::OutOfRange { field: "longitude" });
    }
    Ok(())
}

fn validate_base(position: Point, distance_km: f64, duration_min: f64) -> Result<(), ValidationError> {
    validate_point(position)?;
    require_positive("distance", distance_km)?;
    require_positive("duration", duration_min)
}

pub(crate) fn require_finite(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::NotANumber { field })
    }
}

/// Derived values overflow on extreme inputs and could not be stored.
fn require_in_range(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange { field })
    }
}

pub(crate) fn require_positive(field: &'static str, value: f64) -> Result<(), ValidationError> {
    require_finite(field, value)?;
    if value > 0.0 {
        Ok(())
    } else {
        Err(ValidationError::NotPositive { field })
    }
}
