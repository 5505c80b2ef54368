use crate::session::{Session, SessionKind, Variant};

#[derive(Debug, Clone, PartialEq)]
pub struct DetailRow {
    pub icon: &'static str,
    pub value: String,
    pub unit: &'static str,
}

/// What the session list shows for one session.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedSession {
    pub id: i64,
    pub kind: SessionKind,
    pub icon: &'static str,
    pub title: String,
    pub details: Vec<DetailRow>,
}

impl RenderedSession {
    pub fn from_session(session: &Session) -> Self {
        let kind = session.kind();

        let mut details = vec![
            row(kind.icon(), session.distance_km().to_string(), "km"),
            row("⏱", session.duration_min().to_string(), "min"),
        ];

        match session.variant() {
            Variant::Run(run) => {
                details.push(row("⚡", format!("{:.2}", run.pace_min_per_km()), "min/km"));
                details.push(row("🦶", run.cadence_spm().to_string(), "spm"));
            }
            Variant::Ride(ride) => {
                details.push(row("⚡", format!("{:.2}", ride.speed_kmh()), "km/h"));
                details.push(row("⛰", ride.elevation_gain_m().to_string(), "m"));
            }
        }

        Self {
            id: session.id(),
            kind,
            icon: kind.icon(),
            title: session.label().to_string(),
            details,
        }
    }
}

fn row(icon: &'static str, value: String, unit: &'static str) -> DetailRow {
    DetailRow { icon, value, unit }
}

/// Popup text of the map marker, e.g. "🏃 Run on April 14".
pub fn marker_text(session: &Session) -> String {
    format!("{} {}", session.kind().icon(), session.label())
}
