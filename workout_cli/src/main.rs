use std::{path::PathBuf, process::ExitCode};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use geo_types::Point;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use workout_log_data_management::{default_data_dir, DataStorage, StorageBackend, StorageConfig};
use workout_log_lib::{
    collaborators::{FormView, MapView, MarkerHandle, SessionList},
    controller::{RawFields, SessionController},
    persistence::PersistenceCodec,
    render::RenderedSession,
    session::geo_point,
};

#[derive(Parser)]
#[command(name = "WorkoutCLI")]
#[command(about = "Log runs and rides at a point on the map", long_about = None)]
struct Cli {
    /// Directory holding the stored sessions [default: data/ under the project root]
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[arg(long, global = true, value_enum, default_value_t = Backend::File)]
    backend: Backend,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Backend {
    File,
    Sqlite,
}

#[derive(Subcommand)]
enum Commands {
    /// Log a session at the given point
    Log {
        /// run or ride
        #[arg(long)]
        kind: String,
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        lng: f64,
        /// Kilometres
        #[arg(long, allow_hyphen_values = true)]
        distance: String,
        /// Minutes
        #[arg(long, allow_hyphen_values = true)]
        duration: String,
        /// Cadence (steps/min) for a run, elevation gain (m) for a ride
        #[arg(long, visible_aliases = ["cadence", "elevation"], allow_hyphen_values = true)]
        extra: String,
    },
    /// List all sessions in the order they were logged
    List,
    /// Show one session and center the map on it
    Show { id: i64 },
    /// Remove every session
    Reset,
    /// Print the stored sessions document
    Export,
    /// Replace all sessions with the contents of a document
    Import { file: PathBuf },
}

/// Map, form and session list rendered as terminal output.
#[derive(Default)]
struct TerminalUi {
    print_items: bool,
    markers: u64,
}

impl MapView for TerminalUi {
    fn add_marker(&mut self, position: Point, label: &str) -> MarkerHandle {
        self.markers += 1;
        tracing::debug!("Marker {} at ({}, {}): {label}", self.markers, position.y(), position.x());
        MarkerHandle(self.markers)
    }

    fn recenter(&mut self, position: Point, zoom: u8) {
        println!("Map centered on ({:.5}, {:.5}) at zoom {zoom}", position.y(), position.x());
    }
}

impl FormView for TerminalUi {
    fn show(&mut self) {}

    fn hide(&mut self) {}

    fn reset(&mut self) {}

    fn report_error(&mut self, message: &str) {
        eprintln!("{message}");
    }
}

impl SessionList for TerminalUi {
    fn append_item(&mut self, item: &RenderedSession) {
        if self.print_items {
            println!("{}", format_item(item));
        }
    }
}

fn format_item(item: &RenderedSession) -> String {
    let details = item
        .details
        .iter()
        .map(|detail| format!("{} {}", detail.value, detail.unit))
        .collect::<Vec<_>>()
        .join("\t");
    format!("{}\t{} {}\t{}", item.id, item.icon, item.title, details)
}

fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=info,workout_log_lib=info,workout_log_data_management=info", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = StorageConfig {
        data_dir: cli.data_dir.unwrap_or_else(default_data_dir),
        backend: match cli.backend {
            Backend::File => StorageBackend::File,
            Backend::Sqlite => StorageBackend::Sqlite,
        },
    };
    let storage = DataStorage::open(&config).context("Failed to open session storage")?;
    let mut controller = SessionController::new(storage, TerminalUi::default());

    match cli.command {
        Commands::Log { kind, lat, lng, distance, duration, extra } => {
            controller.startup()?;
            controller.ui_mut().print_items = true;
            controller.on_map_click(geo_point(lat, lng));
            let raw = RawFields {
                kind,
                distance,
                duration,
                cadence_or_elevation: extra,
            };
            // Failures were already shown through the form.
            if controller.on_form_submit(&raw).is_err() {
                return Ok(ExitCode::FAILURE);
            }
        },
        Commands::List => {
            controller.ui_mut().print_items = true;
            controller.startup()?;
        },
        Commands::Show { id } => {
            controller.startup()?;
            let item = RenderedSession::from_session(controller.resolve_by_element_id(id)?);
            println!("{}", format_item(&item));
            controller.on_item_activate(id)?;
        },
        Commands::Reset => {
            controller.reset()?;
        },
        Commands::Export => {
            controller.startup()?;
            println!("{}", PersistenceCodec::new().encode(controller.store())?);
        },
        Commands::Import { file } => {
            let text = std::fs::read_to_string(&file).with_context(|| format!("Failed to read {:?}", file))?;
            let rejected = controller.import_document(&text)?;
            for record in &rejected {
                eprintln!("Skipped {record}");
            }
            println!("Imported {} sessions", controller.store().len());
        },
    }

    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use workout_log_lib::controller::{Clock, SystemClock};

    use super::*;

    #[test]
    fn cli_parses_negative_values() {
        let cli = Cli::try_parse_from([
            "workout_cli", "log", "--kind", "ride", "--lat", "-33.9", "--lng", "151.2",
            "--distance", "20", "--duration", "60", "--elevation", "-50",
        ])
        .unwrap();

        let Commands::Log { lat, extra, .. } = cli.command else {
            panic!("expected log command");
        };
        assert_eq!(lat, -33.9);
        assert_eq!(extra, "-50");
    }

    #[test]
    fn items_are_tab_separated() {
        let at = SystemClock.now();
        let session = workout_log_lib::session::Session::new_run(1, at, geo_point(1.0, 1.0), 5.0, 25.0, 180.0).unwrap();

        let line = format_item(&RenderedSession::from_session(&session));

        assert!(line.starts_with("1\t🏃 Run on"));
        assert!(line.ends_with("5 km\t25 min\t5.00 min/km\t180 spm"));
    }
}
