//! Listener implementations that report bus updates.
//!
//! [`LogListener`] emits a one-line summary per update; [`CsvListener`]
//! appends one row per bus to a CSV file.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{DateTime, Utc};
use csv::WriterBuilder;
use serde::Serialize;
use tracing::{debug, error, info};

use crate::model::{BusPosition, Route};
use crate::registry::BusUpdateListener;
use crate::stats::FleetStats;

/// Logs fleet statistics using Rust's debug pretty-print format.
pub fn print_pretty(stats: &FleetStats) {
    debug!("{:#?}", stats);
}

/// Logs fleet statistics as pretty-printed JSON.
pub fn print_json(stats: &FleetStats) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(stats)?);
    Ok(())
}

/// Flat CSV row for one bus.
#[derive(Debug, Serialize)]
struct PositionRecord<'a> {
    polled_at: DateTime<Utc>,
    route: &'a str,
    bus_id: &'a str,
    latitude: f64,
    longitude: f64,
    direction: Option<&'a str>,
    passengers: u32,
    last_stop_code: Option<&'a str>,
    last_stop_name: Option<&'a str>,
    updated_at: DateTime<Utc>,
}

impl<'a> PositionRecord<'a> {
    fn new(polled_at: DateTime<Utc>, bus: &'a BusPosition) -> Self {
        let last_stop = bus.last_stop.as_ref();
        Self {
            polled_at,
            route: &bus.route.short_name,
            bus_id: &bus.id,
            latitude: bus.latitude,
            longitude: bus.longitude,
            direction: bus.direction.as_deref(),
            passengers: bus.passengers,
            last_stop_code: last_stop.map(|s| s.code.as_str()),
            last_stop_name: last_stop.and_then(|s| s.name.as_deref()),
            updated_at: bus.updated_at,
        }
    }
}

/// Appends one CSV row per bus to `path`.
///
/// Creates the file with headers if it does not already exist.
pub fn append_positions(path: &Path, positions: &[BusPosition]) -> Result<()> {
    let file_exists = path.exists();
    debug!(path = %path.display(), file_exists, rows = positions.len(), "Appending CSV records");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // IMPORTANT when appending
        .from_writer(file);

    let polled_at = Utc::now();
    for bus in positions {
        writer.serialize(PositionRecord::new(polled_at, bus))?;
    }
    writer.flush()?;

    Ok(())
}

/// Logs a [`FleetStats`] summary for every update.
pub struct LogListener {
    route: Route,
}

impl LogListener {
    pub fn new(route: Route) -> Self {
        Self { route }
    }
}

impl BusUpdateListener for LogListener {
    fn on_update_buses(&self, buses: &[BusPosition]) {
        let stats = FleetStats::from_positions(&self.route, buses);
        info!(
            route = %self.route,
            buses = stats.buses,
            total_passengers = stats.total_passengers,
            max_passengers = stats.max_passengers,
            staleness_secs = stats.max_staleness().map(|d| d.num_seconds()),
            "Bus update"
        );
        for bus in buses {
            debug!(
                bus_id = %bus.id,
                lat = bus.latitude,
                lon = bus.longitude,
                passengers = bus.passengers,
                "Bus position"
            );
        }
    }

    fn name(&self) -> &str {
        "log"
    }
}

/// Records every update to a CSV file. Write failures are logged, not raised.
pub struct CsvListener {
    path: PathBuf,
}

impl CsvListener {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl BusUpdateListener for CsvListener {
    fn on_update_buses(&self, buses: &[BusPosition]) {
        if let Err(e) = append_positions(&self.path, buses) {
            error!(path = %self.path.display(), error = %e, "Failed to write bus positions");
        }
    }

    fn name(&self) -> &str {
        "csv"
    }
}
