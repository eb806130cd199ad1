//! CLI entry point for the live bus poller.
//!
//! `fetch` runs a single poll for a route; `watch` keeps polling on a fixed
//! interval and fans every update out to the log and, optionally, a CSV file.

use anyhow::Result;
use bus_poller::{
    config::PollerConfig,
    fetch::BasicClient,
    model::Route,
    output::{CsvListener, LogListener, print_json, print_pretty},
    poll::{BusPollTask, PollOutcome},
    registry::{ListenerRegistry, SharedListener},
    scheduler::PollScheduler,
    source::{LiveBusSource, TransitDataSource},
    stats::FleetStats,
};
use clap::{Parser, Subcommand};
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "bus_poller")]
#[command(about = "Poll live bus positions for a transit route", long_about = None)]
struct Cli {
    /// Base URL of the live-bus API (overrides BUS_API_BASE_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the current bus positions for a route once
    Fetch {
        /// Route short name (e.g. "MSS")
        #[arg(value_name = "ROUTE")]
        route: String,

        /// Optional display name for the route
        #[arg(long)]
        route_name: Option<String>,

        /// Print the summary as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Poll a route on a fixed interval and report every update
    Watch {
        /// Route short name (e.g. "MSS")
        #[arg(value_name = "ROUTE")]
        route: String,

        /// Seconds between polls (overrides BUS_POLL_INTERVAL_SECS)
        #[arg(short = 'r', long)]
        interval_secs: Option<u64>,

        /// Number of polls to run (0 = infinite)
        #[arg(short = 'n', long, default_value_t = 0)]
        count: usize,

        /// CSV file to append bus positions to
        #[arg(short, long)]
        output: Option<String>,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/bus_poller.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("bus_poller.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    let mut config = PollerConfig::from_env()?;
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }

    let source = LiveBusSource::new(
        BasicClient::with_timeout(config.http_timeout),
        config.base_url.clone(),
    );

    match cli.command {
        Commands::Fetch {
            route,
            route_name,
            json,
        } => {
            let route = match route_name {
                Some(name) => Route::with_name(route, name),
                None => Route::new(route),
            };
            fetch_once(&source, &route, json)?;
        }
        Commands::Watch {
            route,
            interval_secs,
            count,
            output,
        } => {
            let interval = interval_secs
                .map(Duration::from_secs)
                .unwrap_or(config.interval);
            watch(source, Route::new(route), interval, count, output)?;
        }
    }

    Ok(())
}

/// Performs a single fetch and reports the result.
#[tracing::instrument(skip_all, fields(route = %route))]
fn fetch_once<S: TransitDataSource>(source: &S, route: &Route, json: bool) -> Result<()> {
    let positions = source.fetch_bus_positions(route)?;
    let stats = FleetStats::from_positions(route, &positions);

    if json {
        print_json(&stats)?;
    } else {
        print_pretty(&stats);
        info!(
            buses = stats.buses,
            total_passengers = stats.total_passengers,
            mean_passengers = stats.mean_passengers(),
            "Fetched bus positions"
        );
    }

    for bus in &positions {
        info!(
            bus_id = %bus.id,
            lat = bus.latitude,
            lon = bus.longitude,
            passengers = bus.passengers,
            last_stop = bus.last_stop.as_ref().map(|s| s.code.as_str()),
            "Bus"
        );
    }
    Ok(())
}

/// Polls `route` every `interval`, logging each update and optionally
/// appending positions to a CSV file.
#[tracing::instrument(skip_all, fields(route = %route, interval_secs = interval.as_secs(), count = count))]
fn watch<S: TransitDataSource + 'static>(
    source: S,
    route: Route,
    interval: Duration,
    count: usize,
    output: Option<String>,
) -> Result<()> {
    let registry = Arc::new(ListenerRegistry::new());
    let task = Arc::new(BusPollTask::new(route.clone(), source, Arc::clone(&registry)));

    let mut listeners: Vec<SharedListener> = vec![Arc::new(LogListener::new(route))];
    if let Some(path) = output {
        info!(path = %path, "Appending bus positions to CSV");
        listeners.push(Arc::new(CsvListener::new(path)));
    }
    for listener in &listeners {
        task.add_listener(Arc::clone(listener));
    }

    if count == 0 {
        info!("Polling indefinitely. Press Ctrl+C to stop.");
    } else {
        info!(count, "Starting poll rounds");
    }

    let job_task = Arc::clone(&task);
    let handle = PollScheduler::new(interval)
        .with_max_runs(count)
        .start(move || {
            if job_task.run() == PollOutcome::Failed {
                warn!("No update this cycle");
            }
        })?;

    handle.wait();

    for listener in &listeners {
        task.remove_listener(listener);
    }
    task.await_completion();

    info!(remaining_listeners = registry.len(), "Finished polling");
    Ok(())
}
