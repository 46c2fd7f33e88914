//! CLI entry point for the AQI engine.
//!
//! Provides subcommands for deriving the composite AQI over a CSV of raw
//! readings, building model features, summarizing a batch, fetching the
//! current reading from OpenWeather, and printing the breakpoint tables.

use aqi_engine::breakpoints::BreakpointTables;
use aqi_engine::category::AqiCategory;
use aqi_engine::engine::{AqiEngine, round2};
use aqi_engine::features::build_features;
use aqi_engine::fetch::{OpenWeatherSource, ReadingSource};
use aqi_engine::observation::{ObservationRow, ProcessedRow, RawReading};
use aqi_engine::output::{append_record, print_json, print_pretty, write_records};
use aqi_engine::parser::read_readings_file;
use aqi_engine::pipeline::process_batch;
use aqi_engine::summary::AqiSummary;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::ffi::OsStr;
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "aqi_engine")]
#[command(about = "Derive a composite Air Quality Index from pollutant readings", long_about = None)]
struct Cli {
    /// JSON file with custom breakpoint tables (defaults to the EPA tables)
    #[arg(long, global = true, value_name = "FILE")]
    breakpoints: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute calculated_aqi and aqi_change_rate for a CSV of readings
    Compute {
        /// CSV of raw readings
        #[arg(value_name = "FILE")]
        input: String,

        /// CSV file to write processed rows to
        #[arg(short, long, default_value = "processed.csv")]
        output: String,

        /// Gzip compress the output
        #[arg(long, default_value_t = false)]
        gzip: bool,
    },
    /// Compute the AQI and write scaled, capped model features
    Features {
        /// CSV of raw readings
        #[arg(value_name = "FILE")]
        input: String,

        /// CSV file to write feature rows to
        #[arg(short, long, default_value = "features.csv")]
        output: String,

        /// Gzip compress the output
        #[arg(long, default_value_t = false)]
        gzip: bool,
    },
    /// Log summary statistics of the composite AQI for a CSV of readings
    Summary {
        /// CSV of raw readings
        #[arg(value_name = "FILE")]
        input: String,
    },
    /// Fetch the current reading from OpenWeather and append it to a CSV
    Fetch {
        /// Latitude of the location
        #[arg(long, default_value_t = 33.6844, allow_negative_numbers = true)]
        lat: f64,

        /// Longitude of the location
        #[arg(long, default_value_t = 73.0479, allow_negative_numbers = true)]
        lon: f64,

        /// CSV file to append the raw reading to
        #[arg(short, long, default_value = "readings.csv")]
        output: String,
    },
    /// Print the breakpoint tables in use
    Table,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/aqi_engine.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("aqi_engine.log"));

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

    let tables = match &cli.breakpoints {
        Some(path) => BreakpointTables::from_json_file(path)?,
        None => BreakpointTables::epa(),
    };
    let engine = AqiEngine::new(tables);

    match cli.command {
        Commands::Compute {
            input,
            output,
            gzip,
        } => {
            let rows = load_and_process(&engine, &input)?;
            write_records(&output, &rows, gzip)?;
        }
        Commands::Features {
            input,
            output,
            gzip,
        } => {
            let rows = load_and_process(&engine, &input)?;
            let features = build_features(&rows);
            write_records(&output, &features, gzip)?;
        }
        Commands::Summary { input } => {
            let rows = load_and_process(&engine, &input)?;
            let summary = AqiSummary::from_rows(&rows);
            print_json(&summary)?;
        }
        Commands::Fetch { lat, lon, output } => {
            let api_key = std::env::var("OPENWEATHER_API_KEY")
                .context("OPENWEATHER_API_KEY must be set")?;
            let source = OpenWeatherSource::with_api_key(&api_key, lat, lon)?;

            let row = source.latest().await?;
            print_pretty(&row);
            report_reading(&engine, &row);

            append_record(&output, &RawReading::from(&row))?;
            info!(output = %output, "Reading appended");
        }
        Commands::Table => {
            print_json(engine.tables())?;
        }
    }

    Ok(())
}

/// Reads a readings CSV and runs the batch derivation over it.
#[tracing::instrument(skip(engine))]
fn load_and_process(engine: &AqiEngine, input: &str) -> Result<Vec<ProcessedRow>> {
    let readings = read_readings_file(input)?;
    if readings.is_empty() {
        warn!("No readings found");
    }
    Ok(process_batch(engine, readings))
}

/// Logs the composite AQI of a single fetched reading.
fn report_reading(engine: &AqiEngine, row: &ObservationRow) {
    match engine.dominant_sub_index(row) {
        Some(sub) => {
            let aqi = round2(sub.value);
            info!(
                timestamp = %row.timestamp,
                calculated_aqi = aqi,
                category = %AqiCategory::from_aqi(aqi),
                dominant_pollutant = %sub.pollutant,
                "Composite AQI"
            );
        }
        None => warn!(timestamp = %row.timestamp, "No pollutant yielded a sub-index"),
    }
}
