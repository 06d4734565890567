use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use mission_co2::telemetry::{self, Telemetry};
use mission_co2::{
    AppConfig, EmissionsError, FlushPolicy, GeocodeResolver, JsonMissionSource, JsonReportWriter,
    LocationStore, MissionProcessor, MissionSource, OpenCageClient, ReportWriter,
};

/// Estimate the CO2 footprint of business trips
#[derive(Debug, Parser)]
#[command(name = "mission_co2", version, about)]
struct Args {
    /// JSON array of trip records
    #[arg(short, long, value_name = "PATH")]
    input: PathBuf,

    /// Where to write the processed trips
    #[arg(short, long, value_name = "PATH")]
    output: PathBuf,

    /// Configuration file (defaults to the user config directory)
    #[arg(short, long, value_name = "PATH", env = "MISSION_CO2_CONFIG")]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = run(args).await {
        match e.downcast_ref::<EmissionsError>() {
            Some(error) => eprintln!("Error: {}", error.user_message()),
            None => eprintln!("Error: {e:#}"),
        }
        process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let config = AppConfig::load_from_path(args.config.clone())?;
    telemetry::init_logging(&config.logging, args.verbose)?;
    let telemetry = Telemetry::init(&config.telemetry)?;

    let result = process(&args, &config).await;
    telemetry.shutdown();
    result
}

async fn process(args: &Args, config: &AppConfig) -> Result<()> {
    let store = LocationStore::load(
        &config.cache.path,
        FlushPolicy::new(config.cache.flush_every),
    )?;
    let provider = OpenCageClient::new(&config.geocoding)?;
    let resolver = GeocodeResolver::new(
        Arc::new(store),
        Box::new(provider),
        config.geocoding.language.clone(),
        Duration::from_secs(config.geocoding.timeout_seconds.into()),
    );
    let processor = MissionProcessor::from_config(resolver, config);

    let records = JsonMissionSource::new(&args.input)
        .read_trips()
        .await
        .with_context(|| format!("Failed to read trips from {}", args.input.display()))?;

    let report = processor.process(&records).await?;

    JsonReportWriter::new(&args.output)
        .write_report(&report.trips)
        .await
        .with_context(|| format!("Failed to write report to {}", args.output.display()))?;

    println!(
        "{} trips, {:.1} kg CO2e, {} unlocated, {} round trips corrected",
        report.trips.len(),
        report.total_emissions_kg(),
        report.unlocated(),
        report.corrected_round_trips
    );

    let summary = report.summary_by_category();
    println!(
        "{:<14} {:>6} {:>12} {:>12} {:>12}",
        "transport", "trips", "km", "kg CO2e", "± kg CO2e"
    );
    let rows = summary
        .groups
        .iter()
        .map(|(group, totals)| (group.label(), totals))
        .chain(std::iter::once(("total", &summary.total)));
    for (label, totals) in rows {
        println!(
            "{:<14} {:>6} {:>12.0} {:>12.1} {:>12.1}",
            label, totals.trips, totals.distance_km, totals.emissions_kg, totals.uncertainty_kg
        );
    }

    if !report.unknown_tags.is_empty() {
        println!("Unknown transport tags: {}", report.unknown_tags.join(", "));
    }
    println!(
        "Geocoding: {} API calls, {} cache hits",
        report.usage.api_calls, report.usage.cache_hits
    );

    Ok(())
}
