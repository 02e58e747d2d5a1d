use std::{
    fs::OpenOptions,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use walk_session::{
    collaborators::MapView,
    summary::{format_distance_km, format_duration},
};
use walk_tracker_data_management::{
    database::WalkFilter,
    gpx_util::read_gpx,
    recorder::{record_walk, RecordOutcome, RecordRequest},
    Configuration, DataManager,
};
use walk_tracker_lib::{geo_point::GeoPoint, walk_record::StoredWalk};

#[derive(Parser)]
#[command(name = "WalkCLI")]
#[command(about = "Record and browse pet walks", long_about = None)]
struct Cli {
    /// Config file, defaults to data/walk_tracker.conf under the project root
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a gpx file as a live walk and save it
    Record {
        gpx_file: PathBuf,
        #[arg(long)]
        subject: String,
        #[arg(long)]
        pet: String,
        #[arg(long)]
        note: Option<String>,
        #[arg(long = "photo")]
        photos: Vec<String>,
    },
    /// List walks of a subject, newest first
    List {
        #[arg(long)]
        subject: String,
        #[arg(long)]
        pet: Option<String>,
        /// YYYY-MM
        #[arg(long, value_parser = parse_month)]
        month: Option<(i32, u32)>,
    },
    /// Print one walk
    Show { walk_id: i64 },
    /// Write one walk as gpx, to stdout unless --out is given
    ExportGpx {
        walk_id: i64,
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Configuration::load(cli.config.as_deref())?;

    init_tracing(config.log_file.as_deref())?;
    config.warn_ignored_keys();

    let data_manager = DataManager::start(&config).await?;

    match cli.command {
        Commands::Record { gpx_file, subject, pet, note, photos } => {
            let request = RecordRequest { subject_id: subject, pet_id: pet, note, photos };
            record(&config, &data_manager, &gpx_file, request).await?;
        }
        Commands::List { subject, pet, month } => {
            let walks = data_manager.list_walks(&WalkFilter { subject_id: subject, pet_id: pet, month }).await?;
            if walks.is_empty() {
                println!("No walks");
            }
            for walk in walks {
                let record = &walk.record;
                println!(
                    "{:>5}  {}  {:<12} {}  {}",
                    walk.walk_id,
                    record.started_at().format("%Y-%m-%d %H:%M"),
                    record.pet_id(),
                    format_duration(record.duration_sec()),
                    format_distance_km(record.distance_m()),
                );
            }
        }
        Commands::Show { walk_id } => {
            print_walk(&data_manager.get_walk(walk_id).await?);
        }
        Commands::ExportGpx { walk_id, out } => {
            let gpx = data_manager.export_gpx(walk_id).await?;
            match out {
                Some(path) => {
                    std::fs::write(&path, gpx).with_context(|| format!("Failed to write {:?}", path))?;
                    println!("Wrote walk {} to {:?}", walk_id, path);
                }
                None => print!("{}", gpx),
            }
        }
    }

    Ok(())
}

fn init_tracing(log_file: Option<&Path>) -> anyhow::Result<()> {
    let file_layer = match log_file {
        Some(log_file) => {
            if let Some(dir) = log_file.parent() {
                std::fs::create_dir_all(dir).with_context(|| format!("Failed to create log dir {:?}", dir))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(log_file)
                .with_context(|| format!("Failed to open log file {:?}", log_file))?;
            Some(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| format!("{}=info,walk_session=info,walk_tracker_data_management=info", env!("CARGO_CRATE_NAME")).into())
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    Ok(())
}

/// Logs what a map would draw.
struct TracingMapView;

impl MapView for TracingMapView {
    fn update_path(&self, path: &[GeoPoint]) {
        tracing::debug!("Path now has {} points", path.len());
    }

    fn update_marker(&self, point: GeoPoint) {
        tracing::trace!("Marker at ({}, {})", point.latitude(), point.longitude());
    }
}

async fn record(
    config: &Configuration,
    data_manager: &DataManager,
    gpx_file: &Path,
    request: RecordRequest,
) -> anyhow::Result<()> {
    let samples = read_gpx(gpx_file)?;
    tracing::info!("Replaying {} points from {:?}", samples.len(), gpx_file);

    let outcome = record_walk(
        config,
        &samples,
        request,
        data_manager.records_store(),
        Arc::new(TracingMapView),
        |snapshot| {
            println!(
                "{}  {}  {} points",
                snapshot.duration_label(),
                snapshot.distance_label(),
                snapshot.point_count
            );
        },
    )
    .await?;

    let summary = match &outcome {
        RecordOutcome::Saved { summary, .. } | RecordOutcome::Unsaved { summary, .. } => summary,
    };
    println!("Duration: {}", summary.duration_label());
    println!("Distance: {}", summary.distance_label());
    println!("Points:   {}", summary.point_count);

    match outcome {
        RecordOutcome::Saved { walk_id, .. } => {
            println!("Saved as walk {}", walk_id);
            Ok(())
        }
        RecordOutcome::Unsaved { record, error, .. } => {
            if let Some(record) = record {
                tracing::error!("Discarding unsaved walk started at {}", record.started_at());
            }
            Err(error).context("Failed to save walk")
        }
    }
}

fn print_walk(walk: &StoredWalk) {
    let record = &walk.record;
    println!("Walk {}", walk.walk_id);
    println!("Subject:  {}", record.subject_id());
    println!("Pet:      {}", record.pet_id());
    println!("Started:  {}", record.started_at());
    println!("Ended:    {}", record.ended_at());
    println!("Duration: {}", format_duration(record.duration_sec()));
    println!("Distance: {}", format_distance_km(record.distance_m()));
    println!("Points:   {}", record.path().len());
    for photo in record.photos() {
        println!("Photo:    {}", photo);
    }
    if let Some(note) = record.note() {
        println!("Note:     {}", note);
    }
}

fn parse_month(value: &str) -> Result<(i32, u32), String> {
    let (year, month) = value.split_once('-').ok_or_else(|| format!("Expected YYYY-MM, got {}", value))?;
    let year = year.parse::<i32>().map_err(|_| format!("Invalid year in {}", value))?;
    let month = month.parse::<u32>().map_err(|_| format!("Invalid month in {}", value))?;
    if !(1..=12).contains(&month) {
        return Err(format!("Month must be 1-12, got {}", month));
    }
    Ok((year, month))
}
