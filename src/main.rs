//! Binary entry point for gatewatch.
//!
//! Drives the recognition batch, the vehicle registry and the ledger
//! reports from the command line.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr/print_stdout in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use gatewatch::alert::LogAlertSink;
use gatewatch::config::GatewatchConfig;
use gatewatch::ingest::StillImageDecoder;
use gatewatch::models::{AccessStatus, VehicleCategory, VehicleRegistryRecord};
use gatewatch::pipeline::normalize;
use gatewatch::report;
use gatewatch::runner::BatchRunner;
use gatewatch::{AccessStore, PipelineProfile};

/// Gatewatch - campus access control through plate recognition.
#[derive(Parser)]
#[command(name = "gatewatch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the database path.
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Run a recognition batch over a directory of images or videos.
    Process {
        /// Pipeline profile: image-batch, video-single, or video-multi.
        #[arg(short, long, default_value = "image-batch")]
        profile: String,

        /// Input directory; defaults to the configured directory for the
        /// profile's media kind.
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Worker threads; defaults to the configured count.
        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// Manage the vehicle registry.
    Registry {
        #[command(subcommand)]
        action: RegistryAction,
    },

    /// Show vehicles currently on campus.
    OnCampus {
        /// Emit JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Show the entry/exit history.
    History {
        /// Restrict to one plate.
        #[arg(short, long)]
        plate: Option<String>,

        /// Emit JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Show database status.
    Status,
}

/// Registry subcommands.
#[derive(Subcommand)]
enum RegistryAction {
    /// Insert or replace a registry record.
    Set {
        /// The plate (normalized on input).
        plate: String,

        /// Category: OFFICIAL, PRIVATE, or VISITOR.
        #[arg(long, default_value = "PRIVATE")]
        category: String,

        /// Status: AUTHORIZED, UNAUTHORIZED, or INCIDENT.
        #[arg(long, default_value = "AUTHORIZED")]
        status: String,

        /// Owner name or sector label.
        #[arg(long)]
        owner: Option<String>,

        /// Free-text note.
        #[arg(long)]
        note: Option<String>,
    },

    /// Show one registry record.
    Show {
        /// The plate to look up.
        plate: String,
    },

    /// List the whole registry.
    List {
        /// Emit JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    match run_command(cli, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        },
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let default_filter = if verbose { "gatewatch=debug,info" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    // Logs go to stderr so stdout stays clean for tables and JSON.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn load_config(cli: &Cli) -> anyhow::Result<GatewatchConfig> {
    let mut config = match &cli.config {
        Some(path) => GatewatchConfig::load_from_file(path)?,
        None => GatewatchConfig::load_default(),
    };
    if let Some(db) = &cli.db {
        config = config.with_db_path(db.clone());
    }
    Ok(config)
}

fn run_command(cli: Cli, config: &GatewatchConfig) -> anyhow::Result<()> {
    match cli.command {
        Commands::Process {
            profile,
            input,
            workers,
        } => cmd_process(config, &profile, input, workers),
        Commands::Registry { action } => match action {
            RegistryAction::Set {
                plate,
                category,
                status,
                owner,
                note,
            } => cmd_registry_set(config, &plate, &category, &status, owner, note),
            RegistryAction::Show { plate } => cmd_registry_show(config, &plate),
            RegistryAction::List { json } => cmd_registry_list(config, json),
        },
        Commands::OnCampus { json } => cmd_on_campus(config, json),
        Commands::History { plate, json } => cmd_history(config, plate.as_deref(), json),
        Commands::Status => cmd_status(config),
    }
}

fn open_store(config: &GatewatchConfig) -> anyhow::Result<Arc<AccessStore>> {
    Ok(Arc::new(AccessStore::open(&config.db_path)?))
}

/// Process command: run a batch and print its result rows.
fn cmd_process(
    config: &GatewatchConfig,
    profile_name: &str,
    input: Option<PathBuf>,
    workers: Option<usize>,
) -> anyhow::Result<()> {
    let profile = PipelineProfile::by_name(profile_name)?;
    let input_dir = input.unwrap_or_else(|| {
        if profile_name.starts_with("video") {
            config.videos_dir.clone()
        } else {
            config.images_dir.clone()
        }
    });

    let perception = Arc::new(gatewatch::perception::build_default()?);
    let store = open_store(config)?;
    let runner = BatchRunner::new(
        perception,
        Arc::new(StillImageDecoder),
        store,
        Arc::new(LogAlertSink),
        profile,
        workers.unwrap_or(config.workers),
    );

    let rows = runner.run(&input_dir)?;

    println!(
        "{:<28} {:<9} {:<7} {:<6} {:<6} NOTES",
        "UNIT", "PLATE", "TIME", "EVENT", "ALERT"
    );
    for row in &rows {
        let plate = row.plate.as_deref().unwrap_or("-");
        let time = row.media_time.as_deref().unwrap_or("-");
        let event = row.passage.map_or("-", gatewatch::storage::PassageOutcome::as_str);
        let alert = if row.alerted { "yes" } else { "" };
        let notes = match &row.error {
            Some(cause) => cause.as_str(),
            None if row.plate.is_none() => "no plate confirmed",
            None => "",
        };
        println!("{:<28} {plate:<9} {time:<7} {event:<6} {alert:<6} {notes}", row.unit);
    }
    println!();
    println!("{} unit result(s)", rows.len());
    Ok(())
}

/// Validates and normalizes a plate given on the command line.
fn parse_plate_arg(raw: &str) -> anyhow::Result<String> {
    let sanitized = normalize::sanitize(raw);
    if normalize::is_canonical_plate(&sanitized) {
        return Ok(sanitized);
    }
    // Accept legacy plates too, as long as the length is plausible.
    if (6..=8).contains(&sanitized.len()) {
        return Ok(sanitized);
    }
    anyhow::bail!("'{raw}' does not look like a plate");
}

fn cmd_registry_set(
    config: &GatewatchConfig,
    plate: &str,
    category: &str,
    status: &str,
    owner: Option<String>,
    note: Option<String>,
) -> anyhow::Result<()> {
    let record = VehicleRegistryRecord {
        plate: parse_plate_arg(plate)?,
        category: VehicleCategory::parse(&category.to_uppercase())?,
        status: AccessStatus::parse(&status.to_uppercase())?,
        owner,
        note,
    };
    let store = open_store(config)?;
    store.upsert_vehicle(&record)?;
    println!("Registered {} as {} / {}", record.plate, record.category, record.status);
    Ok(())
}

fn cmd_registry_show(config: &GatewatchConfig, plate: &str) -> anyhow::Result<()> {
    let plate = parse_plate_arg(plate)?;
    let store = open_store(config)?;
    match store.get_vehicle(&plate)? {
        Some(record) => {
            println!("Plate:    {}", record.plate);
            println!("Category: {}", record.category);
            println!("Status:   {}", record.status);
            println!("Owner:    {}", record.owner.as_deref().unwrap_or("-"));
            println!("Note:     {}", record.note.as_deref().unwrap_or("-"));
        },
        None => println!("Plate {plate} is not registered"),
    }
    Ok(())
}

fn cmd_registry_list(config: &GatewatchConfig, json: bool) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let records = store.list_vehicles()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    println!("{:<9} {:<9} {:<13} {:<20} NOTE", "PLATE", "CATEGORY", "STATUS", "OWNER");
    for record in &records {
        println!(
            "{:<9} {:<9} {:<13} {:<20} {}",
            record.plate,
            record.category,
            record.status,
            record.owner.as_deref().unwrap_or("-"),
            record.note.as_deref().unwrap_or("-"),
        );
    }
    println!();
    println!("{} vehicle(s)", records.len());
    Ok(())
}

fn cmd_on_campus(config: &GatewatchConfig, json: bool) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let now = chrono::Local::now().naive_local();
    let rows = report::on_campus(&store, config.dwell_limit_minutes, now)?;

    if json {
        let sessions: Vec<_> = rows.iter().map(|r| &r.session).collect();
        println!("{}", serde_json::to_string_pretty(&sessions)?);
        return Ok(());
    }

    println!("{:<9} {:<22} {:<9} FLAG", "PLATE", "ENTERED", "MINUTES");
    for row in &rows {
        let flag = if row.over_limit { "OVER LIMIT" } else { "" };
        println!(
            "{:<9} {:<22} {:<9} {flag}",
            row.session.plate,
            row.session.entered_at.format("%Y-%m-%d %H:%M:%S"),
            row.minutes_on_site,
        );
    }
    println!();
    println!("{} vehicle(s) on campus", rows.len());
    Ok(())
}

fn cmd_history(config: &GatewatchConfig, plate: Option<&str>, json: bool) -> anyhow::Result<()> {
    let normalized = plate.map(parse_plate_arg).transpose()?;
    let store = open_store(config)?;
    let rows = report::history(&store, normalized.as_deref())?;

    if json {
        let sessions: Vec<_> = rows.iter().map(|r| &r.session).collect();
        println!("{}", serde_json::to_string_pretty(&sessions)?);
        return Ok(());
    }

    println!(
        "{:<9} {:<22} {:<22} MINUTES",
        "PLATE", "ENTERED", "EXITED"
    );
    for row in &rows {
        let exited = row.session.exited_at.map_or_else(
            || "(on campus)".to_string(),
            |t| t.format("%Y-%m-%d %H:%M:%S").to_string(),
        );
        let minutes = row.minutes.map_or_else(|| "-".to_string(), |m| m.to_string());
        println!(
            "{:<9} {:<22} {exited:<22} {minutes}",
            row.session.plate,
            row.session.entered_at.format("%Y-%m-%d %H:%M:%S"),
        );
    }
    println!();
    println!("{} session(s)", rows.len());
    Ok(())
}

/// Status command.
fn cmd_status(config: &GatewatchConfig) -> anyhow::Result<()> {
    println!("Gatewatch Status");
    println!("================");
    println!();
    println!("Version: {}", env!("CARGO_PKG_VERSION"));
    println!();

    let db_status = if config.db_path.exists() {
        "Available"
    } else {
        "Will be created on first use"
    };
    println!("Database: {db_status}");
    println!("  Path: {}", config.db_path.display());

    if config.db_path.exists() {
        let store = open_store(config)?;
        let counts = store.counts()?;
        println!("  Vehicles:      {}", counts.vehicles);
        println!("  Sessions:      {}", counts.sessions);
        println!("  Open sessions: {}", counts.open_sessions);
    }

    for (label, dir) in [
        ("Image inputs", &config.images_dir),
        ("Video inputs", &config.videos_dir),
    ] {
        let status = if dir.is_dir() { "Available" } else { "Not found" };
        println!("{label}: {status}");
        println!("  Path: {}", dir.display());
    }

    println!();
    println!("Dwell limit: {} minutes", config.dwell_limit_minutes);
    Ok(())
}
