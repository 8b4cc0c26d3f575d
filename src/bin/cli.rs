//! CLI binary for medremind.

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use medremind::store::parse_times_list;
use medremind::{NewMedicine, ReminderConfig, ReminderService};
use std::path::PathBuf;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;
use uuid::Uuid;

/// Personal medication reminder scheduler.
#[derive(Parser)]
#[command(name = "medremind", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Command,
}

/// Available commands.
#[derive(Subcommand)]
enum Command {
    /// Register a medicine.
    Add {
        /// Display name.
        #[arg(long)]
        name: String,
        /// Dose or instructions.
        #[arg(long, default_value = "")]
        dose: String,
        /// Comma-separated daily times, e.g. "09:00,21:00".
        #[arg(long)]
        times: String,
        /// First day (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        start: Option<NaiveDate>,
        /// Last day (YYYY-MM-DD). Defaults to 30 days from today.
        #[arg(long)]
        end: Option<NaiveDate>,
    },

    /// Remove a medicine by id. Its history is kept.
    Delete {
        /// Medicine id.
        id: Uuid,
    },

    /// List medicines.
    List,

    /// Show recent reminder history, newest first.
    History {
        /// Number of entries to show.
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Fire a reminder now. Without an id the first medicine is used.
    Trigger {
        /// Medicine id.
        id: Option<Uuid>,
    },

    /// Run the scheduler until Ctrl+C.
    Run,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match cli.config {
        Some(ref path) => ReminderConfig::from_file(path)?,
        None => ReminderConfig::load_or_default(&ReminderConfig::default_config_path())?,
    };

    let _log_guard = init_tracing(matches!(cli.command, Command::Run))?;
    let service = ReminderService::new(&config);

    match cli.command {
        Command::Add {
            name,
            dose,
            times,
            start,
            end,
        } => {
            let today = Local::now().date_naive();
            let start_date = start.unwrap_or(today);
            let end_date = end.unwrap_or(today + chrono::Duration::days(30));
            let id = service.add_medicine(NewMedicine {
                name,
                dose,
                times: parse_times_list(&times),
                start_date,
                end_date,
            })
            .await?;
            println!("{id}");
        }
        Command::Delete { id } => {
            let removed = service.delete_medicine(id).await?;
            println!("deleted {} ({})", removed.name, removed.id);
        }
        Command::List => {
            let medicines = service.list_medicines().await?;
            if medicines.is_empty() {
                println!("No medicines.");
            }
            for m in medicines {
                println!(
                    "{}  {}  {}  [{}]  {}..{}",
                    m.id,
                    m.name,
                    m.dose,
                    m.times.join(", "),
                    m.start_date,
                    m.end_date
                );
            }
        }
        Command::History { limit } => {
            for entry in service.recent_history(limit).await? {
                let audio = match (&entry.audio, &entry.error) {
                    (Some(path), _) => path.clone(),
                    (None, Some(err)) => format!("no audio: {err}"),
                    (None, None) => "no audio".to_owned(),
                };
                println!(
                    "{}  {}  {}  ({audio})",
                    entry.time.format("%Y-%m-%d %H:%M:%S"),
                    entry.med_name,
                    entry.message
                );
            }
        }
        Command::Trigger { id } => {
            let entry = service.trigger_now(id).await?;
            println!("{}", entry.message);
            match (entry.audio, entry.error) {
                (Some(path), _) => println!("audio: {path}"),
                (None, Some(err)) => println!("no audio: {err}"),
                (None, None) => {}
            }
        }
        Command::Run => run(&service).await?,
    }

    Ok(())
}

async fn run(service: &ReminderService) -> anyhow::Result<()> {
    println!("medremind v{}", env!("CARGO_PKG_VERSION"));

    let report = service.start().await?;
    for trigger in service.bindings() {
        println!(
            "  {} {} next at {}",
            trigger.key.time, trigger.medicine_name, trigger.next_due
        );
    }
    if !report.warnings.is_empty() {
        println!("{} time entries skipped, see log", report.warnings.len());
    }
    println!("\nRunning. Press Ctrl+C to stop.\n");

    tokio::signal::ctrl_c().await?;
    info!("received Ctrl+C, shutting down...");
    service.shutdown().await;
    Ok(())
}

/// Log to stderr; `run` also writes a daily-rolling file in the logs dir.
fn init_tracing(log_to_file: bool) -> anyhow::Result<Option<WorkerGuard>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("medremind=info"));

    let (file_layer, guard) = if log_to_file {
        let dir = medremind::app_dirs::logs_dir();
        std::fs::create_dir_all(&dir)?;
        let appender = tracing_appender::rolling::daily(dir, "medremind.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(writer);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();
    Ok(guard)
}
