//! Ingest CLI - Command-line interface for wear-ingest
//!
//! Commands:
//! - map: Map one export file into canonical records
//! - check: Report which records of an export file would be skipped
//! - run: Ingest every data kind from an export directory
//! - devices: Print device capability profiles

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use wear_ingest::source::parse_collection;
use wear_ingest::{
    BatchProcessor, CanonicalBatch, DataKind, DeviceModel, IngestConfig, IngestError, Ingestor,
    INGEST_VERSION,
};

/// Ingest - Normalize fitness-tracker exports into canonical records
#[derive(Parser)]
#[command(name = "ingest")]
#[command(version = INGEST_VERSION)]
#[command(about = "Map wearable export files into canonical records", long_about = None)]
struct Cli {
    /// Log skipped records and batch summaries to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Map one export file into canonical records
    Map {
        /// Hardware model that produced the export [default: $INGEST_DEVICE or forerunner235]
        #[arg(short, long)]
        device: Option<DeviceModel>,

        /// Data kind held by the export (sleep, activity, heart-rate)
        #[arg(short, long)]
        kind: DataKind,

        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Output format
        #[arg(long, default_value = "json")]
        output_format: OutputFormat,
    },

    /// Report which records of an export file would be skipped
    Check {
        #[arg(short, long)]
        device: Option<DeviceModel>,

        #[arg(short, long)]
        kind: DataKind,

        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Ingest every data kind from an export directory
    Run {
        #[command(flatten)]
        source: SourceArgs,

        /// Directory for the canonical output files
        #[arg(long, default_value = "normalized")]
        output_dir: PathBuf,

        /// Output format
        #[arg(long, default_value = "json")]
        output_format: OutputFormat,
    },

    /// Print device capability profiles
    Devices {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Overrides for the `INGEST_*` environment settings
#[derive(Args, Debug, Default)]
struct SourceArgs {
    /// Directory holding the export files [default: $INGEST_DATA_DIR or .]
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Hardware model that produced the exports [default: $INGEST_DEVICE or forerunner235]
    #[arg(short, long)]
    device: Option<DeviceModel>,

    /// Sleep export file name [default: $INGEST_SLEEP_FILE or sleep-data.json]
    #[arg(long)]
    sleep_file: Option<PathBuf>,

    /// Activity export file name [default: $INGEST_ACTIVITY_FILE or activities-data.json]
    #[arg(long)]
    activity_file: Option<PathBuf>,

    /// Heart-rate export file name [default: $INGEST_HEART_RATE_FILE or heart-rate-data.json]
    #[arg(long)]
    heart_rate_file: Option<PathBuf>,
}

impl SourceArgs {
    /// Environment configuration with command-line flags on top
    fn resolve(self) -> Result<IngestConfig, IngestError> {
        let mut config = IngestConfig::from_env()?;
        self.apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    fn apply(self, config: &mut IngestConfig) {
        if let Some(device) = self.device {
            config.device = device;
        }
        if let Some(data_dir) = self.data_dir {
            config.data_dir = data_dir;
        }
        if let Some(sleep) = self.sleep_file {
            config.paths.sleep = sleep;
        }
        if let Some(activity) = self.activity_file {
            config.paths.activity = activity;
        }
        if let Some(heart_rate) = self.heart_rate_file {
            config.paths.heart_rate = heart_rate;
        }
    }
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// JSON array of records
    Json,
    /// Pretty-printed JSON
    JsonPretty,
    /// Newline-delimited JSON (one record per line)
    Ndjson,
}

impl OutputFormat {
    fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json | OutputFormat::JsonPretty => "json",
            OutputFormat::Ndjson => "ndjson",
        }
    }
}

fn main() -> ExitCode {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), IngestCliError> {
    match cli.command {
        Commands::Map {
            device,
            kind,
            input,
            output,
            output_format,
        } => cmd_map(resolve_device(device)?, kind, &input, &output, &output_format),

        Commands::Check {
            device,
            kind,
            input,
            json,
        } => cmd_check(resolve_device(device)?, kind, &input, json),

        Commands::Run {
            source,
            output_dir,
            output_format,
        } => cmd_run(&source.resolve()?, &output_dir, &output_format),

        Commands::Devices { json } => cmd_devices(json),
    }
}

fn cmd_map(
    device: DeviceModel,
    kind: DataKind,
    input: &Path,
    output: &Path,
    output_format: &OutputFormat,
) -> Result<(), IngestCliError> {
    let raw = parse_collection(&read_input(input)?, kind)?;
    let batch = BatchProcessor::for_device(device).process_kind(kind, &raw);

    let output_data = format_output(&batch, output_format)?;
    if output.to_string_lossy() == "-" {
        print!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
    }

    Ok(())
}

fn cmd_check(
    device: DeviceModel,
    kind: DataKind,
    input: &Path,
    json: bool,
) -> Result<(), IngestCliError> {
    let raw = parse_collection(&read_input(input)?, kind)?;
    let (batch, skipped) = BatchProcessor::for_device(device).process_kind_with_report(kind, &raw);

    let report = CheckReport {
        device,
        kind,
        total_records: raw.len(),
        mapped_records: batch.len(),
        skipped_records: skipped.len(),
        skipped: skipped
            .iter()
            .map(|s| SkipDetail {
                index: s.index,
                reason: s.reason.to_string(),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Check Report ({} / {})", report.device.display_name(), report.kind);
        println!("=================");
        println!("Total records:   {}", report.total_records);
        println!("Mapped records:  {}", report.mapped_records);
        println!("Skipped records: {}", report.skipped_records);

        if !report.skipped.is_empty() {
            println!("\nSkipped:");
            for detail in &report.skipped {
                println!("  - index {}: {}", detail.index, detail.reason);
            }
        }
    }

    if report.skipped_records > 0 {
        Err(IngestCliError::RecordsSkipped(report.skipped_records))
    } else {
        Ok(())
    }
}

fn cmd_run(
    config: &IngestConfig,
    output_dir: &Path,
    output_format: &OutputFormat,
) -> Result<(), IngestCliError> {
    let ingestor = Ingestor::from_config(config);
    fs::create_dir_all(output_dir)?;

    let mut ingested = 0;
    for kind in DataKind::ALL {
        let report = match ingestor.ingest(kind) {
            Ok(report) => report,
            Err(IngestError::DataUnavailable(reason)) => {
                warn!(%kind, %reason, "skipping data kind");
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let path = output_dir.join(format!("{}.{}", kind, output_format.extension()));
        fs::write(&path, format_output(&report.records, output_format)?)?;
        println!(
            "{}: {} of {} records mapped -> {}",
            kind,
            report.records.len(),
            report.total,
            path.display()
        );
        ingested += 1;
    }

    if ingested == 0 {
        return Err(IngestCliError::NoData);
    }
    Ok(())
}

fn cmd_devices(json: bool) -> Result<(), IngestCliError> {
    let profiles: Vec<DeviceReport> = DeviceModel::ALL
        .iter()
        .map(|model| DeviceReport {
            device: *model,
            name: model.display_name(),
            capabilities: model.mapper().capabilities(),
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&profiles)?);
        return Ok(());
    }

    for profile in &profiles {
        println!("{} ({})", profile.name, profile.device);
        for kind in DataKind::ALL {
            let caps = profile.capabilities.for_kind(kind);
            println!("  {}:", kind);
            for field in caps.reads {
                println!("    {:<40} {:?}", field.key, field.support);
            }
            if !caps.ignores.is_empty() {
                println!("    ignored: {}", caps.ignores.join(", "));
            }
        }
    }

    Ok(())
}

// Helper functions

fn resolve_device(device: Option<DeviceModel>) -> Result<DeviceModel, IngestError> {
    match device {
        Some(device) => Ok(device),
        None => Ok(IngestConfig::from_env()?.device),
    }
}

fn read_input(input: &Path) -> Result<String, IngestCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn format_output(batch: &CanonicalBatch, format: &OutputFormat) -> Result<String, IngestCliError> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string(batch)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(batch)?),
        OutputFormat::Ndjson => {
            let value = serde_json::to_value(batch)?;
            let lines = value
                .as_array()
                .map(|records| {
                    records
                        .iter()
                        .map(serde_json::to_string)
                        .collect::<Result<Vec<_>, _>>()
                })
                .transpose()?
                .unwrap_or_default();
            if lines.is_empty() {
                Ok(String::new())
            } else {
                Ok(lines.join("\n") + "\n")
            }
        }
    }
}

// Error types

#[derive(Debug)]
enum IngestCliError {
    Io(io::Error),
    Ingest(IngestError),
    Json(serde_json::Error),
    RecordsSkipped(usize),
    NoData,
}

impl From<io::Error> for IngestCliError {
    fn from(e: io::Error) -> Self {
        IngestCliError::Io(e)
    }
}

impl From<IngestError> for IngestCliError {
    fn from(e: IngestError) -> Self {
        IngestCliError::Ingest(e)
    }
}

impl From<serde_json::Error> for IngestCliError {
    fn from(e: serde_json::Error) -> Self {
        IngestCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<IngestCliError> for CliError {
    fn from(e: IngestCliError) -> Self {
        match e {
            IngestCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            IngestCliError::Ingest(e) => {
                let (code, hint) = match &e {
                    IngestError::UnsupportedDevice(_) => (
                        "UNSUPPORTED_DEVICE",
                        "Run 'ingest devices' to list supported models",
                    ),
                    IngestError::UnsupportedKind(_) => (
                        "UNSUPPORTED_KIND",
                        "Use one of: sleep, activity, heart-rate",
                    ),
                    IngestError::DataUnavailable(_) => (
                        "DATA_UNAVAILABLE",
                        "Check that the export file exists and holds a JSON array",
                    ),
                    IngestError::Io(_) => ("IO_ERROR", "Check file paths and permissions"),
                    IngestError::Json(_) => ("JSON_ERROR", "Check JSON syntax"),
                    IngestError::Config(_) => ("CONFIG_ERROR", "Check INGEST_* settings"),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            IngestCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            IngestCliError::RecordsSkipped(count) => CliError {
                code: "RECORDS_SKIPPED".to_string(),
                message: format!("{} records could not be mapped", count),
                hint: Some("Review the skipped entries in the check report".to_string()),
            },
            IngestCliError::NoData => CliError {
                code: "NO_DATA".to_string(),
                message: "No export files found for any data kind".to_string(),
                hint: Some("Check --data-dir and the per-kind file names".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct CheckReport {
    device: DeviceModel,
    kind: DataKind,
    total_records: usize,
    mapped_records: usize,
    skipped_records: usize,
    skipped: Vec<SkipDetail>,
}

#[derive(serde::Serialize)]
struct SkipDetail {
    index: usize,
    reason: String,
}

#[derive(serde::Serialize)]
struct DeviceReport {
    device: DeviceModel,
    name: &'static str,
    capabilities: &'static wear_ingest::CapabilityProfile,
}
