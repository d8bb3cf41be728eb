//! CLI entry point for the emissions preprocessor.

use anyhow::{Result, anyhow};
use clap::Parser;
use eco_processing::{PreprocessConfig, PreprocessSummary, Preprocessor, SchemaConfig};
use std::path::Path;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Facility emissions preprocessor",
    long_about = "Computes CO2-equivalent emissions and the Eco Score for every record of a raw\n\
                  facility emissions CSV and writes the processed dataset.\n\n\
                  EXAMPLES:\n  \
                  # Default column names, default output file\n  \
                  eco-processing -i Unit.csv\n\n  \
                  # Custom column mapping\n  \
                  eco-processing -i Unit.csv -o out/Processed_Unit.csv --schema schema.json\n\n  \
                  # Machine-readable run summary\n  \
                  eco-processing -i Unit.csv --json"
)]
struct Args {
    /// Path to the raw CSV file
    #[arg(short, long)]
    input: String,

    /// Path of the processed CSV to write
    #[arg(short, long, default_value = "Processed_Unit.csv")]
    output: String,

    /// JSON file mapping logical fields to column names
    ///
    /// Keys left out keep their default column names.
    #[arg(short, long)]
    schema: Option<String>,

    /// Keep the raw gas columns as read instead of writing back zero-filled values
    #[arg(long)]
    keep_raw_gas_columns: bool,

    /// Number of rows scanned to infer CSV column types (default: whole file)
    #[arg(long)]
    infer_schema_length: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show errors and final result)
    #[arg(short, long)]
    quiet: bool,

    /// Output the run summary as JSON to stdout (disables logging)
    #[arg(long)]
    json: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    if !Path::new(&args.input).exists() {
        return Err(anyhow!("Input file not found: {}", args.input));
    }

    let schema = match &args.schema {
        Some(path) => {
            info!("Loading schema mapping from: {}", path);
            SchemaConfig::from_json_file(path)?
        }
        None => SchemaConfig::default(),
    };

    let mut builder = PreprocessConfig::builder()
        .schema(schema)
        .fill_gas_columns_in_place(!args.keep_raw_gas_columns);
    if let Some(rows) = args.infer_schema_length {
        builder = builder.infer_schema_length(rows);
    }
    let config = builder.build()?;

    let summary = match Preprocessor::new(config).run(&args.input, &args.output) {
        Ok(summary) => summary,
        Err(e) => {
            error!("Preprocessing failed [{}]: {}", e.error_code(), e);
            return Err(e.into());
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else if !args.quiet {
        print_human_readable_summary(&summary);
    }

    Ok(())
}

/// Print the run summary for a terminal user.
fn print_human_readable_summary(summary: &PreprocessSummary) {
    println!("\n{}", "=".repeat(60));
    println!("PREPROCESSING COMPLETE");
    println!("{}", "=".repeat(60));
    println!("  Rows processed:      {}", summary.rows);
    println!("  Zero heat output:    {}", summary.zero_heat_rows);
    println!("  Sentinel Eco Scores: {}", summary.sentinel_rows);
    for (column, filled) in &summary.filled_nulls {
        println!("  Filled in {:<26} {}", format!("'{}':", column), filled);
    }
    if let Some(path) = &summary.output_path {
        println!("  Output:              {}", path);
    }
    println!("  Duration:            {}ms", summary.duration_ms);
}
