//! CLI entry point for the emissions dashboards.

use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand, ValueEnum};
use eco_analytics::{
    CompanyDashboard, CompanyQuery, Dashboard, EmissionType, Highlight, LocationDashboard,
    LocationQuery, ScatterAxis, Section,
};
use eco_processing::SchemaConfig;
use std::path::Path;
use tracing::{error, info};

/// CLI-compatible emission type enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliEmissionType {
    /// Non-biogenic carbon dioxide
    Co2,
    /// Methane
    Ch4,
    /// Nitrous oxide
    N2o,
}

impl From<CliEmissionType> for EmissionType {
    fn from(cli: CliEmissionType) -> Self {
        match cli {
            CliEmissionType::Co2 => EmissionType::Co2,
            CliEmissionType::Ch4 => EmissionType::Ch4,
            CliEmissionType::N2o => EmissionType::N2o,
        }
    }
}

/// CLI-compatible scatter axis enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliScatterAxis {
    Year,
    Co2,
    Ch4,
    N2o,
    Co2Eq,
    EcoScore,
    HeatOutput,
}

impl From<CliScatterAxis> for ScatterAxis {
    fn from(cli: CliScatterAxis) -> Self {
        match cli {
            CliScatterAxis::Year => ScatterAxis::Year,
            CliScatterAxis::Co2 => ScatterAxis::Co2,
            CliScatterAxis::Ch4 => ScatterAxis::Ch4,
            CliScatterAxis::N2o => ScatterAxis::N2o,
            CliScatterAxis::Co2Eq => ScatterAxis::Co2Eq,
            CliScatterAxis::EcoScore => ScatterAxis::EcoScore,
            CliScatterAxis::HeatOutput => ScatterAxis::HeatOutput,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Facility emissions dashboards",
    long_about = "Queries a processed facility emissions CSV and prints the dashboard views.\n\n\
                  EXAMPLES:\n  \
                  # Company dashboard with defaults (ABBVIE LTD., 2010-2022, CO2)\n  \
                  eco-analytics company\n\n  \
                  # Methane for a name substring over a narrower range\n  \
                  eco-analytics company --name abbvie --from 2015 --to 2020 --emission ch4\n\n  \
                  # Location dashboard as JSON\n  \
                  eco-analytics --json location --state TX --x year --y co2-eq"
)]
struct Args {
    /// Path to the processed CSV file
    #[arg(short, long, default_value = "Processed_Unit.csv")]
    data: String,

    /// JSON file mapping logical fields to column names
    #[arg(short, long)]
    schema: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show errors and final result)
    #[arg(short, long)]
    quiet: bool,

    /// Output the views as JSON to stdout (disables logging)
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Pivot, peer ranking, summary and time series for one facility name
    Company {
        /// Facility name substring (case-insensitive)
        #[arg(short, long, default_value = "ABBVIE LTD.")]
        name: String,

        /// First year of the range (inclusive)
        #[arg(long, default_value = "2010")]
        from: i32,

        /// Last year of the range (inclusive)
        #[arg(long, default_value = "2022")]
        to: i32,

        /// Emission to report
        #[arg(short, long, value_enum, default_value = "co2")]
        emission: CliEmissionType,

        /// Facilities shown in the peer ranking
        #[arg(long, default_value = "10")]
        peers: usize,
    },

    /// CO2 series, CO2e distribution, sector breakdown and scatter for a location
    Location {
        /// State substring (case-insensitive)
        #[arg(long, default_value = "")]
        state: String,

        /// City substring (case-insensitive)
        #[arg(long, default_value = "")]
        city: String,

        /// Number of histogram bins
        #[arg(long, default_value = "20")]
        bins: usize,

        /// Scatter x axis
        #[arg(long, value_enum, default_value = "heat-output")]
        x: CliScatterAxis,

        /// Scatter y axis
        #[arg(long, value_enum, default_value = "co2-eq")]
        y: CliScatterAxis,
    },
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

    if !Path::new(&args.data).exists() {
        return Err(anyhow!("Processed dataset not found: {}", args.data));
    }

    let schema = match &args.schema {
        Some(path) => {
            info!("Loading schema mapping from: {}", path);
            SchemaConfig::from_json_file(path)?
        }
        None => SchemaConfig::default(),
    };

    let dashboard = Dashboard::load(&args.data, &schema).inspect_err(|e| {
        error!("Loading failed [{}]: {}", e.error_code(), e);
    })?;

    match args.command {
        Command::Company {
            name,
            from,
            to,
            emission,
            peers,
        } => {
            let query = CompanyQuery::builder()
                .name(name)
                .years(from, to)
                .emission(emission.into())
                .peer_limit(peers)
                .build()?;
            let views = dashboard.company(&query)?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&views)?);
            } else {
                print_company(&views)?;
            }
        }
        Command::Location {
            state,
            city,
            bins,
            x,
            y,
        } => {
            let query = LocationQuery::builder()
                .state(state)
                .city(city)
                .histogram_bins(bins)
                .scatter_axes(x.into(), y.into())
                .build()?;
            let views = dashboard.location(&query)?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&views)?);
            } else {
                print_location(&views);
            }
        }
    }

    Ok(())
}

fn print_header(title: &str) {
    println!("\n{}", "=".repeat(60));
    println!("{}", title);
    println!("{}", "=".repeat(60));
}

fn print_empty(code: &str, message: &str) {
    println!("  (no data) [{}] {}", code, message);
}

/// Print the company views for a terminal user.
fn print_company(views: &CompanyDashboard) -> Result<()> {
    let query = &views.query;
    print_header(&format!(
        "{} EMISSIONS FOR '{}' ({})",
        query.emission, query.name, query.years
    ));

    println!("\nPivot:");
    match &views.pivot {
        Section::Ready(pivot) => println!("{}", pivot.to_dataframe()?),
        Section::Empty { code, message } => print_empty(code, message),
    }

    println!("\nSector peers:");
    match &views.peers {
        Section::Ready(peers) => {
            println!("  Sector: {}", peers.sector);
            for (rank, entry) in peers.entries.iter().enumerate() {
                let marker = match entry.highlight {
                    Highlight::Selected => "*",
                    Highlight::Other => " ",
                };
                println!(
                    "  {}{:>3}. {:<40} {:>16.2}",
                    marker,
                    rank + 1,
                    entry.facility_name,
                    entry.total
                );
            }
        }
        Section::Empty { code, message } => print_empty(code, message),
    }

    println!("\nSummary:");
    match &views.summary {
        Section::Ready(summary) => {
            println!("  Total:                 {:.2}", summary.total);
            println!(
                "  Peak:                  {:.2} in {}",
                summary.peak.value, summary.peak.year
            );
            match summary.average_annual_change {
                Some(change) => println!("  Average annual change: {:.2}", change),
                None => println!("  Average annual change: n/a"),
            }
        }
        Section::Empty { code, message } => print_empty(code, message),
    }

    println!("\nPer year:");
    match &views.time_series {
        Section::Ready(series) => {
            for point in &series.points {
                println!("  {}  {:.2}", point.year, point.total);
            }
        }
        Section::Empty { code, message } => print_empty(code, message),
    }

    Ok(())
}

/// Print the location views for a terminal user.
fn print_location(section: &Section<LocationDashboard>) {
    let views = match section {
        Section::Ready(views) => views,
        Section::Empty { code, message } => {
            print_header("LOCATION DASHBOARD");
            print_empty(code, message);
            return;
        }
    };

    let query = &views.query;
    print_header(&format!(
        "LOCATION DASHBOARD (state '{}', city '{}')",
        query.state, query.city
    ));
    println!("  Records: {}", views.records);

    println!("\nCO2 per year:");
    for point in &views.co2_series.points {
        println!("  {}  {:.2}", point.year, point.total);
    }

    println!("\nCO2e distribution:");
    for bin in &views.distribution.bins {
        println!("  [{:>14.2}, {:>14.2})  {}", bin.start, bin.end, bin.count);
    }

    println!("\nSectors by CO2e:");
    for sector in &views.sectors {
        println!(
            "  {:<40} {:>16.2}  ({} facilities)",
            sector.sector, sector.co2_eq_total, sector.facilities
        );
    }

    println!(
        "\nScatter: {} vs {}: {} points, {} skipped",
        views.scatter.y_axis,
        views.scatter.x_axis,
        views.scatter.points.len(),
        views.scatter.skipped
    );
}
