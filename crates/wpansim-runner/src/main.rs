//! # wpansim
//!
//! Command line front end for WPANSim experiments.

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use wpansim_link::{
    ErrorPolicy, LinkBudget, LinkMarginThresholds, LinkStatus, DEFAULT_NOISE_FLOOR_DBM,
};
use wpansim_lrwpan::AddressMode;
use wpansim_model::ModelError;
use wpansim_runner::{
    load_config, ExchangeReport, ExchangeScenario, RunnerError, SimulationConfig, SweepController,
};

// ============================================================================
// CLI Configuration
// ============================================================================

/// WPANSim - IEEE 802.15.4 network simulator
#[derive(Parser, Debug)]
#[command(name = "wpansim")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log everything (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Packet success rate versus distance
    Sweep(SweepArgs),
    /// Request/response exchange along a line of nodes
    Exchange(ExchangeArgs),
    /// Link budget at every sweep distance
    Budget(BudgetArgs),
    /// List all metrics with descriptions and labels
    Metrics,
}

/// Options shared by every experiment.
#[derive(Args, Debug)]
struct CommonArgs {
    /// YAML configuration file; missing fields take their defaults
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Random seed (overrides config file)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Use the probabilistic O-QPSK error model instead of the threshold
    #[arg(long)]
    probabilistic: bool,

    /// Print JSON instead of plain text
    #[arg(long)]
    json: bool,

    /// Write the results to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct SweepArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Transmit power in dBm
    #[arg(long, allow_hyphen_values = true)]
    tx_power: Option<f64>,

    /// MSDU size in bytes
    #[arg(long)]
    packet_size: Option<usize>,

    /// Receiver sensitivity in dBm
    #[arg(long, allow_hyphen_values = true)]
    rx_sensitivity: Option<f64>,

    /// First distance in meters
    #[arg(long)]
    min_distance: Option<f64>,

    /// Last distance in meters
    #[arg(long)]
    max_distance: Option<f64>,

    /// Distance step in meters
    #[arg(long)]
    increment: Option<f64>,

    /// Trials per link at every distance
    #[arg(long)]
    max_packets: Option<u32>,

    /// Use extended (64-bit) addresses
    #[arg(long)]
    extended: bool,

    /// Request acknowledgements
    #[arg(long)]
    ack: bool,
}

#[derive(Args, Debug)]
struct ExchangeArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Number of nodes
    #[arg(long)]
    nodes: Option<u32>,

    /// Distance between neighbouring nodes in meters
    #[arg(long)]
    spacing: Option<f64>,

    /// Use extended (64-bit) addresses
    #[arg(long)]
    extended: bool,

    /// Send without acknowledgement requests
    #[arg(long)]
    no_ack: bool,
}

#[derive(Args, Debug)]
struct BudgetArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Transmit power in dBm
    #[arg(long, allow_hyphen_values = true)]
    tx_power: Option<f64>,

    /// Receiver sensitivity in dBm
    #[arg(long, allow_hyphen_values = true)]
    rx_sensitivity: Option<f64>,
}

// ============================================================================
// Configuration
// ============================================================================

fn load_base_config(common: &CommonArgs) -> Result<SimulationConfig, RunnerError> {
    let mut config = match &common.config {
        Some(path) => load_config(path)?,
        None => SimulationConfig::default(),
    };
    if let Some(seed) = common.seed {
        config.seed = seed;
    }
    if common.probabilistic {
        config.error_model = ErrorPolicy::Probabilistic {
            noise_floor_dbm: DEFAULT_NOISE_FLOOR_DBM,
        };
    }
    Ok(config)
}

fn apply_sweep_overrides(config: &mut SimulationConfig, args: &SweepArgs) {
    let sweep = &mut config.sweep;
    if let Some(tx_power) = args.tx_power {
        sweep.tx_power_dbm = tx_power;
    }
    if let Some(size) = args.packet_size {
        sweep.packet_size_bytes = size;
    }
    if let Some(sensitivity) = args.rx_sensitivity {
        sweep.rx_sensitivity_dbm = sensitivity;
    }
    if let Some(min) = args.min_distance {
        sweep.min_distance_m = min;
    }
    if let Some(max) = args.max_distance {
        sweep.max_distance_m = max;
    }
    if let Some(increment) = args.increment {
        sweep.increment_m = increment;
    }
    if let Some(packets) = args.max_packets {
        sweep.max_packets_per_distance = packets;
    }
    if args.extended {
        sweep.addressing_mode = AddressMode::Extended;
    }
    if args.ack {
        sweep.ack_requested = true;
    }
}

fn apply_exchange_overrides(config: &mut SimulationConfig, args: &ExchangeArgs) {
    let exchange = &mut config.exchange;
    if let Some(nodes) = args.nodes {
        exchange.node_count = nodes;
    }
    if let Some(spacing) = args.spacing {
        exchange.spacing_m = spacing;
    }
    if args.extended {
        exchange.extended_addressing = true;
    }
    if args.no_ack {
        exchange.ack_requested = false;
    }
}

// ============================================================================
// Output
// ============================================================================

fn emit(common: &CommonArgs, text: String) -> Result<(), RunnerError> {
    match &common.output {
        Some(path) => {
            std::fs::write(path, text)?;
            eprintln!("Results written to: {}", path.display());
        }
        None => print!("{text}"),
    }
    Ok(())
}

fn to_json<T: Serialize>(value: &T) -> Result<String, RunnerError> {
    Ok(serde_json::to_string_pretty(value)? + "\n")
}

// ============================================================================
// Commands
// ============================================================================

fn sweep_command(args: SweepArgs) -> Result<(), RunnerError> {
    let mut config = load_base_config(&args.common)?;
    apply_sweep_overrides(&mut config, &args);
    config.validate()?;

    let mut controller = SweepController::new(&config)?;
    let samples = controller.run()?;

    let text = if args.common.json {
        to_json(&samples)?
    } else {
        let mut text = String::new();
        for sample in samples {
            let _ = writeln!(
                text,
                "Distance: {} m, Packets Received: {}/{}, PSR: {:.3}",
                sample.distance_m, sample.received, sample.attempted, sample.success_rate
            );
        }
        text
    };
    emit(&args.common, text)
}

fn exchange_command(args: ExchangeArgs) -> Result<(), RunnerError> {
    let mut config = load_base_config(&args.common)?;
    apply_exchange_overrides(&mut config, &args);
    config.validate()?;

    let report = ExchangeScenario::new(&config)?.run()?;
    let text = if args.common.json {
        to_json(&report)?
    } else {
        format_exchange(&report)
    };
    emit(&args.common, text)
}

fn format_exchange(report: &ExchangeReport) -> String {
    let mut text = String::new();
    for node in &report.nodes {
        let _ = writeln!(
            text,
            "{} ({}): sent {}, confirmed {}, no ack {}, received {}, corrupted {}, dropped busy {}",
            node.name,
            node.address,
            node.sent,
            node.confirmed,
            node.no_ack,
            node.received,
            node.rx_corrupted,
            node.rx_dropped_busy
        );
    }
    let _ = writeln!(
        text,
        "{} events, stopped at {:.3} s",
        report.events_executed, report.end_time_s
    );
    text
}

#[derive(Debug, Serialize)]
struct BudgetRow {
    distance_m: f64,
    path_loss_db: f64,
    rx_power_dbm: f64,
    margin_db: f64,
    status: LinkStatus,
}

#[derive(Debug, Serialize)]
struct BudgetReport {
    budget: LinkBudget,
    max_range_m: f64,
    rows: Vec<BudgetRow>,
}

fn budget_command(args: BudgetArgs) -> Result<(), RunnerError> {
    let mut config = load_base_config(&args.common)?;
    if let Some(tx_power) = args.tx_power {
        config.sweep.tx_power_dbm = tx_power;
    }
    if let Some(sensitivity) = args.rx_sensitivity {
        config.sweep.rx_sensitivity_dbm = sensitivity;
    }
    config.validate()?;

    let model = config.propagation.build().map_err(ModelError::from)?;
    let budget = LinkBudget::new(config.sweep.tx_power_dbm, config.sweep.rx_sensitivity_dbm);
    let thresholds = LinkMarginThresholds::default();
    let upper_bound_m = config.sweep.max_distance_m.max(1.0) * 100.0;
    let rows: Vec<BudgetRow> = config
        .sweep
        .distances()
        .into_iter()
        .map(|distance_m| {
            let path_loss_db = model.path_loss_db(distance_m);
            let margin_db = budget.margin_db(path_loss_db);
            BudgetRow {
                distance_m,
                path_loss_db,
                rx_power_dbm: budget.received_power_dbm(path_loss_db),
                margin_db,
                status: budget.classify(margin_db, &thresholds),
            }
        })
        .collect();
    let report = BudgetReport {
        budget,
        max_range_m: budget.max_range_m(model.as_ref(), upper_bound_m),
        rows,
    };

    let text = if args.common.json {
        to_json(&report)?
    } else {
        let mut text = String::new();
        let _ = writeln!(
            text,
            "{} model, max path loss {:.1} dB, max range {:.1} m",
            model.name(),
            budget.max_path_loss_db(),
            report.max_range_m
        );
        for row in &report.rows {
            let _ = writeln!(
                text,
                "Distance: {} m, path loss {:.2} dB, rx {:.2} dBm, margin {:.2} dB, {}",
                row.distance_m, row.path_loss_db, row.rx_power_dbm, row.margin_db, row.status
            );
        }
        text
    };
    emit(&args.common, text)
}

/// Print information about all available metrics
fn print_metrics_info() {
    use wpansim_metrics::metric_defs;

    println!("WPANSim Available Metrics");
    println!("=========================\n");
    for metric in metric_defs::ALL {
        println!("{} ({}, {})", metric.name, metric.kind, metric.unit_str());
        println!("  {}", metric.description);
        if !metric.labels.is_empty() {
            println!("  labels: {}", metric.labels.join(", "));
        }
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> Result<(), RunnerError> {
    let cli = Cli::parse();

    // RUST_LOG wins unless --verbose asks for everything; default is "warn".
    let filter = if cli.verbose {
        EnvFilter::new("trace")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Sweep(args) => sweep_command(args)?,
        Commands::Exchange(args) => exchange_command(args)?,
        Commands::Budget(args) => budget_command(args)?,
        Commands::Metrics => print_metrics_info(),
    }

    Ok(())
}
