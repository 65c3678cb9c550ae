use std::time::Instant;
use clap::Parser;
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use tierlib::config::{SimulationConfig, StructureKind, WorkloadSize};
use tierlib::io::{load_config, load_external_measurement};
use tierlib::result::{PartialResult, SimulationResult};
use tierlib::simulator::{ProgressError, SimulationEngine};

#[cfg(debug_assertions)]
const DEBUG_DEFAULT: bool = true;

#[cfg(not(debug_assertions))]
const DEBUG_DEFAULT: bool = false;

#[derive(Parser, Debug)]
#[command(about = String::from("Simulates search structures behind a three level cache hierarchy"))]
struct Args {
    /// JSON configuration file, defaults are used when omitted
    config: Option<String>,

    #[arg(short, long, value_enum, default_value_t = StructureKind::Hash)]
    structure: StructureKind,

    /// small, medium, large, or a number of operations
    #[arg(short, long, default_value = "small", value_parser = parse_workload)]
    workload: WorkloadSize,

    /// Run every structure over the same access sequence
    #[arg(short, long)]
    compare: bool,

    /// Overrides the seed from the configuration
    #[arg(long)]
    seed: Option<u64>,

    /// Normalise a measurement taken on real hardware instead of simulating
    #[arg(short, long)]
    external: Option<String>,

    #[arg(short, long)]
    performance: bool,

    #[arg(short, long, default_value_t = DEBUG_DEFAULT)]
    debug: bool,
}

fn parse_workload(value: &str) -> Result<WorkloadSize, String> {
    value.parse().map_err(|e| format!("{e}"))
}

fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), String> {
    println!("{}", serde_json::to_string_pretty(value).map_err(|e| format!("Couldn't serialise the output {e}"))?);
    Ok(())
}

fn report_progress(percent: f64, partial: &PartialResult) -> Result<(), ProgressError> {
    debug!(
        structure = %partial.structure,
        operations = partial.operations_completed,
        hit_rate = format_args!("{:.2}", partial.hit_rate),
        "{percent:.1}% complete"
    );
    Ok(())
}

fn main() -> Result<(), String> {
    let start = Instant::now();
    let args = Args::parse();
    init_logging(args.debug);

    if let Some(path) = &args.external {
        let measurement = load_external_measurement(path).map_err(|e| format!("Couldn't read the measurement at path {path}: {e}"))?;
        let result = SimulationResult::from_external(args.structure, &measurement).map_err(|e| e.to_string())?;
        return print_json(&result);
    }

    let mut config = match &args.config {
        Some(path) => load_config(path).map_err(|e| format!("Couldn't load the config file at path {path}: {e}"))?,
        None => SimulationConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    debug!(?args, "parsed arguments");

    let mut engine = SimulationEngine::new(config).map_err(|e| format!("Invalid configuration: {e}"))?;
    let operations = args.workload.operations();
    // Progress is reported every progress_stride operations from the configuration
    if args.compare {
        let results = engine.run_comparative_with_progress(operations, None, report_progress).map_err(|e| e.to_string())?;
        print_json(&results)?;
    } else {
        let result = engine.run_with_progress(args.structure, operations, None, report_progress).map_err(|e| e.to_string())?;
        print_json(&result)?;
    }

    if args.performance {
        let simulation_time = engine.get_execution_time();
        let total_time = start.elapsed();
        eprintln!("Simulation time: {}s", simulation_time.as_nanos() as f64 / 1e9);
        eprintln!("Total execution time (includes corpus generation, configuration, and output): {}s", total_time.as_nanos() as f64 / 1e9)
    }
    if args.debug {
        #[cfg(debug_assertions)]
        eprintln!("Running the debug binary, debug mode is enabled by default. If benchmarking, do not use this binary, re-compile with the --release argument when using cargo run");
        let config = engine.config();
        let capacities = config.hierarchy.levels
            .iter()
            .map(|l| format!("{}: {}", l.name, l.capacity))
            .collect::<Vec<_>>()
            .join(", ");
        eprintln!("Cache capacities by level: ({capacities})");
        eprintln!("Corpus size: {}, seed: {}", engine.corpus().len(), config.seed);
    }
    Ok(())
}
