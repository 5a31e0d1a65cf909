//! strata-app: file-based association pipeline application.
//!
//! Reads picks from a spool directory, associates them through the engine,
//! and writes detections to an output directory. Configuration is a root
//! `Glass` JSON file pointing at the initialize, station-list, grid, input,
//! and output sub-configurations.

mod logging;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use strata_core::config::{Config, KIND_GLASS};
use strata_engine::KernelEngine;
use strata_pipeline::engine::AssocEngine;
use strata_pipeline::error::check_kind;
use strata_pipeline::file_input::FileFetcher;
use strata_pipeline::file_output::FileWriter;
use strata_pipeline::input::RecordSource;
use strata_pipeline::output::OutputSend;
use strata_pipeline::{Associator, Input, Output};

/// Seconds between supervisor health sweeps.
const SUPERVISOR_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(author, version, about = "strata association pipeline", long_about = None)]
struct Args {
    /// Root Glass configuration file
    config_file: String,

    /// Optional log name, or the literal `noconsole`
    #[arg(num_args = 0..=2)]
    rest: Vec<String>,
}

fn main() {
    let args = Args::parse();

    // trailing arguments follow the historical form:
    //   strata-app <configfile> [logname] [noconsole]
    let mut log_name = "strata-app".to_string();
    let mut console = true;
    for arg in &args.rest {
        if arg == "noconsole" {
            console = false;
        } else {
            log_name = arg.clone();
        }
    }

    let log_dir = std::env::var("GLASS_LOG").unwrap_or_else(|_| {
        eprintln!("strata-app: using default log directory of ./");
        "./".to_string()
    });

    if let Err(e) = logging::init(&log_name, &log_dir, console) {
        eprintln!("strata-app: failed to initialize logging: {e:#}");
        std::process::exit(1);
    }

    if let Err(e) = run(&args.config_file) {
        log::error!("strata-app: {e:#}");
        std::process::exit(1);
    }
}

fn run(config_file: &str) -> Result<()> {
    log::info!("strata-app: version {} startup", env!("CARGO_PKG_VERSION"));
    log::info!("strata-app: loading configuration file {config_file}");

    let root = Config::from_file("", config_file)
        .with_context(|| format!("failed to load {config_file}"))?;
    check_kind(&root, KIND_GLASS).context("root configuration")?;

    let config_dir = match root.get_str("ConfigDirectory") {
        Some(dir) => dir.to_string(),
        None => {
            log::warn!("missing <ConfigDirectory>, defaulting to local directory");
            "./".to_string()
        }
    };

    if let Some(level) = root.get_str("LogLevel") {
        logging::update_level(level);
    }

    let required_file = |key: &'static str| -> Result<Config> {
        let name = root
            .get_str(key)
            .ok_or_else(|| anyhow!("invalid configuration, missing <{key}>"))?;
        Config::from_file(&config_dir, name).with_context(|| format!("failed to load {name}"))
    };

    let initialize_config = required_file("InitializeFile")?;
    let station_list_config = required_file("StationList")?;
    let input_config = required_file("InputConfig")?;
    let output_config = required_file("OutputConfig")?;

    let grid_files = root
        .get_array("GridFiles")
        .ok_or_else(|| anyhow!("invalid configuration, missing <GridFiles>"))?;
    if grid_files.is_empty() {
        bail!("no <GridFiles> specified");
    }
    let mut grid_configs = Vec::new();
    for grid_file in grid_files {
        let name = grid_file
            .as_str()
            .ok_or_else(|| anyhow!("invalid <GridFiles> entry {grid_file}"))?;
        grid_configs
            .push(Config::from_file(&config_dir, name).with_context(|| format!("grid {name}"))?);
    }

    // create the stages
    let input = Arc::new(Input::new());
    input.setup(&input_config).context("failed to setup input")?;
    let fetcher = Arc::new(FileFetcher::from_config(&input_config).context("input adapter")?);

    let output = Arc::new(Output::new());
    let writer = Arc::new(FileWriter::from_config(&output_config).context("output adapter")?);

    let engine = Arc::new(KernelEngine::new());
    let associator = Associator::create(
        Arc::clone(&input) as Arc<dyn RecordSource>,
        Arc::clone(&output) as Arc<dyn OutputSend>,
        Arc::clone(&engine) as Arc<dyn AssocEngine>,
    );

    // output requests station information through the associator; wire the
    // back-reference before any worker starts
    output.set_associator(Arc::clone(&associator) as _);

    // configuration precedes data: initialize, station list, then grids
    associator.setup(&initialize_config);
    associator.setup(&station_list_config);
    for grid_config in &grid_configs {
        associator.setup(grid_config);
    }

    // start the downstream stages before the source
    output.start(writer);
    associator.start();
    input.start(fetcher);

    log::info!("strata-app: pipeline is running");
    supervise(&input, &associator, &output);

    // orderly shutdown: source first, then drain, then the rest
    input.stop();
    let mut drain_ticks = 0;
    while input.pending_count() > 0 && associator.is_started() && drain_ticks < 100 {
        std::thread::sleep(Duration::from_millis(100));
        drain_ticks += 1;
    }
    associator.stop();
    output.stop();

    log::info!("strata-app: shutdown complete");
    Ok(())
}

/// Watches stage health until one fails or the input stage stops itself
/// (file input shuts down when its directory runs dry).
fn supervise(input: &Arc<Input>, associator: &Arc<Associator>, output: &Arc<Output>) {
    loop {
        std::thread::sleep(SUPERVISOR_INTERVAL);
        log::trace!("strata-app: checking thread status");

        if !input.is_started() {
            log::info!("strata-app: input stage has stopped, shutting down");
            return;
        }
        if !input.health_check() {
            log::error!("strata-app: input stage failed its health check");
            return;
        }
        if !associator.health_check() {
            log::error!("strata-app: associator stage failed its health check");
            return;
        }
        if !output.health_check() {
            log::error!("strata-app: output stage failed its health check");
            return;
        }
    }
}
