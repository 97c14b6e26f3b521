//! # Arm Simulator Binary
//!
//! Loads the simulator config, builds the robot fleet and runs the refresh
//! loop until Ctrl-C. Commands are read from stdin, one per line; replies
//! go to stdout and logs to stderr.
//!
//! # Usage
//!
//! ```bash
//! # Run with the sample config
//! arm_sim --config config/simulator.toml
//!
//! # Verbose logging, JSON log format
//! arm_sim --config config/simulator.toml -v --json
//!
//! # Also write every published event to a file
//! arm_sim --config config/simulator.toml --publish-json /tmp/arm_sim.jsonl
//! ```
//!
//! Tunables come from the environment (`PROBABILITY_RANGE`,
//! `ALARM_CLEARED`, `ALARMS_RANGE`, `DEFAULT_WORK_STATUS`,
//! `EFFECTOR_STATUS`).

use arm_common::config::{LogLevel, SimConfig, load_sim_config};
use arm_common::tunables::Tunables;
use arm_sim::{
    JsonLinesPublisher, Publisher, SimError, Supervisor, TracingPublisher, execute,
    spawn_line_reader,
};
use clap::Parser;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Robotic-arm controller simulator
#[derive(Parser, Debug)]
#[command(name = "arm_sim")]
#[command(version)]
#[command(about = "Robotic-arm controller simulator with alarm injection")]
#[command(long_about = None)]
struct Args {
    /// Path to the simulator configuration file
    #[arg(short, long, default_value = "config/simulator.toml")]
    config: PathBuf,

    /// Enable verbose logging (overrides the config's log_level)
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,

    /// Also append every published event to this file as JSON lines
    #[arg(long, value_name = "FILE")]
    publish_json: Option<PathBuf>,

    /// Do not read commands from stdin
    #[arg(long)]
    no_stdin: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Config first: its log_level feeds the subscriber
    let config = load_sim_config(&args.config);
    let level = config
        .as_ref()
        .map(|c| c.shared.log_level)
        .unwrap_or_default();
    setup_tracing(&args, level);

    let result = match config {
        Ok(config) => run(&args, config).await,
        Err(e) => Err(SimError::from(e)),
    };
    if let Err(e) = result {
        error!("Simulator failed: {}", e);
        std::process::exit(1);
    }
    // The stdin thread may still sit in a blocking read
    std::process::exit(0);
}

async fn run(args: &Args, config: SimConfig) -> Result<(), SimError> {
    info!(
        "Arm simulator v{} starting as {}",
        env!("CARGO_PKG_VERSION"),
        config.shared.service_name
    );

    let tunables = Tunables::from_env()?;
    info!(
        "Tunables: probability_range={}, alarm_cleared={}s, alarms_range={}, work_status={}",
        tunables.probability_range,
        tunables.alarm_cleared_s,
        tunables.alarms_range,
        tunables.default_work_status
    );

    let supervisor = Arc::new(Supervisor::from_config(&config, &tunables)?);

    let publisher: Arc<dyn Publisher> = match &args.publish_json {
        Some(path) => Arc::new(JsonLinesPublisher::create(path)?),
        None => Arc::new(TracingPublisher),
    };
    supervisor.register(publisher.as_ref())?;

    let period = Duration::from_secs_f64(config.server.refresh_rate);
    let ticker = tokio::spawn(Arc::clone(&supervisor).run(Arc::clone(&publisher), period));

    if args.no_stdin {
        info!("Command reader disabled");
    } else {
        let lines = spawn_line_reader(BufReader::new(std::io::stdin()));
        tokio::spawn(read_commands(Arc::clone(&supervisor), lines));
    }

    match signal::ctrl_c().await {
        Ok(()) => info!("Received shutdown signal"),
        Err(e) => error!("Unable to listen for shutdown signal: {}", e),
    }

    ticker.abort();
    publisher.flush()?;
    info!("Arm simulator shutdown complete");
    Ok(())
}

/// Execute forwarded command lines until the reader closes, printing one
/// reply per line.
async fn read_commands(supervisor: Arc<Supervisor>, mut lines: mpsc::Receiver<String>) {
    while let Some(line) = lines.recv().await {
        match execute(&supervisor, &line) {
            Ok(reply) => println!("{reply}"),
            Err(e) => warn!("{}", e),
        }
    }
    info!("Command reader stopped");
}

/// Setup tracing subscriber based on CLI arguments and the config level.
///
/// `RUST_LOG` wins when set; `-v` forces debug.
fn setup_tracing(args: &Args, level: LogLevel) {
    let directive = if args.verbose {
        LogLevel::Debug.as_directive()
    } else {
        level.as_directive()
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}
