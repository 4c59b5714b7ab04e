//! mecad - command-line client for Mecademic robot arms
//!
//! Sends single commands, reads status, streams monitoring telemetry as JSON
//! lines and performs firmware updates.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use mecad::{
    Command, Config, ConsoleTelemetry, FirmwareUpdater, MonitorOutput, RobotController, TelemetryPublisher,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "config/default_config.yaml";

#[derive(Parser)]
#[command(name = "mecad")]
#[command(about = "Mecademic robot driver - commands, status, telemetry and firmware updates")]
#[command(version)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Robot address, overriding the configuration
    #[arg(long, global = true)]
    host: Option<String>,

    /// Show debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one command, e.g. `MoveJoints(0,0,0,0,0,0)`, and print the reply
    Exec {
        command: String,
        /// Seconds to wait for the reply
        #[arg(short, long)]
        timeout: Option<f64>,
    },
    /// Print robot and gripper status
    Status,
    /// Stream telemetry as JSON lines
    Monitor {
        /// Stop after this many output lines
        #[arg(short = 'n', long)]
        count: Option<usize>,
        /// Only print values that changed
        #[arg(long)]
        dynamic: bool,
        /// Print every full snapshot instead of positions and status changes
        #[arg(long, conflicts_with = "dynamic")]
        raw: bool,
    },
    /// Upload a firmware archive and follow the update
    FirmwareUpdate { path: PathBuf },
}

impl Args {
    fn load_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load_from_path(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
            None => match Config::load_from_path(DEFAULT_CONFIG_PATH) {
                Ok(config) => config,
                Err(e) => {
                    warn!("Using built-in defaults: {}", e);
                    Config::default()
                }
            },
        };

        if let Some(host) = &self.host {
            config.robot.host = host.clone();
        }
        Ok(config)
    }

    fn console(&self) -> ConsoleTelemetry {
        if self.pretty {
            ConsoleTelemetry::pretty()
        } else {
            ConsoleTelemetry::new()
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "mecad=debug" } else { "mecad=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = args.load_config()?;
    let console = args.console();
    info!("Robot at {}", config.robot.host);

    match args.command {
        Commands::Exec { command, timeout } => run_exec(config, console, &command, timeout).await,
        Commands::Status => run_status(config, console).await,
        Commands::Monitor { count, dynamic, raw } => run_monitor(config, console, count, dynamic, raw).await,
        Commands::FirmwareUpdate { path } => run_firmware_update(config, &path).await,
    }
}

async fn run_exec(config: Config, console: ConsoleTelemetry, text: &str, timeout: Option<f64>) -> Result<()> {
    let command = Command::parse(text).with_context(|| format!("Invalid command: {}", text))?;
    let mut robot = RobotController::new(config).with_publisher(Box::new(console));
    robot.connect().await?;

    let limit = match timeout {
        Some(seconds) => Duration::try_from_secs_f64(seconds).context("Invalid timeout")?,
        None => robot.channel().default_timeout(),
    };
    let outcome = robot.exchange_with_timeout(command.clone(), limit).await;
    robot.disconnect();

    if !outcome.is_completed() {
        bail!("{} did not complete", command);
    }
    Ok(())
}

async fn run_status(config: Config, console: ConsoleTelemetry) -> Result<()> {
    let mut robot = RobotController::new(config);
    robot.connect().await?;

    let status = robot.get_status_robot().await?;
    let gripper = match robot.get_status_gripper().await {
        Ok(gripper) => Some(gripper),
        Err(e) => {
            warn!("Gripper status unavailable: {}", e);
            None
        }
    };

    let report = serde_json::json!({
        "type": "status",
        "robot": status,
        "gripper": gripper,
        "error_flag": robot.is_in_error(),
    });
    console.publish_custom("status", &report).await?;
    robot.disconnect();
    Ok(())
}

async fn run_monitor(
    config: Config,
    console: ConsoleTelemetry,
    count: Option<usize>,
    dynamic: bool,
    raw: bool,
) -> Result<()> {
    let mut output = MonitorOutput::from_config(&config.monitoring, dynamic);
    let mut robot = RobotController::new(config);
    robot.connect().await?;
    robot.start_telemetry().await?;

    let subscriber = robot
        .telemetry_mut()
        .context("Telemetry stream not started")?;
    let mut printed = 0;

    loop {
        tokio::select! {
            snapshot = subscriber.next() => {
                let Some(snapshot) = snapshot else {
                    warn!("Telemetry stream ended");
                    break;
                };
                if raw {
                    console.publish_snapshot(&snapshot).await?;
                    printed += 1;
                } else {
                    printed += output.output_snapshot(&snapshot);
                }
                if count.is_some_and(|limit| printed >= limit) {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    robot.disconnect();
    Ok(())
}

async fn run_firmware_update(config: Config, path: &Path) -> Result<()> {
    let updater = FirmwareUpdater::new(&config.robot.host, &config.firmware)?;

    updater
        .update(path, |progress| {
            print!("{}", progress);
            let _ = std::io::stdout().flush();
        })
        .await
        .context("Firmware update failed")?;

    println!();
    info!("Firmware update complete");
    Ok(())
}
