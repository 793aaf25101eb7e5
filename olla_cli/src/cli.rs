//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "olla", version, about = "Olla irrigation controller")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/olla_config.toml")]
    pub config: PathBuf,

    /// Log as JSON lines instead of pretty; print summaries as JSON
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); overrides logging.level
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Exit with code 2 on a config error instead of blinking the fault LED forever
    #[arg(long, action = ArgAction::SetTrue)]
    pub exit_on_config_error: bool,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Water the reservoirs once per daily window until interrupted
    Run {
        /// Stop after this many seconds (default: run until SIGINT/SIGTERM)
        #[arg(long, value_name = "SECS")]
        for_secs: Option<u64>,
        /// Skip the level-sensor warm-up
        #[arg(long, action = ArgAction::SetTrue)]
        skip_warmup: bool,
    },
    /// Quick health check: open pins, read every sensor, drive every valve off
    SelfCheck,
    /// Open valves one at a time; the LED shows whether any sensor is active
    WiringTest {
        /// Number of full rotations over all valves
        #[arg(long, default_value_t = 3)]
        cycles: u32,
        /// Time each valve stays open
        #[arg(long, value_name = "MS", default_value_t = 1000)]
        step_ms: u64,
    },
}
