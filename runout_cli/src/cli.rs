//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "runout", version, about = "Filament runout monitor CLI")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/runout.toml")]
    pub config: PathBuf,

    /// Print events and logs as JSON lines instead of text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Feed a recorded sensor trace (CSV) through the monitor
    Replay {
        /// Trace CSV with headers tick,extruder,present,pulses,distance_mm
        #[arg(long, value_name = "FILE")]
        trace: PathBuf,
        /// Report a filament-change pause as already underway
        #[arg(long, action = ArgAction::SetTrue)]
        pause_in_progress: bool,
    },
    /// Poll the filament sensors at the configured period
    Watch {
        /// Stop after this many polling ticks (default: run until Ctrl-C)
        #[arg(long, value_name = "N")]
        ticks: Option<u64>,
        /// Simulated sensors run out after this many reads (sim backend only)
        #[arg(long, value_name = "READS")]
        runout_after: Option<u64>,
        /// Extrusion credited to every extruder per tick, in mm
        #[arg(long, value_name = "MM", default_value_t = 0.5)]
        mm_per_tick: f32,
    },
    /// Validate the config, probe the inputs and print the effective settings
    SelfCheck,
}
