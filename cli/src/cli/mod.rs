use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::config::LogLevel;
use crate::logging::LogMode;

/// ADC battery fuel gauge: simulate it, inspect its calibration, watch it
/// run on real hardware.
#[derive(Debug, Parser)]
#[command(name = "adcbatt", version, verbatim_doc_comment)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Log level, overrides the config file
    #[arg(long, global = true, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Where to write logs
    #[arg(long, global = true, value_enum, default_value_t = LogMode::Stderr)]
    pub log_to: LogMode,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run a simulated battery through a charge cycle and print snapshots
    #[command(alias = "sim")]
    Simulate(SimulateArgs),

    /// Print the lookup table built from the configured calibration
    Table {
        /// Voltages to look up
        #[arg(short, long = "voltage", value_name = "MV")]
        voltages: Vec<i32>,

        /// JSON output
        #[arg(short, long)]
        json: bool,
    },

    /// Show or edit configuration
    Config {
        /// Print config file path
        #[arg(long)]
        path: bool,

        /// Reset config to defaults
        #[arg(long)]
        reset: bool,

        /// Open config file in $EDITOR
        #[arg(short, long)]
        edit: bool,
    },

    /// Monitor a real battery through IIO and sysfs
    #[cfg(all(target_os = "linux", feature = "linux"))]
    Watch(WatchArgs),
}

#[derive(Debug, Args)]
pub struct SimulateArgs {
    /// Number of snapshots to print (0 = until interrupted)
    #[arg(short, long, default_value_t = 0)]
    pub samples: u32,

    /// Time between steps, e.g. "250ms" (defaults to the config)
    #[arg(short, long, value_parser = humantime::parse_duration)]
    pub tick: Option<Duration>,

    /// ADC level to start from
    #[arg(long, value_name = "MV")]
    pub start: Option<i32>,

    /// Compact JSON output (one line per snapshot)
    #[arg(short, long)]
    pub compact: bool,
}

#[cfg(all(target_os = "linux", feature = "linux"))]
#[derive(Debug, Args)]
pub struct WatchArgs {
    /// IIO device name (defaults to the config)
    #[arg(short, long)]
    pub device: Option<String>,

    /// Time between snapshots, e.g. "5s" (defaults to the config)
    #[arg(short, long, value_parser = humantime::parse_duration)]
    pub interval: Option<Duration>,

    /// Number of snapshots to print (0 = until interrupted)
    #[arg(short, long, default_value_t = 0)]
    pub samples: u32,

    /// Compact JSON output (one line per snapshot)
    #[arg(short, long)]
    pub compact: bool,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_simulate() {
        let cli = Cli::parse_from([
            "adcbatt", "simulate", "--samples", "3", "--tick", "250ms", "--compact",
        ]);
        let Commands::Simulate(args) = cli.command else {
            panic!("expected simulate");
        };
        assert_eq!(args.samples, 3);
        assert_eq!(args.tick, Some(Duration::from_millis(250)));
        assert!(args.compact);
        assert_eq!(cli.log_to, LogMode::Stderr);
    }

    #[test]
    fn test_parses_table_voltages() {
        let cli = Cli::parse_from([
            "adcbatt", "table", "-v", "3600", "-v", "4000", "--log-level", "debug",
        ]);
        assert_eq!(cli.log_level, Some(LogLevel::Debug));
        let Commands::Table { voltages, json } = cli.command else {
            panic!("expected table");
        };
        assert_eq!(voltages, vec![3600, 4000]);
        assert!(!json);
    }
}
