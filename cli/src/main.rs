mod cli;
mod commands;
mod config;
mod logging;

use std::future::Future;

use clap::Parser;
use color_eyre::eyre::Result;

use cli::{Cli, Commands};
use config::{ensure_dirs, UserConfig};

fn main() -> Result<()> {
    color_eyre::install()?;
    let _ = ensure_dirs();

    let cli = Cli::parse();
    let config = UserConfig::load();
    let _guard = logging::init(config.log_level, cli.log_to, cli.log_level);

    match cli.command {
        Commands::Simulate(args) => block_on(commands::simulate::run(config, args)),
        Commands::Table { voltages, json } => commands::table::run(&config, &voltages, json),
        Commands::Config { path, reset, edit } => commands::config::run(path, reset, edit),
        #[cfg(all(target_os = "linux", feature = "linux"))]
        Commands::Watch(args) => block_on(commands::watch::run(config, args)),
    }
}

/// The monitor's poll task only needs one thread.
fn block_on<F: Future<Output = Result<()>>>(future: F) -> Result<()> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?
        .block_on(future)
}
