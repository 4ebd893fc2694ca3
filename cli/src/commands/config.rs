use adcbatt_gauge::LookupTable;
use color_eyre::eyre::Result;

use crate::config::{config_path, UserConfig};

pub fn run(path: bool, reset: bool, edit: bool) -> Result<()> {
    let config_file = config_path();

    if path {
        println!("{}", config_file.display());
        return Ok(());
    }

    if reset {
        UserConfig::default().save()?;
        println!("Config reset to defaults at: {}", config_file.display());
        return Ok(());
    }

    if edit {
        let editor = std::env::var("EDITOR").unwrap_or_else(|_| "nano".to_string());

        if !config_file.exists() {
            UserConfig::default().save()?;
        }

        std::process::Command::new(editor)
            .arg(&config_file)
            .status()?;

        // Surface mistakes right away instead of on the next run.
        return check(&UserConfig::try_load()?);
    }

    let config = UserConfig::try_load()?;
    println!("Config file: {}", config_file.display());
    println!();
    println!("{}", toml::to_string_pretty(&config)?);
    check(&config)
}

fn check(config: &UserConfig) -> Result<()> {
    config.battery.validate()?;
    LookupTable::new(&config.battery.thresholds)?;
    Ok(())
}
