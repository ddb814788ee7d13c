//! The `config` command.

use anyhow::Context;

use crate::config::{self, Config};

/// Show the effective configuration, or write the defaults with `--init`
pub fn cmd_config(init: bool) -> anyhow::Result<()> {
    let path = config::config_path().context("could not determine config directory")?;

    if init {
        if path.exists() {
            println!("Config already exists at {}", path.display());
            return Ok(());
        }
        let written = config::save(&Config::default())?;
        println!("Wrote default config to {}", written.display());
        return Ok(());
    }

    if path.exists() {
        println!("# {}", path.display());
    } else {
        println!("# {} (not found, showing defaults)", path.display());
    }
    let config = config::load();
    println!("{}", toml::to_string_pretty(&config)?);

    Ok(())
}
