//! `planclone config show|init|path`

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Subcommand;

use planclone_core::{config, Config};

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the effective configuration as YAML.
    Show,

    /// Write a config file with default values.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },

    /// Print where the config file lives.
    Path,
}

pub fn run(command: ConfigCommand) -> Result<()> {
    let home: PathBuf = dirs::home_dir().context("could not determine home directory")?;
    match command {
        ConfigCommand::Show => {
            let config = config::load_at(&home).with_context(|| {
                format!("failed to load {}", config::config_path_at(&home).display())
            })?;
            print!(
                "{}",
                serde_yaml::to_string(&config).context("failed to serialize config")?
            );
        }
        ConfigCommand::Init { force } => {
            let path = config::config_path_at(&home);
            if path.exists() && !force {
                bail!(
                    "{} already exists; pass --force to overwrite",
                    path.display()
                );
            }
            let written = config::save_at(&home, &Config::default())
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("✓ Wrote default config to {}", written.display());
        }
        ConfigCommand::Path => {
            println!("{}", config::config_path_at(&home).display());
        }
    }
    Ok(())
}
