pub mod clone;
pub mod config;
pub mod inspect;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use planclone_core::{config as core_config, Config};
use planclone_graph::{AccessToken, GraphClient};

/// Environment variable holding the bearer token.
pub const TOKEN_ENV: &str = "PLANCLONE_ACCESS_TOKEN";

/// Connection settings shared by every command that talks to Graph.
#[derive(Args, Debug)]
pub struct SessionArgs {
    /// Read the access token from this file instead of $PLANCLONE_ACCESS_TOKEN.
    #[arg(long, value_name = "PATH")]
    pub token_file: Option<PathBuf>,

    /// Override `graph_base_url` from the config file.
    #[arg(long, value_name = "URL")]
    pub graph_base_url: Option<String>,
}

impl SessionArgs {
    /// Load `~/.planclone/config.yaml` and apply the connection overrides.
    pub fn load_config(&self) -> Result<Config> {
        let home: PathBuf = dirs::home_dir().context("could not determine home directory")?;
        let mut config = core_config::load_at(&home).with_context(|| {
            format!(
                "failed to load {}",
                core_config::config_path_at(&home).display()
            )
        })?;
        if let Some(url) = &self.graph_base_url {
            config.graph_base_url = url.clone();
            config.validate().context("invalid --graph-base-url")?;
        }
        Ok(config)
    }

    /// A Graph client for `config`, authenticated with the configured token.
    pub fn client(&self, config: &Config) -> Result<GraphClient> {
        let token = read_token(self.token_file.as_deref())?;
        Ok(GraphClient::from_config(config, token))
    }
}

fn read_token(token_file: Option<&Path>) -> Result<AccessToken> {
    let (raw, source) = match token_file {
        Some(path) => (
            std::fs::read_to_string(path)
                .with_context(|| format!("cannot read token file '{}'", path.display()))?,
            path.display().to_string(),
        ),
        None => (
            std::env::var(TOKEN_ENV)
                .with_context(|| format!("no access token: set {TOKEN_ENV} or pass --token-file"))?,
            TOKEN_ENV.to_string(),
        ),
    };
    AccessToken::new(raw).with_context(|| format!("access token from {source} is empty"))
}
