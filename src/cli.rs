use clap::Parser;
use std::path::PathBuf;

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(name = "fleet-dashboard", about = "Desktop client for the fleet workshop backend", version)]
pub struct Cli {
    /// Path to a YAML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override the REST backend root
    #[arg(long)]
    pub api_url: Option<String>,

    /// Override the progress channel root
    #[arg(long)]
    pub ws_url: Option<String>,
}

impl Cli {
    /// Applies command-line overrides on top of the loaded config.
    pub fn apply(&self, mut config: Config) -> Config {
        if let Some(url) = &self.api_url {
            config.api_base_url = url.clone();
        }
        if let Some(url) = &self.ws_url {
            config.ws_base_url = url.clone();
        }
        config
    }
}
