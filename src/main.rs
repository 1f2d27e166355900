mod api;
mod app;
mod cli;
mod config;
mod error;
mod forms;
mod import;
mod utils;

use std::sync::Arc;

use clap::Parser;
use eyre::{eyre, Result, WrapErr};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::api::HttpFleetApi;
use crate::app::FleetDashboard;
use crate::cli::Cli;
use crate::config::Config;

fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_target(false).try_init();
}

fn main() -> Result<()> {
    setup_logging();

    let cli = Cli::parse();
    let config = cli.apply(Config::load(cli.config.as_ref()).wrap_err("Failed to load configuration")?);
    info!(api = %config.api_base_url, ws = %config.ws_base_url, "starting fleet dashboard");

    let runtime = tokio::runtime::Runtime::new().wrap_err("Failed to start async runtime")?;
    let api = HttpFleetApi::new(&config.api_base_url, config.request_timeout())
        .wrap_err("Failed to build HTTP client")?;
    let handle = runtime.handle().clone();

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_inner_size([1100.0, 760.0])
            .with_min_inner_size([720.0, 520.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Gestión de Flota",
        options,
        Box::new(move |cc| Box::new(FleetDashboard::new(cc, Arc::new(api), handle, &config))),
    )
    .map_err(|e| eyre!("UI terminated with error: {}", e))?;

    info!("fleet dashboard closed");
    Ok(())
}
