pub mod types;
pub mod config;
pub mod data;
pub mod scale;
pub mod selection;
pub mod index;
pub mod map;
pub mod selector;
pub mod chart;
pub mod render;
pub mod server;

#[cfg(test)]
mod testutil;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pre-render choropleth tiles for every selectable statistic
    Generate {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Serve the interactive map
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Generate { config } => {
            info!("Generating tiles with config: {:?}", config);
            let app_config = config::AppConfig::load_from_file(config)?;

            // Tiles are useless without both halves, so load strictly here
            let features = data::load_features(&app_config.input.geojson, &app_config.input)?;
            let records = data::load_records(&app_config.input.data_csv, &app_config.input)?;
            let sources = data::SourceData { features: Some(features), records: Some(records) };

            let view = map::MapView::new(sources, app_config.style.clone())?;
            let selector = selector::Selector::new(app_config.datasets.clone());
            let config = app_config.clone();
            tokio::task::spawn_blocking(move || render::generate_tiles(&config, &view, &selector)).await??;

            info!("Generation complete!");
        }
        Commands::Serve { config } => {
            info!("Serving map with config: {:?}", config);
            let app_config = config::AppConfig::load_from_file(config)?;

            let sources = data::load_sources(&app_config).await;
            server::start_server(app_config, sources).await?;
        }
    }

    Ok(())
}
