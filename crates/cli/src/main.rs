//! FarmIntel CLI
//!
//! A command-line tool for requesting crop recommendations and price
//! predictions from a running FarmIntel service.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use client::{CropRequest, PriceRequest};
use commands::{health, predict};
use output::OutputFormat;

/// FarmIntel CLI
#[derive(Parser)]
#[command(name = "farmctl")]
#[command(author, version, about = "CLI for the FarmIntel prediction service", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via FARMINTEL_API_URL env var)
    #[arg(long, env = "FARMINTEL_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short)]
    pub format: Option<OutputFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Recommend a crop for soil nutrients and climate
    #[command(allow_negative_numbers = true)]
    Recommend {
        /// Nitrogen content
        #[arg(long = "n")]
        n: f64,

        /// Phosphorus content
        #[arg(long = "p")]
        p: f64,

        /// Potassium content
        #[arg(long = "k")]
        k: f64,

        /// Temperature in °C
        #[arg(long)]
        temperature: f64,

        /// Relative humidity in %
        #[arg(long)]
        humidity: f64,

        /// Soil pH
        #[arg(long)]
        ph: f64,

        /// Rainfall in mm
        #[arg(long)]
        rainfall: f64,
    },

    /// Predict the price of a crop for a month
    Price {
        /// Crop name (case-insensitive), e.g. Wheat
        #[arg(long)]
        crop: String,

        #[arg(long)]
        year: i32,

        /// Month number, 1-12
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
        month: u32,

        /// Rainfall in mm
        #[arg(long)]
        rainfall: f64,
    },

    /// Show which models the service has loaded
    Health,
}

async fn run(cli: Cli) -> Result<()> {
    let config = config::Config::load()?;
    let api_url = config.resolve_api_url(cli.api_url);
    let format = cli
        .format
        .or_else(|| {
            config
                .default_format
                .as_deref()
                .and_then(|f| OutputFormat::from_str(f, true).ok())
        })
        .unwrap_or_default();

    // Initialize client
    let client = client::ApiClient::new(&api_url)?;

    // Execute command
    match cli.command {
        Commands::Recommend {
            n,
            p,
            k,
            temperature,
            humidity,
            ph,
            rainfall,
        } => {
            let request = CropRequest {
                n,
                p,
                k,
                temperature,
                humidity,
                ph,
                rainfall,
            };
            predict::recommend(&client, request, format).await?;
        }
        Commands::Price {
            crop,
            year,
            month,
            rainfall,
        } => {
            let request = PriceRequest {
                plant_type: crop,
                year,
                month,
                rainfall,
            };
            predict::price(&client, request, format).await?;
        }
        Commands::Health => {
            health::show_health(&client, format).await?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        output::print_error(&format!("{:#}", e));
        if let Some(api) = e.downcast_ref::<client::ClientError>() {
            if api.status() == reqwest::StatusCode::SERVICE_UNAVAILABLE {
                output::print_warning("The model is not loaded on the server; see `farmctl health`");
            }
        }
        std::process::exit(1);
    }
}
