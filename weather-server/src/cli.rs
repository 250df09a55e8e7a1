use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Instant};
use tokio::{net::TcpListener, signal};
use weather_core::{Aggregator, Config, ProviderId, providers_from_config};

use crate::logging::LogFormat;
use crate::server::Server;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Aggregated temperature service")]
pub struct Cli {
    /// Config file; defaults to the platform config directory.
    #[arg(long, global = true, env = "WEATHER_CONFIG")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve `GET /weather/{city}` over HTTP.
    Serve {
        #[arg(long, env = "WEATHER_LISTEN", default_value = "0.0.0.0:8080")]
        listen: SocketAddr,
    },

    /// Print the aggregated temperature for a city.
    Show {
        /// City name, passed to every provider as-is.
        city: String,
    },

    /// Configure credentials for a specific provider.
    Configure {
        /// Provider short name, e.g. "openweather" or "weatherapi".
        provider: String,

        /// API key; prompted for when absent.
        #[arg(long)]
        api_key: Option<String>,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let config_path = self.config_path()?;
        let config = Config::load_from(&config_path)?;

        match self.command {
            Command::Serve { listen } => {
                let aggregator = build_aggregator(&config)?;
                let listener = TcpListener::bind(listen)
                    .await
                    .with_context(|| format!("Failed to bind {listen}"))?;

                tracing::info!(
                    addr = %listen,
                    providers = ?aggregator.provider_names(),
                    "starting weather server"
                );

                Server::new(Arc::new(aggregator))
                    .serve(listener, shutdown_signal())
                    .await
                    .context("HTTP server failed")?;

                tracing::info!("weather server shutdown complete");
            }
            Command::Show { city } => {
                let aggregator = build_aggregator(&config)?;
                let begin = Instant::now();

                let temp = aggregator.temperature(&city).await?;

                println!(
                    "{city}: {:.2} K ({:.1} °C), {} providers, took {:?}",
                    temp.kelvin(),
                    temp.celsius(),
                    aggregator.len(),
                    begin.elapsed(),
                );
            }
            Command::Configure { provider, api_key } => {
                let id = ProviderId::try_from(provider.as_str())?;
                let api_key = match api_key {
                    Some(key) => key,
                    None => inquire::Password::new(&format!("API key for {id}:"))
                        .without_confirmation()
                        .prompt()
                        .context("Failed to read API key")?,
                };

                let api_key = api_key.trim();
                if api_key.is_empty() {
                    bail!("API key for '{id}' must not be empty");
                }

                let mut config = config;
                config.upsert_provider_api_key(id, api_key.to_string());

                config.save_to(&config_path)?;
                println!("Saved API key for {id} to {}", config_path.display());
            }
        }

        Ok(())
    }

    fn config_path(&self) -> anyhow::Result<PathBuf> {
        match &self.config {
            Some(path) => Ok(path.clone()),
            None => Config::config_file_path(),
        }
    }
}

fn build_aggregator(config: &Config) -> anyhow::Result<Aggregator> {
    let providers = providers_from_config(config)?;
    Aggregator::new(providers).context(
        "No weather providers configured.\n\
         Hint: run `weather configure <provider>` (e.g. `weather configure openweather`) first.",
    )
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
